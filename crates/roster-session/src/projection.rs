//! The projection materializer.
//!
//! Renders a base query into a caller-declared output shape. Closed
//! shapes (every field a direct column, no nesting) rewrite the query to
//! select only the referenced columns — the optimized path, with the
//! column set part of the statement cache key. Shapes with expression
//! fields fetch full rows and evaluate each expression post-fetch. Nested
//! shapes resolve the related record with one full-entity load per parent
//! row — an intentional, documented N+1 access pattern: nested shapes
//! never batch-fetch their related entity.

use roster_core::traits::StoreSession;
use roster_core::types::{
    FieldKind, FieldValue, Filter, FilterField, FromShape, ProjectionShape, Row, SelectStatement,
    ShapeInstance, SortField, Value,
};
use roster_core::{KernelError, KernelResult};
use roster_entity::Record;

use crate::session::Session;

/// Materialize a filtered query into a projection shape.
///
/// Shapes are structural: an unresolvable field fails here, at first use,
/// with `UnresolvedProjectionField` — never at shape declaration time.
pub async fn project<R, S>(
    session: &mut Session<S>,
    filter: Filter,
    sort: Vec<SortField>,
    shape: &ProjectionShape,
) -> KernelResult<Vec<ShapeInstance>>
where
    R: Record,
    S: StoreSession,
{
    if shape.is_closed() {
        return project_closed::<R, S>(session, filter, sort, shape).await;
    }

    // At least one open or nested field: fetch full rows, then build each
    // instance post-fetch.
    let select = SelectStatement::all(R::table()).filter(filter).sort(sort);
    let rows = session.query_rows(select).await?;
    let mut instances = Vec::with_capacity(rows.len());
    for row in &rows {
        instances.push(materialize::<R, S>(session, row, shape).await?);
    }
    Ok(instances)
}

/// Materialize the same base query into a shape chosen at call time via a
/// type token.
pub async fn project_as<T, R, S>(
    session: &mut Session<S>,
    filter: Filter,
    sort: Vec<SortField>,
) -> KernelResult<Vec<T>>
where
    T: FromShape,
    R: Record,
    S: StoreSession,
{
    let shape = T::shape();
    let instances = project::<R, S>(session, filter, sort, &shape).await?;
    instances.iter().map(T::from_instance).collect()
}

async fn project_closed<R, S>(
    session: &mut Session<S>,
    filter: Filter,
    sort: Vec<SortField>,
    shape: &ProjectionShape,
) -> KernelResult<Vec<ShapeInstance>>
where
    R: Record,
    S: StoreSession,
{
    let columns = shape
        .source_columns()
        .expect("closed shape has source columns");
    for column in &columns {
        if !R::columns().contains(column) {
            return Err(unresolved::<R>(column));
        }
    }

    let select = SelectStatement::all(R::table())
        .columns(columns.iter().map(|c| c.to_string()).collect())
        .filter(filter)
        .sort(sort);
    let rows = session.query_rows(select).await?;

    Ok(rows
        .into_iter()
        .map(|row| {
            let fields = shape
                .fields
                .iter()
                .zip(row.iter())
                .map(|(field, (_, value))| {
                    (field.name.clone(), FieldValue::Scalar(value.clone()))
                })
                .collect();
            ShapeInstance::from_pairs(fields)
        })
        .collect())
}

async fn materialize<R, S>(
    session: &mut Session<S>,
    row: &Row,
    shape: &ProjectionShape,
) -> KernelResult<ShapeInstance>
where
    R: Record,
    S: StoreSession,
{
    let mut fields = Vec::with_capacity(shape.fields.len());
    for field in &shape.fields {
        let value = match &field.kind {
            FieldKind::Column(source) => {
                if !R::columns().contains(&source.as_str()) {
                    return Err(unresolved::<R>(source));
                }
                FieldValue::Scalar(row.require(source)?.clone())
            }
            FieldKind::Expression(expr) => FieldValue::Scalar(expr.eval(row)?),
            FieldKind::Nested {
                relation,
                shape: sub_shape,
            } => materialize_nested::<R, S>(session, row, relation, sub_shape).await?,
        };
        fields.push((field.name.clone(), value));
    }
    Ok(ShapeInstance::from_pairs(fields))
}

async fn materialize_nested<R, S>(
    session: &mut Session<S>,
    row: &Row,
    relation: &str,
    sub_shape: &ProjectionShape,
) -> KernelResult<FieldValue>
where
    R: Record,
    S: StoreSession,
{
    let def = R::relations()
        .iter()
        .find(|def| def.name == relation)
        .ok_or_else(|| {
            KernelError::unresolved_field(format!(
                "{} declares no relation named '{relation}'",
                R::table()
            ))
        })?;

    let target_id = match row.require(def.column)? {
        Value::Null => return Ok(FieldValue::Scalar(Value::Null)),
        value => value.as_i64().ok_or_else(|| {
            KernelError::schema_mismatch(format!(
                "Relation column '{}' is not an integer",
                def.column
            ))
        })?,
    };

    // Full entity load per parent row: nested shapes delegate to the
    // relation and never batch-fetch.
    let select = SelectStatement::all(def.target_table)
        .filter(FilterField::eq("id", target_id).into())
        .limit(1);
    let related = session
        .query_rows(select)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| {
            KernelError::not_found(format!(
                "No {} with id {target_id} referenced by relation '{relation}'",
                def.target_table
            ))
        })?;

    let mut fields = Vec::with_capacity(sub_shape.fields.len());
    for field in &sub_shape.fields {
        let value = match &field.kind {
            FieldKind::Column(source) => related
                .get(source)
                .ok_or_else(|| {
                    KernelError::unresolved_field(format!(
                        "Nested shape references '{source}' which {} does not provide",
                        def.target_table
                    ))
                })?
                .clone(),
            FieldKind::Expression(expr) => expr.eval(&related)?,
            FieldKind::Nested { relation, .. } => {
                return Err(KernelError::unresolved_field(format!(
                    "Nested shape '{relation}' exceeds the single supported nesting level"
                )));
            }
        };
        fields.push((field.name.clone(), FieldValue::Scalar(value)));
    }
    Ok(FieldValue::Nested(ShapeInstance::from_pairs(fields)))
}

fn unresolved<R: Record>(column: &str) -> KernelError {
    KernelError::unresolved_field(format!(
        "Shape field '{column}' matches no column of {}",
        R::table()
    ))
}
