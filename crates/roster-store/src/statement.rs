//! Rendering structured statements to parameterized SQL.
//!
//! Both backends share this rendering: the PostgreSQL session executes
//! the rendered text, and the memory engine records it in its statement
//! log so tests can inspect exactly what a query would issue.

use std::fmt::Write;

use roster_core::types::{
    AssignOp, ColumnSet, Filter, FilterOp, LockMode, Statement, Value,
};

/// Render a statement to `$n`-parameterized SQL and its positional bind
/// list. `IN` lists are flattened into one placeholder per element.
pub fn render(statement: &Statement) -> (String, Vec<Value>) {
    let mut sql = String::new();
    let mut params = Vec::new();

    match statement {
        Statement::Select(select) => {
            sql.push_str("SELECT ");
            match &select.columns {
                ColumnSet::All => sql.push('*'),
                ColumnSet::Only(columns) => sql.push_str(&columns.join(", ")),
            }
            write!(sql, " FROM {}", select.table).unwrap();
            render_where(&mut sql, &mut params, &select.filter);
            if !select.sort.is_empty() {
                sql.push_str(" ORDER BY ");
                let order = select
                    .sort
                    .iter()
                    .map(|s| format!("{} {}", s.field, s.direction.as_sql()))
                    .collect::<Vec<_>>()
                    .join(", ");
                sql.push_str(&order);
            }
            if let Some(limit) = select.limit {
                params.push(Value::Int(limit as i64));
                write!(sql, " LIMIT ${}", params.len()).unwrap();
            }
            if let Some(offset) = select.offset {
                params.push(Value::Int(offset as i64));
                write!(sql, " OFFSET ${}", params.len()).unwrap();
            }
            if select.lock == LockMode::PessimisticWrite {
                sql.push_str(" FOR UPDATE");
            }
        }
        Statement::Count(count) => {
            write!(sql, "SELECT COUNT(*) FROM {}", count.table).unwrap();
            render_where(&mut sql, &mut params, &count.filter);
        }
        Statement::Insert(insert) => {
            // A Null id asks the store to assign the identity.
            let cells: Vec<(&str, &Value)> = insert
                .row
                .iter()
                .filter(|(column, value)| *column != "id" || !value.is_null())
                .collect();
            write!(sql, "INSERT INTO {} (", insert.table).unwrap();
            sql.push_str(
                &cells
                    .iter()
                    .map(|(column, _)| *column)
                    .collect::<Vec<_>>()
                    .join(", "),
            );
            sql.push_str(") VALUES (");
            for (i, (_, value)) in cells.iter().enumerate() {
                if i > 0 {
                    sql.push_str(", ");
                }
                params.push((*value).clone());
                write!(sql, "${}", params.len()).unwrap();
            }
            sql.push_str(") RETURNING id");
        }
        Statement::Update(update) => {
            write!(sql, "UPDATE {} SET ", update.table).unwrap();
            for (i, assignment) in update.assignments.iter().enumerate() {
                if i > 0 {
                    sql.push_str(", ");
                }
                match &assignment.op {
                    AssignOp::Set(value) => {
                        params.push(value.clone());
                        write!(sql, "{} = ${}", assignment.column, params.len()).unwrap();
                    }
                    AssignOp::Increment(by) => {
                        params.push(Value::Int(*by));
                        write!(
                            sql,
                            "{} = {} + ${}",
                            assignment.column,
                            assignment.column,
                            params.len()
                        )
                        .unwrap();
                    }
                }
            }
            render_where(&mut sql, &mut params, &update.filter);
        }
        Statement::Delete(delete) => {
            write!(sql, "DELETE FROM {}", delete.table).unwrap();
            render_where(&mut sql, &mut params, &delete.filter);
        }
    }

    (sql, params)
}

fn render_where(sql: &mut String, params: &mut Vec<Value>, filter: &Filter) {
    if filter.is_empty() {
        return;
    }
    sql.push_str(" WHERE ");
    for (i, condition) in filter.conditions.iter().enumerate() {
        if i > 0 {
            sql.push_str(" AND ");
        }
        match condition.op {
            FilterOp::IsNull => {
                write!(sql, "{} IS NULL", condition.field).unwrap();
            }
            FilterOp::IsNotNull => {
                write!(sql, "{} IS NOT NULL", condition.field).unwrap();
            }
            FilterOp::In => {
                write!(sql, "{} IN (", condition.field).unwrap();
                let values = match &condition.value {
                    Value::List(values) => values.clone(),
                    other => vec![other.clone()],
                };
                for (j, value) in values.into_iter().enumerate() {
                    if j > 0 {
                        sql.push_str(", ");
                    }
                    params.push(value);
                    write!(sql, "${}", params.len()).unwrap();
                }
                sql.push(')');
            }
            op => {
                params.push(condition.value.clone());
                write!(
                    sql,
                    "{} {} ${}",
                    condition.field,
                    comparison_sql(op),
                    params.len()
                )
                .unwrap();
            }
        }
    }
}

fn comparison_sql(op: FilterOp) -> &'static str {
    match op {
        FilterOp::Eq => "=",
        FilterOp::Ne => "<>",
        FilterOp::Gt => ">",
        FilterOp::Gte => ">=",
        FilterOp::Lt => "<",
        FilterOp::Lte => "<=",
        FilterOp::Like => "LIKE",
        FilterOp::In | FilterOp::IsNull | FilterOp::IsNotNull => unreachable!(),
    }
}
