//! `StoreSession` implementation for PostgreSQL.

use async_trait::async_trait;
use sqlx::Postgres;
use sqlx::pool::PoolConnection;
use sqlx::postgres::PgArguments;
use sqlx::query::Query;
use tracing::debug;

use roster_core::error::ErrorKind;
use roster_core::traits::StoreSession;
use roster_core::types::{Row, Statement, Value};
use roster_core::{KernelError, KernelResult};

use super::decode::decode_row;
use crate::statement::render;

/// A session over one pooled PostgreSQL connection.
///
/// Statements are rendered to `$n`-parameterized SQL; row locks requested
/// via `FOR UPDATE` are held by the database until the transaction ends.
/// Dropping the session mid-transaction returns the connection to the
/// pool, where the server rolls the open transaction back.
#[derive(Debug)]
pub struct PgSession {
    conn: PoolConnection<Postgres>,
    in_tx: bool,
}

impl PgSession {
    pub(crate) fn new(conn: PoolConnection<Postgres>) -> Self {
        Self { conn, in_tx: false }
    }

    async fn run_control(&mut self, sql: &'static str) -> KernelResult<()> {
        sqlx::query(sql)
            .execute(&mut *self.conn)
            .await
            .map_err(|e| {
                KernelError::with_source(ErrorKind::Store, format!("Failed to run {sql}"), e)
            })?;
        Ok(())
    }
}

fn bind_value<'q>(
    query: Query<'q, Postgres, PgArguments>,
    value: Value,
) -> Query<'q, Postgres, PgArguments> {
    match value {
        Value::Null => query.bind(Option::<String>::None),
        Value::Bool(v) => query.bind(v),
        Value::Int(v) => query.bind(v),
        Value::Float(v) => query.bind(v),
        Value::Timestamp(v) => query.bind(v),
        Value::Text(v) => query.bind(v),
        // List parameters are flattened by the renderer.
        Value::List(_) => query.bind(Option::<String>::None),
    }
}

#[async_trait]
impl StoreSession for PgSession {
    async fn execute(&mut self, statement: &Statement) -> KernelResult<Vec<Row>> {
        let (sql, params) = render(statement);
        debug!(sql = %sql, "execute");
        let mut query = sqlx::query(&sql);
        for param in params {
            query = bind_value(query, param);
        }
        let rows = query.fetch_all(&mut *self.conn).await.map_err(|e| {
            KernelError::with_source(ErrorKind::Store, format!("Statement failed: {sql}"), e)
        })?;
        rows.iter().map(decode_row).collect()
    }

    async fn execute_scalar(&mut self, statement: &Statement) -> KernelResult<i64> {
        let (sql, params) = render(statement);
        debug!(sql = %sql, "execute_scalar");
        let mut query = sqlx::query_scalar::<_, i64>(&sql);
        for param in params {
            query = match param {
                Value::Null => query.bind(Option::<String>::None),
                Value::Bool(v) => query.bind(v),
                Value::Int(v) => query.bind(v),
                Value::Float(v) => query.bind(v),
                Value::Timestamp(v) => query.bind(v),
                Value::Text(v) => query.bind(v),
                Value::List(_) => query.bind(Option::<String>::None),
            };
        }
        query.fetch_one(&mut *self.conn).await.map_err(|e| {
            KernelError::with_source(ErrorKind::Store, format!("Statement failed: {sql}"), e)
        })
    }

    async fn execute_update(&mut self, statement: &Statement) -> KernelResult<u64> {
        let (sql, params) = render(statement);
        debug!(sql = %sql, "execute_update");
        let mut query = sqlx::query(&sql);
        for param in params {
            query = bind_value(query, param);
        }
        let result = query.execute(&mut *self.conn).await.map_err(|e| {
            KernelError::with_source(ErrorKind::Store, format!("Statement failed: {sql}"), e)
        })?;
        Ok(result.rows_affected())
    }

    async fn begin(&mut self) -> KernelResult<()> {
        if self.in_tx {
            return Err(KernelError::store("Transaction already active"));
        }
        self.run_control("BEGIN").await?;
        self.in_tx = true;
        Ok(())
    }

    async fn commit(&mut self) -> KernelResult<()> {
        if !self.in_tx {
            return Err(KernelError::store("No transaction to commit"));
        }
        self.run_control("COMMIT").await?;
        self.in_tx = false;
        Ok(())
    }

    async fn rollback(&mut self) -> KernelResult<()> {
        if !self.in_tx {
            return Err(KernelError::store("No transaction to roll back"));
        }
        self.run_control("ROLLBACK").await?;
        self.in_tx = false;
        Ok(())
    }

    fn in_transaction(&self) -> bool {
        self.in_tx
    }
}
