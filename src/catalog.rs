//! PostgreSQL access: catalog introspection, version lookup and execution.
//!
//! Every operation opens its own short-lived connection through
//! [`PgDatabase::within`], which closes the client and waits for the
//! connection driver to finish on every path, success or failure. Nothing is
//! pooled or shared between operations.

use async_trait::async_trait;
use tokio_postgres::{Client, NoTls, SimpleQueryMessage};
use tracing::{debug, info, warn};

use crate::{
    config::DatabaseSettings,
    error::{AppError, AppResult, database_error},
    executor::{RowSet, StatementResult, StatementRunner, execute_statements},
    gate::ValidationGate,
    schema::{ColumnDescriptor, SchemaDescription}
};

/// Column catalog for the default visible schema, in table then column order
pub const SCHEMA_QUERY: &str = "
    SELECT table_name::text, column_name::text, data_type::text, is_nullable::text
    FROM information_schema.columns
    WHERE table_schema = 'public'
    ORDER BY table_name, ordinal_position";

/// Server version lookup
pub const VERSION_QUERY: &str = "SHOW server_version";

/// The database operations the pipeline needs.
///
/// [`PgDatabase`] is the real implementation; tests provide in-memory ones.
#[async_trait(?Send)]
pub trait Database {
    /// Server version string, e.g. `16.2`
    async fn server_version(&self) -> AppResult<String>;

    /// Tables and columns of the `public` schema
    async fn describe_schema(&self) -> AppResult<SchemaDescription>;

    /// Gate and run every statement in `sql` on one connection
    ///
    /// `emit` is called for each finished statement before the next starts.
    async fn execute(
        &self,
        sql: &str,
        gate: &ValidationGate,
        emit: &mut dyn for<'r> FnMut(&'r StatementResult)
    ) -> AppResult<Vec<StatementResult>>;
}

/// Connection factory for a single PostgreSQL database.
pub struct PgDatabase {
    config: tokio_postgres::Config
}

impl PgDatabase {
    pub fn new(settings: &DatabaseSettings) -> Self {
        Self {
            config: settings.pg_config()
        }
    }

    /// Open a connection, run `work` on it and release it
    ///
    /// The connection is released after `work` finishes whatever its outcome,
    /// and the result of `work` is returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns error if the connection cannot be established, or whatever
    /// `work` returned.
    pub async fn within<T>(
        &self,
        purpose: &str,
        work: impl AsyncFnOnce(&Client) -> AppResult<T>
    ) -> AppResult<T> {
        let (client, connection) = self
            .config
            .connect(NoTls)
            .await
            .map_err(|e| database_error("Failed to connect to the database", e))?;
        let driver = tokio::spawn(async move {
            if let Err(e) = connection.await {
                warn!(error = %e, "postgres connection error");
            }
        });
        info!(purpose, "connected to the database");

        let result = work(&client).await;

        drop(client);
        if let Err(e) = driver.await {
            warn!(error = %e, "connection task did not finish cleanly");
        }
        info!(purpose, "database connection closed");
        result
    }
}

#[async_trait(?Send)]
impl Database for PgDatabase {
    async fn server_version(&self) -> AppResult<String> {
        let version = self
            .within("server version", async |client| fetch_server_version(client).await)
            .await?;
        info!(%version, "PostgreSQL version");
        Ok(version)
    }

    async fn describe_schema(&self) -> AppResult<SchemaDescription> {
        self.within("schema introspection", async |client| load_schema(client).await)
            .await
    }

    async fn execute(
        &self,
        sql: &str,
        gate: &ValidationGate,
        emit: &mut dyn for<'r> FnMut(&'r StatementResult)
    ) -> AppResult<Vec<StatementResult>> {
        self.within("query execution", async |client| {
            execute_statements(&PgRunner(client), sql, gate, |result| emit(result)).await
        })
        .await
    }
}

/// Runs statements over the simple query protocol so every column type comes
/// back as text.
struct PgRunner<'a>(&'a Client);

#[async_trait]
impl StatementRunner for PgRunner<'_> {
    async fn run(&self, statement: &str) -> AppResult<RowSet> {
        let messages = self
            .0
            .simple_query(statement)
            .await
            .map_err(|e| database_error("Error executing SQL query", e))?;
        Ok(collect_rows(messages))
    }
}

/// Fold simple-query messages into a [`RowSet`]
fn collect_rows(messages: Vec<SimpleQueryMessage>) -> RowSet {
    let mut rows = RowSet::default();
    for message in messages {
        match message {
            SimpleQueryMessage::RowDescription(columns) => {
                rows.columns = columns.iter().map(|c| c.name().to_string()).collect();
            }
            SimpleQueryMessage::Row(row) => {
                if rows.columns.is_empty() {
                    rows.columns = row
                        .columns()
                        .iter()
                        .map(|c| c.name().to_string())
                        .collect();
                }
                let values = (0..row.len())
                    .map(|i| row.get(i).map(str::to_string))
                    .collect();
                rows.rows.push(values);
            }
            SimpleQueryMessage::CommandComplete(count) => {
                debug!(count, "command complete");
            }
            _ => {}
        }
    }
    rows
}

/// Read the server version with `SHOW server_version`
pub async fn fetch_server_version(client: &Client) -> AppResult<String> {
    let messages = client
        .simple_query(VERSION_QUERY)
        .await
        .map_err(|e| database_error("Error fetching PostgreSQL version", e))?;
    collect_rows(messages)
        .rows
        .into_iter()
        .next()
        .and_then(|row| row.into_iter().next().flatten())
        .ok_or_else(|| AppError::service("Server did not report a PostgreSQL version"))
}

/// Introspect `information_schema.columns` into a [`SchemaDescription`]
pub async fn load_schema(client: &Client) -> AppResult<SchemaDescription> {
    let rows = client
        .query(SCHEMA_QUERY, &[])
        .await
        .map_err(|e| database_error("Error fetching schema from the database", e))?;
    let mut schema = SchemaDescription::default();
    for row in rows {
        let table: String = row
            .try_get(0)
            .map_err(|e| database_error("Unexpected catalog row", e))?;
        let column: String = row
            .try_get(1)
            .map_err(|e| database_error("Unexpected catalog row", e))?;
        let data_type: String = row
            .try_get(2)
            .map_err(|e| database_error("Unexpected catalog row", e))?;
        let is_nullable: String = row
            .try_get(3)
            .map_err(|e| database_error("Unexpected catalog row", e))?;
        schema.push_column(
            table,
            ColumnDescriptor::new(column, data_type, is_nullable != "NO")
        );
    }
    debug!(tables = schema.tables.len(), "schema loaded");
    Ok(schema)
}
