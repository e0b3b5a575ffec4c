// Rust guideline compliant 2026-07-20

//! MySQL-wire adapter for the `ServerLink` / `Connector` ports via `sqlx`.
//!
//! Statements go through `sqlx::raw_sql`, i.e. the unprepared text protocol,
//! which is what MySQL-compatible search engines expect. Authentication is
//! nominal: such engines accept any credentials on their SQL port.

use domain::{Connector, LinkError, ServerLink};
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection, MySqlRow};
use sqlx::{Connection as _, ConnectOptions as _, Row as _};

/// `Connector` adapter holding the endpoint options.
#[derive(Debug, Clone)]
pub struct MysqlConnector {
    options: MySqlConnectOptions,
}

impl MysqlConnector {
    /// Connector for the SQL endpoint at `host:port`.
    #[must_use]
    pub fn new(host: &str, port: u16) -> Self {
        let options = MySqlConnectOptions::new()
            .host(host)
            .port(port)
            .username("root")
            // Per-statement logging would swamp a load run.
            .disable_statement_logging();
        Self { options }
    }
}

impl Connector for MysqlConnector {
    type Link = MysqlLink;

    async fn connect(&self) -> Result<MysqlLink, LinkError> {
        let conn = MySqlConnection::connect_with(&self.options)
            .await
            .map_err(|e| LinkError::Connect {
                message: e.to_string(),
            })?;
        Ok(MysqlLink { conn })
    }
}

/// One persistent server connection.
#[derive(Debug)]
pub struct MysqlLink {
    conn: MySqlConnection,
}

impl ServerLink for MysqlLink {
    async fn execute(&mut self, statement: &str) -> Result<u64, LinkError> {
        let conn: &mut MySqlConnection = &mut self.conn;
        let done = Box::pin(sqlx::raw_sql(statement).execute(conn))
            .await
            .map_err(|e| LinkError::Query {
                message: e.to_string(),
            })?;
        Ok(done.rows_affected())
    }

    async fn key_values(&mut self, statement: &str) -> Result<Vec<(String, String)>, LinkError> {
        let conn: &mut MySqlConnection = &mut self.conn;
        let rows = Box::pin(sqlx::raw_sql(statement).fetch_all(conn))
            .await
            .map_err(|e| LinkError::Query {
                message: e.to_string(),
            })?;
        Ok(rows
            .iter()
            .map(|row| {
                // First and last column: two-column tables give key/value,
                // SHOW WARNINGS (Level, Code, Message) gives level/message.
                let last = row.len().saturating_sub(1);
                (column_text(row, 0), column_text(row, last))
            })
            .collect())
    }

    async fn close(self) -> Result<(), LinkError> {
        self.conn.close().await.map_err(|e| LinkError::Query {
            message: e.to_string(),
        })
    }
}

/// Read one column as text, tolerating integer-typed status values.
fn column_text(row: &MySqlRow, index: usize) -> String {
    row.try_get::<String, _>(index)
        .or_else(|_| row.try_get::<i64, _>(index).map(|v| v.to_string()))
        .or_else(|_| row.try_get::<u64, _>(index).map(|v| v.to_string()))
        .unwrap_or_default()
}
