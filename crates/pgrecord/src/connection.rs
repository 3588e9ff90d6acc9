//! The process-wide database connection.

use crate::client::GenericClient;
use crate::config::DbConfig;
use crate::error::{OrmError, OrmResult};
use tokio_postgres::types::ToSql;
use tokio_postgres::{NoTls, Row};

/// An open connection to the server.
///
/// Created once at startup and passed by reference to every table and record
/// operation. The driver task runs on the Tokio runtime until the connection
/// is dropped.
pub struct Connection {
    client: tokio_postgres::Client,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl Connection {
    /// Connect eagerly; a bad host, bad credentials or a missing database is
    /// reported here.
    pub async fn connect(config: &DbConfig) -> OrmResult<Self> {
        config.validate()?;
        let (client, connection) = config
            .to_pg_config()
            .connect(NoTls)
            .await
            .map_err(|e| OrmError::Connection(e.to_string()))?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!(error = %e, "database connection closed with an error");
            }
        });

        tracing::info!(
            host = %config.host,
            port = config.port,
            dbname = %config.dbname,
            "connected to database"
        );
        Ok(Self { client })
    }

    /// [`Connection::connect`], terminating the process on failure.
    ///
    /// Prints `Database connection has failed : <reason>` and exits with
    /// status 1.
    pub async fn connect_or_exit(config: &DbConfig) -> Self {
        match Self::connect(config).await {
            Ok(conn) => conn,
            Err(e) => {
                tracing::error!(error = %e, "database connection failed");
                eprintln!("Database connection has failed : {e}");
                std::process::exit(1);
            }
        }
    }

    pub fn client(&self) -> &tokio_postgres::Client {
        &self.client
    }

    pub fn is_closed(&self) -> bool {
        self.client.is_closed()
    }
}

impl GenericClient for Connection {
    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> OrmResult<Vec<Row>> {
        GenericClient::query(&self.client, sql, params).await
    }

    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> OrmResult<u64> {
        GenericClient::execute(&self.client, sql, params).await
    }
}
