//! Database connection management.
//!
//! A migration run owns exactly one connection; there is no pool.

use crate::error::{MigrationError, Result};
use sqlx::{AnyConnection, Connection};
use std::time::Duration;

/// Default connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Open a connection, failing with `Timeout` when the server does not answer
/// within `timeout`.
pub async fn connect(url: &str, timeout: Duration) -> Result<AnyConnection> {
    if url.trim().is_empty() {
        return Err(MigrationError::config("Connection string is required"));
    }
    sqlx::any::install_default_drivers();

    tracing::debug!(url = %redact_url(url), timeout = ?timeout, "Connecting");

    match tokio::time::timeout(timeout, AnyConnection::connect(url)).await {
        Ok(Ok(conn)) => Ok(conn),
        Ok(Err(sqlx::Error::Configuration(e))) => Err(MigrationError::Config(e.to_string())),
        Ok(Err(e)) => Err(MigrationError::Connection(e.to_string())),
        Err(_) => Err(MigrationError::Timeout(format!(
            "Could not connect within {}s",
            timeout.as_secs()
        ))),
    }
}

/// Test the connection.
pub async fn ping(conn: &mut AnyConnection) -> Result<()> {
    conn.ping()
        .await
        .map_err(|e| MigrationError::Connection(e.to_string()))
}

/// Connection string with the password masked, for logs and output.
#[must_use]
pub fn redact_url(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    let Some((credentials, host)) = rest.rsplit_once('@') else {
        return url.to_string();
    };
    match credentials.split_once(':') {
        Some((user, _)) => format!("{scheme}://{user}:****@{host}"),
        None => url.to_string(),
    }
}
