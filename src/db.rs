use tokio_postgres::{Client, NoTls};
use tracing::error;

use crate::error::{AggregatorError, Result};

/// Opens a database connection and spawns its driver task, the way the
/// teacher's Lambda handlers did — a dropped connection future means the
/// client silently stops working, so it runs for the lifetime of the
/// process on its own task.
pub async fn connect(database_url: &str) -> Result<Client> {
    let (client, connection) = tokio_postgres::connect(database_url, NoTls)
        .await
        .map_err(AggregatorError::Database)?;

    tokio::spawn(async move {
        if let Err(error) = connection.await {
            error!(error = %error, "database connection closed with an error");
        }
    });

    Ok(client)
}
