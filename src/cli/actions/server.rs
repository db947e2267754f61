use crate::{
    api,
    store::{PgUserStore, PoolConfig, UserStore},
};
use anyhow::Result;
use std::{sync::Arc, time::Duration};
use tracing::{debug, info};
use url::Url;

pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub db_max_connections: u32,
    pub db_acquire_timeout: Duration,
}

impl std::fmt::Debug for Args {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Args")
            .field("port", &self.port)
            .field("dsn", &redact_dsn(&self.dsn))
            .field("db_max_connections", &self.db_max_connections)
            .field("db_acquire_timeout", &self.db_acquire_timeout)
            .finish()
    }
}

/// Hide the password component of a connection string.
fn redact_dsn(dsn: &str) -> String {
    match Url::parse(dsn) {
        Ok(mut url) => {
            if url.password().is_some() {
                let _ = url.set_password(Some("***"));
            }
            url.to_string()
        }
        Err(_) => "***".to_string(),
    }
}

/// Execute the server action.
/// # Errors
/// Returns an error if the database is unreachable or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    debug!("Server args: {:?}", args);

    let pool_config = PoolConfig::default()
        .with_max_connections(args.db_max_connections)
        .with_acquire_timeout(args.db_acquire_timeout);

    // One pool for the life of the process; handlers share it through the store handle.
    let store: Arc<dyn UserStore> = Arc::new(PgUserStore::connect(&args.dsn, &pool_config).await?);

    info!("Connected to {}", redact_dsn(&args.dsn));

    api::new(args.port, store).await
}
