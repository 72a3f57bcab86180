use log::LevelFilter;
use shared::config::DatabaseDescriptor;
use sqlx::{
    ConnectOptions,
    postgres::{PgConnectOptions, PgPool, PgPoolOptions},
};
use tracing::info;

const MAX_CONNECTIONS: u32 = 10;

/// Translates the descriptor into `sqlx` connection options.
///
/// Statement logging is enabled at `debug` only when the descriptor asks for
/// query logging.
#[must_use]
pub fn connect_options(db: &DatabaseDescriptor) -> PgConnectOptions {
    let options = PgConnectOptions::new()
        .host(&db.host)
        .port(db.port)
        .username(&db.username)
        .password(&db.password)
        .database(&db.database);

    if db.logging {
        options.log_statements(LevelFilter::Debug)
    } else {
        options.disable_statement_logging()
    }
}

/// Creates a database connection pool from the given descriptor.
///
/// # Errors
/// Returns an error if the database connection pool cannot be created.
pub async fn create_database_pool(db: &DatabaseDescriptor) -> Result<PgPool, sqlx::Error> {
    info!(database = %db.redacted_url(), "connecting to database");
    let pool = PgPoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .connect_with(connect_options(db))
        .await?;
    metrics::gauge!("db_pool_max_connections").set(f64::from(MAX_CONNECTIONS));
    Ok(pool)
}
