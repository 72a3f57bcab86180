//! # Database descriptor
//!
//! Connection parameters and schema policy derived from [`Config`]. The server
//! turns this into a `sqlx` pool and uses the discovery globs to find entity
//! and migration scripts.

use std::fmt;

use serde::Serialize;

use super::server::Config;

/// Relational engine every descriptor targets.
pub const DATABASE_ENGINE: &str = "postgres";
/// Entity definition scripts, relative to the application base directory.
pub const ENTITIES_GLOB: &str = "modules/*/*.entity.sql";
/// Migration scripts, relative to the application base directory.
pub const MIGRATIONS_GLOB: &str = "migrations/**/*.sql";
/// Bookkeeping table recording applied migrations.
pub const MIGRATIONS_TABLE: &str = "migrations";

/// Column naming convention applied to entity properties.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NamingStrategy {
    #[default]
    SnakeCase,
}

/// Connection and policy settings handed to the database layer.
#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseDescriptor {
    #[serde(rename = "type")]
    pub engine: &'static str,
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database: String,
    pub subscribers: Vec<String>,
    pub migrations_run: bool,
    pub logging: bool,
    pub naming_strategy: NamingStrategy,
    pub auto_load_entities: bool,
    pub synchronize: bool,
    pub entities: Vec<String>,
    pub migrations: Vec<String>,
    pub migrations_table_name: String,
}

impl DatabaseDescriptor {
    pub(crate) fn from_config(config: &Config) -> Self {
        Self {
            engine: DATABASE_ENGINE,
            host: config.database_host().to_string(),
            port: config.database_port(),
            username: config.database_user().to_string(),
            password: config.database_password().to_string(),
            database: config.database_name().to_string(),
            subscribers: Vec::new(),
            migrations_run: config.typeorm_migrations(),
            logging: config.is_development(),
            naming_strategy: NamingStrategy::SnakeCase,
            auto_load_entities: true,
            synchronize: config.typeorm_synchronize(),
            entities: vec![ENTITIES_GLOB.to_string()],
            migrations: vec![MIGRATIONS_GLOB.to_string()],
            migrations_table_name: MIGRATIONS_TABLE.to_string(),
        }
    }

    /// Connection URL with the password masked, for logs.
    #[must_use]
    pub fn redacted_url(&self) -> String {
        format!(
            "{}://{}:***@{}:{}/{}",
            self.engine, self.username, self.host, self.port, self.database
        )
    }
}

impl fmt::Debug for DatabaseDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseDescriptor")
            .field("type", &self.engine)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .field("migrations_run", &self.migrations_run)
            .field("logging", &self.logging)
            .field("naming_strategy", &self.naming_strategy)
            .field("synchronize", &self.synchronize)
            .field("entities", &self.entities)
            .field("migrations", &self.migrations)
            .field("migrations_table_name", &self.migrations_table_name)
            .finish_non_exhaustive()
    }
}
