use std::fmt;

use serde::Serialize;

use super::database::DatabaseDescriptor;
use super::env_loader::{EnvLoader, EnvProfile};
use super::error::{ConfigError, Constraint, FieldError};

/// Runtime mode used when `NODE_ENV` is absent.
pub const DEFAULT_NODE_ENV: &str = "development";

/// `DATABASE_PORT` fallback.
///
/// This is a placeholder carried over from the service's historical schema; it
/// is unrelated to `PORT` and to any PostgreSQL default. Deployments are
/// expected to set `DATABASE_PORT` explicitly.
pub const DEFAULT_DATABASE_PORT: u16 = 3000;

const LOG_FORMATS: &[&str] = &["text", "json"];

/// Output format of the tracing subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Validated, immutable configuration for the Contact API.
///
/// Built once at startup through [`Config::from_profile`] and then shared by
/// reference (`Arc<Config>`); no field changes after construction.
#[derive(Clone, PartialEq, Eq)]
pub struct Config {
    port: String,
    node_env: String,
    database_port: u16,
    database_user: String,
    database_password: String,
    database_name: String,
    database_host: String,
    database_type: String,
    typeorm_migrations: bool,
    typeorm_synchronize: bool,
    log_format: LogFormat,
}

impl Config {
    /// Loads the profile for `environment` and validates it.
    ///
    /// # Errors
    /// Returns [`ConfigError`] if loading or validation fails.
    pub fn load(loader: &EnvLoader, environment: &str) -> Result<Self, ConfigError> {
        Self::from_profile(loader.load(environment)?)
    }

    /// Validates `profile` against the configuration schema.
    ///
    /// Every violation is reported, not just the first one.
    ///
    /// # Errors
    /// Returns [`ConfigError::Validation`] naming each failing field.
    pub fn from_profile(profile: EnvProfile) -> Result<Self, ConfigError> {
        let mut check = SchemaCheck::new(profile);

        let config = Self {
            port: check.required("PORT"),
            node_env: check.optional("NODE_ENV", DEFAULT_NODE_ENV),
            database_port: check.port("DATABASE_PORT", DEFAULT_DATABASE_PORT),
            database_user: check.required("DATABASE_USER"),
            database_password: check.required("DATABASE_PASSWORD"),
            database_name: check.required("DATABASE_NAME"),
            database_host: check.required("DATABASE_HOST"),
            database_type: check.required("DATABASE_TYPE"),
            typeorm_migrations: check.flag("TYPEORM_MIGRATIONS"),
            typeorm_synchronize: check.flag("TYPEORM_SYNCHRONIZE"),
            log_format: check.log_format("LOG_FORMAT"),
        };

        check.finish()?;
        Ok(config)
    }

    #[must_use]
    pub fn port(&self) -> &str {
        &self.port
    }

    /// Port the HTTP server binds to, parsed from `PORT`.
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidListenPort`] if `PORT` is not a number in
    /// the `u16` range.
    pub fn listen_port(&self) -> Result<u16, ConfigError> {
        self.port
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidListenPort {
                value: self.port.clone(),
            })
    }

    #[must_use]
    pub fn node_env(&self) -> &str {
        &self.node_env
    }

    #[must_use]
    pub fn is_development(&self) -> bool {
        self.node_env == DEFAULT_NODE_ENV
    }

    #[must_use]
    pub fn database_port(&self) -> u16 {
        self.database_port
    }

    #[must_use]
    pub fn database_user(&self) -> &str {
        &self.database_user
    }

    #[must_use]
    pub fn database_password(&self) -> &str {
        &self.database_password
    }

    #[must_use]
    pub fn database_name(&self) -> &str {
        &self.database_name
    }

    #[must_use]
    pub fn database_host(&self) -> &str {
        &self.database_host
    }

    #[must_use]
    pub fn database_type(&self) -> &str {
        &self.database_type
    }

    #[must_use]
    pub fn typeorm_migrations(&self) -> bool {
        self.typeorm_migrations
    }

    #[must_use]
    pub fn typeorm_synchronize(&self) -> bool {
        self.typeorm_synchronize
    }

    #[must_use]
    pub fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Assembles the database descriptor. Recomputed on every call.
    #[must_use]
    pub fn database(&self) -> DatabaseDescriptor {
        DatabaseDescriptor::from_config(self)
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("port", &self.port)
            .field("node_env", &self.node_env)
            .field("database_port", &self.database_port)
            .field("database_user", &self.database_user)
            .field("database_password", &"<redacted>")
            .field("database_name", &self.database_name)
            .field("database_host", &self.database_host)
            .field("database_type", &self.database_type)
            .field("typeorm_migrations", &self.typeorm_migrations)
            .field("typeorm_synchronize", &self.typeorm_synchronize)
            .field("log_format", &self.log_format)
            .finish()
    }
}

/// Only the literal `"true"` is truthy.
#[must_use]
pub fn is_true(value: &str) -> bool {
    value == "true"
}

/// Consumes an [`EnvProfile`] field by field, recording violations.
struct SchemaCheck {
    profile: EnvProfile,
    errors: Vec<FieldError>,
}

impl SchemaCheck {
    fn new(profile: EnvProfile) -> Self {
        Self {
            profile,
            errors: Vec::new(),
        }
    }

    fn fail(&mut self, field: &'static str, constraint: Constraint) {
        self.errors.push(FieldError::new(field, constraint));
    }

    fn required(&mut self, field: &'static str) -> String {
        match self.profile.take(field) {
            None => {
                self.fail(field, Constraint::Required);
                String::new()
            }
            Some(value) if value.is_empty() => {
                self.fail(field, Constraint::Empty);
                value
            }
            Some(value) => value,
        }
    }

    fn optional(&mut self, field: &'static str, default: &str) -> String {
        match self.profile.take(field) {
            None => default.to_string(),
            Some(value) if value.is_empty() => {
                self.fail(field, Constraint::Empty);
                value
            }
            Some(value) => value,
        }
    }

    fn port(&mut self, field: &'static str, default: u16) -> u16 {
        let Some(raw) = self.profile.take(field) else {
            return default;
        };
        raw.trim().parse().unwrap_or_else(|_| {
            self.fail(field, Constraint::Port);
            default
        })
    }

    fn flag(&mut self, field: &'static str) -> bool {
        if let Some(value) = self.profile.take(field) {
            is_true(&value)
        } else {
            self.fail(field, Constraint::Required);
            false
        }
    }

    fn log_format(&mut self, field: &'static str) -> LogFormat {
        match self.profile.take(field).as_deref() {
            None | Some("text") => LogFormat::Text,
            Some("json") => LogFormat::Json,
            Some(_) => {
                self.fail(field, Constraint::OneOf(LOG_FORMATS));
                LogFormat::Text
            }
        }
    }

    fn finish(mut self) -> Result<(), ConfigError> {
        let unknown: Vec<String> = self.profile.keys().map(str::to_string).collect();
        for key in unknown {
            self.errors.push(FieldError::new(key, Constraint::NotAllowed));
        }

        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(self.errors))
        }
    }
}
