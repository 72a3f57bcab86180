//! # Environment Loader
//!
//! Produces the raw key/value [`EnvProfile`] for an environment name. The
//! profile file `{env_dir}/{name}.env` wins when it exists; otherwise the two
//! JSON blobs held in `GLOBAL_SECRET_ENV` and `GLOBAL_PUBLIC_ENV` are merged,
//! public keys overriding secret ones.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::{env, fmt, fs};

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, info};

use super::error::ConfigError;

/// Directory searched for `{profile}.env` files.
pub const DEFAULT_ENV_DIR: &str = "./env";
/// Fallback variable holding secret values as a JSON object.
pub const GLOBAL_SECRET_ENV: &str = "GLOBAL_SECRET_ENV";
/// Fallback variable holding public values as a JSON object.
pub const GLOBAL_PUBLIC_ENV: &str = "GLOBAL_PUBLIC_ENV";
/// Variable naming the active environment profile.
pub const NODE_ENV: &str = "NODE_ENV";

/// Unvalidated key/value configuration.
///
/// Values are never printed by the `Debug` implementation since the secret
/// fallback blob ends up here.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct EnvProfile {
    values: BTreeMap<String, String>,
}

impl EnvProfile {
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub(crate) fn take(&mut self, key: &str) -> Option<String> {
        self.values.remove(key)
    }

    /// Overlays `other` on top of `self`; keys present in both take `other`'s value.
    fn overlay(&mut self, other: EnvProfile) {
        self.values.extend(other.values);
    }
}

impl fmt::Debug for EnvProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvProfile")
            .field("keys", &self.values.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for EnvProfile {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}

/// Locates and reads environment profiles.
#[derive(Debug, Clone)]
pub struct EnvLoader {
    env_dir: PathBuf,
    secret_var: String,
    public_var: String,
}

impl Default for EnvLoader {
    fn default() -> Self {
        Self::new(DEFAULT_ENV_DIR)
    }
}

impl EnvLoader {
    pub fn new(env_dir: impl Into<PathBuf>) -> Self {
        Self {
            env_dir: env_dir.into(),
            secret_var: GLOBAL_SECRET_ENV.to_string(),
            public_var: GLOBAL_PUBLIC_ENV.to_string(),
        }
    }

    /// Overrides the names of the JSON fallback variables.
    #[must_use]
    pub fn with_fallback_vars(
        mut self,
        secret_var: impl Into<String>,
        public_var: impl Into<String>,
    ) -> Self {
        self.secret_var = secret_var.into();
        self.public_var = public_var.into();
        self
    }

    #[must_use]
    pub fn env_dir(&self) -> &Path {
        &self.env_dir
    }

    /// Path of the profile file for `environment`, e.g. `./env/test.env`.
    #[must_use]
    pub fn profile_path(&self, environment: &str) -> PathBuf {
        self.env_dir.join(format!("{}.env", environment.trim()))
    }

    /// Loads the profile, reading fallback variables from the process environment.
    ///
    /// # Errors
    /// Returns [`ConfigError`] when the profile file cannot be parsed or a
    /// fallback variable holds malformed JSON.
    pub fn load(&self, environment: &str) -> Result<EnvProfile, ConfigError> {
        self.load_with(environment, |name| env::var(name).ok())
    }

    /// Loads the profile, resolving fallback variables through `lookup`.
    ///
    /// # Errors
    /// Same as [`EnvLoader::load`].
    pub fn load_with<F>(&self, environment: &str, lookup: F) -> Result<EnvProfile, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let path = self.profile_path(environment);
        info!(environment = environment.trim(), "loading environment profile");

        if path.is_file() {
            let profile = read_profile_file(&path)?;
            info!(path = %path.display(), keys = profile.len(), "loaded environment file");
            return Ok(profile);
        }

        debug!(
            path = %path.display(),
            "environment file not found, falling back to JSON variables"
        );
        let mut profile = parse_json_mapping(&self.secret_var, lookup(&self.secret_var))?;
        let public = parse_json_mapping(&self.public_var, lookup(&self.public_var))?;
        profile.overlay(public);

        info!(
            secret_var = %self.secret_var,
            public_var = %self.public_var,
            keys = profile.len(),
            "loaded environment from JSON variables"
        );
        Ok(profile)
    }
}

/// Normalizes the raw `NODE_ENV` value into a profile name.
///
/// An unset variable maps to the empty name, i.e. the `{env_dir}/.env` file.
#[must_use]
pub fn resolve_environment_name(raw: Option<&str>) -> String {
    raw.map(str::trim).unwrap_or_default().to_string()
}

/// `KEY=VALUE` with an optional value; keys are `[A-Za-z0-9_.-]`.
static PROFILE_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([A-Za-z0-9_.-]+)\s*=\s*(.*)?\s*$").expect("profile line pattern is valid")
});

fn read_profile_file(path: &Path) -> Result<EnvProfile, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::EnvFile {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_profile(&content))
}

/// Parses profile file content.
///
/// Values are taken literally: no `$VAR` expansion. Lines that are not
/// `KEY=VALUE` (comments included) are skipped. A value wrapped in matching
/// single or double quotes loses the quotes; double quotes also turn `\n`
/// into a newline. Unquoted values are trimmed. A repeated key keeps the last
/// value.
fn parse_profile(content: &str) -> EnvProfile {
    content
        .split(['\n', '\r'])
        .filter_map(|line| {
            let captures = PROFILE_LINE.captures(line)?;
            let key = captures.get(1)?.as_str();
            let raw = captures.get(2).map_or("", |value| value.as_str());
            Some((key, unquote(raw)))
        })
        .collect()
}

fn unquote(raw: &str) -> String {
    let quoted_with = |quote: char| {
        raw.len() >= 2 && raw.starts_with(quote) && raw.ends_with(quote)
    };

    if quoted_with('"') {
        raw[1..raw.len() - 1].replace("\\n", "\n")
    } else if quoted_with('\'') {
        raw[1..raw.len() - 1].to_string()
    } else {
        raw.trim().to_string()
    }
}

fn parse_json_mapping(var: &str, raw: Option<String>) -> Result<EnvProfile, ConfigError> {
    let raw = match raw {
        Some(raw) if !raw.is_empty() => raw,
        _ => return Ok(EnvProfile::default()),
    };

    let value: Value = serde_json::from_str(&raw).map_err(|source| ConfigError::Json {
        var: var.to_string(),
        source,
    })?;

    let Value::Object(map) = value else {
        return Err(ConfigError::NotAnObject {
            var: var.to_string(),
        });
    };

    map.into_iter()
        .map(|(key, value)| {
            let value = match value {
                Value::String(s) => s,
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                Value::Null | Value::Array(_) | Value::Object(_) => {
                    return Err(ConfigError::NonScalarJson {
                        var: var.to_string(),
                        key,
                    });
                }
            };
            Ok((key, value))
        })
        .collect()
}
