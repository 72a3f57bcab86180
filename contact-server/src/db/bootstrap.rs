use std::collections::HashSet;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use shared::config::DatabaseDescriptor;
use sqlx::PgPool;
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

const MODULES_DIR: &str = "modules";
const MIGRATIONS_DIR: &str = "migrations";
const ENTITY_SUFFIX: &str = ".entity.sql";

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("failed to read directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("database error executing {path}: {source}")]
    Sql {
        path: PathBuf,
        #[source]
        source: sqlx::Error,
    },
    #[error("invalid migrations table name {0:?}")]
    InvalidTableName(String),
    #[error("failed to update migrations table: {0}")]
    Bookkeeping(#[source] sqlx::Error),
}

/// What a bootstrap pass changed.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BootstrapReport {
    pub entities_synchronized: usize,
    pub migrations_applied: Vec<String>,
}

/// Applies the schema policy carried by the descriptor.
///
/// Entity scripts run first when `synchronize` is set, then pending migrations
/// when `migrations_run` is set.
///
/// # Errors
/// Returns [`BootstrapError`] if a script cannot be read or fails to execute.
pub async fn run(
    pool: &PgPool,
    db: &DatabaseDescriptor,
    base_dir: &Path,
) -> Result<BootstrapReport, BootstrapError> {
    let mut report = BootstrapReport::default();

    if db.synchronize {
        let scripts = discover_entity_scripts(base_dir)?;
        info!(count = scripts.len(), "synchronizing entity definitions");
        for path in &scripts {
            apply_script(pool, path).await?;
        }
        report.entities_synchronized = scripts.len();
    } else {
        debug!("schema synchronization disabled");
    }

    if db.migrations_run {
        report.migrations_applied = run_migrations(pool, db, base_dir).await?;
    } else {
        debug!("migrations disabled");
    }

    Ok(report)
}

/// Simple liveness check used during startup.
///
/// # Errors
/// Returns the underlying `sqlx` error when the database is unreachable.
pub async fn ensure_liveness(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await.map(|_| ())
}

/// Readiness probe backing `/readyz`.
///
/// # Errors
/// Returns the underlying `sqlx` error when the database cannot serve queries.
pub async fn ensure_readiness(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(pool)
        .await
        .map(|_| ())
}

/// Entity scripts matching `modules/*/*.entity.sql`, sorted by path.
///
/// # Errors
/// Returns [`BootstrapError::ReadDir`] if a directory cannot be listed.
pub fn discover_entity_scripts(base_dir: &Path) -> Result<Vec<PathBuf>, BootstrapError> {
    let modules = base_dir.join(MODULES_DIR);
    if !modules.is_dir() {
        warn!(path = %modules.display(), "entity directory not found");
        return Ok(Vec::new());
    }

    let mut scripts = Vec::new();
    for module in read_dir(&modules)? {
        if !module.is_dir() {
            continue;
        }
        for path in read_dir(&module)? {
            let is_entity = path
                .file_name()
                .and_then(OsStr::to_str)
                .is_some_and(|name| name.ends_with(ENTITY_SUFFIX));
            if path.is_file() && is_entity {
                scripts.push(path);
            }
        }
    }

    scripts.sort();
    Ok(scripts)
}

/// Migration scripts matching `migrations/**/*.sql`, ordered by file name.
///
/// # Errors
/// Returns [`BootstrapError::ReadDir`] if the tree cannot be walked.
pub fn discover_migration_scripts(base_dir: &Path) -> Result<Vec<PathBuf>, BootstrapError> {
    let root = base_dir.join(MIGRATIONS_DIR);
    if !root.is_dir() {
        warn!(path = %root.display(), "migrations directory not found");
        return Ok(Vec::new());
    }

    let mut scripts = Vec::new();
    for entry in WalkDir::new(&root) {
        let entry = entry.map_err(|err| BootstrapError::ReadDir {
            path: err.path().map_or_else(|| root.clone(), Path::to_path_buf),
            source: err.into(),
        })?;
        let path = entry.path();
        if entry.file_type().is_file() && has_sql_extension(path) {
            scripts.push(path.to_path_buf());
        }
    }

    scripts.sort_by(|a, b| a.file_name().cmp(&b.file_name()).then_with(|| a.cmp(b)));
    Ok(scripts)
}

/// Name recorded in the migrations table: the path below `migrations/`.
fn migration_name(base_dir: &Path, path: &Path) -> String {
    let root = base_dir.join(MIGRATIONS_DIR);
    path.strip_prefix(&root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

async fn run_migrations(
    pool: &PgPool,
    db: &DatabaseDescriptor,
    base_dir: &Path,
) -> Result<Vec<String>, BootstrapError> {
    let table = db.migrations_table_name.as_str();
    if !is_valid_identifier(table) {
        return Err(BootstrapError::InvalidTableName(table.to_string()));
    }

    sqlx::raw_sql(&format!(
        "CREATE TABLE IF NOT EXISTS {table} (\
            id SERIAL PRIMARY KEY, \
            name TEXT NOT NULL UNIQUE, \
            applied_at TIMESTAMPTZ NOT NULL DEFAULT now())"
    ))
    .execute(pool)
    .await
    .map_err(BootstrapError::Bookkeeping)?;

    let applied: HashSet<String> =
        sqlx::query_scalar::<_, String>(&format!("SELECT name FROM {table}"))
            .fetch_all(pool)
            .await
            .map_err(BootstrapError::Bookkeeping)?
            .into_iter()
            .collect();

    let insert = format!("INSERT INTO {table} (name) VALUES ($1)");
    let mut newly_applied = Vec::new();

    for path in discover_migration_scripts(base_dir)? {
        let name = migration_name(base_dir, &path);
        if applied.contains(&name) {
            debug!(migration = %name, "migration already applied");
            continue;
        }

        let sql = read_script(&path)?;
        let sql_error = |source: sqlx::Error| BootstrapError::Sql {
            path: path.clone(),
            source,
        };

        let mut transaction = pool.begin().await.map_err(sql_error)?;
        info!(migration = %name, "applying migration");
        sqlx::raw_sql(&sql)
            .execute(&mut *transaction)
            .await
            .map_err(sql_error)?;
        sqlx::query(&insert)
            .bind(&name)
            .execute(&mut *transaction)
            .await
            .map_err(BootstrapError::Bookkeeping)?;
        transaction.commit().await.map_err(sql_error)?;

        newly_applied.push(name);
    }

    info!(count = newly_applied.len(), "migrations complete");
    Ok(newly_applied)
}

fn read_dir(dir: &Path) -> Result<Vec<PathBuf>, BootstrapError> {
    let to_error = |source: std::io::Error| BootstrapError::ReadDir {
        path: dir.to_path_buf(),
        source,
    };
    fs::read_dir(dir)
        .map_err(to_error)?
        .map(|entry| entry.map(|e| e.path()).map_err(to_error))
        .collect()
}

fn has_sql_extension(path: &Path) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .is_some_and(|ext| ext.eq_ignore_ascii_case("sql"))
}

fn read_script(path: &Path) -> Result<String, BootstrapError> {
    fs::read_to_string(path).map_err(|source| BootstrapError::ReadFile {
        path: path.to_path_buf(),
        source,
    })
}

async fn apply_script(pool: &PgPool, path: &Path) -> Result<(), BootstrapError> {
    let sql = read_script(path)?;

    let trimmed = sql.trim();
    if trimmed.is_empty() {
        warn!(path = %path.display(), "skipping empty script");
        return Ok(());
    }

    let sql_error = |source: sqlx::Error| BootstrapError::Sql {
        path: path.to_path_buf(),
        source,
    };

    let mut transaction = pool.begin().await.map_err(sql_error)?;

    info!(script = %path.display(), "executing entity script");
    sqlx::raw_sql(trimmed)
        .execute(&mut *transaction)
        .await
        .map_err(sql_error)?;

    transaction.commit().await.map_err(sql_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn touch(path: &Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, "SELECT 1;").unwrap();
    }

    #[test]
    fn collects_migrations_recursively_in_file_name_order() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("migrations");
        touch(&root.join("002_second.sql"));
        touch(&root.join("2024/001_first.sql"));
        touch(&root.join("2024/003_third.SQL"));
        touch(&root.join("notes.txt"));

        let files = discover_migration_scripts(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|path| migration_name(dir.path(), path))
            .collect();

        assert_eq!(
            names,
            vec!["2024/001_first.sql", "002_second.sql", "2024/003_third.SQL"]
        );
    }

    #[test]
    fn collects_entity_scripts_one_level_below_modules() {
        let dir = tempdir().unwrap();
        let modules = dir.path().join("modules");
        touch(&modules.join("contact/contact.entity.sql"));
        touch(&modules.join("address/address.entity.sql"));
        touch(&modules.join("address/seed.sql"));
        touch(&modules.join("top.entity.sql"));
        touch(&modules.join("nested/deeper/deep.entity.sql"));

        let files = discover_entity_scripts(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|path| path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();

        assert_eq!(names, vec!["address.entity.sql", "contact.entity.sql"]);
    }

    #[test]
    fn missing_directories_yield_no_scripts() {
        let dir = tempdir().unwrap();
        assert!(discover_entity_scripts(dir.path()).unwrap().is_empty());
        assert!(discover_migration_scripts(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn table_names_must_be_plain_identifiers() {
        assert!(is_valid_identifier("migrations"));
        assert!(is_valid_identifier("_schema_history2"));
        assert!(!is_valid_identifier(""));
        assert!(!is_valid_identifier("2fast"));
        assert!(!is_valid_identifier("migrations; DROP TABLE contacts"));
    }
}
