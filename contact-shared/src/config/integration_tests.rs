//! # Configuration Integration Tests
//!
//! Load → validate → derive, driven from real files and process variables.

#[cfg(test)]
mod tests {
    use crate::config::{
        Config, ConfigError, EnvLoader,
        env_loader::{GLOBAL_PUBLIC_ENV, GLOBAL_SECRET_ENV},
    };
    use serial_test::serial;
    use std::fs;
    use tempfile::TempDir;

    const TEST_ENV: &str = "PORT=3000\nDATABASE_USER=u\nDATABASE_PASSWORD=p\nDATABASE_NAME=db\nDATABASE_HOST=localhost\nDATABASE_TYPE=postgres\nTYPEORM_MIGRATIONS=true\nTYPEORM_SYNCHRONIZE=false";

    fn cleanup_env_vars() {
        unsafe {
            std::env::remove_var(GLOBAL_SECRET_ENV);
            std::env::remove_var(GLOBAL_PUBLIC_ENV);
        }
    }

    #[test]
    fn test_env_file_end_to_end() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("test.env"), TEST_ENV).unwrap();

        let config = Config::load(&EnvLoader::new(dir.path()), "test").unwrap();

        assert_eq!(config.port(), "3000");
        assert_eq!(config.node_env(), "development");
        assert!(config.typeorm_migrations());
        assert!(!config.typeorm_synchronize());

        let db = config.database();
        assert_eq!(db.port, 3000);
        assert!(db.migrations_run);
        assert!(db.logging);
        assert!(!db.synchronize);
        assert_eq!(db.host, "localhost");
        assert_eq!(config.listen_port().unwrap(), 3000);
    }

    #[test]
    fn environment_name_is_trimmed_before_lookup() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("test.env"), TEST_ENV).unwrap();

        let config = Config::load(&EnvLoader::new(dir.path()), " test\n").unwrap();
        assert_eq!(config.database_name(), "db");
    }

    #[test]
    fn env_file_keeps_dollar_signs_in_secrets() {
        let dir = TempDir::new().unwrap();
        let with_dollar = TEST_ENV.replace("DATABASE_PASSWORD=p", "DATABASE_PASSWORD=pa$word");
        fs::write(dir.path().join("test.env"), with_dollar).unwrap();

        let config = Config::load(&EnvLoader::new(dir.path()), "test").unwrap();
        assert_eq!(config.database_password(), "pa$word");
        assert_eq!(config.database().password, "pa$word");
    }

    #[test]
    fn env_file_with_unknown_key_fails() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("test.env"), format!("{TEST_ENV}\nFOO=bar")).unwrap();

        let err = Config::load(&EnvLoader::new(dir.path()), "test").unwrap_err();
        assert!(err.to_string().contains("\"FOO\" is not allowed"));
    }

    #[test]
    fn env_file_missing_required_field_fails() {
        let dir = TempDir::new().unwrap();
        let without_host = TEST_ENV.replace("DATABASE_HOST=localhost\n", "");
        fs::write(dir.path().join("test.env"), without_host).unwrap();

        let err = Config::load(&EnvLoader::new(dir.path()), "test").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("\"DATABASE_HOST\" is required"));
    }

    #[test]
    #[serial]
    fn json_fallback_from_process_environment() {
        cleanup_env_vars();
        unsafe {
            std::env::set_var(
                GLOBAL_SECRET_ENV,
                r#"{"DATABASE_USER":"svc","DATABASE_PASSWORD":"s3cret","PORT":"1"}"#,
            );
            std::env::set_var(
                GLOBAL_PUBLIC_ENV,
                r#"{"PORT":"8080","NODE_ENV":"production","DATABASE_NAME":"contacts","DATABASE_HOST":"db.internal","DATABASE_TYPE":"postgres","DATABASE_PORT":5432,"TYPEORM_MIGRATIONS":true,"TYPEORM_SYNCHRONIZE":"false"}"#,
            );
        }

        let dir = TempDir::new().unwrap();
        let result = Config::load(&EnvLoader::new(dir.path()), "production");
        cleanup_env_vars();

        let config = result.unwrap();
        assert_eq!(config.port(), "8080");
        assert_eq!(config.database_user(), "svc");
        assert_eq!(config.database_password(), "s3cret");

        let db = config.database();
        assert_eq!(db.port, 5432);
        assert!(db.migrations_run);
        assert!(!db.synchronize);
        assert!(!db.logging);
    }

    #[test]
    #[serial]
    fn malformed_fallback_json_aborts_loading() {
        cleanup_env_vars();
        unsafe {
            std::env::set_var(GLOBAL_SECRET_ENV, "{\"PORT\": }");
        }

        let dir = TempDir::new().unwrap();
        let result = Config::load(&EnvLoader::new(dir.path()), "production");
        cleanup_env_vars();

        assert!(matches!(result, Err(ConfigError::Json { .. })));
    }

    #[test]
    #[serial]
    fn no_file_and_no_variables_fails_validation() {
        cleanup_env_vars();
        let dir = TempDir::new().unwrap();

        let err = Config::load(&EnvLoader::new(dir.path()), "nowhere").unwrap_err();
        assert_eq!(err.field_errors().len(), 8);
    }
}
