//! Tests for the command-line surface.

use crate::{Cli, Commands, run_app};
use clap::Parser;
use serial_test::serial;
use std::env;
use std::path::PathBuf;

fn parse(args: &[&str]) -> Commands {
    Cli::try_parse_from(args).unwrap().command
}

#[test]
#[serial]
fn serve_defaults_to_env_dir_and_current_directory() {
    unsafe {
        env::remove_var("NODE_ENV");
    }

    match parse(&["contact-api", "serve"]) {
        Commands::Serve {
            env,
            env_dir,
            base_dir,
        } => {
            assert_eq!(env, "");
            assert_eq!(env_dir, PathBuf::from("./env"));
            assert_eq!(base_dir, PathBuf::from("."));
        }
        Commands::Spec { .. } => panic!("expected serve"),
    }
}

#[test]
#[serial]
fn serve_reads_profile_from_node_env() {
    unsafe {
        env::set_var("NODE_ENV", "test");
    }

    let command = parse(&["contact-api", "serve"]);

    unsafe {
        env::remove_var("NODE_ENV");
    }
    assert!(matches!(command, Commands::Serve { env, .. } if env == "test"));
}

#[test]
#[serial]
fn explicit_flag_beats_node_env() {
    unsafe {
        env::set_var("NODE_ENV", "test");
    }

    let command = parse(&[
        "contact-api",
        "serve",
        "--env",
        "production",
        "--env-dir",
        "/etc/contact",
    ]);

    unsafe {
        env::remove_var("NODE_ENV");
    }
    match command {
        Commands::Serve { env, env_dir, .. } => {
            assert_eq!(env, "production");
            assert_eq!(env_dir, PathBuf::from("/etc/contact"));
        }
        Commands::Spec { .. } => panic!("expected serve"),
    }
}

#[test]
fn spec_accepts_optional_output() {
    assert!(matches!(
        parse(&["contact-api", "spec"]),
        Commands::Spec { output: None }
    ));
    assert!(matches!(
        parse(&["contact-api", "spec", "openapi.json"]),
        Commands::Spec { output: Some(path) } if path == "openapi.json"
    ));
}

#[test]
fn unknown_subcommand_is_rejected() {
    assert!(Cli::try_parse_from(["contact-api", "migrate"]).is_err());
}

#[tokio::test]
#[serial]
async fn serve_fails_fast_on_invalid_configuration() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("broken.env"), "PORT=3000\n").unwrap();
    unsafe {
        env::remove_var("GLOBAL_SECRET_ENV");
        env::remove_var("GLOBAL_PUBLIC_ENV");
    }

    let cli = Cli::try_parse_from([
        "contact-api",
        "serve",
        "--env",
        "broken",
        "--env-dir",
        dir.path().to_str().unwrap(),
    ])
    .unwrap();

    let err = run_app(cli).await.unwrap_err();
    assert!(err.to_string().starts_with("Config validation error:"));
    assert!(err.to_string().contains("\"DATABASE_USER\" is required"));
}
