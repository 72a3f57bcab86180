#![cfg_attr(not(test), forbid(unsafe_code))]
#![warn(clippy::pedantic)]

//! Command-line entry point for the Contact API server.

use clap::{Parser, Subcommand};
use server::commands::spec::generate_spec;
use shared::config::{
    EnvLoader,
    env_loader::{DEFAULT_ENV_DIR, NODE_ENV},
    resolve_environment_name,
};
use std::error::Error;
use std::path::{Path, PathBuf};

#[cfg(test)]
#[allow(unsafe_code)]
mod main_tests;

/// Main CLI structure for the Contact API
#[derive(Debug, Parser)]
#[command(name = "contact-api")]
#[command(about = "Contact API server and tooling", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Subcommands for the Contact API CLI
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Load `{env-dir}/{env}.env`, bootstrap the database, and serve HTTP
    Serve {
        /// Environment profile name; an empty name selects `{env-dir}/.env`
        #[arg(long, env = NODE_ENV, default_value = "")]
        env: String,

        /// Directory holding the `.env` profiles
        #[arg(long, default_value = DEFAULT_ENV_DIR)]
        env_dir: PathBuf,

        /// Directory containing `migrations/` and `modules/`
        #[arg(long, default_value = ".")]
        base_dir: PathBuf,
    },
    /// Write the OpenAPI document (`json`, `yaml`, or a file path)
    Spec {
        /// Output target; YAML on stdout when omitted
        output: Option<String>,
    },
}

/// Loads and validates the configuration, then runs the server.
///
/// # Errors
/// Returns an error if configuration loading, validation, or server startup fails.
pub async fn handle_serve_command(
    env: &str,
    env_dir: PathBuf,
    base_dir: &Path,
) -> Result<(), Box<dyn Error>> {
    let environment = resolve_environment_name(Some(env));
    let loader = EnvLoader::new(env_dir);
    let config = server::server::load_config(&loader, &environment)
        .map_err(|err| -> Box<dyn Error> { err.to_string().into() })?;
    server::server::run(config, base_dir).await
}

/// Main application entry point.
///
/// # Errors
/// Returns an error if the selected command fails.
pub async fn run_app(cli: Cli) -> Result<(), Box<dyn Error>> {
    match cli.command {
        Commands::Serve {
            env,
            env_dir,
            base_dir,
        } => handle_serve_command(&env, env_dir, &base_dir).await,
        Commands::Spec { output } => generate_spec(output.as_deref()),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    run_app(Cli::parse()).await
}
