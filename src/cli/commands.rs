//! CLI command implementations

use std::path::Path;

use serde_json::json;

use crate::app::App;
use crate::config::AppConfig;
use crate::observability::Logger;

use super::args::Command;
use super::errors::{CliError, CliResult};
use super::io::{write_error, write_response};

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
/// This is the only function that main.rs should call.
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Serve {
            config,
            seed_users,
            seed_orders,
        } => serve(&config, seed_users, seed_orders),
        Command::CheckConfig { config } => check_config(&config),
    }
}

/// Load config, optionally seed users and orders, and serve until shutdown
pub fn serve(config_path: &Path, seed_users: usize, seed_orders: usize) -> CliResult<()> {
    let config = AppConfig::load(config_path)?;
    let app = App::new(config)?;

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::boot_failed(format!("Failed to create tokio runtime: {}", e)))?;

    rt.block_on(async move {
        if seed_users > 0 {
            app.seed_users(seed_users).await?;
        }
        if seed_orders > 0 {
            app.seed_orders(seed_orders).await?;
        }
        app.run().await.map_err(|e| {
            Logger::fatal("SERVE_FAILED", &[("error", &e.to_string())]);
            CliError::from(e)
        })
    })
}

/// Validate a config file and print the effective configuration
pub fn check_config(config_path: &Path) -> CliResult<()> {
    match AppConfig::load(config_path) {
        Ok(config) => write_response(json!({
            "valid": true,
            "config": serde_json::to_value(&config)?,
        })),
        Err(e) => {
            let err = CliError::from(e);
            write_error(err.code_str(), err.message())?;
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_check_config_accepts_valid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"http_server": {{"port": 9001}}}}"#).unwrap();

        assert!(check_config(file.path()).is_ok());
    }

    #[test]
    fn test_check_config_rejects_invalid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"http_server": {{"host": ""}}}}"#).unwrap();

        let err = check_config(file.path()).unwrap_err();
        assert_eq!(err.code_str(), "TXSERVE_CLI_CONFIG_ERROR");
    }

    #[test]
    fn test_serve_fails_on_missing_config() {
        let err = serve(Path::new("/nonexistent/txserve.json"), 0, 0).unwrap_err();
        assert_eq!(err.code_str(), "TXSERVE_CLI_CONFIG_ERROR");
    }
}
