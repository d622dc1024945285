//! VacApp - command-line front end for the herd management service.
//!
//! Logs in, lists the herd with owner and health, shows a cow's disease and
//! vaccination history, and deletes history records. Everything fetched is
//! kept in the local data document so repeat views need no network.

mod app;

use std::io;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use app::App;
use vacapp_core::auth::Permission;
use vacapp_core::Config;

/// VacApp - herd management from the terminal.
#[derive(Debug, Parser)]
#[command(name = "vacapp")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Base URL of the herd service (overrides config and VACAPP_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Log in and remember the session
    Login {
        /// Username (defaults to the last one used)
        username: Option<String>,

        /// Password (prompted for when not given)
        #[arg(long, env = "VACAPP_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Forget the session
    Logout,

    /// Show the logged-in user and what they may do
    Whoami,

    /// Check one permission (e.g. `delete_vacunas`); fails when not granted
    Can { permission: Permission },

    /// List the herd (cached when possible)
    List,

    /// Show one cow with its diseases and vaccinations
    Show {
        id: i64,

        /// Fetch from the server even when cached
        #[arg(short, long)]
        refresh: bool,
    },

    /// Drop cached data and reload the herd
    Refresh,

    /// List brands and their owners
    Brands,

    /// List the disease or vaccine catalog
    Catalog {
        #[arg(value_enum)]
        kind: CatalogKind,
    },

    /// Delete disease records of a cow
    DeleteDiseases {
        cow_id: i64,
        #[arg(required = true)]
        ids: Vec<i64>,
    },

    /// Delete vaccination records of a cow
    DeleteVaccinations {
        cow_id: i64,
        #[arg(required = true)]
        ids: Vec<i64>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum CatalogKind {
    Diseases,
    Vaccines,
}

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load()?;
    if let Some(url) = cli.api_url {
        config.api_url = url;
    }

    let mut app = App::new(config, cli.json)?;

    match cli.command {
        Command::Login { username, password } => app.login(username, password).await,
        Command::Logout => {
            app.logout();
            Ok(())
        }
        Command::Whoami => app.whoami(),
        Command::Can { permission } => app.can(permission),
        Command::List => app.list().await,
        Command::Show { id, refresh } => app.show(id, refresh).await,
        Command::Refresh => app.refresh().await,
        Command::Brands => app.brands().await,
        Command::Catalog { kind } => app.catalog(kind == CatalogKind::Vaccines).await,
        Command::DeleteDiseases { cow_id, ids } => app.delete_diseases(cow_id, &ids).await,
        Command::DeleteVaccinations { cow_id, ids } => app.delete_vaccinations(cow_id, &ids).await,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    init_tracing();
    info!("VacApp starting");

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_delete_command() {
        let cli = Cli::try_parse_from(["vacapp", "delete-diseases", "7", "1", "2"]).unwrap();
        match cli.command {
            Command::DeleteDiseases { cow_id, ids } => {
                assert_eq!(cow_id, 7);
                assert_eq!(ids, vec![1, 2]);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_delete_requires_ids() {
        assert!(Cli::try_parse_from(["vacapp", "delete-vaccinations", "7"]).is_err());
    }

    #[test]
    fn test_parse_permission_argument() {
        let cli = Cli::try_parse_from(["vacapp", "can", "delete_enfermedades"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Can { permission: Permission::DeleteDiseases }
        ));
        assert!(Cli::try_parse_from(["vacapp", "can", "volar"]).is_err());
    }

    #[test]
    fn test_parse_catalog_kind() {
        let cli = Cli::try_parse_from(["vacapp", "catalog", "vaccines"]).unwrap();
        assert!(matches!(cli.command, Command::Catalog { kind: CatalogKind::Vaccines }));
        assert!(Cli::try_parse_from(["vacapp", "catalog", "cows"]).is_err());
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::try_parse_from(["vacapp", "show", "3", "--refresh", "--json"]).unwrap();
        assert!(cli.json);
        assert!(matches!(cli.command, Command::Show { id: 3, refresh: true }));
    }
}
