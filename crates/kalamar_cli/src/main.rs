//! Command-line front end for a Kalamar site.
//!
//! # Responsibility
//! - Load a site configuration and run one command against it.
//! - Print items as `key=value` pairs, one item per line.
//!
//! Optional file logging is enabled by `KALAMAR_LOG_DIR` (absolute path) and
//! tuned by `KALAMAR_LOG_LEVEL`.

use clap::{Parser, Subcommand};
use kalamar_core::{
    default_log_level, init_logging, ConfigError, Item, LoggingError, Site, SiteError,
};
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::process::ExitCode;

const LOG_DIR_ENV: &str = "KALAMAR_LOG_DIR";
const LOG_LEVEL_ENV: &str = "KALAMAR_LOG_LEVEL";

#[derive(Debug, Parser)]
#[command(name = "kalamar")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Query and edit the items of a Kalamar site")]
struct Cli {
    /// Site configuration file (TOML)
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List access points
    List,
    /// Print every item matching the query
    Search {
        access_point: String,
        /// Path query; empty matches everything
        #[arg(default_value = "")]
        query: String,
    },
    /// Print the single item matching the query
    Open { access_point: String, query: String },
    /// Remove the single item matching the query
    Remove { access_point: String, query: String },
}

#[derive(Debug)]
enum CliError {
    Logging(LoggingError),
    Config(ConfigError),
    Site(SiteError),
}

impl Display for CliError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Logging(err) => write!(f, "{err}"),
            Self::Config(err) => write!(f, "{err}"),
            Self::Site(err) => write!(f, "[{}] {err}", err.code()),
        }
    }
}

impl Error for CliError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Logging(err) => Some(err),
            Self::Config(err) => Some(err),
            Self::Site(err) => Some(err),
        }
    }
}

impl From<LoggingError> for CliError {
    fn from(value: LoggingError) -> Self {
        Self::Logging(value)
    }
}

impl From<ConfigError> for CliError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<SiteError> for CliError {
    fn from(value: SiteError) -> Self {
        Self::Site(value)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("kalamar: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    setup_logging()?;

    let site = Site::from_config_file(&cli.config)?;
    match cli.command {
        Command::List => {
            for name in site.access_point_names() {
                let ap = site.access_point(name)?;
                println!(
                    "{name} storage={} parser={} properties={}",
                    ap.store_kind(),
                    ap.codec_name().unwrap_or("none"),
                    ap.schema().properties().len()
                );
            }
        }
        Command::Search {
            access_point,
            query,
        } => {
            let mut results = site.search(&access_point, &query)?;
            let mut printed = 0usize;
            for item in results.by_ref() {
                println!("{}", render_item(&item?));
                printed += 1;
            }
            info!(
                "event=cli_search module=cli status=ok access_point={access_point} results={printed} skipped={}",
                results.skipped()
            );
        }
        Command::Open {
            access_point,
            query,
        } => {
            println!("{}", render_item(&site.open(&access_point, &query)?));
        }
        Command::Remove {
            access_point,
            query,
        } => {
            let item = site.open(&access_point, &query)?;
            site.remove(&item)?;
            println!("removed {}", render_item(&item));
        }
    }
    Ok(())
}

fn setup_logging() -> Result<(), CliError> {
    let Ok(log_dir) = std::env::var(LOG_DIR_ENV) else {
        return Ok(());
    };
    let level = std::env::var(LOG_LEVEL_ENV).unwrap_or_else(|_| default_log_level().to_string());
    init_logging(&level, log_dir)?;
    Ok(())
}

/// `genre=jazz / titre=nuages / _content=<12 bytes>` in schema order.
fn render_item(item: &Item) -> String {
    item.schema()
        .properties()
        .iter()
        .filter_map(|def| item.get(&def.name).map(|value| format!("{}={value}", def.name)))
        .collect::<Vec<_>>()
        .join(" / ")
}

#[cfg(test)]
mod tests {
    use super::{Cli, Command};
    use clap::error::ErrorKind;
    use clap::{CommandFactory, Parser};
    use std::path::Path;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn search_query_is_optional() {
        let cli = Cli::try_parse_from(["kalamar", "site.toml", "search", "music"]).unwrap();
        assert_eq!(cli.config, Path::new("site.toml"));
        match cli.command {
            Command::Search {
                access_point,
                query,
            } => {
                assert_eq!(access_point, "music");
                assert!(query.is_empty());
            }
            other => panic!("expected a search command, got {other:?}"),
        }
    }

    #[test]
    fn open_requires_query() {
        let err = Cli::try_parse_from(["kalamar", "site.toml", "open", "music"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);

        let cli =
            Cli::try_parse_from(["kalamar", "site.toml", "remove", "music", "rock/amen"]).unwrap();
        match cli.command {
            Command::Remove {
                access_point,
                query,
            } => {
                assert_eq!(access_point, "music");
                assert_eq!(query, "rock/amen");
            }
            other => panic!("expected a remove command, got {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_commands_and_extra_arguments() {
        let err = Cli::try_parse_from(["kalamar", "site.toml", "play", "music"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidSubcommand);

        let err = Cli::try_parse_from(["kalamar", "site.toml", "list", "music"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownArgument);

        assert!(Cli::try_parse_from(["kalamar", "site.toml"]).is_err());
    }
}
