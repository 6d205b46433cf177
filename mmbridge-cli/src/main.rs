//! CLI for the mmbridge control-application bridge.

#![allow(
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::missing_docs_in_private_items
)]

mod bridge;
mod inspect;

use std::path::PathBuf;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use mmbridge::BridgeConfig;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(
    name = "mmbridge",
    version,
    about = "Message bridge between a device-control application and scripts"
)]
struct Cli {
    /// Configuration file [default: <config dir>/mmbridge/config.json].
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Host to bind or connect to.
    #[arg(long, global = true)]
    host: Option<String>,

    /// TCP port (overrides $MMBRIDGE_PORT).
    #[arg(short = 'p', long, global = true)]
    port: Option<u16>,

    /// Log at debug level (RUST_LOG takes precedence).
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a loopback bridge server.
    ///
    /// COMMAND requests are echoed back; CLASSDEF requests are answered with
    /// the message schema table.
    Serve,

    /// Send a COMMAND message and print the reply.
    Send {
        /// Command text.
        command: String,
        /// Output format.
        #[arg(long, default_value = "table")]
        format: OutputFormat,
    },

    /// Send a CLASSDEF message and print the reply.
    Classdef {
        /// API description to send.
        api: String,
        /// Output format.
        #[arg(long, default_value = "table")]
        format: OutputFormat,
    },

    /// Handshake with a server and report its protocol version.
    Ping,

    /// List message kinds and their field schemas.
    Schema {
        /// Output format.
        #[arg(long, default_value = "table")]
        format: OutputFormat,
    },

    /// Validate wire documents from a file or stdin.
    Decode {
        /// Input file; `-` or absent reads stdin.
        path: Option<PathBuf>,
        /// Input is a sequence of length-prefixed frames.
        #[arg(long)]
        framed: bool,
        /// Output format.
        #[arg(long, default_value = "table")]
        format: OutputFormat,
    },

    /// Show or create the configuration file.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completion scripts.
    #[command(hide = true)]
    Completion {
        /// Target shell.
        shell: Shell,
    },
}

/// Subcommands for `mmbridge config`.
#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration as JSON.
    Show,
    /// Print the default configuration file path.
    Path,
    /// Write the effective configuration to the configuration file.
    Init {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

/// Output format for printed envelopes and tables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub(crate) enum OutputFormat {
    /// Human-readable table.
    #[default]
    Table,
    /// Machine-readable JSON.
    Json,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    if let Err(e) = cli.dispatch().await {
        eprintln!("mmbridge: {e:#}");
        std::process::exit(1);
    }
}

/// Installs the stderr log subscriber.
fn init_tracing(verbose: bool) {
    let filter = if verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .without_time()
                .with_writer(std::io::stderr),
        )
        .init();
}

impl Cli {
    async fn dispatch(self) -> Result<()> {
        match self.command {
            Command::Serve => bridge::serve(&self.resolve()?).await,
            Command::Send { ref command, format } => {
                bridge::send_command(&self.resolve()?, command, format).await
            }
            Command::Classdef { ref api, format } => {
                bridge::send_class_def(&self.resolve()?, api, format).await
            }
            Command::Ping => bridge::ping(&self.resolve()?).await,
            Command::Schema { format } => inspect::schema(format),
            Command::Decode {
                ref path,
                framed,
                format,
            } => inspect::decode(path.as_deref(), framed, format),
            Command::Config { ref action } => match action {
                ConfigAction::Show => inspect::config_show(&self.resolve()?),
                ConfigAction::Path => inspect::config_path(self.config.as_deref()),
                ConfigAction::Init { force } => {
                    inspect::config_init(&self.resolve()?, self.config.as_deref(), *force)
                }
            },
            Command::Completion { shell } => {
                clap_complete::generate(
                    shell,
                    &mut Self::command(),
                    "mmbridge",
                    &mut std::io::stdout(),
                );
                Ok(())
            }
        }
    }

    /// Effective configuration: file, then `$MMBRIDGE_PORT`, then flags.
    fn resolve(&self) -> Result<BridgeConfig> {
        let mut config = BridgeConfig::discover(self.config.as_deref())?;
        if let Some(host) = &self.host {
            config.host.clone_from(host);
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn flags_override_the_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("config.json");
        std::fs::write(&file, r#"{"host": "10.0.0.2", "port": 5000}"#).unwrap();
        let path = file.to_str().unwrap();

        let cli = Cli::parse_from(["mmbridge", "--config", path, "ping"]);
        let config = cli.resolve().unwrap();
        assert_eq!(config.host, "10.0.0.2");

        let cli = Cli::parse_from(["mmbridge", "ping", "--config", path, "--host", "localhost"]);
        let config = cli.resolve().unwrap();
        assert_eq!(config.host, "localhost");
    }

    #[test]
    fn format_defaults_to_table() {
        let cli = Cli::parse_from(["mmbridge", "schema"]);
        assert!(matches!(
            cli.command,
            Command::Schema {
                format: OutputFormat::Table
            }
        ));
        let cli = Cli::parse_from(["mmbridge", "send", "snap", "--format", "json"]);
        assert!(matches!(
            cli.command,
            Command::Send {
                format: OutputFormat::Json,
                ..
            }
        ));
    }
}
