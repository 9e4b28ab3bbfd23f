//! Command-line interface for the geny server binary.

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "geny-server", version, about = "Geny CRM assistant service")]
pub struct Cli {
    /// Path to a geny.toml configuration file
    #[arg(long, global = true)]
    pub config: Option<Utf8PathBuf>,

    /// Enable debug-level pipeline tracing
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP service (the default)
    Serve {
        /// Bind host, overrides [server] host
        #[arg(long)]
        host: Option<String>,

        /// Bind port, overrides [server] port
        #[arg(long)]
        port: Option<u16>,
    },
    /// Validate configuration and credentials without serving
    CheckConfig,
}
