use anyhow::Context;
use clap::Parser;

use geny::cli::{Cli, Command};
use geny::{Config, logging, server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    logging::init_tracing(cli.verbose)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {e}"))?;

    let mut config =
        Config::discover(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command.unwrap_or(Command::Serve {
        host: None,
        port: None,
    }) {
        Command::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = Some(host);
            }
            if let Some(port) = port {
                config.server.port = Some(port);
            }
            server::run(config).await
        }
        Command::CheckConfig => check_config(&config),
    }
}

/// Validate that every per-request component can be constructed: provider
/// backend, prompt store, and executor. Mirrors what the chat handler does,
/// without serving.
fn check_config(config: &Config) -> anyhow::Result<()> {
    let mut failures = 0;

    match geny::backend_from_config(config) {
        Ok(_) => println!("llm: ok ({})", config.llm.provider.as_deref().unwrap_or("openai-chat")),
        Err(err) => {
            failures += 1;
            println!("llm: FAILED - {err}");
        }
    }

    match geny::SupabaseClient::new_from_config(config) {
        Ok(_) => println!("supabase: ok"),
        Err(err) => {
            failures += 1;
            println!("supabase: FAILED - {err}");
        }
    }

    println!(
        "prompt key: {} (falls back to built-in default)",
        config.supabase.prompt_key()
    );

    if failures > 0 {
        anyhow::bail!("{failures} check(s) failed");
    }
    Ok(())
}
