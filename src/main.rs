use std::collections::HashMap;
use std::process;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use t1edge::cli::{execute, load_settings, Cli};
use t1edge::client::NsxClient;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .init();

    // Load .env file if specified
    if let Some(ref env_file) = cli.env_file {
        if let Err(e) = dotenvy::from_path(env_file) {
            error!("Failed to load env file {}: {}", env_file.display(), e);
            process::exit(1);
        }
    }

    let env: HashMap<String, String> = std::env::vars().collect();
    let settings = match load_settings(&cli, &env) {
        Ok(settings) => settings,
        Err(e) => {
            error!("{}", e);
            process::exit(1);
        }
    };

    let client = match NsxClient::new(&settings) {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to create API client: {}", e);
            process::exit(1);
        }
    };

    info!("Policy API: {}", client.base_url());
    if let Some(log) = client.diagnostic_log() {
        info!("Diagnostic log: {}", log.path().display());
    }

    match execute(&cli.command, cli.output, &settings, &client).await {
        Ok(output) => print!("{}", output),
        Err(e) => {
            error!("{}", e);
            process::exit(1);
        }
    }
}
