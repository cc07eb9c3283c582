//! tran-probe — entry point.
//!
//! ```text
//! tran-probe PING                     Send "PING" using tran-probe.toml
//! tran-probe --config <path> STATUS   Load a custom config TOML
//! tran-probe --host h --port p PING   Override the configured server
//! tran-probe --gen-config             Write default config to stdout
//! ```

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use tran_core::TranError;
use tran_probe::config::ProbeConfig;
use tran_probe::probe;

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "tran-probe", about = "Send one request to a line-protocol server")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "tran-probe.toml")]
    config: PathBuf,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,

    /// Override the configured server host.
    #[arg(long)]
    host: Option<String>,

    /// Override the configured server port.
    #[arg(long)]
    port: Option<u16>,

    /// Request payload; multiple words are joined with spaces.
    #[arg(required_unless_present = "gen_config")]
    payload: Vec<String>,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // --gen-config: dump defaults and exit.
    if cli.gen_config {
        let text = toml::to_string_pretty(&ProbeConfig::default())?;
        println!("{text}");
        return Ok(ExitCode::SUCCESS);
    }

    let mut config = ProbeConfig::load(&cli.config);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Some(host) = cli.host {
        config.client.host = host;
    }
    if let Some(port) = cli.port {
        config.client.port = port;
    }

    let client = config.client.to_client();
    info!(
        tls = config.client.enable_tls,
        "tran-probe v{} → {}",
        env!("CARGO_PKG_VERSION"),
        client.address()
    );

    let payload = cli.payload.join(" ");
    let result = probe::exchange(&client, payload.as_bytes()).await;

    let mut stdout = std::io::stdout().lock();
    match result {
        Ok(resp) => {
            stdout.write_all(&resp)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            // Partial or error payloads are still worth showing.
            if let Some(partial) = e.partial() {
                stdout.write_all(partial)?;
            }
            error!("{e}");
            Ok(match e {
                TranError::ServerExecute { .. } => ExitCode::from(2),
                _ => ExitCode::FAILURE,
            })
        }
    }
}
