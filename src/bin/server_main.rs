//! Process entry point: parses CLI flags (falling back to env vars via
//! `clap`'s `env` feature), loads configuration, wires the logging
//! subscriber, and serves the gateway until shutdown.

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "ccr-gateway", about = "Reverse-proxy gateway for AI inference providers")]
struct Cli {
    /// Path to a TOML config file. Defaults to ./ccr-gateway.toml.
    #[arg(long, env = "CCR_GATEWAY_CONFIG")]
    config: Option<PathBuf>,

    /// Bind host, overriding the config file.
    #[arg(long, env = "CCR_GATEWAY_HOST")]
    host: Option<String>,

    /// Bind port, overriding the config file.
    #[arg(long, env = "CCR_GATEWAY_PORT")]
    port: Option<u16>,

    /// Bearer token clients must present. Unset disables the check.
    #[arg(long, env = "CCR_FORWARD_TOKEN")]
    forward_token: Option<String>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    ccr_gateway::config::init(cli.config.as_deref());
    if cli.host.is_some() || cli.port.is_some() || cli.forward_token.is_some() {
        ccr_gateway::config::override_from_cli(cli.host, cli.port, cli.forward_token);
    }

    ccr_gateway::logger::init();

    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("shutdown signal received");
    };

    tokio::select! {
        _ = ccr_gateway::server::serve() => {}
        _ = shutdown => {}
    }
}
