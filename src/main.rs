mod command;
mod config;
mod session;
mod transport;

use std::sync::Arc;

use clap::Parser;
use controlify_shared::frame::ClientIdentity;
use controlify_shared::handshake::Handshake;

use command::{CommandInterpreter, HandlerRegistry, ProcessRunner, ResourceLockTable};
use config::{Cli, ClientConfig, FileConfig, DEFAULT_CONFIG_PATH};
use session::SessionController;
use transport::TcpTransport;

use tracing::{debug, error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const CLIENT_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.into());
    let (file_config, file_error) = match FileConfig::read(&config_path) {
        Ok(file_config) => (file_config, None),
        Err(e) => (FileConfig::default(), Some(e)),
    };
    let config = ClientConfig::merge(&cli, file_config);

    // Initialize tracing
    let default_level = if config.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(default_level.into()))
        .init();

    if let Some(e) = file_error {
        warn!("failed to read config from {}: {e}", config_path.display());
    }

    let identity = match ClientIdentity::new(&config.unit_id, &config.api_key, &config.unit_spec) {
        Ok(identity) => identity,
        Err(e) => {
            error!("{e}");
            std::process::exit(1);
        }
    };

    info!("unit client starting: {}", identity.unit_id);
    info!("  server: {}", config.server_url);

    let (transport, events) = match TcpTransport::connect(&config.server_url).await {
        Ok(pair) => pair,
        Err(e) => {
            error!("failed to connect to {}: {e}", config.server_url);
            std::process::exit(1);
        }
    };
    info!("connected, awaiting server greeting");

    let registry = HandlerRegistry::new(&config.handlers);
    let locks = Arc::new(ResourceLockTable::new());
    let interpreter = CommandInterpreter::new(registry, locks, Arc::new(ProcessRunner));
    let handshake = Handshake::new(identity, CLIENT_VERSION);

    let mut session = SessionController::new(handshake, interpreter, Box::new(transport), events);
    let exit_code = session.run().await;

    debug!("session finished with exit code {exit_code}");
    std::process::exit(exit_code);
}
