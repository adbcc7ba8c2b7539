mod monitorables;
mod server;

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use tileboard_core::HydrateOptions;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Config file (default: configs/tileboard.toml when present).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Listen address, overrides TILEBOARD_ADDRESS.
    #[arg(long)]
    address: Option<String>,

    /// Listen port, overrides TILEBOARD_PORT.
    #[arg(long)]
    port: Option<u16>,

    /// Also serve the faker monitorables.
    #[arg(long)]
    faker: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut settings = tileboard_config::load_settings(args.config)?;
    if let Some(address) = args.address {
        settings.core.address = address;
    }
    if let Some(port) = args.port {
        settings.core.port = port;
    }
    settings.core.faker |= args.faker;

    let store = monitorables::start(&settings)?;
    let options = HydrateOptions {
        builder_timeout: Duration::from_millis(settings.core.hydrate_timeout),
    };
    let app = server::app(store, options);

    let addr = settings.core.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Could not bind {}", addr))?;
    log::info!("Daemon: Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    log::info!("Daemon: Stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Daemon: Could not listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    log::info!("Daemon: Shutting down");
}
