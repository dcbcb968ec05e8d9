use bookshelf::CliArgs;
use clap::Parser;
use mongo_panache::PanacheClient;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,mongo_panache=debug")),
        )
        .init();

    let args = CliArgs::parse();
    let client = PanacheClient::connect(args.mongo_config()?).await?;

    let listener = TcpListener::bind(args.bind).await?;
    info!(bind = %listener.local_addr()?, "listening");

    let served = axum::serve(listener, bookshelf::router(client.clone()))
        .with_graceful_shutdown(shutdown_signal())
        .await;

    info!("server stopped");
    client.shutdown().await;

    served.map_err(anyhow::Error::from)
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("received Ctrl-C, shutting down"),
        Err(err) => {
            error!(%err, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    }
}
