mod config;
mod error;
mod render;
mod server;
mod ui;

use tracing::info;
use tracing_subscriber::EnvFilter;

use config::Config;
use server::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    info!("starting catpp-site");

    let config = Config::from_env()?;
    info!(
        public_dir = %config.public_dir.display(),
        content_dir = %config.content_dir.display(),
        compile_url = %config.compile_url,
        compile_timeout_ms = config.compile_timeout.as_millis(),
        "configuration loaded"
    );

    let bind_addr = config.bind_addr.clone();
    let app = server::create_router(AppState::new(config)?);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for shutdown signal");
            }
        })
        .await?;

    info!("catpp-site shut down");
    Ok(())
}
