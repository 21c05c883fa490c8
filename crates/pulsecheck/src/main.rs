use pulsecheck::prelude::*;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), PulsecheckError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from_env()?;
    tracing::info!(
        bind = %config.bind_addr,
        origin = config.allowed_origin.as_deref().unwrap_or("*"),
        "starting pulsecheck"
    );

    let server = PulsecheckServer::builder().config(config).build().await?;
    server.run().await
}
