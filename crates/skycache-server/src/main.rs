use anyhow::Result;
use skycache_core::{Config, ConfigError};
use skycache_server::{build_service, run, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    skycache_core::init()?;

    let (config, _validation) = match Config::load_validated() {
        Ok(loaded) => loaded,
        Err(e) => {
            if let Some(config_err) = e.downcast_ref::<ConfigError>() {
                tracing::error!("{}", config_err.user_message());
            }
            return Err(e);
        }
    };
    tracing::info!("SkyCache v{} starting", env!("CARGO_PKG_VERSION"));

    let service = build_service(&config).await?;
    run(&config.server, AppState::new(service)).await
}
