use anyhow::Result;
use apistack_api::ServerConfig;
use tracing_subscriber::EnvFilter;

fn init_tracing(json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("apistack_api=info,apistack_core=info,tower_http=info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    if json {
        builder.json().try_init().map_err(|e| anyhow::anyhow!(e))?;
    } else {
        builder.try_init().map_err(|e| anyhow::anyhow!(e))?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServerConfig::from_env()?;
    init_tracing(config.log_json)?;

    if config.api_key_generated {
        tracing::warn!(api_key = %config.api_key, "APISTACK_API_KEY not set; generated a key for this run");
    }
    tracing::info!(?config, "starting");

    apistack_api::serve(config).await
}
