use ledgerrag::config::AppConfig;
use ledgerrag::infrastructure::AppContainer;
use ledgerrag::logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let config = AppConfig::from_env()?;
    logging::init_with_config(&config.logging);

    let container = AppContainer::new(config).await?;
    container.http_server().run().await
}
