use std::sync::Arc;

use bucketgate_core::config::Settings;
use bucketgate_storage::provider::ObjectStore;
use bucketgate_storage::readiness::Readiness;
use bucketgate_storage::s3::S3ObjectStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("bucketgate=info".parse()?),
        )
        .init();

    // A missing .env is normal in containers; the environment still applies.
    if let Err(e) = dotenvy::dotenv() {
        tracing::info!("No .env file loaded: {e}");
    }

    let settings = Settings::load()?;
    tracing::info!(
        endpoint = %settings.storage.endpoint,
        bucket = %settings.storage.bucket,
        region = %settings.storage.region,
        "Configuration loaded"
    );

    let store = S3ObjectStore::from_settings(&settings.storage)?;

    let readiness = Readiness::new(settings.readiness.policy());
    tracing::info!(
        max_attempts = %readiness.policy().max_attempts,
        interval_secs = readiness.policy().interval.as_secs(),
        "Waiting for storage backend"
    );
    readiness.ensure(&store).await?;

    let store: Arc<dyn ObjectStore> = Arc::new(store);
    bucketgate_web::serve(&settings.server.listen_addr, store).await
}
