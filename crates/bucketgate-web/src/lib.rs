mod error;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use bucketgate_storage::provider::ObjectStore;

pub use error::ApiError;
pub use routes::build_router;
pub use state::AppState;

/// Serve the object routes on `listen_addr` until the listener fails.
///
/// The store must already be ready; no request is accepted before this is called.
pub async fn serve(listen_addr: &str, store: Arc<dyn ObjectStore>) -> anyhow::Result<()> {
    let state = Arc::new(AppState::new(store));
    let app = build_router(state);

    let addr: SocketAddr = listen_addr.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Server running on http://{addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
