use std::io;
use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{HeaderValue, header};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use futures::{StreamExt, TryStreamExt, stream};
use crate::error::ApiError;
use crate::state::AppState;

/// Query pairs in request order. A repeated `key` is not an error; the first
/// occurrence wins.
type QueryPairs = Query<Vec<(String, String)>>;

fn require_key(pairs: Vec<(String, String)>) -> Result<String, ApiError> {
    pairs
        .into_iter()
        .find(|(name, _)| name == "key")
        .map(|(_, value)| value)
        .filter(|key| !key.is_empty())
        .ok_or(ApiError::MissingKey)
}

/// ANY /upload?key=name  (raw body, any length)
pub async fn upload(
    State(state): State<Arc<AppState>>,
    Query(pairs): QueryPairs,
    body: Body,
) -> Result<String, ApiError> {
    let key = require_key(pairs)?;
    let started = Instant::now();
    tracing::info!(key = %key, "upload started");

    let data = body.into_data_stream().map_err(io::Error::other);
    state
        .store
        .put_object(&key, Box::pin(data))
        .await
        .map_err(|e| {
            tracing::error!(
                key = %key,
                error = %e,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "upload failed"
            );
            ApiError::Upload(e)
        })?;

    tracing::info!(
        key = %key,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "upload complete"
    );
    Ok(format!("Uploaded {key} successfully\n"))
}

/// ANY /download?key=name
///
/// The backend stream lives inside the response body; hyper drops it when the
/// copy finishes, fails, or the client goes away.
pub async fn download(
    State(state): State<Arc<AppState>>,
    Query(pairs): QueryPairs,
) -> Result<Response, ApiError> {
    let key = require_key(pairs)?;
    tracing::info!(key = %key, "download started");

    let object = state.store.get_object(&key).await.map_err(|e| {
        tracing::error!(key = %key, error = %e, "download failed");
        ApiError::Download(e)
    })?;

    Ok((
        [(header::CONTENT_DISPOSITION, HeaderValue::from_static("inline"))],
        Body::from_stream(object),
    )
        .into_response())
}

/// ANY /list  (one key per line, backend order)
///
/// Only a failure on the first item can still change the status code. Later
/// failures abort the body after the lines already sent.
pub async fn list(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let mut keys = state.store.list_objects();

    let first = match keys.next().await {
        Some(Err(e)) => {
            tracing::error!(error = %e, "list failed");
            return Err(ApiError::List(e));
        }
        first => first,
    };

    let lines = stream::iter(first)
        .chain(keys)
        .map_ok(|key| Bytes::from(format!("{key}\n")))
        .inspect_err(|e| tracing::error!(error = %e, "list aborted mid-stream"));

    Ok((
        [(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        )],
        Body::from_stream(lines),
    )
        .into_response())
}
