//! Startup readiness: wait for the backend, then make sure the bucket exists.
//!
//! The bucket existence check is the first network round trip, so it doubles
//! as the connectivity check and is the only step retried. Creating a missing
//! bucket is attempted once.

use thiserror::Error;

use bucketgate_core::types::RetryPolicy;

use crate::provider::ObjectStore;

#[derive(Debug, Error)]
pub enum ReadinessError {
    #[error("storage backend not ready after {attempts} attempts: {last_error:#}")]
    Exhausted {
        attempts: u32,
        last_error: anyhow::Error,
    },

    #[error("failed to create bucket '{bucket}': {reason:#}")]
    CreateBucket {
        bucket: String,
        reason: anyhow::Error,
    },
}

/// What readiness found on the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketState {
    Created,
    AlreadyExists,
}

pub struct Readiness {
    policy: RetryPolicy,
}

impl Readiness {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Block until the backend answers and the bucket exists.
    ///
    /// With [`MaxAttempts::Unlimited`](bucketgate_core::types::MaxAttempts)
    /// this never returns while the backend stays unreachable.
    pub async fn ensure(&self, store: &dyn ObjectStore) -> Result<BucketState, ReadinessError> {
        let bucket = store.bucket();
        let mut attempt: u32 = 0;

        let exists = loop {
            attempt = attempt.saturating_add(1);
            match store.bucket_exists().await {
                Ok(exists) => break exists,
                Err(e) if self.policy.max_attempts.is_last(attempt) => {
                    tracing::error!(
                        backend = store.name(),
                        bucket = %bucket,
                        attempts = attempt,
                        error = %e,
                        "storage backend never became ready"
                    );
                    return Err(ReadinessError::Exhausted {
                        attempts: attempt,
                        last_error: e,
                    });
                }
                Err(e) => {
                    tracing::info!(
                        backend = store.name(),
                        attempt,
                        max_attempts = %self.policy.max_attempts,
                        error = %e,
                        "Waiting for storage backend, retrying in {}s",
                        self.policy.interval.as_secs_f64()
                    );
                    tokio::time::sleep(self.policy.interval).await;
                }
            }
        };

        tracing::info!(backend = store.name(), attempts = attempt, "Connected to storage backend");

        if exists {
            tracing::info!(bucket = %bucket, "Bucket already exists");
            return Ok(BucketState::AlreadyExists);
        }

        store
            .make_bucket()
            .await
            .map_err(|reason| ReadinessError::CreateBucket {
                bucket: bucket.to_string(),
                reason,
            })?;
        tracing::info!(bucket = %bucket, "Created bucket");
        Ok(BucketState::Created)
    }
}
