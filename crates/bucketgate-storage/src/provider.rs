use std::io;
use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;

/// Object content flowing in or out of a store.
///
/// Dropping the stream releases whatever backend handle feeds it.
pub type ObjectBody = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send>>;

/// Object keys in the order the backend yields them.
pub type KeyStream = Pin<Box<dyn Stream<Item = anyhow::Result<String>> + Send>>;

/// Object-storage backend bound to a single bucket.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Check whether the bucket exists. Errors mean the backend could not answer.
    async fn bucket_exists(&self) -> anyhow::Result<bool>;

    /// Create the bucket.
    async fn make_bucket(&self) -> anyhow::Result<()>;

    /// Store the whole body under `key`, replacing any previous content.
    async fn put_object(&self, key: &str, body: ObjectBody) -> anyhow::Result<()>;

    /// Open the object for streaming. A missing key is an error.
    async fn get_object(&self, key: &str) -> anyhow::Result<ObjectBody>;

    /// Every key in the bucket, recursively.
    fn list_objects(&self) -> KeyStream;

    /// Bucket this store operates on.
    fn bucket(&self) -> &str;

    /// Backend name for display.
    fn name(&self) -> &str;
}
