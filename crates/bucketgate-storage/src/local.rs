use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt, stream};
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;

use crate::provider::{KeyStream, ObjectBody, ObjectStore};

/// Directory under the root holding in-flight uploads.
const STAGING_DIR: &str = ".staging";

/// Filesystem-backed store for development and tests.
///
/// Layout: `<root>/<bucket>/<key>`. Uploads are staged under
/// `<root>/.staging` and renamed into place, so readers never observe a
/// half-written object.
pub struct LocalObjectStore {
    root: PathBuf,
    bucket: String,
    name: String,
    staged: AtomicU64,
}

impl LocalObjectStore {
    pub fn new(root: &Path, bucket: &str, name: &str) -> anyhow::Result<Self> {
        if bucket.is_empty() || bucket.starts_with('.') || bucket.contains(['/', '\\']) {
            anyhow::bail!("Invalid bucket name: {bucket:?}");
        }
        std::fs::create_dir_all(root)?;
        Ok(Self {
            root: root.to_path_buf(),
            bucket: bucket.to_string(),
            name: name.to_string(),
            staged: AtomicU64::new(0),
        })
    }

    fn bucket_path(&self) -> PathBuf {
        self.root.join(&self.bucket)
    }

    fn object_path(&self, key: &str) -> anyhow::Result<PathBuf> {
        let mut path = self.bucket_path();
        for part in key.split('/') {
            let mut components = Path::new(part).components();
            match (components.next(), components.next()) {
                (Some(Component::Normal(c)), None) => path.push(c),
                _ => anyhow::bail!("Invalid object key: {key:?}"),
            }
        }
        Ok(path)
    }

    fn staging_path(&self) -> PathBuf {
        let n = self.staged.fetch_add(1, Ordering::Relaxed);
        self.root
            .join(STAGING_DIR)
            .join(format!("{}-{}", std::process::id(), n))
    }

    async fn ensure_bucket(&self) -> anyhow::Result<()> {
        if !self.bucket_exists().await? {
            anyhow::bail!("Bucket does not exist: {}", self.bucket);
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn bucket_exists(&self) -> anyhow::Result<bool> {
        match tokio::fs::metadata(self.bucket_path()).await {
            Ok(meta) => Ok(meta.is_dir()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn make_bucket(&self) -> anyhow::Result<()> {
        tokio::fs::create_dir_all(self.bucket_path()).await?;
        Ok(())
    }

    async fn put_object(&self, key: &str, mut body: ObjectBody) -> anyhow::Result<()> {
        let target = self.object_path(key)?;
        self.ensure_bucket().await?;

        let staging = self.staging_path();
        if let Some(parent) = staging.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let written = async {
            let mut file = tokio::fs::File::create(&staging).await?;
            while let Some(chunk) = body.next().await {
                file.write_all(&chunk?).await?;
            }
            file.flush().await?;
            if let Some(parent) = target.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::rename(&staging, &target).await
        }
        .await;

        if let Err(e) = written {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(e.into());
        }
        Ok(())
    }

    async fn get_object(&self, key: &str) -> anyhow::Result<ObjectBody> {
        let path = self.object_path(key)?;
        let file = match tokio::fs::File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                anyhow::bail!("The specified key does not exist: {key}")
            }
            Err(e) => return Err(e.into()),
        };
        if !file.metadata().await?.is_file() {
            anyhow::bail!("The specified key does not exist: {key}");
        }
        Ok(Box::pin(ReaderStream::new(file)))
    }

    fn list_objects(&self) -> KeyStream {
        let base = self.bucket_path();

        // Depth-first walk; each step reads one directory and yields its files.
        let dirs = stream::try_unfold(vec![base.clone()], move |mut pending| {
            let base = base.clone();
            async move {
                let Some(dir) = pending.pop() else {
                    return Ok(None);
                };
                let mut entries = tokio::fs::read_dir(&dir).await?;
                let mut keys = Vec::new();
                while let Some(entry) = entries.next_entry().await? {
                    let path = entry.path();
                    if entry.file_type().await?.is_dir() {
                        pending.push(path);
                    } else if let Ok(rel) = path.strip_prefix(&base) {
                        keys.push(Ok(key_from_relative(rel)));
                    }
                }
                Ok::<_, anyhow::Error>(Some((stream::iter(keys), pending)))
            }
        });

        Box::pin(dirs.try_flatten())
    }

    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn name(&self) -> &str {
        &self.name
    }
}

fn key_from_relative(rel: &Path) -> String {
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
