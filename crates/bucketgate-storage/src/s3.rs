#[cfg(feature = "s3")]
mod inner {
    use async_trait::async_trait;
    use aws_config::{BehaviorVersion, Region, SdkConfig};
    use aws_sdk_s3::Client;
    use aws_sdk_s3::config::Credentials;
    use aws_sdk_s3::error::DisplayErrorContext;
    use aws_sdk_s3::primitives::ByteStream;
    use aws_sdk_s3::types::{
        BucketLocationConstraint, CompletedMultipartUpload, CompletedPart,
        CreateBucketConfiguration,
    };
    use bytes::{Bytes, BytesMut};
    use futures::{StreamExt, TryStreamExt, stream};
    use tokio_util::io::ReaderStream;

    use bucketgate_core::config::StorageSettings;

    use crate::provider::{KeyStream, ObjectBody, ObjectStore};

    /// Part size for uploads of unknown length. Bodies that fit in one part
    /// go out as a single `PutObject`.
    pub const PART_SIZE: usize = 5 * 1024 * 1024;

    const DEFAULT_REGION: &str = "us-east-1";

    /// S3-compatible storage (MinIO, AWS S3, Garage, Ceph RGW, ...).
    pub struct S3ObjectStore {
        client: Client,
        bucket: String,
        region: String,
        name: String,
    }

    /// Client config for the configured endpoint: static credentials and
    /// path-style addressing. Nothing is read from `AWS_*` variables or
    /// profile files.
    pub fn client_config(settings: &StorageSettings) -> anyhow::Result<aws_sdk_s3::config::Builder> {
        let endpoint = settings.endpoint_url()?;
        let shared = SdkConfig::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(settings.region.clone()))
            .build();
        let credentials = Credentials::new(
            &settings.access_key,
            &settings.secret_key,
            None,
            None,
            "bucketgate-settings",
        );
        Ok(aws_sdk_s3::config::Builder::from(&shared)
            .credentials_provider(credentials)
            .endpoint_url(endpoint)
            .force_path_style(true))
    }

    impl S3ObjectStore {
        /// No network I/O happens here; the first request is the readiness check.
        pub fn from_settings(settings: &StorageSettings) -> anyhow::Result<Self> {
            let config = client_config(settings)?.build();
            Ok(Self::from_client_config(config, &settings.bucket))
        }

        pub fn from_client_config(config: aws_sdk_s3::Config, bucket: &str) -> Self {
            let region = config
                .region()
                .map(|r| r.to_string())
                .unwrap_or_else(|| DEFAULT_REGION.to_string());
            Self {
                client: Client::from_conf(config),
                bucket: bucket.to_string(),
                region,
                name: "s3".to_string(),
            }
        }

        async fn put_multipart(
            &self,
            key: &str,
            first: Bytes,
            parts: &mut PartReader<'_>,
        ) -> anyhow::Result<()> {
            let upload = self
                .client
                .create_multipart_upload()
                .bucket(&self.bucket)
                .key(key)
                .send()
                .await
                .map_err(describe)?;
            let upload_id = upload
                .upload_id
                .ok_or_else(|| anyhow::anyhow!("backend returned no upload id for {key}"))?;

            let result = match self.upload_parts(key, &upload_id, first, parts).await {
                Ok(completed) => self.complete_multipart(key, &upload_id, completed).await,
                Err(e) => Err(e),
            };

            if let Err(e) = &result {
                tracing::warn!(key = %key, upload_id = %upload_id, error = %e, "aborting multipart upload");
                if let Err(abort_err) = self
                    .client
                    .abort_multipart_upload()
                    .bucket(&self.bucket)
                    .key(key)
                    .upload_id(&upload_id)
                    .send()
                    .await
                {
                    tracing::error!(
                        key = %key,
                        upload_id = %upload_id,
                        error = %DisplayErrorContext(abort_err),
                        "abort_multipart_upload failed"
                    );
                }
            }
            result
        }

        async fn upload_parts(
            &self,
            key: &str,
            upload_id: &str,
            first: Bytes,
            parts: &mut PartReader<'_>,
        ) -> anyhow::Result<Vec<CompletedPart>> {
            let mut completed = Vec::new();
            let mut part_number: i32 = 1;
            let mut next = Some(first);
            while let Some(chunk) = next {
                let part = self
                    .client
                    .upload_part()
                    .bucket(&self.bucket)
                    .key(key)
                    .upload_id(upload_id)
                    .part_number(part_number)
                    .body(ByteStream::from(chunk))
                    .send()
                    .await
                    .map_err(describe)?;
                completed.push(
                    CompletedPart::builder()
                        .set_e_tag(part.e_tag)
                        .part_number(part_number)
                        .build(),
                );
                part_number += 1;
                next = parts.next_part().await?;
            }
            Ok(completed)
        }

        async fn complete_multipart(
            &self,
            key: &str,
            upload_id: &str,
            parts: Vec<CompletedPart>,
        ) -> anyhow::Result<()> {
            let count = parts.len();
            let multipart = CompletedMultipartUpload::builder()
                .set_parts(Some(parts))
                .build();
            self.client
                .complete_multipart_upload()
                .bucket(&self.bucket)
                .key(key)
                .upload_id(upload_id)
                .multipart_upload(multipart)
                .send()
                .await
                .map_err(describe)?;
            tracing::debug!(key = %key, parts = count, "multipart upload complete");
            Ok(())
        }
    }

    /// Cuts a body of unknown length into `PART_SIZE` parts; only the last
    /// part may be shorter.
    struct PartReader<'a> {
        body: &'a mut ObjectBody,
        buf: BytesMut,
        done: bool,
    }

    impl<'a> PartReader<'a> {
        fn new(body: &'a mut ObjectBody) -> Self {
            Self {
                body,
                buf: BytesMut::new(),
                done: false,
            }
        }

        async fn next_part(&mut self) -> std::io::Result<Option<Bytes>> {
            if !self.done {
                self.done = fill(self.body, &mut self.buf).await?;
            }
            if self.buf.is_empty() {
                return Ok(None);
            }
            let len = self.buf.len().min(PART_SIZE);
            Ok(Some(self.buf.split_to(len).freeze()))
        }

        /// The body has ended and every byte has been handed out.
        fn is_finished(&self) -> bool {
            self.done && self.buf.is_empty()
        }
    }

    /// Pull from `body` until `buf` holds at least one part or the body ends.
    /// Returns `true` once the body is exhausted.
    async fn fill(body: &mut ObjectBody, buf: &mut BytesMut) -> std::io::Result<bool> {
        while buf.len() < PART_SIZE {
            match body.next().await {
                Some(chunk) => buf.extend_from_slice(&chunk?),
                None => return Ok(true),
            }
        }
        Ok(false)
    }

    /// SDK errors print only their top level by default.
    fn describe<E: std::error::Error>(err: E) -> anyhow::Error {
        anyhow::anyhow!("{}", DisplayErrorContext(err))
    }

    #[async_trait]
    impl ObjectStore for S3ObjectStore {
        async fn bucket_exists(&self) -> anyhow::Result<bool> {
            match self.client.head_bucket().bucket(&self.bucket).send().await {
                Ok(_) => Ok(true),
                Err(err) => {
                    let not_found = err.as_service_error().is_some_and(|e| e.is_not_found())
                        || err
                            .raw_response()
                            .is_some_and(|r| r.status().as_u16() == 404);
                    if not_found {
                        Ok(false)
                    } else {
                        Err(describe(err))
                    }
                }
            }
        }

        async fn make_bucket(&self) -> anyhow::Result<()> {
            let mut req = self.client.create_bucket().bucket(&self.bucket);
            if self.region != DEFAULT_REGION {
                req = req.create_bucket_configuration(
                    CreateBucketConfiguration::builder()
                        .location_constraint(BucketLocationConstraint::from(
                            self.region.as_str(),
                        ))
                        .build(),
                );
            }
            req.send().await.map_err(describe)?;
            Ok(())
        }

        async fn put_object(&self, key: &str, mut body: ObjectBody) -> anyhow::Result<()> {
            let mut parts = PartReader::new(&mut body);
            let first = parts.next_part().await?.unwrap_or_default();
            if !parts.is_finished() {
                return self.put_multipart(key, first, &mut parts).await;
            }

            let size = first.len();
            self.client
                .put_object()
                .bucket(&self.bucket)
                .key(key)
                .body(ByteStream::from(first))
                .send()
                .await
                .map_err(describe)?;
            tracing::debug!(key = %key, size_bytes = size, "put_object complete");
            Ok(())
        }

        async fn get_object(&self, key: &str) -> anyhow::Result<ObjectBody> {
            let resp = self
                .client
                .get_object()
                .bucket(&self.bucket)
                .key(key)
                .send()
                .await
                .map_err(describe)?;
            Ok(Box::pin(ReaderStream::new(resp.body.into_async_read())))
        }

        fn list_objects(&self) -> KeyStream {
            let client = self.client.clone();
            let bucket = self.bucket.clone();

            // `None` once the last page has been read; `Some(token)` otherwise.
            let pages = stream::try_unfold(Some(None::<String>), move |state| {
                let client = client.clone();
                let bucket = bucket.clone();
                async move {
                    let Some(token) = state else {
                        return Ok(None);
                    };
                    let resp = client
                        .list_objects_v2()
                        .bucket(&bucket)
                        .set_continuation_token(token)
                        .send()
                        .await
                        .map_err(describe)?;
                    let keys: Vec<anyhow::Result<String>> = resp
                        .contents
                        .unwrap_or_default()
                        .into_iter()
                        .filter_map(|obj| obj.key)
                        .map(Ok)
                        .collect();
                    let next = resp.next_continuation_token.map(Some);
                    Ok::<_, anyhow::Error>(Some((stream::iter(keys), next)))
                }
            });

            Box::pin(pages.try_flatten())
        }

        fn bucket(&self) -> &str {
            &self.bucket
        }

        fn name(&self) -> &str {
            &self.name
        }
    }

}

#[cfg(feature = "s3")]
pub use inner::{PART_SIZE, S3ObjectStore, client_config};
