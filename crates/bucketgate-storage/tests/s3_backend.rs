/// Integration tests against a real S3-compatible backend (e.g. MinIO).
///
/// Skipped unless `BUCKETGATE_TEST_ENDPOINT` is set.
///
/// Run with:
///   BUCKETGATE_TEST_ENDPOINT=localhost:9000 \
///   BUCKETGATE_TEST_ACCESS_KEY=minioadmin \
///   BUCKETGATE_TEST_SECRET_KEY=minioadmin \
///   cargo test -p bucketgate-storage --test s3_backend -- --nocapture
#[cfg(feature = "s3")]
mod s3_tests {
    use bytes::Bytes;
    use futures::{StreamExt, TryStreamExt, stream};

    use bucketgate_core::config::StorageSettings;
    use bucketgate_core::types::RetryPolicy;
    use bucketgate_storage::provider::{ObjectBody, ObjectStore};
    use bucketgate_storage::readiness::Readiness;
    use bucketgate_storage::s3::{PART_SIZE, S3ObjectStore};

    async fn get_store(bucket: &str) -> Option<S3ObjectStore> {
        let endpoint = std::env::var("BUCKETGATE_TEST_ENDPOINT").ok()?;
        if endpoint.is_empty() {
            return None;
        }
        let settings = StorageSettings {
            endpoint,
            access_key: std::env::var("BUCKETGATE_TEST_ACCESS_KEY")
                .unwrap_or_else(|_| "minioadmin".to_string()),
            secret_key: std::env::var("BUCKETGATE_TEST_SECRET_KEY")
                .unwrap_or_else(|_| "minioadmin".to_string()),
            bucket: bucket.to_string(),
            region: "us-east-1".to_string(),
        };
        let store = S3ObjectStore::from_settings(&settings).expect("build S3 store");
        Readiness::new(RetryPolicy::default())
            .ensure(&store)
            .await
            .expect("readiness");
        Some(store)
    }

    fn body(data: Vec<u8>) -> ObjectBody {
        Box::pin(stream::iter(vec![Ok(Bytes::from(data))]))
    }

    async fn read_all(mut body: ObjectBody) -> Vec<u8> {
        let mut out = Vec::new();
        while let Some(chunk) = body.next().await {
            out.extend_from_slice(&chunk.expect("read chunk"));
        }
        out
    }

    #[tokio::test]
    async fn s3_put_get_list() {
        let Some(store) = get_store("bucketgate-it").await else {
            eprintln!("SKIP: BUCKETGATE_TEST_ENDPOINT not set");
            return;
        };

        store
            .put_object("it/a", body(b"alpha".to_vec()))
            .await
            .expect("put failed");
        store
            .put_object("it/b/c", body(vec![0u8, 255, 1, 254]))
            .await
            .expect("put failed");
        println!("OK: S3 put");

        let data = read_all(store.get_object("it/b/c").await.expect("get failed")).await;
        assert_eq!(data, vec![0u8, 255, 1, 254]);
        println!("OK: S3 get matches");

        let keys: Vec<String> = store.list_objects().try_collect().await.expect("list");
        assert!(keys.contains(&"it/a".to_string()));
        assert!(keys.contains(&"it/b/c".to_string()));
        println!("OK: S3 list");
    }

    #[tokio::test]
    async fn s3_missing_key_errors() {
        let Some(store) = get_store("bucketgate-it").await else {
            eprintln!("SKIP: BUCKETGATE_TEST_ENDPOINT not set");
            return;
        };
        assert!(store.get_object("it/does-not-exist").await.is_err());
    }

    #[tokio::test]
    async fn s3_multipart_upload() {
        let Some(store) = get_store("bucketgate-it").await else {
            eprintln!("SKIP: BUCKETGATE_TEST_ENDPOINT not set");
            return;
        };

        let data: Vec<u8> = (0..PART_SIZE * 2 + 1234).map(|i| (i % 251) as u8).collect();
        let chunks: Vec<std::io::Result<Bytes>> = data
            .chunks(64 * 1024)
            .map(|c| Ok(Bytes::copy_from_slice(c)))
            .collect();
        store
            .put_object("it/large", Box::pin(stream::iter(chunks)))
            .await
            .expect("multipart put failed");

        let downloaded = read_all(store.get_object("it/large").await.expect("get failed")).await;
        assert_eq!(downloaded.len(), data.len());
        assert!(downloaded == data);
        println!("OK: S3 multipart roundtrip");
    }
}
