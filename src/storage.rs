use async_trait::async_trait;
use aws_sdk_s3 as s3;
use chrono::{DateTime, Utc};
use s3::presigning::PresigningConfig;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Lifetime of a presigned upload URL.
pub const UPLOAD_URL_TTL: Duration = Duration::from_secs(600);

/// StoredObject
///
/// One object of the media bucket as reported by a listing.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    pub key: String,
    pub size_bytes: i64,
    pub last_modified: Option<DateTime<Utc>>,
}

/// StorageService
///
/// The object storage operations the media library needs. `S3StorageClient`
/// talks to MinIO locally and to Supabase Storage's S3 gateway in production;
/// `MockStorageService` keeps objects in memory for tests.
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Ensures the configured bucket exists. Used in the `Env::Local` setup
    /// to provision the bucket in MinIO.
    async fn ensure_bucket_exists(&self);

    /// Generates a temporary signed URL allowing a client to PUT `key` directly
    /// into the bucket, constrained to `content_type`.
    async fn get_presigned_upload_url(
        &self,
        key: &str,
        content_type: &str,
    ) -> Result<String, String>;

    /// Lists the objects under `prefix` (e.g. `posts/`).
    async fn list_objects(&self, prefix: &str) -> Result<Vec<StoredObject>, String>;

    /// Removes `key`. Deleting a missing object is not an error.
    async fn delete_object(&self, key: &str) -> Result<(), String>;

    /// The publicly readable URL of `key`.
    fn public_url(&self, key: &str) -> String;
}

/// StorageState
///
/// The shared handle to the storage service held in `AppState`.
pub type StorageState = Arc<dyn StorageService>;

/// S3StorageClient
///
/// `StorageService` over the AWS SDK. Path-style addressing is forced because
/// both MinIO and the Supabase gateway expect `endpoint/bucket/key` URLs.
#[derive(Clone)]
pub struct S3StorageClient {
    client: s3::Client,
    bucket_name: String,
    public_base: String,
}

impl S3StorageClient {
    /// new
    ///
    /// Constructs the S3 client using credentials and configuration from AppConfig.
    /// `public_base` is the prefix under which objects are publicly readable.
    pub async fn new(
        endpoint: &str,
        region: &str,
        access_key: &str,
        secret_key: &str,
        bucket: &str,
        public_base: &str,
    ) -> Self {
        let credentials =
            s3::config::Credentials::new(access_key, secret_key, None, None, "static");

        let config = s3::Config::builder()
            .credentials_provider(credentials)
            .endpoint_url(endpoint)
            .region(s3::config::Region::new(region.to_string()))
            .behavior_version_latest()
            .force_path_style(true)
            .build();

        Self {
            client: s3::Client::from_conf(config),
            bucket_name: bucket.to_string(),
            public_base: public_base.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl StorageService for S3StorageClient {
    /// ensure_bucket_exists
    ///
    /// CreateBucket fails harmlessly when the bucket is already there, so the
    /// result is only logged.
    async fn ensure_bucket_exists(&self) {
        if let Err(e) = self
            .client
            .create_bucket()
            .bucket(&self.bucket_name)
            .send()
            .await
        {
            tracing::debug!(bucket = %self.bucket_name, error = %e, "create_bucket skipped");
        }
    }

    async fn get_presigned_upload_url(
        &self,
        key: &str,
        content_type: &str,
    ) -> Result<String, String> {
        let presigning = PresigningConfig::expires_in(UPLOAD_URL_TTL).map_err(|e| e.to_string())?;

        let presigned_req = self
            .client
            .put_object()
            .bucket(&self.bucket_name)
            .key(key)
            // The signature covers the content type, so the upload must match it.
            .content_type(content_type)
            .presigned(presigning)
            .await
            .map_err(|e| e.to_string())?;

        Ok(presigned_req.uri().to_string())
    }

    /// list_objects
    ///
    /// Follows continuation tokens until the listing is exhausted.
    async fn list_objects(&self, prefix: &str) -> Result<Vec<StoredObject>, String> {
        let mut objects = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let output = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket_name)
                .prefix(prefix)
                .set_continuation_token(continuation.take())
                .send()
                .await
                .map_err(|e| e.to_string())?;

            for object in output.contents() {
                let Some(key) = object.key() else { continue };
                // Folder placeholders.
                if key.ends_with('/') {
                    continue;
                }
                objects.push(StoredObject {
                    key: key.to_string(),
                    size_bytes: object.size().unwrap_or_default(),
                    last_modified: object
                        .last_modified()
                        .and_then(|t| DateTime::from_timestamp(t.secs(), t.subsec_nanos())),
                });
            }

            match output.next_continuation_token() {
                Some(token) if output.is_truncated().unwrap_or(false) => {
                    continuation = Some(token.to_string());
                }
                _ => break,
            }
        }

        Ok(objects)
    }

    async fn delete_object(&self, key: &str) -> Result<(), String> {
        self.client
            .delete_object()
            .bucket(&self.bucket_name)
            .key(key)
            .send()
            .await
            .map(|_| ())
            .map_err(|e| e.to_string())
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base, key)
    }
}

/// sanitize_key
///
/// Removes directory navigation components (`..`, `.`) and empty segments
/// from a user-provided key.
pub fn sanitize_key(key: &str) -> String {
    key.split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".." && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// key_from_public_url
///
/// Maps a stored public URL (e.g. a post's featured image) back to its object
/// key. `None` when the URL does not point into this bucket.
pub fn key_from_public_url(public_base: &str, url: &str) -> Option<String> {
    let base = public_base.trim_end_matches('/');
    url.strip_prefix(base)
        .and_then(|rest| rest.strip_prefix('/'))
        .map(|rest| rest.split(['?', '#']).next().unwrap_or(rest))
        .map(sanitize_key)
        .filter(|key| !key.is_empty())
}

/// MockStorageService
///
/// In-memory `StorageService` for tests. Presigned URLs are deterministic and
/// objects live in a shared map so tests can inspect deletions.
#[derive(Clone, Default)]
pub struct MockStorageService {
    /// When true, all operations return a simulated failure.
    pub should_fail: bool,
    objects: Arc<Mutex<BTreeMap<String, StoredObject>>>,
}

pub const MOCK_PUBLIC_BASE: &str = "http://localhost:9000/mock-bucket";

impl MockStorageService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    /// Seeds an object of `size_bytes` under `key`.
    pub fn with_object(self, key: &str, size_bytes: i64) -> Self {
        self.lock().insert(
            key.to_string(),
            StoredObject {
                key: key.to_string(),
                size_bytes,
                last_modified: Some(Utc::now()),
            },
        );
        self
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, StoredObject>> {
        self.objects.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check(&self) -> Result<(), String> {
        if self.should_fail {
            Err("Mock Storage Error: Simulation requested".to_string())
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl StorageService for MockStorageService {
    async fn ensure_bucket_exists(&self) {}

    async fn get_presigned_upload_url(
        &self,
        key: &str,
        _content_type: &str,
    ) -> Result<String, String> {
        self.check()?;
        Ok(format!("{}/{}?signature=fake", MOCK_PUBLIC_BASE, sanitize_key(key)))
    }

    async fn list_objects(&self, prefix: &str) -> Result<Vec<StoredObject>, String> {
        self.check()?;
        Ok(self
            .lock()
            .values()
            .filter(|o| o.key.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn delete_object(&self, key: &str) -> Result<(), String> {
        self.check()?;
        self.lock().remove(key);
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", MOCK_PUBLIC_BASE, key)
    }
}
