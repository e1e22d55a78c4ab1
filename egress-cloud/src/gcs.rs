//! Google Cloud Storage integration

use std::path::Path;

use egress_core::GcsTarget;

use crate::{ObjectStore, Result, UploadError, UploadedObject};

/// GCS uploader
pub struct GcsStore {
    target: GcsTarget,
}

impl GcsStore {
    /// Create an uploader for a GCS target. Credentials are resolved from
    /// the environment by the client library.
    #[cfg(feature = "gcs")]
    pub fn new(target: GcsTarget) -> Result<Self> {
        if target.bucket.is_empty() {
            return Err(UploadError::InvalidTarget("gcs bucket must not be empty".into()));
        }
        Ok(Self { target })
    }

    #[cfg(not(feature = "gcs"))]
    pub fn new(target: GcsTarget) -> Result<Self> {
        let _ = &target;
        Err(UploadError::UnsupportedBackend("gcs feature not enabled".into()))
    }

    /// Public URL of an uploaded key.
    pub fn location(&self, key: &str) -> String {
        format!("https://storage.googleapis.com/{}/{}", self.target.bucket, key)
    }
}

#[async_trait::async_trait]
impl ObjectStore for GcsStore {
    #[cfg(feature = "gcs")]
    async fn upload(
        &self,
        local: &Path,
        remote: &str,
        content_type: &str,
    ) -> Result<UploadedObject> {
        use cloud_storage::Client;

        let data = tokio::fs::read(local).await?;
        let size = data.len() as u64;

        let client = Client::default();
        client
            .object()
            .create(&self.target.bucket, data, remote, content_type)
            .await
            .map_err(|e| UploadError::UploadFailed {
                location: format!("gs://{}/{}", self.target.bucket, remote),
                message: e.to_string(),
            })?;

        Ok(UploadedObject {
            location: self.location(remote),
            size,
        })
    }

    #[cfg(not(feature = "gcs"))]
    async fn upload(
        &self,
        _local: &Path,
        _remote: &str,
        _content_type: &str,
    ) -> Result<UploadedObject> {
        Err(UploadError::UnsupportedBackend("gcs feature not enabled".into()))
    }
}

#[cfg(all(test, feature = "gcs"))]
mod tests {
    use super::*;

    #[test]
    fn test_location() {
        let store = GcsStore::new(GcsTarget { bucket: "media".into() }).unwrap();
        assert_eq!(
            store.location("recordings/out.mp4"),
            "https://storage.googleapis.com/media/recordings/out.mp4"
        );
    }
}
