//! Amazon S3 integration

use std::path::Path;

use egress_core::S3Target;

use crate::{ObjectStore, Result, UploadError, UploadedObject};

/// S3 uploader
pub struct S3Store {
    target: S3Target,
    #[cfg(feature = "s3")]
    client: tokio::sync::OnceCell<aws_sdk_s3::Client>,
}

impl S3Store {
    /// Create an uploader for an S3 target. The SDK client is built
    /// lazily on first upload so construction stays synchronous.
    #[cfg(feature = "s3")]
    pub fn new(target: S3Target) -> Result<Self> {
        if target.bucket.is_empty() {
            return Err(UploadError::InvalidTarget("s3 bucket must not be empty".into()));
        }
        Ok(Self {
            target,
            client: tokio::sync::OnceCell::new(),
        })
    }

    #[cfg(not(feature = "s3"))]
    pub fn new(target: S3Target) -> Result<Self> {
        let _ = &target;
        Err(UploadError::UnsupportedBackend("s3 feature not enabled".into()))
    }

    #[cfg(feature = "s3")]
    async fn client(&self) -> Result<&aws_sdk_s3::Client> {
        self.client
            .get_or_try_init(|| async {
                let sdk_config =
                    aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
                let mut builder = aws_sdk_s3::config::Builder::from(&sdk_config)
                    .region(aws_sdk_s3::config::Region::new(self.target.region.clone()))
                    .force_path_style(self.target.force_path_style);

                if let Some(ref endpoint) = self.target.endpoint {
                    builder = builder.endpoint_url(endpoint);
                }

                Ok(aws_sdk_s3::Client::from_conf(builder.build()))
            })
            .await
    }

    /// Public URL of an uploaded key.
    pub fn location(&self, key: &str) -> String {
        match &self.target.endpoint {
            Some(endpoint) => format!("{}/{}/{}", endpoint.trim_end_matches('/'), self.target.bucket, key),
            None => format!(
                "https://{}.s3.{}.amazonaws.com/{}",
                self.target.bucket, self.target.region, key
            ),
        }
    }
}

#[async_trait::async_trait]
impl ObjectStore for S3Store {
    #[cfg(feature = "s3")]
    async fn upload(
        &self,
        local: &Path,
        remote: &str,
        content_type: &str,
    ) -> Result<UploadedObject> {
        use aws_sdk_s3::primitives::ByteStream;

        let size = tokio::fs::metadata(local).await?.len();
        let body = ByteStream::from_path(local)
            .await
            .map_err(|e| UploadError::Provider(e.to_string()))?;

        self.client()
            .await?
            .put_object()
            .bucket(&self.target.bucket)
            .key(remote)
            .content_type(content_type)
            .body(body)
            .send()
            .await
            .map_err(|e| UploadError::UploadFailed {
                location: format!("s3://{}/{}", self.target.bucket, remote),
                message: e.to_string(),
            })?;

        Ok(UploadedObject {
            location: self.location(remote),
            size,
        })
    }

    #[cfg(not(feature = "s3"))]
    async fn upload(
        &self,
        _local: &Path,
        _remote: &str,
        _content_type: &str,
    ) -> Result<UploadedObject> {
        Err(UploadError::UnsupportedBackend("s3 feature not enabled".into()))
    }
}

#[cfg(all(test, feature = "s3"))]
mod tests {
    use super::*;

    #[test]
    fn test_location_virtual_hosted() {
        let store = S3Store::new(S3Target {
            bucket: "media".into(),
            region: "eu-west-1".into(),
            endpoint: None,
            force_path_style: false,
        })
        .unwrap();
        assert_eq!(
            store.location("recordings/out.mp4"),
            "https://media.s3.eu-west-1.amazonaws.com/recordings/out.mp4"
        );
    }

    #[test]
    fn test_location_custom_endpoint() {
        let store = S3Store::new(S3Target {
            bucket: "media".into(),
            region: "us-east-1".into(),
            endpoint: Some("http://minio:9000/".into()),
            force_path_style: true,
        })
        .unwrap();
        assert_eq!(store.location("a/b.ts"), "http://minio:9000/media/a/b.ts");
    }
}
