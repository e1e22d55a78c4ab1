//! Azure Blob Storage integration
//!
//! Uploads via the `azure_storage_blobs` SDK. The storage account key is
//! read from `AZURE_STORAGE_ACCOUNT_KEY`; the account and container come
//! from the upload target.

use std::path::Path;

use egress_core::AzureTarget;

use crate::{ObjectStore, Result, UploadError, UploadedObject};

use azure_storage::prelude::*;
use azure_storage_blobs::prelude::*;

/// Azure Blob uploader
pub struct AzureStore {
    target: AzureTarget,
}

impl AzureStore {
    pub fn new(target: AzureTarget) -> Result<Self> {
        if target.account_name.is_empty() || target.container_name.is_empty() {
            return Err(UploadError::InvalidTarget(
                "azure account and container must not be empty".into(),
            ));
        }
        Ok(Self { target })
    }

    /// Public URL of an uploaded blob.
    pub fn location(&self, key: &str) -> String {
        format!(
            "https://{}.blob.core.windows.net/{}/{}",
            self.target.account_name, self.target.container_name, key
        )
    }

    fn credentials(&self) -> Result<StorageCredentials> {
        let key = std::env::var("AZURE_STORAGE_ACCOUNT_KEY").map_err(|_| {
            UploadError::InvalidTarget("AZURE_STORAGE_ACCOUNT_KEY is not set".into())
        })?;
        Ok(StorageCredentials::access_key(self.target.account_name.clone(), key))
    }
}

#[async_trait::async_trait]
impl ObjectStore for AzureStore {
    async fn upload(
        &self,
        local: &Path,
        remote: &str,
        content_type: &str,
    ) -> Result<UploadedObject> {
        let data = tokio::fs::read(local).await?;
        let size = data.len() as u64;

        let client = ClientBuilder::new(self.target.account_name.clone(), self.credentials()?)
            .blob_client(&self.target.container_name, remote);

        client
            .put_block_blob(data)
            .content_type(content_type.to_string())
            .await
            .map_err(|e| UploadError::UploadFailed {
                location: self.location(remote),
                message: e.to_string(),
            })?;

        Ok(UploadedObject {
            location: self.location(remote),
            size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location() {
        let store = AzureStore::new(AzureTarget {
            account_name: "acct".into(),
            container_name: "media".into(),
        })
        .unwrap();
        assert_eq!(
            store.location("recordings/out.mp4"),
            "https://acct.blob.core.windows.net/media/recordings/out.mp4"
        );
    }

    #[test]
    fn test_empty_target_rejected() {
        let result = AzureStore::new(AzureTarget {
            account_name: String::new(),
            container_name: "media".into(),
        });
        assert!(result.is_err());
    }
}
