//! Object storage integration for egress artifacts
//!
//! This crate provides S3, GCS, and Azure Blob storage uploads behind a
//! single [`ObjectStore`] trait, plus a local-filesystem fallback used
//! when a session has no upload target.
//!
//! # Features
//!
//! - `s3` - Amazon S3 support
//! - `gcs` - Google Cloud Storage support
//! - `azure` - Azure Blob Storage support
//!
//! # Example
//!
//! ```ignore
//! use egress_cloud::from_target;
//! use egress_core::UploadTarget;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = from_target(&UploadTarget::None)?;
//!     let object = store
//!         .upload("out.mp4".as_ref(), "recordings/out.mp4", "video/mp4")
//!         .await?;
//!     println!("stored at {} ({} bytes)", object.location, object.size);
//!     Ok(())
//! }
//! ```

use std::path::Path;
use std::sync::Arc;

use egress_core::UploadTarget;

mod error;
mod local;
mod s3;
mod gcs;
#[cfg(feature = "azure")]
mod azure;

pub use error::*;
pub use local::*;
pub use s3::*;
pub use gcs::*;
#[cfg(feature = "azure")]
pub use azure::*;

/// Result type for upload operations
pub type Result<T> = std::result::Result<T, UploadError>;

/// A successfully stored artifact.
#[derive(Debug, Clone)]
pub struct UploadedObject {
    /// Where the artifact can be retrieved from.
    pub location: String,
    /// Size of the uploaded body in bytes.
    pub size: u64,
}

/// Destination for produced artifacts.
///
/// Implementations upload a local file to a remote key and report the
/// resulting location and size. Upload is the only operation the egress
/// controller needs; listing and retrieval belong to the consuming
/// service.
#[async_trait::async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload a local file to `remote`, tagging it with `content_type`.
    async fn upload(&self, local: &Path, remote: &str, content_type: &str)
        -> Result<UploadedObject>;
}

/// Construct the object store selected by a request's upload target.
pub fn from_target(target: &UploadTarget) -> Result<Arc<dyn ObjectStore>> {
    match target {
        UploadTarget::S3(t) => Ok(Arc::new(S3Store::new(t.clone())?)),
        UploadTarget::Gcs(t) => Ok(Arc::new(GcsStore::new(t.clone())?)),
        #[cfg(feature = "azure")]
        UploadTarget::Azure(t) => Ok(Arc::new(AzureStore::new(t.clone())?)),
        #[cfg(not(feature = "azure"))]
        UploadTarget::Azure(_) => {
            Err(UploadError::UnsupportedBackend("azure feature not enabled".into()))
        }
        UploadTarget::None => Ok(Arc::new(LocalStore::new())),
    }
}
