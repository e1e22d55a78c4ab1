//! Local filesystem fallback

use std::path::{Path, PathBuf};

use crate::{ObjectStore, Result, UploadedObject};

/// Object store used when a session has no upload target.
///
/// Artifacts stay where the pipeline wrote them; the reported location is
/// the local path itself, or a copy under `root` when one is configured.
#[derive(Debug, Default)]
pub struct LocalStore {
    root: Option<PathBuf>,
}

impl LocalStore {
    /// Store that leaves artifacts in place.
    pub fn new() -> Self {
        Self { root: None }
    }

    /// Store that copies artifacts under a destination directory.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: Some(root.into()) }
    }
}

#[async_trait::async_trait]
impl ObjectStore for LocalStore {
    async fn upload(
        &self,
        local: &Path,
        remote: &str,
        _content_type: &str,
    ) -> Result<UploadedObject> {
        let size = tokio::fs::metadata(local).await?.len();

        let location = match &self.root {
            Some(root) => {
                let dest = root.join(remote);
                if let Some(parent) = dest.parent() {
                    tokio::fs::create_dir_all(parent).await?;
                }
                tokio::fs::copy(local, &dest).await?;
                dest.to_string_lossy().into_owned()
            }
            None => local.to_string_lossy().into_owned(),
        };

        Ok(UploadedObject { location, size })
    }
}
