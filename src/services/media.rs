use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::anyhow;
use sha2::{Digest, Sha256};
use tokio::fs;
use url::Url;

use crate::error::AppError;

/// Blob store for profile photos. Only the returned URL string ever enters
/// the data model; the binary stays on disk.
#[derive(Clone)]
pub struct MediaService {
    root: Arc<PathBuf>,
}

impl MediaService {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root: Arc::new(root),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn ensure_structure(&self) -> Result<(), AppError> {
        fs::create_dir_all(self.root().join("users")).await?;
        Ok(())
    }

    /// Store `bytes` under the user's media directory and return a
    /// retrievable URL. The filename is prefixed with a content hash so
    /// repeated uploads of the same image land on the same blob.
    pub async fn store(
        &self,
        user_uuid: &str,
        filename: &str,
        bytes: &[u8],
    ) -> Result<String, AppError> {
        let digest = Sha256::digest(bytes);
        let prefix: String = digest[..8].iter().map(|b| format!("{b:02x}")).collect();

        let dir = self.root().join("users").join(user_uuid);
        fs::create_dir_all(&dir).await?;

        let safe_name = sanitize_filename(filename);
        let file = dir.join(format!("{prefix}-{safe_name}"));
        fs::write(&file, bytes).await?;

        let absolute = fs::canonicalize(&file).await?;
        let url = Url::from_file_path(&absolute)
            .map_err(|()| anyhow!("media path is not absolute: {}", absolute.display()))?;
        Ok(url.to_string())
    }
}

fn sanitize_filename(filename: &str) -> String {
    let name = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename)
        .trim();
    if name.is_empty() {
        "upload".to_string()
    } else {
        name.replace(|c: char| c.is_control(), "_")
    }
}
