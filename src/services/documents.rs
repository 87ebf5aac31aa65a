use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use serde_json::Value;
use tokio::fs;

use crate::error::AppError;

/// The durable document store, addressed by the same logical paths as the
/// realtime store.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Write the document at `path`, replacing any previous content.
    async fn write(&self, path: &str, value: &Value) -> Result<(), AppError>;

    async fn read(&self, path: &str) -> Result<Option<Value>, AppError>;

    /// Merge the top-level fields of `partial` into the document at `path`,
    /// creating it if missing.
    async fn merge(&self, path: &str, partial: &Value) -> Result<(), AppError>;
}

/// [`DocumentStore`] backed by pretty-printed JSON files, one per document.
#[derive(Clone)]
pub struct FileDocuments {
    root: Arc<PathBuf>,
}

impl FileDocuments {
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

    fn document_file(&self, path: &str) -> PathBuf {
        let mut file = self.root().to_path_buf();
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            file.push(segment);
        }
        file.set_extension("json");
        file
    }
}

#[async_trait]
impl DocumentStore for FileDocuments {
    async fn write(&self, path: &str, value: &Value) -> Result<(), AppError> {
        let file = self.document_file(path);
        if let Some(parent) = file.parent() {
            fs::create_dir_all(parent).await?;
        }
        let data = serde_json::to_vec_pretty(value).map_err(|err| AppError::Other(err.into()))?;
        fs::write(file, data).await?;
        Ok(())
    }

    async fn read(&self, path: &str) -> Result<Option<Value>, AppError> {
        let file = self.document_file(path);
        if !fs::try_exists(&file).await? {
            return Ok(None);
        }
        let raw = fs::read(&file).await?;
        if raw.is_empty() {
            return Ok(None);
        }
        let value = serde_json::from_slice(&raw).map_err(|err| AppError::Other(err.into()))?;
        Ok(Some(value))
    }

    async fn merge(&self, path: &str, partial: &Value) -> Result<(), AppError> {
        let mut current = self
            .read(path)
            .await?
            .unwrap_or_else(|| Value::Object(Default::default()));
        match (current.as_object_mut(), partial.as_object()) {
            (Some(target), Some(fields)) => {
                for (key, value) in fields {
                    target.insert(key.clone(), value.clone());
                }
            }
            _ => {
                return Err(AppError::BadRequest(
                    "merge requires object documents".into(),
                ))
            }
        }
        self.write(path, &current).await
    }
}
