use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::AppError;

/// The low-latency keyed store. Paths are `/`-joined segments, e.g.
/// `users/{uid}/trips/{tripId}`.
#[async_trait]
pub trait RealtimeStore: Send + Sync {
    /// Generate a new child key under `path` without writing anything.
    fn generate_key(&self, path: &str) -> String;

    /// Write `value` at `path`, replacing any previous value.
    async fn put(&self, path: &str, value: &Value) -> Result<(), AppError>;

    async fn get(&self, path: &str) -> Result<Option<Value>, AppError>;

    /// Values of the direct children of `path`, in insertion order.
    async fn children(&self, path: &str) -> Result<Vec<Value>, AppError>;
}

/// In-memory [`RealtimeStore`]. Process-scoped; durability is the
/// document store's job.
#[derive(Clone, Default)]
pub struct MemoryRealtime {
    // Flat path -> value map; insertion order doubles as child order.
    entries: Arc<RwLock<Vec<(String, Value)>>>,
}

impl MemoryRealtime {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RealtimeStore for MemoryRealtime {
    fn generate_key(&self, _path: &str) -> String {
        Uuid::new_v4().to_string()
    }

    async fn put(&self, path: &str, value: &Value) -> Result<(), AppError> {
        let mut entries = self.entries.write().await;
        if let Some(slot) = entries.iter_mut().find(|(key, _)| key == path) {
            slot.1 = value.clone();
        } else {
            entries.push((path.to_string(), value.clone()));
        }
        Ok(())
    }

    async fn get(&self, path: &str) -> Result<Option<Value>, AppError> {
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .find(|(key, _)| key == path)
            .map(|(_, value)| value.clone()))
    }

    async fn children(&self, path: &str) -> Result<Vec<Value>, AppError> {
        let prefix = format!("{path}/");
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .filter(|(key, _)| {
                key.strip_prefix(&prefix)
                    .is_some_and(|rest| !rest.is_empty() && !rest.contains('/'))
            })
            .map(|(_, value)| value.clone())
            .collect())
    }
}
