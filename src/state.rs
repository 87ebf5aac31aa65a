use std::sync::Arc;

use crate::{
    config::AppConfig,
    db::DbPool,
    services::{documents::DocumentStore, media::MediaService, realtime::RealtimeStore},
};

/// Shared handles for one running app (or one test world). Constructed
/// explicitly and passed by reference; there are no ambient singletons.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub db: DbPool,
    pub realtime: Arc<dyn RealtimeStore>,
    pub documents: Arc<dyn DocumentStore>,
    pub media: MediaService,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        db: DbPool,
        realtime: Arc<dyn RealtimeStore>,
        documents: Arc<dyn DocumentStore>,
        media: MediaService,
    ) -> Self {
        Self {
            config,
            db,
            realtime,
            documents,
            media,
        }
    }
}
