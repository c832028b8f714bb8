//! Shared handler state.

use crate::{
    auth::JwtAuthenticator,
    config::AppConfig,
    services::{
        media_service::MediaTools,
        publisher_service::ObjectPublisher,
        upload_service::{PublishTarget, UploadService},
        video_service::VideoService,
    },
};
use sqlx::SqlitePool;
use std::{path::PathBuf, sync::Arc};

/// Everything a handler needs. Cheap to clone; nothing in it is mutable.
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<JwtAuthenticator>,
    pub videos: VideoService,
    pub uploads: UploadService,
    /// Where staged uploads and remuxed copies are written.
    pub scratch_dir: PathBuf,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        cfg: &AppConfig,
        media: Arc<dyn MediaTools>,
        publisher: Arc<dyn ObjectPublisher>,
    ) -> Self {
        let videos = VideoService::new(Arc::new(db));
        let target = PublishTarget {
            bucket: cfg.s3_bucket.clone(),
            region: cfg.s3_region.clone(),
            endpoint: cfg.s3_endpoint.clone(),
            url_mode: cfg.video_url_mode,
        };

        Self {
            auth: Arc::new(JwtAuthenticator::new_hs256(&cfg.jwt_secret)),
            uploads: UploadService::new(videos.clone(), media, publisher, target),
            videos,
            scratch_dir: cfg.scratch_dir.clone(),
        }
    }
}
