//! Services behind the HTTP handlers.
//!
//! - `video_service`: metadata store (SQLite)
//! - `media_type`: declared content-type validation
//! - `staging`: scratch files with guaranteed cleanup
//! - `media_service`: ffprobe/ffmpeg behind the `MediaTools` seam
//! - `publisher_service`: object storage behind the `ObjectPublisher` seam
//! - `upload_service`: the pipeline tying them together

pub mod media_service;
pub mod media_type;
pub mod publisher_service;
pub mod staging;
pub mod upload_service;
pub mod video_service;
