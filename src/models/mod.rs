//! Core data models for the video service.
//!
//! Records map to database rows via `sqlx::FromRow`; response views
//! serialize as JSON via `serde`.

pub mod video;
