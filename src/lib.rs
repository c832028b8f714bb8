//! Video upload and publishing service.
//!
//! Accepts authenticated multipart uploads of thumbnails and mp4 videos,
//! probes and remuxes videos with ffprobe/ffmpeg, publishes them to S3 and
//! records where they live in SQLite.

pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
