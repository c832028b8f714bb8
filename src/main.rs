use anyhow::Result;
use axum::Router;
use std::{fs, io::ErrorKind, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use video_store::{
    auth::JwtAuthenticator,
    config::{AppConfig, StartupAction},
    db,
    services::{media_service::FfmpegTools, publisher_service::S3Publisher},
    state::AppState,
};

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // --- Parse config + startup action ---
    let (cfg, action) = AppConfig::from_env_and_args()?;

    if let StartupAction::IssueToken(user_id) = action {
        let token = JwtAuthenticator::new_hs256(&cfg.jwt_secret)
            .issue(user_id, chrono::Duration::hours(24))?;
        println!("{}", token);
        return Ok(());
    }

    tracing::info!("Starting video-store with config: {:?}", cfg);

    // --- Ensure scratch directory exists ---
    if !cfg.scratch_dir.exists() {
        fs::create_dir_all(&cfg.scratch_dir)?;
        tracing::info!("Created scratch directory at {}", cfg.scratch_dir.display());
    }

    // --- Initialize SQLite connection ---
    let pool = db::connect(&cfg.database_url).await?;

    // --- Handle migration mode ---
    if action == StartupAction::Migrate {
        db::run_migrations(&pool).await?;
        tracing::info!("Database migration complete.");
        return Ok(()); // exit after migration
    }

    // --- Initialize collaborators ---
    let media = FfmpegTools::new(
        cfg.ffprobe_bin.clone(),
        cfg.ffmpeg_bin.clone(),
        cfg.tool_timeout,
    );
    let publisher = S3Publisher::from_env(cfg.s3_region.clone(), cfg.s3_endpoint.clone()).await;
    let state = AppState::new(pool, &cfg, Arc::new(media), Arc::new(publisher));

    // --- Build router ---
    let app: Router = video_store::routes::routes::routes(cfg.max_video_bytes).with_state(state);

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
