use anyhow::{Context, Result, anyhow};
use clap::{Parser, ValueEnum};
use std::{env, fmt, path::PathBuf, str::FromStr, time::Duration};
use uuid::Uuid;

/// Default ceiling for a video upload body: 1 GiB.
pub const DEFAULT_MAX_VIDEO_BYTES: usize = 1 << 30;

/// How a published video's location is persisted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum VideoUrlMode {
    /// Store bucket and key; hand out a presigned URL on every read.
    Signed,
    /// Store a public bucket URL.
    Direct,
}

/// What the binary should do after configuration is loaded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StartupAction {
    Serve,
    Migrate,
    IssueToken(Uuid),
}

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub jwt_secret: String,
    pub s3_bucket: String,
    pub s3_region: String,
    pub s3_endpoint: Option<String>,
    pub video_url_mode: VideoUrlMode,
    pub scratch_dir: PathBuf,
    pub max_video_bytes: usize,
    pub ffprobe_bin: String,
    pub ffmpeg_bin: String,
    pub tool_timeout: Duration,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database_url", &self.database_url)
            .field("jwt_secret", &"<redacted>")
            .field("s3_bucket", &self.s3_bucket)
            .field("s3_region", &self.s3_region)
            .field("s3_endpoint", &self.s3_endpoint)
            .field("video_url_mode", &self.video_url_mode)
            .field("scratch_dir", &self.scratch_dir)
            .field("max_video_bytes", &self.max_video_bytes)
            .field("ffprobe_bin", &self.ffprobe_bin)
            .field("ffmpeg_bin", &self.ffmpeg_bin)
            .field("tool_timeout", &self.tool_timeout)
            .finish()
    }
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Video upload and publishing API")]
pub struct Args {
    /// Host to bind to (overrides VIDEO_STORE_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides VIDEO_STORE_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Database URL (overrides VIDEO_STORE_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// HS256 secret used to validate bearer tokens (overrides VIDEO_STORE_JWT_SECRET)
    #[arg(long)]
    pub jwt_secret: Option<String>,

    /// Bucket receiving uploaded videos (overrides VIDEO_STORE_S3_BUCKET)
    #[arg(long)]
    pub s3_bucket: Option<String>,

    /// Bucket region (overrides VIDEO_STORE_S3_REGION)
    #[arg(long)]
    pub s3_region: Option<String>,

    /// Custom S3-compatible endpoint (overrides VIDEO_STORE_S3_ENDPOINT)
    #[arg(long)]
    pub s3_endpoint: Option<String>,

    /// How video URLs are stored (overrides VIDEO_STORE_VIDEO_URL_MODE)
    #[arg(long, value_enum)]
    pub video_url_mode: Option<VideoUrlMode>,

    /// Directory for in-flight upload files (overrides VIDEO_STORE_SCRATCH_DIR)
    #[arg(long)]
    pub scratch_dir: Option<PathBuf>,

    /// Maximum video request body in bytes (overrides VIDEO_STORE_MAX_VIDEO_BYTES)
    #[arg(long)]
    pub max_video_bytes: Option<usize>,

    /// ffprobe executable (overrides VIDEO_STORE_FFPROBE)
    #[arg(long)]
    pub ffprobe_bin: Option<String>,

    /// ffmpeg executable (overrides VIDEO_STORE_FFMPEG)
    #[arg(long)]
    pub ffmpeg_bin: Option<String>,

    /// Seconds before an ffprobe/ffmpeg run is killed (overrides VIDEO_STORE_TOOL_TIMEOUT_SECS)
    #[arg(long)]
    pub tool_timeout_secs: Option<u64>,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,

    /// Print a 24h bearer token for USER_ID and exit
    #[arg(long, value_name = "USER_ID")]
    pub issue_token: Option<Uuid>,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and the startup action.
    pub fn from_env_and_args() -> Result<(Self, StartupAction)> {
        Self::from_args(Args::parse())
    }

    /// Merge already-parsed CLI args with the process environment. CLI wins.
    pub fn from_args(args: Args) -> Result<(Self, StartupAction)> {
        Self::from_args_and_lookup(args, |name| env::var(name).ok())
    }

    /// Merge CLI args with variables resolved through `lookup`.
    pub fn from_args_and_lookup<F>(args: Args, lookup: F) -> Result<(Self, StartupAction)>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env_or = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.into());

        let action = match (args.migrate, args.issue_token) {
            (true, Some(_)) => return Err(anyhow!("--migrate and --issue-token are exclusive")),
            (true, None) => StartupAction::Migrate,
            (false, Some(user_id)) => StartupAction::IssueToken(user_id),
            (false, None) => StartupAction::Serve,
        };

        let jwt_secret = args
            .jwt_secret
            .or_else(|| lookup("VIDEO_STORE_JWT_SECRET"))
            .filter(|s| !s.is_empty())
            .context("a JWT secret is required (--jwt-secret or VIDEO_STORE_JWT_SECRET)")?;

        let s3_bucket = match args.s3_bucket.or_else(|| lookup("VIDEO_STORE_S3_BUCKET")) {
            Some(bucket) if !bucket.is_empty() => bucket,
            _ if action == StartupAction::Serve => {
                return Err(anyhow!(
                    "an S3 bucket is required (--s3-bucket or VIDEO_STORE_S3_BUCKET)"
                ));
            }
            _ => String::new(),
        };

        let video_url_mode = match args.video_url_mode {
            Some(mode) => mode,
            None => match lookup("VIDEO_STORE_VIDEO_URL_MODE") {
                Some(value) => <VideoUrlMode as ValueEnum>::from_str(&value, true)
                    .map_err(|e| anyhow!("parsing VIDEO_STORE_VIDEO_URL_MODE: {}", e))?,
                None => VideoUrlMode::Signed,
            },
        };

        let cfg = Self {
            host: args
                .host
                .unwrap_or_else(|| env_or("VIDEO_STORE_HOST", "0.0.0.0")),
            port: match args.port {
                Some(port) => port,
                None => env_parse(lookup("VIDEO_STORE_PORT"), "VIDEO_STORE_PORT", 8091)?,
            },
            database_url: args
                .database_url
                .unwrap_or_else(|| env_or("VIDEO_STORE_DATABASE_URL", "sqlite://./data/videos.db")),
            jwt_secret,
            s3_bucket,
            s3_region: args
                .s3_region
                .unwrap_or_else(|| env_or("VIDEO_STORE_S3_REGION", "us-east-1")),
            s3_endpoint: args
                .s3_endpoint
                .or_else(|| lookup("VIDEO_STORE_S3_ENDPOINT"))
                .filter(|s| !s.is_empty()),
            video_url_mode,
            scratch_dir: args.scratch_dir.unwrap_or_else(|| {
                lookup("VIDEO_STORE_SCRATCH_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(env::temp_dir)
            }),
            max_video_bytes: match args.max_video_bytes {
                Some(max) => max,
                None => env_parse(lookup("VIDEO_STORE_MAX_VIDEO_BYTES"), "VIDEO_STORE_MAX_VIDEO_BYTES", DEFAULT_MAX_VIDEO_BYTES)?,
            },
            ffprobe_bin: args
                .ffprobe_bin
                .unwrap_or_else(|| env_or("VIDEO_STORE_FFPROBE", "ffprobe")),
            ffmpeg_bin: args
                .ffmpeg_bin
                .unwrap_or_else(|| env_or("VIDEO_STORE_FFMPEG", "ffmpeg")),
            tool_timeout: Duration::from_secs(match args.tool_timeout_secs {
                Some(secs) => secs,
                None => env_parse(lookup("VIDEO_STORE_TOOL_TIMEOUT_SECS"), "VIDEO_STORE_TOOL_TIMEOUT_SECS", 300)?,
            }),
        };

        Ok((cfg, action))
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn env_parse<T>(value: Option<String>, name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match value {
        Some(value) => value
            .parse::<T>()
            .with_context(|| format!("parsing {} value `{}`", name, value)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_with_env(argv: &[&str], vars: &[(&str, &str)]) -> Result<(AppConfig, StartupAction)> {
        let mut full = vec!["video-store"];
        full.extend_from_slice(argv);
        AppConfig::from_args_and_lookup(Args::parse_from(full), |name| {
            vars.iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| value.to_string())
        })
    }

    fn parse(argv: &[&str]) -> Result<(AppConfig, StartupAction)> {
        parse_with_env(argv, &[])
    }

    #[test]
    fn cli_values_are_used() {
        let (cfg, action) = parse(&[
            "--jwt-secret",
            "s3cret",
            "--s3-bucket",
            "media",
            "--port",
            "9000",
            "--video-url-mode",
            "direct",
            "--max-video-bytes",
            "1024",
            "--tool-timeout-secs",
            "7",
        ])
        .unwrap();

        assert_eq!(action, StartupAction::Serve);
        assert_eq!(cfg.jwt_secret, "s3cret");
        assert_eq!(cfg.s3_bucket, "media");
        assert_eq!(cfg.port, 9000);
        assert_eq!(cfg.video_url_mode, VideoUrlMode::Direct);
        assert_eq!(cfg.max_video_bytes, 1024);
        assert_eq!(cfg.tool_timeout, Duration::from_secs(7));
    }

    #[test]
    fn debug_output_hides_secret() {
        let (cfg, _) = parse(&["--jwt-secret", "hunter2", "--s3-bucket", "media"]).unwrap();
        let rendered = format!("{:?}", cfg);
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn issue_token_does_not_need_a_bucket() {
        let user = Uuid::new_v4();
        let user_arg = user.to_string();
        let (_, action) = parse(&["--jwt-secret", "s", "--issue-token", &user_arg]).unwrap();
        assert_eq!(action, StartupAction::IssueToken(user));
    }

    #[test]
    fn migrate_and_issue_token_conflict() {
        let user_arg = Uuid::new_v4().to_string();
        assert!(parse(&["--jwt-secret", "s", "--migrate", "--issue-token", &user_arg]).is_err());
    }

    #[test]
    fn defaults_apply_without_cli_or_environment() {
        let (cfg, _) = parse(&["--jwt-secret", "s", "--s3-bucket", "media"]).unwrap();
        assert_eq!(cfg.host, "0.0.0.0");
        assert_eq!(cfg.port, 8091);
        assert_eq!(cfg.s3_region, "us-east-1");
        assert_eq!(cfg.s3_endpoint, None);
        assert_eq!(cfg.video_url_mode, VideoUrlMode::Signed);
        assert_eq!(cfg.max_video_bytes, DEFAULT_MAX_VIDEO_BYTES);
        assert_eq!(cfg.tool_timeout, Duration::from_secs(300));
    }

    #[test]
    fn environment_fills_gaps_and_cli_wins() {
        let (cfg, _) = parse_with_env(
            &["--port", "9100"],
            &[
                ("VIDEO_STORE_JWT_SECRET", "from-env"),
                ("VIDEO_STORE_S3_BUCKET", "env-bucket"),
                ("VIDEO_STORE_PORT", "7000"),
                ("VIDEO_STORE_VIDEO_URL_MODE", "DIRECT"),
                ("VIDEO_STORE_S3_ENDPOINT", ""),
            ],
        )
        .unwrap();

        assert_eq!(cfg.jwt_secret, "from-env");
        assert_eq!(cfg.s3_bucket, "env-bucket");
        assert_eq!(cfg.port, 9100);
        assert_eq!(cfg.video_url_mode, VideoUrlMode::Direct);
        assert_eq!(cfg.s3_endpoint, None);
    }

    #[test]
    fn missing_secret_or_bucket_is_an_error() {
        assert!(parse(&["--s3-bucket", "media"]).is_err());
        assert!(parse(&["--jwt-secret", "s"]).is_err());
        assert!(
            parse_with_env(&["--jwt-secret", "s"], &[("VIDEO_STORE_PORT", "eighty")]).is_err()
        );
    }
}
