// Video Relay API configuration
//
// This module contains configuration structures and constants for the Video Relay API.
// The structs are filled by `config_validator` at startup and handed to the
// HTTP layer, the transcription client and the encoder at construction time.

use std::fmt;
use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Default values for configuration
pub mod defaults {
    // Numeric defaults carry a `_TEXT` twin used by the parameter registry

    // Server settings
    pub const HOST: &str = "127.0.0.1";
    pub const PORT: u16 = 5000;
    pub const PORT_TEXT: &str = "5000";
    pub const TIMEOUT_SECONDS: u64 = 480;
    pub const TIMEOUT_SECONDS_TEXT: &str = "480";
    pub const KEEPALIVE_SECONDS: u64 = 480;
    pub const KEEPALIVE_SECONDS_TEXT: &str = "480";
    pub const WORKERS: usize = 0;
    pub const WORKERS_TEXT: &str = "0";

    // Name of the folder created under the OS temp directory
    pub const TEMP_DIR_NAME: &str = "video_relay_api";

    // Maximum accepted upload (512MB)
    pub const MAX_FILE_SIZE: usize = 536870912;
    pub const MAX_FILE_SIZE_TEXT: &str = "536870912";

    pub const CORS_ALLOWED_ORIGINS: &str = "*";

    // Upstream transcription service
    pub const TRANSCRIPTION_URL: &str = "https://api.symphoniclabs.com/transcribe";
    pub const TRANSCRIPTION_TIER: &str = "free";
    pub const TRANSCRIPTION_TIMEOUT_SECONDS: u64 = 300;
    pub const TRANSCRIPTION_TIMEOUT_SECONDS_TEXT: &str = "300";

    // External encoder
    pub const ENCODER_CMD: &str = "ffmpeg";
    pub const ENCODER_VIDEO_CODEC: &str = "libx264";
    pub const ENCODER_PRESET: &str = "fast";
    pub const ENCODER_TIMEOUT_SECONDS: u64 = 600;
    pub const ENCODER_TIMEOUT_SECONDS_TEXT: &str = "600";

    // Speed presets understood by x264/x265
    pub const ENCODER_PRESETS: [&str; 10] = [
        "ultrafast",
        "superfast",
        "veryfast",
        "faster",
        "fast",
        "medium",
        "slow",
        "slower",
        "veryslow",
        "placebo",
    ];
}

/// HTTP listener settings
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
    /// Client disconnect timeout in seconds
    pub timeout: u64,
    /// Keep-alive timeout in seconds
    pub keepalive: u64,
    /// Number of HTTP workers (0 = one per CPU core)
    pub workers: usize,
    /// Origins allowed to call the API from a browser, `*` meaning any
    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::from([127, 0, 0, 1]),
            port: defaults::PORT,
            timeout: defaults::TIMEOUT_SECONDS,
            keepalive: defaults::KEEPALIVE_SECONDS,
            workers: defaults::WORKERS,
            cors_allowed_origins: parse_origin_list(defaults::CORS_ALLOWED_ORIGINS),
        }
    }
}

impl ServerConfig {
    /// Worker count handed to actix, resolving 0 to the number of CPU cores
    pub fn worker_count(&self) -> usize {
        if self.workers == 0 {
            num_cpus::get()
        } else {
            self.workers
        }
    }

    pub fn allows_any_origin(&self) -> bool {
        self.cors_allowed_origins.iter().any(|origin| origin == "*")
    }
}

/// Configuration for the upload handlers
#[derive(Clone, Debug)]
pub struct HandlerConfig {
    /// Directory to store temporary files
    pub temp_dir: PathBuf,
    /// Maximum size in bytes of an uploaded video
    pub max_file_size: usize,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            temp_dir: std::env::temp_dir().join(defaults::TEMP_DIR_NAME),
            max_file_size: defaults::MAX_FILE_SIZE,
        }
    }
}

impl HandlerConfig {
    /// Ensures the temporary directory exists
    pub fn ensure_temp_dir(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.temp_dir)
    }
}

/// Settings for the upstream transcription service
#[derive(Clone)]
pub struct TranscriptionConfig {
    pub endpoint: String,
    /// Credential sent as the `api_key` form field
    pub api_key: Option<String>,
    /// Value of the `tier` form field
    pub tier: String,
    pub timeout_seconds: u64,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            endpoint: String::from(defaults::TRANSCRIPTION_URL),
            api_key: None,
            tier: String::from(defaults::TRANSCRIPTION_TIER),
            timeout_seconds: defaults::TRANSCRIPTION_TIMEOUT_SECONDS,
        }
    }
}

impl TranscriptionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

// Keeps the credential out of logs
impl fmt::Debug for TranscriptionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TranscriptionConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("tier", &self.tier)
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

/// Settings for the external encoder process
#[derive(Clone, Debug)]
pub struct EncoderConfig {
    /// Encoder binary, looked up in PATH when not absolute
    pub command: String,
    /// Arguments placed before the standard argument set
    pub extra_args: Vec<String>,
    pub video_codec: String,
    pub preset: String,
    /// Maximum run time in seconds (0 = no limit)
    pub timeout_seconds: u64,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            command: String::from(defaults::ENCODER_CMD),
            extra_args: Vec::new(),
            video_codec: String::from(defaults::ENCODER_VIDEO_CODEC),
            preset: String::from(defaults::ENCODER_PRESET),
            timeout_seconds: defaults::ENCODER_TIMEOUT_SECONDS,
        }
    }
}

impl EncoderConfig {
    pub fn timeout(&self) -> Option<Duration> {
        match self.timeout_seconds {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

/// Complete, validated application configuration
#[derive(Clone, Debug, Default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub handler: HandlerConfig,
    pub transcription: TranscriptionConfig,
    pub encoder: EncoderConfig,
}

/// Split a comma separated origin list, dropping empty entries
pub fn parse_origin_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(String::from)
        .collect()
}
