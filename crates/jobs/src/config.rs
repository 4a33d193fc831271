use std::str::FromStr;
use std::time::Duration;

use vstudio_core::endpoints::METADATA_ENDPOINT;
use vstudio_core::polling::{PollCadence, DEFAULT_POLL_INTERVAL, VIDEO_POLL_INTERVAL};

/// Default number of non-terminal poll cycles before an item is failed.
pub const DEFAULT_MAX_POLL_ATTEMPTS: u32 = 720;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} is required")]
    Missing { var: &'static str },

    #[error("{var} has an invalid value '{value}'")]
    Invalid { var: &'static str, value: String },
}

/// Job manager configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct JobConfig {
    pub cadence: PollCadence,
    /// Non-terminal cycles allowed per item before it is marked failed.
    pub max_poll_attempts: u32,
    /// Queue endpoint used for metadata extraction.
    pub metadata_endpoint: String,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            cadence: PollCadence::default(),
            max_poll_attempts: DEFAULT_MAX_POLL_ATTEMPTS,
            metadata_endpoint: METADATA_ENDPOINT.to_string(),
        }
    }
}

impl JobConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                  | Default                        |
    /// |--------------------------|--------------------------------|
    /// | `POLL_INTERVAL_MS`       | `500`                          |
    /// | `VIDEO_POLL_INTERVAL_MS` | `20000`                        |
    /// | `MAX_POLL_ATTEMPTS`      | `720`                          |
    /// | `METADATA_ENDPOINT`      | `fal-ai/ffmpeg-api/metadata`   |
    pub fn from_env() -> Result<Self, ConfigError> {
        let default_ms = env_or(
            "POLL_INTERVAL_MS",
            DEFAULT_POLL_INTERVAL.as_millis() as u64,
        )?;
        let video_ms = env_or(
            "VIDEO_POLL_INTERVAL_MS",
            VIDEO_POLL_INTERVAL.as_millis() as u64,
        )?;
        let max_poll_attempts = env_or("MAX_POLL_ATTEMPTS", DEFAULT_MAX_POLL_ATTEMPTS)?;
        if max_poll_attempts == 0 {
            return Err(ConfigError::Invalid {
                var: "MAX_POLL_ATTEMPTS",
                value: "0".into(),
            });
        }
        let metadata_endpoint =
            std::env::var("METADATA_ENDPOINT").unwrap_or_else(|_| METADATA_ENDPOINT.into());

        Ok(Self {
            cadence: PollCadence {
                default: Duration::from_millis(default_ms),
                video: Duration::from_millis(video_ms),
            },
            max_poll_attempts,
            metadata_endpoint,
        })
    }
}

/// Read and parse `var`, falling back to `default` when it is unset.
pub fn env_or<T: FromStr>(var: &'static str, default: T) -> Result<T, ConfigError> {
    parse_or(var, std::env::var(var).ok(), default)
}

fn parse_or<T: FromStr>(
    var: &'static str,
    raw: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value }),
    }
}
