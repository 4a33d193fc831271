use vstudio_jobs::config::ConfigError;
use vstudio_jobs::JobConfig;
use vstudio_queue::api::DEFAULT_BASE_URL;

/// Output format of the trace log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

impl LogFormat {
    pub fn from_name(name: &str) -> Result<Self, ConfigError> {
        match name.trim().to_ascii_lowercase().as_str() {
            "" | "text" | "pretty" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(ConfigError::Invalid {
                var: "LOG_FORMAT",
                value: name.to_string(),
            }),
        }
    }
}

/// Worker configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub database_url: String,
    pub queue_base_url: String,
    /// Queue API key. Requests go out unauthenticated without one.
    pub fal_key: Option<String>,
    pub log_format: LogFormat,
    pub jobs: JobConfig,
}

impl WorkerConfig {
    /// Load configuration from environment variables.
    ///
    /// | Env Var          | Default                   |
    /// |------------------|---------------------------|
    /// | `DATABASE_URL`   | required                  |
    /// | `QUEUE_BASE_URL` | `https://queue.fal.run`   |
    /// | `FAL_KEY`        | unset                     |
    /// | `LOG_FORMAT`     | `text`                    |
    ///
    /// Polling settings are read by [`JobConfig::from_env`].
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = std::env::var("DATABASE_URL").map_err(|_| ConfigError::Missing {
            var: "DATABASE_URL",
        })?;
        let queue_base_url =
            std::env::var("QUEUE_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.into());
        let fal_key = std::env::var("FAL_KEY").ok().filter(|k| !k.is_empty());
        let log_format = match std::env::var("LOG_FORMAT") {
            Ok(name) => LogFormat::from_name(&name)?,
            Err(_) => LogFormat::default(),
        };

        Ok(Self {
            database_url,
            queue_base_url,
            fal_key,
            log_format,
            jobs: JobConfig::from_env()?,
        })
    }
}
