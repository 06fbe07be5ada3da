use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "shelfwise-server", about = "Social reading platform JSON API")]
pub struct Config {
    /// Database URL (sqlite://path/to/db.sqlite), created if missing
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://shelfwise.db")]
    pub database_url: String,

    /// Address to listen on
    #[arg(long, env = "SHELFWISE_BIND", default_value = "0.0.0.0:3000")]
    pub bind: SocketAddr,

    /// Timeout for fetching link previews, in seconds
    #[arg(long, env = "SHELFWISE_PREVIEW_TIMEOUT_SECS", default_value_t = 5)]
    pub preview_timeout_secs: u64,

    /// Link preview bodies are truncated beyond this many bytes
    #[arg(long, env = "SHELFWISE_PREVIEW_MAX_BYTES", default_value_t = 1_048_576)]
    pub preview_max_bytes: usize,

    /// How long generated recommendations are cached, in hours
    #[arg(long, env = "SHELFWISE_RECOMMENDATION_TTL_HOURS", default_value_t = 24)]
    pub recommendation_ttl_hours: i64,

    /// Allowed CORS origin; cross-origin requests are refused when unset
    #[arg(long, env = "SHELFWISE_CORS_ORIGIN")]
    pub cors_origin: Option<String>,
}

impl Config {
    pub fn preview_timeout(&self) -> Duration {
        Duration::from_secs(self.preview_timeout_secs)
    }

    pub fn recommendation_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.recommendation_ttl_hours)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite://shelfwise.db".to_string(),
            bind: SocketAddr::from(([0, 0, 0, 0], 3000)),
            preview_timeout_secs: 5,
            preview_max_bytes: 1_048_576,
            recommendation_ttl_hours: 24,
            cors_origin: None,
        }
    }
}
