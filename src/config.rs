use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::llm::{DEFAULT_BASE_URL, DEFAULT_MODEL};

// CLI argument structure
#[derive(Parser, Debug, Clone)]
#[command(name = "keywords-gateway")]
#[command(about = "Caching, rate-limited gateway for the keywords language tools")]
pub struct Args {
    // Port to run the server on
    #[arg(short, long, default_value_t = 8080)]
    pub port: u16,

    // API key for the completion service
    #[arg(long, env = "GROQ_API_KEY", hide_env_values = true)]
    pub api_key: String,

    // OpenAI-compatible base url
    #[arg(long, env = "KEYWORDS_API_BASE", default_value = DEFAULT_BASE_URL)]
    pub api_base: String,

    #[arg(long, env = "KEYWORDS_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    // Store file, or "memory" for a store that lives only as long as the process
    #[arg(long, env = "KEYWORDS_STORE")]
    pub store: Option<String>,

    // Refuse store writes that would grow the file past this many bytes
    #[arg(long, env = "KEYWORDS_STORE_QUOTA_BYTES")]
    pub store_quota_bytes: Option<usize>,

    // Cache TTL in seconds (one year)
    #[arg(short, long, env = "KEYWORDS_CACHE_TTL", default_value_t = 365 * 24 * 60 * 60)]
    pub cache_ttl: u64,

    // Seconds between two submissions of the same feature
    #[arg(long, env = "KEYWORDS_COOLDOWN", default_value_t = 300)]
    pub cooldown: u64,

    // Periodic expired-entry sweep in seconds, 0 disables it
    #[arg(long, env = "KEYWORDS_SWEEP_INTERVAL", default_value_t = 3600)]
    pub sweep_interval: u64,

    // Enables the cache administration routes
    #[arg(long, env = "KEYWORDS_ADMIN_TOKEN", hide_env_values = true)]
    pub admin_token: Option<String>,

    // Submissions waiting for the worker
    #[arg(long, env = "KEYWORDS_QUEUE_DEPTH", default_value_t = 100)]
    pub queue_depth: usize,
}

/// Where the key-value store lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    Memory,
    File(PathBuf),
}

impl Args {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown)
    }

    pub fn sweep_interval(&self) -> Option<Duration> {
        (self.sweep_interval > 0).then(|| Duration::from_secs(self.sweep_interval))
    }

    /// The configured store, falling back to the platform data directory.
    pub fn store_location(&self) -> Option<StoreLocation> {
        match self.store.as_deref() {
            Some("memory") => Some(StoreLocation::Memory),
            Some(path) => Some(StoreLocation::File(PathBuf::from(path))),
            None => directories::ProjectDirs::from("dev", "keywords", "keywords-gateway")
                .map(|dirs| StoreLocation::File(dirs.data_dir().join("store.json"))),
        }
    }
}
