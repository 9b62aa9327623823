use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_PRICE_URL: &str = "https://www.example.com/search";

const DEFAULT_TIMEOUT_MS: u64 = 10_000;
const MIN_TIMEOUT_MS: u64 = 1_000;
const MAX_TIMEOUT_MS: u64 = 60_000;

/// Runtime configuration, read once at startup from the environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub price_url: String,
    pub price_timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let db_path = env::var("COLLECTION_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_data_dir().join("collection.db"));
        let price_url = env::var("COLLECTION_PRICE_URL").unwrap_or_else(|_| DEFAULT_PRICE_URL.to_string());
        let timeout_ms = env::var("COLLECTION_PRICE_TIMEOUT_MS")
            .ok()
            .and_then(|raw| raw.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_MS);

        Self {
            db_path,
            price_url,
            price_timeout: Duration::from_millis(clamp_timeout_ms(timeout_ms)),
        }
    }
}

pub fn default_data_dir() -> PathBuf {
    if let Some(data) = dirs::data_dir() {
        data.join("collection-tracker")
    } else {
        PathBuf::from(".collection-tracker")
    }
}

fn clamp_timeout_ms(requested: u64) -> u64 {
    requested.clamp(MIN_TIMEOUT_MS, MAX_TIMEOUT_MS)
}
