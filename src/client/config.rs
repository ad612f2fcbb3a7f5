use crate::client::local_store::{DEFAULT_PREFIX, DEFAULT_QUOTA_BYTES};
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub cache_path: PathBuf,
    pub cache_prefix: String,
    pub cache_quota_bytes: usize,
    pub log_level: String,
}

impl ClientConfig {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self {
            api_base_url: env::var("API_BASE_URL").unwrap_or_else(|_| "http://127.0.0.1:5000".to_string()),
            cache_path: env::var("LOCAL_CACHE_PATH").map(PathBuf::from).unwrap_or_else(|_| PathBuf::from("data/local_cache.json")),
            cache_prefix: env::var("LOCAL_CACHE_PREFIX").unwrap_or_else(|_| DEFAULT_PREFIX.to_string()),
            cache_quota_bytes: env::var("LOCAL_CACHE_QUOTA_BYTES").ok().and_then(|v| v.parse().ok()).unwrap_or(DEFAULT_QUOTA_BYTES),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "warn".to_string()),
        }
    }
}
