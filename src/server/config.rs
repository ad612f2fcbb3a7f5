use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub upload_dir: PathBuf,
    pub public_dir: PathBuf,
    pub admin_password: Option<String>,
    pub session_expiry_days: u32,
    pub max_upload_bytes: usize,
    pub seed_demo_data: bool,
    pub stats_log_path: String,
    pub stats_interval_secs: u64,
    pub log_level: String,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            host: env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("SERVER_PORT").ok().and_then(|p| p.parse().ok()).unwrap_or(5000),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:data/celebration.db".to_string()),
            upload_dir: env::var("UPLOAD_DIR").map(PathBuf::from).unwrap_or_else(|_| PathBuf::from("data/uploads")),
            public_dir: env::var("PUBLIC_DIR").map(PathBuf::from).unwrap_or_else(|_| PathBuf::from("public")),
            admin_password: env::var("ADMIN_PASSWORD").ok().filter(|p| !p.trim().is_empty()),
            session_expiry_days: env::var("SESSION_EXPIRY_DAYS").ok().and_then(|v| v.parse().ok()).unwrap_or(7),
            max_upload_bytes: env::var("MAX_UPLOAD_BYTES").ok().and_then(|v| v.parse().ok()).unwrap_or(10 * 1024 * 1024),
            seed_demo_data: env::var("SEED_DEMO_DATA").map(|v| v == "true" || v == "1").unwrap_or(true),
            stats_log_path: env::var("STATS_LOG_PATH").unwrap_or_else(|_| "data/celebration_stats.log".to_string()),
            stats_interval_secs: env::var("STATS_INTERVAL_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(120),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            database_url: "sqlite:data/celebration.db".to_string(),
            upload_dir: PathBuf::from("data/uploads"),
            public_dir: PathBuf::from("public"),
            admin_password: None,
            session_expiry_days: 7,
            max_upload_bytes: 10 * 1024 * 1024,
            seed_demo_data: true,
            stats_log_path: "data/celebration_stats.log".to_string(),
            stats_interval_secs: 120,
            log_level: "info".to_string(),
        }
    }
}
