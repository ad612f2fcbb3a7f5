use chrono::Utc;
use log::info;
use std::io::Write;

/// Logger setup shared by the server and the admin CLI
pub struct SiteLogger;

impl SiteLogger {
    /// Installs env_logger with the project line format. `RUST_LOG` wins over
    /// `default_level` when set.
    pub fn init(default_level: &str) {
        let env = env_logger::Env::default().default_filter_or(default_level);
        let result = env_logger::Builder::from_env(env)
            .format(|buf, record| {
                writeln!(
                    buf,
                    "[{}] [{}] [{}:{}] {}",
                    Utc::now().format("%Y-%m-%d %H:%M:%S UTC"),
                    record.level(),
                    record.file().unwrap_or("unknown"),
                    record.line().unwrap_or(0),
                    record.args()
                )
            })
            .try_init();

        if result.is_ok() {
            info!("Logger initialized (default level: {})", default_level);
        }
    }
}
