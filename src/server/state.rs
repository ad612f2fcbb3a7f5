use crate::server::{auth, config::ServerConfig, database::Database};
use log::{info, warn};
use std::sync::Arc;

pub struct AppState {
    pub db: Database,
    pub config: ServerConfig,
    pub admin_hash: String,
}

impl AppState {
    pub fn new(db: Database, config: ServerConfig) -> anyhow::Result<Arc<Self>> {
        let password = match &config.admin_password {
            Some(p) => {
                info!("[AUTH] Using ADMIN_PASSWORD from environment");
                p.clone()
            }
            None => {
                let generated = auth::generate_password();
                warn!("[AUTH] ADMIN_PASSWORD not set, generated admin password: {}", generated);
                generated
            }
        };
        let admin_hash = auth::hash_password(&password)?;

        Ok(Arc::new(Self { db, config, admin_hash }))
    }
}
