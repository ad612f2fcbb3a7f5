// Admin bearer token persistence: OS keyring first, opt-in file fallback
use keyring::Entry;
use log::{info, warn};
use std::path::PathBuf;

const SERVICE: &str = "celebration_site";
const USER: &str = "admin_session";

fn fallback_enabled() -> bool {
    std::env::var("KEYRING_FALLBACK").unwrap_or_default() == "true"
}

fn fallback_path() -> PathBuf {
    std::path::Path::new("data").join("admin_token.txt")
}

pub fn save_session_token(token: &str) -> anyhow::Result<()> {
    let entry = Entry::new(SERVICE, USER);
    match entry.set_password(token) {
        Ok(()) => Ok(()),
        Err(e) => {
            if !fallback_enabled() {
                // do not persist to disk silently; the caller decides
                return Err(anyhow::anyhow!("keyring unavailable ({}) and file fallback disabled", e));
            }
            let path = fallback_path();
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, token)?;
            warn!("[SESSION_STORE] Keyring unavailable, persisted token to fallback file");
            Ok(())
        }
    }
}

pub fn load_session_token() -> Option<String> {
    let entry = Entry::new(SERVICE, USER);
    match entry.get_password() {
        Ok(t) if !t.trim().is_empty() => Some(t),
        Ok(_) => None,
        Err(_) if fallback_enabled() => std::fs::read_to_string(fallback_path())
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|t| !t.is_empty()),
        Err(_) => None,
    }
}

pub fn clear_session_token() -> anyhow::Result<()> {
    let entry = Entry::new(SERVICE, USER);
    let _ = entry.delete_password();
    if fallback_enabled() {
        let path = fallback_path();
        if path.exists() {
            std::fs::remove_file(&path)?;
        }
    }
    info!("[SESSION_STORE] Admin token cleared");
    Ok(())
}
