// Minimal admin authentication: one shared password, bearer session tokens
use crate::server::database::Database;
use crate::server::error::AppError;
use argon2::{Argon2, password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString}};
use axum::http::{HeaderMap, header};
use log::{info, warn};
use rand::RngCore;
use serde::Serialize;
use sqlx::Row;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionGrant {
    pub token: String,
    pub expires_at: i64,
}

pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let mut salt_bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut salt_bytes);
    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| anyhow::anyhow!("salt encoding failed: {}", e))?;
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?;
    Ok(hash.to_string())
}

pub fn verify_password(hash: &str, password: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok(),
        Err(_) => false,
    }
}

/// Random admin password used when none is configured.
pub fn generate_password() -> String {
    let mut random = [0u8; 12];
    rand::thread_rng().fill_bytes(&mut random);
    format!("{:x}", md5::compute(random))[..16].to_string()
}

fn generate_session_token() -> String {
    let uuid = uuid::Uuid::new_v4().to_string();
    let mut random = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut random);
    format!("{}-{:x}", uuid, md5::compute(random))
}

pub async fn login(db: &Database, admin_hash: &str, password: &str, expiry_days: u32) -> Result<SessionGrant, AppError> {
    if !verify_password(admin_hash, password) {
        warn!("[AUTH] Login rejected: wrong password");
        return Err(AppError::Unauthorized);
    }
    let token = generate_session_token();
    let now = chrono::Utc::now().timestamp();
    let expires_at = now + i64::from(expiry_days) * 24 * 3600;
    sqlx::query("INSERT INTO sessions (session_token, created_at, expires_at) VALUES (?, ?, ?)")
        .bind(&token)
        .bind(now)
        .bind(expires_at)
        .execute(&db.pool)
        .await?;
    // Drop whatever has expired in the meantime
    sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
        .bind(now)
        .execute(&db.pool)
        .await?;
    info!("[AUTH] Admin session opened (token masked)");
    Ok(SessionGrant { token, expires_at })
}

pub async fn logout(db: &Database, token: &str) -> Result<bool, AppError> {
    let res = sqlx::query("DELETE FROM sessions WHERE session_token = ?")
        .bind(token)
        .execute(&db.pool)
        .await?;
    info!("[AUTH] Logout, removed {} session(s)", res.rows_affected());
    Ok(res.rows_affected() > 0)
}

pub async fn validate_session(db: &Database, token: &str) -> bool {
    let now = chrono::Utc::now().timestamp();
    let row = sqlx::query("SELECT expires_at FROM sessions WHERE session_token = ?")
        .bind(token)
        .fetch_optional(&db.pool)
        .await;
    match row {
        Ok(Some(r)) => r.get::<i64, _>("expires_at") > now,
        Ok(None) => false,
        Err(e) => {
            warn!("[AUTH] Session lookup failed: {}", e);
            false
        }
    }
}

pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

/// Fails with 401 unless the request carries a live session token.
pub async fn require_admin(headers: &HeaderMap, db: &Database) -> Result<(), AppError> {
    let token = bearer_token(headers).ok_or(AppError::Unauthorized)?;
    if validate_session(db, &token).await {
        Ok(())
    } else {
        Err(AppError::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn password_hash_verifies_only_the_original() {
        let hash = hash_password("party-time").unwrap();
        assert!(verify_password(&hash, "party-time"));
        assert!(!verify_password(&hash, "party-tim3"));
        assert!(!verify_password("not a hash", "party-time"));
    }

    #[test]
    fn bearer_token_requires_the_scheme() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        assert_eq!(bearer_token(&headers).as_deref(), Some("abc"));
    }
}
