use crate::common::models::{Collection, merge_fields};
use crate::common::seed;
use crate::server::{auth, database::SETTINGS_ID, error::AppError, state::AppState};
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
};
use log::{debug, info};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, services::ServeDir};

type SharedState = Arc<AppState>;

pub fn build_router(state: SharedState) -> Router {
    let uploads = ServeDir::new(&state.config.upload_dir);
    let public = ServeDir::new(&state.config.public_dir);
    let body_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/api/health", get(health))
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/settings", get(get_settings).put(save_settings).post(save_settings))
        .route("/api/gallery/upload", post(upload_image))
        .route("/api/:collection", get(list_records).post(create_record))
        .route(
            "/api/:collection/:id",
            get(get_record).put(update_record).delete(delete_record),
        )
        .nest_service("/uploads", uploads)
        .fallback_service(public)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn json_body(body: Result<Json<Value>, JsonRejection>) -> Result<Value, AppError> {
    body.map(|Json(v)| v).map_err(|e| AppError::MalformedPayload(e.body_text()))
}

fn object_body(body: Result<Json<Value>, JsonRejection>) -> Result<Map<String, Value>, AppError> {
    match json_body(body)? {
        Value::Object(map) => Ok(map),
        _ => Err(AppError::MalformedPayload("expected a JSON object".to_string())),
    }
}

/// Collections that are addressed as lists. Settings has its own routes.
fn list_collection(name: &str) -> Result<Collection, AppError> {
    let collection: Collection = name.parse()?;
    if collection.is_singleton() {
        return Err(AppError::NotFound(format!("'{}' is not a list collection", name)));
    }
    Ok(collection)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

#[derive(Deserialize)]
struct LoginRequest {
    password: String,
}

async fn login(
    State(state): State<SharedState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = body.map_err(|e| AppError::MalformedPayload(e.body_text()))?;
    let grant = auth::login(&state.db, &state.admin_hash, &req.password, state.config.session_expiry_days).await?;
    Ok(Json(grant))
}

async fn logout(headers: HeaderMap, State(state): State<SharedState>) -> Result<Json<Value>, AppError> {
    let token = auth::bearer_token(&headers).ok_or(AppError::Unauthorized)?;
    auth::logout(&state.db, &token).await?;
    Ok(Json(json!({ "message": "Logged out" })))
}

async fn list_records(
    Path(collection): Path<String>,
    State(state): State<SharedState>,
) -> Result<Json<Value>, AppError> {
    let collection = list_collection(&collection)?;
    let records = state.db.list(collection).await?;
    debug!("[API] GET {} -> {} record(s)", collection, records.len());
    Ok(Json(Value::Array(records)))
}

async fn get_record(
    Path((collection, id)): Path<(String, String)>,
    State(state): State<SharedState>,
) -> Result<Json<Value>, AppError> {
    let collection = list_collection(&collection)?;
    state
        .db
        .get(collection, &id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("{} '{}' not found", collection, id)))
}

async fn create_record(
    headers: HeaderMap,
    Path(collection): Path<String>,
    State(state): State<SharedState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let collection = list_collection(&collection)?;
    auth::require_admin(&headers, &state.db).await?;
    let body = json_body(body)?;
    let normalized = collection.normalize(&body)?;
    let record = state.db.insert(collection, normalized).await?;
    info!("[API] Created {} record", collection);
    Ok((StatusCode::CREATED, Json(record)))
}

async fn update_record(
    headers: HeaderMap,
    Path((collection, id)): Path<(String, String)>,
    State(state): State<SharedState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let collection = list_collection(&collection)?;
    auth::require_admin(&headers, &state.db).await?;
    let patch = object_body(body)?;

    let mut merged = match state.db.get(collection, &id).await? {
        Some(Value::Object(map)) => map,
        _ => return Err(AppError::NotFound(format!("{} '{}' not found", collection, id))),
    };
    merge_fields(&mut merged, &patch);
    let normalized = collection.normalize(&Value::Object(merged))?;

    let record = state
        .db
        .replace(collection, &id, normalized)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{} '{}' not found", collection, id)))?;
    info!("[API] Updated {}/{}", collection, id);
    Ok(Json(record))
}

async fn delete_record(
    headers: HeaderMap,
    Path((collection, id)): Path<(String, String)>,
    State(state): State<SharedState>,
) -> Result<Json<Value>, AppError> {
    let collection = list_collection(&collection)?;
    auth::require_admin(&headers, &state.db).await?;
    if !state.db.delete(collection, &id).await? {
        return Err(AppError::NotFound(format!("{} '{}' not found", collection, id)));
    }
    info!("[API] Deleted {}/{}", collection, id);
    Ok(Json(json!({ "message": format!("{} '{}' deleted", collection, id) })))
}

async fn get_settings(State(state): State<SharedState>) -> Result<Json<Value>, AppError> {
    if let Some(stored) = state.db.get_settings().await? {
        return Ok(Json(stored));
    }
    let mut defaults = seed::settings();
    if let Value::Object(map) = &mut defaults {
        map.insert("id".to_string(), Value::String(SETTINGS_ID.to_string()));
    }
    Ok(Json(defaults))
}

async fn save_settings(
    headers: HeaderMap,
    State(state): State<SharedState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    auth::require_admin(&headers, &state.db).await?;
    let patch = object_body(body)?;
    let normalized = Collection::Settings.normalize(&Value::Object(patch))?;
    let saved = state.db.put_settings(&normalized).await?;
    info!("[API] Settings saved");
    Ok(Json(saved))
}

/// Keeps only a short alphanumeric extension from the client's file name.
fn stored_extension(file_name: &str) -> String {
    std::path::Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.len() <= 8 && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_else(|| "bin".to_string())
}

async fn upload_image(
    headers: HeaderMap,
    State(state): State<SharedState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    auth::require_admin(&headers, &state.db).await?;

    let mut image: Option<(String, Vec<u8>)> = None;
    let mut meta = Map::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::MalformedPayload(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "image" => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::MalformedPayload(e.body_text()))?;
                image = Some((file_name, bytes.to_vec()));
            }
            "title" | "description" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::MalformedPayload(e.body_text()))?;
                meta.insert(name.clone(), Value::String(text));
            }
            other => debug!("[API] Ignoring multipart field '{}'", other),
        }
    }

    let (file_name, bytes) =
        image.ok_or_else(|| AppError::MalformedPayload("missing 'image' field".to_string()))?;
    let stored_name = format!("{}.{}", uuid::Uuid::new_v4(), stored_extension(&file_name));
    tokio::fs::create_dir_all(&state.config.upload_dir).await?;
    tokio::fs::write(state.config.upload_dir.join(&stored_name), &bytes).await?;

    meta.insert("path".to_string(), Value::String(format!("/uploads/{}", stored_name)));
    meta.insert("fileName".to_string(), Value::String(file_name));
    meta.insert("uploadDate".to_string(), Value::String(chrono::Utc::now().to_rfc3339()));
    let normalized = Collection::Gallery.normalize(&Value::Object(meta))?;
    let record = state.db.insert(Collection::Gallery, normalized).await?;
    info!("[API] Stored gallery image {} ({} bytes)", stored_name, bytes.len());
    Ok((StatusCode::CREATED, Json(record)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extensions_are_sanitized() {
        assert_eq!(stored_extension("cake.JPG"), "jpg");
        assert_eq!(stored_extension("../../etc/passwd"), "bin");
        assert_eq!(stored_extension("weird.p$p"), "bin");
        assert_eq!(stored_extension("noext"), "bin");
    }

    #[test]
    fn settings_are_not_a_list_collection() {
        assert!(list_collection("settings").is_err());
        assert!(list_collection("unknown").is_err());
        assert_eq!(list_collection("notes").unwrap(), Collection::Notes);
    }
}
