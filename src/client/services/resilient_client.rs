//! CRUD client that keeps working when the API does not.
//!
//! Every call tries the server first. Reads that succeed are mirrored into the
//! local store; writes that fail (network error, 401, non-2xx, unreadable
//! body) are applied to the local store instead and come back tagged with a
//! [`FallbackReason`]. Locally created records get a `local_<millis>` id and
//! are never pushed back to the server automatically.
//!
//! The only error that reaches the caller is [`LocalStorageFull`].

use crate::client::error::{ApiError, FallbackReason};
use crate::client::local_store::{DEFAULT_PREFIX, LocalStorageFull, LocalStore, cache_key};
use crate::client::transport::{ApiRequest, Transport, UploadFile};
use crate::common::models::{Collection, merge_fields, record_id};
use crate::common::seed;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use log::{debug, info, warn};
use serde::Serialize;
use serde_json::{Map, Value};

/// Structured result of a write. Callers show a banner from it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteOutcome {
    pub success: bool,
    pub local_only: bool,
    pub id: Option<String>,
    pub record: Option<Value>,
    pub error: Option<String>,
    pub fallback: Option<FallbackReason>,
}

impl WriteOutcome {
    fn synced(id: Option<String>, record: Option<Value>) -> Self {
        Self { success: true, local_only: false, id, record, error: None, fallback: None }
    }

    fn local(id: Option<String>, record: Option<Value>, cause: &ApiError) -> Self {
        Self {
            success: true,
            local_only: true,
            id,
            record,
            error: Some(cause.to_string()),
            fallback: Some(FallbackReason::from(cause)),
        }
    }

    fn rejected(error: impl Into<String>) -> Self {
        Self { success: false, local_only: false, id: None, record: None, error: Some(error.into()), fallback: None }
    }
}

/// Optional text sent along with an uploaded image.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadMeta {
    pub title: Option<String>,
    pub description: Option<String>,
}

pub struct ResilientClient<T: Transport, S: LocalStore> {
    transport: T,
    store: S,
    prefix: String,
}

fn collection_path(collection: &str) -> String {
    collection.trim_matches('/').to_string()
}

/// Settings is a single object rather than a list of records.
fn is_singleton(collection: &str) -> bool {
    collection.parse::<Collection>().map_or(false, |c| c.is_singleton())
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Reads a server or cached body as a list of records. Singletons (settings)
/// are objects and count as a one-element list.
fn as_records(body: Value) -> Option<Vec<Value>> {
    match body {
        Value::Array(items) => Some(items),
        Value::Object(_) => Some(vec![body]),
        _ => None,
    }
}

fn data_url(file: &UploadFile) -> String {
    format!("data:{};base64,{}", file.content_type, STANDARD.encode(&file.bytes))
}

impl<T: Transport, S: LocalStore> ResilientClient<T, S> {
    pub fn new(transport: T, store: S) -> Self {
        Self::with_prefix(transport, store, DEFAULT_PREFIX)
    }

    pub fn with_prefix(transport: T, store: S, prefix: impl Into<String>) -> Self {
        Self { transport, store, prefix: prefix.into() }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn key(&self, collection: &str) -> String {
        cache_key(&self.prefix, collection)
    }

    async fn call(&self, request: ApiRequest) -> Result<Value, ApiError> {
        self.transport.send(request).await?.into_json()
    }

    fn read_cached(&self, key: &str) -> Option<Value> {
        let raw = self.store.get(key)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("[CLIENT] Cached value under '{}' is unreadable: {}", key, e);
                None
            }
        }
    }

    fn read_list(&self, key: &str) -> Vec<Value> {
        self.read_cached(key).and_then(as_records).unwrap_or_default()
    }

    fn write_cached(&self, key: &str, value: &Value) -> Result<(), LocalStorageFull> {
        self.store.set(key, &value.to_string())
    }

    fn write_list(&self, key: &str, records: Vec<Value>) -> Result<(), LocalStorageFull> {
        self.write_cached(key, &Value::Array(records))
    }

    /// `local_<millis>`, moved forward one millisecond at a time while the id
    /// is already taken in `records`.
    fn synthesize_id(records: &[Value]) -> String {
        let mut ts = now_millis();
        loop {
            let candidate = format!("local_{}", ts);
            if !records.iter().any(|r| record_id(r) == Some(candidate.as_str())) {
                return candidate;
            }
            ts += 1;
        }
    }

    /// Find by id and merge fields, or append when absent.
    fn upsert_local(&self, key: &str, id: &str, fields: &Map<String, Value>) -> Result<Value, LocalStorageFull> {
        let mut records = self.read_list(key);
        let updated = match records.iter_mut().find(|r| record_id(r) == Some(id)) {
            Some(Value::Object(existing)) => {
                merge_fields(existing, fields);
                Value::Object(existing.clone())
            }
            _ => {
                let mut fresh = fields.clone();
                fresh.remove("_id");
                fresh.insert("id".to_string(), Value::String(id.to_string()));
                let fresh = Value::Object(fresh);
                records.push(fresh.clone());
                fresh
            }
        };
        self.write_list(key, records)?;
        Ok(updated)
    }

    /// Removes `id` from the cached list. Returns whether anything changed.
    fn remove_local(&self, key: &str, id: &str) -> Result<bool, LocalStorageFull> {
        let mut records = self.read_list(key);
        let before = records.len();
        records.retain(|r| record_id(r) != Some(id));
        if records.len() == before {
            return Ok(false);
        }
        self.write_list(key, records)?;
        Ok(true)
    }

    fn append_local(&self, key: &str, mut record: Map<String, Value>) -> Result<(String, Value), LocalStorageFull> {
        let mut records = self.read_list(key);
        let id = match record_id(&Value::Object(record.clone())) {
            Some(existing) => existing.to_string(),
            None => Self::synthesize_id(&records),
        };
        record.insert("id".to_string(), Value::String(id.clone()));
        let record = Value::Object(record);
        records.push(record.clone());
        self.write_list(key, records)?;
        Ok((id, record))
    }

    /// Lists a collection. Falls back to the cached copy, or `[]`.
    pub async fn get(&self, collection: &str) -> Result<Vec<Value>, LocalStorageFull> {
        let key = self.key(collection);
        let fetched = self
            .call(ApiRequest::get(collection_path(collection)))
            .await
            .and_then(|body| match as_records(body.clone()) {
                Some(records) => Ok((body, records)),
                None => Err(ApiError::MalformedResponse(format!("expected a list for '{}'", collection))),
            });

        match fetched {
            Ok((body, records)) => {
                self.write_cached(&key, &body)?;
                debug!("[CLIENT] Mirrored {} {} record(s) into '{}'", records.len(), collection, key);
                Ok(records)
            }
            Err(ApiError::Unauthorized) => {
                debug!("[CLIENT] GET {} unauthorized, reading local cache", collection);
                Ok(self.read_list(&key))
            }
            Err(e) => {
                warn!("[CLIENT] GET {} failed ({}), reading local cache", collection, e);
                Ok(self.read_list(&key))
            }
        }
    }

    /// Single record by id, from the server or else from the cached list.
    pub async fn get_one(&self, collection: &str, id: &str) -> Result<Option<Value>, LocalStorageFull> {
        let path = format!("{}/{}", collection_path(collection), id);
        match self.call(ApiRequest::get(path)).await {
            Ok(record) if record.is_object() => Ok(Some(record)),
            Ok(_) => Ok(self.find_local(collection, id)),
            Err(ApiError::ServerError { status: 404, .. }) => Ok(self.find_local(collection, id)),
            Err(e) => {
                warn!("[CLIENT] GET {}/{} failed ({}), reading local cache", collection, id, e);
                Ok(self.find_local(collection, id))
            }
        }
    }

    fn find_local(&self, collection: &str, id: &str) -> Option<Value> {
        self.read_list(&self.key(collection))
            .into_iter()
            .find(|r| record_id(r) == Some(id))
    }

    /// Creates a record. Offline it lands in the local cache under a
    /// synthesized id.
    pub async fn post(&self, collection: &str, record: Value) -> Result<WriteOutcome, LocalStorageFull> {
        if is_singleton(collection) {
            return self.save_settings(record).await;
        }
        let Value::Object(fields) = record else {
            return Ok(WriteOutcome::rejected("record must be a JSON object"));
        };

        match self.call(ApiRequest::post(collection_path(collection), Value::Object(fields.clone()))).await {
            Ok(created) => {
                let id = record_id(&created).map(str::to_string);
                info!("[CLIENT] Created {} record {:?}", collection, id);
                Ok(WriteOutcome::synced(id, Some(created)))
            }
            Err(e) => {
                warn!("[CLIENT] POST {} failed ({}), saving locally", collection, e);
                let (id, saved) = self.append_local(&self.key(collection), fields)?;
                Ok(WriteOutcome::local(Some(id), Some(saved), &e))
            }
        }
    }

    /// Updates a record on the server and mirrors the change locally; offline
    /// the change is only applied locally (appended when the id is unknown).
    /// On settings the id is ignored and the fields merge into the object.
    pub async fn put(&self, collection: &str, id: &str, record: Value) -> Result<WriteOutcome, LocalStorageFull> {
        if is_singleton(collection) {
            return self.save_settings(record).await;
        }
        let Value::Object(fields) = record else {
            return Ok(WriteOutcome::rejected("record must be a JSON object"));
        };
        let key = self.key(collection);
        let path = format!("{}/{}", collection_path(collection), id);

        match self.call(ApiRequest::put(path, Value::Object(fields.clone()))).await {
            Ok(updated) => {
                let mirrored = match &updated {
                    Value::Object(server_fields) => server_fields,
                    _ => &fields,
                };
                self.upsert_local(&key, id, mirrored)?;
                info!("[CLIENT] Updated {}/{}", collection, id);
                Ok(WriteOutcome::synced(Some(id.to_string()), Some(updated)))
            }
            Err(e) => {
                warn!("[CLIENT] PUT {}/{} failed ({}), updating locally", collection, id, e);
                let saved = self.upsert_local(&key, id, &fields)?;
                Ok(WriteOutcome::local(Some(id.to_string()), Some(saved), &e))
            }
        }
    }

    /// Deletes a record from the server and the cache. Removing an id that is
    /// not cached is a no-op, so repeating the call is harmless.
    pub async fn delete(&self, collection: &str, id: &str) -> Result<WriteOutcome, LocalStorageFull> {
        if is_singleton(collection) {
            return Ok(WriteOutcome::rejected(format!("{} cannot be deleted", collection_path(collection))));
        }
        let key = self.key(collection);
        let path = format!("{}/{}", collection_path(collection), id);

        match self.call(ApiRequest::delete(path)).await {
            Ok(_) => {
                self.remove_local(&key, id)?;
                info!("[CLIENT] Deleted {}/{}", collection, id);
                Ok(WriteOutcome::synced(Some(id.to_string()), None))
            }
            Err(e) => {
                let removed = self.remove_local(&key, id)?;
                warn!("[CLIENT] DELETE {}/{} failed ({}), removed locally: {}", collection, id, e, removed);
                Ok(WriteOutcome::local(Some(id.to_string()), None, &e))
            }
        }
    }

    /// Uploads an image to `<collection>/upload`. Offline the bytes are kept
    /// inline in the cached record as a data URL.
    pub async fn upload_binary(&self, collection: &str, file: UploadFile, meta: UploadMeta) -> Result<WriteOutcome, LocalStorageFull> {
        let mut fields = Vec::new();
        if let Some(title) = &meta.title {
            fields.push(("title".to_string(), title.clone()));
        }
        if let Some(description) = &meta.description {
            fields.push(("description".to_string(), description.clone()));
        }
        let path = format!("{}/upload", collection_path(collection));

        match self.call(ApiRequest::upload(path, file.clone(), fields)).await {
            Ok(stored) => {
                let id = record_id(&stored).map(str::to_string);
                info!("[CLIENT] Uploaded {} ({} bytes)", file.file_name, file.bytes.len());
                Ok(WriteOutcome::synced(id, Some(stored)))
            }
            Err(e) => {
                warn!("[CLIENT] Upload of {} failed ({}), keeping it inline in the local cache", file.file_name, e);
                let inline = data_url(&file);
                let mut record = Map::new();
                record.insert("path".to_string(), Value::String(inline));
                record.insert("fileName".to_string(), Value::String(file.file_name.clone()));
                record.insert("contentType".to_string(), Value::String(file.content_type.clone()));
                if let Some(title) = meta.title {
                    record.insert("title".to_string(), Value::String(title));
                }
                if let Some(description) = meta.description {
                    record.insert("description".to_string(), Value::String(description));
                }
                record.insert("uploadDate".to_string(), Value::String(chrono::Utc::now().to_rfc3339()));
                let (id, saved) = self.append_local(&self.key(collection), record)?;
                Ok(WriteOutcome::local(Some(id), Some(saved), &e))
            }
        }
    }

    /// Site settings object, from the server or the cached copy (`{}` when
    /// neither exists).
    pub async fn get_settings(&self) -> Result<Value, LocalStorageFull> {
        let name = Collection::Settings.as_str();
        let key = self.key(name);
        match self.call(ApiRequest::get(name)).await {
            Ok(settings) if settings.is_object() => {
                self.write_cached(&key, &settings)?;
                Ok(settings)
            }
            Ok(_) => {
                warn!("[CLIENT] Settings response is not an object, reading local cache");
                Ok(self.cached_settings(&key))
            }
            Err(e) => {
                warn!("[CLIENT] GET settings failed ({}), reading local cache", e);
                Ok(self.cached_settings(&key))
            }
        }
    }

    fn cached_settings(&self, key: &str) -> Value {
        match self.read_cached(key) {
            Some(Value::Object(map)) => Value::Object(map),
            Some(Value::Array(mut items)) if !items.is_empty() && items[0].is_object() => items.swap_remove(0),
            _ => Value::Object(Map::new()),
        }
    }

    /// Saves settings fields. Offline they are merged into the cached object.
    pub async fn save_settings(&self, patch: Value) -> Result<WriteOutcome, LocalStorageFull> {
        let Value::Object(fields) = patch else {
            return Ok(WriteOutcome::rejected("settings must be a JSON object"));
        };
        let name = Collection::Settings.as_str();
        let key = self.key(name);

        match self.call(ApiRequest::put(name, Value::Object(fields.clone()))).await {
            Ok(saved) => {
                if saved.is_object() {
                    self.write_cached(&key, &saved)?;
                }
                let id = record_id(&saved).map(str::to_string);
                Ok(WriteOutcome::synced(id, Some(saved)))
            }
            Err(e) => {
                warn!("[CLIENT] Saving settings failed ({}), updating locally", e);
                let mut current = match self.cached_settings(&key) {
                    Value::Object(map) => map,
                    _ => Map::new(),
                };
                merge_fields(&mut current, &fields);
                let merged = Value::Object(current);
                self.write_cached(&key, &merged)?;
                let id = record_id(&merged).map(str::to_string);
                Ok(WriteOutcome::local(id, Some(merged), &e))
            }
        }
    }

    /// Offline demo mode: fills empty cached collections with the seed data.
    /// Returns how many records were written.
    pub fn seed_offline_demo(&self) -> Result<usize, LocalStorageFull> {
        let mut written = 0;
        for collection in Collection::ALL {
            let key = self.key(collection.as_str());
            if collection.is_singleton() {
                if self.store.get(&key).is_none() {
                    self.write_cached(&key, &seed::settings())?;
                    written += 1;
                }
                continue;
            }
            if !self.read_list(&key).is_empty() {
                continue;
            }
            for record in seed::records(collection) {
                if let Value::Object(fields) = record {
                    self.append_local(&key, fields)?;
                    written += 1;
                }
            }
        }
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::local_store::{DEFAULT_QUOTA_BYTES, MemoryStore};
    use crate::client::transport::{ApiResponse, Method};
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays canned outcomes and records what was asked.
    #[derive(Default)]
    struct ScriptedTransport {
        replies: Mutex<VecDeque<Result<ApiResponse, ApiError>>>,
        seen: Mutex<Vec<ApiRequest>>,
    }

    impl ScriptedTransport {
        fn replying(replies: Vec<Result<ApiResponse, ApiError>>) -> Self {
            Self { replies: Mutex::new(replies.into()), seen: Mutex::default() }
        }

        fn offline() -> Self {
            Self::default()
        }

        fn seen(&self) -> Vec<ApiRequest> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
            self.seen.lock().unwrap().push(request);
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(ApiError::NetworkUnavailable("connection refused".to_string())))
        }
    }

    fn ok(body: Value) -> Result<ApiResponse, ApiError> {
        Ok(ApiResponse::new(200, body.to_string()))
    }

    fn status(code: u16) -> Result<ApiResponse, ApiError> {
        Ok(ApiResponse::new(code, r#"{"error":"nope"}"#))
    }

    fn client(transport: ScriptedTransport) -> ResilientClient<ScriptedTransport, MemoryStore> {
        ResilientClient::new(transport, MemoryStore::new())
    }

    fn cached(c: &ResilientClient<ScriptedTransport, MemoryStore>, collection: &str) -> Option<Value> {
        c.store().get(&c.key(collection)).map(|raw| serde_json::from_str(&raw).unwrap())
    }

    #[tokio::test]
    async fn successful_get_is_mirrored_into_an_empty_cache() {
        let events = json!([{"id": "e1", "title": "Welcome Dinner"}]);
        let c = client(ScriptedTransport::replying(vec![ok(events.clone())]));

        let got = c.get("events").await.unwrap();

        assert_eq!(Value::Array(got), events);
        assert_eq!(cached(&c, "events"), Some(events));
        assert_eq!(c.transport().seen()[0].path, "events");
        assert_eq!(c.transport().seen()[0].method, Method::Get);
    }

    #[tokio::test]
    async fn successful_get_overwrites_the_previous_copy() {
        let c = client(ScriptedTransport::replying(vec![ok(json!([{"id": "n2"}]))]));
        c.store().set(&c.key("notes"), r#"[{"id":"n1"}]"#).unwrap();

        c.get("notes").await.unwrap();

        assert_eq!(cached(&c, "notes"), Some(json!([{"id": "n2"}])));
    }

    #[tokio::test]
    async fn failed_get_returns_prior_cache_or_empty() {
        for failure in [status(401), Err(ApiError::NetworkUnavailable("down".into())), status(500), ok(json!("text"))] {
            let c = client(ScriptedTransport::replying(vec![failure.clone(), failure]));
            assert_eq!(c.get("reminders").await.unwrap(), Vec::<Value>::new());

            c.store().set(&c.key("reminders"), r#"[{"id":"r1","title":"RSVP"}]"#).unwrap();
            assert_eq!(c.get("reminders").await.unwrap(), vec![json!({"id": "r1", "title": "RSVP"})]);
        }
    }

    #[tokio::test]
    async fn offline_post_appends_with_local_id_next_to_cached_records() {
        let c = client(ScriptedTransport::offline());
        c.store()
            .set(&c.key("contacts"), r#"[{"id":"local_1700000000000","name":"Jane"}]"#)
            .unwrap();

        let outcome = c.post("contacts", json!({"name": "Bob"})).await.unwrap();

        assert!(outcome.success && outcome.local_only);
        assert_eq!(outcome.fallback, Some(FallbackReason::Offline));
        let id = outcome.id.unwrap();
        assert!(id.starts_with("local_"));
        assert_ne!(id, "local_1700000000000");

        let names: Vec<Value> = c.get("contacts").await.unwrap().into_iter().map(|r| r["name"].clone()).collect();
        assert_eq!(names, vec![json!("Jane"), json!("Bob")]);
    }

    #[tokio::test]
    async fn online_post_returns_the_server_record_untouched() {
        let created = json!({"id": "srv-1", "title": "Toast"});
        let c = client(ScriptedTransport::replying(vec![Ok(ApiResponse::new(201, created.to_string()))]));

        let outcome = c.post("events", json!({"title": "Toast"})).await.unwrap();

        assert_eq!(outcome, WriteOutcome::synced(Some("srv-1".into()), Some(created)));
        assert_eq!(cached(&c, "events"), None);
    }

    #[tokio::test]
    async fn unauthorized_post_keeps_an_existing_id_and_flags_login() {
        let c = client(ScriptedTransport::replying(vec![status(401)]));

        let outcome = c.post("notes", json!({"id": "keep-me", "title": "T"})).await.unwrap();

        assert_eq!(outcome.id.as_deref(), Some("keep-me"));
        assert!(outcome.fallback.unwrap().needs_login());
    }

    #[tokio::test]
    async fn rapid_offline_posts_get_distinct_ids() {
        let c = client(ScriptedTransport::offline());
        let a = c.post("notes", json!({"title": "a"})).await.unwrap().id.unwrap();
        let b = c.post("notes", json!({"title": "b"})).await.unwrap().id.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn non_object_records_are_rejected_without_touching_anything() {
        let c = client(ScriptedTransport::offline());
        let outcome = c.post("notes", json!(["x"])).await.unwrap();
        assert!(!outcome.success);
        assert!(c.transport().seen().is_empty());
        assert_eq!(cached(&c, "notes"), None);
    }

    #[tokio::test]
    async fn offline_put_of_unknown_id_appends() {
        let c = client(ScriptedTransport::offline());
        c.store().set(&c.key("events"), r#"[{"id":"e1","title":"A"}]"#).unwrap();

        let outcome = c.put("events", "e9", json!({"title": "Late addition"})).await.unwrap();

        assert!(outcome.local_only);
        assert_eq!(
            cached(&c, "events"),
            Some(json!([{"id": "e1", "title": "A"}, {"id": "e9", "title": "Late addition"}]))
        );
    }

    #[tokio::test]
    async fn offline_put_merges_fields_of_a_known_record() {
        let c = client(ScriptedTransport::offline());
        c.store().set(&c.key("events"), r#"[{"_id":"e1","title":"A","location":"Pier"}]"#).unwrap();

        c.put("events", "e1", json!({"title": "B"})).await.unwrap();

        assert_eq!(cached(&c, "events"), Some(json!([{"_id": "e1", "title": "B", "location": "Pier"}])));
    }

    #[tokio::test]
    async fn successful_put_mirrors_the_server_copy() {
        let server_copy = json!({"id": "e1", "title": "B", "location": "Villa"});
        let c = client(ScriptedTransport::replying(vec![ok(server_copy.clone())]));
        c.store().set(&c.key("events"), r#"[{"id":"e1","title":"A"}]"#).unwrap();

        let outcome = c.put("events", "e1", json!({"title": "B"})).await.unwrap();

        assert!(!outcome.local_only);
        assert_eq!(cached(&c, "events"), Some(json!([server_copy])));
        assert_eq!(c.transport().seen()[0].path, "events/e1");
    }

    #[tokio::test]
    async fn unauthorized_delete_removes_the_cached_record() {
        let c = client(ScriptedTransport::replying(vec![status(401)]));
        c.store()
            .set(&c.key("notes"), r#"[{"id":"n1","title":"x"},{"id":"n2","title":"y"}]"#)
            .unwrap();

        let outcome = c.delete("notes", "n1").await.unwrap();

        assert_eq!(outcome.fallback, Some(FallbackReason::Unauthorized));
        assert_eq!(cached(&c, "notes"), Some(json!([{"id": "n2", "title": "y"}])));
    }

    #[tokio::test]
    async fn delete_twice_is_harmless_online_and_offline() {
        let c = client(ScriptedTransport::replying(vec![ok(json!({"message": "deleted"})), status(404)]));
        c.store().set(&c.key("notes"), r#"[{"id":"n1"}]"#).unwrap();

        let first = c.delete("notes", "n1").await.unwrap();
        let second = c.delete("notes", "n1").await.unwrap();
        let third = c.delete("notes", "n1").await.unwrap();

        assert!(first.success && second.success && third.success);
        assert_eq!(second.fallback, Some(FallbackReason::Server(404)));
        assert_eq!(cached(&c, "notes"), Some(json!([])));
    }

    #[tokio::test]
    async fn failed_upload_keeps_the_bytes_inline() {
        let c = client(ScriptedTransport::offline());
        let bytes: Vec<u8> = (0u8..=255).collect();
        let file = UploadFile::new("cake.png", bytes.clone());
        let meta = UploadMeta { title: Some("Cake".into()), description: None };

        let outcome = c.upload_binary("gallery", file, meta).await.unwrap();

        assert!(outcome.local_only);
        let record = outcome.record.unwrap();
        let url = record["path"].as_str().unwrap();
        let encoded = url.strip_prefix("data:image/png;base64,").unwrap();
        assert_eq!(STANDARD.decode(encoded).unwrap(), bytes);
        assert_eq!(record["title"], "Cake");
        assert_eq!(c.get("gallery").await.unwrap(), vec![record]);
    }

    #[tokio::test]
    async fn offline_upload_stores_the_payload_once() {
        let c = ResilientClient::new(ScriptedTransport::offline(), MemoryStore::with_quota(DEFAULT_QUOTA_BYTES));
        let bytes = vec![7u8; 2 * 1024 * 1024];

        let outcome = c
            .upload_binary("gallery", UploadFile::new("big.jpg", bytes), UploadMeta::default())
            .await
            .unwrap();

        assert!(outcome.local_only);
        let record = outcome.record.unwrap();
        assert!(record["path"].as_str().unwrap().starts_with("data:image/jpeg;base64,"));
        assert!(record.get("url").is_none());
        let stored = c.store().get(&c.key("gallery")).unwrap();
        assert!(stored.len() < 3 * 1024 * 1024);
    }

    #[tokio::test]
    async fn successful_upload_returns_the_reference() {
        let stored = json!({"id": "g1", "path": "/uploads/abc.png"});
        let c = client(ScriptedTransport::replying(vec![Ok(ApiResponse::new(201, stored.to_string()))]));

        let outcome = c.upload_binary("gallery", UploadFile::new("a.png", vec![1]), UploadMeta::default()).await.unwrap();

        assert_eq!(outcome.record, Some(stored));
        assert_eq!(c.transport().seen()[0].path, "gallery/upload");
        assert_eq!(cached(&c, "gallery"), None);
    }

    #[tokio::test]
    async fn full_storage_propagates() {
        let c = ResilientClient::new(ScriptedTransport::offline(), MemoryStore::with_quota(16));
        let err = c.post("notes", json!({"title": "this will not fit anywhere"})).await.unwrap_err();
        assert_eq!(err.key, "celebration_notes");
    }

    #[tokio::test]
    async fn full_storage_on_mirroring_propagates() {
        let big = json!([{"id": "e1", "title": "x".repeat(64)}]);
        let c = ResilientClient::new(ScriptedTransport::replying(vec![ok(big)]), MemoryStore::with_quota(32));
        assert!(c.get("events").await.is_err());
    }

    #[tokio::test]
    async fn settings_round_trip_offline() {
        let c = client(ScriptedTransport::offline());
        assert_eq!(c.get_settings().await.unwrap(), json!({}));

        let outcome = c.save_settings(json!({"siteTitle": "Party"})).await.unwrap();
        assert!(outcome.local_only);
        c.save_settings(json!({"primaryColor": "#000"})).await.unwrap();

        assert_eq!(c.get_settings().await.unwrap(), json!({"siteTitle": "Party", "primaryColor": "#000"}));
    }

    #[tokio::test]
    async fn generic_writes_on_settings_merge_into_the_object() {
        let c = client(ScriptedTransport::offline());
        c.save_settings(json!({"siteTitle": "Old"})).await.unwrap();

        let posted = c.post("settings", json!({"siteTitle": "New"})).await.unwrap();
        assert!(posted.local_only);
        c.put("settings", "site", json!({"primaryColor": "#abc"})).await.unwrap();

        assert_eq!(cached(&c, "settings"), Some(json!({"siteTitle": "New", "primaryColor": "#abc"})));
        assert_eq!(c.get_settings().await.unwrap(), json!({"siteTitle": "New", "primaryColor": "#abc"}));

        let deleted = c.delete("settings", "site").await.unwrap();
        assert!(!deleted.success);
        assert!(cached(&c, "settings").is_some());
    }

    #[tokio::test]
    async fn generic_update_on_settings_targets_the_singleton_route() {
        let saved = json!({"id": "site", "siteTitle": "Forty"});
        let c = client(ScriptedTransport::replying(vec![ok(saved.clone())]));

        let outcome = c.put("settings", "site", json!({"siteTitle": "Forty"})).await.unwrap();

        assert!(!outcome.local_only);
        let seen = c.transport().seen();
        assert_eq!(seen[0].path, "settings");
        assert_eq!(seen[0].method, Method::Put);
        assert_eq!(cached(&c, "settings"), Some(saved));
    }

    #[tokio::test]
    async fn settings_from_server_are_cached_verbatim() {
        let settings = json!({"id": "site", "siteTitle": "Party"});
        let c = client(ScriptedTransport::replying(vec![ok(settings.clone())]));
        assert_eq!(c.get_settings().await.unwrap(), settings);
        assert_eq!(cached(&c, "settings"), Some(settings.clone()));
        // still readable through the generic list view once offline
        assert_eq!(c.get("settings").await.unwrap(), vec![settings]);
    }

    #[tokio::test]
    async fn get_one_falls_back_to_the_cached_list() {
        let c = client(ScriptedTransport::replying(vec![status(404)]));
        c.store().set(&c.key("contacts"), r#"[{"id":"local_1","name":"Jane"}]"#).unwrap();
        assert_eq!(c.get_one("contacts", "local_1").await.unwrap(), Some(json!({"id": "local_1", "name": "Jane"})));
        assert_eq!(c.get_one("contacts", "nobody").await.unwrap(), None);
    }

    #[tokio::test]
    async fn demo_seed_only_fills_empty_collections() {
        let c = client(ScriptedTransport::offline());
        c.store().set(&c.key("notes"), r#"[{"id":"mine","title":"Keep"}]"#).unwrap();

        let written = c.seed_offline_demo().unwrap();

        assert!(written > 0);
        assert_eq!(c.get("notes").await.unwrap(), vec![json!({"id": "mine", "title": "Keep"})]);
        let events = c.get("events").await.unwrap();
        assert_eq!(events.len(), seed::events().len());
        assert!(events.iter().all(|e| record_id(e).unwrap().starts_with("local_")));
        assert_eq!(c.seed_offline_demo().unwrap(), 0);
    }
}
