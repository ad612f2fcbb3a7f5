use crate::common::models::{Collection, merge_fields};
use log::{debug, info, warn};
use serde_json::{Map, Value};
use sqlx::{Row, SqlitePool, sqlite::SqlitePoolOptions};

/// Id under which the settings singleton is stored.
pub const SETTINGS_ID: &str = "site";

#[derive(Debug, Clone)]
pub struct Database {
    pub pool: SqlitePool,
}

impl Database {
    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        info!("🔗 Attempting to connect to database: {}", database_url);

        // Extract file path from database URL to create directory if needed
        let file_path = if let Some(path_part) = database_url.strip_prefix("sqlite://") {
            match path_part.find('?') {
                Some(query_pos) => &path_part[..query_pos],
                None => path_part,
            }
        } else if let Some(path_part) = database_url.strip_prefix("sqlite:") {
            match path_part.find('?') {
                Some(query_pos) => &path_part[..query_pos],
                None => path_part,
            }
        } else {
            database_url
        };

        if !file_path.contains(":memory:") {
            if let Some(parent) = std::path::Path::new(file_path).parent() {
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    debug!("📁 Creating database directory {:?}", parent);
                    std::fs::create_dir_all(parent).map_err(|e| {
                        warn!("❌ Failed to create directory: {}", e);
                        sqlx::Error::Configuration(Box::new(e))
                    })?;
                }
            }
            if std::path::Path::new(file_path).exists() {
                debug!("📄 Database file already exists");
            } else {
                debug!("📄 Database file does not exist, SQLite will create it");
            }
        }

        let url = if database_url.contains("mode=") || database_url.contains(":memory:") {
            database_url.to_string()
        } else if database_url.contains('?') {
            format!("{}&mode=rwc", database_url)
        } else {
            format!("{}?mode=rwc", database_url)
        };

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await
            .map_err(|e| {
                warn!("❌ SQLite connection failed: {}", e);
                e
            })?;

        info!("✅ Database connection successful!");
        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), sqlx::Error> {
        // One table holds every collection; bodies are JSON documents
        sqlx::query(r#"
            CREATE TABLE IF NOT EXISTS records (
                collection TEXT NOT NULL,
                id TEXT NOT NULL,
                body TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                PRIMARY KEY (collection, id)
            );
        "#).execute(&self.pool).await?;

        sqlx::query(r#"
            CREATE INDEX IF NOT EXISTS records_by_collection
            ON records (collection, created_at);
        "#).execute(&self.pool).await?;

        // Admin sessions
        sqlx::query(r#"
            CREATE TABLE IF NOT EXISTS sessions (
                session_token TEXT PRIMARY KEY,
                created_at INTEGER NOT NULL,
                expires_at INTEGER NOT NULL
            );
        "#).execute(&self.pool).await?;

        Ok(())
    }

    pub async fn list(&self, collection: Collection) -> Result<Vec<Value>, sqlx::Error> {
        let rows = sqlx::query("SELECT body FROM records WHERE collection = ? ORDER BY created_at, rowid")
            .bind(collection.as_str())
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().filter_map(|r| decode_body(r.get("body"))).collect())
    }

    pub async fn get(&self, collection: Collection, id: &str) -> Result<Option<Value>, sqlx::Error> {
        let row = sqlx::query("SELECT body FROM records WHERE collection = ? AND id = ?")
            .bind(collection.as_str())
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.and_then(|r| decode_body(r.get("body"))))
    }

    /// Stores a new document under a fresh server id and returns it.
    pub async fn insert(&self, collection: Collection, mut body: Map<String, Value>) -> Result<Value, sqlx::Error> {
        let id = uuid::Uuid::new_v4().to_string();
        body.remove("_id");
        body.insert("id".to_string(), Value::String(id.clone()));
        let doc = Value::Object(body);
        let now = chrono::Utc::now().timestamp_millis();
        sqlx::query("INSERT INTO records (collection, id, body, created_at, updated_at) VALUES (?, ?, ?, ?, ?)")
            .bind(collection.as_str())
            .bind(&id)
            .bind(doc.to_string())
            .bind(now)
            .bind(now)
            .execute(&self.pool)
            .await?;
        debug!("[DB] Inserted {}/{}", collection, id);
        Ok(doc)
    }

    /// Overwrites the body of an existing document. Returns `None` when the
    /// id does not exist in that collection.
    pub async fn replace(&self, collection: Collection, id: &str, mut body: Map<String, Value>) -> Result<Option<Value>, sqlx::Error> {
        body.remove("_id");
        body.insert("id".to_string(), Value::String(id.to_string()));
        let doc = Value::Object(body);
        let now = chrono::Utc::now().timestamp_millis();
        let res = sqlx::query("UPDATE records SET body = ?, updated_at = ? WHERE collection = ? AND id = ?")
            .bind(doc.to_string())
            .bind(now)
            .bind(collection.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;
        if res.rows_affected() == 0 {
            return Ok(None);
        }
        Ok(Some(doc))
    }

    pub async fn delete(&self, collection: Collection, id: &str) -> Result<bool, sqlx::Error> {
        let res = sqlx::query("DELETE FROM records WHERE collection = ? AND id = ?")
            .bind(collection.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    pub async fn count(&self, collection: Collection) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM records WHERE collection = ?")
            .bind(collection.as_str())
            .fetch_one(&self.pool)
            .await
    }

    pub async fn get_settings(&self) -> Result<Option<Value>, sqlx::Error> {
        self.get(Collection::Settings, SETTINGS_ID).await
    }

    /// Upserts the settings singleton by merging `patch` into what is stored.
    pub async fn put_settings(&self, patch: &Map<String, Value>) -> Result<Value, sqlx::Error> {
        let mut current = match self.get_settings().await? {
            Some(Value::Object(map)) => map,
            _ => Map::new(),
        };
        merge_fields(&mut current, patch);
        current.insert("id".to_string(), Value::String(SETTINGS_ID.to_string()));
        let doc = Value::Object(current);
        let now = chrono::Utc::now().timestamp_millis();
        sqlx::query(r#"
            INSERT INTO records (collection, id, body, created_at, updated_at) VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(collection, id) DO UPDATE SET body = excluded.body, updated_at = excluded.updated_at
        "#)
            .bind(Collection::Settings.as_str())
            .bind(SETTINGS_ID)
            .bind(doc.to_string())
            .bind(now)
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(doc)
    }

    /// Inserts the given records only when the collection holds nothing yet.
    /// Returns how many were inserted.
    pub async fn seed_if_empty(&self, collection: Collection, records: Vec<Value>) -> Result<usize, sqlx::Error> {
        if collection.is_singleton() || self.count(collection).await? > 0 {
            return Ok(0);
        }
        let mut inserted = 0;
        for record in records {
            if let Value::Object(map) = record {
                self.insert(collection, map).await?;
                inserted += 1;
            }
        }
        if inserted > 0 {
            info!("🌱 Seeded {} {} record(s)", inserted, collection);
        }
        Ok(inserted)
    }
}

fn decode_body(raw: String) -> Option<Value> {
    match serde_json::from_str(&raw) {
        Ok(v) => Some(v),
        Err(e) => {
            warn!("[DB] Skipping unreadable document: {}", e);
            None
        }
    }
}
