// Domain records shared between the API server and the admin client
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Events,
    Contacts,
    Reminders,
    Notes,
    Gallery,
    Settings,
}

impl Collection {
    pub const ALL: [Collection; 6] = [
        Collection::Events,
        Collection::Contacts,
        Collection::Reminders,
        Collection::Notes,
        Collection::Gallery,
        Collection::Settings,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Events => "events",
            Collection::Contacts => "contacts",
            Collection::Reminders => "reminders",
            Collection::Notes => "notes",
            Collection::Gallery => "gallery",
            Collection::Settings => "settings",
        }
    }

    /// Settings is stored as a single object, never as a list.
    pub fn is_singleton(&self) -> bool {
        matches!(self, Collection::Settings)
    }

    /// Checks a request body against the typed record for this collection and
    /// returns the normalized JSON object that gets persisted.
    pub fn normalize(&self, body: &Value) -> Result<Map<String, Value>, ValidationError> {
        match self {
            Collection::Events => normalize_as::<Event>(body),
            Collection::Contacts => normalize_as::<Contact>(body),
            Collection::Reminders => normalize_as::<Reminder>(body),
            Collection::Notes => normalize_as::<Note>(body),
            Collection::Gallery => normalize_as::<GalleryItem>(body),
            Collection::Settings => normalize_as::<Settings>(body),
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown collection '{0}'")]
pub struct UnknownCollection(pub String);

impl FromStr for Collection {
    type Err = UnknownCollection;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_matches('/');
        Collection::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| UnknownCollection(s.to_string()))
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("record must be a JSON object")]
    NotAnObject,
    #[error("invalid record: {0}")]
    Malformed(String),
    #[error("missing required field '{0}'")]
    MissingField(&'static str),
}

/// Validation hook implemented by every persisted record type.
pub trait Entity: Serialize + DeserializeOwned {
    /// Fills canonical fields from their alternate spellings.
    fn canonicalize(&mut self) {}

    fn check(&self) -> Result<(), ValidationError>;
}

fn normalize_as<E: Entity>(body: &Value) -> Result<Map<String, Value>, ValidationError> {
    if !body.is_object() {
        return Err(ValidationError::NotAnObject);
    }
    let mut entity: E = serde_json::from_value(body.clone())
        .map_err(|e| ValidationError::Malformed(e.to_string()))?;
    entity.canonicalize();
    entity.check()?;
    match serde_json::to_value(&entity) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ValidationError::NotAnObject),
        Err(e) => Err(ValidationError::Malformed(e.to_string())),
    }
}

fn require(value: &str, field: &'static str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::MissingField(field))
    } else {
        Ok(())
    }
}

/// Returns the identifier of a stored record. Documents imported from older
/// deployments may carry `_id` instead of `id`.
pub fn record_id(record: &Value) -> Option<&str> {
    record
        .get("id")
        .or_else(|| record.get("_id"))
        .and_then(Value::as_str)
}

/// Shallow merge used by updates on both sides: top-level fields of `patch`
/// replace those of `target`; the identifier is never overwritten.
pub fn merge_fields(target: &mut Map<String, Value>, patch: &Map<String, Value>) {
    for (key, value) in patch {
        if key == "id" || key == "_id" {
            continue;
        }
        target.insert(key.clone(), value.clone());
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub title: String,
    /// Free-text label such as "Friday" or "Day 2".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dress_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Entity for Event {
    fn check(&self) -> Result<(), ValidationError> {
        require(&self.title, "title")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub whatsapp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// "Host", "Guest", "Venue", ...
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub contact_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Entity for Contact {
    fn check(&self) -> Result<(), ValidationError> {
        require(&self.name, "name")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminder {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    /// Symbolic icon name, e.g. "calendar" or "gift".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default)]
    pub send_whatsapp: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Entity for Reminder {
    fn canonicalize(&mut self) {
        if self.description.is_none() {
            self.description = self.message.clone();
        }
    }

    fn check(&self) -> Result<(), ValidationError> {
        require(&self.title, "title")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    /// Name of the public page the note is shown on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_location: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Entity for Note {
    fn check(&self) -> Result<(), ValidationError> {
        require(&self.title, "title")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_date: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Entity for GalleryItem {
    fn canonicalize(&mut self) {
        if self.path.trim().is_empty() {
            if let Some(url) = self.url.as_deref().filter(|u| !u.trim().is_empty()) {
                self.path = url.to_string();
            }
        }
    }

    fn check(&self) -> Result<(), ValidationError> {
        require(&self.path, "path")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footer: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Entity for Settings {
    fn check(&self) -> Result<(), ValidationError> {
        Ok(())
    }
}
