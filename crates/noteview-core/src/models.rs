//! Entity model for noteview: notes, remote records, and change-feed payloads.
//!
//! The remote store hands out rows using its own column names (`class`,
//! `file_url`, ...). [`NoteRecord`] mirrors that row shape; [`Note`] is the
//! admitted entity held by the view store. The mapping between the two is the
//! single place where placeholders are applied and identity is validated.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::defaults::{DEFAULT_CATEGORY, TAG_DELIMITER, UNTITLED};
use crate::error::{Error, Result};

// =============================================================================
// IDENTITY
// =============================================================================

/// Opaque, stable note identifier assigned by the remote store.
///
/// Never generated locally. A `NoteId` is never blank.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NoteId(String);

impl NoteId {
    /// Parse an id, rejecting blank input.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(Error::Validation("note id is empty".to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Extract an id from a raw JSON value.
    ///
    /// Remote stores may use text or integer primary keys, so both strings and
    /// numbers are accepted. Anything else has no usable id.
    pub fn from_json(value: &JsonValue) -> Result<Self> {
        match value {
            JsonValue::String(s) => Self::parse(s),
            JsonValue::Number(n) => Self::parse(&n.to_string()),
            JsonValue::Null => Err(Error::Validation("note id is null".to_string())),
            other => Err(Error::Validation(format!(
                "note id has unsupported type: {}",
                other
            ))),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NoteId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for NoteId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<NoteId> for String {
    fn from(id: NoteId) -> Self {
        id.0
    }
}

// =============================================================================
// NOTE ENTITY
// =============================================================================

/// A note admitted to the materialized view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    pub title: String,
    pub category: String,
    /// Parsed tags in first-seen order, trimmed, without blanks or repeats.
    pub tags: Vec<String>,
    /// The trimmed tag string as delivered; free-text search matches against it.
    pub raw_tags: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_ref: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_ref: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Note {
    /// Create a note with placeholder fields, mostly useful for tests and
    /// fixtures. Use [`Note::try_from`] on a [`NoteRecord`] for remote data.
    pub fn new(id: NoteId) -> Self {
        Self {
            id,
            title: UNTITLED.to_string(),
            category: DEFAULT_CATEGORY.to_string(),
            tags: Vec::new(),
            raw_tags: String::new(),
            description: String::new(),
            image_ref: None,
            file_ref: None,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = non_empty(Some(title.into())).unwrap_or_else(|| UNTITLED.to_string());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category =
            non_empty(Some(category.into())).unwrap_or_else(|| DEFAULT_CATEGORY.to_string());
        self
    }

    /// Replace the tags from a delimited tag string.
    pub fn with_tags(mut self, raw: &str) -> Self {
        self.raw_tags = raw.to_string();
        self.tags = parse_tags(raw);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_image(mut self, image_ref: impl Into<String>) -> Self {
        self.image_ref = non_empty(Some(image_ref.into()));
        self
    }

    pub fn with_file(mut self, file_ref: impl Into<String>) -> Self {
        self.file_ref = non_empty(Some(file_ref.into()));
        self
    }

    pub fn with_updated_at(mut self, updated_at: DateTime<Utc>) -> Self {
        self.updated_at = Some(updated_at);
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    /// Whether the note carries a preview image. Without one, renderers show
    /// a fallback graphic instead.
    pub fn has_image(&self) -> bool {
        self.image_ref.is_some()
    }

    /// Target for the download action, if the note has a downloadable asset.
    pub fn download_target(&self) -> Option<&str> {
        self.file_ref.as_deref()
    }

    /// Build the write payload for the remote store (reverse mapping).
    ///
    /// The payload never carries `id` or timestamps; those are owned by the
    /// remote store.
    pub fn to_write(&self) -> NoteWrite {
        NoteWrite {
            title: self.title.clone(),
            category: self.category.clone(),
            tags: self.raw_tags.clone(),
            description: self.description.clone(),
            image: self.image_ref.clone().unwrap_or_default(),
            file_url: self.file_ref.clone().unwrap_or_default(),
        }
    }
}

/// Split a delimited tag string into trimmed, non-empty, distinct tags.
///
/// Order of first appearance is kept; tag ranking ties depend on it.
pub fn parse_tags(raw: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for tag in raw.split(TAG_DELIMITER).map(str::trim) {
        if tag.is_empty() || tags.iter().any(|t| t == tag) {
            continue;
        }
        tags.push(tag.to_string());
    }
    tags
}

/// Values are kept exactly as delivered; only a missing or empty value counts
/// as absent.
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

// =============================================================================
// REMOTE RECORDS
// =============================================================================

/// A note row as delivered by the remote store (snapshot or change feed).
///
/// Every field is optional: the mapping into [`Note`] decides what is usable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NoteRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, rename = "class", skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl NoteRecord {
    /// Parse a record from a JSON value.
    pub fn from_json(value: JsonValue) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// Id of this record, if it has a usable one.
    pub fn note_id(&self) -> Result<NoteId> {
        match &self.id {
            Some(value) => NoteId::from_json(value),
            None => Err(Error::Validation("record has no id".to_string())),
        }
    }
}

impl TryFrom<NoteRecord> for Note {
    type Error = Error;

    /// The entity mapping rule: validate identity, apply placeholders.
    fn try_from(record: NoteRecord) -> Result<Self> {
        let id = record.note_id()?;
        let raw_tags = record.tags.unwrap_or_default();
        Ok(Note {
            id,
            title: non_empty(record.title).unwrap_or_else(|| UNTITLED.to_string()),
            category: non_empty(record.category).unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
            tags: parse_tags(&raw_tags),
            raw_tags,
            description: record.description.unwrap_or_default(),
            image_ref: non_empty(record.image),
            file_ref: non_empty(record.file_url),
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }
}

/// Write payload for the remote store's insert/update path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteWrite {
    pub title: String,
    #[serde(rename = "class")]
    pub category: String,
    pub tags: String,
    pub description: String,
    pub image: String,
    pub file_url: String,
}

// =============================================================================
// CHANGE FEED PAYLOADS
// =============================================================================

/// Kind of change delivered by the change feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Insert => write!(f, "insert"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

impl std::str::FromStr for ChangeKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "insert" => Ok(Self::Insert),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            _ => Err(format!("Invalid change kind: {}", s)),
        }
    }
}

/// One change-feed delivery.
///
/// For inserts and updates `record` is the new row; for deletes it is the old
/// row, of which only the id is used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedMessage {
    pub kind: ChangeKind,
    pub record: NoteRecord,
}

impl FeedMessage {
    pub fn insert(record: NoteRecord) -> Self {
        Self {
            kind: ChangeKind::Insert,
            record,
        }
    }

    pub fn update(record: NoteRecord) -> Self {
        Self {
            kind: ChangeKind::Update,
            record,
        }
    }

    pub fn delete(record: NoteRecord) -> Self {
        Self {
            kind: ChangeKind::Delete,
            record,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: JsonValue) -> NoteRecord {
        NoteRecord::from_json(value).unwrap()
    }

    #[test]
    fn test_note_id_rejects_blank() {
        assert!(NoteId::parse("").is_err());
        assert!(NoteId::parse("   ").is_err());
        assert_eq!(NoteId::parse(" n1 ").unwrap().as_str(), "n1");
    }

    #[test]
    fn test_note_id_from_json_number_and_string() {
        assert_eq!(NoteId::from_json(&json!(7)).unwrap().as_str(), "7");
        assert_eq!(NoteId::from_json(&json!("abc")).unwrap().as_str(), "abc");
        assert!(NoteId::from_json(&json!(null)).is_err());
        assert!(NoteId::from_json(&json!({"nested": 1})).is_err());
        assert!(NoteId::from_json(&json!(true)).is_err());
    }

    #[test]
    fn test_note_id_serde_is_transparent() {
        let id = NoteId::parse("abc").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), r#""abc""#);
        assert!(serde_json::from_str::<NoteId>(r#""""#).is_err());
    }

    #[test]
    fn test_parse_tags_trims_and_drops_empty() {
        assert_eq!(parse_tags(" algebra, exam ,,"), vec!["algebra", "exam"]);
        assert!(parse_tags("").is_empty());
        assert!(parse_tags(" , ,").is_empty());
    }

    #[test]
    fn test_parse_tags_keeps_first_occurrence() {
        assert_eq!(parse_tags("b,a,b,c,a"), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_mapping_applies_placeholders() {
        let note = Note::try_from(record(json!({"id": 1}))).unwrap();
        assert_eq!(note.id.as_str(), "1");
        assert_eq!(note.title, UNTITLED);
        assert_eq!(note.category, DEFAULT_CATEGORY);
        assert!(note.tags.is_empty());
        assert_eq!(note.description, "");
        assert!(!note.has_image());
        assert_eq!(note.download_target(), None);
    }

    #[test]
    fn test_mapping_empty_fields_use_placeholders() {
        let note = Note::try_from(record(json!({
            "id": "n1",
            "title": "",
            "class": "",
            "image": "",
            "file_url": ""
        })))
        .unwrap();
        assert_eq!(note.title, UNTITLED);
        assert_eq!(note.category, DEFAULT_CATEGORY);
        assert_eq!(note.image_ref, None);
        assert_eq!(note.file_ref, None);
    }

    #[test]
    fn test_mapping_keeps_whitespace_as_delivered() {
        let note = Note::try_from(record(json!({
            "id": "n1",
            "title": "  ",
            "class": " Math",
            "tags": " exam ",
            "image": " "
        })))
        .unwrap();
        assert_eq!(note.title, "  ");
        assert_eq!(note.category, " Math");
        assert_eq!(note.raw_tags, " exam ");
        assert_eq!(note.tags, vec!["exam"]);
        assert_eq!(note.image_ref.as_deref(), Some(" "));

        let plain = Note::try_from(record(json!({"id": "n2", "class": "Math"}))).unwrap();
        assert_ne!(note.category, plain.category);
    }

    #[test]
    fn test_mapping_full_record() {
        let note = Note::try_from(record(json!({
            "id": "n1",
            "title": "Algebra Notes",
            "class": "Math",
            "tags": "algebra, exam",
            "description": "Chapter 1",
            "image": "https://cdn.example/a.png",
            "file_url": "https://cdn.example/a.pdf",
            "created_at": "2024-03-01T10:00:00Z",
            "updated_at": "2024-03-02T10:00:00+00:00"
        })))
        .unwrap();
        assert_eq!(note.title, "Algebra Notes");
        assert_eq!(note.category, "Math");
        assert_eq!(note.tags, vec!["algebra", "exam"]);
        assert_eq!(note.raw_tags, "algebra, exam");
        assert!(note.has_image());
        assert_eq!(note.download_target(), Some("https://cdn.example/a.pdf"));
        assert!(note.created_at.is_some());
        assert!(note.updated_at > note.created_at);
    }

    #[test]
    fn test_mapping_rejects_missing_id() {
        let err = Note::try_from(record(json!({"title": "orphan"}))).unwrap_err();
        assert!(err.is_validation());

        let err = Note::try_from(record(json!({"id": "", "title": "blank"}))).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_to_write_round_trips_columns() {
        let note = Note::new(NoteId::parse("n1").unwrap())
            .with_title("T")
            .with_category("Bio")
            .with_tags("cell, dna")
            .with_file("f.pdf");
        let write = note.to_write();
        let value = serde_json::to_value(&write).unwrap();
        assert_eq!(value["class"], "Bio");
        assert_eq!(value["tags"], "cell, dna");
        assert_eq!(value["image"], "");
        assert_eq!(value["file_url"], "f.pdf");
        assert!(value.get("id").is_none());
    }

    #[test]
    fn test_change_kind_from_str() {
        assert_eq!("INSERT".parse::<ChangeKind>().unwrap(), ChangeKind::Insert);
        assert_eq!("update".parse::<ChangeKind>().unwrap(), ChangeKind::Update);
        assert_eq!("Delete".parse::<ChangeKind>().unwrap(), ChangeKind::Delete);
        assert!("upsert".parse::<ChangeKind>().is_err());
    }

    #[test]
    fn test_feed_message_json() {
        let msg: FeedMessage = serde_json::from_value(json!({
            "kind": "delete",
            "record": {"id": 9}
        }))
        .unwrap();
        assert_eq!(msg.kind, ChangeKind::Delete);
        assert_eq!(msg.record.note_id().unwrap().as_str(), "9");
    }
}
