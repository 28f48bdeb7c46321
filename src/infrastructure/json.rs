// src/infrastructure/json.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::exchange::{BookmarkDocument, BookmarkRecord, DocumentCodec, DocumentFormat};

/// Structure for serializing bookmarks to JSON output
#[derive(Debug, Serialize, Deserialize)]
struct JsonBookmark {
    url: String,
    title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    description: String,
    #[serde(default)]
    private: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct JsonDocument {
    #[serde(default)]
    title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    exported_at: Option<DateTime<Utc>>,
    #[serde(default)]
    bookmarks: Vec<JsonBookmark>,
}

/// Accepts a full export document or a bare array of bookmarks.
#[derive(Deserialize)]
#[serde(untagged)]
enum JsonInput {
    Document(JsonDocument),
    Bookmarks(Vec<JsonBookmark>),
}

impl From<JsonBookmark> for BookmarkRecord {
    fn from(b: JsonBookmark) -> Self {
        Self {
            url: b.url,
            title: b.title,
            description: b.description,
            private: b.private,
            tags: b.tags,
            created_at: b.created_at,
            updated_at: b.updated_at,
        }
    }
}

impl From<&BookmarkRecord> for JsonBookmark {
    fn from(b: &BookmarkRecord) -> Self {
        Self {
            url: b.url.clone(),
            title: b.title.clone(),
            description: b.description.clone(),
            private: b.private,
            tags: b.tags.clone(),
            created_at: b.created_at,
            updated_at: b.updated_at,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl JsonCodec {
    pub fn new() -> Self {
        Self
    }
}

impl DocumentCodec for JsonCodec {
    fn format(&self) -> DocumentFormat {
        DocumentFormat::Json
    }

    #[instrument(skip(self, input), level = "debug")]
    fn decode(&self, input: &str) -> DomainResult<BookmarkDocument> {
        let parsed: JsonInput = serde_json::from_str(input).map_err(|e| {
            DomainError::DocumentMalformed(format!(
                "{}. Expected an export document or a JSON array of bookmark objects.",
                e
            ))
        })?;

        let document = match parsed {
            JsonInput::Document(doc) => BookmarkDocument {
                title: doc.title,
                exported_at: doc.exported_at,
                bookmarks: doc.bookmarks.into_iter().map(Into::into).collect(),
            },
            JsonInput::Bookmarks(bookmarks) => BookmarkDocument {
                bookmarks: bookmarks.into_iter().map(Into::into).collect(),
                ..BookmarkDocument::default()
            },
        };
        debug!("Decoded {} JSON bookmarks", document.bookmarks.len());
        Ok(document)
    }

    fn encode(&self, document: &BookmarkDocument) -> DomainResult<String> {
        let json = JsonDocument {
            title: document.title.clone(),
            exported_at: document.exported_at,
            bookmarks: document.bookmarks.iter().map(Into::into).collect(),
        };
        serde_json::to_string_pretty(&json).map_err(|e| {
            DomainError::SerializationError(format!("Failed to serialize bookmarks to JSON: {}", e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn given_export_document_when_decoded_then_fields_mapped() {
        let input = r#"{
            "title": "Sparkmark export of public bookmarks",
            "exported_at": "2024-02-03T04:05:06Z",
            "bookmarks": [
                {
                    "url": "https://a.test",
                    "title": "A",
                    "private": false,
                    "tags": ["one", "two"],
                    "created_at": "2023-01-01T00:00:00Z",
                    "updated_at": "2023-01-02T00:00:00Z"
                },
                {"url": "https://b.test", "title": "B", "description": "Bee", "private": true}
            ]
        }"#;

        let doc = JsonCodec::new().decode(input).unwrap();

        assert_eq!(doc.title, "Sparkmark export of public bookmarks");
        assert_eq!(doc.exported_at, Some(Utc.with_ymd_and_hms(2024, 2, 3, 4, 5, 6).unwrap()));
        assert_eq!(doc.bookmarks.len(), 2);
        assert_eq!(doc.bookmarks[0].tags, ["one", "two"]);
        assert_eq!(
            doc.bookmarks[0].created_at,
            Some(Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(doc.bookmarks[1].description, "Bee");
        assert!(doc.bookmarks[1].private);
        assert!(doc.bookmarks[1].created_at.is_none());
    }

    #[test]
    fn given_bare_array_when_decoded_then_accepted() {
        let doc = JsonCodec::new()
            .decode(r#"[{"url": "https://a.test", "title": "A", "tags": ["x"]}]"#)
            .unwrap();

        assert!(doc.title.is_empty());
        assert_eq!(doc.bookmarks[0].url, "https://a.test");
    }

    #[test]
    fn given_invalid_json_when_decoded_then_malformed() {
        assert!(matches!(
            JsonCodec::new().decode("not json"),
            Err(DomainError::DocumentMalformed(_))
        ));
    }

    #[test]
    fn given_record_without_description_when_encoded_then_field_omitted() {
        let document = BookmarkDocument {
            title: "t".to_string(),
            exported_at: None,
            bookmarks: vec![BookmarkRecord {
                url: "https://a.test".to_string(),
                title: "A".to_string(),
                ..BookmarkRecord::default()
            }],
        };

        let json = JsonCodec::new().encode(&document).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert!(value["bookmarks"][0].get("description").is_none());
        assert_eq!(value["bookmarks"][0]["private"], false);
    }
}
