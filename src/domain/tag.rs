// src/domain/tag.rs
use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use serde::Serialize;

use crate::domain::error::{DomainError, DomainResult};

/// A tag name with its number of occurrences in a user's bookmarks.
///
/// `encoded_name` is the URL-safe base64 form used in route segments so the
/// raw name never appears in a path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tag {
    pub name: String,
    pub encoded_name: String,
    pub count: u32,
}

impl Tag {
    pub fn new(name: impl Into<String>, count: u32) -> Self {
        let name = name.into();
        let encoded_name = encode_tag_name(&name);
        Self {
            name,
            encoded_name,
            count,
        }
    }
}

pub fn encode_tag_name(name: &str) -> String {
    URL_SAFE.encode(name.as_bytes())
}

pub fn decode_tag_name(encoded: &str) -> DomainResult<String> {
    let bytes = URL_SAFE
        .decode(encoded)
        .map_err(|e| DomainError::DeserializationError(format!("tag name: {}", e)))?;
    String::from_utf8(bytes)
        .map_err(|e| DomainError::DeserializationError(format!("tag name: {}", e)))
}

/// Orders tags by count descending, then name ascending.
pub fn sort_tags(tags: &mut [Tag]) {
    tags.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
}
