// src/domain/pagination.rs
//! Offset pagination shared by bookmark, tag and feed-entry listings.
use serde::Serialize;

use crate::domain::error::{DomainError, DomainResult};

/// Page metadata returned alongside a page of items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageMetadata {
    pub number: u32,
    pub previous_number: u32,
    pub next_number: u32,
    pub total_pages: u32,
    pub pages_left: u32,
    /// Total number of items across all pages.
    pub item_count: u32,
    /// 1-based position of the first item on this page, for display.
    pub item_offset: u32,
    /// 0-based offset handed to the store.
    #[serde(skip)]
    pub db_offset: u32,
}

impl PageMetadata {
    pub fn new(number: u32, total_pages: u32, items_per_page: u32, item_count: u32) -> Self {
        let previous_number = if number <= 1 { 1 } else { number - 1 };
        let next_number = if number >= total_pages {
            total_pages.max(1)
        } else {
            number + 1
        };
        let db_offset = number.saturating_sub(1) * items_per_page;

        Self {
            number,
            previous_number,
            next_number,
            total_pages,
            pages_left: total_pages.saturating_sub(number),
            item_count,
            item_offset: db_offset + 1,
            db_offset,
        }
    }

    /// Metadata of the single empty page returned for an empty listing.
    pub fn empty(items_per_page: u32) -> Self {
        Self::new(1, 1, items_per_page, 0)
    }
}

/// Number of pages needed for `item_count` items, never less than one.
pub fn page_count(item_count: u32, items_per_page: u32) -> u32 {
    if item_count == 0 || items_per_page == 0 {
        return 1;
    }
    item_count.div_ceil(items_per_page)
}

/// Rejects page numbers outside `1..=total_pages`.
///
/// An empty listing only has page 1, which is always valid.
pub fn check_page_number(number: u32, total_pages: u32, item_count: u32) -> DomainResult<()> {
    if number < 1 {
        return Err(DomainError::PageNumberOutOfBounds);
    }
    if item_count > 0 && number > total_pages {
        return Err(DomainError::PageNumberOutOfBounds);
    }
    if item_count == 0 && number > 1 {
        return Err(DomainError::PageNumberOutOfBounds);
    }
    Ok(())
}

/// Parses the `page` query parameter: empty means page 1.
pub fn parse_page_number(value: &str) -> DomainResult<u32> {
    if value.is_empty() {
        return Ok(1);
    }
    value
        .parse::<u32>()
        .map_err(|e| DomainError::PageNumberInvalid(format!("{:?}: {}", value, e)))
}
