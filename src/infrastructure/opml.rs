// src/infrastructure/opml.rs
//! OPML codec for feed subscriptions.
//!
//! Outer outlines are categories, leaf outlines carrying `xmlUrl` are
//! subscriptions. Subscriptions found at the top level land in the
//! default category.

use chrono::{DateTime, Utc};
use opml::{Body, Head, Outline, OPML};
use tracing::{debug, instrument};

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::exchange::{
    OutlineCodec, OutlineDocument, SubscriptionOutline, DEFAULT_CATEGORY_NAME,
};

const SUBSCRIPTION_OUTLINE_TYPE: &str = "rss";

#[derive(Debug, Clone, Copy, Default)]
pub struct OpmlCodec;

impl OpmlCodec {
    pub fn new() -> Self {
        Self
    }
}

fn subscription_of(outline: &Outline) -> Option<SubscriptionOutline> {
    let feed_url = outline.xml_url.as_deref()?.trim();
    if feed_url.is_empty() {
        return None;
    }
    let title = outline
        .title
        .clone()
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| outline.text.clone());
    Some(SubscriptionOutline {
        title: title.trim().to_string(),
        feed_url: feed_url.to_string(),
    })
}

/// Collects every subscription below `outline`, however deep.
fn collect_subscriptions(outline: &Outline, out: &mut Vec<SubscriptionOutline>) {
    for child in &outline.outlines {
        match subscription_of(child) {
            Some(subscription) => out.push(subscription),
            None => collect_subscriptions(child, out),
        }
    }
}

impl OutlineCodec for OpmlCodec {
    #[instrument(skip(self, input), level = "debug")]
    fn decode(&self, input: &str) -> DomainResult<OutlineDocument> {
        let opml = OPML::from_str(input)
            .map_err(|e| DomainError::DocumentMalformed(format!("invalid OPML: {}", e)))?;

        let head = opml.head.unwrap_or_default();
        let mut document = OutlineDocument {
            title: head.title.unwrap_or_default(),
            created_at: head
                .date_created
                .as_deref()
                .and_then(|d| DateTime::parse_from_rfc2822(d).ok())
                .map(|d| d.with_timezone(&Utc)),
            categories: Vec::new(),
        };

        for outline in &opml.body.outlines {
            if let Some(subscription) = subscription_of(outline) {
                document.push(DEFAULT_CATEGORY_NAME, subscription);
                continue;
            }
            let name = outline.text.trim();
            if name.is_empty() {
                continue;
            }
            let mut subscriptions = Vec::new();
            collect_subscriptions(outline, &mut subscriptions);
            for subscription in subscriptions {
                document.push(name, subscription);
            }
        }

        debug!("Decoded {} OPML categories", document.categories.len());
        Ok(document)
    }

    fn encode(&self, document: &OutlineDocument) -> DomainResult<String> {
        let outlines = document
            .categories
            .iter()
            .map(|category| Outline {
                text: category.name.clone(),
                title: Some(category.name.clone()),
                outlines: category
                    .subscriptions
                    .iter()
                    .map(|s| Outline {
                        text: s.title.clone(),
                        title: Some(s.title.clone()),
                        r#type: Some(SUBSCRIPTION_OUTLINE_TYPE.to_string()),
                        xml_url: Some(s.feed_url.clone()),
                        ..Outline::default()
                    })
                    .collect(),
                ..Outline::default()
            })
            .collect();

        let opml = OPML {
            version: "2.0".to_string(),
            head: Some(Head {
                title: Some(document.title.clone()),
                date_created: document.created_at.map(|d| d.to_rfc2822()),
                ..Head::default()
            }),
            body: Body { outlines },
        };
        opml.to_string()
            .map_err(|e| DomainError::SerializationError(format!("Failed to write OPML: {}", e)))
    }
}
