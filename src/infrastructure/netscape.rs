// src/infrastructure/netscape.rs
//! Netscape Bookmark File codec.
//!
//! Decoding flattens folders: every `<A HREF>` anywhere in the document
//! becomes one record, in document order.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use select::document::Document;
use select::node::Node;
use select::predicate::Name;
use tracing::{debug, instrument};

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::exchange::{BookmarkDocument, BookmarkRecord, DocumentCodec, DocumentFormat};

const HEADER: &str = "<!DOCTYPE NETSCAPE-Bookmark-file-1>
<!-- This is an automatically generated file.
     It will be read and overwritten.
     DO NOT EDIT! -->
<META HTTP-EQUIV=\"Content-Type\" CONTENT=\"text/html; charset=UTF-8\">
";

/// Seconds above this are taken to be milliseconds.
const MAX_EPOCH_SECONDS: i64 = 100_000_000_000;

#[derive(Debug, Clone, Copy, Default)]
pub struct NetscapeCodec;

impl NetscapeCodec {
    pub fn new() -> Self {
        Self
    }
}

fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let raw = value.trim().parse::<i64>().ok()?;
    if raw <= 0 {
        return None;
    }
    if raw > MAX_EPOCH_SECONDS {
        return DateTime::<Utc>::from_timestamp_millis(raw);
    }
    DateTime::<Utc>::from_timestamp(raw, 0)
}

fn parse_tags(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// The `<DD>` element following the anchor's `<DT>`, if any.
fn description_of(anchor: &Node) -> String {
    let Some(dt) = anchor.parent() else {
        return String::new();
    };
    let mut sibling = dt.next();
    while let Some(node) = sibling {
        match node.name() {
            Some("dd") => return node.text().trim().to_string(),
            Some(_) => return String::new(),
            None => sibling = node.next(),
        }
    }
    String::new()
}

impl DocumentCodec for NetscapeCodec {
    fn format(&self) -> DocumentFormat {
        DocumentFormat::Netscape
    }

    #[instrument(skip(self, input), level = "debug")]
    fn decode(&self, input: &str) -> DomainResult<BookmarkDocument> {
        if !input.trim_start().to_uppercase().starts_with("<!DOCTYPE NETSCAPE-BOOKMARK-FILE-1>") {
            return Err(DomainError::DocumentMalformed(
                "missing Netscape bookmark file doctype".to_string(),
            ));
        }

        let document = Document::from(input);
        let title = document
            .find(Name("title"))
            .next()
            .map(|n| n.text().trim().to_owned())
            .unwrap_or_default();

        let bookmarks: Vec<BookmarkRecord> = document
            .find(Name("a"))
            .filter_map(|anchor| {
                let url = anchor.attr("href")?.trim().to_string();
                Some(BookmarkRecord {
                    url,
                    title: anchor.text().trim().to_string(),
                    description: description_of(&anchor),
                    private: anchor.attr("private").is_some_and(|v| v.trim() == "1"),
                    tags: anchor.attr("tags").map(parse_tags).unwrap_or_default(),
                    created_at: anchor.attr("add_date").and_then(parse_timestamp),
                    updated_at: anchor.attr("last_modified").and_then(parse_timestamp),
                })
            })
            .collect();

        debug!("Decoded {} Netscape bookmarks", bookmarks.len());
        Ok(BookmarkDocument {
            title,
            exported_at: None,
            bookmarks,
        })
    }

    fn encode(&self, document: &BookmarkDocument) -> DomainResult<String> {
        let title = escape_html(&document.title);
        let mut out = String::from(HEADER);
        let fmt_err = |e: std::fmt::Error| DomainError::SerializationError(e.to_string());

        writeln!(out, "<TITLE>{}</TITLE>", title).map_err(fmt_err)?;
        writeln!(out, "<H1>{}</H1>", title).map_err(fmt_err)?;
        writeln!(out, "<DL><p>").map_err(fmt_err)?;
        for b in &document.bookmarks {
            write!(out, "    <DT><A HREF=\"{}\"", escape_html(&b.url)).map_err(fmt_err)?;
            if let Some(created_at) = b.created_at {
                write!(out, " ADD_DATE=\"{}\"", created_at.timestamp()).map_err(fmt_err)?;
            }
            if let Some(updated_at) = b.updated_at {
                write!(out, " LAST_MODIFIED=\"{}\"", updated_at.timestamp()).map_err(fmt_err)?;
            }
            write!(out, " PRIVATE=\"{}\"", u8::from(b.private)).map_err(fmt_err)?;
            if !b.tags.is_empty() {
                write!(out, " TAGS=\"{}\"", escape_html(&b.tags.join(","))).map_err(fmt_err)?;
            }
            writeln!(out, ">{}</A>", escape_html(&b.title)).map_err(fmt_err)?;
            if !b.description.is_empty() {
                writeln!(out, "    <DD>{}", escape_html(&b.description)).map_err(fmt_err)?;
            }
        }
        writeln!(out, "</DL><p>").map_err(fmt_err)?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const NESTED: &str = r#"<!DOCTYPE NETSCAPE-Bookmark-file-1>
<META HTTP-EQUIV="Content-Type" CONTENT="text/html; charset=UTF-8">
<TITLE>Bookmarks</TITLE>
<H1>Bookmarks</H1>
<DL><p>
    <DT><A HREF="https://flat.test" ADD_DATE="1646906880" PRIVATE="1" TAGS="flat,test">Flat</A>
    <DD>A &lt;flat&gt; bookmark
    <DT><H3>Folder</H3>
    <DL><p>
        <DT><A HREF="https://nested.test" LAST_MODIFIED="1646906999">Nested</A>
        <DT><A HREF="https://second.test">Second</A>
        <DD>Multi
line
    </DL><p>
</DL><p>
"#;

    #[test]
    fn given_nested_folders_when_decoded_then_flattened_in_order() {
        let doc = NetscapeCodec::new().decode(NESTED).unwrap();

        assert_eq!(doc.title, "Bookmarks");
        let urls: Vec<&str> = doc.bookmarks.iter().map(|b| b.url.as_str()).collect();
        assert_eq!(urls, ["https://flat.test", "https://nested.test", "https://second.test"]);

        let flat = &doc.bookmarks[0];
        assert_eq!(flat.title, "Flat");
        assert_eq!(flat.description, "A <flat> bookmark");
        assert!(flat.private);
        assert_eq!(flat.tags, ["flat", "test"]);
        assert_eq!(flat.created_at, Some(Utc.timestamp_opt(1646906880, 0).unwrap()));

        let nested = &doc.bookmarks[1];
        assert!(nested.description.is_empty());
        assert!(!nested.private);
        assert!(nested.created_at.is_none());
        assert!(nested.updated_at.is_some());

        assert_eq!(doc.bookmarks[2].description, "Multi\nline");
    }

    #[test]
    fn given_document_when_encoded_then_decodes_to_same_records() {
        let created = Utc.with_ymd_and_hms(2023, 5, 1, 10, 0, 0).unwrap();
        let document = BookmarkDocument {
            title: "Sparkmark export of all bookmarks".to_string(),
            exported_at: None,
            bookmarks: vec![BookmarkRecord {
                url: "https://a.test/?q=1&r=2".to_string(),
                title: "Quotes \"and\" <tags>".to_string(),
                description: "Line one".to_string(),
                private: true,
                tags: vec!["dev".to_string(), "rust".to_string()],
                created_at: Some(created),
                updated_at: Some(created),
            }],
        };

        let codec = NetscapeCodec::new();
        let html = codec.encode(&document).unwrap();
        assert!(html.starts_with("<!DOCTYPE NETSCAPE-Bookmark-file-1>"));
        assert!(html.contains("TAGS=\"dev,rust\""));

        let decoded = codec.decode(&html).unwrap();
        assert_eq!(decoded.title, document.title);
        assert_eq!(decoded.bookmarks, document.bookmarks);
    }

    #[test]
    fn given_plain_html_when_decoded_then_malformed() {
        let err = NetscapeCodec::new()
            .decode("<html><body><a href=\"https://a.test\">A</a></body></html>")
            .unwrap_err();
        assert!(matches!(err, DomainError::DocumentMalformed(_)));
    }
}
