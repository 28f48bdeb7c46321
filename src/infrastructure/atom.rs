// src/infrastructure/atom.rs
//! Atom 1.0 rendering of a user's public bookmarks.

use atom_syndication::{Content, Entry, Feed, Link, Person};
use chrono::Utc;
use tracing::instrument;

use crate::domain::bookmark::Bookmark;
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::user::Owner;

pub const ATOM_CONTENT_TYPE: &str = "application/atom+xml";

/// Renders a Markdown description to HTML; `None` when there is nothing to render.
pub fn render_description(description: &str) -> DomainResult<Option<String>> {
    if description.trim().is_empty() {
        return Ok(None);
    }
    // Descriptions are stored trimmed; block output needs the closing line ending.
    let source = if description.ends_with('\n') {
        description.to_string()
    } else {
        format!("{}\n", description)
    };
    markdown::to_html_with_options(&source, &markdown::Options::default())
        .map(Some)
        .map_err(|e| DomainError::SerializationError(format!("markdown: {}", e)))
}

fn bookmarks_url(public_url: &str, owner: &Owner) -> String {
    format!("{}/u/{}/bookmarks", public_url.trim_end_matches('/'), owner.nick_name)
}

fn link(href: String, rel: &str) -> Link {
    let mut link = Link::default();
    link.set_href(href);
    link.set_rel(rel);
    link
}

fn entry(base_url: &str, author: &Person, bookmark: &Bookmark) -> DomainResult<Entry> {
    let mut entry = Entry::default();
    entry.set_id(format!("{}/{}", base_url, bookmark.uid));
    entry.set_title(bookmark.title.as_str());
    entry.set_links(vec![link(bookmark.url.clone(), "alternate")]);
    entry.set_authors(vec![author.clone()]);
    entry.set_published(Some(bookmark.created_at.fixed_offset()));
    entry.set_updated(bookmark.updated_at.fixed_offset());

    let html = render_description(&bookmark.description)
        .map_err(|e| e.context(format!("bookmark {}", bookmark.uid)))?;
    if let Some(html) = html {
        let mut content = Content::default();
        content.set_content_type(Some("html".to_string()));
        content.set_value(Some(html));
        entry.set_content(Some(content));
    }
    Ok(entry)
}

/// Builds the Atom document for `owner`'s bookmarks.
///
/// Fails on the first entry that cannot be rendered.
#[instrument(skip(bookmarks), level = "debug", fields(nick_name = %owner.nick_name, n = bookmarks.len()))]
pub fn bookmark_feed(public_url: &str, owner: &Owner, bookmarks: &[Bookmark]) -> DomainResult<String> {
    let base_url = bookmarks_url(public_url, owner);

    let mut author = Person::default();
    author.set_name(owner.display_name.as_str());

    let entries = bookmarks
        .iter()
        .map(|b| entry(&base_url, &author, b))
        .collect::<DomainResult<Vec<Entry>>>()
        .map_err(|e| e.context("failed to generate Atom feed"))?;

    let updated = bookmarks
        .iter()
        .map(|b| b.updated_at)
        .max()
        .unwrap_or_else(Utc::now);

    let mut feed = Feed::default();
    feed.set_id(base_url.clone());
    feed.set_title(format!("{}'s bookmarks", owner.display_name));
    feed.set_links(vec![link(base_url, "self")]);
    feed.set_authors(vec![author]);
    feed.set_updated(updated.fixed_offset());
    feed.set_entries(entries);

    let bytes = feed
        .write_to(Vec::new())
        .map_err(|e| DomainError::SerializationError(format!("Atom feed: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| DomainError::SerializationError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ann() -> Owner {
        Owner {
            uuid: "c3a1b7c8-5f5e-4c1a-9d57-bd1ef0a9b6a1".to_string(),
            nick_name: "ann".to_string(),
            display_name: "Ann".to_string(),
        }
    }

    #[test]
    fn given_markdown_list_when_rendered_then_html_list() {
        let html = render_description("Tags:\n- feed/atom\n- test").unwrap();
        assert_eq!(
            html.as_deref(),
            Some("<p>Tags:</p>\n<ul>\n<li>feed/atom</li>\n<li>test</li>\n</ul>\n")
        );
    }

    #[test]
    fn given_blank_description_when_rendered_then_none() {
        assert!(render_description("  ").unwrap().is_none());
    }

    #[test]
    fn given_bookmarks_when_feed_built_then_ids_and_links_use_public_url() {
        let mut with_description = Bookmark::new(ann().uuid, "https://b.test", "B")
            .with_description("Tags:\n- feed/atom\n- test");
        with_description.uid = "0ujsswThIGTUYm2K8FjOOfXtY1K".to_string();
        let mut plain = Bookmark::new(ann().uuid, "https://a.test", "A");
        plain.uid = "0ujsszwN8NRY24YaXiTIE2VWDTS".to_string();

        let xml = bookmark_feed("https://marks.test/", &ann(), &[with_description, plain]).unwrap();
        let feed = Feed::read_from(xml.as_bytes()).unwrap();

        assert_eq!(feed.title().as_str(), "Ann's bookmarks");
        assert_eq!(feed.id(), "https://marks.test/u/ann/bookmarks");
        assert_eq!(feed.links()[0].rel(), "self");
        assert_eq!(feed.authors()[0].name(), "Ann");
        assert_eq!(feed.entries().len(), 2);

        let first = &feed.entries()[0];
        assert_eq!(
            first.id(),
            "https://marks.test/u/ann/bookmarks/0ujsswThIGTUYm2K8FjOOfXtY1K"
        );
        assert_eq!(first.links()[0].href(), "https://b.test");
        let content = first.content().and_then(|c| c.value()).unwrap();
        assert!(content.starts_with("<p>Tags:</p>"));
        assert!(content.contains("<li>feed/atom</li>"));

        assert!(feed.entries()[1].content().is_none());
    }
}
