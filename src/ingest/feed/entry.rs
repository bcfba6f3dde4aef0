// src/ingest/feed/entry.rs
//! RSS items and Atom entries behind one extraction interface.
//!
//! Each field is recovered by a prioritized list of pure extractor
//! functions; the first one returning `Some` wins. Extractors only return
//! usable values (non-empty text, absolute http(s) links, parseable dates),
//! so a broken preferred element falls through to the next alternative.

use super::date::normalize_timestamp;
use super::xml::Element;
use crate::ingest::normalize_text;
use crate::ingest::types::RawCandidate;

pub type FieldExtractor = fn(&Element) -> Option<String>;

pub fn first_match(el: &Element, extractors: &[FieldExtractor]) -> Option<String> {
    extractors.iter().find_map(|f| f(el))
}

pub trait FeedEntry<'a>: Sized {
    /// Element name of one entry in the document.
    const TAG: &'static str;
    const TITLE: &'static [FieldExtractor];
    const LINK: &'static [FieldExtractor];
    const PUBLISHED: &'static [FieldExtractor];
    const BODY: &'static [FieldExtractor];

    fn new(el: &'a Element) -> Self;
    fn element(&self) -> &'a Element;

    fn title(&self) -> Option<String> {
        first_match(self.element(), Self::TITLE)
    }

    fn link(&self) -> Option<String> {
        first_match(self.element(), Self::LINK)
    }

    fn published(&self) -> Option<String> {
        first_match(self.element(), Self::PUBLISHED)
    }

    fn body(&self) -> Option<String> {
        first_match(self.element(), Self::BODY)
    }

    fn into_candidate(self, source_name: &str) -> RawCandidate {
        let title = self.title().unwrap_or_default();
        let body = self.body().unwrap_or_default();
        let search_text = match (title.is_empty(), body.is_empty()) {
            (_, true) => title.clone(),
            (true, false) => body,
            (false, false) => format!("{title} {body}"),
        };
        RawCandidate {
            url: self.link().unwrap_or_default(),
            published_at_raw: self.published().unwrap_or_default(),
            source_name: source_name.to_string(),
            title,
            search_text,
        }
    }
}

/// All entries of kind `E` in document order.
pub fn candidates<'a, E: FeedEntry<'a>>(root: &'a Element, source_name: &str) -> Vec<RawCandidate> {
    root.find_all(E::TAG)
        .into_iter()
        .map(|el| E::new(el).into_candidate(source_name))
        .collect()
}

/* ----------------------------
Shared extractor building blocks
---------------------------- */

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

fn child_text(el: &Element, name: &str) -> Option<String> {
    el.children_named(name)
        .find_map(|c| non_empty(normalize_text(&c.text_content())))
}

fn child_timestamp(el: &Element, name: &str) -> Option<String> {
    el.children_named(name)
        .find_map(|c| non_empty(normalize_timestamp(&normalize_text(&c.text_content()))))
}

/// Returns the link when it is an absolute `http://` or `https://` URL.
pub fn http_url(raw: &str) -> Option<String> {
    let s = normalize_text(raw);
    let parsed = url::Url::parse(&s).ok()?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return None;
    }
    Some(s)
}

fn title(el: &Element) -> Option<String> {
    child_text(el, "title")
}

/* ----------------------------
RSS 2.0 / RSS 1.0 items
---------------------------- */

pub struct RssItem<'a>(&'a Element);

fn rss_link(el: &Element) -> Option<String> {
    el.children_named("link").find_map(|l| {
        http_url(&l.text_content()).or_else(|| l.attr("href").and_then(http_url))
    })
}

fn rss_guid_permalink(el: &Element) -> Option<String> {
    el.children_named("guid")
        .filter(|g| !matches!(g.attr("isPermaLink"), Some(v) if v.trim().eq_ignore_ascii_case("false")))
        .find_map(|g| http_url(&g.text_content()))
}

fn rss_pub_date(el: &Element) -> Option<String> {
    child_timestamp(el, "pubDate")
}

/// `dc:date`
fn rss_dc_date(el: &Element) -> Option<String> {
    child_timestamp(el, "date")
}

fn rss_description(el: &Element) -> Option<String> {
    child_text(el, "description")
}

/// `content:encoded`
fn rss_encoded(el: &Element) -> Option<String> {
    child_text(el, "encoded")
}

impl<'a> FeedEntry<'a> for RssItem<'a> {
    const TAG: &'static str = "item";
    const TITLE: &'static [FieldExtractor] = &[title];
    const LINK: &'static [FieldExtractor] = &[rss_link, rss_guid_permalink];
    const PUBLISHED: &'static [FieldExtractor] = &[rss_pub_date, rss_dc_date];
    const BODY: &'static [FieldExtractor] = &[rss_description, rss_encoded];

    fn new(el: &'a Element) -> Self {
        Self(el)
    }

    fn element(&self) -> &'a Element {
        self.0
    }
}

/* ----------------------------
Atom entries
---------------------------- */

pub struct AtomEntry<'a>(&'a Element);

fn atom_alternate_link(el: &Element) -> Option<String> {
    el.children_named("link")
        .filter(|l| matches!(l.attr("rel"), Some(rel) if rel.trim().eq_ignore_ascii_case("alternate")))
        .find_map(|l| l.attr("href").and_then(http_url))
}

fn atom_any_link(el: &Element) -> Option<String> {
    el.children_named("link")
        .find_map(|l| l.attr("href").and_then(http_url))
}

fn atom_published(el: &Element) -> Option<String> {
    child_timestamp(el, "published")
}

fn atom_updated(el: &Element) -> Option<String> {
    child_timestamp(el, "updated")
}

fn atom_summary(el: &Element) -> Option<String> {
    child_text(el, "summary")
}

fn atom_content(el: &Element) -> Option<String> {
    child_text(el, "content")
}

impl<'a> FeedEntry<'a> for AtomEntry<'a> {
    const TAG: &'static str = "entry";
    const TITLE: &'static [FieldExtractor] = &[title];
    const LINK: &'static [FieldExtractor] = &[atom_alternate_link, atom_any_link];
    const PUBLISHED: &'static [FieldExtractor] = &[atom_published, atom_updated];
    const BODY: &'static [FieldExtractor] = &[atom_summary, atom_content];

    fn new(el: &'a Element) -> Self {
        Self(el)
    }

    fn element(&self) -> &'a Element {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::feed::xml::parse_document;

    fn item(xml: &str) -> Element {
        parse_document(xml).find("item").cloned().unwrap()
    }

    fn entry(xml: &str) -> Element {
        parse_document(xml).find("entry").cloned().unwrap()
    }

    #[test]
    fn first_match_wins_in_priority_order() {
        let el = item(
            "<item><description>short</description><encoded>long body</encoded></item>",
        );
        assert_eq!(RssItem::new(&el).body().as_deref(), Some("short"));

        let el = item("<item><description>  </description><encoded>long body</encoded></item>");
        assert_eq!(RssItem::new(&el).body().as_deref(), Some("long body"));
    }

    #[test]
    fn rss_relative_link_is_absent() {
        let el = item("<item><title>x</title><link>/news/1</link></item>");
        assert_eq!(RssItem::new(&el).link(), None);
    }

    #[test]
    fn rss_guid_permalink_fallback() {
        let el = item(
            r#"<item><guid isPermaLink="true">https://a.test/1</guid></item>"#,
        );
        assert_eq!(RssItem::new(&el).link().as_deref(), Some("https://a.test/1"));

        let el = item(r#"<item><guid isPermaLink="false">https://a.test/1</guid></item>"#);
        assert_eq!(RssItem::new(&el).link(), None);
    }

    #[test]
    fn rss_bad_pub_date_falls_back_to_dc_date() {
        let el = item(
            "<item><pubDate>not-a-date</pubDate><dc:date>2024-02-01T10:00:00Z</dc:date></item>",
        );
        assert_eq!(
            RssItem::new(&el).published().as_deref(),
            Some("2024-02-01T10:00:00.000Z")
        );
    }

    #[test]
    fn atom_prefers_alternate_link() {
        let el = entry(
            r#"<feed><entry>
                <link rel="self" href="https://a.test/self"/>
                <link rel="alternate" href="https://a.test/post"/>
            </entry></feed>"#,
        );
        assert_eq!(AtomEntry::new(&el).link().as_deref(), Some("https://a.test/post"));
    }

    #[test]
    fn atom_falls_back_to_any_href_link() {
        let el = entry(
            r#"<feed><entry><link rel="alternate" href="mailto:x@y"/><link href="http://a.test/p"/></entry></feed>"#,
        );
        assert_eq!(AtomEntry::new(&el).link().as_deref(), Some("http://a.test/p"));
    }

    #[test]
    fn atom_updated_used_when_published_missing() {
        let el = entry("<feed><entry><updated>2024-01-02T03:04:05Z</updated></entry></feed>");
        assert_eq!(
            AtomEntry::new(&el).published().as_deref(),
            Some("2024-01-02T03:04:05.000Z")
        );
    }

    #[test]
    fn candidate_search_text_joins_title_and_body() {
        let el = entry(
            "<feed><entry><title>Fake toys</title><summary>&lt;p&gt;sold on Temu&lt;/p&gt;</summary></entry></feed>",
        );
        let c = AtomEntry::new(&el).into_candidate("Src");
        assert_eq!(c.title, "Fake toys");
        assert_eq!(c.search_text, "Fake toys sold on Temu");
        assert_eq!(c.source_name, "Src");
        assert_eq!(c.url, "");
        assert_eq!(c.published_at_raw, "");
    }

    #[test]
    fn http_url_rejects_other_schemes() {
        assert_eq!(http_url(" https://a.test/x "), Some("https://a.test/x".into()));
        assert_eq!(http_url("ftp://a.test/x"), None);
        assert_eq!(http_url("javascript:alert(1)"), None);
        assert_eq!(http_url("a.test/x"), None);
    }
}
