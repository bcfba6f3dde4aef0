// tests/common/mod.rs
#![allow(dead_code)]

use marketplace_news::{KeywordTiers, RelevanceFilter};

pub const CZ_RSS: &str = include_str!("../fixtures/cz_rss.xml");
pub const INTL_ATOM: &str = include_str!("../fixtures/intl_atom.xml");
pub const RDF: &str = include_str!("../fixtures/rdf.xml");

/// Small deterministic keyword set so tests do not depend on the built-in seed.
pub fn test_filter() -> RelevanceFilter {
    RelevanceFilter::new(KeywordTiers::new(
        ["temu", "shein"],
        ["marketplace", "e-shop"],
        ["counterfeit", "unsafe", "recall"],
    ))
}

/// Minimal RSS 2.0 document from `(title, link, pubDate)` triples.
pub fn rss(channel_title: &str, items: &[(String, String, String)]) -> String {
    let mut out = format!(
        "<?xml version=\"1.0\"?>\n<rss version=\"2.0\"><channel><title>{channel_title}</title>\n"
    );
    for (title, link, date) in items {
        out.push_str(&format!(
            "<item><title>{title}</title><link>{link}</link><pubDate>{date}</pubDate></item>\n"
        ));
    }
    out.push_str("</channel></rss>\n");
    out
}

pub fn item(title: &str, link: &str, date: &str) -> (String, String, String) {
    (title.to_string(), link.to_string(), date.to_string())
}
