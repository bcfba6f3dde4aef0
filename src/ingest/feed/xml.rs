// src/ingest/feed/xml.rs
//! Tolerant XML tree builder on top of `quick_xml`'s pull reader.
//!
//! Feeds in the wild are frequently broken: unclosed HTML inside
//! `<description>`, stray end tags, unknown HTML entities, truncated bodies.
//! The builder never fails. Mismatched end tags close the nearest open
//! element of that name (or are ignored), and a reader error simply stops
//! parsing, keeping everything collected so far.
//!
//! Nesting is capped at [`MAX_DEPTH`]. Elements opened below the cap are not
//! materialized; their text is appended to the deepest kept element. This
//! bounds the recursion of every tree walk (and of `Drop`).

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// Deepest element level kept in the tree (the synthetic root is level 0).
pub const MAX_DEPTH: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    /// Local name without namespace prefix (`dc:date` -> `date`).
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    fn from_start(start: &BytesStart<'_>) -> Self {
        let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
        let attrs = start
            .attributes()
            .with_checks(false)
            .flatten()
            .map(|a| {
                let key = String::from_utf8_lossy(a.key.local_name().as_ref()).into_owned();
                let value = match a.unescape_value() {
                    Ok(v) => v.into_owned(),
                    Err(_) => String::from_utf8_lossy(&a.value).into_owned(),
                };
                (key, value)
            })
            .collect();
        Self {
            name,
            attrs,
            children: Vec::new(),
        }
    }

    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Direct child elements.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|n| match n {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
        })
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.elements().filter(move |e| e.is(name))
    }

    pub fn child(&self, name: &str) -> Option<&Element> {
        self.elements().find(|e| e.is(name))
    }

    /// First element named `name` anywhere below `self`, depth-first.
    pub fn find(&self, name: &str) -> Option<&Element> {
        for e in self.elements() {
            if e.is(name) {
                return Some(e);
            }
            if let Some(found) = e.find(name) {
                return Some(found);
            }
        }
        None
    }

    /// All elements named `name` below `self` in document order.
    /// Matches are not searched for nested matches.
    pub fn find_all(&self, name: &str) -> Vec<&Element> {
        let mut out = Vec::new();
        self.collect_named(name, &mut out);
        out
    }

    fn collect_named<'a>(&'a self, name: &str, out: &mut Vec<&'a Element>) {
        for e in self.elements() {
            if e.is(name) {
                out.push(e);
            } else {
                e.collect_named(name, out);
            }
        }
    }

    /// Concatenated text of this element and all descendants, in document order.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.push_text(&mut out);
        out
    }

    fn push_text(&self, out: &mut String) {
        for n in &self.children {
            match n {
                Node::Text(t) => out.push_str(t),
                Node::Element(e) => {
                    // Keep words of adjacent inline elements apart.
                    out.push(' ');
                    e.push_text(out);
                    out.push(' ');
                }
            }
        }
    }
}

/// Parse `content` into a synthetic, unnamed root element holding the document.
pub fn parse_document(content: &str) -> Element {
    let mut reader = Reader::from_str(content);
    {
        let cfg = reader.config_mut();
        cfg.check_end_names = false;
        cfg.allow_unmatched_ends = true;
    }

    let mut stack: Vec<Element> = vec![Element::default()];
    // Start tags dropped for exceeding MAX_DEPTH and not yet closed.
    let mut flattened = 0usize;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                if stack.len() > MAX_DEPTH {
                    flattened += 1;
                } else {
                    stack.push(Element::from_start(&e));
                }
            }
            Ok(Event::Empty(e)) => {
                if stack.len() <= MAX_DEPTH {
                    attach(&mut stack, Element::from_start(&e));
                }
            }
            Ok(Event::Text(t)) => {
                let text = match t.unescape() {
                    Ok(s) => s.into_owned(),
                    // Unknown HTML entities (&nbsp; ...) are left for the normalizer.
                    Err(_) => String::from_utf8_lossy(&t).into_owned(),
                };
                push_text(&mut stack, text);
            }
            Ok(Event::CData(c)) => push_text(&mut stack, String::from_utf8_lossy(&c).into_owned()),
            Ok(Event::End(_)) if flattened > 0 => flattened -= 1,
            Ok(Event::End(e)) => {
                let local = e.local_name();
                let name = String::from_utf8_lossy(local.as_ref());
                close(&mut stack, &name);
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(
                    error = %e,
                    position = reader.buffer_position(),
                    "xml parse stopped early"
                );
                break;
            }
        }
    }

    while stack.len() > 1 {
        if let Some(done) = stack.pop() {
            attach(&mut stack, done);
        }
    }
    stack.pop().unwrap_or_default()
}

fn attach(stack: &mut [Element], el: Element) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(Node::Element(el));
    }
}

fn push_text(stack: &mut [Element], text: String) {
    if text.is_empty() {
        return;
    }
    if let Some(top) = stack.last_mut() {
        match top.children.last_mut() {
            Some(Node::Text(prev)) => prev.push_str(&text),
            _ => top.children.push(Node::Text(text)),
        }
    }
}

/// Close the nearest open element named `name`, closing anything opened after it.
/// End tags with no matching open element are ignored.
fn close(stack: &mut Vec<Element>, name: &str) {
    let Some(pos) = stack.iter().skip(1).rposition(|e| e.is(name)) else {
        return;
    };
    let target = pos + 1;
    while stack.len() > target {
        if let Some(done) = stack.pop() {
            attach(stack, done);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_nested_tree_with_local_names() {
        let doc = parse_document(
            r#"<rss xmlns:dc="http://purl.org/dc/elements/1.1/"><channel>
                <item><title>A</title><dc:date>2024-01-01</dc:date></item>
            </channel></rss>"#,
        );
        let item = doc.find("item").unwrap();
        assert_eq!(item.child("title").unwrap().text_content(), "A");
        assert_eq!(item.child("date").unwrap().text_content(), "2024-01-01");
    }

    #[test]
    fn cdata_and_entities_become_text() {
        let doc = parse_document(
            "<item><title><![CDATA[Fish & <b>chips</b>]]></title><d>a &amp; b</d></item>",
        );
        let item = doc.find("item").unwrap();
        assert_eq!(
            item.child("title").unwrap().text_content(),
            "Fish & <b>chips</b>"
        );
        assert_eq!(item.child("d").unwrap().text_content(), "a & b");
    }

    #[test]
    fn unknown_entity_keeps_raw_text() {
        let doc = parse_document("<t>a&nbsp;b</t>");
        assert_eq!(doc.find("t").unwrap().text_content(), "a&nbsp;b");
    }

    #[test]
    fn unclosed_inline_html_is_tolerated() {
        let doc = parse_document(
            "<item><description><p>one<br>two</p></description><title>T</title></item>",
        );
        let item = doc.find("item").unwrap();
        assert_eq!(item.child("title").unwrap().text_content(), "T");
        let desc = item.child("description").unwrap().text_content();
        assert!(desc.contains("one") && desc.contains("two"));
    }

    #[test]
    fn truncated_document_keeps_parsed_prefix() {
        let doc = parse_document("<feed><entry><title>X</title></entry><entry><tit");
        assert_eq!(doc.find_all("entry").len(), 2);
        assert_eq!(
            doc.find("entry").unwrap().child("title").unwrap().text_content(),
            "X"
        );
    }

    fn depth(el: &Element) -> usize {
        let mut d = 0;
        let mut cur = el;
        while let Some(next) = cur.elements().next() {
            d += 1;
            cur = next;
        }
        d
    }

    #[test]
    fn nesting_is_capped_and_deep_text_is_kept() {
        let n = 1_000;
        let doc = format!("{}deep text{}<after/>", "<a>".repeat(n), "</a>".repeat(n));
        let root = parse_document(&doc);
        assert_eq!(depth(&root), MAX_DEPTH);
        assert!(root.text_content().contains("deep text"));
        // End tags of dropped elements do not close kept ancestors early.
        let outer = root.find("a").unwrap();
        assert!(outer.find("after").is_none());
        assert!(root.child("after").is_some());
    }

    #[test]
    fn child_lookup_does_not_borrow_the_name() {
        let doc = parse_document("<item><title>T</title></item>");
        let item = doc.find("item").unwrap();
        let title = {
            let name = String::from("title");
            item.child(&name)
        };
        assert_eq!(title.map(Element::text_content).as_deref(), Some("T"));
    }

    #[test]
    fn attributes_are_unescaped() {
        let doc = parse_document(r#"<link rel="alternate" href="https://x.test/?a=1&amp;b=2"/>"#);
        let link = doc.find("link").unwrap();
        assert_eq!(link.attr("REL"), Some("alternate"));
        assert_eq!(link.attr("href"), Some("https://x.test/?a=1&b=2"));
    }
}
