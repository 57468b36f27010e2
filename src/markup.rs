//! Minimal HTML inspection for page assertions.
//!
//! The harness judges served documents directly rather than scripting a
//! browser, so all it needs is to locate a heading or an element by id and
//! decide whether a feedback element is visible. This is not a general HTML
//! parser; it handles the well-formed pages the service renders.

use std::collections::HashMap;

/// An element extracted from a page body.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub tag: String,
    pub attributes: HashMap<String, String>,
    pub text: String,
}

impl Element {
    /// Whether the element would be visible to a user: present, not marked
    /// `hidden`, not styled away, and carrying non-empty text.
    pub fn is_visible(&self) -> bool {
        if self.attributes.contains_key("hidden") {
            return false;
        }
        if let Some(style) = self.attributes.get("style") {
            let style = style.replace(' ', "").to_ascii_lowercase();
            if style.contains("display:none") || style.contains("visibility:hidden") {
                return false;
            }
        }
        !self.text.trim().is_empty()
    }
}

/// Find the first element with the given tag name.
pub fn first_element(html: &str, tag: &str) -> Option<Element> {
    let lower = html.to_ascii_lowercase();
    let needle = format!("<{}", tag.to_ascii_lowercase());
    let mut search_from = 0;

    while let Some(rel) = lower[search_from..].find(&needle) {
        let start = search_from + rel;
        // Reject partial tag name matches such as <header> for <h1>.
        let after = lower[start + needle.len()..].chars().next();
        if matches!(after, Some(c) if c != '>' && !c.is_whitespace() && c != '/') {
            search_from = start + needle.len();
            continue;
        }
        return parse_element_at(html, &lower, start, &tag.to_ascii_lowercase());
    }

    None
}

/// Find the element carrying the given `id` attribute.
pub fn element_by_id(html: &str, id: &str) -> Option<Element> {
    // Selectors arrive in CSS form from scenario definitions.
    let id = id.strip_prefix('#').unwrap_or(id);
    let lower = html.to_ascii_lowercase();
    let mut search_from = 0;

    while let Some(rel) = lower[search_from..].find('<') {
        let start = search_from + rel;
        let rest = &lower[start + 1..];
        if rest.starts_with('/') || rest.starts_with('!') {
            search_from = start + 1;
            continue;
        }

        let tag_end = rest
            .find(|c: char| c.is_whitespace() || c == '>' || c == '/')
            .unwrap_or(rest.len());
        let tag = &rest[..tag_end];
        if tag.is_empty() {
            search_from = start + 1;
            continue;
        }

        if let Some(element) = parse_element_at(html, &lower, start, tag) {
            if element.attributes.get("id").map(String::as_str) == Some(id) {
                return Some(element);
            }
        }
        search_from = start + 1;
    }

    None
}

/// Parse the element whose opening `<` sits at `start`. Inner text is
/// flattened with nested tags stripped; nesting of the same tag is not
/// handled.
fn parse_element_at(html: &str, lower: &str, start: usize, tag: &str) -> Option<Element> {
    let open_end = lower[start..].find('>').map(|i| start + i)?;
    let attr_region = &html[start + 1 + tag.len()..open_end];
    let attributes = parse_attributes(attr_region.trim_end_matches('/'));

    // Void elements carry no text.
    if html[..open_end].ends_with('/') || is_void_tag(tag) {
        return Some(Element {
            tag: tag.to_string(),
            attributes,
            text: String::new(),
        });
    }

    let close = format!("</{}", tag);
    let body = match lower[open_end + 1..].find(&close) {
        Some(rel) => &html[open_end + 1..open_end + 1 + rel],
        None => "",
    };

    Some(Element {
        tag: tag.to_string(),
        attributes,
        text: strip_tags(body),
    })
}

fn is_void_tag(tag: &str) -> bool {
    matches!(tag, "br" | "hr" | "img" | "input" | "meta" | "link")
}

/// Parse `name="value"` pairs, tolerating single quotes and bare boolean
/// attributes such as `hidden`.
fn parse_attributes(region: &str) -> HashMap<String, String> {
    let mut attributes = HashMap::new();
    let bytes = region.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i >= bytes.len() {
            break;
        }

        let name_start = i;
        while i < bytes.len() && bytes[i] != b'=' && !bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        let name = region[name_start..i].to_ascii_lowercase();

        if i < bytes.len() && bytes[i] == b'=' {
            i += 1;
            let value = if i < bytes.len() && (bytes[i] == b'"' || bytes[i] == b'\'') {
                let quote = bytes[i];
                i += 1;
                let value_start = i;
                while i < bytes.len() && bytes[i] != quote {
                    i += 1;
                }
                let value = region[value_start..i].to_string();
                i = (i + 1).min(bytes.len());
                value
            } else {
                let value_start = i;
                while i < bytes.len() && !bytes[i].is_ascii_whitespace() {
                    i += 1;
                }
                region[value_start..i].to_string()
            };
            if !name.is_empty() {
                attributes.insert(name, value);
            }
        } else if !name.is_empty() {
            // Boolean attribute such as `hidden` or `disabled`.
            attributes.insert(name, String::new());
        }
    }

    attributes
}

/// Flatten markup to its text content.
fn strip_tags(body: &str) -> String {
    let mut text = String::with_capacity(body.len());
    let mut in_tag = false;
    for c in body.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => text.push(c),
            _ => {}
        }
    }
    text.trim().to_string()
}
