//! Pure text transforms over wikitext category links.
//!
//! A category-link token is `[[Category:Name]]` or `[[Category:Name|sort]]`,
//! with the namespace matched case-insensitively and spaces/underscores used
//! interchangeably inside the target. `[[:Category:Name]]` renders as a
//! visible link rather than categorizing the page and is ignored here.

use crate::category;

#[derive(Debug, Clone, PartialEq, Eq)]
struct LinkSpan {
    start: usize,
    end: usize,
    name: String,
}

fn scan_links(body: &str) -> Vec<LinkSpan> {
    let mut spans = Vec::new();
    let mut cursor = 0;
    while let Some(open_rel) = body[cursor..].find("[[") {
        let open = cursor + open_rel;
        let Some(close_rel) = body[open + 2..].find("]]") else {
            break;
        };
        let close = open + 2 + close_rel;
        let inner = &body[open + 2..close];
        cursor = close + 2;
        if let Some(name) = category_target(inner) {
            spans.push(LinkSpan {
                start: open,
                end: close + 2,
                name,
            });
        }
    }
    spans
}

/// The category name from link text, or `None` when the link does not
/// categorize the page (wrong namespace, leading colon, empty name).
fn category_target(inner: &str) -> Option<String> {
    let target = inner.split('|').next().unwrap_or(inner).trim();
    if target.starts_with(':') {
        return None;
    }
    let (head, tail) = target.split_once(':')?;
    let head = head.replace('_', " ");
    if !head.trim().eq_ignore_ascii_case(category::CATEGORY_NAMESPACE) {
        return None;
    }
    let name = tail.trim();
    if category::normalize(name).is_empty() {
        return None;
    }
    Some(name.to_string())
}

/// Category-link names as written, in document order.
pub fn category_links(body: &str) -> Vec<String> {
    scan_links(body).into_iter().map(|span| span.name).collect()
}

/// True iff some category-link token's name is equivalent to `name`.
pub fn has_category_link(body: &str, name: &str) -> bool {
    scan_links(body)
        .iter()
        .any(|span| category::equivalent(&span.name, name))
}

/// Canonical rendering for a category link: normalized name, no sort key.
pub fn render_link(name: &str) -> String {
    format!(
        "[[{}:{}]]",
        category::CATEGORY_NAMESPACE,
        category::normalize(name)
    )
}

/// Append a canonical link for `name` unless an equivalent link is already
/// present under any spelling. The link lands on its own line directly
/// after the last existing category link, or at end of body if none exist.
pub fn add_category_link(body: &str, name: &str) -> String {
    let spans = scan_links(body);
    if spans
        .iter()
        .any(|span| category::equivalent(&span.name, name))
    {
        return body.to_string();
    }

    let link = render_link(name);
    match spans.last() {
        Some(last) => {
            let mut out = String::with_capacity(body.len() + link.len() + 1);
            out.push_str(&body[..last.end]);
            out.push('\n');
            out.push_str(&link);
            out.push_str(&body[last.end..]);
            out
        }
        None if body.is_empty() => link,
        None if body.ends_with('\n') => format!("{body}{link}"),
        None => format!("{body}\n{link}"),
    }
}

/// Remove every link equivalent to `name`, each with one trailing line
/// break so no blank line is left behind. No-op when none are present.
pub fn remove_category_link(body: &str, name: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut cursor = 0;
    for span in scan_links(body) {
        if !category::equivalent(&span.name, name) {
            continue;
        }
        out.push_str(&body[cursor..span.start]);
        cursor = span.end;
        if body[cursor..].starts_with("\r\n") {
            cursor += 2;
        } else if body[cursor..].starts_with('\n') {
            cursor += 1;
        }
    }
    out.push_str(&body[cursor..]);
    out
}
