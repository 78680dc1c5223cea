//! Category-name normalization.
//!
//! Category names arrive in many spellings: with or without the namespace
//! prefix, with underscores or spaces, with stray whitespace, in any case.
//! Every presence check, diff and duplicate test in this crate goes through
//! the single equivalence relation defined here.

/// Namespace prefix recognized on category names and link targets.
pub const CATEGORY_NAMESPACE: &str = "Category";

/// Canonical form of a category name: namespace prefix stripped,
/// underscores mapped to spaces, whitespace runs collapsed, trimmed.
/// Case is preserved; comparisons fold it separately.
pub fn normalize(raw: &str) -> String {
    let spaced = raw.replace('_', " ");
    let collapsed = collapse_spaces(spaced.trim());
    match split_namespace(&collapsed) {
        Some(rest) => rest.trim().to_string(),
        None => collapsed,
    }
}

/// Two names are equivalent iff their normalized forms are equal
/// case-insensitively.
pub fn equivalent(a: &str, b: &str) -> bool {
    normalize(a).to_lowercase() == normalize(b).to_lowercase()
}

fn split_namespace(name: &str) -> Option<&str> {
    let (head, tail) = name.split_once(':')?;
    head.trim()
        .eq_ignore_ascii_case(CATEGORY_NAMESPACE)
        .then_some(tail)
}

fn collapse_spaces(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut prev_space = false;
    for ch in input.chars() {
        if ch.is_whitespace() {
            if !prev_space {
                out.push(' ');
            }
            prev_space = true;
        } else {
            out.push(ch);
            prev_space = false;
        }
    }
    out
}
