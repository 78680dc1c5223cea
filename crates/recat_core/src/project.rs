//! Projection of a mutation request over a document's observed categories.
//!
//! The preview shown before a run and the decision of which documents are
//! worth mutating both come from here, so they can never disagree.

use crate::{category, Document, MutationRequest};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection {
    pub current: Vec<String>,
    pub projected: Vec<String>,
    pub will_change: bool,
}

/// Compute the category set a document would end up with.
///
/// Removals go first: each `to_remove` member deletes its first equivalent
/// occurrence, preserving the order of the rest. Then every `to_add` member
/// not already equivalent-present is appended in normalized form.
/// `will_change` compares the full sequences, order included.
pub fn project(document: &Document, request: &MutationRequest) -> Projection {
    let current = document.current_categories.clone();
    let mut projected = current.clone();

    for name in request.to_remove() {
        if let Some(pos) = projected
            .iter()
            .position(|have| category::equivalent(have, name))
        {
            projected.remove(pos);
        }
    }
    for name in request.to_add() {
        if !projected
            .iter()
            .any(|have| category::equivalent(have, name))
        {
            projected.push(category::normalize(name));
        }
    }

    let will_change = projected != current;
    Projection {
        current,
        projected,
        will_change,
    }
}

/// Stable-order subsequence of documents whose projection changes.
pub fn filter_will_change(documents: &[Document], request: &MutationRequest) -> Vec<Document> {
    documents
        .iter()
        .filter(|document| project(document, request).will_change)
        .cloned()
        .collect()
}

pub fn count_will_change(documents: &[Document], request: &MutationRequest) -> usize {
    documents
        .iter()
        .filter(|document| project(document, request).will_change)
        .count()
}
