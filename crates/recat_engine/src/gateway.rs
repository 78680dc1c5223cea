//! Single-document read-modify-write against a document store.

use std::sync::Arc;

use recat_core::{add_category_link, remove_category_link, MutationRequest};
use recat_logging::engine_debug;

use crate::store::{DocumentStore, StoreError, WriteOutcome};

/// Tag appended to every generated edit summary.
pub const TOOL_TAG: &str = "recat";

/// Outcome of one idempotent mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    /// The store accepted a changed body.
    Applied,
    /// The proposed change was already satisfied; nothing was written.
    Unchanged,
}

/// Applies one mutation request to one document. No backoff or retry of
/// its own; optimistic-concurrency retry lives inside the store.
pub struct MutationGateway {
    store: Arc<dyn DocumentStore>,
}

impl MutationGateway {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Read the current body, apply every removal then every addition, and
    /// write the result back. A body left byte-identical is reported as
    /// [`Mutation::Unchanged`] without touching the store again; this is an
    /// explicit no-op outcome, not an error.
    pub async fn mutate(
        &self,
        title: &str,
        request: &MutationRequest,
    ) -> Result<Mutation, StoreError> {
        let body = self.store.read_body(title).await?;

        let mut next = body.clone();
        for name in request.to_remove() {
            next = remove_category_link(&next, name);
        }
        for name in request.to_add() {
            next = add_category_link(&next, name);
        }

        if next == body {
            engine_debug!("{title:?} already satisfies the request");
            return Ok(Mutation::Unchanged);
        }

        let summary = edit_summary(request);
        match self.store.write(title, &next, &summary).await? {
            WriteOutcome::Accepted => Ok(Mutation::Applied),
            WriteOutcome::NoChange => Ok(Mutation::Unchanged),
        }
    }
}

/// Renders `"Adding A, B; Removing C (via recat)"`: categories within a
/// clause joined by `", "`, clauses joined by `"; "`, an empty clause
/// omitted entirely rather than rendered as "none".
pub fn edit_summary(request: &MutationRequest) -> String {
    let mut clauses = Vec::with_capacity(2);
    if !request.to_add().is_empty() {
        clauses.push(format!("Adding {}", request.to_add().join(", ")));
    }
    if !request.to_remove().is_empty() {
        clauses.push(format!("Removing {}", request.to_remove().join(", ")));
    }

    if clauses.is_empty() {
        format!("(via {TOOL_TAG})")
    } else {
        format!("{} (via {TOOL_TAG})", clauses.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::edit_summary;
    use recat_core::MutationRequest;

    fn request(add: &[&str], remove: &[&str]) -> MutationRequest {
        MutationRequest::new(
            add.iter().map(|c| c.to_string()).collect(),
            remove.iter().map(|c| c.to_string()).collect(),
        )
        .expect("valid request")
    }

    #[test]
    fn summary_with_both_clauses() {
        assert_eq!(
            edit_summary(&request(&["A", "B"], &["C"])),
            "Adding A, B; Removing C (via recat)"
        );
    }

    #[test]
    fn summary_omits_empty_add_clause() {
        assert_eq!(
            edit_summary(&request(&[], &["C"])),
            "Removing C (via recat)"
        );
    }

    #[test]
    fn summary_omits_empty_remove_clause() {
        assert_eq!(edit_summary(&request(&["A"], &[])), "Adding A (via recat)");
    }

    #[test]
    fn summary_keeps_names_as_written() {
        assert_eq!(
            edit_summary(&request(&["Category:Tall_Ships"], &[])),
            "Adding Category:Tall_Ships (via recat)"
        );
    }
}
