//! Document enumeration: observe each title's current categories.

use recat_core::{category_links, Document};
use recat_logging::engine_warn;

use crate::store::{DocumentStore, StoreError};

/// Read every title's body and build a [`Document`] carrying its observed
/// categories. Page ids are run-local sequence numbers. Titles that fail
/// to read are returned separately and never make it into the run.
pub async fn enumerate_documents(
    store: &dyn DocumentStore,
    titles: &[String],
) -> (Vec<Document>, Vec<(String, StoreError)>) {
    let mut documents = Vec::with_capacity(titles.len());
    let mut failures = Vec::new();
    for (index, title) in titles.iter().enumerate() {
        match store.read_body(title).await {
            Ok(body) => {
                let document = Document::new(title.clone(), index as u64 + 1)
                    .with_categories(category_links(&body));
                documents.push(document);
            }
            Err(err) => {
                engine_warn!("skipping {title:?}: {err}");
                failures.push((title.clone(), err));
            }
        }
    }
    (documents, failures)
}
