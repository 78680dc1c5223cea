//! Recat engine: rate-budgeted batch mutation over a document store.
mod batch;
mod budget;
mod enumerate;
mod gateway;
mod http;
mod quota;
mod store;

pub use batch::{BatchEngine, BatchOptions, NullSink, ProgressSink, StopHandle};
pub use budget::{RateBudget, RateBudgetConfig};
pub use enumerate::enumerate_documents;
pub use gateway::{edit_summary, Mutation, MutationGateway, TOOL_TAG};
pub use http::{HttpDocumentStore, StoreSettings};
pub use quota::{Quota, QuotaSource};
pub use store::{DocumentStore, StoreError, WriteOutcome};
