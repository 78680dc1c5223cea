//! Recat core: pure category-mutation logic and batch accounting.
mod category;
mod document;
mod project;
mod report;
mod request;
mod wikitext;

pub use category::{equivalent, normalize, CATEGORY_NAMESPACE};
pub use document::{Document, PageId};
pub use project::{count_will_change, filter_will_change, project, Projection};
pub use report::{BatchResult, ErrorEntry, FileResult, FileStatus};
pub use request::{MutationRequest, RequestError};
pub use wikitext::{
    add_category_link, category_links, has_category_link, remove_category_link, render_link,
};
