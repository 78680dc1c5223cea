use thiserror::Error;

use crate::category;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RequestError {
    #[error("category name {0:?} normalizes to an empty string")]
    EmptyName(String),
    #[error("category {0:?} appears in both the add and remove lists")]
    AddRemoveOverlap(String),
}

/// A validated add/remove edit, scoped to one run.
///
/// Construction is the gate that keeps malformed input out of the engine:
/// names that normalize to nothing are rejected, equivalent duplicates
/// within a list are dropped (first spelling wins), and a name present in
/// both lists is an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRequest {
    to_add: Vec<String>,
    to_remove: Vec<String>,
}

impl MutationRequest {
    pub fn new(to_add: Vec<String>, to_remove: Vec<String>) -> Result<Self, RequestError> {
        let to_add = dedupe(to_add)?;
        let to_remove = dedupe(to_remove)?;
        for name in &to_add {
            if to_remove
                .iter()
                .any(|other| category::equivalent(name, other))
            {
                return Err(RequestError::AddRemoveOverlap(name.clone()));
            }
        }
        Ok(Self { to_add, to_remove })
    }

    pub fn to_add(&self) -> &[String] {
        &self.to_add
    }

    pub fn to_remove(&self) -> &[String] {
        &self.to_remove
    }

    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

fn dedupe(names: Vec<String>) -> Result<Vec<String>, RequestError> {
    let mut kept: Vec<String> = Vec::with_capacity(names.len());
    for name in names {
        if category::normalize(&name).is_empty() {
            return Err(RequestError::EmptyName(name));
        }
        if !kept.iter().any(|seen| category::equivalent(seen, &name)) {
            kept.push(name);
        }
    }
    Ok(kept)
}
