use std::mem::replace;

use serde::{Deserialize, Serialize};


/// The last value confirmed by the remote source of truth.
///
/// Only the [reconciler](crate::reconciler) writes to it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authority<T> {
    value: T,
    #[serde(default)]
    revision: u64,
}

impl<T> Authority<T> {
    pub fn new(value: T) -> Self {
        Self { value, revision: 0 }
    }
    pub fn get(&self) -> &T {
        &self.value
    }

    /// Number of confirmations applied since creation.
    pub fn revision(&self) -> u64 {
        self.revision
    }
    pub fn into_inner(self) -> T {
        self.value
    }

    pub(crate) fn replace(&mut self, value: T) -> T {
        self.revision += 1;
        replace(&mut self.value, value)
    }
}
