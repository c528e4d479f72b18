//! Typed caller identity.
//!
//! Every core operation that acts on behalf of a user takes a [`Subject`]
//! argument. Nothing downstream looks the caller up from ambient state.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Database identifier of a user.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubjectId(i64);

impl SubjectId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the raw row id.
    pub fn get(&self) -> i64 {
        self.0
    }
}

impl fmt::Debug for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SubjectId({})", self.0)
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for SubjectId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// An authenticated caller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub id: SubjectId,
    pub username: String,
}

impl Subject {
    pub fn new(id: impl Into<SubjectId>, username: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
        }
    }

    /// Check whether this subject owns a record with the given owner id.
    pub fn owns(&self, owner_id: i64) -> bool {
        self.id.get() == owner_id
    }
}
