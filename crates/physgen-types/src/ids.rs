//! Strongly-typed identifiers for simulated objects.
//!
//! The object ID is the join key between the commands that create an
//! object and the response records that describe it each frame.

use serde::{Deserialize, Serialize};

use crate::constants::ZERO_PAD_WIDTH;

/// Engine-side ID of an object instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(pub i32);

impl ObjectId {
    #[inline]
    pub fn raw(self) -> i32 {
        self.0
    }
}

impl From<i32> for ObjectId {
    fn from(val: i32) -> Self {
        Self(val)
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Issues object IDs in increasing order for the lifetime of a run.
///
/// IDs are never reused across trials, so a stale response record from a
/// previous trial can never be joined to a new object.
#[derive(Debug, Clone)]
pub struct IdAllocator {
    next: i32,
}

impl IdAllocator {
    /// Starts issuing at `first`.
    pub fn starting_at(first: i32) -> Self {
        Self { next: first }
    }

    /// Returns a fresh ID.
    pub fn next_id(&mut self) -> ObjectId {
        let id = ObjectId(self.next);
        self.next += 1;
        id
    }

    /// The ID the next call will return.
    pub fn peek(&self) -> ObjectId {
        ObjectId(self.next)
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::starting_at(1)
    }
}

/// Formats `n` zero-padded to the dataset's fixed width ("0007").
pub fn zero_padding(n: u32) -> String {
    format!("{n:0width$}", width = ZERO_PAD_WIDTH)
}
