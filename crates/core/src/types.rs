//! Identity and version types
//!
//! This module defines the foundational types:
//! - CollectionId: Identifier of one collection within a frame
//! - ObjectId: Identity of one record (collection + index)
//! - SchemaVersion: Version of a datatype's on-disk layout
//! - RelationRange: Half-open index interval into a relation vector

use serde::{Deserialize, Serialize};
use std::fmt;

/// Schema version of a datatype layout.
///
/// Versions start at 1. Every datatype has exactly one *current* version;
/// buffers written under an older version must be evolved before a
/// collection can be rebuilt from them.
pub type SchemaVersion = u32;

/// Identifier of a collection within one frame.
///
/// Collection IDs are assigned when a collection is put into a frame.
/// `CollectionId::UNASSIGNED` marks collections that are not (yet) part of
/// any frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CollectionId(u32);

impl CollectionId {
    /// Marker for a collection without an assigned ID
    pub const UNASSIGNED: CollectionId = CollectionId(0);

    /// Create a collection ID from its raw value
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Raw numeric value
    #[inline]
    pub const fn as_u32(&self) -> u32 {
        self.0
    }

    /// Check whether an ID has been assigned
    #[inline]
    pub const fn is_assigned(&self) -> bool {
        self.0 != Self::UNASSIGNED.0
    }
}

impl Default for CollectionId {
    fn default() -> Self {
        Self::UNASSIGNED
    }
}

impl fmt::Display for CollectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of one record within one collection generation.
///
/// Two handles referring to records in the same collection generation
/// compare equal by `ObjectId` exactly when they reference the same record.
/// Relation vectors are persisted as sequences of `ObjectId`s.
///
/// ## Special values
///
/// - `untracked()`: the record is not stored in any collection
/// - `invalid()`: the record could not be identified
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId {
    /// Collection the record belongs to
    pub collection_id: CollectionId,
    /// Position of the record inside its collection
    pub index: i32,
}

impl ObjectId {
    /// Index used for records that live outside a collection
    pub const UNTRACKED_INDEX: i32 = -1;
    /// Index used for records that cannot be identified
    pub const INVALID_INDEX: i32 = -2;

    /// Create an ObjectId
    pub const fn new(collection_id: CollectionId, index: i32) -> Self {
        Self {
            collection_id,
            index,
        }
    }

    /// Identity of a record that is not part of any collection
    pub const fn untracked() -> Self {
        Self::new(CollectionId::UNASSIGNED, Self::UNTRACKED_INDEX)
    }

    /// Identity of a record that cannot be identified
    pub const fn invalid() -> Self {
        Self::new(CollectionId::UNASSIGNED, Self::INVALID_INDEX)
    }

    /// Whether this id points at a record stored in a collection
    #[inline]
    pub const fn is_tracked(&self) -> bool {
        self.index >= 0
    }

    /// Whether this id is anything but `invalid()`
    #[inline]
    pub const fn is_valid(&self) -> bool {
        self.index != Self::INVALID_INDEX
    }

    /// Position in the collection, if tracked
    pub fn position(&self) -> Option<usize> {
        usize::try_from(self.index).ok()
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::untracked()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.collection_id, self.index)
    }
}

/// Half-open interval `[begin, end)` into a collection's relation vector.
///
/// ## Invariants
///
/// - `begin <= end` for every range produced by a collection
/// - `begin == end` means "no related records"
/// - ranges of one relation field are assigned in append order and never
///   overlap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct RelationRange {
    /// First index (inclusive)
    pub begin: u32,
    /// Last index (exclusive)
    pub end: u32,
}

impl RelationRange {
    /// Create a range
    pub const fn new(begin: u32, end: u32) -> Self {
        Self { begin, end }
    }

    /// Empty range positioned at `at`
    pub const fn empty_at(at: u32) -> Self {
        Self { begin: at, end: at }
    }

    /// Number of entries covered (zero for malformed ranges)
    #[inline]
    pub const fn len(&self) -> usize {
        self.end.saturating_sub(self.begin) as usize
    }

    /// Whether the range covers nothing
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.end <= self.begin
    }

    /// Check the range against a backing vector of `len` entries
    ///
    /// Returns the equivalent `usize` range when `begin <= end <= len`.
    pub fn checked(&self, len: usize) -> Option<std::ops::Range<usize>> {
        let (begin, end) = (self.begin as usize, self.end as usize);
        if begin <= end && end <= len {
            Some(begin..end)
        } else {
            None
        }
    }
}

impl fmt::Display for RelationRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.begin, self.end)
    }
}
