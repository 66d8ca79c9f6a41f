//! Error types for hepstore
//!
//! This module defines all error types used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! Every error is unrecoverable at the point of detection and is returned to
//! the caller synchronously. Nothing in hepstore retries or degrades silently.

use crate::types::{ObjectId, SchemaVersion};
use std::io;
use thiserror::Error;

/// Result type alias for hepstore operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for hepstore
#[derive(Debug, Error)]
pub enum Error {
    // =========================================================================
    // Schema evolution
    // =========================================================================
    /// The evolution function set of a datatype is incomplete
    #[error("Incomplete schema evolution for '{type_name}': no function for versions {missing:?}")]
    Configuration {
        /// Datatype name
        type_name: String,
        /// Versions in `1..current` without a registered function
        missing: Vec<SchemaVersion>,
    },

    /// A registration disagrees with the current version already recorded
    #[error("Schema version conflict for '{type_name}': registered current version {registered}, got {requested}")]
    VersionConflict {
        /// Datatype name
        type_name: String,
        /// Current version recorded by earlier registrations
        registered: SchemaVersion,
        /// Current version passed by the rejected registration
        requested: SchemaVersion,
    },

    /// An auto-generated function tried to replace a user-defined one
    #[error("User-defined evolution for '{type_name}' from version {from_version} cannot be replaced by an auto-generated one")]
    PriorityConflict {
        /// Datatype name
        type_name: String,
        /// Originating version of the contested slot
        from_version: SchemaVersion,
    },

    /// A slot was registered twice at the same priority
    #[error("Duplicate {priority} evolution for '{type_name}' from version {from_version}")]
    DuplicateRegistration {
        /// Datatype name
        type_name: String,
        /// Originating version of the contested slot
        from_version: SchemaVersion,
        /// Priority tier of both registrations
        priority: &'static str,
    },

    /// Registration for a version outside `1..=current`, or a current version of 0
    #[error("Invalid evolution for '{type_name}': from version {from_version} must lie between 1 and current version {current_version}")]
    InvalidFromVersion {
        /// Datatype name
        type_name: String,
        /// Rejected originating version
        from_version: SchemaVersion,
        /// Current version of the datatype
        current_version: SchemaVersion,
    },

    /// No evolution function for the requested type and version
    #[error("No schema evolution registered for '{type_name}' from version {from_version}")]
    LookupMiss {
        /// Datatype name
        type_name: String,
        /// Version the buffers were written with
        from_version: SchemaVersion,
    },

    /// The registry write phase has been closed
    #[error("Schema evolution registry is sealed; registrations must happen before the first read")]
    RegistrySealed,

    // =========================================================================
    // Object model
    // =========================================================================
    /// A relation range does not fit its backing vector
    #[error("Invalid relation range for '{field}': [{begin}, {end}) over {len} entries")]
    RelationRange {
        /// Relation field name
        field: &'static str,
        /// Range start
        begin: u32,
        /// Range end (exclusive)
        end: u32,
        /// Length of the backing vector
        len: usize,
    },

    /// The collection owning a relation vector no longer exists
    #[error("Collection backing relation '{field}' has been dropped")]
    CollectionDropped {
        /// Relation field name
        field: &'static str,
    },

    /// A relation of a collection read from buffers was extended before its
    /// targets were resolved
    #[error("Relation '{field}' has unresolved references and cannot be extended")]
    PendingReferences {
        /// Relation field name
        field: &'static str,
    },

    /// A handle without payload was dereferenced
    #[error("Handle is not available (no payload)")]
    UnavailableHandle,

    /// A collection holds as many records as `ObjectId` can index
    #[error("Collection of '{type_name}' is full ({len} records)")]
    CollectionFull {
        /// Datatype of the collection
        type_name: &'static str,
        /// Number of records stored
        len: usize,
    },

    /// A record already stored in a collection was pushed again
    #[error("Record {0} is already stored in a collection")]
    AlreadyTracked(ObjectId),

    /// A relation target could not be found while resolving references
    #[error("Unresolved reference in '{field}': no record {target}")]
    UnresolvedReference {
        /// Relation field name
        field: &'static str,
        /// Missing target identity
        target: ObjectId,
    },

    // =========================================================================
    // Buffers and collections
    // =========================================================================
    /// Buffers do not hold the array type a reader expects
    #[error("Buffer type mismatch for '{type_name}': expected {expected}")]
    BufferType {
        /// Datatype name carried by the buffers
        type_name: String,
        /// Expected array type
        expected: &'static str,
    },

    /// No collection factory registered for a type name
    #[error("Unknown datatype: {0}")]
    UnknownDatatype(String),

    /// No collection with the given name
    #[error("Collection not found: {0}")]
    CollectionNotFound(String),

    /// A collection with the given name already exists
    #[error("Duplicate collection: {0}")]
    DuplicateCollection(String),

    // =========================================================================
    // Ambient
    // =========================================================================
    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Whether no evolution function exists for a requested version
    pub fn is_lookup_miss(&self) -> bool {
        matches!(self, Error::LookupMiss { .. })
    }

    /// Whether a datatype's evolution set is incomplete
    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::Configuration { .. })
    }

    /// Whether a registration was rejected
    pub fn is_registration_error(&self) -> bool {
        matches!(
            self,
            Error::VersionConflict { .. }
                | Error::PriorityConflict { .. }
                | Error::DuplicateRegistration { .. }
                | Error::InvalidFromVersion { .. }
                | Error::RegistrySealed
        )
    }

    /// Whether a relation could not be read or extended
    pub fn is_relation_error(&self) -> bool {
        matches!(
            self,
            Error::RelationRange { .. }
                | Error::CollectionDropped { .. }
                | Error::PendingReferences { .. }
                | Error::UnresolvedReference { .. }
        )
    }
}
