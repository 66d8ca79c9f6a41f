//! Core types for hepstore
//!
//! This crate defines the foundational types used throughout the system:
//! - ObjectId / CollectionId: Identity of records and collections
//! - SchemaVersion: Version of a datatype's on-disk layout
//! - RelationRange: Per-record interval into a relation vector
//! - CollectionBuffers: Type-erased transport bundle exchanged between
//!   backends, the schema evolution registry and collection reconstruction
//! - Error: Error type hierarchy

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod buffers;
pub mod error;
pub mod types;

pub use buffers::{CollectionBuffers, DataArray, Record, RelationArray};
pub use error::{Error, Result};
pub use types::{CollectionId, ObjectId, RelationRange, SchemaVersion};
