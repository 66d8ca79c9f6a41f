//! Object model for hepstore
//!
//! This crate implements records, handles and collections:
//! - Datatype: contract implemented by every record type
//! - Handle: shared, reference-counted reference to a record payload
//! - Collection: append-only columnar store of one datatype
//! - RelationVector / RelationIter: one-to-many relations stored as ranges
//!   into a collection-owned vector, resolved lazily
//! - CollectionFactory: rebuilds collections from buffers by type name

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod base;
pub mod collection;
pub mod datatype;
pub mod factory;
pub mod handle;
pub mod obj;
pub mod relation;

#[cfg(test)]
pub(crate) mod testing;

pub use base::{CollectionBase, CollectionProvider};
pub use collection::Collection;
pub use datatype::{Datatype, RelationField, RelationFields};
pub use factory::{
    create_collection, is_collection_type_registered, rebuild_collection,
    register_collection_type, CollectionFactory,
};
pub use handle::Handle;
pub use obj::Obj;
pub use relation::{RelationColumn, RelationIter, RelationVector};
