//! Datatype contract implemented by generated record types
//!
//! Every datatype of a datamodel is described by one type implementing
//! [`Datatype`]. The implementation is normally emitted by the code
//! generator; `hepstore-datamodel` contains hand-written instances.
//!
//! A datatype is a thin wrapper around [`Handle<Self>`]: all ownership,
//! relation and collection logic lives in this crate, and the generated
//! code only adds typed field accessors on top.

use crate::handle::Handle;
use crate::relation::{RelationColumn, RelationVector};
use hepstore_core::SchemaVersion;
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;

/// Declaration of one relation field of a datatype
#[derive(Clone, Copy)]
pub struct RelationField {
    name: &'static str,
    target: &'static str,
    new_column: fn(&'static str) -> Arc<dyn RelationColumn>,
}

impl RelationField {
    /// Declare a relation field named `name` pointing at records of `T`
    pub fn to<T: Datatype>(name: &'static str) -> Self {
        Self {
            name,
            target: T::TYPE_NAME,
            new_column: RelationVector::<T>::shared,
        }
    }

    /// Field name
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Type name of the related records
    pub fn target(&self) -> &'static str {
        self.target
    }

    /// Allocate an empty shared vector for this field
    pub fn new_column(&self) -> Arc<dyn RelationColumn> {
        (self.new_column)(self.name)
    }
}

impl fmt::Debug for RelationField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelationField")
            .field("name", &self.name)
            .field("target", &self.target)
            .finish()
    }
}

/// Relation field declarations of one datatype, in declaration order
pub type RelationFields = SmallVec<[RelationField; 2]>;

/// A record type that can live in a [`Collection`](crate::Collection).
///
/// ## Contract
///
/// - `TYPE_NAME` is unique across all datamodels loaded in a process; it is
///   the key of the collection factory and the schema evolution registry.
/// - `SCHEMA_VERSION` is the *current* layout version (starting at 1).
/// - `relation_fields()` returns the same fields in the same order on every
///   call; relation arrays in buffers follow that order.
pub trait Datatype: Sized + Send + Sync + 'static {
    /// Fully qualified type name
    const TYPE_NAME: &'static str;

    /// Current schema version of the record layout
    const SCHEMA_VERSION: SchemaVersion;

    /// POD field block stored in the shared payload
    type Data: Clone + Default + fmt::Debug + Send + Sync + 'static;

    /// Relation fields of this datatype
    fn relation_fields() -> RelationFields {
        RelationFields::new()
    }

    /// Wrap a handle into the user-facing type
    fn from_handle(handle: Handle<Self>) -> Self;

    /// Borrow the underlying handle
    fn handle(&self) -> &Handle<Self>;
}
