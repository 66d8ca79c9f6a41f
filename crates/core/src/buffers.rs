//! Type-erased collection buffers
//!
//! `CollectionBuffers` is the only object exchanged between a backend
//! adapter, the schema evolution registry, and collection reconstruction.
//! It carries:
//!
//! - the primary record-data array (one `Record` per record: the POD
//!   fields plus the record's relation ranges)
//! - one `ObjectId` array per relation field, in declaration order
//! - the schema version the arrays were produced under
//!
//! The data array is stored behind `Arc<dyn Any>`, so the registry can move
//! buffers around without knowing the concrete layout. Only code that knows
//! the layout of a specific version (a datatype or one of its evolution
//! functions) downcasts it.
//!
//! Cloning buffers is cheap: all arrays are shared.

use crate::error::{Error, Result};
use crate::types::{ObjectId, RelationRange, SchemaVersion};
use smallvec::SmallVec;
use std::any::{type_name as type_name_of, Any};
use std::fmt;
use std::sync::Arc;

/// Shared, type-erased record-data array
pub type DataArray = Arc<dyn Any + Send + Sync>;

/// Shared relation array (targets of one relation field, all records)
pub type RelationArray = Arc<Vec<ObjectId>>;

/// One element of a record-data array: POD fields plus relation ranges
///
/// `relations[i]` is the record's range into relation array `i` of the same
/// buffers.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record<T> {
    /// POD field block
    pub fields: T,
    /// One range per relation field, in declaration order
    pub relations: SmallVec<[RelationRange; 2]>,
}

impl<T> Record<T> {
    /// Record without relation fields
    pub fn new(fields: T) -> Self {
        Self {
            fields,
            relations: SmallVec::new(),
        }
    }

    /// Record with the given relation ranges
    pub fn with_relations(fields: T, relations: impl IntoIterator<Item = RelationRange>) -> Self {
        Self {
            fields,
            relations: relations.into_iter().collect(),
        }
    }

    /// Convert the field block, keeping the ranges
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Record<U> {
        Record {
            fields: f(self.fields),
            relations: self.relations,
        }
    }
}

/// Transport bundle of one collection's arrays plus its schema version
#[derive(Clone)]
pub struct CollectionBuffers {
    type_name: String,
    schema_version: SchemaVersion,
    data: DataArray,
    len: usize,
    relations: SmallVec<[RelationArray; 2]>,
}

impl CollectionBuffers {
    /// Create buffers from a record-data array
    pub fn new<T>(type_name: impl Into<String>, schema_version: SchemaVersion, data: Vec<T>) -> Self
    where
        T: Send + Sync + 'static,
    {
        let len = data.len();
        Self {
            type_name: type_name.into(),
            schema_version,
            data: Arc::new(data),
            len,
            relations: SmallVec::new(),
        }
    }

    /// Append the next relation array (fields are kept in declaration order)
    pub fn with_relation(mut self, targets: Vec<ObjectId>) -> Self {
        self.relations.push(Arc::new(targets));
        self
    }

    /// Append an already shared relation array
    pub fn with_shared_relation(mut self, targets: RelationArray) -> Self {
        self.relations.push(targets);
        self
    }

    /// Re-tag the buffers with another schema version
    pub fn with_schema_version(mut self, schema_version: SchemaVersion) -> Self {
        self.schema_version = schema_version;
        self
    }

    /// Datatype name these buffers belong to
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Schema version the arrays follow
    pub fn schema_version(&self) -> SchemaVersion {
        self.schema_version
    }

    /// Number of records in the data array
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the data array is empty
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Borrow the data array as a slice of `T`
    ///
    /// # Errors
    ///
    /// Returns `Error::BufferType` if the array does not hold `Vec<T>`.
    pub fn data<T: 'static>(&self) -> Result<&[T]> {
        self.data
            .downcast_ref::<Vec<T>>()
            .map(Vec::as_slice)
            .ok_or_else(|| self.type_error::<T>())
    }

    /// Consume the buffers, returning the data array as `Vec<T>`
    ///
    /// Avoids a copy when no other buffers share the array.
    pub fn into_data<T>(self) -> Result<Vec<T>>
    where
        T: Clone + Send + Sync + 'static,
    {
        let CollectionBuffers {
            type_name, data, ..
        } = self;
        unwrap_array(data, &type_name)
    }

    /// Replace the data array, keeping relations and type name
    ///
    /// This is the building block of evolution functions that change the
    /// record layout: downcast the old layout, convert each element, and
    /// re-tag with the new version.
    pub fn map_data<T, U, F>(self, f: F) -> Result<Self>
    where
        T: Clone + Send + Sync + 'static,
        U: Send + Sync + 'static,
        F: FnOnce(Vec<T>) -> Vec<U>,
    {
        let CollectionBuffers {
            type_name,
            schema_version,
            data,
            relations,
            ..
        } = self;
        let new = f(unwrap_array::<T>(data, &type_name)?);
        let len = new.len();
        Ok(Self {
            type_name,
            schema_version,
            data: Arc::new(new),
            len,
            relations,
        })
    }

    /// Convert every record's field block from `T` to `U`
    ///
    /// Shorthand for `map_data` over `Record<T>` arrays; relation ranges and
    /// relation arrays are carried over untouched.
    pub fn map_records<T, U, F>(self, mut f: F) -> Result<Self>
    where
        T: Clone + Send + Sync + 'static,
        U: Send + Sync + 'static,
        F: FnMut(T) -> U,
    {
        self.map_data(|records: Vec<Record<T>>| {
            records.into_iter().map(|r| r.map(&mut f)).collect()
        })
    }

    /// All relation arrays in field declaration order
    pub fn relations(&self) -> &[RelationArray] {
        &self.relations
    }

    /// Relation array of the field at `index`
    pub fn relation(&self, index: usize) -> Option<&[ObjectId]> {
        self.relations.get(index).map(|r| r.as_slice())
    }

    /// Whether both buffers share every array (same allocations)
    ///
    /// This is identity, not content equality.
    pub fn shares_storage_with(&self, other: &CollectionBuffers) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
            && self.relations.len() == other.relations.len()
            && self
                .relations
                .iter()
                .zip(other.relations.iter())
                .all(|(a, b)| Arc::ptr_eq(a, b))
    }

    fn type_error<T>(&self) -> Error {
        buffer_type_error::<T>(&self.type_name)
    }
}

fn buffer_type_error<T>(type_name: &str) -> Error {
    Error::BufferType {
        type_name: type_name.to_string(),
        expected: type_name_of::<Vec<T>>(),
    }
}

fn unwrap_array<T>(data: DataArray, type_name: &str) -> Result<Vec<T>>
where
    T: Clone + Send + Sync + 'static,
{
    let typed = data
        .downcast::<Vec<T>>()
        .map_err(|_| buffer_type_error::<T>(type_name))?;
    Ok(Arc::try_unwrap(typed).unwrap_or_else(|shared| (*shared).clone()))
}

impl fmt::Debug for CollectionBuffers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionBuffers")
            .field("type_name", &self.type_name)
            .field("schema_version", &self.schema_version)
            .field("len", &self.len)
            .field("relation_count", &self.relations.len())
            .finish()
    }
}
