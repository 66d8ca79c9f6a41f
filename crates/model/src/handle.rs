//! Handles: shared references to record payloads
//!
//! ## Ownership contract
//!
//! | Operation                | Effect on the payload                          |
//! |--------------------------|------------------------------------------------|
//! | `Handle::new()`          | fresh payload, reference count 1               |
//! | `clone()` / `clone_from` | same payload, count + 1 (old payload count - 1) |
//! | `deep_clone()`           | new payload with copied fields and ranges      |
//! | drop                     | count - 1, payload destroyed at 0              |
//!
//! Reference counts are atomic (`Arc`), so handles may be moved and shared
//! across threads. Field access goes through a per-payload `RwLock`.
//!
//! ## Unavailable handles
//!
//! `Handle::unavailable()` references no payload. Every accessor on it
//! returns `Error::UnavailableHandle`; check `is_available()` first when a
//! handle may be empty (e.g. an unresolved relation target).

use crate::datatype::Datatype;
use crate::obj::{Obj, SharedObj};
use crate::relation::{RelationIter, RelationSlot};
use hepstore_core::{Error, ObjectId, RelationRange, Result};
use parking_lot::{MappedRwLockReadGuard, MappedRwLockWriteGuard, RwLockReadGuard, RwLockWriteGuard};
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;

/// Shared reference to the payload of one record of datatype `D`
pub struct Handle<D: Datatype> {
    obj: Option<SharedObj<D>>,
}

impl<D: Datatype> Handle<D> {
    /// Handle over a fresh payload with default field values
    pub fn new() -> Self {
        Self::with_data(D::Data::default())
    }

    /// Handle over a fresh payload with the given field values
    pub fn with_data(data: D::Data) -> Self {
        Self::from_shared(Obj::detached(data).into_shared())
    }

    /// Handle that references no payload
    pub const fn unavailable() -> Self {
        Self { obj: None }
    }

    pub(crate) fn from_shared(obj: SharedObj<D>) -> Self {
        Self { obj: Some(obj) }
    }

    pub(crate) fn shared(&self) -> Result<&SharedObj<D>> {
        self.obj.as_ref().ok_or(Error::UnavailableHandle)
    }

    /// Whether this handle references a payload
    pub fn is_available(&self) -> bool {
        self.obj.is_some()
    }

    /// Identity of the referenced record
    pub fn object_id(&self) -> Result<ObjectId> {
        Ok(self.shared()?.read().id)
    }

    /// Number of live references to the payload (0 when unavailable)
    ///
    /// Collections count as one reference for every record they store.
    pub fn ref_count(&self) -> usize {
        self.obj.as_ref().map_or(0, Arc::strong_count)
    }

    /// Whether both handles reference the same payload
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (&self.obj, &other.obj) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }

    /// Independent copy of the record
    ///
    /// The copy has its own payload (reference count 1) with the same field
    /// values and relation ranges, and is not part of any collection.
    /// Mutating it never affects the source.
    pub fn deep_clone(&self) -> Result<Self> {
        let copy = self.shared()?.read().duplicate();
        Ok(Self::from_shared(copy.into_shared()))
    }

    /// Read access to the field block
    pub fn data(&self) -> Result<MappedRwLockReadGuard<'_, D::Data>> {
        let guard = self.shared()?.read();
        Ok(RwLockReadGuard::map(guard, |obj| &obj.data))
    }

    /// Write access to the field block
    ///
    /// The change is visible through every handle sharing the payload.
    pub fn data_mut(&self) -> Result<MappedRwLockWriteGuard<'_, D::Data>> {
        let guard = self.shared()?.write();
        Ok(RwLockWriteGuard::map(guard, |obj| &mut obj.data))
    }

    /// Read fields through a closure
    pub fn read<R>(&self, f: impl FnOnce(&D::Data) -> R) -> Result<R> {
        Ok(f(&*self.data()?))
    }

    /// Modify fields through a closure
    pub fn update<R>(&self, f: impl FnOnce(&mut D::Data) -> R) -> Result<R> {
        Ok(f(&mut *self.data_mut()?))
    }

    /// Related records of relation field `field`
    ///
    /// The iterator resolves entries lazily from the collection-owned vector.
    pub fn relation<T: Datatype>(&self, field: usize) -> Result<RelationIter<T>> {
        let obj = self.shared()?.read();
        slot(&obj.relations, field)?.iter::<T>()
    }

    /// Append a related record to relation field `field`
    ///
    /// Appends to different records of one collection may interleave; the
    /// record's range is moved to the end of the shared vector when needed.
    /// Records of a collection read from buffers can be extended only after
    /// its references are resolved (`Error::PendingReferences` before).
    pub fn add_relation<T: Datatype>(&self, field: usize, target: &T) -> Result<()> {
        let mut obj = self.shared()?.write();
        let field_count = obj.relations.len();
        let slot = obj
            .relations
            .get_mut(field)
            .ok_or_else(|| undeclared_field(field, field_count))?;
        slot.push(target.handle().clone())
    }

    /// Range of relation field `field`
    pub fn relation_range(&self, field: usize) -> Result<RelationRange> {
        let obj = self.shared()?.read();
        Ok(slot(&obj.relations, field)?.range)
    }

    /// Ranges of all relation fields, in declaration order
    pub fn relation_ranges(&self) -> Result<SmallVec<[RelationRange; 2]>> {
        Ok(self.shared()?.read().relation_ranges())
    }
}

fn slot(relations: &[RelationSlot], field: usize) -> Result<&RelationSlot> {
    relations
        .get(field)
        .ok_or_else(|| undeclared_field(field, relations.len()))
}

fn undeclared_field(field: usize, declared: usize) -> Error {
    Error::RelationRange {
        field: "<undeclared>",
        begin: u32::try_from(field).unwrap_or(u32::MAX),
        end: u32::try_from(field).unwrap_or(u32::MAX),
        len: declared,
    }
}

impl<D: Datatype> Clone for Handle<D> {
    fn clone(&self) -> Self {
        Self {
            obj: self.obj.clone(),
        }
    }
}

impl<D: Datatype> Default for Handle<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: Datatype> PartialEq for Handle<D> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl<D: Datatype> Eq for Handle<D> {}

impl<D: Datatype> fmt::Debug for Handle<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.obj {
            Some(obj) => {
                let obj = obj.read();
                f.debug_struct(D::TYPE_NAME)
                    .field("id", &obj.id)
                    .field("data", &obj.data)
                    .finish()
            }
            None => write!(f, "{}(unavailable)", D::TYPE_NAME),
        }
    }
}
