//! Relation vectors, ranges and lazy resolution
//!
//! Every relation field of a datatype is backed by exactly one shared vector
//! per collection (a [`RelationVector`]). A record stores only its
//! [`RelationRange`] into that vector plus a reference to the vector itself.
//!
//! ## Ownership
//!
//! - A collection owns its relation vectors (`Arc`).
//! - Records stored in a collection hold a `Weak` back-reference, so a
//!   vector containing handles to records of the same collection does not
//!   keep itself alive.
//! - Records living outside any collection own a private vector until they
//!   are pushed into a collection, which moves their entries over.
//!
//! ## Resolution
//!
//! Ranges are resolved at access time: reading a relation upgrades the
//! reference, checks `[begin, end)` against the current length and yields
//! handles one by one. No pointer or iterator into the vector is ever cached,
//! so growth of the vector cannot invalidate a record.

use crate::base::CollectionProvider;
use crate::collection::Collection;
use crate::datatype::Datatype;
use crate::handle::Handle;
use hepstore_core::{Error, ObjectId, RelationRange, Result};
use parking_lot::RwLock;
use std::any::{type_name, Any};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tracing::warn;

/// Type-erased view of one relation vector
///
/// Collections and records manipulate relation vectors through this trait
/// so they do not need to know the target datatype of each field.
pub trait RelationColumn: Send + Sync + 'static {
    /// Relation field name
    fn field(&self) -> &'static str;

    /// Type name of the related records
    fn target_type(&self) -> &'static str;

    /// Number of entries (sum over all records)
    fn len(&self) -> usize;

    /// Whether the vector has no entries
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Identity of every entry, in vector order
    ///
    /// Unavailable entries are reported as `ObjectId::invalid()`.
    fn object_ids(&self) -> Vec<ObjectId>;

    /// Append `range` of `source` (same target type) to this vector
    ///
    /// Returns the range the copied entries occupy here.
    fn append_from(&self, source: &dyn RelationColumn, range: RelationRange) -> Result<RelationRange>;

    /// Refuse appends until the next `resolve`
    fn mark_pending(&self);

    /// Replace the contents with the records identified by `targets`
    ///
    /// With `strict`, a target missing from `provider` is an error;
    /// otherwise it becomes an unavailable handle.
    fn resolve(
        &self,
        targets: &[ObjectId],
        provider: &dyn CollectionProvider,
        strict: bool,
    ) -> Result<()>;

    /// Downcast support
    fn as_any(&self) -> &dyn Any;

    /// Downcast support for shared columns
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

/// Shared relation vector holding handles to records of `T`
pub struct RelationVector<T: Datatype> {
    field: &'static str,
    items: RwLock<Vec<Handle<T>>>,
    /// Set while the entries still live as `ObjectId`s in the collection
    pending: AtomicBool,
}

impl<T: Datatype> RelationVector<T> {
    /// Create an empty vector for `field`
    pub fn new(field: &'static str) -> Self {
        Self {
            field,
            items: RwLock::new(Vec::new()),
            pending: AtomicBool::new(false),
        }
    }

    /// Create an empty vector behind a type-erased shared reference
    pub fn shared(field: &'static str) -> Arc<dyn RelationColumn> {
        Arc::new(Self::new(field))
    }

    /// Entry at `index`
    pub fn get(&self, index: usize) -> Option<Handle<T>> {
        self.items.read().get(index).cloned()
    }

    /// Append `target` to the record owning `range`
    ///
    /// An empty range is repositioned to the end of the vector. A non-empty
    /// range that no longer ends at the end of the vector (another record
    /// was extended in between) is first moved to the tail by copying its
    /// entries; the old entries stay behind unreferenced until the
    /// collection is flattened.
    ///
    /// Fails with `Error::PendingReferences` while the vector waits for
    /// `resolve`, which would otherwise overwrite the appended entry.
    pub(crate) fn push_for(&self, range: &mut RelationRange, target: Handle<T>) -> Result<()> {
        let mut items = self.items.write();
        self.check_not_pending()?;
        let len = items.len();
        if range.is_empty() {
            *range = RelationRange::empty_at(index_u32(len, self.field)?);
        } else if range.end as usize != len {
            let moved = items[checked_span(*range, len, self.field)?].to_vec();
            items.extend(moved);
            *range = RelationRange::new(index_u32(len, self.field)?, index_u32(items.len(), self.field)?);
        }
        let end = index_u32(items.len() + 1, self.field)?;
        items.push(target);
        range.end = end;
        Ok(())
    }

    fn check_not_pending(&self) -> Result<()> {
        if self.pending.load(Ordering::Acquire) {
            return Err(Error::PendingReferences { field: self.field });
        }
        Ok(())
    }
}

impl<T: Datatype> RelationColumn for RelationVector<T> {
    fn field(&self) -> &'static str {
        self.field
    }

    fn target_type(&self) -> &'static str {
        T::TYPE_NAME
    }

    fn len(&self) -> usize {
        self.items.read().len()
    }

    fn object_ids(&self) -> Vec<ObjectId> {
        self.items
            .read()
            .iter()
            .map(|h| h.object_id().unwrap_or_else(|_| ObjectId::invalid()))
            .collect()
    }

    fn append_from(&self, source: &dyn RelationColumn, range: RelationRange) -> Result<RelationRange> {
        let source = source
            .as_any()
            .downcast_ref::<RelationVector<T>>()
            .ok_or_else(|| column_type_error::<T>())?;

        // Copy out first: source and destination may be the same vector.
        let copied: Vec<Handle<T>> = {
            let items = source.items.read();
            let span = checked_span(range, items.len(), self.field)?;
            items[span].to_vec()
        };

        let mut items = self.items.write();
        self.check_not_pending()?;
        let begin = index_u32(items.len(), self.field)?;
        let end = index_u32(items.len() + copied.len(), self.field)?;
        items.extend(copied);
        Ok(RelationRange::new(begin, end))
    }

    fn resolve(
        &self,
        targets: &[ObjectId],
        provider: &dyn CollectionProvider,
        strict: bool,
    ) -> Result<()> {
        let mut resolved = Vec::with_capacity(targets.len());
        for &target in targets {
            if !target.is_valid() {
                resolved.push(Handle::unavailable());
                continue;
            }
            match lookup::<T>(provider, target) {
                Some(handle) => resolved.push(handle),
                None if strict => {
                    return Err(Error::UnresolvedReference {
                        field: self.field,
                        target,
                    })
                }
                None => {
                    warn!(
                        target: "hepstore::model",
                        field = self.field,
                        object = %target,
                        "Unresolved relation target replaced by unavailable handle"
                    );
                    resolved.push(Handle::unavailable());
                }
            }
        }
        let mut items = self.items.write();
        *items = resolved;
        self.pending.store(false, Ordering::Release);
        Ok(())
    }

    fn mark_pending(&self) {
        self.pending.store(true, Ordering::Release);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

impl<T: Datatype> fmt::Debug for RelationVector<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelationVector")
            .field("field", &self.field)
            .field("target", &T::TYPE_NAME)
            .field("len", &self.len())
            .finish()
    }
}

fn lookup<T: Datatype>(provider: &dyn CollectionProvider, target: ObjectId) -> Option<Handle<T>> {
    let collection = provider.collection(target.collection_id)?;
    let typed = collection.as_any().downcast_ref::<Collection<T>>()?;
    typed.handle_at(target.position()?)
}

fn column_type_error<T: Datatype>() -> Error {
    Error::BufferType {
        type_name: T::TYPE_NAME.to_string(),
        expected: type_name::<RelationVector<T>>(),
    }
}

pub(crate) fn index_u32(value: usize, field: &'static str) -> Result<u32> {
    u32::try_from(value).map_err(|_| Error::RelationRange {
        field,
        begin: u32::MAX,
        end: u32::MAX,
        len: value,
    })
}

pub(crate) fn checked_span(range: RelationRange, len: usize, field: &'static str) -> Result<std::ops::Range<usize>> {
    range.checked(len).ok_or(Error::RelationRange {
        field,
        begin: range.begin,
        end: range.end,
        len,
    })
}

// ============================================================================
// Per-record relation slot
// ============================================================================

/// Reference from a record to the vector backing one of its relations
#[derive(Clone)]
pub(crate) enum ColumnRef {
    /// Private vector of a record outside any collection
    Owned(Arc<dyn RelationColumn>),
    /// Vector owned by the record's collection
    Collection(Weak<dyn RelationColumn>),
}

impl ColumnRef {
    fn get(&self, field: &'static str) -> Result<Arc<dyn RelationColumn>> {
        match self {
            ColumnRef::Owned(column) => Ok(Arc::clone(column)),
            ColumnRef::Collection(weak) => weak.upgrade().ok_or(Error::CollectionDropped { field }),
        }
    }
}

/// One relation field of one record: its range plus the backing vector
#[derive(Clone)]
pub(crate) struct RelationSlot {
    pub(crate) field: &'static str,
    pub(crate) range: RelationRange,
    column: ColumnRef,
}

impl RelationSlot {
    /// Slot backed by a fresh private vector
    pub(crate) fn detached(column: Arc<dyn RelationColumn>) -> Self {
        Self {
            field: column.field(),
            range: RelationRange::default(),
            column: ColumnRef::Owned(column),
        }
    }

    /// Slot backed by a collection's vector
    pub(crate) fn in_collection(column: &Arc<dyn RelationColumn>, range: RelationRange) -> Self {
        Self {
            field: column.field(),
            range,
            column: ColumnRef::Collection(Arc::downgrade(column)),
        }
    }

    fn typed<T: Datatype>(&self) -> Result<Arc<RelationVector<T>>> {
        self.column
            .get(self.field)?
            .into_any()
            .downcast::<RelationVector<T>>()
            .map_err(|_| column_type_error::<T>())
    }

    /// Append a related record
    pub(crate) fn push<T: Datatype>(&mut self, target: Handle<T>) -> Result<()> {
        let column = self.typed::<T>()?;
        column.push_for(&mut self.range, target)
    }

    /// Lazily resolving iterator over the range
    pub(crate) fn iter<T: Datatype>(&self) -> Result<RelationIter<T>> {
        RelationIter::new(self.typed::<T>()?, self.range)
    }

    /// Copy this slot's entries into `dest` and return the slot bound to it
    ///
    /// The slot itself is left untouched, so a record can be rebound to all
    /// of its new slots at once.
    pub(crate) fn adopted_by(&self, dest: &Arc<dyn RelationColumn>) -> Result<Self> {
        let range = if self.range.is_empty() {
            RelationRange::empty_at(index_u32(dest.len(), self.field)?)
        } else {
            let source = self.column.get(self.field)?;
            dest.append_from(&*source, self.range)?
        };
        Ok(Self::in_collection(dest, range))
    }
}

impl fmt::Debug for RelationSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let owned = matches!(self.column, ColumnRef::Owned(_));
        f.debug_struct("RelationSlot")
            .field("field", &self.field)
            .field("range", &self.range)
            .field("owned", &owned)
            .finish()
    }
}

// ============================================================================
// RelationIter
// ============================================================================

/// Forward-only iterator over one record's related records
///
/// The iterator holds the backing vector alive and fetches each entry on
/// demand; it does not copy the range up front.
pub struct RelationIter<T: Datatype> {
    column: Arc<RelationVector<T>>,
    next: usize,
    end: usize,
}

impl<T: Datatype> RelationIter<T> {
    fn new(column: Arc<RelationVector<T>>, range: RelationRange) -> Result<Self> {
        let span = checked_span(range, column.len(), column.field)?;
        Ok(Self {
            column,
            next: span.start,
            end: span.end,
        })
    }
}

impl<T: Datatype> Iterator for RelationIter<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        if self.next >= self.end {
            return None;
        }
        let handle = self.column.get(self.next).unwrap_or_else(Handle::unavailable);
        self.next += 1;
        Some(T::from_handle(handle))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.end.saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}

impl<T: Datatype> ExactSizeIterator for RelationIter<T> {}

impl<T: Datatype> fmt::Debug for RelationIter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelationIter")
            .field("field", &self.column.field)
            .field("next", &self.next)
            .field("end", &self.end)
            .finish()
    }
}
