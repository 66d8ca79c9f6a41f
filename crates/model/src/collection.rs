//! Append-only collection of records of one datatype
//!
//! A `Collection<D>` owns:
//! - the payloads of its records, in append order
//! - one shared relation vector per relation field of `D`
//!
//! ## Write path
//!
//! `to_buffers()` flattens the payloads into `Record<D::Data>` elements and
//! every relation vector into an array of `ObjectId`s, tagged with
//! `D::SCHEMA_VERSION`. Relation arrays are compacted on the way out: entries
//! left behind by relocated ranges are dropped and ranges are renumbered.
//!
//! ## Read path
//!
//! `from_buffers()` rebuilds payloads and relation ranges from buffers that
//! already match the current schema version. Relation targets stay pending
//! as `ObjectId`s until `resolve_references()` looks them up in a
//! [`CollectionProvider`] (usually the frame holding all collections).

use crate::base::{CollectionBase, CollectionProvider};
use crate::datatype::Datatype;
use crate::handle::Handle;
use crate::obj::{Obj, SharedObj};
use crate::relation::{checked_span, index_u32, RelationColumn, RelationSlot};
use hepstore_core::{
    CollectionBuffers, CollectionId, Error, ObjectId, Record, RelationArray, RelationRange,
    Result, SchemaVersion,
};
use parking_lot::Mutex;
use smallvec::SmallVec;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

type Columns = SmallVec<[Arc<dyn RelationColumn>; 2]>;

/// Columnar store of records of datatype `D`
pub struct Collection<D: Datatype> {
    id: CollectionId,
    objects: Vec<SharedObj<D>>,
    columns: Columns,
    /// Relation targets read from buffers, waiting for `resolve_references`
    pending: Mutex<Option<SmallVec<[RelationArray; 2]>>>,
}

impl<D: Datatype> Collection<D> {
    /// Create an empty collection
    pub fn new() -> Self {
        Self {
            id: CollectionId::UNASSIGNED,
            objects: Vec::new(),
            columns: new_columns::<D>(),
            pending: Mutex::new(None),
        }
    }

    /// Collection ID (unassigned until put into a frame)
    pub fn id(&self) -> CollectionId {
        self.id
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether the collection holds no records
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Append a new record with default field values
    ///
    /// # Errors
    ///
    /// `Error::CollectionFull` once the `ObjectId` index space is exhausted.
    pub fn create(&mut self) -> Result<D> {
        self.create_with(D::Data::default())
    }

    /// Append a new record with the given field values
    pub fn create_with(&mut self, data: D::Data) -> Result<D> {
        let id = self.next_id()?;
        let relations = self
            .columns
            .iter()
            .map(|column| RelationSlot::in_collection(column, Default::default()))
            .collect();
        let obj = Obj {
            id,
            data,
            relations,
        }
        .into_shared();
        self.objects.push(Arc::clone(&obj));
        Ok(D::from_handle(Handle::from_shared(obj)))
    }

    /// Append an existing record that is not yet stored in a collection
    ///
    /// The record's relations are moved into this collection's relation
    /// vectors and its identity becomes `{self.id(), len}`.
    ///
    /// # Errors
    ///
    /// - `Error::UnavailableHandle` for an empty handle
    /// - `Error::AlreadyTracked` if the record belongs to a collection
    /// - `Error::PendingReferences` if the record has relations and this
    ///   collection's references are not resolved yet
    ///
    /// On error the record is left as it was.
    pub fn push(&mut self, record: &D) -> Result<()> {
        let shared = record.handle().shared()?;
        {
            let mut obj = shared.write();
            if obj.id.is_tracked() {
                return Err(Error::AlreadyTracked(obj.id));
            }
            let id = self.next_id()?;
            let slots = obj
                .relations
                .iter()
                .zip(self.columns.iter())
                .map(|(slot, column)| slot.adopted_by(column))
                .collect::<Result<SmallVec<[RelationSlot; 2]>>>()?;
            obj.relations = slots;
            obj.id = id;
        }
        self.objects.push(Arc::clone(shared));
        Ok(())
    }

    /// Record at `index`
    pub fn get(&self, index: usize) -> Option<D> {
        self.handle_at(index).map(D::from_handle)
    }

    /// Handle of the record at `index`
    pub fn handle_at(&self, index: usize) -> Option<Handle<D>> {
        self.objects
            .get(index)
            .map(|obj| Handle::from_shared(Arc::clone(obj)))
    }

    /// Iterate over all records in append order
    pub fn iter(&self) -> impl Iterator<Item = D> + '_ {
        self.objects
            .iter()
            .map(|obj| D::from_handle(Handle::from_shared(Arc::clone(obj))))
    }

    /// Assign the collection ID, re-stamping every record's identity
    pub fn set_id(&mut self, id: CollectionId) {
        self.id = id;
        for obj in &self.objects {
            obj.write().id.collection_id = id;
        }
    }

    /// Start a new generation: drop all records and relation vectors
    ///
    /// Handles still referencing old records keep their payloads but lose
    /// their identity (`ObjectId::untracked()`). Their relations pointed
    /// into the dropped vectors and now fail with `Error::CollectionDropped`.
    pub fn clear(&mut self) {
        for obj in self.objects.drain(..) {
            obj.write().id = ObjectId::untracked();
        }
        self.columns = new_columns::<D>();
        *self.pending.lock() = None;
    }

    /// Flatten the collection into buffers at the current schema version
    ///
    /// A collection whose references are still pending writes the relation
    /// arrays it was read from, with the stored ranges.
    ///
    /// # Errors
    ///
    /// `Error::RelationRange` if a record's range does not fit its vector.
    pub fn to_buffers(&self) -> Result<CollectionBuffers> {
        let pending = self.pending.lock();
        if let Some(arrays) = pending.as_ref() {
            return Ok(self.pending_buffers(arrays));
        }

        let targets: SmallVec<[Vec<ObjectId>; 2]> =
            self.columns.iter().map(|column| column.object_ids()).collect();
        let mut compacted: SmallVec<[Vec<ObjectId>; 2]> =
            targets.iter().map(|ids| Vec::with_capacity(ids.len())).collect();

        let mut records: Vec<Record<D::Data>> = Vec::with_capacity(self.objects.len());
        for obj in &self.objects {
            let obj = obj.read();
            let mut ranges = SmallVec::<[RelationRange; 2]>::with_capacity(obj.relations.len());
            for ((slot, ids), out) in obj.relations.iter().zip(targets.iter()).zip(compacted.iter_mut()) {
                let span = checked_span(slot.range, ids.len(), slot.field)?;
                let begin = index_u32(out.len(), slot.field)?;
                out.extend_from_slice(&ids[span]);
                ranges.push(RelationRange::new(begin, index_u32(out.len(), slot.field)?));
            }
            records.push(Record::with_relations(obj.data.clone(), ranges));
        }

        Ok(compacted.into_iter().fold(
            CollectionBuffers::new(D::TYPE_NAME, D::SCHEMA_VERSION, records),
            CollectionBuffers::with_relation,
        ))
    }

    fn pending_buffers(&self, arrays: &[RelationArray]) -> CollectionBuffers {
        let records: Vec<Record<D::Data>> = self
            .objects
            .iter()
            .map(|obj| {
                let obj = obj.read();
                Record::with_relations(obj.data.clone(), obj.relations.iter().map(|slot| slot.range))
            })
            .collect();
        arrays.iter().cloned().fold(
            CollectionBuffers::new(D::TYPE_NAME, D::SCHEMA_VERSION, records),
            CollectionBuffers::with_shared_relation,
        )
    }

    /// Rebuild a collection from buffers at the current schema version
    ///
    /// Relation ranges are restored immediately and checked against the
    /// relation arrays; the related records themselves become available
    /// after `resolve_references`.
    ///
    /// # Errors
    ///
    /// - `Error::UnknownDatatype` if the buffers belong to another type
    /// - `Error::VersionConflict` if the buffers were not evolved to
    ///   `D::SCHEMA_VERSION`
    /// - `Error::BufferType` if the data array has the wrong layout
    /// - `Error::RelationRange` if a record's range exceeds its array
    pub fn from_buffers(buffers: CollectionBuffers) -> Result<Self> {
        if buffers.type_name() != D::TYPE_NAME {
            return Err(Error::UnknownDatatype(buffers.type_name().to_string()));
        }
        if buffers.schema_version() != D::SCHEMA_VERSION {
            return Err(Error::VersionConflict {
                type_name: D::TYPE_NAME.to_string(),
                registered: D::SCHEMA_VERSION,
                requested: buffers.schema_version(),
            });
        }

        let mut collection = Self::new();
        let field_count = collection.columns.len();
        if buffers.relations().len() != field_count {
            return Err(Error::BufferType {
                type_name: D::TYPE_NAME.to_string(),
                expected: "one relation array per relation field",
            });
        }

        let relations: SmallVec<[RelationArray; 2]> = buffers.relations().iter().cloned().collect();
        let records = buffers.into_data::<Record<D::Data>>()?;
        let mut objects = Vec::with_capacity(records.len());

        for (index, record) in records.into_iter().enumerate() {
            if record.relations.len() != field_count {
                return Err(Error::BufferType {
                    type_name: D::TYPE_NAME.to_string(),
                    expected: "one relation range per relation field",
                });
            }
            let mut slots = SmallVec::with_capacity(field_count);
            for ((range, column), targets) in record
                .relations
                .iter()
                .zip(collection.columns.iter())
                .zip(relations.iter())
            {
                if range.checked(targets.len()).is_none() {
                    return Err(Error::RelationRange {
                        field: column.field(),
                        begin: range.begin,
                        end: range.end,
                        len: targets.len(),
                    });
                }
                slots.push(RelationSlot::in_collection(column, *range));
            }
            let index = i32::try_from(index).map_err(|_| Error::BufferType {
                type_name: D::TYPE_NAME.to_string(),
                expected: "at most i32::MAX records",
            })?;
            objects.push(
                Obj {
                    id: ObjectId::new(CollectionId::UNASSIGNED, index),
                    data: record.fields,
                    relations: slots,
                }
                .into_shared(),
            );
        }

        collection.objects = objects;
        if field_count > 0 {
            for column in &collection.columns {
                column.mark_pending();
            }
            *collection.pending.lock() = Some(relations);
        }
        Ok(collection)
    }

    /// Turn pending relation targets into handles
    ///
    /// Does nothing for collections that were not read from buffers or have
    /// been resolved already. On error the targets stay pending.
    pub fn resolve_references(&self, provider: &dyn CollectionProvider, strict: bool) -> Result<()> {
        let mut pending = self.pending.lock();
        if let Some(arrays) = pending.as_ref() {
            for (column, targets) in self.columns.iter().zip(arrays.iter()) {
                column.resolve(targets, provider, strict)?;
            }
        }
        *pending = None;
        Ok(())
    }

    /// Whether relation targets are still waiting to be resolved
    pub fn has_pending_references(&self) -> bool {
        self.pending.lock().is_some()
    }

    /// Length of the shared vector backing relation field `field`
    pub fn relation_len(&self, field: usize) -> Option<usize> {
        self.columns.get(field).map(|column| column.len())
    }

    fn next_id(&self) -> Result<ObjectId> {
        let index = i32::try_from(self.objects.len()).map_err(|_| Error::CollectionFull {
            type_name: D::TYPE_NAME,
            len: self.objects.len(),
        })?;
        Ok(ObjectId::new(self.id, index))
    }
}

fn new_columns<D: Datatype>() -> Columns {
    D::relation_fields().iter().map(|f| f.new_column()).collect()
}

impl<D: Datatype> Default for Collection<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: Datatype> CollectionBase for Collection<D> {
    fn type_name(&self) -> &'static str {
        D::TYPE_NAME
    }

    fn schema_version(&self) -> SchemaVersion {
        D::SCHEMA_VERSION
    }

    fn id(&self) -> CollectionId {
        self.id
    }

    fn set_id(&mut self, id: CollectionId) {
        Collection::set_id(self, id)
    }

    fn len(&self) -> usize {
        self.objects.len()
    }

    fn to_buffers(&self) -> Result<CollectionBuffers> {
        Collection::to_buffers(self)
    }

    fn resolve_references(&self, provider: &dyn CollectionProvider, strict: bool) -> Result<()> {
        Collection::resolve_references(self, provider, strict)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl<D: Datatype> fmt::Debug for Collection<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("type", &D::TYPE_NAME)
            .field("id", &self.id)
            .field("len", &self.objects.len())
            .field("relation_fields", &self.columns.len())
            .field("pending", &self.has_pending_references())
            .finish()
    }
}
