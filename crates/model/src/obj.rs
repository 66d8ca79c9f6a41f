//! Shared payload of one record
//!
//! An [`Obj`] holds everything a record consists of: its identity, the POD
//! field block and one relation slot per relation field. It is shared by
//! every [`Handle`](crate::Handle) referencing the record and destroyed when
//! the last of them (or its collection) lets go.

use crate::datatype::Datatype;
use crate::relation::RelationSlot;
use hepstore_core::{ObjectId, RelationRange};
use parking_lot::RwLock;
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;

/// Reference-counted, lockable payload as held by handles and collections
pub(crate) type SharedObj<D> = Arc<RwLock<Obj<D>>>;

/// Field storage of one record
pub struct Obj<D: Datatype> {
    pub(crate) id: ObjectId,
    pub(crate) data: D::Data,
    pub(crate) relations: SmallVec<[RelationSlot; 2]>,
}

impl<D: Datatype> Obj<D> {
    /// Payload of a record outside any collection
    ///
    /// Every relation field gets its own private vector.
    pub(crate) fn detached(data: D::Data) -> Self {
        let relations = D::relation_fields()
            .iter()
            .map(|field| RelationSlot::detached(field.new_column()))
            .collect();
        Self {
            id: ObjectId::untracked(),
            data,
            relations,
        }
    }

    /// Copy of this payload with a fresh identity
    ///
    /// Field values and relation ranges are copied; the copy refers to the
    /// same relation vectors as the original.
    pub(crate) fn duplicate(&self) -> Self {
        Self {
            id: ObjectId::untracked(),
            data: self.data.clone(),
            relations: self.relations.clone(),
        }
    }

    /// Record identity
    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// POD field block
    pub fn data(&self) -> &D::Data {
        &self.data
    }

    /// Current relation ranges, in field declaration order
    pub fn relation_ranges(&self) -> SmallVec<[RelationRange; 2]> {
        self.relations.iter().map(|slot| slot.range).collect()
    }

    pub(crate) fn into_shared(self) -> SharedObj<D> {
        Arc::new(RwLock::new(self))
    }
}

impl<D: Datatype> fmt::Debug for Obj<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Obj")
            .field("type", &D::TYPE_NAME)
            .field("id", &self.id)
            .field("data", &self.data)
            .field("relations", &self.relations)
            .finish()
    }
}
