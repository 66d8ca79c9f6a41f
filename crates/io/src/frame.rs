//! Frame: one event's worth of named collections
//!
//! A frame owns its collections and hands out collection IDs from a
//! [`CollectionIdTable`], so every record in the frame has a unique
//! `ObjectId`. It is also the [`CollectionProvider`] that relation targets
//! are resolved against after a read.

use crate::backend::{RawCollection, RawFrame};
use hepstore_core::{CollectionId, Error, Result};
use hepstore_model::{Collection, CollectionBase, CollectionProvider, Datatype};
use rustc_hash::FxHashMap;
use std::fmt;

/// Bidirectional mapping collection name <-> collection ID
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionIdTable {
    /// Insertion order
    entries: Vec<(CollectionId, String)>,
    by_name: FxHashMap<String, CollectionId>,
}

impl CollectionIdTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign the next free ID to `name`
    ///
    /// IDs start at 1; 0 is `CollectionId::UNASSIGNED`.
    pub fn add(&mut self, name: &str) -> Result<CollectionId> {
        let next = self
            .entries
            .iter()
            .map(|(id, _)| id.as_u32())
            .max()
            .unwrap_or(0)
            + 1;
        let id = CollectionId::new(next);
        self.insert(name, id)?;
        Ok(id)
    }

    /// Record `name` under a known ID (e.g. one read from a backend)
    ///
    /// # Errors
    ///
    /// `Error::DuplicateCollection` if the name or the ID is already taken,
    /// or the ID is unassigned.
    pub fn insert(&mut self, name: &str, id: CollectionId) -> Result<()> {
        if !id.is_assigned() || self.by_name.contains_key(name) || self.name(id).is_some() {
            return Err(Error::DuplicateCollection(name.to_string()));
        }
        self.entries.push((id, name.to_string()));
        self.by_name.insert(name.to_string(), id);
        Ok(())
    }

    /// ID of `name`
    pub fn id(&self, name: &str) -> Option<CollectionId> {
        self.by_name.get(name).copied()
    }

    /// Name of `id`
    pub fn name(&self, id: CollectionId) -> Option<&str> {
        self.entries
            .iter()
            .find(|(entry_id, _)| *entry_id == id)
            .map(|(_, name)| name.as_str())
    }

    /// Entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (CollectionId, &str)> {
        self.entries.iter().map(|(id, name)| (*id, name.as_str()))
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Named collections of one event
#[derive(Default)]
pub struct Frame {
    id_table: CollectionIdTable,
    collections: FxHashMap<CollectionId, Box<dyn CollectionBase>>,
}

impl Frame {
    /// Create an empty frame
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `collection` under `name`, assigning it a collection ID
    ///
    /// Returns the stored collection. Records created before the call are
    /// re-stamped with the new ID.
    ///
    /// # Errors
    ///
    /// `Error::DuplicateCollection` if `name` is taken.
    pub fn put<D: Datatype>(&mut self, name: &str, collection: Collection<D>) -> Result<&Collection<D>> {
        let id = self.id_table.add(name)?;
        self.insert_boxed(id, Box::new(collection));
        self.get::<D>(name)
    }

    /// Store a type-erased collection under a known name and ID
    pub fn insert(&mut self, name: &str, id: CollectionId, collection: Box<dyn CollectionBase>) -> Result<()> {
        self.id_table.insert(name, id)?;
        self.insert_boxed(id, collection);
        Ok(())
    }

    fn insert_boxed(&mut self, id: CollectionId, mut collection: Box<dyn CollectionBase>) {
        collection.set_id(id);
        self.collections.insert(id, collection);
    }

    /// Collection `name` as `Collection<D>`
    ///
    /// # Errors
    ///
    /// - `Error::CollectionNotFound` if no collection has that name
    /// - `Error::BufferType` if it stores another datatype
    pub fn get<D: Datatype>(&self, name: &str) -> Result<&Collection<D>> {
        let base = self
            .get_base(name)
            .ok_or_else(|| Error::CollectionNotFound(name.to_string()))?;
        base.as_any()
            .downcast_ref::<Collection<D>>()
            .ok_or_else(|| Error::BufferType {
                type_name: base.type_name().to_string(),
                expected: D::TYPE_NAME,
            })
    }

    /// Collection `name` without knowing its datatype
    pub fn get_base(&self, name: &str) -> Option<&dyn CollectionBase> {
        let id = self.id_table.id(name)?;
        self.collections.get(&id).map(|c| &**c)
    }

    /// Collection names in insertion order
    pub fn names(&self) -> Vec<&str> {
        self.id_table.iter().map(|(_, name)| name).collect()
    }

    /// The frame's collection ID table
    pub fn id_table(&self) -> &CollectionIdTable {
        &self.id_table
    }

    /// Number of collections
    pub fn len(&self) -> usize {
        self.collections.len()
    }

    /// Whether the frame holds no collections
    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }

    /// Resolve pending relation targets of every collection
    pub fn resolve_references(&self, strict: bool) -> Result<()> {
        for (id, _) in self.id_table.iter() {
            if let Some(collection) = self.collections.get(&id) {
                collection.resolve_references(self, strict)?;
            }
        }
        Ok(())
    }

    /// Flatten every collection into buffers, in insertion order
    pub fn to_raw(&self) -> Result<RawFrame> {
        let mut collections = Vec::with_capacity(self.collections.len());
        for (id, name) in self.id_table.iter() {
            if let Some(c) = self.collections.get(&id) {
                collections.push(RawCollection {
                    name: name.to_string(),
                    id,
                    buffers: c.to_buffers()?,
                });
            }
        }
        Ok(RawFrame { collections })
    }
}

impl CollectionProvider for Frame {
    fn collection(&self, id: CollectionId) -> Option<&dyn CollectionBase> {
        self.collections.get(&id).map(|c| &**c)
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_list();
        for (id, name) in self.id_table.iter() {
            if let Some(c) = self.collections.get(&id) {
                list.entry(&format_args!("{} ({}, {}, {} records)", name, id, c.type_name(), c.len()));
            }
        }
        list.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hepstore_datamodel::{ExampleCluster, ExampleClusterCollection, ExampleHit, ExampleHitCollection};

    #[test]
    fn test_id_table_assigns_sequential_ids() {
        let mut table = CollectionIdTable::new();
        assert_eq!(table.add("hits").unwrap(), CollectionId::new(1));
        assert_eq!(table.add("clusters").unwrap(), CollectionId::new(2));
        assert_eq!(table.id("clusters"), Some(CollectionId::new(2)));
        assert_eq!(table.name(CollectionId::new(1)), Some("hits"));
        assert!(matches!(table.add("hits"), Err(Error::DuplicateCollection(_))));
        assert!(table.insert("other", CollectionId::UNASSIGNED).is_err());
        assert!(table.insert("other", CollectionId::new(2)).is_err());
    }

    #[test]
    fn test_put_restamps_and_get_downcasts() {
        let mut hits = ExampleHitCollection::new();
        let hit = hits.create().unwrap();

        let mut frame = Frame::new();
        frame.put("hits", hits).unwrap();
        assert_eq!(hit.object_id().unwrap().collection_id, CollectionId::new(1));

        let stored = frame.get::<ExampleHit>("hits").unwrap();
        assert_eq!(stored.get(0).unwrap(), hit);
        assert!(matches!(frame.get::<ExampleCluster>("hits"), Err(Error::BufferType { .. })));
        assert!(matches!(frame.get::<ExampleHit>("nope"), Err(Error::CollectionNotFound(_))));
    }

    #[test]
    fn test_frame_is_provider_and_flattens_in_order() {
        let mut frame = Frame::new();
        frame.put("hits", ExampleHitCollection::new()).unwrap();
        frame.put("clusters", ExampleClusterCollection::new()).unwrap();
        assert_eq!(frame.names(), vec!["hits", "clusters"]);

        let provider: &dyn CollectionProvider = &frame;
        assert_eq!(provider.collection(CollectionId::new(2)).unwrap().type_name(), "ExampleCluster");
        assert!(provider.collection(CollectionId::new(9)).is_none());

        let raw = frame.to_raw().unwrap();
        let names: Vec<&str> = raw.collections.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["hits", "clusters"]);
        assert_eq!(raw.collections[0].buffers.type_name(), "ExampleHit");
        assert_eq!(raw.collections[0].buffers.schema_version(), 2);
    }
}
