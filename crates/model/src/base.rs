//! Type-erased collection interface
//!
//! Frames, readers and the collection factory handle collections of many
//! datatypes side by side. They do so through [`CollectionBase`]; code that
//! knows the datatype downcasts back to [`Collection<D>`](crate::Collection).

use hepstore_core::{CollectionBuffers, CollectionId, Result, SchemaVersion};
use std::any::Any;

/// Operations common to collections of every datatype
pub trait CollectionBase: Send + Sync {
    /// Type name of the stored records
    fn type_name(&self) -> &'static str;

    /// Schema version the collection writes
    fn schema_version(&self) -> SchemaVersion;

    /// Collection ID
    fn id(&self) -> CollectionId;

    /// Assign the collection ID
    fn set_id(&mut self, id: CollectionId);

    /// Number of records
    fn len(&self) -> usize;

    /// Whether the collection holds no records
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flatten into buffers at the current schema version
    fn to_buffers(&self) -> Result<CollectionBuffers>;

    /// Resolve relation targets read from buffers
    fn resolve_references(&self, provider: &dyn CollectionProvider, strict: bool) -> Result<()>;

    /// Downcast support
    fn as_any(&self) -> &dyn Any;

    /// Mutable downcast support
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Lookup of collections by ID during relation resolution
pub trait CollectionProvider {
    /// Collection with ID `id`, if present
    fn collection(&self, id: CollectionId) -> Option<&dyn CollectionBase>;
}
