//! Collection factory: type name -> collection constructor
//!
//! Readers only know the type name of the buffers they load. The factory maps
//! that name to functions creating an empty `Collection<D>` or rebuilding one
//! from buffers, without the reader naming `D`.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let mut factory = CollectionFactory::new();
//! factory.register::<ExampleHit>();
//!
//! let collection = factory.rebuild(buffers)?;  // Box<dyn CollectionBase>
//! ```
//!
//! A process-wide instance backs [`register_collection_type`] and
//! [`rebuild_collection`]; datamodel crates register their types into it once.

use crate::base::CollectionBase;
use crate::collection::Collection;
use crate::datatype::Datatype;
use hepstore_core::{CollectionBuffers, Error, Result, SchemaVersion};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::fmt;
use tracing::debug;

type CreateFn = fn() -> Box<dyn CollectionBase>;
type RebuildFn = fn(CollectionBuffers) -> Result<Box<dyn CollectionBase>>;

#[derive(Clone, Copy)]
struct FactoryEntry {
    schema_version: SchemaVersion,
    create: CreateFn,
    rebuild: RebuildFn,
}

fn create_typed<D: Datatype>() -> Box<dyn CollectionBase> {
    Box::new(Collection::<D>::new())
}

fn rebuild_typed<D: Datatype>(buffers: CollectionBuffers) -> Result<Box<dyn CollectionBase>> {
    Ok(Box::new(Collection::<D>::from_buffers(buffers)?))
}

/// Registry of collection constructors by type name
#[derive(Default)]
pub struct CollectionFactory {
    entries: FxHashMap<&'static str, FactoryEntry>,
}

impl CollectionFactory {
    /// Create an empty factory
    pub fn new() -> Self {
        Self::default()
    }

    /// Register datatype `D`
    ///
    /// Registering the same type again replaces the entry.
    pub fn register<D: Datatype>(&mut self) {
        let entry = FactoryEntry {
            schema_version: D::SCHEMA_VERSION,
            create: create_typed::<D>,
            rebuild: rebuild_typed::<D>,
        };
        if self.entries.insert(D::TYPE_NAME, entry).is_none() {
            debug!(
                target: "hepstore::model",
                type_name = D::TYPE_NAME,
                schema_version = D::SCHEMA_VERSION,
                "Registered collection type"
            );
        }
    }

    /// Whether `type_name` is registered
    pub fn is_registered(&self, type_name: &str) -> bool {
        self.entries.contains_key(type_name)
    }

    /// Current schema version of `type_name`
    pub fn schema_version(&self, type_name: &str) -> Option<SchemaVersion> {
        self.entries.get(type_name).map(|e| e.schema_version)
    }

    /// Empty collection of `type_name`
    pub fn create(&self, type_name: &str) -> Result<Box<dyn CollectionBase>> {
        let entry = self.entry(type_name)?;
        Ok((entry.create)())
    }

    /// Rebuild a collection from buffers already at the current version
    pub fn rebuild(&self, buffers: CollectionBuffers) -> Result<Box<dyn CollectionBase>> {
        let entry = self.entry(buffers.type_name())?;
        (entry.rebuild)(buffers)
    }

    /// Registered type names, sorted
    pub fn type_names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.entries.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Number of registered types
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no type is registered
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn entry(&self, type_name: &str) -> Result<FactoryEntry> {
        self.entries
            .get(type_name)
            .copied()
            .ok_or_else(|| Error::UnknownDatatype(type_name.to_string()))
    }
}

impl fmt::Debug for CollectionFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionFactory")
            .field("types", &self.type_names())
            .finish()
    }
}

// ============================================================================
// Process-wide factory
// ============================================================================

static FACTORY: Lazy<RwLock<CollectionFactory>> = Lazy::new(|| RwLock::new(CollectionFactory::new()));

/// Register datatype `D` with the process-wide factory
pub fn register_collection_type<D: Datatype>() {
    FACTORY.write().register::<D>();
}

/// Whether `type_name` is registered with the process-wide factory
pub fn is_collection_type_registered(type_name: &str) -> bool {
    FACTORY.read().is_registered(type_name)
}

/// Empty collection of `type_name` from the process-wide factory
pub fn create_collection(type_name: &str) -> Result<Box<dyn CollectionBase>> {
    FACTORY.read().create(type_name)
}

/// Rebuild a collection through the process-wide factory
///
/// # Errors
///
/// `Error::UnknownDatatype` if no datatype of that name is registered,
/// otherwise whatever `Collection::from_buffers` reports.
pub fn rebuild_collection(buffers: CollectionBuffers) -> Result<Box<dyn CollectionBase>> {
    // Copy the entry out so rebuilding runs without holding the lock.
    let entry = FACTORY.read().entry(buffers.type_name())?;
    (entry.rebuild)(buffers)
}
