//! hepstore - event data model with schema evolution
//!
//! Records of a datamodel are reference-counted handles to shared payloads,
//! stored in append-only collections. One-to-many relations are index ranges
//! into collection-owned vectors, resolved lazily. Buffers written under an
//! older layout of a datatype are evolved to the current layout at read time.
//!
//! # Quick Start
//!
//! ```ignore
//! use hepstore::prelude::*;
//! use hepstore::datamodel::{register_datamodel, ExampleHit, ExampleHitCollection};
//!
//! register_datamodel()?;
//!
//! let mut hits = ExampleHitCollection::new();
//! let hit = hits.create()?;
//! hit.set_energy(4.2)?;
//!
//! let mut frame = Frame::new();
//! frame.put("hits", hits)?;
//!
//! let mut backend = MemoryBackend::new();
//! backend.write_frame(&frame)?;
//! let frame = read_entry(&backend, 0, &ReaderConfig::default())?;
//! ```
//!
//! # Crates
//!
//! - [`core`]: identities, buffers and the error type
//! - [`model`]: handles, collections and relations
//! - [`evolution`]: the schema evolution registry
//! - [`datamodel`]: example datatypes
//! - [`io`]: frames, backend seams and the read pipeline

pub use hepstore_core as core;
pub use hepstore_datamodel as datamodel;
pub use hepstore_evolution as evolution;
pub use hepstore_io as io;
pub use hepstore_model as model;

pub use hepstore_core::{CollectionBuffers, CollectionId, Error, ObjectId, RelationRange, Result, SchemaVersion};

/// Commonly used types and traits
pub mod prelude {
    pub use hepstore_core::{CollectionBuffers, CollectionId, Error, ObjectId, Result, SchemaVersion};
    pub use hepstore_evolution::{
        evolve_buffers, no_op_schema_evolution, register_evolution_func, seal, Priority,
        SchemaEvolution,
    };
    pub use hepstore_io::testing::MemoryBackend;
    pub use hepstore_io::{read_entry, read_frame, Frame, FrameReader, FrameWriter, ReaderConfig};
    pub use hepstore_model::{Collection, CollectionBase, CollectionProvider, Datatype, Handle};
}
