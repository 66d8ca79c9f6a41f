//! Schema evolution for hepstore
//!
//! Backends read buffers tagged with the schema version they were written
//! under. Before a collection is rebuilt, those buffers pass through the
//! registry, which transforms them into the current layout of their type.
//!
//! - Priority: `AutoGenerated` < `UserDefined` tie-break for a slot
//! - SchemaEvolution: the per-type function table and its rules
//! - global: the process-wide registry with a sealed read phase

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod global;
pub mod priority;
pub mod registry;

pub use global::{evolve_buffers, instance, is_sealed, register_evolution_func, seal, with_registry};
pub use priority::Priority;
pub use registry::{no_op_schema_evolution, EvolutionFn, EvolutionStep, SchemaEvolution};
