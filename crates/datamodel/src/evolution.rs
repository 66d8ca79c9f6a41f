//! Schema evolution registrations of the datamodel
//!
//! Every datatype registers with the evolution registry, including those
//! whose layout never changed, so that readers know their current version.
//! `ExampleHit` went from version 1 to 2; the code generator emits a no-op
//! for that slot which the hand-written conversion overrides.

use crate::event_info::EventInfo;
use crate::example_cluster::ExampleCluster;
use crate::example_hit::{ExampleHit, ExampleHitData, ExampleHitDataV1};
use crate::example_mc::ExampleMC;
use crate::example_referencing_type::ExampleReferencingType;
use hepstore_core::{CollectionBuffers, Result, SchemaVersion};
use hepstore_evolution::{no_op_schema_evolution, Priority, SchemaEvolution};
use hepstore_model::Datatype;

/// Signature of the evolution functions in [`EVOLUTIONS`]
pub type EvolutionFnPtr = fn(CollectionBuffers, SchemaVersion) -> Result<CollectionBuffers>;

/// One registration call
#[derive(Debug, Clone, Copy)]
pub struct EvolutionEntry {
    /// Datatype name
    pub type_name: &'static str,
    /// Version the function converts from
    pub from_version: SchemaVersion,
    /// Current version of the datatype
    pub current_version: SchemaVersion,
    /// The conversion
    pub func: EvolutionFnPtr,
    /// Registration priority
    pub priority: Priority,
}

const fn declare<D: Datatype>() -> EvolutionEntry {
    EvolutionEntry {
        type_name: D::TYPE_NAME,
        from_version: D::SCHEMA_VERSION,
        current_version: D::SCHEMA_VERSION,
        func: no_op_schema_evolution,
        priority: Priority::AutoGenerated,
    }
}

/// All registrations, in registration order
pub const EVOLUTIONS: &[EvolutionEntry] = &[
    declare::<EventInfo>(),
    declare::<ExampleCluster>(),
    declare::<ExampleReferencingType>(),
    declare::<ExampleMC>(),
    EvolutionEntry {
        type_name: ExampleHit::TYPE_NAME,
        from_version: 1,
        current_version: ExampleHit::SCHEMA_VERSION,
        func: no_op_schema_evolution,
        priority: Priority::AutoGenerated,
    },
    EvolutionEntry {
        type_name: ExampleHit::TYPE_NAME,
        from_version: 1,
        current_version: ExampleHit::SCHEMA_VERSION,
        func: evolve_example_hit_v1,
        priority: Priority::UserDefined,
    },
];

/// Convert `ExampleHit` buffers from layout version 1
///
/// Version 1 had no `cell_id`; converted hits get `cell_id == 0`.
pub fn evolve_example_hit_v1(buffers: CollectionBuffers, _current_version: SchemaVersion) -> Result<CollectionBuffers> {
    buffers.map_records(|old: ExampleHitDataV1| ExampleHitData::from(old))
}

/// Register every entry of [`EVOLUTIONS`] with `registry`
pub fn register_evolutions(registry: &mut SchemaEvolution) -> Result<()> {
    for entry in EVOLUTIONS {
        registry.register(
            entry.type_name,
            entry.from_version,
            entry.current_version,
            entry.func,
            entry.priority,
        )?;
    }
    Ok(())
}
