//! Example datamodel for hepstore
//!
//! Hand-written instances of the code the datamodel generator emits:
//! - EventInfo: per-event metadata
//! - ExampleHit: calorimeter hit, evolved from schema version 1 to 2
//! - ExampleCluster: cluster with a relation to its hits
//! - ExampleReferencingType: relations to clusters and to its own type
//! - ExampleMC: particle with daughter and parent relations
//!
//! [`register_datamodel`] installs every type into the process-wide
//! collection factory and schema evolution registry.

#![warn(missing_docs)]
#![warn(clippy::all)]

#[macro_use]
mod macros;

pub mod event_info;
pub mod evolution;
pub mod example_cluster;
pub mod example_hit;
pub mod example_mc;
pub mod example_referencing_type;

pub use event_info::{EventInfo, EventInfoCollection, EventInfoData};
pub use evolution::{evolve_example_hit_v1, register_evolutions, EvolutionEntry, EVOLUTIONS};
pub use example_cluster::{ExampleCluster, ExampleClusterCollection, ExampleClusterData};
pub use example_hit::{ExampleHit, ExampleHitCollection, ExampleHitData, ExampleHitDataV1};
pub use example_mc::{fill_decay_tree, ExampleMC, ExampleMCCollection, ExampleMCData};
pub use example_referencing_type::{ExampleReferencingType, ExampleReferencingTypeCollection};

use hepstore_core::Result;
use hepstore_evolution::register_evolution_func;
use hepstore_model::register_collection_type;
use once_cell::sync::OnceCell;
use tracing::info;

static REGISTERED: OnceCell<()> = OnceCell::new();

/// Register all datatypes with the process-wide factory and registry
///
/// Runs once per process; later calls return immediately.
///
/// # Errors
///
/// Registration errors from the evolution registry, e.g.
/// `Error::RegistrySealed` when called after the registry was sealed.
pub fn register_datamodel() -> Result<()> {
    REGISTERED
        .get_or_try_init(|| {
            register_collection_type::<EventInfo>();
            register_collection_type::<ExampleHit>();
            register_collection_type::<ExampleCluster>();
            register_collection_type::<ExampleReferencingType>();
            register_collection_type::<ExampleMC>();

            for entry in EVOLUTIONS {
                register_evolution_func(
                    entry.type_name,
                    entry.from_version,
                    entry.current_version,
                    entry.func,
                    entry.priority,
                )?;
            }
            info!(
                target: "hepstore::model",
                registrations = EVOLUTIONS.len(),
                "Registered example datamodel"
            );
            Ok(())
        })
        .map(|_| ())
}
