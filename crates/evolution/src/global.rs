//! Process-wide schema evolution registry
//!
//! ## Lifecycle
//!
//! ```text
//! write phase:  register_evolution_func(...)  (datamodel crates, once each)
//!                        │
//!                   seal()             validates every type, freezes the table
//!                        │
//! read phase:   evolve_buffers(...)    lock-free, from any thread
//! ```
//!
//! Registrations after `seal()` fail with `Error::RegistrySealed`.
//! `evolve_buffers` before sealing is allowed: the function is looked up
//! under the builder lock and run after the lock is released, so evolution
//! functions may themselves call `evolve_buffers`.

use crate::priority::Priority;
use crate::registry::SchemaEvolution;
use hepstore_core::{CollectionBuffers, Error, Result, SchemaVersion};
use once_cell::sync::{Lazy, OnceCell};
use parking_lot::Mutex;
use tracing::info;

static BUILDER: Lazy<Mutex<SchemaEvolution>> = Lazy::new(|| Mutex::new(SchemaEvolution::new()));
static SEALED: OnceCell<SchemaEvolution> = OnceCell::new();

/// Register an evolution function with the process-wide registry
///
/// See [`SchemaEvolution::register`] for the registration rules.
pub fn register_evolution_func<F>(
    type_name: &str,
    from_version: SchemaVersion,
    current_version: SchemaVersion,
    func: F,
    priority: Priority,
) -> Result<()>
where
    F: Fn(CollectionBuffers, SchemaVersion) -> Result<CollectionBuffers> + Send + Sync + 'static,
{
    let mut builder = BUILDER.lock();
    if SEALED.get().is_some() {
        return Err(Error::RegistrySealed);
    }
    builder.register(type_name, from_version, current_version, func, priority)
}

/// Close the write phase
///
/// Validates that every registered type has a function for each older
/// version, then freezes the table. Sealing again is a no-op.
///
/// # Errors
///
/// `Error::Configuration` for an incomplete type; the registry then stays
/// open so the missing functions can still be registered.
pub fn seal() -> Result<()> {
    let mut builder = BUILDER.lock();
    if SEALED.get().is_some() {
        return Ok(());
    }
    builder.validate()?;

    let table = std::mem::take(&mut *builder);
    info!(
        target: "hepstore::evolution",
        types = table.len(),
        "Sealed schema evolution registry"
    );
    // Only reachable while holding the builder lock with SEALED empty.
    let _ = SEALED.set(table);
    Ok(())
}

/// Whether the write phase has been closed
pub fn is_sealed() -> bool {
    SEALED.get().is_some()
}

/// The sealed table, if the write phase has been closed
pub fn instance() -> Option<&'static SchemaEvolution> {
    SEALED.get()
}

/// Run `f` against the current table, sealed or not
///
/// Before sealing, `f` runs under the builder lock and must not call back
/// into this module.
pub fn with_registry<R>(f: impl FnOnce(&SchemaEvolution) -> R) -> R {
    match SEALED.get() {
        Some(table) => f(table),
        None => {
            let builder = BUILDER.lock();
            match SEALED.get() {
                Some(table) => f(table),
                None => f(&builder),
            }
        }
    }
}

/// Evolve buffers through the process-wide registry
///
/// See [`SchemaEvolution::evolve`].
pub fn evolve_buffers(
    buffers: CollectionBuffers,
    from_version: SchemaVersion,
    type_name: &str,
) -> Result<CollectionBuffers> {
    if let Some(table) = SEALED.get() {
        return table.evolve(buffers, from_version, type_name);
    }
    let step = with_registry(|table| table.evolution_step(from_version, type_name))?;
    match step {
        Some(step) => step.apply(buffers),
        None => Ok(buffers),
    }
}
