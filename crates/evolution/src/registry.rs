//! Schema evolution table
//!
//! Maps "buffers of type T written under version V" to "buffers matching the
//! current version of T".
//!
//! ## Layout
//!
//! ```text
//! version_map:  "ExampleHit" -> MapIndex { current_version: 3, index: 0 }
//!               "ExampleMC"  -> MapIndex { current_version: 1, index: 1 }
//!
//! functions[0]: [ from 1 -> fn, from 2 -> fn ]   (ExampleHit)
//! functions[1]: [ ]                              (ExampleMC)
//! ```
//!
//! Each function is a direct transform from its originating version to the
//! current version; functions are never chained.
//!
//! ## Registration rules
//!
//! - All registrations of a type agree on its current version.
//! - `from_version` lies in `1..=current_version`. Registering with
//!   `from_version == current_version` only declares the type (its function
//!   is never needed) so that unchanged datatypes are known to the table.
//! - Per `(type, from_version)` slot, `UserDefined` replaces `AutoGenerated`;
//!   the reverse is rejected, as is a second registration at the same
//!   priority.

use crate::priority::Priority;
use hepstore_core::{CollectionBuffers, Error, Result, SchemaVersion};
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Transform of buffers to the current schema version
///
/// Receives the buffers as read and the current version of their type.
pub type EvolutionFn =
    Arc<dyn Fn(CollectionBuffers, SchemaVersion) -> Result<CollectionBuffers> + Send + Sync>;

/// Identity evolution for datatypes whose layout did not change
pub fn no_op_schema_evolution(buffers: CollectionBuffers, _current_version: SchemaVersion) -> Result<CollectionBuffers> {
    Ok(buffers)
}

#[derive(Debug, Clone, Copy)]
struct MapIndex {
    current_version: SchemaVersion,
    index: usize,
}

#[derive(Clone)]
struct Registered {
    func: EvolutionFn,
    priority: Priority,
}

/// One resolved evolution: a function and the version it produces
#[derive(Clone)]
pub struct EvolutionStep {
    func: EvolutionFn,
    current_version: SchemaVersion,
}

impl EvolutionStep {
    /// Version the step evolves to
    pub fn current_version(&self) -> SchemaVersion {
        self.current_version
    }

    /// Run the function and tag the result with the current version
    pub fn apply(&self, buffers: CollectionBuffers) -> Result<CollectionBuffers> {
        let evolved = (self.func)(buffers, self.current_version)?;
        Ok(evolved.with_schema_version(self.current_version))
    }
}

impl fmt::Debug for EvolutionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvolutionStep")
            .field("current_version", &self.current_version)
            .finish()
    }
}

/// Per-type tables of evolution functions
#[derive(Clone, Default)]
pub struct SchemaEvolution {
    version_map: FxHashMap<String, MapIndex>,
    /// Indexed by `MapIndex::index`, then by `from_version - 1`
    functions: Vec<Vec<Option<Registered>>>,
}

impl SchemaEvolution {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an evolution function
    ///
    /// # Errors
    ///
    /// - `Error::InvalidFromVersion` if `from_version` is not in
    ///   `1..=current_version`
    /// - `Error::VersionConflict` if `current_version` differs from earlier
    ///   registrations of `type_name`
    /// - `Error::PriorityConflict` if an `AutoGenerated` function targets a
    ///   slot holding a `UserDefined` one
    /// - `Error::DuplicateRegistration` if the slot already holds a function
    ///   of the same priority
    pub fn register<F>(
        &mut self,
        type_name: &str,
        from_version: SchemaVersion,
        current_version: SchemaVersion,
        func: F,
        priority: Priority,
    ) -> Result<()>
    where
        F: Fn(CollectionBuffers, SchemaVersion) -> Result<CollectionBuffers> + Send + Sync + 'static,
    {
        self.register_shared(type_name, from_version, current_version, Arc::new(func), priority)
    }

    /// Register an already shared evolution function
    pub fn register_shared(
        &mut self,
        type_name: &str,
        from_version: SchemaVersion,
        current_version: SchemaVersion,
        func: EvolutionFn,
        priority: Priority,
    ) -> Result<()> {
        if from_version == 0 || from_version > current_version {
            return Err(Error::InvalidFromVersion {
                type_name: type_name.to_string(),
                from_version,
                current_version,
            });
        }

        let index = self.entry(type_name, current_version)?.index;
        if from_version == current_version {
            debug!(
                target: "hepstore::evolution",
                type_name,
                current_version,
                "Declared datatype without evolution"
            );
            return Ok(());
        }

        let slot = &mut self.functions[index][(from_version - 1) as usize];
        match slot {
            None => {
                debug!(
                    target: "hepstore::evolution",
                    type_name,
                    from_version,
                    current_version,
                    %priority,
                    "Registered evolution function"
                );
            }
            Some(existing) if existing.priority == priority => {
                warn!(
                    target: "hepstore::evolution",
                    type_name,
                    from_version,
                    %priority,
                    "Rejected duplicate evolution function"
                );
                return Err(Error::DuplicateRegistration {
                    type_name: type_name.to_string(),
                    from_version,
                    priority: priority.as_str(),
                });
            }
            Some(existing) if existing.priority > priority => {
                warn!(
                    target: "hepstore::evolution",
                    type_name,
                    from_version,
                    "Auto-generated evolution function cannot replace a user-defined one"
                );
                return Err(Error::PriorityConflict {
                    type_name: type_name.to_string(),
                    from_version,
                });
            }
            Some(existing) => {
                debug!(
                    target: "hepstore::evolution",
                    type_name,
                    from_version,
                    replaced = %existing.priority,
                    %priority,
                    "Overriding evolution function"
                );
            }
        }
        *slot = Some(Registered { func, priority });
        Ok(())
    }

    /// Look up or create the entry of `type_name`
    fn entry(&mut self, type_name: &str, current_version: SchemaVersion) -> Result<MapIndex> {
        if let Some(entry) = self.version_map.get(type_name) {
            if entry.current_version != current_version {
                warn!(
                    target: "hepstore::evolution",
                    type_name,
                    registered = entry.current_version,
                    requested = current_version,
                    "Rejected evolution function with conflicting current version"
                );
                return Err(Error::VersionConflict {
                    type_name: type_name.to_string(),
                    registered: entry.current_version,
                    requested: current_version,
                });
            }
            return Ok(*entry);
        }

        let entry = MapIndex {
            current_version,
            index: self.functions.len(),
        };
        self.functions
            .push(std::iter::repeat_with(|| None).take((current_version - 1) as usize).collect());
        self.version_map.insert(type_name.to_string(), entry);
        Ok(entry)
    }

    /// Evolve `buffers` written under `from_version` to the current version
    ///
    /// Buffers already at the current version are returned as they are,
    /// without invoking any function. Otherwise the function registered for
    /// `(type_name, from_version)` is invoked exactly once and its result is
    /// tagged with the current version.
    ///
    /// # Errors
    ///
    /// - `Error::LookupMiss` if the type is unknown, `from_version` is not
    ///   older than the current version, or no function is registered for it
    /// - `Error::Configuration` if the function exists but the type's table
    ///   still has gaps
    /// - whatever the evolution function returns
    pub fn evolve(
        &self,
        buffers: CollectionBuffers,
        from_version: SchemaVersion,
        type_name: &str,
    ) -> Result<CollectionBuffers> {
        match self.evolution_step(from_version, type_name)? {
            Some(step) => step.apply(buffers),
            None => Ok(buffers),
        }
    }

    /// The function `evolve` would run for `(type_name, from_version)`
    ///
    /// `None` when `from_version` is already current. The step owns its
    /// function, so it can be applied after the table is no longer borrowed.
    ///
    /// # Errors
    ///
    /// As for [`evolve`](Self::evolve), except errors of the function itself.
    pub fn evolution_step(&self, from_version: SchemaVersion, type_name: &str) -> Result<Option<EvolutionStep>> {
        let lookup_miss = || Error::LookupMiss {
            type_name: type_name.to_string(),
            from_version,
        };

        let entry = self.version_map.get(type_name).ok_or_else(lookup_miss)?;
        if from_version == entry.current_version {
            return Ok(None);
        }
        if from_version == 0 || from_version > entry.current_version {
            return Err(lookup_miss());
        }

        let table = &self.functions[entry.index];
        let registered = table[(from_version - 1) as usize]
            .as_ref()
            .ok_or_else(lookup_miss)?;

        let missing = missing_in(table);
        if !missing.is_empty() {
            return Err(Error::Configuration {
                type_name: type_name.to_string(),
                missing,
            });
        }

        debug!(
            target: "hepstore::evolution",
            type_name,
            from_version,
            current_version = entry.current_version,
            priority = %registered.priority,
            "Evolving buffers"
        );
        Ok(Some(EvolutionStep {
            func: Arc::clone(&registered.func),
            current_version: entry.current_version,
        }))
    }

    /// Current schema version of `type_name`
    pub fn current_version(&self, type_name: &str) -> Option<SchemaVersion> {
        self.version_map.get(type_name).map(|e| e.current_version)
    }

    /// Priority of the function registered for `(type_name, from_version)`
    pub fn priority(&self, type_name: &str, from_version: SchemaVersion) -> Option<Priority> {
        let entry = self.version_map.get(type_name)?;
        let slot = from_version.checked_sub(1)? as usize;
        self.functions[entry.index]
            .get(slot)?
            .as_ref()
            .map(|r| r.priority)
    }

    /// Known type names, sorted
    pub fn registered_types(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.version_map.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Versions in `1..current` of `type_name` without a function
    pub fn missing_versions(&self, type_name: &str) -> Vec<SchemaVersion> {
        self.version_map
            .get(type_name)
            .map(|e| missing_in(&self.functions[e.index]))
            .unwrap_or_default()
    }

    /// Whether `type_name` is known and has a function for every older version
    pub fn is_complete(&self, type_name: &str) -> bool {
        self.version_map.contains_key(type_name) && self.missing_versions(type_name).is_empty()
    }

    /// Check every known type for completeness
    ///
    /// # Errors
    ///
    /// `Error::Configuration` for the first incomplete type in name order.
    pub fn validate(&self) -> Result<()> {
        for type_name in self.registered_types() {
            let missing = self.missing_versions(type_name);
            if !missing.is_empty() {
                return Err(Error::Configuration {
                    type_name: type_name.to_string(),
                    missing,
                });
            }
        }
        Ok(())
    }

    /// Number of known types
    pub fn len(&self) -> usize {
        self.version_map.len()
    }

    /// Whether no type is known
    pub fn is_empty(&self) -> bool {
        self.version_map.is_empty()
    }
}

fn missing_in(table: &[Option<Registered>]) -> Vec<SchemaVersion> {
    table
        .iter()
        .enumerate()
        .filter(|(_, slot)| slot.is_none())
        .map(|(i, _)| i as SchemaVersion + 1)
        .collect()
}

impl fmt::Debug for SchemaEvolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for type_name in self.registered_types() {
            map.entry(&type_name, &self.current_version(type_name));
        }
        map.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hepstore_core::{ObjectId, Record};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn track_buffers(version: SchemaVersion) -> CollectionBuffers {
        CollectionBuffers::new("ex::Track", version, vec![Record::new(1.5f32), Record::new(2.5f32)])
            .with_relation(vec![ObjectId::invalid()])
    }

    fn counting(counter: &Arc<AtomicUsize>) -> impl Fn(CollectionBuffers, SchemaVersion) -> Result<CollectionBuffers> {
        let counter = Arc::clone(counter);
        move |buffers, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(buffers)
        }
    }

    #[test]
    fn test_track_scenario() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut registry = SchemaEvolution::new();
        registry
            .register("ex::Track", 1, 2, counting(&counter), Priority::AutoGenerated)
            .unwrap();

        let evolved = registry.evolve(track_buffers(1), 1, "ex::Track").unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(evolved.schema_version(), 2);
        assert_eq!(
            evolved.data::<Record<f32>>().unwrap(),
            track_buffers(1).data::<Record<f32>>().unwrap()
        );
        assert_eq!(evolved.relation(0), Some(&[ObjectId::invalid()][..]));

        let current = track_buffers(2);
        let same = registry.evolve(current.clone(), 2, "ex::Track").unwrap();
        assert!(same.shares_storage_with(&current));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_evolution_step_outlives_table() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut registry = SchemaEvolution::new();
        registry
            .register("ex::Track", 1, 2, counting(&counter), Priority::AutoGenerated)
            .unwrap();

        assert!(registry.evolution_step(2, "ex::Track").unwrap().is_none());
        let step = registry.evolution_step(1, "ex::Track").unwrap().unwrap();
        assert_eq!(step.current_version(), 2);
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        drop(registry);
        let evolved = step.apply(track_buffers(1)).unwrap();
        assert_eq!(evolved.schema_version(), 2);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_no_op_for_every_older_version() {
        let mut registry = SchemaEvolution::new();
        for from in 1..4 {
            registry
                .register("ex::Track", from, 4, no_op_schema_evolution, Priority::AutoGenerated)
                .unwrap();
        }
        assert!(registry.is_complete("ex::Track"));
        for from in 1..4 {
            let input = track_buffers(from);
            let evolved = registry.evolve(input.clone(), from, "ex::Track").unwrap();
            assert_eq!(evolved.schema_version(), 4);
            assert_eq!(
                evolved.data::<Record<f32>>().unwrap(),
                input.data::<Record<f32>>().unwrap()
            );
        }
    }

    #[test]
    fn test_user_defined_wins_in_either_order() {
        for auto_first in [true, false] {
            let auto = Arc::new(AtomicUsize::new(0));
            let user = Arc::new(AtomicUsize::new(0));
            let mut registry = SchemaEvolution::new();

            let auto_result;
            if auto_first {
                auto_result = registry.register("ex::Track", 1, 2, counting(&auto), Priority::AutoGenerated);
                registry
                    .register("ex::Track", 1, 2, counting(&user), Priority::UserDefined)
                    .unwrap();
                assert!(auto_result.is_ok());
            } else {
                registry
                    .register("ex::Track", 1, 2, counting(&user), Priority::UserDefined)
                    .unwrap();
                auto_result = registry.register("ex::Track", 1, 2, counting(&auto), Priority::AutoGenerated);
                assert!(matches!(auto_result, Err(Error::PriorityConflict { from_version: 1, .. })));
            }

            assert_eq!(registry.priority("ex::Track", 1), Some(Priority::UserDefined));
            registry.evolve(track_buffers(1), 1, "ex::Track").unwrap();
            assert_eq!(user.load(Ordering::SeqCst), 1);
            assert_eq!(auto.load(Ordering::SeqCst), 0);
        }
    }

    #[test]
    fn test_duplicate_same_priority_rejected() {
        let mut registry = SchemaEvolution::new();
        registry
            .register("ex::Track", 1, 2, no_op_schema_evolution, Priority::UserDefined)
            .unwrap();
        let err = registry
            .register("ex::Track", 1, 2, no_op_schema_evolution, Priority::UserDefined)
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateRegistration { priority: "user_defined", .. }));
        assert!(err.is_registration_error());
    }

    #[test]
    fn test_version_conflict() {
        let mut registry = SchemaEvolution::new();
        registry
            .register("ex::Track", 1, 3, no_op_schema_evolution, Priority::AutoGenerated)
            .unwrap();
        let err = registry
            .register("ex::Track", 2, 4, no_op_schema_evolution, Priority::AutoGenerated)
            .unwrap_err();
        assert!(matches!(err, Error::VersionConflict { registered: 3, requested: 4, .. }));
        assert_eq!(registry.current_version("ex::Track"), Some(3));
    }

    #[test]
    fn test_invalid_from_version() {
        let mut registry = SchemaEvolution::new();
        for (from, current) in [(0, 2), (3, 2), (1, 0)] {
            let err = registry
                .register("ex::Track", from, current, no_op_schema_evolution, Priority::UserDefined)
                .unwrap_err();
            assert!(matches!(err, Error::InvalidFromVersion { .. }));
        }
        assert!(registry.is_empty());
    }

    #[test]
    fn test_declared_type_is_known_and_complete() {
        let mut registry = SchemaEvolution::new();
        registry
            .register("ex::EventInfo", 1, 1, no_op_schema_evolution, Priority::AutoGenerated)
            .unwrap();
        assert_eq!(registry.current_version("ex::EventInfo"), Some(1));
        assert!(registry.is_complete("ex::EventInfo"));

        let input = CollectionBuffers::new("ex::EventInfo", 1, vec![Record::new(7i32)]);
        let out = registry.evolve(input.clone(), 1, "ex::EventInfo").unwrap();
        assert!(out.shares_storage_with(&input));
    }

    #[test]
    fn test_lookup_miss() {
        let mut registry = SchemaEvolution::new();
        registry
            .register("ex::Track", 2, 3, no_op_schema_evolution, Priority::AutoGenerated)
            .unwrap();

        let unknown = registry.evolve(track_buffers(1), 1, "ex::Missing").unwrap_err();
        assert!(unknown.is_lookup_miss());

        let newer = registry.evolve(track_buffers(5), 5, "ex::Track").unwrap_err();
        assert!(newer.is_lookup_miss());

        let unregistered = registry.evolve(track_buffers(1), 1, "ex::Track").unwrap_err();
        assert!(matches!(unregistered, Error::LookupMiss { from_version: 1, .. }));
    }

    #[test]
    fn test_incomplete_table_is_configuration_error() {
        let mut registry = SchemaEvolution::new();
        registry
            .register("ex::Track", 2, 3, no_op_schema_evolution, Priority::AutoGenerated)
            .unwrap();

        let err = registry.evolve(track_buffers(2), 2, "ex::Track").unwrap_err();
        assert!(err.is_configuration());
        assert!(matches!(err, Error::Configuration { ref missing, .. } if missing == &vec![1]));

        assert!(!registry.is_complete("ex::Track"));
        assert_eq!(registry.missing_versions("ex::Track"), vec![1]);
        assert!(registry.validate().is_err());

        registry
            .register("ex::Track", 1, 3, no_op_schema_evolution, Priority::AutoGenerated)
            .unwrap();
        registry.validate().unwrap();
    }

    #[test]
    fn test_failing_function_propagates() {
        let mut registry = SchemaEvolution::new();
        registry
            .register(
                "ex::Track",
                1,
                2,
                |buffers: CollectionBuffers, _| buffers.map_records(|hits: i64| hits + 1),
                Priority::UserDefined,
            )
            .unwrap();
        let err = registry.evolve(track_buffers(1), 1, "ex::Track").unwrap_err();
        assert!(matches!(err, Error::BufferType { .. }));
    }

    #[test]
    fn test_evolve_from_many_threads() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut registry = SchemaEvolution::new();
        registry
            .register("ex::Track", 1, 2, counting(&counter), Priority::AutoGenerated)
            .unwrap();

        std::thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    let out = registry.evolve(track_buffers(1), 1, "ex::Track").unwrap();
                    assert_eq!(out.schema_version(), 2);
                });
            }
        });
        assert_eq!(counter.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_registered_types_sorted() {
        let mut registry = SchemaEvolution::new();
        registry
            .register("b::Two", 1, 1, no_op_schema_evolution, Priority::AutoGenerated)
            .unwrap();
        registry
            .register("a::One", 1, 2, no_op_schema_evolution, Priority::AutoGenerated)
            .unwrap();
        assert_eq!(registry.registered_types(), vec!["a::One", "b::Two"]);
        assert_eq!(registry.len(), 2);
    }
}
