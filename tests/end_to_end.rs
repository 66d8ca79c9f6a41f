//! End-to-end tests: datamodel -> frame -> backend -> read pipeline
//!
//! These tests use explicit registries and factories so they do not touch
//! the process-wide state (see `global_registry.rs` for that).

use hepstore::core::{CollectionBuffers, CollectionId, Error, ObjectId, Record, RelationRange, SchemaVersion};
use hepstore::datamodel::{
    register_evolutions, EventInfo, EventInfoCollection, ExampleCluster, ExampleClusterCollection,
    ExampleClusterData, ExampleHit, ExampleHitCollection, ExampleHitDataV1, ExampleMC,
    ExampleMCCollection, ExampleReferencingType,
};
use hepstore::evolution::{no_op_schema_evolution, Priority, SchemaEvolution};
use hepstore::io::testing::MemoryBackend;
use hepstore::io::{read_frame_with, Frame, FrameReader, FrameWriter, RawCollection, RawFrame, ReaderConfig};
use hepstore::model::{Collection, CollectionFactory, Datatype};
use parking_lot::Mutex;
use proptest::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;

fn registry() -> SchemaEvolution {
    let mut registry = SchemaEvolution::new();
    register_evolutions(&mut registry).unwrap();
    registry
}

fn factory() -> CollectionFactory {
    let mut factory = CollectionFactory::new();
    factory.register::<EventInfo>();
    factory.register::<ExampleHit>();
    factory.register::<ExampleCluster>();
    factory.register::<ExampleReferencingType>();
    factory.register::<ExampleMC>();
    factory
}

fn write_event(backend: &mut MemoryBackend, number: i32) {
    let mut info = EventInfoCollection::new();
    info.create().unwrap().set_number(number).unwrap();

    let mut hits = ExampleHitCollection::new();
    let mut clusters = ExampleClusterCollection::new();
    for i in 0..4u32 {
        let hit = ExampleHit::with_values(u64::from(i), f64::from(i), 0.0, 0.0, f64::from(i + 1));
        hits.push(&hit).unwrap();
    }
    for range in [0..2, 2..4] {
        let cluster = clusters.create().unwrap();
        let mut energy = 0.0;
        for i in range {
            let hit = hits.get(i).unwrap();
            energy += hit.energy().unwrap();
            cluster.add_hits(&hit).unwrap();
        }
        cluster.set_energy(energy).unwrap();
    }

    let mut frame = Frame::new();
    frame.put("info", info).unwrap();
    frame.put("hits", hits).unwrap();
    frame.put("clusters", clusters).unwrap();
    backend.write_frame(&frame).unwrap();
}

// ============================================================================
// Write / read round trips
// ============================================================================

#[test]
fn events_round_trip_through_backend() {
    let mut backend = MemoryBackend::new();
    for number in 0..3 {
        write_event(&mut backend, number);
    }
    assert_eq!(backend.entries(), 3);

    let (registry, factory) = (registry(), factory());
    for entry in 0..3 {
        let raw = backend.read_raw_frame(entry).unwrap();
        let frame = read_frame_with(raw, &ReaderConfig::default(), &registry, &factory).unwrap();

        let info = frame.get::<EventInfo>("info").unwrap();
        assert_eq!(info.get(0).unwrap().number().unwrap(), entry as i32);

        let clusters = frame.get::<ExampleCluster>("clusters").unwrap();
        assert_eq!(clusters.len(), 2);
        let second = clusters.get(1).unwrap();
        assert_eq!(second.energy().unwrap(), 7.0);
        let cells: Vec<u64> = second.hits().unwrap().map(|h| h.cell_id().unwrap()).collect();
        assert_eq!(cells, vec![2, 3]);
    }
}

#[test]
fn read_frames_are_independent_of_written_ones() {
    let mut backend = MemoryBackend::new();
    write_event(&mut backend, 1);

    let raw = backend.read_raw_frame(0).unwrap();
    let first = read_frame_with(raw.clone(), &ReaderConfig::default(), &registry(), &factory()).unwrap();
    let second = read_frame_with(raw, &ReaderConfig::default(), &registry(), &factory()).unwrap();

    let a = first.get::<ExampleHit>("hits").unwrap().get(0).unwrap();
    let b = second.get::<ExampleHit>("hits").unwrap().get(0).unwrap();
    assert_eq!(a.object_id().unwrap(), b.object_id().unwrap());
    assert_ne!(a, b);

    a.set_energy(100.0).unwrap();
    assert_eq!(b.energy().unwrap(), 1.0);
}

#[test]
fn old_layout_frames_are_evolved_on_read() {
    let hits = CollectionBuffers::new(
        ExampleHit::TYPE_NAME,
        1,
        vec![
            Record::new(ExampleHitDataV1 {
                x: 1.0,
                y: 1.0,
                z: 1.0,
                energy: 3.0,
            }),
            Record::new(ExampleHitDataV1 {
                x: 2.0,
                y: 2.0,
                z: 2.0,
                energy: 5.0,
            }),
        ],
    );
    let clusters = CollectionBuffers::new(
        ExampleCluster::TYPE_NAME,
        1,
        vec![Record::with_relations(
            ExampleClusterData { energy: 8.0 },
            [RelationRange::new(0, 2)],
        )],
    )
    .with_relation(vec![
        ObjectId::new(CollectionId::new(1), 0),
        ObjectId::new(CollectionId::new(1), 1),
    ]);

    let raw = RawFrame {
        collections: vec![
            RawCollection {
                name: "hits".to_string(),
                id: CollectionId::new(1),
                buffers: hits,
            },
            RawCollection {
                name: "clusters".to_string(),
                id: CollectionId::new(2),
                buffers: clusters,
            },
        ],
    };

    let frame = read_frame_with(raw, &ReaderConfig::default(), &registry(), &factory()).unwrap();
    let cluster = frame.get::<ExampleCluster>("clusters").unwrap().get(0).unwrap();
    let energies: Vec<f64> = cluster.hits().unwrap().map(|h| h.energy().unwrap()).collect();
    assert_eq!(energies, vec![3.0, 5.0]);
    assert!(cluster.hits().unwrap().all(|h| h.cell_id().unwrap() == 0));

    // Written back, the collection carries the current version.
    let rewritten = frame.to_raw().unwrap();
    assert_eq!(rewritten.collection("hits").unwrap().buffers.schema_version(), 2);
}

// ============================================================================
// Schema evolution contract
// ============================================================================

#[test]
fn track_scenario_counts_invocations() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let mut registry = SchemaEvolution::new();
    registry
        .register(
            "Track",
            1,
            2,
            move |buffers: CollectionBuffers, version: SchemaVersion| {
                counter.fetch_add(1, Ordering::SeqCst);
                no_op_schema_evolution(buffers, version)
            },
            Priority::AutoGenerated,
        )
        .unwrap();

    let v1 = CollectionBuffers::new("Track", 1, vec![Record::new(1u8), Record::new(2u8)]);
    let evolved = registry.evolve(v1, 1, "Track").unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(evolved.schema_version(), 2);
    assert_eq!(evolved.data::<Record<u8>>().unwrap(), &[Record::new(1u8), Record::new(2u8)]);

    let v2 = CollectionBuffers::new("Track", 2, vec![Record::new(3u8)]);
    let same = registry.evolve(v2.clone(), 2, "Track").unwrap();
    assert!(same.shares_storage_with(&v2));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn lookup_miss_is_not_identity() {
    let registry = registry();
    let buffers = CollectionBuffers::new("NotRegistered", 1, Vec::<Record<u8>>::new());
    let err = registry.evolve(buffers, 1, "NotRegistered").unwrap_err();
    assert!(err.is_lookup_miss());
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn config_file_controls_reference_strictness() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(hepstore::io::CONFIG_FILE_NAME);
    std::fs::write(&path, "strict_references = false\ncollections = [\"clusters\"]\n").unwrap();
    let config = ReaderConfig::from_file(&path).unwrap();

    let mut backend = MemoryBackend::new();
    write_event(&mut backend, 0);
    let raw = backend.read_raw_frame(0).unwrap();

    let frame = read_frame_with(raw.clone(), &config, &registry(), &factory()).unwrap();
    assert_eq!(frame.names(), vec!["clusters"]);
    let cluster = frame.get::<ExampleCluster>("clusters").unwrap().get(0).unwrap();
    assert_eq!(cluster.hits().unwrap().len(), 2);
    assert!(cluster.hits().unwrap().all(|h| !h.is_available()));

    let strict = ReaderConfig {
        strict_references: true,
        ..config
    };
    let err = read_frame_with(raw, &strict, &registry(), &factory()).unwrap_err();
    assert!(matches!(err, Error::UnresolvedReference { .. }));
}

// ============================================================================
// Handles across threads
// ============================================================================

#[test]
fn handles_are_shared_across_threads() {
    let mut mcps = ExampleMCCollection::new();
    hepstore::datamodel::fill_decay_tree(&mut mcps).unwrap();
    let root = mcps.get(0).unwrap();
    let refs = root.ref_count();
    let seen = Arc::new(Mutex::new(Vec::new()));

    thread::scope(|s| {
        for _ in 0..4 {
            let root = root.clone();
            let seen = Arc::clone(&seen);
            s.spawn(move || {
                let energies: Vec<f64> = root.daughters().unwrap().map(|d| d.energy().unwrap()).collect();
                seen.lock().push(energies);
            });
        }
    });

    let seen = seen.lock();
    assert_eq!(seen.len(), 4);
    assert!(seen.iter().all(|e| e == &vec![2.0, 3.0, 4.0, 5.0]));
    assert_eq!(root.ref_count(), refs);
}

// ============================================================================
// Relation properties
// ============================================================================

proptest! {
    /// Random relations between two collections, added in any interleaving,
    /// survive a write/read cycle with order and targets intact.
    #[test]
    fn relations_survive_round_trip(
        links in proptest::collection::vec((0usize..4, 0usize..6), 0..24)
    ) {
        let mut hits = ExampleHitCollection::new();
        for i in 0..6u32 {
            hits.create().unwrap().set_cell_id(u64::from(i)).unwrap();
        }
        let mut clusters = ExampleClusterCollection::new();
        for _ in 0..4 {
            clusters.create().unwrap();
        }

        let mut expected = vec![Vec::new(); 4];
        for (c, h) in &links {
            clusters.get(*c).unwrap().add_hits(&hits.get(*h).unwrap()).unwrap();
            expected[*c].push(*h as u64);
        }

        let mut frame = Frame::new();
        frame.put("hits", hits).unwrap();
        frame.put("clusters", clusters).unwrap();

        let read = read_frame_with(frame.to_raw().unwrap(), &ReaderConfig::default(), &registry(), &factory()).unwrap();
        let clusters: &Collection<ExampleCluster> = read.get("clusters").unwrap();
        for (c, cells) in expected.iter().enumerate() {
            let got: Vec<u64> = clusters.get(c).unwrap().hits().unwrap().map(|h| h.cell_id().unwrap()).collect();
            prop_assert_eq!(&got, cells);
        }

        let raw = read.to_raw().unwrap();
        prop_assert_eq!(
            raw.collection("clusters").unwrap().buffers.relation(0).map(<[_]>::len),
            Some(links.len())
        );
    }
}
