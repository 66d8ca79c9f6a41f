//! Read pipeline: raw buffers -> evolved buffers -> collections -> frame
//!
//! Reading is all-or-nothing: if any selected collection cannot be evolved,
//! rebuilt or resolved, the whole frame is discarded and the error returned.

use crate::backend::{FrameReader, RawFrame};
use crate::config::ReaderConfig;
use crate::frame::Frame;
use hepstore_core::{CollectionBuffers, Result, SchemaVersion};
use hepstore_evolution::{evolve_buffers, SchemaEvolution};
use hepstore_model::{rebuild_collection, CollectionBase, CollectionFactory};
use tracing::{debug, info};

/// Assemble a frame through the process-wide registry and factory
///
/// With `config.seal_registry`, the evolution registry is sealed first; this
/// fails with `Error::Configuration` if a registered type is incomplete.
pub fn read_frame(raw: RawFrame, config: &ReaderConfig) -> Result<Frame> {
    if config.seal_registry {
        hepstore_evolution::seal()?;
    }
    assemble(raw, config, evolve_buffers, rebuild_collection)
}

/// Assemble a frame through an explicit registry and factory
pub fn read_frame_with(
    raw: RawFrame,
    config: &ReaderConfig,
    registry: &SchemaEvolution,
    factory: &CollectionFactory,
) -> Result<Frame> {
    assemble(
        raw,
        config,
        |buffers, from_version, type_name| registry.evolve(buffers, from_version, type_name),
        |buffers| factory.rebuild(buffers),
    )
}

/// Read entry `entry` of `reader` through the process-wide registry
pub fn read_entry<R>(reader: &R, entry: usize, config: &ReaderConfig) -> Result<Frame>
where
    R: FrameReader + ?Sized,
{
    read_frame(reader.read_raw_frame(entry)?, config)
}

fn assemble<E, B>(raw: RawFrame, config: &ReaderConfig, evolve: E, rebuild: B) -> Result<Frame>
where
    E: Fn(CollectionBuffers, SchemaVersion, &str) -> Result<CollectionBuffers>,
    B: Fn(CollectionBuffers) -> Result<Box<dyn CollectionBase>>,
{
    let mut frame = Frame::new();
    for raw_collection in raw.collections {
        if !config.wants(&raw_collection.name) {
            continue;
        }
        let buffers = raw_collection.buffers;
        let from_version = buffers.schema_version();
        let type_name = buffers.type_name().to_string();

        let evolved = evolve(buffers, from_version, &type_name)?;
        if evolved.schema_version() != from_version {
            debug!(
                target: "hepstore::io",
                collection = %raw_collection.name,
                type_name = %type_name,
                from_version,
                to_version = evolved.schema_version(),
                "Evolved collection"
            );
        }

        let collection = rebuild(evolved)?;
        frame.insert(&raw_collection.name, raw_collection.id, collection)?;
    }

    frame.resolve_references(config.strict_references)?;
    info!(
        target: "hepstore::io",
        collections = frame.len(),
        "Read frame"
    );
    Ok(frame)
}
