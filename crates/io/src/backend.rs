//! Seams between frames and storage backends
//!
//! Backends only ever see [`RawFrame`]s: per collection, its name, its ID and
//! the buffers tagged with the schema version they were written under. What a
//! backend does with them (columnar file, table, network) is its own business.
//!
//! ## Read path
//!
//! ```text
//! FrameReader::read_raw_frame ──► evolve ──► rebuild ──► resolve ──► Frame
//! ```
//!
//! The last three steps are done by [`read_frame`](crate::reader::read_frame).

use crate::frame::Frame;
use hepstore_core::{CollectionBuffers, CollectionId, Result};
use tracing::debug;

/// Buffers of one collection together with its identity in the frame
#[derive(Debug, Clone)]
pub struct RawCollection {
    /// Collection name
    pub name: String,
    /// Collection ID
    pub id: CollectionId,
    /// Data and relation arrays with their schema version
    pub buffers: CollectionBuffers,
}

/// All collections of one frame as exchanged with a backend
#[derive(Debug, Clone, Default)]
pub struct RawFrame {
    /// Collections in the order they were put into the frame
    pub collections: Vec<RawCollection>,
}

impl RawFrame {
    /// Collection `name`
    pub fn collection(&self, name: &str) -> Option<&RawCollection> {
        self.collections.iter().find(|c| c.name == name)
    }

    /// Mutable access to collection `name`
    pub fn collection_mut(&mut self, name: &str) -> Option<&mut RawCollection> {
        self.collections.iter_mut().find(|c| c.name == name)
    }
}

/// Backend accepting frames
pub trait FrameWriter {
    /// Persist one raw frame
    fn write_raw_frame(&mut self, frame: RawFrame) -> Result<()>;

    /// Flatten and persist `frame`
    fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        let raw = frame.to_raw()?;
        debug!(
            target: "hepstore::io",
            collections = raw.collections.len(),
            "Writing frame"
        );
        self.write_raw_frame(raw)
    }
}

/// Backend producing frames
pub trait FrameReader {
    /// Number of stored frames
    fn entries(&self) -> usize;

    /// Buffers of frame `entry`, tagged with their stored schema versions
    ///
    /// # Errors
    ///
    /// `Error::Io` with kind `NotFound` if `entry` is out of range, or any
    /// backend failure.
    fn read_raw_frame(&self, entry: usize) -> Result<RawFrame>;
}
