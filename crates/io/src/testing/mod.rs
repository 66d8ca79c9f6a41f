//! In-memory backend
//!
//! Stores raw frames as they are handed over, without any encoding. Clones
//! share the same storage, so one clone can write while another reads.
//!
//! # Example
//!
//! ```ignore
//! use hepstore_io::testing::MemoryBackend;
//!
//! let mut backend = MemoryBackend::new();
//! backend.write_frame(&frame)?;
//! let frame = read_entry(&backend, 0, &ReaderConfig::default())?;
//! ```

use crate::backend::{FrameReader, FrameWriter, RawFrame};
use hepstore_core::{Error, Result};
use parking_lot::RwLock;
use std::io;
use std::sync::Arc;

/// Backend keeping raw frames in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    frames: Arc<RwLock<Vec<RawFrame>>>,
}

impl MemoryBackend {
    /// Create an empty backend
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop all stored frames
    pub fn clear(&self) {
        self.frames.write().clear();
    }
}

impl FrameWriter for MemoryBackend {
    fn write_raw_frame(&mut self, frame: RawFrame) -> Result<()> {
        self.frames.write().push(frame);
        Ok(())
    }
}

impl FrameReader for MemoryBackend {
    fn entries(&self) -> usize {
        self.frames.read().len()
    }

    fn read_raw_frame(&self, entry: usize) -> Result<RawFrame> {
        self.frames.read().get(entry).cloned().ok_or_else(|| {
            Error::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no frame at entry {}", entry),
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_storage() {
        let mut writer = MemoryBackend::new();
        let reader = writer.clone();
        writer.write_raw_frame(RawFrame::default()).unwrap();
        assert_eq!(reader.entries(), 1);

        let err = reader.read_raw_frame(1).unwrap_err();
        assert!(matches!(err, Error::Io(ref e) if e.kind() == io::ErrorKind::NotFound));

        reader.clear();
        assert_eq!(writer.entries(), 0);
    }
}
