//! Frames and backend plumbing for hepstore
//!
//! - Frame / CollectionIdTable: named collections of one event
//! - FrameWriter / FrameReader: seams implemented by storage backends
//! - read_frame: evolve -> rebuild -> resolve, all-or-nothing
//! - ReaderConfig: reader settings from `hepstore.toml`
//! - testing::MemoryBackend: reference backend without encoding

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod config;
pub mod frame;
pub mod reader;
pub mod testing;

pub use backend::{FrameReader, FrameWriter, RawCollection, RawFrame};
pub use config::{ReaderConfig, CONFIG_FILE_NAME};
pub use frame::{CollectionIdTable, Frame};
pub use reader::{read_entry, read_frame, read_frame_with};
