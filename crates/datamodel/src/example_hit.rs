//! Calorimeter hit
//!
//! ## Schema history
//!
//! | Version | Layout                              |
//! |---------|-------------------------------------|
//! | 1       | `x, y, z, energy`                   |
//! | 2       | `cell_id, x, y, z, energy` (current) |
//!
//! Buffers written under version 1 hold `Record<ExampleHitDataV1>` and are
//! converted by [`evolve_example_hit_v1`](crate::evolution::evolve_example_hit_v1).

use hepstore_core::{Result, SchemaVersion};
use hepstore_model::{Collection, Datatype, Handle};

/// Field block of [`ExampleHit`] (schema version 2)
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ExampleHitData {
    /// Readout cell identifier
    pub cell_id: u64,
    /// Position x
    pub x: f64,
    /// Position y
    pub y: f64,
    /// Position z
    pub z: f64,
    /// Deposited energy
    pub energy: f64,
}

/// Field block of [`ExampleHit`] as written under schema version 1
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ExampleHitDataV1 {
    /// Position x
    pub x: f64,
    /// Position y
    pub y: f64,
    /// Position z
    pub z: f64,
    /// Deposited energy
    pub energy: f64,
}

impl From<ExampleHitDataV1> for ExampleHitData {
    fn from(old: ExampleHitDataV1) -> Self {
        Self {
            cell_id: 0,
            x: old.x,
            y: old.y,
            z: old.z,
            energy: old.energy,
        }
    }
}

handle_type! {
    /// Energy deposit at a point
    ExampleHit
}

impl Datatype for ExampleHit {
    const TYPE_NAME: &'static str = "ExampleHit";
    const SCHEMA_VERSION: SchemaVersion = 2;
    type Data = ExampleHitData;

    fn from_handle(handle: Handle<Self>) -> Self {
        Self(handle)
    }

    fn handle(&self) -> &Handle<Self> {
        &self.0
    }
}

impl ExampleHit {
    /// Record with all fields set
    pub fn with_values(cell_id: u64, x: f64, y: f64, z: f64, energy: f64) -> Self {
        Self(Handle::with_data(ExampleHitData {
            cell_id,
            x,
            y,
            z,
            energy,
        }))
    }

    /// Readout cell identifier
    pub fn cell_id(&self) -> Result<u64> {
        self.read(|d| d.cell_id)
    }

    /// Position x
    pub fn x(&self) -> Result<f64> {
        self.read(|d| d.x)
    }

    /// Position y
    pub fn y(&self) -> Result<f64> {
        self.read(|d| d.y)
    }

    /// Position z
    pub fn z(&self) -> Result<f64> {
        self.read(|d| d.z)
    }

    /// Deposited energy
    pub fn energy(&self) -> Result<f64> {
        self.read(|d| d.energy)
    }

    /// Set the readout cell identifier
    pub fn set_cell_id(&self, cell_id: u64) -> Result<()> {
        self.update(|d| d.cell_id = cell_id)
    }

    /// Set the position
    pub fn set_position(&self, x: f64, y: f64, z: f64) -> Result<()> {
        self.update(|d| {
            d.x = x;
            d.y = y;
            d.z = z;
        })
    }

    /// Set the deposited energy
    pub fn set_energy(&self, energy: f64) -> Result<()> {
        self.update(|d| d.energy = energy)
    }
}

/// Collection of [`ExampleHit`] records
pub type ExampleHitCollection = Collection<ExampleHit>;
