//! Simulated particle with decay tree relations

use hepstore_core::{Result, SchemaVersion};
use hepstore_model::{Collection, Datatype, Handle, RelationField, RelationFields, RelationIter};
use smallvec::smallvec;

/// Field block of [`ExampleMC`]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ExampleMCData {
    /// Energy
    pub energy: f64,
    /// Particle ID code
    pub pdg: i32,
}

handle_type! {
    /// Monte Carlo particle
    ExampleMC
}

const DAUGHTERS: usize = 0;
const PARENTS: usize = 1;

impl Datatype for ExampleMC {
    const TYPE_NAME: &'static str = "ExampleMC";
    const SCHEMA_VERSION: SchemaVersion = 1;
    type Data = ExampleMCData;

    fn relation_fields() -> RelationFields {
        smallvec![
            RelationField::to::<ExampleMC>("daughters"),
            RelationField::to::<ExampleMC>("parents"),
        ]
    }

    fn from_handle(handle: Handle<Self>) -> Self {
        Self(handle)
    }

    fn handle(&self) -> &Handle<Self> {
        &self.0
    }
}

impl ExampleMC {
    /// Particle with the given energy and ID code
    pub fn with_values(energy: f64, pdg: i32) -> Self {
        Self(Handle::with_data(ExampleMCData { energy, pdg }))
    }

    /// Energy
    pub fn energy(&self) -> Result<f64> {
        self.read(|d| d.energy)
    }

    /// Particle ID code
    pub fn pdg(&self) -> Result<i32> {
        self.read(|d| d.pdg)
    }

    /// Set the energy
    pub fn set_energy(&self, energy: f64) -> Result<()> {
        self.update(|d| d.energy = energy)
    }

    /// Set the particle ID code
    pub fn set_pdg(&self, pdg: i32) -> Result<()> {
        self.update(|d| d.pdg = pdg)
    }

    /// Decay products
    pub fn daughters(&self) -> Result<RelationIter<ExampleMC>> {
        self.relation(DAUGHTERS)
    }

    /// Add a decay product
    pub fn add_daughters(&self, daughter: &ExampleMC) -> Result<()> {
        self.add_relation(DAUGHTERS, daughter)
    }

    /// Mothers
    pub fn parents(&self) -> Result<RelationIter<ExampleMC>> {
        self.relation(PARENTS)
    }

    /// Add a mother
    pub fn add_parents(&self, parent: &ExampleMC) -> Result<()> {
        self.add_relation(PARENTS, parent)
    }
}

/// Collection of [`ExampleMC`] records
pub type ExampleMCCollection = Collection<ExampleMC>;

/// Fill a small two-generation decay tree into `mcps`
///
/// Ten particles: 0 and 1 decay into 2..=5, 2 and 3 decay into 6..=9.
/// Parent relations are then derived from the daughter relations, which
/// extends the `parents` field of different records in interleaved order.
pub fn fill_decay_tree(mcps: &mut ExampleMCCollection) -> Result<()> {
    let first = mcps.len();
    for i in 0u32..10 {
        mcps.push(&ExampleMC::with_values(f64::from(i), 11))?;
    }
    let particle = |i: usize| mcps.get(first + i).unwrap_or_else(ExampleMC::unavailable);

    for (mother, daughters) in [(0, 2..6), (1, 2..6), (2, 6..10), (3, 6..10)] {
        let mother = particle(mother);
        for d in daughters {
            mother.add_daughters(&particle(d))?;
        }
    }

    for j in 0..10 {
        let p = particle(j);
        for d in p.daughters()? {
            d.add_parents(&p)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn indices(iter: RelationIter<ExampleMC>) -> Vec<i32> {
        iter.map(|p| p.object_id().unwrap().index).collect()
    }

    #[test]
    fn test_decay_tree_relations() {
        let mut mcps = ExampleMCCollection::new();
        fill_decay_tree(&mut mcps).unwrap();
        assert_eq!(mcps.len(), 10);

        assert_eq!(indices(mcps.get(0).unwrap().daughters().unwrap()), vec![2, 3, 4, 5]);
        assert_eq!(indices(mcps.get(3).unwrap().daughters().unwrap()), vec![6, 7, 8, 9]);
        assert_eq!(indices(mcps.get(2).unwrap().parents().unwrap()), vec![0, 1]);
        assert_eq!(indices(mcps.get(9).unwrap().parents().unwrap()), vec![2, 3]);
        assert!(indices(mcps.get(0).unwrap().parents().unwrap()).is_empty());
    }

    #[test]
    fn test_decay_tree_buffers_are_compact() {
        let mut mcps = ExampleMCCollection::new();
        fill_decay_tree(&mut mcps).unwrap();
        let buffers = mcps.to_buffers().unwrap();
        assert_eq!(buffers.relation(0).map(<[_]>::len), Some(16));
        assert_eq!(buffers.relation(1).map(<[_]>::len), Some(16));
    }

    #[test]
    fn test_scalar_fields() {
        let p = ExampleMC::with_values(91.2, 23);
        p.set_pdg(-23).unwrap();
        assert_eq!(p.pdg().unwrap(), -23);
        assert_eq!(p.energy().unwrap(), 91.2);
    }
}
