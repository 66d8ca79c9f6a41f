//! Cluster of calorimeter hits

use crate::example_hit::ExampleHit;
use hepstore_core::{Result, SchemaVersion};
use hepstore_model::{Collection, Datatype, Handle, RelationField, RelationFields, RelationIter};
use smallvec::smallvec;

/// Field block of [`ExampleCluster`]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ExampleClusterData {
    /// Total energy
    pub energy: f64,
}

handle_type! {
    /// Group of hits with a summed energy
    ExampleCluster
}

const HITS: usize = 0;

impl Datatype for ExampleCluster {
    const TYPE_NAME: &'static str = "ExampleCluster";
    const SCHEMA_VERSION: SchemaVersion = 1;
    type Data = ExampleClusterData;

    fn relation_fields() -> RelationFields {
        smallvec![RelationField::to::<ExampleHit>("hits")]
    }

    fn from_handle(handle: Handle<Self>) -> Self {
        Self(handle)
    }

    fn handle(&self) -> &Handle<Self> {
        &self.0
    }
}

impl ExampleCluster {
    /// Cluster with the given energy
    pub fn with_energy(energy: f64) -> Self {
        Self(Handle::with_data(ExampleClusterData { energy }))
    }

    /// Total energy
    pub fn energy(&self) -> Result<f64> {
        self.read(|d| d.energy)
    }

    /// Set the total energy
    pub fn set_energy(&self, energy: f64) -> Result<()> {
        self.update(|d| d.energy = energy)
    }

    /// Hits of this cluster
    pub fn hits(&self) -> Result<RelationIter<ExampleHit>> {
        self.relation(HITS)
    }

    /// Add a hit
    pub fn add_hits(&self, hit: &ExampleHit) -> Result<()> {
        self.add_relation(HITS, hit)
    }

    /// Number of hits
    pub fn hits_len(&self) -> Result<usize> {
        Ok(self.relation_range(HITS)?.len())
    }
}

/// Collection of [`ExampleCluster`] records
pub type ExampleClusterCollection = Collection<ExampleCluster>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::example_hit::ExampleHitCollection;

    #[test]
    fn test_hits_relation() {
        let mut hits = ExampleHitCollection::new();
        let mut clusters = ExampleClusterCollection::new();
        let h0 = hits.create().unwrap();
        let h1 = hits.create().unwrap();
        h0.set_energy(2.0).unwrap();
        h1.set_energy(3.0).unwrap();

        let cluster = clusters.create().unwrap();
        cluster.add_hits(&h0).unwrap();
        cluster.add_hits(&h1).unwrap();
        let total: f64 = cluster.hits().unwrap().map(|h| h.energy().unwrap()).sum();
        cluster.set_energy(total).unwrap();

        assert_eq!(cluster.hits_len().unwrap(), 2);
        assert_eq!(cluster.energy().unwrap(), 5.0);
        assert_eq!(cluster.hits().unwrap().next().unwrap(), h0);
    }

    #[test]
    fn test_relation_survives_hit_handle_drop() {
        let mut hits = ExampleHitCollection::new();
        let cluster = ExampleCluster::with_energy(1.0);
        {
            let hit = hits.create().unwrap();
            cluster.add_hits(&hit).unwrap();
        }
        assert_eq!(cluster.hits().unwrap().len(), 1);
    }
}
