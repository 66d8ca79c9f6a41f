//! Record with relations to clusters and to its own type

use crate::example_cluster::ExampleCluster;
use hepstore_core::{Result, SchemaVersion};
use hepstore_model::{Collection, Datatype, Handle, RelationField, RelationFields, RelationIter};
use smallvec::smallvec;

handle_type! {
    /// Record without fields that only carries relations
    ExampleReferencingType
}

const CLUSTERS: usize = 0;
const REFS: usize = 1;

impl Datatype for ExampleReferencingType {
    const TYPE_NAME: &'static str = "ExampleReferencingType";
    const SCHEMA_VERSION: SchemaVersion = 1;
    type Data = ();

    fn relation_fields() -> RelationFields {
        smallvec![
            RelationField::to::<ExampleCluster>("clusters"),
            RelationField::to::<ExampleReferencingType>("refs"),
        ]
    }

    fn from_handle(handle: Handle<Self>) -> Self {
        Self(handle)
    }

    fn handle(&self) -> &Handle<Self> {
        &self.0
    }
}

impl ExampleReferencingType {
    /// Referenced clusters
    pub fn clusters(&self) -> Result<RelationIter<ExampleCluster>> {
        self.relation(CLUSTERS)
    }

    /// Add a referenced cluster
    pub fn add_clusters(&self, cluster: &ExampleCluster) -> Result<()> {
        self.add_relation(CLUSTERS, cluster)
    }

    /// Referenced records of the same type
    pub fn refs(&self) -> Result<RelationIter<ExampleReferencingType>> {
        self.relation(REFS)
    }

    /// Add a referenced record of the same type
    pub fn add_refs(&self, other: &ExampleReferencingType) -> Result<()> {
        self.add_relation(REFS, other)
    }
}

/// Collection of [`ExampleReferencingType`] records
pub type ExampleReferencingTypeCollection = Collection<ExampleReferencingType>;
