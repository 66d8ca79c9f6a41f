//! Minimal datatypes for unit tests of this crate

use crate::base::{CollectionBase, CollectionProvider};
use crate::datatype::{Datatype, RelationField, RelationFields};
use crate::handle::Handle;
use crate::relation::RelationIter;
use hepstore_core::{CollectionId, Result};
use smallvec::smallvec;
use std::ops::Deref;

/// Record with a single integer and no relations
#[derive(Clone, Debug)]
pub struct Blob(Handle<Blob>);

impl Datatype for Blob {
    const TYPE_NAME: &'static str = "test::Blob";
    const SCHEMA_VERSION: u32 = 1;
    type Data = i64;

    fn from_handle(handle: Handle<Self>) -> Self {
        Blob(handle)
    }

    fn handle(&self) -> &Handle<Self> {
        &self.0
    }
}

impl Deref for Blob {
    type Target = Handle<Blob>;

    fn deref(&self) -> &Handle<Blob> {
        &self.0
    }
}

/// Record with an integer value and a self-referencing `children` relation
#[derive(Clone, Debug)]
pub struct Node(Handle<Node>);

impl Node {
    pub fn new(value: i64) -> Self {
        Node(Handle::with_data(value))
    }

    pub fn value(&self) -> i64 {
        self.0.data().map(|v| *v).unwrap_or_default()
    }

    pub fn add_child(&self, child: &Node) -> Result<()> {
        self.0.add_relation(0, child)
    }

    pub fn children(&self) -> Result<RelationIter<Node>> {
        self.0.relation(0)
    }
}

impl Datatype for Node {
    const TYPE_NAME: &'static str = "test::Node";
    const SCHEMA_VERSION: u32 = 1;
    type Data = i64;

    fn relation_fields() -> RelationFields {
        smallvec![RelationField::to::<Node>("children")]
    }

    fn from_handle(handle: Handle<Self>) -> Self {
        Node(handle)
    }

    fn handle(&self) -> &Handle<Self> {
        &self.0
    }
}

impl Deref for Node {
    type Target = Handle<Node>;

    fn deref(&self) -> &Handle<Node> {
        &self.0
    }
}

/// Record with two relations to `Node`
#[derive(Clone, Debug)]
pub struct Pair(Handle<Pair>);

impl Pair {
    pub fn new() -> Self {
        Pair(Handle::new())
    }

    pub fn add_left(&self, node: &Node) -> Result<()> {
        self.0.add_relation(0, node)
    }

    pub fn add_right(&self, node: &Node) -> Result<()> {
        self.0.add_relation(1, node)
    }

    pub fn right(&self) -> Result<RelationIter<Node>> {
        self.0.relation(1)
    }
}

impl Datatype for Pair {
    const TYPE_NAME: &'static str = "test::Pair";
    const SCHEMA_VERSION: u32 = 1;
    type Data = i64;

    fn relation_fields() -> RelationFields {
        smallvec![
            RelationField::to::<Node>("left"),
            RelationField::to::<Node>("right"),
        ]
    }

    fn from_handle(handle: Handle<Self>) -> Self {
        Pair(handle)
    }

    fn handle(&self) -> &Handle<Self> {
        &self.0
    }
}

impl Deref for Pair {
    type Target = Handle<Pair>;

    fn deref(&self) -> &Handle<Pair> {
        &self.0
    }
}

/// Provider exposing exactly one collection under its own ID
pub struct SingleProvider<'a>(pub &'a dyn CollectionBase);

impl CollectionProvider for SingleProvider<'_> {
    fn collection(&self, id: CollectionId) -> Option<&dyn CollectionBase> {
        (self.0.id() == id).then_some(self.0)
    }
}
