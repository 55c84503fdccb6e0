//! Entities and components of the playfield framework.
//!
//! An [`Entity`] holds at most one component per [`ComponentKind`] in a
//! kind-indexed array, owns its children, and may expire after a duration.
//! The [`EntityManager`] service stores top-level entities by name in a
//! BTreeMap, so iteration order is deterministic.
//!
//! # Invariants
//! - Component lookup by kind is O(1); duplicates are rejected.
//! - A physical body's bounding box always matches its position and size.
//! - Mass is strictly positive.
//! - Inactive entities and their subtrees are skipped by [`EntityManager::walk_active_mut`].

pub mod camera;
pub mod component;
pub mod entity;
pub mod error;
pub mod manager;
pub mod node;
pub mod physical;

pub use camera::Camera;
pub use component::{
    Component, ComponentKind, ComponentType, Gauge, Graphic, Grid, Priority, Shape, Target, Text,
};
pub use entity::Entity;
pub use error::EntityError;
pub use manager::EntityManager;
pub use node::Node;
pub use physical::{BodyKind, Material, Physical, PhysicalBuilder};
