//! Physics for playfield entities.
//!
//! Each pass accumulates forces (world forces only for bodies fully inside
//! the play area), integrates semi-implicitly with clamped acceleration and
//! velocity, keeps bodies inside the world bounds with restitution, and eases
//! the camera toward its target.
//!
//! Physics never talks to the scene layer: the camera lives in the
//! [`playfield_ecs::EntityManager`].

pub mod clock;
pub mod engine;
pub mod service;
pub mod world;

pub use clock::Clock;
pub use engine::{PhysicsConfig, PhysicsEngine, follow_camera, tween_position, update_entity};
pub use service::PhysicsService;
pub use world::World;
