//! Scene lifecycle for the playfield framework.
//!
//! A [`Scene`] builds entities into its [`SceneBase`]; the [`SceneManager`]
//! service moves them into the entity store when the scene becomes current
//! and switches scenes when the current one requests it.
//!
//! Scenes are created by name from factories registered on
//! [`SceneManager::builder`], so no runtime type lookup is involved.

pub mod manager;
pub mod scene;

pub use manager::{SceneFactory, SceneManager, SceneManagerBuilder};
pub use scene::{Scene, SceneBase, SceneError};
