use glam::DVec2;
use playfield_common::Rect;
use serde::Serialize;

use crate::component::Target;
use crate::entity::Entity;
use crate::error::EntityError;
use crate::physical::{BodyKind, Physical};

/// A viewport that can follow an entity.
///
/// The camera is an entity with a [`Physical`] (its viewport box) and a
/// [`Target`] naming the tracked entity. It is never integrated by physics;
/// the engine only moves it through the tween.
#[derive(Debug, Serialize)]
#[serde(transparent)]
pub struct Camera {
    entity: Entity,
}

impl Camera {
    pub fn new(name: impl Into<String>, width: f64, height: f64) -> Self {
        let mut physical = Physical::default();
        physical.set_kind(BodyKind::None);
        physical.set_size(DVec2::new(width, height));

        let mut entity = Entity::new(name);
        entity.replace_component(physical);
        entity.replace_component(Target::default());
        Self { entity }
    }

    pub fn with_target(mut self, target: impl Into<String>, tween: f64) -> Result<Self, EntityError> {
        self.set_target(target, tween)?;
        Ok(self)
    }

    /// Follow `target`. An invalid tween leaves the current target untouched.
    pub fn set_target(&mut self, target: impl Into<String>, tween: f64) -> Result<(), EntityError> {
        self.entity.replace_component(Target::new(target, tween)?);
        Ok(())
    }

    pub fn target(&self) -> Option<&Target> {
        self.entity.get::<Target>()
    }

    pub fn target_name(&self) -> Option<&str> {
        self.target().and_then(|t| t.target.as_deref())
    }

    pub fn name(&self) -> &str {
        self.entity.name()
    }

    pub fn position(&self) -> DVec2 {
        self.viewport().position
    }

    pub fn set_position(&mut self, position: DVec2) {
        if let Some(physical) = self.entity.get_mut::<Physical>() {
            physical.set_position(position);
        }
    }

    pub fn set_viewport_size(&mut self, width: f64, height: f64) {
        if let Some(physical) = self.entity.get_mut::<Physical>() {
            physical.set_size(DVec2::new(width, height));
        }
    }

    /// The area of the world the camera shows.
    pub fn viewport(&self) -> Rect {
        self.entity
            .get::<Physical>()
            .map(Physical::bbox)
            .unwrap_or_default()
    }

    /// True if the entity's box is inside or overlaps the viewport.
    /// Entities without a [`Physical`] are never in view.
    pub fn has_entity_in_view(&self, entity: &Entity) -> bool {
        let Some(physical) = entity.get::<Physical>() else {
            return false;
        };
        let viewport = self.viewport();
        let bbox = physical.bbox();
        viewport.contains_rect(&bbox) || viewport.intersects(&bbox)
    }

    pub fn entity(&self) -> &Entity {
        &self.entity
    }

    pub fn entity_mut(&mut self) -> &mut Entity {
        &mut self.entity
    }
}
