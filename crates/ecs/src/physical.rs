use glam::DVec2;
use playfield_common::Rect;
use serde::{Deserialize, Serialize};

use crate::error::EntityError;

/// How the physics engine treats a body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BodyKind {
    /// Ignored by physics.
    None,
    /// Never moves on its own.
    Static,
    /// Integrated every pass.
    #[default]
    Dynamic,
}

/// Physical properties used by the physics engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub name: String,
    pub density: f64,
    /// Restitution factor applied on boundary hits (for the world material).
    pub elasticity: f64,
    /// Velocity multiplier applied after every pass.
    pub roughness: f64,
}

impl Material {
    pub fn new(name: impl Into<String>, density: f64, elasticity: f64, roughness: f64) -> Self {
        Self {
            name: name.into(),
            density,
            elasticity,
            roughness,
        }
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::new("default", 1.0, 1.0, 1.0)
    }
}

/// Position, motion and mass of an entity.
///
/// The bounding box is derived: every position or size setter recomputes it
/// before returning.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Physical {
    position: DVec2,
    size: DVec2,
    velocity: DVec2,
    acceleration: DVec2,
    forces: Vec<DVec2>,
    mass: f64,
    material: Material,
    kind: BodyKind,
    bbox: Rect,
}

impl Default for Physical {
    fn default() -> Self {
        Self {
            position: DVec2::ZERO,
            size: DVec2::ZERO,
            velocity: DVec2::ZERO,
            acceleration: DVec2::ZERO,
            forces: Vec::new(),
            mass: 1.0,
            material: Material::default(),
            kind: BodyKind::Dynamic,
            bbox: Rect::default(),
        }
    }
}

impl Physical {
    pub fn builder() -> PhysicalBuilder {
        PhysicalBuilder::default()
    }

    pub fn position(&self) -> DVec2 {
        self.position
    }

    pub fn set_position(&mut self, position: DVec2) {
        self.position = position;
        self.bbox = Rect::from_pos_size(self.position, self.size);
    }

    pub fn size(&self) -> DVec2 {
        self.size
    }

    pub fn set_size(&mut self, size: DVec2) {
        self.size = size;
        self.bbox = Rect::from_pos_size(self.position, self.size);
    }

    pub fn velocity(&self) -> DVec2 {
        self.velocity
    }

    pub fn set_velocity(&mut self, velocity: DVec2) {
        self.velocity = velocity;
    }

    pub fn acceleration(&self) -> DVec2 {
        self.acceleration
    }

    pub fn set_acceleration(&mut self, acceleration: DVec2) {
        self.acceleration = acceleration;
    }

    pub fn forces(&self) -> &[DVec2] {
        &self.forces
    }

    pub fn add_force(&mut self, force: DVec2) {
        self.forces.push(force);
    }

    pub fn extend_forces(&mut self, forces: &[DVec2]) {
        self.forces.extend_from_slice(forces);
    }

    pub fn clear_forces(&mut self) {
        self.forces.clear();
    }

    /// Sum of the pending forces.
    pub fn resultant(&self) -> DVec2 {
        self.forces.iter().copied().sum()
    }

    pub fn mass(&self) -> f64 {
        self.mass
    }

    pub fn set_mass(&mut self, mass: f64) -> Result<(), EntityError> {
        if !(mass > 0.0) {
            return Err(EntityError::InvalidMass(mass));
        }
        self.mass = mass;
        Ok(())
    }

    pub fn material(&self) -> &Material {
        &self.material
    }

    pub fn material_mut(&mut self) -> &mut Material {
        &mut self.material
    }

    pub fn set_material(&mut self, material: Material) {
        self.material = material;
    }

    pub fn kind(&self) -> BodyKind {
        self.kind
    }

    pub fn set_kind(&mut self, kind: BodyKind) {
        self.kind = kind;
    }

    pub fn is_dynamic(&self) -> bool {
        self.kind == BodyKind::Dynamic
    }

    pub fn bbox(&self) -> Rect {
        self.bbox
    }
}

/// Builder for [`Physical`]; validates the mass on `build`.
#[derive(Debug, Clone, Default)]
pub struct PhysicalBuilder {
    inner: Physical,
}

impl PhysicalBuilder {
    pub fn position(mut self, x: f64, y: f64) -> Self {
        self.inner.set_position(DVec2::new(x, y));
        self
    }

    pub fn size(mut self, width: f64, height: f64) -> Self {
        self.inner.set_size(DVec2::new(width, height));
        self
    }

    pub fn velocity(mut self, x: f64, y: f64) -> Self {
        self.inner.velocity = DVec2::new(x, y);
        self
    }

    pub fn force(mut self, force: DVec2) -> Self {
        self.inner.forces.push(force);
        self
    }

    pub fn mass(mut self, mass: f64) -> Self {
        self.inner.mass = mass;
        self
    }

    pub fn material(mut self, material: Material) -> Self {
        self.inner.material = material;
        self
    }

    pub fn kind(mut self, kind: BodyKind) -> Self {
        self.inner.kind = kind;
        self
    }

    pub fn build(self) -> Result<Physical, EntityError> {
        if !(self.inner.mass > 0.0) {
            return Err(EntityError::InvalidMass(self.inner.mass));
        }
        Ok(self.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setters_keep_bbox_in_sync() {
        let mut p = Physical::default();
        p.set_position(DVec2::new(10.0, 20.0));
        p.set_size(DVec2::new(4.0, 8.0));
        assert_eq!(p.bbox(), Rect::new(10.0, 20.0, 4.0, 8.0));
        p.set_position(DVec2::new(-1.0, 0.0));
        assert_eq!(p.bbox(), Rect::new(-1.0, 0.0, 4.0, 8.0));
    }

    #[test]
    fn builder_rejects_non_positive_mass() {
        assert_eq!(
            Physical::builder().mass(0.0).build(),
            Err(EntityError::InvalidMass(0.0))
        );
        assert!(Physical::builder().mass(-2.0).build().is_err());
        assert!(Physical::builder().mass(f64::NAN).build().is_err());
    }

    #[test]
    fn set_mass_validates() {
        let mut p = Physical::default();
        assert!(p.set_mass(0.0).is_err());
        assert_eq!(p.mass(), 1.0);
        p.set_mass(60.0).unwrap();
        assert_eq!(p.mass(), 60.0);
    }

    #[test]
    fn builder_sets_everything() {
        let p = Physical::builder()
            .position(100.0, 100.0)
            .size(16.0, 18.0)
            .velocity(1.0, 0.0)
            .mass(60.0)
            .material(Material::new("player", 1.0, 1.0, 0.99))
            .kind(BodyKind::Static)
            .force(DVec2::new(0.0, 1.0))
            .build()
            .unwrap();
        assert_eq!(p.bbox(), Rect::new(100.0, 100.0, 16.0, 18.0));
        assert_eq!(p.velocity(), DVec2::new(1.0, 0.0));
        assert_eq!(p.material().roughness, 0.99);
        assert_eq!(p.kind(), BodyKind::Static);
        assert_eq!(p.resultant(), DVec2::new(0.0, 1.0));
    }

    #[test]
    fn forces_accumulate_and_clear() {
        let mut p = Physical::default();
        p.add_force(DVec2::new(1.0, 0.0));
        p.extend_forces(&[DVec2::new(0.0, 2.0), DVec2::new(1.0, 1.0)]);
        assert_eq!(p.resultant(), DVec2::new(2.0, 3.0));
        p.clear_forces();
        assert!(p.forces().is_empty());
    }
}
