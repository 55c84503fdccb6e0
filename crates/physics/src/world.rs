use glam::DVec2;
use playfield_common::Rect;
use playfield_ecs::{BodyKind, Material, Node, Physical};

/// The simulation bounds.
///
/// A named physical body anchored at the origin: its box is the play area
/// and its force list holds exactly the gravity vector. Its material
/// elasticity is the restitution used when a body hits the bounds.
#[derive(Debug)]
pub struct World {
    node: Node,
    physical: Physical,
}

impl Default for World {
    fn default() -> Self {
        Self::new(DVec2::ZERO, Rect::new(0.0, 0.0, 320.0, 200.0))
    }
}

impl World {
    pub fn new(gravity: DVec2, play_area: Rect) -> Self {
        let mut physical = Physical::default();
        physical.set_kind(BodyKind::None);
        let mut world = Self {
            node: Node::new("world"),
            physical,
        };
        world.set_gravity(gravity);
        world.set_play_area(play_area);
        world
    }

    pub fn node(&self) -> &Node {
        &self.node
    }

    pub fn physical(&self) -> &Physical {
        &self.physical
    }

    pub fn gravity(&self) -> DVec2 {
        self.physical.forces().first().copied().unwrap_or(DVec2::ZERO)
    }

    /// Replace the world force list with `gravity`.
    pub fn set_gravity(&mut self, gravity: DVec2) {
        self.physical.clear_forces();
        self.physical.add_force(gravity);
    }

    /// Forces applied to every contained body on each pass.
    pub fn forces(&self) -> &[DVec2] {
        self.physical.forces()
    }

    pub fn play_area(&self) -> Rect {
        self.physical.bbox()
    }

    /// Resize the play area; it is always anchored at the origin.
    pub fn set_play_area(&mut self, area: Rect) {
        self.physical.set_position(DVec2::ZERO);
        self.physical.set_size(area.size);
    }

    pub fn material(&self) -> &Material {
        self.physical.material()
    }

    pub fn set_material(&mut self, material: Material) {
        self.physical.set_material(material);
    }

    pub fn elasticity(&self) -> f64 {
        self.physical.material().elasticity
    }

    pub fn set_elasticity(&mut self, elasticity: f64) {
        self.physical.material_mut().elasticity = elasticity;
    }

    /// True if `bbox` lies fully inside the play area.
    pub fn contains(&self, bbox: &Rect) -> bool {
        self.play_area().contains_rect(bbox)
    }
}
