use glam::DVec2;
use playfield_ecs::{Entity, EntityManager, Physical, Target};
use tracing::{info_span, trace};

use crate::world::World;

/// Integration limits and pass rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicsConfig {
    /// Acceleration magnitude cap.
    pub max_acceleration: f64,
    /// Velocity magnitude cap.
    pub max_velocity: f64,
    pub updates_per_second: f64,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            max_acceleration: 2.0,
            max_velocity: 4.0,
            updates_per_second: 120.0,
        }
    }
}

impl PhysicsConfig {
    /// Accumulated milliseconds needed before a pass runs.
    pub fn step_threshold(&self) -> f64 {
        1000.0 / self.updates_per_second
    }
}

/// Moves every dynamic body in an [`EntityManager`] inside a [`World`].
///
/// # Invariants
/// - A pass runs only once more than `1000 / ups` ms have accumulated; the
///   pass uses the current frame's elapsed time and any leftover is dropped.
/// - World forces are added only to bodies fully inside the play area.
/// - Forces are consumed by the pass that integrates them.
#[derive(Debug, Default)]
pub struct PhysicsEngine {
    world: World,
    config: PhysicsConfig,
    accumulated: f64,
    passes: u64,
    updated: usize,
}

impl PhysicsEngine {
    pub fn new(world: World, config: PhysicsConfig) -> Self {
        Self {
            world,
            config,
            ..Self::default()
        }
    }

    /// The simulated world.
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Mutable access to the world, e.g. to change gravity.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Current tuning.
    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    /// Mutable tuning; changes apply from the next pass.
    pub fn config_mut(&mut self) -> &mut PhysicsConfig {
        &mut self.config
    }

    /// Completed passes since creation.
    pub fn passes(&self) -> u64 {
        self.passes
    }

    /// Entities visited by the last pass.
    pub fn updated(&self) -> usize {
        self.updated
    }

    /// Elapsed ms not yet consumed by a pass.
    pub fn accumulated(&self) -> f64 {
        self.accumulated
    }

    /// Add `elapsed` ms to the accumulator and run a pass when it crosses
    /// the threshold. Returns whether a pass ran.
    pub fn advance(&mut self, store: &mut EntityManager, elapsed: f64) -> bool {
        self.accumulated += elapsed;
        if self.accumulated <= self.config.step_threshold() {
            return false;
        }
        self.integrate(store, elapsed);
        self.accumulated = 0.0;
        true
    }

    /// Run one pass over every active entity, then move the camera.
    /// Returns the number of entities visited.
    pub fn integrate(&mut self, store: &mut EntityManager, elapsed: f64) -> usize {
        let _span = info_span!("physics_pass", pass = self.passes, elapsed).entered();
        let world = &self.world;
        let config = &self.config;
        let mut updated = 0;
        store.walk_active_mut(&mut |entity| {
            update_entity(world, config, entity, elapsed);
            updated += 1;
        });
        follow_camera(store, elapsed);

        self.passes += 1;
        self.updated = updated;
        trace!(updated, "physics pass done");
        updated
    }
}

/// Age and integrate one entity. Returns whether the body was integrated.
pub fn update_entity(world: &World, config: &PhysicsConfig, entity: &mut Entity, elapsed: f64) -> bool {
    entity.update(elapsed);
    if !entity.is_active() {
        return false;
    }
    let Some(body) = entity.get_mut::<Physical>() else {
        return false;
    };
    if !body.is_dynamic() {
        return false;
    }

    apply_world_rules(world, body);

    let acceleration = (body.resultant() / body.mass()).clamp_length_max(config.max_acceleration);
    body.set_acceleration(acceleration);
    let velocity = (body.velocity() + acceleration * 0.5 * elapsed).clamp_length_max(config.max_velocity);
    body.set_velocity(velocity);
    body.set_position(body.position() + velocity * elapsed);

    constrain_to_play_area(world, body);

    let roughness = body.material().roughness;
    body.set_velocity(body.velocity() * roughness);
    body.clear_forces();

    entity.sync_graphic_bounds();
    true
}

fn apply_world_rules(world: &World, body: &mut Physical) {
    if world.contains(&body.bbox()) {
        body.extend_forces(world.forces());
    }
}

/// Clamp the body back inside the play area, reflecting and damping the
/// velocity on each axis it crossed.
fn constrain_to_play_area(world: &World, body: &mut Physical) {
    let area = world.play_area();
    if area.contains_rect(&body.bbox()) {
        return;
    }
    let restitution = world.elasticity();
    let (min, max) = (area.min(), area.max());
    let size = body.size();
    let mut position = body.position();
    let mut velocity = body.velocity();

    if position.x < min.x {
        position.x = min.x;
        velocity.x *= -restitution;
    }
    if position.x + size.x > max.x {
        position.x = max.x - size.x;
        velocity.x *= -restitution;
    }
    if position.y < min.y {
        position.y = min.y;
        velocity.y *= -restitution;
    }
    if position.y + size.y > max.y {
        position.y = max.y - size.y;
        velocity.y *= -restitution;
    }
    body.set_position(position);
    body.set_velocity(velocity);
}

/// Next camera position: move toward centring the target by a tween step.
pub fn tween_position(
    camera: DVec2,
    camera_size: DVec2,
    target: DVec2,
    target_size: DVec2,
    tween: f64,
    elapsed: f64,
) -> DVec2 {
    camera + (target + (target_size - camera_size) * 0.5 - camera) * tween * elapsed.min(1.0)
}

/// Move the store's camera toward its target, if both exist and the
/// target is active.
pub fn follow_camera(store: &mut EntityManager, elapsed: f64) {
    let Some(camera) = store.camera() else {
        return;
    };
    let (Some(name), Some(tween)) = (camera.target_name(), camera.target().map(Target::tween)) else {
        return;
    };
    let Some(entity) = store.find(name) else {
        trace!(follows = name, "camera target not found");
        return;
    };
    if !entity.is_active() {
        trace!(follows = name, "camera target inactive");
        return;
    }
    let Some(target) = entity.get::<Physical>() else {
        return;
    };
    let view = camera.viewport();
    let next = tween_position(view.position, view.size, target.position(), target.size(), tween, elapsed);
    if let Some(camera) = store.camera_mut() {
        camera.set_position(next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use playfield_common::Rect;
    use playfield_ecs::{BodyKind, Camera, Graphic, Material};

    const EPS: f64 = 1e-9;

    fn body(x: f64, y: f64, w: f64, h: f64) -> Physical {
        Physical::builder().position(x, y).size(w, h).build().unwrap()
    }

    fn engine(gravity: DVec2) -> PhysicsEngine {
        PhysicsEngine::new(
            World::new(gravity, Rect::new(0.0, 0.0, 320.0, 200.0)),
            PhysicsConfig::default(),
        )
    }

    fn physical<'a>(store: &'a EntityManager, name: &str) -> &'a Physical {
        store.find(name).unwrap().get::<Physical>().unwrap()
    }

    #[test]
    fn zero_force_motion_is_drift_free() {
        let mut engine = engine(DVec2::ZERO);
        let mut store = EntityManager::new();
        let mut b = body(100.0, 100.0, 8.0, 8.0);
        b.set_velocity(DVec2::new(0.1, -0.05));
        store.add(Entity::new("drifter").with(b).unwrap());

        let (passes, elapsed) = (50, 7.0);
        for _ in 0..passes {
            engine.integrate(&mut store, elapsed);
        }
        let p = physical(&store, "drifter");
        let expected = DVec2::new(100.0, 100.0) + DVec2::new(0.1, -0.05) * (passes as f64 * elapsed);
        assert!((p.position() - expected).length() < EPS);
        assert!((p.velocity() - DVec2::new(0.1, -0.05)).length() < EPS);
        assert_eq!(p.acceleration(), DVec2::ZERO);
    }

    #[test]
    fn one_shot_force_lasts_a_single_pass() {
        let mut engine = engine(DVec2::ZERO);
        let mut store = EntityManager::new();
        let mut b = body(100.0, 100.0, 8.0, 8.0);
        b.add_force(DVec2::new(0.5, 0.0));
        store.add(Entity::new("pushed").with(b).unwrap());

        engine.integrate(&mut store, 1.0);
        let p = physical(&store, "pushed");
        assert!((p.acceleration().x - 0.5).abs() < EPS);
        assert!((p.velocity().x - 0.25).abs() < EPS);
        assert!(p.forces().is_empty());

        engine.integrate(&mut store, 1.0);
        let p = physical(&store, "pushed");
        assert_eq!(p.acceleration(), DVec2::ZERO);
        assert!((p.velocity().x - 0.25).abs() < EPS);
    }

    #[test]
    fn gravity_applies_once_to_contained_bodies() {
        let mut engine = engine(DVec2::new(0.0, 0.01));
        let mut store = EntityManager::new();
        store.add(Entity::new("inside").with(body(100.0, 50.0, 8.0, 8.0)).unwrap());

        engine.integrate(&mut store, 1.0);
        let p = physical(&store, "inside");
        // one gravity force of 0.01 on mass 1
        assert!((p.acceleration().y - 0.01).abs() < EPS);
        assert!((p.velocity().y - 0.005).abs() < EPS);
        assert!(p.forces().is_empty());
    }

    #[test]
    fn escaped_bodies_get_no_world_forces() {
        let mut engine = engine(DVec2::new(0.0, 0.01));
        let mut store = EntityManager::new();
        // straddles the right edge, so it is not contained
        store.add(Entity::new("outside").with(body(316.0, 50.0, 8.0, 8.0)).unwrap());

        engine.integrate(&mut store, 1.0);
        assert_eq!(physical(&store, "outside").acceleration(), DVec2::ZERO);
    }

    #[test]
    fn left_edge_reflects_with_world_elasticity() {
        let mut engine = engine(DVec2::ZERO);
        engine.world_mut().set_elasticity(0.5);
        engine.config_mut().max_velocity = 10.0;
        let mut store = EntityManager::new();
        let mut b = body(1.0, 50.0, 10.0, 10.0);
        b.set_velocity(DVec2::new(-5.0, 0.0));
        store.add(Entity::new("ball").with(b).unwrap());

        engine.integrate(&mut store, 1.0);
        let p = physical(&store, "ball");
        assert_eq!(p.position().x, 0.0);
        assert!((p.velocity().x - 2.5).abs() < EPS);
        assert_eq!(p.velocity().y, 0.0);
    }

    #[test]
    fn bottom_right_corner_reflects_both_axes() {
        let mut engine = engine(DVec2::ZERO);
        let mut store = EntityManager::new();
        let mut b = body(315.0, 195.0, 4.0, 4.0);
        b.set_velocity(DVec2::new(2.0, 2.0));
        store.add(Entity::new("ball").with(b).unwrap());

        engine.integrate(&mut store, 1.0);
        let p = physical(&store, "ball");
        assert_eq!(p.position(), DVec2::new(316.0, 196.0));
        assert_eq!(p.velocity(), DVec2::new(-2.0, -2.0));
    }

    #[test]
    fn acceleration_and_velocity_are_clamped() {
        let mut engine = engine(DVec2::ZERO);
        let mut store = EntityManager::new();
        let mut b = body(100.0, 100.0, 1.0, 1.0);
        b.add_force(DVec2::new(30.0, 40.0));
        store.add(Entity::new("rocket").with(b).unwrap());

        engine.integrate(&mut store, 1.0);
        let p = physical(&store, "rocket");
        assert!((p.acceleration().length() - 2.0).abs() < EPS);
        assert!((p.velocity().length() - 1.0).abs() < EPS);

        store.find_mut("rocket").unwrap().get_mut::<Physical>().unwrap().add_force(DVec2::new(300.0, 400.0));
        engine.integrate(&mut store, 10.0);
        assert!((physical(&store, "rocket").velocity().length() - 4.0).abs() < EPS);
    }

    #[test]
    fn roughness_damps_velocity() {
        let mut engine = engine(DVec2::ZERO);
        let mut store = EntityManager::new();
        let mut b = Physical::builder()
            .position(100.0, 100.0)
            .size(4.0, 4.0)
            .velocity(1.0, 0.0)
            .material(Material::new("sand", 1.0, 1.0, 0.5))
            .build()
            .unwrap();
        b.set_acceleration(DVec2::ZERO);
        store.add(Entity::new("slow").with(b).unwrap());

        engine.integrate(&mut store, 1.0);
        let p = physical(&store, "slow");
        assert_eq!(p.position().x, 101.0);
        assert_eq!(p.velocity().x, 0.5);
    }

    #[test]
    fn static_and_shapeless_entities_are_left_alone() {
        let mut engine = engine(DVec2::new(0.0, 0.01));
        let mut store = EntityManager::new();
        let wall = Physical::builder()
            .position(10.0, 10.0)
            .size(4.0, 4.0)
            .velocity(1.0, 1.0)
            .kind(BodyKind::Static)
            .build()
            .unwrap();
        store.add(Entity::new("wall").with(wall).unwrap());
        store.add(Entity::new("label"));

        assert_eq!(engine.integrate(&mut store, 1.0), 2);
        assert_eq!(physical(&store, "wall").position(), DVec2::new(10.0, 10.0));
    }

    #[test]
    fn inactive_entities_are_skipped() {
        let mut engine = engine(DVec2::ZERO);
        let mut store = EntityManager::new();
        let mut b = body(100.0, 100.0, 4.0, 4.0);
        b.set_velocity(DVec2::new(1.0, 0.0));
        let mut e = Entity::new("sleeper").with(b).unwrap();
        e.set_active(false);
        store.add(e);

        assert_eq!(engine.integrate(&mut store, 1.0), 0);
        assert_eq!(physical(&store, "sleeper").position().x, 100.0);
    }

    #[test]
    fn expired_entities_stop_moving() {
        let mut engine = engine(DVec2::ZERO);
        let mut store = EntityManager::new();
        let mut b = body(100.0, 100.0, 4.0, 4.0);
        b.set_velocity(DVec2::new(1.0, 0.0));
        store.add(Entity::new("spark").with(b).unwrap().with_duration(1.5));

        engine.integrate(&mut store, 1.0);
        engine.integrate(&mut store, 1.0);
        let spark = store.get("spark").unwrap();
        assert!(!spark.is_active());
        assert_eq!(spark.get::<Physical>().unwrap().position().x, 101.0);
    }

    #[test]
    fn children_are_integrated_and_graphics_synced() {
        let mut engine = engine(DVec2::ZERO);
        let mut store = EntityManager::new();
        let mut b = body(20.0, 20.0, 4.0, 4.0);
        b.set_velocity(DVec2::new(0.0, 1.0));
        let child = Entity::new("turret")
            .with(b)
            .unwrap()
            .with(Graphic::default())
            .unwrap();
        store.add(Entity::new("ship").with_child(child));

        assert_eq!(engine.integrate(&mut store, 2.0), 2);
        let turret = store.find("turret").unwrap();
        assert_eq!(turret.get::<Physical>().unwrap().position(), DVec2::new(20.0, 22.0));
        assert_eq!(turret.get::<Graphic>().unwrap().bounds, Rect::new(20.0, 22.0, 4.0, 4.0));
    }

    #[test]
    fn accumulator_runs_a_pass_past_the_threshold() {
        let mut engine = engine(DVec2::ZERO);
        engine.config_mut().updates_per_second = 100.0;
        let mut store = EntityManager::new();
        let mut b = body(100.0, 100.0, 4.0, 4.0);
        b.set_velocity(DVec2::new(0.1, 0.0));
        store.add(Entity::new("walker").with(b).unwrap());

        assert!(!engine.advance(&mut store, 6.0));
        assert!(!engine.advance(&mut store, 4.0));
        assert_eq!(engine.passes(), 0);
        // 16 ms accumulated > 10 ms: one pass with this frame's 6 ms
        assert!(engine.advance(&mut store, 6.0));
        assert_eq!(engine.passes(), 1);
        assert_eq!(engine.accumulated(), 0.0);
        assert!((physical(&store, "walker").position().x - 100.6).abs() < EPS);
    }

    #[test]
    fn tween_converges_to_centred_target() {
        let camera_size = DVec2::new(320.0, 200.0);
        let target = DVec2::new(500.0, 300.0);
        let target_size = DVec2::new(16.0, 16.0);
        let fixed = target + (target_size - camera_size) * 0.5;
        // the centred position is a fixed point
        let same = tween_position(fixed, camera_size, target, target_size, 0.02, 16.0);
        assert!((same - fixed).length() < EPS);

        let mut cam = DVec2::ZERO;
        for _ in 0..2_000 {
            cam = tween_position(cam, camera_size, target, target_size, 0.02, 16.0);
        }
        assert!((cam - fixed).length() < 1e-6);
    }

    #[test]
    fn camera_follows_its_target() {
        let mut engine = engine(DVec2::ZERO);
        let mut store = EntityManager::new();
        store.add(
            Entity::new("player")
                .with(Physical::builder().position(200.0, 100.0).size(20.0, 20.0).kind(BodyKind::Static).build().unwrap())
                .unwrap(),
        );
        store.set_camera(Some(Camera::new("cam", 100.0, 100.0).with_target("player", 0.5).unwrap()));

        engine.integrate(&mut store, 1.0);
        // centred would be (160, 60); half way there
        assert_eq!(store.camera().unwrap().position(), DVec2::new(80.0, 30.0));
    }

    #[test]
    fn camera_without_target_stays_put() {
        let mut engine = engine(DVec2::ZERO);
        let mut store = EntityManager::new();
        store.set_camera(Some(Camera::new("cam", 100.0, 100.0).with_target("nobody", 0.5).unwrap()));
        engine.integrate(&mut store, 1.0);
        assert_eq!(store.camera().unwrap().position(), DVec2::ZERO);
    }

    #[test]
    fn camera_ignores_an_inactive_target() {
        let mut engine = engine(DVec2::ZERO);
        let mut store = EntityManager::new();
        let mut player = Entity::new("player")
            .with(Physical::builder().position(200.0, 100.0).size(20.0, 20.0).kind(BodyKind::Static).build().unwrap())
            .unwrap();
        player.set_active(false);
        store.add(player);
        store.set_camera(Some(Camera::new("cam", 100.0, 100.0).with_target("player", 0.5).unwrap()));

        engine.integrate(&mut store, 1.0);
        assert_eq!(store.camera().unwrap().position(), DVec2::ZERO);
    }
}
