use glam::DVec2;
use playfield_common::{Color, Rect, splitmix64, unit_f64};
use playfield_ecs::{
    BodyKind, Camera, Entity, EntityManager, Gauge, Graphic, Grid, Material, Physical, Priority,
    Shape, Text,
};
use playfield_input::{InputService, Key};
use playfield_kernel::App;
use playfield_physics::PhysicsService;
use playfield_scene::{Scene, SceneBase, SceneError};
use tracing::{debug, info};

const PLAYER: &str = "player";
const MAX_DEBUG_LEVEL: u8 = 5;

/// Deterministic sequence of floats in `[0, 1)`.
struct Placement(u64);

impl Placement {
    fn next(&mut self) -> f64 {
        self.0 = splitmix64(self.0);
        unit_f64(self.0)
    }
}

/// The demo scene: a player steered with the arrow keys, a score, an
/// energy gauge, a background grid and a swarm of bouncing enemies.
///
/// `D` cycles the debug level, `G` reverses gravity.
pub struct PlayScene {
    base: SceneBase,
    enemies: usize,
    seed: u64,
}

impl PlayScene {
    pub fn new(name: &str) -> Self {
        Self {
            base: SceneBase::new(name),
            enemies: 10,
            seed: 42,
        }
    }

    pub fn with_enemies(mut self, enemies: usize) -> Self {
        self.enemies = enemies;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    fn spawn_enemies(&mut self) -> Result<(), SceneError> {
        let mut placement = Placement(self.seed);
        for i in 0..self.enemies {
            let physical = Physical::builder()
                .material(Material::new("enemy_mat", 1.0, 0.2, 1.12))
                .mass(placement.next() * 100.0 + 10.0)
                .position(
                    -160.0 + placement.next() * 320.0,
                    -100.0 + placement.next() * 200.0,
                )
                .velocity(
                    -0.000_01 + placement.next() * 0.000_02,
                    -0.000_01 + placement.next() * 0.000_02,
                )
                .size(8.0, 8.0)
                .build()?;
            let enemy = Entity::new(format!("enemy_{i}"))
                .with(
                    Graphic::new(Shape::Ellipse)
                        .with_color(Some(Color::CYAN))
                        .with_fill(Some(Color::BLUE)),
                )?
                .with(physical)?
                .with(Priority(2 + i as i32))?;
            self.base.add(enemy);
        }
        Ok(())
    }
}

/// Force applied to the player for the arrow keys currently held.
fn steering(input: &InputService) -> DVec2 {
    let mut force = DVec2::ZERO;
    if input.is_pressed(Key::Up) {
        force.y -= 0.0005;
    }
    if input.is_pressed(Key::Down) {
        force.y += 0.0002;
    }
    if input.is_pressed(Key::Left) {
        force.x -= 0.0002;
    }
    if input.is_pressed(Key::Right) {
        force.x += 0.0002;
    }
    force
}

impl Scene for PlayScene {
    fn base(&self) -> &SceneBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut SceneBase {
        &mut self.base
    }

    fn create(&mut self, app: &mut App) -> Result<(), SceneError> {
        let play_area = app
            .get::<PhysicsService>()
            .map_or(Rect::new(0.0, 0.0, 320.0, 200.0), |physics| {
                physics.world().play_area()
            });

        let player = Entity::new(PLAYER)
            .with(
                Graphic::new(Shape::Rectangle)
                    .with_color(Some(Color::WHITE))
                    .with_fill(Some(Color::RED)),
            )?
            .with(
                Physical::builder()
                    .material(Material::new("player_mat", 1.0, 1.0, 0.99))
                    .mass(60.0)
                    .position(100.0, 100.0)
                    .size(16.0, 18.0)
                    .build()?,
            )?
            .with(Priority(1))?;
        self.base
            .set_camera(Camera::new("cam01", 320.0, 200.0).with_target(PLAYER, 0.02)?);
        self.base.add(player);

        let score = Entity::new("score")
            .with(Graphic::default().with_color(None).sticky())?
            .with(
                Physical::builder()
                    .position(10.0, 32.0)
                    .kind(BodyKind::Static)
                    .build()?,
            )?
            .with(Text::new("{}").with_value("00000").with_color(Color::WHITE))?
            .with(Priority(2))?;
        self.base.add(score);

        let energy = Entity::new("energy")
            .with(
                Graphic::default()
                    .with_color(Some(Color::WHITE))
                    .with_fill(Some(Color::BLACK))
                    .sticky(),
            )?
            .with(
                Physical::builder()
                    .position(270.0, 28.0)
                    .size(40.0, 6.0)
                    .kind(BodyKind::Static)
                    .build()?,
            )?
            .with(Gauge::new(100.0, 0.0, 100.0).with_color(Color::RED))?
            .with(Priority(2))?;
        self.base.add(energy);

        self.spawn_enemies()?;

        let grid = Entity::new("grid")
            .with(Graphic::default().with_color(Some(Color::GRAY)))?
            .with(
                Physical::builder()
                    .position(play_area.position.x, play_area.position.y)
                    .size(play_area.width(), play_area.height())
                    .build()?,
            )?
            .with(Grid::new(16, 16).with_area(play_area))?
            .with(Priority(-10))?;
        self.base.add(grid);

        info!(
            scene = self.name(),
            entities = self.base.entities().len(),
            "play scene created"
        );
        Ok(())
    }

    fn update(&mut self, app: &mut App) -> Result<(), SceneError> {
        let Some(input) = app.get::<InputService>() else {
            return Ok(());
        };
        let force = steering(input);
        let cycle_debug = input.just_released(Key::Char('D'));
        let flip_gravity = input.just_released(Key::Char('G'));

        if force != DVec2::ZERO {
            let store = app.require_mut::<EntityManager>()?;
            if let Some(physical) = store
                .find_mut(PLAYER)
                .and_then(|player| player.get_mut::<Physical>())
            {
                physical.add_force(force);
            }
        }

        if cycle_debug {
            let level = app.debug_level();
            let next = if level < MAX_DEBUG_LEVEL { level + 1 } else { 0 };
            app.set_debug_level(next);
            debug!(level = next, "debug level changed");
        }

        if flip_gravity {
            if let Some(physics) = app.get_mut::<PhysicsService>() {
                let gravity = -physics.world().gravity();
                physics.world_mut().set_gravity(gravity);
                info!(%gravity, "gravity reversed");
            }
        }
        Ok(())
    }
}
