use std::any::Any;

use glam::DVec2;
use playfield_common::{Rect, StatValue, Stats};
use playfield_ecs::EntityManager;
use playfield_kernel::{App, ConfigurationService, Service, ServiceError, ServiceKey, keys};
use tracing::{debug, info, trace};

use crate::clock::Clock;
use crate::engine::{PhysicsConfig, PhysicsEngine};
use crate::world::World;

const DEFAULT_PLAY_AREA: Rect = Rect {
    position: DVec2::ZERO,
    size: DVec2::new(320.0, 200.0),
};

/// Physics service (priority 2): feeds measured elapsed time to a
/// [`PhysicsEngine`] that moves the entities of the [`EntityManager`].
#[derive(Debug)]
pub struct PhysicsService {
    engine: PhysicsEngine,
    clock: Clock,
    last_elapsed: f64,
}

impl Default for PhysicsService {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceKey for PhysicsService {
    const NAME: &'static str = "PhysicsEngine";
}

impl PhysicsService {
    pub fn new() -> Self {
        Self::with_clock(Clock::system())
    }

    pub fn with_clock(clock: Clock) -> Self {
        Self {
            engine: PhysicsEngine::default(),
            clock,
            last_elapsed: 0.0,
        }
    }

    pub fn engine(&self) -> &PhysicsEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut PhysicsEngine {
        &mut self.engine
    }

    pub fn world(&self) -> &World {
        self.engine.world()
    }

    pub fn world_mut(&mut self) -> &mut World {
        self.engine.world_mut()
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }
}

impl Service for PhysicsService {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn priority(&self) -> i32 {
        2
    }

    fn init(&mut self, app: &mut App, _args: &[String]) -> Result<(), ServiceError> {
        app.require::<EntityManager>()?;

        let (gravity, play_area, ups) = match app.get::<ConfigurationService>() {
            Some(config) => (
                config.vec2_or(keys::GRAVITY, DVec2::ZERO),
                config.area_or(keys::PLAY_AREA, DEFAULT_PLAY_AREA),
                config.float_or(keys::UPDATE_RATE, PhysicsConfig::default().updates_per_second),
            ),
            None => {
                debug!("no configuration service, physics uses defaults");
                (DVec2::ZERO, DEFAULT_PLAY_AREA, PhysicsConfig::default().updates_per_second)
            }
        };

        let config = PhysicsConfig {
            updates_per_second: if ups > 0.0 { ups } else { PhysicsConfig::default().updates_per_second },
            ..PhysicsConfig::default()
        };
        self.engine = PhysicsEngine::new(World::new(gravity, play_area), config);
        self.clock.start();
        info!(
            gravity = %gravity,
            play_area = %play_area,
            ups = config.updates_per_second,
            fixed_clock = self.clock.is_fixed(),
            "physics engine ready"
        );
        Ok(())
    }

    fn process(&mut self, app: &mut App) -> Result<(), ServiceError> {
        let elapsed = self.clock.tick();
        self.last_elapsed = elapsed;
        let store = app.require_mut::<EntityManager>()?;
        if self.engine.advance(store, elapsed) {
            trace!(elapsed, updated = self.engine.updated(), "physics step");
        }
        Ok(())
    }

    fn stats(&self) -> Stats {
        let mut stats = Stats::new();
        stats.insert(
            "service.physic.engine.updated".into(),
            StatValue::from(self.engine.updated()),
        );
        stats.insert(
            "service.physic.engine.ups".into(),
            StatValue::from(self.engine.config().updates_per_second),
        );
        stats.insert(
            "service.physic.engine.passes".into(),
            StatValue::from(self.engine.passes()),
        );
        stats
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
