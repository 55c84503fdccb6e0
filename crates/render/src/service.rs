use std::any::Any;

use glam::DVec2;
use playfield_common::{StatValue, Stats};
use playfield_ecs::EntityManager;
use playfield_kernel::{App, ConfigurationService, Service, ServiceError, ServiceKey, keys};
use playfield_physics::PhysicsService;
use tracing::{info, trace};

use crate::frame::RenderFrame;
use crate::renderer::Renderer;

/// Rendering service (priority 5): builds a [`RenderFrame`] from the entity
/// store every tick and hands it to a [`Renderer`]. The last output is kept.
pub struct RenderingService<R: Renderer> {
    renderer: R,
    buffer_size: DVec2,
    frames: u64,
    drawn: usize,
    last: Option<R::Output>,
}

impl<R: Renderer> ServiceKey for RenderingService<R> {
    const NAME: &'static str = "RenderingService";
}

impl<R: Renderer> RenderingService<R> {
    pub fn new(renderer: R) -> Self {
        Self {
            renderer,
            buffer_size: DVec2::new(320.0, 200.0),
            frames: 0,
            drawn: 0,
            last: None,
        }
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn last_output(&self) -> Option<&R::Output> {
        self.last.as_ref()
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn buffer_size(&self) -> DVec2 {
        self.buffer_size
    }
}

impl<R> Service for RenderingService<R>
where
    R: Renderer + 'static,
    R::Output: 'static,
{
    fn name(&self) -> &str {
        Self::NAME
    }

    fn priority(&self) -> i32 {
        5
    }

    fn init(&mut self, app: &mut App, _args: &[String]) -> Result<(), ServiceError> {
        app.require::<EntityManager>()?;
        if let Some(size) = app
            .get::<ConfigurationService>()
            .and_then(|config| config.size(keys::BUFFER_SIZE))
        {
            self.buffer_size = size.as_dvec2();
        }
        info!(buffer = %self.buffer_size, "rendering ready");
        Ok(())
    }

    fn process(&mut self, app: &mut App) -> Result<(), ServiceError> {
        let debug_level = app.debug_level();
        let play_area = if debug_level > 0 {
            app.get::<PhysicsService>().map(|p| p.world().play_area())
        } else {
            None
        };
        let store = app.require::<EntityManager>()?;
        let frame = RenderFrame::collect(store, self.frames)
            .with_debug(debug_level, play_area)
            .with_buffer_size(self.buffer_size);

        self.drawn = frame.len();
        self.last = Some(self.renderer.render(&frame));
        self.frames += 1;
        trace!(frame = frame.index, drawn = self.drawn, "frame rendered");
        Ok(())
    }

    fn dispose(&mut self, _app: &mut App) {
        info!(frames = self.frames, "rendering stopped");
    }

    fn stats(&self) -> Stats {
        let mut stats = Stats::new();
        stats.insert(
            "service.rendering.counter.drawn".into(),
            StatValue::from(self.drawn),
        );
        stats.insert(
            "service.rendering.counter.frames".into(),
            StatValue::from(self.frames),
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
