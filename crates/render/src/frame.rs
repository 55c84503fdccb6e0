use glam::DVec2;
use playfield_common::{Color, Rect};
use playfield_ecs::{Entity, EntityManager, Gauge, Graphic, Grid, Physical, Priority, Shape, Text};
use serde::Serialize;

/// What a drawable shows besides its outline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum DrawKind {
    Shape,
    Text(String),
    Gauge { ratio: f64, color: Color },
    Grid { tile_width: u32, tile_height: u32, area: Rect },
}

/// One entity resolved for drawing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Drawable {
    pub name: String,
    pub priority: i32,
    pub bounds: Rect,
    pub shape: Shape,
    pub color: Option<Color>,
    pub fill: Option<Color>,
    pub kind: DrawKind,
}

impl Drawable {
    fn from_entity(entity: &Entity, graphic: &Graphic) -> Self {
        let bounds = entity
            .get::<Physical>()
            .map(Physical::bbox)
            .unwrap_or(graphic.bounds);
        let kind = if let Some(text) = entity.get::<Text>() {
            DrawKind::Text(text.render())
        } else if let Some(gauge) = entity.get::<Gauge>() {
            DrawKind::Gauge {
                ratio: gauge.ratio(),
                color: gauge.color,
            }
        } else if let Some(grid) = entity.get::<Grid>() {
            DrawKind::Grid {
                tile_width: grid.tile_width,
                tile_height: grid.tile_height,
                area: grid.area,
            }
        } else {
            DrawKind::Shape
        };
        Self {
            name: entity.name().to_string(),
            priority: entity.get::<Priority>().map_or(0, |p| p.0),
            bounds,
            shape: graphic.shape,
            color: graphic.color,
            fill: graphic.fill_color,
            kind,
        }
    }
}

/// Everything a renderer needs for one frame, already culled and sorted.
///
/// # Invariants
/// - `world` and `overlay` are sorted by ascending priority; ties keep
///   store order.
/// - `world` holds no sticky drawables and, when a camera exists, only
///   entities in its viewport.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RenderFrame {
    pub index: u64,
    pub debug_level: u8,
    pub buffer_size: DVec2,
    /// Translation applied to world-space drawables.
    pub camera_offset: DVec2,
    pub viewport: Option<Rect>,
    pub play_area: Option<Rect>,
    pub world: Vec<Drawable>,
    pub overlay: Vec<Drawable>,
}

impl RenderFrame {
    /// Resolve every active entity with a [`Graphic`] from the store.
    pub fn collect(store: &EntityManager, index: u64) -> Self {
        let camera = store.camera();
        let mut world = Vec::new();
        let mut overlay = Vec::new();
        store.walk_active(&mut |entity| {
            let Some(graphic) = entity.get::<Graphic>() else {
                return;
            };
            if graphic.stick_to_viewport {
                overlay.push(Drawable::from_entity(entity, graphic));
            } else if camera.is_none_or(|c| c.has_entity_in_view(entity)) {
                world.push(Drawable::from_entity(entity, graphic));
            }
        });
        world.sort_by_key(|d| d.priority);
        overlay.sort_by_key(|d| d.priority);

        Self {
            index,
            camera_offset: camera.map_or(DVec2::ZERO, |c| c.position()),
            viewport: camera.map(|c| c.viewport()),
            world,
            overlay,
            ..Self::default()
        }
    }

    pub fn with_debug(mut self, level: u8, play_area: Option<Rect>) -> Self {
        self.debug_level = level;
        self.play_area = if level > 0 { play_area } else { None };
        self
    }

    pub fn with_buffer_size(mut self, size: DVec2) -> Self {
        self.buffer_size = size;
        self
    }

    pub fn len(&self) -> usize {
        self.world.len() + self.overlay.len()
    }

    pub fn is_empty(&self) -> bool {
        self.world.is_empty() && self.overlay.is_empty()
    }

    /// World drawables then overlay drawables, in draw order.
    pub fn draw_order(&self) -> impl Iterator<Item = &Drawable> {
        self.world.iter().chain(self.overlay.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use playfield_ecs::Camera;

    fn drawable(name: &str, x: f64, priority: i32) -> Entity {
        Entity::new(name)
            .with(Physical::builder().position(x, 10.0).size(8.0, 8.0).build().unwrap())
            .unwrap()
            .with(Graphic::default())
            .unwrap()
            .with(Priority(priority))
            .unwrap()
    }

    #[test]
    fn sorted_by_priority_with_stable_ties() {
        let mut store = EntityManager::new();
        store.add(drawable("c", 10.0, 1));
        store.add(drawable("a", 10.0, 1));
        store.add(drawable("b", 10.0, -5));
        let frame = RenderFrame::collect(&store, 0);
        let names: Vec<&str> = frame.world.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["b", "a", "c"]);
    }

    #[test]
    fn sticky_drawables_go_to_the_overlay() {
        let mut store = EntityManager::new();
        store.add(drawable("player", 10.0, 1));
        store.add(
            Entity::new("score")
                .with(Graphic::default().sticky())
                .unwrap()
                .with(Text::new("{}").with_value(120))
                .unwrap(),
        );
        let frame = RenderFrame::collect(&store, 0);
        assert_eq!(frame.world.len(), 1);
        assert_eq!(frame.overlay[0].kind, DrawKind::Text("120".into()));
        let order: Vec<&str> = frame.draw_order().map(|d| d.name.as_str()).collect();
        assert_eq!(order, vec!["player", "score"]);
    }

    #[test]
    fn camera_culls_world_drawables() {
        let mut store = EntityManager::new();
        store.add(drawable("near", 10.0, 0));
        store.add(drawable("far", 1_000.0, 0));
        let mut hidden = drawable("hidden", 10.0, 0);
        hidden.set_active(false);
        store.add(hidden);
        store.set_camera(Some(Camera::new("cam", 320.0, 200.0)));

        let frame = RenderFrame::collect(&store, 3);
        let names: Vec<&str> = frame.world.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["near"]);
        assert_eq!(frame.viewport, Some(Rect::new(0.0, 0.0, 320.0, 200.0)));
        assert_eq!(frame.index, 3);
    }

    #[test]
    fn play_area_only_when_debugging() {
        let area = Some(Rect::new(0.0, 0.0, 320.0, 200.0));
        let store = EntityManager::new();
        assert_eq!(RenderFrame::collect(&store, 0).with_debug(0, area).play_area, None);
        assert_eq!(RenderFrame::collect(&store, 0).with_debug(2, area).play_area, area);
    }
}
