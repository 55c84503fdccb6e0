use playfield_ecs::{Camera, Entity, EntityError};
use playfield_kernel::{App, ServiceError};

/// Errors raised by scenes and the scene manager.
#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    #[error("no scene named `{0}`")]
    UnknownScene(String),
    #[error("scene `{scene}` refers to unregistered factory `{factory}`")]
    UnknownFactory { scene: String, factory: String },
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error(transparent)]
    Entity(#[from] EntityError),
}

/// The reusable half of a scene: its name, the entities and camera it has
/// built but not yet handed over, and a pending change request.
#[derive(Debug)]
pub struct SceneBase {
    name: String,
    entities: Vec<Entity>,
    camera: Option<Camera>,
    next_scene: Option<String>,
}

impl SceneBase {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entities: Vec::new(),
            camera: None,
            next_scene: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Queue an entity for the entity store.
    pub fn add(&mut self, entity: Entity) {
        self.entities.push(entity);
    }

    /// Pending entity by name, before activation moves it to the store.
    pub fn entity(&self, name: &str) -> Option<&Entity> {
        self.entities.iter().find(|e| e.name() == name)
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn take_entities(&mut self) -> Vec<Entity> {
        std::mem::take(&mut self.entities)
    }

    pub fn set_camera(&mut self, camera: Camera) {
        self.camera = Some(camera);
    }

    pub fn camera(&self) -> Option<&Camera> {
        self.camera.as_ref()
    }

    pub fn take_camera(&mut self) -> Option<Camera> {
        self.camera.take()
    }

    /// Ask the manager to switch to `scene` after the current update.
    pub fn request_change(&mut self, scene: impl Into<String>) {
        self.next_scene = Some(scene.into());
    }

    pub fn requested_change(&self) -> Option<&str> {
        self.next_scene.as_deref()
    }

    pub fn reset_request_change(&mut self) -> Option<String> {
        self.next_scene.take()
    }
}

/// A stage of the application that builds and drives its own entities.
///
/// Lifecycle on activation: `init`, then `create`; the entities and camera
/// left in the [`SceneBase`] are then moved into the entity store. `update`
/// runs once per tick while the scene is current, `dispose` when another
/// scene replaces it or the application stops.
pub trait Scene {
    fn base(&self) -> &SceneBase;

    fn base_mut(&mut self) -> &mut SceneBase;

    fn name(&self) -> &str {
        self.base().name()
    }

    fn init(&mut self, _app: &mut App) -> Result<(), SceneError> {
        Ok(())
    }

    fn create(&mut self, app: &mut App) -> Result<(), SceneError>;

    fn update(&mut self, _app: &mut App) -> Result<(), SceneError> {
        Ok(())
    }

    fn dispose(&mut self, _app: &mut App) {}
}
