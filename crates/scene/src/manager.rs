use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;

use playfield_common::Stats;
use playfield_ecs::EntityManager;
use playfield_kernel::{App, ConfigurationService, Service, ServiceError, ServiceKey, keys};
use tracing::{debug, error, info, warn};

use crate::scene::{Scene, SceneError};

/// Builds a scene instance from the scene's name.
pub type SceneFactory = Box<dyn Fn(&str) -> Box<dyn Scene>>;

/// Registers scene factories before the manager is created.
#[derive(Default)]
pub struct SceneManagerBuilder {
    factories: BTreeMap<String, SceneFactory>,
    default_scene: Option<String>,
}

impl SceneManagerBuilder {
    pub fn register<F, S>(mut self, factory_id: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&str) -> S + 'static,
        S: Scene + 'static,
    {
        self.factories.insert(
            factory_id.into(),
            Box::new(move |name: &str| Box::new(factory(name)) as Box<dyn Scene>),
        );
        self
    }

    /// Scene activated at `init` when the configuration names none.
    pub fn default_scene(mut self, name: impl Into<String>) -> Self {
        self.default_scene = Some(name.into());
        self
    }

    pub fn build(self) -> SceneManager {
        SceneManager {
            factories: self.factories,
            default_scene: self.default_scene,
            scenes: BTreeMap::new(),
            current: None,
            activations: 0,
        }
    }
}

/// Scene lifecycle service (priority 3).
///
/// Scenes are instantiated at `init` from `app.scenes.list` entries
/// (`name` or `name:factory`), or one per registered factory when the list
/// is absent. Exactly one scene is current; its entities live in the
/// [`EntityManager`] while it is.
pub struct SceneManager {
    factories: BTreeMap<String, SceneFactory>,
    default_scene: Option<String>,
    scenes: BTreeMap<String, Box<dyn Scene>>,
    current: Option<String>,
    activations: u64,
}

impl fmt::Debug for SceneManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SceneManager")
            .field("factories", &self.factories.keys().collect::<Vec<_>>())
            .field("scenes", &self.scenes.keys().collect::<Vec<_>>())
            .field("current", &self.current)
            .finish()
    }
}

impl ServiceKey for SceneManager {
    const NAME: &'static str = "SceneManager";
}

impl SceneManager {
    pub fn builder() -> SceneManagerBuilder {
        SceneManagerBuilder::default()
    }

    pub fn current_scene_name(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn current_scene(&self) -> Option<&dyn Scene> {
        let name = self.current.as_ref()?;
        self.scenes.get(name).map(|s| s.as_ref())
    }

    pub fn scene(&self, name: &str) -> Option<&dyn Scene> {
        self.scenes.get(name).map(|s| s.as_ref())
    }

    pub fn scene_names(&self) -> impl Iterator<Item = &str> {
        self.scenes.keys().map(String::as_str)
    }

    /// Instantiate a scene from a registered factory, replacing any scene
    /// with the same name.
    pub fn instantiate(&mut self, name: &str, factory_id: &str) -> Result<(), SceneError> {
        let factory = self
            .factories
            .get(factory_id)
            .ok_or_else(|| SceneError::UnknownFactory {
                scene: name.to_string(),
                factory: factory_id.to_string(),
            })?;
        self.scenes.insert(name.to_string(), factory(name));
        info!(scene = name, factory = factory_id, "scene instantiated");
        Ok(())
    }

    /// Make `name` the current scene.
    ///
    /// The previous scene is disposed first. The new scene is initialized and
    /// created, then the entity store is cleared and receives the scene's
    /// entities and camera. If `init` or `create` fails, no scene is current,
    /// the store is left empty and whatever the scene queued is dropped.
    pub fn activate(&mut self, app: &mut App, name: &str) -> Result<(), SceneError> {
        if !self.scenes.contains_key(name) {
            return Err(SceneError::UnknownScene(name.to_string()));
        }
        app.require::<EntityManager>()?;

        if let Some(previous) = self.current.take() {
            if let Some(scene) = self.scenes.get_mut(&previous) {
                scene.dispose(app);
                debug!(scene = %previous, "scene disposed");
            }
        }

        let Some(scene) = self.scenes.get_mut(name) else {
            return Err(SceneError::UnknownScene(name.to_string()));
        };
        let created = match scene.init(app) {
            Ok(()) => scene.create(app),
            Err(err) => Err(err),
        };
        let entities = scene.base_mut().take_entities();
        let camera = scene.base_mut().take_camera();

        let store = app.require_mut::<EntityManager>()?;
        store.clear();
        if let Err(err) = created {
            error!(scene = name, error = %err, "scene failed to start, no scene active");
            return Err(err);
        }
        store.add_all(entities);
        store.set_camera(camera);
        self.current = Some(name.to_string());
        self.activations += 1;
        info!(scene = name, entities = store.len(), "scene activated");
        Ok(())
    }

    fn scene_entries(&self, app: &App) -> Vec<(String, String)> {
        let listed = app
            .get::<ConfigurationService>()
            .and_then(|config| config.list(keys::SCENES_LIST).map(<[String]>::to_vec));
        match listed {
            Some(list) => list
                .iter()
                .map(|entry| match entry.split_once(':') {
                    Some((name, factory)) => (name.trim().to_string(), factory.trim().to_string()),
                    None => (entry.trim().to_string(), entry.trim().to_string()),
                })
                .collect(),
            None => self.factories.keys().map(|k| (k.clone(), k.clone())).collect(),
        }
    }
}

impl Service for SceneManager {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn priority(&self) -> i32 {
        3
    }

    fn init(&mut self, app: &mut App, _args: &[String]) -> Result<(), ServiceError> {
        app.require::<EntityManager>()?;

        for (name, factory) in self.scene_entries(app) {
            if let Err(err) = self.instantiate(&name, &factory) {
                error!(error = %err, "scene not instantiated");
            }
        }

        let configured = app
            .get::<ConfigurationService>()
            .and_then(|config| config.text(keys::SCENES_DEFAULT).map(String::from));
        let default = configured
            .or_else(|| self.default_scene.clone())
            .or_else(|| self.scenes.keys().next().cloned());

        match default {
            Some(name) if self.scenes.contains_key(&name) => {
                self.activate(app, &name).map_err(ServiceError::other)?;
            }
            Some(name) => warn!(scene = %name, "default scene is unknown, nothing activated"),
            None => warn!("no scene registered, nothing activated"),
        }
        Ok(())
    }

    fn process(&mut self, app: &mut App) -> Result<(), ServiceError> {
        let Some(current) = self.current.clone() else {
            return Ok(());
        };
        let next = match self.scenes.get_mut(&current) {
            Some(scene) => {
                scene.update(app).map_err(ServiceError::other)?;
                scene.base_mut().reset_request_change()
            }
            None => None,
        };

        if let Some(next) = next {
            match self.activate(app, &next) {
                Ok(()) => {}
                Err(SceneError::UnknownScene(name)) => {
                    warn!(scene = %name, "requested scene is unknown, staying on current scene");
                }
                Err(err) => return Err(ServiceError::other(err)),
            }
        }
        Ok(())
    }

    fn dispose(&mut self, app: &mut App) {
        if let Some(current) = self.current.take() {
            if let Some(scene) = self.scenes.get_mut(&current) {
                scene.dispose(app);
                info!(scene = %current, "scene disposed");
            }
        }
    }

    fn stats(&self) -> Stats {
        let mut stats = Stats::new();
        stats.insert(
            "service.scene.manager.counter.scenes".into(),
            self.scenes.len().into(),
        );
        stats.insert(
            "service.scene.manager.counter.activations".into(),
            self.activations.into(),
        );
        if let Some(current) = &self.current {
            stats.insert("service.scene.manager.current".into(), current.as_str().into());
        }
        stats
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
