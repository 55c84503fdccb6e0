use std::any::Any;
use std::collections::BTreeMap;

use playfield_common::{StatValue, Stats};
use playfield_kernel::{App, Service, ServiceKey};
use tracing::debug;

use crate::camera::Camera;
use crate::entity::Entity;

/// Entity store (priority 1): top-level entities keyed by name, plus the
/// active camera.
///
/// Uses BTreeMap so iteration follows name order on every platform.
#[derive(Debug, Default)]
pub struct EntityManager {
    entities: BTreeMap<String, Entity>,
    camera: Option<Camera>,
}

impl ServiceKey for EntityManager {
    const NAME: &'static str = "EntityManager";
}

impl EntityManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entity, replacing any entity with the same name.
    pub fn add(&mut self, entity: Entity) -> Option<Entity> {
        let replaced = self.entities.insert(entity.name().to_string(), entity);
        if let Some(old) = &replaced {
            debug!(name = old.name(), "entity replaced");
        }
        replaced
    }

    pub fn add_all(&mut self, entities: impl IntoIterator<Item = Entity>) {
        for entity in entities {
            self.add(entity);
        }
    }

    pub fn get(&self, name: &str) -> Option<&Entity> {
        self.entities.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Entity> {
        self.entities.get_mut(name)
    }

    /// Look up a top-level entity, then search every tree depth-first.
    pub fn find(&self, name: &str) -> Option<&Entity> {
        self.entities
            .get(name)
            .or_else(|| self.entities.values().find_map(|e| e.find(name)))
    }

    pub fn find_mut(&mut self, name: &str) -> Option<&mut Entity> {
        if self.entities.contains_key(name) {
            return self.entities.get_mut(name);
        }
        self.entities.values_mut().find_map(|e| e.find_mut(name))
    }

    pub fn remove(&mut self, name: &str) -> Option<Entity> {
        self.entities.remove(name)
    }

    /// Drop every entity and the camera.
    pub fn clear(&mut self) {
        self.entities.clear();
        self.camera = None;
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn active_count(&self) -> usize {
        self.entities.values().filter(|e| e.is_active()).count()
    }

    /// Top-level entities in name order.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn entities_mut(&mut self) -> impl Iterator<Item = &mut Entity> {
        self.entities.values_mut()
    }

    /// Visit every entity, roots and descendants, depth-first.
    pub fn walk(&self, f: &mut impl FnMut(&Entity)) {
        for entity in self.entities.values() {
            entity.walk(f);
        }
    }

    pub fn walk_active(&self, f: &mut impl FnMut(&Entity)) {
        for entity in self.entities.values() {
            entity.walk_active(f);
        }
    }

    /// Visit every active entity depth-first; inactive subtrees are skipped.
    pub fn walk_active_mut(&mut self, f: &mut impl FnMut(&mut Entity)) {
        for entity in self.entities.values_mut() {
            entity.walk_active_mut(f);
        }
    }

    pub fn set_camera(&mut self, camera: Option<Camera>) {
        if let Some(cam) = &camera {
            debug!(camera = cam.name(), follows = ?cam.target_name(), "camera set");
        }
        self.camera = camera;
    }

    pub fn camera(&self) -> Option<&Camera> {
        self.camera.as_ref()
    }

    pub fn camera_mut(&mut self) -> Option<&mut Camera> {
        self.camera.as_mut()
    }
}

impl Service for EntityManager {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn priority(&self) -> i32 {
        1
    }

    fn dispose(&mut self, _app: &mut App) {
        debug!(entities = self.entities.len(), "entity store cleared");
        self.clear();
    }

    fn stats(&self) -> Stats {
        let mut stats = Stats::new();
        stats.insert(
            "service.entity.manager.counter.entities".into(),
            StatValue::from(self.len()),
        );
        stats.insert(
            "service.entity.manager.counter.active".into(),
            StatValue::from(self.active_count()),
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::Priority;

    #[test]
    fn add_replaces_by_name() {
        let mut store = EntityManager::new();
        store.add(Entity::new("a").with(Priority(1)).unwrap());
        let old = store.add(Entity::new("a").with(Priority(2)).unwrap());
        assert!(old.is_some());
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("a").unwrap().get::<Priority>(), Some(&Priority(2)));
    }

    #[test]
    fn iteration_is_in_name_order() {
        let mut store = EntityManager::new();
        store.add_all(["c", "a", "b"].into_iter().map(Entity::new));
        let names: Vec<&str> = store.entities().map(Entity::name).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn find_searches_children() {
        let mut store = EntityManager::new();
        store.add(Entity::new("ship").with_child(Entity::new("turret")));
        assert!(store.get("turret").is_none());
        assert_eq!(store.find("turret").map(Entity::name), Some("turret"));
        store.find_mut("turret").unwrap().set_active(false);
        assert!(!store.find("turret").unwrap().is_active());
    }

    #[test]
    fn walk_active_mut_skips_inactive_subtrees() {
        let mut store = EntityManager::new();
        let mut sleeping = Entity::new("a").with_child(Entity::new("a1"));
        sleeping.set_active(false);
        store.add(sleeping);
        store.add(Entity::new("b").with_child(Entity::new("b1")));

        let mut visited = Vec::new();
        store.walk_active_mut(&mut |e| visited.push(e.name().to_string()));
        assert_eq!(visited, vec!["b", "b1"]);

        let mut all = 0;
        store.walk(&mut |_| all += 1);
        assert_eq!(all, 4);
    }

    #[test]
    fn stats_count_entities_and_active() {
        let mut store = EntityManager::new();
        store.add(Entity::new("a"));
        let mut b = Entity::new("b");
        b.set_active(false);
        store.add(b);
        let stats = store.stats();
        assert_eq!(
            stats.get("service.entity.manager.counter.entities"),
            Some(&StatValue::Int(2))
        );
        assert_eq!(
            stats.get("service.entity.manager.counter.active"),
            Some(&StatValue::Int(1))
        );
    }

    #[test]
    fn clear_drops_the_camera() {
        let mut store = EntityManager::new();
        store.set_camera(Some(Camera::new("cam", 320.0, 200.0)));
        store.add(Entity::new("a"));
        store.clear();
        assert!(store.is_empty());
        assert!(store.camera().is_none());
    }

    #[test]
    fn registered_in_app_under_its_name() {
        let app = App::new("test").with(EntityManager::new());
        assert!(app.get::<EntityManager>().is_some());
        assert!(app.contains_service("EntityManager"));
    }
}
