use serde::{Serialize, Serializer};
use uuid::Uuid;

use crate::component::{Component, ComponentKind, ComponentType, Graphic};
use crate::error::EntityError;
use crate::node::Node;
use crate::physical::Physical;

type ComponentSlots = [Option<Component>; ComponentKind::COUNT];

fn present_components<S: Serializer>(slots: &ComponentSlots, s: S) -> Result<S::Ok, S::Error> {
    s.collect_seq(slots.iter().flatten())
}

/// A node with components, owned children and an optional lifetime.
///
/// # Invariants
/// - At most one component per [`ComponentKind`].
/// - `lifetime` only grows, and only while a positive duration is set.
/// - Children are owned; a child is never shared between two parents.
#[derive(Debug, Serialize)]
pub struct Entity {
    #[serde(flatten)]
    node: Node,
    #[serde(serialize_with = "present_components")]
    components: ComponentSlots,
    duration: Option<f64>,
    lifetime: f64,
    children: Vec<Entity>,
}

impl Default for Entity {
    fn default() -> Self {
        Self::from_node(Node::unnamed())
    }
}

impl Entity {
    pub fn new(name: impl Into<String>) -> Self {
        Self::from_node(Node::new(name))
    }

    fn from_node(node: Node) -> Self {
        Self {
            node,
            components: [const { None }; ComponentKind::COUNT],
            duration: None,
            lifetime: 0.0,
            children: Vec::new(),
        }
    }

    /// Identity and activity flag.
    pub fn node(&self) -> &Node {
        &self.node
    }

    /// Process-unique sequential id.
    pub fn id(&self) -> u64 {
        self.node.id()
    }

    /// Random UUID assigned at creation.
    pub fn uuid(&self) -> Uuid {
        self.node.uuid()
    }

    /// Unique name in the store.
    pub fn name(&self) -> &str {
        self.node.name()
    }

    /// Inactive entities are skipped by updates and rendering.
    pub fn is_active(&self) -> bool {
        self.node.is_active()
    }

    /// Inactive entities hide their whole subtree from active walks.
    pub fn set_active(&mut self, active: bool) {
        self.node.set_active(active);
    }

    // --- components ---

    /// Builder-style [`Entity::add_component`].
    pub fn with(mut self, component: impl Into<Component>) -> Result<Self, EntityError> {
        self.add_component(component)?;
        Ok(self)
    }

    /// Insert a component; a second component of the same kind is rejected.
    pub fn add_component(&mut self, component: impl Into<Component>) -> Result<(), EntityError> {
        let component = component.into();
        let slot = &mut self.components[component.kind().index()];
        if slot.is_some() {
            return Err(EntityError::DuplicateComponent {
                entity: self.node.name().to_string(),
                kind: component.kind(),
            });
        }
        *slot = Some(component);
        Ok(())
    }

    /// Insert a component, returning the one it replaced.
    pub fn replace_component(&mut self, component: impl Into<Component>) -> Option<Component> {
        let component = component.into();
        self.components[component.kind().index()].replace(component)
    }

    pub fn remove_component(&mut self, kind: ComponentKind) -> Option<Component> {
        self.components[kind.index()].take()
    }

    pub fn get<T: ComponentType>(&self) -> Option<&T> {
        self.components[T::KIND.index()]
            .as_ref()
            .and_then(T::from_component)
    }

    pub fn get_mut<T: ComponentType>(&mut self) -> Option<&mut T> {
        self.components[T::KIND.index()]
            .as_mut()
            .and_then(T::from_component_mut)
    }

    pub fn contains<T: ComponentType>(&self) -> bool {
        self.contains_kind(T::KIND)
    }

    pub fn contains_kind(&self, kind: ComponentKind) -> bool {
        self.components[kind.index()].is_some()
    }

    /// Like [`Entity::get`], for callers that rely on the component being there.
    pub fn require<T: ComponentType>(&self) -> Result<&T, EntityError> {
        self.get::<T>().ok_or_else(|| EntityError::MissingComponent {
            entity: self.node.name().to_string(),
            kind: T::KIND,
        })
    }

    pub fn require_mut<T: ComponentType>(&mut self) -> Result<&mut T, EntityError> {
        let name = self.node.name().to_string();
        self.get_mut::<T>()
            .ok_or(EntityError::MissingComponent { entity: name, kind: T::KIND })
    }

    pub fn components(&self) -> impl Iterator<Item = &Component> {
        self.components.iter().flatten()
    }

    /// Copy the physical box into the graphic draw bounds.
    pub fn sync_graphic_bounds(&mut self) {
        let Some(bbox) = self.get::<Physical>().map(Physical::bbox) else {
            return;
        };
        if let Some(graphic) = self.get_mut::<Graphic>() {
            graphic.bounds = bbox;
        }
    }

    // --- lifetime ---

    pub fn with_duration(mut self, duration: f64) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn set_duration(&mut self, duration: Option<f64>) {
        self.duration = duration;
    }

    pub fn duration(&self) -> Option<f64> {
        self.duration
    }

    pub fn lifetime(&self) -> f64 {
        self.lifetime
    }

    /// Age the entity by `elapsed`; it deactivates once its duration is spent.
    pub fn update(&mut self, elapsed: f64) {
        let Some(duration) = self.duration.filter(|d| *d > 0.0) else {
            return;
        };
        self.lifetime += elapsed;
        if self.lifetime >= duration {
            self.node.set_active(false);
        }
    }

    // --- children ---

    pub fn with_child(mut self, child: Entity) -> Self {
        self.children.push(child);
        self
    }

    pub fn add_child(&mut self, child: Entity) {
        self.children.push(child);
    }

    pub fn children(&self) -> &[Entity] {
        &self.children
    }

    pub fn children_mut(&mut self) -> &mut [Entity] {
        &mut self.children
    }

    /// Depth-first search of this entity and its descendants.
    pub fn find(&self, name: &str) -> Option<&Entity> {
        if self.name() == name {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(name))
    }

    pub fn find_mut(&mut self, name: &str) -> Option<&mut Entity> {
        if self.name() == name {
            return Some(self);
        }
        self.children.iter_mut().find_map(|c| c.find_mut(name))
    }

    /// Visit this entity and every descendant, parents before children.
    pub fn walk(&self, f: &mut impl FnMut(&Entity)) {
        f(self);
        for child in &self.children {
            child.walk(f);
        }
    }

    pub fn walk_mut(&mut self, f: &mut impl FnMut(&mut Entity)) {
        f(self);
        for child in &mut self.children {
            child.walk_mut(f);
        }
    }

    /// Visit active entities only; an inactive entity hides its subtree.
    pub fn walk_active(&self, f: &mut impl FnMut(&Entity)) {
        if !self.is_active() {
            return;
        }
        f(self);
        for child in &self.children {
            child.walk_active(f);
        }
    }

    /// Like [`Entity::walk_mut`], but an inactive entity and its whole
    /// subtree are skipped. An entity deactivated by `f` keeps its children
    /// from being visited.
    pub fn walk_active_mut(&mut self, f: &mut impl FnMut(&mut Entity)) {
        if !self.is_active() {
            return;
        }
        f(self);
        if !self.is_active() {
            return;
        }
        for child in &mut self.children {
            child.walk_active_mut(f);
        }
    }
}
