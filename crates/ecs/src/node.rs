use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use uuid::Uuid;

static NEXT_ID: AtomicU64 = AtomicU64::new(0);

/// Identity header shared by every entity.
///
/// The numeric id comes from a process-wide counter and is never reused.
/// `Node` is deliberately not `Clone`, so two live nodes never share an id.
#[derive(Debug, Serialize)]
pub struct Node {
    id: u64,
    uuid: Uuid,
    name: String,
    active: bool,
}

impl Node {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            uuid: Uuid::new_v4(),
            name: name.into(),
            active: true,
        }
    }

    /// A node named after its id, `entity_<id>`.
    pub fn unnamed() -> Self {
        let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
        Self {
            id,
            uuid: Uuid::new_v4(),
            name: format!("entity_{id}"),
            active: true,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }
}
