use crate::component::ComponentKind;

/// Errors raised while building or querying entities.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EntityError {
    #[error("entity `{entity}` already has a {kind} component")]
    DuplicateComponent { entity: String, kind: ComponentKind },
    #[error("entity `{entity}` has no {kind} component")]
    MissingComponent { entity: String, kind: ComponentKind },
    #[error("mass must be strictly positive, got {0}")]
    InvalidMass(f64),
    #[error("tween factor must be in (0, 1], got {0}")]
    InvalidTween(f64),
}
