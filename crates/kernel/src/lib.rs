//! Playfield kernel: the service registry and the scheduler that drives it.
//!
//! # Invariants
//! - Services run in ascending priority in every phase; ties keep registration order.
//! - Only services whose `init` succeeded are disposed, and disposal happens once.
//! - Configuration is the first service initialized, so every other service
//!   reads its settings during its own `init`.

pub mod app;
pub mod config;
pub mod error;
pub mod service;

pub use app::{App, AppHandle};
pub use config::{ConfigError, ConfigValue, ConfigurationService, keys};
pub use error::{AppError, ServiceError};
pub use service::{Service, ServiceKey};
