//! Rendering adapter: renderer-agnostic frames built from the entity store.
//!
//! # Invariants
//! - Renderers cannot mutate entity state; they receive a finished frame.
//! - Frames derive from the entity store, the camera and the debug level.
//!
//! Pixel output stays outside the framework. [`DebugTextRenderer`] is the
//! headless stand-in; a windowed backend implements [`Renderer`] without
//! changing consumers.

mod frame;
mod renderer;
mod service;

pub use frame::{DrawKind, Drawable, RenderFrame};
pub use renderer::{DebugTextRenderer, Renderer};
pub use service::RenderingService;
