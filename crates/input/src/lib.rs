//! Keyboard input: key state polled by scenes, fed by events from any thread.
//!
//! # Invariants
//! - Key state only changes when the service processes, once per tick.
//! - Releasing the exit key requests application exit.

pub mod key;
pub mod service;

pub use key::{Key, KeyEvent, UnknownKey};
pub use service::{InputHandle, InputService};
