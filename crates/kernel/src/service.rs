use std::any::Any;

use playfield_common::Stats;

use crate::app::App;
use crate::error::ServiceError;

/// A named, prioritized subsystem driven by the [`App`] scheduler.
///
/// Hooks run in ascending priority order in every phase. While a hook runs,
/// the service is checked out of the registry, so it can look up every
/// other service through `app` but not itself.
pub trait Service: Any {
    /// Registry key. At most one service per name.
    fn name(&self) -> &str;

    /// Fixed ordering key; lower runs first.
    fn priority(&self) -> i32;

    fn init(&mut self, _app: &mut App, _args: &[String]) -> Result<(), ServiceError> {
        Ok(())
    }

    fn process(&mut self, _app: &mut App) -> Result<(), ServiceError> {
        Ok(())
    }

    fn dispose(&mut self, _app: &mut App) {}

    fn stats(&self) -> Stats {
        Stats::new()
    }

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Services with a well-known registry name, for typed lookup with
/// [`App::get`] and [`App::get_mut`].
pub trait ServiceKey {
    const NAME: &'static str;
}
