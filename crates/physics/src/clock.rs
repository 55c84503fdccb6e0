use std::time::Instant;

/// Source of the elapsed time fed to the engine, in milliseconds.
#[derive(Debug, Clone)]
pub enum Clock {
    /// Wall clock; the first tick after `start` measures from `start`.
    System { last: Option<Instant> },
    /// Every tick reports the same step. Used for reproducible runs.
    Fixed(f64),
}

impl Default for Clock {
    fn default() -> Self {
        Self::system()
    }
}

impl Clock {
    pub fn system() -> Self {
        Self::System { last: None }
    }

    pub fn fixed(step_ms: f64) -> Self {
        Self::Fixed(step_ms)
    }

    /// Reset the reference point to now.
    pub fn start(&mut self) {
        if let Self::System { last } = self {
            *last = Some(Instant::now());
        }
    }

    /// Milliseconds since the previous tick.
    pub fn tick(&mut self) -> f64 {
        match self {
            Self::Fixed(step) => *step,
            Self::System { last } => {
                let now = Instant::now();
                let elapsed = last.map_or(0.0, |prev| now.duration_since(prev).as_secs_f64() * 1000.0);
                *last = Some(now);
                elapsed
            }
        }
    }

    pub fn is_fixed(&self) -> bool {
        matches!(self, Self::Fixed(_))
    }
}
