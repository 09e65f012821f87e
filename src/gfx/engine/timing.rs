use std::time::{Duration, Instant};

/// Wall-clock delta between successive frames.
///
/// The baseline of the first tick is the moment the clock was created.
#[derive(Debug, Clone, Copy)]
pub struct FrameClock {
    last: Instant,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameClock {
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    pub fn starting_at(start: Instant) -> Self {
        Self { last: start }
    }

    /// Time since the previous tick
    pub fn tick(&mut self) -> Duration {
        self.tick_at(Instant::now())
    }

    /// Like [`FrameClock::tick`] with an explicit "now"; an instant earlier
    /// than the previous tick yields zero
    pub fn tick_at(&mut self, now: Instant) -> Duration {
        let delta = now.saturating_duration_since(self.last);
        self.last = now.max(self.last);
        delta
    }

    /// Restart timing from now without reporting a delta
    pub fn reset(&mut self) {
        self.last = Instant::now();
    }
}
