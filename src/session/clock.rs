use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Time source for chunk, silence and guard timers
pub trait Clock: Send + Sync {
    /// Returns the current instant.
    fn now(&self) -> Instant;

    /// Called once per ingested frame with the frame's duration.
    /// Stream-driven clocks advance here; wall clocks ignore it.
    fn on_frame(&self, _frame_duration: Duration) {}
}

/// Wall clock, for live capture and realtime replay
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock driven by the amount of audio ingested
///
/// Used for batch replay and tests: "now" is the origin plus the duration
/// of every frame seen so far, plus any manual [`advance`](Self::advance).
#[derive(Debug)]
pub struct StreamClock {
    origin: Instant,
    elapsed_micros: AtomicU64,
}

impl StreamClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            elapsed_micros: AtomicU64::new(0),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.elapsed_micros
            .fetch_add(by.as_micros() as u64, Ordering::SeqCst);
    }

    pub fn elapsed(&self) -> Duration {
        Duration::from_micros(self.elapsed_micros.load(Ordering::SeqCst))
    }
}

impl Default for StreamClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for StreamClock {
    fn now(&self) -> Instant {
        self.origin + self.elapsed()
    }

    fn on_frame(&self, frame_duration: Duration) {
        self.advance(frame_duration);
    }
}
