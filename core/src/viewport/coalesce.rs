use std::time::Duration;
use tokio::time::Instant;

/// Leading + trailing debounce for viewport-settle events.
///
/// The first trigger after a quiet period fires at once. Triggers that land
/// inside the window push the deadline out and fire once more when the window
/// finally elapses. One instance must live for the whole session.
#[derive(Debug, Clone)]
pub struct Coalescer {
    window: Duration,
    deadline: Option<Instant>,
    trailing: bool,
}

impl Coalescer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            deadline: None,
            trailing: false,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Registers a trigger; returns `true` when it fires on the leading edge.
    pub fn trigger(&mut self, now: Instant) -> bool {
        let leading = match self.deadline {
            Some(deadline) => now >= deadline,
            None => true,
        };
        self.deadline = Some(now + self.window);
        self.trailing = !leading;
        leading
    }

    /// When the trailing edge is due, if a window is open.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Closes an elapsed window; returns `true` if the trailing edge fires.
    pub fn expire(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                std::mem::take(&mut self.trailing)
            }
            _ => false,
        }
    }
}
