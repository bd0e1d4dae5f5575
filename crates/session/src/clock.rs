//! Pausable elapsed-time clock

/// Elapsed recording time that freezes while paused
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ElapsedClock {
    accumulated_ms: i64,
    running_since: Option<i64>,
}

impl ElapsedClock {
    /// Clock running from `now_ms`
    pub fn started(now_ms: i64) -> Self {
        Self {
            accumulated_ms: 0,
            running_since: Some(now_ms),
        }
    }

    pub fn pause(&mut self, now_ms: i64) {
        if let Some(since) = self.running_since.take() {
            self.accumulated_ms = self.accumulated_ms.saturating_add(now_ms.saturating_sub(since).max(0));
        }
    }

    pub fn resume(&mut self, now_ms: i64) {
        if self.running_since.is_none() {
            self.running_since = Some(now_ms);
        }
    }

    pub fn is_running(&self) -> bool {
        self.running_since.is_some()
    }

    pub fn elapsed_ms(&self, now_ms: i64) -> i64 {
        let running = self.running_since.map_or(0, |since| now_ms.saturating_sub(since).max(0));
        self.accumulated_ms.saturating_add(running)
    }

    /// Whole seconds elapsed
    pub fn elapsed_sec(&self, now_ms: i64) -> u64 {
        (self.elapsed_ms(now_ms) / 1000) as u64
    }
}
