//! Time provider abstraction for testable time-dependent logic

use std::time::SystemTime;
#[cfg(test)]
use std::sync::{Arc, Mutex};
#[cfg(test)]
use std::time::Duration;

/// Abstraction over system time so load-state timestamps are deterministic in tests
pub trait TimeProvider: Send + Sync {
    /// Get the current system time (for timestamps)
    fn system_time(&self) -> SystemTime;

    /// Milliseconds since the Unix epoch, clamped to zero for pre-epoch clocks
    fn epoch_millis(&self) -> u64 {
        self.system_time()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// Production time provider using actual system time
#[derive(Debug, Default, Clone)]
pub struct SystemTimeProvider;

impl TimeProvider for SystemTimeProvider {
    fn system_time(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Mock time provider for deterministic testing
#[derive(Clone)]
#[cfg(test)]
pub struct MockTimeProvider {
    current_system_time: Arc<Mutex<SystemTime>>,
}

#[cfg(test)]
impl MockTimeProvider {
    /// Create a mock provider frozen at the given time
    pub fn at(time: SystemTime) -> Self {
        Self {
            current_system_time: Arc::new(Mutex::new(time)),
        }
    }

    pub fn advance_time(&self, duration: Duration) {
        let mut system_time = self.current_system_time.lock().unwrap();
        *system_time += duration;
    }
}

#[cfg(test)]
impl TimeProvider for MockTimeProvider {
    fn system_time(&self) -> SystemTime {
        *self.current_system_time.lock().unwrap()
    }
}
