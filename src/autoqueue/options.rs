//! Auto-queue options

use crate::autoqueue::AutoQueueError;
use crate::datalayer::DEFAULT_DATA_LAYER_NAME;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_BUFFER_SIZE: usize = 1000;

/// Callback receiving a count (entries replayed, pending, or dropped)
pub type CountCallback = Arc<dyn Fn(usize) + Send + Sync>;

#[derive(Clone)]
pub struct AutoQueueOptions {
    pub data_layer_name: String,
    /// How often to check whether a consumer is draining the layer
    pub poll_interval: Duration,
    /// Give up buffering after this long without a consumer
    pub timeout: Duration,
    /// Entries beyond this are left out of the buffer and reported
    pub max_buffer_size: usize,
    /// Called once with the number of entries replayed
    pub on_replay: Option<CountCallback>,
    /// Called once with the number of entries still buffered at timeout
    pub on_timeout: Option<CountCallback>,
    /// Called on each entry left out of a full buffer, with the running total
    pub on_overflow: Option<CountCallback>,
}

impl Default for AutoQueueOptions {
    fn default() -> Self {
        Self {
            data_layer_name: DEFAULT_DATA_LAYER_NAME.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_TIMEOUT,
            max_buffer_size: DEFAULT_MAX_BUFFER_SIZE,
            on_replay: None,
            on_timeout: None,
            on_overflow: None,
        }
    }
}

impl AutoQueueOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data_layer_name(mut self, name: impl Into<String>) -> Self {
        self.data_layer_name = name.into();
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_buffer_size(mut self, size: usize) -> Self {
        self.max_buffer_size = size;
        self
    }

    pub fn on_replay(mut self, callback: impl Fn(usize) + Send + Sync + 'static) -> Self {
        self.on_replay = Some(Arc::new(callback));
        self
    }

    pub fn on_timeout(mut self, callback: impl Fn(usize) + Send + Sync + 'static) -> Self {
        self.on_timeout = Some(Arc::new(callback));
        self
    }

    pub fn on_overflow(mut self, callback: impl Fn(usize) + Send + Sync + 'static) -> Self {
        self.on_overflow = Some(Arc::new(callback));
        self
    }

    pub(crate) fn validate(&self) -> Result<(), AutoQueueError> {
        if self.data_layer_name.trim().is_empty() {
            return Err(AutoQueueError::InvalidOptions {
                message: "data layer name must not be empty".to_string(),
            });
        }
        if self.poll_interval.is_zero() {
            return Err(AutoQueueError::InvalidOptions {
                message: "poll interval must be greater than zero".to_string(),
            });
        }
        if self.max_buffer_size == 0 {
            return Err(AutoQueueError::InvalidOptions {
                message: "max buffer size must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

impl fmt::Debug for AutoQueueOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AutoQueueOptions")
            .field("data_layer_name", &self.data_layer_name)
            .field("poll_interval", &self.poll_interval)
            .field("timeout", &self.timeout)
            .field("max_buffer_size", &self.max_buffer_size)
            .field("on_replay", &self.on_replay.is_some())
            .field("on_timeout", &self.on_timeout.is_some())
            .field("on_overflow", &self.on_overflow.is_some())
            .finish()
    }
}
