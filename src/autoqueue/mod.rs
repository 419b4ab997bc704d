//! Auto-Queue Installer
//!
//! Protects entries appended to a data layer before any client exists (inline
//! bootstrap snippets, early analytics calls). Installation hooks the layer's
//! append; until a consumer starts draining the layer every appended entry is
//! also copied into a bounded buffer, which is replayed to the consumer
//! exactly once.
//!
//! ```text
//!            append ──► DataLayer ──► hook ──► buffer (≤ max_buffer_size)
//!                                                   │
//!   next append:   consumer attached? ──yes──► replay once, then the entry, unhook
//!   poll_interval: consumer attached? ──yes──► replay once, unhook
//!                  timeout elapsed?   ──yes──► discard, unhook, on_timeout
//! ```
//!
//! Usable on its own; the client does not depend on it.

mod error;
mod installer;
mod options;

pub use error::AutoQueueError;
pub use installer::{consumer_detected, install, AutoQueueHandle, AutoQueueStatus};
pub use options::{
    AutoQueueOptions, CountCallback, DEFAULT_MAX_BUFFER_SIZE, DEFAULT_POLL_INTERVAL,
    DEFAULT_TIMEOUT,
};

#[cfg(test)]
mod tests;
