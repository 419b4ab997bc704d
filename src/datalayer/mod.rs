//! Data-Layer Store
//!
//! The data layer is the named, shared array that application code and the
//! remote tag-manager script use as their transport. This module models the
//! browser's global scope as a process-wide registry of named layers and
//! gives the client an explicit claim/restore lifecycle over one of them.
//!
//! ```text
//!   registry (global scope)            DataLayerClaim
//!  ┌──────────────────────────┐       ┌────────────────────────────┐
//!  │ "dataLayer" -> DataLayer │◄──────│ layer, created, snapshot   │
//!  │ "otherLayer" -> ...      │       │ restore(): remove or reset │
//!  └──────────────────────────┘       └────────────────────────────┘
//! ```
//!
//! Claiming never truncates or reorders what is already in the array.
//! Restoring puts back exactly what existed before the claim.

mod layer;
pub mod registry;
mod store;

pub use layer::{AppendHook, DataLayer, DataLayerConsumer, DataLayerEntry};
pub use store::DataLayerClaim;

/// Name of the data layer when the caller does not choose one
pub const DEFAULT_DATA_LAYER_NAME: &str = "dataLayer";
