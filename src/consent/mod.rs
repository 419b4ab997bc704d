//! Consent Controller
//!
//! Translates a category → granted/denied mapping into the command entries
//! the tag-manager script reads from the data layer:
//!
//! ```text
//! ["consent", "default", {"ad_storage": "denied", ...}, {"region": ["DE", "FR"]}]
//! ["consent", "update",  {"analytics_storage": "granted"}]
//! ```
//!
//! The controller is stateless. Partial states pass through as given; filling
//! in unspecified categories is the downstream script's job. Ordering against
//! other entries is the client's responsibility.

mod command;
mod presets;
mod state;

pub use command::{
    build_command, build_default_command, build_update_command, ConsentVerb, CONSENT_COMMAND,
};
pub use presets::{eea_region_options, ConsentPreset, EEA_REGIONS};
pub use state::{ConsentCategory, ConsentState, ConsentValue, RegionOptions};
