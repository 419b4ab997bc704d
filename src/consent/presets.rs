//! Fixed consent presets

use crate::consent::{ConsentState, ConsentValue, RegionOptions};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

/// Countries of the European Economic Area
pub const EEA_REGIONS: &[&str] = &[
    "AT", "BE", "BG", "HR", "CY", "CZ", "DK", "EE", "FI", "FR", "DE", "GR", "HU", "IE", "IT",
    "LV", "LT", "LU", "MT", "NL", "PL", "PT", "RO", "SK", "SI", "ES", "SE", "IS", "LI", "NO",
];

/// Region options scoping a default to the EEA
pub fn eea_region_options() -> RegionOptions {
    RegionOptions::for_regions(EEA_REGIONS.iter().copied())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter, AsRefStr)]
#[strum(serialize_all = "kebab-case")]
pub enum ConsentPreset {
    /// All four categories denied
    #[strum(to_string = "eea-default", serialize = "all-denied")]
    EeaDefault,
    /// All four categories granted
    AllGranted,
    /// Analytics granted, advertising denied
    AnalyticsOnly,
}

impl ConsentPreset {
    pub const fn state(self) -> ConsentState {
        match self {
            ConsentPreset::EeaDefault => ConsentState::uniform(ConsentValue::Denied),
            ConsentPreset::AllGranted => ConsentState::uniform(ConsentValue::Granted),
            ConsentPreset::AnalyticsOnly => ConsentState {
                analytics_storage: Some(ConsentValue::Granted),
                ..ConsentState::uniform(ConsentValue::Denied)
            },
        }
    }
}

impl From<ConsentPreset> for ConsentState {
    fn from(preset: ConsentPreset) -> Self {
        preset.state()
    }
}
