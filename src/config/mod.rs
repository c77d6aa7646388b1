//! Configuration module for Oppsum.
//!
//! Handles the settings file and the once-per-process resolution of
//! acquisition secrets (cookies, proxy, remote API key).

mod resolver;
mod settings;

pub use resolver::AcquisitionConfig;
pub use settings::{
    AcquisitionSettings, GeneralSettings, Settings, SummarySettings, TranscriptionSettings,
};
