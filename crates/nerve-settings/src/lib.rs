//! Nerve Settings Crate
//!
//! Loads, validates and saves the settings file of the nerve bus service.

pub mod config;
pub mod error;

pub use config::{LoggingSettings, RuntimeSettings, Settings, TransportSettings};
pub use error::{SettingsError, SettingsResult};
