//! Configuration module.
//!
//! Handles loading the TOML settings file and the backend order.

mod settings;

pub use settings::{
    validate_order, AssemblyAiSettings, DeviceSetting, FallbackSettings, LocalWhisperSettings,
    OpenAiSettings, OutputSettings, Settings,
};
