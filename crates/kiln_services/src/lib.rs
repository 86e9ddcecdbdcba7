//! Kiln Services Layer
//!
//! Platform-facing services for the runtime. Currently just settings.

pub mod settings;

pub use settings::{Settings, SettingsError};
