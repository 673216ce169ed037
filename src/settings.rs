//! Settings lookup by section and key
//!
//! The VR runtime exposes driver settings as string values addressed by a
//! section name and a key. The device reads its model and serial numbers
//! through [`SettingsSource`] once, at construction.

use crate::config::DriverConfig;
use std::collections::HashMap;

/// Settings key holding the controller model number
pub const MODEL_NUMBER_KEY: &str = "mycontroller_model_number";

/// Settings key holding the controller serial number
pub const SERIAL_NUMBER_KEY: &str = "mycontroller_serial_number";

/// String settings addressed by section and key
pub trait SettingsSource {
    /// Look up a value, `None` if the section or key is absent
    fn get_string(&self, section: &str, key: &str) -> Option<String>;

    /// Look up a value, reading missing entries as an empty string
    fn get_string_or_empty(&self, section: &str, key: &str) -> String {
        self.get_string(section, key).unwrap_or_default()
    }
}

impl SettingsSource for DriverConfig {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.settings.get(section)?.get(key).cloned()
    }
}

/// In-memory settings, mainly for tests and embedding
#[derive(Debug, Clone, Default)]
pub struct StaticSettings {
    values: HashMap<(String, String), String>,
}

impl StaticSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, section: &str, key: &str, value: &str) -> Self {
        self.set(section, key, value);
        self
    }

    pub fn set(&mut self, section: &str, key: &str, value: &str) {
        self.values
            .insert((section.to_string(), key.to_string()), value.to_string());
    }
}

impl SettingsSource for StaticSettings {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.values
            .get(&(section.to_string(), key.to_string()))
            .cloned()
    }
}
