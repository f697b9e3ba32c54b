//! Settings document
//!
//! `settings.json` in the data directory. Every field is optional; a missing
//! file or field falls back to the defaults below.

use std::fs;
use std::path::Path;

use gridwell_core::{Coercion, Size};
use serde::{Deserialize, Serialize};

use crate::error::{HostError, Result};
use crate::persist::write_json;

/// Name of the built-in base plugin.
pub const STATUS_PLUGIN: &str = "status";

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct WindowSettings {
    pub width: f32,
    pub height: f32,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub window: WindowSettings,
    /// `"dark"` or `"light"`.
    pub theme: String,
    pub locale: String,
    /// Size of one grid cell in pixels.
    pub cell_px: f32,
    /// Address for remote plugin connections; none disables the listener.
    pub listen: Option<String>,
    /// Plugin that owns the base level.
    pub base_plugin: String,
    /// Further plugins, reachable through sub-rendering.
    pub plugins: Vec<String>,
    pub coercion: Coercion,
    /// Entries kept in the plugin log.
    pub log_capacity: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            window: WindowSettings::default(),
            theme: "dark".to_string(),
            locale: "en".to_string(),
            cell_px: 20.0,
            listen: None,
            base_plugin: STATUS_PLUGIN.to_string(),
            plugins: Vec::new(),
            coercion: Coercion::Strict,
            log_capacity: gridwell_bridge::log::DEFAULT_LOG_CAPACITY,
        }
    }
}

impl Settings {
    /// Read `path`, or return the defaults when it does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No settings at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path).map_err(|e| HostError::io(path, e))?;
        serde_json::from_str(&content).map_err(|e| HostError::json(path, e))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        write_json(path, self)
    }

    pub fn window_size(&self) -> Size {
        Size::new(self.window.width.max(1.0), self.window.height.max(1.0))
    }

    /// Base plugin first, then the others in order, without duplicates.
    pub fn plugin_names(&self) -> Vec<String> {
        let mut names = vec![self.base_plugin.clone()];
        for name in &self.plugins {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
        names
    }
}
