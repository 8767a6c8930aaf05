//! Settings persistence adapter.
//!
//! Engines only ever receive settings by reference; storage lives behind
//! [`SettingsStore`] so callers can plug in whatever document store they use.

use crate::error::Result;
use crate::schema::DashboardSettings;
use log::{debug, info};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub trait SettingsStore: Send + Sync {
    /// Current settings, or defaults when nothing has been saved yet.
    fn load(&self) -> Result<DashboardSettings>;

    fn save(&self, settings: &DashboardSettings) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    settings: Mutex<Option<DashboardSettings>>,
}

impl MemoryStore {
    pub fn new(settings: DashboardSettings) -> Self {
        Self {
            settings: Mutex::new(Some(settings)),
        }
    }
}

impl SettingsStore for MemoryStore {
    fn load(&self) -> Result<DashboardSettings> {
        let guard = self.settings.lock().unwrap_or_else(|e| e.into_inner());
        Ok(guard.clone().unwrap_or_default())
    }

    fn save(&self, settings: &DashboardSettings) -> Result<()> {
        settings.validate()?;
        let mut guard = self.settings.lock().unwrap_or_else(|e| e.into_inner());
        *guard = Some(settings.clone());
        Ok(())
    }
}

/// Stores settings as pretty-printed JSON at a fixed path.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for JsonFileStore {
    fn load(&self) -> Result<DashboardSettings> {
        if !self.path.exists() {
            debug!("No settings at {:?}, using defaults", self.path);
            return Ok(DashboardSettings::default());
        }
        let body = fs::read_to_string(&self.path)?;
        let settings: DashboardSettings = serde_json::from_str(&body)?;
        settings.validate()?;
        Ok(settings)
    }

    fn save(&self, settings: &DashboardSettings) -> Result<()> {
        settings.validate()?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(settings)?)?;
        info!("Saved dashboard settings to {:?}", self.path);
        Ok(())
    }
}
