use anyhow::{anyhow, Context, Result};
use clap::ValueEnum;
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::PathBuf,
    sync::{PoisonError, RwLock},
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ValueEnum)]
#[serde(rename_all = "camelCase")]
pub enum LoggingLevel {
    Off,
    Debug,
    Verbose,
}

impl Default for LoggingLevel {
    fn default() -> Self {
        LoggingLevel::Off
    }
}

impl LoggingLevel {
    /// `Off` still reports warnings; it only silences the service's chatter.
    pub fn level_filter(self) -> LevelFilter {
        match self {
            LoggingLevel::Off => LevelFilter::Warn,
            LoggingLevel::Debug => LevelFilter::Debug,
            LoggingLevel::Verbose => LevelFilter::Trace,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct UserPreferences {
    /// Lock the entire fill response behind authentication.
    pub response_auth: bool,
    /// Lock each offered dataset behind authentication.
    pub dataset_auth: bool,
    pub master_password: Option<String>,
    pub logging_level: LoggingLevel,
}

pub struct PreferencesStore {
    path: PathBuf,
    data: RwLock<UserPreferences>,
}

impl PreferencesStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read preferences from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            UserPreferences::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn snapshot(&self) -> UserPreferences {
        self.data.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn is_response_auth(&self) -> bool {
        self.snapshot().response_auth
    }

    pub fn set_response_auth(&self, response_auth: bool) -> Result<()> {
        self.update(|prefs| prefs.response_auth = response_auth)
    }

    pub fn is_dataset_auth(&self) -> bool {
        self.snapshot().dataset_auth
    }

    pub fn set_dataset_auth(&self, dataset_auth: bool) -> Result<()> {
        self.update(|prefs| prefs.dataset_auth = dataset_auth)
    }

    pub fn master_password(&self) -> Option<String> {
        self.snapshot().master_password
    }

    pub fn set_master_password(&self, master_password: String) -> Result<()> {
        self.update(|prefs| prefs.master_password = Some(master_password))
    }

    pub fn clear_credentials(&self) -> Result<()> {
        self.update(|prefs| prefs.master_password = None)
    }

    pub fn logging_level(&self) -> LoggingLevel {
        self.snapshot().logging_level
    }

    /// Stores the level and applies it to the running logger.
    pub fn set_logging_level(&self, level: LoggingLevel) -> Result<()> {
        self.update(|prefs| prefs.logging_level = level)?;
        log::set_max_level(level.level_filter());
        Ok(())
    }

    fn update(&self, apply: impl FnOnce(&mut UserPreferences)) -> Result<()> {
        let mut guard = self
            .data
            .write()
            .map_err(|_| anyhow!("preferences lock poisoned"))?;
        let mut next = guard.clone();
        apply(&mut next);
        self.persist(&next)?;
        *guard = next;
        Ok(())
    }

    fn persist(&self, data: &UserPreferences) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write preferences to {}", self.path.display()))
    }
}
