use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::Network;
use crate::recipients::{DEFAULT_MAX_RECIPIENTS, DEFAULT_MIN_RECIPIENTS};
use crate::types::TransferMode;

const SETTINGS_FILE: &str = "stacksend_settings.json";

fn default_min_recipients() -> usize {
    DEFAULT_MIN_RECIPIENTS
}

fn default_max_recipients() -> usize {
    DEFAULT_MAX_RECIPIENTS
}

/// User settings that persist between sessions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSettings {
    #[serde(default)]
    pub selected_network: Network,
    /// Mode the form opens in
    #[serde(default)]
    pub default_mode: TransferMode,
    #[serde(default = "default_min_recipients")]
    pub min_recipients: usize,
    #[serde(default = "default_max_recipients")]
    pub max_recipients: usize,
    /// `<issuer>.<name>` of a self-deployed STX multi-send contract
    #[serde(default)]
    pub stx_contract_override: Option<String>,
    /// `<issuer>.<name>` of a self-deployed token multi-send contract
    #[serde(default)]
    pub token_contract_override: Option<String>,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            selected_network: Network::Mainnet,
            default_mode: TransferMode::Native,
            min_recipients: default_min_recipients(),
            max_recipients: default_max_recipients(),
            stx_contract_override: None,
            token_contract_override: None,
        }
    }
}

/// Fields to change in persisted settings; `None` leaves a field alone
#[derive(Debug, Clone, Default)]
pub struct SettingsUpdate {
    pub selected_network: Option<Network>,
    pub default_mode: Option<TransferMode>,
    pub min_recipients: Option<usize>,
    pub max_recipients: Option<usize>,
    /// Empty string clears the override
    pub stx_contract: Option<String>,
    /// Empty string clears the override
    pub token_contract: Option<String>,
}

impl SettingsUpdate {
    pub fn is_empty(&self) -> bool {
        self.selected_network.is_none()
            && self.default_mode.is_none()
            && self.min_recipients.is_none()
            && self.max_recipients.is_none()
            && self.stx_contract.is_none()
            && self.token_contract.is_none()
    }
}

impl UserSettings {
    /// Get the settings file path
    fn settings_path() -> PathBuf {
        // Try to use the app data directory, fall back to current directory
        if let Some(config_dir) = dirs::config_dir() {
            let app_dir = config_dir.join("stacksend");
            if !app_dir.exists() {
                let _ = fs::create_dir_all(&app_dir);
            }
            app_dir.join(SETTINGS_FILE)
        } else {
            PathBuf::from(SETTINGS_FILE)
        }
    }

    /// Load settings from disk, or return defaults if not found
    pub fn load() -> Self {
        Self::load_from(&Self::settings_path())
    }

    fn load_from(path: &Path) -> Self {
        if path.exists() {
            match fs::read_to_string(path) {
                Ok(content) => match Self::from_json(&content) {
                    Ok(settings) => {
                        tracing::info!("Loaded settings from {:?}", path);
                        return settings;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to parse settings file {:?}: {}", path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read settings file {:?}: {}", path, e);
                }
            }
        }
        tracing::info!("Using default settings");
        Self::default()
    }

    fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Save settings to the per-user config directory
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::settings_path())
    }

    fn save_to(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write settings to {}", path.display()))?;
        tracing::info!("Saved settings to {:?}", path);
        Ok(())
    }

    pub fn settings_path_display() -> String {
        Self::settings_path().display().to_string()
    }

    /// Apply an update in place. Returns whether anything was given.
    pub fn apply(&mut self, update: SettingsUpdate) -> bool {
        let changed = !update.is_empty();
        if let Some(network) = update.selected_network {
            self.selected_network = network;
        }
        if let Some(mode) = update.default_mode {
            self.default_mode = mode;
        }
        if let Some(min) = update.min_recipients {
            self.min_recipients = min;
        }
        if let Some(max) = update.max_recipients {
            self.max_recipients = max;
        }
        if let Some(contract) = update.stx_contract {
            self.set_stx_contract_override(contract);
        }
        if let Some(contract) = update.token_contract {
            self.set_token_contract_override(contract);
        }
        changed
    }

    pub fn get_stx_contract_override(&self) -> Option<&str> {
        self.stx_contract_override.as_deref().filter(|s| !s.is_empty())
    }

    /// Set the STX contract override (empty string removes it)
    pub fn set_stx_contract_override(&mut self, contract: String) {
        self.stx_contract_override = normalize_override(contract);
    }

    pub fn get_token_contract_override(&self) -> Option<&str> {
        self.token_contract_override.as_deref().filter(|s| !s.is_empty())
    }

    /// Set the token contract override (empty string removes it)
    pub fn set_token_contract_override(&mut self, contract: String) {
        self.token_contract_override = normalize_override(contract);
    }
}

fn normalize_override(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
