//! Persistent application settings (JSON file in app data directory).

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use roundup_core::normalize_language;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct AppSettings {
    pub api_key: Option<String>,
    pub model: String,
    pub language: String,
    pub preferred_input_device: Option<String>,
    pub request_timeout_secs: u64,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gemini-2.5-flash".into(),
            language: "en".into(),
            preferred_input_device: None,
            request_timeout_secs: 120,
        }
    }
}

/// Settings snapshot returned to the frontend. The API key itself never
/// crosses the IPC boundary, only its presence.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeSettings {
    pub has_api_key: bool,
    pub model: String,
    pub language: String,
    pub preferred_input_device: Option<String>,
    pub request_timeout_secs: u64,
}

impl AppSettings {
    pub fn normalize(&mut self) {
        self.api_key = self
            .api_key
            .as_ref()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());
        self.model = normalize_model(&self.model);
        self.language = normalize_language(&self.language).code().to_string();
        self.preferred_input_device = self
            .preferred_input_device
            .as_ref()
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
        self.request_timeout_secs = self.request_timeout_secs.clamp(10, 600);
    }

    pub fn runtime_settings(&self) -> RuntimeSettings {
        RuntimeSettings {
            has_api_key: self.api_key.is_some(),
            model: self.model.clone(),
            language: self.language.clone(),
            preferred_input_device: self.preferred_input_device.clone(),
            request_timeout_secs: self.request_timeout_secs,
        }
    }
}

pub fn normalize_model(raw: &str) -> String {
    let model = raw.trim();
    if model.is_empty() {
        "gemini-2.5-flash".into()
    } else {
        model.into()
    }
}

/// Environment variables win over the settings file: apply file values only
/// where no variable is already set.
pub fn apply_runtime_env_from_settings(settings: &AppSettings) {
    if std::env::var("ROUNDUP_MODEL").is_err() {
        std::env::set_var("ROUNDUP_MODEL", &settings.model);
    }
    if std::env::var("ROUNDUP_LANGUAGE").is_err() {
        std::env::set_var("ROUNDUP_LANGUAGE", &settings.language);
    }
    if std::env::var("ROUNDUP_API_KEY").is_err() {
        if let Some(key) = settings.api_key.as_ref() {
            std::env::set_var("ROUNDUP_API_KEY", key);
        }
    }
}

pub fn default_settings_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("Lattice Labs")
            .join("Roundup")
            .join("settings.json")
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var_os("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                std::env::var_os("HOME")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("/tmp"))
                    .join(".local")
                    .join("share")
            })
            .join("roundup")
            .join("settings.json")
    }
}

pub fn load_settings(path: &Path) -> AppSettings {
    let mut settings = fs::read_to_string(path)
        .ok()
        .and_then(|raw| serde_json::from_str::<AppSettings>(&raw).ok())
        .unwrap_or_default();
    settings.normalize();
    settings
}

pub fn save_settings(path: &Path, settings: &AppSettings) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(settings).map_err(std::io::Error::other)?;
    fs::write(path, json)
}
