//! Persistent settings stored as `data/config.json` next to the executable.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use crate::error::AppError;
use crate::hotkey::{FunctionKey, HotkeyBinding, Modifier};
use crate::i18n::Language;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Config {
    #[serde(rename = "Language")]
    pub language: Language,
    #[serde(rename = "Hotkey")]
    pub hotkey: FunctionKey,
    #[serde(rename = "Modifier")]
    pub modifier: Modifier,
}

/// On-disk shape. Values stay untyped so one bad field does not discard
/// the others.
#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    #[serde(rename = "Language", default)]
    language: Option<Value>,
    #[serde(rename = "Hotkey", default)]
    hotkey: Option<Value>,
    #[serde(rename = "Modifier", default)]
    modifier: Option<Value>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0}")]
    Io(#[from] io::Error),
    #[error("{0}")]
    Json(#[from] serde_json::Error),
}

impl Default for Config {
    fn default() -> Self {
        Self {
            language: Language::Russian,
            hotkey: FunctionKey::F9,
            modifier: Modifier::None,
        }
    }
}

impl Config {
    pub fn binding(&self) -> HotkeyBinding {
        HotkeyBinding::new(self.modifier, self.hotkey)
    }

    pub fn set_binding(&mut self, binding: HotkeyBinding) {
        self.modifier = binding.modifier;
        self.hotkey = binding.key;
    }

    /// Parses a config document. Unknown, wrong-typed or missing values take
    /// their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = serde_json::from_str(json)?;
        Ok(Self::from_raw(raw))
    }

    fn from_raw(raw: RawConfig) -> Self {
        let defaults = Self::default();
        Self {
            language: parse_field("Language", raw.language, Language::from_code)
                .unwrap_or(defaults.language),
            hotkey: parse_field("Hotkey", raw.hotkey, FunctionKey::parse)
                .unwrap_or(defaults.hotkey),
            modifier: parse_field("Modifier", raw.modifier, Modifier::parse)
                .unwrap_or(defaults.modifier),
        }
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reads the file at `path`. A leading byte order mark is skipped.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(strip_bom(&content))
    }

    /// Writes the config, creating the parent directory if needed.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let mut json = self.to_json()?;
        json.push('\n');
        fs::write(path, json)?;
        Ok(())
    }
}

/// Parses one config field. Absent values yield `None` silently; values of
/// the wrong type or outside the known set are logged and yield `None`.
fn parse_field<T>(name: &str, value: Option<Value>, parse: fn(&str) -> Option<T>) -> Option<T> {
    let value = value?;
    let parsed = value.as_str().and_then(parse);
    if parsed.is_none() {
        warn!(field = name, %value, "invalid value in config, using default");
    }
    parsed
}

/// Drops the UTF-8 byte order mark some editors prepend.
pub(crate) fn strip_bom(content: &str) -> &str {
    content.strip_prefix('\u{feff}').unwrap_or(content)
}

/// Loads and saves [`Config`] at a fixed path.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the config, never failing.
    ///
    /// A missing or unreadable file yields [`Config::default`], which is then
    /// written back. Each failure is handed to `report` once.
    pub fn load(&self, mut report: impl FnMut(AppError)) -> Config {
        if !self.path.exists() {
            info!(path = %self.path.display(), "config not found, creating default");
            return self.persist_default(&mut report);
        }

        match Config::load_from_file(&self.path) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "config unreadable, resetting");
                report(AppError::ConfigLoad(e));
                self.persist_default(&mut report)
            }
        }
    }

    /// Best-effort write; the caller decides how to report a failure.
    pub fn save(&self, config: &Config) -> Result<(), ConfigError> {
        config.save_to_file(&self.path)
    }

    fn persist_default(&self, report: &mut impl FnMut(AppError)) -> Config {
        let config = Config::default();
        if let Err(e) = self.save(&config) {
            warn!(path = %self.path.display(), error = %e, "failed to write default config");
            report(AppError::ConfigSave(e));
        }
        config
    }
}

/// Locations of the files the application reads and writes.
#[derive(Debug, Clone)]
pub struct AppPaths {
    pub config: PathBuf,
    pub translations: PathBuf,
    pub icon_on: PathBuf,
    pub icon_off: PathBuf,
    pub logs: PathBuf,
}

impl AppPaths {
    /// Layout rooted at `base`: `data/` for JSON and logs, `style/` for icons.
    pub fn new(base: &Path) -> Self {
        let data = base.join("data");
        let style = base.join("style");
        Self {
            config: data.join("config.json"),
            translations: data.join("lang.json"),
            icon_on: style.join("on.ico"),
            icon_off: style.join("off.ico"),
            logs: data.join("logs"),
        }
    }

    /// Layout rooted at the directory holding the running executable.
    pub fn from_current_exe() -> io::Result<Self> {
        let exe = std::env::current_exe()?;
        let base = exe
            .parent()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "executable has no parent"))?;
        Ok(Self::new(base))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.language, Language::Russian);
        assert_eq!(config.hotkey, FunctionKey::F9);
        assert_eq!(config.modifier, Modifier::None);
        assert_eq!(config.binding(), HotkeyBinding::default());
    }

    #[test]
    fn test_json_layout() {
        let json = Config::default().to_json().unwrap();
        assert_eq!(
            json,
            "{\n  \"Language\": \"ru\",\n  \"Hotkey\": \"F9\",\n  \"Modifier\": \"None\"\n}"
        );
    }

    #[test]
    fn test_parse_full_document() {
        let config =
            Config::from_json(r#"{"Language": "en", "Hotkey": "F3", "Modifier": "Shift"}"#)
                .unwrap();
        assert_eq!(config.language, Language::English);
        assert_eq!(config.binding(), HotkeyBinding::new(Modifier::Shift, FunctionKey::F3));
    }

    #[test]
    fn test_invalid_hotkey_falls_back_to_f9() {
        let config = Config::from_json(r#"{"Language": "en", "Hotkey": "F20"}"#).unwrap();
        assert_eq!(config.hotkey, FunctionKey::F9);
        assert_eq!(config.language, Language::English);
        assert_eq!(config.modifier, Modifier::None);
    }

    #[test]
    fn test_values_are_case_insensitive() {
        let config =
            Config::from_json(r#"{"Language": "EN", "Hotkey": "f7", "Modifier": "control"}"#)
                .unwrap();
        assert_eq!(config.language, Language::English);
        assert_eq!(config.binding(), HotkeyBinding::new(Modifier::Control, FunctionKey::F7));
    }

    #[test]
    fn test_unknown_values_fall_back_individually() {
        let config =
            Config::from_json(r#"{"Language": "de", "Hotkey": "F2", "Modifier": "Hyper"}"#)
                .unwrap();
        assert_eq!(config.language, Language::Russian);
        assert_eq!(config.hotkey, FunctionKey::F2);
        assert_eq!(config.modifier, Modifier::None);
    }

    #[test]
    fn test_empty_object_is_default() {
        assert_eq!(Config::from_json("{}").unwrap(), Config::default());
    }

    #[test]
    fn test_non_object_documents_are_rejected() {
        assert!(Config::from_json("[1, 2]").is_err());
        assert!(Config::from_json("garbage").is_err());
        assert!(Config::from_json("\"F9\"").is_err());
    }

    #[test]
    fn test_wrong_typed_field_falls_back() {
        let config =
            Config::from_json(r#"{"Language": "en", "Hotkey": 9, "Modifier": ["Alt"]}"#).unwrap();
        assert_eq!(config.language, Language::English);
        assert_eq!(config.hotkey, FunctionKey::F9);
        assert_eq!(config.modifier, Modifier::None);

        let config = Config::from_json(r#"{"Language": null, "Hotkey": "F4"}"#).unwrap();
        assert_eq!(config.language, Language::Russian);
        assert_eq!(config.hotkey, FunctionKey::F4);
    }

    #[test]
    fn test_strip_bom() {
        assert_eq!(strip_bom("\u{feff}{}"), "{}");
        assert_eq!(strip_bom("{}"), "{}");
    }

    #[test]
    fn test_set_binding() {
        let mut config = Config::default();
        config.set_binding(HotkeyBinding::new(Modifier::Win, FunctionKey::F11));
        assert_eq!(config.hotkey, FunctionKey::F11);
        assert_eq!(config.modifier, Modifier::Win);
    }

    #[test]
    fn test_app_paths_layout() {
        let paths = AppPaths::new(Path::new("base"));
        assert_eq!(paths.config, Path::new("base").join("data").join("config.json"));
        assert_eq!(paths.translations, Path::new("base").join("data").join("lang.json"));
        assert_eq!(paths.icon_on, Path::new("base").join("style").join("on.ico"));
        assert_eq!(paths.icon_off, Path::new("base").join("style").join("off.ico"));
    }
}
