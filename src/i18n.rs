//! Internationalization support for the tray menu, dialogs and error messages.
//!
//! Display strings are read from `data/lang.json`, a map of locale code to a
//! map of message key to text. Every lookup resolves to something printable:
//! a missing locale or key falls back to a built-in English error table, and
//! after that to the key literal itself.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::strip_bom;

/// Supported languages in the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, Default)]
pub enum Language {
    /// Russian
    #[default]
    #[serde(rename = "ru")]
    Russian,
    /// English
    #[serde(rename = "en")]
    English,
}

impl Language {
    /// Returns all available languages, in menu order.
    pub fn all() -> &'static [Language] {
        &[Language::Russian, Language::English]
    }

    /// Locale code used in the config and translation files.
    pub fn code(self) -> &'static str {
        match self {
            Language::Russian => "ru",
            Language::English => "en",
        }
    }

    /// Parses a locale code, ignoring case and surrounding whitespace.
    pub fn from_code(code: &str) -> Option<Self> {
        let code = code.trim();
        Self::all()
            .iter()
            .copied()
            .find(|lang| lang.code().eq_ignore_ascii_case(code))
    }

    /// Caption of the entry in the language submenu.
    pub fn menu_label(self) -> &'static str {
        match self {
            Language::Russian => "RU",
            Language::English => "EN",
        }
    }
}

/// Every key the application looks up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKey {
    HotkeySettings,
    ToggleMic,
    Exit,
    Language,
    MicOn,
    MicOff,
    HotkeyActive,
    AddedToStartup,
    KeyLabel,
    ModifierLabel,
    ModifierNone,
    ModifierShift,
    ModifierAlt,
    ModifierControl,
    ModifierWin,
    Ok,
    Cancel,
    HotkeySettingsFormTitle,
    ErrConfigLoad,
    ErrConfigSave,
    ErrLangLoad,
    ErrIconsLoad,
    ErrMicStatus,
    ErrToggleMic,
    ErrHotkeyRegister,
    ErrTitle,
}

impl MessageKey {
    pub const ALL: [MessageKey; 26] = [
        MessageKey::HotkeySettings,
        MessageKey::ToggleMic,
        MessageKey::Exit,
        MessageKey::Language,
        MessageKey::MicOn,
        MessageKey::MicOff,
        MessageKey::HotkeyActive,
        MessageKey::AddedToStartup,
        MessageKey::KeyLabel,
        MessageKey::ModifierLabel,
        MessageKey::ModifierNone,
        MessageKey::ModifierShift,
        MessageKey::ModifierAlt,
        MessageKey::ModifierControl,
        MessageKey::ModifierWin,
        MessageKey::Ok,
        MessageKey::Cancel,
        MessageKey::HotkeySettingsFormTitle,
        MessageKey::ErrConfigLoad,
        MessageKey::ErrConfigSave,
        MessageKey::ErrLangLoad,
        MessageKey::ErrIconsLoad,
        MessageKey::ErrMicStatus,
        MessageKey::ErrToggleMic,
        MessageKey::ErrHotkeyRegister,
        MessageKey::ErrTitle,
    ];

    /// Key as written in `lang.json`.
    pub fn as_str(self) -> &'static str {
        match self {
            MessageKey::HotkeySettings => "hotkey_settings",
            MessageKey::ToggleMic => "toggle_mic",
            MessageKey::Exit => "exit",
            MessageKey::Language => "language",
            MessageKey::MicOn => "mic_on",
            MessageKey::MicOff => "mic_off",
            MessageKey::HotkeyActive => "hotkey_active",
            MessageKey::AddedToStartup => "added_to_startup",
            MessageKey::KeyLabel => "key_label",
            MessageKey::ModifierLabel => "modifier_label",
            MessageKey::ModifierNone => "modifier_none",
            MessageKey::ModifierShift => "modifier_shift",
            MessageKey::ModifierAlt => "modifier_alt",
            MessageKey::ModifierControl => "modifier_control",
            MessageKey::ModifierWin => "modifier_win",
            MessageKey::Ok => "ok",
            MessageKey::Cancel => "cancel",
            MessageKey::HotkeySettingsFormTitle => "hotkey_settings_form_title",
            MessageKey::ErrConfigLoad => "err_config_load",
            MessageKey::ErrConfigSave => "err_config_save",
            MessageKey::ErrLangLoad => "err_lang_load",
            MessageKey::ErrIconsLoad => "err_icons_load",
            MessageKey::ErrMicStatus => "err_mic_status",
            MessageKey::ErrToggleMic => "err_toggle_mic",
            MessageKey::ErrHotkeyRegister => "err_hotkey_register",
            MessageKey::ErrTitle => "err_title",
        }
    }

    /// Built-in text for error messages, used when `lang.json` has no entry.
    fn fallback(self) -> Option<&'static str> {
        match self {
            MessageKey::ErrConfigLoad => Some("Error loading config.json: {0}"),
            MessageKey::ErrConfigSave => Some("Error saving config.json: {0}"),
            MessageKey::ErrLangLoad => Some("Error loading lang.json: {0}"),
            MessageKey::ErrIconsLoad => Some("Error loading icons: {0}"),
            MessageKey::ErrMicStatus => Some("Error getting microphone status: {0}"),
            MessageKey::ErrToggleMic => Some("Error toggling microphone: {0}"),
            MessageKey::ErrHotkeyRegister => Some("Failed to register hotkey: {0}"),
            MessageKey::ErrTitle => Some("Error"),
            _ => None,
        }
    }
}

/// Failure to read or parse the translation file.
#[derive(Debug, Error)]
pub enum TranslationError {
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Parse(#[from] serde_json::Error),
}

/// Translation table loaded from `lang.json`. Read-only after load.
#[derive(Debug, Clone, Default)]
pub struct Translations {
    table: HashMap<String, HashMap<String, String>>,
}

impl Translations {
    /// Table with no entries; every lookup falls through to the fallbacks.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, TranslationError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(strip_bom(&content))
    }

    pub fn from_json(json: &str) -> Result<Self, TranslationError> {
        let table = serde_json::from_str(json)?;
        Ok(Self { table })
    }

    /// Returns true if the file had a section for `lang`.
    pub fn has_language(&self, lang: Language) -> bool {
        self.table.contains_key(lang.code())
    }

    /// Resolves `key` for `lang`: translation, then built-in table, then the key literal.
    pub fn resolve(&self, lang: Language, key: MessageKey) -> &str {
        self.table
            .get(lang.code())
            .and_then(|strings| strings.get(key.as_str()))
            .map(String::as_str)
            .filter(|text| !text.is_empty())
            .or_else(|| key.fallback())
            .unwrap_or_else(|| key.as_str())
    }

    /// Resolves a template and substitutes `arg` for its `{0}` placeholder.
    pub fn format(&self, lang: Language, key: MessageKey, arg: &str) -> String {
        fill_template(self.resolve(lang, key), arg)
    }
}

/// Substitutes `arg` for every `{0}` in `template`.
pub fn fill_template(template: &str, arg: &str) -> String {
    template.replace("{0}", arg)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHIPPED: &str = include_str!("../data/lang.json");

    #[test]
    fn test_language_codes() {
        assert_eq!(Language::Russian.code(), "ru");
        assert_eq!(Language::English.code(), "en");
        assert_eq!(Language::from_code("EN"), Some(Language::English));
        assert_eq!(Language::from_code(" ru "), Some(Language::Russian));
        assert_eq!(Language::from_code("de"), None);
        assert_eq!(Language::default(), Language::Russian);
    }

    #[test]
    fn test_language_serde_uses_codes() {
        let json = serde_json::to_string(&Language::English).unwrap();
        assert_eq!(json, "\"en\"");
        let lang: Language = serde_json::from_str("\"ru\"").unwrap();
        assert_eq!(lang, Language::Russian);
    }

    #[test]
    fn test_resolve_exact_entry() {
        let t = Translations::from_json(r#"{"en": {"exit": "Quit"}}"#).unwrap();
        assert_eq!(t.resolve(Language::English, MessageKey::Exit), "Quit");
    }

    #[test]
    fn test_resolve_falls_back_to_error_table() {
        let t = Translations::from_json(r#"{"en": {"exit": "Quit"}}"#).unwrap();
        assert_eq!(t.resolve(Language::English, MessageKey::ErrTitle), "Error");
        assert_eq!(
            t.resolve(Language::Russian, MessageKey::ErrToggleMic),
            "Error toggling microphone: {0}"
        );
    }

    #[test]
    fn test_resolve_falls_back_to_key_literal() {
        let t = Translations::empty();
        assert_eq!(t.resolve(Language::English, MessageKey::ToggleMic), "toggle_mic");
        assert_eq!(
            t.resolve(Language::Russian, MessageKey::HotkeySettingsFormTitle),
            "hotkey_settings_form_title"
        );
    }

    #[test]
    fn test_empty_translation_is_treated_as_missing() {
        let t = Translations::from_json(r#"{"en": {"err_title": ""}}"#).unwrap();
        assert_eq!(t.resolve(Language::English, MessageKey::ErrTitle), "Error");
    }

    #[test]
    fn test_format_fills_placeholder() {
        let t = Translations::empty();
        assert_eq!(
            t.format(Language::English, MessageKey::ErrHotkeyRegister, "Shift+F3"),
            "Failed to register hotkey: Shift+F3"
        );
        assert_eq!(fill_template("no placeholder", "x"), "no placeholder");
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        assert!(matches!(
            Translations::from_json("{ not json"),
            Err(TranslationError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let path = std::env::temp_dir().join("micmute_no_such_lang_file.json");
        assert!(matches!(
            Translations::load_from_file(path),
            Err(TranslationError::Io(_))
        ));
    }

    #[test]
    fn test_every_key_resolves_non_empty() {
        for table in [Translations::empty(), Translations::from_json(SHIPPED).unwrap()] {
            for lang in Language::all() {
                for key in MessageKey::ALL {
                    assert!(
                        !table.resolve(*lang, key).is_empty(),
                        "empty string for {:?}/{:?}",
                        lang,
                        key
                    );
                }
            }
        }
    }

    #[test]
    fn test_shipped_file_translates_every_key() {
        let t = Translations::from_json(SHIPPED).unwrap();
        for lang in Language::all() {
            assert!(t.has_language(*lang), "missing section {:?}", lang);
            for key in MessageKey::ALL {
                assert_ne!(
                    t.resolve(*lang, key),
                    key.as_str(),
                    "untranslated {:?} for {:?}",
                    key,
                    lang
                );
            }
        }
    }

    #[test]
    fn test_shipped_languages_differ() {
        let t = Translations::from_json(SHIPPED).unwrap();
        assert_ne!(
            t.resolve(Language::Russian, MessageKey::ToggleMic),
            t.resolve(Language::English, MessageKey::ToggleMic)
        );
    }
}
