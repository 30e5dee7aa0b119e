//! User-visible failure classes.
//!
//! Each variant maps to exactly one localized message template; the template
//! is filled with [`AppError::detail`] and shown in a single modal dialog.

use thiserror::Error;

use crate::audio::AudioError;
use crate::config::ConfigError;
use crate::hotkey::{HotkeyBinding, HotkeyError};
use crate::i18n::{MessageKey, TranslationError};
use crate::icons::IconError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to load configuration: {0}")]
    ConfigLoad(#[source] ConfigError),
    #[error("failed to save configuration: {0}")]
    ConfigSave(#[source] ConfigError),
    #[error("failed to load translations: {0}")]
    LangLoad(#[source] TranslationError),
    #[error("failed to load icons: {0}")]
    IconsLoad(#[source] IconError),
    #[error("failed to read microphone state: {0}")]
    MicStatus(#[source] AudioError),
    #[error("failed to toggle microphone: {0}")]
    ToggleMic(#[source] AudioError),
    #[error("failed to register hotkey {binding}: {source}")]
    HotkeyRegister {
        binding: HotkeyBinding,
        source: HotkeyError,
    },
}

impl AppError {
    /// Template used to present this failure.
    pub fn message_key(&self) -> MessageKey {
        match self {
            AppError::ConfigLoad(_) => MessageKey::ErrConfigLoad,
            AppError::ConfigSave(_) => MessageKey::ErrConfigSave,
            AppError::LangLoad(_) => MessageKey::ErrLangLoad,
            AppError::IconsLoad(_) => MessageKey::ErrIconsLoad,
            AppError::MicStatus(_) => MessageKey::ErrMicStatus,
            AppError::ToggleMic(_) => MessageKey::ErrToggleMic,
            AppError::HotkeyRegister { .. } => MessageKey::ErrHotkeyRegister,
        }
    }

    /// Text substituted into the template's `{0}`.
    pub fn detail(&self) -> String {
        match self {
            AppError::ConfigLoad(e) | AppError::ConfigSave(e) => e.to_string(),
            AppError::LangLoad(e) => e.to_string(),
            AppError::IconsLoad(e) => e.to_string(),
            AppError::MicStatus(e) | AppError::ToggleMic(e) => e.to_string(),
            AppError::HotkeyRegister { binding, .. } => binding.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hotkey::{FunctionKey, Modifier};
    use std::io;

    #[test]
    fn test_message_keys() {
        let io_err = || ConfigError::Io(io::Error::other("disk"));
        assert_eq!(AppError::ConfigLoad(io_err()).message_key(), MessageKey::ErrConfigLoad);
        assert_eq!(AppError::ConfigSave(io_err()).message_key(), MessageKey::ErrConfigSave);
        assert_eq!(
            AppError::MicStatus(AudioError::NoDevice).message_key(),
            MessageKey::ErrMicStatus
        );
        assert_eq!(
            AppError::ToggleMic(AudioError::NoDevice).message_key(),
            MessageKey::ErrToggleMic
        );
    }

    #[test]
    fn test_detail_is_inner_message() {
        let err = AppError::ConfigSave(ConfigError::Io(io::Error::other("access denied")));
        assert_eq!(err.detail(), "access denied");
        assert!(err.to_string().contains("access denied"));
    }

    #[test]
    fn test_hotkey_detail_is_binding() {
        let err = AppError::HotkeyRegister {
            binding: HotkeyBinding::new(Modifier::Alt, FunctionKey::F4),
            source: HotkeyError::Rejected("taken".into()),
        };
        assert_eq!(err.message_key(), MessageKey::ErrHotkeyRegister);
        assert_eq!(err.detail(), "Alt+F4");
    }
}
