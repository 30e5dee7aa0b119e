//! Core modules for the micmute tray application.
//!
//! Everything except `platform` is OS-independent so it can be tested on any
//! host; the binary wires it to Win32.

pub mod audio;
pub mod autostart;
pub mod config;
pub mod controller;
pub mod error;
pub mod hotkey;
pub mod i18n;
pub mod icons;
pub mod logging;
#[cfg(windows)]
pub mod platform;
pub mod settings;
#[cfg(windows)]
pub(crate) mod wide;

// Re-export types for test modules
pub use config::{AppPaths, Config};
pub use controller::{AppEvent, MenuCommand, Shell, TrayController, TrayView};
pub use hotkey::{FunctionKey, HotkeyBinding, Modifier};
pub use i18n::{Language, MessageKey, Translations};
