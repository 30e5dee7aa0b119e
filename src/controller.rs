//! Tray controller: owns everything the user sees and dispatches every action.
//!
//! The controller never talks to Win32 directly. Drawing, menus and dialogs go
//! through [`Shell`], mute state through [`MicrophoneEndpoint`], and native
//! notifications come back as [`AppEvent`] values drained from a queue on the
//! UI thread, so no handler runs while another one is in progress.

use std::path::{Path, PathBuf};

use crossbeam_channel::Sender;
use tracing::{debug, info, warn};

use crate::audio::MicrophoneEndpoint;
use crate::autostart::{self, RUN_VALUE_NAME, StartupRegistry};
use crate::config::{AppPaths, Config, ConfigStore};
use crate::error::AppError;
use crate::hotkey::{HotkeyBinding, HotkeyError, HotkeySlot, HotkeyWindow};
use crate::i18n::{Language, MessageKey, Translations};
use crate::icons::{IconError, MicIcon};
use crate::settings::SettingsForm;

/// Tooltip shown before the first successful mute query.
pub const APP_NAME: &str = "Microphone Toggle";

/// Entries of the tray context menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuCommand {
    ToggleHotkey,
    HotkeySettings,
    ToggleMic,
    SwitchLanguage(Language),
    Exit,
}

impl MenuCommand {
    /// Command identifier used in the native menu.
    pub fn id(self) -> u32 {
        match self {
            MenuCommand::Exit => 1000,
            MenuCommand::ToggleHotkey => 1010,
            MenuCommand::HotkeySettings => 1020,
            MenuCommand::ToggleMic => 1030,
            MenuCommand::SwitchLanguage(Language::Russian) => 1040,
            MenuCommand::SwitchLanguage(Language::English) => 1041,
        }
    }

    pub fn from_id(id: u32) -> Option<Self> {
        match id {
            1000 => Some(MenuCommand::Exit),
            1010 => Some(MenuCommand::ToggleHotkey),
            1020 => Some(MenuCommand::HotkeySettings),
            1030 => Some(MenuCommand::ToggleMic),
            1040 => Some(MenuCommand::SwitchLanguage(Language::Russian)),
            1041 => Some(MenuCommand::SwitchLanguage(Language::English)),
            _ => None,
        }
    }
}

/// Notifications delivered to the controller by the message loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEvent {
    /// Left click on the tray icon.
    TrayClicked,
    /// Right click on the tray icon; the controller opens the menu.
    ContextMenu,
    /// The registered global hotkey fired.
    HotkeyPressed,
    /// Explorer recreated the notification area and dropped every icon.
    TaskbarRestarted,
    Menu(MenuCommand),
}

/// Localized captions of the context menu.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MenuCaptions {
    pub hotkey_toggle: String,
    pub hotkey_settings: String,
    pub toggle_mic: String,
    pub language: String,
    pub exit: String,
}

/// Last-rendered tray state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrayView {
    pub icon: MicIcon,
    pub tooltip: String,
    pub menu: MenuCaptions,
    pub hotkey_enabled: bool,
    pub language: Language,
}

/// Native surface the controller draws on.
pub trait Shell {
    type Hotkey: HotkeyWindow + 'static;

    fn create_hotkey_window(&mut self) -> Result<Self::Hotkey, HotkeyError>;

    /// Loads the unmuted and muted icons. On failure the shell keeps a
    /// generic system icon for both states.
    fn load_icons(&mut self, on: &Path, off: &Path) -> Result<(), IconError>;

    /// Adds the tray icon on first call, updates it afterwards.
    fn render(&mut self, view: &TrayView);

    /// Adds the icon again after the notification area was recreated.
    fn restore_icon(&mut self, view: &TrayView);

    /// Shows the context menu and returns the picked entry.
    fn show_menu(&mut self, view: &TrayView) -> Option<MenuCommand>;

    fn show_error(&mut self, title: &str, message: &str);

    fn show_message(&mut self, message: &str);

    /// Runs the settings dialog modally. `None` when cancelled.
    fn edit_hotkey(&mut self, form: &SettingsForm) -> Option<HotkeyBinding>;

    /// Removes the tray icon and ends the message loop.
    fn quit(&mut self);
}

pub struct TrayController<S: Shell, M: MicrophoneEndpoint> {
    shell: S,
    microphone: M,
    store: ConfigStore,
    config: Config,
    translations: Translations,
    hotkey: HotkeySlot<S::Hotkey>,
    events: Sender<AppEvent>,
    view: TrayView,
    running: bool,
}

impl<S: Shell, M: MicrophoneEndpoint> TrayController<S, M> {
    /// Loads settings and resources, shows the tray icon and binds the hotkey.
    ///
    /// Every failure along the way is reported once and replaced by a safe
    /// default; startup itself never fails.
    pub fn start(shell: S, microphone: M, paths: &AppPaths, events: Sender<AppEvent>) -> Self {
        let mut pending = Vec::new();

        let store = ConfigStore::new(&paths.config);
        let config = store.load(|e| pending.push(e));
        info!(
            language = config.language.code(),
            binding = %config.binding(),
            "configuration loaded"
        );

        let translations = match Translations::load_from_file(&paths.translations) {
            Ok(translations) => translations,
            Err(e) => {
                warn!(path = %paths.translations.display(), error = %e, "translations unavailable");
                pending.push(AppError::LangLoad(e));
                Translations::empty()
            }
        };

        let view = TrayView {
            icon: MicIcon::default(),
            tooltip: APP_NAME.to_string(),
            menu: MenuCaptions::default(),
            hotkey_enabled: false,
            language: config.language,
        };

        let mut controller = Self {
            shell,
            microphone,
            store,
            config,
            translations,
            hotkey: HotkeySlot::new(),
            events,
            view,
            running: true,
        };
        controller.view.menu = controller.captions();

        for error in pending {
            controller.report(error);
        }

        if let Err(e) = controller
            .shell
            .load_icons(&paths.icon_on, &paths.icon_off)
        {
            controller.report(AppError::IconsLoad(e));
        }

        controller.shell.render(&controller.view);
        controller.refresh_display();
        controller.register_hotkey();
        controller
    }

    /// Adds the run-on-login entry if it is missing and tells the user once.
    pub fn ensure_autostart<R: StartupRegistry + ?Sized>(&mut self, registry: &mut R, exe: &Path) {
        match autostart::ensure_autostart(registry, RUN_VALUE_NAME, exe) {
            Ok(true) => {
                let message = self.text(MessageKey::AddedToStartup).to_string();
                self.shell.show_message(&message);
            }
            Ok(false) => debug!("startup entry already present"),
            Err(e) => warn!(error = %e, "could not register for startup"),
        }
    }

    pub fn handle(&mut self, event: AppEvent) {
        if !self.running {
            debug!(?event, "ignoring event after exit");
            return;
        }
        debug!(?event, "handling event");

        match event {
            AppEvent::TrayClicked | AppEvent::HotkeyPressed => self.toggle_mute(),
            AppEvent::ContextMenu => {
                if let Some(command) = self.shell.show_menu(&self.view) {
                    self.run_command(command);
                }
            }
            AppEvent::TaskbarRestarted => {
                info!("notification area recreated, restoring icon");
                self.shell.restore_icon(&self.view);
            }
            AppEvent::Menu(command) => self.run_command(command),
        }
    }

    fn run_command(&mut self, command: MenuCommand) {
        match command {
            MenuCommand::ToggleHotkey => self.set_hotkey_enabled(!self.view.hotkey_enabled),
            MenuCommand::HotkeySettings => self.open_hotkey_settings(),
            MenuCommand::ToggleMic => self.toggle_mute(),
            MenuCommand::SwitchLanguage(lang) => self.switch_language(lang),
            MenuCommand::Exit => self.exit(),
        }
    }

    /// Inverts the microphone mute flag and shows the confirmed result.
    pub fn toggle_mute(&mut self) {
        let result = self
            .microphone
            .is_muted()
            .and_then(|muted| self.microphone.set_muted(!muted))
            .and_then(|()| self.microphone.is_muted());

        match result {
            Ok(muted) => {
                info!(muted, "microphone toggled");
                self.show_mute_state(muted);
            }
            Err(e) => self.report(AppError::ToggleMic(e)),
        }
    }

    /// Re-reads the mute flag and updates icon and tooltip.
    pub fn refresh_display(&mut self) {
        match self.microphone.is_muted() {
            Ok(muted) => self.show_mute_state(muted),
            Err(e) => self.report(AppError::MicStatus(e)),
        }
    }

    pub fn set_hotkey_enabled(&mut self, enabled: bool) {
        if enabled {
            self.register_hotkey();
        } else {
            self.hotkey.unregister();
            self.view.hotkey_enabled = false;
            self.shell.render(&self.view);
        }
    }

    pub fn switch_language(&mut self, language: Language) {
        info!(language = language.code(), "switching language");
        self.config.language = language;
        self.save_config();

        self.view.language = language;
        self.view.menu = self.captions();
        let icon = match self.microphone.is_muted() {
            Ok(muted) => MicIcon::for_muted(muted),
            Err(e) => {
                debug!(error = %e, "mute query failed, keeping last icon");
                self.view.icon
            }
        };
        self.show_mute_state(icon == MicIcon::Off);
    }

    pub fn open_hotkey_settings(&mut self) {
        let form = SettingsForm::new(&self.translations, self.config.language, self.config.binding());
        match self.shell.edit_hotkey(&form) {
            Some(binding) => self.apply_settings(binding),
            None => debug!("hotkey settings cancelled"),
        }
    }

    /// Persists `binding` and rebinds the hotkey, even when unchanged.
    pub fn apply_settings(&mut self, binding: HotkeyBinding) {
        info!(%binding, "applying hotkey settings");
        self.config.set_binding(binding);
        self.save_config();
        self.hotkey.unregister();
        self.register_hotkey();
    }

    pub fn exit(&mut self) {
        info!("exiting");
        self.hotkey.unregister();
        self.running = false;
        self.shell.quit();
    }

    pub fn view(&self) -> &TrayView {
        &self.view
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_path(&self) -> PathBuf {
        self.store.path().to_path_buf()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn hotkey_registered(&self) -> bool {
        self.hotkey.is_registered()
    }

    pub fn shell(&self) -> &S {
        &self.shell
    }

    pub fn shell_mut(&mut self) -> &mut S {
        &mut self.shell
    }

    pub fn microphone(&self) -> &M {
        &self.microphone
    }

    fn register_hotkey(&mut self) {
        let binding = self.config.binding();
        let events = self.events.clone();
        let shell = &mut self.shell;

        let result = self.hotkey.register(
            binding,
            || shell.create_hotkey_window(),
            move || {
                if events.send(AppEvent::HotkeyPressed).is_err() {
                    debug!("event queue closed, hotkey press dropped");
                }
            },
        );

        if let Err(source) = result {
            warn!(%binding, error = %source, "hotkey registration failed");
            self.report(AppError::HotkeyRegister { binding, source });
        }

        self.view.hotkey_enabled = self.hotkey.is_registered();
        self.view.menu.hotkey_toggle = self.hotkey_caption();
        self.shell.render(&self.view);
    }

    fn show_mute_state(&mut self, muted: bool) {
        let icon = MicIcon::for_muted(muted);
        self.view.icon = icon;
        self.view.tooltip = self.text(icon.tooltip_key()).to_string();
        self.shell.render(&self.view);
    }

    fn save_config(&mut self) {
        if let Err(e) = self.store.save(&self.config) {
            warn!(path = %self.store.path().display(), error = %e, "failed to save configuration");
            self.report(AppError::ConfigSave(e));
        }
    }

    fn captions(&self) -> MenuCaptions {
        MenuCaptions {
            hotkey_toggle: self.hotkey_caption(),
            hotkey_settings: self.text(MessageKey::HotkeySettings).to_string(),
            toggle_mic: self.text(MessageKey::ToggleMic).to_string(),
            language: self.text(MessageKey::Language).to_string(),
            exit: self.text(MessageKey::Exit).to_string(),
        }
    }

    fn hotkey_caption(&self) -> String {
        self.translations.format(
            self.config.language,
            MessageKey::HotkeyActive,
            &self.config.binding().to_string(),
        )
    }

    fn text(&self, key: MessageKey) -> &str {
        self.translations.resolve(self.config.language, key)
    }

    fn report(&mut self, error: AppError) {
        warn!(error = %error, "reporting error to user");
        let title = self.text(MessageKey::ErrTitle).to_string();
        let message =
            self.translations
                .format(self.config.language, error.message_key(), &error.detail());
        self.shell.show_error(&title, &message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_menu_ids_round_trip() {
        let commands = [
            MenuCommand::ToggleHotkey,
            MenuCommand::HotkeySettings,
            MenuCommand::ToggleMic,
            MenuCommand::SwitchLanguage(Language::Russian),
            MenuCommand::SwitchLanguage(Language::English),
            MenuCommand::Exit,
        ];
        for command in commands {
            assert_eq!(MenuCommand::from_id(command.id()), Some(command));
        }
        assert_eq!(MenuCommand::from_id(0), None);
        assert_eq!(MenuCommand::from_id(9000), None);
    }

    #[test]
    fn test_menu_ids_are_unique() {
        let mut ids = vec![
            MenuCommand::ToggleHotkey.id(),
            MenuCommand::HotkeySettings.id(),
            MenuCommand::ToggleMic.id(),
            MenuCommand::SwitchLanguage(Language::Russian).id(),
            MenuCommand::SwitchLanguage(Language::English).id(),
            MenuCommand::Exit.id(),
        ];
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 6);
    }
}
