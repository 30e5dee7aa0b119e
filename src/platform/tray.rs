use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};

use anyhow::Result;
use crossbeam_channel::Sender;
use tracing::{debug, warn};
use windows::Win32::Foundation::*;
use windows::Win32::Graphics::Gdi::*;
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::UI::Shell::*;
use windows::Win32::UI::WindowsAndMessaging::*;
use windows::core::{Error, PCWSTR, w};

use super::hotkey_window::MessageHotkeyWindow;
use super::settings_dialog;
use crate::controller::{APP_NAME, AppEvent, MenuCommand, Shell, TrayView};
use crate::hotkey::{HotkeyBinding, HotkeyError};
use crate::i18n::Language;
use crate::icons::{IconError, MicIcon, best_icon_size};
use crate::settings::SettingsForm;
use crate::wide::{copy_to_buffer, path_to_wide, to_wide};

const TRAY_MESSAGE_ID: u32 = WM_APP + 1;
const WINDOW_CLASS: PCWSTR = w!("MicMuteTrayWindow");

/// Id of the `TaskbarCreated` broadcast; 0 until registered.
static TASKBAR_CREATED: AtomicU32 = AtomicU32::new(0);

/// Hidden window that owns the notification-area icon.
pub struct WindowsShell {
    hwnd: Option<HWND>,
    nid: NOTIFYICONDATAW,
    added: bool,
    fallback_icon: HICON,
    loaded_icons: Option<(HICON, HICON)>,
    // Boxed so the window procedure can hold a stable pointer to it.
    #[allow(dead_code)]
    events: Box<Sender<AppEvent>>,
}

impl WindowsShell {
    pub fn new(events: Sender<AppEvent>) -> Result<Self> {
        let instance = unsafe { GetModuleHandleW(None)? };
        let fallback_icon = unsafe { LoadIconW::<PCWSTR>(None, IDI_APPLICATION)? };

        let wc = WNDCLASSW {
            style: CS_HREDRAW | CS_VREDRAW,
            lpfnWndProc: Some(Self::window_procedure),
            hInstance: instance.into(),
            hIcon: fallback_icon,
            hCursor: unsafe { LoadCursorW::<PCWSTR>(None, IDC_ARROW)? },
            hbrBackground: unsafe { GetSysColorBrush(SYS_COLOR_INDEX(COLOR_WINDOW.0 + 1)) },
            lpszClassName: WINDOW_CLASS,
            ..Default::default()
        };
        if unsafe { RegisterClassW(&wc) } == 0 {
            return Err(Error::new(E_FAIL, "Failed to register window class").into());
        }

        // Never shown; only receives tray callbacks.
        let hwnd = unsafe {
            CreateWindowExW(
                WINDOW_EX_STYLE::default(),
                WINDOW_CLASS,
                w!("micmute"),
                WS_OVERLAPPEDWINDOW,
                CW_USEDEFAULT,
                CW_USEDEFAULT,
                CW_USEDEFAULT,
                CW_USEDEFAULT,
                None,
                None,
                Some(instance.into()),
                None,
            )
        }?;

        match unsafe { RegisterWindowMessageW(w!("TaskbarCreated")) } {
            0 => warn!("failed to register TaskbarCreated, icon will not survive an Explorer restart"),
            id => TASKBAR_CREATED.store(id, Ordering::Relaxed),
        }

        let events = Box::new(events);
        unsafe {
            SetWindowLongPtrW(hwnd, GWLP_USERDATA, &*events as *const Sender<AppEvent> as isize);
        }

        let mut nid = NOTIFYICONDATAW {
            cbSize: std::mem::size_of::<NOTIFYICONDATAW>() as u32,
            hWnd: hwnd,
            uID: 1,
            uFlags: NIF_ICON | NIF_MESSAGE | NIF_TIP | NIF_SHOWTIP,
            uCallbackMessage: TRAY_MESSAGE_ID,
            hIcon: fallback_icon,
            ..Default::default()
        };
        copy_to_buffer(&mut nid.szTip, APP_NAME);

        Ok(Self {
            hwnd: Some(hwnd),
            nid,
            added: false,
            fallback_icon,
            loaded_icons: None,
            events,
        })
    }

    fn icon_for(&self, icon: MicIcon) -> HICON {
        match (self.loaded_icons, icon) {
            (Some((on, _)), MicIcon::On) => on,
            (Some((_, off)), MicIcon::Off) => off,
            (None, _) => self.fallback_icon,
        }
    }

    fn load_icon_file(path: &Path, size: i32) -> Result<HICON, IconError> {
        let (width, height) = best_icon_size(path, size.max(1) as u32)?;
        let wide_path = path_to_wide(path);
        let handle = unsafe {
            LoadImageW(
                None,
                PCWSTR::from_raw(wide_path.as_ptr()),
                IMAGE_ICON,
                width as i32,
                height as i32,
                LR_LOADFROMFILE,
            )
        }
        .map_err(|e| IconError::Os {
            path: path.display().to_string(),
            message: e.message().to_string(),
        })?;
        Ok(HICON(handle.0))
    }

    fn track_menu(
        &self,
        hwnd: HWND,
        view: &TrayView,
    ) -> windows::core::Result<Option<MenuCommand>> {
        let toggle_caption = to_wide(&view.menu.hotkey_toggle);
        let settings_caption = to_wide(&view.menu.hotkey_settings);
        let mic_caption = to_wide(&view.menu.toggle_mic);
        let language_caption = to_wide(&view.menu.language);
        let exit_caption = to_wide(&view.menu.exit);
        let language_labels: Vec<(Language, Vec<u16>)> = Language::all()
            .iter()
            .map(|lang| (*lang, to_wide(lang.menu_label())))
            .collect();

        unsafe {
            let menu = CreatePopupMenu()?;
            let languages = CreatePopupMenu()?;

            let checked = |on: bool| if on { MF_CHECKED } else { MF_UNCHECKED };

            AppendMenuW(
                menu,
                MF_STRING | checked(view.hotkey_enabled),
                MenuCommand::ToggleHotkey.id() as usize,
                PCWSTR::from_raw(toggle_caption.as_ptr()),
            )?;
            AppendMenuW(
                menu,
                MF_STRING,
                MenuCommand::HotkeySettings.id() as usize,
                PCWSTR::from_raw(settings_caption.as_ptr()),
            )?;
            AppendMenuW(
                menu,
                MF_STRING,
                MenuCommand::ToggleMic.id() as usize,
                PCWSTR::from_raw(mic_caption.as_ptr()),
            )?;

            for (lang, label) in &language_labels {
                AppendMenuW(
                    languages,
                    MF_STRING | checked(*lang == view.language),
                    MenuCommand::SwitchLanguage(*lang).id() as usize,
                    PCWSTR::from_raw(label.as_ptr()),
                )?;
            }
            AppendMenuW(
                menu,
                MF_POPUP,
                languages.0 as usize,
                PCWSTR::from_raw(language_caption.as_ptr()),
            )?;

            AppendMenuW(menu, MF_SEPARATOR, 0, PCWSTR::null())?;
            AppendMenuW(
                menu,
                MF_STRING,
                MenuCommand::Exit.id() as usize,
                PCWSTR::from_raw(exit_caption.as_ptr()),
            )?;

            let mut pos = POINT::default();
            GetCursorPos(&mut pos)?;

            // The menu does not close on outside clicks unless the owner is foreground.
            let _ = SetForegroundWindow(hwnd);
            let picked = TrackPopupMenu(
                menu,
                TPM_LEFTALIGN | TPM_BOTTOMALIGN | TPM_RIGHTBUTTON | TPM_RETURNCMD | TPM_NONOTIFY,
                pos.x,
                pos.y,
                Some(0),
                hwnd,
                None,
            );
            let _ = PostMessageW(Some(hwnd), WM_NULL, WPARAM(0), LPARAM(0));
            let _ = DestroyMenu(menu);

            Ok(MenuCommand::from_id(picked.0 as u32))
        }
    }

    extern "system" fn window_procedure(
        hwnd: HWND,
        msg: u32,
        wparam: WPARAM,
        lparam: LPARAM,
    ) -> LRESULT {
        if is_registered_message(msg, TASKBAR_CREATED.load(Ordering::Relaxed)) {
            Self::send_event(hwnd, AppEvent::TaskbarRestarted);
            return LRESULT(0);
        }
        match msg {
            TRAY_MESSAGE_ID => Self::handle_tray_message(hwnd, lparam),
            WM_DESTROY => Self::handle_destroy(),
            _ => unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) },
        }
    }

    fn handle_tray_message(hwnd: HWND, lparam: LPARAM) -> LRESULT {
        let event = match loword(lparam.0 as u32) as u32 {
            WM_LBUTTONUP => AppEvent::TrayClicked,
            WM_RBUTTONUP => AppEvent::ContextMenu,
            _ => return LRESULT(0),
        };
        Self::send_event(hwnd, event);
        LRESULT(0)
    }

    fn send_event(hwnd: HWND, event: AppEvent) {
        let sender = unsafe { GetWindowLongPtrW(hwnd, GWLP_USERDATA) } as *const Sender<AppEvent>;
        // SAFETY: points into the shell's boxed sender and is cleared before it is dropped.
        if let Some(sender) = unsafe { sender.as_ref() }
            && sender.send(event).is_err()
        {
            debug!(?event, "event queue closed");
        }
    }

    fn handle_destroy() -> LRESULT {
        unsafe {
            PostQuitMessage(0);
        }
        LRESULT(0)
    }

    fn remove_icon(&mut self) {
        if self.added {
            unsafe {
                let _ = Shell_NotifyIconW(NIM_DELETE, &self.nid);
            }
            self.added = false;
        }
    }

    fn destroy_window(&mut self) {
        if let Some(hwnd) = self.hwnd.take() {
            unsafe {
                SetWindowLongPtrW(hwnd, GWLP_USERDATA, 0);
                let _ = DestroyWindow(hwnd);
            }
        }
    }
}

impl Shell for WindowsShell {
    type Hotkey = MessageHotkeyWindow;

    fn create_hotkey_window(&mut self) -> Result<MessageHotkeyWindow, HotkeyError> {
        MessageHotkeyWindow::new()
    }

    fn load_icons(&mut self, on: &Path, off: &Path) -> Result<(), IconError> {
        let size = unsafe { GetSystemMetrics(SM_CXSMICON) };
        let on_icon = Self::load_icon_file(on, size)?;
        let off_icon = match Self::load_icon_file(off, size) {
            Ok(icon) => icon,
            Err(e) => {
                unsafe {
                    let _ = DestroyIcon(on_icon);
                }
                return Err(e);
            }
        };
        debug!(size, "tray icons loaded");
        self.loaded_icons = Some((on_icon, off_icon));
        Ok(())
    }

    fn render(&mut self, view: &TrayView) {
        self.nid.hIcon = self.icon_for(view.icon);
        copy_to_buffer(&mut self.nid.szTip, &view.tooltip);

        let action = notify_action(self.added);
        if unsafe { Shell_NotifyIconW(action, &self.nid) }.as_bool() {
            self.added = true;
        } else {
            warn!(?action, "Shell_NotifyIconW failed");
        }
    }

    fn restore_icon(&mut self, view: &TrayView) {
        // The new notification area knows nothing of the old icon.
        self.added = false;
        self.render(view);
    }

    fn show_menu(&mut self, view: &TrayView) -> Option<MenuCommand> {
        let hwnd = self.hwnd?;
        match self.track_menu(hwnd, view) {
            Ok(command) => command,
            Err(e) => {
                warn!(error = %e, "failed to show context menu");
                None
            }
        }
    }

    fn show_error(&mut self, title: &str, message: &str) {
        let title = to_wide(title);
        let message = to_wide(message);
        unsafe {
            let _ = MessageBoxW(
                None,
                PCWSTR::from_raw(message.as_ptr()),
                PCWSTR::from_raw(title.as_ptr()),
                MB_OK | MB_ICONERROR,
            );
        }
    }

    fn show_message(&mut self, message: &str) {
        let title = to_wide(APP_NAME);
        let message = to_wide(message);
        unsafe {
            let _ = MessageBoxW(
                None,
                PCWSTR::from_raw(message.as_ptr()),
                PCWSTR::from_raw(title.as_ptr()),
                MB_OK | MB_ICONINFORMATION,
            );
        }
    }

    fn edit_hotkey(&mut self, form: &SettingsForm) -> Option<HotkeyBinding> {
        match settings_dialog::run(self.hwnd, form) {
            Ok(binding) => binding,
            Err(e) => {
                warn!(error = %e, "settings dialog failed");
                None
            }
        }
    }

    fn quit(&mut self) {
        self.remove_icon();
        // WM_DESTROY posts the quit message that ends the loop.
        self.destroy_window();
    }
}

impl Drop for WindowsShell {
    fn drop(&mut self) {
        self.remove_icon();
        self.destroy_window();
        if let Some((on, off)) = self.loaded_icons.take() {
            unsafe {
                let _ = DestroyIcon(on);
                let _ = DestroyIcon(off);
            }
        }
    }
}

/// `NIM_ADD` until the shell has accepted the icon, `NIM_MODIFY` after.
fn notify_action(added: bool) -> NOTIFY_ICON_MESSAGE {
    if added { NIM_MODIFY } else { NIM_ADD }
}

/// Registered message ids are never 0, so an unregistered id matches nothing.
fn is_registered_message(msg: u32, registered: u32) -> bool {
    registered != 0 && msg == registered
}

/// Extract the lower 16 bits of the 32-bit value
fn loword(value: u32) -> u16 {
    (value & 0xFFFF) as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loword_extraction() {
        assert_eq!(loword(0x12345678), 0x5678);
        assert_eq!(loword(0x0000FFFF), 0xFFFF);
        assert_eq!(loword(WM_RBUTTONUP), WM_RBUTTONUP as u16);
    }

    #[test]
    fn test_notify_action_after_reset() {
        assert_eq!(notify_action(true), NIM_MODIFY);
        // restore_icon clears `added`, so the next render adds the icon again.
        assert_eq!(notify_action(false), NIM_ADD);
    }

    #[test]
    fn test_taskbar_created_matching() {
        assert!(!is_registered_message(WM_NULL, 0));
        assert!(!is_registered_message(0xC0F0, 0));
        assert!(is_registered_message(0xC0F0, 0xC0F0));
        assert!(!is_registered_message(TRAY_MESSAGE_ID, 0xC0F0));
    }

    #[test]
    fn test_tray_message_id() {
        assert!(TRAY_MESSAGE_ID > WM_APP);
        assert_eq!(TRAY_MESSAGE_ID, WM_APP + 1);
    }
}
