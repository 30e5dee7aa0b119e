//! Message-only window that owns the global hotkey registration.

use std::cell::{Cell, RefCell};

use tracing::{debug, warn};
use windows::Win32::Foundation::*;
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::UI::Input::KeyboardAndMouse::{
    HOT_KEY_MODIFIERS, MOD_NOREPEAT, RegisterHotKey, UnregisterHotKey,
};
use windows::Win32::UI::WindowsAndMessaging::*;
use windows::core::{PCWSTR, w};

use crate::hotkey::{HotkeyError, HotkeyWindow};

const WINDOW_CLASS: PCWSTR = w!("MicMuteHotkeyWindow");

/// Shared with the window procedure through `GWLP_USERDATA`.
#[derive(Default)]
struct HotkeyState {
    id: Cell<Option<i32>>,
    callback: RefCell<Option<Box<dyn Fn()>>>,
}

pub struct MessageHotkeyWindow {
    hwnd: Option<HWND>,
    state: Box<HotkeyState>,
}

impl MessageHotkeyWindow {
    pub fn new() -> Result<Self, HotkeyError> {
        let instance = unsafe { GetModuleHandleW(None) }
            .map_err(|e| HotkeyError::Window(e.message().to_string()))?;

        let wc = WNDCLASSW {
            lpfnWndProc: Some(Self::window_procedure),
            hInstance: instance.into(),
            lpszClassName: WINDOW_CLASS,
            ..Default::default()
        };
        if unsafe { RegisterClassW(&wc) } == 0 {
            let error = unsafe { GetLastError() };
            if error != ERROR_CLASS_ALREADY_EXISTS {
                return Err(HotkeyError::Window(
                    windows::core::Error::from(error.to_hresult()).message().to_string(),
                ));
            }
        }

        let hwnd = unsafe {
            CreateWindowExW(
                WINDOW_EX_STYLE::default(),
                WINDOW_CLASS,
                w!("micmute hotkey"),
                WINDOW_STYLE::default(),
                0,
                0,
                0,
                0,
                Some(HWND_MESSAGE),
                None,
                Some(instance.into()),
                None,
            )
        }
        .map_err(|e| HotkeyError::Window(e.message().to_string()))?;

        let state = Box::new(HotkeyState::default());
        unsafe {
            SetWindowLongPtrW(hwnd, GWLP_USERDATA, &*state as *const HotkeyState as isize);
        }
        debug!(?hwnd, "hotkey window created");

        Ok(Self {
            hwnd: Some(hwnd),
            state,
        })
    }

    /// Releases the binding and destroys the window. Safe to call twice.
    pub fn destroy(&mut self) {
        self.unregister();
        if let Some(hwnd) = self.hwnd.take() {
            unsafe {
                SetWindowLongPtrW(hwnd, GWLP_USERDATA, 0);
                if let Err(e) = DestroyWindow(hwnd) {
                    warn!(error = %e, "failed to destroy hotkey window");
                }
            }
            debug!("hotkey window destroyed");
        }
    }

    extern "system" fn window_procedure(
        hwnd: HWND,
        msg: u32,
        wparam: WPARAM,
        lparam: LPARAM,
    ) -> LRESULT {
        if msg == WM_HOTKEY {
            let state = unsafe { GetWindowLongPtrW(hwnd, GWLP_USERDATA) } as *const HotkeyState;
            // SAFETY: set in `new` from a live box and cleared before the box is freed.
            if let Some(state) = unsafe { state.as_ref() }
                && state.id.get() == Some(wparam.0 as i32)
                && let Ok(callback) = state.callback.try_borrow()
                && let Some(callback) = callback.as_ref()
            {
                callback();
            }
        }
        unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) }
    }
}

impl HotkeyWindow for MessageHotkeyWindow {
    fn register(&mut self, id: i32, modifiers: u32, virtual_key: u32) -> Result<(), HotkeyError> {
        let hwnd = self
            .hwnd
            .ok_or_else(|| HotkeyError::Window("window already destroyed".to_string()))?;
        let modifiers = HOT_KEY_MODIFIERS(modifiers) | MOD_NOREPEAT;
        unsafe { RegisterHotKey(Some(hwnd), id, modifiers, virtual_key) }
            .map_err(|e| HotkeyError::Rejected(e.message().to_string()))?;
        self.state.id.set(Some(id));
        Ok(())
    }

    fn unregister(&mut self) {
        if let (Some(hwnd), Some(id)) = (self.hwnd, self.state.id.take())
            && let Err(e) = unsafe { UnregisterHotKey(Some(hwnd), id) }
        {
            warn!(id, error = %e, "UnregisterHotKey failed");
        }
    }

    fn on_activated(&mut self, callback: Box<dyn Fn()>) {
        *self.state.callback.borrow_mut() = Some(callback);
    }
}

impl Drop for MessageHotkeyWindow {
    fn drop(&mut self) {
        self.destroy();
    }
}
