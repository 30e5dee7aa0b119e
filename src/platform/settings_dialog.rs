//! Modal hotkey settings window: two drop-down lists plus OK and Cancel.

use std::cell::Cell;
use std::ffi::c_void;

use tracing::debug;
use windows::Win32::Foundation::*;
use windows::Win32::Graphics::Gdi::*;
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::UI::Input::KeyboardAndMouse::{EnableWindow, SetFocus};
use windows::Win32::UI::WindowsAndMessaging::*;
use windows::core::{Error, PCWSTR, Result, w};

use crate::hotkey::HotkeyBinding;
use crate::settings::SettingsForm;
use crate::wide::to_wide;

const WINDOW_CLASS: PCWSTR = w!("MicMuteSettingsDialog");

// Enter and Escape are reported with these ids by IsDialogMessageW.
const ID_OK: u16 = 1;
const ID_CANCEL: u16 = 2;
const ID_KEY_COMBO: u16 = 101;
const ID_MODIFIER_COMBO: u16 = 102;

const LABEL_X: i32 = 10;
const COMBO_X: i32 = 110;
const ROW_HEIGHT: i32 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Confirmed { key: usize, modifier: usize },
    Cancelled,
}

struct DialogState {
    key_combo: HWND,
    modifier_combo: HWND,
    outcome: Cell<Option<Outcome>>,
}

/// Shows the dialog and blocks until it is closed.
///
/// Messages for other windows keep being dispatched meanwhile, so a hotkey
/// press during the dialog is queued rather than lost.
pub fn run(owner: Option<HWND>, form: &SettingsForm) -> Result<Option<HotkeyBinding>> {
    let instance = unsafe { GetModuleHandleW(None)? };
    register_class(instance.into())?;

    let title = to_wide(&form.title);
    let (x, y) = centered(form.width, form.height);
    let hwnd = unsafe {
        CreateWindowExW(
            WS_EX_DLGMODALFRAME | WS_EX_TOPMOST,
            WINDOW_CLASS,
            PCWSTR::from_raw(title.as_ptr()),
            WS_POPUP | WS_CAPTION | WS_SYSMENU,
            x,
            y,
            form.width,
            form.height,
            owner,
            None,
            Some(instance.into()),
            None,
        )
    }?;

    let outcome = build_and_wait(hwnd, owner, instance.into(), form);

    unsafe {
        SetWindowLongPtrW(hwnd, GWLP_USERDATA, 0);
        let _ = DestroyWindow(hwnd);
        if let Some(owner) = owner {
            let _ = EnableWindow(owner, true);
        }
    }

    let binding = match outcome? {
        Outcome::Confirmed { key, modifier } => form.choose(key, modifier),
        Outcome::Cancelled => None,
    };
    debug!(?binding, "settings dialog closed");
    Ok(binding)
}

fn build_and_wait(
    hwnd: HWND,
    owner: Option<HWND>,
    instance: HINSTANCE,
    form: &SettingsForm,
) -> Result<Outcome> {
    let combo_width = form.width - 140;
    let button_y = 80;

    let key_label = to_wide(&form.key_label);
    let modifier_label = to_wide(&form.modifier_label);
    let ok = to_wide(&form.ok);
    let cancel = to_wide(&form.cancel);

    let combo_style = WS_CHILD
        | WS_VISIBLE
        | WS_TABSTOP
        | WS_VSCROLL
        | WINDOW_STYLE(CBS_DROPDOWNLIST as u32);

    let label_style = WS_CHILD | WS_VISIBLE;
    create_control(
        hwnd,
        instance,
        w!("STATIC"),
        PCWSTR::from_raw(key_label.as_ptr()),
        label_style,
        0,
        (LABEL_X, 20, 90, ROW_HEIGHT),
    )?;
    create_control(
        hwnd,
        instance,
        w!("STATIC"),
        PCWSTR::from_raw(modifier_label.as_ptr()),
        label_style,
        0,
        (LABEL_X, 50, 90, ROW_HEIGHT),
    )?;

    let key_combo = create_control(
        hwnd,
        instance,
        w!("COMBOBOX"),
        PCWSTR::null(),
        combo_style,
        ID_KEY_COMBO,
        (COMBO_X, 18, combo_width, 200),
    )?;
    let modifier_combo = create_control(
        hwnd,
        instance,
        w!("COMBOBOX"),
        PCWSTR::null(),
        combo_style,
        ID_MODIFIER_COMBO,
        (COMBO_X, 48, combo_width, 200),
    )?;

    let button_style = WS_CHILD | WS_VISIBLE | WS_TABSTOP;
    create_control(
        hwnd,
        instance,
        w!("BUTTON"),
        PCWSTR::from_raw(ok.as_ptr()),
        button_style | WINDOW_STYLE(BS_DEFPUSHBUTTON as u32),
        ID_OK,
        (form.width / 2 - 90, button_y, 75, 25),
    )?;
    create_control(
        hwnd,
        instance,
        w!("BUTTON"),
        PCWSTR::from_raw(cancel.as_ptr()),
        button_style,
        ID_CANCEL,
        (form.width / 2 + 5, button_y, 75, 25),
    )?;

    for label in form.key_labels() {
        add_item(key_combo, label);
    }
    for label in &form.modifier_labels {
        add_item(modifier_combo, label);
    }
    select_item(key_combo, form.selected_key);
    select_item(modifier_combo, form.selected_modifier);

    let state = Box::new(DialogState {
        key_combo,
        modifier_combo,
        outcome: Cell::new(None),
    });

    unsafe {
        SetWindowLongPtrW(hwnd, GWLP_USERDATA, &*state as *const DialogState as isize);
        if let Some(owner) = owner {
            let _ = EnableWindow(owner, false);
        }
        let _ = ShowWindow(hwnd, SW_SHOW);
        let _ = SetForegroundWindow(hwnd);
        let _ = SetFocus(Some(key_combo));
    }

    let mut msg = MSG::default();
    while state.outcome.get().is_none() {
        let status = unsafe { GetMessageW(&mut msg, None, 0, 0) };
        match status.0 {
            -1 => return Err(Error::from(unsafe { GetLastError() }.to_hresult())),
            0 => {
                // Hand WM_QUIT back to the main loop.
                unsafe { PostQuitMessage(msg.wParam.0 as i32) };
                return Ok(Outcome::Cancelled);
            }
            _ => unsafe {
                if !IsDialogMessageW(hwnd, &msg).as_bool() {
                    let _ = TranslateMessage(&msg);
                    DispatchMessageW(&msg);
                }
            },
        }
    }

    Ok(state.outcome.get().unwrap_or(Outcome::Cancelled))
}

fn register_class(instance: HINSTANCE) -> Result<()> {
    let wc = WNDCLASSW {
        lpfnWndProc: Some(window_procedure),
        hInstance: instance,
        hCursor: unsafe { LoadCursorW::<PCWSTR>(None, IDC_ARROW)? },
        hbrBackground: unsafe { GetSysColorBrush(COLOR_BTNFACE) },
        lpszClassName: WINDOW_CLASS,
        ..Default::default()
    };
    if unsafe { RegisterClassW(&wc) } == 0 {
        let error = unsafe { GetLastError() };
        if error != ERROR_CLASS_ALREADY_EXISTS {
            return Err(Error::from(error.to_hresult()));
        }
    }
    Ok(())
}

fn create_control(
    parent: HWND,
    instance: HINSTANCE,
    class: PCWSTR,
    text: PCWSTR,
    style: WINDOW_STYLE,
    id: u16,
    (x, y, width, height): (i32, i32, i32, i32),
) -> Result<HWND> {
    let hwnd = unsafe {
        CreateWindowExW(
            WINDOW_EX_STYLE::default(),
            class,
            text,
            style,
            x,
            y,
            width,
            height,
            Some(parent),
            Some(HMENU(id as usize as *mut c_void)),
            Some(instance),
            None,
        )
    }?;
    unsafe {
        let font = GetStockObject(DEFAULT_GUI_FONT);
        SendMessageW(
            hwnd,
            WM_SETFONT,
            Some(WPARAM(font.0 as usize)),
            Some(LPARAM(1)),
        );
    }
    Ok(hwnd)
}

fn add_item(combo: HWND, text: &str) {
    let wide = to_wide(text);
    unsafe {
        SendMessageW(
            combo,
            CB_ADDSTRING,
            Some(WPARAM(0)),
            Some(LPARAM(wide.as_ptr() as isize)),
        );
    }
}

fn select_item(combo: HWND, index: usize) {
    unsafe {
        SendMessageW(combo, CB_SETCURSEL, Some(WPARAM(index)), Some(LPARAM(0)));
    }
}

fn selected_item(combo: HWND) -> Option<usize> {
    let result = unsafe { SendMessageW(combo, CB_GETCURSEL, Some(WPARAM(0)), Some(LPARAM(0))) };
    usize::try_from(result.0).ok()
}

fn centered(width: i32, height: i32) -> (i32, i32) {
    let (screen_width, screen_height) =
        unsafe { (GetSystemMetrics(SM_CXSCREEN), GetSystemMetrics(SM_CYSCREEN)) };
    ((screen_width - width) / 2, (screen_height - height) / 2)
}

extern "system" fn window_procedure(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    let state = unsafe { GetWindowLongPtrW(hwnd, GWLP_USERDATA) } as *const DialogState;
    // SAFETY: set while the boxed state is alive and cleared before the window is destroyed.
    let Some(state) = (unsafe { state.as_ref() }) else {
        return unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) };
    };

    match msg {
        WM_COMMAND => {
            match (wparam.0 & 0xFFFF) as u16 {
                ID_OK => {
                    let outcome = match (
                        selected_item(state.key_combo),
                        selected_item(state.modifier_combo),
                    ) {
                        (Some(key), Some(modifier)) => Outcome::Confirmed { key, modifier },
                        _ => Outcome::Cancelled,
                    };
                    state.outcome.set(Some(outcome));
                }
                ID_CANCEL => state.outcome.set(Some(Outcome::Cancelled)),
                _ => {}
            }
            LRESULT(0)
        }
        WM_CLOSE => {
            state.outcome.set(Some(Outcome::Cancelled));
            LRESULT(0)
        }
        _ => unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) },
    }
}
