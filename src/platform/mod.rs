//! Win32 side of the application: tray icon, hotkey window, settings dialog
//! and the UI-thread message loop.

mod hotkey_window;
mod settings_dialog;
mod tray;

pub use hotkey_window::MessageHotkeyWindow;
pub use tray::WindowsShell;

use anyhow::{Result, bail};
use crossbeam_channel::Receiver;
use tracing::info;
use windows::Win32::Foundation::GetLastError;
use windows::Win32::UI::WindowsAndMessaging::{
    DispatchMessageW, GetMessageW, MSG, TranslateMessage,
};

use crate::audio::MicrophoneEndpoint;
use crate::controller::{AppEvent, TrayController};

/// Pumps window messages until the tray window is destroyed.
///
/// Window procedures only enqueue [`AppEvent`]s; the queue is drained here
/// after every dispatched message so the controller is never re-entered.
pub fn run<M: MicrophoneEndpoint>(
    controller: &mut TrayController<WindowsShell, M>,
    events: &Receiver<AppEvent>,
) -> Result<()> {
    let mut msg = MSG::default();
    loop {
        drain(controller, events);
        if !controller.is_running() {
            break;
        }

        let status = unsafe { GetMessageW(&mut msg, None, 0, 0) };
        match status.0 {
            0 => break,
            -1 => {
                let error = unsafe { GetLastError() };
                bail!("GetMessageW failed: {}", windows::core::Error::from(error.to_hresult()));
            }
            _ => unsafe {
                let _ = TranslateMessage(&msg);
                DispatchMessageW(&msg);
            },
        }
    }

    drain(controller, events);
    info!("message loop finished");
    Ok(())
}

fn drain<M: MicrophoneEndpoint>(
    controller: &mut TrayController<WindowsShell, M>,
    events: &Receiver<AppEvent>,
) {
    while let Ok(event) = events.try_recv() {
        controller.handle(event);
    }
}
