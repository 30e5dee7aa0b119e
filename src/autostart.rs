//! Run-on-login registration under the current user's `Run` key.

use std::path::Path;

use thiserror::Error;
use tracing::info;

#[cfg(windows)]
pub use self::registry::RunKey;

/// Value name of the autostart entry.
pub const RUN_VALUE_NAME: &str = "MicrophoneToggleApp";

#[derive(Debug, Error)]
pub enum AutostartError {
    #[error("failed to open the Run key: {0}")]
    Open(String),
    #[error("failed to query the Run key: {0}")]
    Query(String),
    #[error("failed to write the Run key: {0}")]
    Write(String),
}

/// Storage for named run-on-login commands.
pub trait StartupRegistry {
    fn has_entry(&self, name: &str) -> Result<bool, AutostartError>;
    fn set_entry(&mut self, name: &str, command: &str) -> Result<(), AutostartError>;
}

/// Command line stored for `exe`, quoted so paths with spaces survive.
pub fn launch_command(exe: &Path) -> String {
    format!("\"{}\"", exe.display())
}

/// Adds an entry for `exe` unless one named `name` already exists.
///
/// Returns `true` when the entry was created by this call.
pub fn ensure_autostart<R: StartupRegistry + ?Sized>(
    registry: &mut R,
    name: &str,
    exe: &Path,
) -> Result<bool, AutostartError> {
    if registry.has_entry(name)? {
        return Ok(false);
    }
    let command = launch_command(exe);
    registry.set_entry(name, &command)?;
    info!(name, command = %command, "added to startup");
    Ok(true)
}

#[cfg(windows)]
mod registry {
    use windows::Win32::Foundation::{ERROR_FILE_NOT_FOUND, WIN32_ERROR};
    use windows::Win32::System::Registry::*;
    use windows::core::{PCWSTR, w};

    use super::{AutostartError, StartupRegistry};
    use crate::wide::to_wide;

    const RUN_KEY: PCWSTR = w!("Software\\Microsoft\\Windows\\CurrentVersion\\Run");

    /// `HKEY_CURRENT_USER\Software\Microsoft\Windows\CurrentVersion\Run`.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct RunKey;

    /// Closes the key on drop.
    struct OpenKey(HKEY);

    impl OpenKey {
        fn open(access: REG_SAM_FLAGS) -> Result<Self, AutostartError> {
            let mut hkey = HKEY::default();
            let status =
                unsafe { RegOpenKeyExW(HKEY_CURRENT_USER, RUN_KEY, Some(0), access, &mut hkey) };
            if status.is_err() {
                return Err(AutostartError::Open(describe(status)));
            }
            Ok(Self(hkey))
        }
    }

    impl Drop for OpenKey {
        fn drop(&mut self) {
            let _ = unsafe { RegCloseKey(self.0) };
        }
    }

    fn describe(status: WIN32_ERROR) -> String {
        windows::core::Error::from(status.to_hresult())
            .message()
            .to_string()
    }

    impl StartupRegistry for RunKey {
        fn has_entry(&self, name: &str) -> Result<bool, AutostartError> {
            let key = OpenKey::open(KEY_QUERY_VALUE)?;
            let name_wide = to_wide(name);
            let status = unsafe {
                RegQueryValueExW(
                    key.0,
                    PCWSTR::from_raw(name_wide.as_ptr()),
                    None,
                    None,
                    None,
                    None,
                )
            };
            if status == ERROR_FILE_NOT_FOUND {
                Ok(false)
            } else if status.is_err() {
                Err(AutostartError::Query(describe(status)))
            } else {
                Ok(true)
            }
        }

        fn set_entry(&mut self, name: &str, command: &str) -> Result<(), AutostartError> {
            let key = OpenKey::open(KEY_SET_VALUE)?;
            let name_wide = to_wide(name);
            let command_wide = to_wide(command);
            let command_bytes = unsafe {
                std::slice::from_raw_parts(
                    command_wide.as_ptr() as *const u8,
                    command_wide.len() * 2,
                )
            };
            let status = unsafe {
                RegSetValueExW(
                    key.0,
                    PCWSTR::from_raw(name_wide.as_ptr()),
                    Some(0),
                    REG_SZ,
                    Some(command_bytes),
                )
            };
            if status.is_err() {
                return Err(AutostartError::Write(describe(status)));
            }
            Ok(())
        }
    }
}
