//! UTF-16 helpers for Win32 string parameters.

use std::path::Path;

/// NUL-terminated UTF-16 copy of `s`.
pub(crate) fn to_wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

pub(crate) fn path_to_wide(path: &Path) -> Vec<u16> {
    use std::os::windows::ffi::OsStrExt;
    path.as_os_str()
        .encode_wide()
        .chain(std::iter::once(0))
        .collect()
}

/// Copies `text` into a fixed UTF-16 buffer, truncating and always terminating.
pub(crate) fn copy_to_buffer(buffer: &mut [u16], text: &str) {
    if buffer.is_empty() {
        return;
    }
    let limit = buffer.len() - 1;
    let mut len = 0;
    for (slot, unit) in buffer.iter_mut().zip(text.encode_utf16().take(limit)) {
        *slot = unit;
        len += 1;
    }
    buffer[len..].fill(0);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_wide_is_terminated() {
        assert_eq!(to_wide("F9"), vec![0x46, 0x39, 0]);
        assert_eq!(to_wide(""), vec![0]);
    }

    #[test]
    fn test_to_wide_run_value() {
        // REG_SZ data is written with its terminator.
        let command = crate::autostart::launch_command(Path::new(r"C:\Tools\micmute.exe"));
        let wide = to_wide(&command);
        assert_eq!(wide.len(), command.len() + 1);
        assert_eq!(wide.first(), Some(&(b'"' as u16)));
        assert_eq!(wide.last(), Some(&0));
    }

    #[test]
    fn test_copy_to_buffer_truncates() {
        let mut buffer = [0xFFFFu16; 4];
        copy_to_buffer(&mut buffer, "abcdef");
        assert_eq!(buffer, [b'a' as u16, b'b' as u16, b'c' as u16, 0]);

        copy_to_buffer(&mut buffer, "x");
        assert_eq!(buffer, [b'x' as u16, 0, 0, 0]);
    }
}
