//! Tray icon states and `.ico` file inspection.

use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;

use thiserror::Error;

use crate::i18n::MessageKey;

/// Which of the two tray icons is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MicIcon {
    /// Microphone live (`style/on.ico`).
    #[default]
    On,
    /// Microphone muted (`style/off.ico`).
    Off,
}

impl MicIcon {
    pub fn for_muted(muted: bool) -> Self {
        if muted { MicIcon::Off } else { MicIcon::On }
    }

    pub fn tooltip_key(self) -> MessageKey {
        match self {
            MicIcon::On => MessageKey::MicOn,
            MicIcon::Off => MessageKey::MicOff,
        }
    }
}

#[derive(Debug, Error)]
pub enum IconError {
    #[error("{path}: {source}")]
    Read { path: String, source: io::Error },
    #[error("{path}: file contains no images")]
    Empty { path: String },
    #[error("{path}: {message}")]
    Os { path: String, message: String },
}

/// Picks the size closest to `target` pixels, preferring the larger of two
/// equally close candidates.
pub fn closest_size(sizes: &[(u32, u32)], target: u32) -> Option<(u32, u32)> {
    sizes
        .iter()
        .copied()
        .min_by_key(|&(w, _)| (w.abs_diff(target), std::cmp::Reverse(w)))
}

/// Reads the icon directory of `path` and returns the image size best suited
/// for a `target`-pixel tray icon.
pub fn best_icon_size(path: &Path, target: u32) -> Result<(u32, u32), IconError> {
    let display = path.display().to_string();
    let file = File::open(path).map_err(|source| IconError::Read {
        path: display.clone(),
        source,
    })?;
    let dir = ico::IconDir::read(BufReader::new(file)).map_err(|source| IconError::Read {
        path: display.clone(),
        source,
    })?;

    let sizes: Vec<(u32, u32)> = dir
        .entries()
        .iter()
        .map(|entry| (entry.width(), entry.height()))
        .collect();

    closest_size(&sizes, target).ok_or(IconError::Empty { path: display })
}
