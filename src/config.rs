use crate::autosave::DEFAULT_WINDOW;
use crate::placement::ScreenBounds;
use crate::storage::{JsonFileStore, StorageError};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct NotesConfig {
    pub data_file: PathBuf,
    pub debounce: Duration,
    pub screen: ScreenBounds,
}

impl NotesConfig {
    /// Defaults with the notes file in the per-user data directory.
    pub fn with_default_location() -> Result<Self, StorageError> {
        Ok(NotesConfig {
            data_file: JsonFileStore::default_location()?,
            debounce: DEFAULT_WINDOW,
            screen: ScreenBounds::default(),
        })
    }

    pub fn at(data_file: impl Into<PathBuf>) -> Self {
        NotesConfig {
            data_file: data_file.into(),
            debounce: DEFAULT_WINDOW,
            screen: ScreenBounds::default(),
        }
    }
}

/// Parses a `WIDTHxHEIGHT` work-area size, e.g. `2560x1400`.
pub fn parse_screen(raw: &str) -> Result<ScreenBounds, String> {
    let (w, h) = raw
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {:?}", raw))?;
    let width: f64 = w
        .trim()
        .parse()
        .map_err(|_| format!("invalid width {:?}", w))?;
    let height: f64 = h
        .trim()
        .parse()
        .map_err(|_| format!("invalid height {:?}", h))?;
    if !(width > 0.0 && height > 0.0 && width.is_finite() && height.is_finite()) {
        return Err(format!("screen size must be positive, got {:?}", raw));
    }
    Ok(ScreenBounds {
        left: 0.0,
        top: 0.0,
        width,
        height,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_screen_sizes() {
        let b = parse_screen("2560x1400").unwrap();
        assert_eq!((b.width, b.height), (2560.0, 1400.0));
        assert!(parse_screen("2560").is_err());
        assert!(parse_screen("0x100").is_err());
        assert!(parse_screen("ax100").is_err());
    }

    #[test]
    fn explicit_location_uses_defaults() {
        let cfg = NotesConfig::at("/tmp/n.json");
        assert_eq!(cfg.debounce, Duration::from_millis(300));
        assert_eq!(cfg.screen, ScreenBounds::default());
    }
}
