use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::time::Duration;
use uuid::Uuid;

pub type NoteId = Uuid;

pub const MIN_WIDTH: f64 = 260.0;
pub const MIN_HEIGHT: f64 = 150.0;
pub const DEFAULT_WIDTH: f64 = 320.0;
pub const DEFAULT_HEIGHT: f64 = 280.0;
pub const DEFAULT_COLOR: &str = "#FFFFF7A8";
pub const DEFAULT_DURATION: Duration = Duration::from_secs(25 * 60);

/// Durable state of one sticky note, as written to the notes file.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NoteRecord {
    pub id: NoteId,
    pub content: String,
    pub color: String,
    pub is_pinned: bool,
    #[serde(deserialize_with = "lenient_f64")]
    pub left: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub top: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub width: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub height: f64,
    #[serde(with = "seconds")]
    pub duration: Duration,
    #[serde(with = "seconds")]
    pub remaining_time: Duration,
    pub last_modified: DateTime<Utc>,
}

impl NoteRecord {
    /// A blank note at the given position with default size, color and timer.
    pub fn new(left: f64, top: f64) -> Self {
        NoteRecord {
            id: Uuid::new_v4(),
            content: String::new(),
            color: DEFAULT_COLOR.to_string(),
            is_pinned: false,
            left,
            top,
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            duration: DEFAULT_DURATION,
            remaining_time: DEFAULT_DURATION,
            last_modified: Utc::now(),
        }
    }

    pub fn touch(&mut self) {
        self.last_modified = Utc::now();
    }

    /// Pulls `remaining_time` back within `duration`. Returns true if it moved.
    pub fn clamp_remaining(&mut self) -> bool {
        if self.remaining_time > self.duration {
            self.remaining_time = self.duration;
            true
        } else {
            false
        }
    }
}

/// JSON has no NaN or infinity and writes them as `null`; read those back as
/// NaN so geometry repair can fix the one note instead of the file failing.
fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
}

/// Time spans travel as whole seconds.
mod seconds {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ColorParseError {
    #[error("color {0:?} is not #RRGGBB or #AARRGGBB")]
    BadLength(String),
    #[error("color {0:?} contains non-hex digits")]
    BadDigit(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteColor {
    pub a: u8,
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl NoteColor {
    pub const PALETTE: [(&'static str, &'static str); 6] = [
        ("yellow", "#FFFFF7A8"),
        ("green", "#FFC8F7C5"),
        ("blue", "#FFBFE3FF"),
        ("pink", "#FFFFC9DE"),
        ("purple", "#FFE1D0FF"),
        ("charcoal", "#FF3A3A3C"),
    ];

    pub fn parse(raw: &str) -> Result<Self, ColorParseError> {
        let hex = raw.trim();
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        if !hex.is_ascii() {
            return Err(ColorParseError::BadDigit(raw.to_string()));
        }
        let byte = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .map_err(|_| ColorParseError::BadDigit(raw.to_string()))
        };
        match hex.len() {
            6 => Ok(NoteColor {
                a: 0xFF,
                r: byte(0)?,
                g: byte(2)?,
                b: byte(4)?,
            }),
            8 => Ok(NoteColor {
                a: byte(0)?,
                r: byte(2)?,
                g: byte(4)?,
                b: byte(6)?,
            }),
            _ => Err(ColorParseError::BadLength(raw.to_string())),
        }
    }

    /// Resolves a palette name or a hex string to the stored `#AARRGGBB` form.
    pub fn resolve(name_or_hex: &str) -> Result<String, ColorParseError> {
        if let Some((_, hex)) = Self::PALETTE
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(name_or_hex.trim()))
        {
            return Ok(hex.to_string());
        }
        Self::parse(name_or_hex).map(|c| c.to_hex())
    }

    /// Perceived brightness in `[0, 1]`.
    pub fn luminance(&self) -> f64 {
        (0.299 * self.r as f64 + 0.587 * self.g as f64 + 0.114 * self.b as f64) / 255.0
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}{:02X}", self.a, self.r, self.g, self.b)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Foreground {
    DarkOnLight,
    LightOnDark,
}

impl Foreground {
    pub fn for_color(raw: &str) -> Self {
        match NoteColor::parse(raw) {
            Ok(color) if color.luminance() <= 0.6 => Foreground::LightOnDark,
            _ => Foreground::DarkOnLight,
        }
    }
}
