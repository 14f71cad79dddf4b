use crate::model::{NoteRecord, DEFAULT_HEIGHT, DEFAULT_WIDTH, MIN_HEIGHT, MIN_WIDTH};

/// Fraction of the work-area width where new notes are centered.
const HORIZONTAL_ANCHOR: f64 = 0.65;

/// Usable desktop area (excluding task bars), in logical units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenBounds {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Default for ScreenBounds {
    fn default() -> Self {
        ScreenBounds {
            left: 0.0,
            top: 0.0,
            width: 1920.0,
            height: 1040.0,
        }
    }
}

impl ScreenBounds {
    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    fn clamp_left(&self, left: f64, width: f64) -> f64 {
        left.min(self.right() - width).max(self.left)
    }

    fn clamp_top(&self, top: f64, height: f64) -> f64 {
        top.min(self.bottom() - height).max(self.top)
    }
}

/// Position for a fresh note of the given size.
pub fn place_new(bounds: &ScreenBounds, width: f64, height: f64) -> (f64, f64) {
    let left = bounds.left + bounds.width * HORIZONTAL_ANCHOR - width / 2.0;
    let top = bounds.top + (bounds.height - height) / 2.0;
    (bounds.clamp_left(left, width), bounds.clamp_top(top, height))
}

/// Fixes geometry read from storage. Returns true if anything changed.
pub fn repair(note: &mut NoteRecord, bounds: &ScreenBounds) -> bool {
    let before = (note.left, note.top, note.width, note.height);

    note.width = repair_size(note.width, DEFAULT_WIDTH, MIN_WIDTH);
    note.height = repair_size(note.height, DEFAULT_HEIGHT, MIN_HEIGHT);

    if note.left.is_finite() && note.top.is_finite() {
        note.left = bounds.clamp_left(note.left, note.width);
        note.top = bounds.clamp_top(note.top, note.height);
    } else {
        let (left, top) = place_new(bounds, note.width, note.height);
        note.left = left;
        note.top = top;
    }

    let after = (note.left, note.top, note.width, note.height);
    // NaN never compares equal, so a repaired NaN always reports a change.
    before != after
}

fn repair_size(value: f64, default: f64, min: f64) -> f64 {
    if !value.is_finite() || value <= 0.0 {
        default
    } else {
        value.max(min)
    }
}
