//! Mapping from (time, pitch) to screen pixels.
//!
//! Recomputed only when the display reports a new size; every drawing call
//! in between reads the cached values.

use crate::display::CHAR_WIDTH;
use crate::types::{Millis, Pitch, PitchRange, XCoord, YCoord};

/// Left margin reserved for the two-character note labels.
pub const X_FIRSTNOTE: XCoord = 2 * CHAR_WIDTH;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    width: XCoord,
    height: YCoord,
    range: PitchRange,
    /// Vertical distance between adjacent pitch rows.
    pitch2pitch: YCoord,
    /// Rows left over after integer division, split evenly top and bottom.
    bottom2lo_pitch: YCoord,
    msec_on_screen: Millis,
    msec_per_pixel: Millis,
}

impl Geometry {
    pub fn new(width: XCoord, height: YCoord, range: PitchRange, msec_on_screen: Millis) -> Self {
        let rows = range.count();
        let pitch2pitch = height / rows;
        let bottom2lo_pitch = (height - rows * pitch2pitch) / 2;

        let screen_width = (width - X_FIRSTNOTE).max(1) as Millis;
        let msec_per_pixel = (msec_on_screen / screen_width).max(1);

        Self {
            width,
            height,
            range,
            pitch2pitch,
            bottom2lo_pitch,
            msec_on_screen,
            msec_per_pixel,
        }
    }

    pub fn width(&self) -> XCoord {
        self.width
    }

    pub fn height(&self) -> YCoord {
        self.height
    }

    pub fn range(&self) -> PitchRange {
        self.range
    }

    pub fn pitch2pitch(&self) -> YCoord {
        self.pitch2pitch
    }

    pub fn bottom2lo_pitch(&self) -> YCoord {
        self.bottom2lo_pitch
    }

    pub fn msec_on_screen(&self) -> Millis {
        self.msec_on_screen
    }

    pub fn msec_per_pixel(&self) -> Millis {
        self.msec_per_pixel
    }

    /// Column for a time `elapsed` ms after the scroll epoch, when the left
    /// edge of the roll shows `t0` ms after the epoch.
    ///
    /// Times at or before `t0` land on `X_FIRSTNOTE`. There is no clamp on
    /// the right; callers keep `elapsed` inside the visible window.
    pub fn time_to_x(&self, elapsed: Millis, t0: Millis) -> XCoord {
        let distance = if elapsed > t0 {
            ((elapsed - t0) / self.msec_per_pixel) as XCoord
        } else {
            0
        };
        X_FIRSTNOTE + distance
    }

    /// Staff row for `pitch`. Higher pitches sit nearer the top; the highest
    /// row of the range is `bottom2lo_pitch` pixels below the top edge.
    ///
    /// Only meaningful for pitches inside the configured range.
    pub fn pitch_to_y(&self, pitch: Pitch) -> YCoord {
        let diff = (pitch - self.range.min() + 1) * self.pitch2pitch;
        self.height - self.bottom2lo_pitch - diff
    }
}
