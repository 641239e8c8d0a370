use std::time::Instant;

// ─── Scalar units ───────────────────────────────────────────────────────────

/// Absolute time in milliseconds since the session clock started.
pub type Millis = u64;

/// Pitch on the MIDI semitone scale (60 = C4, 69 = A4).
pub type Pitch = i32;

/// Logical pixel column, origin at the left edge after rotation.
pub type XCoord = i32;

/// Logical pixel row, origin at the top edge after rotation.
pub type YCoord = i32;

/// 16-bit RGB565 color as used by small SPI TFT panels.
///   rrrr rggg gggb bbbb
pub type Color = u16;

// ─── Pitch range ────────────────────────────────────────────────────────────

/// Inclusive range of pitches shown on the roll. `max >= min` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PitchRange {
    min: Pitch,
    max: Pitch,
}

impl PitchRange {
    /// Builds a range from two bounds, swapping them if given in reverse.
    pub fn new(a: Pitch, b: Pitch) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    pub fn min(&self) -> Pitch {
        self.min
    }

    pub fn max(&self) -> Pitch {
        self.max
    }

    /// Number of pitch rows, `max - min + 1`.
    pub fn count(&self) -> i32 {
        self.max - self.min + 1
    }

    pub fn contains(&self, pitch: Pitch) -> bool {
        (self.min..=self.max).contains(&pitch)
    }

    pub fn clamp(&self, pitch: Pitch) -> Pitch {
        pitch.clamp(self.min, self.max)
    }

    pub fn iter(&self) -> std::ops::RangeInclusive<Pitch> {
        self.min..=self.max
    }
}

// ─── Session clock ──────────────────────────────────────────────────────────

/// Monotonic clock for the display session.
#[derive(Clone)]
pub struct SessionClock {
    start: Instant,
}

impl SessionClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn now_ms(&self) -> Millis {
        self.start.elapsed().as_millis() as Millis
    }
}

impl Default for SessionClock {
    fn default() -> Self {
        Self::new()
    }
}
