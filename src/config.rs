//! Process configuration: audible range, segmenter timing, and the roll palette.
//!
//! Fixed for the process lifetime. Loaded from JSON when a path is given,
//! otherwise the defaults below are used.

use crate::pitch::freq_to_pitch;
use crate::types::{Color, Millis, PitchRange};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;

/// Colors used by the roll, RGB565.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Palette {
    /// First pixels of a note bar.
    pub note_start: Color,
    pub note: Color,
    pub cursor: Color,
    /// Staff line for C rows.
    pub roll_c: Color,
    /// Staff line for G rows.
    pub roll_g: Color,
    /// Staff line for all other rows.
    pub roll_other: Color,
    pub background: Color,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            note_start: 0xF800, // red
            note: 0x0700,       // dark green
            cursor: 0x001F,     // blue
            roll_c: 0x2104,     // dark gray
            roll_g: 0xC618,     // gray
            roll_other: 0xF79E, // light gray
            background: 0xFFFF, // white
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Lowest frequency the detector reports (Hz).
    pub freq_min_hz: f64,
    /// Highest frequency the detector reports (Hz).
    pub freq_max_hz: f64,
    /// A note is only recognised once it has lasted this long (ms).
    pub min_segment_duration_ms: Millis,
    /// Worst-case time per processing tick (ms). Increase if empty columns
    /// show up in the roll.
    pub max_loop_time_ms: Millis,
    /// Milliseconds of history that fit across the screen.
    pub msec_on_screen: Millis,
    pub palette: Palette,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            freq_min_hz: 82.41,  // E2
            freq_max_hz: 1046.5, // C6
            min_segment_duration_ms: 40,
            max_loop_time_ms: 60,
            msec_on_screen: 2912,
            palette: Palette::default(),
        }
    }
}

impl Config {
    /// Load from a JSON file. Returns None if file is absent or malformed.
    pub fn load(path: &Path) -> Option<Self> {
        let data = std::fs::read_to_string(path).ok()?;
        match serde_json::from_str(&data) {
            Ok(c) => {
                info!("Loaded config from {:?}", path);
                Some(c)
            }
            Err(e) => {
                warn!("Failed to parse config file {:?}: {}", path, e);
                None
            }
        }
    }

    pub fn save(&self, path: &Path) -> io::Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(io::Error::other)?;
        std::fs::write(path, json)?;
        info!("Config saved to {:?}", path);
        Ok(())
    }

    /// Pitch rows shown on the roll, derived from the audible range.
    pub fn pitch_range(&self) -> PitchRange {
        PitchRange::new(
            freq_to_pitch(self.freq_min_hz),
            freq_to_pitch(self.freq_max_hz),
        )
    }

    /// Width of the trailing window that may still change after it was drawn.
    pub fn redraw_latency_ms(&self) -> Millis {
        self.min_segment_duration_ms + self.max_loop_time_ms
    }
}
