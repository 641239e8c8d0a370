//! Pitch arithmetic and the fixed pitch-class table used to color and label staff rows.

use crate::types::Pitch;

/// Convert Hz to the nearest MIDI note number.
pub fn freq_to_pitch(hz: f64) -> Pitch {
    (69.0 + 12.0 * (hz / 440.0).log2()).round() as Pitch
}

/// Convert a MIDI note number to Hz.
pub fn pitch_to_freq(pitch: Pitch) -> f64 {
    440.0 * 2.0_f64.powf((pitch as f64 - 69.0) / 12.0)
}

/// How a staff row is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaffRole {
    /// Darkest line, labelled in the margin.
    C,
    /// Mid-gray line, labelled in the margin.
    G,
    /// Faint line, no label.
    Other,
}

/// Note name independent of octave.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PitchClass {
    C,
    CSharp,
    D,
    DSharp,
    E,
    F,
    FSharp,
    G,
    GSharp,
    A,
    ASharp,
    B,
}

struct ClassInfo {
    name: &'static str,
    role: StaffRole,
}

const CLASS_TABLE: [ClassInfo; 12] = [
    ClassInfo { name: "C", role: StaffRole::C },
    ClassInfo { name: "C#", role: StaffRole::Other },
    ClassInfo { name: "D", role: StaffRole::Other },
    ClassInfo { name: "D#", role: StaffRole::Other },
    ClassInfo { name: "E", role: StaffRole::Other },
    ClassInfo { name: "F", role: StaffRole::Other },
    ClassInfo { name: "F#", role: StaffRole::Other },
    ClassInfo { name: "G", role: StaffRole::G },
    ClassInfo { name: "G#", role: StaffRole::Other },
    ClassInfo { name: "A", role: StaffRole::Other },
    ClassInfo { name: "A#", role: StaffRole::Other },
    ClassInfo { name: "B", role: StaffRole::Other },
];

const ALL: [PitchClass; 12] = [
    PitchClass::C,
    PitchClass::CSharp,
    PitchClass::D,
    PitchClass::DSharp,
    PitchClass::E,
    PitchClass::F,
    PitchClass::FSharp,
    PitchClass::G,
    PitchClass::GSharp,
    PitchClass::A,
    PitchClass::ASharp,
    PitchClass::B,
];

impl PitchClass {
    pub fn from_pitch(pitch: Pitch) -> Self {
        ALL[pitch.rem_euclid(12) as usize]
    }

    /// 0 for C through 11 for B.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        CLASS_TABLE[self.index()].name
    }

    /// Natural letter of the class ('C' for both C and C#).
    pub fn letter(self) -> char {
        CLASS_TABLE[self.index()].name.as_bytes()[0] as char
    }

    pub fn staff(self) -> StaffRole {
        CLASS_TABLE[self.index()].role
    }
}

/// Scientific octave number: MIDI 60 is in octave 4.
pub fn octave(pitch: Pitch) -> i32 {
    pitch.div_euclid(12) - 1
}

/// Human-readable name such as "A4" or "C#3".
pub fn note_name(pitch: Pitch) -> String {
    format!("{}{}", PitchClass::from_pitch(pitch).name(), octave(pitch))
}
