use crate::config::Config;
use crate::history::{Segment, SegmentEvent};
use crate::pitch::note_name;
use crate::types::*;
use crossbeam_channel::Sender;
use log::{debug, info};
use std::thread;
use std::time::Duration;

/// A segment event and the session time at which the segmenter reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scheduled {
    pub at: Millis,
    pub event: SegmentEvent,
}

/// Plays scripted melodies as if they came out of the pitch detector.
///
/// A note is reported only once the following note (or rest) has lasted
/// `min_segment_duration_ms`, the same delay the real segmenter has. The
/// roll's trailing redraw window exists to absorb exactly this delay.
pub struct Simulator {
    clock: SessionClock,
    tx: Sender<SegmentEvent>,
    range: PitchRange,
    min_segment_ms: Millis,
}

impl Simulator {
    pub fn new(clock: SessionClock, tx: Sender<SegmentEvent>, config: &Config) -> Self {
        Self {
            clock,
            tx,
            range: config.pitch_range(),
            min_segment_ms: config.min_segment_duration_ms,
        }
    }

    /// Loop the named demo until the receiving side hangs up.
    /// Blocks the calling thread.
    pub fn run(&mut self, demo: &str) {
        let gestures = demo_sequence(demo);
        info!(
            "Simulator starting \"{}\" ({} gestures, report delay {}ms)",
            demo,
            gestures.len(),
            self.min_segment_ms
        );

        let mut playhead = Playhead::at(self.clock.now_ms());
        let mut pass = 0u32;
        loop {
            let events = playhead.lay_out(&gestures, self.min_segment_ms, self.range);
            if pass == 0 {
                debug!("Notes: {}", describe(&events));
            }
            if play(&self.clock, &self.tx, events).is_none() {
                break;
            }
            pass += 1;
            debug!("Simulator finished pass {}", pass);
        }
        info!("Simulator stopped after {} passes", pass);
    }
}

/// Send each event at its scheduled time. Returns the number sent, or None
/// if the receiver was dropped.
pub fn play(
    clock: &SessionClock,
    tx: &Sender<SegmentEvent>,
    events: impl IntoIterator<Item = Scheduled>,
) -> Option<usize> {
    let mut sent = 0;
    for s in events {
        let now = clock.now_ms();
        if s.at > now {
            thread::sleep(Duration::from_millis(s.at - now));
        }
        tx.send(s.event).ok()?;
        sent += 1;
    }
    Some(sent)
}

// ─── Gesture types ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
enum Gesture {
    Note { pitch: Pitch, ms: Millis },
    Rest { ms: Millis },
}

/// Position in the scripted performance. Carries the running time and any
/// rest not yet attached to a note from one pass of a demo to the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Playhead {
    t: Millis,
    gap: Millis,
}

impl Playhead {
    fn at(start: Millis) -> Self {
        Self { t: start, gap: 0 }
    }

    /// Lay out `gestures` in time from the current position and work out
    /// when each note segment would be reported. Pitches are clamped into
    /// `range`. Trailing rests stay pending and become the next note's onset.
    fn lay_out(
        &mut self,
        gestures: &[Gesture],
        min_segment_ms: Millis,
        range: PitchRange,
    ) -> Vec<Scheduled> {
        let mut out = Vec::with_capacity(gestures.len());

        for g in gestures {
            match *g {
                Gesture::Rest { ms } => {
                    self.t += ms;
                    self.gap += ms;
                }
                Gesture::Note { pitch, ms } => {
                    let pitch = range.clamp(pitch);
                    self.t += ms;
                    out.push(Scheduled {
                        at: self.t + min_segment_ms,
                        event: SegmentEvent {
                            segment: Segment {
                                pitch,
                                duration: ms,
                                onset: self.gap,
                            },
                            offset: self.t,
                        },
                    });
                    self.gap = 0;
                }
            }
        }
        out
    }
}

fn timeline(
    gestures: &[Gesture],
    start: Millis,
    min_segment_ms: Millis,
    range: PitchRange,
) -> Vec<Scheduled> {
    Playhead::at(start).lay_out(gestures, min_segment_ms, range)
}

fn note(pitch: Pitch, ms: Millis) -> Gesture {
    Gesture::Note { pitch, ms }
}

fn rest(ms: Millis) -> Gesture {
    Gesture::Rest { ms }
}

/// Known demo names.
pub const DEMOS: [&str; 3] = ["scale", "melody", "chords"];

fn demo_sequence(name: &str) -> Vec<Gesture> {
    match name {
        "melody" => melody(),
        "chords" => chords(),
        _ => scale(),
    }
}

/// C major up and down, detached.
fn scale() -> Vec<Gesture> {
    let steps = [48, 50, 52, 53, 55, 57, 59, 60];
    let mut g = Vec::new();
    for &p in steps.iter().chain(steps.iter().rev().skip(1)) {
        g.push(note(p, 220));
        g.push(rest(60));
    }
    g.push(rest(400));
    g
}

/// "Ode to Joy", first phrase, in G.
fn melody() -> Vec<Gesture> {
    let beat = 300;
    let phrase = [
        (59, 1), (59, 1), (60, 1), (62, 1), (62, 1), (60, 1), (59, 1), (57, 1),
        (55, 1), (55, 1), (57, 1), (59, 1), (59, 3), (57, 1), (57, 4),
    ];
    let mut g = Vec::new();
    for &(p, beats) in &phrase {
        // slight release between repeated notes
        g.push(note(p, beats * beat - 30));
        g.push(rest(30));
    }
    g.push(rest(600));
    g
}

/// Broken triads: C, Am, F, G.
fn chords() -> Vec<Gesture> {
    let triads = [[48, 52, 55], [45, 48, 52], [41, 45, 48], [43, 47, 50]];
    let mut g = Vec::new();
    for triad in &triads {
        for p in [triad[0], triad[1], triad[2], triad[0] + 12] {
            g.push(note(p, 150));
        }
        g.push(rest(150));
    }
    g
}

/// Describe a timeline as note names, for logging.
pub fn describe(events: &[Scheduled]) -> String {
    events
        .iter()
        .map(|s| note_name(s.event.segment.pitch))
        .collect::<Vec<_>>()
        .join(" ")
}

/// The schedule for one pass of a named demo, starting at `start`.
pub fn demo_timeline(name: &str, start: Millis, config: &Config) -> Vec<Scheduled> {
    timeline(
        &demo_sequence(name),
        start,
        config.min_segment_duration_ms,
        config.pitch_range(),
    )
}
