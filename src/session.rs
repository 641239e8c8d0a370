//! JSONL segment recordings: write the events a session received, and read
//! them back for replay.
//!
//! The first line is a header object with `"format": "piano-roll"`; every
//! following line is one `SegmentEvent`.

use crate::config::Config;
use crate::history::{Segment, SegmentEvent};
use crate::simulator::Scheduled;
use crate::types::{Millis, Pitch, PitchRange};
use log::{info, warn};
use serde_json::json;
use std::fs::File;
use std::io::{self, BufRead, BufWriter, Write};
use std::path::Path;

pub const FORMAT: &str = "piano-roll";

/// Parsed JSONL header (first line of a recording).
#[derive(Debug)]
pub struct SessionHeader {
    pub format: String,
    pub msec_on_screen: Millis,
    pub pitch_min: Pitch,
    pub pitch_max: Pitch,
    pub raw: serde_json::Value,
}

impl SessionHeader {
    /// Pitch rows the recording was made with.
    pub fn pitch_range(&self) -> PitchRange {
        PitchRange::new(self.pitch_min, self.pitch_max)
    }

    /// Warn if the recording was made for different pitch rows than `range`.
    /// Returns true when the ranges match.
    pub fn check_range(&self, range: PitchRange) -> bool {
        let recorded = self.pitch_range();
        if recorded != range {
            warn!(
                "Recording covers pitches {}..{}, roll shows {}..{}; out-of-range notes will be clamped",
                recorded.min(),
                recorded.max(),
                range.min(),
                range.max()
            );
            return false;
        }
        true
    }
}

pub struct SessionWriter<W: Write> {
    writer: W,
    count: u64,
}

impl SessionWriter<BufWriter<File>> {
    pub fn create(path: &Path, config: &Config) -> io::Result<Self> {
        let writer = SessionWriter::new(BufWriter::new(File::create(path)?), config)?;
        info!("Recording segments → {:?}", path);
        Ok(writer)
    }
}

impl<W: Write> SessionWriter<W> {
    /// Wrap `writer` and emit the header line.
    pub fn new(mut writer: W, config: &Config) -> io::Result<Self> {
        let range = config.pitch_range();
        let header = json!({
            "format": FORMAT,
            "version": env!("CARGO_PKG_VERSION"),
            "msec_on_screen": config.msec_on_screen,
            "min_segment_duration_ms": config.min_segment_duration_ms,
            "pitch_min": range.min(),
            "pitch_max": range.max(),
        });
        writeln!(writer, "{}", header)?;
        Ok(Self { writer, count: 0 })
    }

    pub fn write(&mut self, event: &SegmentEvent) -> io::Result<()> {
        let line = serde_json::to_string(event).map_err(io::Error::other)?;
        writeln!(self.writer, "{}", line)?;
        self.count += 1;
        Ok(())
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Line-by-line JSONL session reader.
pub struct SessionReader<R: BufRead> {
    reader: R,
    pub header: SessionHeader,
    line_buf: String,
}

impl<R: BufRead> SessionReader<R> {
    /// Read and validate the header line. Returns an error if the header
    /// is missing, unparseable, or lacks a `"format": "piano-roll"` field.
    pub fn open(mut reader: R) -> Result<Self, String> {
        let mut first_line = String::new();
        reader
            .read_line(&mut first_line)
            .map_err(|e| format!("read header: {}", e))?;

        let first_line = first_line.trim();
        if first_line.is_empty() {
            return Err("empty file".into());
        }

        let raw: serde_json::Value =
            serde_json::from_str(first_line).map_err(|e| format!("parse header: {}", e))?;

        let format = raw["format"]
            .as_str()
            .ok_or("missing \"format\" field")?
            .to_string();
        if format != FORMAT {
            return Err(format!("unknown format: {}", format));
        }

        let msec_on_screen = raw["msec_on_screen"].as_u64().unwrap_or(2912);
        let pitch_min = raw["pitch_min"].as_i64().unwrap_or(0) as Pitch;
        let pitch_max = raw["pitch_max"].as_i64().unwrap_or(127) as Pitch;

        Ok(Self {
            reader,
            header: SessionHeader {
                format,
                msec_on_screen,
                pitch_min,
                pitch_max,
                raw,
            },
            line_buf: String::new(),
        })
    }

    /// Read the next event. Returns `None` at EOF, `Err` for unparseable lines.
    pub fn next_event(&mut self) -> Option<Result<SegmentEvent, String>> {
        loop {
            self.line_buf.clear();
            match self.reader.read_line(&mut self.line_buf) {
                Ok(0) => return None,
                Ok(_) => {
                    let trimmed = self.line_buf.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    return Some(
                        serde_json::from_str::<SegmentEvent>(trimmed)
                            .map_err(|e| format!("parse event: {}", e)),
                    );
                }
                Err(e) => return Some(Err(format!("read line: {}", e))),
            }
        }
    }

    /// Read all remaining events, skipping malformed lines.
    pub fn read_all(mut self) -> Vec<SegmentEvent> {
        let mut events = Vec::new();
        while let Some(result) = self.next_event() {
            if let Ok(event) = result {
                events.push(event);
            }
        }
        events
    }
}

/// Shift recorded events onto a new session clock so the first one is
/// reported at `start`. Each event is reported `report_delay` ms after it ends,
/// with its pitch clamped into `range`.
pub fn rebase(
    events: &[SegmentEvent],
    start: Millis,
    report_delay: Millis,
    range: PitchRange,
) -> Vec<Scheduled> {
    let Some(first) = events.first() else {
        return Vec::new();
    };
    let origin = first.offset;
    events
        .iter()
        .map(|e| {
            let offset = start + e.offset.saturating_sub(origin);
            Scheduled {
                at: offset + report_delay,
                event: SegmentEvent {
                    segment: Segment {
                        pitch: range.clamp(e.segment.pitch),
                        ..e.segment
                    },
                    offset,
                },
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn event(pitch: Pitch, offset: Millis) -> SegmentEvent {
        SegmentEvent {
            segment: Segment {
                pitch,
                duration: 100,
                onset: 20,
            },
            offset,
        }
    }

    fn recording(events: &[SegmentEvent]) -> Vec<u8> {
        let mut w = SessionWriter::new(Vec::new(), &Config::default()).unwrap();
        for e in events {
            w.write(e).unwrap();
        }
        assert_eq!(w.count(), events.len() as u64);
        w.into_inner()
    }

    #[test]
    fn test_write_then_read() {
        let events = [event(60, 1000), event(62, 1120)];
        let bytes = recording(&events);
        let reader = SessionReader::open(Cursor::new(bytes)).unwrap();
        assert_eq!(reader.header.format, "piano-roll");
        assert_eq!(reader.header.msec_on_screen, 2912);
        assert_eq!(reader.header.pitch_min, 40);
        assert_eq!(reader.header.pitch_max, 84);
        assert_eq!(reader.read_all(), events.to_vec());
    }

    #[test]
    fn test_rejects_wrong_format() {
        let data = "{\"format\":\"midi-log\"}\n";
        let err = SessionReader::open(Cursor::new(data)).err().unwrap();
        assert!(err.contains("unknown format"));
    }

    #[test]
    fn test_rejects_empty_file() {
        assert!(SessionReader::open(Cursor::new("")).is_err());
    }

    #[test]
    fn test_skips_blank_and_reports_bad_lines() {
        let data = format!(
            "{{\"format\":\"piano-roll\"}}\n\n{}\nnot json\n{}\n",
            serde_json::to_string(&event(60, 10)).unwrap(),
            serde_json::to_string(&event(61, 20)).unwrap(),
        );
        let mut reader = SessionReader::open(Cursor::new(data)).unwrap();
        assert!(reader.next_event().unwrap().is_ok());
        assert!(reader.next_event().unwrap().is_err());
        assert_eq!(reader.next_event().unwrap().unwrap().segment.pitch, 61);
        assert!(reader.next_event().is_none());
    }

    #[test]
    fn test_rebase() {
        let events = [event(60, 5000), event(62, 5300)];
        let s = rebase(&events, 100, 40, PitchRange::new(40, 84));
        assert_eq!(s[0].event.offset, 100);
        assert_eq!(s[0].at, 140);
        assert_eq!(s[1].event.offset, 400);
        assert_eq!(s[1].event.segment, events[1].segment);
        assert!(rebase(&[], 0, 0, PitchRange::new(40, 84)).is_empty());
    }

    #[test]
    fn test_rebase_clamps_pitch_into_range() {
        let events = [event(30, 1000), event(60, 1200), event(100, 1400)];
        let s = rebase(&events, 0, 40, PitchRange::new(40, 84));
        let pitches: Vec<Pitch> = s.iter().map(|x| x.event.segment.pitch).collect();
        assert_eq!(pitches, vec![40, 60, 84]);
        // timing is untouched
        assert_eq!(s[2].event.offset, 400);
        assert_eq!(s[2].event.segment.duration, 100);
    }

    #[test]
    fn test_header_range_check() {
        let wide = Config {
            freq_min_hz: 27.5,
            ..Config::default()
        };
        let bytes = SessionWriter::new(Vec::new(), &wide).unwrap().into_inner();
        let reader = SessionReader::open(Cursor::new(bytes)).unwrap();
        assert_eq!(reader.header.pitch_range(), wide.pitch_range());
        assert!(reader.header.check_range(wide.pitch_range()));
        assert!(!reader.header.check_range(Config::default().pitch_range()));
    }
}
