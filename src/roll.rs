use crate::config::{Config, Palette};
use crate::display::{Display, CHAR_HEIGHT, CHAR_WIDTH};
use crate::geometry::{Geometry, X_FIRSTNOTE};
use crate::history::SegmentHistory;
use crate::pitch::{octave, PitchClass, StaffRole};
use crate::types::{Color, Millis, Pitch, PitchRange, XCoord, YCoord};
use log::{debug, trace};

/// First pixels of each note bar are drawn in the note-start color.
pub const START_LEN: XCoord = 2;

/// The area wiped ahead of the cursor is 1/WIPE_DIVISOR of the screen width.
pub const WIPE_DIVISOR: XCoord = 20;

/// What a single refresh decided and drew.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    /// Number of times the cursor has wrapped since the last clear.
    pub epoch: Millis,
    /// Time at the left edge of the roll, relative to the last clear.
    pub t0: Millis,
    pub cursor: XCoord,
    /// Width of the trailing redraw window in ms.
    pub draw_in_msec: Millis,
    /// Width of the trailing redraw window in pixels.
    pub draw_in_pixels: XCoord,
    pub notes_drawn: usize,
}

/// Scrolling piano roll drawn onto a raster display.
///
/// Time runs left to right and wraps every `msec_on_screen` ms. Each call to
/// [`render`](Self::render) only touches the columns around the cursor:
///
///   - a narrow strip ahead of the cursor is wiped so the next sweep starts clean,
///   - the cursor line itself,
///   - a trailing window behind the cursor, erased and repainted from the
///     segment history. Its width covers the segmenter's minimum duration plus
///     one worst-case processing tick, since a note that recently ended may
///     still be reclassified.
///
/// Everything else on screen stays as it was drawn on earlier ticks.
pub struct PianoRoll<D: Display> {
    display: D,
    palette: Palette,
    range: PitchRange,
    msec_on_screen: Millis,
    redraw_latency: Millis,
    geometry: Geometry,
    /// Wall-clock time of the last clear.
    msec_start: Millis,
}

impl<D: Display> PianoRoll<D> {
    /// Wraps `display` and sizes the roll from the dimensions it reports.
    /// Call [`clear`](Self::clear) before the first render.
    pub fn new(display: D, config: &Config) -> Self {
        let range = config.pitch_range();
        let geometry = Geometry::new(display.width(), display.height(), range, config.msec_on_screen);
        debug!(
            "Roll sized {}x{}: {} rows, {} ms/px",
            geometry.width(),
            geometry.height(),
            range.count(),
            geometry.msec_per_pixel()
        );
        Self {
            display,
            palette: config.palette,
            range,
            msec_on_screen: config.msec_on_screen,
            redraw_latency: config.redraw_latency_ms(),
            geometry,
            msec_start: 0,
        }
    }

    /// Recompute row spacing and time scale for a display of this size.
    pub fn initialize(&mut self, width: XCoord, height: YCoord) {
        self.resize(width, height);
    }

    pub fn resize(&mut self, width: XCoord, height: YCoord) {
        self.geometry = Geometry::new(width, height, self.range, self.msec_on_screen);
        debug!(
            "Roll resized to {}x{}: {} rows, {}px apart (+{} margin), {} ms/px",
            width,
            height,
            self.range.count(),
            self.geometry.pitch2pitch(),
            self.geometry.bottom2lo_pitch(),
            self.geometry.msec_per_pixel()
        );
    }

    /// Blank the screen, draw the full staff with labels, and restart the
    /// scroll epoch at `now`.
    pub fn clear(&mut self, now: Millis) {
        self.display.fill_screen(self.palette.background);
        self.draw_grid(0, self.geometry.width());
        self.msec_start = now;
        debug!("Roll cleared at {} ms", now);
    }

    /// One refresh tick. `last_offset` is the absolute end time of the newest
    /// segment in `history`.
    pub fn render<H: SegmentHistory + ?Sized>(
        &mut self,
        now: Millis,
        last_offset: Millis,
        history: &H,
    ) -> Tick {
        let g = self.geometry;
        let width = g.width();
        let height = g.height();
        let mpp = g.msec_per_pixel();

        let epoch = now.saturating_sub(self.msec_start) / g.msec_on_screen().max(1);
        let t0 = epoch * g.msec_on_screen();
        let cursor = self.time_to_x(now, t0);

        // clear a strip right of the cursor
        let wipe = (width / WIPE_DIVISOR).min(width - cursor).max(0);
        self.display.fill_rect(cursor, 0, wipe, height, self.palette.background);

        self.display.draw_vline(cursor + 1, 0, height, self.palette.cursor);

        let available = (cursor - X_FIRSTNOTE).max(0) as Millis * mpp;
        let draw_in_msec = self.redraw_latency.min(available);
        let draw_in_pixels = (draw_in_msec / mpp) as XCoord;
        let x_window = cursor - draw_in_pixels;

        self.display.fill_rect(x_window, 0, draw_in_pixels, height, self.palette.background);
        self.draw_grid(x_window, draw_in_pixels);

        let notes_drawn = self.draw_notes(now.saturating_sub(draw_in_msec), last_offset, t0, history);

        trace!(
            "tick n={} cursor={} window={}ms/{}px notes={}",
            epoch,
            cursor,
            draw_in_msec,
            draw_in_pixels,
            notes_drawn
        );

        Tick {
            epoch,
            t0,
            cursor,
            draw_in_msec,
            draw_in_pixels,
            notes_drawn,
        }
    }

    /// Staff lines for every pitch row across `x_width` columns from `x_left`.
    /// At `x_left == 0` the C and G rows are also labelled in the left margin.
    pub fn draw_grid(&mut self, x_left: XCoord, x_width: XCoord) {
        for pitch in self.range.iter() {
            let class = PitchClass::from_pitch(pitch);
            let role = class.staff();
            let color = staff_color(&self.palette, role);
            let y = self.geometry.pitch_to_y(pitch);

            if x_left == 0 && role != StaffRole::Other {
                let label_y = y - CHAR_HEIGHT / 2 + 1;
                let digit = char::from_digit(octave(pitch).clamp(0, 9) as u32, 10).unwrap_or('-');
                self.display.draw_char(0, label_y, class.letter(), color, color, 1);
                self.display.draw_char(CHAR_WIDTH, label_y, digit, color, color, 1);
            }
            self.display.draw_hline(x_left.max(X_FIRSTNOTE), y, x_width, color);
        }
    }

    /// Walk the history newest-first and paint every segment that ends after
    /// `horizon`. Returns the number of segments painted.
    fn draw_notes<H: SegmentHistory + ?Sized>(
        &mut self,
        horizon: Millis,
        last_offset: Millis,
        t0: Millis,
        history: &H,
    ) -> usize {
        let mut offset = last_offset;
        let mut drawn = 0;

        while let Some(seg) = history.segment(drawn) {
            if offset <= horizon {
                break;
            }
            let onset = offset.saturating_sub(seg.duration);
            self.draw_note(seg.pitch, onset, offset, t0);
            drawn += 1;
            offset = onset.saturating_sub(seg.onset); // seg.onset is relative
        }
        drawn
    }

    fn draw_note(&mut self, pitch: Pitch, onset: Millis, offset: Millis, t0: Millis) {
        let x_left = self.time_to_x(onset, t0);
        let x_width = self.time_to_x(offset, t0) - x_left;
        let y_height = self.geometry.pitch2pitch();
        let y_top = self.geometry.pitch_to_y(pitch) + y_height / 2;

        if x_width > START_LEN {
            self.display.fill_rect(
                x_left + START_LEN,
                y_top,
                x_width - START_LEN,
                y_height,
                self.palette.note,
            );
        }
        self.display
            .fill_rect(x_left, y_top, START_LEN, y_height, self.palette.note_start);
    }

    /// Column of absolute time `t` when the left edge shows epoch-relative `t0`.
    pub fn time_to_x(&self, t: Millis, t0: Millis) -> XCoord {
        self.geometry.time_to_x(t.saturating_sub(self.msec_start), t0)
    }

    pub fn pitch_to_y(&self, pitch: Pitch) -> YCoord {
        self.geometry.pitch_to_y(pitch)
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn msec_start(&self) -> Millis {
        self.msec_start
    }

    pub fn x_first_note(&self) -> XCoord {
        X_FIRSTNOTE
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn display_mut(&mut self) -> &mut D {
        &mut self.display
    }

    pub fn into_display(self) -> D {
        self.display
    }
}

fn staff_color(palette: &Palette, role: StaffRole) -> Color {
    match role {
        StaffRole::C => palette.roll_c,
        StaffRole::G => palette.roll_g,
        StaffRole::Other => palette.roll_other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::Framebuffer;
    use crate::history::{Segment, SegmentBuf};

    /// 13 rows (E2..E3) on a 160x130 panel: 10px per row, 148 columns of roll.
    fn small_config() -> Config {
        Config {
            freq_min_hz: 82.41,
            freq_max_hz: 164.81,
            ..Config::default()
        }
    }

    fn roll() -> PianoRoll<Framebuffer> {
        let mut r = PianoRoll::new(Framebuffer::new(160, 130), &small_config());
        r.clear(1000);
        r
    }

    #[test]
    fn test_geometry_from_display() {
        let r = roll();
        assert_eq!(r.geometry().pitch2pitch(), 10);
        assert_eq!(r.geometry().bottom2lo_pitch(), 0);
        assert_eq!(r.geometry().msec_per_pixel(), 19);
        assert_eq!(r.pitch_to_y(40), 120);
        assert_eq!(r.pitch_to_y(52), 0);
    }

    #[test]
    fn test_clear_draws_staff_and_labels() {
        let r = roll();
        let fb = r.display();
        let p = *r.palette();
        // E3 (52) is an "other" row, C3 (48) is a C row, G2 (43) is a G row
        assert_eq!(fb.pixel(X_FIRSTNOTE, r.pitch_to_y(52)), Some(p.roll_other));
        assert_eq!(fb.pixel(100, r.pitch_to_y(48)), Some(p.roll_c));
        assert_eq!(fb.pixel(159, r.pitch_to_y(43)), Some(p.roll_g));
        // margin is left free of staff lines but carries labels
        assert_eq!(fb.pixel(X_FIRSTNOTE - 1, r.pitch_to_y(52)), Some(p.background));
        let label_pixels = (0..X_FIRSTNOTE)
            .flat_map(|x| (0..130).map(move |y| (x, y)))
            .filter(|&(x, y)| fb.pixel(x, y) == Some(p.roll_c))
            .count();
        assert!(label_pixels > 0, "C row should be labelled");
    }

    #[test]
    fn test_render_right_after_clear() {
        let mut r = roll();
        let history: SegmentBuf<8> = SegmentBuf::new();
        let tick = r.render(1000, 0, &history);
        assert_eq!(tick.epoch, 0);
        assert_eq!(tick.cursor, X_FIRSTNOTE);
        // no room behind the cursor yet
        assert_eq!(tick.draw_in_msec, 0);
        assert_eq!(tick.draw_in_pixels, 0);
        assert_eq!(tick.notes_drawn, 0);
    }

    #[test]
    fn test_trailing_window_full_width() {
        let mut r = roll();
        let history: SegmentBuf<8> = SegmentBuf::new();
        let tick = r.render(1000 + 1900, 0, &history);
        assert_eq!(tick.cursor, X_FIRSTNOTE + 100);
        assert_eq!(tick.draw_in_msec, 100);
        assert_eq!(tick.draw_in_pixels, 100 / 19);
    }

    #[test]
    fn test_trailing_window_clamped_near_left_edge() {
        let mut r = roll();
        let history: SegmentBuf<8> = SegmentBuf::new();
        // 3 columns in: 57ms of room, less than the 100ms latency
        let tick = r.render(1000 + 3 * 19, 0, &history);
        assert_eq!(tick.cursor, X_FIRSTNOTE + 3);
        assert_eq!(tick.draw_in_msec, 57);
        assert_eq!(tick.draw_in_pixels, 3);
    }

    #[test]
    fn test_cursor_wraps() {
        let mut r = roll();
        let history: SegmentBuf<8> = SegmentBuf::new();
        let tick = r.render(1000 + 2912 + 38, 0, &history);
        assert_eq!(tick.epoch, 1);
        assert_eq!(tick.t0, 2912);
        assert_eq!(tick.cursor, X_FIRSTNOTE + 2);
        assert!(tick.draw_in_msec <= 2 * 19);
    }

    #[test]
    fn test_cursor_line_drawn() {
        let mut r = roll();
        let history: SegmentBuf<8> = SegmentBuf::new();
        let tick = r.render(1000 + 1900, 0, &history);
        let cursor_color = r.palette().cursor;
        for y in 0..130 {
            assert_eq!(r.display().pixel(tick.cursor + 1, y), Some(cursor_color));
        }
    }

    #[test]
    fn test_note_painted_in_window() {
        let mut r = roll();
        let mut history: SegmentBuf<8> = SegmentBuf::new();
        history.push(Segment {
            pitch: 45,
            duration: 200,
            onset: 0,
        });
        let now = 1000 + 2000;
        let tick = r.render(now, now - 20, &history);
        assert_eq!(tick.notes_drawn, 1);

        let p = *r.palette();
        // bar hangs half a row below its staff line
        let y = r.pitch_to_y(45) + 5;
        let x_left = r.time_to_x(now - 220, 0);
        let x_right = r.time_to_x(now - 20, 0);
        assert_eq!(r.display().pixel(x_left, y), Some(p.note_start));
        assert_eq!(r.display().pixel(x_left + 1, y), Some(p.note_start));
        assert_eq!(r.display().pixel(x_left + START_LEN, y), Some(p.note));
        assert_eq!(r.display().pixel(x_right - 1, y), Some(p.note));
    }

    #[test]
    fn test_note_bar_rows() {
        let mut r = roll();
        let mut history: SegmentBuf<8> = SegmentBuf::new();
        history.push(Segment {
            pitch: 45,
            duration: 200,
            onset: 0,
        });
        let now = 1000 + 2000;
        r.render(now, now - 20, &history);

        let p = *r.palette();
        let x = r.time_to_x(now - 100, 0);
        assert_eq!(r.pitch_to_y(45), 70);
        let note_rows: Vec<YCoord> = (0..130)
            .filter(|&y| r.display().pixel(x, y) == Some(p.note))
            .collect();
        assert_eq!(note_rows, (75..85).collect::<Vec<_>>());
    }

    #[test]
    fn test_new_matches_resize() {
        let mut r = roll();
        let before = *r.geometry();
        r.resize(160, 130);
        assert_eq!(*r.geometry(), before);
    }

    #[test]
    fn test_old_segments_not_repainted() {
        let mut r = roll();
        let mut history: SegmentBuf<8> = SegmentBuf::new();
        history.push(Segment {
            pitch: 45,
            duration: 200,
            onset: 0,
        });
        let now = 1000 + 2000;
        // segment ended 500ms ago, well behind the 100ms window
        let tick = r.render(now, now - 500, &history);
        assert_eq!(tick.notes_drawn, 0);
        assert_eq!(r.display().count(r.palette().note), 0);
    }
}
