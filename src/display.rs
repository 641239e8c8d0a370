//! Display surface: the drawing primitives the roll issues, and an in-memory
//! RGB565 framebuffer that implements them.
//!
//! All coordinates are logical, post-rotation pixels with (0,0) at top-left.
//! The framebuffer clips every primitive to its bounds, so callers may pass
//! spans that run off either edge.

use crate::types::{Color, XCoord, YCoord};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Glyph cell width in pixels (5 columns of glyph + 1 spacing).
pub const CHAR_WIDTH: XCoord = 6;
/// Glyph cell height in pixels (7 rows of glyph + 1 spacing).
pub const CHAR_HEIGHT: YCoord = 8;

/// Drawing primitives offered by a raster display driver.
pub trait Display {
    fn width(&self) -> XCoord;
    fn height(&self) -> YCoord;
    fn fill_rect(&mut self, x: XCoord, y: YCoord, w: XCoord, h: YCoord, color: Color);
    fn fill_screen(&mut self, color: Color);
    fn draw_hline(&mut self, x: XCoord, y: YCoord, len: XCoord, color: Color);
    fn draw_vline(&mut self, x: XCoord, y: YCoord, len: YCoord, color: Color);
    /// Draw one character cell. When `bg == fg` the background is left untouched.
    fn draw_char(&mut self, x: XCoord, y: YCoord, c: char, fg: Color, bg: Color, scale: u8);
}

/// Physical panel orientation, in quarter turns clockwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    pub fn from_quarter_turns(n: u8) -> Self {
        match n % 4 {
            0 => Rotation::Deg0,
            1 => Rotation::Deg90,
            2 => Rotation::Deg180,
            _ => Rotation::Deg270,
        }
    }

    fn swaps_axes(self) -> bool {
        matches!(self, Rotation::Deg90 | Rotation::Deg270)
    }
}

/// Expand RGB565 to 8-bit-per-channel RGB.
pub fn rgb565_to_rgb888(c: Color) -> (u8, u8, u8) {
    let r = ((c >> 11) & 0x1F) as u32;
    let g = ((c >> 5) & 0x3F) as u32;
    let b = (c & 0x1F) as u32;
    (
        ((r * 255 + 15) / 31) as u8,
        ((g * 255 + 31) / 63) as u8,
        ((b * 255 + 15) / 31) as u8,
    )
}

/// In-memory RGB565 surface.
pub struct Framebuffer {
    phys_width: usize,
    phys_height: usize,
    rotation: Rotation,
    pixels: Vec<Color>,
}

impl Framebuffer {
    /// Unrotated surface of the given logical size, initially black.
    pub fn new(width: usize, height: usize) -> Self {
        Self::with_rotation(width, height, Rotation::Deg0)
    }

    /// Surface for a panel of the given physical size mounted with `rotation`.
    pub fn with_rotation(phys_width: usize, phys_height: usize, rotation: Rotation) -> Self {
        Self {
            phys_width,
            phys_height,
            rotation,
            pixels: vec![0; phys_width * phys_height],
        }
    }

    /// Logical pixel at (x, y), or None outside the surface.
    pub fn pixel(&self, x: XCoord, y: YCoord) -> Option<Color> {
        self.index(x, y).map(|i| self.pixels[i])
    }

    /// Number of logical pixels with exactly this color.
    pub fn count(&self, color: Color) -> usize {
        self.pixels.iter().filter(|&&p| p == color).count()
    }

    /// Write the logical image as a binary PPM (P6).
    pub fn write_ppm(&self, path: &Path) -> io::Result<()> {
        let mut w = BufWriter::new(File::create(path)?);
        writeln!(w, "P6\n{} {}\n255", self.width(), self.height())?;
        for y in 0..self.height() {
            for x in 0..self.width() {
                let (r, g, b) = rgb565_to_rgb888(self.pixel(x, y).unwrap_or(0));
                w.write_all(&[r, g, b])?;
            }
        }
        w.flush()
    }

    fn index(&self, x: XCoord, y: YCoord) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width() || y >= self.height() {
            return None;
        }
        let (x, y) = (x as usize, y as usize);
        let (pw, ph) = (self.phys_width, self.phys_height);
        let (px, py) = match self.rotation {
            Rotation::Deg0 => (x, y),
            Rotation::Deg90 => (pw - 1 - y, x),
            Rotation::Deg180 => (pw - 1 - x, ph - 1 - y),
            Rotation::Deg270 => (y, ph - 1 - x),
        };
        Some(py * pw + px)
    }

    fn set(&mut self, x: XCoord, y: YCoord, color: Color) {
        if let Some(i) = self.index(x, y) {
            self.pixels[i] = color;
        }
    }
}

impl Display for Framebuffer {
    fn width(&self) -> XCoord {
        if self.rotation.swaps_axes() {
            self.phys_height as XCoord
        } else {
            self.phys_width as XCoord
        }
    }

    fn height(&self) -> YCoord {
        if self.rotation.swaps_axes() {
            self.phys_width as YCoord
        } else {
            self.phys_height as YCoord
        }
    }

    fn fill_rect(&mut self, x: XCoord, y: YCoord, w: XCoord, h: YCoord, color: Color) {
        if w <= 0 || h <= 0 {
            return;
        }
        let x0 = x.max(0);
        let y0 = y.max(0);
        let x1 = x.saturating_add(w).min(self.width());
        let y1 = y.saturating_add(h).min(self.height());
        for yy in y0..y1 {
            for xx in x0..x1 {
                self.set(xx, yy, color);
            }
        }
    }

    fn fill_screen(&mut self, color: Color) {
        self.pixels.fill(color);
    }

    fn draw_hline(&mut self, x: XCoord, y: YCoord, len: XCoord, color: Color) {
        self.fill_rect(x, y, len, 1, color);
    }

    fn draw_vline(&mut self, x: XCoord, y: YCoord, len: YCoord, color: Color) {
        self.fill_rect(x, y, 1, len, color);
    }

    fn draw_char(&mut self, x: XCoord, y: YCoord, c: char, fg: Color, bg: Color, scale: u8) {
        let s = scale.max(1) as i32;
        let columns = glyph(c);
        for col in 0..CHAR_WIDTH {
            let bits = columns.get(col as usize).copied().unwrap_or(0);
            for row in 0..CHAR_HEIGHT {
                let on = row < 8 && bits & (1 << row) != 0;
                if on {
                    self.fill_rect(x + col * s, y + row * s, s, s, fg);
                } else if bg != fg {
                    self.fill_rect(x + col * s, y + row * s, s, s, bg);
                }
            }
        }
    }
}

/// 5x7 column-major glyphs, bit 0 at the top.
fn glyph(c: char) -> [u8; 5] {
    match c {
        '0' => [0x3E, 0x51, 0x49, 0x45, 0x3E],
        '1' => [0x00, 0x42, 0x7F, 0x40, 0x00],
        '2' => [0x42, 0x61, 0x51, 0x49, 0x46],
        '3' => [0x21, 0x41, 0x45, 0x4B, 0x31],
        '4' => [0x18, 0x14, 0x12, 0x7F, 0x10],
        '5' => [0x27, 0x45, 0x45, 0x45, 0x39],
        '6' => [0x3C, 0x4A, 0x49, 0x49, 0x30],
        '7' => [0x01, 0x71, 0x09, 0x05, 0x03],
        '8' => [0x36, 0x49, 0x49, 0x49, 0x36],
        '9' => [0x06, 0x49, 0x49, 0x29, 0x1E],
        'A' => [0x7E, 0x11, 0x11, 0x11, 0x7E],
        'B' => [0x7F, 0x49, 0x49, 0x49, 0x36],
        'C' => [0x3E, 0x41, 0x41, 0x41, 0x22],
        'D' => [0x7F, 0x41, 0x41, 0x22, 0x1C],
        'E' => [0x7F, 0x49, 0x49, 0x49, 0x41],
        'F' => [0x7F, 0x09, 0x09, 0x09, 0x01],
        'G' => [0x3E, 0x41, 0x49, 0x49, 0x7A],
        '#' => [0x14, 0x7F, 0x14, 0x7F, 0x14],
        '-' => [0x08, 0x08, 0x08, 0x08, 0x08],
        _ => [0; 5],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_rect_clips() {
        let mut fb = Framebuffer::new(10, 5);
        fb.fill_rect(-3, -3, 6, 6, 7);
        assert_eq!(fb.count(7), 9);
        fb.fill_rect(8, 3, 100, 100, 9);
        assert_eq!(fb.count(9), 4);
    }

    #[test]
    fn test_non_positive_extent_draws_nothing() {
        let mut fb = Framebuffer::new(10, 5);
        fb.fill_rect(2, 2, 0, 3, 1);
        fb.fill_rect(2, 2, -4, 3, 1);
        fb.draw_hline(0, 1, -1, 1);
        assert_eq!(fb.count(1), 0);
    }

    #[test]
    fn test_lines() {
        let mut fb = Framebuffer::new(8, 8);
        fb.draw_hline(1, 2, 3, 5);
        fb.draw_vline(6, 0, 20, 6);
        assert_eq!(fb.count(5), 3);
        assert_eq!(fb.count(6), 8);
        assert_eq!(fb.pixel(3, 2), Some(5));
        assert_eq!(fb.pixel(4, 2), Some(0));
    }

    #[test]
    fn test_rotation_swaps_logical_size() {
        let mut fb = Framebuffer::with_rotation(128, 160, Rotation::from_quarter_turns(3));
        assert_eq!(fb.width(), 160);
        assert_eq!(fb.height(), 128);
        fb.fill_rect(159, 127, 1, 1, 3);
        assert_eq!(fb.pixel(159, 127), Some(3));
        assert_eq!(fb.count(3), 1);
        assert_eq!(fb.pixel(160, 0), None);
    }

    #[test]
    fn test_draw_char_transparent_background() {
        let mut fb = Framebuffer::new(12, 8);
        fb.fill_screen(1);
        fb.draw_char(0, 0, 'C', 2, 2, 1);
        let lit = fb.count(2);
        assert!(lit > 0);
        assert_eq!(fb.count(1), 12 * 8 - lit);
        fb.draw_char(6, 0, 'G', 2, 4, 1);
        // opaque cell: every pixel of the 6x8 cell is either fg or bg
        let cell: usize = (6..12)
            .flat_map(|x| (0..8).map(move |y| (x, y)))
            .filter(|&(x, y)| matches!(fb.pixel(x, y), Some(2) | Some(4)))
            .count();
        assert_eq!(cell, 48);
    }

    #[test]
    fn test_rgb565_expansion() {
        assert_eq!(rgb565_to_rgb888(0xFFFF), (255, 255, 255));
        assert_eq!(rgb565_to_rgb888(0xF800), (255, 0, 0));
        assert_eq!(rgb565_to_rgb888(0x001F), (0, 0, 255));
        assert_eq!(rgb565_to_rgb888(0x0000), (0, 0, 0));
    }
}
