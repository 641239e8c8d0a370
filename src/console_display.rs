use crate::display::{rgb565_to_rgb888, Display, Framebuffer};
use crate::types::Color;
use std::fmt::Write as _;
use std::io::{self, Write};

/// Mirrors a framebuffer into the terminal using 24-bit ANSI colors.
///
/// Each character cell shows two pixel rows with an upper half block
/// (foreground = top, background = bottom). The image is downsampled to fit
/// `columns`; each sample keeps the darkest pixel of its block so one-pixel
/// staff lines survive the scaling.
pub struct ConsoleDisplay {
    columns: usize,
    started: bool,
}

impl ConsoleDisplay {
    pub fn new(columns: usize) -> Self {
        Self {
            columns: columns.max(1),
            started: false,
        }
    }

    pub fn show(&mut self, fb: &Framebuffer) {
        let mut stdout = io::stdout();
        if !self.started {
            // Clear screen once; later frames just move the cursor home
            print!("\x1b[2J");
            self.started = true;
        }
        print!("\x1b[H{}", self.render(fb));
        let _ = stdout.flush();
    }

    /// ANSI text for one frame, ending with a color reset.
    pub fn render(&self, fb: &Framebuffer) -> String {
        let width = fb.width().max(0) as usize;
        let height = fb.height().max(0) as usize;
        let step = width.div_ceil(self.columns).max(1);

        let mut out = String::new();
        let mut y = 0;
        while y < height {
            let mut x = 0;
            while x < width {
                let (tr, tg, tb) = rgb565_to_rgb888(darkest(fb, x, y, step));
                let (br, bg, bb) = rgb565_to_rgb888(darkest(fb, x, y + step, step));
                let _ = write!(
                    out,
                    "\x1b[38;2;{};{};{}m\x1b[48;2;{};{};{}m▀",
                    tr, tg, tb, br, bg, bb
                );
                x += step;
            }
            out.push_str("\x1b[0m\n");
            y += 2 * step;
        }
        out
    }
}

fn luma(c: Color) -> u32 {
    let (r, g, b) = rgb565_to_rgb888(c);
    299 * r as u32 + 587 * g as u32 + 114 * b as u32
}

fn darkest(fb: &Framebuffer, x0: usize, y0: usize, step: usize) -> Color {
    let mut best: Option<Color> = None;
    for y in y0..y0 + step {
        for x in x0..x0 + step {
            if let Some(c) = fb.pixel(x as i32, y as i32) {
                if best.map_or(true, |b| luma(c) < luma(b)) {
                    best = Some(c);
                }
            }
        }
    }
    best.unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_dimensions() {
        let mut fb = Framebuffer::new(160, 128);
        fb.fill_screen(0xFFFF);
        let text = ConsoleDisplay::new(80).render(&fb);
        let lines: Vec<&str> = text.lines().collect();
        // step 2: 80 columns, 128 / 4 = 32 rows
        assert_eq!(lines.len(), 32);
        assert_eq!(lines[0].matches('▀').count(), 80);
    }

    #[test]
    fn test_thin_line_survives_downsampling() {
        let mut fb = Framebuffer::new(16, 8);
        fb.fill_screen(0xFFFF);
        fb.draw_hline(0, 5, 16, 0x0000);
        let text = ConsoleDisplay::new(4).render(&fb);
        assert!(text.contains("\x1b[48;2;0;0;0m"));
    }
}
