//! Geometric primitives drawn straight into a [`FrameBuffer`].
//!
//! Primitives clip: pixels that land outside the panel are dropped, the rest
//! of the shape is still drawn.

use alloc::vec::Vec;

use crate::{FrameBuffer, OutOfRange};

impl<const ROWS: usize, const COLS: usize> FrameBuffer<ROWS, COLS> {
    /// Draw a straight line from `(row0, col0)` to `(row1, col1)` inclusive.
    ///
    /// Integer Bresenham. The line is 8-connected and one pixel wide, and the
    /// same pixels are painted whichever end it is drawn from. Only the part
    /// on the panel is stepped through, so far-off endpoints cost nothing.
    pub fn line(&mut self, row0: i32, col0: i32, row1: i32, col1: i32, color: u8) {
        let drow = (i64::from(row1) - i64::from(row0)).abs();
        let dcol = (i64::from(col1) - i64::from(col0)).abs();
        if dcol < drow {
            let (start, end) = if row0 > row1 {
                ((row1, col1), (row0, col0))
            } else {
                ((row0, col0), (row1, col1))
            };
            bresenham(start, end, ROWS, |row, col| self.plot(row, col, color));
        } else {
            let (start, end) = if col0 > col1 {
                ((col1, row1), (col0, row0))
            } else {
                ((col0, row0), (col1, row1))
            };
            bresenham(start, end, COLS, |col, row| self.plot(row, col, color));
        }
    }

    /// Draw the outline of a circle of `radius` centred on `(row, col)`.
    ///
    /// Integer midpoint (Bresenham) circle, `d` seeded with `3 - 2r`. A radius
    /// of zero paints the centre pixel only. A circle whose outline misses
    /// the panel entirely, including one that encloses it, draws nothing.
    pub fn circle(&mut self, row: i32, col: i32, radius: u32, color: u8) {
        let (row, col, radius) = (i64::from(row), i64::from(col), i64::from(radius));
        if !self.outline_meets_panel(row, col, radius) {
            return;
        }
        let (mut x, mut y) = (0, radius);
        let mut d = 3 - 2 * radius;
        while y >= x {
            self.circle_octants(row, col, x, y, color);
            if d > 0 {
                d += 4 * (x - y) + 10;
                y -= 1;
            } else {
                d += 4 * x + 6;
            }
            x += 1;
        }
    }

    /// Whether a ring of `radius` around `(row, col)` can have a pixel on the
    /// panel. Outline pixels stay within one of the true radius; two gives
    /// slack.
    fn outline_meets_panel(&self, row: i64, col: i64, radius: i64) -> bool {
        let (last_row, last_col) = (ROWS as i64 - 1, COLS as i64 - 1);
        if last_row < 0 || last_col < 0 {
            return false;
        }
        let near = |c: i64, last: i64| i128::from(c.clamp(0, last) - c);
        let far = |c: i64, last: i64| i128::from(c.abs().max((c - last).abs()));
        let nearest = near(row, last_row).pow(2) + near(col, last_col).pow(2);
        let farthest = far(row, last_row).pow(2) + far(col, last_col).pow(2);
        let radius = i128::from(radius);
        nearest <= (radius + 2).pow(2) && (radius - 2).max(0).pow(2) <= farthest
    }

    fn circle_octants(&mut self, row: i64, col: i64, x: i64, y: i64, color: u8) {
        for (dr, dc) in [(x, y), (-x, y), (x, -y), (-x, -y), (y, x), (-y, x), (y, -x), (-y, -x)] {
            if let (Ok(r), Ok(c)) = (i32::try_from(row + dr), i32::try_from(col + dc)) {
                self.plot(r, c, color);
            }
        }
    }

    /// Draw a closed polygon through `points`, given as `(row, col)` pairs.
    ///
    /// Consecutive points are joined and the last point is joined back to the
    /// first. Fewer than two points draws nothing.
    pub fn polygon(&mut self, points: &[(i32, i32)], color: u8) {
        let (Some(&first), Some(&last)) = (points.first(), points.last()) else {
            return;
        };
        if points.len() < 2 {
            return;
        }
        for pair in points.windows(2) {
            let ((r0, c0), (r1, c1)) = (pair[0], pair[1]);
            self.line(r0, c0, r1, c1, color);
        }
        self.line(last.0, last.1, first.0, first.1, color);
    }

    /// Flood fill the region around `(row, col)` with `color`.
    ///
    /// The region is every pixel 4-connected to the start through pixels of
    /// the start pixel's colour. Anything of another colour, and the panel
    /// edge, bounds it. Filling a region with its own colour does nothing.
    ///
    /// # Errors
    ///
    /// [`OutOfRange`] if the start pixel is outside the panel.
    pub fn fill_area(&mut self, row: i32, col: i32, color: u8) -> Result<(), OutOfRange> {
        let background = self.value(row, col)?;
        let color = color & self.color_mask();
        if background == color {
            return Ok(());
        }

        // Pixels are recoloured as they are pushed, so each is pushed at most
        // once and nothing still on the stack can match the background.
        let (row, col) = (row as usize, col as usize);
        self.row_mut(row)[col] = color;
        let mut stack = Vec::new();
        stack.push((row, col));

        while let Some((r, c)) = stack.pop() {
            let neighbours = [
                (r.checked_sub(1), Some(c)),
                (Some(r + 1).filter(|&r| r < ROWS), Some(c)),
                (Some(r), c.checked_sub(1)),
                (Some(r), Some(c + 1).filter(|&c| c < COLS)),
            ];
            for (nr, nc) in neighbours {
                let (Some(nr), Some(nc)) = (nr, nc) else {
                    continue;
                };
                let pixel = &mut self.row_mut(nr)[nc];
                if *pixel == background {
                    *pixel = color;
                    stack.push((nr, nc));
                }
            }
        }
        Ok(())
    }
}

/// Step a Bresenham line along its major axis from `start` to `end`, given as
/// `(major, minor)` with `start.0 <= end.0`, calling `visit(major, minor)` for
/// each pixel whose major coordinate is in `0..limit`.
///
/// The minor offset at step `k` is the smallest `y` with
/// `(2y + 1) * dmajor >= 2k * dminor`, which is what the incremental
/// decision variable produces, so steps off the panel can be skipped.
fn bresenham(
    (major0, minor0): (i32, i32),
    (major1, minor1): (i32, i32),
    limit: usize,
    mut visit: impl FnMut(i32, i32),
) {
    let dmajor = i128::from(major1) - i128::from(major0);
    let dminor = i128::from(minor1) - i128::from(minor0);
    let step = dminor.signum();
    let dminor = dminor.abs();

    let first = i64::from(major0.max(0));
    let last = i64::from(major1).min(limit as i64 - 1);
    for major in first..=last {
        let k = i128::from(major) - i128::from(major0);
        let offset = if dmajor == 0 {
            0
        } else {
            let den = 2 * dmajor;
            (2 * k * dminor - dmajor + den - 1).div_euclid(den)
        };
        if let Ok(minor) = i32::try_from(i128::from(minor0) + step * offset) {
            visit(major as i32, minor);
        }
    }
}
