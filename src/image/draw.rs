//! Filled and stroked 2D primitives on the image surface.

use vek::Vec2;

use crate::bbox::Box2;
use crate::color::{Color, Rgba64};
use crate::image::Image;

impl<'a, C: Color> Image<'a, C> {
    /// Horizontal run of `w` pixels starting at `(x, y)`, clipped.
    pub fn draw_hline(&mut self, x: i32, y: i32, w: i32, c: C) {
        if !self.is_valid() || y < 0 || y >= self.ly() || w <= 0 {
            return;
        }
        let x0 = x.max(0);
        let x1 = x.saturating_add(w - 1).min(self.lx() - 1);
        if x0 > x1 {
            return;
        }
        unsafe {
            let p = self.raw_view().data.offset(
                y as isize * self.stride() as isize + x0 as isize,
            );
            C::fill_run(p, (x1 - x0 + 1) as usize, c);
        }
    }

    /// Vertical run of `h` pixels starting at `(x, y)`, clipped.
    pub fn draw_vline(&mut self, x: i32, y: i32, h: i32, c: C) {
        if !self.is_valid() || x < 0 || x >= self.lx() || h <= 0 {
            return;
        }
        let y0 = y.max(0);
        let y1 = y.saturating_add(h - 1).min(self.ly() - 1);
        for yy in y0..=y1 {
            unsafe { self.write_unchecked(x, yy, c) }
        }
    }

    /// Fill the intersection of `b` with the image.
    pub fn fill_rect(&mut self, b: Box2<i32>, c: C) {
        let b = b.intersect(&self.bounds());
        if b.is_empty() {
            return;
        }
        let w = b.width();
        for y in b.min.y..=b.max.y {
            self.draw_hline(b.min.x, y, w, c);
        }
    }

    /// Blend `c` over the intersection of `b` with the image.
    pub fn fill_rect_blend(&mut self, b: Box2<i32>, c: C, opacity: f32) {
        let b = b.intersect(&self.bounds());
        if b.is_empty() {
            return;
        }
        let k = (opacity.max(0.0).min(1.0) * 256.0) as u32;
        for y in b.min.y..=b.max.y {
            for x in b.min.x..=b.max.x {
                unsafe {
                    let old = self.read_unchecked(x, y);
                    self.write_unchecked(x, y, old.blend256(c, k));
                }
            }
        }
    }

    /// One-pixel-wide rectangle outline.
    pub fn draw_rect(&mut self, b: Box2<i32>, c: C) {
        if b.is_empty() {
            return;
        }
        let w = b.width();
        let h = b.height();
        self.draw_hline(b.min.x, b.min.y, w, c);
        if h > 1 {
            self.draw_hline(b.min.x, b.max.y, w, c);
            self.draw_vline(b.min.x, b.min.y + 1, h - 2, c);
            self.draw_vline(b.max.x, b.min.y + 1, h - 2, c);
        }
    }

    /// Fill with a left-to-right gradient from `c1` to `c2`.
    ///
    /// The ramp is stepped in a 16-bit-per-channel accumulator with 16
    /// fractional bits, so long runs do not drift from per-pixel rounding.
    pub fn fill_rect_hgradient(&mut self, b: Box2<i32>, c1: C, c2: C) {
        let b = b.intersect(&self.bounds());
        if b.is_empty() {
            return;
        }
        let n = b.width();
        let ramp = GradientRamp::new(c1.to_rgba64(), c2.to_rgba64(), n);
        let mut acc = ramp.start();
        for x in b.min.x..=b.max.x {
            let c = C::from_rgba64(acc.color());
            for y in b.min.y..=b.max.y {
                unsafe { self.write_unchecked(x, y, c) }
            }
            acc.step();
        }
    }

    /// Fill with a top-to-bottom gradient from `c1` to `c2`.
    pub fn fill_rect_vgradient(&mut self, b: Box2<i32>, c1: C, c2: C) {
        let b = b.intersect(&self.bounds());
        if b.is_empty() {
            return;
        }
        let n = b.height();
        let ramp = GradientRamp::new(c1.to_rgba64(), c2.to_rgba64(), n);
        let mut acc = ramp.start();
        let w = b.width();
        for y in b.min.y..=b.max.y {
            self.draw_hline(b.min.x, y, w, C::from_rgba64(acc.color()));
            acc.step();
        }
    }

    /// Bresenham line between two points, endpoints included. Axis-aligned
    /// segments dispatch to the specialized run fills.
    pub fn draw_line(&mut self, p0: Vec2<i32>, p1: Vec2<i32>, c: C) {
        if !self.is_valid() {
            return;
        }
        if p0.y == p1.y {
            let x = p0.x.min(p1.x);
            self.draw_hline(x, p0.y, (p0.x - p1.x).abs() + 1, c);
            return;
        }
        if p0.x == p1.x {
            let y = p0.y.min(p1.y);
            self.draw_vline(p0.x, y, (p0.y - p1.y).abs() + 1, c);
            return;
        }
        self.bresenham(p0, p1, |im, x, y| im.draw_pixel(x, y, c));
    }

    /// Blended Bresenham line.
    pub fn draw_line_blend(&mut self, p0: Vec2<i32>, p1: Vec2<i32>, c: C, opacity: f32) {
        if !self.is_valid() {
            return;
        }
        self.bresenham(p0, p1, |im, x, y| im.blend_pixel(x, y, c, opacity));
    }

    #[inline]
    fn bresenham(&mut self, p0: Vec2<i32>, p1: Vec2<i32>, mut plot: impl FnMut(&mut Self, i32, i32)) {
        let dx = (p1.x - p0.x).abs();
        let dy = -(p1.y - p0.y).abs();
        let sx = if p0.x < p1.x { 1 } else { -1 };
        let sy = if p0.y < p1.y { 1 } else { -1 };
        let mut err = dx + dy;
        let (mut x, mut y) = (p0.x, p0.y);
        loop {
            plot(self, x, y);
            if x == p1.x && y == p1.y {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    /// One-pixel-wide circle outline (integer midpoint walk).
    pub fn draw_circle(&mut self, center: Vec2<i32>, r: i32, c: C) {
        if !self.is_valid() || r < 0 {
            return;
        }
        if r == 0 {
            self.draw_pixel(center.x, center.y, c);
            return;
        }
        let (cx, cy) = (center.x, center.y);
        let mut x = r;
        let mut y = 0;
        let mut err = 1 - r;
        while x >= y {
            self.draw_pixel(cx + x, cy + y, c);
            self.draw_pixel(cx - x, cy + y, c);
            self.draw_pixel(cx + x, cy - y, c);
            self.draw_pixel(cx - x, cy - y, c);
            self.draw_pixel(cx + y, cy + x, c);
            self.draw_pixel(cx - y, cy + x, c);
            self.draw_pixel(cx + y, cy - x, c);
            self.draw_pixel(cx - y, cy - x, c);
            y += 1;
            if err < 0 {
                err += 2 * y + 1;
            } else {
                x -= 1;
                err += 2 * (y - x) + 1;
            }
        }
    }

    /// Filled circle (horizontal spans per midpoint step).
    pub fn fill_circle(&mut self, center: Vec2<i32>, r: i32, c: C) {
        if !self.is_valid() || r < 0 {
            return;
        }
        let (cx, cy) = (center.x, center.y);
        let mut x = r;
        let mut y = 0;
        let mut err = 1 - r;
        while x >= y {
            self.draw_hline(cx - x, cy + y, 2 * x + 1, c);
            if y != 0 {
                self.draw_hline(cx - x, cy - y, 2 * x + 1, c);
            }
            y += 1;
            if err < 0 {
                err += 2 * y + 1;
            } else {
                if x != y {
                    self.draw_hline(cx - y, cy + x, 2 * y + 1, c);
                    self.draw_hline(cx - y, cy - x, 2 * y + 1, c);
                }
                x -= 1;
                err += 2 * (y - x) + 1;
            }
        }
    }
}

/// Per-channel 16.16 fixed-point ramp between two wide colors.
struct GradientRamp {
    step: [i64; 4],
    from: [i64; 4],
}

struct GradientAcc {
    acc: [i64; 4],
    step: [i64; 4],
}

impl GradientRamp {
    fn new(from: Rgba64, to: Rgba64, n: i32) -> Self {
        let f = [
            from.r16() as i64,
            from.g16() as i64,
            from.b16() as i64,
            from.a16() as i64,
        ];
        let t = [
            to.r16() as i64,
            to.g16() as i64,
            to.b16() as i64,
            to.a16() as i64,
        ];
        let div = (n as i64 - 1).max(1);
        let mut step = [0i64; 4];
        for i in 0..4 {
            step[i] = ((t[i] - f[i]) << 16) / div;
        }
        Self {
            step,
            from: f,
        }
    }

    fn start(&self) -> GradientAcc {
        let mut acc = [0i64; 4];
        for i in 0..4 {
            acc[i] = self.from[i] << 16;
        }
        GradientAcc {
            acc,
            step: self.step,
        }
    }
}

impl GradientAcc {
    #[inline]
    fn color(&self) -> Rgba64 {
        Rgba64::with_alpha(
            (self.acc[0] >> 16).max(0).min(65535) as u16,
            (self.acc[1] >> 16).max(0).min(65535) as u16,
            (self.acc[2] >> 16).max(0).min(65535) as u16,
            (self.acc[3] >> 16).max(0).min(65535) as u16,
        )
    }

    #[inline]
    fn step(&mut self) {
        for i in 0..4 {
            self.acc[i] += self.step[i];
        }
    }
}
