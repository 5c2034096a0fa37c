//! Screen-space triangle rasterization.
//!
//! The rasterizer consumes three screen-space vertices whose homogeneous
//! divide already happened (`w` holds the reciprocal of the original `w`,
//! which is exactly what perspective-correct interpolation steps linearly)
//! and walks the covered pixels with integer edge equations. Coverage uses
//! the top-left fill rule, so triangles sharing an edge never write a pixel
//! twice.
//!
//! Per-pixel work is monomorphized: [`Kern`] carries the shading flags as
//! associated consts, and `ZBUF`/`ORTHO` are const parameters of the scan
//! function, so each of the shader variants compiles to its own loop with
//! the dead branches removed. [`dispatch_triangle`] picks the variant once
//! per triangle from the shader mask.

use vek::{Rgb, Vec2};

use crate::bbox::Box2;
use crate::color::Color;
use crate::image::RawView;
use crate::math::{self, Precision};
use crate::shader;

/// A depth-buffer cell encoding.
///
/// Cells clear to [`Depth::EMPTY`] (zero, "no sample yet") and a larger
/// value is nearer, because depth is the reciprocal of `w` after the
/// perspective divide.
pub trait Depth: Copy + PartialOrd + 'static {
    /// The cleared cell; loses against any encoded sample.
    const EMPTY: Self;

    /// Encode a raster depth value. `wa`/`wb` are the linear remap
    /// coefficients used by the 16-bit encoding; the float encoding stores
    /// the value raw and ignores them.
    fn encode(w: f32, wa: f32, wb: f32) -> Self;
}

impl Depth for f32 {
    const EMPTY: Self = 0.0;

    #[inline(always)]
    fn encode(w: f32, _wa: f32, _wb: f32) -> Self {
        w
    }
}

impl Depth for u16 {
    const EMPTY: Self = 0;

    #[inline(always)]
    fn encode(w: f32, wa: f32, wb: f32) -> Self {
        (w * wa + wb).max(0.0).min(65535.0) as u16
    }
}

/// A screen-space vertex ready for rasterization.
#[derive(Copy, Clone, Debug)]
pub(crate) struct RasterVertex {
    /// Position in pixel units.
    pub pos: Vec2<f32>,
    /// Reciprocal of the homogeneous `w` (perspective) or `1 - z` (ortho).
    pub w: f32,
    /// Shaded vertex color in `[0, 1]` channels.
    pub color: Rgb<f32>,
    /// Normalized texture coordinates.
    pub uv: Vec2<f32>,
}

impl Default for RasterVertex {
    fn default() -> Self {
        Self {
            pos: Vec2::new(0.0, 0.0),
            w: 1.0,
            color: Rgb::new(1.0, 1.0, 1.0),
            uv: Vec2::new(0.0, 0.0),
        }
    }
}

/// The uniform block shared by every fragment of a triangle.
pub(crate) struct Uniforms<C, D> {
    pub img: RawView<C>,
    /// Depth cells, or null when depth is off; row-major with
    /// `zbuf_stride` cells per row (the target's `lx`, not its stride).
    pub zbuf: *mut D,
    pub zbuf_stride: i32,
    /// Texture view; invalid when untextured.
    pub tex: RawView<C>,
    /// Flat face color / texture modulator.
    pub face_color: Rgb<f32>,
    /// 16-bit depth remap coefficients.
    pub wa: f32,
    pub wb: f32,
    pub precision: Precision,
}

/// Compile-time shading flags. The unit struct [`Kern`] instantiates one
/// combination per type.
pub(crate) trait ShaderKind {
    const GOURAUD: bool;
    const TEXTURED: bool;
    const BILINEAR: bool;
    const WRAP_POW2: bool;
}

pub(crate) struct Kern<const G: bool, const T: bool, const B: bool, const W: bool>;

impl<const G: bool, const T: bool, const B: bool, const W: bool> ShaderKind for Kern<G, T, B, W> {
    const GOURAUD: bool = G;
    const TEXTURED: bool = T;
    const BILINEAR: bool = B;
    const WRAP_POW2: bool = W;
}

// Coordinates are clamped to a generous range so that edge-function
// products stay far from i64 overflow even for hostile 2D quad input.
const COORD_LIMIT: i64 = 1 << 20;

// floor(x + 0.5): translation-invariant rounding, so tile renders of a
// larger virtual viewport seam exactly.
#[inline(always)]
fn roundi(x: f32) -> i64 {
    let v = x + 0.5;
    let t = v as i64;
    let r = if (t as f32) > v { t - 1 } else { t };
    r.max(-COORD_LIMIT).min(COORD_LIMIT)
}

#[inline(always)]
fn floori(x: f32) -> i32 {
    let i = x as i32;
    if (i as f32) > x {
        i - 1
    } else {
        i
    }
}

// Top-left rule: an edge owns its pixels when it is exactly horizontal and
// heading right, or heading up (in y-down screen space). Other edges give
// their boundary pixels to the neighbouring triangle via a -1 bias.
#[inline(always)]
fn edge_bias(dx: i64, dy: i64) -> i64 {
    if dy < 0 || (dy == 0 && dx > 0) {
        0
    } else {
        -1
    }
}

#[inline(always)]
unsafe fn sample_nearest<C: Color>(tex: &RawView<C>, u: f32, v: f32, wrap: bool) -> C {
    let mut xi = floori(u);
    let mut yi = floori(v);
    if wrap {
        xi &= tex.lx - 1;
        yi &= tex.ly - 1;
    } else {
        xi = xi.max(0).min(tex.lx - 1);
        yi = yi.max(0).min(tex.ly - 1);
    }
    tex.read(xi, yi)
}

#[inline(always)]
unsafe fn sample_bilinear<C: Color>(tex: &RawView<C>, u: f32, v: f32, wrap: bool) -> C {
    let xf = floori(u);
    let yf = floori(v);
    let ax = ((u - xf as f32) * 256.0) as u32;
    let ay = ((v - yf as f32) * 256.0) as u32;
    let (x0, y0, x1, y1);
    if wrap {
        x0 = xf & (tex.lx - 1);
        y0 = yf & (tex.ly - 1);
        x1 = (xf + 1) & (tex.lx - 1);
        y1 = (yf + 1) & (tex.ly - 1);
    } else {
        x0 = xf.max(0).min(tex.lx - 1);
        y0 = yf.max(0).min(tex.ly - 1);
        x1 = (xf + 1).max(0).min(tex.lx - 1);
        y1 = (yf + 1).max(0).min(tex.ly - 1);
    }
    let c00 = tex.read(x0, y0);
    let c10 = tex.read(x1, y0);
    let c01 = tex.read(x0, y1);
    let c11 = tex.read(x1, y1);
    C::blend_bilinear(c00, c10, c01, c11, ax, ay)
}

/// Scan-convert one triangle. `clip` restricts coverage (normally the
/// target bounds). Callers must hand in vertices in front-facing order:
/// non-positive signed area is skipped, winding fix-ups live one level up.
pub(crate) fn rasterize_triangle<C, D, K, const ZBUF: bool, const ORTHO: bool>(
    u: &Uniforms<C, D>,
    v1: &RasterVertex,
    v2: &RasterVertex,
    v3: &RasterVertex,
    clip: Box2<i32>,
) where
    C: Color,
    D: Depth,
    K: ShaderKind,
{
    if !u.img.is_valid() {
        return;
    }

    let (x1, y1) = (roundi(v1.pos.x), roundi(v1.pos.y));
    let (x2, y2) = (roundi(v2.pos.x), roundi(v2.pos.y));
    let (x3, y3) = (roundi(v3.pos.x), roundi(v3.pos.y));

    let area2 = (x2 - x1) * (y3 - y1) - (y2 - y1) * (x3 - x1);
    if area2 <= 0 {
        return;
    }

    let clip = clip.intersect(&Box2::new(0, u.img.lx - 1, 0, u.img.ly - 1));
    let bb = Box2::new(
        x1.min(x2).min(x3).max(clip.min.x as i64) as i32,
        x1.max(x2).max(x3).min(clip.max.x as i64) as i32,
        y1.min(y2).min(y3).max(clip.min.y as i64) as i32,
        y1.max(y2).max(y3).min(clip.max.y as i64) as i32,
    );
    if bb.is_empty() {
        return;
    }

    // Column and row increments of the three edge functions (edge i is
    // opposite vertex i).
    let cdx1 = -(y3 - y2);
    let cdy1 = x3 - x2;
    let cdx2 = -(y1 - y3);
    let cdy2 = x1 - x3;
    let cdx3 = -(y2 - y1);
    let cdy3 = x2 - x1;

    let (px0, py0) = (bb.min.x as i64, bb.min.y as i64);

    // Unbiased edge values at the first candidate pixel; these double as
    // barycentric weights for the attribute planes.
    let o1u = cdy1 * (py0 - y2) + cdx1 * (px0 - x2);
    let o2u = cdy2 * (py0 - y3) + cdx2 * (px0 - x3);
    let o3u = cdy3 * (py0 - y1) + cdx3 * (px0 - x1);

    let b1 = edge_bias(cdy1, -cdx1);
    let b2 = edge_bias(cdy2, -cdx2);
    let b3 = edge_bias(cdy3, -cdx3);

    let inv_area = 1.0 / area2 as f32;

    // Attribute planes: value at the start pixel plus d/dx and d/dy, all
    // linear in the unbiased edge values.
    macro_rules! plane {
        ($a1:expr, $a2:expr, $a3:expr) => {{
            (
                (o1u as f32 * $a1 + o2u as f32 * $a2 + o3u as f32 * $a3) * inv_area,
                (cdx1 as f32 * $a1 + cdx2 as f32 * $a2 + cdx3 as f32 * $a3) * inv_area,
                (cdy1 as f32 * $a1 + cdy2 as f32 * $a2 + cdy3 as f32 * $a3) * inv_area,
            )
        }};
    }

    let (mut w_row, dw_dx, dw_dy) = plane!(v1.w, v2.w, v3.w);

    let (tw, th) = if K::TEXTURED {
        (u.tex.lx as f32, u.tex.ly as f32)
    } else {
        (0.0, 0.0)
    };
    // Perspective carries u/w, v/w scaled to texel units; ortho carries the
    // plain affine texel coordinates.
    let tex_at = |v: &RasterVertex, s: f32, dim: f32| {
        if ORTHO {
            s * dim
        } else {
            s * dim * v.w
        }
    };
    let (mut tx_row, dtx_dx, dtx_dy) = plane!(
        tex_at(v1, v1.uv.x, tw),
        tex_at(v2, v2.uv.x, tw),
        tex_at(v3, v3.uv.x, tw)
    );
    let (mut ty_row, dty_dx, dty_dy) = plane!(
        tex_at(v1, v1.uv.y, th),
        tex_at(v2, v2.uv.y, th),
        tex_at(v3, v3.uv.y, th)
    );

    // Gouraud channels in [0, 256] units; walked in 8.8 fixed point.
    let c256 = |c: f32| c.max(0.0).min(1.0) * 256.0;
    let (mut r_row, dr_dx, dr_dy) = plane!(c256(v1.color.r), c256(v2.color.r), c256(v3.color.r));
    let (mut g_row, dg_dx, dg_dy) = plane!(c256(v1.color.g), c256(v2.color.g), c256(v3.color.g));
    let (mut b_row, db_dx, db_dy) = plane!(c256(v1.color.b), c256(v2.color.b), c256(v3.color.b));
    let dr_fx = (dr_dx * 256.0) as i32;
    let dg_fx = (dg_dx * 256.0) as i32;
    let db_fx = (db_dx * 256.0) as i32;

    // Flat variants bake their colors once.
    let flat_color = C::from_rgb256(
        c256(u.face_color.r) as u32,
        c256(u.face_color.g) as u32,
        c256(u.face_color.b) as u32,
    );
    let (fm_r, fm_g, fm_b) = (
        c256(u.face_color.r) as u32,
        c256(u.face_color.g) as u32,
        c256(u.face_color.b) as u32,
    );

    // Biased row offsets at (bb.min.x, y).
    let mut o1 = o1u + b1;
    let mut o2 = o2u + b2;
    let mut o3 = o3u + b3;

    let mut y = bb.min.y as i64;
    let by1 = bb.max.y as i64;
    let bx1 = bb.max.x as i64;

    macro_rules! advance_rows {
        ($m:expr) => {{
            let m = $m;
            o1 += cdy1 * m;
            o2 += cdy2 * m;
            o3 += cdy3 * m;
            let mf = m as f32;
            w_row += dw_dy * mf;
            tx_row += dtx_dy * mf;
            ty_row += dty_dy * mf;
            r_row += dr_dy * mf;
            g_row += dg_dy * mf;
            b_row += db_dy * mf;
            y += m;
        }};
    }

    'rows: while y <= by1 {
        // Solve each failing edge for the first column where it turns
        // non-negative; the scan enters at the worst of them.
        let mut enter: i64 = 0;
        {
            let edges = [(o1, cdx1, cdy1), (o2, cdx2, cdy2), (o3, cdx3, cdy3)];
            for &(o, cdx, cdy) in edges.iter() {
                if o < 0 {
                    if cdx > 0 {
                        enter = enter.max(math::ceil_div(-o, cdx));
                    } else if cdy > 0 {
                        // This row cannot be entered at all; jump to the
                        // first row where the edge admits pixels again.
                        advance_rows!(math::ceil_div(-o, cdy));
                        continue 'rows;
                    } else {
                        // The edge only recedes further down: the triangle
                        // has left the scan region for good.
                        return;
                    }
                }
            }
        }

        let xs = bb.min.x as i64 + enter;
        if xs <= bx1 {
            let mut e1 = o1 + cdx1 * enter;
            let mut e2 = o2 + cdx2 * enter;
            let mut e3 = o3 + cdx3 * enter;

            let ef = enter as f32;
            let mut w_cur = w_row + dw_dx * ef;
            let mut tx_cur = tx_row + dtx_dx * ef;
            let mut ty_cur = ty_row + dty_dx * ef;
            let mut r_fx = ((r_row + dr_dx * ef) * 256.0) as i32;
            let mut g_fx = ((g_row + dg_dx * ef) * 256.0) as i32;
            let mut b_fx = ((b_row + db_dx * ef) * 256.0) as i32;

            let mut x = xs;
            while x <= bx1 && e1 >= 0 && e2 >= 0 && e3 >= 0 {
                unsafe {
                    let visible = if ZBUF {
                        let idx = y as isize * u.zbuf_stride as isize + x as isize;
                        let enc = D::encode(w_cur, u.wa, u.wb);
                        let cell = u.zbuf.offset(idx);
                        if enc > *cell {
                            *cell = enc;
                            true
                        } else {
                            false
                        }
                    } else {
                        true
                    };

                    if visible {
                        let out: C = if !K::TEXTURED {
                            if K::GOURAUD {
                                C::from_rgb256(
                                    (r_fx >> 8).max(0) as u32,
                                    (g_fx >> 8).max(0) as u32,
                                    (b_fx >> 8).max(0) as u32,
                                )
                            } else {
                                flat_color
                            }
                        } else {
                            let (tu, tv) = if ORTHO {
                                (tx_cur, ty_cur)
                            } else {
                                let ic = math::recip(w_cur, u.precision);
                                (tx_cur * ic, ty_cur * ic)
                            };
                            // `K::WRAP_POW2` is a constant in each kernel
                            // instantiation, so these branches fold away.
                            let texel = if K::BILINEAR {
                                sample_bilinear::<C>(&u.tex, tu, tv, K::WRAP_POW2)
                            } else {
                                sample_nearest::<C>(&u.tex, tu, tv, K::WRAP_POW2)
                            };
                            if K::GOURAUD {
                                texel.mult256(
                                    (r_fx >> 8).max(0) as u32,
                                    (g_fx >> 8).max(0) as u32,
                                    (b_fx >> 8).max(0) as u32,
                                )
                            } else {
                                texel.mult256(fm_r, fm_g, fm_b)
                            }
                        };
                        u.img.write(x as i32, y as i32, out);
                    }
                }

                e1 += cdx1;
                e2 += cdx2;
                e3 += cdx3;
                w_cur += dw_dx;
                tx_cur += dtx_dx;
                ty_cur += dty_dx;
                r_fx += dr_fx;
                g_fx += dg_fx;
                b_fx += db_fx;
                x += 1;
            }
        }

        advance_rows!(1);
    }
}

/// Select and run the kernel matching the shader `mask`, constrained to the
/// compiled-in `enabled` set.
pub(crate) fn dispatch_triangle<C: Color, D: Depth>(
    mask: u32,
    enabled: u32,
    u: &Uniforms<C, D>,
    v1: &RasterVertex,
    v2: &RasterVertex,
    v3: &RasterVertex,
    clip: Box2<i32>,
) {
    let mask = shader::normalize(mask, enabled);
    let zbuf = shader::has(mask, shader::ZBUFFER) && !u.zbuf.is_null();
    let ortho = shader::has(mask, shader::ORTHO);
    let textured = shader::has(mask, shader::TEXTURE) && u.tex.is_valid();
    let gouraud = shader::has(mask, shader::GOURAUD);
    let bilinear = shader::has(mask, shader::TEXTURE_BILINEAR);
    let wrap = shader::has(mask, shader::TEXTURE_WRAP_POW2);

    match (zbuf, ortho) {
        (false, false) => shade::<C, D, false, false>(gouraud, textured, bilinear, wrap, u, v1, v2, v3, clip),
        (false, true) => shade::<C, D, false, true>(gouraud, textured, bilinear, wrap, u, v1, v2, v3, clip),
        (true, false) => shade::<C, D, true, false>(gouraud, textured, bilinear, wrap, u, v1, v2, v3, clip),
        (true, true) => shade::<C, D, true, true>(gouraud, textured, bilinear, wrap, u, v1, v2, v3, clip),
    }
}

#[allow(clippy::too_many_arguments)]
fn shade<C: Color, D: Depth, const ZBUF: bool, const ORTHO: bool>(
    gouraud: bool,
    textured: bool,
    bilinear: bool,
    wrap: bool,
    u: &Uniforms<C, D>,
    v1: &RasterVertex,
    v2: &RasterVertex,
    v3: &RasterVertex,
    clip: Box2<i32>,
) {
    match (gouraud, textured, bilinear, wrap) {
        (false, false, _, _) => {
            rasterize_triangle::<C, D, Kern<false, false, false, false>, ZBUF, ORTHO>(u, v1, v2, v3, clip)
        }
        (true, false, _, _) => {
            rasterize_triangle::<C, D, Kern<true, false, false, false>, ZBUF, ORTHO>(u, v1, v2, v3, clip)
        }
        (false, true, false, false) => {
            rasterize_triangle::<C, D, Kern<false, true, false, false>, ZBUF, ORTHO>(u, v1, v2, v3, clip)
        }
        (false, true, false, true) => {
            rasterize_triangle::<C, D, Kern<false, true, false, true>, ZBUF, ORTHO>(u, v1, v2, v3, clip)
        }
        (false, true, true, false) => {
            rasterize_triangle::<C, D, Kern<false, true, true, false>, ZBUF, ORTHO>(u, v1, v2, v3, clip)
        }
        (false, true, true, true) => {
            rasterize_triangle::<C, D, Kern<false, true, true, true>, ZBUF, ORTHO>(u, v1, v2, v3, clip)
        }
        (true, true, false, false) => {
            rasterize_triangle::<C, D, Kern<true, true, false, false>, ZBUF, ORTHO>(u, v1, v2, v3, clip)
        }
        (true, true, false, true) => {
            rasterize_triangle::<C, D, Kern<true, true, false, true>, ZBUF, ORTHO>(u, v1, v2, v3, clip)
        }
        (true, true, true, false) => {
            rasterize_triangle::<C, D, Kern<true, true, true, false>, ZBUF, ORTHO>(u, v1, v2, v3, clip)
        }
        (true, true, true, true) => {
            rasterize_triangle::<C, D, Kern<true, true, true, true>, ZBUF, ORTHO>(u, v1, v2, v3, clip)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Rgba32;
    use crate::image::Image;

    fn flat_uniforms(img: &Image<Rgba32>) -> Uniforms<Rgba32, f32> {
        Uniforms {
            img: img.raw_view(),
            zbuf: core::ptr::null_mut(),
            zbuf_stride: 0,
            tex: RawView {
                data: core::ptr::null_mut(),
                lx: 0,
                ly: 0,
                stride: 0,
            },
            face_color: Rgb::new(1.0, 1.0, 1.0),
            wa: 0.0,
            wb: 0.0,
            precision: Precision::Precise,
        }
    }

    fn vert(x: f32, y: f32) -> RasterVertex {
        RasterVertex {
            pos: Vec2::new(x, y),
            ..RasterVertex::default()
        }
    }

    fn raster_flat(img: &mut Image<Rgba32>, tri: [(f32, f32); 3]) {
        let u = flat_uniforms(img);
        let clip = img.bounds();
        rasterize_triangle::<_, _, Kern<false, false, false, false>, false, false>(
            &u,
            &vert(tri[0].0, tri[0].1),
            &vert(tri[1].0, tri[1].1),
            &vert(tri[2].0, tri[2].1),
            clip,
        );
    }

    fn coverage(img: &Image<Rgba32>) -> Vec<(i32, i32)> {
        let mut out = Vec::new();
        for y in 0..img.ly() {
            for x in 0..img.lx() {
                if img.read_pixel(x, y) != Some(Rgba32::BLACK) {
                    out.push((x, y));
                }
            }
        }
        out
    }

    // Evaluates the biased edge equations directly at every pixel.
    fn oracle(lx: i32, ly: i32, tri: [(f32, f32); 3]) -> Vec<(i32, i32)> {
        let p: Vec<(i64, i64)> = tri
            .iter()
            .map(|&(x, y)| (roundi(x), roundi(y)))
            .collect();
        let (x1, y1) = p[0];
        let (x2, y2) = p[1];
        let (x3, y3) = p[2];
        let area2 = (x2 - x1) * (y3 - y1) - (y2 - y1) * (x3 - x1);
        if area2 <= 0 {
            return Vec::new();
        }
        let edge = |ax: i64, ay: i64, bx: i64, by: i64, px: i64, py: i64| {
            (bx - ax) * (py - ay) - (by - ay) * (px - ax) + edge_bias(bx - ax, by - ay)
        };
        let mut out = Vec::new();
        for y in 0..ly as i64 {
            for x in 0..lx as i64 {
                if edge(x2, y2, x3, y3, x, y) >= 0
                    && edge(x3, y3, x1, y1, x, y) >= 0
                    && edge(x1, y1, x2, y2, x, y) >= 0
                {
                    out.push((x as i32, y as i32));
                }
            }
        }
        out
    }

    #[test]
    fn lower_left_half_covers_ten_pixels() {
        let mut buf = vec![Rgba32::BLACK; 16];
        let mut img = Image::new(&mut buf, 4, 4);
        raster_flat(&mut img, [(0.0, 0.0), (4.0, 0.0), (0.0, 4.0)]);
        let cov = coverage(&img);
        assert_eq!(cov.len(), 10);
        assert!(cov.contains(&(0, 0)));
        assert!(cov.contains(&(3, 0)));
        assert!(cov.contains(&(0, 3)));
        assert!(!cov.contains(&(3, 3)));
    }

    #[test]
    fn coverage_matches_half_plane_oracle() {
        // Includes triangles reaching outside the clip box, which exercise
        // the row-skip and abort paths of the scan.
        let tris = [
            [(1.0, 1.0), (14.0, 2.0), (3.0, 13.0)],
            [(-10.0, -10.0), (30.0, -5.0), (-5.0, 25.0)],
            [(8.0, -20.0), (40.0, 8.0), (-20.0, 8.0)],
            [(15.9, 0.1), (15.9, 15.9), (0.2, 15.9)],
            [(-3.0, 4.0), (19.0, 4.0), (-3.0, 5.0)],
            [(5.0, -2.0), (6.0, 30.0), (4.0, 30.0)],
            [(12.0, 12.0), (13.0, 12.0), (12.0, 13.0)],
        ];
        for tri in tris.iter() {
            let mut buf = vec![Rgba32::BLACK; 256];
            let mut img = Image::new(&mut buf, 16, 16);
            raster_flat(&mut img, *tri);
            assert_eq!(coverage(&img), oracle(16, 16, *tri), "tri {:?}", tri);
        }
    }

    #[test]
    fn shared_edge_owned_by_one_triangle() {
        // A quad split along its diagonal: every covered pixel must belong
        // to exactly one of the halves.
        let t0 = [(1.0, 1.0), (14.0, 1.0), (14.0, 14.0)];
        let t1 = [(1.0, 1.0), (14.0, 14.0), (1.0, 14.0)];

        let mut buf0 = vec![Rgba32::BLACK; 256];
        let mut img0 = Image::new(&mut buf0, 16, 16);
        raster_flat(&mut img0, t0);
        let c0 = coverage(&img0);

        let mut buf1 = vec![Rgba32::BLACK; 256];
        let mut img1 = Image::new(&mut buf1, 16, 16);
        raster_flat(&mut img1, t1);
        let c1 = coverage(&img1);

        for p in c0.iter() {
            assert!(!c1.contains(p), "pixel {:?} painted by both halves", p);
        }
        // Together the halves tile the whole quad interior.
        assert_eq!(c0.len() + c1.len(), oracle_quad_area());
    }

    fn oracle_quad_area() -> usize {
        let mut n = 0;
        for t in [
            [(1.0, 1.0), (14.0, 1.0), (14.0, 14.0)],
            [(1.0, 1.0), (14.0, 14.0), (1.0, 14.0)],
        ]
        .iter()
        {
            n += oracle(16, 16, *t).len();
        }
        n
    }

    #[test]
    fn degenerate_triangle_writes_nothing() {
        let mut buf = vec![Rgba32::BLACK; 64];
        let mut img = Image::new(&mut buf, 8, 8);
        raster_flat(&mut img, [(2.0, 2.0), (2.0, 2.0), (6.0, 6.0)]);
        assert!(coverage(&img).is_empty());
    }

    #[test]
    fn reversed_winding_is_skipped() {
        let mut buf = vec![Rgba32::BLACK; 64];
        let mut img = Image::new(&mut buf, 8, 8);
        raster_flat(&mut img, [(0.0, 0.0), (0.0, 8.0), (8.0, 0.0)]);
        assert!(coverage(&img).is_empty());
    }

    #[test]
    fn gouraud_weights_sum_to_full_intensity() {
        let mut buf = vec![Rgba32::BLACK; 16];
        let mut img = Image::new(&mut buf, 4, 4);
        let u = flat_uniforms(&img);
        let clip = img.bounds();
        let mut v1 = vert(0.0, 0.0);
        let mut v2 = vert(4.0, 0.0);
        let mut v3 = vert(2.0, 4.0);
        v1.color = Rgb::new(1.0, 0.0, 0.0);
        v2.color = Rgb::new(0.0, 1.0, 0.0);
        v3.color = Rgb::new(0.0, 0.0, 1.0);
        rasterize_triangle::<_, _, Kern<true, false, false, false>, false, false>(
            &u, &v1, &v2, &v3, clip,
        );
        let mut seen_mixed = false;
        for y in 0..4 {
            for x in 0..4 {
                let c = img.read_pixel(x, y).unwrap();
                if c == Rgba32::BLACK {
                    continue;
                }
                let sum = c.r() as i32 + c.g() as i32 + c.b() as i32;
                assert!((250..=260).contains(&sum), "({}, {}): sum {}", x, y, sum);
                if c.r() > 0 && c.g() > 0 && c.b() > 0 {
                    seen_mixed = true;
                }
            }
        }
        assert!(seen_mixed);
    }
}
