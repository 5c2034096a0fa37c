//! Copying between image views, including views of the same buffer.

use vek::{Rgb, Vec2};

use crate::bbox::Box2;
use crate::color::Color;
use crate::image::Image;
use crate::raster::{self, RasterVertex, Uniforms};
use crate::shader;

#[derive(Copy, Clone)]
enum BlitMode<C> {
    Copy,
    Blend(u32),
    Masked(C),
}

impl<'a, C: Color> Image<'a, C> {
    /// Copy `src` onto `self` with its top-left corner at `(x, y)`.
    ///
    /// Clipping happens independently against both views, so any placement
    /// is legal. The source may overlap the destination (views of one
    /// buffer); rows are then traversed in whichever order does not read
    /// pixels already overwritten.
    pub fn blit(&mut self, src: &Image<C>, x: i32, y: i32) {
        self.blit_impl(src, src.bounds(), x, y, BlitMode::Copy);
    }

    /// Copy a sub-rectangle of `src` onto `self` at `(x, y)`.
    pub fn blit_sub(&mut self, src: &Image<C>, src_box: Box2<i32>, x: i32, y: i32) {
        self.blit_impl(src, src_box, x, y, BlitMode::Copy);
    }

    /// Blend `src` over `self` with the given opacity.
    pub fn blit_blend(&mut self, src: &Image<C>, x: i32, y: i32, opacity: f32) {
        let k = (opacity.max(0.0).min(1.0) * 256.0) as u32;
        self.blit_impl(src, src.bounds(), x, y, BlitMode::Blend(k));
    }

    /// Copy `src` onto `self`, skipping pixels equal to `transparent`.
    pub fn blit_masked(&mut self, src: &Image<C>, x: i32, y: i32, transparent: C) {
        self.blit_impl(src, src.bounds(), x, y, BlitMode::Masked(transparent));
    }

    /// Copy a rectangle of this image onto itself. Overlap-safe.
    pub fn copy_within(&mut self, src_box: Box2<i32>, x: i32, y: i32) {
        let view = self.raw_view();
        // A second view of the same buffer; sound because all row copies
        // below go through raw pointers with overlap-aware ordering.
        let src = unsafe { Image::from_raw_parts(view.data, view.lx, view.ly, view.stride) };
        self.blit_impl(&src, src_box, x, y, BlitMode::Copy);
    }

    fn blit_impl(&mut self, src: &Image<C>, src_box: Box2<i32>, x: i32, y: i32, mode: BlitMode<C>) {
        if !self.is_valid() || !src.is_valid() {
            return;
        }
        // Clip the source rectangle against the source image, then clip the
        // placement against the destination, carrying adjustments back into
        // the source origin.
        let sb = src_box.intersect(&src.bounds());
        if sb.is_empty() {
            return;
        }
        let mut sx = sb.min.x;
        let mut sy = sb.min.y;
        let mut w = sb.width();
        let mut h = sb.height();
        let mut dx = x;
        let mut dy = y;
        if dx < 0 {
            sx -= dx;
            w += dx;
            dx = 0;
        }
        if dy < 0 {
            sy -= dy;
            h += dy;
            dy = 0;
        }
        w = w.min(self.lx() - dx);
        h = h.min(self.ly() - dy);
        if w <= 0 || h <= 0 {
            return;
        }

        let sview = src.raw_view();
        let dview = self.raw_view();
        // Overlap rule: when destination rows sit at higher addresses than
        // the matching source rows, copy bottom-up so a row is consumed
        // before it is clobbered. Row-internal overlap is handled by the
        // memmove semantics of `ptr::copy`.
        let src_start = unsafe { sview.data.offset(sy as isize * sview.stride as isize + sx as isize) };
        let dst_start = unsafe { dview.data.offset(dy as isize * dview.stride as isize + dx as isize) };
        let backwards = (dst_start as usize) > (src_start as usize);

        for step in 0..h {
            let row = if backwards { h - 1 - step } else { step };
            unsafe {
                let s = sview
                    .data
                    .offset((sy + row) as isize * sview.stride as isize + sx as isize);
                let d = dview
                    .data
                    .offset((dy + row) as isize * dview.stride as isize + dx as isize);
                match mode {
                    BlitMode::Copy => core::ptr::copy(s, d, w as usize),
                    BlitMode::Blend(k) => {
                        for i in 0..w as isize {
                            let old = *d.offset(i);
                            *d.offset(i) = old.blend256(*s.offset(i), k);
                        }
                    }
                    BlitMode::Masked(t) => {
                        for i in 0..w as isize {
                            let c = *s.offset(i);
                            if c != t {
                                *d.offset(i) = c;
                            }
                        }
                    }
                }
            }
        }
    }

    /// Fill a 2D triangle with one color, under the same top-left fill
    /// rule as the 3D pipeline: adjacent triangles sharing an edge cover
    /// every pixel exactly once. Either winding is accepted.
    pub fn fill_triangle(&mut self, p0: Vec2<f32>, p1: Vec2<f32>, p2: Vec2<f32>, c: C) {
        if !self.is_valid() {
            return;
        }
        let mut vs = [RasterVertex::default(); 3];
        for (v, p) in vs.iter_mut().zip([p0, p1, p2].iter()) {
            v.pos = *p;
        }
        let area = (vs[1].pos.x - vs[0].pos.x) * (vs[2].pos.y - vs[0].pos.y)
            - (vs[1].pos.y - vs[0].pos.y) * (vs[2].pos.x - vs[0].pos.x);
        if area < 0.0 {
            vs.swap(1, 2);
        }
        let cf = c.to_rgbaf();
        let u = Uniforms::<C, f32> {
            img: self.raw_view(),
            zbuf: core::ptr::null_mut(),
            zbuf_stride: 0,
            tex: crate::image::RawView {
                data: core::ptr::null_mut(),
                lx: 0,
                ly: 0,
                stride: 0,
            },
            face_color: Rgb::new(cf.r, cf.g, cf.b),
            wa: 0.0,
            wb: 0.0,
            precision: Default::default(),
        };
        let mask = shader::normalize(
            shader::FLAT | shader::NOTEXTURE | shader::NOZBUFFER | shader::ORTHO,
            shader::ALL,
        );
        raster::dispatch_triangle(mask, shader::ALL, &u, &vs[0], &vs[1], &vs[2], self.bounds());
    }

    /// One-pixel-wide triangle outline.
    pub fn draw_triangle(&mut self, p0: Vec2<i32>, p1: Vec2<i32>, p2: Vec2<i32>, c: C) {
        self.draw_line(p0, p1, c);
        self.draw_line(p1, p2, c);
        self.draw_line(p2, p0, c);
    }

    /// Draw a textured triangle with per-vertex homogeneous weights.
    ///
    /// `uv` are normalized texture coordinates, `dst` destination pixel
    /// positions, and `w` the per-vertex `1/w` weights: all-ones gives an
    /// affine mapping, anything else a projective one. Winding is
    /// normalized internally; sampling is nearest with clamped coordinates.
    pub fn draw_textured_triangle(
        &mut self,
        src: &Image<C>,
        uv: [Vec2<f32>; 3],
        dst: [Vec2<f32>; 3],
        w: [f32; 3],
    ) {
        self.textured_tri_impl(src, uv, dst, w, false);
    }

    /// Rasterize `src` onto the destination quad, split into two triangles,
    /// with an affine texture mapping and nearest sampling.
    ///
    /// `src_uv` and `dst` list corners in matching order.
    pub fn draw_textured_quad(
        &mut self,
        src: &Image<C>,
        src_uv: [Vec2<f32>; 4],
        dst: [Vec2<f32>; 4],
    ) {
        self.draw_textured_triangle(
            src,
            [src_uv[0], src_uv[1], src_uv[2]],
            [dst[0], dst[1], dst[2]],
            [1.0; 3],
        );
        self.draw_textured_triangle(
            src,
            [src_uv[0], src_uv[2], src_uv[3]],
            [dst[0], dst[2], dst[3]],
            [1.0; 3],
        );
    }

    /// [`Image::draw_textured_quad`] with bilinear sampling.
    pub fn draw_textured_quad_bilinear(
        &mut self,
        src: &Image<C>,
        src_uv: [Vec2<f32>; 4],
        dst: [Vec2<f32>; 4],
    ) {
        self.textured_tri_impl(
            src,
            [src_uv[0], src_uv[1], src_uv[2]],
            [dst[0], dst[1], dst[2]],
            [1.0; 3],
            true,
        );
        self.textured_tri_impl(
            src,
            [src_uv[0], src_uv[2], src_uv[3]],
            [dst[0], dst[2], dst[3]],
            [1.0; 3],
            true,
        );
    }

    fn textured_tri_impl(
        &mut self,
        src: &Image<C>,
        uv: [Vec2<f32>; 3],
        dst: [Vec2<f32>; 3],
        w: [f32; 3],
        bilinear: bool,
    ) {
        if !self.is_valid() || !src.is_valid() {
            return;
        }
        let affine = w == [1.0; 3];
        let mut mask = shader::FLAT
            | shader::NOZBUFFER
            | shader::TEXTURE
            | shader::TEXTURE_CLAMP
            | if affine { shader::ORTHO } else { shader::PERSPECTIVE }
            | if bilinear {
                shader::TEXTURE_BILINEAR
            } else {
                shader::TEXTURE_NEAREST
            };
        mask = shader::normalize(mask, shader::ALL);

        let mut vs = [RasterVertex::default(); 3];
        for i in 0..3 {
            vs[i] = RasterVertex {
                pos: dst[i],
                w: w[i],
                color: Rgb::new(1.0, 1.0, 1.0),
                uv: uv[i],
            };
        }
        // The 2D entry point accepts either winding.
        let area = (vs[1].pos.x - vs[0].pos.x) * (vs[2].pos.y - vs[0].pos.y)
            - (vs[1].pos.y - vs[0].pos.y) * (vs[2].pos.x - vs[0].pos.x);
        if area < 0.0 {
            vs.swap(1, 2);
        }

        let u = Uniforms::<C, f32> {
            img: self.raw_view(),
            zbuf: core::ptr::null_mut(),
            zbuf_stride: 0,
            tex: src.raw_view(),
            face_color: Rgb::new(1.0, 1.0, 1.0),
            wa: 0.0,
            wb: 0.0,
            precision: Default::default(),
        };
        raster::dispatch_triangle(mask, shader::ALL, &u, &vs[0], &vs[1], &vs[2], self.bounds());
    }
}
