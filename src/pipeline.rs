//! The fixed-function 3D pipeline.
//!
//! A [`Renderer`] owns the per-frame configuration: matrices, viewport,
//! lighting, material, cull direction and the shader mask. Draw calls take
//! the target image (and optionally a depth buffer) explicitly, transform
//! each triangle to view space, cull, light, clip against the view frustum
//! and hand screen-space vertices to the rasterizer.
//!
//! The `SHADERS` const parameter is the compiled-in shader set; setters
//! and the per-triangle dispatch silently degrade requests to the nearest
//! available variant, so a build carrying only part of the kernel family
//! keeps rendering.

use vek::{Mat4, Rgb, Vec2, Vec3, Vec4};

use crate::bbox::Box2;
use crate::color::Color;
use crate::image::Image;
use crate::math::{self, Precision};
use crate::mesh::{Material, Mesh};
use crate::raster::{self, Depth, RasterVertex, Uniforms};
use crate::shader;

#[cfg(feature = "micromath")]
#[allow(unused_imports)]
use micromath_::F32Ext;

/// Which faces the pipeline discards, as seen from the camera.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CullMode {
    /// Discard faces turned away from the camera.
    Back,
    /// Discard faces turned towards the camera.
    Front,
    /// Draw both sides; lighting normals flip to face the camera.
    Disabled,
}

impl CullMode {
    #[inline]
    fn sign(self) -> f32 {
        match self {
            CullMode::Back => 1.0,
            CullMode::Front => -1.0,
            CullMode::Disabled => 0.0,
        }
    }
}

/// Texture filtering choice.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TextureFilter {
    Nearest,
    Bilinear,
}

/// Texture coordinate wrapping choice.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TextureWrap {
    /// Wrap with a bitmask; assumes power-of-two texture dimensions.
    /// Non-power-of-two textures wrap to the wrong texels (visual
    /// artifacts, not errors).
    Pow2,
    /// Clamp coordinates to the texture edges.
    Clamp,
}

/// Shading model choice.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Shading {
    /// One lit color per face.
    Flat,
    /// Per-vertex lighting interpolated across faces; needs mesh normals.
    Gouraud,
}

/// A directional light plus the three classic Phong color terms.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Light {
    /// World-space direction the light travels (from the light towards the
    /// scene).
    pub direction: Vec3<f32>,
    pub ambient: Rgb<f32>,
    pub diffuse: Rgb<f32>,
    pub specular: Rgb<f32>,
}

impl Default for Light {
    fn default() -> Self {
        Self {
            direction: Vec3::new(-1.0, -1.0, -1.0),
            ambient: Rgb::new(0.2, 0.2, 0.2),
            diffuse: Rgb::new(0.7, 0.7, 0.7),
            specular: Rgb::new(0.5, 0.5, 0.5),
        }
    }
}

const SPEC_TABLE_LEN: usize = 32;

/// A vertex in clip space with its interpolated attributes, as consumed by
/// the clipper.
#[derive(Copy, Clone, Debug)]
struct ClipVert {
    p: Vec4<f32>,
    uv: Vec2<f32>,
    color: Rgb<f32>,
}

impl ClipVert {
    #[inline]
    fn lerp(a: &ClipVert, b: &ClipVert, f: f32) -> ClipVert {
        ClipVert {
            p: a.p + (b.p - a.p) * f,
            uv: a.uv + (b.uv - a.uv) * f,
            color: a.color + (b.color - a.color) * f,
        }
    }
}

// Signed distance of a clip-space vertex to one of the clip half-spaces.
// Planes 0..4 are the recursive clipper's (left, right, bottom, top,
// near); plane 5 is the far plane, used only for rejection tests.
#[inline]
fn plane_dist(p: Vec4<f32>, plane: usize, k: f32) -> f32 {
    match plane {
        0 => k * p.w + p.x,
        1 => k * p.w - p.x,
        2 => k * p.w + p.y,
        3 => k * p.w - p.y,
        4 => p.w + p.z,
        _ => p.w - p.z,
    }
}

const CLIP_PLANES: usize = 5;

// Recursive Sutherland-Hodgman against the five clip half-spaces.
// Recursion depth is bounded by the plane count, so stack use is fixed.
fn clip_recurse<F: FnMut(&[ClipVert; 3])>(plane: usize, tri: &[ClipVert; 3], k: f32, out: &mut F) {
    if plane == CLIP_PLANES {
        out(tri);
        return;
    }
    let cp1 = plane_dist(tri[0].p, plane, k);
    let cp2 = plane_dist(tri[1].p, plane, k);
    let cp3 = plane_dist(tri[2].p, plane, k);
    let inside = [cp1 >= 0.0, cp2 >= 0.0, cp3 >= 0.0];
    let count = inside.iter().filter(|&&b| b).count();

    // Intersection of the edge i -> j at the plane.
    let cut = |i: usize, j: usize, cpi: f32, cpj: f32| {
        ClipVert::lerp(&tri[i], &tri[j], cpi / (cpi - cpj))
    };

    match count {
        3 => clip_recurse(plane + 1, tri, k, out),
        0 => {}
        1 => {
            // One corner survives; each case lists the clipped corner
            // cycle starting from a cut point, preserving the winding.
            let t = if inside[0] {
                [tri[0], cut(0, 1, cp1, cp2), cut(0, 2, cp1, cp3)]
            } else if inside[1] {
                [cut(1, 0, cp2, cp1), tri[1], cut(1, 2, cp2, cp3)]
            } else {
                [cut(2, 0, cp3, cp1), cut(2, 1, cp3, cp2), tri[2]]
            };
            clip_recurse(plane + 1, &t, k, out);
        }
        _ => {
            // Two corners survive; the clipped quad fans into two
            // triangles from its first corner.
            let quad = if !inside[0] {
                [cut(0, 1, cp1, cp2), tri[1], tri[2], cut(0, 2, cp1, cp3)]
            } else if !inside[1] {
                [tri[0], cut(1, 0, cp2, cp1), cut(1, 2, cp2, cp3), tri[2]]
            } else {
                [tri[0], tri[1], cut(2, 1, cp3, cp2), cut(2, 0, cp3, cp1)]
            };
            clip_recurse(plane + 1, &[quad[0], quad[1], quad[2]], k, out);
            clip_recurse(plane + 1, &[quad[0], quad[2], quad[3]], k, out);
        }
    }
}

/// The fixed-function renderer. `C` is the pixel format of targets and
/// textures, `D` the depth cell encoding, and `SHADERS` the compiled-in
/// shader capability set (see [`crate::shader`]).
pub struct Renderer<C: Color, D: Depth = f32, const SHADERS: u32 = { shader::ALL }> {
    proj: Mat4<f32>,
    view: Mat4<f32>,
    model: Mat4<f32>,
    viewport: Vec2<i32>,
    offset: Vec2<i32>,
    light: Light,
    material: Material,
    cull: CullMode,
    mask: u32,
    precision: Precision,

    // Derived cache, refreshed when any input it depends on changes.
    model_view: Mat4<f32>,
    light_view: Vec3<f32>,
    half_view: Vec3<f32>,
    inorm: f32,
    spec_table: [f32; SPEC_TABLE_LEN],
    spec_table_exp: i32,
    wa: f32,
    wb: f32,

    _pixel: core::marker::PhantomData<C>,
    _depth: core::marker::PhantomData<D>,
}

// Per-draw-call constants shared by every triangle of the call.
struct DrawCtx<C, D> {
    uni: Uniforms<C, D>,
    mask: u32,
    k: f32,
    ortho: bool,
    gouraud: bool,
    textured: bool,
    lx: f32,
    ly: f32,
    ox: f32,
    oy: f32,
    clip: Box2<i32>,
}

// Effective light colors for the active material.
#[derive(Copy, Clone)]
struct LightProducts {
    ambient: Rgb<f32>,
    diffuse: Rgb<f32>,
    specular: Rgb<f32>,
}

// A transformed vertex cached in the strip window.
#[derive(Copy, Clone)]
struct TransVert {
    view: Vec3<f32>,
    clip: Vec4<f32>,
    uv: Vec2<f32>,
    color: Rgb<f32>,
    key: (u16, u16, u16),
}

impl<C: Color, D: Depth, const SHADERS: u32> Renderer<C, D, SHADERS> {
    /// A renderer mapping normalized device coordinates onto an
    /// `lx` by `ly` viewport.
    pub fn new(lx: i32, ly: i32) -> Self {
        let mut r = Self {
            proj: Mat4::identity(),
            view: Mat4::identity(),
            model: Mat4::identity(),
            viewport: Vec2::new(lx.max(0), ly.max(0)),
            offset: Vec2::new(0, 0),
            light: Light::default(),
            material: Material::default(),
            cull: CullMode::Back,
            mask: shader::normalize(0, SHADERS),
            precision: Precision::default(),
            model_view: Mat4::identity(),
            light_view: Vec3::new(0.0, 0.0, 1.0),
            half_view: Vec3::new(0.0, 0.0, 1.0),
            inorm: 1.0,
            spec_table: [0.0; SPEC_TABLE_LEN],
            spec_table_exp: i32::MIN,
            wa: 0.0,
            wb: 0.0,
            _pixel: core::marker::PhantomData,
            _depth: core::marker::PhantomData,
        };
        r.update_transforms();
        r
    }

    // -- configuration ------------------------------------------------------

    pub fn set_viewport(&mut self, lx: i32, ly: i32) {
        self.viewport = Vec2::new(lx.max(0), ly.max(0));
    }

    /// Offset of the target image inside a larger logical viewport, for
    /// rendering tiles of a virtual screen.
    pub fn set_viewport_offset(&mut self, ox: i32, oy: i32) {
        self.offset = Vec2::new(ox, oy);
    }

    /// Install a perspective projection matrix. The Y row is negated on
    /// load so downstream math works in y-down image coordinates;
    /// [`Renderer::projection`] undoes the negation.
    pub fn set_projection(&mut self, m: Mat4<f32>) {
        self.proj = negate_y(m);
        self.set_mask_bit(shader::PERSPECTIVE, shader::ORTHO);
        self.update_depth_remap();
    }

    /// Install an orthographic projection matrix (Y negated on load, as
    /// with [`Renderer::set_projection`]) and switch the shader family.
    pub fn set_projection_ortho(&mut self, m: Mat4<f32>) {
        self.proj = negate_y(m);
        self.set_mask_bit(shader::ORTHO, shader::PERSPECTIVE);
        self.update_depth_remap();
    }

    /// The projection matrix as the caller supplied it.
    pub fn projection(&self) -> Mat4<f32> {
        negate_y(self.proj)
    }

    /// Perspective projection from a vertical field of view (radians).
    pub fn set_perspective(&mut self, fov_y: f32, aspect: f32, near: f32, far: f32) {
        let f = 1.0 / (fov_y * 0.5).tan();
        let nf = 1.0 / (near - far);
        self.set_projection(Mat4::from_col_array([
            f / aspect,
            0.0,
            0.0,
            0.0,
            0.0,
            f,
            0.0,
            0.0,
            0.0,
            0.0,
            (far + near) * nf,
            -1.0,
            0.0,
            0.0,
            2.0 * far * near * nf,
            0.0,
        ]));
    }

    /// Perspective projection from frustum extents at the near plane.
    pub fn set_frustum(&mut self, l: f32, r: f32, b: f32, t: f32, near: f32, far: f32) {
        let nf = 1.0 / (near - far);
        self.set_projection(Mat4::from_col_array([
            2.0 * near / (r - l),
            0.0,
            0.0,
            0.0,
            0.0,
            2.0 * near / (t - b),
            0.0,
            0.0,
            (r + l) / (r - l),
            (t + b) / (t - b),
            (far + near) * nf,
            -1.0,
            0.0,
            0.0,
            2.0 * far * near * nf,
            0.0,
        ]));
    }

    /// Orthographic projection over the given view volume.
    pub fn set_ortho(&mut self, l: f32, r: f32, b: f32, t: f32, near: f32, far: f32) {
        let nf = 1.0 / (near - far);
        self.set_projection_ortho(Mat4::from_col_array([
            2.0 / (r - l),
            0.0,
            0.0,
            0.0,
            0.0,
            2.0 / (t - b),
            0.0,
            0.0,
            0.0,
            0.0,
            2.0 * nf,
            0.0,
            -(r + l) / (r - l),
            -(t + b) / (t - b),
            (far + near) * nf,
            1.0,
        ]));
    }

    pub fn set_view(&mut self, m: Mat4<f32>) {
        self.view = m;
        self.update_transforms();
    }

    /// Build the view matrix from an eye position, target and up vector.
    pub fn look_at(&mut self, eye: Vec3<f32>, target: Vec3<f32>, up: Vec3<f32>) {
        let f = (target - eye).normalized();
        let s = f.cross(up).normalized();
        let u = s.cross(f);
        self.set_view(Mat4::from_col_array([
            s.x,
            u.x,
            -f.x,
            0.0,
            s.y,
            u.y,
            -f.y,
            0.0,
            s.z,
            u.z,
            -f.z,
            0.0,
            -s.dot(eye),
            -u.dot(eye),
            f.dot(eye),
            1.0,
        ]));
    }

    pub fn set_model(&mut self, m: Mat4<f32>) {
        self.model = m;
        self.update_transforms();
    }

    pub fn set_light(&mut self, light: Light) {
        self.light = light;
        self.update_transforms();
    }

    pub fn set_light_direction(&mut self, dir: Vec3<f32>) {
        self.light.direction = dir;
        self.update_transforms();
    }

    /// Material used by the immediate-mode draws and by meshes drawn with
    /// `use_mesh_material == false`.
    pub fn set_material(&mut self, material: Material) {
        self.material = material;
    }

    pub fn set_culling(&mut self, cull: CullMode) {
        self.cull = cull;
    }

    pub fn set_shading(&mut self, shading: Shading) {
        match shading {
            Shading::Flat => self.set_mask_bit(shader::FLAT, shader::GOURAUD),
            Shading::Gouraud => self.set_mask_bit(shader::GOURAUD, shader::FLAT),
        }
    }

    /// Enable or disable depth testing. Draw calls still need a depth
    /// buffer argument for the test to happen.
    pub fn set_depth_testing(&mut self, on: bool) {
        if on {
            self.set_mask_bit(shader::ZBUFFER, shader::NOZBUFFER);
        } else {
            self.set_mask_bit(shader::NOZBUFFER, shader::ZBUFFER);
        }
    }

    pub fn set_texturing(&mut self, on: bool) {
        if on {
            self.set_mask_bit(shader::TEXTURE, shader::NOTEXTURE);
        } else {
            self.set_mask_bit(shader::NOTEXTURE, shader::TEXTURE);
        }
    }

    pub fn set_texture_filter(&mut self, filter: TextureFilter) {
        match filter {
            TextureFilter::Nearest => {
                self.set_mask_bit(shader::TEXTURE_NEAREST, shader::TEXTURE_BILINEAR)
            }
            TextureFilter::Bilinear => {
                self.set_mask_bit(shader::TEXTURE_BILINEAR, shader::TEXTURE_NEAREST)
            }
        }
    }

    pub fn set_texture_wrap(&mut self, wrap: TextureWrap) {
        match wrap {
            TextureWrap::Pow2 => {
                self.set_mask_bit(shader::TEXTURE_WRAP_POW2, shader::TEXTURE_CLAMP)
            }
            TextureWrap::Clamp => {
                self.set_mask_bit(shader::TEXTURE_CLAMP, shader::TEXTURE_WRAP_POW2)
            }
        }
    }

    pub fn set_precision(&mut self, precision: Precision) {
        self.precision = precision;
    }

    /// The current (always consistent) shader mask.
    pub fn mask(&self) -> u32 {
        self.mask
    }

    fn set_mask_bit(&mut self, set: u32, clear: u32) {
        self.mask = shader::normalize((self.mask & !clear) | set, SHADERS);
    }

    /// Reset a depth buffer to "no sample yet". Call once per frame before
    /// z-buffered drawing.
    pub fn clear_depth(depth: &mut [D]) {
        for cell in depth.iter_mut() {
            *cell = D::EMPTY;
        }
    }

    // -- derived state ------------------------------------------------------

    fn update_transforms(&mut self) {
        self.model_view = self.view * self.model;
        let lv = Vec3::from(self.view * Vec4::from_direction(self.light.direction));
        self.light_view = if lv.magnitude_squared() > 1e-12 {
            (-lv).normalized()
        } else {
            Vec3::new(0.0, 0.0, 1.0)
        };
        // Blinn half vector with the eye direction fixed at +z in view
        // space.
        let h = self.light_view + Vec3::new(0.0, 0.0, 1.0);
        self.half_view = if h.magnitude_squared() > 1e-12 {
            h.normalized()
        } else {
            Vec3::new(0.0, 0.0, 1.0)
        };
        // Normal rescale factor, valid while the model-view matrix is an
        // isotropic similarity.
        let nz = Vec3::from(self.model_view * Vec4::from_direction(Vec3::new(0.0, 0.0, 1.0)));
        let m2 = nz.magnitude_squared();
        self.inorm = if m2 > 1e-12 {
            math::rsqrt(m2, self.precision)
        } else {
            1.0
        };
    }

    fn update_depth_remap(&mut self) {
        let m = self.proj.into_col_array();
        self.wa = -32768.0 * m[14];
        self.wb = 32768.0 * (m[10] + 1.0);
    }

    fn ensure_spec_table(&mut self, exponent: i32) {
        if exponent == self.spec_table_exp {
            return;
        }
        self.spec_table_exp = exponent;
        for i in 0..SPEC_TABLE_LEN {
            let v = 1.0 - i as f32 / SPEC_TABLE_LEN as f32;
            self.spec_table[i] = if exponent > 0 {
                v.powf(exponent as f32)
            } else {
                0.0
            };
        }
    }

    #[inline]
    fn spec_lookup(&self, v: f32) -> f32 {
        let idx = ((1.0 - v.max(0.0).min(1.0)) * SPEC_TABLE_LEN as f32) as usize;
        self.spec_table[idx.min(SPEC_TABLE_LEN - 1)]
    }

    #[inline]
    fn light_products(&self, material: &Material) -> LightProducts {
        LightProducts {
            ambient: self.light.ambient * material.ambient_strength,
            diffuse: self.light.diffuse * material.diffuse_strength,
            specular: self.light.specular * material.specular_strength,
        }
    }

    // Phong color for a unit view-space normal. Textured fragments keep
    // the lit color unmultiplied; the texture supplies the base.
    fn lit_color(
        &self,
        products: &LightProducts,
        base: Rgb<f32>,
        n: Vec3<f32>,
        textured: bool,
    ) -> Rgb<f32> {
        let dt = n.dot(self.light_view).max(0.0);
        let st = if self.spec_table_exp > 0 {
            self.spec_lookup(n.dot(self.half_view).max(0.0))
        } else {
            0.0
        };
        let c = products.ambient + products.diffuse * dt + products.specular * st;
        let c = Rgb::new(
            c.r.max(0.0).min(1.0),
            c.g.max(0.0).min(1.0),
            c.b.max(0.0).min(1.0),
        );
        if textured {
            c
        } else {
            c * base
        }
    }

    // -- drawing ------------------------------------------------------------

    fn begin_draw(
        &self,
        target: &mut Image<C>,
        depth: Option<&mut [D]>,
        texture: Option<&Image<C>>,
        has_normals: bool,
        has_texcoords: bool,
    ) -> Option<DrawCtx<C, D>> {
        if !target.is_valid() || self.viewport.x <= 0 || self.viewport.y <= 0 {
            return None;
        }
        let mut mask = self.mask;

        let cells = target.lx() as usize * target.ly() as usize;
        let zbuf = match depth {
            Some(buf) if shader::has(mask, shader::ZBUFFER) && buf.len() >= cells => {
                buf.as_mut_ptr()
            }
            _ => {
                mask = (mask & !shader::ZBUFFER) | shader::NOZBUFFER;
                core::ptr::null_mut()
            }
        };

        let textured = shader::has(mask, shader::TEXTURE)
            && has_texcoords
            && texture.map_or(false, |t| t.is_valid());
        if !textured {
            mask = (mask & !shader::TEXTURE) | shader::NOTEXTURE;
        }
        let gouraud = shader::has(mask, shader::GOURAUD) && has_normals;
        if !gouraud {
            mask = (mask & !shader::GOURAUD) | shader::FLAT;
        }
        let mask = shader::normalize(mask, SHADERS);

        let tex = texture.map(|t| t.raw_view()).unwrap_or(crate::image::RawView {
            data: core::ptr::null_mut(),
            lx: 0,
            ly: 0,
            stride: 0,
        });

        let vmax = self.viewport.x.max(self.viewport.y) as f32;
        Some(DrawCtx {
            uni: Uniforms {
                img: target.raw_view(),
                zbuf,
                zbuf_stride: target.lx(),
                tex,
                face_color: Rgb::new(1.0, 1.0, 1.0),
                wa: self.wa,
                wb: self.wb,
                precision: self.precision,
            },
            mask,
            k: 1.0 + 1.0 / vmax,
            ortho: shader::has(mask, shader::ORTHO),
            gouraud: shader::has(mask, shader::GOURAUD),
            textured: shader::has(mask, shader::TEXTURE),
            lx: self.viewport.x as f32,
            ly: self.viewport.y as f32,
            ox: self.offset.x as f32,
            oy: self.offset.y as f32,
            clip: target.bounds(),
        })
    }

    #[inline]
    fn to_raster(&self, ctx: &DrawCtx<C, D>, v: &ClipVert) -> RasterVertex {
        let (nx, ny, w) = if ctx.ortho {
            (v.p.x, v.p.y, 1.0 - v.p.z)
        } else {
            let iw = 1.0 / v.p.w;
            (v.p.x * iw, v.p.y * iw, iw)
        };
        RasterVertex {
            pos: Vec2::new(
                (nx + 1.0) * ctx.lx * 0.5 - ctx.ox,
                (ny + 1.0) * ctx.ly * 0.5 - ctx.oy,
            ),
            w,
            color: v.color,
            uv: v.uv,
        }
    }

    fn emit(&self, ctx: &DrawCtx<C, D>, tri: &[ClipVert; 3]) {
        let v1 = self.to_raster(ctx, &tri[0]);
        let mut v2 = self.to_raster(ctx, &tri[1]);
        let mut v3 = self.to_raster(ctx, &tri[2]);
        // Culling already happened in view space; here the winding is
        // normalized for the rasterizer's orientation contract, since the
        // projection (and its y flip) may mirror the triangle.
        let area = (v2.pos.x - v1.pos.x) * (v3.pos.y - v1.pos.y)
            - (v2.pos.y - v1.pos.y) * (v3.pos.x - v1.pos.x);
        if area < 0.0 {
            core::mem::swap(&mut v2, &mut v3);
        }
        raster::dispatch_triangle(ctx.mask, SHADERS, &ctx.uni, &v1, &v2, &v3, ctx.clip);
    }

    // Cull, light, clip and rasterize one triangle given its transformed
    // vertices.
    fn render_triangle(
        &self,
        ctx: &mut DrawCtx<C, D>,
        products: &LightProducts,
        base_color: Rgb<f32>,
        tv: [&TransVert; 3],
    ) {
        let mut n_face = (tv[1].view - tv[0].view).cross(tv[2].view - tv[0].view);
        // View direction towards the face: the vertex position under
        // perspective (eye at the view-space origin), the fixed view axis
        // under ortho. Negative means the normal faces the camera.
        let cu = if ctx.ortho {
            -n_face.z
        } else {
            n_face.dot(tv[0].view)
        };
        let sign = self.cull.sign();
        if sign != 0.0 {
            if cu * sign > 0.0 {
                return;
            }
            if sign < 0.0 {
                // Drawing the far side; light the side the camera sees.
                n_face = -n_face;
            }
        } else if cu > 0.0 {
            n_face = -n_face;
        }
        let order = [tv[0], tv[1], tv[2]];

        let face_color = if ctx.gouraud {
            Rgb::new(1.0, 1.0, 1.0)
        } else {
            let m2 = n_face.magnitude_squared();
            if m2 > 1e-20 {
                let n = n_face * math::rsqrt(m2, self.precision);
                self.lit_color(products, base_color, n, ctx.textured)
            } else {
                return;
            }
        };
        ctx.uni.face_color = face_color;

        let tri = [
            ClipVert {
                p: order[0].clip,
                uv: order[0].uv,
                color: order[0].color,
            },
            ClipVert {
                p: order[1].clip,
                uv: order[1].uv,
                color: order[1].color,
            },
            ClipVert {
                p: order[2].clip,
                uv: order[2].uv,
                color: order[2].color,
            },
        ];

        // Fast accept: every vertex strictly inside the guard-banded
        // frustum goes straight to the rasterizer.
        let inside = |p: Vec4<f32>| {
            (ctx.ortho || p.w > 0.0) && (0..6).all(|pl| plane_dist(p, pl, ctx.k) >= 0.0)
        };
        if tri.iter().all(|v| inside(v.p)) {
            self.emit(ctx, &tri);
            return;
        }

        // Cheap reject: one plane separating all three vertices.
        for pl in 0..6 {
            if tri.iter().all(|v| plane_dist(v.p, pl, ctx.k) < 0.0) {
                return;
            }
        }

        // Clipped output rasterizes as it is produced; no buffering, and
        // the recursion depth is bounded by the plane count.
        let ctx = &*ctx;
        let mut sink = |t: &[ClipVert; 3]| self.emit(ctx, t);
        clip_recurse(0, &tri, ctx.k, &mut sink);
    }

    #[allow(clippy::too_many_arguments)]
    fn transform_vertex(
        &self,
        ctx: &DrawCtx<C, D>,
        products: &LightProducts,
        base: Rgb<f32>,
        pv: &Mat4<f32>,
        pos: Vec3<f32>,
        uv: Vec2<f32>,
        normal: Option<Vec3<f32>>,
        key: (u16, u16, u16),
    ) -> TransVert {
        let view = Vec3::from(self.model_view * Vec4::from_point(pos));
        let clip = *pv * Vec4::from_point(pos);
        let color = match normal {
            Some(n) if ctx.gouraud => {
                let nv = Vec3::from(self.model_view * Vec4::from_direction(n)) * self.inorm;
                self.lit_color(products, base, nv, ctx.textured)
            }
            _ => Rgb::new(1.0, 1.0, 1.0),
        };
        TransVert {
            view,
            clip,
            uv,
            color,
            key,
        }
    }

    /// Draw a mesh (and the meshes linked behind it).
    ///
    /// With `use_mesh_material` each link is lit with its own material;
    /// otherwise the renderer's material applies throughout. Invalid links
    /// (out-of-range indices, malformed face streams) are skipped.
    pub fn draw_mesh(
        &mut self,
        target: &mut Image<C>,
        depth: Option<&mut [D]>,
        mesh: &Mesh<C>,
        use_mesh_material: bool,
    ) {
        let mut depth = depth;
        let mut link = Some(mesh);
        while let Some(m) = link {
            self.draw_mesh_link(target, depth.as_deref_mut(), m, use_mesh_material);
            link = m.next;
        }
    }

    fn draw_mesh_link(
        &mut self,
        target: &mut Image<C>,
        depth: Option<&mut [D]>,
        mesh: &Mesh<C>,
        use_mesh_material: bool,
    ) {
        if mesh.bounding_box.is_empty() || !mesh.validate() {
            return;
        }
        let material = if use_mesh_material {
            mesh.material
        } else {
            self.material
        };
        self.ensure_spec_table(material.specular_exponent);
        let products = self.light_products(&material);

        let mut ctx = match self.begin_draw(
            target,
            depth,
            mesh.texture,
            mesh.normals.is_some(),
            mesh.texcoords.is_some(),
        ) {
            Some(ctx) => ctx,
            None => return,
        };

        let pv = self.proj * self.model_view;

        // Whole-mesh rejection: the model-space bounds, taken to clip
        // space, lying fully outside one frustum plane.
        let corners = mesh.bounding_box.corners();
        for pl in 0..6 {
            let mut all_out = true;
            for c in corners.iter() {
                if plane_dist(pv * Vec4::from_point(*c), pl, ctx.k) >= 0.0 {
                    all_out = false;
                    break;
                }
            }
            if all_out {
                return;
            }
        }

        // Three-slot window over the strip: a continued chain only
        // transforms the vertex its new element introduces.
        let mut window: [Option<TransVert>; 3] = [None, None, None];
        let fetch = |this: &Self,
                     ctx: &DrawCtx<C, D>,
                     window: &mut [Option<TransVert>; 3],
                     mesh: &Mesh<C>,
                     key: (u16, u16, u16)|
         -> TransVert {
            for slot in window.iter() {
                if let Some(tv) = slot {
                    if tv.key == key {
                        return *tv;
                    }
                }
            }
            let pos = mesh.vertices[key.0 as usize];
            let uv = mesh
                .texcoords
                .map(|t| t[key.1 as usize])
                .unwrap_or(Vec2::new(0.0, 0.0));
            let normal = mesh.normals.map(|n| n[key.2 as usize]);
            let tv =
                this.transform_vertex(ctx, &products, material.color, &pv, pos, uv, normal, key);
            // Rotate the oldest slot out.
            window.rotate_left(1);
            window[2] = Some(tv);
            tv
        };

        for face in mesh.faces() {
            let k0 = (face.v[0], face.t[0], face.n[0]);
            let k1 = (face.v[1], face.t[1], face.n[1]);
            let k2 = (face.v[2], face.t[2], face.n[2]);
            let a = fetch(self, &ctx, &mut window, mesh, k0);
            let b = fetch(self, &ctx, &mut window, mesh, k1);
            let c = fetch(self, &ctx, &mut window, mesh, k2);
            self.render_triangle(&mut ctx, &products, material.color, [&a, &b, &c]);
        }
    }

    /// Draw an indexed triangle list without a mesh: `indices` holds
    /// vertex indices in groups of three. Normals and texture coordinates
    /// are parallel to `vertices` when present.
    pub fn draw_triangles(
        &mut self,
        target: &mut Image<C>,
        depth: Option<&mut [D]>,
        vertices: &[Vec3<f32>],
        indices: &[u16],
        normals: Option<&[Vec3<f32>]>,
        texcoords: Option<&[Vec2<f32>]>,
        texture: Option<&Image<C>>,
    ) {
        let in_range = indices.iter().all(|&i| (i as usize) < vertices.len())
            && normals.map_or(true, |n| n.len() >= vertices.len())
            && texcoords.map_or(true, |t| t.len() >= vertices.len());
        if !in_range {
            return;
        }
        let material = self.material;
        self.ensure_spec_table(material.specular_exponent);
        let products = self.light_products(&material);
        let mut ctx = match self.begin_draw(
            target,
            depth,
            texture,
            normals.is_some(),
            texcoords.is_some(),
        ) {
            Some(ctx) => ctx,
            None => return,
        };
        let pv = self.proj * self.model_view;

        for tri in indices.chunks_exact(3) {
            let make = |i: u16| {
                let uv = texcoords
                    .map(|t| t[i as usize])
                    .unwrap_or(Vec2::new(0.0, 0.0));
                let n = normals.map(|n| n[i as usize]);
                self.transform_vertex(
                    &ctx,
                    &products,
                    material.color,
                    &pv,
                    vertices[i as usize],
                    uv,
                    n,
                    (i, i, i),
                )
            };
            let (a, b, c) = (make(tri[0]), make(tri[1]), make(tri[2]));
            self.render_triangle(&mut ctx, &products, material.color, [&a, &b, &c]);
        }
    }

    /// Draw one triangle given directly in model space.
    pub fn draw_triangle(
        &mut self,
        target: &mut Image<C>,
        depth: Option<&mut [D]>,
        p1: Vec3<f32>,
        p2: Vec3<f32>,
        p3: Vec3<f32>,
    ) {
        self.draw_triangles(target, depth, &[p1, p2, p3], &[0, 1, 2], None, None, None);
    }

    // -- wireframe and dots -------------------------------------------------

    /// Draw the edges of every face of `mesh` (links included) as lines.
    pub fn draw_wireframe_mesh(&mut self, target: &mut Image<C>, mesh: &Mesh<C>, color: C) {
        let mut link = Some(mesh);
        while let Some(m) = link {
            if m.validate() {
                let pv = self.proj * self.model_view;
                for face in m.faces() {
                    let p = [
                        m.vertices[face.v[0] as usize],
                        m.vertices[face.v[1] as usize],
                        m.vertices[face.v[2] as usize],
                    ];
                    self.wire_segment(target, &pv, p[0], p[1], color);
                    self.wire_segment(target, &pv, p[1], p[2], color);
                    self.wire_segment(target, &pv, p[2], p[0], color);
                }
            }
            link = m.next;
        }
    }

    /// Draw a single model-space segment as a clipped 2D line.
    pub fn draw_wireframe_line(
        &mut self,
        target: &mut Image<C>,
        p0: Vec3<f32>,
        p1: Vec3<f32>,
        color: C,
    ) {
        let pv = self.proj * self.model_view;
        self.wire_segment(target, &pv, p0, p1, color);
    }

    fn wire_segment(
        &self,
        target: &mut Image<C>,
        pv: &Mat4<f32>,
        p0: Vec3<f32>,
        p1: Vec3<f32>,
        color: C,
    ) {
        if !target.is_valid() || self.viewport.x <= 0 || self.viewport.y <= 0 {
            return;
        }
        let ortho = shader::has(self.mask, shader::ORTHO);
        let a = *pv * Vec4::from_point(p0);
        let b = *pv * Vec4::from_point(p1);
        let k = 1.0 + 1.0 / self.viewport.x.max(self.viewport.y) as f32;

        // Parametric clip of the segment against the frustum (plus the
        // w > 0 half-space under perspective).
        let mut t0 = 0.0f32;
        let mut t1 = 1.0f32;
        let mut clip_plane = |d0: f32, d1: f32| -> bool {
            if d0 < 0.0 && d1 < 0.0 {
                return false;
            }
            if d0 < 0.0 {
                t0 = t0.max(d0 / (d0 - d1));
            } else if d1 < 0.0 {
                t1 = t1.min(d0 / (d0 - d1));
            }
            true
        };
        if !ortho && !clip_plane(a.w - 1e-6, b.w - 1e-6) {
            return;
        }
        for pl in 0..6 {
            if !clip_plane(plane_dist(a, pl, k), plane_dist(b, pl, k)) {
                return;
            }
        }
        if t0 > t1 {
            return;
        }

        let map = |p: Vec4<f32>| -> Vec2<i32> {
            let (nx, ny) = if ortho {
                (p.x, p.y)
            } else {
                (p.x / p.w, p.y / p.w)
            };
            Vec2::new(
                ((nx + 1.0) * self.viewport.x as f32 * 0.5 - self.offset.x as f32) as i32,
                ((ny + 1.0) * self.viewport.y as f32 * 0.5 - self.offset.y as f32) as i32,
            )
        };
        let at = |t: f32| a + (b - a) * t;
        let q0 = map(at(t0));
        let q1 = map(at(t1));
        target.draw_line(q0, q1, color);
    }

    /// Project a model-space point and paint a filled square dot of the
    /// given radius around it.
    pub fn draw_dot(&mut self, target: &mut Image<C>, p: Vec3<f32>, radius: i32, color: C) {
        if !target.is_valid() || self.viewport.x <= 0 || self.viewport.y <= 0 {
            return;
        }
        let ortho = shader::has(self.mask, shader::ORTHO);
        let q = self.proj * self.model_view * Vec4::from_point(p);
        if !ortho && q.w <= 0.0 {
            return;
        }
        let k = 1.0 + 1.0 / self.viewport.x.max(self.viewport.y) as f32;
        for pl in 0..6 {
            if plane_dist(q, pl, k) < 0.0 {
                return;
            }
        }
        let (nx, ny) = if ortho {
            (q.x, q.y)
        } else {
            (q.x / q.w, q.y / q.w)
        };
        let x = ((nx + 1.0) * self.viewport.x as f32 * 0.5 - self.offset.x as f32) as i32;
        let y = ((ny + 1.0) * self.viewport.y as f32 * 0.5 - self.offset.y as f32) as i32;
        if radius <= 0 {
            target.draw_pixel(x, y, color);
        } else {
            target.fill_rect(
                Box2::new(x - radius, x + radius, y - radius, y + radius),
                color,
            );
        }
    }

    /// Project a model-space point and paint one pixel.
    pub fn draw_point(&mut self, target: &mut Image<C>, p: Vec3<f32>, color: C) {
        self.draw_dot(target, p, 0, color);
    }
}

fn negate_y(m: Mat4<f32>) -> Mat4<f32> {
    let mut a = m.into_col_array();
    a[1] = -a[1];
    a[5] = -a[5];
    a[9] = -a[9];
    a[13] = -a[13];
    Mat4::from_col_array(a)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Rgba32;

    fn cv(x: f32, y: f32, z: f32, w: f32) -> ClipVert {
        ClipVert {
            p: Vec4::new(x, y, z, w),
            uv: Vec2::new(0.0, 0.0),
            color: Rgb::new(1.0, 1.0, 1.0),
        }
    }

    fn clip_all(tri: [ClipVert; 3], k: f32) -> Vec<[ClipVert; 3]> {
        let mut out = Vec::new();
        let mut sink = |t: &[ClipVert; 3]| out.push(*t);
        clip_recurse(0, &tri, k, &mut sink);
        out
    }

    fn ndc_area(t: &[ClipVert; 3]) -> f32 {
        let d = |v: &ClipVert| (v.p.x / v.p.w, v.p.y / v.p.w);
        let (x1, y1) = d(&t[0]);
        let (x2, y2) = d(&t[1]);
        let (x3, y3) = d(&t[2]);
        (x2 - x1) * (y3 - y1) - (y2 - y1) * (x3 - x1)
    }

    #[test]
    fn fully_inside_triangle_passes_through_unchanged() {
        let tri = [
            cv(-0.5, -0.5, 0.0, 1.0),
            cv(0.5, -0.5, 0.0, 1.0),
            cv(-0.5, 0.5, 0.0, 1.0),
        ];
        let out = clip_all(tri, 1.0);
        assert_eq!(out.len(), 1);
        for i in 0..3 {
            assert_eq!(out[0][i].p, tri[i].p);
        }
    }

    #[test]
    fn one_vertex_outside_yields_two_triangles() {
        let tri = [
            cv(-3.0, 0.0, 0.0, 1.0), // outside the left plane
            cv(0.5, -0.5, 0.0, 1.0),
            cv(0.5, 0.5, 0.0, 1.0),
        ];
        let out = clip_all(tri, 1.0);
        assert_eq!(out.len(), 2);
        for t in &out {
            for v in t.iter() {
                assert!(v.p.x >= -1.0 - 1e-4, "clipped x {}", v.p.x);
            }
        }
    }

    #[test]
    fn two_vertices_outside_yield_one_triangle() {
        let tri = [
            cv(-3.0, -0.5, 0.0, 1.0),
            cv(-3.0, 0.5, 0.0, 1.0),
            cv(0.5, 0.0, 0.0, 1.0),
        ];
        let out = clip_all(tri, 1.0);
        assert_eq!(out.len(), 1);
        for v in out[0].iter() {
            assert!(v.p.x >= -1.0 - 1e-4);
        }
    }

    #[test]
    fn fully_outside_triangle_vanishes() {
        let tri = [
            cv(-3.0, 0.0, 0.0, 1.0),
            cv(-4.0, 1.0, 0.0, 1.0),
            cv(-3.5, -1.0, 0.0, 1.0),
        ];
        assert!(clip_all(tri, 1.0).is_empty());
    }

    #[test]
    fn clipping_preserves_winding() {
        let tri = [
            cv(-3.0, -0.8, 0.0, 1.0),
            cv(0.9, -0.9, 0.0, 1.0),
            cv(0.2, 2.5, 0.0, 1.0),
        ];
        assert!(ndc_area(&tri) > 0.0);
        for t in clip_all(tri, 1.0) {
            // Slivers may collapse to zero area; only a clearly negative
            // area means the winding flipped.
            assert!(ndc_area(&t) > -1e-4, "winding flipped: {}", ndc_area(&t));
        }
    }

    #[test]
    fn near_plane_clip_interpolates_w() {
        // One vertex behind the eye; the clipped triangles must all have
        // positive w.
        let tri = [
            cv(0.0, 0.0, -0.2, -0.1),
            cv(0.5, -0.5, 0.0, 1.0),
            cv(0.5, 0.5, 0.0, 1.0),
        ];
        let out = clip_all(tri, 1.0);
        assert!(!out.is_empty());
        for t in &out {
            for v in t.iter() {
                assert!(v.p.w > 0.0, "w {} not clipped away", v.p.w);
            }
        }
    }

    #[test]
    fn specular_table_tracks_exponent() {
        let mut r = Renderer::<Rgba32>::new(8, 8);
        r.ensure_spec_table(1);
        // Exponent one reproduces the ramp itself.
        for i in 0..SPEC_TABLE_LEN {
            let v = 1.0 - i as f32 / SPEC_TABLE_LEN as f32;
            assert!((r.spec_table[i] - v).abs() < 1e-6);
        }
        r.ensure_spec_table(8);
        // Higher exponents tighten the highlight.
        assert!(r.spec_table[1] < 0.8);
        assert!(r.spec_table[0] > 0.99);
        for i in 1..SPEC_TABLE_LEN {
            assert!(r.spec_table[i] <= r.spec_table[i - 1]);
        }
        // Disabled exponent zeroes the table.
        r.ensure_spec_table(0);
        assert!(r.spec_table.iter().all(|&v| v == 0.0));
    }
}
