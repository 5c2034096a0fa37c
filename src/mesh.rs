//! Compact immutable mesh geometry.
//!
//! A mesh borrows its vertex, texture-coordinate and normal arrays and a
//! packed face stream of 16-bit codes. The stream is a sequence of chains:
//!
//! ```text
//! [chain_len n] [elem 0] [elem 1] ... [elem n+1]
//! [chain_len m] [elem 0] ... [elem m+1]
//! 0            // sentinel
//! ```
//!
//! Each element is one to three codes: a vertex code carrying a direction
//! bit in bit 15 and a 15-bit vertex index, then a texture-coordinate index
//! if the mesh has texture coordinates, then a normal index if it has
//! normals. The first three elements of a chain form its first triangle;
//! each further element continues the strip, pivoting on the newer or the
//! older edge depending on its direction bit. A single chain can therefore
//! encode fans and zig-zag strips alike.

use vek::{Rgb, Vec2, Vec3};

use crate::bbox::Box3;
use crate::color::Color;
use crate::image::Image;
use crate::math::safe_mul_b;

/// Highest vertex count addressable by the 15-bit face-stream index.
pub const MAX_VERTICES: usize = 32767;
/// Highest texture-coordinate count addressable by a face-stream code.
pub const MAX_TEXCOORDS: usize = 65535;
/// Highest normal count addressable by a face-stream code.
pub const MAX_NORMALS: usize = 65535;

/// Strip-direction bit of a vertex code.
pub const DBIT: u16 = 0x8000;

/// Phong reflectance parameters of a mesh surface.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Material {
    /// Base surface color, modulating the lit color (ignored for textured
    /// draws, where the texture supplies the base).
    pub color: Rgb<f32>,
    pub ambient_strength: f32,
    pub diffuse_strength: f32,
    pub specular_strength: f32,
    /// Specular exponent; zero or negative disables the highlight.
    pub specular_exponent: i32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            color: Rgb::new(0.75, 0.75, 0.75),
            ambient_strength: 0.15,
            diffuse_strength: 0.7,
            specular_strength: 0.3,
            specular_exponent: 16,
        }
    }
}

/// Immutable mesh geometry plus material, texture and an optional link to
/// the next mesh of a model. Links are plain references, so chains are
/// acyclic by construction and the pipeline only ever walks them forward.
pub struct Mesh<'a, C: Color> {
    /// Model-space vertex positions; at most [`MAX_VERTICES`].
    pub vertices: &'a [Vec3<f32>],
    /// Normalized texture coordinates, if any face references them.
    pub texcoords: Option<&'a [Vec2<f32>]>,
    /// Unit vertex normals, required for gouraud lighting.
    pub normals: Option<&'a [Vec3<f32>]>,
    /// Packed face stream (see the module docs).
    pub faces: &'a [u16],
    /// Texture image sampled by textured shaders.
    pub texture: Option<&'a Image<'a, C>>,
    pub material: Material,
    /// Model-space bounds, used to discard the whole mesh early.
    pub bounding_box: Box3<f32>,
    pub next: Option<&'a Mesh<'a, C>>,
}

impl<'a, C: Color> Mesh<'a, C> {
    /// A mesh over bare geometry with default material and no texture.
    pub fn new(vertices: &'a [Vec3<f32>], faces: &'a [u16]) -> Self {
        let mut bb = Box3::empty();
        for v in vertices {
            bb.expand_to(*v);
        }
        Self {
            vertices,
            texcoords: None,
            normals: None,
            faces,
            texture: None,
            material: Material::default(),
            bounding_box: bb,
            next: None,
        }
    }

    /// Iterate the triangles encoded in the face stream.
    pub fn faces(&self) -> Faces<'a> {
        Faces::new(
            self.faces,
            self.texcoords.is_some(),
            self.normals.is_some(),
        )
    }

    /// Number of triangles in the face stream.
    pub fn face_count(&self) -> usize {
        self.faces().count()
    }

    /// Whether the face stream is well-formed and every index it references
    /// is in range for this mesh's arrays.
    pub fn validate(&self) -> bool {
        if self.vertices.len() > MAX_VERTICES {
            return false;
        }
        if self.texcoords.map_or(false, |t| t.len() > MAX_TEXCOORDS) {
            return false;
        }
        if self.normals.map_or(false, |n| n.len() > MAX_NORMALS) {
            return false;
        }
        let codes_per_elem = 1 + self.texcoords.is_some() as i32 + self.normals.is_some() as i32;
        let mut pos = 0usize;
        loop {
            let header = match self.faces.get(pos) {
                Some(&h) => h,
                None => return false, // missing sentinel
            };
            pos += 1;
            if header == 0 {
                return true;
            }
            let n = header as i32;
            // Chains of n triangles carry n + 2 elements; guard the code
            // count against 32-bit overflow before multiplying.
            let elems = n + 2;
            if safe_mul_b(codes_per_elem, elems) < elems {
                return false;
            }
            let codes = (elems * codes_per_elem) as usize;
            if pos + codes > self.faces.len() {
                return false;
            }
            for e in 0..elems as usize {
                let at = pos + e * codes_per_elem as usize;
                let v = self.faces[at] & !DBIT;
                if v as usize >= self.vertices.len() {
                    return false;
                }
                let mut k = 1;
                if let Some(t) = self.texcoords {
                    if self.faces[at + k] as usize >= t.len() {
                        return false;
                    }
                    k += 1;
                }
                if let Some(nm) = self.normals {
                    if self.faces[at + k] as usize >= nm.len() {
                        return false;
                    }
                }
            }
            pos += codes;
        }
    }
}

/// One decoded triangle: per-corner vertex, texture-coordinate and normal
/// indices. Unused index kinds read as zero.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Face {
    pub v: [u16; 3],
    pub t: [u16; 3],
    pub n: [u16; 3],
}

/// Decoded element of the face stream.
#[derive(Copy, Clone, Debug, Default)]
pub(crate) struct FaceElem {
    pub v: u16,
    pub t: u16,
    pub n: u16,
    pub other_side: bool,
}

/// Iterator over the triangles of a face stream. Malformed streams
/// (truncated chains, missing sentinel) end the iteration early instead of
/// reading out of bounds.
pub struct Faces<'f> {
    codes: &'f [u16],
    pos: usize,
    has_t: bool,
    has_n: bool,
    /// Triangles still to be produced from the current chain.
    left: u16,
    cur: Face,
}

impl<'f> Faces<'f> {
    pub(crate) fn new(codes: &'f [u16], has_t: bool, has_n: bool) -> Self {
        Self {
            codes,
            pos: 0,
            has_t,
            has_n,
            left: 0,
            cur: Face {
                v: [0; 3],
                t: [0; 3],
                n: [0; 3],
            },
        }
    }

    fn read_elem(&mut self) -> Option<FaceElem> {
        let raw = *self.codes.get(self.pos)?;
        self.pos += 1;
        let mut e = FaceElem {
            v: raw & !DBIT,
            other_side: raw & DBIT != 0,
            ..FaceElem::default()
        };
        if self.has_t {
            e.t = *self.codes.get(self.pos)?;
            self.pos += 1;
        }
        if self.has_n {
            e.n = *self.codes.get(self.pos)?;
            self.pos += 1;
        }
        Some(e)
    }
}

impl<'f> Iterator for Faces<'f> {
    type Item = Face;

    fn next(&mut self) -> Option<Face> {
        if self.left == 0 {
            let header = *self.codes.get(self.pos)?;
            if header == 0 {
                return None;
            }
            self.pos += 1;
            let e0 = self.read_elem()?;
            let e1 = self.read_elem()?;
            let e2 = self.read_elem()?;
            self.cur = Face {
                v: [e0.v, e1.v, e2.v],
                t: [e0.t, e1.t, e2.t],
                n: [e0.n, e1.n, e2.n],
            };
            self.left = header - 1;
            return Some(self.cur);
        }

        let e = self.read_elem()?;
        self.left -= 1;
        self.cur = if e.other_side {
            // Pivot on the older edge: (V3, V2, V4).
            Face {
                v: [self.cur.v[2], self.cur.v[1], e.v],
                t: [self.cur.t[2], self.cur.t[1], e.t],
                n: [self.cur.n[2], self.cur.n[1], e.n],
            }
        } else {
            // Pivot on the newer edge: (V1, V3, V4).
            Face {
                v: [self.cur.v[0], self.cur.v[2], e.v],
                t: [self.cur.t[0], self.cur.t[2], e.t],
                n: [self.cur.n[0], self.cur.n[2], e.n],
            }
        };
        Some(self.cur)
    }
}

/// Owned mesh storage, for generated shapes and loaded assets. Borrow a
/// [`Mesh`] view from it to draw.
#[cfg(feature = "std")]
pub struct MeshData {
    pub vertices: Vec<Vec3<f32>>,
    pub texcoords: Vec<Vec2<f32>>,
    pub normals: Vec<Vec3<f32>>,
    pub faces: Vec<u16>,
    pub bounding_box: Box3<f32>,
}

#[cfg(feature = "std")]
impl MeshData {
    pub fn new() -> Self {
        Self {
            vertices: Vec::new(),
            texcoords: Vec::new(),
            normals: Vec::new(),
            faces: Vec::new(),
            bounding_box: Box3::empty(),
        }
    }

    /// Recompute the bounding box from the vertex array.
    pub fn update_bounds(&mut self) {
        let mut bb = Box3::empty();
        for v in &self.vertices {
            bb.expand_to(*v);
        }
        self.bounding_box = bb;
    }

    /// Borrow a drawable mesh with the given material and texture.
    pub fn mesh_with<'a, C: Color>(
        &'a self,
        texture: Option<&'a Image<'a, C>>,
        material: Material,
    ) -> Mesh<'a, C> {
        Mesh {
            vertices: &self.vertices,
            texcoords: if self.texcoords.is_empty() {
                None
            } else {
                Some(&self.texcoords)
            },
            normals: if self.normals.is_empty() {
                None
            } else {
                Some(&self.normals)
            },
            faces: &self.faces,
            texture,
            material,
            bounding_box: self.bounding_box,
            next: None,
        }
    }

    /// Borrow a drawable mesh with default material and no texture.
    pub fn mesh<C: Color>(&self) -> Mesh<'_, C> {
        self.mesh_with(None, Material::default())
    }
}

#[cfg(feature = "std")]
impl Default for MeshData {
    fn default() -> Self {
        Self::new()
    }
}
