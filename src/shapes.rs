//! Generated meshes for simple solids.

use vek::{Vec2, Vec3};

use crate::mesh::MeshData;

#[cfg(feature = "micromath")]
#[allow(unused_imports)]
use micromath_::F32Ext;

// Quad corners listed counter-clockwise as seen from outside; each face
// becomes one two-triangle chain referencing a shared corner uv set and
// its own face normal.
const CUBE_QUADS: [([usize; 4], [f32; 3]); 6] = [
    ([0, 1, 2, 3], [0.0, 0.0, 1.0]),  // front  z = +1
    ([5, 4, 7, 6], [0.0, 0.0, -1.0]), // back   z = -1
    ([1, 5, 6, 2], [1.0, 0.0, 0.0]),  // right  x = +1
    ([4, 0, 3, 7], [-1.0, 0.0, 0.0]), // left   x = -1
    ([3, 2, 6, 7], [0.0, 1.0, 0.0]),  // top    y = +1
    ([4, 5, 1, 0], [0.0, -1.0, 0.0]), // bottom y = -1
];

/// The axis-aligned cube spanning `[-1, 1]` on every axis, with per-face
/// normals and a full `[0, 1]` uv square on each face.
pub fn cube_mesh() -> MeshData {
    let mut m = MeshData::new();
    for &z in &[1.0f32, -1.0] {
        // Four corners per z face, counter-clockwise seen from +z.
        m.vertices.push(Vec3::new(-1.0, -1.0, z));
        m.vertices.push(Vec3::new(1.0, -1.0, z));
        m.vertices.push(Vec3::new(1.0, 1.0, z));
        m.vertices.push(Vec3::new(-1.0, 1.0, z));
    }
    m.texcoords = vec![
        Vec2::new(0.0, 0.0),
        Vec2::new(1.0, 0.0),
        Vec2::new(1.0, 1.0),
        Vec2::new(0.0, 1.0),
    ];
    for (face, &(quad, n)) in CUBE_QUADS.iter().enumerate() {
        m.normals.push(Vec3::from(n));
        // [len] [a] [b] [c] [d]: triangles (a, b, c) and (a, c, d).
        m.faces.push(2);
        for (corner, &v) in quad.iter().enumerate() {
            m.faces.push(v as u16);
            m.faces.push(corner as u16);
            m.faces.push(face as u16);
        }
    }
    m.faces.push(0);
    m.update_bounds();
    m
}

/// A unit uv-sphere with `stacks` latitude bands and `slices` longitude
/// bands. Normals equal positions; the uv grid covers the sphere once with
/// a duplicated seam column.
pub fn sphere_mesh(stacks: u16, slices: u16) -> MeshData {
    let stacks = stacks.max(2).min(64) as usize;
    let slices = slices.max(3).min(64) as usize;

    let mut m = MeshData::new();
    let grid = |i: usize, j: usize| (i * (slices + 1) + j) as u16;

    for i in 0..=stacks {
        let theta = core::f32::consts::PI * i as f32 / stacks as f32;
        let (st, ct) = (theta.sin(), theta.cos());
        for j in 0..=slices {
            let phi = 2.0 * core::f32::consts::PI * j as f32 / slices as f32;
            let p = Vec3::new(st * phi.cos(), ct, st * phi.sin());
            m.vertices.push(p);
            m.normals.push(p);
            m.texcoords
                .push(Vec2::new(j as f32 / slices as f32, i as f32 / stacks as f32));
        }
    }

    for i in 0..stacks {
        for j in 0..slices {
            // Outward-facing quad (a, d, c, b); pole rows contribute one
            // degenerate triangle each, which the rasterizer drops.
            let a = grid(i, j);
            let b = grid(i + 1, j);
            let c = grid(i + 1, j + 1);
            let d = grid(i, j + 1);
            m.faces.push(2);
            for &v in &[a, d, c, b] {
                m.faces.push(v);
                m.faces.push(v);
                m.faces.push(v);
            }
        }
    }
    m.faces.push(0);
    m.update_bounds();
    m
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Rgba32;
    use crate::mesh::Mesh;

    #[test]
    fn cube_stream_decodes_to_twelve_faces() {
        let data = cube_mesh();
        let mesh: Mesh<Rgba32> = data.mesh();
        assert!(mesh.validate());
        assert_eq!(mesh.face_count(), 12);
    }

    #[test]
    fn cube_faces_wind_outward() {
        let data = cube_mesh();
        let mesh: Mesh<Rgba32> = data.mesh();
        for face in mesh.faces() {
            let [a, b, c] = [
                data.vertices[face.v[0] as usize],
                data.vertices[face.v[1] as usize],
                data.vertices[face.v[2] as usize],
            ];
            let n = (b - a).cross(c - a);
            let center = (a + b + c) / 3.0;
            assert!(n.dot(center) > 0.0, "face {:?} winds inward", face.v);
        }
    }

    #[test]
    fn sphere_counts_and_outward_winding() {
        let data = sphere_mesh(8, 12);
        let mesh: Mesh<Rgba32> = data.mesh();
        assert!(mesh.validate());
        assert_eq!(mesh.face_count(), 8 * 12 * 2);
        let mut skipped = 0;
        for face in mesh.faces() {
            let [a, b, c] = [
                data.vertices[face.v[0] as usize],
                data.vertices[face.v[1] as usize],
                data.vertices[face.v[2] as usize],
            ];
            let n = (b - a).cross(c - a);
            if n.magnitude_squared() < 1e-9 {
                skipped += 1; // pole quads degenerate on one side
                continue;
            }
            let center = (a + b + c) / 3.0;
            assert!(n.dot(center) > 0.0, "face {:?} winds inward", face.v);
        }
        assert_eq!(skipped, 2 * 12);
    }

    #[test]
    fn sphere_normals_are_unit_positions() {
        let data = sphere_mesh(6, 6);
        for (v, n) in data.vertices.iter().zip(data.normals.iter()) {
            assert!((v.magnitude() - 1.0).abs() < 1e-5);
            assert_eq!(v, n);
        }
    }
}
