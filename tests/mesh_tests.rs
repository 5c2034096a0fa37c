//! Face-stream decoding and mesh validation.

use tgx::vek::Vec3;
use tgx::{Face, Mesh, Rgba32};

fn verts(n: usize) -> Vec<Vec3<f32>> {
    (0..n).map(|i| Vec3::new(i as f32, 0.0, 0.0)).collect()
}

fn vset(face: &Face) -> [u16; 3] {
    face.v
}

const D: u16 = 0x8000;

mod decoding {
    use super::*;

    #[test]
    fn single_triangle_chain() {
        let vs = verts(3);
        let faces = [1, 0, 1, 2, 0];
        let mesh: Mesh<Rgba32> = Mesh::new(&vs, &faces);
        assert!(mesh.validate());
        let got: Vec<[u16; 3]> = mesh.faces().map(|f| vset(&f)).collect();
        assert_eq!(got, vec![[0, 1, 2]]);
    }

    #[test]
    fn fan_pivots_on_the_first_vertex() {
        // Four triangles around vertex 0, all with the direction bit
        // clear: each new element replaces the middle of (V1, V3, V4).
        let vs = verts(6);
        let faces = [4, 0, 1, 2, 3, 4, 5, 0];
        let mesh: Mesh<Rgba32> = Mesh::new(&vs, &faces);
        assert!(mesh.validate());
        let got: Vec<[u16; 3]> = mesh.faces().map(|f| vset(&f)).collect();
        assert_eq!(
            got,
            vec![[0, 1, 2], [0, 2, 3], [0, 3, 4], [0, 4, 5]]
        );
    }

    #[test]
    fn zigzag_strip_alternates_directions() {
        // t0 b0 t1, then b1 on the other side, t2 on the near side again.
        let vs = verts(6);
        let faces = [3, 0, 1, 2, 3 | D, 4, 0];
        let mesh: Mesh<Rgba32> = Mesh::new(&vs, &faces);
        assert!(mesh.validate());
        let got: Vec<[u16; 3]> = mesh.faces().map(|f| vset(&f)).collect();
        // (0,1,2) then other-side (2,1,3) then (2,3,4).
        assert_eq!(got, vec![[0, 1, 2], [2, 1, 3], [2, 3, 4]]);
    }

    #[test]
    fn several_chains_concatenate() {
        let vs = verts(7);
        let faces = [1, 0, 1, 2, 2, 3, 4, 5, 6, 0];
        let mesh: Mesh<Rgba32> = Mesh::new(&vs, &faces);
        assert!(mesh.validate());
        let got: Vec<[u16; 3]> = mesh.faces().map(|f| vset(&f)).collect();
        assert_eq!(got, vec![[0, 1, 2], [3, 4, 5], [3, 5, 6]]);
        assert_eq!(mesh.face_count(), 3);
    }

    #[test]
    fn empty_stream_yields_nothing() {
        let vs = verts(3);
        let faces = [0];
        let mesh: Mesh<Rgba32> = Mesh::new(&vs, &faces);
        assert!(mesh.validate());
        assert_eq!(mesh.face_count(), 0);
    }

    #[test]
    fn texcoord_and_normal_codes_travel_with_their_vertex() {
        let vs = verts(4);
        let ts = [
            tgx::vek::Vec2::new(0.0f32, 0.0),
            tgx::vek::Vec2::new(1.0, 0.0),
            tgx::vek::Vec2::new(1.0, 1.0),
            tgx::vek::Vec2::new(0.0, 1.0),
        ];
        let ns = [Vec3::new(0.0f32, 0.0, 1.0)];
        // Two triangles of a quad; elements are (vertex, texcoord, normal).
        let faces = [2, 0, 0, 0, 1, 1, 0, 2, 2, 0, 3, 3, 0, 0];
        let mut mesh: Mesh<Rgba32> = Mesh::new(&vs, &faces);
        mesh.texcoords = Some(&ts);
        mesh.normals = Some(&ns);
        assert!(mesh.validate());
        let got: Vec<Face> = mesh.faces().collect();
        assert_eq!(got.len(), 2);
        assert_eq!(got[0].v, [0, 1, 2]);
        assert_eq!(got[0].t, [0, 1, 2]);
        assert_eq!(got[0].n, [0, 0, 0]);
        assert_eq!(got[1].v, [0, 2, 3]);
        assert_eq!(got[1].t, [0, 2, 3]);
    }
}

mod validation {
    use super::*;

    #[test]
    fn out_of_range_vertex_index_is_rejected() {
        let vs = verts(3);
        let faces = [1, 0, 1, 3, 0];
        let mesh: Mesh<Rgba32> = Mesh::new(&vs, &faces);
        assert!(!mesh.validate());
    }

    #[test]
    fn missing_sentinel_is_rejected() {
        let vs = verts(3);
        let faces = [1, 0, 1, 2];
        let mesh: Mesh<Rgba32> = Mesh::new(&vs, &faces);
        assert!(!mesh.validate());
    }

    #[test]
    fn truncated_chain_is_rejected() {
        let vs = verts(5);
        let faces = [3, 0, 1, 2, 0];
        let mesh: Mesh<Rgba32> = Mesh::new(&vs, &faces);
        assert!(!mesh.validate());
    }

    #[test]
    fn truncated_stream_stops_iteration() {
        let vs = verts(5);
        let faces = [3, 0, 1, 2, 3];
        let mesh: Mesh<Rgba32> = Mesh::new(&vs, &faces);
        // Decoding is graceful even though validation fails.
        assert!(!mesh.validate());
        assert_eq!(mesh.face_count(), 2);
    }

    #[test]
    fn out_of_range_texcoord_is_rejected() {
        let vs = verts(3);
        let ts = [tgx::vek::Vec2::new(0.0f32, 0.0)];
        let faces = [1, 0, 0, 1, 1, 2, 0, 0];
        let mut mesh: Mesh<Rgba32> = Mesh::new(&vs, &faces);
        mesh.texcoords = Some(&ts);
        assert!(!mesh.validate());
    }

    #[test]
    fn direction_bit_does_not_join_the_index() {
        let vs = verts(3);
        let faces = [1, 0, 1, 2 | D, 0];
        let mesh: Mesh<Rgba32> = Mesh::new(&vs, &faces);
        assert!(mesh.validate());
        let got: Vec<[u16; 3]> = mesh.faces().map(|f| vset(&f)).collect();
        assert_eq!(got, vec![[0, 1, 2]]);
    }

    #[test]
    fn bounding_box_covers_all_vertices() {
        let vs = [
            Vec3::new(-2.0f32, 1.0, 0.0),
            Vec3::new(3.0, -1.0, 5.0),
            Vec3::new(0.0, 0.0, -4.0),
        ];
        let faces = [1, 0, 1, 2, 0];
        let mesh: Mesh<Rgba32> = Mesh::new(&vs, &faces);
        assert_eq!(mesh.bounding_box.min, Vec3::new(-2.0, -1.0, -4.0));
        assert_eq!(mesh.bounding_box.max, Vec3::new(3.0, 1.0, 5.0));
    }
}
