//! Texture sampling paths: wrapping, filtering and the 2D quad mapper.

use tgx::vek::{Mat4, Rgb, Vec2, Vec3};
use tgx::{
    Buffer2d, Light, Material, Renderer, Rgba32, TextureFilter, TextureWrap,
};

const BLACK: Rgba32 = Rgba32::BLACK;

fn ndc_projection() -> Mat4<f32> {
    let mut a = [0.0f32; 16];
    a[0] = 1.0;
    a[5] = -1.0;
    a[10] = 1.0;
    a[15] = 1.0;
    Mat4::from_col_array(a)
}

// Full white ambient lighting so textured pixels come out as raw texels.
fn unlit(r: &mut Renderer<Rgba32>) {
    r.set_light(Light {
        direction: Vec3::new(0.0, 0.0, -1.0),
        ambient: Rgb::new(1.0, 1.0, 1.0),
        diffuse: Rgb::new(0.0, 0.0, 0.0),
        specular: Rgb::new(0.0, 0.0, 0.0),
    });
    r.set_material(Material {
        color: Rgb::new(1.0, 1.0, 1.0),
        ambient_strength: 1.0,
        diffuse_strength: 0.0,
        specular_strength: 0.0,
        specular_exponent: 0,
    });
}

fn checker_texture() -> Buffer2d<Rgba32> {
    let mut t = Buffer2d::fill(4, 4, BLACK);
    let mut img = t.image();
    for j in 0..4 {
        for i in 0..4 {
            img.draw_pixel(i, j, Rgba32::new(i as u8 * 64, j as u8 * 64, 0));
        }
    }
    t
}

// A full-screen quad with the given uv corners, drawn through the 3D
// pipeline under the pass-through projection.
fn draw_quad(
    r: &mut Renderer<Rgba32>,
    frame: &mut Buffer2d<Rgba32>,
    texture: &mut Buffer2d<Rgba32>,
    uv: [Vec2<f32>; 4],
) {
    let v = [
        Vec3::new(-1.0, -1.0, 0.0),
        Vec3::new(1.0, -1.0, 0.0),
        Vec3::new(1.0, 1.0, 0.0),
        Vec3::new(-1.0, 1.0, 0.0),
    ];
    let tex = texture.image();
    r.draw_triangles(
        &mut frame.image(),
        None,
        &v,
        &[0, 1, 2, 0, 2, 3],
        None,
        Some(&uv),
        Some(&tex),
    );
}

mod wrapping {
    use super::*;

    #[test]
    fn pow2_wrap_tiles_the_texture_twice() {
        let mut texture = checker_texture();
        let mut frame = Buffer2d::fill(4, 4, BLACK);
        let mut r = Renderer::<Rgba32>::new(4, 4);
        r.set_projection_ortho(ndc_projection());
        unlit(&mut r);
        r.set_texturing(true);
        r.set_texture_filter(TextureFilter::Nearest);
        r.set_texture_wrap(TextureWrap::Pow2);

        // UVs run 0..2: the texture tiles twice in each direction, and on
        // a 4x4 target nearest sampling lands on exact texels.
        draw_quad(
            &mut r,
            &mut frame,
            &mut texture,
            [
                Vec2::new(0.0, 0.0),
                Vec2::new(2.0, 0.0),
                Vec2::new(2.0, 2.0),
                Vec2::new(0.0, 2.0),
            ],
        );

        let img = frame.image();
        for y in 0..4 {
            for x in 0..4 {
                let want = Rgba32::new(((2 * x) & 3) as u8 * 64, ((2 * y) & 3) as u8 * 64, 0);
                assert_eq!(img.read_pixel(x, y), Some(want), "at {},{}", x, y);
            }
        }
    }

    #[test]
    fn bilinear_wrap_and_clamp_disagree_off_the_edge() {
        // Two-column texture, red then green, identical rows. A constant
        // uv just left of the texture means: clamp stays on red, pow-2
        // wrap blends across from the right edge.
        let mut texture = Buffer2d::fill(2, 2, BLACK);
        {
            let mut img = texture.image();
            for y in 0..2 {
                img.draw_pixel(0, y, Rgba32::new(255, 0, 0));
                img.draw_pixel(1, y, Rgba32::new(0, 255, 0));
            }
        }
        let uv = [Vec2::new(-0.125f32, 0.25); 4];

        let mut run = |wrap: TextureWrap| -> Rgba32 {
            let mut frame = Buffer2d::fill(2, 2, BLACK);
            let mut r = Renderer::<Rgba32>::new(2, 2);
            r.set_projection_ortho(ndc_projection());
            unlit(&mut r);
            r.set_texturing(true);
            r.set_texture_filter(TextureFilter::Bilinear);
            r.set_texture_wrap(wrap);
            draw_quad(&mut r, &mut frame, &mut texture, uv);
            frame.raw()[0]
        };

        let clamped = run(TextureWrap::Clamp);
        assert_eq!(clamped.g(), 0, "clamp sampled past the edge: {:?}", clamped);
        assert!(clamped.r() > 200);

        let wrapped = run(TextureWrap::Pow2);
        assert!(
            (40..=90).contains(&(wrapped.g() as i32)),
            "wrap should blend a quarter of green: {:?}",
            wrapped
        );
    }

    #[test]
    fn one_texel_texture_bilinear_returns_the_texel() {
        let teal = Rgba32::new(0, 128, 128);
        let mut texture = Buffer2d::fill(1, 1, teal);
        for &wrap in &[TextureWrap::Clamp, TextureWrap::Pow2] {
            let mut frame = Buffer2d::fill(2, 2, BLACK);
            let mut r = Renderer::<Rgba32>::new(2, 2);
            r.set_projection_ortho(ndc_projection());
            unlit(&mut r);
            r.set_texturing(true);
            r.set_texture_filter(TextureFilter::Bilinear);
            r.set_texture_wrap(wrap);
            draw_quad(
                &mut r,
                &mut frame,
                &mut texture,
                [Vec2::new(0.0f32, 0.0); 4],
            );
            assert!(frame.raw().iter().all(|&p| p == teal), "{:?}", wrap);
        }
    }
}

mod quads_2d {
    use super::*;

    #[test]
    fn unit_quad_copies_the_texture() {
        let mut texture = checker_texture();
        let mut frame = Buffer2d::fill(4, 4, BLACK);
        let tex = texture.image();
        frame.image().draw_textured_quad(
            &tex,
            [
                Vec2::new(0.0, 0.0),
                Vec2::new(1.0, 0.0),
                Vec2::new(1.0, 1.0),
                Vec2::new(0.0, 1.0),
            ],
            [
                Vec2::new(0.0, 0.0),
                Vec2::new(4.0, 0.0),
                Vec2::new(4.0, 4.0),
                Vec2::new(0.0, 4.0),
            ],
        );
        drop(tex);
        assert_eq!(frame.raw(), texture.raw());
    }

    #[test]
    fn quad_to_sub_rectangle_leaves_the_rest_alone() {
        let mut texture = checker_texture();
        let mut frame = Buffer2d::fill(8, 8, BLACK);
        let tex = texture.image();
        frame.image().draw_textured_quad(
            &tex,
            [
                Vec2::new(0.0, 0.0),
                Vec2::new(1.0, 0.0),
                Vec2::new(1.0, 1.0),
                Vec2::new(0.0, 1.0),
            ],
            [
                Vec2::new(2.0, 2.0),
                Vec2::new(6.0, 2.0),
                Vec2::new(6.0, 6.0),
                Vec2::new(2.0, 6.0),
            ],
        );
        drop(tex);
        let img = frame.image();
        assert_eq!(img.read_pixel(0, 0), Some(BLACK));
        assert_eq!(img.read_pixel(7, 7), Some(BLACK));
        assert_eq!(img.read_pixel(2, 2), Some(Rgba32::new(0, 0, 0)));
        assert_eq!(img.read_pixel(4, 4), Some(Rgba32::new(128, 128, 0)));
    }
}
