//! Renders a few frames of a rotating, lit cube into an offscreen buffer
//! and saves the last one as a PNG.

use tgx::vek::{Mat4, Rgb, Vec3};
use tgx::{Buffer2d, Material, Renderer, Rgba32, Shading};

fn save_png(frame: &Buffer2d<Rgba32>, path: &str) {
    let (w, h) = (frame.lx() as u32, frame.ly() as u32);
    let mut out = image_::RgbaImage::new(w, h);
    for (i, px) in frame.raw().iter().enumerate() {
        let (x, y) = (i as u32 % w, i as u32 / w);
        out.put_pixel(x, y, image_::Rgba([px.r(), px.g(), px.b(), px.a()]));
    }
    out.save(path).expect("writing the demo output");
}

fn main() {
    let (w, h) = (256, 256);
    let cube = tgx::shapes::cube_mesh();

    let mut frame = Buffer2d::fill(w, h, Rgba32::BLACK);
    let mut zbuf = Buffer2d::fill(w, h, 0.0f32);

    let mut r = Renderer::<Rgba32>::new(w, h);
    r.set_perspective(1.0, 1.0, 0.1, 50.0);
    r.look_at(Vec3::new(0.0, 1.5, 4.5), Vec3::zero(), Vec3::unit_y());
    r.set_shading(Shading::Flat);
    r.set_depth_testing(true);
    r.set_light_direction(Vec3::new(-1.0, -1.0, -2.0));
    r.set_material(Material {
        color: Rgb::new(0.9, 0.4, 0.2),
        ambient_strength: 0.2,
        diffuse_strength: 0.8,
        specular_strength: 0.4,
        specular_exponent: 16,
    });

    for i in 0..32 {
        let angle = i as f32 * 0.1;
        r.set_model(Mat4::rotation_y(angle) * Mat4::rotation_x(angle * 0.6));
        let mut img = frame.image();
        img.clear(Rgba32::new(20, 20, 30));
        Renderer::<Rgba32>::clear_depth(zbuf.raw_mut());
        r.draw_mesh(&mut img, Some(zbuf.raw_mut()), &cube.mesh(), false);
    }

    save_png(&frame, "spinning_cube.png");
    println!("wrote spinning_cube.png");
}
