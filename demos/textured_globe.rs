//! A gouraud-lit, texture-mapped sphere rendered offscreen with bilinear
//! filtering, saved as a PNG.

use tgx::vek::{Rgb, Vec3};
use tgx::{
    Buffer2d, Material, Renderer, Rgba32, Shading, TextureFilter, TextureWrap,
};

fn checker(size: i32) -> Buffer2d<Rgba32> {
    let mut t = Buffer2d::fill(size, size, Rgba32::BLACK);
    let mut img = t.image();
    for y in 0..size {
        for x in 0..size {
            let on = ((x >> 3) ^ (y >> 3)) & 1 == 1;
            let c = if on {
                Rgba32::new(240, 240, 240)
            } else {
                Rgba32::new(30, 90, 180)
            };
            img.draw_pixel(x, y, c);
        }
    }
    t
}

fn main() {
    let (w, h) = (320, 320);
    let globe = tgx::shapes::sphere_mesh(32, 48);
    let mut texture = checker(64);

    let mut frame = Buffer2d::fill(w, h, Rgba32::BLACK);
    let mut zbuf = Buffer2d::fill(w, h, 0.0f32);

    let mut r = Renderer::<Rgba32>::new(w, h);
    r.set_perspective(0.9, 1.0, 0.1, 50.0);
    r.look_at(Vec3::new(0.0, 0.8, 3.2), Vec3::zero(), Vec3::unit_y());
    r.set_shading(Shading::Gouraud);
    r.set_depth_testing(true);
    r.set_texturing(true);
    r.set_texture_filter(TextureFilter::Bilinear);
    r.set_texture_wrap(TextureWrap::Pow2);
    r.set_light_direction(Vec3::new(-1.0, -0.5, -1.0));
    r.set_material(Material {
        color: Rgb::new(1.0, 1.0, 1.0),
        ambient_strength: 0.25,
        diffuse_strength: 0.75,
        specular_strength: 0.3,
        specular_exponent: 32,
    });

    let mut img = frame.image();
    img.clear(Rgba32::new(12, 12, 16));
    Renderer::<Rgba32>::clear_depth(zbuf.raw_mut());
    let tex = texture.image();
    let mesh = globe.mesh_with(Some(&tex), Material::default());
    r.draw_mesh(&mut img, Some(zbuf.raw_mut()), &mesh, false);
    drop(img);

    let (w, h) = (w as u32, h as u32);
    let mut out = image_::RgbaImage::new(w, h);
    for (i, px) in frame.raw().iter().enumerate() {
        let (x, y) = (i as u32 % w, i as u32 / w);
        out.put_pixel(x, y, image_::Rgba([px.r(), px.g(), px.b(), px.a()]));
    }
    out.save("textured_globe.png").expect("writing the demo output");
    println!("wrote textured_globe.png");
}
