//! `tgx` is a small 2D/3D software rasterizer for CPU-bound targets: it
//! draws directly into pixel buffers you supply, with no GPU, no
//! allocation during rendering, and a footprint that suits 32-bit
//! microcontrollers with a few megabytes of RAM.
//!
//! The 3D side is a fixed-function pipeline: model/view/projection
//! transforms, back-face culling, Phong lighting (flat or gouraud),
//! homogeneous clipping, perspective-correct texturing and optional
//! depth-buffering, all feeding an integer edge-function scanline
//! rasterizer. The 2D side is the [`Image`] surface the pipeline renders
//! into: a non-owning view over any pixel buffer, with fills, lines,
//! gradients, blits and textured quads.
//!
//! ```no_run
//! use tgx::{Buffer2d, CullMode, Renderer, Rgb565, Shading};
//! use tgx::vek::Vec3;
//!
//! let mut frame = Buffer2d::fill(320, 240, Rgb565::BLACK);
//! let mut depth = Buffer2d::fill(320, 240, 0.0f32);
//! let sphere = tgx::shapes::sphere_mesh(24, 32);
//!
//! let mut r = Renderer::<Rgb565>::new(320, 240);
//! r.set_perspective(0.8, 320.0 / 240.0, 0.1, 100.0);
//! r.look_at(Vec3::new(0.0, 0.0, 3.0), Vec3::zero(), Vec3::unit_y());
//! r.set_shading(Shading::Gouraud);
//! r.set_depth_testing(true);
//! r.set_culling(CullMode::Back);
//!
//! let mut img = frame.image();
//! img.clear(Rgb565::BLACK);
//! Renderer::<Rgb565>::clear_depth(depth.raw_mut());
//! r.draw_mesh(&mut img, Some(depth.raw_mut()), &sphere.mesh(), true);
//! ```
//!
//! Rendering is strictly single-threaded and synchronous: draw calls run
//! to completion on the caller's thread, write their targets in order, and
//! never allocate. Failures degrade to no-ops (invalid target, empty
//! geometry) rather than panicking.
//!
//! The crate is `no_std`-capable: disable the default `std` feature and
//! enable `micromath` (plus `libm` for `vek`'s float paths) on bare-metal
//! targets. Owned buffers and the mesh builders stay behind `std`.

#![cfg_attr(not(feature = "std"), no_std)]

pub mod bbox;
#[cfg(feature = "std")]
pub mod buffer;
pub mod color;
pub mod image;
pub mod math;
pub mod mesh;
pub mod pipeline;
mod raster;
pub mod shader;
#[cfg(feature = "std")]
pub mod shapes;

// Reexports
#[cfg(feature = "std")]
pub use self::buffer::Buffer2d;
pub use self::bbox::{Box2, Box3};
pub use self::color::{Color, Rgb24, Rgb565, Rgba32, Rgba64};
pub use self::image::Image;
pub use self::math::Precision;
#[cfg(feature = "std")]
pub use self::mesh::MeshData;
pub use self::mesh::{Face, Material, Mesh};
pub use self::pipeline::{
    CullMode, Light, Renderer, Shading, TextureFilter, TextureWrap,
};
pub use self::raster::Depth;

pub use vek;
