//! Owned pixel storage, for offscreen rendering, tests and demos.
//!
//! Embedded callers normally supply their own (often memory-mapped)
//! buffers and wrap them in [`Image`] views directly; `Buffer2d` is the
//! convenience for everyone else.

use crate::color::Color;
use crate::image::Image;

/// A heap-backed rectangle of elements, usable as pixel or depth storage.
#[derive(Clone, Debug, PartialEq)]
pub struct Buffer2d<T: Copy> {
    items: Vec<T>,
    lx: i32,
    ly: i32,
}

impl<T: Copy> Buffer2d<T> {
    /// Create a buffer with the given size, filled with copies of `item`.
    pub fn fill(lx: i32, ly: i32, item: T) -> Self {
        let (lx, ly) = (lx.max(0), ly.max(0));
        Self {
            items: vec![item; lx as usize * ly as usize],
            lx,
            ly,
        }
    }

    #[inline]
    pub fn lx(&self) -> i32 {
        self.lx
    }

    #[inline]
    pub fn ly(&self) -> i32 {
        self.ly
    }

    /// View the storage as a linear slice.
    #[inline]
    pub fn raw(&self) -> &[T] {
        &self.items
    }

    /// View the storage as a linear mutable slice (e.g. to pass a depth
    /// buffer to a draw call).
    #[inline]
    pub fn raw_mut(&mut self) -> &mut [T] {
        &mut self.items
    }

    /// Overwrite every element.
    pub fn clear(&mut self, item: T) {
        for i in self.items.iter_mut() {
            *i = item;
        }
    }
}

impl<C: Color> Buffer2d<C> {
    /// Borrow the buffer as an image view.
    pub fn image(&mut self) -> Image<'_, C> {
        let (lx, ly) = (self.lx, self.ly);
        Image::new(&mut self.items, lx, ly)
    }
}

#[cfg(feature = "image")]
impl Buffer2d<crate::color::Rgba32> {
    /// Import an `image` crate RGBA bitmap.
    pub fn from_rgba_image(src: &image_::RgbaImage) -> Self {
        let (w, h) = src.dimensions();
        let mut out = Self::fill(w as i32, h as i32, crate::color::Rgba32::BLACK);
        for (x, y, px) in src.enumerate_pixels() {
            let [r, g, b, a] = px.0;
            out.items[(y * w + x) as usize] = crate::color::Rgba32::with_alpha(r, g, b, a);
        }
        out
    }
}
