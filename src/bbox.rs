//! Closed axis-aligned boxes in two and three dimensions.
//!
//! A box is the product of closed intervals `[min.x, max.x] × [min.y, max.y]`
//! (and `[min.z, max.z]` in 3D). A box is empty exactly when any `max`
//! component is below the corresponding `min`; empty boxes absorb
//! intersections and are the identity of unions.
//!
//! Extents follow the element type: for integers the width of `[a, b]` is
//! `b - a + 1` (a one-pixel box has width 1), for floats it is `b - a`.

use core::ops::{BitAnd, BitOr};
use vek::{Vec2, Vec3};

/// Element type usable as a box coordinate.
pub trait BoxElem:
    Copy
    + PartialOrd
    + core::ops::Add<Output = Self>
    + core::ops::Sub<Output = Self>
    + core::fmt::Debug
{
    /// Additive identity.
    const ZERO: Self;
    /// What a degenerate `[a, a]` interval measures: `1` for integer
    /// coordinates (a single cell), `0` for real coordinates.
    const CELL: Self;

    #[inline(always)]
    fn min2(self, other: Self) -> Self {
        if other < self {
            other
        } else {
            self
        }
    }

    #[inline(always)]
    fn max2(self, other: Self) -> Self {
        if other > self {
            other
        } else {
            self
        }
    }
}

macro_rules! impl_box_elem {
    ($t:ty, $zero:expr, $cell:expr) => {
        impl BoxElem for $t {
            const ZERO: Self = $zero;
            const CELL: Self = $cell;
        }
    };
}

impl_box_elem!(i16, 0, 1);
impl_box_elem!(i32, 0, 1);
impl_box_elem!(i64, 0, 1);
impl_box_elem!(f32, 0.0, 0.0);
impl_box_elem!(f64, 0.0, 0.0);

/// A closed 2D axis-aligned box.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Box2<T> {
    pub min: Vec2<T>,
    pub max: Vec2<T>,
}

impl<T: BoxElem> Box2<T> {
    #[inline]
    pub fn new(min_x: T, max_x: T, min_y: T, max_y: T) -> Self {
        Self {
            min: Vec2::new(min_x, min_y),
            max: Vec2::new(max_x, max_y),
        }
    }

    /// The canonical empty box.
    #[inline]
    pub fn empty() -> Self {
        Self {
            min: Vec2::new(T::CELL, T::CELL),
            max: Vec2::new(T::ZERO, T::ZERO),
        }
    }

    /// Smallest box containing both points.
    #[inline]
    pub fn of_points(a: Vec2<T>, b: Vec2<T>) -> Self {
        Self {
            min: Vec2::new(a.x.min2(b.x), a.y.min2(b.y)),
            max: Vec2::new(a.x.max2(b.x), a.y.max2(b.y)),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.max.x < self.min.x || self.max.y < self.min.y
    }

    /// Interval measure along x; meaningless for empty boxes.
    #[inline]
    pub fn width(&self) -> T {
        self.max.x - self.min.x + T::CELL
    }

    /// Interval measure along y; meaningless for empty boxes.
    #[inline]
    pub fn height(&self) -> T {
        self.max.y - self.min.y + T::CELL
    }

    #[inline]
    pub fn contains(&self, p: Vec2<T>) -> bool {
        self.min.x <= p.x && p.x <= self.max.x && self.min.y <= p.y && p.y <= self.max.y
    }

    /// Whether `other` lies entirely inside `self`. An empty `other` is
    /// contained in everything.
    #[inline]
    pub fn contains_box(&self, other: &Self) -> bool {
        if other.is_empty() {
            return true;
        }
        if self.is_empty() {
            return false;
        }
        self.min.x <= other.min.x
            && other.max.x <= self.max.x
            && self.min.y <= other.min.y
            && other.max.y <= self.max.y
    }

    #[inline]
    pub fn intersects(&self, other: &Self) -> bool {
        !self.intersect(other).is_empty()
    }

    /// Intersection; empty absorbs.
    #[inline]
    pub fn intersect(&self, other: &Self) -> Self {
        if self.is_empty() || other.is_empty() {
            return Self::empty();
        }
        Self {
            min: Vec2::new(self.min.x.max2(other.min.x), self.min.y.max2(other.min.y)),
            max: Vec2::new(self.max.x.min2(other.max.x), self.max.y.min2(other.max.y)),
        }
    }

    /// Smallest box containing both operands; empty is the identity.
    #[inline]
    pub fn union(&self, other: &Self) -> Self {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        Self {
            min: Vec2::new(self.min.x.min2(other.min.x), self.min.y.min2(other.min.y)),
            max: Vec2::new(self.max.x.max2(other.max.x), self.max.y.max2(other.max.y)),
        }
    }

    /// Grow (if needed) to contain `p`.
    #[inline]
    pub fn expand_to(&mut self, p: Vec2<T>) {
        if self.is_empty() {
            *self = Self {
                min: p,
                max: p,
            };
        } else {
            self.min.x = self.min.x.min2(p.x);
            self.min.y = self.min.y.min2(p.y);
            self.max.x = self.max.x.max2(p.x);
            self.max.y = self.max.y.max2(p.y);
        }
    }

    #[inline]
    pub fn translate(&self, d: Vec2<T>) -> Self {
        Self {
            min: Vec2::new(self.min.x + d.x, self.min.y + d.y),
            max: Vec2::new(self.max.x + d.x, self.max.y + d.y),
        }
    }
}

impl<T: BoxElem> BitAnd for Box2<T> {
    type Output = Self;

    #[inline]
    fn bitand(self, rhs: Self) -> Self {
        self.intersect(&rhs)
    }
}

impl<T: BoxElem> BitOr for Box2<T> {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self {
        self.union(&rhs)
    }
}

/// A closed 3D axis-aligned box.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Box3<T> {
    pub min: Vec3<T>,
    pub max: Vec3<T>,
}

impl<T: BoxElem> Box3<T> {
    #[inline]
    pub fn new(min_x: T, max_x: T, min_y: T, max_y: T, min_z: T, max_z: T) -> Self {
        Self {
            min: Vec3::new(min_x, min_y, min_z),
            max: Vec3::new(max_x, max_y, max_z),
        }
    }

    #[inline]
    pub fn empty() -> Self {
        Self {
            min: Vec3::new(T::CELL, T::CELL, T::CELL),
            max: Vec3::new(T::ZERO, T::ZERO, T::ZERO),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.max.x < self.min.x || self.max.y < self.min.y || self.max.z < self.min.z
    }

    #[inline]
    pub fn contains(&self, p: Vec3<T>) -> bool {
        self.min.x <= p.x
            && p.x <= self.max.x
            && self.min.y <= p.y
            && p.y <= self.max.y
            && self.min.z <= p.z
            && p.z <= self.max.z
    }

    #[inline]
    pub fn intersect(&self, other: &Self) -> Self {
        if self.is_empty() || other.is_empty() {
            return Self::empty();
        }
        Self {
            min: Vec3::new(
                self.min.x.max2(other.min.x),
                self.min.y.max2(other.min.y),
                self.min.z.max2(other.min.z),
            ),
            max: Vec3::new(
                self.max.x.min2(other.max.x),
                self.max.y.min2(other.max.y),
                self.max.z.min2(other.max.z),
            ),
        }
    }

    #[inline]
    pub fn union(&self, other: &Self) -> Self {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        Self {
            min: Vec3::new(
                self.min.x.min2(other.min.x),
                self.min.y.min2(other.min.y),
                self.min.z.min2(other.min.z),
            ),
            max: Vec3::new(
                self.max.x.max2(other.max.x),
                self.max.y.max2(other.max.y),
                self.max.z.max2(other.max.z),
            ),
        }
    }

    #[inline]
    pub fn expand_to(&mut self, p: Vec3<T>) {
        if self.is_empty() {
            *self = Self {
                min: p,
                max: p,
            };
        } else {
            self.min.x = self.min.x.min2(p.x);
            self.min.y = self.min.y.min2(p.y);
            self.min.z = self.min.z.min2(p.z);
            self.max.x = self.max.x.max2(p.x);
            self.max.y = self.max.y.max2(p.y);
            self.max.z = self.max.z.max2(p.z);
        }
    }

    /// The eight corner points.
    #[inline]
    pub fn corners(&self) -> [Vec3<T>; 8] {
        let (a, b) = (self.min, self.max);
        [
            Vec3::new(a.x, a.y, a.z),
            Vec3::new(b.x, a.y, a.z),
            Vec3::new(a.x, b.y, a.z),
            Vec3::new(b.x, b.y, a.z),
            Vec3::new(a.x, a.y, b.z),
            Vec3::new(b.x, a.y, b.z),
            Vec3::new(a.x, b.y, b.z),
            Vec3::new(b.x, b.y, b.z),
        ]
    }
}

impl<T: BoxElem> BitAnd for Box3<T> {
    type Output = Self;

    #[inline]
    fn bitand(self, rhs: Self) -> Self {
        self.intersect(&rhs)
    }
}

impl<T: BoxElem> BitOr for Box3<T> {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self {
        self.union(&rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_width_counts_cells() {
        let b: Box2<i32> = Box2::new(0, 3, 0, 0);
        assert_eq!(b.width(), 4);
        assert_eq!(b.height(), 1);
    }

    #[test]
    fn float_width_measures_length() {
        let b: Box2<f32> = Box2::new(0.0, 3.0, -1.0, 1.0);
        assert_eq!(b.width(), 3.0);
        assert_eq!(b.height(), 2.0);
    }

    #[test]
    fn empty_absorbs_intersection() {
        let b: Box2<i32> = Box2::new(0, 9, 0, 9);
        let e = Box2::empty();
        assert!((b & e).is_empty());
        assert!((e & b).is_empty());
        assert_eq!(b | e, b);
        assert_eq!(e | b, b);
    }

    #[test]
    fn intersection_and_union() {
        let a: Box2<i32> = Box2::new(0, 5, 0, 5);
        let b: Box2<i32> = Box2::new(3, 9, 2, 4);
        assert_eq!(a & b, Box2::new(3, 5, 2, 4));
        assert_eq!(a | b, Box2::new(0, 9, 0, 5));
        let c: Box2<i32> = Box2::new(7, 9, 7, 9);
        assert!((a & c).is_empty());
    }

    #[test]
    fn containment_with_empty() {
        let a: Box2<i32> = Box2::new(0, 5, 0, 5);
        assert!(a.contains_box(&Box2::empty()));
        assert!(!Box2::<i32>::empty().contains_box(&a));
        assert!(a.contains_box(&Box2::new(1, 2, 3, 4)));
        assert!(!a.contains_box(&Box2::new(1, 6, 3, 4)));
    }

    #[test]
    fn box3_corners_cover_extremes() {
        let b: Box3<f32> = Box3::new(-1.0, 1.0, -2.0, 2.0, 0.0, 3.0);
        let cs = b.corners();
        assert!(cs.iter().any(|c| *c == Vec3::new(-1.0, -2.0, 0.0)));
        assert!(cs.iter().any(|c| *c == Vec3::new(1.0, 2.0, 3.0)));
    }
}
