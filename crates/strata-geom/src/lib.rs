//! Integer lattice geometry shared by the world store crates.
#![forbid(unsafe_code)]

use core::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};
use serde::{Deserialize, Serialize};

/// Integer position or offset on the node lattice.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
pub struct V3 {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl V3 {
    pub const ZERO: V3 = V3::new(0, 0, 0);
    pub const ONE: V3 = V3::new(1, 1, 1);
    pub const UP: V3 = V3::new(0, 1, 0);
    pub const DOWN: V3 = V3::new(0, -1, 0);

    #[inline]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    #[inline]
    pub const fn splat(v: i32) -> Self {
        Self { x: v, y: v, z: v }
    }

    #[inline]
    pub fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }

    #[inline]
    pub fn with_y(self, y: i32) -> Self {
        Self { y, ..self }
    }

    /// Component-wise floor division (rounds toward negative infinity).
    #[inline]
    pub fn div_euclid(self, d: i32) -> Self {
        Self::new(self.x.div_euclid(d), self.y.div_euclid(d), self.z.div_euclid(d))
    }

    #[inline]
    pub fn rem_euclid(self, d: i32) -> Self {
        Self::new(self.x.rem_euclid(d), self.y.rem_euclid(d), self.z.rem_euclid(d))
    }

    #[inline]
    pub fn min(self, o: V3) -> Self {
        Self::new(self.x.min(o.x), self.y.min(o.y), self.z.min(o.z))
    }

    #[inline]
    pub fn max(self, o: V3) -> Self {
        Self::new(self.x.max(o.x), self.y.max(o.y), self.z.max(o.z))
    }

    #[inline]
    pub fn manhattan(self) -> i64 {
        i64::from(self.x).abs() + i64::from(self.y).abs() + i64::from(self.z).abs()
    }
}

impl Add for V3 {
    type Output = V3;
    #[inline]
    fn add(self, rhs: V3) -> V3 {
        V3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl AddAssign for V3 {
    #[inline]
    fn add_assign(&mut self, rhs: V3) {
        self.x += rhs.x;
        self.y += rhs.y;
        self.z += rhs.z;
    }
}

impl Sub for V3 {
    type Output = V3;
    #[inline]
    fn sub(self, rhs: V3) -> V3 {
        V3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl SubAssign for V3 {
    #[inline]
    fn sub_assign(&mut self, rhs: V3) {
        self.x -= rhs.x;
        self.y -= rhs.y;
        self.z -= rhs.z;
    }
}

impl Mul<i32> for V3 {
    type Output = V3;
    #[inline]
    fn mul(self, rhs: i32) -> V3 {
        V3::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Neg for V3 {
    type Output = V3;
    #[inline]
    fn neg(self) -> V3 {
        V3::new(-self.x, -self.y, -self.z)
    }
}

impl From<(i32, i32, i32)> for V3 {
    fn from(value: (i32, i32, i32)) -> Self {
        Self::new(value.0, value.1, value.2)
    }
}

impl From<V3> for (i32, i32, i32) {
    fn from(value: V3) -> Self {
        (value.x, value.y, value.z)
    }
}

/// The six face neighbours. Index 1 is up and index 4 is down; the liquid
/// engine relies on that ordering.
pub const FACE_DIRS: [V3; 6] = [
    V3::new(0, 0, 1),
    V3::new(0, 1, 0),
    V3::new(1, 0, 0),
    V3::new(0, 0, -1),
    V3::new(0, -1, 0),
    V3::new(-1, 0, 0),
];

pub const FACE_UP: usize = 1;
pub const FACE_DOWN: usize = 4;

/// Inclusive box on the lattice. An area whose `max` is below its `min` on
/// any axis is empty.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Area {
    pub min: V3,
    pub max: V3,
}

impl Default for Area {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl Area {
    pub const EMPTY: Area = Area {
        min: V3::new(0, 0, 0),
        max: V3::new(-1, -1, -1),
    };

    #[inline]
    pub const fn new(min: V3, max: V3) -> Self {
        Self { min, max }
    }

    #[inline]
    pub fn single(p: V3) -> Self {
        Self { min: p, max: p }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.max.x < self.min.x || self.max.y < self.min.y || self.max.z < self.min.z
    }

    /// Edge lengths; zero on every axis for an empty area.
    #[inline]
    pub fn extent(&self) -> V3 {
        if self.is_empty() {
            return V3::ZERO;
        }
        self.max - self.min + V3::ONE
    }

    #[inline]
    pub fn volume(&self) -> usize {
        let e = self.extent();
        e.x as usize * e.y as usize * e.z as usize
    }

    #[inline]
    pub fn contains(&self, p: V3) -> bool {
        p.x >= self.min.x
            && p.y >= self.min.y
            && p.z >= self.min.z
            && p.x <= self.max.x
            && p.y <= self.max.y
            && p.z <= self.max.z
    }

    pub fn contains_area(&self, other: &Area) -> bool {
        if other.is_empty() {
            return true;
        }
        !self.is_empty() && self.contains(other.min) && self.contains(other.max)
    }

    /// Grow to include `p`.
    pub fn add_point(&mut self, p: V3) {
        if self.is_empty() {
            *self = Area::single(p);
            return;
        }
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    /// Grow to the bounding box of `self` and `other`.
    pub fn add_area(&mut self, other: &Area) {
        if other.is_empty() {
            return;
        }
        if self.is_empty() {
            *self = *other;
            return;
        }
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    pub fn intersect(&self, other: &Area) -> Area {
        let a = Area::new(self.min.max(other.min), self.max.min(other.max));
        if a.is_empty() { Area::EMPTY } else { a }
    }

    /// Linear index of `p`, x fastest then y then z. `p` must be inside.
    #[inline]
    pub fn index(&self, p: V3) -> usize {
        let e = self.extent();
        let d = p - self.min;
        (d.z as usize * e.y as usize + d.y as usize) * e.x as usize + d.x as usize
    }

    /// Inverse of [`Area::index`].
    #[inline]
    pub fn position(&self, i: usize) -> V3 {
        let e = self.extent();
        let (ex, ey) = (e.x as usize, e.y as usize);
        let x = i % ex;
        let y = (i / ex) % ey;
        let z = i / (ex * ey);
        self.min + V3::new(x as i32, y as i32, z as i32)
    }

    /// Every position in index order.
    pub fn iter(&self) -> impl Iterator<Item = V3> + '_ {
        let a = *self;
        (0..a.volume()).map(move |i| a.position(i))
    }
}
