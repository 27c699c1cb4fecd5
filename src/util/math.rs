//! Math type re-exports and scene-specific math utilities.
//!
//! This module re-exports the double precision types from `glam` and
//! provides the axis-aligned bounding box used by every bound channel.

pub use glam::{DMat4, DVec3};

use bytemuck::{Pod, Zeroable};
use std::fmt;

/// 3D bounding box with double precision.
#[derive(Clone, Copy, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Box3d {
    pub min: DVec3,
    pub max: DVec3,
}

impl Box3d {
    /// Empty bounding box (inverted, will expand on first point).
    pub const EMPTY: Self = Self {
        min: DVec3::splat(f64::INFINITY),
        max: DVec3::splat(f64::NEG_INFINITY),
    };

    /// Create a new bounding box from min and max points.
    #[inline]
    pub const fn new(min: DVec3, max: DVec3) -> Self {
        Self { min, max }
    }

    /// Check if this box is empty (has no volume).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Expand this box to include a point.
    #[inline]
    pub fn expand_by_point(&mut self, p: DVec3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    /// Expand this box to include another box.
    #[inline]
    pub fn expand_by_box(&mut self, other: &Self) {
        if !other.is_empty() {
            self.min = self.min.min(other.min);
            self.max = self.max.max(other.max);
        }
    }

    /// True if `other` lies entirely inside this box, within `tolerance`.
    pub fn contains(&self, other: &Self, tolerance: f64) -> bool {
        if other.is_empty() {
            return true;
        }
        let t = DVec3::splat(tolerance);
        (self.min - t).cmple(other.min).all() && other.max.cmple(self.max + t).all()
    }

    /// Component-wise comparison within `tolerance`.
    pub fn approx_eq(&self, other: &Self, tolerance: f64) -> bool {
        if self.is_empty() || other.is_empty() {
            return self.is_empty() == other.is_empty();
        }
        self.contains(other, tolerance) && other.contains(self, tolerance)
    }

    /// Get the center of the box.
    #[inline]
    pub fn center(&self) -> DVec3 {
        (self.min + self.max) * 0.5
    }

    /// Get the size (extents) of the box.
    #[inline]
    pub fn size(&self) -> DVec3 {
        self.max - self.min
    }

    /// Bound of this box after transforming its eight corners by `m`.
    pub fn transformed(&self, m: &DMat4) -> Self {
        if self.is_empty() {
            return Self::EMPTY;
        }
        let mut out = Self::EMPTY;
        for i in 0..8 {
            let corner = DVec3::new(
                if i & 1 == 0 { self.min.x } else { self.max.x },
                if i & 2 == 0 { self.min.y } else { self.max.y },
                if i & 4 == 0 { self.min.z } else { self.max.z },
            );
            out.expand_by_point(m.transform_point3(corner));
        }
        out
    }

    /// Linear blend of min and max corners.
    pub fn lerp(&self, other: &Self, alpha: f64) -> Self {
        if self.is_empty() || other.is_empty() {
            return if alpha < 0.5 { *self } else { *other };
        }
        Self {
            min: self.min.lerp(other.min, alpha),
            max: self.max.lerp(other.max, alpha),
        }
    }
}

impl Default for Box3d {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl fmt::Debug for Box3d {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Box3d({:?} - {:?})", self.min, self.max)
    }
}

/// Component-wise linear blend of two matrices.
pub fn lerp_matrix(a: &DMat4, b: &DMat4, alpha: f64) -> DMat4 {
    DMat4::from_cols(
        a.x_axis.lerp(b.x_axis, alpha),
        a.y_axis.lerp(b.y_axis, alpha),
        a.z_axis.lerp(b.z_axis, alpha),
        a.w_axis.lerp(b.w_axis, alpha),
    )
}

/// Chrono type - time value (seconds).
pub type Chrono = f64;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_box3d() {
        let mut b = Box3d::EMPTY;
        assert!(b.is_empty());

        b.expand_by_point(DVec3::new(-1.0, -1.0, -1.0));
        b.expand_by_point(DVec3::new(1.0, 1.0, 1.0));

        assert_eq!(b.center(), DVec3::ZERO);
        assert_eq!(b.size(), DVec3::splat(2.0));
    }

    #[test]
    fn test_box_pod() {
        assert_eq!(std::mem::size_of::<Box3d>(), 48);
    }

    #[test]
    fn test_transformed() {
        let b = Box3d::new(DVec3::splat(-1.0), DVec3::splat(1.0));
        let moved = b.transformed(&DMat4::from_translation(DVec3::new(2.0, 0.0, 0.0)));
        assert_eq!(moved, Box3d::new(DVec3::new(1.0, -1.0, -1.0), DVec3::new(3.0, 1.0, 1.0)));

        let scaled = b.transformed(&DMat4::from_scale(DVec3::splat(2.0)));
        assert_eq!(scaled.max, DVec3::splat(2.0));

        assert!(Box3d::EMPTY.transformed(&DMat4::IDENTITY).is_empty());
    }

    #[test]
    fn test_contains() {
        let outer = Box3d::new(DVec3::splat(-2.0), DVec3::splat(2.0));
        let inner = Box3d::new(DVec3::splat(-1.0), DVec3::splat(1.0));
        assert!(outer.contains(&inner, 0.0));
        assert!(!inner.contains(&outer, 0.0));
        assert!(inner.contains(&Box3d::EMPTY, 0.0));
        assert!(inner.approx_eq(&Box3d::new(DVec3::splat(-1.0 - 1e-7), DVec3::splat(1.0)), 1e-5));
    }

    #[test]
    fn test_lerp_matrix() {
        let a = DMat4::from_translation(DVec3::new(1.0, 0.0, 0.0));
        let b = DMat4::from_translation(DVec3::new(2.0, 0.0, 0.0));
        let m = lerp_matrix(&a, &b, 0.5);
        assert_eq!(m.w_axis.x, 1.5);
    }
}
