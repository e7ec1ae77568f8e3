//! Object geometry.
//!
//! Shapes are described in the object's local rest pose and scaled uniformly.
//! They serve both as collision proxies for the simulator and as renderable
//! surfaces for ray casting.

use nalgebra::{Point3, Vector3};

use crate::ObjectState;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Geometric shape of an object, centered on the object origin.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type", rename_all = "snake_case"))]
pub enum Shape {
    /// Sphere with given radius.
    Sphere {
        /// Sphere radius in meters (before scaling).
        radius: f64,
    },
    /// Box with half-extents along the local axes.
    Cuboid {
        /// Half-extents in meters (before scaling).
        half_extents: Vector3<f64>,
    },
}

impl Shape {
    /// Create a sphere shape.
    #[must_use]
    pub fn sphere(radius: f64) -> Self {
        Self::Sphere { radius }
    }

    /// Create a box shape.
    #[must_use]
    pub fn cuboid(half_extents: Vector3<f64>) -> Self {
        Self::Cuboid { half_extents }
    }

    /// Axis-aligned bounds in the local rest pose after uniform scaling.
    #[must_use]
    pub fn local_aabb(&self, scale: f64) -> Aabb {
        let half = match self {
            Self::Sphere { radius } => Vector3::repeat(radius * scale),
            Self::Cuboid { half_extents } => half_extents * scale,
        };
        Aabb::new(Point3::from(-half), Point3::from(half))
    }

    /// Radius of the smallest origin-centered sphere enclosing the scaled shape.
    #[must_use]
    pub fn bounding_radius(&self, scale: f64) -> f64 {
        match self {
            Self::Sphere { radius } => radius * scale,
            Self::Cuboid { half_extents } => half_extents.norm() * scale,
        }
    }

    /// Volume of the scaled shape (m³).
    #[must_use]
    pub fn volume(&self, scale: f64) -> f64 {
        match self {
            Self::Sphere { radius } => {
                let r = radius * scale;
                4.0 / 3.0 * std::f64::consts::PI * r * r * r
            }
            Self::Cuboid { half_extents } => {
                let h = half_extents * scale;
                8.0 * h.x * h.y * h.z
            }
        }
    }

    /// Check that all dimensions are positive and finite.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        match self {
            Self::Sphere { radius } => radius.is_finite() && *radius > 0.0,
            Self::Cuboid { half_extents } => {
                half_extents.iter().all(|h| h.is_finite() && *h > 0.0)
            }
        }
    }
}

/// Axis-aligned bounding box.
///
/// # Example
///
/// ```
/// use probe_types::Aabb;
/// use nalgebra::Point3;
///
/// let a = Aabb::new(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0));
/// let b = Aabb::new(Point3::new(0.5, 0.5, 0.5), Point3::new(2.0, 2.0, 2.0));
/// assert!(a.overlaps(&b));
/// assert!((a.height() - 1.0).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Aabb {
    /// Minimum corner.
    pub min: Point3<f64>,
    /// Maximum corner.
    pub max: Point3<f64>,
}

impl Aabb {
    /// Create a box from its corners. Corners are reordered per axis if needed.
    #[must_use]
    pub fn new(a: Point3<f64>, b: Point3<f64>) -> Self {
        Self {
            min: Point3::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z)),
            max: Point3::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z)),
        }
    }

    /// Center point.
    #[must_use]
    pub fn center(&self) -> Point3<f64> {
        nalgebra::center(&self.min, &self.max)
    }

    /// Full extents along each axis.
    #[must_use]
    pub fn extents(&self) -> Vector3<f64> {
        self.max - self.min
    }

    /// Extent along Z.
    #[must_use]
    pub fn height(&self) -> f64 {
        self.max.z - self.min.z
    }

    /// Check whether two boxes intersect (touching counts).
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    /// Check whether a point lies inside or on the box.
    #[must_use]
    pub fn contains(&self, point: &Point3<f64>) -> bool {
        (0..3).all(|i| point[i] >= self.min[i] && point[i] <= self.max[i])
    }

    /// Translate the box by a vector.
    #[must_use]
    pub fn translated(&self, offset: &Vector3<f64>) -> Self {
        Self {
            min: self.min + offset,
            max: self.max + offset,
        }
    }

    /// World-space bounds of this local box placed at `state`.
    ///
    /// All eight corners are rotated, so the result encloses the oriented box.
    #[must_use]
    pub fn transformed(&self, state: &ObjectState) -> Self {
        let mut min = Point3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY);
        let mut max = Point3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY);
        for corner in self.corners() {
            let p = state.transform_point(&corner);
            for i in 0..3 {
                min[i] = min[i].min(p[i]);
                max[i] = max[i].max(p[i]);
            }
        }
        Self { min, max }
    }

    /// The eight corners of the box.
    #[must_use]
    pub fn corners(&self) -> [Point3<f64>; 8] {
        let (a, b) = (self.min, self.max);
        [
            Point3::new(a.x, a.y, a.z),
            Point3::new(b.x, a.y, a.z),
            Point3::new(a.x, b.y, a.z),
            Point3::new(b.x, b.y, a.z),
            Point3::new(a.x, a.y, b.z),
            Point3::new(b.x, a.y, b.z),
            Point3::new(a.x, b.y, b.z),
            Point3::new(b.x, b.y, b.z),
        ]
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::UnitQuaternion;

    #[test]
    fn test_sphere_local_aabb_scales() {
        let aabb = Shape::sphere(0.5).local_aabb(2.0);
        assert_eq!(aabb.min, Point3::new(-1.0, -1.0, -1.0));
        assert_eq!(aabb.max, Point3::new(1.0, 1.0, 1.0));
    }

    #[test]
    fn test_cuboid_volume_and_radius() {
        let shape = Shape::cuboid(Vector3::new(1.0, 2.0, 3.0));
        assert_relative_eq!(shape.volume(1.0), 48.0);
        assert_relative_eq!(shape.bounding_radius(1.0), 14.0_f64.sqrt());
    }

    #[test]
    fn test_invalid_shape() {
        assert!(!Shape::sphere(0.0).is_valid());
        assert!(!Shape::cuboid(Vector3::new(1.0, -1.0, 1.0)).is_valid());
        assert!(Shape::sphere(0.1).is_valid());
    }

    #[test]
    fn test_aabb_new_reorders_corners() {
        let aabb = Aabb::new(Point3::new(1.0, 0.0, 1.0), Point3::new(0.0, 1.0, 0.0));
        assert_eq!(aabb.min, Point3::origin());
        assert_eq!(aabb.max, Point3::new(1.0, 1.0, 1.0));
    }

    #[test]
    fn test_aabb_overlap_cases() {
        let a = Aabb::new(Point3::origin(), Point3::new(1.0, 1.0, 1.0));
        let touching = a.translated(&Vector3::new(1.0, 0.0, 0.0));
        let apart = a.translated(&Vector3::new(1.5, 0.0, 0.0));
        assert!(a.overlaps(&touching));
        assert!(!a.overlaps(&apart));
    }

    #[test]
    fn test_transformed_rotated_box_grows() {
        let local = Shape::cuboid(Vector3::new(1.0, 0.1, 0.1)).local_aabb(1.0);
        let state = ObjectState::at_rest(Point3::origin()).with_orientation(
            UnitQuaternion::from_euler_angles(0.0, 0.0, std::f64::consts::FRAC_PI_2),
        );
        let world = local.transformed(&state);
        assert_relative_eq!(world.max.y, 1.0, epsilon = 1e-10);
        assert_relative_eq!(world.max.x, 0.1, epsilon = 1e-10);
    }

    #[test]
    fn test_contains() {
        let a = Aabb::new(Point3::origin(), Point3::new(1.0, 1.0, 1.0));
        assert!(a.contains(&Point3::new(0.5, 0.5, 1.0)));
        assert!(!a.contains(&Point3::new(0.5, 0.5, 1.01)));
    }
}
