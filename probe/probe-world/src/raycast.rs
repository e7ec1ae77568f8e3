//! Analytic ray intersection against object shapes.
//!
//! - Sphere: quadratic formula
//! - Cuboid: slab test in the box's local frame

use probe_types::{ObjectState, Point3, Shape, Vector3};

/// Distance along a unit-direction ray to the first hit on `shape`, scaled
/// by `scale` and placed at `state`.
///
/// Returns `None` for misses and for hits farther than `max_distance`. A ray
/// starting inside the shape reports the exit point.
#[must_use]
pub fn ray_shape_distance(
    shape: &Shape,
    scale: f64,
    state: &ObjectState,
    origin: &Point3<f64>,
    direction: &Vector3<f64>,
    max_distance: f64,
) -> Option<f64> {
    match shape {
        Shape::Sphere { radius } => {
            ray_sphere(&state.position, radius * scale, origin, direction, max_distance)
        }
        Shape::Cuboid { half_extents } => {
            let inv = state.orientation.inverse();
            let local_origin = Point3::from(inv * (origin - state.position));
            let local_dir = inv * direction;
            ray_box(&(half_extents * scale), &local_origin, &local_dir, max_distance)
        }
    }
}

fn ray_sphere(
    center: &Point3<f64>,
    radius: f64,
    origin: &Point3<f64>,
    dir: &Vector3<f64>,
    max_distance: f64,
) -> Option<f64> {
    let oc = origin - center;
    let b = oc.dot(dir);
    let c = oc.dot(&oc) - radius * radius;
    let discriminant = b * b - c;
    // NaN-safe miss check.
    if !(discriminant >= 0.0) {
        return None;
    }
    let sqrt_d = discriminant.sqrt();
    let mut t = -b - sqrt_d;
    if t < 0.0 {
        t = -b + sqrt_d;
    }
    (t >= 0.0 && t <= max_distance).then_some(t)
}

fn ray_box(
    half: &Vector3<f64>,
    origin: &Point3<f64>,
    dir: &Vector3<f64>,
    max_distance: f64,
) -> Option<f64> {
    let mut t_min = f64::NEG_INFINITY;
    let mut t_max = f64::INFINITY;
    for i in 0..3 {
        if dir[i].abs() < 1e-12 {
            if origin[i] < -half[i] || origin[i] > half[i] {
                return None;
            }
            continue;
        }
        let inv = 1.0 / dir[i];
        let t1 = (-half[i] - origin[i]) * inv;
        let t2 = (half[i] - origin[i]) * inv;
        t_min = t_min.max(t1.min(t2));
        t_max = t_max.min(t1.max(t2));
        if t_min > t_max {
            return None;
        }
    }
    let t = if t_min >= 0.0 { t_min } else { t_max };
    (t >= 0.0 && t <= max_distance).then_some(t)
}
