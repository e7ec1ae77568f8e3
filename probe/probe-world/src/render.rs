//! Renderer interface and the ray-cast reference renderer.
//!
//! The core only needs three things from a renderer: the first object a ray
//! hits, points on an object's rendered surface, and per-pixel layers for
//! output. [`RayCastRenderer`] answers all three analytically from object
//! shapes at the scene's current frame. Hidden objects are invisible to every
//! query.

#![allow(clippy::cast_precision_loss)]

use probe_types::{ObjectId, Point3, Result, Shape, Vector3};
use serde::{Deserialize, Serialize};

use crate::raycast::ray_shape_distance;
use crate::Scene;

/// First intersection of a ray with a renderable object.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// Object that was hit.
    pub object: ObjectId,
    /// Distance from the ray origin (m).
    pub distance: f64,
    /// Hit point in world coordinates.
    pub point: Point3<f64>,
}

/// Per-pixel output of one rendered frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderLayers {
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// Row-major object labels: `id + 1`, or 0 for background.
    pub segmentation: Vec<u32>,
    /// Row-major ray distance; infinite for background.
    pub depth: Vec<f32>,
}

impl RenderLayers {
    /// Label at pixel `(x, y)`.
    #[must_use]
    pub fn label(&self, x: u32, y: u32) -> Option<u32> {
        let index = (y as usize) * (self.width as usize) + x as usize;
        self.segmentation.get(index).copied()
    }

    /// Objects that cover at least one pixel, ascending.
    #[must_use]
    pub fn visible_objects(&self) -> Vec<ObjectId> {
        let mut ids: Vec<ObjectId> = self
            .segmentation
            .iter()
            .filter(|&&label| label > 0)
            .map(|&label| ObjectId::new(label - 1))
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }
}

/// What the core consumes from a renderer.
pub trait Renderer {
    /// First renderable object hit by the ray from `origin` toward `target`,
    /// evaluated at the scene's current frame.
    fn cast_ray(&self, scene: &Scene, origin: &Point3<f64>, target: &Point3<f64>)
        -> Option<RayHit>;

    /// World-space points on the rendered surface of `object` at the current
    /// frame. Hidden objects have no surface.
    fn surface_points(&self, scene: &Scene, object: ObjectId) -> Result<Vec<Point3<f64>>>;

    /// Segmentation and depth layers seen by `camera` at the current frame.
    fn render_layers(
        &self,
        scene: &Scene,
        camera: &str,
        width: u32,
        height: u32,
    ) -> Result<RenderLayers>;
}

/// Analytic ray-cast renderer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RayCastRenderer {
    /// Points on a sphere's surface lattice.
    pub sphere_points: usize,
    /// Grid cells per side on each box face.
    pub face_grid: usize,
}

impl Default for RayCastRenderer {
    fn default() -> Self {
        Self {
            sphere_points: 256,
            face_grid: 8,
        }
    }
}

/// Surface points are pulled this fraction toward the center so a ray aimed
/// at one always intersects its owner.
const SURFACE_INSET: f64 = 1e-4;

impl RayCastRenderer {
    /// Create a renderer with the given lattice densities.
    #[must_use]
    pub fn new(sphere_points: usize, face_grid: usize) -> Self {
        Self {
            sphere_points: sphere_points.max(1),
            face_grid: face_grid.max(1),
        }
    }

    /// Surface lattice of `shape` in its local frame.
    #[must_use]
    pub fn local_surface(&self, shape: &Shape, scale: f64) -> Vec<Point3<f64>> {
        let shrink = scale * (1.0 - SURFACE_INSET);
        match shape {
            Shape::Sphere { radius } => {
                let n = self.sphere_points;
                let golden = std::f64::consts::PI * (3.0 - 5.0_f64.sqrt());
                (0..n)
                    .map(|i| {
                        let z = 1.0 - 2.0 * (i as f64 + 0.5) / n as f64;
                        let r = (1.0 - z * z).max(0.0).sqrt();
                        let phi = golden * i as f64;
                        Point3::new(r * phi.cos(), r * phi.sin(), z) * (radius * shrink)
                    })
                    .collect()
            }
            Shape::Cuboid { half_extents } => {
                let h = half_extents * shrink;
                let g = self.face_grid;
                let cell = |k: usize| -1.0 + (2.0 * k as f64 + 1.0) / g as f64;
                let mut points = Vec::with_capacity(6 * g * g);
                for axis in 0..3 {
                    let (b, c) = ((axis + 1) % 3, (axis + 2) % 3);
                    for sign in [-1.0, 1.0] {
                        for i in 0..g {
                            for j in 0..g {
                                let mut p = Vector3::zeros();
                                p[axis] = sign * h[axis];
                                p[b] = cell(i) * h[b];
                                p[c] = cell(j) * h[c];
                                points.push(Point3::from(p));
                            }
                        }
                    }
                }
                points
            }
        }
    }
}

impl Renderer for RayCastRenderer {
    fn cast_ray(
        &self,
        scene: &Scene,
        origin: &Point3<f64>,
        target: &Point3<f64>,
    ) -> Option<RayHit> {
        let delta = target - origin;
        let norm = delta.norm();
        if norm < 1e-12 {
            return None;
        }
        let direction = delta / norm;
        first_hit(scene, origin, &direction)
    }

    fn surface_points(&self, scene: &Scene, object: ObjectId) -> Result<Vec<Point3<f64>>> {
        let obj = scene.object(object)?;
        if !obj.renderable {
            return Ok(Vec::new());
        }
        let state = scene.current_state(object)?;
        Ok(self
            .local_surface(&obj.shape, obj.scale)
            .iter()
            .map(|p| state.transform_point(p))
            .collect())
    }

    fn render_layers(
        &self,
        scene: &Scene,
        camera: &str,
        width: u32,
        height: u32,
    ) -> Result<RenderLayers> {
        let rig = scene.camera(camera)?;
        let pose = rig.pose_at(scene.current_frame());
        let aspect = f64::from(width) / f64::from(height.max(1));
        let pixels = (width as usize) * (height as usize);
        let mut segmentation = Vec::with_capacity(pixels);
        let mut depth = Vec::with_capacity(pixels);
        for y in 0..height {
            for x in 0..width {
                let u = 2.0 * (f64::from(x) + 0.5) / f64::from(width) - 1.0;
                let v = 1.0 - 2.0 * (f64::from(y) + 0.5) / f64::from(height);
                let ray = rig.pixel_ray(&pose, u, v, aspect);
                match first_hit(scene, &pose.position, ray.as_ref()) {
                    Some(hit) => {
                        segmentation.push(hit.object.raw() + 1);
                        #[allow(clippy::cast_possible_truncation)]
                        depth.push(hit.distance as f32);
                    }
                    None => {
                        segmentation.push(0);
                        depth.push(f32::INFINITY);
                    }
                }
            }
        }
        Ok(RenderLayers {
            width,
            height,
            segmentation,
            depth,
        })
    }
}

fn first_hit(scene: &Scene, origin: &Point3<f64>, direction: &Vector3<f64>) -> Option<RayHit> {
    let mut best: Option<RayHit> = None;
    for obj in scene.objects().filter(|o| o.renderable) {
        let Ok(state) = scene.current_state(obj.id) else {
            continue;
        };
        let limit = best.map_or(f64::INFINITY, |b| b.distance);
        if let Some(t) = ray_shape_distance(&obj.shape, obj.scale, &state, origin, direction, limit)
        {
            best = Some(RayHit {
                object: obj.id,
                distance: t,
                point: origin + direction * t,
            });
        }
    }
    best
}
