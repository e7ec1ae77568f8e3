//! Ray-cast visibility queries.
//!
//! All queries are read-only and evaluated at the scene's current frame; the
//! caller moves the frame with [`Scene::frame_set`] first.
//!
//! A sampled surface point counts as visible when the first object hit by
//! the ray from the camera toward it is the queried object itself. Sampling
//! is without replacement and seeded per object and frame, so repeated
//! queries at the same frame return the same value.

use probe_types::{Frame, ObjectId, Point3, Result, VisibilityConfig};
use probe_world::{Renderer, Scene};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Visibility and field-of-view oracle over a renderer.
#[derive(Clone, Copy)]
pub struct VisibilityOracle<'r> {
    renderer: &'r dyn Renderer,
    sample_count: usize,
    fov_threshold_deg: f64,
    seed: u64,
}

impl std::fmt::Debug for VisibilityOracle<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VisibilityOracle")
            .field("sample_count", &self.sample_count)
            .field("fov_threshold_deg", &self.fov_threshold_deg)
            .field("seed", &self.seed)
            .finish_non_exhaustive()
    }
}

impl<'r> VisibilityOracle<'r> {
    /// Create an oracle with the given sampling configuration.
    #[must_use]
    pub fn new(renderer: &'r dyn Renderer, config: &VisibilityConfig) -> Self {
        Self {
            renderer,
            sample_count: config.sample_count,
            fov_threshold_deg: config.fov_threshold_deg,
            seed: config.seed,
        }
    }

    /// Override the number of sampled surface points.
    #[must_use]
    pub fn with_sample_count(mut self, sample_count: usize) -> Self {
        self.sample_count = sample_count;
        self
    }

    /// Field-of-view half-angle in degrees.
    #[must_use]
    pub fn fov_threshold_deg(&self) -> f64 {
        self.fov_threshold_deg
    }

    /// Fraction in `[0, 1]` of `object_name`'s sampled surface seen by
    /// `camera_name`.
    pub fn visible_fraction(
        &self,
        scene: &Scene,
        object_name: &str,
        camera_name: &str,
    ) -> Result<f64> {
        self.visible_fraction_of(scene, scene.id_of(object_name)?, camera_name)
    }

    /// [`visible_fraction`](Self::visible_fraction) by id.
    pub fn visible_fraction_of(
        &self,
        scene: &Scene,
        object: ObjectId,
        camera_name: &str,
    ) -> Result<f64> {
        let camera = scene.camera_pose(camera_name)?.position;
        let points = self.renderer.surface_points(scene, object)?;
        if points.is_empty() {
            return Ok(0.0);
        }
        let amount = self.sample_count.min(points.len());
        let mut rng = ChaCha8Rng::seed_from_u64(self.sample_seed(object, scene.current_frame()));
        let chosen = rand::seq::index::sample(&mut rng, points.len(), amount);
        let visible = chosen
            .iter()
            .filter(|&i| {
                self.renderer
                    .cast_ray(scene, &camera, &points[i])
                    .is_some_and(|hit| hit.object == object)
            })
            .count();
        Ok(visible as f64 / amount as f64)
    }

    /// Whether the angle between the camera's forward axis and the direction
    /// to the object's center is below the threshold.
    pub fn in_field_of_view(
        &self,
        scene: &Scene,
        object_name: &str,
        camera_name: &str,
    ) -> Result<bool> {
        self.in_field_of_view_of(scene, scene.id_of(object_name)?, camera_name)
    }

    /// [`in_field_of_view`](Self::in_field_of_view) by id.
    pub fn in_field_of_view_of(
        &self,
        scene: &Scene,
        object: ObjectId,
        camera_name: &str,
    ) -> Result<bool> {
        let pose = scene.camera_pose(camera_name)?;
        let center = scene.world_aabb(object, scene.current_frame())?.center();
        Ok(pose.angle_to(&center) < self.fov_threshold_deg)
    }

    /// Whether the ray from the camera to `point` is not first blocked by any
    /// of `blocking_object_names`.
    pub fn occlusion_free_point(
        &self,
        scene: &Scene,
        point: &Point3<f64>,
        blocking_object_names: &[&str],
        camera_name: &str,
    ) -> Result<bool> {
        let blockers = blocking_object_names
            .iter()
            .map(|name| scene.id_of(name))
            .collect::<Result<Vec<_>>>()?;
        let camera = scene.camera_pose(camera_name)?.position;
        let reach = (point - camera).norm();
        Ok(match self.renderer.cast_ray(scene, &camera, point) {
            Some(hit) => !(blockers.contains(&hit.object) && hit.distance < reach - 1e-9),
            None => true,
        })
    }

    fn sample_seed(&self, object: ObjectId, frame: Frame) -> u64 {
        self.seed
            ^ (u64::from(object.raw()) << 32)
            ^ u64::from(frame).wrapping_mul(0x9E37_79B9_7F4A_7C15)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use probe_types::{Shape, Vector3};
    use probe_world::{CameraRig, RayCastRenderer, SceneObject};

    fn scene_with_blocker(blocker_x: f64) -> Scene {
        let mut scene = Scene::new(4, 12);
        scene
            .add(
                SceneObject::new("ball", "ball", Shape::sphere(0.2))
                    .with_position(Point3::new(0.0, 3.0, 1.0)),
            )
            .unwrap();
        scene
            .add(
                SceneObject::new("wall", "wall", Shape::cuboid(Vector3::new(0.5, 0.05, 0.5)))
                    .with_position(Point3::new(blocker_x, 1.5, 1.0)),
            )
            .unwrap();
        scene.add_camera(
            "cam",
            CameraRig::fixed(Point3::new(0.0, 0.0, 1.0), Point3::new(0.0, 3.0, 1.0)),
        );
        scene
    }

    #[test]
    fn test_unoccluded_object_fully_visible() {
        let renderer = RayCastRenderer::default();
        let oracle = VisibilityOracle::new(&renderer, &VisibilityConfig::default());
        let scene = scene_with_blocker(5.0);
        assert_relative_eq!(oracle.visible_fraction(&scene, "ball", "cam").unwrap(), 1.0);
        assert!(oracle.in_field_of_view(&scene, "ball", "cam").unwrap());
    }

    #[test]
    fn test_occluded_object_invisible() {
        let renderer = RayCastRenderer::default();
        let oracle = VisibilityOracle::new(&renderer, &VisibilityConfig::default());
        let scene = scene_with_blocker(0.0);
        assert_relative_eq!(oracle.visible_fraction(&scene, "ball", "cam").unwrap(), 0.0);
        let ball = scene.world_aabb(scene.id_of("ball").unwrap(), 0).unwrap().center();
        assert!(!oracle.occlusion_free_point(&scene, &ball, &["wall"], "cam").unwrap());
        assert!(oracle.occlusion_free_point(&scene, &ball, &["ball"], "cam").unwrap());
    }

    #[test]
    fn test_fraction_bounded_and_deterministic() {
        let renderer = RayCastRenderer::new(64, 4);
        // Sample count above the surface size uses every point.
        let config = VisibilityConfig::default().with_sample_count(500);
        let oracle = VisibilityOracle::new(&renderer, &config);
        let scene = scene_with_blocker(0.55);
        let a = oracle.visible_fraction(&scene, "ball", "cam").unwrap();
        let b = oracle.visible_fraction(&scene, "ball", "cam").unwrap();
        assert!((0.0..=1.0).contains(&a));
        assert!(a > 0.0 && a < 1.0, "partial occlusion expected, got {a}");
        assert_eq!(a, b);
    }

    #[test]
    fn test_field_of_view_threshold() {
        let renderer = RayCastRenderer::default();
        let oracle = VisibilityOracle::new(&renderer, &VisibilityConfig::default());
        let mut scene = scene_with_blocker(5.0);
        // 45 degrees off axis.
        scene
            .add(
                SceneObject::new("side", "ball", Shape::sphere(0.1))
                    .with_position(Point3::new(3.0, 3.0, 1.0)),
            )
            .unwrap();
        assert!(!oracle.in_field_of_view(&scene, "side", "cam").unwrap());
    }

    #[test]
    fn test_unknown_names_are_errors() {
        let renderer = RayCastRenderer::default();
        let oracle = VisibilityOracle::new(&renderer, &VisibilityConfig::default());
        let scene = scene_with_blocker(5.0);
        assert!(oracle.visible_fraction(&scene, "ghost", "cam").is_err());
        assert!(oracle.visible_fraction(&scene, "ball", "nope").is_err());
    }
}
