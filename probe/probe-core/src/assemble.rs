//! Candidate scene assembly.
//!
//! Every attempt builds a fresh [`Scene`] from scratch: floor, optional
//! support table, the kind-specific test objects, background clutter, and a
//! camera rig driven by the chosen [`CameraPath`]. Nothing carries over
//! between attempts.
//!
//! # Layout
//!
//! | Kind       | Support | Test objects                                   | Camera target       |
//! |------------|---------|------------------------------------------------|---------------------|
//! | collision  | no      | two objects staged to meet in mid-air          | collision point     |
//! | continuity | yes     | one object behind a large static occluder      | table top           |
//! | support    | yes     | one object dropped onto (or beside) the table  | above the drop spot |
//! | solidity   | no      | two objects staged to meet in mid-air          | collision point     |

use std::f64::consts::PI;

use probe_types::{
    CollisionParams, Frame, ObjectRole, ObjectState, Point3, ProbeError, Result, SceneConfig,
    SceneKind, Shape, SolidityParams, SupportParams, SupportVariant, Vector3,
};
use probe_world::{AssetCatalog, AssetClass, CameraPath, CameraRig, Scene, SceneObject};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, trace};

use crate::ExclusionList;

/// Name of the camera every assembled scene is filmed with.
pub const CAMERA_NAME: &str = "camera";

/// Placement attempts per background object before it is dropped.
const PLACEMENT_TRIES: usize = 10;

/// Everything that varies between two assembly attempts.
#[derive(Debug, Clone, Copy)]
pub struct AssemblyRequest<'a> {
    /// Kind of scene to stage.
    pub kind: &'a SceneKind,
    /// Camera configuration for this attempt.
    pub camera_path: &'a CameraPath,
    /// Support assets that must not be used.
    pub exclusions: &'a ExclusionList,
    /// Seed for every random choice of the attempt.
    pub seed: u64,
}

/// Builds candidate scenes.
pub trait SceneAssembler {
    /// Build a fresh candidate scene. No simulation has run yet.
    fn assemble(&mut self, request: &AssemblyRequest<'_>) -> Result<Scene>;
}

/// Closed-form staging of a mid-air collision.
///
/// Object 1 is released at rest `g t² / 2` above the collision height.
/// Object 2 starts `xy_distance` away at bearing `theta`, `z_offset` higher,
/// with a horizontal velocity that carries it to object 1's vertical line in
/// exactly `collision_time` seconds. Both fall under the same gravity, so
/// their relative motion is a straight line and the centers meet at
/// `collision_time` with object 2 slightly below object 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MidAirStaging {
    /// Seconds from release to collision.
    pub collision_time: f64,
    /// Horizontal separation at release (m).
    pub xy_distance: f64,
    /// Extra height of object 2 at release (m).
    pub z_offset: f64,
    /// Height of the collision point (m).
    pub collision_height: f64,
    /// Vertical gravity, negative is down (m/s²).
    pub gravity_z: f64,
}

impl From<&CollisionParams> for MidAirStaging {
    fn from(p: &CollisionParams) -> Self {
        Self {
            collision_time: p.collision_time,
            xy_distance: p.xy_distance,
            z_offset: p.z_offset,
            collision_height: p.collision_height,
            gravity_z: p.gravity_z,
        }
    }
}

impl From<&SolidityParams> for MidAirStaging {
    fn from(p: &SolidityParams) -> Self {
        Self {
            collision_time: p.collision_time,
            xy_distance: p.xy_distance,
            z_offset: p.z_offset,
            collision_height: p.collision_height,
            gravity_z: p.gravity_z,
        }
    }
}

impl MidAirStaging {
    /// Height fallen before the collision.
    #[must_use]
    pub fn fall_distance(&self) -> f64 {
        self.gravity_z.abs() * self.collision_time * self.collision_time / 2.0
    }

    /// Initial states of both objects, with object 1 above `(x, y)`.
    #[must_use]
    pub fn place(&self, x: f64, y: f64, theta: f64) -> [ObjectState; 2] {
        let t = self.collision_time;
        let p1 = Point3::new(x, y, self.collision_height + self.fall_distance());
        let p2 = p1
            + Vector3::new(
                self.xy_distance * theta.cos(),
                self.xy_distance * theta.sin(),
                self.z_offset,
            );
        let v2 = Vector3::new(
            (p1.x - p2.x) / t,
            (p1.y - p2.y) / t,
            -(self.z_offset + 0.02) / t,
        );
        [
            ObjectState::at_rest(p1),
            ObjectState::at_rest(p2).with_velocity(v2),
        ]
    }

    /// Frame at which the centers meet.
    #[must_use]
    pub fn collision_frame(&self, frame_rate: u32) -> Frame {
        (self.collision_time * f64::from(frame_rate)).round() as Frame
    }
}

/// Camera paths offered to the controller for `kind`.
///
/// Continuity scenes orbit along the eleven templates; the other kinds use
/// three stationary viewpoints.
#[must_use]
pub fn default_camera_paths(kind: &SceneKind, frame_end: Frame) -> Vec<CameraPath> {
    match kind {
        SceneKind::Continuity(_) => CameraPath::continuity_templates(frame_end),
        _ => [("left", -30.0), ("front", 0.0), ("right", 30.0)]
            .into_iter()
            .map(|(name, az)| CameraPath::new(format!("fixed_{name}"), [0.0; 3], vec![(0, az)]))
            .collect(),
    }
}

/// The assembler used by the command-line generator.
#[derive(Debug, Clone)]
pub struct StandardAssembler<C> {
    catalog: C,
    scene_config: SceneConfig,
    /// Height of the support surface (m).
    pub table_height: f64,
    /// Horizontal distance of the camera from its target (m).
    pub camera_radius: f64,
    /// Height of the camera above its target (m).
    pub camera_height: f64,
}

impl<C: AssetCatalog> StandardAssembler<C> {
    /// Create an assembler drawing assets from `catalog`.
    #[must_use]
    pub fn new(catalog: C, scene_config: SceneConfig) -> Self {
        Self {
            catalog,
            scene_config,
            table_height: 0.75,
            camera_radius: 3.0,
            camera_height: 0.7,
        }
    }

    /// The catalog.
    #[must_use]
    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    fn pick(&self, rng: &mut ChaCha8Rng, class: AssetClass) -> Result<String> {
        self.catalog
            .asset_ids(class)
            .choose(rng)
            .cloned()
            .ok_or_else(|| ProbeError::asset(format!("{class:?}"), "no assets of this class"))
    }

    fn add_floor(scene: &mut Scene) -> Result<()> {
        scene.add(
            SceneObject::new("floor", "floor", Shape::cuboid(Vector3::new(10.0, 10.0, 0.5)))
                .with_role(ObjectRole::Floor)
                .with_friction(0.8)
                .with_restitution(0.2)
                .with_position(Point3::new(0.0, 0.0, -0.5)),
        )?;
        Ok(())
    }

    fn add_table(
        &self,
        scene: &mut Scene,
        rng: &mut ChaCha8Rng,
        exclusions: &ExclusionList,
    ) -> Result<()> {
        let candidates: Vec<String> = self
            .catalog
            .asset_ids(AssetClass::Table)
            .into_iter()
            .filter(|id| !exclusions.contains(id))
            .collect();
        let asset = candidates
            .choose(rng)
            .ok_or_else(|| ProbeError::asset("table", "every support asset is excluded"))?;
        let table = self.catalog.create(asset, "table")?;
        let half = table.local_aabb().height() / 2.0;
        scene.add(
            table
                .with_role(ObjectRole::Support)
                .with_position(Point3::new(0.0, 0.0, self.table_height - half)),
        )?;
        Ok(())
    }

    fn add_mid_air_pair(
        &self,
        scene: &mut Scene,
        rng: &mut ChaCha8Rng,
        staging: &MidAirStaging,
    ) -> Result<Point3<f64>> {
        let x = rng.gen_range(-0.2..0.2);
        let y = rng.gen_range(-0.2..0.2);
        let side = if rng.gen_bool(0.5) { 0.0 } else { PI };
        let theta = rng.gen_range(-PI / 8.0..PI / 8.0) + side;
        let states = staging.place(x, y, theta);
        for (i, state) in states.into_iter().enumerate() {
            let asset = self.pick(rng, AssetClass::Small)?;
            let object = self
                .catalog
                .create(&asset, &format!("test_{i}"))?
                .with_role(ObjectRole::Test)
                .with_state(state);
            scene.add(object)?;
        }
        Ok(Point3::new(x, y, staging.collision_height))
    }

    fn add_occluded_object(&self, scene: &mut Scene, rng: &mut ChaCha8Rng) -> Result<Point3<f64>> {
        let top = scene.support_top(0).unwrap_or(0.0);
        let asset = self.pick(rng, AssetClass::Big)?;
        let occluder = self.catalog.create(&asset, "occluder")?;
        let depth = occluder.local_aabb().extents().y / 2.0;
        let occluder = occluder.with_role(ObjectRole::Static).resting_on(0.0, 0.0, top);
        scene.add(occluder)?;

        let asset = self.pick(rng, AssetClass::Small)?;
        let x = rng.gen_range(-0.3..0.3);
        let y = depth + rng.gen_range(0.1..0.25);
        let object = self
            .catalog
            .create(&asset, "test_0")?
            .with_role(ObjectRole::Test)
            .resting_on(x, y, top);
        scene.add(object)?;
        Ok(Point3::new(0.0, 0.0, top))
    }

    fn add_dropped_object(
        &self,
        scene: &mut Scene,
        rng: &mut ChaCha8Rng,
        params: &SupportParams,
    ) -> Result<Point3<f64>> {
        let table = scene.world_aabb(scene.id_of("table")?, 0)?;
        let top = table.max.z;
        let asset = self.pick(rng, AssetClass::Small)?;
        let (lo, hi) = params.drop_height;
        let drop = rng.gen_range(lo..=hi);
        let x = match params.variant {
            SupportVariant::PassThrough => 0.0,
            SupportVariant::Float => {
                let gap = rng.gen_range(0.1..0.2);
                if rng.gen_bool(0.5) {
                    table.max.x + gap
                } else {
                    table.min.x - gap
                }
            }
        };
        let object = self
            .catalog
            .create(&asset, "test_0")?
            .with_role(ObjectRole::Test)
            .resting_on(x, 0.0, top + drop);
        scene.add(object)?;
        Ok(Point3::new(x, 0.0, top))
    }

    fn add_background_statics(&self, scene: &mut Scene, rng: &mut ChaCha8Rng) -> Result<()> {
        let (area, base) = match scene.id_of("table") {
            Ok(id) => {
                let aabb = scene.world_aabb(id, 0)?;
                (aabb, aabb.max.z)
            }
            Err(_) => (
                probe_types::Aabb::new(Point3::new(-2.0, -2.0, 0.0), Point3::new(2.0, 2.0, 0.0)),
                scene.floor_top(0).unwrap_or(0.0),
            ),
        };
        for i in 0..self.scene_config.static_objects {
            let asset = self.pick(rng, AssetClass::Small)?;
            let template = self.catalog.create(&asset, &format!("static_{i}"))?;
            let placed = (0..PLACEMENT_TRIES).find_map(|_| {
                let x = rng.gen_range(area.min.x..=area.max.x);
                let y = rng.gen_range(area.min.y..=area.max.y);
                let candidate = template
                    .clone()
                    .with_role(ObjectRole::Static)
                    .resting_on(x, y, base);
                let aabb = candidate.aabb_at(&candidate.initial);
                let clear = scene
                    .objects()
                    .filter(|o| !matches!(o.role, ObjectRole::Floor | ObjectRole::Support))
                    .all(|o| !o.aabb_at(&o.initial).overlaps(&aabb));
                clear.then_some(candidate)
            });
            match placed {
                Some(object) => {
                    scene.add(object)?;
                }
                None => trace!(index = i, "no free spot for background object"),
            }
        }
        Ok(())
    }

    fn add_background_dynamics(&self, scene: &mut Scene, rng: &mut ChaCha8Rng) -> Result<()> {
        for i in 0..self.scene_config.dynamic_objects {
            let asset = self.pick(rng, AssetClass::Small)?;
            let x: f64 = rng.gen_range(-3.0..3.0);
            let position = Point3::new(x, rng.gen_range(0.5..1.5), rng.gen_range(3.0..5.0));
            let mut velocity: Vector3<f64> = Vector3::from_fn(|_, _| rng.gen_range(-3.0..3.0));
            // Throw toward the middle of the scene.
            velocity.x = -x.signum() * velocity.x.abs();
            let object = self
                .catalog
                .create(&asset, &format!("dynamic_{i}"))?
                .with_role(ObjectRole::Dynamic)
                .with_state(ObjectState::at_rest(position).with_velocity(velocity));
            scene.add(object)?;
        }
        Ok(())
    }
}

impl<C: AssetCatalog> SceneAssembler for StandardAssembler<C> {
    fn assemble(&mut self, request: &AssemblyRequest<'_>) -> Result<Scene> {
        let mut rng = ChaCha8Rng::seed_from_u64(request.seed);
        let kind = request.kind;
        let mut scene = Scene::from_config(&self.scene_config)
            .with_gravity(Vector3::new(0.0, 0.0, kind.gravity_z()));

        Self::add_floor(&mut scene)?;
        if matches!(kind, SceneKind::Continuity(_) | SceneKind::Support(_)) {
            self.add_table(&mut scene, &mut rng, request.exclusions)?;
        }
        let target = match kind {
            SceneKind::Collision(p) => {
                self.add_mid_air_pair(&mut scene, &mut rng, &MidAirStaging::from(p))?
            }
            SceneKind::Solidity(p) => {
                self.add_mid_air_pair(&mut scene, &mut rng, &MidAirStaging::from(p))?
            }
            SceneKind::Continuity(_) => self.add_occluded_object(&mut scene, &mut rng)?,
            SceneKind::Support(p) => self.add_dropped_object(&mut scene, &mut rng, p)?,
        };
        self.add_background_statics(&mut scene, &mut rng)?;
        self.add_background_dynamics(&mut scene, &mut rng)?;

        scene.add_camera(
            CAMERA_NAME,
            CameraRig::orbit(
                request.camera_path.clone(),
                target,
                self.camera_radius,
                self.camera_height,
            ),
        );
        debug!(
            kind = kind.name(),
            path = %request.camera_path.name,
            objects = scene.len(),
            "assembled candidate"
        );
        Ok(scene)
    }
}
