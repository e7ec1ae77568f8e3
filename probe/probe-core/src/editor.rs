//! Trajectory editing.
//!
//! [`TrajectoryEditor::apply`] turns an accepted baseline into a
//! violation / non-violation pair:
//!
//! 1. the test objects' baseline timelines are saved as
//!    [`Slot::NonViolation`]
//! 2. the edit selected by the gate's [`Acceptance`] is written through the
//!    keyframe store
//! 3. the edited timelines are saved as [`Slot::Violation`]
//!
//! The store is left holding the violation trajectories.
//!
//! # Contained re-simulation
//!
//! Teleport, both support failures, and the solidity breach re-run the
//! simulator. A run rewrites every dynamic object, so background dynamic
//! objects are snapshotted before the run and restored right after it,
//! whether the run succeeded or not. The snapshot is also kept in
//! [`Slot::Background`].

use probe_keyframes::{SceneState, Slot};
use probe_types::{
    EditorConfig, Frame, ObjectId, ObjectRole, ObjectState, Point3, ProbeError, Result, SceneKind,
    Shape, Vector3, ViolationKind,
};
use probe_world::{Scene, SceneObject, SimulationRun, Simulator};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

use crate::Acceptance;

/// Name of the hidden collider inserted by the float edit.
pub const AUX_COLLIDER_NAME: &str = "aux_collider";

/// Half thickness of the hidden collider (m).
const AUX_HALF_THICKNESS: f64 = 0.005;

/// Applies violation edits to accepted scenes.
#[derive(Debug, Clone)]
pub struct TrajectoryEditor {
    config: EditorConfig,
    rng: ChaCha8Rng,
}

impl TrajectoryEditor {
    /// Create an editor whose random draws are seeded by `seed`.
    #[must_use]
    pub fn new(config: EditorConfig, seed: u64) -> Self {
        Self {
            config,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Edit magnitudes in use.
    #[must_use]
    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Produce the violation / non-violation pair for an accepted scene.
    pub fn apply<S>(
        &mut self,
        scene: &mut Scene,
        sim: &mut S,
        kind: &SceneKind,
        acceptance: &Acceptance,
        state: &mut SceneState,
    ) -> Result<()>
    where
        S: Simulator + ?Sized,
    {
        let tests = scene.test_ids();
        if tests.is_empty() {
            return Err(ProbeError::invalid_config("scene has no test objects"));
        }
        state.save(Slot::NonViolation, scene.store().snapshot(&tests));

        let pivot = acceptance.pivot.frame();
        info!(
            kind = kind.name(),
            violation = acceptance.violation.name(),
            pivot,
            "applying violation"
        );
        match acceptance.violation {
            ViolationKind::CollisionFreeze => self.collision_freeze(scene, &tests, pivot)?,
            ViolationKind::Disappear => self.disappear(scene, &tests, pivot)?,
            ViolationKind::Teleport => self.teleport(scene, sim, &tests, pivot, state)?,
            ViolationKind::SupportFloat => self.support_float(scene, sim, &tests, state)?,
            ViolationKind::SupportPassThrough => {
                self.support_pass_through(scene, sim, state)?;
            }
            ViolationKind::SolidityBreach => Self::solidity_breach(scene, sim, &tests, state)?,
        }

        state.save(Slot::Violation, scene.store().snapshot(&tests));
        Ok(())
    }

    /// Hold horizontal position at its pivot value and zero horizontal
    /// velocity from the pivot on. Vertical motion is untouched.
    pub fn collision_freeze(
        &self,
        scene: &mut Scene,
        objects: &[ObjectId],
        pivot: Frame,
    ) -> Result<()> {
        for &id in objects {
            let held = scene.store().read(id, pivot)?.position;
            for frame in pivot..=scene.frame_end() {
                let mut s = scene.store().read(id, frame)?;
                s.position.x = held.x;
                s.position.y = held.y;
                s.velocity.x = 0.0;
                s.velocity.y = 0.0;
                scene.store_mut().record(id, frame, s)?;
            }
        }
        Ok(())
    }

    /// Send the objects below the support from the pivot on. Horizontal
    /// position and orientation are untouched.
    pub fn disappear(&self, scene: &mut Scene, objects: &[ObjectId], pivot: Frame) -> Result<()> {
        let surface = scene.reference_height(pivot);
        let target = self.config.disappear_height;
        if target >= surface {
            return Err(ProbeError::invalid_config(format!(
                "disappear height {target} is not below the surface at {surface}"
            )));
        }
        for &id in objects {
            let half_height = scene.object(id)?.local_aabb().height() / 2.0;
            for frame in pivot..=scene.frame_end() {
                let mut s = scene.store().read(id, frame)?;
                // Keep the whole object below the surface.
                s.position.z = target.min(surface - half_height - 1e-3);
                scene.store_mut().record(id, frame, s)?;
            }
        }
        Ok(())
    }

    fn teleport<S>(
        &mut self,
        scene: &mut Scene,
        sim: &mut S,
        objects: &[ObjectId],
        pivot: Frame,
        state: &mut SceneState,
    ) -> Result<()>
    where
        S: Simulator + ?Sized,
    {
        let (lo, hi) = self.config.teleport_offset;
        for &id in objects {
            let magnitude = self.rng.gen_range(lo..=hi);
            let sign = if self.rng.gen_bool(0.5) { 1.0 } else { -1.0 };
            let axis = if self.rng.gen_bool(0.5) { Vector3::x() } else { Vector3::y() };
            let mut s = scene.store().read(id, pivot)?;
            s.position += axis * (sign * magnitude);
            debug!(object = %id, pivot, offset = sign * magnitude, "teleporting");
            scene.store_mut().record(id, pivot, s)?;
        }
        if pivot < scene.frame_end() {
            resimulate_contained(scene, sim, pivot, state)?;
        }
        Ok(())
    }

    fn support_float<S>(
        &mut self,
        scene: &mut Scene,
        sim: &mut S,
        objects: &[ObjectId],
        state: &mut SceneState,
    ) -> Result<()>
    where
        S: Simulator + ?Sized,
    {
        let &[object, ..] = objects else {
            return Err(ProbeError::invalid_config("float edit needs a test object"));
        };
        let surface = scene.reference_height(0);
        let (lo, hi) = self.config.float_gap;
        let top = surface + self.rng.gen_range(lo..=hi);
        let start = scene.state_at(object, 0)?.position;
        let aux = insert_aux_collider(scene, &start, top)?;
        debug!(%aux, top, "inserted hidden collider");
        resimulate_contained(scene, sim, 0, state)?;
        Ok(())
    }

    fn support_pass_through<S>(
        &self,
        scene: &mut Scene,
        sim: &mut S,
        state: &mut SceneState,
    ) -> Result<()>
    where
        S: Simulator + ?Sized,
    {
        let supports = scene.ids_with_role(ObjectRole::Support);
        let Some(&support) = supports.first() else {
            return Err(ProbeError::invalid_config("pass-through edit needs a support"));
        };
        let saved = scene.store().snapshot(&[support]);
        let initial = scene.object(support)?.initial;
        let drop = Vector3::new(0.0, 0.0, -self.config.pass_through_drop);

        scene.set_initial_state(support, displaced(initial, &drop))?;
        if let Some(timeline) = saved.get(support) {
            let lowered: Vec<(Frame, ObjectState)> = timeline
                .iter()
                .map(|(f, s)| (f, displaced(*s, &drop)))
                .collect();
            for (frame, s) in lowered {
                scene.store_mut().record(support, frame, s)?;
            }
        }

        let run = resimulate_contained(scene, sim, 0, state);
        scene.set_initial_state(support, initial)?;
        scene.store_mut().restore(&[support], &saved)?;
        run.map(|_| ())
    }

    fn solidity_breach<S>(
        scene: &mut Scene,
        sim: &mut S,
        objects: &[ObjectId],
        state: &mut SceneState,
    ) -> Result<()>
    where
        S: Simulator + ?Sized,
    {
        for &id in objects {
            let others: Vec<ObjectId> = objects.iter().copied().filter(|o| *o != id).collect();
            for &other in &others {
                scene.set_dynamic(other, false)?;
            }
            debug!(object = %id, "re-simulating in isolation");
            let run = resimulate_contained(scene, sim, 0, state);
            for &other in &others {
                scene.set_dynamic(other, true)?;
            }
            run?;
        }
        Ok(())
    }
}

fn displaced(mut state: ObjectState, offset: &Vector3<f64>) -> ObjectState {
    state.position += offset;
    state
}

/// Insert the hidden static slab whose top is at `top`, centered under
/// `above`, with a complete timeline.
fn insert_aux_collider(scene: &mut Scene, above: &Point3<f64>, top: f64) -> Result<ObjectId> {
    let center = Point3::new(above.x, above.y, top - AUX_HALF_THICKNESS);
    let slab = SceneObject::new(
        AUX_COLLIDER_NAME,
        AUX_COLLIDER_NAME,
        Shape::cuboid(Vector3::new(1.0, 1.0, AUX_HALF_THICKNESS)),
    )
    .with_role(ObjectRole::Auxiliary)
    .with_friction(1.0)
    .with_restitution(0.0)
    .with_position(center)
    .hidden();
    let id = scene.add(slab)?;
    let resting = scene.object(id)?.initial;
    for frame in 0..=scene.frame_end() {
        scene.store_mut().record(id, frame, resting)?;
    }
    Ok(id)
}

/// Run `sim` from `frame_start` to the end of the clip while shielding
/// background dynamic objects.
///
/// Their timelines are snapshotted into [`Slot::Background`] first and
/// restored after the run, even when the run fails.
pub fn resimulate_contained<S>(
    scene: &mut Scene,
    sim: &mut S,
    frame_start: Frame,
    state: &mut SceneState,
) -> Result<SimulationRun>
where
    S: Simulator + ?Sized,
{
    let bystanders = scene.bystander_ids();
    let shielded = scene.store().snapshot(&bystanders);
    let frame_end = scene.frame_end();
    let run = sim.run(scene, frame_start, frame_end);
    scene.store_mut().restore(&bystanders, &shielded)?;
    debug!(
        frame_start,
        shielded = bystanders.len(),
        "contained re-simulation finished"
    );
    state.save(Slot::Background, shielded);
    run
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use probe_types::{ContinuityParams, PivotFrame};

    fn falling_scene() -> (Scene, ObjectId) {
        let mut scene = Scene::new(12, 12);
        scene
            .add(
                SceneObject::new("table", "table", Shape::cuboid(Vector3::new(1.0, 1.0, 0.05)))
                    .with_role(ObjectRole::Support)
                    .with_position(Point3::new(0.0, 0.0, 0.7)),
            )
            .unwrap();
        let ball = scene
            .add(
                SceneObject::new("ball", "ball", Shape::sphere(0.1))
                    .with_role(ObjectRole::Test)
                    .with_state(
                        ObjectState::at_rest(Point3::new(0.0, 0.0, 1.5))
                            .with_velocity(Vector3::new(0.4, -0.2, 0.0)),
                    ),
            )
            .unwrap();
        scene.bake_static_keyframes().unwrap();
        probe_world::RigidBodySimulator::default()
            .run(&mut scene, 0, 12)
            .unwrap();
        (scene, ball)
    }

    #[test]
    fn test_collision_freeze_holds_horizontal() {
        let (mut scene, ball) = falling_scene();
        let before = scene.store().snapshot(&[ball]);
        let editor = TrajectoryEditor::new(EditorConfig::default(), 1);
        editor.collision_freeze(&mut scene, &[ball], 5).unwrap();

        let held = scene.store().read(ball, 5).unwrap().position;
        for frame in 5..=12 {
            let s = scene.store().read(ball, frame).unwrap();
            assert_eq!((s.position.x, s.position.y), (held.x, held.y));
            assert_eq!((s.velocity.x, s.velocity.y), (0.0, 0.0));
            let baseline = before.get(ball).unwrap().get(frame).unwrap();
            assert_eq!(s.position.z, baseline.position.z);
        }
        for frame in 0..5 {
            let baseline = before.get(ball).unwrap().get(frame).unwrap();
            assert_eq!(&scene.store().read(ball, frame).unwrap(), baseline);
        }
    }

    #[test]
    fn test_disappear_only_touches_height() {
        let (mut scene, ball) = falling_scene();
        let before = scene.store().snapshot(&[ball]);
        let editor = TrajectoryEditor::new(EditorConfig::default(), 1);
        editor.disappear(&mut scene, &[ball], 4).unwrap();
        let surface = scene.reference_height(4);
        for frame in 0..=12 {
            let s = scene.store().read(ball, frame).unwrap();
            let b = before.get(ball).unwrap().get(frame).unwrap();
            assert_eq!((s.position.x, s.position.y), (b.position.x, b.position.y));
            assert_eq!(s.orientation, b.orientation);
            if frame >= 4 {
                assert!(scene.world_aabb(ball, frame).unwrap().max.z < surface);
            } else {
                assert_eq!(s.position.z, b.position.z);
            }
        }
    }

    #[test]
    fn test_disappear_above_surface_is_config_error() {
        let (mut scene, ball) = falling_scene();
        let config = EditorConfig {
            disappear_height: 2.0,
            ..Default::default()
        };
        let err = TrajectoryEditor::new(config, 1)
            .disappear(&mut scene, &[ball], 4)
            .unwrap_err();
        assert!(matches!(err, ProbeError::InvalidConfig(_)));
    }

    #[test]
    fn test_apply_fills_both_slots() {
        let (mut scene, ball) = falling_scene();
        let baseline = scene.store().snapshot(&[ball]);
        let mut editor = TrajectoryEditor::new(EditorConfig::default(), 1);
        let mut state = SceneState::new();
        let acceptance = Acceptance {
            pivot: PivotFrame::new(6),
            violation: ViolationKind::Teleport,
        };
        let kind = SceneKind::Continuity(ContinuityParams::default());
        let mut sim = probe_world::RigidBodySimulator::default();
        editor
            .apply(&mut scene, &mut sim, &kind, &acceptance, &mut state)
            .unwrap();

        assert!(state.is_complete());
        assert_eq!(state.get(Slot::NonViolation).unwrap(), &baseline);
        let edited = state.get(Slot::Violation).unwrap().get(ball).unwrap();
        let original = baseline.get(ball).unwrap();
        let jump = (edited.get(6).unwrap().position - original.get(6).unwrap().position).norm();
        assert!((0.3..=0.8 + 1e-12).contains(&jump), "jump {jump}");
        for frame in 0..6 {
            assert_eq!(edited.get(frame), original.get(frame));
        }
        // Velocity survives the jump.
        assert_relative_eq!(
            edited.get(6).unwrap().velocity,
            original.get(6).unwrap().velocity
        );
    }
}
