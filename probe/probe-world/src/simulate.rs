//! Simulator interface and the reference rigid-body stepper.
//!
//! A [`Simulator`] advances the scene from `frame_start` to `frame_end`,
//! records one keyframe per frame for every dynamic object, and reports the
//! collisions it observed.
//!
//! # Reference stepper
//!
//! [`RigidBodySimulator`] integrates with semi-implicit Euler over a fixed
//! number of substeps per frame:
//!
//! 1. Apply gravity to dynamic velocities
//! 2. Resolve contacts with restitution and Coulomb friction impulses
//! 3. Integrate positions and orientations
//! 4. Push penetrating pairs apart
//!
//! Dynamic objects collide as their bounding spheres. Static objects keep
//! their true shape (sphere or oriented box) and are frozen at their state at
//! `frame_start` for the whole run.

use hashbrown::HashSet;
use nalgebra::UnitQuaternion;
use probe_types::{
    CollisionEvent, Frame, ObjectId, ObjectState, Point3, ProbeError, Result, Shape, Vector3,
};
use tracing::{debug, trace};

use crate::Scene;

/// Outcome of one simulator run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimulationRun {
    /// Contacts between distinct pairs, at most one per pair and frame.
    pub collisions: Vec<CollisionEvent>,
    /// Dynamic object states at `frame_end`.
    pub final_states: Vec<(ObjectId, ObjectState)>,
}

impl SimulationRun {
    /// Events involving `id`.
    pub fn collisions_of(&self, id: ObjectId) -> impl Iterator<Item = &CollisionEvent> {
        self.collisions.iter().filter(move |e| e.involves(id))
    }
}

/// What the core consumes from a physics engine.
pub trait Simulator {
    /// Advance from `frame_start` to `frame_end`, writing keyframes for every
    /// dynamic object at every frame in between (both ends included).
    fn run(&mut self, scene: &mut Scene, frame_start: Frame, frame_end: Frame)
        -> Result<SimulationRun>;
}

/// Semi-implicit Euler stepper with sphere proxies.
#[derive(Debug, Clone, PartialEq)]
pub struct RigidBodySimulator {
    /// Integration substeps per frame.
    pub substeps: u32,
    /// Penetration tolerated before positional correction (m).
    pub slop: f64,
    /// Fraction of the remaining penetration removed per substep.
    pub correction: f64,
}

impl Default for RigidBodySimulator {
    fn default() -> Self {
        Self {
            substeps: 20,
            slop: 1e-3,
            correction: 0.8,
        }
    }
}

#[derive(Debug, Clone)]
struct Body {
    id: ObjectId,
    state: ObjectState,
    collider: Collider,
    inv_mass: f64,
    friction: f64,
    restitution: f64,
}

#[derive(Debug, Clone, Copy)]
enum Collider {
    Sphere(f64),
    Cuboid(Vector3<f64>),
}

/// Contact normal from `a` toward `b` and penetration depth.
struct Contact {
    normal: Vector3<f64>,
    depth: f64,
}

impl RigidBodySimulator {
    /// Create a stepper with `substeps` substeps per frame.
    #[must_use]
    pub fn new(substeps: u32) -> Self {
        Self {
            substeps: substeps.max(1),
            ..Default::default()
        }
    }

    fn collect_bodies(scene: &Scene, frame_start: Frame) -> Result<Vec<Body>> {
        scene
            .objects()
            .map(|obj| {
                let state = scene.state_at(obj.id, frame_start)?;
                let collider = if obj.dynamic {
                    Collider::Sphere(obj.proxy_radius())
                } else {
                    match obj.shape {
                        Shape::Sphere { radius } => Collider::Sphere(radius * obj.scale),
                        Shape::Cuboid { half_extents } => {
                            Collider::Cuboid(half_extents * obj.scale)
                        }
                    }
                };
                Ok(Body {
                    id: obj.id,
                    state,
                    collider,
                    inv_mass: obj.inverse_mass(),
                    friction: obj.friction,
                    restitution: obj.restitution,
                })
            })
            .collect()
    }

    fn substep(
        &self,
        bodies: &mut [Body],
        gravity: &Vector3<f64>,
        h: f64,
    ) -> Vec<(ObjectId, ObjectId)> {
        for body in bodies.iter_mut().filter(|b| b.inv_mass > 0.0) {
            body.state.velocity += gravity * h;
        }

        let mut touching = Vec::new();
        for i in 0..bodies.len() {
            for j in (i + 1)..bodies.len() {
                if bodies[i].inv_mass == 0.0 && bodies[j].inv_mass == 0.0 {
                    continue;
                }
                let Some(contact) = contact(&bodies[i], &bodies[j]) else {
                    continue;
                };
                touching.push((bodies[i].id, bodies[j].id));
                let (left, right) = bodies.split_at_mut(j);
                resolve_velocity(&mut left[i], &mut right[0], &contact);
            }
        }

        for body in bodies.iter_mut().filter(|b| b.inv_mass > 0.0) {
            body.state.position += body.state.velocity * h;
            let spin = UnitQuaternion::from_scaled_axis(body.state.angular_velocity * h);
            body.state.orientation = spin * body.state.orientation;
        }

        for i in 0..bodies.len() {
            for j in (i + 1)..bodies.len() {
                let total = bodies[i].inv_mass + bodies[j].inv_mass;
                if total == 0.0 {
                    continue;
                }
                let Some(c) = contact(&bodies[i], &bodies[j]) else {
                    continue;
                };
                if c.depth <= self.slop {
                    continue;
                }
                let push = c.normal * ((c.depth - self.slop) * self.correction / total);
                let (inv_a, inv_b) = (bodies[i].inv_mass, bodies[j].inv_mass);
                bodies[i].state.position -= push * inv_a;
                bodies[j].state.position += push * inv_b;
            }
        }
        touching
    }
}

impl Simulator for RigidBodySimulator {
    fn run(
        &mut self,
        scene: &mut Scene,
        frame_start: Frame,
        frame_end: Frame,
    ) -> Result<SimulationRun> {
        let frame_end = frame_end.min(scene.frame_end());
        if frame_start > frame_end {
            return Err(ProbeError::simulation(format!(
                "empty frame range {frame_start}..={frame_end}"
            )));
        }
        let mut bodies = Self::collect_bodies(scene, frame_start)?;
        let gravity = scene.gravity();
        let h = 1.0 / f64::from(scene.frame_rate()) / f64::from(self.substeps);
        debug!(
            frame_start,
            frame_end,
            bodies = bodies.len(),
            substeps = self.substeps,
            "simulating"
        );

        for body in bodies.iter().filter(|b| b.inv_mass > 0.0) {
            scene.store_mut().record(body.id, frame_start, body.state)?;
        }

        let mut seen: HashSet<(ObjectId, ObjectId)> = HashSet::new();
        let mut collisions = Vec::new();
        for frame in (frame_start + 1)..=frame_end {
            seen.clear();
            for _ in 0..self.substeps {
                for (a, b) in self.substep(&mut bodies, &gravity, h) {
                    if seen.insert((a, b)) {
                        collisions.push(CollisionEvent::new(frame, a, b));
                    }
                }
            }
            for body in bodies.iter().filter(|b| b.inv_mass > 0.0) {
                if !body.state.is_finite() {
                    return Err(ProbeError::simulation(format!(
                        "{} diverged at frame {frame}",
                        body.id
                    )));
                }
                scene.store_mut().record(body.id, frame, body.state)?;
            }
        }

        trace!(events = collisions.len(), "simulation finished");
        Ok(SimulationRun {
            collisions,
            final_states: bodies
                .iter()
                .filter(|b| b.inv_mass > 0.0)
                .map(|b| (b.id, b.state))
                .collect(),
        })
    }
}

fn contact(a: &Body, b: &Body) -> Option<Contact> {
    match (a.collider, b.collider) {
        (Collider::Sphere(ra), Collider::Sphere(rb)) => {
            sphere_sphere(&a.state.position, ra, &b.state.position, rb)
        }
        (Collider::Sphere(r), Collider::Cuboid(half)) => {
            sphere_box(&a.state.position, r, &b.state, &half).map(|c| Contact {
                normal: -c.normal,
                depth: c.depth,
            })
        }
        (Collider::Cuboid(half), Collider::Sphere(r)) => {
            sphere_box(&b.state.position, r, &a.state, &half)
        }
        // Two boxes are only ever both static.
        (Collider::Cuboid(_), Collider::Cuboid(_)) => None,
    }
}

fn sphere_sphere(pa: &Point3<f64>, ra: f64, pb: &Point3<f64>, rb: f64) -> Option<Contact> {
    let delta = pb - pa;
    let dist = delta.norm();
    let depth = ra + rb - dist;
    if depth < 0.0 {
        return None;
    }
    let normal = if dist > 1e-12 { delta / dist } else { Vector3::z() };
    Some(Contact { normal, depth })
}

/// Contact with the normal pointing from the box toward the sphere.
fn sphere_box(
    center: &Point3<f64>,
    radius: f64,
    pose: &ObjectState,
    half: &Vector3<f64>,
) -> Option<Contact> {
    let inv = pose.orientation.inverse();
    let local = inv * (center - pose.position);
    let clamped = Vector3::new(
        local.x.clamp(-half.x, half.x),
        local.y.clamp(-half.y, half.y),
        local.z.clamp(-half.z, half.z),
    );
    let delta = local - clamped;
    let dist = delta.norm();

    let (local_normal, depth) = if dist > 1e-12 {
        (delta / dist, radius - dist)
    } else {
        // Center inside the box: exit through the nearest face.
        let mut axis = 0;
        let mut best = f64::INFINITY;
        for i in 0..3 {
            let gap = half[i] - local[i].abs();
            if gap < best {
                best = gap;
                axis = i;
            }
        }
        let mut n = Vector3::zeros();
        n[axis] = if local[axis] >= 0.0 { 1.0 } else { -1.0 };
        (n, radius + best)
    };
    if depth < 0.0 {
        return None;
    }
    Some(Contact {
        normal: pose.orientation * local_normal,
        depth,
    })
}

fn resolve_velocity(a: &mut Body, b: &mut Body, c: &Contact) {
    let total = a.inv_mass + b.inv_mass;
    if total == 0.0 {
        return;
    }
    let relative = b.state.velocity - a.state.velocity;
    let vn = relative.dot(&c.normal);
    if vn >= 0.0 {
        return;
    }
    let restitution = a.restitution * b.restitution;
    let jn = -(1.0 + restitution) * vn / total;

    let tangent_velocity = relative - c.normal * vn;
    let vt = tangent_velocity.norm();
    let mu = (a.friction * b.friction).max(0.0).sqrt();
    let friction = if vt > 1e-9 {
        let jt = (vt / total).min(mu * jn);
        -tangent_velocity / vt * jt
    } else {
        Vector3::zeros()
    };

    let impulse = c.normal * jn + friction;
    a.state.velocity -= impulse * a.inv_mass;
    b.state.velocity += impulse * b.inv_mass;
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::SceneObject;
    use approx::assert_relative_eq;
    use probe_types::{ObjectRole, first_collision_between};

    fn floor() -> SceneObject {
        SceneObject::new("floor", "floor", Shape::cuboid(Vector3::new(10.0, 10.0, 0.5)))
            .with_role(ObjectRole::Floor)
            .with_position(Point3::new(0.0, 0.0, -0.5))
    }

    #[test]
    fn test_free_fall_matches_closed_form() {
        let mut scene = Scene::new(12, 12).with_gravity(Vector3::new(0.0, 0.0, -2.0));
        let ball = scene
            .add(
                SceneObject::new("ball", "ball", Shape::sphere(0.1))
                    .with_role(ObjectRole::Test)
                    .with_position(Point3::new(0.0, 0.0, 10.0)),
            )
            .unwrap();
        let mut sim = RigidBodySimulator::new(100);
        let run = sim.run(&mut scene, 0, 12).unwrap();
        assert!(run.collisions.is_empty());
        // One second of fall at 2 m/s² is 1 m.
        let z = scene.store().read(ball, 12).unwrap().position.z;
        assert_relative_eq!(z, 9.0, epsilon = 0.02);
        assert!(scene.store().timeline(ball).unwrap().is_complete(12));
    }

    #[test]
    fn test_ball_comes_to_rest_on_floor() {
        let mut scene = Scene::new(36, 12);
        let ball = scene
            .add(
                SceneObject::new("ball", "ball", Shape::sphere(0.1))
                    .with_role(ObjectRole::Test)
                    .with_restitution(0.0)
                    .with_position(Point3::new(0.0, 0.0, 0.6)),
            )
            .unwrap();
        let floor = scene.add(floor()).unwrap();
        let run = RigidBodySimulator::default().run(&mut scene, 0, 36).unwrap();

        let end = scene.store().read(ball, 36).unwrap();
        assert_relative_eq!(end.position.z, 0.1, epsilon = 0.01);
        assert!(end.velocity.norm() < 0.05);
        assert!(first_collision_between(&run.collisions, ball, floor).unwrap() > 0);
        // The floor is static and gets no keyframes from the run.
        assert!(scene.store().timeline(floor).is_none());
    }

    #[test]
    fn test_head_on_spheres_exchange_momentum() {
        let mut scene = Scene::new(24, 12).with_gravity(Vector3::zeros());
        let a = scene
            .add(
                SceneObject::new("a", "ball", Shape::sphere(0.1))
                    .with_role(ObjectRole::Test)
                    .with_restitution(1.0)
                    .with_friction(0.0)
                    .with_state(
                        ObjectState::at_rest(Point3::new(-1.0, 0.0, 1.0))
                            .with_velocity(Vector3::new(1.0, 0.0, 0.0)),
                    ),
            )
            .unwrap();
        let b = scene
            .add(
                SceneObject::new("b", "ball", Shape::sphere(0.1))
                    .with_role(ObjectRole::Test)
                    .with_restitution(1.0)
                    .with_position(Point3::new(0.0, 0.0, 1.0)),
            )
            .unwrap();
        let run = RigidBodySimulator::default().run(&mut scene, 0, 24).unwrap();
        let hit = first_collision_between(&run.collisions, a, b).unwrap();
        // Contact after 0.8 s of travel.
        assert!((9..=11).contains(&hit), "hit at {hit}");
        let va = scene.store().read(a, 24).unwrap().velocity;
        let vb = scene.store().read(b, 24).unwrap().velocity;
        assert_relative_eq!(va.x, 0.0, epsilon = 1e-6);
        assert_relative_eq!(vb.x, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_events_are_deduplicated_per_frame() {
        let mut scene = Scene::new(12, 12);
        scene
            .add(
                SceneObject::new("ball", "ball", Shape::sphere(0.1))
                    .with_role(ObjectRole::Test)
                    .with_restitution(0.0)
                    .with_position(Point3::new(0.0, 0.0, 0.1)),
            )
            .unwrap();
        scene.add(floor()).unwrap();
        let run = RigidBodySimulator::default().run(&mut scene, 0, 12).unwrap();
        let mut frames: Vec<Frame> = run.collisions.iter().map(|e| e.frame).collect();
        let before = frames.len();
        frames.dedup();
        assert_eq!(frames.len(), before);
        assert!(frames.iter().all(|f| *f > 0));
    }

    #[test]
    fn test_resume_from_keyframe() {
        let mut scene = Scene::new(12, 12).with_gravity(Vector3::zeros());
        let ball = scene
            .add(
                SceneObject::new("ball", "ball", Shape::sphere(0.1))
                    .with_role(ObjectRole::Test)
                    .with_position(Point3::new(0.0, 0.0, 1.0)),
            )
            .unwrap();
        let mut sim = RigidBodySimulator::default();
        sim.run(&mut scene, 0, 12).unwrap();
        let jumped = ObjectState::at_rest(Point3::new(0.5, 0.0, 1.0))
            .with_velocity(Vector3::new(1.2, 0.0, 0.0));
        scene.store_mut().record(ball, 6, jumped).unwrap();
        sim.run(&mut scene, 6, 12).unwrap();
        // Six frames at 1.2 m/s is 0.6 m.
        let end = scene.store().read(ball, 12).unwrap();
        assert_relative_eq!(end.position.x, 1.1, epsilon = 1e-9);
        assert_relative_eq!(scene.store().read(ball, 5).unwrap().position.x, 0.0);
    }

    #[test]
    fn test_sphere_box_inside_pushes_out_nearest_face() {
        let pose = ObjectState::default();
        let c = sphere_box(&Point3::new(0.0, 0.0, 0.4), 0.1, &pose, &Vector3::new(1.0, 1.0, 0.5))
            .unwrap();
        assert_relative_eq!(c.normal, Vector3::z());
        assert_relative_eq!(c.depth, 0.2, epsilon = 1e-12);
    }

    #[test]
    fn test_empty_range_is_error() {
        let mut scene = Scene::new(12, 12);
        let err = RigidBodySimulator::default().run(&mut scene, 8, 4).unwrap_err();
        assert!(err.is_resource_failure());
    }
}
