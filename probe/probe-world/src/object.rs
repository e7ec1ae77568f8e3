//! Arena entries.

use probe_types::{Aabb, ObjectId, ObjectRole, ObjectState, Point3, Shape};
use serde::{Deserialize, Serialize};

/// A rigid body instance owned by a [`Scene`](crate::Scene).
///
/// Objects are built with the `with_*` methods and handed to
/// [`Scene::add`](crate::Scene::add), which assigns the [`ObjectId`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneObject {
    /// Arena id; assigned on insertion.
    pub id: ObjectId,
    /// Unique name within the scene.
    pub name: String,
    /// Catalog asset this object was created from.
    pub asset_id: String,
    /// Role in the test design.
    pub role: ObjectRole,
    /// Whether the simulator integrates this object.
    pub dynamic: bool,
    /// Whether rays and renders see this object.
    pub renderable: bool,
    /// Geometry in the local rest pose.
    pub shape: Shape,
    /// Uniform scale applied to `shape`.
    pub scale: f64,
    /// Mass (kg).
    pub mass: f64,
    /// Coulomb friction coefficient.
    pub friction: f64,
    /// Coefficient of restitution.
    pub restitution: f64,
    /// State before any keyframe is recorded.
    pub initial: ObjectState,
}

impl SceneObject {
    /// Create a static, visible object at the origin.
    #[must_use]
    pub fn new(name: impl Into<String>, asset_id: impl Into<String>, shape: Shape) -> Self {
        Self {
            id: ObjectId::new(u32::MAX),
            name: name.into(),
            asset_id: asset_id.into(),
            role: ObjectRole::Static,
            dynamic: false,
            renderable: true,
            shape,
            scale: 1.0,
            mass: 1.0,
            friction: 0.5,
            restitution: 0.5,
            initial: ObjectState::default(),
        }
    }

    /// Set the role. `Test` and `Dynamic` roles also make the object dynamic.
    #[must_use]
    pub fn with_role(mut self, role: ObjectRole) -> Self {
        self.role = role;
        if matches!(role, ObjectRole::Test | ObjectRole::Dynamic) {
            self.dynamic = true;
        }
        self
    }

    /// Set whether the simulator moves the object.
    #[must_use]
    pub fn with_dynamic(mut self, dynamic: bool) -> Self {
        self.dynamic = dynamic;
        self
    }

    /// Hide the object from rays and renders while keeping it physical.
    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.renderable = false;
        self
    }

    /// Set the uniform scale.
    #[must_use]
    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    /// Set the mass.
    #[must_use]
    pub fn with_mass(mut self, mass: f64) -> Self {
        self.mass = mass;
        self
    }

    /// Set the friction coefficient.
    #[must_use]
    pub fn with_friction(mut self, friction: f64) -> Self {
        self.friction = friction;
        self
    }

    /// Set the restitution coefficient.
    #[must_use]
    pub fn with_restitution(mut self, restitution: f64) -> Self {
        self.restitution = restitution;
        self
    }

    /// Set the full initial state.
    #[must_use]
    pub fn with_state(mut self, state: ObjectState) -> Self {
        self.initial = state;
        self
    }

    /// Set the initial position, keeping the rest of the initial state.
    #[must_use]
    pub fn with_position(mut self, position: Point3<f64>) -> Self {
        self.initial.position = position;
        self
    }

    /// Bounds in the local rest pose after scaling.
    #[must_use]
    pub fn local_aabb(&self) -> Aabb {
        self.shape.local_aabb(self.scale)
    }

    /// World bounds at `state`.
    #[must_use]
    pub fn aabb_at(&self, state: &ObjectState) -> Aabb {
        self.local_aabb().transformed(state)
    }

    /// Radius of the sphere proxy used for dynamic contacts.
    #[must_use]
    pub fn proxy_radius(&self) -> f64 {
        self.shape.bounding_radius(self.scale)
    }

    /// Inverse mass; zero for objects the simulator does not move.
    #[must_use]
    pub fn inverse_mass(&self) -> f64 {
        if self.dynamic && self.mass > 0.0 {
            1.0 / self.mass
        } else {
            0.0
        }
    }

    /// Place the object so its lowest point rests at height `z`.
    #[must_use]
    pub fn resting_on(mut self, x: f64, y: f64, z: f64) -> Self {
        let rest = ObjectState::default().with_orientation(self.initial.orientation);
        let aabb = self.local_aabb().transformed(&rest);
        self.initial.position = Point3::new(x, y, z - aabb.min.z);
        self
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use probe_types::Vector3;

    #[test]
    fn test_test_role_is_dynamic() {
        let obj = SceneObject::new("ball", "sphere_small", Shape::sphere(0.1))
            .with_role(ObjectRole::Test);
        assert!(obj.dynamic);
        assert_relative_eq!(obj.inverse_mass(), 1.0);
    }

    #[test]
    fn test_static_has_zero_inverse_mass() {
        let obj = SceneObject::new("table", "table", Shape::cuboid(Vector3::new(1.0, 1.0, 0.05)))
            .with_role(ObjectRole::Support)
            .with_mass(40.0);
        assert_eq!(obj.inverse_mass(), 0.0);
    }

    #[test]
    fn test_resting_on_places_bottom() {
        let obj = SceneObject::new("box", "cube", Shape::cuboid(Vector3::new(0.2, 0.2, 0.3)))
            .with_scale(2.0)
            .resting_on(1.0, 0.0, 0.75);
        let aabb = obj.aabb_at(&obj.initial);
        assert_relative_eq!(aabb.min.z, 0.75, epsilon = 1e-12);
        assert_relative_eq!(obj.initial.position.x, 1.0);
    }
}
