//! Object identity and kinematic state.
//!
//! This module provides the per-frame state record stored in a timeline:
//! position, linear velocity, orientation, and angular velocity.

use nalgebra::{Point3, UnitQuaternion, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Frame index. Frames are contiguous from 0 to a scene-wide `frame_end`.
pub type Frame = u32;

/// Stable identifier for an object in a scene arena.
///
/// Ids are dense indices handed out by the scene in insertion order and stay
/// valid for the scene's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ObjectId(pub u32);

impl ObjectId {
    /// Create a new object ID.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Get the ID as an arena index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl From<u32> for ObjectId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Object({})", self.0)
    }
}

/// Role an object plays in a scene.
///
/// Roles drive which objects the validity gate measures, which ones the
/// trajectory editor edits, and which ones must be protected during a
/// re-simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ObjectRole {
    /// Designated test object whose trajectory carries the violation.
    Test,
    /// Background object that never moves.
    Static,
    /// Background object that is simulated alongside the test objects.
    Dynamic,
    /// Surface the test object rests on or falls past (the table).
    Support,
    /// Ground plane under everything.
    Floor,
    /// Hidden collider inserted by an edit.
    Auxiliary,
}

impl ObjectRole {
    /// Returns the role name used in metadata output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Test => "test",
            Self::Static => "static",
            Self::Dynamic => "dynamic",
            Self::Support => "support",
            Self::Floor => "floor",
            Self::Auxiliary => "auxiliary",
        }
    }
}

/// Kinematic state of a rigid object at one frame.
///
/// # Example
///
/// ```
/// use probe_types::ObjectState;
/// use nalgebra::{Point3, Vector3};
///
/// let state = ObjectState::at_rest(Point3::new(0.0, 0.0, 2.0))
///     .with_velocity(Vector3::new(1.0, 0.0, 0.0));
///
/// assert_eq!(state.position.z, 2.0);
/// assert_eq!(state.horizontal_speed(), 1.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ObjectState {
    /// Position of the object origin in world coordinates (m).
    pub position: Point3<f64>,
    /// Linear velocity in world coordinates (m/s).
    pub velocity: Vector3<f64>,
    /// Orientation as a unit quaternion.
    pub orientation: UnitQuaternion<f64>,
    /// Angular velocity in world coordinates (rad/s).
    pub angular_velocity: Vector3<f64>,
}

impl Default for ObjectState {
    fn default() -> Self {
        Self::at_rest(Point3::origin())
    }
}

impl ObjectState {
    /// Create a state from all four components.
    #[must_use]
    pub const fn new(
        position: Point3<f64>,
        velocity: Vector3<f64>,
        orientation: UnitQuaternion<f64>,
        angular_velocity: Vector3<f64>,
    ) -> Self {
        Self {
            position,
            velocity,
            orientation,
            angular_velocity,
        }
    }

    /// Create a state at rest with identity orientation.
    #[must_use]
    pub fn at_rest(position: Point3<f64>) -> Self {
        Self {
            position,
            velocity: Vector3::zeros(),
            orientation: UnitQuaternion::identity(),
            angular_velocity: Vector3::zeros(),
        }
    }

    /// Set the linear velocity.
    #[must_use]
    pub fn with_velocity(mut self, velocity: Vector3<f64>) -> Self {
        self.velocity = velocity;
        self
    }

    /// Set the orientation.
    #[must_use]
    pub fn with_orientation(mut self, orientation: UnitQuaternion<f64>) -> Self {
        self.orientation = orientation;
        self
    }

    /// Set the angular velocity.
    #[must_use]
    pub fn with_angular_velocity(mut self, angular_velocity: Vector3<f64>) -> Self {
        self.angular_velocity = angular_velocity;
        self
    }

    /// Transform a point from the object's local frame to world coordinates.
    #[must_use]
    pub fn transform_point(&self, local: &Point3<f64>) -> Point3<f64> {
        self.position + self.orientation * local.coords
    }

    /// Magnitude of the horizontal (x, y) velocity.
    #[must_use]
    pub fn horizontal_speed(&self) -> f64 {
        self.velocity.x.hypot(self.velocity.y)
    }

    /// Check if the state contains `NaN` or `Inf` values.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.position.coords.iter().all(|x| x.is_finite())
            && self.velocity.iter().all(|x| x.is_finite())
            && self.orientation.coords.iter().all(|x| x.is_finite())
            && self.angular_velocity.iter().all(|x| x.is_finite())
    }
}

/// Frame at which a violation edit begins or a triggering event occurred.
///
/// Determined once by the validity gate when a scene is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PivotFrame(pub Frame);

impl PivotFrame {
    /// Create a pivot frame.
    #[must_use]
    pub const fn new(frame: Frame) -> Self {
        Self(frame)
    }

    /// Get the frame index.
    #[must_use]
    pub const fn frame(self) -> Frame {
        self.0
    }
}

impl std::fmt::Display for PivotFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "pivot@{}", self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_object_id_display_and_index() {
        let id = ObjectId::new(7);
        assert_eq!(id.to_string(), "Object(7)");
        assert_eq!(id.index(), 7);
        assert_eq!(ObjectId::from(7), id);
    }

    #[test]
    fn test_transform_point_rotates_then_translates() {
        let state = ObjectState::at_rest(Point3::new(1.0, 0.0, 0.0)).with_orientation(
            UnitQuaternion::from_euler_angles(0.0, 0.0, std::f64::consts::FRAC_PI_2),
        );
        let world = state.transform_point(&Point3::new(1.0, 0.0, 0.0));
        assert!((world.x - 1.0).abs() < 1e-10);
        assert!((world.y - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_is_finite_detects_nan() {
        let mut state = ObjectState::default();
        assert!(state.is_finite());
        state.velocity.z = f64::NAN;
        assert!(!state.is_finite());
    }

    #[test]
    fn test_role_names() {
        assert_eq!(ObjectRole::Support.as_str(), "support");
        assert_eq!(ObjectRole::Auxiliary.as_str(), "auxiliary");
    }
}
