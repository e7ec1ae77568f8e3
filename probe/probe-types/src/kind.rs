//! Scene kinds and their parameters.
//!
//! Every scene breaks exactly one physical law. [`SceneKind`] selects the law
//! and carries the parameters that differ between kinds; the validity gate,
//! trajectory editor, and assembler all dispatch on it.

use crate::Frame;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Which physical law a scene violates.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
pub enum SceneKind {
    /// Two objects collide in mid-air; the edit removes the deflection.
    Collision(CollisionParams),
    /// An object vanishes or jumps.
    Continuity(ContinuityParams),
    /// An object floats in mid-air or falls through its support.
    Support(SupportParams),
    /// Two objects pass through each other.
    Solidity(SolidityParams),
}

impl SceneKind {
    /// Short name used in logs, output directories, and metadata.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Collision(_) => "collision",
            Self::Continuity(_) => "continuity",
            Self::Support(_) => "support",
            Self::Solidity(_) => "solidity",
        }
    }

    /// Default parameters for a kind given its name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "collision" => Some(Self::Collision(CollisionParams::default())),
            "continuity" => Some(Self::Continuity(ContinuityParams::default())),
            "support" => Some(Self::Support(SupportParams::default())),
            "solidity" => Some(Self::Solidity(SolidityParams::default())),
            _ => None,
        }
    }

    /// Vertical gravity (m/s², negative is down) this kind is staged under.
    #[must_use]
    pub fn gravity_z(&self) -> f64 {
        match self {
            Self::Collision(p) => p.gravity_z,
            Self::Continuity(p) => p.gravity_z,
            Self::Support(p) => p.gravity_z,
            Self::Solidity(p) => p.gravity_z,
        }
    }

    /// Number of designated test objects the kind expects.
    #[must_use]
    pub const fn test_object_count(&self) -> usize {
        match self {
            Self::Collision(_) | Self::Solidity(_) => 2,
            Self::Continuity(_) | Self::Support(_) => 1,
        }
    }
}

/// Mid-air collision staging.
///
/// Object 1 starts at rest above the collision point; object 2 starts
/// `xy_distance` away and is aimed so both arrive after `collision_time`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CollisionParams {
    /// Seconds from release to collision.
    pub collision_time: f64,
    /// Horizontal separation at release (m).
    pub xy_distance: f64,
    /// Height of object 2 above object 1 at release (m).
    pub z_offset: f64,
    /// Height at which the objects meet (m).
    pub collision_height: f64,
    /// Vertical gravity (m/s²).
    pub gravity_z: f64,
}

impl Default for CollisionParams {
    fn default() -> Self {
        Self {
            collision_time: 1.0,
            xy_distance: 2.2,
            z_offset: 0.1,
            collision_height: 1.2,
            gravity_z: -2.8,
        }
    }
}

/// Which continuity violation to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ContinuityMode {
    /// The object stops existing.
    Disappear,
    /// The object jumps sideways at one instant.
    Teleport,
    /// Let the gate pick whichever the scene supports.
    #[default]
    Either,
}

/// How the pivot is chosen inside a disappearance window.
///
/// Near-duplicate scene builders disagree on this, so it is a policy rather
/// than a fixed rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum PivotPolicy {
    /// Midpoint of every frame in the window.
    WindowMidpoint,
    /// Midpoint of the window's non-zero frames; differs only when the window
    /// starts at frame 0.
    #[default]
    NonZeroMidpoint,
}

/// Continuity (disappear / teleport) gate and staging parameters.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ContinuityParams {
    /// Violation flavor.
    pub mode: ContinuityMode,
    /// Minimum visible fraction for disappear scenes.
    pub disappear_min_visibility: f64,
    /// Minimum visible fraction for teleport scenes.
    pub teleport_min_visibility: f64,
    /// Number of frames at each end of the clip that must show the object.
    pub edge_frames: u32,
    /// Shortest acceptable candidate violation window (frames).
    pub min_window: u32,
    /// Minimum visible fraction of the support surface on interior frames.
    pub support_min_visibility: f64,
    /// Frames at each end excluded from the support visibility check.
    pub support_margin_frames: u32,
    /// Minimum number of frames the object must stay on the support.
    pub min_frames_on_surface: u32,
    /// Tolerance below the surface still counted as resting on it (m).
    pub surface_tolerance: f64,
    /// Pivot selection rule inside the window.
    pub pivot_policy: PivotPolicy,
    /// Vertical gravity (m/s²).
    pub gravity_z: f64,
}

impl Default for ContinuityParams {
    fn default() -> Self {
        Self {
            mode: ContinuityMode::Either,
            disappear_min_visibility: 0.5,
            teleport_min_visibility: 0.15,
            edge_frames: 3,
            min_window: 4,
            support_min_visibility: 0.15,
            support_margin_frames: 6,
            min_frames_on_surface: 10,
            surface_tolerance: 0.05,
            pivot_policy: PivotPolicy::NonZeroMidpoint,
            gravity_z: -9.8,
        }
    }
}

impl ContinuityParams {
    /// Visibility threshold for a given resolved mode.
    #[must_use]
    pub fn min_visibility(&self, violation: ViolationKind) -> f64 {
        match violation {
            ViolationKind::Teleport => self.teleport_min_visibility,
            _ => self.disappear_min_visibility,
        }
    }
}

/// Which support violation to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SupportVariant {
    /// The object stops in mid-air on a hidden collider.
    #[default]
    Float,
    /// The object falls through the support surface.
    PassThrough,
}

/// Support gate and staging parameters.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SupportParams {
    /// Violation flavor.
    pub variant: SupportVariant,
    /// Visible fraction each probe placement must reach.
    pub min_visibility: f64,
    /// Frame at which hypothetical placements are probed.
    pub probe_frame: Frame,
    /// Pivot used when the baseline never reaches the surface.
    pub fallback_pivot: Frame,
    /// Distance above the surface counted as arriving at it (m).
    pub contact_margin: f64,
    /// Release height range above the surface (m).
    pub drop_height: (f64, f64),
    /// Vertical gravity (m/s²).
    pub gravity_z: f64,
}

impl Default for SupportParams {
    fn default() -> Self {
        Self {
            variant: SupportVariant::Float,
            min_visibility: 0.5,
            probe_frame: 10,
            fallback_pivot: 10,
            contact_margin: 0.2,
            drop_height: (0.5, 1.0),
            gravity_z: -1.5,
        }
    }
}

/// Solidity (pass-through) gate and staging parameters.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SolidityParams {
    /// Seconds from release to the designated collision instant.
    pub collision_time: f64,
    /// Horizontal separation at release (m).
    pub xy_distance: f64,
    /// Height of object 2 above object 1 at release (m).
    pub z_offset: f64,
    /// Height at which the objects meet (m).
    pub collision_height: f64,
    /// Minimum visible fraction of both objects around the collision.
    pub min_visibility: f64,
    /// Frames before the collision instant that must be visible.
    pub window_before: u32,
    /// Frames after the collision instant that must be visible.
    pub window_after: u32,
    /// Vertical gravity (m/s²).
    pub gravity_z: f64,
}

impl Default for SolidityParams {
    fn default() -> Self {
        Self {
            collision_time: 1.0,
            xy_distance: 1.1,
            z_offset: 0.1,
            collision_height: 1.2,
            min_visibility: 0.8,
            window_before: 2,
            window_after: 5,
            gravity_z: -2.8,
        }
    }
}

impl SolidityParams {
    /// Frame of the designated collision instant at the given frame rate.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn collision_frame(&self, frame_rate: u32) -> Frame {
        (self.collision_time * f64::from(frame_rate)).round().max(0.0) as Frame
    }
}

/// The concrete edit applied to an accepted scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ViolationKind {
    /// Horizontal motion frozen after a collision.
    CollisionFreeze,
    /// Object sent far below the surface.
    Disappear,
    /// Object jumps sideways, then obeys dynamics again.
    Teleport,
    /// Object stops on a hidden collider.
    SupportFloat,
    /// Object falls through the support.
    SupportPassThrough,
    /// Objects pass through each other.
    SolidityBreach,
}

impl ViolationKind {
    /// Short name used in logs and metadata.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::CollisionFreeze => "collision_freeze",
            Self::Disappear => "disappear",
            Self::Teleport => "teleport",
            Self::SupportFloat => "support_float",
            Self::SupportPassThrough => "support_pass_through",
            Self::SolidityBreach => "solidity_breach",
        }
    }

    /// Whether producing this violation requires re-running the simulator.
    #[must_use]
    pub const fn resimulates(self) -> bool {
        matches!(
            self,
            Self::Teleport | Self::SupportFloat | Self::SupportPassThrough | Self::SolidityBreach
        )
    }
}

impl From<SupportVariant> for ViolationKind {
    fn from(variant: SupportVariant) -> Self {
        match variant {
            SupportVariant::Float => Self::SupportFloat,
            SupportVariant::PassThrough => Self::SupportPassThrough,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names_round_trip() {
        for name in ["collision", "continuity", "support", "solidity"] {
            let kind = SceneKind::from_name(name).unwrap();
            assert_eq!(kind.name(), name);
        }
        assert!(SceneKind::from_name("gravity").is_none());
    }

    #[test]
    fn test_test_object_counts() {
        assert_eq!(
            SceneKind::Collision(CollisionParams::default()).test_object_count(),
            2
        );
        assert_eq!(
            SceneKind::Support(SupportParams::default()).test_object_count(),
            1
        );
    }

    #[test]
    fn test_solidity_collision_frame() {
        let params = SolidityParams::default();
        assert_eq!(params.collision_frame(12), 12);
        let params = SolidityParams {
            collision_time: 0.75,
            ..Default::default()
        };
        assert_eq!(params.collision_frame(12), 9);
    }

    #[test]
    fn test_violation_resimulates() {
        assert!(!ViolationKind::CollisionFreeze.resimulates());
        assert!(!ViolationKind::Disappear.resimulates());
        assert!(ViolationKind::Teleport.resimulates());
        assert_eq!(
            ViolationKind::from(SupportVariant::PassThrough),
            ViolationKind::SupportPassThrough
        );
    }

    #[test]
    fn test_continuity_threshold_by_mode() {
        let params = ContinuityParams::default();
        assert_eq!(params.min_visibility(ViolationKind::Teleport), 0.15);
        assert_eq!(params.min_visibility(ViolationKind::Disappear), 0.5);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_kind_serialization() {
        let kind = SceneKind::Support(SupportParams::default());
        let json = serde_json::to_string(&kind).unwrap();
        assert!(json.contains("\"kind\":\"support\""));
        let parsed: SceneKind = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, kind);
    }
}
