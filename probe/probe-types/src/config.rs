//! Configuration types for scene synthesis.
//!
//! [`ProbeConfig`] aggregates everything a batch run needs: clip timing,
//! visibility sampling, edit magnitudes, retry bounds, and the parameters of
//! each scene kind. With the `serde`
//! feature every struct deserializes with `#[serde(default)]`, so a JSON file
//! only needs the fields it overrides.

use crate::{
    CollisionParams, ContinuityParams, Frame, ProbeError, Result, SceneKind, SolidityParams,
    SupportParams,
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Top-level configuration for a synthesis run.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ProbeConfig {
    /// Base seed; each scene index derives its own stream from it.
    pub seed: u64,
    /// Clip timing and population.
    pub scene: SceneConfig,
    /// Visibility sampling.
    pub visibility: VisibilityConfig,
    /// Edit magnitudes.
    pub editor: EditorConfig,
    /// Rejection-sampling bounds.
    pub controller: ControllerConfig,
    /// Per-kind parameters.
    pub kinds: KindConfig,
}

impl ProbeConfig {
    /// Set the base seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the scene configuration.
    #[must_use]
    pub fn with_scene(mut self, scene: SceneConfig) -> Self {
        self.scene = scene;
        self
    }

    /// Set the visibility configuration.
    #[must_use]
    pub fn with_visibility(mut self, visibility: VisibilityConfig) -> Self {
        self.visibility = visibility;
        self
    }

    /// Set the editor configuration.
    #[must_use]
    pub fn with_editor(mut self, editor: EditorConfig) -> Self {
        self.editor = editor;
        self
    }

    /// Set the controller configuration.
    #[must_use]
    pub fn with_controller(mut self, controller: ControllerConfig) -> Self {
        self.controller = controller;
        self
    }

    /// Set the per-kind parameters.
    #[must_use]
    pub fn with_kinds(mut self, kinds: KindConfig) -> Self {
        self.kinds = kinds;
        self
    }

    /// Seed for one scene index.
    #[must_use]
    pub fn scene_seed(&self, scene_index: u64) -> u64 {
        self.seed
            .wrapping_mul(0x9E37_79B9_7F4A_7C15)
            .wrapping_add(scene_index)
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<()> {
        self.scene.validate()?;
        self.visibility.validate()?;
        self.editor.validate()?;
        self.controller.validate()?;
        self.kinds.validate()?;
        Ok(())
    }
}

/// Clip timing and scene population.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SceneConfig {
    /// Last frame of the clip; frames run `0..=frame_end`.
    pub frame_end: Frame,
    /// Frames per second.
    pub frame_rate: u32,
    /// Physics substeps per frame.
    pub substeps: u32,
    /// Static background objects per scene.
    pub static_objects: usize,
    /// Dynamic background objects per scene.
    pub dynamic_objects: usize,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            frame_end: 36,
            frame_rate: 12,
            substeps: 20,
            static_objects: 2,
            dynamic_objects: 1,
        }
    }
}

impl SceneConfig {
    /// Duration of one frame in seconds.
    #[must_use]
    pub fn frame_duration(&self) -> f64 {
        1.0 / f64::from(self.frame_rate)
    }

    /// Validate the scene configuration.
    pub fn validate(&self) -> Result<()> {
        if self.frame_end == 0 {
            return Err(ProbeError::invalid_config("frame_end must be positive"));
        }
        if self.frame_rate == 0 {
            return Err(ProbeError::invalid_config("frame_rate must be positive"));
        }
        if self.substeps == 0 {
            return Err(ProbeError::invalid_config("substeps must be positive"));
        }
        Ok(())
    }
}

/// Visibility sampling parameters.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct VisibilityConfig {
    /// Surface points sampled per visibility query.
    pub sample_count: usize,
    /// Half-angle of the field-of-view cone (degrees).
    pub fov_threshold_deg: f64,
    /// Seed for surface point sampling.
    pub seed: u64,
}

impl Default for VisibilityConfig {
    fn default() -> Self {
        Self {
            sample_count: 100,
            fov_threshold_deg: 20.0,
            seed: 0,
        }
    }
}

impl VisibilityConfig {
    /// Set the sample count.
    #[must_use]
    pub fn with_sample_count(mut self, sample_count: usize) -> Self {
        self.sample_count = sample_count;
        self
    }

    /// Set the field-of-view threshold.
    #[must_use]
    pub fn with_fov_threshold(mut self, degrees: f64) -> Self {
        self.fov_threshold_deg = degrees;
        self
    }

    /// Validate the visibility configuration.
    pub fn validate(&self) -> Result<()> {
        if self.sample_count == 0 {
            return Err(ProbeError::invalid_config("sample_count must be positive"));
        }
        if !(self.fov_threshold_deg > 0.0 && self.fov_threshold_deg <= 180.0) {
            return Err(ProbeError::invalid_config(format!(
                "fov_threshold_deg must be in (0, 180], got {}",
                self.fov_threshold_deg
            )));
        }
        Ok(())
    }
}

/// Magnitudes of trajectory edits.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EditorConfig {
    /// World height a disappeared object is sent to (m).
    pub disappear_height: f64,
    /// Range of the teleport jump magnitude (m); the sign is drawn separately.
    pub teleport_offset: (f64, f64),
    /// Range of the hidden collider's gap above the support surface (m).
    pub float_gap: (f64, f64),
    /// Distance the support is lowered during a pass-through re-run (m).
    pub pass_through_drop: f64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            disappear_height: -1.0,
            teleport_offset: (0.3, 0.8),
            float_gap: (0.05, 0.15),
            pass_through_drop: 10.0,
        }
    }
}

impl EditorConfig {
    /// Validate the editor configuration.
    pub fn validate(&self) -> Result<()> {
        check_range("teleport_offset", self.teleport_offset)?;
        check_range("float_gap", self.float_gap)?;
        if !self.disappear_height.is_finite() {
            return Err(ProbeError::invalid_config("disappear_height must be finite"));
        }
        if !(self.pass_through_drop.is_finite() && self.pass_through_drop > 0.0) {
            return Err(ProbeError::invalid_config(
                "pass_through_drop must be positive",
            ));
        }
        Ok(())
    }
}

fn check_range(name: &str, (lo, hi): (f64, f64)) -> Result<()> {
    if lo.is_finite() && hi.is_finite() && lo > 0.0 && lo <= hi {
        Ok(())
    } else {
        Err(ProbeError::invalid_config(format!(
            "{name} must satisfy 0 < lo <= hi, got ({lo}, {hi})"
        )))
    }
}

/// Rejection-sampling bounds.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ControllerConfig {
    /// Rejections after which a camera configuration is retired.
    pub rejection_threshold: u32,
    /// Hard cap on assembly attempts per scene.
    pub max_attempts: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            rejection_threshold: 20,
            max_attempts: 1000,
        }
    }
}

impl ControllerConfig {
    /// Set the rejection threshold.
    #[must_use]
    pub fn with_rejection_threshold(mut self, threshold: u32) -> Self {
        self.rejection_threshold = threshold;
        self
    }

    /// Set the attempt cap.
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Validate the controller configuration.
    pub fn validate(&self) -> Result<()> {
        if self.rejection_threshold == 0 {
            return Err(ProbeError::invalid_config(
                "rejection_threshold must be positive",
            ));
        }
        if self.max_attempts == 0 {
            return Err(ProbeError::invalid_config("max_attempts must be positive"));
        }
        Ok(())
    }
}

/// Parameters for every scene kind; a run picks one section by name.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct KindConfig {
    /// Mid-air collision staging.
    pub collision: CollisionParams,
    /// Disappear / teleport gate, including mode and pivot policy.
    pub continuity: ContinuityParams,
    /// Support gate, including the float / pass-through variant.
    pub support: SupportParams,
    /// Pass-through staging and gate.
    pub solidity: SolidityParams,
}

impl KindConfig {
    /// The configured kind called `name`.
    #[must_use]
    pub fn kind(&self, name: &str) -> Option<SceneKind> {
        match name {
            "collision" => Some(SceneKind::Collision(self.collision.clone())),
            "continuity" => Some(SceneKind::Continuity(self.continuity.clone())),
            "support" => Some(SceneKind::Support(self.support.clone())),
            "solidity" => Some(SceneKind::Solidity(self.solidity.clone())),
            _ => None,
        }
    }

    /// Validate visibility thresholds and timing.
    pub fn validate(&self) -> Result<()> {
        let c = &self.continuity;
        check_fraction("continuity.disappear_min_visibility", c.disappear_min_visibility)?;
        check_fraction("continuity.teleport_min_visibility", c.teleport_min_visibility)?;
        check_fraction("continuity.support_min_visibility", c.support_min_visibility)?;
        check_fraction("support.min_visibility", self.support.min_visibility)?;
        check_fraction("solidity.min_visibility", self.solidity.min_visibility)?;
        check_range("support.drop_height", self.support.drop_height)?;
        for (name, time) in [
            ("collision.collision_time", self.collision.collision_time),
            ("solidity.collision_time", self.solidity.collision_time),
        ] {
            if !(time.is_finite() && time > 0.0) {
                return Err(ProbeError::invalid_config(format!(
                    "{name} must be positive, got {time}"
                )));
            }
        }
        Ok(())
    }
}

fn check_fraction(name: &str, value: f64) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ProbeError::invalid_config(format!(
            "{name} must be in [0, 1], got {value}"
        )))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ProbeConfig::default();
        assert_eq!(config.scene.frame_end, 36);
        assert_eq!(config.scene.frame_rate, 12);
        assert_eq!(config.visibility.sample_count, 100);
        assert_eq!(config.controller.rejection_threshold, 20);
        assert_eq!(config.editor.float_gap, (0.05, 0.15));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let config = ProbeConfig::default()
            .with_controller(ControllerConfig::default().with_max_attempts(0));
        assert!(matches!(config.validate(), Err(ProbeError::InvalidConfig(_))));

        let editor = EditorConfig {
            float_gap: (0.2, 0.1),
            ..Default::default()
        };
        assert!(editor.validate().is_err());

        let vis = VisibilityConfig::default().with_fov_threshold(0.0);
        assert!(vis.validate().is_err());
    }

    #[test]
    fn test_scene_seeds_differ() {
        let config = ProbeConfig::default().with_seed(7);
        assert_ne!(config.scene_seed(0), config.scene_seed(1));
        assert_eq!(config.scene_seed(3), config.scene_seed(3));
    }

    #[test]
    fn test_frame_duration() {
        assert!((SceneConfig::default().frame_duration() - 1.0 / 12.0).abs() < 1e-12);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_partial_json_override() {
        let config: ProbeConfig =
            serde_json::from_str(r#"{"controller": {"max_attempts": 5}}"#).unwrap();
        assert_eq!(config.controller.max_attempts, 5);
        assert_eq!(config.controller.rejection_threshold, 20);
        assert_eq!(config.scene.frame_end, 36);
    }

    #[test]
    fn test_kind_sections_resolve_by_name() {
        let mut kinds = KindConfig::default();
        kinds.support.variant = crate::SupportVariant::PassThrough;
        let config = ProbeConfig::default().with_kinds(kinds);
        let Some(SceneKind::Support(params)) = config.kinds.kind("support") else {
            panic!("support section missing");
        };
        assert_eq!(params.variant, crate::SupportVariant::PassThrough);
        assert_eq!(config.kinds.kind("collision"), SceneKind::from_name("collision"));
        assert!(config.kinds.kind("gravity").is_none());
    }

    #[test]
    fn test_kind_thresholds_validated() {
        let mut kinds = KindConfig::default();
        kinds.solidity.min_visibility = 1.5;
        assert!(ProbeConfig::default().with_kinds(kinds).validate().is_err());

        let mut kinds = KindConfig::default();
        kinds.collision.collision_time = 0.0;
        assert!(kinds.validate().is_err());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_kind_json_override() {
        let config: ProbeConfig = serde_json::from_str(
            r#"{
                "kinds": {
                    "support": {"variant": "pass_through"},
                    "continuity": {"mode": "disappear", "pivot_policy": "window_midpoint"}
                }
            }"#,
        )
        .unwrap();
        assert_eq!(config.kinds.support.variant, crate::SupportVariant::PassThrough);
        assert_eq!(config.kinds.support.min_visibility, 0.5);
        assert_eq!(config.kinds.continuity.mode, crate::ContinuityMode::Disappear);
        assert_eq!(config.kinds.continuity.pivot_policy, crate::PivotPolicy::WindowMidpoint);
        assert_eq!(config.kinds.continuity.edge_frames, 3);
    }
}
