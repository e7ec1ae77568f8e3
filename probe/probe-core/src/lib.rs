//! Visibility-gated scene generation with physical-violation editing.
//!
//! Each generated scene comes as a pair of trajectories for the same
//! objects: a physically faithful one and one that breaks a single law at a
//! chosen frame (the *pivot*). The pair is only kept when the break would be
//! visible to the camera.
//!
//! # Pipeline
//!
//! ```text
//! SceneAssembler -> Simulator -> ValidityGate -> TrajectoryEditor
//!       ^                             |
//!       +-------- rejected -----------+
//! ```
//!
//! - [`SceneAssembler`] builds a fresh candidate for a [`SceneKind`]
//! - the [`Simulator`](probe_world::Simulator) produces the baseline
//! - [`ValidityGate`] accepts or rejects it using the [`VisibilityOracle`]
//! - [`TrajectoryEditor`] writes the violation and captures both sides into a
//!   [`SceneState`](probe_keyframes::SceneState)
//!
//! [`SceneGenerationController`] runs the loop with per-configuration
//! rejection accounting and a hard attempt cap.
//!
//! # Example
//!
//! ```no_run
//! use probe_core::{
//!     default_camera_paths, SceneGenerationController, SceneValidityGate, StandardAssembler,
//!     VisibilityOracle, CAMERA_NAME,
//! };
//! use probe_types::ProbeConfig;
//! use probe_world::{ManifestCatalog, RayCastRenderer, RigidBodySimulator};
//!
//! let config = ProbeConfig::default();
//! let kind = config.kinds.kind("collision").unwrap();
//! let renderer = RayCastRenderer::default();
//! let gate = SceneValidityGate::new(
//!     VisibilityOracle::new(&renderer, &config.visibility),
//!     CAMERA_NAME,
//!     config.seed,
//! );
//! let mut controller = SceneGenerationController::new(
//!     StandardAssembler::new(ManifestCatalog::builtin(), config.scene.clone()),
//!     RigidBodySimulator::new(config.scene.substeps),
//!     gate,
//!     config.clone(),
//!     default_camera_paths(&kind, config.scene.frame_end),
//! )?;
//! let generated = controller.generate(&kind, config.scene_seed(0))?;
//! assert!(generated.state.is_complete());
//! # Ok::<(), probe_types::ProbeError>(())
//! ```

#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![warn(missing_docs)]
#![allow(
    clippy::missing_errors_doc,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::module_name_repetitions
)]

mod assemble;
mod controller;
mod editor;
mod gate;
mod metadata;
mod visibility;

pub use assemble::{
    default_camera_paths, AssemblyRequest, MidAirStaging, SceneAssembler, StandardAssembler,
    CAMERA_NAME,
};
pub use controller::{
    ConfigurationPool, ControllerState, GeneratedScene, RejectionStats,
    SceneGenerationController,
};
pub use editor::{resimulate_contained, TrajectoryEditor, AUX_COLLIDER_NAME};
pub use gate::{
    pivot_in_window, Acceptance, ExclusionList, FrameMeasurements, RejectReason, SceneValidityGate,
    ValidityGate, Verdict,
};
pub use metadata::{CameraMetadata, InstanceMetadata, SceneMetadata, SceneTrajectory};
pub use visibility::VisibilityOracle;

pub use probe_types::{ProbeError, Result};
