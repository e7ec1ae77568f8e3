//! Core types for physical-violation scene synthesis.
//!
//! This crate provides the foundational data types shared by every other
//! `probe-*` crate:
//!
//! - [`ObjectId`] and [`ObjectState`] - Arena ids and per-frame kinematic state
//! - [`Shape`] and [`Aabb`] - Object geometry in the local rest pose
//! - [`CollisionEvent`] - Contacts reported by a simulator run
//! - [`PivotFrame`] - Frame at which a violation edit begins
//! - [`SceneKind`] - Tagged variant selecting which physical law is broken
//! - [`ProbeConfig`] - Tunables for scenes, visibility, edits, and retries
//! - [`ProbeError`] - The error taxonomy
//!
//! # Design Philosophy
//!
//! These types are **pure data**. They carry no simulation, no rendering, and no
//! retry logic. They are the common language between:
//!
//! - The keyframe store (recording and replaying trajectories)
//! - Simulator and renderer backends
//! - The validity gate and trajectory editor
//! - Metadata output
//!
//! # Coordinate System
//!
//! - X: right
//! - Y: forward (away from the default camera)
//! - Z: up
//! - Right-handed
//!
//! # Example
//!
//! ```
//! use probe_types::{ObjectState, Shape};
//! use nalgebra::Point3;
//!
//! let state = ObjectState::at_rest(Point3::new(0.0, 0.0, 1.0));
//! let bounds = Shape::sphere(0.25).local_aabb(2.0).transformed(&state);
//!
//! assert!((bounds.min.z - 0.5).abs() < 1e-12);
//! assert!((bounds.max.z - 1.5).abs() < 1e-12);
//! ```

#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![warn(missing_docs)]
#![allow(
    clippy::missing_const_for_fn,  // Many methods can't be const due to nalgebra
    clippy::suboptimal_flops,       // mul_add style changes aren't always clearer
    clippy::cast_precision_loss,    // usize/u32 to f64 is fine for frame counts
    clippy::missing_errors_doc,     // Error docs added where non-obvious
)]

mod config;
mod error;
mod event;
mod kind;
mod shape;
mod state;

pub use config::{
    ControllerConfig, EditorConfig, KindConfig, ProbeConfig, SceneConfig, VisibilityConfig,
};
pub use error::ProbeError;
pub use event::{CollisionEvent, first_collision_between};
pub use kind::{
    CollisionParams, ContinuityMode, ContinuityParams, PivotPolicy, SceneKind, SolidityParams,
    SupportParams, SupportVariant, ViolationKind,
};
pub use shape::{Aabb, Shape};
pub use state::{Frame, ObjectId, ObjectRole, ObjectState, PivotFrame};

// Re-export math types for convenience
pub use nalgebra::{Point3, UnitQuaternion, Vector3};

/// Result type for probe operations.
pub type Result<T> = std::result::Result<T, ProbeError>;
