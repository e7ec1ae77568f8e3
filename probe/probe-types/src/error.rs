//! Error types for scene synthesis.
//!
//! The taxonomy separates three kinds of failure:
//!
//! - **Hard failures** ([`ProbeError::NoCollisionDetected`]): the baseline run
//!   never produced the event the test design assumes. The scene attempt is
//!   abandoned.
//! - **Configuration exhaustion** ([`ProbeError::ConfigurationExhaustion`]):
//!   every camera configuration was retired, or the attempt cap was reached.
//! - **Resource failures** (asset, simulation, I/O, serialization): surfaced to
//!   the per-scene loop, which logs and skips the scene.
//!
//! Validity rejections are not errors; they are a control-flow signal carried
//! by the gate's verdict.

use thiserror::Error;

use crate::{Frame, ObjectId};

/// Errors that can occur during scene synthesis.
#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum ProbeError {
    /// A keyframe was requested outside `[0, frame_end]` or was never recorded.
    #[error("no keyframe for {object} at frame {frame} (frame_end {frame_end})")]
    FrameNotFound {
        /// The object whose timeline was read.
        object: ObjectId,
        /// The requested frame.
        frame: Frame,
        /// Last valid frame of the scene.
        frame_end: Frame,
    },

    /// Object id is not part of the scene arena.
    #[error("object not found: {0}")]
    ObjectNotFound(ObjectId),

    /// No object carries the given name.
    #[error("object not found: {0}")]
    ObjectNameNotFound(String),

    /// No camera carries the given name.
    #[error("camera not found: {0}")]
    CameraNotFound(String),

    /// A restore referenced an object that the snapshot does not contain.
    #[error("snapshot has no timeline for {0}")]
    SnapshotMissing(ObjectId),

    /// A scene-state slot was loaded before anything was saved into it.
    #[error("scene state slot '{0}' is empty")]
    SlotEmpty(String),

    /// The baseline simulation never produced the collision the test relies on.
    #[error("no collision detected between {first} and {second}")]
    NoCollisionDetected {
        /// First designated test object.
        first: ObjectId,
        /// Second designated test object.
        second: ObjectId,
    },

    /// Every candidate configuration was retired or the attempt cap was hit.
    #[error("configuration pool exhausted after {attempts} attempts ({exhausted} configurations retired)")]
    ConfigurationExhaustion {
        /// Total assembly attempts made.
        attempts: usize,
        /// Number of configurations removed from the pool.
        exhausted: usize,
    },

    /// Asset creation failed.
    #[error("asset {asset_id}: {reason}")]
    Asset {
        /// The requested asset identifier.
        asset_id: String,
        /// Description of what went wrong.
        reason: String,
    },

    /// The simulator failed or diverged.
    #[error("simulation failed: {0}")]
    Simulation(String),

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// I/O error.
    #[error("IO error: {0}")]
    Io(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl ProbeError {
    /// Create an asset error.
    #[must_use]
    pub fn asset(asset_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Asset {
            asset_id: asset_id.into(),
            reason: reason.into(),
        }
    }

    /// Create a simulation error.
    #[must_use]
    pub fn simulation(reason: impl Into<String>) -> Self {
        Self::Simulation(reason.into())
    }

    /// Create an invalid configuration error.
    #[must_use]
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig(reason.into())
    }

    /// Create an I/O error.
    #[must_use]
    pub fn io(reason: impl Into<String>) -> Self {
        Self::Io(reason.into())
    }

    /// Create a serialization error.
    #[must_use]
    pub fn serialization(reason: impl Into<String>) -> Self {
        Self::Serialization(reason.into())
    }

    /// Check if this is a hard failure of the test design.
    #[must_use]
    pub fn is_hard_failure(&self) -> bool {
        matches!(self, Self::NoCollisionDetected { .. })
    }

    /// Check if the configuration pool ran dry.
    #[must_use]
    pub fn is_configuration_exhaustion(&self) -> bool {
        matches!(self, Self::ConfigurationExhaustion { .. })
    }

    /// Check if this is an external resource failure.
    #[must_use]
    pub fn is_resource_failure(&self) -> bool {
        matches!(
            self,
            Self::Asset { .. } | Self::Simulation(_) | Self::Io(_) | Self::Serialization(_)
        )
    }
}

impl From<std::io::Error> for ProbeError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ProbeError::FrameNotFound {
            object: ObjectId(3),
            frame: 40,
            frame_end: 36,
        };
        let msg = err.to_string();
        assert!(msg.contains("Object(3)"));
        assert!(msg.contains("40"));

        let err = ProbeError::asset("table_01", "missing mesh");
        assert!(err.to_string().contains("table_01"));
    }

    #[test]
    fn test_error_predicates() {
        let err = ProbeError::NoCollisionDetected {
            first: ObjectId(1),
            second: ObjectId(2),
        };
        assert!(err.is_hard_failure());
        assert!(!err.is_resource_failure());

        let err = ProbeError::simulation("diverged");
        assert!(err.is_resource_failure());
        assert!(!err.is_hard_failure());

        let err = ProbeError::ConfigurationExhaustion {
            attempts: 40,
            exhausted: 2,
        };
        assert!(err.is_configuration_exhaustion());
    }

    #[test]
    fn test_from_io_error() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: ProbeError = io.into();
        assert!(matches!(err, ProbeError::Io(_)));
    }
}
