//! Keyframe timelines for simulated objects.
//!
//! Every object that takes part in a simulation owns a [`Timeline`]: one
//! [`ObjectState`](probe_types::ObjectState) per frame in `[0, frame_end]`.
//! The [`KeyframeStore`] holds all timelines of a scene and is the only path
//! through which the simulator and the trajectory editor write state.
//!
//! # Snapshots
//!
//! A [`Snapshot`] is a deep copy of a set of timelines. Restoring a snapshot
//! re-records **every** frame, not only the ones that changed, so that every
//! [`KeyframeSink`] sees a complete, consistent set of control points:
//!
//! ```
//! use probe_keyframes::KeyframeStore;
//! use probe_types::{ObjectId, ObjectState, Point3};
//!
//! let mut store = KeyframeStore::new(2);
//! let id = ObjectId::new(0);
//! for f in 0..=2 {
//!     store.record(id, f, ObjectState::at_rest(Point3::new(0.0, 0.0, f64::from(f))))?;
//! }
//!
//! let snapshot = store.snapshot(&[id]);
//! store.record(id, 1, ObjectState::default())?;
//! store.restore(&[id], &snapshot)?;
//!
//! assert_eq!(store.read(id, 1)?.position.z, 1.0);
//! # Ok::<(), probe_types::ProbeError>(())
//! ```
//!
//! # Scene state
//!
//! [`SceneState`] keeps the named snapshots of an accepted scene: the
//! non-violation and violation trajectories of the test objects and the
//! background objects that a re-simulation had to be shielded from.

#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![warn(missing_docs)]
#![allow(clippy::missing_errors_doc)]

mod scene_state;
mod store;
mod timeline;

pub use scene_state::{SceneState, Slot};
pub use store::{KeyframeSink, KeyframeStore, NullSink};
pub use timeline::{Snapshot, Timeline};

pub use probe_types::{ProbeError, Result};
