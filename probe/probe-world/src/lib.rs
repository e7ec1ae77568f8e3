//! Scene arena and external collaborators.
//!
//! This crate owns the mutable world a candidate scene lives in and the
//! interfaces of the three black boxes the core drives:
//!
//! - [`Simulator`] - advances time and writes keyframes
//! - [`Renderer`] - casts rays, samples surfaces, renders layers
//! - [`AssetCatalog`] - instantiates objects by asset id
//!
//! Each interface ships with a deterministic reference implementation
//! ([`RigidBodySimulator`], [`RayCastRenderer`], [`ManifestCatalog`]) so the
//! whole pipeline runs and is testable without a physics engine or a
//! production renderer.
//!
//! # Arena
//!
//! [`Scene`] stores [`SceneObject`]s in a `Vec` indexed by
//! [`ObjectId`](probe_types::ObjectId). Nothing outside the arena holds a
//! reference to an object; everything looks objects up by id.
//!
//! # Example
//!
//! ```
//! use probe_world::{RigidBodySimulator, Scene, SceneObject, Simulator};
//! use probe_types::{ObjectRole, Point3, Shape, Vector3};
//!
//! let mut scene = Scene::new(12, 12);
//! let ball = scene.add(
//!     SceneObject::new("ball", "ball_small", Shape::sphere(0.1))
//!         .with_role(ObjectRole::Test)
//!         .with_position(Point3::new(0.0, 0.0, 2.0)),
//! )?;
//! scene.add(
//!     SceneObject::new("floor", "floor", Shape::cuboid(Vector3::new(5.0, 5.0, 0.5)))
//!         .with_role(ObjectRole::Floor)
//!         .with_position(Point3::new(0.0, 0.0, -0.5)),
//! )?;
//!
//! RigidBodySimulator::default().run(&mut scene, 0, 12)?;
//! assert!(scene.store().read(ball, 12)?.position.z < 2.0);
//! # Ok::<(), probe_types::ProbeError>(())
//! ```

#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![warn(missing_docs)]
#![allow(
    clippy::missing_errors_doc,
    clippy::suboptimal_flops,
    clippy::cast_precision_loss
)]

mod camera;
mod catalog;
mod object;
pub mod raycast;
mod render;
mod scene;
mod simulate;

pub use camera::{CameraMotion, CameraPath, CameraPose, CameraRig};
pub use catalog::{AssetCatalog, AssetClass, AssetSpec, ManifestCatalog};
pub use object::SceneObject;
pub use render::{RayCastRenderer, RayHit, RenderLayers, Renderer};
pub use scene::Scene;
pub use simulate::{RigidBodySimulator, SimulationRun, Simulator};

pub use probe_types::{ProbeError, Result};
