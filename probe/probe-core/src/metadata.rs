//! Per-scene output records.
//!
//! [`SceneMetadata`] describes an accepted scene: what was staged, which
//! objects play which role, where the camera went, and where the violation
//! starts. [`SceneTrajectory`] is the full per-frame state of every object for
//! one side of the violation / non-violation pair.

use std::collections::BTreeMap;

use probe_keyframes::{Slot, Timeline};
use probe_types::{
    Aabb, Frame, ObjectId, ObjectRole, ObjectState, ProbeError, Result, SceneKind, Shape,
    ViolationKind,
};
use probe_world::{CameraRig, Scene};
use serde::{Deserialize, Serialize};

use crate::{GeneratedScene, CAMERA_NAME};

/// Camera parameters of a scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraMetadata {
    /// Camera configuration that produced the accepted attempt.
    pub path: String,
    /// Full rig description.
    pub rig: CameraRig,
}

/// One object instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceMetadata {
    /// Arena id.
    pub id: ObjectId,
    /// Unique name.
    pub name: String,
    /// Catalog asset.
    pub asset_id: String,
    /// Role in the scene.
    pub role: ObjectRole,
    /// Whether the simulator moves it.
    pub dynamic: bool,
    /// Whether it appears in renders.
    pub renderable: bool,
    /// Uniform scale.
    pub scale: f64,
    /// Geometry at unit scale.
    pub shape: Shape,
    /// World bounds at frame 0.
    pub aabb: Aabb,
    /// State at frame 0.
    pub initial: ObjectState,
}

/// Everything a consumer needs to interpret one scene directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneMetadata {
    /// Scene index in the batch.
    pub index: u64,
    /// Seed the scene was generated from.
    pub seed: u64,
    /// Kind and its parameters.
    pub kind: SceneKind,
    /// Edit applied to the violation side.
    pub violation: ViolationKind,
    /// First edited frame.
    pub pivot: Frame,
    /// Last frame of the clip.
    pub frame_end: Frame,
    /// Frames per second.
    pub frame_rate: u32,
    /// Camera.
    pub camera: CameraMetadata,
    /// Object names grouped by role.
    pub roles: BTreeMap<ObjectRole, Vec<String>>,
    /// Every object in the scene.
    pub instances: Vec<InstanceMetadata>,
    /// Assembly attempts the scene took.
    pub attempts: usize,
}

impl SceneMetadata {
    /// Describe a generated scene.
    pub fn from_generated(
        index: u64,
        seed: u64,
        kind: &SceneKind,
        generated: &GeneratedScene,
    ) -> Result<Self> {
        let scene = &generated.scene;
        let mut roles: BTreeMap<ObjectRole, Vec<String>> = BTreeMap::new();
        let mut instances = Vec::with_capacity(scene.len());
        for object in scene.objects() {
            roles
                .entry(object.role)
                .or_default()
                .push(object.name.clone());
            instances.push(InstanceMetadata {
                id: object.id,
                name: object.name.clone(),
                asset_id: object.asset_id.clone(),
                role: object.role,
                dynamic: object.dynamic,
                renderable: object.renderable,
                scale: object.scale,
                shape: object.shape,
                aabb: scene.world_aabb(object.id, 0)?,
                initial: scene.state_at(object.id, 0)?,
            });
        }
        Ok(Self {
            index,
            seed,
            kind: kind.clone(),
            violation: generated.acceptance.violation,
            pivot: generated.acceptance.pivot.frame(),
            frame_end: scene.frame_end(),
            frame_rate: scene.frame_rate(),
            camera: CameraMetadata {
                path: generated.camera_path.clone(),
                rig: scene.camera(CAMERA_NAME)?.clone(),
            },
            roles,
            instances,
            attempts: generated.attempts,
        })
    }

    /// Pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| ProbeError::serialization(e.to_string()))
    }

    /// Parse from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| ProbeError::serialization(e.to_string()))
    }
}

/// Per-frame states of every object for one side of the pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneTrajectory {
    /// Which side this is.
    pub slot: Slot,
    /// Timelines keyed by object name.
    pub objects: BTreeMap<String, Timeline>,
}

impl SceneTrajectory {
    /// Capture `slot` from a generated scene.
    ///
    /// The slot is loaded into the scene's store first, so the store holds
    /// that side afterwards.
    pub fn capture(generated: &mut GeneratedScene, slot: Slot) -> Result<Self> {
        generated
            .state
            .load(slot, generated.scene.store_mut())?;
        Ok(Self::from_scene(&generated.scene, slot))
    }

    /// Every object's current timeline. Objects without keyframes get their
    /// initial state at every frame.
    #[must_use]
    pub fn from_scene(scene: &Scene, slot: Slot) -> Self {
        let objects = scene
            .objects()
            .map(|o| {
                let timeline = match scene.store().timeline(o.id) {
                    Some(t) if !t.is_empty() => t.clone(),
                    _ => (0..=scene.frame_end()).map(|f| (f, o.initial)).collect(),
                };
                (o.name.clone(), timeline)
            })
            .collect();
        Self { slot, objects }
    }

    /// Timeline of the object called `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Timeline> {
        self.objects.get(name)
    }

    /// Compact JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| ProbeError::serialization(e.to_string()))
    }
}
