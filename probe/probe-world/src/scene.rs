//! The scene arena.

use hashbrown::HashMap;
use probe_keyframes::{KeyframeSink, KeyframeStore};
use probe_types::{
    Aabb, Frame, ObjectId, ObjectRole, ObjectState, ProbeError, Result, SceneConfig, Vector3,
};
use tracing::debug;

use crate::{CameraPose, CameraRig, SceneObject};

/// One candidate scene: objects, their timelines, and cameras.
///
/// Objects live in an arena indexed by [`ObjectId`]; renderers and editors
/// look objects up by id and never hold references into the arena.
///
/// The scene also carries a *current frame*. Visibility queries and ray casts
/// are evaluated at that frame, so callers move it with [`Scene::frame_set`]
/// before querying.
#[derive(Debug)]
pub struct Scene {
    objects: Vec<SceneObject>,
    names: HashMap<String, ObjectId>,
    store: KeyframeStore,
    cameras: HashMap<String, CameraRig>,
    gravity: Vector3<f64>,
    frame_rate: u32,
    current_frame: Frame,
}

impl Scene {
    /// Create an empty scene for frames `0..=frame_end`.
    #[must_use]
    pub fn new(frame_end: Frame, frame_rate: u32) -> Self {
        Self::with_store(KeyframeStore::new(frame_end), frame_rate)
    }

    /// Create an empty scene sized by `config`.
    #[must_use]
    pub fn from_config(config: &SceneConfig) -> Self {
        Self::new(config.frame_end, config.frame_rate)
    }

    /// Create an empty scene whose keyframes notify `sink`.
    #[must_use]
    pub fn with_sink(frame_end: Frame, frame_rate: u32, sink: Box<dyn KeyframeSink>) -> Self {
        Self::with_store(KeyframeStore::with_sink(frame_end, sink), frame_rate)
    }

    fn with_store(store: KeyframeStore, frame_rate: u32) -> Self {
        Self {
            objects: Vec::new(),
            names: HashMap::new(),
            store,
            cameras: HashMap::new(),
            gravity: Vector3::new(0.0, 0.0, -9.81),
            frame_rate,
            current_frame: 0,
        }
    }

    /// Set gravity.
    #[must_use]
    pub fn with_gravity(mut self, gravity: Vector3<f64>) -> Self {
        self.gravity = gravity;
        self
    }

    /// Gravity acceleration (m/s²).
    #[must_use]
    pub fn gravity(&self) -> Vector3<f64> {
        self.gravity
    }

    /// Replace gravity.
    pub fn set_gravity(&mut self, gravity: Vector3<f64>) {
        self.gravity = gravity;
    }

    /// Last frame of the clip.
    #[must_use]
    pub fn frame_end(&self) -> Frame {
        self.store.frame_end()
    }

    /// Frames per second.
    #[must_use]
    pub fn frame_rate(&self) -> u32 {
        self.frame_rate
    }

    /// Frame at which queries are evaluated.
    #[must_use]
    pub fn current_frame(&self) -> Frame {
        self.current_frame
    }

    /// Move the query frame. Clamped to `frame_end`.
    pub fn frame_set(&mut self, frame: Frame) {
        self.current_frame = frame.min(self.frame_end());
    }

    // ---------------------------------------------------------------- objects

    /// Insert an object and return its id.
    pub fn add(&mut self, mut object: SceneObject) -> Result<ObjectId> {
        if self.names.contains_key(&object.name) {
            return Err(ProbeError::invalid_config(format!(
                "duplicate object name '{}'",
                object.name
            )));
        }
        if !object.shape.is_valid() || !(object.scale > 0.0) {
            return Err(ProbeError::asset(
                object.asset_id.clone(),
                "shape dimensions and scale must be positive",
            ));
        }
        let raw = u32::try_from(self.objects.len())
            .map_err(|_| ProbeError::invalid_config("too many objects"))?;
        let id = ObjectId::new(raw);
        object.id = id;
        debug!(%id, name = %object.name, role = object.role.as_str(), "added object");
        self.names.insert(object.name.clone(), id);
        self.objects.push(object);
        Ok(id)
    }

    /// Object by id.
    pub fn object(&self, id: ObjectId) -> Result<&SceneObject> {
        self.objects
            .get(id.index())
            .ok_or(ProbeError::ObjectNotFound(id))
    }

    /// Mutable object by id.
    pub fn object_mut(&mut self, id: ObjectId) -> Result<&mut SceneObject> {
        self.objects
            .get_mut(id.index())
            .ok_or(ProbeError::ObjectNotFound(id))
    }

    /// Id of the object called `name`.
    pub fn id_of(&self, name: &str) -> Result<ObjectId> {
        self.names
            .get(name)
            .copied()
            .ok_or_else(|| ProbeError::ObjectNameNotFound(name.to_string()))
    }

    /// All objects in id order.
    pub fn objects(&self) -> impl Iterator<Item = &SceneObject> {
        self.objects.iter()
    }

    /// Number of objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether the scene is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Ids of objects with `role`, ascending.
    #[must_use]
    pub fn ids_with_role(&self, role: ObjectRole) -> Vec<ObjectId> {
        self.objects
            .iter()
            .filter(|o| o.role == role)
            .map(|o| o.id)
            .collect()
    }

    /// Designated test objects.
    #[must_use]
    pub fn test_ids(&self) -> Vec<ObjectId> {
        self.ids_with_role(ObjectRole::Test)
    }

    /// Objects the simulator currently moves.
    #[must_use]
    pub fn dynamic_ids(&self) -> Vec<ObjectId> {
        self.objects
            .iter()
            .filter(|o| o.dynamic)
            .map(|o| o.id)
            .collect()
    }

    /// Dynamic objects that are not test objects.
    #[must_use]
    pub fn bystander_ids(&self) -> Vec<ObjectId> {
        self.objects
            .iter()
            .filter(|o| o.dynamic && o.role != ObjectRole::Test)
            .map(|o| o.id)
            .collect()
    }

    /// Toggle whether the simulator moves `id`.
    pub fn set_dynamic(&mut self, id: ObjectId, dynamic: bool) -> Result<()> {
        self.object_mut(id)?.dynamic = dynamic;
        Ok(())
    }

    /// Toggle whether rays and renders see `id`.
    pub fn set_renderable(&mut self, id: ObjectId, renderable: bool) -> Result<()> {
        self.object_mut(id)?.renderable = renderable;
        Ok(())
    }

    /// Replace the initial state of `id`.
    pub fn set_initial_state(&mut self, id: ObjectId, state: ObjectState) -> Result<()> {
        self.object_mut(id)?.initial = state;
        Ok(())
    }

    // ---------------------------------------------------------------- state

    /// Keyframe store.
    #[must_use]
    pub fn store(&self) -> &KeyframeStore {
        &self.store
    }

    /// Mutable keyframe store.
    pub fn store_mut(&mut self) -> &mut KeyframeStore {
        &mut self.store
    }

    /// State of `id` at `frame`: the keyframe if one exists, else the initial
    /// state.
    pub fn state_at(&self, id: ObjectId, frame: Frame) -> Result<ObjectState> {
        let object = self.object(id)?;
        Ok(self
            .store
            .try_read(id, frame)
            .unwrap_or(object.initial))
    }

    /// State of `id` at the current frame.
    pub fn current_state(&self, id: ObjectId) -> Result<ObjectState> {
        self.state_at(id, self.current_frame)
    }

    /// World bounds of `id` at `frame`.
    pub fn world_aabb(&self, id: ObjectId, frame: Frame) -> Result<Aabb> {
        let state = self.state_at(id, frame)?;
        Ok(self.object(id)?.aabb_at(&state))
    }

    fn top_of(&self, role: ObjectRole, frame: Frame) -> Option<f64> {
        self.objects
            .iter()
            .filter(|o| o.role == role)
            .filter_map(|o| self.world_aabb(o.id, frame).ok())
            .map(|aabb| aabb.max.z)
            .reduce(f64::max)
    }

    /// Height of the highest support surface at `frame`.
    #[must_use]
    pub fn support_top(&self, frame: Frame) -> Option<f64> {
        self.top_of(ObjectRole::Support, frame)
    }

    /// Height of the floor at `frame`.
    #[must_use]
    pub fn floor_top(&self, frame: Frame) -> Option<f64> {
        self.top_of(ObjectRole::Floor, frame)
    }

    /// Surface heights are measured against: the support if present, else the
    /// floor, else zero.
    #[must_use]
    pub fn reference_height(&self, frame: Frame) -> f64 {
        self.support_top(frame)
            .or_else(|| self.floor_top(frame))
            .unwrap_or(0.0)
    }

    /// Record every non-dynamic object's initial state at every frame.
    ///
    /// Afterwards every object has a complete timeline, which is what the
    /// output and the metadata expect.
    pub fn bake_static_keyframes(&mut self) -> Result<()> {
        let frame_end = self.frame_end();
        let statics: Vec<(ObjectId, ObjectState)> = self
            .objects
            .iter()
            .filter(|o| !o.dynamic)
            .map(|o| (o.id, o.initial))
            .collect();
        for (id, state) in statics {
            for frame in 0..=frame_end {
                self.store.record(id, frame, state)?;
            }
        }
        Ok(())
    }

    /// Translate every object, keyframe, and camera by `offset`.
    pub fn shift(&mut self, offset: &Vector3<f64>) -> Result<()> {
        for object in &mut self.objects {
            object.initial.position += offset;
        }
        let ids: Vec<ObjectId> = self.store.objects().collect();
        for id in ids {
            let shifted: Vec<(Frame, ObjectState)> = self
                .store
                .timeline(id)
                .map(|t| {
                    t.iter()
                        .map(|(f, s)| {
                            let mut s = *s;
                            s.position += offset;
                            (f, s)
                        })
                        .collect()
                })
                .unwrap_or_default();
            for (frame, state) in shifted {
                self.store.record(id, frame, state)?;
            }
        }
        for rig in self.cameras.values_mut() {
            rig.shift(offset);
        }
        Ok(())
    }

    // ---------------------------------------------------------------- cameras

    /// Add or replace a camera.
    pub fn add_camera(&mut self, name: impl Into<String>, rig: CameraRig) {
        self.cameras.insert(name.into(), rig);
    }

    /// Camera by name.
    pub fn camera(&self, name: &str) -> Result<&CameraRig> {
        self.cameras
            .get(name)
            .ok_or_else(|| ProbeError::CameraNotFound(name.to_string()))
    }

    /// Pose of camera `name` at the current frame.
    pub fn camera_pose(&self, name: &str) -> Result<CameraPose> {
        Ok(self.camera(name)?.pose_at(self.current_frame))
    }

    /// Names of all cameras.
    pub fn camera_names(&self) -> impl Iterator<Item = &str> {
        self.cameras.keys().map(String::as_str)
    }
}
