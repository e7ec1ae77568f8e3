//! Scene validity gates.
//!
//! A gate looks at a simulated candidate scene and decides whether the
//! violation it is about to receive will be legible. On acceptance it fixes
//! the [`PivotFrame`] and the concrete [`ViolationKind`].
//!
//! Rejection is a control-flow signal ([`Verdict::Rejected`]), not an error.
//! The one error a gate raises on purpose is
//! [`NoCollisionDetected`](probe_types::ProbeError::NoCollisionDetected),
//! when the baseline run never produced the collision a collision test is
//! built around.

use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

use probe_types::{
    first_collision_between, ContinuityMode, ContinuityParams, Frame, ObjectId, PivotFrame,
    PivotPolicy, Result, SceneKind, SolidityParams, SupportParams, SupportVariant, ViolationKind,
};
use probe_world::{Scene, SimulationRun};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, warn};

use crate::VisibilityOracle;

/// Per-frame measurements of one object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameMeasurements {
    /// Frames measured, ascending.
    pub frames: Vec<Frame>,
    /// Visible fraction at each frame.
    pub visibility: Vec<f64>,
    /// Field-of-view test at each frame.
    pub in_view: Vec<bool>,
    /// Height of the object's lowest point above the reference surface.
    pub height: Vec<f64>,
}

impl FrameMeasurements {
    /// Sweep `frames`, moving the scene's current frame to each.
    ///
    /// The current frame is left at the last measured frame.
    pub fn sweep(
        scene: &mut Scene,
        oracle: &VisibilityOracle<'_>,
        object: ObjectId,
        camera: &str,
        frames: impl IntoIterator<Item = Frame>,
    ) -> Result<Self> {
        let mut out = Self::default();
        for frame in frames {
            scene.frame_set(frame);
            let frame = scene.current_frame();
            out.frames.push(frame);
            out.visibility.push(oracle.visible_fraction_of(scene, object, camera)?);
            out.in_view.push(oracle.in_field_of_view_of(scene, object, camera)?);
            let bottom = scene.world_aabb(object, frame)?.min.z;
            out.height.push(bottom - scene.reference_height(frame));
        }
        Ok(out)
    }

    /// Number of frames measured.
    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Whether nothing was measured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Whether the object is visible above `threshold` and in view at index `i`.
    #[must_use]
    pub fn is_clear(&self, i: usize, threshold: f64) -> bool {
        self.visibility.get(i).is_some_and(|v| *v >= threshold)
            && self.in_view.get(i).copied().unwrap_or(false)
    }

    /// Longest contiguous run of clear frames as `(first, last)` frame
    /// numbers. Ties go to the earliest run.
    #[must_use]
    pub fn longest_clear_window(&self, threshold: f64) -> Option<(Frame, Frame)> {
        let mut best: Option<(usize, usize)> = None;
        let mut start = None;
        for i in 0..=self.len() {
            let clear = i < self.len() && self.is_clear(i, threshold);
            match (clear, start) {
                (true, None) => start = Some(i),
                (false, Some(s)) => {
                    if best.map_or(true, |(bs, be)| i - s > be - bs + 1) {
                        best = Some((s, i - 1));
                    }
                    start = None;
                }
                _ => {}
            }
        }
        best.map(|(s, e)| (self.frames[s], self.frames[e]))
    }

    /// Frames whose height is at least `-tolerance`.
    #[must_use]
    pub fn frames_on_surface(&self, tolerance: f64) -> usize {
        self.height.iter().filter(|h| **h >= -tolerance).count()
    }
}

/// Pivot inside a clear window according to `policy`.
#[must_use]
pub fn pivot_in_window(window: (Frame, Frame), policy: PivotPolicy) -> Frame {
    let (start, end) = window;
    match policy {
        PivotPolicy::WindowMidpoint => start + (end - start) / 2,
        PivotPolicy::NonZeroMidpoint if start == 0 && end > 0 => 1 + (end - 1) / 2,
        PivotPolicy::NonZeroMidpoint => start + (end - start) / 2,
    }
}

/// Why a candidate scene was rejected.
#[derive(Debug, Clone, PartialEq)]
pub enum RejectReason {
    /// The test object is hidden or out of view at the start or end of the clip.
    EdgeFramesHidden {
        /// First offending frame.
        frame: Frame,
    },
    /// The support surface is too hidden on an interior frame.
    SupportHidden {
        /// First offending frame.
        frame: Frame,
        /// Visible fraction measured there.
        fraction: f64,
    },
    /// The test object did not stay on the support long enough.
    LeftSurface {
        /// Frames spent on the surface.
        frames_on_surface: usize,
    },
    /// No clear window long enough for the violation.
    NoClearWindow {
        /// Length of the longest clear window found.
        longest: usize,
    },
    /// A hypothetical support placement would not be visible.
    PlacementHidden {
        /// Which placement failed.
        placement: &'static str,
        /// Visible fraction measured.
        fraction: f64,
    },
    /// A test object is too hidden around the collision instant.
    CollisionHidden {
        /// Offending object.
        object: ObjectId,
        /// Offending frame.
        frame: Frame,
    },
    /// The scene lacks an object the test needs.
    MissingObject(&'static str),
}

impl RejectReason {
    /// Short label used for rejection statistics.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::EdgeFramesHidden { .. } => "edge_frames_hidden",
            Self::SupportHidden { .. } => "support_hidden",
            Self::LeftSurface { .. } => "left_surface",
            Self::NoClearWindow { .. } => "no_clear_window",
            Self::PlacementHidden { .. } => "placement_hidden",
            Self::CollisionHidden { .. } => "collision_hidden",
            Self::MissingObject(_) => "missing_object",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EdgeFramesHidden { frame } => {
                write!(f, "test object not clear at edge frame {frame}")
            }
            Self::SupportHidden { frame, fraction } => {
                write!(f, "support only {fraction:.2} visible at frame {frame}")
            }
            Self::LeftSurface { frames_on_surface } => {
                write!(f, "test object on surface for only {frames_on_surface} frames")
            }
            Self::NoClearWindow { longest } => {
                write!(f, "longest clear window is {longest} frames")
            }
            Self::PlacementHidden {
                placement,
                fraction,
            } => write!(f, "{placement} placement only {fraction:.2} visible"),
            Self::CollisionHidden { object, frame } => {
                write!(f, "{object} hidden at frame {frame} near the collision")
            }
            Self::MissingObject(what) => write!(f, "scene has no {what}"),
        }
    }
}

/// What an accepted scene hands to the trajectory editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Acceptance {
    /// Frame at which the violation begins.
    pub pivot: PivotFrame,
    /// The concrete edit to apply.
    pub violation: ViolationKind,
}

/// Outcome of evaluating a candidate scene.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// The scene is usable.
    Accepted(Acceptance),
    /// The scene must be discarded.
    Rejected(RejectReason),
}

impl Verdict {
    /// Whether the scene was accepted.
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted(_))
    }
}

/// Support assets that structurally cannot satisfy the support gate.
///
/// Persisted one asset id per line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionList {
    assets: BTreeSet<String>,
}

impl ExclusionList {
    /// Create an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an asset. Returns `true` if it was not already listed.
    pub fn insert(&mut self, asset_id: impl Into<String>) -> bool {
        self.assets.insert(asset_id.into())
    }

    /// Whether `asset_id` is excluded.
    #[must_use]
    pub fn contains(&self, asset_id: &str) -> bool {
        self.assets.contains(asset_id)
    }

    /// Number of excluded assets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    /// Whether nothing is excluded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Excluded asset ids, sorted.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.assets.iter().map(String::as_str)
    }

    /// Load a list; a missing file is an empty list.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::new());
        }
        let text = std::fs::read_to_string(path)?;
        Ok(Self {
            assets: text
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(String::from)
                .collect(),
        })
    }

    /// Write the list, one id per line.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut text = String::new();
        for id in &self.assets {
            text.push_str(id);
            text.push('\n');
        }
        std::fs::write(path, text)?;
        Ok(())
    }
}

/// Acceptance predicate over a simulated candidate scene.
pub trait ValidityGate {
    /// Evaluate the baseline run of `scene`.
    ///
    /// Gates may move the scene's current frame and may temporarily write
    /// keyframes, but must leave every timeline as they found it.
    fn evaluate(
        &mut self,
        scene: &mut Scene,
        run: &SimulationRun,
        kind: &SceneKind,
        exclusions: &mut ExclusionList,
    ) -> Result<Verdict>;

    /// Reseed any random choices the gate makes. Called once per scene.
    fn reseed(&mut self, _seed: u64) {}
}

/// The gate for all four scene kinds.
#[derive(Debug)]
pub struct SceneValidityGate<'r> {
    oracle: VisibilityOracle<'r>,
    camera: String,
    rng: ChaCha8Rng,
}

impl<'r> SceneValidityGate<'r> {
    /// Create a gate that looks through `camera`.
    #[must_use]
    pub fn new(oracle: VisibilityOracle<'r>, camera: impl Into<String>, seed: u64) -> Self {
        Self {
            oracle,
            camera: camera.into(),
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    fn collision(&self, scene: &Scene, run: &SimulationRun) -> Result<Verdict> {
        let tests = scene.test_ids();
        let [a, b] = tests[..] else {
            return Ok(Verdict::Rejected(RejectReason::MissingObject("test object pair")));
        };
        let frame = first_collision_between(&run.collisions, a, b)?;
        debug!(frame, "first test-pair collision");
        Ok(Verdict::Accepted(Acceptance {
            pivot: PivotFrame::new(frame),
            violation: ViolationKind::CollisionFreeze,
        }))
    }

    fn continuity(&mut self, scene: &mut Scene, params: &ContinuityParams) -> Result<Verdict> {
        let Some(&object) = scene.test_ids().first() else {
            return Ok(Verdict::Rejected(RejectReason::MissingObject("test object")));
        };
        let violation = match params.mode {
            ContinuityMode::Disappear => ViolationKind::Disappear,
            ContinuityMode::Teleport => ViolationKind::Teleport,
            ContinuityMode::Either => {
                if self.rng.gen_bool(0.5) {
                    ViolationKind::Disappear
                } else {
                    ViolationKind::Teleport
                }
            }
        };
        let threshold = params.min_visibility(violation);
        let frame_end = scene.frame_end();
        let m = FrameMeasurements::sweep(scene, &self.oracle, object, &self.camera, 0..=frame_end)?;

        let edge = (params.edge_frames as usize).min(m.len());
        let edges = (0..edge).chain(m.len().saturating_sub(edge)..m.len());
        for i in edges {
            if !m.is_clear(i, threshold) {
                return Ok(Verdict::Rejected(RejectReason::EdgeFramesHidden {
                    frame: m.frames[i],
                }));
            }
        }

        if let Some(&support) = scene.ids_with_role(probe_types::ObjectRole::Support).first() {
            let margin = params.support_margin_frames;
            let interior = margin..frame_end.saturating_add(1).saturating_sub(margin);
            for frame in interior {
                scene.frame_set(frame);
                let fraction = self.oracle.visible_fraction_of(scene, support, &self.camera)?;
                if fraction < params.support_min_visibility {
                    return Ok(Verdict::Rejected(RejectReason::SupportHidden { frame, fraction }));
                }
            }
        }

        let on_surface = m.frames_on_surface(params.surface_tolerance);
        if on_surface < params.min_frames_on_surface as usize {
            return Ok(Verdict::Rejected(RejectReason::LeftSurface {
                frames_on_surface: on_surface,
            }));
        }

        let window = m.longest_clear_window(threshold);
        let longest = window.map_or(0, |(s, e)| (e - s + 1) as usize);
        let Some(window) = window.filter(|_| longest >= params.min_window as usize) else {
            return Ok(Verdict::Rejected(RejectReason::NoClearWindow { longest }));
        };
        let pivot = pivot_in_window(window, params.pivot_policy);
        debug!(?window, pivot, violation = violation.name(), "continuity window");
        Ok(Verdict::Accepted(Acceptance {
            pivot: PivotFrame::new(pivot),
            violation,
        }))
    }

    fn support(
        &mut self,
        scene: &mut Scene,
        params: &SupportParams,
        exclusions: &mut ExclusionList,
    ) -> Result<Verdict> {
        let Some(&object) = scene.test_ids().first() else {
            return Ok(Verdict::Rejected(RejectReason::MissingObject("test object")));
        };
        let Some(&support) = scene.ids_with_role(probe_types::ObjectRole::Support).first() else {
            return Ok(Verdict::Rejected(RejectReason::MissingObject("support")));
        };
        let probe = params.probe_frame.min(scene.frame_end());
        let surface = scene.support_top(probe).unwrap_or(0.0);
        let floor = scene.floor_top(probe).unwrap_or(0.0);

        let resting = self.probe_placement(scene, object, probe, surface)?;
        if resting < params.min_visibility {
            return Ok(Verdict::Rejected(RejectReason::PlacementHidden {
                placement: "resting",
                fraction: resting,
            }));
        }
        if params.variant == SupportVariant::PassThrough {
            let fallen = self.probe_placement(scene, object, probe, floor)?;
            if fallen < params.min_visibility {
                // The support itself hides the floor below it.
                let asset = scene.object(support)?.asset_id.clone();
                if exclusions.insert(asset.clone()) {
                    info!(asset = %asset, "excluding support asset");
                }
                return Ok(Verdict::Rejected(RejectReason::PlacementHidden {
                    placement: "floor",
                    fraction: fallen,
                }));
            }
        }

        let pivot = (0..=scene.frame_end())
            .find(|&f| {
                scene
                    .world_aabb(object, f)
                    .is_ok_and(|aabb| aabb.min.z <= surface + params.contact_margin)
            })
            .unwrap_or(params.fallback_pivot);
        Ok(Verdict::Accepted(Acceptance {
            pivot: PivotFrame::new(pivot),
            violation: params.variant.into(),
        }))
    }

    /// Visible fraction of `object` with its bottom placed at `height` at
    /// `frame`. The object's timeline is restored afterwards.
    fn probe_placement(
        &self,
        scene: &mut Scene,
        object: ObjectId,
        frame: Frame,
        height: f64,
    ) -> Result<f64> {
        let snapshot = scene.store().snapshot(&[object]);
        let mut state = scene.state_at(object, frame)?;
        let bottom = scene.world_aabb(object, frame)?.min.z;
        state.position.z += height - bottom;
        scene.store_mut().record(object, frame, state)?;
        scene.frame_set(frame);
        let fraction = self.oracle.visible_fraction_of(scene, object, &self.camera);
        scene.store_mut().restore(&[object], &snapshot)?;
        fraction
    }

    fn solidity(&self, scene: &mut Scene, params: &SolidityParams) -> Result<Verdict> {
        let tests = scene.test_ids();
        if tests.len() < 2 {
            return Ok(Verdict::Rejected(RejectReason::MissingObject("test object pair")));
        }
        let pivot = params.collision_frame(scene.frame_rate()).min(scene.frame_end());
        let start = pivot.saturating_sub(params.window_before);
        let end = (pivot + params.window_after).min(scene.frame_end() + 1);
        for frame in start..end {
            scene.frame_set(frame);
            for &object in &tests {
                let fraction = self.oracle.visible_fraction_of(scene, object, &self.camera)?;
                if fraction < params.min_visibility {
                    return Ok(Verdict::Rejected(RejectReason::CollisionHidden { object, frame }));
                }
            }
        }
        Ok(Verdict::Accepted(Acceptance {
            pivot: PivotFrame::new(pivot),
            violation: ViolationKind::SolidityBreach,
        }))
    }
}

impl ValidityGate for SceneValidityGate<'_> {
    fn evaluate(
        &mut self,
        scene: &mut Scene,
        run: &SimulationRun,
        kind: &SceneKind,
        exclusions: &mut ExclusionList,
    ) -> Result<Verdict> {
        let verdict = match kind {
            SceneKind::Collision(_) => self.collision(scene, run)?,
            SceneKind::Continuity(p) => self.continuity(scene, p)?,
            SceneKind::Support(p) => self.support(scene, p, exclusions)?,
            SceneKind::Solidity(p) => self.solidity(scene, p)?,
        };
        scene.frame_set(0);
        match &verdict {
            Verdict::Accepted(a) => {
                debug!(
                    kind = kind.name(),
                    pivot = %a.pivot,
                    violation = a.violation.name(),
                    "scene accepted"
                );
            }
            Verdict::Rejected(reason) => {
                warn!(kind = kind.name(), %reason, "scene rejected");
            }
        }
        Ok(verdict)
    }

    fn reseed(&mut self, seed: u64) {
        self.rng = ChaCha8Rng::seed_from_u64(seed);
    }
}
