//! Rejection-sampling scene generation.
//!
//! The controller cycles through three states per attempt:
//!
//! ```text
//! Assembling -> Validating -> Accepted
//!                          -> Rejected -> Assembling
//! ```
//!
//! A rejected candidate is discarded whole and a fresh one is assembled.
//! Every rejection is charged to the camera configuration that produced it;
//! a configuration that reaches the rejection threshold is retired from the
//! [`ConfigurationPool`] for the rest of the run. Generation stops with
//! [`ProbeError::ConfigurationExhaustion`] when the pool is empty or the
//! per-scene attempt cap is reached.

use std::collections::BTreeMap;

use hashbrown::HashMap;
use probe_keyframes::SceneState;
use probe_types::{ProbeConfig, ProbeError, Result, SceneKind};
use probe_world::{CameraPath, Scene, Simulator};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, warn};

use crate::{
    Acceptance, AssemblyRequest, ExclusionList, RejectReason, SceneAssembler, TrajectoryEditor,
    ValidityGate, Verdict,
};

/// Where the controller is in the current attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ControllerState {
    /// Building a candidate scene.
    #[default]
    Assembling,
    /// Simulating and gating the candidate.
    Validating,
    /// The last candidate was accepted and edited.
    Accepted,
    /// The last candidate was discarded.
    Rejected,
}

/// Camera configurations still eligible, with their rejection counters.
#[derive(Debug, Clone)]
pub struct ConfigurationPool {
    active: Vec<CameraPath>,
    rejections: HashMap<String, u32>,
    retired: Vec<String>,
    threshold: u32,
}

impl ConfigurationPool {
    /// Create a pool that retires a configuration after `threshold`
    /// rejections.
    #[must_use]
    pub fn new(paths: Vec<CameraPath>, threshold: u32) -> Self {
        Self {
            active: paths,
            rejections: HashMap::new(),
            retired: Vec::new(),
            threshold: threshold.max(1),
        }
    }

    /// Configurations still eligible.
    #[must_use]
    pub fn active(&self) -> &[CameraPath] {
        &self.active
    }

    /// Number of eligible configurations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.active.len()
    }

    /// Whether every configuration has been retired.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Names of retired configurations, in retirement order.
    #[must_use]
    pub fn retired(&self) -> &[String] {
        &self.retired
    }

    /// Rejections charged to `name` so far.
    #[must_use]
    pub fn rejections(&self, name: &str) -> u32 {
        self.rejections.get(name).copied().unwrap_or(0)
    }

    /// Pick an eligible configuration uniformly.
    pub fn choose<R: Rng>(&self, rng: &mut R) -> Option<&CameraPath> {
        if self.active.is_empty() {
            return None;
        }
        self.active.get(rng.gen_range(0..self.active.len()))
    }

    /// Charge one rejection to `name`. Returns `true` if this retired it.
    pub fn record_rejection(&mut self, name: &str) -> bool {
        let count = self.rejections.entry(name.to_string()).or_insert(0);
        *count += 1;
        if *count < self.threshold {
            return false;
        }
        let before = self.active.len();
        self.active.retain(|p| p.name != name);
        if self.active.len() == before {
            return false;
        }
        self.retired.push(name.to_string());
        true
    }
}

/// Rejection counts by reason.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RejectionStats {
    by_reason: BTreeMap<&'static str, usize>,
    total: usize,
}

impl RejectionStats {
    /// Count one rejection.
    pub fn record(&mut self, reason: &RejectReason) {
        *self.by_reason.entry(reason.label()).or_insert(0) += 1;
        self.total += 1;
    }

    /// Total rejections.
    #[must_use]
    pub fn total(&self) -> usize {
        self.total
    }

    /// Rejections with `label`.
    #[must_use]
    pub fn count(&self, label: &str) -> usize {
        self.by_reason.get(label).copied().unwrap_or(0)
    }

    /// `(label, count)` pairs sorted by label.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, usize)> + '_ {
        self.by_reason.iter().map(|(k, v)| (*k, *v))
    }
}

/// An accepted and edited scene.
#[derive(Debug)]
pub struct GeneratedScene {
    /// The scene; its store holds the violation trajectories.
    pub scene: Scene,
    /// Violation / non-violation snapshots.
    pub state: SceneState,
    /// Pivot and violation chosen by the gate.
    pub acceptance: Acceptance,
    /// Camera configuration of the accepted attempt.
    pub camera_path: String,
    /// Attempts spent on this scene, the accepted one included.
    pub attempts: usize,
}

/// Drives assembly, simulation, gating, and editing until a scene is accepted.
#[derive(Debug)]
pub struct SceneGenerationController<A, S, G> {
    assembler: A,
    simulator: S,
    gate: G,
    config: ProbeConfig,
    pool: ConfigurationPool,
    exclusions: ExclusionList,
    stats: RejectionStats,
    state: ControllerState,
}

impl<A, S, G> SceneGenerationController<A, S, G>
where
    A: SceneAssembler,
    S: Simulator,
    G: ValidityGate,
{
    /// Create a controller over the camera configurations in `paths`.
    pub fn new(
        assembler: A,
        simulator: S,
        gate: G,
        config: ProbeConfig,
        paths: Vec<CameraPath>,
    ) -> Result<Self> {
        config.validate()?;
        if paths.is_empty() {
            return Err(ProbeError::invalid_config("no camera configurations"));
        }
        let pool = ConfigurationPool::new(paths, config.controller.rejection_threshold);
        Ok(Self {
            assembler,
            simulator,
            gate,
            config,
            pool,
            exclusions: ExclusionList::new(),
            stats: RejectionStats::default(),
            state: ControllerState::default(),
        })
    }

    /// Start from a previously persisted exclusion list.
    #[must_use]
    pub fn with_exclusions(mut self, exclusions: ExclusionList) -> Self {
        self.exclusions = exclusions;
        self
    }

    /// Support assets excluded so far.
    #[must_use]
    pub fn exclusions(&self) -> &ExclusionList {
        &self.exclusions
    }

    /// Remaining camera configurations.
    #[must_use]
    pub fn pool(&self) -> &ConfigurationPool {
        &self.pool
    }

    /// Rejection statistics over the whole run.
    #[must_use]
    pub fn stats(&self) -> &RejectionStats {
        &self.stats
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> ControllerState {
        self.state
    }

    /// Configuration in use.
    #[must_use]
    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    fn transition(&mut self, next: ControllerState) {
        debug!(from = ?self.state, to = ?next, "controller transition");
        self.state = next;
    }

    /// Generate one accepted, edited scene of `kind`.
    ///
    /// Hard failures (no collision in the baseline) and resource failures
    /// propagate immediately; rejections are retried with a fresh candidate.
    pub fn generate(&mut self, kind: &SceneKind, seed: u64) -> Result<GeneratedScene> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        self.gate.reseed(seed);
        let max_attempts = self.config.controller.max_attempts;
        let mut attempts = 0;

        loop {
            if attempts >= max_attempts || self.pool.is_empty() {
                warn!(
                    attempts,
                    retired = self.pool.retired().len(),
                    "configuration pool exhausted"
                );
                return Err(ProbeError::ConfigurationExhaustion {
                    attempts,
                    exhausted: self.pool.retired().len(),
                });
            }
            attempts += 1;

            self.transition(ControllerState::Assembling);
            let Some(path) = self.pool.choose(&mut rng).cloned() else {
                continue;
            };
            let attempt_seed: u64 = rng.gen();
            let mut scene = self.assembler.assemble(&AssemblyRequest {
                kind,
                camera_path: &path,
                exclusions: &self.exclusions,
                seed: attempt_seed,
            })?;
            scene.bake_static_keyframes()?;

            self.transition(ControllerState::Validating);
            let frame_end = scene.frame_end();
            let run = self.simulator.run(&mut scene, 0, frame_end)?;
            let verdict = self
                .gate
                .evaluate(&mut scene, &run, kind, &mut self.exclusions)?;

            match verdict {
                Verdict::Accepted(acceptance) => {
                    self.transition(ControllerState::Accepted);
                    let mut state = SceneState::new();
                    let mut editor =
                        TrajectoryEditor::new(self.config.editor.clone(), attempt_seed);
                    editor.apply(
                        &mut scene,
                        &mut self.simulator,
                        kind,
                        &acceptance,
                        &mut state,
                    )?;
                    info!(
                        kind = kind.name(),
                        attempts,
                        path = %path.name,
                        pivot = %acceptance.pivot,
                        "scene accepted"
                    );
                    return Ok(GeneratedScene {
                        scene,
                        state,
                        acceptance,
                        camera_path: path.name,
                        attempts,
                    });
                }
                Verdict::Rejected(reason) => {
                    self.transition(ControllerState::Rejected);
                    self.stats.record(&reason);
                    if self.pool.record_rejection(&path.name) {
                        warn!(
                            path = %path.name,
                            threshold = self.config.controller.rejection_threshold,
                            remaining = self.pool.len(),
                            "retiring camera configuration"
                        );
                    }
                }
            }
        }
    }
}
