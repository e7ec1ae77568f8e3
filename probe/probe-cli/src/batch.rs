//! The per-scene batch loop.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use probe_core::{
    default_camera_paths, ExclusionList, GeneratedScene, SceneGenerationController,
    SceneMetadata, SceneTrajectory, SceneValidityGate, StandardAssembler, VisibilityOracle,
    CAMERA_NAME,
};
use probe_keyframes::Slot;
use probe_types::{ProbeConfig, ProbeError, SceneKind};
use probe_world::{ManifestCatalog, RayCastRenderer, Renderer, RigidBodySimulator};
use tracing::{error, info, info_span, warn};

use crate::render::write_segmentation;

/// Exclusion list file inside the output directory.
pub const EXCLUSIONS_FILE: &str = "invalid_supports.txt";

/// Everything a batch needs.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub kind: SceneKind,
    pub scenes: u64,
    pub output: PathBuf,
    pub config: ProbeConfig,
    pub catalog: ManifestCatalog,
    /// Per-scene failures abort the batch.
    pub debug: bool,
    /// Segmentation resolution, when rendering.
    pub render: Option<(u32, u32)>,
}

/// Outcome counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub written: u64,
    pub skipped: u64,
    pub failed: u64,
    /// The configuration pool ran dry before the batch finished.
    pub exhausted: bool,
}

/// Directory of scene `index`.
pub fn scene_dir(output: &Path, index: u64) -> PathBuf {
    output.join(format!("scene_{index}"))
}

/// Run a batch, resuming past scenes that already have metadata.
pub fn run(options: &BatchOptions) -> Result<BatchSummary> {
    fs::create_dir_all(&options.output)
        .with_context(|| format!("creating {}", options.output.display()))?;
    let exclusions_path = options.output.join(EXCLUSIONS_FILE);
    let exclusions = ExclusionList::load(&exclusions_path)?;

    let config = &options.config;
    let renderer = RayCastRenderer::default();
    let gate = SceneValidityGate::new(
        VisibilityOracle::new(&renderer, &config.visibility),
        CAMERA_NAME,
        config.seed,
    );
    let mut controller = SceneGenerationController::new(
        StandardAssembler::new(options.catalog.clone(), config.scene.clone()),
        RigidBodySimulator::new(config.scene.substeps),
        gate,
        config.clone(),
        default_camera_paths(&options.kind, config.scene.frame_end),
    )?
    .with_exclusions(exclusions);

    info!(
        kind = options.kind.name(),
        scenes = options.scenes,
        output = %options.output.display(),
        "starting batch"
    );
    let mut summary = BatchSummary::default();
    for index in 0..options.scenes {
        let dir = scene_dir(&options.output, index);
        if dir.join("metadata.json").exists() {
            summary.skipped += 1;
            continue;
        }
        let _span = info_span!("scene", index).entered();
        let seed = config.scene_seed(index);

        let outcome = controller
            .generate(&options.kind, seed)
            .map_err(anyhow::Error::from)
            .and_then(|mut generated| {
                write_scene(&dir, index, seed, options, &renderer, &mut generated)
            });
        controller.exclusions().save(&exclusions_path)?;

        match outcome {
            Ok(()) => summary.written += 1,
            Err(err) => {
                let exhausted = matches!(
                    err.downcast_ref::<ProbeError>(),
                    Some(ProbeError::ConfigurationExhaustion { .. })
                );
                if exhausted {
                    error!(error = %err, "ending batch");
                    summary.exhausted = true;
                    break;
                }
                if options.debug {
                    return Err(err.context(format!("scene {index}")));
                }
                warn!(error = %err, "scene failed, skipping");
                summary.failed += 1;
            }
        }
    }

    for (label, count) in controller.stats().iter() {
        info!(reason = label, count, "rejections");
    }
    Ok(summary)
}

/// Write one accepted scene. Metadata goes last so a partial directory is
/// regenerated on resume.
fn write_scene(
    dir: &Path,
    index: u64,
    seed: u64,
    options: &BatchOptions,
    renderer: &dyn Renderer,
    generated: &mut GeneratedScene,
) -> Result<()> {
    for slot in [Slot::NonViolation, Slot::Violation] {
        let slot_dir = dir.join(slot.as_str());
        fs::create_dir_all(&slot_dir)
            .with_context(|| format!("creating {}", slot_dir.display()))?;
        let trajectory = SceneTrajectory::capture(generated, slot)?;
        fs::write(slot_dir.join("trajectory.json"), trajectory.to_json()?)?;
        if let Some(resolution) = options.render {
            write_segmentation(renderer, &mut generated.scene, &slot_dir, resolution)?;
        }
    }

    let metadata = SceneMetadata::from_generated(index, seed, &options.kind, generated)?;
    fs::write(dir.join("metadata.json"), metadata.to_json()?)?;
    info!(
        violation = metadata.violation.name(),
        pivot = metadata.pivot,
        attempts = metadata.attempts,
        "scene written"
    );
    Ok(())
}
