//! Batch generator for violation / non-violation scene pairs.
//!
//! # Usage
//!
//! ```text
//! probe --kind collision --scenes 100 --output out/
//! probe --kind continuity --scenes 10 --output out/ --render --resolution 320x240
//! probe --kind support --support-variant pass-through --scenes 10 --output out/
//! ```
//!
//! Per-kind parameters come from the `kinds` section of the `--config` JSON;
//! the variant flags override it.
//!
//! Each accepted scene lands in `scene_<i>/` with a `metadata.json` and one
//! `trajectory.json` per side. Rerunning into the same directory skips scenes
//! whose metadata already exists.
//!
//! Logging goes through `tracing`; `RUST_LOG` overrides the default level.

mod batch;
mod render;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use probe_types::{ContinuityMode, KindConfig, PivotPolicy, ProbeConfig, SceneKind, SupportVariant};
use probe_world::ManifestCatalog;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::batch::BatchOptions;

/// Generate physically faithful and violating scene pairs
#[derive(Parser, Debug)]
#[command(name = "probe")]
#[command(about = "Generate violation / non-violation scene pairs", long_about = None)]
#[command(version)]
struct Cli {
    /// Scene kind
    #[arg(long, value_enum)]
    kind: KindArg,

    /// Support violation variant; overrides the configuration file
    #[arg(long, value_enum)]
    support_variant: Option<SupportArg>,

    /// Continuity violation mode; overrides the configuration file
    #[arg(long, value_enum)]
    continuity_mode: Option<ContinuityArg>,

    /// Pivot rule inside a continuity window; overrides the configuration file
    #[arg(long, value_enum)]
    pivot_policy: Option<PivotArg>,

    /// Number of scenes to generate
    #[arg(long, default_value_t = 1)]
    scenes: u64,

    /// Output directory
    #[arg(long)]
    output: PathBuf,

    /// Base seed; overrides the configuration file
    #[arg(long)]
    seed: Option<u64>,

    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// JSON asset manifest; the built-in catalog is used otherwise
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Verbose logging; per-scene failures abort the batch
    #[arg(long)]
    debug: bool,

    /// Write segmentation images for every frame
    #[arg(long)]
    render: bool,

    /// Render resolution as WIDTHxHEIGHT
    #[arg(long, default_value = "320x240", value_parser = parse_resolution)]
    resolution: (u32, u32),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum KindArg {
    Collision,
    Continuity,
    Support,
    Solidity,
}

impl KindArg {
    const fn name(self) -> &'static str {
        match self {
            Self::Collision => "collision",
            Self::Continuity => "continuity",
            Self::Support => "support",
            Self::Solidity => "solidity",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum SupportArg {
    Float,
    PassThrough,
}

impl From<SupportArg> for SupportVariant {
    fn from(value: SupportArg) -> Self {
        match value {
            SupportArg::Float => SupportVariant::Float,
            SupportArg::PassThrough => SupportVariant::PassThrough,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum ContinuityArg {
    Disappear,
    Teleport,
    Either,
}

impl From<ContinuityArg> for ContinuityMode {
    fn from(value: ContinuityArg) -> Self {
        match value {
            ContinuityArg::Disappear => ContinuityMode::Disappear,
            ContinuityArg::Teleport => ContinuityMode::Teleport,
            ContinuityArg::Either => ContinuityMode::Either,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum PivotArg {
    WindowMidpoint,
    NonZeroMidpoint,
}

impl From<PivotArg> for PivotPolicy {
    fn from(value: PivotArg) -> Self {
        match value {
            PivotArg::WindowMidpoint => PivotPolicy::WindowMidpoint,
            PivotArg::NonZeroMidpoint => PivotPolicy::NonZeroMidpoint,
        }
    }
}

impl Cli {
    /// Apply the variant flags to the per-kind parameters.
    fn override_kinds(&self, kinds: &mut KindConfig) {
        if let Some(variant) = self.support_variant {
            kinds.support.variant = variant.into();
        }
        if let Some(mode) = self.continuity_mode {
            kinds.continuity.mode = mode.into();
        }
        if let Some(policy) = self.pivot_policy {
            kinds.continuity.pivot_policy = policy.into();
        }
    }

    fn scene_kind(&self, kinds: &KindConfig) -> Result<SceneKind> {
        kinds
            .kind(self.kind.name())
            .with_context(|| format!("no parameters for scene kind {}", self.kind.name()))
    }
}

fn parse_resolution(text: &str) -> std::result::Result<(u32, u32), String> {
    let (w, h) = text
        .split_once(|c: char| c == 'x' || c == 'X')
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {text:?}"))?;
    let width: u32 = w.trim().parse().map_err(|_| format!("bad width {w:?}"))?;
    let height: u32 = h.trim().parse().map_err(|_| format!("bad height {h:?}"))?;
    if width == 0 || height == 0 {
        return Err("resolution must be non-zero".into());
    }
    Ok((width, height))
}

fn init_tracing(debug: bool) {
    let default = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

fn load_config(path: Option<&PathBuf>, seed: Option<u64>) -> Result<ProbeConfig> {
    let mut config = match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            serde_json::from_str::<ProbeConfig>(&text)
                .with_context(|| format!("parsing config {}", path.display()))?
        }
        None => ProbeConfig::default(),
    };
    if let Some(seed) = seed {
        config.seed = seed;
    }
    config.validate()?;
    Ok(config)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    let mut config = load_config(cli.config.as_ref(), cli.seed)?;
    cli.override_kinds(&mut config.kinds);
    let kind = cli.scene_kind(&config.kinds)?;
    let catalog = match &cli.catalog {
        Some(path) => ManifestCatalog::from_path(path)
            .with_context(|| format!("loading catalog {}", path.display()))?,
        None => ManifestCatalog::builtin(),
    };

    let summary = batch::run(&BatchOptions {
        kind,
        scenes: cli.scenes,
        output: cli.output,
        config,
        catalog,
        debug: cli.debug,
        render: cli.render.then_some(cli.resolution),
    })?;
    info!(
        written = summary.written,
        skipped = summary.skipped,
        failed = summary.failed,
        exhausted = summary.exhausted,
        "batch finished"
    );
    Ok(())
}
