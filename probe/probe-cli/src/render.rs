//! Segmentation output.
//!
//! Labels are written as 16-bit grayscale PNGs: pixel value `id + 1` for an
//! object, 0 for background.

use std::path::Path;

use anyhow::{Context, Result};
use image::{ImageBuffer, Luma};
use probe_core::CAMERA_NAME;
use probe_world::{RenderLayers, Renderer, Scene};
use tracing::debug;

/// Convert a layer stack to a 16-bit label image. Labels above `u16::MAX`
/// saturate.
pub fn segmentation_image(layers: &RenderLayers) -> ImageBuffer<Luma<u16>, Vec<u16>> {
    ImageBuffer::from_fn(layers.width, layers.height, |x, y| {
        let label = layers.label(x, y).unwrap_or(0);
        Luma([u16::try_from(label).unwrap_or(u16::MAX)])
    })
}

/// Render every frame of the scene's current store into `dir`.
///
/// The scene is left at frame 0.
pub fn write_segmentation(
    renderer: &dyn Renderer,
    scene: &mut Scene,
    dir: &Path,
    (width, height): (u32, u32),
) -> Result<usize> {
    let frame_end = scene.frame_end();
    for frame in 0..=frame_end {
        scene.frame_set(frame);
        let layers = renderer.render_layers(scene, CAMERA_NAME, width, height)?;
        let path = dir.join(format!("segmentation_{frame:04}.png"));
        segmentation_image(&layers)
            .save(&path)
            .with_context(|| format!("writing {}", path.display()))?;
    }
    scene.frame_set(0);
    debug!(frames = frame_end + 1, dir = %dir.display(), "segmentation written");
    Ok(frame_end as usize + 1)
}
