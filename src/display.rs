// ================================
// src/display.rs - preview of what the follower sees
// ================================
use anyhow::{Context, Result};
use image::{imageops, RgbImage};
use std::path::PathBuf;
use tracing::{debug, info};

use crate::config::LineFollowerParams;

/// Where the preview goes. Purely diagnostic: failures never affect control.
pub trait DisplaySurface {
    fn show(&mut self, preview: &RgbImage) -> Result<()>;

    /// Let the surface process its own events. Must not block.
    fn pump_events(&mut self) {}

    /// Free whatever the surface holds. Called once on shutdown.
    fn release(&mut self) {}
}

impl<D: DisplaySurface + ?Sized> DisplaySurface for Box<D> {
    fn show(&mut self, preview: &RgbImage) -> Result<()> {
        (**self).show(preview)
    }

    fn pump_events(&mut self) {
        (**self).pump_events()
    }

    fn release(&mut self) {
        (**self).release()
    }
}

/// Preview dimensions for a `width`x`height` frame, at least one pixel each.
pub fn preview_size(width: u32, height: u32, params: &LineFollowerParams) -> (u32, u32) {
    let w = (width as f64 * params.preview_width_ratio) as u32;
    let h = (height as f64 * params.preview_height_ratio) as u32;
    (w.max(1), h.max(1))
}

/// Scale the cropped ROI to the preview size of its source frame.
pub fn render_preview(
    roi: &RgbImage,
    frame_width: u32,
    frame_height: u32,
    params: &LineFollowerParams,
) -> RgbImage {
    let (w, h) = preview_size(frame_width, frame_height, params);
    imageops::resize(roi, w, h, imageops::FilterType::Triangle)
}

/// Headless surface.
#[derive(Debug, Default)]
pub struct NullDisplay;

impl DisplaySurface for NullDisplay {
    fn show(&mut self, _preview: &RgbImage) -> Result<()> {
        Ok(())
    }
}

/// Keeps the latest preview on disk as an image file.
pub struct SnapshotDisplay {
    path: PathBuf,
    frames_written: u64,
}

impl SnapshotDisplay {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            frames_written: 0,
        }
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }
}

impl DisplaySurface for SnapshotDisplay {
    fn show(&mut self, preview: &RgbImage) -> Result<()> {
        preview
            .save(&self.path)
            .with_context(|| format!("Failed to write preview to {}", self.path.display()))?;
        self.frames_written += 1;
        debug!(path = %self.path.display(), "preview updated");
        Ok(())
    }

    fn release(&mut self) {
        info!(
            path = %self.path.display(),
            frames = self.frames_written,
            "preview surface released"
        );
    }
}
