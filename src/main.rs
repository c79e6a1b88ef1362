// ================================
// src/main.rs - offline replay of recorded camera frames
// ================================
use anyhow::{Context, Result};
use line_follower::{
    display::{DisplaySurface, NullDisplay, SnapshotDisplay},
    LineFollower, LineFollowerParams, VelocityCommand, VelocityPublisher,
};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};
use tracing::{error, info, Level};

const FRAME_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

/// Stands in for the motion base: every command goes to the log.
#[derive(Default)]
struct LogPublisher {
    published: AtomicU64,
}

impl VelocityPublisher for LogPublisher {
    fn publish(&self, command: &VelocityCommand) -> Result<()> {
        let seq = self.published.fetch_add(1, Ordering::Relaxed);
        info!(
            seq,
            linear = command.linear,
            angular = command.angular,
            "cmd_vel"
        );
        Ok(())
    }
}

fn collect_frames(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut frames: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("Failed to read frames directory {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| FRAME_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                .unwrap_or(false)
        })
        .collect();
    frames.sort();
    Ok(frames)
}

fn main() -> Result<()> {
    let params = LineFollowerParams::load()?;

    let level = if params.debug_mode {
        Level::DEBUG
    } else {
        Level::INFO
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    info!("Line Follower (offline replay)");
    if params.debug_mode {
        info!("=== Parameters ===\n{:#?}", params);
    }

    let running = Arc::new(AtomicBool::new(true));
    let running_handler = running.clone();
    ctrlc::set_handler(move || running_handler.store(false, Ordering::SeqCst))
        .context("Failed to install Ctrl-C handler")?;

    let frames = collect_frames(Path::new(&params.frames_dir))?;
    info!(count = frames.len(), dir = %params.frames_dir, "replaying frames");

    let display: Box<dyn DisplaySurface> = if params.show_preview {
        Box::new(SnapshotDisplay::new(&params.preview_path))
    } else {
        Box::new(NullDisplay)
    };
    let frame_period = Duration::from_millis(params.frame_period_ms);
    let mut follower = LineFollower::new(params, LogPublisher::default(), display);

    for path in frames {
        if !running.load(Ordering::SeqCst) {
            info!("Interrupted");
            break;
        }

        match image::open(&path) {
            Ok(img) => {
                if let Err(e) = follower.process_frame(&img.to_rgb8()) {
                    error!("Error during image processing: {:#}", e);
                }
            }
            Err(e) => error!("Failed to decode {}: {}", path.display(), e),
        }

        thread::sleep(frame_period);
    }

    follower.shutdown();
    info!(
        published = follower.publisher().published.load(Ordering::Relaxed),
        "replay finished"
    );

    Ok(())
}
