// ================================
// src/follower.rs - per-frame line following
// ================================
use anyhow::{Context, Result};
use image::RgbImage;
use tracing::{debug, error, warn};

use crate::{
    config::LineFollowerParams,
    control::{Steering, SteeringPolicy, SteeringRegime, VelocityCommand},
    display::{render_preview, DisplaySurface},
    frame::RawImage,
    vision::{LineDetector, LineScan},
};

/// Output channel toward the motion base. Fire-and-forget.
pub trait VelocityPublisher {
    fn publish(&self, command: &VelocityCommand) -> Result<()>;
}

/// Result of running perception and steering on one frame.
#[derive(Debug, Clone)]
pub struct FrameAnalysis {
    pub frame_width: u32,
    pub frame_height: u32,
    pub scan: LineScan,
    pub steering: Steering,
}

impl FrameAnalysis {
    pub fn command(&self) -> VelocityCommand {
        self.steering.command
    }
}

/// Turns camera frames into velocity commands.
///
/// Holds no state between frames: the same frame always yields the same
/// command. The hosting runtime owns the loop and calls [`LineFollower::on_image`]
/// (or [`LineFollower::process_frame`]) once per incoming frame.
pub struct LineFollower<P, D> {
    params: LineFollowerParams,
    detector: LineDetector,
    steering: SteeringPolicy,
    publisher: P,
    display: D,
    released: bool,
}

impl<P: VelocityPublisher, D: DisplaySurface> LineFollower<P, D> {
    pub fn new(params: LineFollowerParams, publisher: P, display: D) -> Self {
        Self {
            detector: LineDetector::new(&params),
            steering: SteeringPolicy::new(&params),
            params,
            publisher,
            display,
            released: false,
        }
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    /// Lets the host update the surface, e.g. with per-message metadata.
    pub fn display_mut(&mut self) -> &mut D {
        &mut self.display
    }

    /// Perception and steering only, no side effects.
    pub fn analyze(&self, frame: &RgbImage) -> FrameAnalysis {
        let scan = self.detector.detect(frame);
        let steering = self.steering.command(scan.detection.as_ref(), frame.width());

        FrameAnalysis {
            frame_width: frame.width(),
            frame_height: frame.height(),
            scan,
            steering,
        }
    }

    /// Decode an incoming message and process it.
    ///
    /// A message that cannot be decoded is reported and dropped without
    /// publishing anything.
    pub fn on_image(&mut self, msg: &RawImage) -> Option<VelocityCommand> {
        let frame = match msg.decode() {
            Ok(frame) => frame,
            Err(e) => {
                error!(
                    "Failed to decode image ({}x{} {}): {}",
                    msg.width, msg.height, msg.encoding, e
                );
                return None;
            }
        };

        match self.process_frame(&frame) {
            Ok(command) => Some(command),
            Err(e) => {
                error!("Error during image processing: {:#}", e);
                None
            }
        }
    }

    /// Compute, publish and preview the command for one decoded frame.
    pub fn process_frame(&mut self, frame: &RgbImage) -> Result<VelocityCommand> {
        let analysis = self.analyze(frame);
        let command = analysis.command();

        if let Some(line) = analysis.scan.detection.filter(|line| line.degenerate) {
            warn!(
                contours = line.contour_count,
                "selected line contour has zero area, steering from centroid (0, 0)"
            );
        }
        Self::print_debug_info(&analysis);

        self.publisher
            .publish(&command)
            .context("Failed to publish velocity command")?;

        if self.params.show_preview {
            self.show_preview(&analysis);
        }

        Ok(command)
    }

    /// Release the display surface. Safe to call more than once.
    pub fn shutdown(&mut self) {
        if !self.released {
            self.display.release();
            self.released = true;
        }
    }

    fn show_preview(&mut self, analysis: &FrameAnalysis) {
        let preview = render_preview(
            &analysis.scan.roi.image,
            analysis.frame_width,
            analysis.frame_height,
            &self.params,
        );
        if let Err(e) = self.display.show(&preview) {
            warn!("Failed to show preview: {:#}", e);
        }
        self.display.pump_events();
    }

    fn print_debug_info(analysis: &FrameAnalysis) {
        let command = analysis.command();
        match (analysis.steering.regime, analysis.scan.detection) {
            (SteeringRegime::Tracking { deviation }, Some(line)) => debug!(
                cx = line.centroid.x,
                cy = line.centroid.y,
                area = line.area,
                contours = line.contour_count,
                deviation,
                linear = command.linear,
                angular = command.angular,
                "line found"
            ),
            _ => debug!(
                linear = command.linear,
                angular = command.angular,
                "no line, searching"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::NullDisplay;
    use image::Rgb;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct RecordingPublisher(Arc<Mutex<Vec<VelocityCommand>>>);

    impl VelocityPublisher for RecordingPublisher {
        fn publish(&self, command: &VelocityCommand) -> Result<()> {
            self.0.lock().unwrap().push(*command);
            Ok(())
        }
    }

    struct FailingPublisher;

    impl VelocityPublisher for FailingPublisher {
        fn publish(&self, _command: &VelocityCommand) -> Result<()> {
            anyhow::bail!("publisher is gone")
        }
    }

    #[derive(Default)]
    struct CountingDisplay {
        shown: Vec<(u32, u32)>,
        pumps: usize,
        releases: usize,
    }

    impl DisplaySurface for CountingDisplay {
        fn show(&mut self, preview: &RgbImage) -> Result<()> {
            self.shown.push(preview.dimensions());
            Ok(())
        }

        fn pump_events(&mut self) {
            self.pumps += 1;
        }

        fn release(&mut self) {
            self.releases += 1;
        }
    }

    fn bright_frame() -> RgbImage {
        RgbImage::from_pixel(80, 60, Rgb([200, 200, 200]))
    }

    #[test]
    fn publishes_one_command_per_frame_and_shows_preview() {
        let publisher = RecordingPublisher::default();
        let mut follower = LineFollower::new(
            LineFollowerParams::default(),
            publisher.clone(),
            CountingDisplay::default(),
        );

        let command = follower.process_frame(&bright_frame()).unwrap();
        assert_eq!(command, VelocityCommand::new(0.03, 0.60));
        assert_eq!(*publisher.0.lock().unwrap(), vec![command]);
        assert_eq!(follower.display().shown, vec![(40, 18)]);
        assert_eq!(follower.display().pumps, 1);
    }

    #[test]
    fn preview_can_be_disabled() {
        let params = LineFollowerParams {
            show_preview: false,
            ..LineFollowerParams::default()
        };
        let mut follower =
            LineFollower::new(params, RecordingPublisher::default(), CountingDisplay::default());
        follower.process_frame(&bright_frame()).unwrap();
        assert!(follower.display().shown.is_empty());
    }

    #[test]
    fn undecodable_message_publishes_nothing() {
        let publisher = RecordingPublisher::default();
        let mut follower =
            LineFollower::new(LineFollowerParams::default(), publisher.clone(), NullDisplay);

        let msg = RawImage {
            width: 4,
            height: 4,
            encoding: "rgb8".to_string(),
            step: 12,
            data: vec![0; 10],
        };
        assert_eq!(follower.on_image(&msg), None);
        assert!(publisher.0.lock().unwrap().is_empty());
    }

    #[test]
    fn publish_failure_is_reported_not_raised() {
        let mut follower = LineFollower::new(
            LineFollowerParams::default(),
            FailingPublisher,
            CountingDisplay::default(),
        );

        assert!(follower.process_frame(&bright_frame()).is_err());
        assert_eq!(follower.on_image(&RawImage::from_rgb(&bright_frame())), None);
        assert!(follower.display().shown.is_empty());
    }

    #[test]
    fn host_can_reach_display_between_frames() {
        let mut follower = LineFollower::new(
            LineFollowerParams::default(),
            RecordingPublisher::default(),
            CountingDisplay::default(),
        );
        follower.display_mut().pumps = 10;
        follower.process_frame(&bright_frame()).unwrap();
        assert_eq!(follower.display().pumps, 11);
    }

    #[test]
    fn shutdown_releases_display_once() {
        let mut follower = LineFollower::new(
            LineFollowerParams::default(),
            RecordingPublisher::default(),
            CountingDisplay::default(),
        );
        follower.shutdown();
        follower.shutdown();
        assert_eq!(follower.display().releases, 1);
    }
}
