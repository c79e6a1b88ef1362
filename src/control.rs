// ================================
// src/control.rs - steering from the detected line
// ================================
use crate::{config::LineFollowerParams, vision::LineDetection};

/// Forward speed and yaw rate sent to the motion base.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VelocityCommand {
    pub linear: f64,
    pub angular: f64,
}

impl VelocityCommand {
    pub fn new(linear: f64, angular: f64) -> Self {
        Self { linear, angular }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SteeringRegime {
    /// Line visible; `deviation` is the centroid offset from the frame midline in pixels.
    Tracking { deviation: f64 },
    /// No line visible; spin in place until one shows up.
    Searching,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Steering {
    pub regime: SteeringRegime,
    pub command: VelocityCommand,
}

// Proportional steering toward the line
pub struct ProportionalController {
    cruise_speed: f64,
    steering_divisor: f64,
}

impl ProportionalController {
    pub fn new(params: &LineFollowerParams) -> Self {
        Self {
            cruise_speed: params.cruise_speed,
            steering_divisor: params.steering_divisor,
        }
    }

    /// Signed offset of `cx` from the frame midline.
    pub fn deviation(&self, cx: i32, frame_width: u32) -> f64 {
        cx as f64 - frame_width as f64 / 2.0
    }

    /// Yaw rate turning toward the line. Unclamped.
    pub fn angular_rate(&self, deviation: f64) -> f64 {
        -deviation / self.steering_divisor
    }

    pub fn command(&self, deviation: f64) -> VelocityCommand {
        VelocityCommand::new(self.cruise_speed, self.angular_rate(deviation))
    }
}

// Fixed search behavior while the line is lost
pub struct SearchController {
    command: VelocityCommand,
}

impl SearchController {
    pub fn new(params: &LineFollowerParams) -> Self {
        Self {
            command: VelocityCommand::new(params.search_linear_speed, params.search_angular_speed),
        }
    }

    pub fn command(&self) -> VelocityCommand {
        self.command
    }
}

pub struct SteeringPolicy {
    tracking: ProportionalController,
    search: SearchController,
}

impl SteeringPolicy {
    pub fn new(params: &LineFollowerParams) -> Self {
        Self {
            tracking: ProportionalController::new(params),
            search: SearchController::new(params),
        }
    }

    pub fn command(&self, detection: Option<&LineDetection>, frame_width: u32) -> Steering {
        match detection {
            Some(line) => {
                let deviation = self.tracking.deviation(line.centroid.x, frame_width);
                Steering {
                    regime: SteeringRegime::Tracking { deviation },
                    command: self.tracking.command(deviation),
                }
            }
            None => Steering {
                regime: SteeringRegime::Searching,
                command: self.search.command(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vision::Centroid;
    use approx::assert_relative_eq;

    fn line_at(x: i32) -> LineDetection {
        LineDetection {
            centroid: Centroid { x, y: 400 },
            area: 100.0,
            contour_count: 1,
            degenerate: false,
        }
    }

    #[test]
    fn lost_line_spins_in_place() {
        let policy = SteeringPolicy::new(&LineFollowerParams::default());
        let steering = policy.command(None, 640);
        assert_eq!(steering.regime, SteeringRegime::Searching);
        assert_eq!(steering.command, VelocityCommand::new(0.03, 0.60));
    }

    #[test]
    fn centered_line_drives_straight() {
        let policy = SteeringPolicy::new(&LineFollowerParams::default());
        let steering = policy.command(Some(&line_at(320)), 640);
        assert_eq!(steering.regime, SteeringRegime::Tracking { deviation: 0.0 });
        assert_eq!(steering.command.linear, 1.0);
        assert_eq!(steering.command.angular, 0.0);
    }

    #[test]
    fn angular_rate_is_linear_in_deviation() {
        let policy = SteeringPolicy::new(&LineFollowerParams::default());
        let mut last = f64::INFINITY;
        for x in (0..=640).step_by(40) {
            let angular = policy.command(Some(&line_at(x)), 640).command.angular;
            assert_relative_eq!(angular, -(x as f64 - 320.0) / 130.0, epsilon = 1e-12);
            assert!(angular < last);
            last = angular;
        }
    }

    #[test]
    fn line_left_of_center_turns_left() {
        let controller = ProportionalController::new(&LineFollowerParams::default());
        let deviation = controller.deviation(190, 640);
        assert_eq!(deviation, -130.0);
        assert_relative_eq!(controller.angular_rate(deviation), 1.0);
    }

    #[test]
    fn odd_width_midline_is_fractional() {
        let controller = ProportionalController::new(&LineFollowerParams::default());
        assert_eq!(controller.deviation(3, 7), -0.5);
    }

    #[test]
    fn extreme_deviation_is_not_clamped() {
        let controller = ProportionalController::new(&LineFollowerParams::default());
        assert_relative_eq!(controller.angular_rate(-1300.0), 10.0);
    }
}
