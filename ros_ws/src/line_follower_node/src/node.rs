// ================================
// src/node.rs - ROS2 node wiring
// ================================
use anyhow::{anyhow, Error, Result};
use geometry_msgs::msg::Twist;
use image::RgbImage;
use line_follower::{
    display::DisplaySurface, LineFollower, LineFollowerParams, RawImage, VelocityCommand,
    VelocityPublisher,
};
use rclrs::*;
use sensor_msgs::msg::Image;
use std::sync::{Arc, Mutex};
use std_msgs::msg::Header;
use tracing::{error, info};

type Follower = LineFollower<TwistPublisher, PreviewPublisher>;

/// Sends commands to the motion base as `geometry_msgs/Twist`.
pub struct TwistPublisher {
    publisher: Publisher<Twist>,
}

impl VelocityPublisher for TwistPublisher {
    fn publish(&self, command: &VelocityCommand) -> Result<()> {
        let mut twist = Twist::default();
        twist.linear.x = command.linear;
        twist.angular.z = command.angular;

        self.publisher.publish(&twist)?;
        Ok(())
    }
}

/// Shows the preview by publishing it as an `rgb8` image topic.
///
/// Each preview reuses the header of the camera message it was cut from.
pub struct PreviewPublisher {
    publisher: Publisher<Image>,
    topic: String,
    header: Header,
}

impl PreviewPublisher {
    fn set_header(&mut self, header: Header) {
        self.header = header;
    }
}

fn preview_message(preview: &RgbImage, header: &Header) -> Image {
    let mut msg = Image::default();
    msg.header = header.clone();
    msg.width = preview.width();
    msg.height = preview.height();
    msg.encoding = "rgb8".to_string();
    msg.is_bigendian = 0;
    msg.step = preview.width() * 3;
    msg.data = preview.as_raw().clone();
    msg
}

impl DisplaySurface for PreviewPublisher {
    fn show(&mut self, preview: &RgbImage) -> Result<()> {
        self.publisher
            .publish(&preview_message(preview, &self.header))?;
        Ok(())
    }

    fn release(&mut self) {
        info!(topic = %self.topic, "preview publisher released");
    }
}

#[allow(dead_code)]
pub struct LineFollowerNode {
    image_subscription: Subscription<Image>,
    follower: Arc<Mutex<Follower>>,
}

impl LineFollowerNode {
    pub fn new(executor: &Executor, params: LineFollowerParams) -> Result<Self, RclrsError> {
        let node = executor.create_node(params.node_name.as_str())?;

        let twist_publisher = TwistPublisher {
            publisher: node.create_publisher::<Twist>(&params.cmd_vel_topic)?,
        };
        let preview_publisher = PreviewPublisher {
            publisher: node.create_publisher::<Image>(&params.preview_topic)?,
            topic: params.preview_topic.clone(),
            header: Header::default(),
        };

        let image_topic = params.image_topic.clone();
        let follower = Arc::new(Mutex::new(LineFollower::new(
            params,
            twist_publisher,
            preview_publisher,
        )));
        let follower_clone = follower.clone();

        let image_subscription =
            node.create_subscription::<Image, _>(&image_topic, move |msg: Image| {
                if let Err(e) = Self::image_callback(msg, &follower_clone) {
                    error!("Error during image callback: {}", e);
                }
            })?;

        info!(topic = %image_topic, "subscribed to camera feed");

        Ok(Self {
            image_subscription,
            follower,
        })
    }

    fn image_callback(msg: Image, follower: &Arc<Mutex<Follower>>) -> Result<(), Error> {
        let header = msg.header.clone();
        let raw = RawImage {
            width: msg.width,
            height: msg.height,
            encoding: msg.encoding,
            step: msg.step,
            data: msg.data,
        };

        let mut follower = follower
            .lock()
            .map_err(|_| anyhow!("line follower state is poisoned"))?;
        follower.display_mut().set_header(header);
        // Decode and publish failures are logged by the follower itself.
        follower.on_image(&raw);
        Ok(())
    }

    /// Release the preview surface once the executor has stopped.
    pub fn shutdown(&self) -> Result<()> {
        let mut follower = self
            .follower
            .lock()
            .map_err(|_| anyhow!("line follower state is poisoned"))?;
        follower.shutdown();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn preview_keeps_camera_header() {
        let mut header = Header::default();
        header.frame_id = "camera_optical".to_string();
        header.stamp.sec = 12;
        header.stamp.nanosec = 500;

        let preview = RgbImage::from_pixel(4, 2, Rgb([1, 2, 3]));
        let msg = preview_message(&preview, &header);

        assert_eq!(msg.header.frame_id, "camera_optical");
        assert_eq!(msg.header.stamp.sec, 12);
        assert_eq!(msg.header.stamp.nanosec, 500);
        assert_eq!((msg.width, msg.height, msg.step), (4, 2, 12));
        assert_eq!(msg.encoding, "rgb8");
        assert_eq!(msg.data.len(), 24);
    }
}
