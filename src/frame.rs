// ================================
// src/frame.rs - camera message decoding
// ================================
use image::{Rgb, RgbImage};

use crate::error::FrameError;

/// Pixel layouts accepted from the camera feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Rgb8,
    Bgr8,
    Rgba8,
    Bgra8,
    Mono8,
}

impl Encoding {
    pub fn parse(name: &str) -> Result<Self, FrameError> {
        match name.to_ascii_lowercase().as_str() {
            "rgb8" => Ok(Self::Rgb8),
            "bgr8" => Ok(Self::Bgr8),
            "rgba8" => Ok(Self::Rgba8),
            "bgra8" => Ok(Self::Bgra8),
            "mono8" | "8uc1" => Ok(Self::Mono8),
            _ => Err(FrameError::UnsupportedEncoding(name.to_string())),
        }
    }

    pub fn channels(self) -> usize {
        match self {
            Self::Rgb8 | Self::Bgr8 => 3,
            Self::Rgba8 | Self::Bgra8 => 4,
            Self::Mono8 => 1,
        }
    }

    fn to_rgb(self, px: &[u8]) -> Rgb<u8> {
        match self {
            Self::Rgb8 | Self::Rgba8 => Rgb([px[0], px[1], px[2]]),
            Self::Bgr8 | Self::Bgra8 => Rgb([px[2], px[1], px[0]]),
            Self::Mono8 => Rgb([px[0], px[0], px[0]]),
        }
    }
}

/// An image message as delivered by the middleware, before decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawImage {
    pub width: u32,
    pub height: u32,
    pub encoding: String,
    /// Bytes per row, including any padding.
    pub step: u32,
    pub data: Vec<u8>,
}

impl RawImage {
    /// Wrap an RGB frame as an `rgb8` message.
    pub fn from_rgb(frame: &RgbImage) -> Self {
        Self {
            width: frame.width(),
            height: frame.height(),
            encoding: "rgb8".to_string(),
            step: frame.width() * 3,
            data: frame.as_raw().clone(),
        }
    }

    /// Decode into an RGB frame, honoring the row stride.
    pub fn decode(&self) -> Result<RgbImage, FrameError> {
        let encoding = Encoding::parse(&self.encoding)?;

        if self.width == 0 || self.height == 0 {
            return Err(FrameError::EmptyImage {
                width: self.width,
                height: self.height,
            });
        }

        let channels = encoding.channels();
        let row_bytes = self.width as usize * channels;
        let step = self.step as usize;
        if step < row_bytes {
            return Err(FrameError::StepTooSmall {
                step: self.step,
                row_bytes,
            });
        }

        let expected = step * self.height as usize;
        if self.data.len() < expected {
            return Err(FrameError::Truncated {
                expected,
                actual: self.data.len(),
            });
        }

        let mut frame = RgbImage::new(self.width, self.height);
        for (y, row) in self.data.chunks_exact(step).take(self.height as usize).enumerate() {
            for (x, px) in row[..row_bytes].chunks_exact(channels).enumerate() {
                frame.put_pixel(x as u32, y as u32, encoding.to_rgb(px));
            }
        }

        Ok(frame)
    }
}
