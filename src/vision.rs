// ================================
// src/vision.rs - line detection on the bottom of the camera frame
// ================================
use image::{imageops, GrayImage, Luma, RgbImage};
use imageproc::{
    contours::{find_contours, BorderType},
    contrast::{self, ThresholdType},
    point::Point,
};

use crate::config::LineFollowerParams;

/// Moments below this magnitude are treated as zero.
const MOMENT_EPSILON: f64 = f32::EPSILON as f64;

/// Cropped bottom band of a frame.
#[derive(Debug, Clone)]
pub struct Roi {
    pub image: RgbImage,
    /// First frame row covered by the ROI.
    pub top: u32,
}

/// Integer pixel position in full-frame coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Centroid {
    pub x: i32,
    pub y: i32,
}

/// Spatial moments of a closed boundary polygon.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Moments {
    pub m00: f64,
    pub m10: f64,
    pub m01: f64,
}

impl Moments {
    /// Moments of the polygon traced by `points` (Green's theorem).
    ///
    /// The result does not depend on traversal direction; tiny areas
    /// collapse to all-zero moments.
    pub fn of_polygon(points: &[Point<i32>]) -> Self {
        if points.len() < 3 {
            return Self::default();
        }

        let mut a00 = 0.0;
        let mut a10 = 0.0;
        let mut a01 = 0.0;

        let mut prev = points[points.len() - 1];
        for &curr in points {
            let (xp, yp) = (prev.x as f64, prev.y as f64);
            let (xc, yc) = (curr.x as f64, curr.y as f64);
            let cross = xp * yc - xc * yp;

            a00 += cross;
            a10 += cross * (xp + xc);
            a01 += cross * (yp + yc);
            prev = curr;
        }

        if a00.abs() <= MOMENT_EPSILON {
            return Self::default();
        }

        let sign = a00.signum();
        Self {
            m00: sign * a00 / 2.0,
            m10: sign * a10 / 6.0,
            m01: sign * a01 / 6.0,
        }
    }

    /// Enclosed area, never negative.
    pub fn area(&self) -> f64 {
        self.m00
    }

    /// Centroid truncated to whole pixels, `None` when the area is zero.
    pub fn centroid(&self) -> Option<(i32, i32)> {
        if self.m00 == 0.0 {
            return None;
        }
        Some(((self.m10 / self.m00) as i32, (self.m01 / self.m00) as i32))
    }
}

/// The line chosen in one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineDetection {
    pub centroid: Centroid,
    pub area: f64,
    pub contour_count: usize,
    /// The selected contour had zero area and the centroid fell back to (0, 0).
    pub degenerate: bool,
}

/// Everything the detector learned from one frame.
#[derive(Debug, Clone)]
pub struct LineScan {
    pub roi: Roi,
    pub detection: Option<LineDetection>,
}

/// First frame row of the ROI: `floor(height * ratio)`, kept inside the frame.
pub fn roi_top(height: u32, roi_top_ratio: f64) -> u32 {
    let top = (height as f64 * roi_top_ratio).floor() as u32;
    top.min(height.saturating_sub(1))
}

/// Crop the full-width bottom band starting at `roi_top`.
pub fn crop_roi(frame: &RgbImage, roi_top_ratio: f64) -> Roi {
    let top = roi_top(frame.height(), roi_top_ratio);
    let image = imageops::crop_imm(frame, 0, top, frame.width(), frame.height() - top).to_image();
    Roi { image, top }
}

/// Luma with BT.601 weights in 14-bit fixed point.
pub fn to_luma(image: &RgbImage) -> GrayImage {
    const R: u32 = 4899;
    const G: u32 = 9617;
    const B: u32 = 1868;
    const SHIFT: u32 = 14;

    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b] = image.get_pixel(x, y).0;
        let luma = (r as u32 * R + g as u32 * G + b as u32 * B + (1 << (SHIFT - 1))) >> SHIFT;
        Luma([luma as u8])
    })
}

/// Foreground (255) where the intensity is strictly below `threshold`.
pub fn threshold_inverted(gray: &GrayImage, threshold: u8) -> GrayImage {
    if threshold == 0 {
        return GrayImage::new(gray.width(), gray.height());
    }
    contrast::threshold(gray, threshold - 1, ThresholdType::BinaryInverted)
}

/// Outermost borders of the foreground regions in `mask`.
pub fn external_contours(mask: &GrayImage) -> Vec<Vec<Point<i32>>> {
    // Border following only starts an outer border right of a background
    // pixel, so regions touching column 0 need a background frame around them.
    let mut padded = GrayImage::new(mask.width() + 2, mask.height() + 2);
    imageops::replace(&mut padded, mask, 1, 1);

    find_contours::<i32>(&padded)
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .map(|c| {
            c.points
                .into_iter()
                .map(|p| Point::new(p.x - 1, p.y - 1))
                .collect()
        })
        .collect()
}

/// Index of the contour with the largest area.
///
/// Contours arrive in raster trace order; on equal areas the last traced one
/// wins, which is the first one in OpenCV's head-inserted contour list.
pub fn largest_contour(moments: &[Moments]) -> Option<usize> {
    moments
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f64)>, (idx, m)| match best {
            Some((_, area)) if m.area() < area => best,
            _ => Some((idx, m.area())),
        })
        .map(|(idx, _)| idx)
}

pub struct LineDetector {
    roi_top_ratio: f64,
    dark_threshold: u8,
}

impl LineDetector {
    pub fn new(params: &LineFollowerParams) -> Self {
        Self {
            roi_top_ratio: params.roi_top_ratio,
            dark_threshold: params.dark_threshold,
        }
    }

    /// Find the dark line in the bottom band of `frame`.
    pub fn detect(&self, frame: &RgbImage) -> LineScan {
        let roi = crop_roi(frame, self.roi_top_ratio);
        let mask = threshold_inverted(&to_luma(&roi.image), self.dark_threshold);
        let contours = external_contours(&mask);

        let moments: Vec<Moments> = contours.iter().map(|c| Moments::of_polygon(c)).collect();
        let detection = largest_contour(&moments).map(|idx| {
            let selected = moments[idx];
            let (centroid, degenerate) = match selected.centroid() {
                Some((x, y)) => (
                    Centroid {
                        x,
                        y: y + roi.top as i32,
                    },
                    false,
                ),
                None => (Centroid { x: 0, y: 0 }, true),
            };

            LineDetection {
                centroid,
                area: selected.area(),
                contour_count: contours.len(),
                degenerate,
            }
        });

        LineScan { roi, detection }
    }
}
