//! Raw capture types: frames and normalized facial landmarks

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Normalized image-space point, both coordinates nominally in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// The subset of facial landmarks the feature extractor reads
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaceLandmarks {
    pub left_brow_inner: Point,
    pub right_brow_inner: Point,
    pub eye_top: Point,
    pub eye_bottom: Point,
    pub eye_outer: Point,
    pub eye_inner: Point,
    pub upper_lip_top: Point,
    pub lower_lip_bottom: Point,
    pub mouth_left: Point,
    pub mouth_right: Point,
    pub nose_tip: Point,
    pub face_left: Point,
    pub face_right: Point,
}

impl FaceLandmarks {
    /// A relaxed, frontal face centred in the frame
    pub fn neutral() -> Self {
        Self {
            left_brow_inner: Point::new(0.40, 0.35),
            right_brow_inner: Point::new(0.60, 0.35),
            eye_top: Point::new(0.35, 0.40),
            eye_bottom: Point::new(0.35, 0.43),
            eye_outer: Point::new(0.30, 0.415),
            eye_inner: Point::new(0.40, 0.415),
            upper_lip_top: Point::new(0.50, 0.68),
            lower_lip_bottom: Point::new(0.50, 0.74),
            mouth_left: Point::new(0.42, 0.71),
            mouth_right: Point::new(0.58, 0.71),
            nose_tip: Point::new(0.50, 0.55),
            face_left: Point::new(0.25, 0.50),
            face_right: Point::new(0.75, 0.50),
        }
    }
}

/// One captured RGB frame
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub width: usize,
    pub height: usize,
    /// Row-major RGB triples
    pub pixels: Vec<[u8; 3]>,
    pub captured_at: DateTime<Utc>,
}

impl Frame {
    pub fn new(width: usize, height: usize, pixels: Vec<[u8; 3]>) -> Self {
        Self {
            width,
            height,
            pixels,
            captured_at: Utc::now(),
        }
    }

    /// Mean green intensity in [0, 1]; 0 for an empty frame
    pub fn mean_green(&self) -> f64 {
        if self.pixels.is_empty() {
            return 0.0;
        }
        let sum: u64 = self.pixels.iter().map(|p| p[1] as u64).sum();
        sum as f64 / (self.pixels.len() as f64 * 255.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(0.3, 0.4);
        assert!((a.distance(&b) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_mean_green() {
        let frame = Frame::new(2, 1, vec![[0, 255, 0], [0, 0, 0]]);
        assert!((frame.mean_green() - 0.5).abs() < 1e-12);
        assert_eq!(Frame::new(0, 0, vec![]).mean_green(), 0.0);
    }
}
