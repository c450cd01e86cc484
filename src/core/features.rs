//! Feature extraction: raw landmarks, tracked positions and frame
//! intensities reduced to the normalized scalars the scorer reads.
//!
//! Everything here is pure and total. Degenerate geometry (zero-width
//! face, eye or mouth) yields 0 rather than NaN.

use std::collections::BTreeSet;
use crate::config::ScoringConfig;
use crate::types::{FaceLandmarks, FacialFlag, Point};

/// Geometric ratios derived from one landmark set
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FacialGeometry {
    pub brow_dist: f64,
    pub eye_ratio: f64,
    pub mouth_tension: f64,
}

/// Stateless feature extractor
#[derive(Debug, Default, Clone, Copy)]
pub struct FeatureExtractor;

impl FeatureExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Absolute difference of two jitter scalars
    pub fn jitter_magnitude(&self, baseline: f64, current: f64) -> f64 {
        (current - baseline).abs()
    }

    /// Threshold tests on the three facial ratios. The mouth test only runs
    /// when the table defines a mouth threshold.
    pub fn facial_tension_flags(
        &self,
        config: &ScoringConfig,
        brow_dist: f64,
        eye_ratio: f64,
        mouth_tension: f64,
    ) -> BTreeSet<FacialFlag> {
        let mut flags = BTreeSet::new();
        if brow_dist < config.brow_threshold {
            flags.insert(FacialFlag::BrowFurrow);
        }
        if eye_ratio < config.eye_threshold {
            flags.insert(FacialFlag::EyeNarrowing);
        }
        if let Some(threshold) = config.mouth_threshold {
            if mouth_tension > threshold {
                flags.insert(FacialFlag::MouthTension);
            }
        }
        flags
    }

    /// Point value of a fired flag
    pub fn flag_points(&self, config: &ScoringConfig, flag: FacialFlag) -> f64 {
        match flag {
            FacialFlag::BrowFurrow => config.brow_points,
            FacialFlag::EyeNarrowing => config.eye_points,
            FacialFlag::MouthTension => config.mouth_points,
        }
    }

    /// Brow spacing, eye aspect and lip compression from a landmark set
    pub fn facial_geometry(&self, lm: &FaceLandmarks) -> FacialGeometry {
        let face_width = lm.face_left.distance(&lm.face_right);
        let brow_dist = ratio(lm.left_brow_inner.distance(&lm.right_brow_inner), face_width);

        let eye_width = lm.eye_outer.distance(&lm.eye_inner);
        let eye_ratio = ratio(lm.eye_top.distance(&lm.eye_bottom), eye_width);

        // Relaxed lips are about half as thick as the mouth is wide;
        // pressing them together thins them out.
        let mouth_width = lm.mouth_left.distance(&lm.mouth_right);
        let lip_thickness = lm.upper_lip_top.distance(&lm.lower_lip_bottom);
        let mouth_tension = if mouth_width > 0.0 {
            (1.0 - lip_thickness / (0.5 * mouth_width)).clamp(0.0, 1.0)
        } else {
            0.0
        };

        FacialGeometry {
            brow_dist: brow_dist.clamp(0.0, 1.0),
            eye_ratio: eye_ratio.clamp(0.0, 1.0),
            mouth_tension,
        }
    }

    /// Mean step length between consecutive tracked positions
    pub fn path_displacement(&self, points: &[Point]) -> f64 {
        if points.len() < 2 {
            return 0.0;
        }
        let total: f64 = points.windows(2).map(|w| w[0].distance(&w[1])).sum();
        total / (points.len() - 1) as f64
    }

    /// 1 when the nose tip sits on the face centre line, falling to 0 at
    /// either face edge
    pub fn gaze_score(&self, lm: &FaceLandmarks) -> f64 {
        let half_width = lm.face_left.distance(&lm.face_right) / 2.0;
        if half_width <= 0.0 {
            return 0.0;
        }
        let centre_x = (lm.face_left.x + lm.face_right.x) / 2.0;
        (1.0 - (lm.nose_tip.x - centre_x).abs() / half_width).clamp(0.0, 1.0)
    }

    pub fn movement_score(&self, jitter: f64, gain: f64) -> f64 {
        (jitter * gain).clamp(0.0, 1.0)
    }

    /// Population standard deviation of per-frame green means, scaled
    pub fn pulse_proxy(&self, green_means: &[f64], gain: f64) -> f64 {
        if green_means.len() < 2 {
            return 0.0;
        }
        let n = green_means.len() as f64;
        let mean = green_means.iter().sum::<f64>() / n;
        let variance = green_means.iter().map(|g| (g - mean).powi(2)).sum::<f64>() / n;
        variance.sqrt() * gain
    }
}

fn ratio(num: f64, den: f64) -> f64 {
    if den > 0.0 {
        num / den
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jitter_magnitude_is_symmetric() {
        let fx = FeatureExtractor::new();
        assert_eq!(fx.jitter_magnitude(2.0, 5.0), 3.0);
        assert_eq!(fx.jitter_magnitude(5.0, 2.0), 3.0);
        assert_eq!(fx.jitter_magnitude(1.5, 1.5), 0.0);
    }

    #[test]
    fn test_flags_extended_profile() {
        let fx = FeatureExtractor::new();
        let cfg = ScoringConfig::extended();
        let flags = fx.facial_tension_flags(&cfg, 0.1, 0.05, 0.5);
        assert_eq!(flags.len(), 3);

        let none = fx.facial_tension_flags(&cfg, 0.15, 0.10, 0.4);
        assert!(none.is_empty(), "thresholds are strict");
    }

    #[test]
    fn test_flags_compact_profile_ignores_mouth() {
        let fx = FeatureExtractor::new();
        let cfg = ScoringConfig::compact();
        let flags = fx.facial_tension_flags(&cfg, 0.16, 0.11, 0.9);
        assert!(flags.contains(&FacialFlag::BrowFurrow));
        assert!(flags.contains(&FacialFlag::EyeNarrowing));
        assert!(!flags.contains(&FacialFlag::MouthTension));
    }

    #[test]
    fn test_neutral_face_geometry() {
        let fx = FeatureExtractor::new();
        let geo = fx.facial_geometry(&FaceLandmarks::neutral());
        assert!((geo.brow_dist - 0.4).abs() < 1e-9);
        assert!((geo.eye_ratio - 0.3).abs() < 1e-9);
        assert!((geo.mouth_tension - 0.25).abs() < 1e-9);
        let flags = fx.facial_tension_flags(&ScoringConfig::extended(), geo.brow_dist, geo.eye_ratio, geo.mouth_tension);
        assert!(flags.is_empty());
    }

    #[test]
    fn test_degenerate_geometry_is_zero() {
        let fx = FeatureExtractor::new();
        let p = Point::new(0.5, 0.5);
        let lm = FaceLandmarks {
            left_brow_inner: p,
            right_brow_inner: p,
            eye_top: p,
            eye_bottom: p,
            eye_outer: p,
            eye_inner: p,
            upper_lip_top: p,
            lower_lip_bottom: p,
            mouth_left: p,
            mouth_right: p,
            nose_tip: p,
            face_left: p,
            face_right: p,
        };
        let geo = fx.facial_geometry(&lm);
        assert_eq!(geo, FacialGeometry { brow_dist: 0.0, eye_ratio: 0.0, mouth_tension: 0.0 });
        assert_eq!(fx.gaze_score(&lm), 0.0);
    }

    #[test]
    fn test_path_displacement() {
        let fx = FeatureExtractor::new();
        let pts = [Point::new(0.0, 0.0), Point::new(0.3, 0.4), Point::new(0.3, 0.4)];
        assert!((fx.path_displacement(&pts) - 0.25).abs() < 1e-12);
        assert_eq!(fx.path_displacement(&pts[..1]), 0.0);
    }

    #[test]
    fn test_gaze_score() {
        let fx = FeatureExtractor::new();
        let mut lm = FaceLandmarks::neutral();
        assert!((fx.gaze_score(&lm) - 1.0).abs() < 1e-12);
        lm.nose_tip.x = 0.625;
        assert!((fx.gaze_score(&lm) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_pulse_proxy() {
        let fx = FeatureExtractor::new();
        assert_eq!(fx.pulse_proxy(&[0.5, 0.5, 0.5], 100.0), 0.0);
        let p = fx.pulse_proxy(&[0.49, 0.51], 100.0);
        assert!((p - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_movement_score_clamped() {
        let fx = FeatureExtractor::new();
        assert_eq!(fx.movement_score(0.1, 20.0), 1.0);
        assert!((fx.movement_score(0.01, 20.0) - 0.2).abs() < 1e-12);
    }
}
