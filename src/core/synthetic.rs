//! Seeded synthetic capture source and models for demos and tests.
//!
//! The camera emits small frames whose green channel carries a pulse-like
//! oscillation. The landmark model perturbs a neutral face, leaning towards
//! tense geometry as `stress` rises. Same seed, same stream.

use std::f64::consts::PI;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::core::{CaptureSource, EmotionClassifier, LandmarkDetector};
use crate::error::{Error, InferenceError, Result};
use crate::types::{Emotion, FaceLandmarks, Frame, Point, RawEmotion};

const FRAME_SIDE: usize = 8;
const FRAMES_PER_SECOND: f64 = 10.0;

pub struct SyntheticCamera {
    rng: StdRng,
    bpm: f64,
    amplitude: f64,
    frame_index: u64,
    fail_after: Option<u64>,
    open: bool,
}

impl SyntheticCamera {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            bpm: 72.0,
            amplitude: 1.0,
            frame_index: 0,
            fail_after: None,
            open: false,
        }
    }

    /// Stop producing frames after `frames` frames
    pub fn fail_after(mut self, frames: u64) -> Self {
        self.fail_after = Some(frames);
        self
    }

    pub fn with_bpm(mut self, bpm: f64) -> Self {
        self.bpm = bpm;
        self
    }

    /// Peak green-channel swing of the pulse wave, in 8-bit intensity units
    pub fn with_pulse_amplitude(mut self, amplitude: f64) -> Self {
        self.amplitude = amplitude.max(0.0);
        self
    }

    pub fn is_open(&self) -> bool {
        self.open
    }
}

impl CaptureSource for SyntheticCamera {
    fn open(&mut self) -> Result<()> {
        self.open = true;
        tracing::debug!(bpm = self.bpm, amplitude = self.amplitude, "synthetic camera opened");
        Ok(())
    }

    fn acquire_frame(&mut self) -> Result<Frame> {
        if !self.open {
            return Err(Error::CaptureSourceUnavailable("synthetic camera is closed".into()));
        }
        if self.fail_after.is_some_and(|n| self.frame_index >= n) {
            return Err(Error::CaptureSourceUnavailable(format!(
                "synthetic camera exhausted after {} frames",
                self.frame_index
            )));
        }

        let t = self.frame_index as f64 / FRAMES_PER_SECOND;
        let wave = (2.0 * PI * self.bpm / 60.0 * t).sin();
        let green_base = 120.0 + self.amplitude * wave;

        let pixels = (0..FRAME_SIDE * FRAME_SIDE)
            .map(|_| {
                let noise: f64 = self.rng.gen_range(-1.0..1.0);
                let g = (green_base + noise).clamp(0.0, 255.0) as u8;
                [90, g, 80]
            })
            .collect();

        self.frame_index += 1;
        Ok(Frame::new(FRAME_SIDE, FRAME_SIDE, pixels))
    }

    fn release(&mut self) {
        if self.open {
            tracing::debug!(frames = self.frame_index, "synthetic camera released");
        }
        self.open = false;
    }
}

/// Landmark model over a perturbed neutral face
pub struct SyntheticFace {
    rng: StdRng,
    failure_rate: f64,
    stress: f64,
}

impl SyntheticFace {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed ^ 0x5eed_face),
            failure_rate: 0.0,
            stress: 0.0,
        }
    }

    /// Probability of a failed detection per frame
    pub fn with_failure_rate(mut self, rate: f64) -> Self {
        self.failure_rate = rate.clamp(0.0, 1.0);
        self
    }

    /// 0 = relaxed, 1 = furrowed brows, narrowed eyes, pressed lips
    pub fn with_stress(mut self, stress: f64) -> Self {
        self.stress = stress.clamp(0.0, 1.0);
        self
    }

    fn wobble(&mut self, p: Point, amount: f64) -> Point {
        Point::new(
            p.x + self.rng.gen_range(-amount..=amount),
            p.y + self.rng.gen_range(-amount..=amount),
        )
    }
}

impl LandmarkDetector for SyntheticFace {
    fn detect(&mut self, _frame: &Frame) -> std::result::Result<FaceLandmarks, InferenceError> {
        if self.rng.gen_bool(self.failure_rate) {
            return Err(InferenceError::Landmarks("no face found".into()));
        }

        let s = self.stress;
        let mut lm = FaceLandmarks::neutral();

        // Brows pull in from 0.20 apart towards 0.05.
        let half_gap = 0.10 - 0.075 * s;
        lm.left_brow_inner.x = 0.50 - half_gap;
        lm.right_brow_inner.x = 0.50 + half_gap;

        // Lid gap shrinks from 0.03 towards 0.005.
        lm.eye_bottom.y = lm.eye_top.y + 0.03 - 0.025 * s;

        // Lips thin from 0.06 towards 0.02.
        lm.lower_lip_bottom.y = lm.upper_lip_top.y + 0.06 - 0.04 * s;

        // Tremor grows with stress.
        let tremor = 0.002 + 0.02 * s;
        lm.nose_tip = self.wobble(lm.nose_tip, tremor);
        Ok(lm)
    }
}

/// Emotion model drawing from a label pool
pub struct SyntheticEmotions {
    rng: StdRng,
    failure_rate: f64,
    labels: Vec<String>,
}

impl SyntheticEmotions {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed ^ 0xe407_1011),
            failure_rate: 0.0,
            labels: Emotion::ALL.iter().map(|e| e.as_str().to_string()).collect(),
        }
    }

    pub fn with_failure_rate(mut self, rate: f64) -> Self {
        self.failure_rate = rate.clamp(0.0, 1.0);
        self
    }

    /// Replace the label pool. Labels need not be valid emotions.
    pub fn with_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.labels = labels.into_iter().map(Into::into).collect();
        self
    }
}

impl EmotionClassifier for SyntheticEmotions {
    fn classify(&mut self, _frame: &Frame) -> std::result::Result<RawEmotion, InferenceError> {
        if self.labels.is_empty() || self.rng.gen_bool(self.failure_rate) {
            return Err(InferenceError::Emotion("classifier returned no result".into()));
        }
        let idx = self.rng.gen_range(0..self.labels.len());
        let mut raw = RawEmotion::new(self.labels[idx].clone());
        let confidence = self.rng.gen_range(0.4..0.95);
        raw.scores.insert(raw.dominant_emotion.clone(), confidence);
        Ok(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::FeatureExtractor;

    #[test]
    fn test_camera_requires_open() {
        let mut cam = SyntheticCamera::new(1);
        assert!(cam.acquire_frame().is_err());
        cam.open().unwrap();
        let frame = cam.acquire_frame().unwrap();
        assert_eq!(frame.pixels.len(), FRAME_SIDE * FRAME_SIDE);
        cam.release();
        assert!(!cam.is_open());
    }

    #[test]
    fn test_camera_fail_after() {
        let mut cam = SyntheticCamera::new(1).fail_after(2);
        cam.open().unwrap();
        assert!(cam.acquire_frame().is_ok());
        assert!(cam.acquire_frame().is_ok());
        assert!(matches!(cam.acquire_frame(), Err(Error::CaptureSourceUnavailable(_))));
    }

    #[test]
    fn test_same_seed_same_frames() {
        let mut a = SyntheticCamera::new(42);
        let mut b = SyntheticCamera::new(42);
        a.open().unwrap();
        b.open().unwrap();
        for _ in 0..5 {
            assert_eq!(a.acquire_frame().unwrap().pixels, b.acquire_frame().unwrap().pixels);
        }
    }

    #[test]
    fn test_pulse_amplitude_sets_green_swing() {
        let fx = FeatureExtractor::new();
        let swing = |amplitude: f64| {
            let mut cam = SyntheticCamera::new(4).with_pulse_amplitude(amplitude);
            cam.open().unwrap();
            let means: Vec<f64> = (0..30).map(|_| cam.acquire_frame().unwrap().mean_green()).collect();
            fx.pulse_proxy(&means, 255.0)
        };
        let weak = swing(0.5);
        let strong = swing(6.0);
        assert!(weak < 1.0, "weak swing {}", weak);
        assert!(strong > 3.0, "strong swing {}", strong);
    }

    #[test]
    fn test_stressed_face_fires_flags() {
        let frame = Frame::new(0, 0, vec![]);
        let fx = FeatureExtractor::new();
        let lm = SyntheticFace::new(3).with_stress(1.0).detect(&frame).unwrap();
        let geo = fx.facial_geometry(&lm);
        assert!(geo.brow_dist < 0.15);
        assert!(geo.eye_ratio < 0.10);
        assert!(geo.mouth_tension > 0.4);
    }

    #[test]
    fn test_failure_rate_one_always_fails() {
        let frame = Frame::new(0, 0, vec![]);
        let mut face = SyntheticFace::new(3).with_failure_rate(1.0);
        assert!(face.detect(&frame).is_err());
        let mut emotions = SyntheticEmotions::new(3).with_failure_rate(1.0);
        assert!(emotions.classify(&frame).is_err());
    }

    #[test]
    fn test_custom_label_pool() {
        let frame = Frame::new(0, 0, vec![]);
        let mut emotions = SyntheticEmotions::new(9).with_labels(["contempt"]);
        assert_eq!(emotions.classify(&frame).unwrap().dominant_emotion, "contempt");
    }
}
