//! Real-time loop controller: capture -> inference -> score -> render
//!
//! State transitions:
//! - (start) -> RUNNING: capture source opened
//! - RUNNING -> DEGRADED_CYCLE: landmark or emotion inference failed this cycle
//! - DEGRADED_CYCLE -> RUNNING: placeholder rendered, next cycle proceeds
//! - RUNNING -> STOPPED: frame acquisition failed, stop requested, or cycle limit
//!
//! Cycles are strictly sequential. The stop signal is polled once per cycle,
//! after rendering. The capture source is released on every path into
//! STOPPED, and again (idempotently) when the controller is dropped.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::config::{RealtimeConfig, ScoringConfig};
use crate::core::{FeatureExtractor, PersonalityInferencer, ScoringEngine};
use crate::error::{Error, InferenceError, Result};
use crate::types::{
    BioSignalSample, CycleOutput, EmotionClassification, FaceLandmarks, Frame, LoopState, Point,
    RawEmotion, ReasonCode,
};

// =============================================================================
// EXTERNAL COLLABORATORS
// =============================================================================

/// Camera or other frame producer, exclusively owned by the loop
pub trait CaptureSource {
    /// Acquire the device. Failure means the loop never starts.
    fn open(&mut self) -> Result<()>;

    /// Blocking read of the next frame. Failure is fatal to the loop.
    fn acquire_frame(&mut self) -> Result<Frame>;

    /// Release the device. Must tolerate being called more than once.
    fn release(&mut self);
}

/// Black-box facial landmark model
pub trait LandmarkDetector {
    fn detect(&mut self, frame: &Frame) -> std::result::Result<FaceLandmarks, InferenceError>;
}

/// Black-box emotion model
pub trait EmotionClassifier {
    fn classify(&mut self, frame: &Frame) -> std::result::Result<RawEmotion, InferenceError>;
}

/// Receives every cycle output in capture order
pub trait Renderer {
    fn render(&mut self, output: &CycleOutput);
}

// =============================================================================
// SIGNALS
// =============================================================================

/// Operator-controlled flags shared with the loop
#[derive(Debug, Clone, Default)]
pub struct LoopSignals {
    stop: Arc<AtomicBool>,
    trigger: Arc<AtomicBool>,
}

impl LoopSignals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the loop to stop after the current cycle
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    pub fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    /// Mark or unmark a trigger interval (e.g. a direct question)
    pub fn set_triggered(&self, triggered: bool) {
        self.trigger.store(triggered, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.trigger.load(Ordering::SeqCst)
    }

    /// Flip the trigger flag; returns the new value
    pub fn toggle_triggered(&self) -> bool {
        !self.trigger.fetch_xor(true, Ordering::SeqCst)
    }
}

// =============================================================================
// SIGNAL HISTORY
// =============================================================================

/// Rolling windows the per-cycle features are computed from
#[derive(Debug, Default)]
struct SignalHistory {
    positions: VecDeque<Point>,
    green_means: VecDeque<f64>,
    calibration: Vec<f64>,
}

impl SignalHistory {
    fn record_frame(&mut self, frame: &Frame, window: usize) {
        push_bounded(&mut self.green_means, frame.mean_green(), window);
    }

    /// Track one position; returns (baseline_jitter, current_jitter).
    ///
    /// Only full windows feed the calibration baseline. Until the first one
    /// lands, the current value stands in as its own baseline.
    fn record_position(
        &mut self,
        point: Point,
        features: &FeatureExtractor,
        config: &RealtimeConfig,
    ) -> (f64, f64) {
        push_bounded(&mut self.positions, point, config.jitter_window);
        let positions: Vec<Point> = self.positions.iter().copied().collect();
        let current = features.path_displacement(&positions);

        let window_full = self.positions.len() >= config.jitter_window;
        if window_full && self.calibration.len() < config.calibration_cycles {
            self.calibration.push(current);
        }
        let baseline = if self.calibration.is_empty() {
            current
        } else {
            self.calibration.iter().sum::<f64>() / self.calibration.len() as f64
        };
        (baseline, current)
    }

    fn pulse(&self, features: &FeatureExtractor, gain: f64) -> f64 {
        let means: Vec<f64> = self.green_means.iter().copied().collect();
        features.pulse_proxy(&means, gain)
    }
}

fn push_bounded<T>(buf: &mut VecDeque<T>, value: T, cap: usize) {
    buf.push_back(value);
    while buf.len() > cap.max(1) {
        buf.pop_front();
    }
}

// =============================================================================
// CONTROLLER
// =============================================================================

/// Counters for a finished or running loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LoopSummary {
    pub cycles: u64,
    pub analyzed: u64,
    pub degraded: u64,
    pub state: LoopState,
    pub exit_reason: Option<ReasonCode>,
}

pub struct RealTimeLoopController<C: CaptureSource, L: LandmarkDetector, E: EmotionClassifier> {
    capture: C,
    landmarks: L,
    emotions: E,
    scorer: ScoringEngine,
    features: FeatureExtractor,
    personality: PersonalityInferencer,
    config: RealtimeConfig,
    signals: LoopSignals,
    history: SignalHistory,
    state: LoopState,
    capture_open: bool,
    cycles: u64,
    analyzed: u64,
    degraded: u64,
    exit_reason: Option<ReasonCode>,
}

impl<C: CaptureSource, L: LandmarkDetector, E: EmotionClassifier> RealTimeLoopController<C, L, E> {
    /// Take ownership of the capture source and both models
    pub fn new(
        capture: C,
        landmarks: L,
        emotions: E,
        scoring: ScoringConfig,
        config: RealtimeConfig,
        signals: LoopSignals,
    ) -> Self {
        Self {
            capture,
            landmarks,
            emotions,
            scorer: ScoringEngine::new(scoring),
            features: FeatureExtractor::new(),
            personality: PersonalityInferencer::new(),
            config,
            signals,
            history: SignalHistory::default(),
            // Not yet RUNNING: that requires the capture source.
            state: LoopState::Stopped,
            capture_open: false,
            cycles: 0,
            analyzed: 0,
            degraded: 0,
            exit_reason: None,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn signals(&self) -> &LoopSignals {
        &self.signals
    }

    pub fn summary(&self) -> LoopSummary {
        LoopSummary {
            cycles: self.cycles,
            analyzed: self.analyzed,
            degraded: self.degraded,
            state: self.state,
            exit_reason: self.exit_reason,
        }
    }

    /// Acquire the capture source and enter RUNNING
    pub fn start(&mut self) -> Result<()> {
        if self.capture_open {
            return Ok(());
        }
        if self.exit_reason.is_some() {
            return Err(Error::LoopNotRunning(self.state));
        }
        if let Err(e) = self.capture.open() {
            tracing::error!(error = %e, "capture source could not be opened");
            self.state = LoopState::Stopped;
            self.exit_reason = Some(ReasonCode::R301_CAPTURE_LOST);
            return Err(e);
        }
        self.capture_open = true;
        self.state = LoopState::Running;
        tracing::info!(profile = %self.scorer.config().profile, "analysis loop started");
        Ok(())
    }

    /// Run one full cycle and return what was rendered.
    ///
    /// Returns `Err` only when the cycle could not run at all: the loop is
    /// not running or the capture source failed (the loop is then STOPPED).
    pub fn step<R: Renderer>(&mut self, renderer: &mut R) -> Result<CycleOutput> {
        if self.state != LoopState::Running {
            return Err(Error::LoopNotRunning(self.state));
        }

        let frame = match self.capture.acquire_frame() {
            Ok(frame) => frame,
            Err(e) => {
                tracing::error!(error = %e, cycle = self.cycles + 1, "frame acquisition failed");
                self.stop(ReasonCode::R301_CAPTURE_LOST);
                return Err(match e {
                    Error::CaptureSourceUnavailable(msg) => Error::CaptureSourceUnavailable(msg),
                    other => Error::CaptureSourceUnavailable(other.to_string()),
                });
            }
        };

        self.cycles += 1;
        let cycle = self.cycles;
        self.history.record_frame(&frame, self.config.pulse_window);

        let output = match self.analyze(cycle, &frame) {
            Ok(output) => {
                self.analyzed += 1;
                if let CycleOutput::Analyzed { result, .. } = &output {
                    tracing::debug!(cycle, score = result.score, verdict = %result.verdict, "cycle analyzed");
                }
                output
            }
            Err((reason, detail)) => {
                self.state = LoopState::DegradedCycle;
                self.degraded += 1;
                tracing::warn!(cycle, reason = reason.code(), %detail, "degraded cycle");
                CycleOutput::degraded(cycle, reason, detail)
            }
        };

        renderer.render(&output);

        // A degraded cycle lasts exactly one cycle.
        self.state = LoopState::Running;

        if self.signals.stop_requested() {
            self.stop(ReasonCode::R302_STOP_REQUESTED);
        } else if self.config.max_cycles.is_some_and(|max| self.cycles >= max) {
            self.stop(ReasonCode::R303_CYCLE_LIMIT);
        }

        Ok(output)
    }

    /// Start and cycle until STOPPED
    pub fn run<R: Renderer>(&mut self, renderer: &mut R) -> Result<LoopSummary> {
        self.start()?;
        let interval = Duration::from_millis(self.config.cycle_interval_ms);

        while !self.state.is_terminal() {
            self.step(renderer)?;
            if self.state == LoopState::Running && !interval.is_zero() {
                std::thread::sleep(interval);
            }
        }
        Ok(self.summary())
    }

    /// Inference and scoring for one frame. `Err` carries the placeholder reason.
    fn analyze(&mut self, cycle: u64, frame: &Frame) -> std::result::Result<CycleOutput, (ReasonCode, String)> {
        let landmarks = self
            .landmarks
            .detect(frame)
            .map_err(|e| (ReasonCode::R102_LANDMARKS_UNAVAILABLE, e.to_string()))?;
        let raw = self
            .emotions
            .classify(frame)
            .map_err(|e| (ReasonCode::R103_EMOTION_UNAVAILABLE, e.to_string()))?;
        let classification = EmotionClassification::try_from(raw)
            .map_err(|e| (ReasonCode::R202_EMOTION_LABEL_UNRECOGNIZED, e.to_string()))?;

        let geometry = self.features.facial_geometry(&landmarks);
        let (baseline_jitter, current_jitter) =
            self.history
                .record_position(landmarks.nose_tip, &self.features, &self.config);
        let pulse_val = self.history.pulse(&self.features, self.config.pulse_gain);

        let sample = BioSignalSample::new(
            baseline_jitter,
            current_jitter,
            geometry.brow_dist,
            geometry.eye_ratio,
            geometry.mouth_tension,
            pulse_val,
            self.signals.is_triggered(),
        )
        .map_err(|e| (ReasonCode::R201_FEATURES_INVALID, e.to_string()))?;

        let result = self.scorer.score(&sample);
        let gaze = self.features.gaze_score(&landmarks);
        let movement = self.features.movement_score(current_jitter, self.config.movement_gain);
        let profile = self.personality.infer(&classification, gaze, movement);

        Ok(CycleOutput::analyzed(cycle, result, profile))
    }

    fn stop(&mut self, reason: ReasonCode) {
        self.release_capture();
        self.state = LoopState::Stopped;
        self.exit_reason = Some(reason);
        tracing::info!(
            reason = reason.code(),
            cycles = self.cycles,
            analyzed = self.analyzed,
            degraded = self.degraded,
            "analysis loop stopped"
        );
    }

    fn release_capture(&mut self) {
        if self.capture_open {
            self.capture.release();
            self.capture_open = false;
        }
    }
}

impl<C: CaptureSource, L: LandmarkDetector, E: EmotionClassifier> Drop for RealTimeLoopController<C, L, E> {
    fn drop(&mut self) {
        self.release_capture();
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;
    use crate::types::Verdict;

    /// Hands out `frames` frames, then fails
    struct ScriptedCamera {
        frames: usize,
        open_fails: bool,
        released: Rc<Cell<u32>>,
    }

    impl CaptureSource for ScriptedCamera {
        fn open(&mut self) -> Result<()> {
            if self.open_fails {
                return Err(Error::CaptureSourceUnavailable("no device".into()));
            }
            Ok(())
        }

        fn acquire_frame(&mut self) -> Result<Frame> {
            if self.frames == 0 {
                return Err(Error::CaptureSourceUnavailable("end of stream".into()));
            }
            self.frames -= 1;
            Ok(Frame::new(1, 1, vec![[0, 128, 0]]))
        }

        fn release(&mut self) {
            self.released.set(self.released.get() + 1);
        }
    }

    struct FixedLandmarks;

    impl LandmarkDetector for FixedLandmarks {
        fn detect(&mut self, _frame: &Frame) -> std::result::Result<FaceLandmarks, InferenceError> {
            Ok(FaceLandmarks::neutral())
        }
    }

    /// Returns the scripted labels in order; `None` is a failure
    struct ScriptedEmotions(VecDeque<Option<&'static str>>);

    impl EmotionClassifier for ScriptedEmotions {
        fn classify(&mut self, _frame: &Frame) -> std::result::Result<RawEmotion, InferenceError> {
            match self.0.pop_front().flatten() {
                Some(label) => Ok(RawEmotion::new(label)),
                None => Err(InferenceError::Emotion("model timeout".into())),
            }
        }
    }

    fn controller(
        frames: usize,
        labels: Vec<Option<&'static str>>,
        released: Rc<Cell<u32>>,
    ) -> RealTimeLoopController<ScriptedCamera, FixedLandmarks, ScriptedEmotions> {
        let config = RealtimeConfig {
            cycle_interval_ms: 0,
            ..RealtimeConfig::default()
        };
        RealTimeLoopController::new(
            ScriptedCamera { frames, open_fails: false, released },
            FixedLandmarks,
            ScriptedEmotions(labels.into()),
            ScoringConfig::extended(),
            config,
            LoopSignals::new(),
        )
    }

    #[test]
    fn test_start_enters_running() {
        let mut ctl = controller(1, vec![Some("neutral")], Rc::new(Cell::new(0)));
        assert_eq!(ctl.state(), LoopState::Stopped);
        ctl.start().unwrap();
        assert_eq!(ctl.state(), LoopState::Running);
    }

    #[test]
    fn test_analyzed_cycle_stays_running() {
        let mut ctl = controller(2, vec![Some("neutral"), Some("neutral")], Rc::new(Cell::new(0)));
        let mut out = Vec::new();
        ctl.start().unwrap();
        let first = ctl.step(&mut out).unwrap();
        assert!(!first.is_degraded());
        assert_eq!(first.reason(), ReasonCode::R101_CYCLE_ANALYZED);
        assert_eq!(ctl.state(), LoopState::Running);
        // still face, steady green channel: nothing fires
        if let CycleOutput::Analyzed { result, .. } = first {
            assert_eq!(result.score, 0.0);
            assert_eq!(result.verdict, Verdict::Coherent);
        }
    }

    #[test]
    fn test_degraded_cycle_recovers() {
        let mut ctl = controller(3, vec![None, Some("happy")], Rc::new(Cell::new(0)));
        let mut out = Vec::new();
        ctl.start().unwrap();

        let degraded = ctl.step(&mut out).unwrap();
        assert!(degraded.is_degraded());
        assert_eq!(degraded.reason(), ReasonCode::R103_EMOTION_UNAVAILABLE);
        assert_eq!(ctl.state(), LoopState::Running);

        let next = ctl.step(&mut out).unwrap();
        assert!(!next.is_degraded());
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_unrecognized_label_degrades_cycle() {
        let mut ctl = controller(1, vec![Some("contempt")], Rc::new(Cell::new(0)));
        let mut out = Vec::new();
        ctl.start().unwrap();
        let output = ctl.step(&mut out).unwrap();
        assert_eq!(output.reason(), ReasonCode::R202_EMOTION_LABEL_UNRECOGNIZED);
    }

    #[test]
    fn test_capture_loss_stops_and_releases() {
        let released = Rc::new(Cell::new(0));
        let mut ctl = controller(0, vec![], released.clone());
        let mut out = Vec::new();
        let err = ctl.run(&mut out).unwrap_err();
        assert!(matches!(err, Error::CaptureSourceUnavailable(_)));
        assert!(out.is_empty());
        assert_eq!(ctl.state(), LoopState::Stopped);
        assert_eq!(ctl.summary().exit_reason, Some(ReasonCode::R301_CAPTURE_LOST));
        assert_eq!(released.get(), 1);
        drop(ctl);
        assert_eq!(released.get(), 1, "release is not repeated on drop");
    }

    #[test]
    fn test_open_failure_never_runs() {
        let released = Rc::new(Cell::new(0));
        let mut ctl = RealTimeLoopController::new(
            ScriptedCamera { frames: 5, open_fails: true, released: released.clone() },
            FixedLandmarks,
            ScriptedEmotions(VecDeque::new()),
            ScoringConfig::extended(),
            RealtimeConfig::default(),
            LoopSignals::new(),
        );
        let mut out = Vec::new();
        assert!(ctl.run(&mut out).is_err());
        assert!(out.is_empty());
        assert_eq!(released.get(), 0);
    }

    #[test]
    fn test_stop_signal_checked_after_render() {
        let released = Rc::new(Cell::new(0));
        let mut ctl = controller(10, vec![Some("neutral"); 10], released.clone());
        let mut out = Vec::new();
        ctl.start().unwrap();
        ctl.signals().request_stop();
        ctl.step(&mut out).unwrap();
        assert_eq!(out.len(), 1, "the in-flight cycle completes");
        assert_eq!(ctl.state(), LoopState::Stopped);
        assert_eq!(ctl.summary().exit_reason, Some(ReasonCode::R302_STOP_REQUESTED));
        assert_eq!(released.get(), 1);
        assert!(matches!(ctl.step(&mut out), Err(Error::LoopNotRunning(LoopState::Stopped))));
        assert!(matches!(ctl.start(), Err(Error::LoopNotRunning(_))));
    }

    #[test]
    fn test_step_before_start_is_not_capture_loss() {
        let mut ctl = controller(1, vec![Some("neutral")], Rc::new(Cell::new(0)));
        let mut out = Vec::new();
        let err = ctl.step(&mut out).unwrap_err();
        assert!(matches!(err, Error::LoopNotRunning(LoopState::Stopped)));
        assert_eq!(err.kind(), "loop_not_running");
        assert_eq!(ctl.summary().exit_reason, None);
    }

    #[test]
    fn test_calibration_waits_for_full_window() {
        let features = FeatureExtractor::new();
        let config = RealtimeConfig {
            jitter_window: 3,
            calibration_cycles: 2,
            ..RealtimeConfig::default()
        };
        let mut history = SignalHistory::default();

        let (baseline, current) = history.record_position(Point::new(0.0, 0.0), &features, &config);
        assert_eq!((baseline, current), (0.0, 0.0));
        let (baseline, current) = history.record_position(Point::new(0.1, 0.0), &features, &config);
        assert_eq!(baseline, current, "no baseline before the first full window");
        assert!(history.calibration.is_empty());

        history.record_position(Point::new(0.2, 0.0), &features, &config);
        assert_eq!(history.calibration.len(), 1);
        history.record_position(Point::new(0.3, 0.0), &features, &config);
        history.record_position(Point::new(0.4, 0.0), &features, &config);
        assert_eq!(history.calibration.len(), 2, "calibration stops at calibration_cycles");
    }

    #[test]
    fn test_toggle_trigger() {
        let signals = LoopSignals::new();
        assert!(signals.toggle_triggered());
        assert!(signals.is_triggered());
        assert!(!signals.toggle_triggered());
        assert!(!signals.is_triggered());
    }

    #[test]
    fn test_drop_releases_running_capture() {
        let released = Rc::new(Cell::new(0));
        {
            let mut ctl = controller(10, vec![], released.clone());
            ctl.start().unwrap();
        }
        assert_eq!(released.get(), 1);
    }

    #[test]
    fn test_trigger_signal_reaches_sample() {
        let mut ctl = controller(1, vec![Some("fear")], Rc::new(Cell::new(0)));
        let mut out = Vec::new();
        ctl.start().unwrap();
        ctl.signals().set_triggered(true);
        let output = ctl.step(&mut out).unwrap();
        match output {
            CycleOutput::Analyzed { result, .. } => {
                assert!(result.contributing_factors.contains(&crate::types::Factor::TriggerInterval));
            }
            other => panic!("expected analyzed cycle, got {:?}", other),
        }
    }
}
