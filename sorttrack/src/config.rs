//! Tracker configuration

use crate::error::{Result, TrackerError};
use serde::{Deserialize, Serialize};

/// Default blend weight given to the previous estimate on update
pub const DEFAULT_SMOOTHING_ALPHA: f32 = 0.7;

/// Noise parameters for the constant-velocity Kalman estimator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KalmanConfig {
    /// Process noise for position and size (pixels)
    pub process_noise_pos: f32,
    /// Process noise for velocity (pixels/frame)
    pub process_noise_vel: f32,
    /// Measurement noise (pixels) - detector bbox jitter
    pub measurement_noise: f32,
    /// Initial state covariance
    pub initial_covariance: f32,
}

impl Default for KalmanConfig {
    fn default() -> Self {
        Self {
            process_noise_pos: 0.5,
            process_noise_vel: 2.0,
            measurement_noise: 2.0,
            initial_covariance: 10.0,
        }
    }
}

impl KalmanConfig {
    fn validate(&self) -> Result<()> {
        let params = [
            ("process_noise_pos", self.process_noise_pos),
            ("process_noise_vel", self.process_noise_vel),
            ("measurement_noise", self.measurement_noise),
            ("initial_covariance", self.initial_covariance),
        ];
        for (name, value) in params {
            if !value.is_finite() || value <= 0.0 {
                return Err(TrackerError::config(format!(
                    "{} must be positive and finite, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

/// How each track turns measurements into a state estimate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EstimatorConfig {
    /// Constant-position model with `state = alpha * state + (1 - alpha) * measurement`
    Smoothing { alpha: f32 },
    /// Constant-velocity Kalman filter
    Kalman(KalmanConfig),
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self::Smoothing {
            alpha: DEFAULT_SMOOTHING_ALPHA,
        }
    }
}

/// Detection-to-prediction pairing algorithm
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStrategy {
    /// Maximum total IoU matching (Kuhn-Munkres)
    #[default]
    Optimal,
    /// Highest IoU pair first; cheaper but not optimal
    Greedy,
}

/// What to do with a frame that contains malformed detections
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidDetectionPolicy {
    /// Drop the offending boxes and process the rest of the frame
    #[default]
    SkipInvalid,
    /// Process the frame as if it had no detections
    RejectFrame,
}

/// SORT tracker parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SortConfig {
    /// Frames without a matched detection after which a track is dropped
    pub max_age: u32,
    /// Hits needed before a track is reported
    pub min_hits: u32,
    /// A pair is accepted only when its IoU strictly exceeds this value
    pub iou_threshold: f32,
    pub estimator: EstimatorConfig,
    pub assignment: AssignmentStrategy,
    pub invalid_detections: InvalidDetectionPolicy,
}

impl Default for SortConfig {
    fn default() -> Self {
        Self {
            max_age: 30,
            min_hits: 3,
            iou_threshold: 0.3,
            estimator: EstimatorConfig::default(),
            assignment: AssignmentStrategy::default(),
            invalid_detections: InvalidDetectionPolicy::default(),
        }
    }
}

impl SortConfig {
    pub fn new(max_age: u32, min_hits: u32, iou_threshold: f32) -> Self {
        Self {
            max_age,
            min_hits,
            iou_threshold,
            ..Default::default()
        }
    }

    pub fn with_estimator(mut self, estimator: EstimatorConfig) -> Self {
        self.estimator = estimator;
        self
    }

    pub fn with_assignment(mut self, assignment: AssignmentStrategy) -> Self {
        self.assignment = assignment;
        self
    }

    pub fn with_invalid_detections(mut self, policy: InvalidDetectionPolicy) -> Self {
        self.invalid_detections = policy;
        self
    }

    /// Check every parameter, failing on the first invalid one
    pub fn validate(&self) -> Result<()> {
        if self.max_age == 0 {
            return Err(TrackerError::config("max_age must be positive"));
        }
        if self.min_hits == 0 {
            return Err(TrackerError::config("min_hits must be positive"));
        }
        if !(0.0..1.0).contains(&self.iou_threshold) {
            return Err(TrackerError::config(format!(
                "iou_threshold must be in [0, 1), got {}",
                self.iou_threshold
            )));
        }
        match &self.estimator {
            EstimatorConfig::Smoothing { alpha } => {
                if !(0.0..=1.0).contains(alpha) {
                    return Err(TrackerError::config(format!(
                        "smoothing alpha must be in [0, 1], got {}",
                        alpha
                    )));
                }
            }
            EstimatorConfig::Kalman(kalman) => kalman.validate()?,
        }
        Ok(())
    }
}
