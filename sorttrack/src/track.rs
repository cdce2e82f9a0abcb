//! Single-object track: identity, hit bookkeeping and state estimate

use crate::bbox::Bbox;
use crate::config::EstimatorConfig;
use crate::error::{Result, TrackerError};
use crate::kalman::BoxKalmanFilter;

/// State estimator behind a track
#[derive(Debug, Clone)]
pub enum Estimator {
    /// Constant-position model with fixed-weight exponential smoothing
    Smoothing {
        /// [cx, cy, w, h]
        state: [f32; 4],
        alpha: f32,
    },
    Kalman(Box<BoxKalmanFilter>),
}

impl Estimator {
    pub fn new(bbox: &Bbox, config: &EstimatorConfig) -> Self {
        let z = bbox.to_state();
        match config {
            EstimatorConfig::Smoothing { alpha } => Self::Smoothing {
                state: z,
                alpha: *alpha,
            },
            EstimatorConfig::Kalman(params) => {
                Self::Kalman(Box::new(BoxKalmanFilter::new(z, params)))
            }
        }
    }

    fn predict(&mut self) {
        // Smoothing keeps the last estimate as the prediction
        if let Self::Kalman(kf) = self {
            kf.predict();
        }
    }

    fn update(&mut self, z: [f32; 4]) -> Option<()> {
        match self {
            Self::Smoothing { state, alpha } => {
                for (s, m) in state.iter_mut().zip(z) {
                    *s = *alpha * *s + (1.0 - *alpha) * m;
                }
                Some(())
            }
            Self::Kalman(kf) => kf.update(z),
        }
    }

    fn state(&self) -> [f32; 4] {
        match self {
            Self::Smoothing { state, .. } => *state,
            Self::Kalman(kf) => kf.measurement_state(),
        }
    }
}

/// One tracked object
#[derive(Debug, Clone)]
pub struct Track {
    id: u32,
    estimator: Estimator,
    /// Frames since creation, the creation frame included
    age: u32,
    /// Frames with a matched detection, the founding detection included
    hits: u32,
}

impl Track {
    /// Start a track on its founding detection
    pub(crate) fn new(id: u32, bbox: &Bbox, estimator: &EstimatorConfig) -> Self {
        Self {
            id,
            estimator: Estimator::new(bbox, estimator),
            age: 1,
            hits: 1,
        }
    }

    /// Advance one frame and return the predicted box
    pub fn predict(&mut self) -> Bbox {
        self.estimator.predict();
        self.age += 1;
        self.bbox()
    }

    /// Absorb the detection matched to this track in the current frame
    ///
    /// At most one hit counts per frame, so `hits <= age` holds even if a
    /// second detection is folded in before the next `predict`.
    pub(crate) fn update(&mut self, bbox: &Bbox) -> Result<()> {
        self.estimator
            .update(bbox.to_state())
            .ok_or(TrackerError::SingularCovariance { track_id: self.id })?;
        self.hits = (self.hits + 1).min(self.age);
        Ok(())
    }

    /// Current estimate in corner form
    pub fn bbox(&self) -> Bbox {
        Bbox::from_state(&self.estimator.state())
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn age(&self) -> u32 {
        self.age
    }

    pub fn hits(&self) -> u32 {
        self.hits
    }

    /// Frames since the last matched detection
    pub fn staleness(&self) -> u32 {
        self.age.saturating_sub(self.hits)
    }

    pub fn estimator(&self) -> &Estimator {
        &self.estimator
    }
}
