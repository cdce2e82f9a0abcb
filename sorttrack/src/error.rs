//! Error types for the tracker

use thiserror::Error;

/// Result type alias for the tracking library
pub type Result<T> = std::result::Result<T, TrackerError>;

/// Errors raised while building or driving a tracker
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrackerError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid detection at index {index}: {reason}")]
    InvalidDetection { index: usize, reason: String },

    #[error("Track {track_id} dropped: innovation covariance is singular")]
    SingularCovariance { track_id: u32 },
}

impl TrackerError {
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn invalid_detection<S: Into<String>>(index: usize, reason: S) -> Self {
        Self::InvalidDetection {
            index,
            reason: reason.into(),
        }
    }
}
