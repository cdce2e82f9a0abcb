//! Pure Rust SORT-style multi-object tracker
//!
//! Turns per-frame, unlabeled bounding boxes into boxes carrying stable
//! track identities. Detection, drawing and video I/O stay with the caller:
//! the tracker consumes boxes and returns `(box, id)` pairs.
//!
//! ```rust,ignore
//! use sorttrack::{Bbox, SortConfig, SortTracker};
//!
//! let mut tracker = SortTracker::new(SortConfig::new(30, 3, 0.3))?;
//! let result = tracker.update(&[Bbox::new(10.0, 10.0, 50.0, 50.0)]);
//! for t in &result.tracks {
//!     println!("track {} at {}", t.id, t.bbox);
//! }
//! ```

pub mod bbox;
pub mod config;
pub mod error;
pub mod hungarian; // Optimal assignment over IoU
pub mod kalman;
pub mod track;
pub mod tracker;

pub use bbox::{calculate_iou, iou_matrix, Bbox};
pub use config::{
    AssignmentStrategy, EstimatorConfig, InvalidDetectionPolicy, KalmanConfig, SortConfig,
};
pub use error::{Result, TrackerError};
pub use hungarian::{AssignmentResult, HungarianSolver};
pub use track::Track;
pub use tracker::{FrameResult, SortTracker, TrackedBox};
