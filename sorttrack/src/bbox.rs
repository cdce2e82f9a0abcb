//! Bounding box operations and IoU calculations

use crate::error::{Result, TrackerError};
use ndarray::Array2;
use rayon::prelude::*;
use std::fmt;

/// Pair count above which the IoU matrix is filled in parallel
const PARALLEL_MIN_PAIRS: usize = 1024;

/// Axis-aligned bounding box in corner form, pixel units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bbox {
    pub xmin: f32,
    pub ymin: f32,
    pub xmax: f32,
    pub ymax: f32,
}

impl Bbox {
    pub fn new(xmin: f32, ymin: f32, xmax: f32, ymax: f32) -> Self {
        Self {
            xmin,
            ymin,
            xmax,
            ymax,
        }
    }

    /// Parse one detection row `[xmin, ymin, xmax, ymax]`
    ///
    /// Rows of any other length and rows holding NaN or infinite
    /// coordinates are rejected. Inverted boxes are accepted and behave as
    /// zero-area boxes.
    pub fn from_row(index: usize, row: &[f32]) -> Result<Self> {
        match *row {
            [xmin, ymin, xmax, ymax] => {
                let bbox = Self::new(xmin, ymin, xmax, ymax);
                bbox.validate(index)?;
                Ok(bbox)
            }
            _ => Err(TrackerError::invalid_detection(
                index,
                format!("expected 4 coordinates, got {}", row.len()),
            )),
        }
    }

    /// Reject boxes with non-finite coordinates
    pub fn validate(&self, index: usize) -> Result<()> {
        if self.is_finite() {
            Ok(())
        } else {
            Err(TrackerError::invalid_detection(
                index,
                format!("non-finite coordinates {}", self),
            ))
        }
    }

    pub fn is_finite(&self) -> bool {
        self.to_bounds().iter().all(|v| v.is_finite())
    }

    pub fn width(&self) -> f32 {
        self.xmax - self.xmin
    }

    pub fn height(&self) -> f32 {
        self.ymax - self.ymin
    }

    /// Area, with inverted extents counted as zero
    pub fn area(&self) -> f32 {
        self.width().max(0.0) * self.height().max(0.0)
    }

    pub fn center_x(&self) -> f32 {
        (self.xmin + self.xmax) / 2.0
    }

    pub fn center_y(&self) -> f32 {
        (self.ymin + self.ymax) / 2.0
    }

    /// Convert to bounds array [xmin, ymin, xmax, ymax]
    pub fn to_bounds(&self) -> [f32; 4] {
        [self.xmin, self.ymin, self.xmax, self.ymax]
    }

    /// Convert to estimator state [center_x, center_y, width, height]
    pub fn to_state(&self) -> [f32; 4] {
        [self.center_x(), self.center_y(), self.width(), self.height()]
    }

    /// Create from estimator state [center_x, center_y, width, height]
    pub fn from_state(state: &[f32; 4]) -> Self {
        let [cx, cy, w, h] = *state;
        Self {
            xmin: cx - w / 2.0,
            ymin: cy - h / 2.0,
            xmax: cx + w / 2.0,
            ymax: cy + h / 2.0,
        }
    }
}

impl From<[f32; 4]> for Bbox {
    fn from(bounds: [f32; 4]) -> Self {
        Self::new(bounds[0], bounds[1], bounds[2], bounds[3])
    }
}

impl fmt::Display for Bbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Bbox({}, {}, {}, {})",
            self.xmin, self.ymin, self.xmax, self.ymax
        )
    }
}

/// Overlap of two boxes, `None` when they share no interior
fn intersection(a: &Bbox, b: &Bbox) -> Option<Bbox> {
    let overlap = Bbox::new(
        a.xmin.max(b.xmin),
        a.ymin.max(b.ymin),
        a.xmax.min(b.xmax),
        a.ymax.min(b.ymax),
    );
    (overlap.width() > 0.0 && overlap.height() > 0.0).then_some(overlap)
}

/// Calculate IoU between two bounding boxes
///
/// Inverted boxes count as zero-area. Returns 0.0 for disjoint boxes and
/// when the union has zero area.
pub fn calculate_iou(a: &Bbox, b: &Bbox) -> f32 {
    let Some(overlap) = intersection(a, b) else {
        return 0.0;
    };

    let inter = overlap.area();
    let union = a.area() + b.area() - inter;
    if union > 0.0 {
        inter / union
    } else {
        0.0
    }
}

/// IoU matrix between detections and predictions
/// Returns: (n_detections, n_predictions) matrix
pub fn iou_matrix(detections: &[Bbox], predictions: &[Bbox]) -> Array2<f32> {
    let shape = (detections.len(), predictions.len());

    if shape.0 * shape.1 < PARALLEL_MIN_PAIRS {
        return Array2::from_shape_fn(shape, |(d, p)| {
            calculate_iou(&detections[d], &predictions[p])
        });
    }

    // One detection row per rayon task
    let mut ious = Array2::zeros(shape);
    if let Some(cells) = ious.as_slice_mut() {
        cells
            .par_chunks_mut(predictions.len())
            .zip(detections.par_iter())
            .for_each(|(row, det)| {
                for (iou, pred) in row.iter_mut().zip(predictions) {
                    *iou = calculate_iou(det, pred);
                }
            });
    }
    ious
}
