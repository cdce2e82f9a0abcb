//! Optimal detection-to-prediction assignment
//!
//! Pairs detections with predicted track boxes so that total IoU is
//! maximal, then gates every pair on the IoU threshold. Every detection and
//! every prediction ends up in exactly one of: a match, the unmatched
//! detections, the unmatched predictions.

use crate::config::AssignmentStrategy;
use ndarray::ArrayView2;
use pathfinding::prelude::{kuhn_munkres, Matrix};

/// IoU is scaled to integer weights for Kuhn-Munkres
const IOU_WEIGHT_SCALE: f32 = 1_000_000.0;

/// Result of an assignment round
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssignmentResult {
    /// Accepted pairs as (detection_idx, prediction_idx)
    pub matches: Vec<(usize, usize)>,
    /// Detections without an accepted pair, ascending
    pub unmatched_detections: Vec<usize>,
    /// Predictions without an accepted pair, ascending
    pub unmatched_predictions: Vec<usize>,
    /// Sum of IoU over accepted pairs
    pub total_iou: f32,
}

impl AssignmentResult {
    /// Build the partition from the accepted pairs alone, so an empty pair
    /// list yields every index as unmatched.
    fn from_matches(iou_matrix: ArrayView2<f32>, matches: Vec<(usize, usize)>) -> Self {
        let (num_detections, num_predictions) = iou_matrix.dim();

        let mut detection_used = vec![false; num_detections];
        let mut prediction_used = vec![false; num_predictions];
        for &(d, p) in &matches {
            detection_used[d] = true;
            prediction_used[p] = true;
        }

        let total_iou = matches.iter().map(|&(d, p)| iou_matrix[[d, p]]).sum();

        Self {
            unmatched_detections: unused(&detection_used),
            unmatched_predictions: unused(&prediction_used),
            matches,
            total_iou,
        }
    }
}

fn unused(used: &[bool]) -> Vec<usize> {
    used.iter()
        .enumerate()
        .filter(|&(_, &u)| !u)
        .map(|(i, _)| i)
        .collect()
}

/// Hungarian assignment solver
pub struct HungarianSolver;

impl HungarianSolver {
    /// Solve the assignment over an IoU matrix
    ///
    /// # Arguments
    /// * `iou_matrix` - (n_detections, n_predictions) pairwise IoU
    /// * `iou_threshold` - pairs are kept only when IoU is strictly greater
    /// * `strategy` - optimal or greedy pairing
    pub fn solve_iou(
        iou_matrix: ArrayView2<f32>,
        iou_threshold: f32,
        strategy: AssignmentStrategy,
    ) -> AssignmentResult {
        let (num_detections, num_predictions) = iou_matrix.dim();

        if num_detections == 0 || num_predictions == 0 {
            log::debug!(
                "Empty assignment ({} detections, {} predictions), skipping solver",
                num_detections,
                num_predictions
            );
            return AssignmentResult::from_matches(iou_matrix, Vec::new());
        }

        let candidates = match strategy {
            AssignmentStrategy::Optimal => Self::solve_optimal(iou_matrix),
            AssignmentStrategy::Greedy => Self::solve_greedy(iou_matrix, iou_threshold),
        };

        let matches = candidates
            .into_iter()
            .filter(|&(d, p)| iou_matrix[[d, p]] > iou_threshold)
            .collect();

        AssignmentResult::from_matches(iou_matrix, matches)
    }

    /// Maximum-weight matching producing min(N, M) candidate pairs
    fn solve_optimal(iou_matrix: ArrayView2<f32>) -> Vec<(usize, usize)> {
        let (num_detections, num_predictions) = iou_matrix.dim();

        // kuhn_munkres needs rows <= columns
        let transposed = num_detections > num_predictions;
        let (rows, cols) = if transposed {
            (num_predictions, num_detections)
        } else {
            (num_detections, num_predictions)
        };

        let mut weights = Matrix::new(rows, cols, 0i64);
        for r in 0..rows {
            for c in 0..cols {
                let iou = if transposed {
                    iou_matrix[[c, r]]
                } else {
                    iou_matrix[[r, c]]
                };
                weights[(r, c)] = (iou * IOU_WEIGHT_SCALE).round() as i64;
            }
        }

        let (_, row_to_col) = kuhn_munkres(&weights);

        row_to_col
            .into_iter()
            .enumerate()
            .map(|(r, c)| if transposed { (c, r) } else { (r, c) })
            .collect()
    }

    /// Highest-IoU-first pairing over pairs above the threshold
    fn solve_greedy(iou_matrix: ArrayView2<f32>, iou_threshold: f32) -> Vec<(usize, usize)> {
        let (num_detections, num_predictions) = iou_matrix.dim();

        let mut candidates: Vec<(f32, usize, usize)> = iou_matrix
            .indexed_iter()
            .filter(|&(_, &iou)| iou > iou_threshold)
            .map(|((d, p), &iou)| (iou, d, p))
            .collect();

        // Stable sort keeps row-major order among equal IoU
        candidates.sort_by(|a, b| b.0.total_cmp(&a.0));

        let mut pairs = Vec::new();
        let mut detection_used = vec![false; num_detections];
        let mut prediction_used = vec![false; num_predictions];

        for (_, d, p) in candidates {
            if !detection_used[d] && !prediction_used[p] {
                detection_used[d] = true;
                prediction_used[p] = true;
                pairs.push((d, p));
            }
        }
        pairs
    }
}
