//! SORT (Simple Online Real-time Tracking) lifecycle manager
//!
//! Each frame: predict every live track, pair predictions with detections by
//! IoU, update matched tracks, start tracks for unmatched detections, prune
//! stale tracks and report the confirmed ones.

use crate::bbox::{iou_matrix, Bbox};
use crate::config::{InvalidDetectionPolicy, SortConfig};
use crate::error::{Result, TrackerError};
use crate::hungarian::HungarianSolver;
use crate::track::Track;
use ndarray::{Array2, ArrayView2};
use std::collections::BTreeMap;

/// A confirmed track as reported for one frame
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedBox {
    pub id: u32,
    pub bbox: Bbox,
}

/// Outcome of one `update` call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameResult {
    /// 1-based index of the processed frame
    pub frame: u32,
    /// Confirmed, non-stale tracks in creation order
    pub tracks: Vec<TrackedBox>,
    /// Input indices of detections that were not fed to the tracker
    pub rejected: Vec<usize>,
    /// Why detections were rejected or tracks dropped
    pub errors: Vec<TrackerError>,
}

impl FrameResult {
    /// Tracks as an (M, 5) array of [x1, y1, x2, y2, track_id]
    pub fn to_array(&self) -> Array2<f32> {
        Array2::from_shape_fn((self.tracks.len(), 5), |(i, j)| {
            let t = &self.tracks[i];
            match j {
                4 => t.id as f32,
                _ => t.bbox.to_bounds()[j],
            }
        })
    }

    pub fn ids(&self) -> Vec<u32> {
        self.tracks.iter().map(|t| t.id).collect()
    }
}

/// SORT tracker owning every live track
#[derive(Debug, Clone)]
pub struct SortTracker {
    config: SortConfig,
    /// Keyed by id, so iteration follows creation order
    tracks: BTreeMap<u32, Track>,
    next_track_id: u32,
    frame_count: u32,
}

impl SortTracker {
    /// Build a tracker, refusing invalid parameters
    pub fn new(config: SortConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            tracks: BTreeMap::new(),
            next_track_id: 1,
            frame_count: 0,
        })
    }

    /// Process one frame of detection boxes
    pub fn update(&mut self, detections: &[Bbox]) -> FrameResult {
        let screened = detections
            .iter()
            .enumerate()
            .map(|(index, bbox)| bbox.validate(index).map(|_| *bbox))
            .collect();
        self.screen_and_step(screened)
    }

    /// Process one frame of raw `[x1, y1, x2, y2]` rows
    pub fn update_rows<R: AsRef<[f32]>>(&mut self, rows: &[R]) -> FrameResult {
        let screened = rows
            .iter()
            .enumerate()
            .map(|(index, row)| Bbox::from_row(index, row.as_ref()))
            .collect();
        self.screen_and_step(screened)
    }

    /// Process one frame given as an (N, 4) array
    pub fn update_array(&mut self, detections: ArrayView2<f32>) -> FrameResult {
        let rows: Vec<Vec<f32>> = detections.outer_iter().map(|row| row.to_vec()).collect();
        self.update_rows(&rows)
    }

    fn screen_and_step(&mut self, screened: Vec<Result<Bbox>>) -> FrameResult {
        let mut detections = Vec::with_capacity(screened.len());
        let mut accepted = Vec::with_capacity(screened.len());
        let mut errors = Vec::new();

        for (index, outcome) in screened.into_iter().enumerate() {
            match outcome {
                Ok(bbox) => {
                    detections.push(bbox);
                    accepted.push(index);
                }
                Err(e) => {
                    log::warn!("Frame {}: {}", self.frame_count + 1, e);
                    errors.push(e);
                }
            }
        }

        let mut rejected: Vec<usize> = errors
            .iter()
            .filter_map(|e| match e {
                TrackerError::InvalidDetection { index, .. } => Some(*index),
                _ => None,
            })
            .collect();

        let reject_frame =
            self.config.invalid_detections == InvalidDetectionPolicy::RejectFrame;
        if reject_frame && !errors.is_empty() {
            log::warn!(
                "Frame {}: rejecting all {} detections",
                self.frame_count + 1,
                accepted.len() + rejected.len()
            );
            rejected.append(&mut accepted);
            rejected.sort_unstable();
            detections.clear();
        }

        let mut result = self.step(&detections);
        result.rejected = rejected;
        errors.append(&mut result.errors);
        result.errors = errors;
        result
    }

    /// predict -> associate -> update -> spawn -> prune -> emit
    fn step(&mut self, detections: &[Bbox]) -> FrameResult {
        self.frame_count += 1;
        let mut errors = Vec::new();

        let (track_ids, predictions): (Vec<u32>, Vec<Bbox>) = self
            .tracks
            .iter_mut()
            .map(|(&id, track)| (id, track.predict()))
            .unzip();

        let ious = iou_matrix(detections, &predictions);
        let assignment = HungarianSolver::solve_iou(
            ious.view(),
            self.config.iou_threshold,
            self.config.assignment,
        );

        for &(det_idx, pred_idx) in &assignment.matches {
            let track_id = track_ids[pred_idx];
            let outcome = self
                .tracks
                .get_mut(&track_id)
                .map(|track| track.update(&detections[det_idx]));
            if let Some(Err(e)) = outcome {
                log::warn!("Frame {}: {}", self.frame_count, e);
                self.tracks.remove(&track_id);
                errors.push(e);
            }
        }

        for &det_idx in &assignment.unmatched_detections {
            let id = self.next_track_id;
            self.next_track_id += 1;
            self.tracks
                .insert(id, Track::new(id, &detections[det_idx], &self.config.estimator));
        }

        let max_age = self.config.max_age;
        let before = self.tracks.len();
        self.tracks.retain(|_, track| track.staleness() < max_age);

        log::debug!(
            "Frame {}: {} detections, {} matched, {} new, {} pruned, {} live",
            self.frame_count,
            detections.len(),
            assignment.matches.len(),
            assignment.unmatched_detections.len(),
            before - self.tracks.len(),
            self.tracks.len()
        );

        FrameResult {
            frame: self.frame_count,
            tracks: self.confirmed_tracks(),
            rejected: Vec::new(),
            errors,
        }
    }

    /// Tracks with enough hits, or every track during the first `min_hits` frames
    fn confirmed_tracks(&self) -> Vec<TrackedBox> {
        let min_hits = self.config.min_hits;
        let warming_up = self.frame_count <= min_hits;
        self.tracks
            .values()
            .filter(|track| warming_up || track.hits() >= min_hits)
            .map(|track| TrackedBox {
                id: track.id(),
                bbox: track.bbox(),
            })
            .collect()
    }

    /// Live tracks in creation order, confirmed or not
    pub fn tracks(&self) -> impl Iterator<Item = &Track> {
        self.tracks.values()
    }

    pub fn track(&self, id: u32) -> Option<&Track> {
        self.tracks.get(&id)
    }

    pub fn num_tracks(&self) -> usize {
        self.tracks.len()
    }

    /// Frames processed so far
    pub fn frame_count(&self) -> u32 {
        self.frame_count
    }

    /// Identities handed out so far
    pub fn tracks_created(&self) -> u32 {
        self.next_track_id - 1
    }

    pub fn config(&self) -> &SortConfig {
        &self.config
    }

    /// Drop one track; returns whether it was live
    pub fn remove_track(&mut self, id: u32) -> bool {
        self.tracks.remove(&id).is_some()
    }

    /// Drop all tracks and restart the frame count. Identities keep
    /// increasing so ids are never reused.
    pub fn clear(&mut self) {
        self.tracks.clear();
        self.frame_count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AssignmentStrategy, EstimatorConfig, KalmanConfig};
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn tracker(max_age: u32, min_hits: u32) -> SortTracker {
        SortTracker::new(SortConfig::new(max_age, min_hits, 0.3)).unwrap()
    }

    #[test]
    fn test_rejects_invalid_config() {
        assert!(matches!(
            SortTracker::new(SortConfig::new(0, 1, 0.3)),
            Err(TrackerError::Configuration(_))
        ));
        assert!(SortTracker::new(SortConfig::new(1, 1, 1.0)).is_err());
    }

    #[test]
    fn test_first_update_creates_tracks() {
        let mut tracker = tracker(5, 2);
        let result = tracker.update(&[
            Bbox::new(10.0, 10.0, 50.0, 50.0),
            Bbox::new(60.0, 60.0, 100.0, 100.0),
        ]);

        assert_eq!(result.frame, 1);
        assert_eq!(result.ids(), vec![1, 2]);
        assert!(result.rejected.is_empty());
        assert_eq!(tracker.num_tracks(), 2);
        assert_eq!(tracker.tracks_created(), 2);
    }

    #[test]
    fn test_empty_frames() {
        let mut tracker = tracker(2, 1);
        let result = tracker.update(&[]);
        assert!(result.tracks.is_empty());
        assert_eq!(tracker.frame_count(), 1);
    }

    #[test]
    fn test_invalid_detection_skipped() {
        let mut tracker = tracker(3, 1);
        let result = tracker.update(&[
            Bbox::new(f32::NAN, 0.0, 10.0, 10.0),
            Bbox::new(20.0, 20.0, 30.0, 30.0),
        ]);

        assert_eq!(result.rejected, vec![0]);
        assert!(matches!(
            result.errors.as_slice(),
            [TrackerError::InvalidDetection { index: 0, .. }]
        ));
        assert_eq!(result.tracks.len(), 1);
        assert_eq!(result.tracks[0].bbox, Bbox::new(20.0, 20.0, 30.0, 30.0));
    }

    #[test]
    fn test_reject_frame_policy_keeps_tracks_aging() {
        let config = SortConfig::new(2, 1, 0.3)
            .with_invalid_detections(InvalidDetectionPolicy::RejectFrame);
        let mut tracker = SortTracker::new(config).unwrap();

        let good = Bbox::new(0.0, 0.0, 10.0, 10.0);
        tracker.update(&[good]);

        let result = tracker.update(&[good, Bbox::new(0.0, f32::INFINITY, 1.0, 1.0)]);
        assert_eq!(result.rejected, vec![0, 1]);
        assert_eq!(result.errors.len(), 1);
        // the frame counted as empty for the live track
        assert_eq!(tracker.track(1).unwrap().staleness(), 1);
        assert_eq!(result.ids(), vec![1]);

        let result = tracker.update(&[]);
        assert!(result.tracks.is_empty());
        assert_eq!(tracker.num_tracks(), 0);
    }

    #[test]
    fn test_update_rows_rejects_short_rows() {
        let mut tracker = tracker(3, 1);
        let rows = vec![vec![0.0, 0.0, 10.0], vec![0.0, 0.0, 10.0, 10.0]];
        let result = tracker.update_rows(&rows);
        assert_eq!(result.rejected, vec![0]);
        assert_eq!(result.ids(), vec![1]);
    }

    #[test]
    fn test_update_array_layout() {
        let mut tracker = tracker(3, 1);
        let detections = array![[10.0, 10.0, 50.0, 50.0], [60.0, 60.0, 100.0, 100.0]];
        let result = tracker.update_array(detections.view());

        let out = result.to_array();
        assert_eq!(out.dim(), (2, 5));
        assert_abs_diff_eq!(out[[0, 0]], 10.0, epsilon = 1e-5);
        assert_abs_diff_eq!(out[[1, 3]], 100.0, epsilon = 1e-5);
        assert_eq!(out[[0, 4]], 1.0);
        assert_eq!(out[[1, 4]], 2.0);

        // wrong column count rejects every row
        let result = tracker.update_array(array![[1.0, 2.0, 3.0]].view());
        assert_eq!(result.rejected, vec![0]);
    }

    #[test]
    fn test_moving_object_keeps_id() {
        let mut tracker = tracker(3, 1);
        for step in 0..10 {
            let o = step as f32 * 2.0;
            let result = tracker.update(&[Bbox::new(o, 0.0, o + 20.0, 20.0)]);
            assert_eq!(result.ids(), vec![1]);
        }
        assert_eq!(tracker.track(1).unwrap().hits(), 10);
    }

    #[test]
    fn test_greedy_and_kalman_configs() {
        let config = SortConfig::new(3, 1, 0.3)
            .with_assignment(AssignmentStrategy::Greedy)
            .with_estimator(EstimatorConfig::Kalman(KalmanConfig::default()));
        let mut tracker = SortTracker::new(config).unwrap();

        for step in 0..8 {
            let o = step as f32 * 4.0;
            let result = tracker.update(&[
                Bbox::new(o, 0.0, o + 20.0, 20.0),
                Bbox::new(200.0 - o, 100.0, 220.0 - o, 120.0),
            ]);
            assert_eq!(result.ids(), vec![1, 2]);
        }
    }

    #[test]
    fn test_clear_never_reuses_ids() {
        let mut tracker = tracker(3, 1);
        tracker.update(&[Bbox::new(0.0, 0.0, 10.0, 10.0)]);
        tracker.clear();
        assert_eq!(tracker.num_tracks(), 0);
        assert_eq!(tracker.frame_count(), 0);

        let result = tracker.update(&[Bbox::new(0.0, 0.0, 10.0, 10.0)]);
        assert_eq!(result.ids(), vec![2]);
    }

    #[test]
    fn test_remove_track() {
        let mut tracker = tracker(3, 1);
        tracker.update(&[Bbox::new(0.0, 0.0, 10.0, 10.0)]);
        assert!(tracker.remove_track(1));
        assert!(!tracker.remove_track(1));
        assert_eq!(tracker.num_tracks(), 0);
    }

    #[test]
    fn test_singular_covariance_drops_track() {
        let mut tracker = tracker(3, 1);
        // bypasses config validation to get a filter that cannot update
        tracker.config.estimator = EstimatorConfig::Kalman(KalmanConfig {
            initial_covariance: f32::NAN,
            ..KalmanConfig::default()
        });

        let bbox = Bbox::new(0.0, 0.0, 10.0, 10.0);
        assert_eq!(tracker.update(&[bbox]).ids(), vec![1]);

        let result = tracker.update(&[bbox]);
        assert_eq!(
            result.errors,
            vec![TrackerError::SingularCovariance { track_id: 1 }]
        );
        assert!(result.tracks.is_empty());
        assert!(result.rejected.is_empty());
        assert!(tracker.track(1).is_none());
        assert_eq!(tracker.num_tracks(), 0);
        assert_eq!(tracker.tracks_created(), 1);
    }
}
