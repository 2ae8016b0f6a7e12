//! Greedy IoU tracker giving detector output stable track ids.

use log::debug;

use super::pipeline::{VehicleDetector, VehicleTracker};
use super::{BoundingBox, ObjectDetection, TrackedObject};
use crate::Result;

#[derive(Clone, Debug, PartialEq)]
pub struct IouTrackerConfig {
    /// Minimum overlap for a detection to continue a track.
    pub min_iou: f32,
    /// Frames a track survives without being matched.
    pub max_age: u32,
}

impl Default for IouTrackerConfig {
    fn default() -> Self {
        Self {
            min_iou: 0.3,
            max_age: 30,
        }
    }
}

#[derive(Clone, Debug)]
struct Track {
    id: u64,
    bbox: BoundingBox,
    class_id: u32,
    frames_since_hit: u32,
}

/// Wraps a detector and assigns track ids across consecutive frames.
///
/// Each frame, detection/track pairs of the same class are taken greedily
/// by decreasing IoU.
/// Detections left over open new tracks; tracks left over age and are
/// retired once they exceed `max_age`.
pub struct IouTracker<D> {
    detector: D,
    config: IouTrackerConfig,
    tracks: Vec<Track>,
    next_id: u64,
}

impl<D> IouTracker<D> {
    pub fn new(detector: D, config: IouTrackerConfig) -> Self {
        Self {
            detector,
            config,
            tracks: Vec::new(),
            next_id: 1,
        }
    }

    pub fn live_tracks(&self) -> usize {
        self.tracks.len()
    }

    /// Assigns ids to one frame worth of detections, in detection order.
    pub fn update(&mut self, detections: Vec<ObjectDetection>) -> Vec<TrackedObject> {
        let mut pairs = Vec::new();
        for (det_idx, detection) in detections.iter().enumerate() {
            for (track_idx, track) in self.tracks.iter().enumerate() {
                if track.class_id != detection.class_id {
                    continue;
                }
                let iou = track.bbox.iou(&detection.bbox);
                if iou >= self.config.min_iou {
                    pairs.push((iou, det_idx, track_idx));
                }
            }
        }
        pairs.sort_by(|a, b| b.0.total_cmp(&a.0));

        let mut det_track = vec![None; detections.len()];
        let mut track_taken = vec![false; self.tracks.len()];
        for (_, det_idx, track_idx) in pairs {
            if det_track[det_idx].is_none() && !track_taken[track_idx] {
                det_track[det_idx] = Some(track_idx);
                track_taken[track_idx] = true;
            }
        }

        for (track, taken) in self.tracks.iter_mut().zip(&track_taken) {
            if !taken {
                track.frames_since_hit += 1;
            }
        }

        let mut tracked = Vec::with_capacity(detections.len());
        for (detection, slot) in detections.into_iter().zip(det_track) {
            let id = match slot {
                Some(track_idx) => {
                    let track = &mut self.tracks[track_idx];
                    track.bbox = detection.bbox;
                    track.frames_since_hit = 0;
                    track.id
                }
                None => {
                    let id = self.next_id;
                    self.next_id += 1;
                    self.tracks.push(Track {
                        id,
                        bbox: detection.bbox,
                        class_id: detection.class_id,
                        frames_since_hit: 0,
                    });
                    debug!("track {} opened at {}", id, detection.bbox);
                    id
                }
            };
            tracked.push(TrackedObject {
                bbox: detection.bbox,
                track_id: id,
                score: detection.score,
                class_id: detection.class_id,
            });
        }

        let max_age = self.config.max_age;
        self.tracks.retain(|track| {
            let alive = track.frames_since_hit <= max_age;
            if !alive {
                debug!("track {} retired", track.id);
            }
            alive
        });

        tracked
    }
}

impl<F, D: VehicleDetector<F>> VehicleTracker<F> for IouTracker<D> {
    fn track(&mut self, frame: &F) -> Result<Vec<TrackedObject>> {
        let detections = self.detector.detect_objects(frame)?;
        Ok(self.update(detections))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(x1: f32, y1: f32, x2: f32, y2: f32) -> ObjectDetection {
        ObjectDetection {
            bbox: BoundingBox::new(x1, y1, x2, y2),
            score: 0.9,
            class_id: 2,
        }
    }

    fn ids(objects: &[TrackedObject]) -> Vec<u64> {
        objects.iter().map(|o| o.track_id).collect()
    }

    #[test]
    fn overlapping_boxes_keep_their_ids() {
        let mut tracker = IouTracker::new((), IouTrackerConfig::default());
        let first = tracker.update(vec![det(0.0, 0.0, 100.0, 100.0), det(200.0, 0.0, 300.0, 100.0)]);
        assert_eq!(ids(&first), vec![1, 2]);

        let second = tracker.update(vec![det(205.0, 0.0, 305.0, 100.0), det(5.0, 0.0, 105.0, 100.0)]);
        assert_eq!(ids(&second), vec![2, 1]);
    }

    #[test]
    fn new_object_gets_fresh_id() {
        let mut tracker = IouTracker::new((), IouTrackerConfig::default());
        tracker.update(vec![det(0.0, 0.0, 10.0, 10.0)]);
        let next = tracker.update(vec![det(0.0, 0.0, 10.0, 10.0), det(50.0, 50.0, 60.0, 60.0)]);
        assert_eq!(ids(&next), vec![1, 2]);
    }

    #[test]
    fn best_overlap_wins_the_track() {
        let mut tracker = IouTracker::new((), IouTrackerConfig::default());
        tracker.update(vec![det(0.0, 0.0, 100.0, 100.0)]);
        let next = tracker.update(vec![det(40.0, 0.0, 140.0, 100.0), det(2.0, 0.0, 102.0, 100.0)]);
        assert_eq!(ids(&next), vec![2, 1]);
    }

    #[test]
    fn stale_tracks_are_retired() {
        let config = IouTrackerConfig {
            min_iou: 0.3,
            max_age: 1,
        };
        let mut tracker = IouTracker::new((), config);
        tracker.update(vec![det(0.0, 0.0, 10.0, 10.0)]);
        tracker.update(vec![]);
        assert_eq!(tracker.live_tracks(), 1);
        tracker.update(vec![]);
        assert_eq!(tracker.live_tracks(), 0);

        let back = tracker.update(vec![det(0.0, 0.0, 10.0, 10.0)]);
        assert_eq!(ids(&back), vec![2]);
    }

    #[test]
    fn other_classes_cannot_take_over_a_track() {
        let mut tracker = IouTracker::new((), IouTrackerConfig::default());
        let first = tracker.update(vec![det(0.0, 0.0, 100.0, 100.0)]);
        assert_eq!(ids(&first), vec![1]);

        let person = ObjectDetection {
            class_id: 0,
            ..det(0.0, 0.0, 100.0, 100.0)
        };
        let second = tracker.update(vec![person, det(10.0, 0.0, 110.0, 100.0)]);
        assert_eq!(ids(&second), vec![2, 1]);
        assert_eq!(second[0].class_id, 0);
    }

    struct Scripted(Vec<Vec<ObjectDetection>>);

    impl VehicleDetector<()> for Scripted {
        fn detect_objects(&mut self, _frame: &()) -> Result<Vec<ObjectDetection>> {
            Ok(if self.0.is_empty() { Vec::new() } else { self.0.remove(0) })
        }
    }

    #[test]
    fn tracks_through_detector() {
        let detector = Scripted(vec![
            vec![det(0.0, 0.0, 10.0, 10.0)],
            vec![det(1.0, 0.0, 11.0, 10.0)],
        ]);
        let mut tracker = IouTracker::new(detector, IouTrackerConfig::default());
        let a = tracker.track(&()).unwrap();
        let b = tracker.track(&()).unwrap();
        assert_eq!(a[0].track_id, b[0].track_id);
        assert_eq!(b[0].class_id, 2);
    }
}
