pub mod matcher;
pub mod pipeline;
pub mod plate_text;
pub mod preprocess;
pub mod record;
pub mod serializer;
pub mod store;
pub mod tracker;

#[cfg(feature = "opencv")]
pub mod dnn_ocr;
#[cfg(feature = "opencv")]
pub mod object_detector;
#[cfg(feature = "opencv")]
pub mod video_reader;

use std::fmt;

/// COCO class ids for car, motorcycle, bus and truck.
pub const DEFAULT_VEHICLE_CLASSES: [u32; 4] = [2, 3, 5, 7];

/// Axis aligned box in pixel coordinates, `(x1, y1)` top left and
/// `(x2, y2)` bottom right.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    pub const fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> f32 {
        (self.x2 - self.x1).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.y2 - self.y1).max(0.0)
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// True when `inner` lies entirely within `self`, edges included.
    pub fn contains(&self, inner: &BoundingBox) -> bool {
        self.x1 <= inner.x1 && self.y1 <= inner.y1 && inner.x2 <= self.x2 && inner.y2 <= self.y2
    }

    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let ix1 = self.x1.max(other.x1);
        let iy1 = self.y1.max(other.y1);
        let ix2 = self.x2.min(other.x2);
        let iy2 = self.y2.min(other.y2);
        let intersection = (ix2 - ix1).max(0.0) * (iy2 - iy1).max(0.0);
        let union = self.area() + other.area() - intersection;
        if union <= 0.0 {
            return 0.0;
        }
        intersection / union
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} {} {} {}]", self.x1, self.y1, self.x2, self.y2)
    }
}

/// Raw detector output, before any tracking.
#[derive(Clone, Debug, PartialEq)]
pub struct ObjectDetection {
    pub bbox: BoundingBox,
    pub score: f32,
    pub class_id: u32,
}

/// Tracker output. The class id is kept so that the pipeline can drop
/// anything that is not a vehicle.
#[derive(Clone, Debug, PartialEq)]
pub struct TrackedObject {
    pub bbox: BoundingBox,
    pub track_id: u64,
    pub score: f32,
    pub class_id: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct VehicleDetection {
    pub bbox: BoundingBox,
    pub track_id: u64,
    pub score: f32,
}

impl VehicleDetection {
    pub fn new(bbox: BoundingBox, track_id: u64, score: f32) -> Self {
        Self {
            bbox,
            track_id,
            score,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PlateDetection {
    pub bbox: BoundingBox,
    pub score: f32,
}

impl PlateDetection {
    pub fn new(bbox: BoundingBox, score: f32) -> Self {
        Self { bbox, score }
    }
}

/// OCR outcome for one plate crop. An empty `text` means nothing legible.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PlateReading {
    pub text: String,
    pub score: f32,
}

impl PlateReading {
    pub fn new(text: impl Into<String>, score: f32) -> Self {
        Self {
            text: text.into(),
            score,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Allow-list of detector class ids that count as vehicles.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VehicleClasses {
    class_ids: Vec<u32>,
}

impl VehicleClasses {
    pub fn new(class_ids: impl IntoIterator<Item = u32>) -> Self {
        Self {
            class_ids: class_ids.into_iter().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.class_ids.is_empty()
    }

    pub fn allows(&self, class_id: u32) -> bool {
        self.class_ids.contains(&class_id)
    }

    /// Keeps the tracked objects whose class is allowed, preserving order.
    pub fn filter(&self, objects: Vec<TrackedObject>) -> Vec<VehicleDetection> {
        objects
            .into_iter()
            .filter(|object| self.allows(object.class_id))
            .map(|object| VehicleDetection::new(object.bbox, object.track_id, object.score))
            .collect()
    }
}

impl Default for VehicleClasses {
    fn default() -> Self {
        Self::new(DEFAULT_VEHICLE_CLASSES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn containment_is_inclusive_of_edges() {
        let outer = BoundingBox::new(0.0, 0.0, 100.0, 100.0);
        assert!(outer.contains(&BoundingBox::new(0.0, 0.0, 100.0, 100.0)));
        assert!(!outer.contains(&BoundingBox::new(0.0, 0.0, 100.5, 100.0)));
    }

    #[test]
    fn iou_of_disjoint_and_identical_boxes() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(20.0, 20.0, 30.0, 30.0);
        assert_eq!(a.iou(&b), 0.0);
        assert!((a.iou(&a) - 1.0).abs() < f32::EPSILON);
        let half = BoundingBox::new(5.0, 0.0, 15.0, 10.0);
        assert!((a.iou(&half) - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn bbox_display_is_bracketed() {
        let bbox = BoundingBox::new(1.0, 2.5, 3.0, 4.0);
        assert_eq!(bbox.to_string(), "[1 2.5 3 4]");
    }

    #[test]
    fn vehicle_classes_drop_non_vehicles() {
        let classes = VehicleClasses::default();
        let objects = vec![
            TrackedObject {
                bbox: BoundingBox::new(0.0, 0.0, 10.0, 10.0),
                track_id: 1,
                score: 0.9,
                class_id: 2,
            },
            TrackedObject {
                bbox: BoundingBox::new(0.0, 0.0, 10.0, 10.0),
                track_id: 2,
                score: 0.8,
                class_id: 0,
            },
            TrackedObject {
                bbox: BoundingBox::new(5.0, 5.0, 10.0, 10.0),
                track_id: 3,
                score: 0.7,
                class_id: 7,
            },
        ];
        let vehicles = classes.filter(objects);
        let ids: Vec<u64> = vehicles.iter().map(|v| v.track_id).collect();
        assert_eq!(ids, vec![1, 3]);
    }
}
