use super::{BoundingBox, PlateDetection, PlateReading, VehicleDetection};

/// Best known plate for one vehicle in one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct ResultRecord {
    pub frame_index: u64,
    pub vehicle_track_id: u64,
    pub vehicle_bbox: BoundingBox,
    pub plate_bbox: BoundingBox,
    pub plate_text: String,
    pub plate_bbox_score: f32,
    pub plate_text_score: f32,
}

impl ResultRecord {
    /// Combines a matched vehicle, its plate and the plate reading.
    ///
    /// Returns `None` when the reading carries no text. Confidence scores are
    /// copied as is; thresholding them is left to the caller.
    pub fn build(
        frame_index: u64,
        vehicle: &VehicleDetection,
        plate: &PlateDetection,
        reading: PlateReading,
    ) -> Option<Self> {
        if reading.is_empty() {
            return None;
        }
        Some(Self {
            frame_index,
            vehicle_track_id: vehicle.track_id,
            vehicle_bbox: vehicle.bbox,
            plate_bbox: plate.bbox,
            plate_text: reading.text,
            plate_bbox_score: plate.score,
            plate_text_score: reading.score,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair() -> (VehicleDetection, PlateDetection) {
        (
            VehicleDetection::new(BoundingBox::new(0.0, 0.0, 100.0, 100.0), 7, 0.88),
            PlateDetection::new(BoundingBox::new(10.0, 60.0, 50.0, 75.0), 0.64),
        )
    }

    #[test]
    fn empty_text_is_dropped_whatever_the_score() {
        let (vehicle, plate) = pair();
        assert!(ResultRecord::build(3, &vehicle, &plate, PlateReading::new("", 0.99)).is_none());
        assert!(ResultRecord::build(3, &vehicle, &plate, PlateReading::new("", 0.0)).is_none());
    }

    #[test]
    fn legible_plate_fills_every_field() {
        let (vehicle, plate) = pair();
        let record = ResultRecord::build(3, &vehicle, &plate, PlateReading::new("AB123CD", 0.42))
            .expect("record");
        assert_eq!(
            record,
            ResultRecord {
                frame_index: 3,
                vehicle_track_id: 7,
                vehicle_bbox: BoundingBox::new(0.0, 0.0, 100.0, 100.0),
                plate_bbox: BoundingBox::new(10.0, 60.0, 50.0, 75.0),
                plate_text: "AB123CD".to_string(),
                plate_bbox_score: 0.64,
                plate_text_score: 0.42,
            }
        );
    }

    #[test]
    fn low_confidence_is_not_filtered_here() {
        let (vehicle, plate) = pair();
        let record = ResultRecord::build(0, &vehicle, &plate, PlateReading::new("X", 0.01));
        assert!(record.is_some());
    }
}
