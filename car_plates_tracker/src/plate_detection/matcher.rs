use super::{BoundingBox, VehicleDetection};

/// Finds the vehicle a plate belongs to.
///
/// A plate belongs to the first vehicle, in the order given, whose box fully
/// contains the plate box. Overlapping vehicles that both contain the plate
/// resolve to the earlier one. `None` means the plate has no vehicle in this
/// frame, which is common when the vehicle itself was not detected.
pub fn match_vehicle<'a>(
    plate: &BoundingBox,
    vehicles: &'a [VehicleDetection],
) -> Option<&'a VehicleDetection> {
    vehicles.iter().find(|vehicle| vehicle.bbox.contains(plate))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vehicle(x1: f32, y1: f32, x2: f32, y2: f32, track_id: u64) -> VehicleDetection {
        VehicleDetection::new(BoundingBox::new(x1, y1, x2, y2), track_id, 0.9)
    }

    #[test]
    fn plate_inside_single_vehicle() {
        let vehicles = vec![vehicle(0.0, 0.0, 100.0, 100.0, 1)];
        let plate = BoundingBox::new(10.0, 10.0, 50.0, 50.0);
        let matched = match_vehicle(&plate, &vehicles).map(|v| v.track_id);
        assert_eq!(matched, Some(1));
    }

    #[test]
    fn first_containing_vehicle_wins() {
        let vehicles = vec![
            vehicle(0.0, 0.0, 100.0, 100.0, 1),
            vehicle(0.0, 0.0, 50.0, 50.0, 2),
        ];
        let plate = BoundingBox::new(10.0, 10.0, 40.0, 40.0);
        assert_eq!(match_vehicle(&plate, &vehicles).map(|v| v.track_id), Some(1));

        let reversed: Vec<_> = vehicles.into_iter().rev().collect();
        assert_eq!(match_vehicle(&plate, &reversed).map(|v| v.track_id), Some(2));
    }

    #[test]
    fn plate_outside_every_vehicle() {
        let vehicles = vec![vehicle(0.0, 0.0, 50.0, 50.0, 1)];
        let plate = BoundingBox::new(60.0, 60.0, 80.0, 80.0);
        assert!(match_vehicle(&plate, &vehicles).is_none());
    }

    #[test]
    fn partial_overlap_is_not_a_match() {
        let vehicles = vec![vehicle(0.0, 0.0, 50.0, 50.0, 1)];
        let plate = BoundingBox::new(40.0, 40.0, 60.0, 60.0);
        assert!(match_vehicle(&plate, &vehicles).is_none());
    }

    #[test]
    fn plate_sharing_an_edge_matches() {
        let vehicles = vec![vehicle(0.0, 0.0, 50.0, 50.0, 4)];
        let plate = BoundingBox::new(0.0, 30.0, 50.0, 50.0);
        assert_eq!(match_vehicle(&plate, &vehicles).map(|v| v.track_id), Some(4));
    }

    #[test]
    fn no_vehicles_means_no_match() {
        let plate = BoundingBox::new(0.0, 0.0, 1.0, 1.0);
        assert!(match_vehicle(&plate, &[]).is_none());
    }
}
