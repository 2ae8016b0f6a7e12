use std::collections::BTreeMap;

use super::record::ResultRecord;

/// Records of one frame, keyed by vehicle track id.
pub type FrameResults = BTreeMap<u64, ResultRecord>;

static NO_RESULTS: FrameResults = BTreeMap::new();

/// Frame indexed, vehicle indexed collection of plate records.
///
/// Every frame announced with [`ResultStore::begin_frame`] keeps a key, even
/// when it never receives a record, so consumers can tell "no plate seen"
/// apart from "frame never processed".
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResultStore {
    frames: BTreeMap<u64, FrameResults>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_frame(&mut self, frame_index: u64) {
        self.frames.entry(frame_index).or_default();
    }

    /// Stores `record`, replacing whatever was stored for the same frame and
    /// vehicle. The replaced record is returned.
    pub fn insert(&mut self, record: ResultRecord) -> Option<ResultRecord> {
        self.frames
            .entry(record.frame_index)
            .or_default()
            .insert(record.vehicle_track_id, record)
    }

    /// Records of `frame_index`; empty when the frame produced none.
    pub fn get(&self, frame_index: u64) -> &FrameResults {
        self.frames.get(&frame_index).unwrap_or(&NO_RESULTS)
    }

    pub fn contains_frame(&self, frame_index: u64) -> bool {
        self.frames.contains_key(&frame_index)
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn record_count(&self) -> usize {
        self.frames.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Frames in ascending index order.
    pub fn frames(&self) -> impl Iterator<Item = (u64, &FrameResults)> {
        self.frames.iter().map(|(index, results)| (*index, results))
    }

    /// All records, by frame index then track id.
    pub fn records(&self) -> impl Iterator<Item = &ResultRecord> {
        self.frames.values().flat_map(BTreeMap::values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plate_detection::BoundingBox;

    fn record(frame_index: u64, track_id: u64, text: &str) -> ResultRecord {
        ResultRecord {
            frame_index,
            vehicle_track_id: track_id,
            vehicle_bbox: BoundingBox::new(0.0, 0.0, 100.0, 100.0),
            plate_bbox: BoundingBox::new(10.0, 10.0, 40.0, 20.0),
            plate_text: text.to_string(),
            plate_bbox_score: 0.5,
            plate_text_score: 0.5,
        }
    }

    #[test]
    fn reinsertion_keeps_latest_record() {
        let mut store = ResultStore::new();
        assert!(store.insert(record(0, 1, "FIRST")).is_none());
        let replaced = store.insert(record(0, 1, "SECOND"));

        assert_eq!(replaced.map(|r| r.plate_text), Some("FIRST".to_string()));
        assert_eq!(store.record_count(), 1);
        assert_eq!(store.get(0)[&1].plate_text, "SECOND");
    }

    #[test]
    fn every_begun_frame_has_a_key() {
        let mut store = ResultStore::new();
        for frame in 0..5 {
            store.begin_frame(frame);
        }
        store.insert(record(2, 9, "AB12CDE"));
        store.begin_frame(2);

        assert_eq!(store.frame_count(), 5);
        assert_eq!(store.record_count(), 1);
        assert!(store.get(3).is_empty());
        assert_eq!(store.get(2).len(), 1);
    }

    #[test]
    fn unknown_frame_reads_as_empty() {
        let store = ResultStore::new();
        assert!(store.get(42).is_empty());
        assert!(!store.contains_frame(42));
        assert!(store.is_empty());
    }

    #[test]
    fn records_iterate_in_frame_then_track_order() {
        let mut store = ResultStore::new();
        store.insert(record(2, 1, "C"));
        store.insert(record(0, 5, "B"));
        store.insert(record(0, 3, "A"));
        store.insert(record(1, 2, "D"));

        let keys: Vec<(u64, u64)> = store
            .records()
            .map(|r| (r.frame_index, r.vehicle_track_id))
            .collect();
        assert_eq!(keys, vec![(0, 3), (0, 5), (1, 2), (2, 1)]);
        let frames: Vec<u64> = store.frames().map(|(index, _)| index).collect();
        assert_eq!(frames, vec![0, 1, 2]);
    }
}
