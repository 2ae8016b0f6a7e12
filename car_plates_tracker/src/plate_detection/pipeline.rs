//! Frame loop tying detectors, matching, OCR and accumulation together.
//!
//! Per frame: the tracker and the plate detector run, vehicles are filtered
//! by class, every plate is matched to its enclosing vehicle, matched plates
//! are binarized and read, and the resulting records land in the store. A
//! plate that does not match, cannot be cropped or reads as nothing is
//! dropped without affecting the rest of the frame.

use std::io::Write;

use image::GrayImage;
use log::{debug, info, warn};

use super::matcher::match_vehicle;
use super::plate_text::PlateTextPolicy;
use super::preprocess::{Frame, DEFAULT_PLATE_THRESHOLD};
use super::record::ResultRecord;
use super::serializer::ResultWriter;
use super::store::ResultStore;
use super::{ObjectDetection, PlateDetection, PlateReading, TrackedObject, VehicleClasses};
use crate::metrics;
use crate::Result;

pub trait FrameSource {
    type Frame;

    /// Next decoded frame, `None` once the stream is exhausted.
    fn next_frame(&mut self) -> Result<Option<Self::Frame>>;
}

pub trait VehicleTracker<F> {
    fn track(&mut self, frame: &F) -> Result<Vec<TrackedObject>>;
}

pub trait VehicleDetector<F> {
    fn detect_objects(&mut self, frame: &F) -> Result<Vec<ObjectDetection>>;
}

pub trait PlateDetector<F> {
    fn detect_plates(&mut self, frame: &F) -> Result<Vec<PlateDetection>>;
}

pub trait PlateReader {
    fn read_plate(&mut self, plate: &GrayImage) -> Result<PlateReading>;
}

#[derive(Clone, Debug, PartialEq)]
pub struct PipelineSettings {
    pub vehicle_classes: VehicleClasses,
    pub plate_threshold: u8,
    pub text_policy: PlateTextPolicy,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            vehicle_classes: VehicleClasses::default(),
            plate_threshold: DEFAULT_PLATE_THRESHOLD,
            text_policy: PlateTextPolicy::default(),
        }
    }
}

/// What happened to the plates of one frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameSummary {
    pub vehicles: usize,
    pub plates: usize,
    pub unmatched: usize,
    pub unreadable: usize,
    pub records: usize,
}

pub struct PlatePipeline<T, D, R> {
    tracker: T,
    plate_detector: D,
    reader: R,
    settings: PipelineSettings,
}

impl<T, D, R> PlatePipeline<T, D, R> {
    pub fn new(tracker: T, plate_detector: D, reader: R, settings: PipelineSettings) -> Self {
        Self {
            tracker,
            plate_detector,
            reader,
            settings,
        }
    }

    pub fn reader(&self) -> &R {
        &self.reader
    }

    /// Runs one decoded frame through detection, matching and OCR, and
    /// accumulates its records into `store`.
    pub fn process_frame<F>(
        &mut self,
        frame_index: u64,
        frame: &F,
        store: &mut ResultStore,
    ) -> Result<FrameSummary>
    where
        F: Frame,
        T: VehicleTracker<F>,
        D: PlateDetector<F>,
        R: PlateReader,
    {
        store.begin_frame(frame_index);
        metrics::FRAMES_PROCESSED.inc();

        let vehicles = self
            .settings
            .vehicle_classes
            .filter(self.tracker.track(frame)?);
        let plates = self.plate_detector.detect_plates(frame)?;
        metrics::PLATES_DETECTED.inc_by(plates.len() as u64);

        let mut summary = FrameSummary {
            vehicles: vehicles.len(),
            plates: plates.len(),
            ..FrameSummary::default()
        };

        for plate in &plates {
            let Some(vehicle) = match_vehicle(&plate.bbox, &vehicles) else {
                debug!("frame {}: plate {} has no vehicle", frame_index, plate.bbox);
                summary.unmatched += 1;
                metrics::PLATES_UNMATCHED.inc();
                continue;
            };

            let reading = match self.read(frame, plate) {
                Ok(reading) => self.settings.text_policy.apply(reading),
                Err(e) => {
                    warn!("frame {}: plate {} skipped: {}", frame_index, plate.bbox, e);
                    PlateReading::empty()
                }
            };

            match ResultRecord::build(frame_index, vehicle, plate, reading) {
                Some(record) => {
                    debug!(
                        "frame {}: car {} plate {:?} ({})",
                        frame_index, record.vehicle_track_id, record.plate_text, record.plate_text_score
                    );
                    if store.insert(record).is_some() {
                        debug!(
                            "frame {}: car {} had another plate, keeping the latest",
                            frame_index, vehicle.track_id
                        );
                    } else {
                        summary.records += 1;
                    }
                    metrics::RECORDS_ACCUMULATED.inc();
                }
                None => {
                    summary.unreadable += 1;
                    metrics::PLATES_UNREADABLE.inc();
                }
            }
        }

        Ok(summary)
    }

    fn read<F: Frame>(&mut self, frame: &F, plate: &PlateDetection) -> Result<PlateReading>
    where
        R: PlateReader,
    {
        let binarized = frame.binarized_plate(&plate.bbox, self.settings.plate_threshold)?;
        self.reader.read_plate(&binarized)
    }

    /// Drains `source`, streaming each frame's rows to `sink` once the frame
    /// is accumulated. Returns the complete store; `sink` is flushed.
    ///
    /// Frame indices start at 0. A source error ends the stream like an end
    /// of file does; failing to open the source belongs to its constructor.
    pub fn run<S, W>(&mut self, source: &mut S, sink: W) -> Result<ResultStore>
    where
        S: FrameSource,
        S::Frame: Frame,
        T: VehicleTracker<S::Frame>,
        D: PlateDetector<S::Frame>,
        R: PlateReader,
        W: Write,
    {
        let mut writer = ResultWriter::new(sink)?;
        let mut store = ResultStore::new();
        let mut frame_index = 0u64;

        loop {
            let frame = match source.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => break,
                Err(e) => {
                    warn!("frame source failed at frame {}, ending stream: {}", frame_index, e);
                    break;
                }
            };

            let summary = self.process_frame(frame_index, &frame, &mut store)?;
            debug!("frame {}: {:?}", frame_index, summary);
            writer.write_records(store.get(frame_index).values())?;
            frame_index += 1;
        }

        let rows = writer.rows_written();
        writer.finish()?;
        info!(
            "stream exhausted after {} frames, {} rows written",
            store.frame_count(),
            rows
        );
        Ok(store)
    }
}
