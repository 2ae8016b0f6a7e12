//! Matches license plates to tracked vehicles frame by frame and keeps the
//! latest legible plate per frame and vehicle.
//!
//! Detection, tracking, OCR and decoding sit behind the traits in
//! [`plate_detection::pipeline`]. OpenCV and Tesseract implementations are
//! available with the `opencv` feature.

pub mod config;
pub mod error;
pub mod metrics;
pub mod plate_detection;

pub use error::{PlateError, Result};
pub use plate_detection::matcher::match_vehicle;
pub use plate_detection::pipeline::{
    FrameSource, FrameSummary, PipelineSettings, PlateDetector, PlatePipeline, PlateReader,
    VehicleDetector, VehicleTracker,
};
pub use plate_detection::record::ResultRecord;
pub use plate_detection::serializer::{serialize, write_results, ResultWriter};
pub use plate_detection::store::ResultStore;
pub use plate_detection::{
    BoundingBox, ObjectDetection, PlateDetection, PlateReading, TrackedObject, VehicleClasses,
    VehicleDetection,
};
