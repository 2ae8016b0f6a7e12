use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, PlateError>;

/// Failures surfaced by the plate tracking pipeline.
///
/// Unmatched plates, unreadable plates and frames without detections are
/// not errors; they are ordinary values flowing through the pipeline.
#[derive(Error, Debug)]
pub enum PlateError {
    #[error("cannot open frame source {source_name}: {message}")]
    FrameSourceOpen {
        source_name: String,
        message: String,
    },

    #[error("inference failed in {stage}: {message}")]
    Inference { stage: &'static str, message: String },

    #[error("plate reader failed: {0}")]
    Ocr(String),

    #[error("plate region {region} lies outside a {width}x{height} frame")]
    EmptyCrop {
        region: String,
        width: u32,
        height: u32,
    },

    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("cannot read config file {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot parse config file {}: {source}", path.display())]
    ConfigParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("output write failed: {0}")]
    Output(#[from] std::io::Error),

    #[error("metrics encoding failed: {0}")]
    Metrics(#[from] prometheus::Error),

    #[cfg(feature = "opencv")]
    #[error("opencv: {0}")]
    OpenCv(#[from] opencv::Error),
}

impl PlateError {
    pub fn inference(stage: &'static str, message: impl Into<String>) -> Self {
        Self::Inference {
            stage,
            message: message.into(),
        }
    }

    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}
