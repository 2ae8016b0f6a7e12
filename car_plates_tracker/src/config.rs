//! Runtime configuration: TOML file, then environment, then validation.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::plate_detection::pipeline::PipelineSettings;
use crate::plate_detection::plate_text::{PlateFormat, PlateTextPolicy};
use crate::plate_detection::preprocess::DEFAULT_PLATE_THRESHOLD;
use crate::plate_detection::tracker::IouTrackerConfig;
use crate::plate_detection::{VehicleClasses, DEFAULT_VEHICLE_CLASSES};
use crate::{PlateError, Result};

const DEFAULT_INPUT: &str = "input/testing.mp4";
const DEFAULT_OUTPUT: &str = "output/results.csv";
const DEFAULT_MODELS_DIR: &str = "models";
const DEFAULT_VEHICLE_CFG: &str = "models/yolov3.cfg";
const DEFAULT_VEHICLE_WEIGHTS: &str = "models/yolov3.weights";
const DEFAULT_PLATE_MODEL: &str = "models/plate_best.onnx";
const DEFAULT_OCR_LANGUAGE: &str = "licence";

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    input: Option<InputConfigFile>,
    output: Option<OutputConfigFile>,
    models: Option<ModelsConfigFile>,
    detection: Option<DetectionConfigFile>,
    tracker: Option<TrackerConfigFile>,
    plate_text: Option<PlateTextConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct InputConfigFile {
    video: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
struct OutputConfigFile {
    path: Option<PathBuf>,
    metrics_path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
struct ModelsConfigFile {
    vehicle_cfg: Option<PathBuf>,
    vehicle_weights: Option<PathBuf>,
    plate_model: Option<PathBuf>,
    ocr_data_path: Option<PathBuf>,
    ocr_language: Option<String>,
    use_gpu: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectionConfigFile {
    vehicle_classes: Option<Vec<u32>>,
    plate_threshold: Option<u8>,
}

#[derive(Debug, Deserialize, Default)]
struct TrackerConfigFile {
    min_iou: Option<f32>,
    max_age: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct PlateTextConfigFile {
    normalize: Option<bool>,
    format: Option<PlateFormat>,
    min_text_score: Option<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelSettings {
    pub vehicle_cfg: PathBuf,
    pub vehicle_weights: PathBuf,
    pub plate_model: PathBuf,
    pub ocr_data_path: PathBuf,
    pub ocr_language: String,
    pub use_gpu: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrackerAppConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    pub metrics_path: Option<PathBuf>,
    pub models: ModelSettings,
    pub pipeline: PipelineSettings,
    pub tracker: IouTrackerConfig,
}

impl Default for TrackerAppConfig {
    fn default() -> Self {
        Self::from_file(ConfigFile::default())
    }
}

impl TrackerAppConfig {
    /// Reads the file named by `PLATES_CONFIG` when set, applies the
    /// `PLATES_*` overrides and validates the result.
    pub fn load() -> Result<Self> {
        let path = std::env::var("PLATES_CONFIG").ok().map(PathBuf::from);
        Self::load_from(path.as_deref())
    }

    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let file_cfg = match path {
            Some(path) => read_config_file(path)?,
            None => ConfigFile::default(),
        };
        let mut cfg = Self::from_file(file_cfg);
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: ConfigFile) -> Self {
        let input = file
            .input
            .and_then(|input| input.video)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_INPUT));
        let output = file.output.unwrap_or_default();
        let models = file.models.unwrap_or_default();
        let detection = file.detection.unwrap_or_default();
        let tracker = file.tracker.unwrap_or_default();
        let plate_text = file.plate_text.unwrap_or_default();
        let tracker_defaults = IouTrackerConfig::default();
        let text_defaults = PlateTextPolicy::default();

        Self {
            input,
            output: output
                .path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT)),
            metrics_path: output.metrics_path,
            models: ModelSettings {
                vehicle_cfg: models
                    .vehicle_cfg
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_VEHICLE_CFG)),
                vehicle_weights: models
                    .vehicle_weights
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_VEHICLE_WEIGHTS)),
                plate_model: models
                    .plate_model
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_PLATE_MODEL)),
                ocr_data_path: models
                    .ocr_data_path
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_MODELS_DIR)),
                ocr_language: models
                    .ocr_language
                    .unwrap_or_else(|| DEFAULT_OCR_LANGUAGE.to_string()),
                use_gpu: models.use_gpu.unwrap_or(false),
            },
            pipeline: PipelineSettings {
                vehicle_classes: VehicleClasses::new(
                    detection
                        .vehicle_classes
                        .unwrap_or_else(|| DEFAULT_VEHICLE_CLASSES.to_vec()),
                ),
                plate_threshold: detection
                    .plate_threshold
                    .unwrap_or(DEFAULT_PLATE_THRESHOLD),
                text_policy: PlateTextPolicy {
                    normalize: plate_text.normalize.unwrap_or(text_defaults.normalize),
                    format: plate_text.format.unwrap_or(text_defaults.format),
                    min_text_score: plate_text.min_text_score,
                },
            },
            tracker: IouTrackerConfig {
                min_iou: tracker.min_iou.unwrap_or(tracker_defaults.min_iou),
                max_age: tracker.max_age.unwrap_or(tracker_defaults.max_age),
            },
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Some(input) = non_empty_env("PLATES_INPUT") {
            self.input = PathBuf::from(input);
        }
        if let Some(output) = non_empty_env("PLATES_OUTPUT") {
            self.output = PathBuf::from(output);
        }
        if let Some(use_gpu) = non_empty_env("PLATES_USE_GPU") {
            self.models.use_gpu = use_gpu.parse().map_err(|_| {
                PlateError::invalid_config("PLATES_USE_GPU must be true or false")
            })?;
        }
        if let Some(threshold) = non_empty_env("PLATES_THRESHOLD") {
            self.pipeline.plate_threshold = threshold.parse().map_err(|_| {
                PlateError::invalid_config("PLATES_THRESHOLD must be an integer in 0..=255")
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.pipeline.vehicle_classes.is_empty() {
            return Err(PlateError::invalid_config(
                "detection.vehicle_classes must not be empty",
            ));
        }
        if !(self.tracker.min_iou > 0.0 && self.tracker.min_iou <= 1.0) {
            return Err(PlateError::invalid_config(
                "tracker.min_iou must be in (0, 1]",
            ));
        }
        if let Some(score) = self.pipeline.text_policy.min_text_score {
            if !(0.0..=1.0).contains(&score) {
                return Err(PlateError::invalid_config(
                    "plate_text.min_text_score must be in [0, 1]",
                ));
            }
        }
        if self.output.as_os_str().is_empty() {
            return Err(PlateError::invalid_config("output.path must be set"));
        }
        Ok(())
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
}

fn read_config_file(path: &Path) -> Result<ConfigFile> {
    let raw = std::fs::read_to_string(path).map_err(|source| PlateError::ConfigRead {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&raw).map_err(|source| PlateError::ConfigParse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_deployment() {
        let cfg = TrackerAppConfig::default();
        assert_eq!(cfg.output, PathBuf::from("output/results.csv"));
        assert_eq!(cfg.pipeline.plate_threshold, 64);
        assert!(cfg.pipeline.vehicle_classes.allows(2));
        assert!(cfg.pipeline.vehicle_classes.allows(7));
        assert!(!cfg.pipeline.vehicle_classes.allows(0));
        assert_eq!(cfg.pipeline.text_policy.format, PlateFormat::Any);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn empty_class_list_is_rejected() {
        let mut cfg = TrackerAppConfig::default();
        cfg.pipeline.vehicle_classes = VehicleClasses::new([]);
        assert!(matches!(
            cfg.validate(),
            Err(PlateError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn zero_iou_is_rejected() {
        let mut cfg = TrackerAppConfig::default();
        cfg.tracker.min_iou = 0.0;
        assert!(cfg.validate().is_err());
    }
}
