use std::path::Path;

use log::debug;
use opencv::core::{Rect, Scalar, Size, Vector, CV_32F};
use opencv::dnn;
use opencv::dnn::blob_from_image;
use opencv::dnn::nms_boxes;
use opencv::dnn::Net;
use opencv::dnn::{DNN_BACKEND_CUDA, DNN_BACKEND_OPENCV, DNN_TARGET_CPU, DNN_TARGET_CUDA};
use opencv::prelude::*;

use super::pipeline::{PlateDetector, VehicleDetector};
use super::{BoundingBox, ObjectDetection, PlateDetection};
use crate::{PlateError, Result};

const SCORE_THRESHOLD: f32 = 0.5;
const NMS_THRESHOLD: f32 = 0.4;
/// Candidate rows in a 640x640 YOLOv5 output.
const YOLOV5_CANDIDATES: i32 = 25200;

/// YOLO network plus the decoder matching its output layout.
pub struct ObjectDetector {
    classifier: Net,
    input_size: i32,
    post_processor: Box<dyn YoloProcessor>,
}

trait YoloProcessor {
    fn post_process(
        &self,
        img_rows: i32,
        img_cols: i32,
        outputs: &Vector<Mat>,
    ) -> Result<Vec<ObjectDetection>>;
}

/// Darknet YOLOv3: rows of `[cx, cy, w, h, objectness, class scores...]`,
/// normalized to the image size.
struct YoloProcessorV3;

impl YoloProcessor for YoloProcessorV3 {
    fn post_process(
        &self,
        img_rows: i32,
        img_cols: i32,
        outputs: &Vector<Mat>,
    ) -> Result<Vec<ObjectDetection>> {
        let mut candidates = Vec::new();
        for data in outputs {
            for j in 0..data.rows() {
                let mut best_class = 0;
                let mut best_score = 0.0f32;
                for c in 5..data.cols() {
                    let score = *data.at_2d::<f32>(j, c)?;
                    if score > best_score {
                        best_score = score;
                        best_class = c - 5;
                    }
                }
                if best_score <= SCORE_THRESHOLD {
                    continue;
                }
                let cx = *data.at_2d::<f32>(j, 0)? * img_cols as f32;
                let cy = *data.at_2d::<f32>(j, 1)? * img_rows as f32;
                let w = *data.at_2d::<f32>(j, 2)? * img_cols as f32;
                let h = *data.at_2d::<f32>(j, 3)? * img_rows as f32;
                candidates.push(ObjectDetection {
                    bbox: BoundingBox::new(cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0),
                    score: best_score,
                    class_id: best_class as u32,
                });
            }
        }
        non_max_suppression(candidates)
    }
}

/// YOLOv5 single class export: rows of `[cx, cy, w, h, conf, class]` in
/// network input pixels.
struct YoloProcessorV5 {
    input_size: i32,
}

impl YoloProcessor for YoloProcessorV5 {
    fn post_process(
        &self,
        img_rows: i32,
        img_cols: i32,
        outputs: &Vector<Mat>,
    ) -> Result<Vec<ObjectDetection>> {
        let x_factor = img_cols as f32 / self.input_size as f32;
        let y_factor = img_rows as f32 / self.input_size as f32;

        let mut candidates = Vec::new();
        for data in outputs {
            for j in 0..YOLOV5_CANDIDATES {
                let confidence = *data.at_3d::<f32>(0, j, 4)?;
                if confidence <= 0.4 {
                    continue;
                }
                let class_score = *data.at_3d::<f32>(0, j, 5)?;
                if class_score <= 0.25 {
                    continue;
                }
                let cx = *data.at_3d::<f32>(0, j, 0)?;
                let cy = *data.at_3d::<f32>(0, j, 1)?;
                let w = *data.at_3d::<f32>(0, j, 2)?;
                let h = *data.at_3d::<f32>(0, j, 3)?;
                let left = (cx - 0.5 * w) * x_factor;
                let top = (cy - 0.5 * h) * y_factor;
                candidates.push(ObjectDetection {
                    bbox: BoundingBox::new(left, top, left + w * x_factor, top + h * y_factor),
                    score: confidence,
                    class_id: 0,
                });
            }
        }
        non_max_suppression(candidates)
    }
}

fn non_max_suppression(candidates: Vec<ObjectDetection>) -> Result<Vec<ObjectDetection>> {
    let boxes: Vector<Rect> = candidates
        .iter()
        .map(|c| {
            Rect::new(
                c.bbox.x1 as i32,
                c.bbox.y1 as i32,
                c.bbox.width() as i32,
                c.bbox.height() as i32,
            )
        })
        .collect();
    let scores: Vector<f32> = candidates.iter().map(|c| c.score).collect();
    let mut indices = Vector::<i32>::default();
    nms_boxes(&boxes, &scores, SCORE_THRESHOLD, NMS_THRESHOLD, &mut indices, 1.0, 0)?;

    Ok(indices
        .iter()
        .filter_map(|i| candidates.get(i as usize).cloned())
        .collect())
}

fn select_backend(classifier: &mut Net, use_gpu: bool) -> Result<()> {
    if use_gpu {
        classifier.set_preferable_backend(DNN_BACKEND_CUDA)?;
        classifier.set_preferable_target(DNN_TARGET_CUDA)?;
    } else {
        classifier.set_preferable_backend(DNN_BACKEND_OPENCV)?;
        classifier.set_preferable_target(DNN_TARGET_CPU)?;
    }
    Ok(())
}

fn path_str(path: &Path) -> Result<&str> {
    path.to_str()
        .ok_or_else(|| PlateError::invalid_config(format!("{} is not valid UTF-8", path.display())))
}

impl ObjectDetector {
    /// COCO YOLOv3 from darknet files; every class is reported.
    pub fn car_detector(cfg: &Path, weights: &Path, use_gpu: bool) -> Result<Self> {
        let mut classifier = dnn::read_net_from_darknet(path_str(cfg)?, path_str(weights)?)?;
        select_backend(&mut classifier, use_gpu)?;

        Ok(ObjectDetector {
            classifier,
            input_size: 416,
            post_processor: Box::new(YoloProcessorV3),
        })
    }

    pub fn plate_detector(model: &Path, use_gpu: bool) -> Result<Self> {
        let mut classifier = dnn::read_net_from_onnx(path_str(model)?)?;
        select_backend(&mut classifier, use_gpu)?;

        Ok(ObjectDetector {
            classifier,
            input_size: 640,
            post_processor: Box::new(YoloProcessorV5 { input_size: 640 }),
        })
    }

    fn infer(&mut self, image: &Mat) -> Result<Vec<ObjectDetection>> {
        let blob = blob_from_image(
            image,
            1.0 / 255.0,
            Size::new(self.input_size, self.input_size),
            Scalar::default(),
            true,
            false,
            CV_32F,
        )?;

        self.classifier
            .set_input(&blob, "", 1.0, Scalar::default())?;
        let output_names = self.classifier.get_unconnected_out_layers_names()?;
        let mut output_values = Vector::<Mat>::default();
        self.classifier.forward(&mut output_values, &output_names)?;

        let detections = self
            .post_processor
            .post_process(image.rows(), image.cols(), &output_values)?;
        debug!("object detection: {} boxes", detections.len());
        Ok(detections)
    }
}

impl VehicleDetector<Mat> for ObjectDetector {
    fn detect_objects(&mut self, frame: &Mat) -> Result<Vec<ObjectDetection>> {
        self.infer(frame)
    }
}

impl PlateDetector<Mat> for ObjectDetector {
    fn detect_plates(&mut self, frame: &Mat) -> Result<Vec<PlateDetection>> {
        Ok(self
            .infer(frame)?
            .into_iter()
            .map(|d| PlateDetection::new(d.bbox, d.score))
            .collect())
    }
}
