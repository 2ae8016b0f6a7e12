use std::path::Path;

use log::{debug, info};
use opencv::core::Size;
use opencv::imgproc::resize;
use opencv::imgproc::INTER_LINEAR;
use opencv::prelude::*;
use opencv::videoio::VideoCapture;
use opencv::videoio::CAP_ANY;

use super::pipeline::FrameSource;
use crate::{PlateError, Result};

/// Decodes a video file frame by frame.
pub struct VideoReader {
    capture: VideoCapture,
    resize_to: Option<Size>,
    frames: u64,
}

impl VideoReader {
    /// Opens `path`. A file that cannot be opened is a fatal error.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let open_error = |message: String| PlateError::FrameSourceOpen {
            source_name: path.display().to_string(),
            message,
        };
        let name = path
            .to_str()
            .ok_or_else(|| open_error("path is not valid UTF-8".to_string()))?;
        let capture = VideoCapture::from_file(name, CAP_ANY).map_err(|e| open_error(e.to_string()))?;
        if !capture.is_opened().map_err(|e| open_error(e.to_string()))? {
            return Err(open_error("no decoder could open the file".to_string()));
        }
        info!("reading frames from {}", path.display());
        Ok(Self {
            capture,
            resize_to: None,
            frames: 0,
        })
    }

    /// Resizes every decoded frame. Boxes and output rows are then in the
    /// resized coordinates.
    pub fn with_resize(mut self, width: i32, height: i32) -> Self {
        self.resize_to = Some(Size::new(width, height));
        self
    }
}

impl FrameSource for VideoReader {
    type Frame = Mat;

    fn next_frame(&mut self) -> Result<Option<Mat>> {
        let mut image = Mat::default();
        let grabbed = self.capture.read(&mut image)?;
        if !grabbed || image.empty() {
            debug!("end of stream after {} frames", self.frames);
            return Ok(None);
        }
        self.frames += 1;

        let Some(size) = self.resize_to else {
            return Ok(Some(image));
        };
        let mut image_resized = Mat::default();
        resize(&image, &mut image_resized, size, 0.0, 0.0, INTER_LINEAR)?;
        Ok(Some(image_resized))
    }
}
