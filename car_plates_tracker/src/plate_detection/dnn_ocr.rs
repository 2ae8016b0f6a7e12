use std::ffi::CString;
use std::path::Path;

use image::{imageops, GrayImage};
use leptess::tesseract::TessApi;
use log::debug;

use super::pipeline::PlateReader;
use super::PlateReading;
use crate::{PlateError, Result};

const PLATE_ALPHABET: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
/// `OEM_LSTM_ONLY`.
const OCR_ENGINE_LSTM: u32 = 1;
/// Treat the image as a single text line.
const PAGE_SEG_SINGLE_LINE: &str = "7";

/// Reads binarized plate crops with Tesseract.
pub struct DnnOcrReader {
    ocr: TessApi,
    trim_border: bool,
}

impl DnnOcrReader {
    /// Loads `language` traineddata from `data_path`.
    pub fn new(data_path: impl AsRef<Path>, language: &str) -> Result<Self> {
        let data_path = data_path.as_ref();
        let data_path = data_path
            .to_str()
            .ok_or_else(|| PlateError::Ocr(format!("{} is not valid UTF-8", data_path.display())))?;
        let mut api = TessApi::new(Some(data_path), language)
            .map_err(|e| PlateError::Ocr(format!("cannot load {language}: {e:?}")))?;
        let to_cstring = |s: &str| CString::new(s).map_err(|e| PlateError::Ocr(e.to_string()));
        api.raw
            .init_4(
                Some(to_cstring(data_path)?.as_ref()),
                Some(to_cstring(language)?.as_ref()),
                OCR_ENGINE_LSTM,
            )
            .map_err(|e| PlateError::Ocr(format!("cannot start LSTM engine: {e:?}")))?;

        set_variable(&mut api, "tessedit_char_whitelist", PLATE_ALPHABET)?;
        set_variable(&mut api, "tessedit_pageseg_mode", PAGE_SEG_SINGLE_LINE)?;

        Ok(Self {
            ocr: api,
            trim_border: false,
        })
    }

    /// Cuts the plate frame off the crop before reading it.
    pub fn with_border_trim(mut self, trim_border: bool) -> Self {
        self.trim_border = trim_border;
        self
    }

    fn reshape_plate(&self, plate: &GrayImage) -> GrayImage {
        let (width, height) = plate.dimensions();
        let x = (width as f32 * 0.10) as u32;
        let y = (height as f32 * 0.12) as u32;
        let w = width - (width as f32 * 0.12) as u32 - x;
        let h = height - (height as f32 * 0.24) as u32;
        if w == 0 || h == 0 || y + h > height {
            return plate.clone();
        }
        imageops::crop_imm(plate, x, y, w, h).to_image()
    }
}

fn set_variable(api: &mut TessApi, name: &str, value: &str) -> Result<()> {
    let to_cstring = |s: &str| CString::new(s).map_err(|e| PlateError::Ocr(e.to_string()));
    api.raw
        .set_variable(&to_cstring(name)?, &to_cstring(value)?)
        .map_err(|e| PlateError::Ocr(format!("cannot set {name}: {e:?}")))
}

impl PlateReader for DnnOcrReader {
    fn read_plate(&mut self, plate: &GrayImage) -> Result<PlateReading> {
        let plate = if self.trim_border {
            self.reshape_plate(plate)
        } else {
            plate.clone()
        };
        let (cols, rows) = plate.dimensions();
        self.ocr
            .raw
            .set_image(plate.as_raw(), cols as i32, rows as i32, 1, cols as i32)
            .map_err(|e| PlateError::Ocr(format!("{e:?}")))?;

        let text = self
            .ocr
            .get_utf8_text()
            .map_err(|e| PlateError::Ocr(e.to_string()))?;
        let score = self.ocr.mean_text_conf().clamp(0, 100) as f32 / 100.0;
        debug!("OCR {:?} ({})", text.trim(), score);

        Ok(PlateReading::new(text.trim(), score))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_traineddata_is_an_ocr_error() {
        let err = DnnOcrReader::new("/nonexistent/tessdata", "licence").err();
        assert!(matches!(err, Some(PlateError::Ocr(_))));
    }
}
