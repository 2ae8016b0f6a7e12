use image::{imageops, GrayImage, Luma, RgbImage};

use super::BoundingBox;
use crate::{PlateError, Result};

/// Pixel value at or below which a plate pixel turns white in the binarized
/// crop.
pub const DEFAULT_PLATE_THRESHOLD: u8 = 64;

/// A decoded frame the pipeline can cut plate crops from.
pub trait Frame {
    /// Crops `region`, converts it to grayscale and applies an inverted
    /// binary threshold: pixels above `threshold` become 0, the rest 255.
    fn binarized_plate(&self, region: &BoundingBox, threshold: u8) -> Result<GrayImage>;
}

/// Integer crop rectangle `(x, y, width, height)` of `region`, coordinates
/// truncated and clamped to the frame.
pub fn crop_rect(region: &BoundingBox, width: u32, height: u32) -> Result<(u32, u32, u32, u32)> {
    let clamp = |value: f32, max: u32| (value.max(0.0) as u32).min(max);
    let x1 = clamp(region.x1, width);
    let y1 = clamp(region.y1, height);
    let x2 = clamp(region.x2, width);
    let y2 = clamp(region.y2, height);
    if x2 <= x1 || y2 <= y1 {
        return Err(PlateError::EmptyCrop {
            region: region.to_string(),
            width,
            height,
        });
    }
    Ok((x1, y1, x2 - x1, y2 - y1))
}

/// Inverted binary threshold, in place.
pub fn threshold_inverted(image: &mut GrayImage, threshold: u8) {
    for Luma([value]) in image.pixels_mut() {
        *value = if *value > threshold { 0 } else { u8::MAX };
    }
}

impl Frame for RgbImage {
    fn binarized_plate(&self, region: &BoundingBox, threshold: u8) -> Result<GrayImage> {
        let (x, y, w, h) = crop_rect(region, self.width(), self.height())?;
        let crop = imageops::crop_imm(self, x, y, w, h).to_image();
        let mut gray = imageops::grayscale(&crop);
        threshold_inverted(&mut gray, threshold);
        Ok(gray)
    }
}

#[cfg(feature = "opencv")]
mod mat {
    use image::GrayImage;
    use opencv::core::Rect;
    use opencv::imgproc::{cvt_color, threshold, COLOR_BGR2GRAY, THRESH_BINARY_INV};
    use opencv::prelude::*;

    use super::{crop_rect, Frame};
    use crate::plate_detection::BoundingBox;
    use crate::{PlateError, Result};

    /// BGR frames as decoded by `VideoCapture`.
    impl Frame for Mat {
        fn binarized_plate(&self, region: &BoundingBox, thresh: u8) -> Result<GrayImage> {
            let (width, height) = (self.cols().max(0) as u32, self.rows().max(0) as u32);
            let (x, y, w, h) = crop_rect(region, width, height)?;
            let cropped = self.apply_1(Rect::new(x as i32, y as i32, w as i32, h as i32))?;

            let mut grey = Mat::default();
            cvt_color(&cropped, &mut grey, COLOR_BGR2GRAY, 0)?;
            let mut binary = Mat::default();
            threshold(&grey, &mut binary, thresh as f64, 255.0, THRESH_BINARY_INV)?;

            let bytes = binary.data_bytes()?.to_vec();
            GrayImage::from_raw(w, h, bytes).ok_or_else(|| PlateError::EmptyCrop {
                region: region.to_string(),
                width,
                height,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn crop_is_truncated_and_clamped() {
        let region = BoundingBox::new(-5.0, 10.9, 30.7, 500.0);
        assert_eq!(crop_rect(&region, 20, 100).unwrap(), (0, 10, 20, 90));
    }

    #[test]
    fn region_outside_frame_is_an_error() {
        let region = BoundingBox::new(50.0, 50.0, 60.0, 60.0);
        assert!(matches!(
            crop_rect(&region, 40, 40),
            Err(PlateError::EmptyCrop { .. })
        ));
    }

    #[test]
    fn dark_characters_become_white() {
        let mut frame = RgbImage::from_pixel(10, 10, Rgb([200, 200, 200]));
        frame.put_pixel(3, 3, Rgb([10, 10, 10]));
        let plate = frame
            .binarized_plate(&BoundingBox::new(2.0, 2.0, 6.0, 5.0), DEFAULT_PLATE_THRESHOLD)
            .unwrap();

        assert_eq!(plate.dimensions(), (4, 3));
        assert_eq!(plate.get_pixel(1, 1), &Luma([255]));
        assert_eq!(plate.get_pixel(0, 0), &Luma([0]));
    }

    #[test]
    fn threshold_value_itself_is_white() {
        let mut gray = GrayImage::from_raw(3, 1, vec![64, 65, 0]).unwrap();
        threshold_inverted(&mut gray, 64);
        assert_eq!(gray.into_raw(), vec![255, 0, 255]);
    }
}
