// src/services/image_processor.rs
use crate::errors::FluxError;
use image::{DynamicImage, GenericImageView, ImageFormat as ImgFormat};

const MAX_DIMENSION: u32 = 4096;

pub struct ImageProcessor;

impl ImageProcessor {
    pub fn new() -> Self {
        Self
    }

    /// Checks that an uploaded reference image decodes and is not oversized.
    pub fn validate_image(&self, data: &[u8]) -> Result<(u32, u32), FluxError> {
        let img = image::load_from_memory(data)
            .map_err(|e| FluxError::ImageProcessing(format!("Invalid image format: {}", e)))?;

        let (width, height) = img.dimensions();

        if width > MAX_DIMENSION || height > MAX_DIMENSION {
            return Err(FluxError::ImageProcessing(format!(
                "Image dimensions exceed {}x{}",
                MAX_DIMENSION, MAX_DIMENSION
            )));
        }

        Ok((width, height))
    }

    /// Decodes any supported format and re-encodes it as PNG.
    pub fn to_png(&self, data: &[u8]) -> Result<Vec<u8>, FluxError> {
        let img = image::load_from_memory(data)
            .map_err(|e| FluxError::ImageProcessing(format!("Failed to load image: {}", e)))?;

        self.encode_png(&img)
    }

    fn encode_png(&self, img: &DynamicImage) -> Result<Vec<u8>, FluxError> {
        let mut output = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut output), ImgFormat::Png)
            .map_err(|e| FluxError::ImageProcessing(format!("Failed to encode PNG: {}", e)))?;

        Ok(output)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

    pub fn encoded(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, y| Rgb([(x * 40) as u8, (y * 40) as u8, 128]));
        let mut out = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut std::io::Cursor::new(&mut out), format)
            .unwrap();
        out
    }

    pub fn png(width: u32, height: u32) -> Vec<u8> {
        encoded(width, height, ImageFormat::Png)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validates_small_png() {
        let processor = ImageProcessor::new();
        assert_eq!(processor.validate_image(&fixtures::png(3, 2)).unwrap(), (3, 2));
    }

    #[test]
    fn rejects_garbage() {
        let processor = ImageProcessor::new();
        assert!(matches!(
            processor.validate_image(b"not an image"),
            Err(FluxError::ImageProcessing(_))
        ));
    }

    #[test]
    fn converts_jpeg_to_png() {
        let processor = ImageProcessor::new();
        let jpeg = fixtures::encoded(4, 4, ImgFormat::Jpeg);

        let png = processor.to_png(&jpeg).unwrap();

        assert_eq!(image::guess_format(&png).unwrap(), ImgFormat::Png);
        assert_eq!(image::load_from_memory(&png).unwrap().dimensions(), (4, 4));
    }
}
