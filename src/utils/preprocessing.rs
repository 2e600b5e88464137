//! Image preprocessing for classifier input
//!
//! Decodes uploaded bytes, forces three color channels, resizes to the model
//! resolution and applies the model family's pixel transform.

use crate::{
    config::{ClassifierConfig, InputTransform},
    error::{ClassifierError, Result},
    types::{ImageTensor, CHANNELS},
    utils::TensorValidator,
};
use image::{imageops::FilterType, DynamicImage, RgbImage};
use ndarray::Array4;

/// Converts images into model-ready NHWC tensors
#[derive(Debug, Clone, PartialEq)]
pub struct ImagePreprocessor {
    /// Target resolution as `[width, height]`
    target_size: [u32; 2],
    transform: InputTransform,
}

impl ImagePreprocessor {
    #[must_use]
    pub fn new(target_size: [u32; 2], transform: InputTransform) -> Self {
        Self {
            target_size,
            transform,
        }
    }

    #[must_use]
    pub fn from_config(config: &ClassifierConfig) -> Self {
        Self::new(config.target_size, config.input_transform)
    }

    #[must_use]
    pub fn target_size(&self) -> [u32; 2] {
        self.target_size
    }

    #[must_use]
    pub fn transform(&self) -> InputTransform {
        self.transform
    }

    /// Decode raw upload bytes and preprocess them
    ///
    /// # Errors
    /// - `InvalidImage` for empty, corrupt or unsupported input
    pub fn preprocess(&self, bytes: &[u8]) -> Result<ImageTensor> {
        let image = Self::decode(bytes)?;
        self.preprocess_image(&image)
    }

    /// Decode bytes into an image, guessing the format from its signature
    ///
    /// # Errors
    /// - `InvalidImage` for empty, corrupt or unsupported input
    pub fn decode(bytes: &[u8]) -> Result<DynamicImage> {
        if bytes.is_empty() {
            return Err(ClassifierError::invalid_image("empty input"));
        }

        let image = image::load_from_memory(bytes)
            .map_err(|e| ClassifierError::invalid_image(format!("failed to decode image: {e}")))?;
        TensorValidator::validate_image_dimensions(image.width(), image.height())?;
        Ok(image)
    }

    /// Preprocess an already-decoded image
    ///
    /// Grayscale inputs are replicated across channels and alpha is dropped
    /// without compositing. The resize ignores aspect ratio.
    ///
    /// # Errors
    /// - `InvalidImage` for zero-sized images
    pub fn preprocess_image(&self, image: &DynamicImage) -> Result<ImageTensor> {
        TensorValidator::validate_image_dimensions(image.width(), image.height())?;

        let rgb = image.to_rgb8();
        let [width, height] = self.target_size;
        let resized = if rgb.dimensions() == (width, height) {
            rgb
        } else {
            image::imageops::resize(&rgb, width, height, FilterType::Triangle)
        };

        ImageTensor::new(self.to_tensor(&resized))
    }

    /// Convert an RGB image into a `(1, H, W, 3)` tensor with the pixel transform applied
    fn to_tensor(&self, rgb: &RgbImage) -> Array4<f32> {
        let (width, height) = rgb.dimensions();
        Array4::from_shape_fn(
            (1, height as usize, width as usize, CHANNELS),
            |(_, y, x, c)| {
                let pixel = rgb.get_pixel(x as u32, y as u32);
                let value = pixel.0.get(c).copied().map_or(0.0, f32::from);
                self.transform.apply(value, c)
            },
        )
    }
}

impl Default for ImagePreprocessor {
    fn default() -> Self {
        Self::from_config(&ClassifierConfig::default())
    }
}
