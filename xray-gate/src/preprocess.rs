use image::{DynamicImage, imageops::FilterType};
use std::path::Path;

use crate::error::{GateError, Result};

/// Side length of the square input both models were trained on.
pub const INPUT_SIZE: u32 = 224;

const CHANNELS: usize = 3;

/// A single preprocessed image in NHWC layout: `[1, height, width, 3]`,
/// every value in `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageTensor {
    shape: [usize; 4],
    data: Vec<f32>,
}

impl ImageTensor {
    pub fn shape(&self) -> [usize; 4] {
        self.shape
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn into_data(self) -> Vec<f32> {
        self.data
    }
}

/// Decode → RGB → resize → scale to unit range → add batch axis.
pub fn preprocess_bytes(bytes: &[u8]) -> Result<ImageTensor> {
    let image =
        image::load_from_memory(bytes).map_err(|e| GateError::Preprocess(e.to_string()))?;
    Ok(to_tensor(&image))
}

pub fn preprocess_path(path: impl AsRef<Path>) -> Result<ImageTensor> {
    let path = path.as_ref();
    let image = image::ImageReader::open(path)
        .map_err(|e| GateError::Preprocess(format!("{}: {}", path.display(), e)))?
        .with_guessed_format()
        .map_err(|e| GateError::Preprocess(e.to_string()))?
        .decode()
        .map_err(|e| GateError::Preprocess(e.to_string()))?;
    Ok(to_tensor(&image))
}

fn to_tensor(image: &DynamicImage) -> ImageTensor {
    let rgb = image
        .resize_exact(INPUT_SIZE, INPUT_SIZE, FilterType::CatmullRom)
        .to_rgb8();

    let data = rgb
        .pixels()
        .flat_map(|p| p.0.into_iter().map(|c| f32::from(c) / 255.0))
        .collect();

    ImageTensor {
        shape: [1, INPUT_SIZE as usize, INPUT_SIZE as usize, CHANNELS],
        data,
    }
}
