use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GateError {
    #[error("Could not decode image: {0}")]
    Preprocess(String),

    #[error("X-ray detection failed: {0}")]
    XrayDetection(String),

    #[error("Pneumonia prediction failed: {0}")]
    PneumoniaPrediction(String),

    #[error("Model file not found: {}", .0.display())]
    ModelNotFound(PathBuf),

    #[error("Failed to load model: {0}")]
    ModelLoad(String),

    #[error("Inference failed: {0}")]
    Inference(String),
}

pub type Result<T> = std::result::Result<T, GateError>;
