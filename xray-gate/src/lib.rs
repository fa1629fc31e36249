//! Two-stage chest X-ray screening.
//!
//! An image is first scored by a gate model that decides whether it is a
//! chest X-ray at all. Only images that pass the gate reach the pneumonia
//! classifier. Both models sit behind the [`Classifier`] trait so the
//! pipeline can run against ONNX checkpoints in production and fixed scores
//! in tests.

pub mod classifier;
pub mod error;
pub mod gate;
#[cfg(feature = "onnx")]
pub mod onnx;
pub mod preprocess;

pub use classifier::Classifier;
pub use error::{GateError, Result};
pub use gate::{
    Diagnosis, GateOutcome, PNEUMONIA_THRESHOLD, Prediction, TwoStageGate, XRAY_THRESHOLD, round2,
};
#[cfg(feature = "onnx")]
pub use onnx::OnnxClassifier;
pub use preprocess::{INPUT_SIZE, ImageTensor, preprocess_bytes, preprocess_path};

/// File names of the two checkpoints inside the models directory.
pub const XRAY_DETECTOR_MODEL: &str = "xray_detector.onnx";
pub const PNEUMONIA_MODEL: &str = "pneumonia_model.onnx";

/// Load both checkpoints from `models_dir` and wire them into a gate.
#[cfg(feature = "onnx")]
pub fn load_gate(models_dir: &std::path::Path, intra_threads: usize) -> Result<TwoStageGate> {
    use std::sync::Arc;

    tracing::info!("Loading X-ray detector model");
    let detector = OnnxClassifier::load(
        "xray_detector",
        &models_dir.join(XRAY_DETECTOR_MODEL),
        intra_threads,
    )?;

    tracing::info!("Loading pneumonia classifier model");
    let classifier = OnnxClassifier::load(
        "pneumonia_classifier",
        &models_dir.join(PNEUMONIA_MODEL),
        intra_threads,
    )?;

    Ok(TwoStageGate::new(Arc::new(detector), Arc::new(classifier)))
}
