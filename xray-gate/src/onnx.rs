//! ONNX Runtime backed [`Classifier`].
//!
//! Both checkpoints are Keras binary classifiers exported to ONNX with a
//! single NHWC `float32` input of shape `[1, 224, 224, 3]` and a single
//! sigmoid output of shape `[1, 1]`.

use async_trait::async_trait;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use crate::{
    classifier::Classifier,
    error::{GateError, Result},
    preprocess::ImageTensor,
};

/// `Session::run` needs `&mut self`, so the session sits behind a mutex and
/// inference runs on the blocking pool.
pub struct OnnxClassifier {
    name: String,
    session: Arc<Mutex<Session>>,
}

impl OnnxClassifier {
    pub fn load(name: impl Into<String>, model_path: &Path, intra_threads: usize) -> Result<Self> {
        let name = name.into();
        if !model_path.exists() {
            return Err(GateError::ModelNotFound(model_path.to_path_buf()));
        }

        let session = Session::builder()
            .map_err(|e: ort::Error| GateError::ModelLoad(e.to_string()))?
            .with_intra_threads(intra_threads)
            .map_err(|e: ort::Error| GateError::ModelLoad(e.to_string()))?
            .commit_from_file(model_path)
            .map_err(|e: ort::Error| {
                GateError::ModelLoad(format!("{}: {e}", model_path.display()))
            })?;

        info!("Loaded {} model from {}", name, model_path.display());

        Ok(Self {
            name,
            session: Arc::new(Mutex::new(session)),
        })
    }
}

fn run_session(session: &Mutex<Session>, input: &ImageTensor) -> Result<f32> {
    let array = ndarray::Array4::from_shape_vec(input.shape(), input.data().to_vec())
        .map_err(|e| GateError::Inference(e.to_string()))?;
    let tensor =
        TensorRef::from_array_view(&array).map_err(|e| GateError::Inference(e.to_string()))?;

    let mut session = session
        .lock()
        .map_err(|_| GateError::Inference("Session lock poisoned".to_string()))?;

    let outputs = session
        .run(ort::inputs![tensor])
        .map_err(|e| GateError::Inference(format!("ONNX inference failed: {e}")))?;

    let (shape, data) = outputs[0]
        .try_extract_tensor::<f32>()
        .map_err(|e| GateError::Inference(format!("Output extraction: {e}")))?;

    data.first().copied().ok_or_else(|| {
        GateError::Inference(format!("Model returned an empty output of shape {shape:?}"))
    })
}

#[async_trait]
impl Classifier for OnnxClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    async fn score(&self, input: Arc<ImageTensor>) -> Result<f32> {
        let session = Arc::clone(&self.session);
        let score = tokio::task::spawn_blocking(move || run_session(&session, &input))
            .await
            .map_err(|e| GateError::Inference(format!("Inference task failed: {e}")))??;

        debug!("{} raw score: {:.4}", self.name, score);
        Ok(score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_model_file() {
        let result = OnnxClassifier::load("gate", Path::new("/nonexistent/model.onnx"), 1);
        assert!(matches!(result, Err(GateError::ModelNotFound(_))));
    }
}
