use async_trait::async_trait;
use std::sync::Arc;

use crate::{error::Result, preprocess::ImageTensor};

/// A binary image model that produces a single probability in `[0, 1]`.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Score one preprocessed image.
    async fn score(&self, input: Arc<ImageTensor>) -> Result<f32>;
}
