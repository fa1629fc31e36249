use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

use crate::{
    classifier::Classifier,
    error::{GateError, Result},
    preprocess::ImageTensor,
};

/// Stage-1 gate: the detector score must be at least this for the image to
/// count as a chest X-ray.
pub const XRAY_THRESHOLD: f32 = 0.5;

/// Stage-2 decision boundary: strictly above means pneumonia.
pub const PNEUMONIA_THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Prediction {
    Normal,
    Pneumonia,
}

impl Prediction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Prediction::Normal => "NORMAL",
            Prediction::Pneumonia => "PNEUMONIA",
        }
    }
}

impl fmt::Display for Prediction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifier verdict with percentages rounded to two decimals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnosis {
    pub prediction: Prediction,
    pub confidence: f64,
    pub pneumonia_prob: f64,
    pub normal_prob: f64,
    pub gate_score: f32,
}

impl Diagnosis {
    pub fn from_scores(gate_score: f32, pneumonia_score: f32) -> Self {
        let p = f64::from(pneumonia_score);
        let prediction = if p > PNEUMONIA_THRESHOLD {
            Prediction::Pneumonia
        } else {
            Prediction::Normal
        };

        Self {
            prediction,
            confidence: round2(p.max(1.0 - p) * 100.0),
            pneumonia_prob: round2(p * 100.0),
            normal_prob: round2((1.0 - p) * 100.0),
            gate_score,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum GateOutcome {
    /// The gate model rejected the image; the classifier never ran.
    NotXray { gate_score: f32 },
    Classified(Diagnosis),
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn check_probability(score: f32) -> std::result::Result<f32, String> {
    if score.is_finite() && (0.0..=1.0).contains(&score) {
        Ok(score)
    } else {
        Err(format!("score {score} is outside [0, 1]"))
    }
}

/// Runs the X-ray gate and, only when it passes, the pneumonia classifier.
#[derive(Clone)]
pub struct TwoStageGate {
    gate: Arc<dyn Classifier>,
    classifier: Arc<dyn Classifier>,
}

impl TwoStageGate {
    pub fn new(gate: Arc<dyn Classifier>, classifier: Arc<dyn Classifier>) -> Self {
        Self { gate, classifier }
    }

    pub async fn evaluate(&self, input: Arc<ImageTensor>) -> Result<GateOutcome> {
        let gate_score = self
            .gate
            .score(Arc::clone(&input))
            .await
            .map_err(|e| GateError::XrayDetection(e.to_string()))
            .and_then(|s| check_probability(s).map_err(GateError::XrayDetection))?;

        debug!("{} score: {:.4}", self.gate.name(), gate_score);

        if gate_score < XRAY_THRESHOLD {
            info!("Image rejected by X-ray gate (score {:.4})", gate_score);
            return Ok(GateOutcome::NotXray { gate_score });
        }

        let pneumonia_score = self
            .classifier
            .score(input)
            .await
            .map_err(|e| GateError::PneumoniaPrediction(e.to_string()))
            .and_then(|s| check_probability(s).map_err(GateError::PneumoniaPrediction))?;

        let diagnosis = Diagnosis::from_scores(gate_score, pneumonia_score);
        info!(
            "Classified as {} ({}% confidence)",
            diagnosis.prediction, diagnosis.confidence
        );

        Ok(GateOutcome::Classified(diagnosis))
    }
}
