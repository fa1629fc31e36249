use serde::{Deserialize, Serialize};
use xray_gate::{Diagnosis, Prediction};

/// Value of `prediction` when the upload was rejected before classification.
pub const INVALID_IMAGE: &str = "Invalid Image";

/// One successful `/predict` result, kept so the chat can refer back to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub analysis_id: String,
    pub prediction: Prediction,
    pub confidence: f64,
    pub pneumonia_prob: f64,
    pub normal_prob: f64,
    pub patient_name: String,
    pub patient_age: String,
    pub notes: String,
    pub image_filename: String,
    pub timestamp: String,
}

impl AnalysisResult {
    pub fn new(
        analysis_id: String,
        diagnosis: &Diagnosis,
        patient: PatientFields,
        image_filename: String,
    ) -> Self {
        Self {
            analysis_id,
            prediction: diagnosis.prediction,
            confidence: diagnosis.confidence,
            pneumonia_prob: diagnosis.pneumonia_prob,
            normal_prob: diagnosis.normal_prob,
            patient_name: patient.name,
            patient_age: patient.age,
            notes: patient.notes,
            image_filename,
            timestamp: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }

    pub fn context(&self) -> AnalysisContext {
        AnalysisContext {
            prediction: self.prediction,
            confidence: self.confidence,
            pneumonia_prob: self.pneumonia_prob,
            normal_prob: self.normal_prob,
            patient_name: Some(self.patient_name.clone()),
            timestamp: Some(self.timestamp.clone()),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PatientFields {
    pub name: String,
    pub age: String,
    pub notes: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PredictResponse {
    pub analysis_id: String,
    pub prediction: Prediction,
    pub confidence: f64,
    pub pneumonia_prob: f64,
    pub normal_prob: f64,
    pub image_filename: String,
    pub patient_name: String,
    pub patient_age: String,
    pub notes: String,
}

impl From<&AnalysisResult> for PredictResponse {
    fn from(result: &AnalysisResult) -> Self {
        Self {
            analysis_id: result.analysis_id.clone(),
            prediction: result.prediction,
            confidence: result.confidence,
            pneumonia_prob: result.pneumonia_prob,
            normal_prob: result.normal_prob,
            image_filename: result.image_filename.clone(),
            patient_name: result.patient_name.clone(),
            patient_age: result.patient_age.clone(),
            notes: result.notes.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InvalidImageResponse {
    pub prediction: String,
    pub message: String,
}

impl InvalidImageResponse {
    pub fn new(message: &str) -> Self {
        Self {
            prediction: INVALID_IMAGE.to_string(),
            message: message.to_string(),
        }
    }
}

/// The analysis a chat message is about, supplied by the client or looked
/// up by id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisContext {
    pub prediction: Prediction,
    pub confidence: f64,
    pub pneumonia_prob: f64,
    pub normal_prob: f64,
    #[serde(default)]
    pub patient_name: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub analysis_id: Option<String>,
    #[serde(default)]
    pub analysis: Option<AnalysisContext>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub reply: String,
}

/// Body of `/download-report`. Every field is optional; the report falls
/// back to placeholders.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ReportRequest {
    pub patient_name: Option<String>,
    pub patient_age: Option<serde_json::Value>,
    pub notes: Option<String>,
    pub prediction: Option<String>,
    pub confidence: Option<f64>,
    pub pneumonia_prob: Option<f64>,
    pub normal_prob: Option<f64>,
    pub image_filename: Option<String>,
}
