//! PDF diagnostic report.
//!
//! Rendering is a pure function of [`ReportInput`]; the HTTP handler decides
//! where the bytes go.

mod chart;
mod layout;
pub mod pdf;

use chrono::{DateTime, Local};
use std::path::PathBuf;
use thiserror::Error;

use crate::models::ReportRequest;

pub use pdf::render_report;

pub const REPORT_DOWNLOAD_NAME: &str = "PneumoScan_Report.pdf";

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("PDF font error: {0}")]
    Font(String),

    #[error("PDF save error: {0}")]
    Save(String),
}

#[derive(Debug, Clone)]
pub struct ReportInput {
    pub patient_name: String,
    pub patient_age: String,
    pub notes: String,
    pub prediction: String,
    pub confidence: f64,
    pub pneumonia_prob: f64,
    pub normal_prob: f64,
    pub image_path: Option<PathBuf>,
    pub generated_at: DateTime<Local>,
}

impl ReportInput {
    pub fn from_request(request: ReportRequest, image_path: Option<PathBuf>) -> Self {
        let patient_age = match request.patient_age {
            Some(serde_json::Value::String(age)) => age,
            Some(serde_json::Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        };

        Self {
            patient_name: request.patient_name.unwrap_or_else(|| "N/A".to_string()),
            patient_age,
            notes: request.notes.unwrap_or_default(),
            prediction: request.prediction.unwrap_or_else(|| "N/A".to_string()),
            confidence: request.confidence.unwrap_or(0.0),
            pneumonia_prob: request.pneumonia_prob.unwrap_or(0.0),
            normal_prob: request.normal_prob.unwrap_or(0.0),
            image_path,
            generated_at: Local::now(),
        }
    }
}
