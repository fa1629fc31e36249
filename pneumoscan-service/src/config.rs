use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Request bodies larger than this are rejected on every route.
pub const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

pub const DEFAULT_CHAT_MODEL: &str = "llama-3.1-8b-instant";

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub port: u16,
    pub models_dir: PathBuf,
    pub upload_dir: PathBuf,
    pub groq_api_key: Option<String>,
    pub chat_model: String,
    pub retention: Duration,
    pub sweep_interval: Duration,
    pub onnx_intra_threads: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            port: 5000,
            models_dir: PathBuf::from("models"),
            upload_dir: PathBuf::from("static/uploads"),
            groq_api_key: None,
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            retention: Duration::from_secs(24 * 60 * 60),
            sweep_interval: Duration::from_secs(15 * 60),
            onnx_intra_threads: 2,
        }
    }
}

impl ServiceConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        Self {
            port: parse_or(lookup("PORT"), defaults.port),
            models_dir: lookup("MODELS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.models_dir),
            upload_dir: lookup("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_dir),
            groq_api_key: lookup("GROQ_API_KEY").filter(|key| !key.trim().is_empty()),
            chat_model: lookup("GROQ_MODEL").unwrap_or(defaults.chat_model),
            retention: Duration::from_secs(parse_or(
                lookup("UPLOAD_RETENTION_SECS"),
                defaults.retention.as_secs(),
            )),
            sweep_interval: Duration::from_secs(parse_or(
                lookup("RETENTION_SWEEP_SECS").filter(|v| v.trim().parse::<u64>().ok() != Some(0)),
                defaults.sweep_interval.as_secs(),
            )),
            onnx_intra_threads: parse_or(
                lookup("ONNX_INTRA_THREADS"),
                defaults.onnx_intra_threads,
            ),
        }
    }
}

fn parse_or<T: FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}
