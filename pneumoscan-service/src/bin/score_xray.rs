use anyhow::{Context, Result};
use pneumoscan_service::ServiceConfig;
use std::env;
use std::sync::Arc;
use xray_gate::{GateOutcome, load_gate, preprocess_path};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let args: Vec<String> = env::args().collect();
    if args.len() != 2 {
        eprintln!("Usage: {} <image_path>", args[0]);
        eprintln!("Example: MODELS_DIR=./models {} ./samples/normal.jpeg", args[0]);
        std::process::exit(1);
    }

    let config = ServiceConfig::from_env();
    println!("Models directory: {}", config.models_dir.display());

    let gate = load_gate(&config.models_dir, config.onnx_intra_threads)
        .with_context(|| format!("loading models from {}", config.models_dir.display()))?;

    let tensor = preprocess_path(&args[1]).with_context(|| format!("reading {}", args[1]))?;
    let outcome = gate.evaluate(Arc::new(tensor)).await?;

    match &outcome {
        GateOutcome::NotXray { gate_score } => {
            println!("Rejected by X-ray gate (score {:.4})", gate_score);
        }
        GateOutcome::Classified(diagnosis) => {
            println!(
                "{} with {}% confidence (gate score {:.4})",
                diagnosis.prediction, diagnosis.confidence, diagnosis.gate_score
            );
        }
    }
    println!("{}", serde_json::to_string_pretty(&outcome)?);

    Ok(())
}
