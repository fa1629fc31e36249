use crate::models::AnalysisContext;

pub const NO_REPORT_CONTEXT: &str = "No analysis report is currently available.\n";

const ASSISTANT_RULES: &str = "Your Rules:\n\
1. Only answer questions about pneumonia, lung health, and the current report.\n\
2. Explain the AI prediction clearly to the user.\n\
3. If the Prediction is PNEUMONIA, advise consulting a pulmonologist promptly.\n\
4. Give general precautions (rest, fluids, isolation) when relevant.\n\
5. You may name common medicine categories (e.g. antibiotics, antivirals) as general \
information if asked, but NEVER prescribe specific drugs or dosages.\n\
6. Always include this short disclaimer: \"I am an AI, not a doctor. Please consult a specialist.\"\n\
7. Keep answers concise (3-4 sentences at most) and empathetic.\n";

pub fn render_context(context: Option<&AnalysisContext>) -> String {
    let Some(ctx) = context else {
        return NO_REPORT_CONTEXT.to_string();
    };

    let patient = ctx
        .patient_name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or("the patient");

    let mut out = format!(
        "Current Analysis Report:\n\
         - Patient: {}\n\
         - Prediction: {}\n\
         - Confidence: {}%\n\
         - Pneumonia Probability: {}%\n\
         - Normal Probability: {}%\n",
        patient, ctx.prediction, ctx.confidence, ctx.pneumonia_prob, ctx.normal_prob
    );
    if let Some(timestamp) = &ctx.timestamp {
        out.push_str(&format!("- Analysis Time: {}\n", timestamp));
    }
    out
}

pub fn build_system_prompt(context: Option<&AnalysisContext>) -> String {
    format!(
        "You are PneumoBot, an AI medical assistant for lung health built into the \
         PneumoScan diagnostic platform.\n\n{}\n{}",
        render_context(context),
        ASSISTANT_RULES
    )
}
