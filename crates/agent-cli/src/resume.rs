//! Resume critique: extract the text of a PDF or plain-text resume and ask
//! the configured model for structured feedback.

use std::path::Path;

use anyhow::{Context, bail};

use agent_core::message::Message;
use agent_core::provider::{GenerationOptions, LlmProvider, ModelInfo};
use agent_runtime::RuntimeConfig;

pub const EMPTY_DOCUMENT: &str = "The uploaded file is empty or could not be read.";

const SYSTEM_PROMPT: &str = "You are an expert in resume writing and job applications.";

fn is_pdf(bytes: &[u8], file_name: &str) -> bool {
    bytes.starts_with(b"%PDF") || file_name.to_ascii_lowercase().ends_with(".pdf")
}

fn extract_pdf(bytes: &[u8]) -> String {
    // pdf-extract panics on some malformed documents
    match std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes)) {
        Ok(Ok(text)) => text,
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "Could not read PDF");
            String::new()
        }
        Err(_) => {
            tracing::warn!("PDF extraction aborted");
            String::new()
        }
    }
}

fn decode_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(e) => {
            tracing::debug!(error = %e, "Not UTF-8, decoding as Latin-1");
            bytes.iter().map(|&b| char::from(b)).collect()
        }
    }
}

/// Text of a PDF or plain-text document, trimmed; empty on any failure
pub fn extract_text(bytes: &[u8], file_name: &str) -> String {
    let text = if is_pdf(bytes, file_name) {
        extract_pdf(bytes)
    } else {
        decode_text(bytes)
    };
    tracing::debug!(file = file_name, chars = text.len(), "Extracted document text");
    text.trim().to_string()
}

pub fn build_prompt(resume: &str, job_role: Option<&str>) -> String {
    let job_context = match job_role.map(str::trim).filter(|r| !r.is_empty()) {
        Some(role) => format!("The user is applying for the following job role: {role}"),
        None => "No specific job role mentioned.".to_string(),
    };

    format!(
        "You are an expert resume reviewer and career counselor. Please analyze the following \
resume and provide detailed, actionable feedback.

{job_context}

Resume Content:
{resume}

Please provide feedback in the following areas:
1. Overall Structure and Format
2. Content Quality and Relevance
3. Skills and Experience Presentation
4. Areas for Improvement
5. Specific Recommendations

Be constructive and specific in your feedback."
    )
}

pub fn critique_options(model: &str) -> GenerationOptions {
    GenerationOptions {
        model: model.to_string(),
        temperature: 0.7,
        top_p: 0.9,
        max_tokens: 2000,
    }
}

/// Whether `model` is among `available`, accepting Ollama's implicit `:latest` tag
fn model_available(model: &str, available: &[ModelInfo]) -> bool {
    let tagged = format!("{model}:latest");
    available
        .iter()
        .any(|m| m.name == model || m.id == model || m.name == tagged)
}

pub async fn run(
    provider: &dyn LlmProvider,
    config: &RuntimeConfig,
    path: &Path,
    job_role: Option<&str>,
) -> anyhow::Result<()> {
    match provider.list_models().await {
        Ok(models) if !models.is_empty() && !model_available(&config.model, &models) => {
            let names: Vec<&str> = models.iter().map(|m| m.name.as_str()).collect();
            bail!(
                "Model '{}' not found. Available models: {}",
                config.model,
                names.join(", ")
            );
        }
        Ok(_) => {}
        Err(e) => tracing::warn!(error = %e, "Could not list models"),
    }

    let bytes = std::fs::read(path).with_context(|| format!("cannot read {}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let text = extract_text(&bytes, &file_name);
    if text.is_empty() {
        bail!(EMPTY_DOCUMENT);
    }

    let prompt = build_prompt(&text, job_role);
    tracing::debug!(chars = prompt.len(), model = %config.model, "Sending resume for critique");

    let messages = [Message::system(SYSTEM_PROMPT), Message::human(prompt)];
    let completion = provider
        .complete(&messages, &[], &critique_options(&config.model))
        .await
        .with_context(|| provider.troubleshooting_hint().to_string())?;

    if completion.content.trim().is_empty() {
        bail!("Failed to get a response from the model. Please try again.");
    }

    println!("### Resume Analysis & Feedback:\n");
    println!("{}", completion.content.trim());

    Ok(())
}
