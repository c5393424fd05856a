//! `models` subcommand

use agent_core::provider::{LlmProvider, ModelInfo};

/// Human-readable size, e.g. `1.3 GB`
pub fn format_bytes(bytes: u64) -> String {
    if bytes == 0 {
        return "0 B".into();
    }

    #[allow(clippy::cast_precision_loss)]
    let mut value = bytes as f64;
    for unit in ["B", "KB", "MB", "GB", "TB"] {
        if value < 1024.0 {
            return format!("{value:.1} {unit}");
        }
        value /= 1024.0;
    }
    format!("{value:.1} PB")
}

fn describe(model: &ModelInfo) -> String {
    let size = model.size_bytes.map_or_else(|| "Unknown".into(), format_bytes);
    let modified = model
        .modified_at
        .as_deref()
        .and_then(|m| m.split('T').next())
        .filter(|d| !d.is_empty())
        .unwrap_or("Unknown");
    let family = model.family.as_deref().unwrap_or("Unknown");

    format!("{}  | Size: {size} | Modified: {modified} | Family: {family}", model.name)
}

pub async fn run(provider: &dyn LlmProvider) -> anyhow::Result<()> {
    let models = provider.list_models().await?;

    if models.is_empty() {
        println!("No models found. Please install a model first, e.g. `ollama pull llama3.2`.");
        return Ok(());
    }

    println!("Found {} models on {}:", models.len(), provider.name());
    for model in &models {
        println!("  {}", describe(model));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(512), "512.0 B");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(1_300_000_000), "1.2 GB");
    }

    #[test]
    fn test_describe_uses_date_part() {
        let model = ModelInfo {
            id: "mistral:latest".into(),
            name: "mistral:latest".into(),
            size_bytes: Some(4_109_865_159),
            modified_at: Some("2024-06-01T10:00:00.123Z".into()),
            family: Some("llama".into()),
        };
        assert_eq!(
            describe(&model),
            "mistral:latest  | Size: 3.8 GB | Modified: 2024-06-01 | Family: llama"
        );

        let bare = ModelInfo {
            name: "gpt-4o".into(),
            ..Default::default()
        };
        assert!(describe(&bare).contains("Size: Unknown | Modified: Unknown"));
    }
}
