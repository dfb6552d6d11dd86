//! Rendering of API results for the terminal

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde_json::Value;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
}

/// Render a decoded response in the requested format
pub fn render(value: &Value, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(value).context("Failed to render result as JSON")
        }
        OutputFormat::Yaml => {
            let yaml = serde_yaml::to_string(value).context("Failed to render result as YAML")?;
            Ok(yaml.trim_end().to_string())
        }
    }
}
