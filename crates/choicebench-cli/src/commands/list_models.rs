//! The `choicebench list-models` command.

use std::path::PathBuf;

use anyhow::Result;

use choicebench_core::model::{ModelConfig, Vendor};
use choicebench_providers::config::load_config_from;

fn describe(model: &ModelConfig) -> String {
    let mut parts = vec![format!("model {}", model.model_id())];
    match model.parameters.temperature {
        Some(t) => parts.push(format!("temperature {t}")),
        None => parts.push("default temperature".to_string()),
    }
    if let Some(max_tokens) = model.parameters.max_tokens {
        parts.push(format!("max_tokens {max_tokens}"));
    }
    parts.push(format!("{:?} prompt", model.prompt_style()).to_lowercase());
    parts.join(", ")
}

pub fn execute(config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;

    if config.models.is_empty() {
        println!("No models configured. Run `choicebench init` to create a config file.");
        return Ok(());
    }

    for vendor in Vendor::ALL {
        let models: Vec<&ModelConfig> = config.models.iter().filter(|m| m.vendor == vendor).collect();
        if models.is_empty() {
            continue;
        }

        let status = match config.provider_for(vendor) {
            Some(_) => "configured",
            None if vendor == Vendor::Ollama => "local default",
            None => "not configured",
        };
        println!("Vendor: {vendor} ({status})");
        for model in models {
            println!("  {}: {}", model.name, describe(model));
        }
        println!();
    }

    Ok(())
}
