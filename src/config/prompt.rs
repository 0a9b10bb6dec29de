use log::{ info, warn };
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;
use thiserror::Error;

/// The assistant's standing instructions. Kept in a JSON file so the
/// prompt can be tuned without rebuilding; a missing file falls back to
/// the built-in default.
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a real-estate valuation assistant. You chat with users and help them estimate \
     house prices.\n\
     When the user asks about the current time, use the get_current_time tool.\n\
     When the user wants a price estimate, use the predict_house_price tool. The user must \
     provide a house description and a list of model ids.\n\
     The house description should include fields such as neighborhood, area, layout, floor, \
     build year, renovation, orientation, district, street and city. If fields are missing, \
     politely ask for them.\n\
     Prediction results contain a weighted-average unit and total price plus each model's \
     individual estimate. The user's own price figures, if any, are masked during prediction.\n\
     Answer in a friendly, professional tone.";

#[derive(Debug, Error)]
pub enum PromptError {
    #[error("failed to read prompts file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse prompts file '{path}': {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Clone, Debug, Deserialize)]
pub struct PromptConfig {
    pub system_prompt: String,
    #[serde(skip)]
    pub last_loaded: Option<SystemTime>,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            last_loaded: None,
        }
    }
}

pub fn load_prompts(path: &str) -> Result<Arc<PromptConfig>, PromptError> {
    let contents = fs::read_to_string(path).map_err(|e| PromptError::Io {
        path: path.to_string(),
        source: e,
    })?;
    let mut config: PromptConfig = serde_json::from_str(&contents).map_err(|e| PromptError::Json {
        path: path.to_string(),
        source: e,
    })?;
    config.last_loaded = Some(SystemTime::now());
    Ok(Arc::new(config))
}

/// Loads the prompt file, falling back to the built-in default when the
/// file does not exist. Parse errors of an existing file still fail.
pub fn load_prompts_or_default(path: &str) -> Result<Arc<PromptConfig>, PromptError> {
    if !Path::new(path).exists() {
        warn!("Prompts file '{}' not found; using built-in system prompt", path);
        return Ok(Arc::new(PromptConfig::default()));
    }
    let config = load_prompts(path)?;
    info!("Loaded system prompt from {}", path);
    Ok(config)
}

/// Reloads the prompt file when its mtime moved past the loaded copy.
/// Returns `None` when nothing changed.
pub fn reload_prompts_if_changed(
    path: &str,
    current: &Arc<PromptConfig>
) -> Result<Option<Arc<PromptConfig>>, PromptError> {
    let metadata = fs::metadata(path).map_err(|e| PromptError::Io {
        path: path.to_string(),
        source: e,
    })?;

    let changed = match (metadata.modified().ok(), current.last_loaded) {
        (Some(modified), Some(last_loaded)) => modified > last_loaded,
        _ => true,
    };

    if changed {
        info!("Prompts file changed, reloading...");
        return load_prompts(path).map(Some);
    }
    Ok(None)
}
