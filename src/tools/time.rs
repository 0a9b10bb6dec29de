use async_trait::async_trait;
use chrono::Local;
use serde::Deserialize;
use serde_json::Value as JsonValue;

use super::{ Tool, ToolError, ToolSpec };

/// Reports the current local time, optionally annotated with a city
/// name. Pure; it has no failure modes.
pub struct CurrentTimeTool;

#[derive(Deserialize)]
struct TimeArgs {
    #[serde(default)]
    city: Option<String>,
}

#[async_trait]
impl Tool for CurrentTimeTool {
    fn name(&self) -> &'static str {
        "get_current_time"
    }

    fn spec(&self) -> ToolSpec {
        ToolSpec::function(
            self.name(),
            "Returns the current local time, optionally for a named city.",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "city": {
                        "type": "string",
                        "description": "City name, e.g. Beijing, Shanghai or London"
                    }
                },
                "required": []
            })
        )
    }

    async fn call(&self, args: JsonValue) -> Result<String, ToolError> {
        let args: TimeArgs = serde_json
            ::from_value(args)
            .map_err(|e| ToolError::InvalidArguments(e.to_string()))?;

        let now = Local::now().format("%Y-%m-%d %H:%M:%S");
        Ok(match args.city.as_deref().filter(|c| !c.trim().is_empty()) {
            Some(city) => format!("Current local time in {} is {}", city, now),
            None => format!("Current local time is {}", now),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reports_time_without_city() {
        let result = CurrentTimeTool.call(serde_json::json!({})).await.unwrap();
        assert!(result.starts_with("Current local time is "));
    }

    #[tokio::test]
    async fn annotates_city_when_given() {
        let result = CurrentTimeTool.call(serde_json::json!({ "city": "London" })).await.unwrap();
        assert!(result.starts_with("Current local time in London is "));
    }

    #[tokio::test]
    async fn ignores_unknown_fields() {
        let result = CurrentTimeTool.call(
            serde_json::json!({ "city": "Paris", "timezone": "CET" })
        ).await.unwrap();
        assert!(result.contains("Paris"));
    }
}
