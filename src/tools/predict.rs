use async_trait::async_trait;
use log::info;
use serde::{ Deserialize, Serialize };
use serde_json::Value as JsonValue;
use std::sync::Arc;

use super::{ Tool, ToolError, ToolSpec };
use crate::ensemble::{ self, Aggregate, PredictionRecord };
use crate::predictor::ModelStore;

/// Outcome of one prediction request: the fused estimate (when any model
/// produced a usable prediction) plus every per-model record, including
/// the failed ones.
#[derive(Clone, Debug, Serialize)]
pub struct PredictionReport {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregate: Option<Aggregate>,
    pub individual_predictions: Vec<PredictionRecord>,
}

/// Runs every requested model against the house description and fuses
/// the surviving estimates. Per-model failures are captured as `failed`
/// records so the ensemble still runs on whatever succeeded; this
/// function never fails outward.
pub async fn run_prediction(
    store: &Arc<dyn ModelStore>,
    house_info: &JsonValue,
    model_ids: &[i64]
) -> PredictionReport {
    let mut records = Vec::with_capacity(model_ids.len());

    for &id in model_ids {
        let record = match store.load(id).await {
            Ok(predictor) =>
                match predictor.predict(house_info) {
                    Ok(estimate) =>
                        PredictionRecord::success(
                            id,
                            predictor.name(),
                            predictor.data_count(),
                            estimate.unit_price,
                            estimate.total_price
                        ),
                    Err(e) => PredictionRecord::failed(id, predictor.name(), e.to_string()),
                }
            Err(e) => PredictionRecord::failed(id, format!("Model_{}", id), e.to_string()),
        };
        records.push(record);
    }

    match ensemble::aggregate(&records) {
        Ok(aggregate) => {
            info!(
                "Fused {} of {} model prediction(s); total weight {}",
                aggregate.contributors.len(),
                records.len(),
                aggregate.total_weight
            );
            PredictionReport {
                status: "success",
                error: None,
                aggregate: Some(aggregate),
                individual_predictions: records,
            }
        }
        Err(e) =>
            PredictionReport {
                status: "failed",
                error: Some(e.to_string()),
                aggregate: None,
                individual_predictions: records,
            },
    }
}

/// Predicts a house's unit and total price with one or more previously
/// trained models, fused by data-volume weighting.
pub struct PredictHousePriceTool {
    store: Arc<dyn ModelStore>,
}

impl PredictHousePriceTool {
    pub fn new(store: Arc<dyn ModelStore>) -> Self {
        Self { store }
    }
}

#[derive(Deserialize)]
struct PredictArgs {
    #[serde(default)]
    house_info: JsonValue,
    #[serde(default)]
    model_ids: Vec<i64>,
}

#[async_trait]
impl Tool for PredictHousePriceTool {
    fn name(&self) -> &'static str {
        "predict_house_price"
    }

    fn spec(&self) -> ToolSpec {
        ToolSpec::function(
            self.name(),
            "Predicts a house's unit and total price from its description, using one or more \
             trained models identified by id. Results from all models are fused by a weighted \
             average favoring models trained on more data.",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "house_info": {
                        "type": "object",
                        "description": "House description: neighborhood, area, layout, floor, \
                                        build year, renovation, orientation, district, street, \
                                        city and similar fields. Example: {\"neighborhood\": \
                                        \"Riverside\", \"area\": \"100㎡\", \"layout\": \"3br2ba\"}"
                    },
                    "model_ids": {
                        "type": "array",
                        "items": { "type": "integer" },
                        "description": "Ids of the trained models to consult, e.g. [1, 2, 3]."
                    }
                },
                "required": ["house_info", "model_ids"]
            })
        )
    }

    async fn call(&self, args: JsonValue) -> Result<String, ToolError> {
        let args: PredictArgs = serde_json
            ::from_value(args)
            .map_err(|e| ToolError::InvalidArguments(e.to_string()))?;

        let valid_house_info = args.house_info
            .as_object()
            .map(|o| !o.is_empty())
            .unwrap_or(false);
        if !valid_house_info {
            return Err(ToolError::InvalidArguments("house_info must be a non-empty object".into()));
        }
        if args.model_ids.is_empty() {
            return Err(ToolError::InvalidArguments("at least one model id is required".into()));
        }

        let report = run_prediction(&self.store, &args.house_info, &args.model_ids).await;
        serde_json::to_string(&report).map_err(|e| ToolError::Execution(e.to_string()))
    }
}
