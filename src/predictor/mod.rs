use async_trait::async_trait;
use log::info;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::fs;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Debug, Error)]
pub enum PredictorError {
    #[error("house info is missing a usable '{0}' field")]
    MissingFeature(&'static str),
    #[error("prediction failed: {0}")]
    Failed(String),
}

#[derive(Debug, Error)]
pub enum ModelStoreError {
    #[error("model {0} not found")]
    NotFound(i64),
    #[error("failed to load model artifacts from '{path}': {reason}")]
    Artifacts {
        path: String,
        reason: String,
    },
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PriceEstimate {
    pub unit_price: f64,
    pub total_price: f64,
}

/// A trained price model. Training and feature engineering live outside
/// this crate; implementations only expose prediction plus the metadata
/// the ensemble weighting needs.
pub trait Predictor: Send + Sync + std::fmt::Debug {
    fn name(&self) -> &str;

    /// Number of samples the model was trained on; this is its weight
    /// in the ensemble.
    fn data_count(&self) -> u64;

    fn predict(&self, house_info: &JsonValue) -> Result<PriceEstimate, PredictorError>;
}

/// Load interface over stored model artifacts.
#[async_trait]
pub trait ModelStore: Send + Sync {
    async fn load(&self, id: i64) -> Result<Arc<dyn Predictor>, ModelStoreError>;

    async fn len(&self) -> usize;
}

/// Serialized form of a trained baseline model.
#[derive(Clone, Debug, Deserialize)]
pub struct ModelArtifact {
    pub id: i64,
    pub model_name: String,
    pub data_count: u64,
    pub avg_unit_price: f64,
}

/// Baseline model reconstructed from an artifact: predicts its declared
/// average unit price, with total price derived from the listing area.
#[derive(Debug)]
pub struct BaselinePredictor {
    name: String,
    data_count: u64,
    avg_unit_price: f64,
}

impl BaselinePredictor {
    pub fn new(name: impl Into<String>, data_count: u64, avg_unit_price: f64) -> Self {
        Self {
            name: name.into(),
            data_count,
            avg_unit_price,
        }
    }

    pub fn from_artifact(artifact: &ModelArtifact) -> Self {
        Self::new(artifact.model_name.clone(), artifact.data_count, artifact.avg_unit_price)
    }
}

impl Predictor for BaselinePredictor {
    fn name(&self) -> &str {
        &self.name
    }

    fn data_count(&self) -> u64 {
        self.data_count
    }

    fn predict(&self, house_info: &JsonValue) -> Result<PriceEstimate, PredictorError> {
        let unit_price = self.avg_unit_price;
        // Listings often carry the area as an annotated string ("102㎡");
        // a missing area yields a zero total, matching upstream records
        // that only have a unit price.
        let total_price = match house_info.get("area").and_then(parse_area) {
            Some(area) => unit_price * area,
            None => 0.0,
        };
        Ok(PriceEstimate { unit_price, total_price })
    }
}

/// Accepts a JSON number or a string with a leading numeric part.
fn parse_area(value: &JsonValue) -> Option<f64> {
    match value {
        JsonValue::Number(n) => n.as_f64().filter(|a| *a > 0.0),
        JsonValue::String(s) => {
            let numeric: String = s
                .trim()
                .chars()
                .take_while(|c| c.is_ascii_digit() || *c == '.')
                .collect();
            numeric.parse::<f64>().ok().filter(|a| *a > 0.0)
        }
        _ => None,
    }
}

/// Process-local model store. Populated from an artifact file at startup
/// or programmatically in tests.
#[derive(Default)]
pub struct InMemoryModelStore {
    models: RwLock<HashMap<i64, Arc<dyn Predictor>>>,
}

impl InMemoryModelStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a JSON array of `ModelArtifact` records.
    pub fn from_artifact_file(path: &str) -> Result<Self, ModelStoreError> {
        let contents = fs::read_to_string(path).map_err(|e| ModelStoreError::Artifacts {
            path: path.to_string(),
            reason: e.to_string(),
        })?;
        let artifacts: Vec<ModelArtifact> = serde_json
            ::from_str(&contents)
            .map_err(|e| ModelStoreError::Artifacts {
                path: path.to_string(),
                reason: e.to_string(),
            })?;

        let mut models: HashMap<i64, Arc<dyn Predictor>> = HashMap::new();
        for artifact in &artifacts {
            models.insert(artifact.id, Arc::new(BaselinePredictor::from_artifact(artifact)));
        }
        info!("Loaded {} model artifact(s) from {}", models.len(), path);

        Ok(Self { models: RwLock::new(models) })
    }

    pub async fn insert(&self, id: i64, predictor: Arc<dyn Predictor>) {
        self.models.write().await.insert(id, predictor);
    }
}

#[async_trait]
impl ModelStore for InMemoryModelStore {
    async fn load(&self, id: i64) -> Result<Arc<dyn Predictor>, ModelStoreError> {
        self.models
            .read().await
            .get(&id)
            .cloned()
            .ok_or(ModelStoreError::NotFound(id))
    }

    async fn len(&self) -> usize {
        self.models.read().await.len()
    }
}
