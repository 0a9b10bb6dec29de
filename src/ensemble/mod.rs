use serde::{ Serialize, Deserialize };
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PredictionStatus {
    Success,
    Failed,
    Skipped,
}

/// One model's independent estimate, as produced by the predict tool.
/// Only `Success` records with a positive `data_count` contribute to
/// the fused result.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub source_id: i64,
    pub source_name: String,
    pub data_count: u64,
    pub unit_price: f64,
    pub total_price: f64,
    pub status: PredictionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PredictionRecord {
    pub fn success(
        source_id: i64,
        source_name: impl Into<String>,
        data_count: u64,
        unit_price: f64,
        total_price: f64
    ) -> Self {
        Self {
            source_id,
            source_name: source_name.into(),
            data_count,
            unit_price,
            total_price,
            status: PredictionStatus::Success,
            error: None,
        }
    }

    pub fn failed(source_id: i64, source_name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            source_id,
            source_name: source_name.into(),
            data_count: 0,
            unit_price: 0.0,
            total_price: 0.0,
            status: PredictionStatus::Failed,
            error: Some(error.into()),
        }
    }
}

/// Share of one contributing model in the fused estimate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Contributor {
    pub source_id: i64,
    pub source_name: String,
    pub data_count: u64,
    /// `data_count / total_weight`, against the final total, so the
    /// ratios of all contributors sum to 1.
    pub weight_ratio: f64,
}

/// The fused estimate: a size-weighted mean over the contributing
/// records, giving models trained on more data proportionally more
/// influence.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Aggregate {
    pub fused_unit_price: f64,
    pub fused_total_price: f64,
    pub total_weight: u64,
    pub contributors: Vec<Contributor>,
}

#[derive(Debug, Error, PartialEq)]
pub enum AggregationError {
    #[error("no valid prediction results found")]
    NoValidPredictions,
}

/// Fuses independent per-model estimates into one weighted mean.
/// Callers must handle `NoValidPredictions` before reading any price
/// field; there is no numeric result for an empty contributing set.
pub fn aggregate(records: &[PredictionRecord]) -> Result<Aggregate, AggregationError> {
    let contributing: Vec<&PredictionRecord> = records
        .iter()
        .filter(|r| r.status == PredictionStatus::Success && r.data_count > 0)
        .collect();

    let total_weight: u64 = contributing
        .iter()
        .map(|r| r.data_count)
        .sum();
    if total_weight == 0 {
        return Err(AggregationError::NoValidPredictions);
    }

    let weight = total_weight as f64;
    let fused_unit_price =
        contributing
            .iter()
            .map(|r| r.unit_price * (r.data_count as f64))
            .sum::<f64>() / weight;
    let fused_total_price =
        contributing
            .iter()
            .map(|r| r.total_price * (r.data_count as f64))
            .sum::<f64>() / weight;

    let contributors = contributing
        .iter()
        .map(|r| Contributor {
            source_id: r.source_id,
            source_name: r.source_name.clone(),
            data_count: r.data_count,
            weight_ratio: (r.data_count as f64) / weight,
        })
        .collect();

    Ok(Aggregate {
        fused_unit_price,
        fused_total_price,
        total_weight,
        contributors,
    })
}
