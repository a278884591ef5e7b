//! Feature records and the JSON dataset they are loaded from.
//!
//! Two document shapes are accepted: a plain array of records, and a GeoJSON
//! `FeatureCollection` of points carrying the metrics in `properties`.
//! Metrics are not validated. A missing metric reads as NaN and flows through
//! the builders as a degenerate value.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Errors that can occur while loading a dataset.
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    /// The dataset file could not be read.
    #[error("failed to read dataset {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The document is not valid JSON or does not match the record schema.
    #[error("failed to parse dataset: {0}")]
    Parse(#[from] serde_json::Error),

    /// Valid JSON, but neither an array nor a `FeatureCollection`.
    #[error("unsupported dataset document: {0}")]
    UnsupportedDocument(String),

    /// A GeoJSON point with fewer than two coordinates.
    #[error("feature {index} has {found} coordinate(s), expected at least 2")]
    InvalidCoordinates { index: usize, found: usize },
}

fn missing_metric() -> f64 {
    f64::NAN
}

/// One geolocated event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureRecord {
    /// `(longitude, latitude)` in degrees.
    pub coordinates: [f64; 2],
    #[serde(default = "missing_metric")]
    pub total_call_time_in_seconds: f64,
    #[serde(default = "missing_metric")]
    pub avg_stress_intensity: f64,
}

impl FeatureRecord {
    pub fn new(lon: f64, lat: f64, total_call_time_in_seconds: f64, avg_stress_intensity: f64) -> Self {
        Self {
            coordinates: [lon, lat],
            total_call_time_in_seconds,
            avg_stress_intensity,
        }
    }

    pub fn lon(&self) -> f64 {
        self.coordinates[0]
    }

    pub fn lat(&self) -> f64 {
        self.coordinates[1]
    }
}

#[derive(Deserialize)]
struct GeoFeature {
    geometry: GeoPoint,
    #[serde(default)]
    properties: GeoMetrics,
}

#[derive(Deserialize)]
struct GeoPoint {
    coordinates: Vec<f64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeoMetrics {
    #[serde(default = "missing_metric")]
    total_call_time_in_seconds: f64,
    #[serde(default = "missing_metric")]
    avg_stress_intensity: f64,
}

impl Default for GeoMetrics {
    fn default() -> Self {
        Self {
            total_call_time_in_seconds: missing_metric(),
            avg_stress_intensity: missing_metric(),
        }
    }
}

/// Ordered, immutable list of feature records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    records: Vec<FeatureRecord>,
}

impl Dataset {
    pub fn new(records: Vec<FeatureRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[FeatureRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FeatureRecord> {
        self.records.iter()
    }

    /// Parse a dataset document.
    pub fn from_json_str(json: &str) -> Result<Self, DatasetError> {
        let document: Value = serde_json::from_str(json)?;
        match document {
            Value::Array(records) => Ok(Self::new(serde_json::from_value(Value::Array(records))?)),
            Value::Object(mut map) => {
                let kind = map.get("type").and_then(Value::as_str).map(str::to_owned);
                match kind.as_deref() {
                    Some("FeatureCollection") => {
                        let features: Vec<GeoFeature> = match map.remove("features") {
                            Some(features) => serde_json::from_value(features)?,
                            None => Vec::new(),
                        };
                        Self::from_geo_features(features)
                    }
                    Some(other) => Err(DatasetError::UnsupportedDocument(format!(
                        "GeoJSON type {other}"
                    ))),
                    None => Err(DatasetError::UnsupportedDocument(
                        "object without a GeoJSON type".to_string(),
                    )),
                }
            }
            other => Err(DatasetError::UnsupportedDocument(format!(
                "top-level {}",
                json_kind(&other)
            ))),
        }
    }

    /// Read and parse a dataset file.
    pub fn load(path: &Path) -> Result<Self, DatasetError> {
        let contents = std::fs::read_to_string(path).map_err(|source| DatasetError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let dataset = Self::from_json_str(&contents)?;
        tracing::info!(
            path = %path.display(),
            features = dataset.len(),
            "Loaded dataset"
        );
        Ok(dataset)
    }

    fn from_geo_features(features: Vec<GeoFeature>) -> Result<Self, DatasetError> {
        features
            .into_iter()
            .enumerate()
            .map(|(index, feature)| match feature.geometry.coordinates[..] {
                [lon, lat, ..] => Ok(FeatureRecord::new(
                    lon,
                    lat,
                    feature.properties.total_call_time_in_seconds,
                    feature.properties.avg_stress_intensity,
                )),
                _ => Err(DatasetError::InvalidCoordinates {
                    index,
                    found: feature.geometry.coordinates.len(),
                }),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self::new)
    }
}

impl<'a> IntoIterator for &'a Dataset {
    type Item = &'a FeatureRecord;
    type IntoIter = std::slice::Iter<'a, FeatureRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
