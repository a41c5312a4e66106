//! Scoring oracles: external services that turn a model and a dataset
//! into predictions, or check that a model artifact is usable.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{ChaincodeError, Dataset, Library, ModelFile, ModelKind, RequestContext, Result};

#[async_trait]
pub trait ScoringOracle: Send + Sync {
    /// Predictions for every row of `dataset`, in row order.
    async fn validate(&self, ctx: &RequestContext, model: &ModelFile, dataset: &Dataset) -> Result<Vec<f64>>;

    /// Whether the oracle accepts `model` as a usable artifact.
    async fn test_model(&self, ctx: &RequestContext, model: &ModelFile) -> Result<bool>;
}

/// How an endpoint encodes its responses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResponseFormat {
    /// `{"Results": [...]}` and `{"modelValidity": n}`
    Json,
    /// Paired bracket text for predictions, backslash-escaped JSON for validity
    BracketPairs,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoint {
    pub validate_url: String,
    pub test_url: String,
    pub format: ResponseFormat,
}

/// Closed mapping of (library, kind) to the endpoint serving it.
#[derive(Clone, Debug, Default)]
pub struct EndpointTable {
    entries: HashMap<(Library, ModelKind), Endpoint>,
}

impl EndpointTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spark serves one route per model kind; MLR3 dispatches on the payload.
    pub fn standard(spark_base: &str, mlr3_base: &str) -> Self {
        let mut table = Self::new();
        for kind in [ModelKind::LR, ModelKind::DT] {
            table.insert(
                Library::AS,
                kind,
                Endpoint {
                    validate_url: join_url(spark_base, &format!("apiValidate{kind}")),
                    test_url: join_url(spark_base, &format!("apiTest{kind}")),
                    format: ResponseFormat::Json,
                },
            );
            table.insert(
                Library::MLR3,
                kind,
                Endpoint {
                    validate_url: join_url(mlr3_base, "apiValidate"),
                    test_url: join_url(mlr3_base, "apiTest"),
                    format: ResponseFormat::BracketPairs,
                },
            );
        }
        table
    }

    pub fn insert(&mut self, library: Library, kind: ModelKind, endpoint: Endpoint) {
        self.entries.insert((library, kind), endpoint);
    }

    pub fn resolve(&self, library: Library, kind: ModelKind) -> Result<&Endpoint> {
        self.entries.get(&(library, kind)).ok_or_else(|| {
            ChaincodeError::Configuration(format!("no scoring endpoint for library {library} and kind {kind}"))
        })
    }

    /// Endpoint for a stored model, parsing its string tags.
    pub fn for_model(&self, model: &ModelFile) -> Result<&Endpoint> {
        self.resolve(model.library()?, model.kind()?)
    }
}

pub fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// Request body for both oracle routes.
#[derive(Serialize)]
pub struct OraclePayload<'a> {
    #[serde(rename = "Model")]
    pub model: &'a ModelFile,
    #[serde(rename = "Data")]
    pub data: &'a Dataset,
}

#[derive(Deserialize)]
struct JsonResults {
    #[serde(rename = "Results", alias = "results")]
    results: Vec<f64>,
}

#[derive(Deserialize)]
struct Validity {
    #[serde(rename = "modelValidity")]
    model_validity: i64,
}

pub fn parse_predictions(format: ResponseFormat, body: &[u8]) -> Result<Vec<f64>> {
    match format {
        ResponseFormat::Json => {
            let parsed: JsonResults = serde_json::from_slice(body)
                .map_err(|e| ChaincodeError::Serialization(format!("oracle results: {e}")))?;
            Ok(parsed.results)
        }
        ResponseFormat::BracketPairs => parse_bracket_pairs(&String::from_utf8_lossy(body)),
    }
}

/// Drops the outer characters, splits on commas and keeps the odd-indexed
/// tokens with brackets removed. Tokens that are not numbers are skipped.
pub fn parse_bracket_pairs(text: &str) -> Result<Vec<f64>> {
    let inner = strip_outer(text)
        .ok_or_else(|| ChaincodeError::Serialization(format!("oracle results too short: {text:?}")))?;

    Ok(inner
        .split(',')
        .enumerate()
        .filter(|(i, _)| i % 2 == 1)
        .filter_map(|(_, tok)| tok.replace(['[', ']'], "").parse::<f64>().ok())
        .collect())
}

pub fn parse_validity(format: ResponseFormat, body: &[u8]) -> Result<bool> {
    let text = String::from_utf8_lossy(body);
    let parsed: Validity = match format {
        ResponseFormat::Json => serde_json::from_str(&text),
        ResponseFormat::BracketPairs => {
            let unescaped = text.replace('\\', "");
            let inner = strip_outer(&unescaped).ok_or_else(|| {
                ChaincodeError::Serialization(format!("oracle validity too short: {text:?}"))
            })?;
            serde_json::from_str(inner)
        }
    }
    .map_err(|e| ChaincodeError::Serialization(format!("oracle validity: {e}")))?;

    Ok(parsed.model_validity != 0)
}

fn strip_outer(text: &str) -> Option<&str> {
    let mut chars = text.char_indices();
    let (_, first) = chars.next()?;
    let (last, _) = chars.next_back()?;
    text.get(first.len_utf8()..last)
}
