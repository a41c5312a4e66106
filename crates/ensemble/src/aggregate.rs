use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::attribution::{attribute, Attribution};
use crate::metrics::{auc, log_loss, mean_vector};

/// Predictions one model produced for one dataset.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoredBatch {
    pub model: String,
    pub dataset: String,
    pub predictions: Vec<f64>,
}

/// Everything the aggregator reads, each list in ledger discovery order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub models: Vec<String>,
    /// Class labels of every dataset.
    pub label_batches: Vec<Vec<f64>>,
    pub results: Vec<ScoredBatch>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MemberScore {
    pub model: String,
    pub predictions: Vec<f64>,
    pub auc: f64,
    pub log_loss: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CurvePoint {
    pub members: usize,
    pub auc: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnsembleSnapshot {
    pub members: Vec<MemberScore>,
    pub labels: Vec<f64>,
    pub ensemble_auc: f64,
    pub ensemble_log_loss: f64,
    /// AUC of the first k members together, k = 1..=n.
    pub curve: Vec<CurvePoint>,
    /// Absent when the ensemble is too large to enumerate.
    pub attribution: Option<Attribution>,
    /// Result sets naming a model that is not on the ledger.
    pub skipped_results: usize,
}

/// Combined predictions per known model, concatenated in result order.
/// Models without results are left out; unknown model names are counted.
pub fn regroup(models: &[String], results: &[ScoredBatch]) -> (Vec<(String, Vec<f64>)>, usize) {
    let mut combined: Vec<(String, Vec<f64>)> = models.iter().map(|m| (m.clone(), Vec::new())).collect();
    let mut seen = vec![false; models.len()];
    let mut skipped = 0;

    for r in results {
        match models.iter().position(|m| *m == r.model) {
            Some(i) => {
                combined[i].1.extend_from_slice(&r.predictions);
                seen[i] = true;
            }
            None => {
                debug!(model = %r.model, dataset = %r.dataset, "result for unknown model skipped");
                skipped += 1;
            }
        }
    }

    let members = combined
        .into_iter()
        .zip(seen)
        .filter_map(|(m, s)| s.then_some(m))
        .collect();
    (members, skipped)
}

/// Builds the full report snapshot. Never fails: inconsistent input is
/// skipped and attribution is dropped when it cannot be computed.
pub fn aggregate(snapshot: &Snapshot) -> EnsembleSnapshot {
    let labels: Vec<f64> = snapshot.label_batches.concat();
    let (members, skipped_results) = regroup(&snapshot.models, &snapshot.results);
    if skipped_results > 0 {
        warn!(skipped = skipped_results, "result sets reference unknown models");
    }

    let vectors: Vec<&[f64]> = members.iter().map(|(_, p)| p.as_slice()).collect();
    let ensemble = mean_vector(&vectors);

    let curve = (1..=vectors.len())
        .map(|k| CurvePoint {
            members: k,
            auc: auc(&labels, &mean_vector(&vectors[..k])),
        })
        .collect();

    let attribution = match attribute(&vectors, &labels) {
        Ok(a) => Some(a),
        Err(e) => {
            warn!(error = %e, "attribution skipped");
            None
        }
    };

    let members = members
        .into_iter()
        .map(|(model, predictions)| MemberScore {
            auc: auc(&labels, &predictions),
            log_loss: log_loss(&labels, &predictions),
            model,
            predictions,
        })
        .collect();

    EnsembleSnapshot {
        members,
        ensemble_auc: auc(&labels, &ensemble),
        ensemble_log_loss: log_loss(&labels, &ensemble),
        labels,
        curve,
        attribution,
        skipped_results,
    }
}
