//! Ensemble report: reads every model, dataset and result off the ledger,
//! aggregates them and renders the outcome.

use std::fmt::Write as _;

use chaincode::codec::labels_to_f64;
use chaincode::{Dataset, Keyed, ModelFile, RequestContext, Result, ResultSet};
use chrono::{DateTime, Utc};
use ensemble::{aggregate, CurvePoint, EnsembleSnapshot, ScoredBatch, Snapshot};
use serde::Serialize;
use tracing::info;

use crate::client::LedgerClient;

/// A model as shown in the report, display names already applied.
#[derive(Clone, Debug, Serialize)]
pub struct ModelRow {
    #[serde(rename = "Key")]
    pub key: String,
    #[serde(rename = "Record")]
    pub record: ModelFile,
    /// Attributed AUC share, empty when attribution was skipped.
    #[serde(rename = "Shapley")]
    pub shapley: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct DatasetRow {
    pub key: String,
    pub owner: String,
    pub features: usize,
    pub rows: usize,
}

#[derive(Clone, Debug, Serialize)]
pub struct Report {
    pub generated_at: DateTime<Utc>,
    pub models: Vec<ModelRow>,
    pub datasets: Vec<DatasetRow>,
    pub results: Vec<Keyed<ResultSet>>,
    pub ensemble: EnsembleSnapshot,
}

pub async fn build(client: &LedgerClient, ctx: &RequestContext) -> Result<Report> {
    let models = client.all_models(ctx).await?;
    let data = client.all_data(ctx).await?;
    let results = client.all_results(ctx).await?;

    let report = assemble(models, data, results);
    info!(
        request_id = %ctx.request_id,
        members = report.ensemble.members.len(),
        auc = %fmt3(report.ensemble.ensemble_auc),
        curve = %sparkline(&curve_values(&report.ensemble.curve)),
        "report built"
    );
    Ok(report)
}

pub fn snapshot_of(models: &[Keyed<ModelFile>], data: &[Keyed<Dataset>], results: &[Keyed<ResultSet>]) -> Snapshot {
    Snapshot {
        models: models.iter().map(|m| m.record.name.clone()).collect(),
        label_batches: data.iter().map(|d| labels_to_f64(&d.record.class)).collect(),
        results: results
            .iter()
            .map(|r| ScoredBatch {
                model: r.record.model_name.clone(),
                dataset: r.record.data_col_name.clone(),
                predictions: r.record.results.clone(),
            })
            .collect(),
    }
}

/// Aggregates the records and annotates each model with its metrics.
pub fn assemble(
    models: Vec<Keyed<ModelFile>>,
    data: Vec<Keyed<Dataset>>,
    results: Vec<Keyed<ResultSet>>,
) -> Report {
    let ensemble = aggregate(&snapshot_of(&models, &data, &results));

    let models = models
        .into_iter()
        .map(|Keyed { key, mut record }| {
            let member = ensemble.members.iter().position(|m| m.model == record.name);
            if let Some(i) = member {
                record.logloss = Some(fmt3(ensemble.members[i].log_loss));
                record.accuracy = Some(fmt3(ensemble.members[i].auc));
            }
            let shapley = member
                .and_then(|i| ensemble.attribution.as_ref().and_then(|a| a.auc.get(i)))
                .map(|v| fmt3(*v))
                .unwrap_or_default();

            if let Ok(kind) = record.kind() {
                record.model_type = kind.display_name().to_string();
            }
            if let Ok(library) = record.library() {
                record.library_type = library.display_name().to_string();
            }
            ModelRow { key, record, shapley }
        })
        .collect();

    let datasets = data
        .into_iter()
        .map(|Keyed { key, record }| DatasetRow {
            features: record.table.as_ref().map_or(2, Vec::len),
            rows: record.rows(),
            owner: record.owner,
            key,
        })
        .collect();

    Report {
        generated_at: Utc::now(),
        models,
        datasets,
        results,
        ensemble,
    }
}

pub fn fmt3(v: f64) -> String {
    format!("{v:.3}")
}

fn curve_values(curve: &[CurvePoint]) -> Vec<f64> {
    curve.iter().map(|p| p.auc).collect()
}

/// One block character per value, scaled between the min and max.
pub fn sparkline(values: &[f64]) -> String {
    let chars = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];
    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let range = (max - min).max(0.001);

    values
        .iter()
        .map(|v| {
            let normalized = (v - min) / range;
            chars[((normalized * 7.0).round() as usize).min(7)]
        })
        .collect()
}

// ---- HTML ----

pub fn render_html(report: &Report) -> String {
    let e = &report.ensemble;
    let mut out = String::new();

    out.push_str("<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>Ensemble report</title></head><body>\n");
    let _ = writeln!(out, "<h1>Ensemble report</h1>");
    let _ = writeln!(
        out,
        "<p>Generated {}. Ensemble AUC <b>{}</b>, log-loss <b>{}</b>, {} member(s).</p>",
        report.generated_at.format("%Y-%m-%d %H:%M:%S UTC"),
        fmt3(e.ensemble_auc),
        fmt3(e.ensemble_log_loss),
        e.members.len()
    );
    if e.skipped_results > 0 {
        let _ = writeln!(out, "<p>{} result set(s) name unknown models and were skipped.</p>", e.skipped_results);
    }

    out.push_str("<h2>Models</h2>\n<table border=\"1\">\n");
    out.push_str("<tr><th>Name</th><th>Type</th><th>Library</th><th>Owner</th><th>AUC</th><th>Log-loss</th><th>Shapley</th></tr>\n");
    for m in &report.models {
        let r = &m.record;
        let _ = writeln!(
            out,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            escape(&r.name),
            escape(&r.model_type),
            escape(&r.library_type),
            escape(&r.owner),
            r.accuracy.as_deref().unwrap_or("-"),
            r.logloss.as_deref().unwrap_or("-"),
            if m.shapley.is_empty() { "-" } else { m.shapley.as_str() },
        );
    }
    out.push_str("</table>\n");

    out.push_str("<h2>Datasets</h2>\n<table border=\"1\">\n<tr><th>Name</th><th>Owner</th><th>Features</th><th>Rows</th></tr>\n");
    for d in &report.datasets {
        let _ = writeln!(
            out,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            escape(&d.key),
            escape(&d.owner),
            d.features,
            d.rows
        );
    }
    out.push_str("</table>\n");

    out.push_str("<h2>Results</h2>\n<table border=\"1\">\n<tr><th>Key</th><th>Model</th><th>Dataset</th><th>Predictions</th></tr>\n");
    for r in &report.results {
        let _ = writeln!(
            out,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            escape(&r.key),
            escape(&r.record.model_name),
            escape(&r.record.data_col_name),
            r.record.results.len()
        );
    }
    out.push_str("</table>\n");

    out.push_str("<h2>AUC by ensemble size</h2>\n");
    out.push_str(&render_curve_svg(&e.curve));
    out.push_str("\n</body></html>\n");
    out
}

const SVG_W: f64 = 480.0;
const SVG_H: f64 = 240.0;
const PAD: f64 = 32.0;

/// Line chart of AUC (y, 0..1) against member count (x).
pub fn render_curve_svg(curve: &[CurvePoint]) -> String {
    let mut svg = String::new();
    let _ = write!(
        svg,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{SVG_W}\" height=\"{SVG_H}\" viewBox=\"0 0 {SVG_W} {SVG_H}\">"
    );
    let (x0, y0, x1, y1) = (PAD, SVG_H - PAD, SVG_W - PAD, PAD);
    let _ = write!(svg, "<line x1=\"{x0}\" y1=\"{y0}\" x2=\"{x1}\" y2=\"{y0}\" stroke=\"black\"/>");
    let _ = write!(svg, "<line x1=\"{x0}\" y1=\"{y0}\" x2=\"{x0}\" y2=\"{y1}\" stroke=\"black\"/>");
    let _ = write!(svg, "<text x=\"4\" y=\"{}\" font-size=\"10\">1.0</text>", y1 + 4.0);
    let _ = write!(svg, "<text x=\"4\" y=\"{}\" font-size=\"10\">0.0</text>", y0 + 4.0);

    if curve.is_empty() {
        let _ = write!(svg, "<text x=\"{}\" y=\"{}\" font-size=\"12\">no results yet</text>", x0 + 8.0, SVG_H / 2.0);
        svg.push_str("</svg>");
        return svg;
    }

    let span = (curve.len().max(2) - 1) as f64;
    let points: Vec<(f64, f64)> = curve
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let x = x0 + (x1 - x0) * i as f64 / span;
            let y = y0 - (y0 - y1) * p.auc.clamp(0.0, 1.0);
            (x, y)
        })
        .collect();

    let path = points
        .iter()
        .map(|(x, y)| format!("{x:.1},{y:.1}"))
        .collect::<Vec<_>>()
        .join(" ");
    let _ = write!(svg, "<polyline fill=\"none\" stroke=\"steelblue\" stroke-width=\"2\" points=\"{path}\"/>");

    for ((x, y), p) in points.iter().zip(curve) {
        let _ = write!(svg, "<circle cx=\"{x:.1}\" cy=\"{y:.1}\" r=\"3\" fill=\"steelblue\"><title>{} member(s): {}</title></circle>", p.members, fmt3(p.auc));
        let _ = write!(svg, "<text x=\"{:.1}\" y=\"{}\" font-size=\"10\" text-anchor=\"middle\">{}</text>", x, y0 + 14.0, p.members);
    }
    svg.push_str("</svg>");
    svg
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chaincode::{Library, ModelKind};

    fn keyed<T>(key: &str, record: T) -> Keyed<T> {
        Keyed { key: key.to_string(), record }
    }

    fn fixture() -> (Vec<Keyed<ModelFile>>, Vec<Keyed<Dataset>>, Vec<Keyed<ResultSet>>) {
        let models = vec![
            keyed("Model0", ModelFile::new("Model0", ModelKind::LR, Library::AS, "alice", 0, "cGF5")),
            keyed("Model1", ModelFile::new("Model1", ModelKind::DT, Library::MLR3, "bob", 1, "cGF5")),
        ];
        let data = vec![keyed(
            "dataCol0",
            Dataset::flexible(
                "dataCol0",
                "alice",
                0,
                vec![vec!["1".into(), "2".into(), "3".into()]],
                vec!["0".into(), "1".into(), "1".into()],
            ),
        )];
        let results = vec![keyed("results0", ResultSet::new("Model0", "dataCol0", vec![0.2, 0.7, 0.9]))];
        (models, data, results)
    }

    #[test]
    fn annotates_members_and_maps_display_names() {
        let (models, data, results) = fixture();
        let report = assemble(models, data, results);

        let m0 = &report.models[0].record;
        assert_eq!(m0.accuracy.as_deref(), Some("1.000"));
        assert!(m0.logloss.is_some());
        assert_eq!(m0.model_type, "Logistic regression");
        assert_eq!(m0.library_type, "PySpark");
        assert_eq!(report.models[0].shapley, "1.000");

        // no results, so no metrics
        let m1 = &report.models[1].record;
        assert_eq!(m1.accuracy, None);
        assert_eq!(m1.model_type, "Decision tree");
        assert_eq!(m1.library_type, "mlr3");
        assert_eq!(report.models[1].shapley, "");

        assert_eq!(report.datasets[0].features, 1);
        assert_eq!(report.datasets[0].rows, 3);
    }

    #[test]
    fn html_has_tables_and_chart() {
        let (models, data, results) = fixture();
        let html = render_html(&assemble(models, data, results));
        assert!(html.contains("<td>Model0</td>"));
        assert!(html.contains("Ensemble AUC <b>1.000</b>"));
        assert!(html.contains("<polyline"));
    }

    #[test]
    fn names_are_escaped() {
        assert_eq!(escape("<b>&\"x\""), "&lt;b&gt;&amp;&quot;x&quot;");
    }

    #[test]
    fn empty_curve_renders_placeholder() {
        let svg = render_curve_svg(&[]);
        assert!(svg.contains("no results yet"));
        assert!(!svg.contains("<polyline"));
    }

    #[test]
    fn sparkline_spans_low_to_high() {
        assert_eq!(sparkline(&[0.5, 0.75, 1.0]), "▁▅█");
        assert_eq!(sparkline(&[0.6, 0.6]), "▁▁");
        assert_eq!(sparkline(&[]), "");
    }
}
