//! Validation demo: two owners, three models, one ensemble
//!
//! Shows:
//! 1. Datasets are stored with reserved identities
//! 2. Models are oracle-tested, stored and validated against every dataset
//! 3. A parameter model is scored locally
//! 4. The ensemble is aggregated with per-model attribution
//! 5. The ledger's write log verifies, and tampering is caught

use async_trait::async_trait;
use chaincode::codec::{labels_to_f64, ROW_SEPARATOR};
use chaincode::{
    submit_json, submit_u64, Chaincode, ChaincodeError, Contract, Dataset, Keyed, LocalContract, ModelFile,
    RequestContext, ResultSet, ScoringOracle, ValidationSummary,
};
use ensemble::{aggregate, ScoredBatch, Snapshot};
use ledger::{Checkpoint, InMemoryStorage, Ledger, SigningKey};

/// Stands in for the Spark/mlr3 scoring services. Each model kind has a
/// fixed skill: decision trees follow the label closely, logistic
/// regression only loosely.
struct DemoOracle;

#[async_trait]
impl ScoringOracle for DemoOracle {
    async fn validate(&self, _ctx: &RequestContext, model: &ModelFile, dataset: &Dataset) -> chaincode::Result<Vec<f64>> {
        let sharp = model.model_type == "DT";
        Ok(labels_to_f64(&dataset.class)
            .into_iter()
            .enumerate()
            .map(|(i, y)| {
                let noise = ((i * 7 + model.id as usize * 3) % 5) as f64 / 10.0;
                if sharp {
                    (0.1 + 0.8 * y + noise / 4.0).min(0.99)
                } else {
                    (0.3 + 0.3 * y + noise / 2.0).min(0.99)
                }
            })
            .collect())
    }

    async fn test_model(&self, _ctx: &RequestContext, model: &ModelFile) -> chaincode::Result<bool> {
        Ok(!model.file.is_empty())
    }
}

fn args(v: &[&str]) -> Vec<String> {
    v.iter().map(|s| s.to_string()).collect()
}

#[tokio::main]
async fn main() -> Result<(), ChaincodeError> {
    println!("╔════════════════════════════════════════════════╗");
    println!("║  Model Validation Ledger - Demo               ║");
    println!("║  Oracle scoring + ensemble attribution        ║");
    println!("╚════════════════════════════════════════════════╝\n");

    let store = Ledger::new(InMemoryStorage::new());
    let vk = store.verifying_key();
    let contract = LocalContract::new(Chaincode::new(store, DemoOracle));
    let ctx = RequestContext::new();

    // 1. Datasets
    println!("📝 Step 1: Owners upload datasets");
    println!("   ───────────────────────────────");

    let uploads = [
        ("alice", vec![vec!["1.2", "0.4", "3.3", "2.2"], vec!["7", "1", "9", "4"]], "0,0,1,1"),
        ("bob", vec![vec!["0.9", "2.8", "1.1"], vec!["2", "8", "3"]], "0,1,0"),
    ];
    for (owner, columns, labels) in uploads {
        let id = submit_u64(&contract, &ctx, "ReserveDataID", &args(&[owner])).await?;
        let name = format!("dataCol{id}");
        let encoded = columns
            .iter()
            .map(|c| c.join(","))
            .collect::<Vec<_>>()
            .join(&ROW_SEPARATOR.to_string());
        contract
            .submit(&ctx, "initFlexData", &args(&[&name, owner, &id.to_string(), &encoded, labels]))
            .await?;
        println!("   {owner:>5} → {name} ({} rows)", labels.split(',').count());
    }
    println!();

    // 2. Models
    println!("🧪 Step 2: Models are tested, stored and validated");
    println!("   ────────────────────────────────────────────────");

    for (kind, library) in [("LR", "AS"), ("DT", "MLR3")] {
        let valid = submit_u64(&contract, &ctx, "testModelFile", &args(&["ZGVtbw==", kind, library])).await? != 0;
        if !valid {
            println!("   {kind}/{library}: rejected by oracle");
            continue;
        }
        let id = submit_u64(&contract, &ctx, "ReserveModelID", &args(&["carol"])).await?;
        let name = format!("Model{id}");
        contract
            .submit(&ctx, "initModelFile", &args(&[&name, kind, library, "carol", &id.to_string(), "ZGVtbw=="]))
            .await?;
        let summary: ValidationSummary = submit_json(&contract, &ctx, "insertedModelFile", &args(&[&name])).await?;
        println!("   {name} ({kind}/{library}) → {}", summary.recorded.join(", "));
    }
    println!();

    // 3. Parameter model
    println!("📐 Step 3: Parameter model scored on-ledger");
    println!("   ────────────────────────────────────────");

    contract
        .submit(&ctx, "initDataFile", &args(&["pairs0", "dave", "0", "1,2,3", "2,1,0", "1,0,0"]))
        .await?;
    contract
        .submit(&ctx, "initModel", &args(&["0.5", "-1.2", "0.8", "Linear0", "dave"]))
        .await?;
    let summary: ValidationSummary = submit_json(&contract, &ctx, "validateModel", &args(&["Linear0", "dave"])).await?;
    println!("   Linear0 → {}", summary.recorded.join(", "));
    println!("   (not a model file, so the report will skip it)\n");

    // 4. Ensemble
    println!("📊 Step 4: Ensemble report");
    println!("   ───────────────────────");

    let models: Vec<Keyed<ModelFile>> = submit_json(&contract, &ctx, "GetAllModels", &[]).await?;
    let data: Vec<Keyed<Dataset>> = submit_json(&contract, &ctx, "GetAllData", &[]).await?;
    let results: Vec<Keyed<ResultSet>> = submit_json(&contract, &ctx, "GetAllResults", &[]).await?;

    let snapshot = Snapshot {
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
    };
    let report = aggregate(&snapshot);

    println!("   {:<8} {:>7} {:>9} {:>9}", "model", "AUC", "log-loss", "Shapley");
    for (i, m) in report.members.iter().enumerate() {
        let shapley = report
            .attribution
            .as_ref()
            .and_then(|a| a.auc.get(i))
            .map(|v| format!("{v:.3}"))
            .unwrap_or_else(|| "-".into());
        println!("   {:<8} {:>7.3} {:>9.3} {:>9}", m.model, m.auc, m.log_loss, shapley);
    }
    println!("   ensemble AUC {:.3}, log-loss {:.3}", report.ensemble_auc, report.ensemble_log_loss);
    for p in &report.curve {
        println!("   {} member(s): AUC {:.3}", p.members, p.auc);
    }
    println!("   skipped result sets: {}\n", report.skipped_results);

    // 5. Write log
    println!("🔐 Step 5: Ledger write log");
    println!("   ────────────────────────");

    let checkpoint: Checkpoint = submit_json(&contract, &ctx, "GetCheckpoint", &[]).await?;
    println!("   Height: {}", checkpoint.height);
    println!("   Head:   {}", hex::encode(checkpoint.latest_event_hash));

    let mut copy = Ledger::with_key(InMemoryStorage::new(), SigningKey::from_bytes(&[7u8; 32]));
    copy.put("probe", b"1").map_err(ChaincodeError::from)?;
    let own_key = copy.verifying_key();
    println!("   Fresh ledger verifies with its own key:  {}", copy.verify_event_log(&own_key));
    println!("   ...and with the demo ledger's key:       {}", copy.verify_event_log(&vk));
    copy.tamper_last_signature_for_test();
    println!("   After tampering with a signature:        {}", copy.verify_event_log(&own_key));

    println!("\n╔════════════════════════════════════════════════╗");
    println!("║  ✓ Demo complete                              ║");
    println!("╚════════════════════════════════════════════════╝");
    Ok(())
}
