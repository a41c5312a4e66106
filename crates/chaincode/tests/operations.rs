use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chaincode::codec::decode_u64;
use chaincode::{
    submit_json, submit_u64, ChaincodeError, Chaincode, Contract, Dataset, Keyed, Library, LocalContract, ModelFile,
    ModelKind, RequestContext, ResultSet, ScoringOracle, ValidationSummary,
};
use ledger::{InMemoryStorage, Ledger};
use tokio::sync::Notify;

/// Returns canned predictions per dataset name; fails for listed datasets.
#[derive(Default)]
struct StubOracle {
    predictions: HashMap<String, Vec<f64>>,
    failing: HashSet<String>,
    valid: bool,
    calls: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl ScoringOracle for StubOracle {
    async fn validate(&self, _ctx: &RequestContext, model: &ModelFile, dataset: &Dataset) -> chaincode::Result<Vec<f64>> {
        self.calls.lock().unwrap().push((model.name.clone(), dataset.data_name.clone()));
        if self.failing.contains(&dataset.data_name) {
            return Err(ChaincodeError::UpstreamUnavailable(format!("stub down for {}", dataset.data_name)));
        }
        Ok(self.predictions.get(&dataset.data_name).cloned().unwrap_or_default())
    }

    async fn test_model(&self, _ctx: &RequestContext, model: &ModelFile) -> chaincode::Result<bool> {
        assert_eq!(model.object_type, "testModel");
        assert_eq!(model.owner, "none");
        Ok(self.valid)
    }
}

/// Holds every validation until released, scoring 0.5 per row.
#[derive(Clone, Default)]
struct GatedOracle {
    entered: Arc<Notify>,
    release: Arc<Notify>,
}

#[async_trait]
impl ScoringOracle for GatedOracle {
    async fn validate(&self, _ctx: &RequestContext, _model: &ModelFile, dataset: &Dataset) -> chaincode::Result<Vec<f64>> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok(vec![0.5; dataset.rows()])
    }

    async fn test_model(&self, _ctx: &RequestContext, _model: &ModelFile) -> chaincode::Result<bool> {
        Ok(true)
    }
}

fn chaincode(oracle: StubOracle) -> Chaincode<InMemoryStorage, StubOracle> {
    Chaincode::new(Ledger::new(InMemoryStorage::new()), oracle)
}

fn args(v: &[&str]) -> Vec<String> {
    v.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn init_model_file_rejects_duplicates() {
    let ctx = RequestContext::new();
    let cc = chaincode(StubOracle::default());
    let a = args(&["Model0", "LR", "AS", "alice", "0", "QUJD"]);

    cc.invoke(&ctx, "initModelFile", &a).await.unwrap();
    let err = cc.invoke(&ctx, "initModelFile", &a).await.unwrap_err();
    assert!(matches!(err, ChaincodeError::AlreadyExists(k) if k == "Model0"));

    let raw = cc.invoke(&ctx, "readModel", &args(&["Model0"])).await.unwrap();
    let model: ModelFile = serde_json::from_slice(&raw).unwrap();
    assert_eq!(model.kind().unwrap(), ModelKind::LR);
    assert_eq!(model.file, "QUJD");
}

#[tokio::test]
async fn init_model_rejects_duplicates_and_bad_numbers() {
    let ctx = RequestContext::new();
    let cc = chaincode(StubOracle::default());

    cc.invoke(&ctx, "initModel", &args(&["0.1", " 2", "-3", "m1", "alice"])).await.unwrap();
    assert!(matches!(
        cc.invoke(&ctx, "initModel", &args(&["0", "0", "0", "m1", "alice"])).await,
        Err(ChaincodeError::AlreadyExists(_))
    ));
    assert!(matches!(
        cc.invoke(&ctx, "initModel", &args(&["zero", "0", "0", "m2", "alice"])).await,
        Err(ChaincodeError::Argument(_))
    ));
}

#[tokio::test]
async fn read_missing_model_is_not_found() {
    let ctx = RequestContext::new();
    let cc = chaincode(StubOracle::default());
    let err = cc.invoke(&ctx, "readModel", &args(&["ghost"])).await.unwrap_err();
    assert!(matches!(err, ChaincodeError::NotFound(_)));
    assert_eq!(err.payload().error, "NotFound");
}

#[tokio::test]
async fn argument_count_and_unknown_function() {
    let ctx = RequestContext::new();
    let cc = chaincode(StubOracle::default());

    assert!(matches!(
        cc.invoke(&ctx, "readModel", &[]).await,
        Err(ChaincodeError::Argument(_))
    ));
    assert!(matches!(
        cc.invoke(&ctx, "dropTables", &[]).await,
        Err(ChaincodeError::UnknownFunction(f)) if f == "dropTables"
    ));
}

#[tokio::test]
async fn unknown_model_kind_is_configuration_error() {
    let ctx = RequestContext::new();
    let cc = chaincode(StubOracle::default());
    let err = cc
        .invoke(&ctx, "initModelFile", &args(&["Model0", "RF", "AS", "alice", "0", ""]))
        .await
        .unwrap_err();
    assert!(matches!(err, ChaincodeError::Configuration(_)));
}

#[tokio::test]
async fn flex_data_checks_columns_against_labels() {
    let ctx = RequestContext::new();
    let cc = chaincode(StubOracle::default());

    let err = cc
        .invoke(&ctx, "initFlexData", &args(&["dataCol0", "alice", "0", "1,2,3>4,5", "0,1,1"]))
        .await
        .unwrap_err();
    assert!(matches!(err, ChaincodeError::Argument(_)));

    cc.invoke(&ctx, "initFlexData", &args(&["dataCol0", "alice", "0", "1,2,3>4,5,6", "0,1,1"]))
        .await
        .unwrap();
    let data: Vec<Keyed<Dataset>> =
        serde_json::from_slice(&cc.invoke(&ctx, "GetAllData", &[]).await.unwrap()).unwrap();
    assert_eq!(data.len(), 1);
    assert_eq!(data[0].record.table.as_ref().unwrap()[1], args(&["4", "5", "6"]));
    assert_eq!(data[0].record.class, args(&["0", "1", "1"]));
}

#[tokio::test]
async fn counted_ids_follow_owner_records() {
    let ctx = RequestContext::new();
    let cc = chaincode(StubOracle::default());

    let id = cc.invoke(&ctx, "GetModelID", &args(&["alice"])).await.unwrap();
    assert_eq!(id.len(), 8);
    assert_eq!(decode_u64(&id), Some(0));

    cc.invoke(&ctx, "initModelFile", &args(&["Model0", "LR", "AS", "alice", "0", ""])).await.unwrap();
    cc.invoke(&ctx, "initModelFile", &args(&["Model1", "DT", "AS", "bob", "0", ""])).await.unwrap();

    assert_eq!(cc.model_id(&ctx, "alice").unwrap(), 1);
    assert_eq!(cc.model_id(&ctx, "bob").unwrap(), 1);
    assert_eq!(cc.data_id(&ctx, "alice").unwrap(), 0);
}

#[tokio::test]
async fn counted_ids_collide_but_reserved_ids_do_not() {
    let ctx = RequestContext::new();
    let contract = LocalContract::new(chaincode(StubOracle::default()));
    let owner = args(&["alice"]);

    // two uploads that read the count before either writes
    let (a, b) = tokio::join!(
        submit_u64(&contract, &ctx, "GetModelID", &owner),
        submit_u64(&contract, &ctx, "GetModelID", &owner),
    );
    assert_eq!(a.unwrap(), b.unwrap());

    let mut tasks = Vec::new();
    for _ in 0..16 {
        let c = contract.clone();
        let owner = owner.clone();
        tasks.push(tokio::spawn(async move {
            submit_u64(&c, &RequestContext::new(), "ReserveModelID", &owner).await
        }));
    }
    let mut ids = Vec::new();
    for t in tasks {
        ids.push(t.await.unwrap().unwrap());
    }
    ids.sort_unstable();
    assert_eq!(ids, (0..16).collect::<Vec<u64>>());
}

#[tokio::test]
async fn reserved_ids_are_shared_across_owners() {
    let ctx = RequestContext::new();
    let contract = LocalContract::new(chaincode(StubOracle::default()));

    let a = submit_u64(&contract, &ctx, "ReserveDataID", &args(&["alice"])).await.unwrap();
    let b = submit_u64(&contract, &ctx, "ReserveDataID", &args(&["bob"])).await.unwrap();
    let m = submit_u64(&contract, &ctx, "ReserveModelID", &args(&["bob"])).await.unwrap();
    assert_eq!((a, b, m), (0, 1, 0));
}

#[tokio::test]
async fn validate_model_scores_owner_columns_locally() {
    let ctx = RequestContext::new();
    let cc = chaincode(StubOracle::default());

    cc.invoke(&ctx, "initModel", &args(&["0", "1", "1", "m1", "alice"])).await.unwrap();
    cc.invoke(&ctx, "initDataFile", &args(&["batch0", "carol", "0", "0,1", "0,1", "0,1"])).await.unwrap();
    cc.invoke(&ctx, "initDataFile", &args(&["batch1", "carol", "1", "2", "2", "1"])).await.unwrap();

    let summary: ValidationSummary =
        serde_json::from_slice(&cc.invoke(&ctx, "validateModel", &args(&["m1", "carol"])).await.unwrap()).unwrap();
    assert_eq!(summary.recorded, vec!["results0".to_string()]);

    let results = cc.all_results(&ctx).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].record.data_col_name, "batch0");
    assert_eq!(results[0].record.results.len(), 3);
    assert_eq!(results[0].record.results[0], 0.5);

    assert!(matches!(
        cc.invoke(&ctx, "validateModel", &args(&["m1", "nobody"])).await,
        Err(ChaincodeError::NotFound(_))
    ));
}

#[tokio::test]
async fn data_file_rejects_mismatched_columns() {
    let ctx = RequestContext::new();
    let cc = chaincode(StubOracle::default());
    let err = cc
        .invoke(&ctx, "initDataFile", &args(&["b", "o", "0", "1,2", "1", "0,1"]))
        .await
        .unwrap_err();
    assert!(matches!(err, ChaincodeError::Argument(_)));
}

#[tokio::test]
async fn validate_model_file_records_oracle_predictions() {
    let ctx = RequestContext::new();
    let oracle = StubOracle {
        predictions: HashMap::from([("dataCol0".to_string(), vec![0.2, 0.7, 0.9])]),
        ..Default::default()
    };
    let cc = chaincode(oracle);

    cc.init_model_file(&ctx, "Model0", ModelKind::LR, Library::AS, "alice", 0, "").unwrap();
    cc.init_flex_data(&ctx, "dataCol0", "alice", 0, "1,2,3", "0,1,1").unwrap();

    let k1 = cc.validate_model_file(&ctx, "Model0", "dataCol0").await.unwrap();
    let k2 = cc.validate_model_file(&ctx, "Model0", "dataCol0").await.unwrap();
    assert_eq!((k1.as_str(), k2.as_str()), ("results0", "results1"));

    let results: Vec<Keyed<ResultSet>> =
        serde_json::from_slice(&cc.invoke(&ctx, "GetAllResults", &[]).await.unwrap()).unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].record.model_name, "Model0");
    assert_eq!(results[0].record.results, vec![0.2, 0.7, 0.9]);
}

#[tokio::test]
async fn inserted_model_reports_every_failed_dataset() {
    let ctx = RequestContext::new();
    let oracle = StubOracle {
        predictions: HashMap::from([("dataCol1".to_string(), vec![0.4])]),
        failing: HashSet::from(["dataCol0".to_string(), "dataCol2".to_string()]),
        ..Default::default()
    };
    let cc = chaincode(oracle);

    for (i, name) in ["dataCol0", "dataCol1", "dataCol2"].iter().enumerate() {
        cc.init_flex_data(&ctx, name, "alice", i as u64, "1", "1").unwrap();
    }
    cc.init_model_file(&ctx, "Model0", ModelKind::DT, Library::AS, "alice", 0, "").unwrap();

    let err = cc.inserted_model_file(&ctx, "Model0").await.unwrap_err();
    let ChaincodeError::PartialValidation { recorded, failures } = err else {
        panic!("expected partial validation, got {err:?}");
    };
    assert_eq!(recorded, vec!["results0".to_string()]);
    let failed: Vec<_> = failures.iter().map(|f| f.counterpart.as_str()).collect();
    assert_eq!(failed, vec!["dataCol0", "dataCol2"]);

    // the successful item stays recorded
    assert_eq!(cc.all_results(&ctx).unwrap().len(), 1);
    assert_eq!(cc.oracle().calls.lock().unwrap().len(), 3);
}

#[tokio::test]
async fn inserted_data_validates_against_every_model() {
    let ctx = RequestContext::new();
    let oracle = StubOracle {
        predictions: HashMap::from([("dataCol0".to_string(), vec![0.1, 0.8])]),
        ..Default::default()
    };
    let cc = chaincode(oracle);

    cc.init_model_file(&ctx, "Model0", ModelKind::LR, Library::AS, "alice", 0, "").unwrap();
    cc.init_model_file(&ctx, "Model1", ModelKind::DT, Library::MLR3, "alice", 1, "").unwrap();
    cc.init_flex_data(&ctx, "dataCol0", "alice", 0, "3,4", "0,1").unwrap();

    let out = cc.invoke(&ctx, "insertedDataFile", &args(&["dataCol0"])).await.unwrap();
    let summary: ValidationSummary = serde_json::from_slice(&out).unwrap();
    assert_eq!(summary.recorded, vec!["results0".to_string(), "results1".to_string()]);

    let models: Vec<_> = cc.all_results(&ctx).unwrap().into_iter().map(|r| r.record.model_name).collect();
    assert_eq!(models, vec!["Model0", "Model1"]);
}

#[tokio::test]
async fn test_model_file_returns_flag_bytes() {
    let ctx = RequestContext::new();
    let ok = chaincode(StubOracle { valid: true, ..Default::default() });
    let bad = chaincode(StubOracle::default());
    let a = args(&["QUJD", "LR", "MLR3"]);

    assert_eq!(ok.invoke(&ctx, "testModelFile", &a).await.unwrap(), vec![0, 0, 0, 0, 0, 0, 0, 1]);
    assert_eq!(bad.invoke(&ctx, "testModelFile", &a).await.unwrap(), vec![0u8; 8]);
}

#[tokio::test]
async fn query_data_by_owner_filters() {
    let ctx = RequestContext::new();
    let contract = LocalContract::new(chaincode(StubOracle::default()));

    contract.submit(&ctx, "initFlexData", &args(&["dataCol0", "alice", "0", "1", "1"])).await.unwrap();
    contract.submit(&ctx, "initFlexData", &args(&["dataCol1", "bob", "0", "1", "0"])).await.unwrap();

    let rows: Vec<Keyed<Dataset>> = submit_json(&contract, &ctx, "queryDataByOwner", &args(&["bob"])).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].key, "dataCol1");
}

#[tokio::test]
async fn checkpoint_advances_with_writes() {
    let ctx = RequestContext::new();
    let contract = LocalContract::new(chaincode(StubOracle::default()));

    let before: ledger::Checkpoint = submit_json(&contract, &ctx, "GetCheckpoint", &[]).await.unwrap();
    contract.submit(&ctx, "initModel", &args(&["1", "2", "3", "m", "o"])).await.unwrap();
    let after: ledger::Checkpoint = submit_json(&contract, &ctx, "GetCheckpoint", &[]).await.unwrap();

    assert_eq!(before.height, 0);
    assert_eq!(after.height, 1);
    assert_ne!(before.latest_event_hash, after.latest_event_hash);
}

#[tokio::test]
async fn cancelled_request_is_refused() {
    let ctx = RequestContext::new();
    ctx.cancel.cancel();
    let contract = LocalContract::new(chaincode(StubOracle::default()));

    let err = contract.submit(&ctx, "GetAllModels", &[]).await.unwrap_err();
    assert!(matches!(err, ChaincodeError::Cancelled));
}

#[tokio::test]
async fn short_prediction_vector_is_not_recorded() {
    let ctx = RequestContext::new();
    let oracle = StubOracle {
        predictions: HashMap::from([("dataCol0".to_string(), vec![0.9])]),
        ..Default::default()
    };
    let cc = chaincode(oracle);

    cc.init_model_file(&ctx, "Model0", ModelKind::LR, Library::AS, "alice", 0, "").unwrap();
    cc.init_flex_data(&ctx, "dataCol0", "alice", 0, "1,2,3", "0,1,1").unwrap();

    let err = cc.validate_model_file(&ctx, "Model0", "dataCol0").await.unwrap_err();
    assert!(matches!(err, ChaincodeError::Serialization(msg) if msg.contains("1 predictions for 3 rows")));
    assert!(cc.all_results(&ctx).unwrap().is_empty());

    let err = cc.inserted_model_file(&ctx, "Model0").await.unwrap_err();
    let ChaincodeError::PartialValidation { recorded, failures } = err else {
        panic!("expected partial validation, got {err:?}");
    };
    assert!(recorded.is_empty());
    assert_eq!(failures[0].counterpart, "dataCol0");
}

#[tokio::test]
async fn ledger_stays_available_while_oracle_is_pending() {
    let gate = GatedOracle::default();
    let contract = LocalContract::new(Chaincode::new(Ledger::new(InMemoryStorage::new()), gate.clone()));
    let ctx = RequestContext::new();

    contract
        .submit(&ctx, "initModelFile", &args(&["Model0", "LR", "AS", "alice", "0", ""]))
        .await
        .unwrap();
    contract
        .submit(&ctx, "initFlexData", &args(&["dataCol0", "alice", "0", "1,2", "0,1"]))
        .await
        .unwrap();

    let c = contract.clone();
    let pending = tokio::spawn(async move {
        let a = args(&["Model0", "dataCol0"]);
        submit_json::<ValidationSummary>(&c, &RequestContext::new(), "validateModelFileAPI", &a).await
    });
    gate.entered.notified().await;

    let bounded = RequestContext::new().with_timeout(Duration::from_millis(500));
    let models: Vec<Keyed<ModelFile>> = submit_json(&contract, &bounded, "GetAllModels", &[]).await.unwrap();
    assert_eq!(models.len(), 1);
    let id = submit_u64(&contract, &bounded, "ReserveDataID", &args(&["bob"])).await.unwrap();
    assert_eq!(id, 0);
    assert!(!pending.is_finished());

    gate.release.notify_one();
    let summary = pending.await.unwrap().unwrap();
    assert_eq!(summary.recorded, vec!["results0".to_string()]);
}
