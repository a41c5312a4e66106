//! Ledger operations and the named-function dispatch surface.

use std::sync::{Mutex, MutexGuard};

use ledger::{Checkpoint, Ledger, LedgerError, Storage};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::codec::{decode_matrix, encode_u64, split_labels};
use crate::facade::{selector_for, StateFacade};
use crate::logistic::score_dataset;
use crate::oracle::ScoringOracle;
use crate::{
    ChaincodeError, Dataset, ItemFailure, Keyed, Library, ModelFile, ModelKind, ParamModel, RequestContext, Result,
    ResultSet, DATASET_TYPE, MODEL_FILE_TYPE, RESULT_TYPE,
};

/// Counter naming the `results{n}` keys.
const RESULT_SEQUENCE: &str = "results";
const MODEL_ID_SEQUENCE: &str = "modelId";
const DATA_ID_SEQUENCE: &str = "dataId";

/// Keys of the result sets written by one validation call.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationSummary {
    pub recorded: Vec<String>,
}

/// Ledger state sits behind its own lock, taken once per read or write
/// and never held across an oracle call.
pub struct Chaincode<S: Storage, O: ScoringOracle> {
    state: Mutex<StateFacade<S>>,
    oracle: O,
}

impl<S: Storage, O: ScoringOracle> Chaincode<S, O> {
    pub fn new(ledger: Ledger<S>, oracle: O) -> Self {
        Self {
            state: Mutex::new(StateFacade::new(ledger)),
            oracle,
        }
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    fn state(&self) -> Result<MutexGuard<'_, StateFacade<S>>> {
        self.state
            .lock()
            .map_err(|_| ChaincodeError::from(LedgerError::Storage("ledger lock poisoned".into())))
    }

    fn get_record<T: DeserializeOwned>(&self, ctx: &RequestContext, key: &str) -> Result<T> {
        self.state()?.get_record(ctx, key)
    }

    // ---- record creation ----

    pub fn init_model(&self, ctx: &RequestContext, parameters: [f64; 3], name: &str, owner: &str) -> Result<()> {
        self.state()?
            .insert_record(ctx, name, &ParamModel::new(name, parameters, owner))
    }

    pub fn init_model_file(
        &self,
        ctx: &RequestContext,
        name: &str,
        kind: ModelKind,
        library: Library,
        owner: &str,
        id: u64,
        payload: &str,
    ) -> Result<()> {
        let record = ModelFile::new(name, kind, library, owner, id, payload);
        self.state()?.insert_record(ctx, name, &record)?;
        info!(request_id = %ctx.request_id, model = name, %kind, %library, "model stored");
        Ok(())
    }

    pub fn init_data_file(
        &self,
        ctx: &RequestContext,
        name: &str,
        owner: &str,
        id: u64,
        x_csv: &str,
        y_csv: &str,
        label_csv: &str,
    ) -> Result<()> {
        let (xs, ys, class) = (split_labels(x_csv), split_labels(y_csv), split_labels(label_csv));
        if xs.len() != class.len() || ys.len() != class.len() {
            return Err(ChaincodeError::Argument(format!(
                "dataset {name}: {} labels but {}/{} x/y values",
                class.len(),
                xs.len(),
                ys.len()
            )));
        }
        self.state()?
            .insert_record(ctx, name, &Dataset::two_column(name, owner, id, xs, ys, class))
    }

    pub fn init_flex_data(
        &self,
        ctx: &RequestContext,
        name: &str,
        owner: &str,
        id: u64,
        encoded: &str,
        label_csv: &str,
    ) -> Result<()> {
        let table = decode_matrix(encoded);
        let class = split_labels(label_csv);
        if let Some((i, col)) = table.iter().enumerate().find(|(_, c)| c.len() != class.len()) {
            return Err(ChaincodeError::Argument(format!(
                "dataset {name}: column {i} has {} values but there are {} labels",
                col.len(),
                class.len()
            )));
        }
        let rows = class.len();
        self.state()?
            .insert_record(ctx, name, &Dataset::flexible(name, owner, id, table, class))?;
        info!(request_id = %ctx.request_id, dataset = name, rows, "dataset stored");
        Ok(())
    }

    // ---- reads ----

    pub fn read_model(&self, ctx: &RequestContext, name: &str) -> Result<Vec<u8>> {
        self.state()?.get_bytes(ctx, name)
    }

    /// Count of the owner's model files. Two callers that read this
    /// before either writes get the same value.
    pub fn model_id(&self, ctx: &RequestContext, owner: &str) -> Result<u64> {
        self.state()?.count(ctx, &selector_for(MODEL_FILE_TYPE, Some(owner)))
    }

    /// Count of the owner's datasets, with the same race as [`Self::model_id`].
    pub fn data_id(&self, ctx: &RequestContext, owner: &str) -> Result<u64> {
        self.state()?.count(ctx, &selector_for(DATASET_TYPE, Some(owner)))
    }

    /// Model id from the ledger's atomic counter; never issued twice, for
    /// any owner, since `Model{id}` names share one namespace.
    pub fn reserve_model_id(&self, ctx: &RequestContext, owner: &str) -> Result<u64> {
        let id = self.state()?.next_sequence(ctx, MODEL_ID_SEQUENCE)?;
        debug!(request_id = %ctx.request_id, owner, id, "model id reserved");
        Ok(id)
    }

    pub fn reserve_data_id(&self, ctx: &RequestContext, owner: &str) -> Result<u64> {
        let id = self.state()?.next_sequence(ctx, DATA_ID_SEQUENCE)?;
        debug!(request_id = %ctx.request_id, owner, id, "data id reserved");
        Ok(id)
    }

    pub fn all_models(&self, ctx: &RequestContext) -> Result<Vec<Keyed<ModelFile>>> {
        self.state()?.query(ctx, &selector_for(MODEL_FILE_TYPE, None))
    }

    pub fn all_data(&self, ctx: &RequestContext) -> Result<Vec<Keyed<Dataset>>> {
        self.state()?.query(ctx, &selector_for(DATASET_TYPE, None))
    }

    pub fn all_results(&self, ctx: &RequestContext) -> Result<Vec<Keyed<ResultSet>>> {
        self.state()?.query(ctx, &selector_for(RESULT_TYPE, None))
    }

    pub fn data_by_owner(&self, ctx: &RequestContext, owner: &str) -> Result<Vec<Keyed<Dataset>>> {
        self.state()?.query(ctx, &selector_for(DATASET_TYPE, Some(owner)))
    }

    pub fn checkpoint(&self, ctx: &RequestContext) -> Result<Checkpoint> {
        self.state()?.checkpoint(ctx)
    }

    // ---- validation ----

    /// Stores predictions under a fresh `results{n}` key.
    pub fn record_result(&self, ctx: &RequestContext, model: &str, dataset: &str, predictions: Vec<f64>) -> Result<String> {
        let key = {
            let mut state = self.state()?;
            let n = state.next_sequence(ctx, RESULT_SEQUENCE)?;
            let key = format!("results{n}");
            state.insert_record(ctx, &key, &ResultSet::new(model, dataset, predictions))?;
            key
        };
        info!(request_id = %ctx.request_id, %key, model, dataset, "result recorded");
        Ok(key)
    }

    /// Scores a parameter model against every two-column dataset of
    /// `data_owner`, recorded as one result set named after the first.
    pub fn validate_model(&self, ctx: &RequestContext, model_name: &str, data_owner: &str) -> Result<String> {
        let model: ParamModel = self.get_record(ctx, model_name)?;
        let datasets = self.data_by_owner(ctx, data_owner)?;
        let Some(first) = datasets.first() else {
            return Err(ChaincodeError::NotFound(format!("datasets of owner {data_owner}")));
        };
        let data_name = first.record.data_name.clone();

        let mut predictions = Vec::new();
        for ds in &datasets {
            predictions.extend(score_dataset(&model, &ds.record)?);
        }
        self.record_result(ctx, model_name, &data_name, predictions)
    }

    /// Oracle-scores one stored model against one stored dataset.
    pub async fn validate_model_file(&self, ctx: &RequestContext, model_name: &str, dataset_key: &str) -> Result<String> {
        let model: ModelFile = self.get_record(ctx, model_name)?;
        let dataset: Dataset = self.get_record(ctx, dataset_key)?;
        self.score_and_record(ctx, &model, &dataset).await
    }

    /// Validates a newly stored model against every dataset.
    pub async fn inserted_model_file(&self, ctx: &RequestContext, model_name: &str) -> Result<ValidationSummary> {
        let model: ModelFile = self.get_record(ctx, model_name)?;
        let datasets = self.all_data(ctx)?;
        info!(request_id = %ctx.request_id, model = model_name, datasets = datasets.len(), "validating new model");

        let mut outcome = Outcome::default();
        for ds in datasets {
            let res = self.score_and_record(ctx, &model, &ds.record).await;
            if !outcome.push(ctx, &ds.key, res) {
                break;
            }
        }
        outcome.finish()
    }

    /// Validates a newly stored dataset against every model file.
    pub async fn inserted_data_file(&self, ctx: &RequestContext, data_name: &str) -> Result<ValidationSummary> {
        let dataset: Dataset = self.get_record(ctx, data_name)?;
        let models = self.all_models(ctx)?;
        info!(request_id = %ctx.request_id, dataset = data_name, models = models.len(), "validating new dataset");

        let mut outcome = Outcome::default();
        for m in models {
            let res = self.score_and_record(ctx, &m.record, &dataset).await;
            if !outcome.push(ctx, &m.key, res) {
                break;
            }
        }
        outcome.finish()
    }

    /// Asks the oracle whether an uploaded artifact is usable.
    pub async fn test_model_file(&self, ctx: &RequestContext, payload: &str, kind: ModelKind, library: Library) -> Result<bool> {
        ctx.check()?;
        let probe = ModelFile::probe(payload, kind, library);
        self.oracle.test_model(ctx, &probe).await
    }

    /// Predictions are stored only when there is exactly one per dataset row.
    async fn score_and_record(&self, ctx: &RequestContext, model: &ModelFile, dataset: &Dataset) -> Result<String> {
        let predictions = self.oracle.validate(ctx, model, dataset).await?;
        if predictions.len() != dataset.rows() {
            return Err(ChaincodeError::Serialization(format!(
                "oracle returned {} predictions for {} rows of {}",
                predictions.len(),
                dataset.rows(),
                dataset.data_name
            )));
        }
        self.record_result(ctx, &model.name, &dataset.data_name, predictions)
    }

    // ---- dispatch ----

    /// Runs the named operation with positional string arguments.
    pub async fn invoke(&self, ctx: &RequestContext, function: &str, args: &[String]) -> Result<Vec<u8>> {
        info!(request_id = %ctx.request_id, function, args = args.len(), "invoke");

        match function {
            "initModel" => {
                let [p0, p1, p2, name, owner] = take_args::<5>(function, args)?;
                let params = [parse_f64(p0)?, parse_f64(p1)?, parse_f64(p2)?];
                self.init_model(ctx, params, name, owner)?;
                Ok(Vec::new())
            }
            "initModelFile" => {
                let [name, kind, library, owner, id, payload] = take_args::<6>(function, args)?;
                self.init_model_file(ctx, name, kind.parse()?, library.parse()?, owner, parse_u64(id)?, payload)?;
                Ok(Vec::new())
            }
            "initDataFile" => {
                let [name, owner, id, x, y, labels] = take_args::<6>(function, args)?;
                self.init_data_file(ctx, name, owner, parse_u64(id)?, x, y, labels)?;
                Ok(Vec::new())
            }
            "initFlexData" => {
                let [name, owner, id, matrix, labels] = take_args::<5>(function, args)?;
                self.init_flex_data(ctx, name, owner, parse_u64(id)?, matrix, labels)?;
                Ok(Vec::new())
            }
            "readModel" => {
                let [name] = take_args::<1>(function, args)?;
                self.read_model(ctx, name)
            }
            "GetModelID" => {
                let [owner] = take_args::<1>(function, args)?;
                Ok(encode_u64(self.model_id(ctx, owner)?))
            }
            "GetDataID" => {
                let [owner] = take_args::<1>(function, args)?;
                Ok(encode_u64(self.data_id(ctx, owner)?))
            }
            "ReserveModelID" => {
                let [owner] = take_args::<1>(function, args)?;
                Ok(encode_u64(self.reserve_model_id(ctx, owner)?))
            }
            "ReserveDataID" => {
                let [owner] = take_args::<1>(function, args)?;
                Ok(encode_u64(self.reserve_data_id(ctx, owner)?))
            }
            "GetAllModels" => {
                take_args::<0>(function, args)?;
                Ok(serde_json::to_vec(&self.all_models(ctx)?)?)
            }
            "GetAllData" => {
                take_args::<0>(function, args)?;
                Ok(serde_json::to_vec(&self.all_data(ctx)?)?)
            }
            "GetAllResults" => {
                take_args::<0>(function, args)?;
                Ok(serde_json::to_vec(&self.all_results(ctx)?)?)
            }
            "queryDataByOwner" => {
                let [owner] = take_args::<1>(function, args)?;
                Ok(serde_json::to_vec(&self.data_by_owner(ctx, owner)?)?)
            }
            "GetCheckpoint" => {
                take_args::<0>(function, args)?;
                Ok(serde_json::to_vec(&self.checkpoint(ctx)?)?)
            }
            "validateModel" => {
                let [model, owner] = take_args::<2>(function, args)?;
                let key = self.validate_model(ctx, model, owner)?;
                Ok(serde_json::to_vec(&ValidationSummary { recorded: vec![key] })?)
            }
            "validateModelFileAPI" => {
                let [model, dataset] = take_args::<2>(function, args)?;
                let key = self.validate_model_file(ctx, model, dataset).await?;
                Ok(serde_json::to_vec(&ValidationSummary { recorded: vec![key] })?)
            }
            "insertedModelFile" => {
                let [model] = take_args::<1>(function, args)?;
                Ok(serde_json::to_vec(&self.inserted_model_file(ctx, model).await?)?)
            }
            "insertedDataFile" => {
                let [dataset] = take_args::<1>(function, args)?;
                Ok(serde_json::to_vec(&self.inserted_data_file(ctx, dataset).await?)?)
            }
            "testModelFile" => {
                let [payload, kind, library] = take_args::<3>(function, args)?;
                let valid = self.test_model_file(ctx, payload, kind.parse()?, library.parse()?).await?;
                Ok(encode_u64(u64::from(valid)))
            }
            other => {
                warn!(request_id = %ctx.request_id, function = other, "unknown function");
                Err(ChaincodeError::UnknownFunction(other.to_string()))
            }
        }
    }
}

/// Per-counterpart results of a multi-item validation.
#[derive(Default)]
struct Outcome {
    recorded: Vec<String>,
    failures: Vec<ItemFailure>,
}

impl Outcome {
    /// Returns false once the request itself has been interrupted.
    fn push(&mut self, ctx: &RequestContext, counterpart: &str, res: Result<String>) -> bool {
        match res {
            Ok(key) => {
                self.recorded.push(key);
                true
            }
            Err(e) => {
                warn!(request_id = %ctx.request_id, counterpart, error = %e, "validation item failed");
                let interrupted = e.is_interrupt();
                self.failures.push(ItemFailure {
                    counterpart: counterpart.to_string(),
                    error: e.to_string(),
                });
                !interrupted
            }
        }
    }

    fn finish(self) -> Result<ValidationSummary> {
        if self.failures.is_empty() {
            Ok(ValidationSummary { recorded: self.recorded })
        } else {
            Err(ChaincodeError::PartialValidation {
                recorded: self.recorded,
                failures: self.failures,
            })
        }
    }
}

fn take_args<'a, const N: usize>(function: &str, args: &'a [String]) -> Result<[&'a str; N]> {
    if args.len() != N {
        return Err(ChaincodeError::Argument(format!(
            "{function} expects {N} arguments, got {}",
            args.len()
        )));
    }
    Ok(std::array::from_fn(|i| args[i].as_str()))
}

fn parse_f64(raw: &str) -> Result<f64> {
    raw.trim()
        .parse()
        .map_err(|_| ChaincodeError::Argument(format!("not a number: {raw:?}")))
}

fn parse_u64(raw: &str) -> Result<u64> {
    raw.trim()
        .parse()
        .map_err(|_| ChaincodeError::Argument(format!("not an id: {raw:?}")))
}
