//! Typed calls into the contract's named operations.

use std::sync::Arc;

use chaincode::codec::{encode_matrix, join_labels};
use chaincode::{
    submit_json, submit_u64, Contract, Dataset, Keyed, Library, ModelFile, ModelKind, RequestContext, Result,
    ResultSet, ValidationSummary,
};
use ledger::Checkpoint;

use crate::csv_table::CsvTable;

#[derive(Clone)]
pub struct LedgerClient {
    contract: Arc<dyn Contract>,
}

impl LedgerClient {
    pub fn new(contract: Arc<dyn Contract>) -> Self {
        Self { contract }
    }

    pub async fn all_models(&self, ctx: &RequestContext) -> Result<Vec<Keyed<ModelFile>>> {
        submit_json(self.contract.as_ref(), ctx, "GetAllModels", &[]).await
    }

    pub async fn all_data(&self, ctx: &RequestContext) -> Result<Vec<Keyed<Dataset>>> {
        submit_json(self.contract.as_ref(), ctx, "GetAllData", &[]).await
    }

    pub async fn all_results(&self, ctx: &RequestContext) -> Result<Vec<Keyed<ResultSet>>> {
        submit_json(self.contract.as_ref(), ctx, "GetAllResults", &[]).await
    }

    pub async fn checkpoint(&self, ctx: &RequestContext) -> Result<Checkpoint> {
        submit_json(self.contract.as_ref(), ctx, "GetCheckpoint", &[]).await
    }

    pub async fn reserve_model_id(&self, ctx: &RequestContext, owner: &str) -> Result<u64> {
        submit_u64(self.contract.as_ref(), ctx, "ReserveModelID", &[owner.to_string()]).await
    }

    pub async fn reserve_data_id(&self, ctx: &RequestContext, owner: &str) -> Result<u64> {
        submit_u64(self.contract.as_ref(), ctx, "ReserveDataID", &[owner.to_string()]).await
    }

    pub async fn test_model_file(
        &self,
        ctx: &RequestContext,
        payload: &str,
        kind: ModelKind,
        library: Library,
    ) -> Result<bool> {
        let args = [payload.to_string(), kind.to_string(), library.to_string()];
        let flag = submit_u64(self.contract.as_ref(), ctx, "testModelFile", &args).await?;
        Ok(flag != 0)
    }

    pub async fn init_model_file(&self, ctx: &RequestContext, model: &ModelFile) -> Result<()> {
        let args = [
            model.name.clone(),
            model.model_type.clone(),
            model.library_type.clone(),
            model.owner.clone(),
            model.id.to_string(),
            model.file.clone(),
        ];
        self.contract.submit(ctx, "initModelFile", &args).await?;
        Ok(())
    }

    pub async fn init_flex_data(
        &self,
        ctx: &RequestContext,
        name: &str,
        owner: &str,
        id: u64,
        table: &CsvTable,
    ) -> Result<()> {
        let args = [
            name.to_string(),
            owner.to_string(),
            id.to_string(),
            encode_matrix(&table.columns),
            join_labels(&table.class),
        ];
        self.contract.submit(ctx, "initFlexData", &args).await?;
        Ok(())
    }

    pub async fn inserted_model_file(&self, ctx: &RequestContext, model: &str) -> Result<ValidationSummary> {
        submit_json(self.contract.as_ref(), ctx, "insertedModelFile", &[model.to_string()]).await
    }

    pub async fn inserted_data_file(&self, ctx: &RequestContext, dataset: &str) -> Result<ValidationSummary> {
        submit_json(self.contract.as_ref(), ctx, "insertedDataFile", &[dataset.to_string()]).await
    }

    pub async fn validate(&self, ctx: &RequestContext, model: &str, dataset: &str) -> Result<ValidationSummary> {
        let args = [model.to_string(), dataset.to_string()];
        submit_json(self.contract.as_ref(), ctx, "validateModelFileAPI", &args).await
    }
}
