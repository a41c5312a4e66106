use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ChaincodeError;

/// `ObjectType` discriminators of the flat ledger namespace.
pub const PARAM_MODEL_TYPE: &str = "model";
pub const MODEL_FILE_TYPE: &str = "modelFile";
pub const DATASET_TYPE: &str = "dataColumns";
pub const RESULT_TYPE: &str = "results";
pub const TEST_MODEL_TYPE: &str = "testModel";

/// Logistic model held directly on the ledger as three parameters
/// (intercept, x weight, y weight).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ParamModel {
    pub object_type: String,
    pub name: String,
    pub parameters: Vec<f64>,
    pub owner: String,
}

impl ParamModel {
    pub fn new(name: impl Into<String>, parameters: [f64; 3], owner: impl Into<String>) -> Self {
        Self {
            object_type: PARAM_MODEL_TYPE.to_string(),
            name: name.into(),
            parameters: parameters.to_vec(),
            owner: owner.into(),
        }
    }
}

/// Serialized model artifact scored by an external oracle.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ModelFile {
    pub object_type: String,
    pub name: String,
    /// URL-safe base64 of the uploaded artifact.
    pub file: String,
    pub owner: String,
    pub model_type: String,
    pub library_type: String,
    #[serde(rename = "ID")]
    pub id: u64,
    // display annotations, filled by the reporting layer only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logloss: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<String>,
}

impl ModelFile {
    pub fn new(
        name: impl Into<String>,
        kind: ModelKind,
        library: Library,
        owner: impl Into<String>,
        id: u64,
        file: impl Into<String>,
    ) -> Self {
        Self {
            object_type: MODEL_FILE_TYPE.to_string(),
            name: name.into(),
            file: file.into(),
            owner: owner.into(),
            model_type: kind.to_string(),
            library_type: library.to_string(),
            id,
            logloss: None,
            accuracy: None,
        }
    }

    /// Throwaway record sent to an oracle's test endpoint; never stored.
    pub fn probe(file: impl Into<String>, kind: ModelKind, library: Library) -> Self {
        Self {
            object_type: TEST_MODEL_TYPE.to_string(),
            name: "test".to_string(),
            file: file.into(),
            owner: "none".to_string(),
            model_type: kind.to_string(),
            library_type: library.to_string(),
            id: 0,
            logloss: None,
            accuracy: None,
        }
    }

    pub fn kind(&self) -> Result<ModelKind, ChaincodeError> {
        self.model_type.parse()
    }

    pub fn library(&self) -> Result<Library, ChaincodeError> {
        self.library_type.parse()
    }
}

/// Labelled observations. Flexible datasets carry `DataTable`, a
/// column-major matrix (each inner vector is one feature across all
/// observations); two-column datasets carry `xData`/`yData` instead.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(rename = "ObjectType")]
    pub object_type: String,
    #[serde(rename = "DataTable", default, skip_serializing_if = "Option::is_none")]
    pub table: Option<Vec<Vec<String>>>,
    #[serde(rename = "xData", default, skip_serializing_if = "Option::is_none")]
    pub x_data: Option<Vec<String>>,
    #[serde(rename = "yData", default, skip_serializing_if = "Option::is_none")]
    pub y_data: Option<Vec<String>>,
    #[serde(rename = "Class", default)]
    pub class: Vec<String>,
    #[serde(rename = "Owner")]
    pub owner: String,
    #[serde(rename = "DataName")]
    pub data_name: String,
    #[serde(rename = "Id")]
    pub id: u64,
}

impl Dataset {
    pub fn flexible(
        name: impl Into<String>,
        owner: impl Into<String>,
        id: u64,
        table: Vec<Vec<String>>,
        class: Vec<String>,
    ) -> Self {
        Self {
            object_type: DATASET_TYPE.to_string(),
            table: Some(table),
            x_data: None,
            y_data: None,
            class,
            owner: owner.into(),
            data_name: name.into(),
            id,
        }
    }

    pub fn two_column(
        name: impl Into<String>,
        owner: impl Into<String>,
        id: u64,
        x_data: Vec<String>,
        y_data: Vec<String>,
        class: Vec<String>,
    ) -> Self {
        Self {
            object_type: DATASET_TYPE.to_string(),
            table: None,
            x_data: Some(x_data),
            y_data: Some(y_data),
            class,
            owner: owner.into(),
            data_name: name.into(),
            id,
        }
    }

    /// Number of observations, as given by the label vector.
    pub fn rows(&self) -> usize {
        self.class.len()
    }
}

/// Predictions of one model over one dataset, in dataset row order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResultSet {
    #[serde(rename = "ObjectType")]
    pub object_type: String,
    #[serde(rename = "Results", default)]
    pub results: Vec<f64>,
    #[serde(rename = "ModelName")]
    pub model_name: String,
    #[serde(rename = "DataColName")]
    pub data_col_name: String,
}

impl ResultSet {
    pub fn new(model_name: impl Into<String>, data_col_name: impl Into<String>, results: Vec<f64>) -> Self {
        Self {
            object_type: RESULT_TYPE.to_string(),
            results,
            model_name: model_name.into(),
            data_col_name: data_col_name.into(),
        }
    }
}

/// Query row: the ledger key next to the decoded record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Keyed<T> {
    #[serde(rename = "Key")]
    pub key: String,
    #[serde(rename = "Record")]
    pub record: T,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelKind {
    /// Logistic regression
    LR,
    /// Decision tree
    DT,
}

impl ModelKind {
    pub fn display_name(self) -> &'static str {
        match self {
            ModelKind::LR => "Logistic regression",
            ModelKind::DT => "Decision tree",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ModelKind::LR => "LR",
            ModelKind::DT => "DT",
        })
    }
}

impl FromStr for ModelKind {
    type Err = ChaincodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LR" => Ok(ModelKind::LR),
            "DT" => Ok(ModelKind::DT),
            other => Err(ChaincodeError::Configuration(format!("unknown model kind {other:?}"))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Library {
    /// Apache Spark scoring service
    AS,
    MLR3,
}

impl Library {
    pub fn display_name(self) -> &'static str {
        match self {
            Library::AS => "PySpark",
            Library::MLR3 => "mlr3",
        }
    }
}

impl fmt::Display for Library {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Library::AS => "AS",
            Library::MLR3 => "MLR3",
        })
    }
}

impl FromStr for Library {
    type Err = ChaincodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AS" => Ok(Library::AS),
            "MLR3" => Ok(Library::MLR3),
            other => Err(ChaincodeError::Configuration(format!("unknown library {other:?}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_file_uses_ledger_field_names() {
        let m = ModelFile::new("Model0", ModelKind::LR, Library::AS, "alice", 0, "AAAA");
        let v = serde_json::to_value(&m).unwrap();
        assert_eq!(v["ObjectType"], "modelFile");
        assert_eq!(v["ModelType"], "LR");
        assert_eq!(v["LibraryType"], "AS");
        assert_eq!(v["ID"], 0);
        assert!(v.get("Logloss").is_none());
    }

    #[test]
    fn dataset_forms_share_one_type() {
        let flex: Dataset = serde_json::from_str(
            r#"{"ObjectType":"dataColumns","DataTable":[["1","2"]],"Class":["0","1"],"Owner":"o","DataName":"dataCol0","Id":0}"#,
        )
        .unwrap();
        assert_eq!(flex.rows(), 2);
        assert!(flex.x_data.is_none());

        let cols: Dataset = serde_json::from_str(
            r#"{"ObjectType":"dataColumns","xData":["1"],"yData":["2"],"Class":["1"],"Owner":"o","DataName":"b","Id":3}"#,
        )
        .unwrap();
        assert!(cols.table.is_none());
        assert_eq!(cols.x_data.as_deref(), Some(&["1".to_string()][..]));
    }

    #[test]
    fn unknown_tags_are_configuration_errors() {
        assert!(matches!("RF".parse::<ModelKind>(), Err(ChaincodeError::Configuration(_))));
        assert!(matches!("sklearn".parse::<Library>(), Err(ChaincodeError::Configuration(_))));
        assert_eq!("MLR3".parse::<Library>().unwrap(), Library::MLR3);
    }
}
