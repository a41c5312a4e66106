//! In-ledger scoring of parameter models over two-column datasets.

use crate::{ChaincodeError, Dataset, ParamModel, Result};

pub fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

/// `sigmoid(p0 + x*p1 + y*p2)`; cells that do not parse count as 0.
pub fn score_point(parameters: &[f64; 3], x: &str, y: &str) -> f64 {
    let x: f64 = x.trim().parse().unwrap_or(0.0);
    let y: f64 = y.trim().parse().unwrap_or(0.0);
    sigmoid(parameters[0] + x * parameters[1] + y * parameters[2])
}

/// One prediction per label row of a two-column dataset.
pub fn score_dataset(model: &ParamModel, dataset: &Dataset) -> Result<Vec<f64>> {
    let parameters: [f64; 3] = model.parameters.as_slice().try_into().map_err(|_| {
        ChaincodeError::Argument(format!(
            "model {} has {} parameters, expected 3",
            model.name,
            model.parameters.len()
        ))
    })?;

    let (Some(xs), Some(ys)) = (&dataset.x_data, &dataset.y_data) else {
        return Err(ChaincodeError::Argument(format!(
            "dataset {} has no xData/yData columns",
            dataset.data_name
        )));
    };

    let rows = dataset.rows();
    if xs.len() < rows || ys.len() < rows {
        return Err(ChaincodeError::Argument(format!(
            "dataset {} has {} labels but {}/{} x/y values",
            dataset.data_name,
            rows,
            xs.len(),
            ys.len()
        )));
    }

    Ok(xs
        .iter()
        .zip(ys)
        .take(rows)
        .map(|(x, y)| score_point(&parameters, x, y))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strs(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn zero_model_scores_one_half() {
        assert_eq!(score_point(&[0.0, 0.0, 0.0], "3", "-2"), 0.5);
    }

    #[test]
    fn scores_every_labelled_row() {
        let model = ParamModel::new("m", [0.0, 1.0, -1.0], "o");
        let ds = Dataset::two_column("b", "o", 0, strs(&["1", "0"]), strs(&["0", "1"]), strs(&["1", "0"]));

        let out = score_dataset(&model, &ds).unwrap();
        assert_eq!(out.len(), 2);
        assert!((out[0] - sigmoid(1.0)).abs() < 1e-12);
        assert!((out[1] - sigmoid(-1.0)).abs() < 1e-12);
    }

    #[test]
    fn flexible_dataset_is_rejected() {
        let model = ParamModel::new("m", [0.0, 1.0, 1.0], "o");
        let ds = Dataset::flexible("d", "o", 0, vec![strs(&["1"])], strs(&["1"]));
        assert!(matches!(score_dataset(&model, &ds), Err(ChaincodeError::Argument(_))));
    }
}
