//! Header-less CSV uploads. Every row is one observation; the last cell of
//! a row is its class label, the cells before it are features.

use chaincode::codec::ROW_SEPARATOR;
use chaincode::{ChaincodeError, Result};

#[derive(Clone, Debug, PartialEq)]
pub struct CsvTable {
    /// Column-major features: `columns[f][row]`.
    pub columns: Vec<Vec<String>>,
    pub class: Vec<String>,
}

impl CsvTable {
    pub fn parse(text: &str) -> Result<Self> {
        let rows: Vec<Vec<String>> = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| line.split(',').map(clean_cell).collect())
            .collect();

        let Some(width) = rows.first().map(Vec::len) else {
            return Err(ChaincodeError::Argument("dataset file has no rows".into()));
        };
        if width < 2 {
            return Err(ChaincodeError::Argument(
                "dataset rows need at least one feature and a class".into(),
            ));
        }

        let mut columns = vec![Vec::with_capacity(rows.len()); width - 1];
        let mut class = Vec::with_capacity(rows.len());
        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != width {
                return Err(ChaincodeError::Argument(format!(
                    "row {i} has {} cells, expected {width}",
                    row.len()
                )));
            }
            if let Some(cell) = row.iter().find(|c| c.contains(ROW_SEPARATOR)) {
                return Err(ChaincodeError::Argument(format!("row {i}: cell {cell:?} contains {ROW_SEPARATOR:?}")));
            }
            let mut cells = row.into_iter();
            for col in columns.iter_mut() {
                col.extend(cells.next());
            }
            class.extend(cells.next());
        }

        Ok(Self { columns, class })
    }

    pub fn rows(&self) -> usize {
        self.class.len()
    }
}

fn clean_cell(raw: &str) -> String {
    let cell = raw.trim();
    cell.strip_prefix('"')
        .and_then(|c| c.strip_suffix('"'))
        .unwrap_or(cell)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transposes_and_splits_off_class() {
        let t = CsvTable::parse("1.5,2,0\n3,4.25,1\r\n5,6,1\n").unwrap();
        assert_eq!(
            t.columns,
            vec![
                vec!["1.5".to_string(), "3".into(), "5".into()],
                vec!["2".to_string(), "4.25".into(), "6".into()],
            ]
        );
        assert_eq!(t.class, vec!["0", "1", "1"]);
        assert_eq!(t.rows(), 3);
    }

    #[test]
    fn blank_lines_and_quotes_are_tolerated() {
        let t = CsvTable::parse("\n\"a\", 1 ,0\n\nb,2,1\n").unwrap();
        assert_eq!(t.columns[0], vec!["a", "b"]);
        assert_eq!(t.columns[1], vec!["1", "2"]);
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let err = CsvTable::parse("1,2,0\n3,1\n").unwrap_err();
        assert!(err.to_string().contains("row 1 has 2 cells"));
    }

    #[test]
    fn empty_and_label_only_files_are_rejected() {
        assert!(CsvTable::parse("").is_err());
        assert!(CsvTable::parse("\n \n").is_err());
        assert!(CsvTable::parse("1\n0\n").is_err());
    }

    #[test]
    fn row_separator_inside_cell_is_rejected() {
        assert!(CsvTable::parse("a>b,1\n").is_err());
    }
}
