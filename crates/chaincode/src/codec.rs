//! Flat string encoding of matrices and label vectors.
//!
//! Rows are joined with `>` and cells with `,`, no trailing separator.
//! Decoding does not check that rows have equal length.

pub const ROW_SEPARATOR: char = '>';
pub const CELL_SEPARATOR: char = ',';

pub fn encode_matrix(matrix: &[Vec<String>]) -> String {
    matrix
        .iter()
        .map(|row| row.join(&CELL_SEPARATOR.to_string()))
        .collect::<Vec<_>>()
        .join(&ROW_SEPARATOR.to_string())
}

/// An empty string decodes to one row holding one empty cell, so `[]` and
/// `[[]]` both encode to `""` and neither comes back unchanged.
pub fn decode_matrix(encoded: &str) -> Vec<Vec<String>> {
    encoded
        .split(ROW_SEPARATOR)
        .map(|row| row.split(CELL_SEPARATOR).map(str::to_string).collect())
        .collect()
}

pub fn split_labels(csv: &str) -> Vec<String> {
    csv.split(CELL_SEPARATOR).map(str::to_string).collect()
}

pub fn join_labels(labels: &[String]) -> String {
    labels.join(&CELL_SEPARATOR.to_string())
}

/// Numeric view of class labels; anything unparseable counts as 0.0.
pub fn labels_to_f64(labels: &[String]) -> Vec<f64> {
    labels.iter().map(|l| l.trim().parse().unwrap_or(0.0)).collect()
}

/// IDs and flags travel as 8-byte big-endian integers.
pub fn encode_u64(value: u64) -> Vec<u8> {
    value.to_be_bytes().to_vec()
}

pub fn decode_u64(bytes: &[u8]) -> Option<u64> {
    let raw: [u8; 8] = bytes.get(..8)?.try_into().ok()?;
    Some(u64::from_be_bytes(raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter().map(|r| r.iter().map(|c| c.to_string()).collect()).collect()
    }

    #[test]
    fn encode_omits_trailing_separators() {
        assert_eq!(encode_matrix(&m(&[&["1", "2"], &["3", "4"]])), "1,2>3,4");
    }

    #[test]
    fn empty_trailing_row_survives() {
        let matrix = m(&[&["a"], &[""]]);
        assert_eq!(encode_matrix(&matrix), "a>");
        assert_eq!(decode_matrix("a>"), matrix);
    }

    #[test]
    fn empty_matrices_do_not_round_trip() {
        assert_eq!(encode_matrix(&[]), "");
        assert_eq!(encode_matrix(&[Vec::new()]), "");
        assert_eq!(decode_matrix(""), m(&[&[""]]));
    }

    #[test]
    fn ragged_input_is_not_rejected() {
        assert_eq!(decode_matrix("1,2>3"), m(&[&["1", "2"], &["3"]]));
    }

    #[test]
    fn labels_parse_leniently() {
        let labels = split_labels("0,1,yes, 1");
        assert_eq!(labels_to_f64(&labels), vec![0.0, 1.0, 0.0, 1.0]);
        assert_eq!(join_labels(&labels), "0,1,yes, 1");
    }

    #[test]
    fn u64_wire_form() {
        assert_eq!(encode_u64(1), vec![0, 0, 0, 0, 0, 0, 0, 1]);
        assert_eq!(decode_u64(&encode_u64(42)), Some(42));
        assert_eq!(decode_u64(&[0, 1]), None);
    }
}
