/*!
The numeric matrix type shared by sensors, controllers and jump conditions,
and its textual encoding for description-tree attributes.
*/

use crate::errors::AutomatonError;

/// Dense matrix of doubles, as required throughout the data model (goals,
/// gains, sensor readings, rotations).
pub type Matrix = nalgebra::DMatrix<f64>;

/// Builds a column vector from a slice.
pub fn vector(values: &[f64]) -> Matrix {
    Matrix::from_column_slice(values.len(), 1, values)
}

/// Formats a matrix as `[rows,cols]r0c0,r0c1;r1c0,r1c1;...`.
///
/// Rust's `f64` `Display` impl produces the shortest decimal string that
/// round-trips back to the exact same bit pattern, so no manual precision
/// bookkeeping is needed to satisfy the encoding's round-trip requirement.
pub fn format_matrix(m: &Matrix) -> String {
    let mut out = format!("[{},{}]", m.nrows(), m.ncols());
    for row in 0..m.nrows() {
        if row > 0 {
            out.push(';');
        }
        for col in 0..m.ncols() {
            if col > 0 {
                out.push(',');
            }
            out.push_str(&m[(row, col)].to_string());
        }
    }
    out
}

/// Parses the `[rows,cols]v;v;v,...` textual form back into a [`Matrix`].
pub fn parse_matrix(text: &str) -> Result<Matrix, AutomatonError> {
    let bad = |reason: &str| AutomatonError::ParseError {
        path: "Matrix".to_string(),
        reason: reason.to_string(),
    };

    let close = text.find(']').ok_or_else(|| bad("missing closing ']'"))?;
    if !text.starts_with('[') {
        return Err(bad("missing opening '['"));
    }
    let dims = &text[1..close];
    let mut dims_it = dims.split(',');
    let rows: usize = dims_it
        .next()
        .ok_or_else(|| bad("missing row count"))?
        .trim()
        .parse()
        .map_err(|_| bad("row count is not an integer"))?;
    let cols: usize = dims_it
        .next()
        .ok_or_else(|| bad("missing column count"))?
        .trim()
        .parse()
        .map_err(|_| bad("column count is not an integer"))?;
    if dims_it.next().is_some() {
        return Err(bad("too many dimensions, expected `[rows,cols]`"));
    }

    let body = &text[close + 1..];
    let mut data = vec![0.0; rows * cols];
    if rows == 0 || cols == 0 {
        if !body.is_empty() {
            return Err(bad("non-empty body for a zero-sized matrix"));
        }
        return Ok(Matrix::from_vec(rows, cols, data));
    }

    let row_strs: Vec<&str> = body.split(';').collect();
    if row_strs.len() != rows {
        return Err(bad(&format!(
            "expected {rows} rows, found {}",
            row_strs.len()
        )));
    }
    for (row, row_str) in row_strs.iter().enumerate() {
        let col_strs: Vec<&str> = row_str.split(',').collect();
        if col_strs.len() != cols {
            return Err(bad(&format!(
                "row {row}: expected {cols} columns, found {}",
                col_strs.len()
            )));
        }
        for (col, value_str) in col_strs.iter().enumerate() {
            let value: f64 = value_str
                .trim()
                .parse()
                .map_err(|_| bad(&format!("value {value_str:?} is not a finite f64")))?;
            // nalgebra's DMatrix is column-major internally but indexing is
            // always (row, col); build via direct index assignment so the
            // row-major text form maps the way the grammar describes.
            data[col * rows + row] = value;
        }
    }
    Ok(Matrix::from_vec(rows, cols, data))
}
