//! Row-major to column-major sample conversion.

use crate::row::Row;
use crate::value::Datum;

/// Splits sampled rows into one value vector per column.
///
/// `columns[j][i]` is `rows[i][j]`. An empty sample gives no columns.
///
/// # Panics
///
/// Panics if the rows do not all have the same width.
pub fn rows_to_column_samples(rows: Vec<Row>) -> Vec<Vec<Datum>> {
    let Some(first) = rows.first() else {
        return Vec::new();
    };
    let width = first.num_columns();
    let mut columns: Vec<Vec<Datum>> = (0..width).map(|_| Vec::with_capacity(rows.len())).collect();

    for (i, row) in rows.into_iter().enumerate() {
        assert_eq!(
            row.num_columns(),
            width,
            "sample row {} has {} columns, expected {}",
            i,
            row.num_columns(),
            width
        );
        for (column, value) in columns.iter_mut().zip(row) {
            column.push(value);
        }
    }
    columns
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transpose() {
        let rows = vec![
            Row::new(vec![Datum::Int(1), Datum::string("a")]),
            Row::new(vec![Datum::Int(2), Datum::Null]),
            Row::new(vec![Datum::Int(3), Datum::string("c")]),
        ];
        let columns = rows_to_column_samples(rows.clone());
        assert_eq!(columns.len(), 2);
        for (j, column) in columns.iter().enumerate() {
            assert_eq!(column.len(), 3);
            for (i, value) in column.iter().enumerate() {
                assert_eq!(Some(value), rows[i].get(j));
            }
        }
    }

    #[test]
    fn test_empty_sample() {
        assert!(rows_to_column_samples(Vec::new()).is_empty());
    }

    #[test]
    #[should_panic(expected = "sample row 1 has 1 columns, expected 2")]
    fn test_ragged_rows_panic() {
        rows_to_column_samples(vec![
            Row::new(vec![Datum::Int(1), Datum::Int(2)]),
            Row::new(vec![Datum::Int(3)]),
        ]);
    }
}
