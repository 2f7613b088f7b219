//! Row representation.

use std::fmt;

use crate::value::Datum;

/// A single row of values, one per table column.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Row {
    /// The values in this row.
    values: Vec<Datum>,
}

impl Row {
    /// Creates a new row with the given values.
    pub fn new(values: Vec<Datum>) -> Self {
        Self { values }
    }

    /// Returns the number of columns in this row.
    pub fn num_columns(&self) -> usize {
        self.values.len()
    }

    /// Returns true if this row is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns the value at the given index.
    pub fn get(&self, index: usize) -> Option<&Datum> {
        self.values.get(index)
    }

    /// Returns an iterator over the values.
    pub fn iter(&self) -> impl Iterator<Item = &Datum> {
        self.values.iter()
    }

    /// Returns the values as a slice.
    pub fn values(&self) -> &[Datum] {
        &self.values
    }

    /// Consumes the row and returns the values.
    pub fn into_values(self) -> Vec<Datum> {
        self.values
    }
}

impl From<Vec<Datum>> for Row {
    fn from(values: Vec<Datum>) -> Self {
        Self::new(values)
    }
}

impl IntoIterator for Row {
    type Item = Datum;
    type IntoIter = std::vec::IntoIter<Datum>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, value) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", value)?;
        }
        write!(f, ")")
    }
}
