//! Named columns of equal length.

use std::sync::Arc;

use crate::{
    error::{Error, Result},
    vector::{Record, Vector, VectorRef},
};

/// An ordered set of uniquely named, equal-length columns.
///
/// Columns are shared through [`VectorRef`], so deriving a new table from an
/// old one only copies the columns that actually change.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    names: Vec<String>,
    columns: Vec<VectorRef>,
    num_rows: usize,
}

impl Table {
    /// Creates a table from named columns.
    ///
    /// # Errors
    ///
    /// Returns an error if two columns share a name or the columns differ in
    /// length.
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = (S, Vector)>) -> Result<Self> {
        let (names, columns): (Vec<String>, Vec<VectorRef>) = columns
            .into_iter()
            .map(|(n, v)| (n.into(), Arc::new(v)))
            .unzip();
        let num_rows = columns.first().map_or(0, |c| c.len());
        Self::from_parts(names, columns, num_rows)
    }

    /// Creates a table from shared columns with an explicit row count.
    ///
    /// # Errors
    ///
    /// Returns an error if two columns share a name or a column's length is
    /// not `num_rows`.
    pub fn from_parts(names: Vec<String>, columns: Vec<VectorRef>, num_rows: usize) -> Result<Self> {
        if names.len() != columns.len() {
            return Err(Error::invalid_input(format!(
                "{} names for {} columns",
                names.len(),
                columns.len()
            )));
        }
        for (i, name) in names.iter().enumerate() {
            if names[..i].contains(name) {
                return Err(Error::duplicate_column(name.clone()));
            }
            if columns[i].len() != num_rows {
                return Err(Error::recycling(
                    "table",
                    num_rows,
                    format!("column `{name}`"),
                    columns[i].len(),
                ));
            }
        }
        Ok(Self {
            names,
            columns,
            num_rows,
        })
    }

    /// Creates a table with no columns and the given number of rows.
    pub fn empty(num_rows: usize) -> Self {
        Self {
            names: Vec::new(),
            columns: Vec::new(),
            num_rows,
        }
    }

    /// Returns the number of rows.
    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    /// Returns the number of columns.
    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// Returns the column names, in order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Returns the columns, aligned with [`Table::names`].
    pub fn columns(&self) -> &[VectorRef] {
        &self.columns
    }

    /// Returns the position of a column.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Returns a column by name.
    pub fn column(&self, name: &str) -> Option<&VectorRef> {
        self.column_index(name).map(|i| &self.columns[i])
    }

    /// Returns a column by name, or [`Error::ColumnNotFound`].
    ///
    /// # Errors
    ///
    /// Returns an error if the column does not exist.
    pub fn require(&self, name: &str) -> Result<&VectorRef> {
        self.column(name).ok_or_else(|| Error::column_not_found(name))
    }

    /// Gathers rows by index.
    pub fn take(&self, indices: &[usize]) -> Self {
        Self {
            names: self.names.clone(),
            columns: self
                .columns
                .iter()
                .map(|c| Arc::new(c.take(indices)))
                .collect(),
            num_rows: indices.len(),
        }
    }

    /// Keeps the named columns, in the given order.
    ///
    /// # Errors
    ///
    /// Returns an error if a name is not a column.
    pub fn project<S: AsRef<str>>(&self, names: &[S]) -> Result<Self> {
        let mut out_names = Vec::with_capacity(names.len());
        let mut out_columns = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref();
            out_columns.push(Arc::clone(self.require(name)?));
            out_names.push(name.to_string());
        }
        Self::from_parts(out_names, out_columns, self.num_rows)
    }

    /// Replaces a column in place, or appends it if the name is new.
    ///
    /// # Errors
    ///
    /// Returns an error if the column's length differs from the row count.
    pub fn with_column(mut self, name: impl Into<String>, column: VectorRef) -> Result<Self> {
        let name = name.into();
        if column.len() != self.num_rows {
            return Err(Error::recycling(
                "table",
                self.num_rows,
                format!("column `{name}`"),
                column.len(),
            ));
        }
        match self.column_index(&name) {
            Some(i) => self.columns[i] = column,
            None => {
                self.names.push(name);
                self.columns.push(column);
            }
        }
        Ok(self)
    }

    /// Renames columns from `(old, new)` pairs.
    ///
    /// # Errors
    ///
    /// Returns an error if an old name is missing or the result has duplicate
    /// names.
    pub fn rename<S: AsRef<str>>(&self, pairs: &[(S, S)]) -> Result<Self> {
        let mut names = self.names.clone();
        for (old, new) in pairs {
            let i = self
                .column_index(old.as_ref())
                .ok_or_else(|| Error::column_not_found(old.as_ref()))?;
            names[i] = new.as_ref().to_string();
        }
        Self::from_parts(names, self.columns.clone(), self.num_rows)
    }

    /// Converts the table to a record vector, one element per row.
    pub fn to_vector(&self) -> Vector {
        let fields = self.columns.iter().map(|c| (**c).clone()).collect();
        Record::from_parts(self.names.clone(), fields, self.num_rows)
            .map_or_else(|_| Vector::Null(self.num_rows), Vector::Record)
    }
}

impl TryFrom<Vector> for Table {
    type Error = Error;

    fn try_from(v: Vector) -> Result<Self> {
        match v {
            Vector::Record(r) => {
                let (names, fields, len) = r.into_parts();
                Self::from_parts(names, fields.into_iter().map(Arc::new).collect(), len)
            }
            other => Err(Error::invalid_input(format!(
                "expected a record with row/column structure, got <{}>",
                other.vtype()
            ))),
        }
    }
}
