//! Row replacement: the first non-missing value across inputs.
//!
//! Record inputs (matrices, tables) are replaced a whole row at a time: a
//! row is taken from a later input only when every field of it is missing
//! in all earlier inputs. A partially missing row is never patched field by
//! field.

use serde::{Deserialize, Serialize};

use crate::{
    coerce::cast_common,
    error::{Error, Result},
    table::Table,
    vector::{Vector, VectorType},
};

/// Overrides for [`coalesce`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoalesceOptions {
    /// Output type; defaults to the common type of the inputs.
    pub ptype: Option<VectorType>,
    /// Output size; defaults to the common size of the inputs.
    pub size: Option<usize>,
}

impl CoalesceOptions {
    /// Creates options with no overrides.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the output type.
    #[must_use]
    pub fn with_ptype(mut self, ptype: VectorType) -> Self {
        self.ptype = Some(ptype);
        self
    }

    /// Sets the output size.
    #[must_use]
    pub fn with_size(mut self, size: usize) -> Self {
        self.size = Some(size);
        self
    }
}

/// For each row, the index of the first input whose row is present, or
/// `None` if every input is missing there.
///
/// Uses [`Vector::is_missing`], so a record row counts as present as soon as
/// any one of its fields is.
pub fn first_present(inputs: &[Vector], size: usize) -> Vec<Option<usize>> {
    (0..size)
        .map(|row| inputs.iter().position(|v| !v.is_missing(row)))
        .collect()
}

/// Returns, for every row, the first non-missing value among `inputs`.
///
/// `None` inputs are discarded first. The remaining inputs are cast to their
/// common type and recycled to their common size, either of which may be
/// fixed through `options`.
///
/// # Errors
///
/// Returns [`Error::Usage`] if no input remains, and
/// [`Error::IncompatibleType`] or [`Error::Recycling`] if the inputs can't
/// be brought to a common shape.
pub fn coalesce<'a>(
    inputs: impl IntoIterator<Item = Option<&'a Vector>>,
    options: &CoalesceOptions,
) -> Result<Vector> {
    let present: Vec<&Vector> = inputs.into_iter().flatten().collect();
    if present.is_empty() {
        return Err(Error::usage("coalesce() needs at least one non-null input"));
    }
    let labeled: Vec<(String, &Vector)> = present
        .iter()
        .enumerate()
        .map(|(i, v)| (format!("..{}", i + 1), *v))
        .collect();
    let (vtype, size, cast) = cast_common(&labeled, options.ptype.as_ref(), options.size)?;

    let sources = first_present(&cast, size);
    if sources.iter().all(|s| *s == Some(0)) {
        return cast.into_iter().next().ok_or_else(|| Error::usage("no inputs"));
    }

    // Gather from the concatenation; rows missing everywhere come from input 0.
    let stacked = Vector::concat(&cast)?;
    let indices: Vec<usize> = sources
        .iter()
        .enumerate()
        .map(|(row, src)| src.unwrap_or(0) * size + row)
        .collect();
    let out = stacked.take(&indices);
    tracing::debug!(inputs = cast.len(), size, vtype = %vtype, "coalesced");
    Ok(out)
}

/// [`coalesce`] over tables, replacing whole rows.
///
/// # Errors
///
/// Same as [`coalesce`], plus [`Error::InvalidInput`] if a table has no
/// columns.
pub fn coalesce_tables<'a>(
    tables: impl IntoIterator<Item = Option<&'a Table>>,
    options: &CoalesceOptions,
) -> Result<Table> {
    let vectors = tables
        .into_iter()
        .map(|t| t.map(record_of).transpose())
        .collect::<Result<Vec<_>>>()?;
    let out = coalesce(vectors.iter().map(Option::as_ref), options)?;
    Table::try_from(out)
}

fn record_of(table: &Table) -> Result<Vector> {
    if table.num_columns() == 0 {
        return Err(Error::invalid_input("can't coalesce a table with no columns"));
    }
    Ok(table.to_vector())
}
