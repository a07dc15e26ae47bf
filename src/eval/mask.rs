//! Per-group data context and deferred expressions.

use std::{fmt, sync::Arc};

use crate::{
    error::{Error, Result},
    group::Groups,
    table::Table,
    vector::{Vector, VectorRef},
};

/// The data an expression sees while it is evaluated for one group.
///
/// Column lookups return the group's slice of the column. Results of earlier
/// expressions in the same verb call shadow table columns of the same name.
pub struct DataMask<'a> {
    table: &'a Table,
    groups: &'a Groups,
    group: Option<usize>,
    rows: &'a [usize],
    locals: Vec<(String, VectorRef)>,
}

impl<'a> DataMask<'a> {
    pub(crate) fn new(
        table: &'a Table,
        groups: &'a Groups,
        group: Option<usize>,
        rows: &'a [usize],
    ) -> Self {
        Self {
            table,
            groups,
            group,
            rows,
            locals: Vec::new(),
        }
    }

    /// Returns the group's slice of a column.
    ///
    /// # Errors
    ///
    /// Returns an error if no column or earlier result has this name.
    pub fn column(&self, name: &str) -> Result<VectorRef> {
        if let Some((_, v)) = self.locals.iter().find(|(n, _)| n == name) {
            return Ok(Arc::clone(v));
        }
        let column = self.table.require(name)?;
        if self.covers_table() {
            Ok(Arc::clone(column))
        } else {
            Ok(Arc::new(column.take(self.rows)))
        }
    }

    /// Returns the number of rows in the group.
    pub fn n(&self) -> usize {
        self.rows.len()
    }

    /// Returns the group's position in canonical order.
    ///
    /// `None` while a zero-group frame is evaluated for its output types.
    pub fn group_id(&self) -> Option<usize> {
        self.group
    }

    /// Returns the group's value of a grouping variable as a size-1 vector
    /// (size 0 while evaluating for output types only).
    ///
    /// # Errors
    ///
    /// Returns an error if `var` is not a grouping variable.
    pub fn group_key(&self, var: &str) -> Result<Vector> {
        let keys = self.groups.keys().require(var)?;
        Ok(match self.group {
            Some(g) => keys.take(&[g]),
            None => keys.take(&[]),
        })
    }

    /// Returns the original row indices of the group.
    pub fn rows(&self) -> &[usize] {
        self.rows
    }

    pub(crate) fn bind(&mut self, name: &str, value: VectorRef) {
        match self.locals.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = value,
            None => self.locals.push((name.to_string(), value)),
        }
    }

    pub(crate) fn describe_group(&self) -> String {
        match self.group {
            Some(g) => self.groups.describe(g),
            None => "<empty>".to_string(),
        }
    }

    fn covers_table(&self) -> bool {
        self.rows.len() == self.table.num_rows() && self.rows.iter().enumerate().all(|(i, &r)| i == r)
    }
}

/// Closure type behind an [`Expr`].
pub type ExprFn = dyn Fn(&DataMask<'_>) -> Result<Vector> + Send + Sync;

/// A named, deferred computation over a [`DataMask`].
///
/// Declared column references (see [`Expr::uses`]) are checked once per verb
/// call, before any group is evaluated.
#[derive(Clone)]
pub struct Expr {
    name: String,
    refs: Vec<String>,
    func: Arc<ExprFn>,
}

impl fmt::Debug for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Expr")
            .field("name", &self.name)
            .field("refs", &self.refs)
            .finish_non_exhaustive()
    }
}

impl Expr {
    /// Creates an expression from a closure.
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&DataMask<'_>) -> Result<Vector> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            refs: Vec::new(),
            func: Arc::new(func),
        }
    }

    /// Copies column `source` into `name`.
    pub fn column(name: impl Into<String>, source: impl Into<String>) -> Self {
        let source = source.into();
        let lookup = source.clone();
        Self::new(name, move |mask| Ok((*mask.column(&lookup)?).clone())).uses([source])
    }

    /// A constant, recycled to each group's size where needed.
    pub fn constant(name: impl Into<String>, value: Vector) -> Self {
        Self::new(name, move |_| Ok(value.clone()))
    }

    /// The group's row count, as an integer.
    pub fn n(name: impl Into<String>) -> Self {
        Self::new(name, |mask| {
            Ok(Vector::Integer(vec![i64::try_from(mask.n()).ok()]))
        })
    }

    /// Applies `func` to the group's slice of column `source`.
    pub fn map<F>(name: impl Into<String>, source: impl Into<String>, func: F) -> Self
    where
        F: Fn(&Vector) -> Result<Vector> + Send + Sync + 'static,
    {
        let source = source.into();
        let lookup = source.clone();
        Self::new(name, move |mask| func(mask.column(&lookup)?.as_ref())).uses([source])
    }

    /// Declares the columns this expression reads.
    #[must_use]
    pub fn uses<S: Into<String>>(mut self, refs: impl IntoIterator<Item = S>) -> Self {
        self.refs.extend(refs.into_iter().map(Into::into));
        self
    }

    /// Returns the output name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the declared column references.
    pub fn refs(&self) -> &[String] {
        &self.refs
    }

    /// Evaluates the expression against a mask.
    ///
    /// # Errors
    ///
    /// Propagates any error raised by the closure.
    pub fn evaluate(&self, mask: &DataMask<'_>) -> Result<Vector> {
        (self.func)(mask)
    }
}

/// Checks every declared reference against the table and the names of
/// earlier expressions.
pub(crate) fn check_refs(table: &Table, exprs: &[Expr]) -> Result<()> {
    let mut known: Vec<&str> = table.names().iter().map(String::as_str).collect();
    for expr in exprs {
        if let Some(missing) = expr.refs.iter().find(|r| !known.contains(&r.as_str())) {
            return Err(Error::column_not_found(missing.clone()));
        }
        known.push(&expr.name);
    }
    Ok(())
}
