//! Applying several functions to several columns at once.
//!
//! An [`Across`] pairs a column [`Selection`] with a list of named or unnamed
//! column functions and expands into one [`Expr`] per (column, function)
//! pair, named by [`cross_names`]. Grouping columns are never selected
//! implicitly; naming one explicitly is a [`Error::GroupingConflict`].

use std::{fmt, sync::Arc};

use crate::{
    error::{Error, Result},
    eval::{self, Expr},
    group::Frame,
    naming::{cross_names, make_unique, VarLabel},
    select::{resolve, Selection},
    vector::Vector,
};

/// A function from a column slice to a result vector.
pub type ColumnFn = dyn Fn(&Vector) -> Result<Vector> + Send + Sync;

/// Several functions applied to the columns of a selection.
#[derive(Clone)]
pub struct Across {
    selection: Selection,
    funs: Vec<(Option<String>, Arc<ColumnFn>)>,
    aliases: Vec<(String, String)>,
}

impl fmt::Debug for Across {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let funs: Vec<&str> = self
            .funs
            .iter()
            .map(|(n, _)| n.as_deref().unwrap_or("<unnamed>"))
            .collect();
        f.debug_struct("Across")
            .field("selection", &self.selection)
            .field("funs", &funs)
            .field("aliases", &self.aliases)
            .finish()
    }
}

impl Across {
    /// Starts an application over the given columns.
    pub fn new(selection: Selection) -> Self {
        Self {
            selection,
            funs: Vec::new(),
            aliases: Vec::new(),
        }
    }

    /// Adds a named function.
    #[must_use]
    pub fn fun<F>(mut self, name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&Vector) -> Result<Vector> + Send + Sync + 'static,
    {
        self.funs.push((Some(name.into()), Arc::new(func)));
        self
    }

    /// Adds an unnamed function.
    #[must_use]
    pub fn unnamed<F>(mut self, func: F) -> Self
    where
        F: Fn(&Vector) -> Result<Vector> + Send + Sync + 'static,
    {
        self.funs.push((None, Arc::new(func)));
        self
    }

    /// Uses `alias` in place of `column` when naming outputs.
    #[must_use]
    pub fn with_alias(mut self, column: impl Into<String>, alias: impl Into<String>) -> Self {
        self.aliases.push((column.into(), alias.into()));
        self
    }

    /// Expands into one expression per (column, function) pair,
    /// column-major.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Usage`] if no function was given, and any error from
    /// resolving the selection.
    pub fn exprs(&self, frame: &Frame) -> Result<Vec<Expr>> {
        if self.funs.is_empty() {
            return Err(Error::usage("across() needs at least one function"));
        }
        let columns = resolve(frame.table(), &self.selection, frame.group_vars(), false)?;
        let labels: Vec<VarLabel> = columns
            .iter()
            .map(|c| {
                let label = VarLabel::new(c.clone());
                match self.aliases.iter().find(|(col, _)| col == c) {
                    Some((_, alias)) => label.alias(alias.clone()),
                    None => label,
                }
            })
            .collect();
        let fun_names: Vec<Option<String>> = self.funs.iter().map(|(n, _)| n.clone()).collect();
        let names = make_unique(cross_names(&labels, &fun_names));

        let pairs = columns
            .iter()
            .flat_map(|c| self.funs.iter().map(move |(_, f)| (c, f)));
        Ok(names
            .into_iter()
            .zip(pairs)
            .map(|(name, (column, func))| {
                let func = Arc::clone(func);
                Expr::map(name, column.clone(), move |v| func(v))
            })
            .collect())
    }
}

/// [`eval::mutate`] with the expressions of an [`Across`].
///
/// # Errors
///
/// Same as [`Across::exprs`] and [`eval::mutate`].
pub fn mutate_across(frame: &Frame, across: &Across) -> Result<Frame> {
    eval::mutate(frame, &across.exprs(frame)?)
}

/// [`eval::summarise`] with the expressions of an [`Across`].
///
/// # Errors
///
/// Same as [`Across::exprs`] and [`eval::summarise`].
pub fn summarise_across(frame: &Frame, across: &Across) -> Result<Frame> {
    eval::summarise(frame, &across.exprs(frame)?)
}
