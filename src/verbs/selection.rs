//! Column selection and renaming verbs.

use std::sync::Arc;

use super::Verb;
use crate::{
    error::Result,
    group::Frame,
    select::{resolve, Selection},
    table::Table,
};

/// Keeps the grouping when every key survives, otherwise regroups by the
/// surviving keys, warning about each dropped one.
///
/// A key survives only if `survives` holds for it; a column that merely
/// takes over a key's name does not keep the key.
fn carry_groups(frame: &Frame, table: Table, survives: impl Fn(&str) -> bool) -> Result<Frame> {
    let vars = frame.group_vars();
    let kept: Vec<&String> = vars
        .iter()
        .filter(|v| {
            let alive = survives(v.as_str());
            if !alive {
                tracing::warn!(column = %v, "grouping column dropped or renamed; removed from grouping");
            }
            alive
        })
        .collect();
    if kept.len() == vars.len() {
        Ok(Frame::with_groups(table, Arc::clone(frame.groups())))
    } else {
        Frame::grouped(table, &kept)
    }
}

/// A verb that keeps the columns matched by a selection, in selection order.
///
/// Grouping columns are not added back: a grouping column left out of the
/// selection is dropped from the grouping, with a warning.
///
/// # Example
///
/// ```ignore
/// use wrangle::{Select, Selection};
///
/// let select = Select::new(Selection::names(["id", "name"]));
/// ```
#[derive(Debug, Clone)]
pub struct Select {
    selection: Selection,
}

impl Select {
    /// Creates a new Select verb.
    pub fn new(selection: Selection) -> Self {
        Self { selection }
    }

    /// Returns the selection.
    pub fn selection(&self) -> &Selection {
        &self.selection
    }
}

impl Verb for Select {
    fn apply(&self, frame: Frame) -> Result<Frame> {
        let columns = resolve(frame.table(), &self.selection, frame.group_vars(), true)?;
        let table = frame.table().project(&columns)?;
        let surviving: Vec<String> = frame
            .group_vars()
            .iter()
            .filter(|v| match (table.column(v), frame.table().column(v)) {
                (Some(new), Some(old)) => Arc::ptr_eq(new, old),
                _ => false,
            })
            .cloned()
            .collect();
        carry_groups(&frame, table, |v| surviving.iter().any(|s| s == v))
    }
}

/// A verb that renames columns.
///
/// Renaming a grouping column drops it from the grouping, with a warning.
///
/// # Example
///
/// ```ignore
/// use wrangle::Rename;
///
/// let rename = Rename::new([("old_name", "new_name")]);
/// ```
#[derive(Debug, Clone)]
pub struct Rename {
    mapping: Vec<(String, String)>,
}

impl Rename {
    /// Creates a new Rename verb from `(old, new)` pairs.
    pub fn new<S: Into<String>>(mapping: impl IntoIterator<Item = (S, S)>) -> Self {
        Self {
            mapping: mapping
                .into_iter()
                .map(|(old, new)| (old.into(), new.into()))
                .collect(),
        }
    }

    /// Returns the `(old, new)` pairs.
    pub fn mapping(&self) -> &[(String, String)] {
        &self.mapping
    }
}

impl Verb for Rename {
    fn apply(&self, frame: Frame) -> Result<Frame> {
        let table = frame.table().rename(&self.mapping)?;
        carry_groups(&frame, table, |v| {
            !self.mapping.iter().any(|(old, new)| old == v && new != v)
        })
    }
}
