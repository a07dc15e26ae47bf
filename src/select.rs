//! Column selection expressions.
//!
//! A [`Selection`] resolves against a table to an ordered, deduplicated list
//! of column names. Names and positions are *explicit* selections; every
//! other form (patterns, ranges, predicates) is *implicit*.
//!
//! Grouping columns get special treatment when `include_group_vars` is
//! false: implicit selections skip them silently, while explicitly naming one
//! is a [`Error::GroupingConflict`].

use std::{fmt, ops::Range, sync::Arc};

use regex::Regex;

use crate::{
    error::{Error, Result},
    table::Table,
    vector::Vector,
};

/// Predicate over a column's values.
pub type ColumnPredicate = dyn Fn(&Vector) -> bool + Send + Sync;

/// A column selection expression.
#[derive(Clone)]
pub enum Selection {
    /// Columns by name, in the given order.
    Names(Vec<String>),
    /// Columns by zero-based position, in the given order.
    Positions(Vec<usize>),
    /// Columns from `from` to `to` inclusive, by name; reversed if `to`
    /// comes first.
    Span {
        /// First column of the span.
        from: String,
        /// Last column of the span.
        to: String,
    },
    /// Columns in a half-open range of positions.
    PositionRange(Range<usize>),
    /// Names starting with a prefix.
    StartsWith(String),
    /// Names ending with a suffix.
    EndsWith(String),
    /// Names containing a substring.
    Contains(String),
    /// Names matching a regular expression.
    Matches(Regex),
    /// Columns whose values satisfy a predicate.
    Where(Arc<ColumnPredicate>),
    /// Every column.
    Everything,
    /// Union of selections, in order.
    Union(Vec<Selection>),
    /// Columns of `include` that are not in `exclude`.
    Except {
        /// Columns to start from.
        include: Box<Selection>,
        /// Columns to remove.
        exclude: Box<Selection>,
    },
}

impl fmt::Debug for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Names(n) => f.debug_tuple("Names").field(n).finish(),
            Self::Positions(p) => f.debug_tuple("Positions").field(p).finish(),
            Self::Span { from, to } => f
                .debug_struct("Span")
                .field("from", from)
                .field("to", to)
                .finish(),
            Self::PositionRange(r) => f.debug_tuple("PositionRange").field(r).finish(),
            Self::StartsWith(s) => f.debug_tuple("StartsWith").field(s).finish(),
            Self::EndsWith(s) => f.debug_tuple("EndsWith").field(s).finish(),
            Self::Contains(s) => f.debug_tuple("Contains").field(s).finish(),
            Self::Matches(r) => f.debug_tuple("Matches").field(&r.as_str()).finish(),
            Self::Where(_) => f.write_str("Where(<predicate>)"),
            Self::Everything => f.write_str("Everything"),
            Self::Union(s) => f.debug_tuple("Union").field(s).finish(),
            Self::Except { include, exclude } => f
                .debug_struct("Except")
                .field("include", include)
                .field("exclude", exclude)
                .finish(),
        }
    }
}

impl Selection {
    /// Selects columns by name.
    pub fn names<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Self {
        Self::Names(names.into_iter().map(Into::into).collect())
    }

    /// Selects columns by zero-based position.
    pub fn positions(positions: impl IntoIterator<Item = usize>) -> Self {
        Self::Positions(positions.into_iter().collect())
    }

    /// Selects the columns from `from` to `to`, inclusive.
    pub fn span(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::Span {
            from: from.into(),
            to: to.into(),
        }
    }

    /// Selects columns whose names start with `prefix`.
    pub fn starts_with(prefix: impl Into<String>) -> Self {
        Self::StartsWith(prefix.into())
    }

    /// Selects columns whose names end with `suffix`.
    pub fn ends_with(suffix: impl Into<String>) -> Self {
        Self::EndsWith(suffix.into())
    }

    /// Selects columns whose names contain `needle`.
    pub fn contains(needle: impl Into<String>) -> Self {
        Self::Contains(needle.into())
    }

    /// Selects columns whose names match `pattern`.
    ///
    /// # Errors
    ///
    /// Returns an error if the pattern is not a valid regular expression.
    pub fn matches(pattern: &str) -> Result<Self> {
        Regex::new(pattern)
            .map(Self::Matches)
            .map_err(|e| Error::invalid_input(format!("invalid column pattern: {e}")))
    }

    /// Selects columns whose values satisfy `predicate`.
    pub fn predicate<F>(predicate: F) -> Self
    where
        F: Fn(&Vector) -> bool + Send + Sync + 'static,
    {
        Self::Where(Arc::new(predicate))
    }

    /// Selects every column.
    pub fn everything() -> Self {
        Self::Everything
    }

    /// Removes the columns matched by `exclude` from this selection.
    #[must_use]
    pub fn except(self, exclude: Selection) -> Self {
        Self::Except {
            include: Box::new(self),
            exclude: Box::new(exclude),
        }
    }

    /// Returns true for selections that name columns directly.
    pub fn is_explicit(&self) -> bool {
        matches!(self, Self::Names(_) | Self::Positions(_))
    }
}

struct Resolver<'a> {
    table: &'a Table,
    group_vars: &'a [String],
    include_group_vars: bool,
    skipped: Vec<String>,
}

impl Resolver<'_> {
    fn is_group_var(&self, idx: usize) -> bool {
        self.group_vars.contains(&self.table.names()[idx])
    }

    fn explicit(&mut self, idx: usize, out: &mut Vec<usize>) -> Result<()> {
        if !self.include_group_vars && self.is_group_var(idx) {
            return Err(Error::grouping_conflict(self.table.names()[idx].clone()));
        }
        out.push(idx);
        Ok(())
    }

    fn implicit(&mut self, idx: usize, out: &mut Vec<usize>) {
        if !self.include_group_vars && self.is_group_var(idx) {
            self.skipped.push(self.table.names()[idx].clone());
        } else {
            out.push(idx);
        }
    }

    fn position_of(&self, name: &str) -> Result<usize> {
        self.table
            .column_index(name)
            .ok_or_else(|| Error::column_not_found(name))
    }

    fn collect(&mut self, selection: &Selection, out: &mut Vec<usize>) -> Result<()> {
        let width = self.table.num_columns();
        match selection {
            Selection::Names(names) => {
                for name in names {
                    let idx = self.position_of(name)?;
                    self.explicit(idx, out)?;
                }
            }
            Selection::Positions(positions) => {
                for &idx in positions {
                    if idx >= width {
                        return Err(Error::invalid_input(format!(
                            "column position {idx} is out of range for {width} columns"
                        )));
                    }
                    self.explicit(idx, out)?;
                }
            }
            Selection::Span { from, to } => {
                let (a, b) = (self.position_of(from)?, self.position_of(to)?);
                if a <= b {
                    (a..=b).for_each(|i| self.implicit(i, out));
                } else {
                    (b..=a).rev().for_each(|i| self.implicit(i, out));
                }
            }
            Selection::PositionRange(range) => {
                if range.end > width {
                    return Err(Error::invalid_input(format!(
                        "column range {range:?} is out of range for {width} columns"
                    )));
                }
                range.clone().for_each(|i| self.implicit(i, out));
            }
            Selection::StartsWith(p) => self.by_name(|n| n.starts_with(p.as_str()), out),
            Selection::EndsWith(s) => self.by_name(|n| n.ends_with(s.as_str()), out),
            Selection::Contains(s) => self.by_name(|n| n.contains(s.as_str()), out),
            Selection::Matches(re) => self.by_name(|n| re.is_match(n), out),
            Selection::Where(pred) => {
                for i in 0..width {
                    if pred(&self.table.columns()[i]) {
                        self.implicit(i, out);
                    }
                }
            }
            Selection::Everything => (0..width).for_each(|i| self.implicit(i, out)),
            Selection::Union(parts) => {
                for part in parts {
                    self.collect(part, out)?;
                }
            }
            Selection::Except { include, exclude } => {
                let mut kept = Vec::new();
                self.collect(include, &mut kept)?;
                let mut dropped = Vec::new();
                let mut inner = Resolver {
                    table: self.table,
                    group_vars: self.group_vars,
                    include_group_vars: true,
                    skipped: Vec::new(),
                };
                inner.collect(exclude, &mut dropped)?;
                out.extend(kept.into_iter().filter(|i| !dropped.contains(i)));
            }
        }
        Ok(())
    }

    fn by_name(&mut self, test: impl Fn(&str) -> bool, out: &mut Vec<usize>) {
        for i in 0..self.table.num_columns() {
            if test(&self.table.names()[i]) {
                self.implicit(i, out);
            }
        }
    }
}

/// Resolves a selection against a table.
///
/// The result is deduplicated, keeping each column's first match in the
/// selection's own iteration order.
///
/// # Errors
///
/// Returns an error for unknown names, out-of-range positions, or (with
/// `include_group_vars == false`) an explicitly named grouping column.
pub fn resolve(
    table: &Table,
    selection: &Selection,
    group_vars: &[String],
    include_group_vars: bool,
) -> Result<Vec<String>> {
    let mut resolver = Resolver {
        table,
        group_vars,
        include_group_vars,
        skipped: Vec::new(),
    };
    let mut matched = Vec::new();
    resolver.collect(selection, &mut matched)?;

    if !resolver.skipped.is_empty() {
        resolver.skipped.dedup();
        tracing::warn!(
            columns = ?resolver.skipped,
            "grouping columns ignored by implicit selection"
        );
    }

    let mut seen = vec![false; table.num_columns()];
    Ok(matched
        .into_iter()
        .filter(|&i| !std::mem::replace(&mut seen[i], true))
        .map(|i| table.names()[i].clone())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Table {
        Table::new(vec![
            ("g", Vector::from(vec!["a", "b"])),
            ("x_min", Vector::from(vec![1.0, 2.0])),
            ("x_max", Vector::from(vec![3.0, 4.0])),
            ("label", Vector::from(vec!["p", "q"])),
            ("n", Vector::from(vec![1_i64, 2])),
        ])
        .unwrap()
    }

    fn run(sel: &Selection) -> Vec<String> {
        resolve(&table(), sel, &[], true).unwrap()
    }

    #[test]
    fn test_names_keep_given_order() {
        assert_eq!(run(&Selection::names(["n", "g"])), vec!["n", "g"]);
    }

    #[test]
    fn test_unknown_name() {
        let r = resolve(&table(), &Selection::names(["zz"]), &[], true);
        assert!(matches!(r, Err(Error::ColumnNotFound { .. })));
    }

    #[test]
    fn test_patterns() {
        assert_eq!(run(&Selection::starts_with("x_")), vec!["x_min", "x_max"]);
        assert_eq!(run(&Selection::ends_with("max")), vec!["x_max"]);
        assert_eq!(run(&Selection::contains("ab")), vec!["label"]);
        assert_eq!(
            run(&Selection::matches("^x_m(in|ax)$").unwrap()),
            vec!["x_min", "x_max"]
        );
        assert!(Selection::matches("(").is_err());
    }

    #[test]
    fn test_spans_and_ranges() {
        assert_eq!(run(&Selection::span("x_min", "label")), vec!["x_min", "x_max", "label"]);
        assert_eq!(run(&Selection::span("label", "x_min")), vec!["label", "x_max", "x_min"]);
        assert_eq!(run(&Selection::PositionRange(3..5)), vec!["label", "n"]);
        assert!(resolve(&table(), &Selection::PositionRange(3..9), &[], true).is_err());
    }

    #[test]
    fn test_predicate() {
        let numeric = Selection::predicate(|v| v.to_f64().is_ok());
        assert_eq!(run(&numeric), vec!["x_min", "x_max", "n"]);
    }

    #[test]
    fn test_union_dedups_first_occurrence() {
        let sel = Selection::Union(vec![
            Selection::names(["n"]),
            Selection::starts_with("x"),
            Selection::everything(),
        ]);
        assert_eq!(run(&sel), vec!["n", "x_min", "x_max", "g", "label"]);
    }

    #[test]
    fn test_except() {
        let sel = Selection::everything().except(Selection::starts_with("x"));
        assert_eq!(run(&sel), vec!["g", "label", "n"]);
    }

    #[test]
    fn test_implicit_skips_group_vars() {
        let groups = vec!["g".to_string()];
        let sel = Selection::predicate(|v| matches!(v, Vector::Character(_)));
        assert_eq!(
            resolve(&table(), &sel, &groups, false).unwrap(),
            vec!["label"]
        );
        assert_eq!(
            resolve(&table(), &sel, &groups, true).unwrap(),
            vec!["g", "label"]
        );
    }

    #[test]
    fn test_explicit_group_var_conflicts() {
        let groups = vec!["g".to_string()];
        let r = resolve(&table(), &Selection::names(["x_min", "g"]), &groups, false);
        assert!(matches!(r, Err(Error::GroupingConflict { column }) if column == "g"));
        let r = resolve(&table(), &Selection::positions([0]), &groups, false);
        assert!(matches!(r, Err(Error::GroupingConflict { .. })));
    }
}
