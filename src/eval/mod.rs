//! Per-group evaluation: `mutate`, `transmute`, `summarise` and `filter`.
//!
//! Every verb here runs its expressions once per group, in canonical group
//! order, against a [`DataMask`] holding the group's slice of the table.
//! Expressions run in sequence and later ones see the results of earlier
//! ones. Per-group results are then stitched back into one table.

mod mask;

use std::sync::Arc;

pub use mask::{DataMask, Expr, ExprFn};

use crate::{
    coerce::{cast, common_type_labeled},
    error::{Error, Result},
    group::{peel_last, Frame, Groups},
    table::Table,
    vector::{Vector, VectorRef},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// One value per row, or one value broadcast to the group.
    Rows,
    /// Any size; checked across the group's results afterwards.
    Summary,
    /// Like `Rows`, but results are not visible to later expressions.
    Predicate,
}

fn eval_group(
    table: &Table,
    groups: &Groups,
    group: Option<usize>,
    rows: &[usize],
    exprs: &[Expr],
    mode: Mode,
) -> Result<Vec<VectorRef>> {
    let mut mask = DataMask::new(table, groups, group, rows);
    let mut out = Vec::with_capacity(exprs.len());
    for expr in exprs {
        let value = expr.evaluate(&mask)?;
        let value = match mode {
            Mode::Summary => value,
            Mode::Rows | Mode::Predicate => match value.len() {
                m if m == rows.len() => value,
                1 => value.broadcast(rows.len()),
                m => {
                    return Err(Error::evaluation_size(
                        expr.name(),
                        mask.describe_group(),
                        rows.len(),
                        m,
                    ))
                }
            },
        };
        let value = Arc::new(value);
        if mode != Mode::Predicate {
            mask.bind(expr.name(), Arc::clone(&value));
        }
        out.push(value);
    }
    Ok(out)
}

/// Evaluates `exprs` for every group, or once on an empty slice when the
/// frame has no groups so the output types are still known.
fn eval_all(frame: &Frame, exprs: &[Expr], mode: Mode) -> Result<Vec<Vec<VectorRef>>> {
    let groups = frame.groups();
    if groups.is_empty() {
        let proto = eval_group(frame.table(), groups, None, &[], exprs, mode)?;
        return Ok(vec![proto]);
    }
    groups
        .rows()
        .iter()
        .enumerate()
        .map(|(g, rows)| eval_group(frame.table(), groups, Some(g), rows, exprs, mode))
        .collect()
}

/// Concatenates one expression's per-group chunks after casting them to
/// their common type.
fn combine(name: &str, groups: &Groups, chunks: &[&Vector]) -> Result<Vector> {
    if let [only] = chunks {
        return Ok((*only).clone());
    }
    let labeled: Vec<(String, &Vector)> = chunks
        .iter()
        .enumerate()
        .map(|(g, v)| (format!("`{name}` in group {}", groups.describe(g)), *v))
        .collect();
    let vtype = common_type_labeled(&labeled)?;
    let parts = chunks
        .iter()
        .map(|v| cast(v, &vtype))
        .collect::<Result<Vec<_>>>()?;
    Vector::concat(&parts)
}

/// Maps each row to its position in the concatenation of the groups' rows,
/// or `None` when that concatenation is already in row order.
fn scatter_positions(groups: &Groups, num_rows: usize) -> Option<Vec<usize>> {
    let mut positions = vec![0; num_rows];
    let mut identity = true;
    for (i, &row) in groups.rows().iter().flatten().enumerate() {
        positions[row] = i;
        identity &= i == row;
    }
    (!identity).then_some(positions)
}

fn mutate_table(frame: &Frame, exprs: &[Expr]) -> Result<Table> {
    mask::check_refs(frame.table(), exprs)?;
    let results = eval_all(frame, exprs, Mode::Rows)?;
    let groups = frame.groups();
    let positions = scatter_positions(groups, frame.num_rows());

    let mut table = frame.table().clone();
    for (e, expr) in exprs.iter().enumerate() {
        let chunks: Vec<&Vector> = results.iter().map(|r| r[e].as_ref()).collect();
        let column = combine(expr.name(), groups, &chunks)?;
        let column = match &positions {
            Some(p) => column.take(p),
            None => column,
        };
        table = table.with_column(expr.name(), Arc::new(column))?;
    }
    Ok(table)
}

/// Adds or replaces columns, one value per row.
///
/// Each expression must yield one value per row of its group, or a single
/// value that is broadcast. Results land at the group's original row
/// positions, so the output keeps the input's row order. Assigning to a
/// grouping column recomputes the groups.
///
/// # Errors
///
/// Returns [`Error::EvaluationSize`] naming the group whose result has the
/// wrong size, [`Error::ColumnNotFound`] for an undeclared reference, or any
/// error raised by an expression.
pub fn mutate(frame: &Frame, exprs: &[Expr]) -> Result<Frame> {
    let table = mutate_table(frame, exprs)?;
    let touches_keys = exprs
        .iter()
        .any(|e| frame.group_vars().iter().any(|v| v == e.name()));
    if touches_keys {
        Frame::regroup(table, frame.group_vars())
    } else {
        Ok(Frame::with_groups(table, Arc::clone(frame.groups())))
    }
}

/// Like [`mutate`], but keeps only the grouping columns and the new ones.
///
/// # Errors
///
/// Same as [`mutate`].
pub fn transmute(frame: &Frame, exprs: &[Expr]) -> Result<Frame> {
    let table = mutate_table(frame, exprs)?;
    let mut keep: Vec<&str> = frame.group_vars().iter().map(String::as_str).collect();
    for expr in exprs {
        if !keep.contains(&expr.name()) {
            keep.push(expr.name());
        }
    }
    let table = table.project(&keep)?;
    Frame::regroup(table, frame.group_vars())
}

/// Reduces each group to a block of rows.
///
/// Every expression's result within a group must have size 1 or one size
/// shared by the group's other results; that size is the height of the
/// group's block. Blocks are stacked in canonical group order, prefixed by
/// the group's key columns. The result is grouped by every grouping
/// variable but the last.
///
/// # Errors
///
/// Returns [`Error::GroupingConflict`] if an expression is named after a
/// grouping variable and [`Error::EvaluationSize`] if a group's results
/// disagree in size.
pub fn summarise(frame: &Frame, exprs: &[Expr]) -> Result<Frame> {
    let vars = frame.group_vars();
    if let Some(conflict) = exprs.iter().find(|e| vars.iter().any(|v| v == e.name())) {
        return Err(Error::grouping_conflict(conflict.name()));
    }
    mask::check_refs(frame.table(), exprs)?;
    let groups = frame.groups();
    let results = eval_all(frame, exprs, Mode::Summary)?;

    let mut key_rows = Vec::new();
    let mut blocks: Vec<Vec<Vector>> = Vec::with_capacity(results.len());
    for (g, values) in results.iter().enumerate() {
        let mut height: Option<usize> = None;
        for (expr, v) in exprs.iter().zip(values) {
            match (v.len(), height) {
                (1, _) => {}
                (m, None) => height = Some(m),
                (m, Some(h)) if m == h => {}
                (m, Some(h)) => {
                    let group = if groups.is_empty() {
                        "<empty>".to_string()
                    } else {
                        groups.describe(g)
                    };
                    return Err(Error::evaluation_size(expr.name(), group, h, m));
                }
            }
        }
        let height = if groups.is_empty() { 0 } else { height.unwrap_or(1) };
        if !groups.is_empty() {
            key_rows.extend(std::iter::repeat(g).take(height));
        }
        blocks.push(
            values
                .iter()
                .map(|v| if v.len() == height { (**v).clone() } else { v.broadcast(height) })
                .collect(),
        );
    }

    let mut table = groups.keys().project(vars)?.take(&key_rows);
    for (e, expr) in exprs.iter().enumerate() {
        let chunks: Vec<&Vector> = blocks.iter().map(|b| &b[e]).collect();
        let column = combine(expr.name(), groups, &chunks)?;
        table = table.with_column(expr.name(), Arc::new(column))?;
    }

    let rolled = peel_last(vars);
    tracing::debug!(
        groups = groups.len(),
        rows = table.num_rows(),
        regrouped_by = ?rolled,
        "summarised"
    );
    Frame::grouped(table, &rolled)
}

/// Keeps the rows for which every predicate is true.
///
/// Predicates are evaluated per group and must yield booleans, one per row
/// or one for the whole group. Missing counts as false. Kept rows retain
/// their original order and group membership.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] for a non-boolean predicate and
/// [`Error::EvaluationSize`] for a wrongly sized one.
pub fn filter(frame: &Frame, predicates: &[Expr]) -> Result<Frame> {
    mask::check_refs(frame.table(), predicates)?;
    let groups = frame.groups();
    if groups.is_empty() {
        return Ok(frame.clone());
    }
    let results = eval_all(frame, predicates, Mode::Predicate)?;

    let mut kept = Vec::new();
    for (rows, values) in groups.rows().iter().zip(&results) {
        let mut keep = vec![true; rows.len()];
        for (pred, value) in predicates.iter().zip(values) {
            match value.as_ref() {
                Vector::Boolean(flags) => {
                    for (k, flag) in keep.iter_mut().zip(flags) {
                        *k &= *flag == Some(true);
                    }
                }
                Vector::Null(_) => keep.iter_mut().for_each(|k| *k = false),
                other => {
                    return Err(Error::invalid_input(format!(
                        "filter condition `{}` must be a boolean vector, not <{}>",
                        pred.name(),
                        other.vtype()
                    )))
                }
            }
        }
        kept.extend(rows.iter().zip(keep).filter(|(_, k)| *k).map(|(&r, _)| r));
    }

    if kept.len() == frame.num_rows() {
        return Ok(frame.clone());
    }
    kept.sort_unstable();
    tracing::debug!(kept = kept.len(), of = frame.num_rows(), "filtered");
    Frame::grouped(frame.table().take(&kept), frame.group_vars())
}
