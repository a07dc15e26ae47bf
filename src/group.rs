//! Grouping structure: partitioning a table's rows by key columns.
//!
//! A [`Frame`] is a [`Table`] plus its [`Groups`]. The partition is a
//! disjoint cover of the row indices, ordered canonically by ascending key
//! (missing keys last). It is never patched in place: whenever rows or
//! grouping columns change, the partition is recomputed.

use std::{collections::HashMap, sync::Arc};

use crate::{
    error::{Error, Result},
    table::Table,
    vector::{Key, VectorRef},
};

/// Row partition of a table.
#[derive(Debug, Clone, PartialEq)]
pub struct Groups {
    vars: Vec<String>,
    keys: Table,
    rows: Vec<Vec<usize>>,
}

impl Groups {
    /// The partition of an ungrouped table: one group holding every row.
    pub fn ungrouped(num_rows: usize) -> Self {
        Self {
            vars: Vec::new(),
            keys: Table::empty(1),
            rows: vec![(0..num_rows).collect()],
        }
    }

    /// Partitions `table` by the distinct combinations of `vars`.
    ///
    /// Groups are ordered lexicographically by key, in `vars` order, with
    /// missing keys last. Row indices within a group are ascending.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is not a column, is repeated, or holds
    /// list or record values.
    pub fn compute<S: AsRef<str>>(table: &Table, vars: &[S]) -> Result<Self> {
        if vars.is_empty() {
            return Ok(Self::ungrouped(table.num_rows()));
        }
        let vars: Vec<String> = vars.iter().map(|v| v.as_ref().to_string()).collect();
        for (i, var) in vars.iter().enumerate() {
            if vars[..i].contains(var) {
                return Err(Error::usage(format!(
                    "grouping variable `{var}` is given more than once"
                )));
            }
        }
        let key_columns = vars
            .iter()
            .map(|v| table.require(v).map(Arc::clone))
            .collect::<Result<Vec<VectorRef>>>()?;

        let mut buckets: HashMap<Vec<Key>, usize> = HashMap::new();
        let mut bucket_keys: Vec<Vec<Key>> = Vec::new();
        let mut bucket_rows: Vec<Vec<usize>> = Vec::new();
        for row in 0..table.num_rows() {
            let key = key_columns
                .iter()
                .map(|c| c.key(row))
                .collect::<Result<Vec<_>>>()?;
            let id = match buckets.get(&key) {
                Some(&id) => id,
                None => {
                    let id = bucket_rows.len();
                    buckets.insert(key.clone(), id);
                    bucket_keys.push(key);
                    bucket_rows.push(Vec::new());
                    id
                }
            };
            bucket_rows[id].push(row);
        }

        let mut order: Vec<usize> = (0..bucket_rows.len()).collect();
        order.sort_by(|&a, &b| bucket_keys[a].cmp(&bucket_keys[b]));

        let first_rows: Vec<usize> = order.iter().map(|&b| bucket_rows[b][0]).collect();
        let keys = table.project(&vars)?.take(&first_rows);
        let rows = order
            .into_iter()
            .map(|b| std::mem::take(&mut bucket_rows[b]))
            .collect();

        Ok(Self { vars, keys, rows })
    }

    /// Returns the grouping variables.
    pub fn vars(&self) -> &[String] {
        &self.vars
    }

    /// Returns the key table: one row per group, in canonical order.
    pub fn keys(&self) -> &Table {
        &self.keys
    }

    /// Returns the row indices of each group, in canonical order.
    pub fn rows(&self) -> &[Vec<usize>] {
        &self.rows
    }

    /// Returns the number of groups.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if there are no groups.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Describes group `g` by its key, e.g. `g = "a", h = 1`.
    pub fn describe(&self, g: usize) -> String {
        if self.vars.is_empty() {
            return "<ungrouped>".to_string();
        }
        self.vars
            .iter()
            .zip(self.keys.columns())
            .map(|(var, col)| {
                let value = if g < col.len() {
                    col.describe(g)
                } else {
                    "?".to_string()
                };
                format!("{var} = {value}")
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Grouping variables left after summarising: every key but the last.
///
/// Summarising a table grouped by `(g1, g2)` yields one row per `(g1, g2)`
/// combination, still grouped by `g1`.
pub fn peel_last(vars: &[String]) -> Vec<String> {
    match vars.split_last() {
        Some((_, rest)) => rest.to_vec(),
        None => Vec::new(),
    }
}

/// A table together with its grouping structure.
///
/// An ungrouped frame has no grouping variables and a single group holding
/// all rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    table: Table,
    groups: Arc<Groups>,
}

impl Frame {
    /// Wraps a table as an ungrouped frame.
    pub fn new(table: Table) -> Self {
        let groups = Arc::new(Groups::ungrouped(table.num_rows()));
        Self { table, groups }
    }

    /// Groups a table by the given columns.
    ///
    /// # Errors
    ///
    /// Returns an error if a column is missing or unsuitable as a key.
    pub fn grouped<S: AsRef<str>>(table: Table, vars: &[S]) -> Result<Self> {
        let groups = Arc::new(Groups::compute(&table, vars)?);
        Ok(Self { table, groups })
    }

    /// Regroups this frame's table by `vars`, replacing any existing
    /// grouping.
    ///
    /// # Errors
    ///
    /// Returns an error if a column is missing or unsuitable as a key.
    pub fn group_by<S: AsRef<str>>(&self, vars: &[S]) -> Result<Self> {
        Self::grouped(self.table.clone(), vars)
    }

    /// Drops the grouping.
    pub fn ungroup(&self) -> Self {
        Self::new(self.table.clone())
    }

    /// Builds a frame over `table` grouped by those of `vars` still present.
    ///
    /// Variables that no longer name a column are dropped from the grouping
    /// with a warning.
    ///
    /// # Errors
    ///
    /// Returns an error if a remaining key is unsuitable.
    pub fn regroup(table: Table, vars: &[String]) -> Result<Self> {
        let kept: Vec<&String> = vars
            .iter()
            .filter(|v| {
                let present = table.column_index(v).is_some();
                if !present {
                    tracing::warn!(column = %v, "grouping column no longer present; dropped from grouping");
                }
                present
            })
            .collect();
        Self::grouped(table, &kept)
    }

    /// Pairs a table with a partition computed for identical rows.
    pub(crate) fn with_groups(table: Table, groups: Arc<Groups>) -> Self {
        Self { table, groups }
    }

    /// Returns the underlying table.
    pub fn table(&self) -> &Table {
        &self.table
    }

    /// Consumes the frame, returning the underlying table.
    pub fn into_table(self) -> Table {
        self.table
    }

    /// Returns the grouping structure.
    pub fn groups(&self) -> &Arc<Groups> {
        &self.groups
    }

    /// Returns true if the frame has grouping variables.
    pub fn is_grouped(&self) -> bool {
        !self.groups.vars.is_empty()
    }

    /// Returns the grouping variables.
    pub fn group_vars(&self) -> &[String] {
        &self.groups.vars
    }

    /// Returns the row indices of each group, in canonical order.
    pub fn group_rows(&self) -> &[Vec<usize>] {
        &self.groups.rows
    }

    /// Returns the distinct keys, one row per group, in canonical order.
    pub fn group_keys(&self) -> &Table {
        &self.groups.keys
    }

    /// Returns the number of groups.
    pub fn n_groups(&self) -> usize {
        self.groups.len()
    }

    /// Returns the number of rows in each group.
    pub fn group_size(&self) -> Vec<usize> {
        self.groups.rows.iter().map(Vec::len).collect()
    }

    /// Returns, for each row, the index of its group.
    pub fn group_indices(&self) -> Vec<usize> {
        let mut out = vec![0; self.table.num_rows()];
        for (g, rows) in self.groups.rows.iter().enumerate() {
            for &r in rows {
                out[r] = g;
            }
        }
        out
    }

    /// Returns the number of rows.
    pub fn num_rows(&self) -> usize {
        self.table.num_rows()
    }

    /// Extracts a single column.
    ///
    /// # Errors
    ///
    /// Returns an error if the column does not exist.
    pub fn pull(&self, name: &str) -> Result<VectorRef> {
        self.table.require(name).map(Arc::clone)
    }
}

impl From<Table> for Frame {
    fn from(table: Table) -> Self {
        Self::new(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::Vector;

    fn table() -> Table {
        Table::new(vec![
            ("g", Vector::from(vec![Some("b"), Some("a"), None, Some("b"), Some("a")])),
            ("h", Vector::from(vec![2_i64, 1, 1, 1, 1])),
            ("x", Vector::from(vec![1.0, 2.0, 3.0, 4.0, 5.0])),
        ])
        .unwrap()
    }

    #[test]
    fn test_partition_is_ordered_with_missing_last() {
        let f = Frame::grouped(table(), &["g"]).unwrap();
        assert_eq!(f.group_rows(), &[vec![1, 4], vec![0, 3], vec![2]]);
        assert_eq!(
            **f.group_keys().column("g").unwrap(),
            Vector::from(vec![Some("a"), Some("b"), None])
        );
    }

    #[test]
    fn test_multi_key_partition() {
        let f = Frame::grouped(table(), &["g", "h"]).unwrap();
        assert_eq!(f.n_groups(), 4);
        assert_eq!(f.group_rows()[1], vec![3]); // b, 1
        assert_eq!(f.group_rows()[2], vec![0]); // b, 2
        assert_eq!(f.group_vars(), &["g", "h"]);
    }

    #[test]
    fn test_partition_covers_rows() {
        let f = Frame::grouped(table(), &["h"]).unwrap();
        let mut all: Vec<usize> = f.group_rows().iter().flatten().copied().collect();
        all.sort_unstable();
        assert_eq!(all, vec![0, 1, 2, 3, 4]);
        assert_eq!(f.group_indices(), vec![1, 0, 0, 0, 0]);
    }

    #[test]
    fn test_empty_table_has_no_groups_but_keeps_key_types() {
        let t = Table::new(vec![("g", Vector::Integer(vec![]))]).unwrap();
        let f = Frame::grouped(t, &["g"]).unwrap();
        assert_eq!(f.n_groups(), 0);
        assert_eq!(**f.group_keys().column("g").unwrap(), Vector::Integer(vec![]));
    }

    #[test]
    fn test_ungrouped_is_single_group() {
        let f = Frame::new(table());
        assert!(!f.is_grouped());
        assert_eq!(f.group_size(), vec![5]);
        assert_eq!(f.group_keys().num_rows(), 1);
    }

    #[test]
    fn test_unknown_and_repeated_vars() {
        assert!(matches!(
            Frame::grouped(table(), &["nope"]),
            Err(Error::ColumnNotFound { .. })
        ));
        assert!(matches!(
            Frame::grouped(table(), &["g", "g"]),
            Err(Error::Usage { .. })
        ));
    }

    #[test]
    fn test_peel_last() {
        let vars = vec!["g1".to_string(), "g2".to_string()];
        assert_eq!(peel_last(&vars), vec!["g1".to_string()]);
        assert!(peel_last(&vars[..1]).is_empty());
        assert!(peel_last(&[]).is_empty());
    }

    #[test]
    fn test_regroup_drops_missing_vars() {
        let f = Frame::regroup(
            table().project(&["g", "x"]).unwrap(),
            &["g".to_string(), "h".to_string()],
        )
        .unwrap();
        assert_eq!(f.group_vars(), &["g"]);
    }

    #[test]
    fn test_describe_group() {
        let f = Frame::grouped(table(), &["g", "h"]).unwrap();
        assert_eq!(f.groups().describe(0), "g = \"a\", h = 1");
    }
}
