//! Row operations: ordering and sampling.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::Verb;
use crate::{
    error::Result,
    group::Frame,
    sample::{sample_frac, sample_n, SampleOptions, SampleSize},
    vector::{compare_keys, Key},
};

/// Sort order for the Arrange verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortOrder {
    /// Ascending order (smallest to largest)
    #[default]
    Ascending,
    /// Descending order (largest to smallest)
    Descending,
}

/// A verb that sorts rows by one or more columns.
///
/// The sort is stable and missing values sort last in either direction.
/// With [`Arrange::by_group`], rows are ordered by the grouping columns
/// first.
///
/// # Example
///
/// ```ignore
/// use wrangle::{Arrange, SortOrder};
///
/// // Sort by single column ascending
/// let arrange = Arrange::by("age");
///
/// // Sort by column descending
/// let arrange = Arrange::by("score").order(SortOrder::Descending);
///
/// // Sort by multiple columns
/// let arrange = Arrange::by_columns(vec![("name", SortOrder::Ascending), ("age", SortOrder::Descending)]);
/// ```
#[derive(Debug, Clone)]
pub struct Arrange {
    columns: Vec<(String, SortOrder)>,
    by_group: bool,
}

impl Arrange {
    /// Creates an Arrange verb for a single column (ascending by default).
    pub fn by<S: Into<String>>(column: S) -> Self {
        Self {
            columns: vec![(column.into(), SortOrder::Ascending)],
            by_group: false,
        }
    }

    /// Creates an Arrange verb for multiple columns with specified orders.
    pub fn by_columns<S: Into<String>>(columns: impl IntoIterator<Item = (S, SortOrder)>) -> Self {
        Self {
            columns: columns
                .into_iter()
                .map(|(name, order)| (name.into(), order))
                .collect(),
            by_group: false,
        }
    }

    /// Sets the sort order for a single-column sort.
    #[must_use]
    pub fn order(mut self, order: SortOrder) -> Self {
        if let Some((_, o)) = self.columns.first_mut() {
            *o = order;
        }
        self
    }

    /// Sorts by the grouping columns (ascending) before the given columns.
    #[must_use]
    pub fn by_group(mut self, by_group: bool) -> Self {
        self.by_group = by_group;
        self
    }

    /// Returns the sort columns and their orders.
    pub fn columns(&self) -> &[(String, SortOrder)] {
        &self.columns
    }
}

impl Verb for Arrange {
    fn apply(&self, frame: Frame) -> Result<Frame> {
        let mut keys: Vec<(String, SortOrder)> = Vec::new();
        if self.by_group {
            keys.extend(
                frame
                    .group_vars()
                    .iter()
                    .map(|v| (v.clone(), SortOrder::Ascending)),
            );
        }
        keys.extend(self.columns.iter().cloned());

        let table = frame.table();
        let mut sort_keys: Vec<(Vec<Key>, bool)> = Vec::with_capacity(keys.len());
        for (name, order) in &keys {
            let column = table.require(name)?;
            let values = (0..table.num_rows())
                .map(|i| column.key(i))
                .collect::<Result<Vec<_>>>()?;
            sort_keys.push((values, *order == SortOrder::Descending));
        }

        let mut indices: Vec<usize> = (0..table.num_rows()).collect();
        indices.sort_by(|&a, &b| {
            sort_keys
                .iter()
                .map(|(values, desc)| compare_keys(&values[a], &values[b], *desc))
                .find(|o| *o != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
        });

        if indices.iter().enumerate().all(|(i, &r)| i == r) {
            return Ok(frame);
        }
        Frame::regroup(table.take(&indices), frame.group_vars())
    }
}

/// A verb that draws a number of rows from each group.
///
/// # Example
///
/// ```ignore
/// use wrangle::{SampleN, SampleSize};
///
/// let sample = SampleN::new(SampleSize::Count(10)).with_seed(42);
/// ```
#[derive(Debug, Clone)]
pub struct SampleN {
    size: SampleSize,
    options: SampleOptions,
}

impl SampleN {
    /// Creates a SampleN verb drawing `size` rows per group.
    pub fn new(size: SampleSize) -> Self {
        Self {
            size,
            options: SampleOptions::new(),
        }
    }

    /// Replaces the sampling options.
    #[must_use]
    pub fn with_options(mut self, options: SampleOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets a seed for reproducible sampling.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.options.seed = Some(seed);
        self
    }

    /// Returns the sampling options.
    pub fn options(&self) -> &SampleOptions {
        &self.options
    }
}

impl Default for SampleN {
    /// Draws every row of each group.
    fn default() -> Self {
        Self::new(SampleSize::default())
    }
}

impl Verb for SampleN {
    fn apply(&self, frame: Frame) -> Result<Frame> {
        sample_n(&frame, self.size.clone(), &self.options)
    }
}

/// A verb that draws a fraction of each group's rows.
#[derive(Debug, Clone)]
pub struct SampleFrac {
    fraction: f64,
    options: SampleOptions,
}

impl SampleFrac {
    /// Creates a SampleFrac verb.
    pub fn new(fraction: f64) -> Self {
        Self {
            fraction,
            options: SampleOptions::new(),
        }
    }

    /// Replaces the sampling options.
    #[must_use]
    pub fn with_options(mut self, options: SampleOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets a seed for reproducible sampling.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.options.seed = Some(seed);
        self
    }

    /// Returns the sample fraction.
    pub fn fraction(&self) -> f64 {
        self.fraction
    }
}

impl Verb for SampleFrac {
    fn apply(&self, frame: Frame) -> Result<Frame> {
        sample_frac(&frame, self.fraction, &self.options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{table::Table, vector::Vector};

    fn frame() -> Frame {
        let t = Table::new(vec![
            ("g", Vector::from(vec!["b", "a", "b", "a"])),
            ("x", Vector::from(vec![Some(3.0), None, Some(1.0), Some(2.0)])),
        ])
        .unwrap();
        Frame::grouped(t, &["g"]).unwrap()
    }

    #[test]
    fn test_arrange_missing_last() {
        let out = Arrange::by("x").apply(frame()).unwrap();
        assert_eq!(
            *out.pull("x").unwrap(),
            Vector::from(vec![Some(1.0), Some(2.0), Some(3.0), None])
        );
        // groups recomputed against the new row order
        assert_eq!(out.group_rows(), &[vec![1, 3], vec![0, 2]]);
    }

    #[test]
    fn test_arrange_descending_missing_still_last() {
        let out = Arrange::by("x")
            .order(SortOrder::Descending)
            .apply(frame())
            .unwrap();
        assert_eq!(
            *out.pull("x").unwrap(),
            Vector::from(vec![Some(3.0), Some(2.0), Some(1.0), None])
        );
    }

    #[test]
    fn test_arrange_by_group() {
        let out = Arrange::by("x").by_group(true).apply(frame()).unwrap();
        assert_eq!(
            *out.pull("g").unwrap(),
            Vector::from(vec!["a", "a", "b", "b"])
        );
        assert_eq!(
            *out.pull("x").unwrap(),
            Vector::from(vec![Some(2.0), None, Some(1.0), Some(3.0)])
        );
    }

    #[test]
    fn test_arrange_is_stable() {
        let out = Arrange::by("g").apply(frame()).unwrap();
        assert_eq!(
            *out.pull("x").unwrap(),
            Vector::from(vec![None, Some(2.0), Some(3.0), Some(1.0)])
        );
    }

    #[test]
    fn test_sample_verbs() {
        let out = SampleN::new(SampleSize::Count(1))
            .with_seed(1)
            .apply(frame())
            .unwrap();
        assert_eq!(out.group_size(), vec![1, 1]);
        let out = SampleFrac::new(1.0).with_seed(1).apply(frame()).unwrap();
        assert_eq!(out.num_rows(), 4);
    }

    #[test]
    fn test_sample_n_default_keeps_group_sizes() {
        let f = frame();
        let out = SampleN::default().with_seed(3).apply(f.clone()).unwrap();
        assert_eq!(out.group_size(), f.group_size());
    }

    #[test]
    fn test_sort_order_serde() {
        let json = serde_json::to_string(&SortOrder::Descending).unwrap();
        assert_eq!(json, "\"Descending\"");
    }
}
