//! Random row sampling, optionally weighted, per group.
//!
//! Grouped frames are sampled independently within each group, each group
//! using its own row count and its own slice of the weights. The sampled
//! rows are stacked in canonical group order and the result keeps the input's
//! grouping.

use std::{fmt, sync::Arc};

use rand::{
    distributions::{Distribution, WeightedIndex},
    rngs::StdRng,
    seq::index,
    Rng, SeedableRng,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    group::Frame,
};

/// How many rows to draw from each group.
///
/// The default, [`SampleSize::All`], draws as many rows as the group has;
/// combined with replacement it gives a bootstrap resample.
#[derive(Clone, Default)]
pub enum SampleSize {
    /// As many rows as the group has.
    #[default]
    All,
    /// A fixed number of rows.
    Count(usize),
    /// A fraction of the group's rows, rounded to the nearest row with ties
    /// going to the even count.
    Fraction(f64),
    /// Computed from the group's row count, e.g. `|n| n as i64 - 2`.
    PerGroup(Arc<dyn Fn(usize) -> i64 + Send + Sync>),
}

impl fmt::Debug for SampleSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("All"),
            Self::Count(n) => f.debug_tuple("Count").field(n).finish(),
            Self::Fraction(x) => f.debug_tuple("Fraction").field(x).finish(),
            Self::PerGroup(_) => f.write_str("PerGroup(<fn>)"),
        }
    }
}

impl SampleSize {
    /// Computes the size from each group's row count.
    pub fn per_group<F>(func: F) -> Self
    where
        F: Fn(usize) -> i64 + Send + Sync + 'static,
    {
        Self::PerGroup(Arc::new(func))
    }

    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    fn resolve(&self, n: usize) -> Result<usize> {
        match self {
            Self::All => Ok(n),
            Self::Count(k) => Ok(*k),
            Self::Fraction(f) => {
                if !f.is_finite() || *f < 0.0 {
                    return Err(Error::invalid_input(format!(
                        "sample fraction must be a non-negative number, got {f}"
                    )));
                }
                Ok(((n as f64) * f).round_ties_even() as usize)
            }
            Self::PerGroup(func) => {
                let k = func(n);
                usize::try_from(k).map_err(|_| {
                    Error::invalid_input(format!("sample size must be non-negative, got {k}"))
                })
            }
        }
    }
}

/// Sampling weights, aligned with the table's rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Weight {
    /// Weights read from a numeric column.
    Column(String),
    /// Explicit weights, one per row.
    Values(Vec<f64>),
}

/// Options shared by [`sample_n`] and [`sample_frac`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleOptions {
    /// Draw probabilities, proportional to weight; uniform when absent.
    pub weight: Option<Weight>,
    /// Draw with replacement.
    pub replace: bool,
    /// Seed for reproducible draws.
    pub seed: Option<u64>,
}

impl SampleOptions {
    /// Creates uniform, without-replacement options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the weights.
    #[must_use]
    pub fn with_weight(mut self, weight: Weight) -> Self {
        self.weight = Some(weight);
        self
    }

    /// Enables or disables replacement.
    #[must_use]
    pub fn with_replace(mut self, replace: bool) -> Self {
        self.replace = replace;
        self
    }

    /// Sets a seed for reproducible sampling.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

fn resolve_weights(frame: &Frame, weight: &Weight) -> Result<Vec<f64>> {
    let values = match weight {
        Weight::Values(v) => v.iter().map(|w| Some(*w)).collect(),
        Weight::Column(name) => frame.table().require(name)?.to_f64()?,
    };
    if values.len() != frame.num_rows() {
        return Err(Error::invalid_input(format!(
            "weights length {} doesn't match row count {}",
            values.len(),
            frame.num_rows()
        )));
    }
    values
        .into_iter()
        .enumerate()
        .map(|(i, w)| match w {
            Some(w) if w.is_finite() && w >= 0.0 => Ok(w),
            _ => Err(Error::invalid_input(format!(
                "weight at row {i} must be a finite non-negative number"
            ))),
        })
        .collect()
}

fn draw_weighted(rng: &mut StdRng, weights: &[f64], k: usize, replace: bool) -> Result<Vec<usize>> {
    let mut dist = WeightedIndex::new(weights)
        .map_err(|e| Error::invalid_input(format!("invalid sampling weights: {e}")))?;
    if replace {
        return Ok((0..k).map(|_| dist.sample(rng)).collect());
    }
    let mut out = Vec::with_capacity(k);
    for i in 0..k {
        let pick = dist.sample(rng);
        out.push(pick);
        if i + 1 < k {
            dist.update_weights(&[(pick, &0.0)])
                .map_err(|e| Error::invalid_input(format!("invalid sampling weights: {e}")))?;
        }
    }
    Ok(out)
}

fn sample_frame(frame: &Frame, size: &SampleSize, options: &SampleOptions) -> Result<Frame> {
    let weights = options
        .weight
        .as_ref()
        .map(|w| resolve_weights(frame, w))
        .transpose()?;
    let mut rng = match options.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let groups = frame.groups();
    let mut picked = Vec::new();
    for (g, rows) in groups.rows().iter().enumerate() {
        let n = rows.len();
        let k = size.resolve(n)?;
        let group_weights: Option<Vec<f64>> = weights
            .as_ref()
            .map(|w| rows.iter().map(|&r| w[r]).collect());
        let available = match &group_weights {
            Some(w) if !options.replace => w.iter().filter(|&&x| x > 0.0).count(),
            _ => n,
        };
        if k > 0 && (available == 0 || (!options.replace && k > available)) {
            return Err(Error::insufficient_rows(groups.describe(g), k, available));
        }
        if k == 0 {
            continue;
        }
        let positions = match (&group_weights, options.replace) {
            (Some(w), replace) => draw_weighted(&mut rng, w, k, replace)?,
            (None, true) => (0..k).map(|_| rng.gen_range(0..n)).collect(),
            (None, false) => index::sample(&mut rng, n, k).into_vec(),
        };
        picked.extend(positions.into_iter().map(|p| rows[p]));
    }

    tracing::debug!(groups = groups.len(), rows = picked.len(), "sampled");
    Frame::grouped(frame.table().take(&picked), frame.group_vars())
}

/// Draws a number of rows from each group.
///
/// # Errors
///
/// Returns [`Error::InsufficientRows`] if a group has fewer rows (or rows
/// with positive weight) than requested without replacement, and
/// [`Error::InvalidInput`] for bad weights or a negative size.
pub fn sample_n(frame: &Frame, size: SampleSize, options: &SampleOptions) -> Result<Frame> {
    sample_frame(frame, &size, options)
}

/// Draws a fraction of each group's rows.
///
/// # Errors
///
/// Same as [`sample_n`]; a fraction above 1 needs replacement.
pub fn sample_frac(frame: &Frame, fraction: f64, options: &SampleOptions) -> Result<Frame> {
    sample_frame(frame, &SampleSize::Fraction(fraction), options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{table::Table, vector::Vector};

    fn grouped(sizes: &[usize]) -> Frame {
        let mut g = Vec::new();
        let mut x = Vec::new();
        for (i, &s) in sizes.iter().enumerate() {
            for j in 0..s {
                g.push(format!("g{i}"));
                x.push(j as i64);
            }
        }
        let t = Table::new(vec![("g", Vector::from(g)), ("x", Vector::from(x))]).unwrap();
        Frame::grouped(t, &["g"]).unwrap()
    }

    #[test]
    fn test_grouped_count_per_group() {
        let f = grouped(&[5, 7, 4]);
        let out = sample_n(&f, SampleSize::Count(3), &SampleOptions::new().with_seed(1)).unwrap();
        assert_eq!(out.num_rows(), 9);
        assert_eq!(out.group_vars(), &["g"]);
        assert_eq!(out.group_size(), vec![3, 3, 3]);
    }

    #[test]
    fn test_oversample_without_replacement_fails() {
        let f = grouped(&[7]);
        let r = sample_n(&f, SampleSize::Count(10), &SampleOptions::new());
        assert!(matches!(
            r,
            Err(Error::InsufficientRows {
                requested: 10,
                available: 7,
                ..
            })
        ));
    }

    #[test]
    fn test_oversample_with_replacement() {
        let f = grouped(&[2]);
        let opts = SampleOptions::new().with_replace(true).with_seed(3);
        let out = sample_n(&f, SampleSize::Count(10), &opts).unwrap();
        assert_eq!(out.num_rows(), 10);
    }

    #[test]
    fn test_without_replacement_rows_are_distinct() {
        let f = grouped(&[50]);
        let out = sample_n(&f, SampleSize::Count(50), &SampleOptions::new().with_seed(9)).unwrap();
        let mut xs = out.pull("x").unwrap().to_f64().unwrap();
        xs.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let expected: Vec<Option<f64>> = (0..50).map(|i| Some(f64::from(i))).collect();
        assert_eq!(xs, expected);
    }

    #[test]
    fn test_fraction_rounds_per_group() {
        let f = grouped(&[10, 4]);
        let out = sample_frac(&f, 0.5, &SampleOptions::new().with_seed(2)).unwrap();
        assert_eq!(out.group_size(), vec![5, 2]);
    }

    #[test]
    fn test_fraction_ties_round_to_even() {
        let f = grouped(&[5, 1, 3, 7]);
        let out = sample_frac(&f, 0.5, &SampleOptions::new().with_seed(1)).unwrap();
        // 2.5 -> 2, 0.5 -> 0, 1.5 -> 2, 3.5 -> 4
        assert_eq!(out.num_rows(), 8);
        assert_eq!(out.n_groups(), 3);
        assert_eq!(out.group_size(), vec![2, 2, 4]);
    }

    #[test]
    fn test_default_size_is_whole_group() {
        let f = grouped(&[3, 5]);
        let out = sample_n(&f, SampleSize::default(), &SampleOptions::new().with_seed(2)).unwrap();
        assert_eq!(out.group_size(), vec![3, 5]);

        let opts = SampleOptions::new().with_replace(true).with_seed(2);
        let boot = sample_n(&f, SampleSize::All, &opts).unwrap();
        assert_eq!(boot.num_rows(), 8);
        assert_eq!(format!("{:?}", SampleSize::All), "All");
    }

    #[test]
    fn test_per_group_size_uses_group_count() {
        let f = grouped(&[5, 3]);
        let size = SampleSize::per_group(|n| n as i64 - 2);
        let out = sample_n(&f, size, &SampleOptions::new().with_seed(4)).unwrap();
        assert_eq!(out.group_size(), vec![3, 1]);
        let negative = SampleSize::per_group(|n| n as i64 - 10);
        assert!(sample_n(&f, negative, &SampleOptions::new()).is_err());
    }

    #[test]
    fn test_seed_is_reproducible() {
        let f = grouped(&[20]);
        let opts = SampleOptions::new().with_seed(42);
        let a = sample_n(&f, SampleSize::Count(5), &opts).unwrap();
        let b = sample_n(&f, SampleSize::Count(5), &opts).unwrap();
        assert_eq!(a.table(), b.table());
    }

    #[test]
    fn test_weights_concentrate_draws() {
        let f = grouped(&[4]);
        let weights = Weight::Values(vec![0.0, 0.0, 1.0, 0.0]);
        let opts = SampleOptions::new()
            .with_weight(weights)
            .with_replace(true)
            .with_seed(5);
        let out = sample_n(&f, SampleSize::Count(8), &opts).unwrap();
        assert_eq!(*out.pull("x").unwrap(), Vector::from(vec![2_i64; 8]));
    }

    #[test]
    fn test_weighted_without_replacement_needs_positive_weights() {
        let f = grouped(&[4]);
        let opts = SampleOptions::new().with_weight(Weight::Values(vec![1.0, 0.0, 2.0, 0.0]));
        let out = sample_n(&f, SampleSize::Count(2), &opts.clone().with_seed(6)).unwrap();
        let mut xs = out.pull("x").unwrap().to_f64().unwrap();
        xs.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(xs, vec![Some(0.0), Some(2.0)]);
        assert!(matches!(
            sample_n(&f, SampleSize::Count(3), &opts),
            Err(Error::InsufficientRows { .. })
        ));
    }

    #[test]
    fn test_weight_column_and_validation() {
        let f = grouped(&[3]);
        let opts = SampleOptions::new().with_weight(Weight::Column("x".into()));
        // x = 0, 1, 2: row 0 can never be drawn
        let out = sample_n(&f, SampleSize::Count(2), &opts.with_seed(8)).unwrap();
        assert!(!out.pull("x").unwrap().to_f64().unwrap().contains(&Some(0.0)));

        let bad = SampleOptions::new().with_weight(Weight::Values(vec![1.0, -1.0, 1.0]));
        assert!(matches!(
            sample_n(&f, SampleSize::Count(1), &bad),
            Err(Error::InvalidInput { .. })
        ));
        let short = SampleOptions::new().with_weight(Weight::Values(vec![1.0]));
        assert!(sample_n(&f, SampleSize::Count(1), &short).is_err());
    }

    #[test]
    fn test_options_serde() {
        let opts = SampleOptions::new()
            .with_weight(Weight::Column("w".into()))
            .with_replace(true)
            .with_seed(7);
        let json = serde_json::to_string(&opts).unwrap();
        let back: SampleOptions = serde_json::from_str(&json).unwrap();
        assert_eq!(back, opts);
    }
}
