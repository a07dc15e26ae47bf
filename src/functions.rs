//! Summary functions over a single vector.
//!
//! Each returns a size-1 vector and skips missing values, so they slot
//! directly into [`crate::Expr::map`] and [`crate::Across`].

use std::collections::HashSet;

use crate::{
    error::{Error, Result},
    vector::Vector,
};

fn count(n: usize) -> Vector {
    Vector::Integer(vec![i64::try_from(n).ok()])
}

/// Sum of the non-missing values.
///
/// Integer and boolean inputs sum to an integer (missing on overflow);
/// doubles sum to a double.
///
/// # Errors
///
/// Returns an error for non-numeric vectors.
pub fn sum(v: &Vector) -> Result<Vector> {
    match v {
        Vector::Boolean(xs) => Ok(count(xs.iter().filter(|b| **b == Some(true)).count())),
        Vector::Integer(xs) => Ok(Vector::Integer(vec![xs
            .iter()
            .flatten()
            .try_fold(0_i64, |acc, x| acc.checked_add(*x))])),
        _ => {
            let xs = v.to_f64()?;
            Ok(Vector::Double(vec![Some(xs.iter().flatten().sum())]))
        }
    }
}

/// Arithmetic mean of the non-missing values; missing when there are none.
///
/// # Errors
///
/// Returns an error for non-numeric vectors.
#[allow(clippy::cast_precision_loss)]
pub fn mean(v: &Vector) -> Result<Vector> {
    let xs: Vec<f64> = v.to_f64()?.into_iter().flatten().collect();
    let mean = (!xs.is_empty()).then(|| xs.iter().sum::<f64>() / xs.len() as f64);
    Ok(Vector::Double(vec![mean]))
}

fn extreme(v: &Vector, want_max: bool) -> Result<Vector> {
    let pick = |a: std::cmp::Ordering| {
        if want_max {
            a.is_gt()
        } else {
            a.is_lt()
        }
    };
    let mut best: Option<usize> = None;
    for i in 0..v.len() {
        if v.is_missing(i) {
            continue;
        }
        let better = match best {
            None => true,
            Some(b) => pick(v.key(i)?.cmp(&v.key(b)?)),
        };
        if better {
            best = Some(i);
        }
    }
    Ok(match best {
        Some(i) => v.take(&[i]),
        None => Vector::missing(&v.vtype(), 1),
    })
}

/// Smallest non-missing value, keeping the input type.
///
/// # Errors
///
/// Returns an error for list and record vectors.
pub fn min(v: &Vector) -> Result<Vector> {
    extreme(v, false)
}

/// Largest non-missing value, keeping the input type.
///
/// # Errors
///
/// Returns an error for list and record vectors.
pub fn max(v: &Vector) -> Result<Vector> {
    extreme(v, true)
}

/// First element, missing or not.
///
/// # Errors
///
/// Returns an error for an empty vector.
pub fn first(v: &Vector) -> Result<Vector> {
    match v.len() {
        0 => Err(Error::invalid_input("first() of an empty vector")),
        _ => Ok(v.take(&[0])),
    }
}

/// Last element, missing or not.
///
/// # Errors
///
/// Returns an error for an empty vector.
pub fn last(v: &Vector) -> Result<Vector> {
    match v.len() {
        0 => Err(Error::invalid_input("last() of an empty vector")),
        n => Ok(v.take(&[n - 1])),
    }
}

/// Number of distinct non-missing values.
///
/// # Errors
///
/// Returns an error for list and record vectors.
pub fn n_distinct(v: &Vector) -> Result<Vector> {
    let mut seen = HashSet::new();
    for i in 0..v.len() {
        if !v.is_missing(i) {
            seen.insert(v.key(i)?);
        }
    }
    Ok(count(seen.len()))
}

/// Number of missing values.
///
/// # Errors
///
/// Never fails; the signature matches the other summaries.
#[allow(clippy::unnecessary_wraps)]
pub fn n_missing(v: &Vector) -> Result<Vector> {
    Ok(count((0..v.len()).filter(|&i| v.is_missing(i)).count()))
}
