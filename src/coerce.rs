//! Common type and common size resolution across vectors.
//!
//! The type lattice is `null < boolean < integer < double < character`.
//! Factors with identical levels stay factors, otherwise they widen to
//! character. Lists only combine with lists. Records combine field-wise and
//! require the same set of field names.
//!
//! Sizes follow the recycling rule: every input has size 1 or the single
//! common size `n`; size-1 inputs are broadcast to `n`.

use crate::{
    error::{Error, Result},
    vector::{Record, Vector, VectorType},
};

/// Labels vectors by argument position (`..1`, `..2`, ...).
pub fn positional<'a>(vectors: &[&'a Vector]) -> Vec<(String, &'a Vector)> {
    vectors
        .iter()
        .enumerate()
        .map(|(i, v)| (format!("..{}", i + 1), *v))
        .collect()
}

/// Returns the common type of two types, if one exists.
pub fn unify(x: &VectorType, y: &VectorType) -> Option<VectorType> {
    use VectorType as T;

    fn atomic_rank(t: &VectorType) -> Option<u8> {
        match t {
            T::Boolean => Some(0),
            T::Integer => Some(1),
            T::Double => Some(2),
            T::Character => Some(3),
            _ => None,
        }
    }

    match (x, y) {
        (T::Null, t) | (t, T::Null) => Some(t.clone()),
        (T::Factor(a), T::Factor(b)) => Some(if a == b {
            T::Factor(a.clone())
        } else {
            T::Character
        }),
        (T::Factor(_), T::Character) | (T::Character, T::Factor(_)) => Some(T::Character),
        (T::List, T::List) => Some(T::List),
        (T::Record(a), T::Record(b)) => {
            if a.len() != b.len() || !a.iter().all(|(n, _)| b.iter().any(|(m, _)| m == n)) {
                return None;
            }
            a.iter()
                .map(|(name, ta)| {
                    let tb = b.iter().find(|(m, _)| m == name).map(|(_, t)| t)?;
                    unify(ta, tb).map(|t| (name.clone(), t))
                })
                .collect::<Option<Vec<_>>>()
                .map(T::Record)
        }
        _ => {
            let (rx, ry) = (atomic_rank(x)?, atomic_rank(y)?);
            Some(if rx >= ry { x.clone() } else { y.clone() })
        }
    }
}

/// Computes the common type of labelled vectors.
///
/// The result is the left fold of pairwise [`unify`] in input order. An empty
/// input yields [`VectorType::Null`].
///
/// # Errors
///
/// Returns [`Error::IncompatibleType`] naming the offending pair.
pub fn common_type_labeled(args: &[(String, &Vector)]) -> Result<VectorType> {
    let mut acc = VectorType::Null;
    let mut acc_label: Option<&str> = None;
    for (label, v) in args {
        let t = v.vtype();
        match unify(&acc, &t) {
            Some(u) => {
                if t != VectorType::Null {
                    acc_label = Some(label.as_str());
                }
                acc = u;
            }
            None => {
                return Err(Error::incompatible(
                    format!("{} <{acc}>", acc_label.unwrap_or("..0")),
                    format!("{label} <{t}>"),
                    "no common type",
                ))
            }
        }
    }
    Ok(acc)
}

/// Computes the common type of vectors labelled by position.
///
/// # Errors
///
/// Returns [`Error::IncompatibleType`] naming the offending pair.
pub fn common_type(vectors: &[&Vector]) -> Result<VectorType> {
    common_type_labeled(&positional(vectors))
}

/// Computes the common size of labelled vectors.
///
/// An empty input has size 0; inputs that are all size 1 have size 1.
///
/// # Errors
///
/// Returns [`Error::Recycling`] if two inputs have different sizes other
/// than 1.
pub fn common_size_labeled(args: &[(String, &Vector)]) -> Result<usize> {
    let mut fixed: Option<(&str, usize)> = None;
    let mut any = false;
    for (label, v) in args {
        any = true;
        let n = v.len();
        if n == 1 {
            continue;
        }
        match fixed {
            None => fixed = Some((label.as_str(), n)),
            Some((_, m)) if m == n => {}
            Some((x, m)) => return Err(Error::recycling(x, m, label.clone(), n)),
        }
    }
    Ok(match fixed {
        Some((_, n)) => n,
        None if any => 1,
        None => 0,
    })
}

/// Computes the common size of vectors labelled by position.
///
/// # Errors
///
/// Returns [`Error::Recycling`] on a size mismatch.
pub fn common_size(vectors: &[&Vector]) -> Result<usize> {
    common_size_labeled(&positional(vectors))
}

/// Recycles a vector of size 1 or `n` to size `n`.
///
/// # Errors
///
/// Returns [`Error::Recycling`] for any other size.
pub fn recycle(v: &Vector, n: usize, label: &str) -> Result<Vector> {
    match v.len() {
        m if m == n => Ok(v.clone()),
        1 => Ok(v.broadcast(n)),
        m => Err(Error::recycling(label, m, "size", n)),
    }
}

fn lossy(v: &Vector, to: &VectorType, detail: impl Into<String>) -> Error {
    Error::incompatible(format!("<{}>", v.vtype()), format!("<{to}>"), detail)
}

/// Casts a vector to a type.
///
/// Upcasts along the lattice succeed, except integers beyond 2^53 that have
/// no exact double. Downcasts succeed only when no information is lost (e.g.
/// whole doubles to integer, characters that are existing factor levels).
///
/// # Errors
///
/// Returns [`Error::IncompatibleType`] if the cast is impossible or lossy.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
pub fn cast(v: &Vector, to: &VectorType) -> Result<Vector> {
    use VectorType as T;

    if v.vtype() == *to {
        return Ok(v.clone());
    }
    let n = v.len();
    match (v, to) {
        (Vector::Null(_), t) => Ok(Vector::missing(t, n)),
        (_, T::Null) => {
            if (0..n).all(|i| v.is_missing(i)) {
                Ok(Vector::Null(n))
            } else {
                Err(lossy(v, to, "only all-missing vectors cast to null"))
            }
        }

        (Vector::Boolean(b), T::Integer) => Ok(Vector::Integer(
            b.iter().map(|x| x.map(i64::from)).collect(),
        )),
        (Vector::Boolean(b), T::Double) => Ok(Vector::Double(
            b.iter().map(|x| x.map(|x| f64::from(u8::from(x)))).collect(),
        )),
        (Vector::Boolean(b), T::Character) => Ok(Vector::Character(
            b.iter()
                .map(|x| x.map(|x| if x { "TRUE" } else { "FALSE" }.to_string()))
                .collect(),
        )),

        (Vector::Integer(xs), T::Boolean) => xs
            .iter()
            .map(|x| match x {
                None => Ok(None),
                Some(0) => Ok(Some(false)),
                Some(1) => Ok(Some(true)),
                Some(other) => Err(lossy(v, to, format!("value {other} is not 0 or 1"))),
            })
            .collect::<Result<Vec<_>>>()
            .map(Vector::Boolean),
        (Vector::Integer(xs), T::Double) => xs
            .iter()
            .map(|x| match x {
                None => Ok(None),
                Some(x) => {
                    let d = *x as f64;
                    // i64::MAX rounds up to 2^63, which saturates back
                    if d < 9.223_372_036_854_775_808e18 && d as i64 == *x {
                        Ok(Some(d))
                    } else {
                        Err(lossy(v, to, format!("value {x} has no exact double")))
                    }
                }
            })
            .collect::<Result<Vec<_>>>()
            .map(Vector::Double),
        (Vector::Integer(xs), T::Character) => Ok(Vector::Character(
            xs.iter().map(|x| x.map(|x| x.to_string())).collect(),
        )),

        (Vector::Double(xs), T::Boolean) => xs
            .iter()
            .map(|x| match x {
                None => Ok(None),
                Some(x) if x.is_nan() => Ok(None),
                Some(x) if *x == 0.0 => Ok(Some(false)),
                Some(x) if *x == 1.0 => Ok(Some(true)),
                Some(other) => Err(lossy(v, to, format!("value {other} is not 0 or 1"))),
            })
            .collect::<Result<Vec<_>>>()
            .map(Vector::Boolean),
        (Vector::Double(xs), T::Integer) => xs
            .iter()
            .map(|x| match x {
                None => Ok(None),
                Some(x) if x.is_nan() => Ok(None),
                Some(x) if x.fract() == 0.0 && x.abs() < 9.007_199_254_740_992e15 => {
                    Ok(Some(*x as i64))
                }
                Some(other) => Err(lossy(v, to, format!("value {other} is not a whole number"))),
            })
            .collect::<Result<Vec<_>>>()
            .map(Vector::Integer),
        (Vector::Double(xs), T::Character) => Ok(Vector::Character(
            xs.iter()
                .map(|x| x.filter(|x| !x.is_nan()).map(|x| x.to_string()))
                .collect(),
        )),

        (Vector::Character(xs), T::Factor(levels)) => {
            Vector::factor_with_levels(xs, levels.clone()).map_err(|e| lossy(v, to, e.to_string()))
        }
        (Vector::Factor { levels, codes }, T::Character) => Ok(Vector::Character(
            codes
                .iter()
                .map(|c| c.and_then(|c| levels.get(c as usize).cloned()))
                .collect(),
        )),
        (Vector::Factor { levels, codes }, T::Factor(target)) => codes
            .iter()
            .map(|c| match c {
                None => Ok(None),
                Some(c) => {
                    let label = levels.get(*c as usize).map_or("", String::as_str);
                    target
                        .iter()
                        .position(|l| l == label)
                        .map(|p| Some(p as u32))
                        .ok_or_else(|| lossy(v, to, format!("level '{label}' is not in target levels")))
                }
            })
            .collect::<Result<Vec<_>>>()
            .map(|codes| Vector::Factor {
                levels: target.clone(),
                codes,
            }),

        (Vector::Record(r), T::Record(target)) => cast_record(r, target, to),

        _ => Err(Error::incompatible(
            format!("<{}>", v.vtype()),
            format!("<{to}>"),
            "no cast available",
        )),
    }
}

fn cast_record(r: &Record, target: &[(String, VectorType)], to: &VectorType) -> Result<Vector> {
    if r.names().len() != target.len() {
        return Err(Error::incompatible(
            format!("<{}>", Vector::Record(r.clone()).vtype()),
            format!("<{to}>"),
            "records have different fields",
        ));
    }
    let mut names = Vec::with_capacity(target.len());
    let mut fields = Vec::with_capacity(target.len());
    for (name, ty) in target {
        let field = r.field(name).ok_or_else(|| {
            Error::incompatible(
                format!("<{}>", Vector::Record(r.clone()).vtype()),
                format!("<{to}>"),
                format!("field `{name}` is missing"),
            )
        })?;
        names.push(name.clone());
        fields.push(cast(field, ty)?);
    }
    Record::from_parts(names, fields, r.len()).map(Vector::Record)
}

/// Casts labelled vectors to a common type and size.
///
/// `ptype` and `size` override the computed common type and size.
///
/// # Errors
///
/// Returns [`Error::IncompatibleType`] or [`Error::Recycling`] if the inputs
/// can't be brought to a common shape.
pub fn cast_common(
    args: &[(String, &Vector)],
    ptype: Option<&VectorType>,
    size: Option<usize>,
) -> Result<(VectorType, usize, Vec<Vector>)> {
    let vtype = match ptype {
        Some(t) => t.clone(),
        None => common_type_labeled(args)?,
    };
    let n = match size {
        Some(n) => {
            for (label, v) in args {
                if v.len() != 1 && v.len() != n {
                    return Err(Error::recycling(label.clone(), v.len(), "`size`", n));
                }
            }
            n
        }
        None => common_size_labeled(args)?,
    };
    let out = args
        .iter()
        .map(|(label, v)| {
            let v = cast(v, &vtype)?;
            recycle(&v, n, label)
        })
        .collect::<Result<Vec<_>>>()?;
    Ok((vtype, n, out))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(v: &[i64]) -> Vector {
        Vector::from(v.to_vec())
    }

    #[test]
    fn test_atomic_lattice() {
        assert_eq!(
            unify(&VectorType::Boolean, &VectorType::Integer),
            Some(VectorType::Integer)
        );
        assert_eq!(
            unify(&VectorType::Double, &VectorType::Integer),
            Some(VectorType::Double)
        );
        assert_eq!(
            unify(&VectorType::Double, &VectorType::Character),
            Some(VectorType::Character)
        );
        assert_eq!(
            unify(&VectorType::Null, &VectorType::List),
            Some(VectorType::List)
        );
    }

    #[test]
    fn test_factor_levels_widen_to_character() {
        let a = VectorType::Factor(vec!["a".into()]);
        let b = VectorType::Factor(vec!["b".into()]);
        assert_eq!(unify(&a, &a), Some(a.clone()));
        assert_eq!(unify(&a, &b), Some(VectorType::Character));
        assert_eq!(unify(&a, &VectorType::Integer), None);
    }

    #[test]
    fn test_record_field_wise_order_independent() {
        let a = VectorType::Record(vec![
            ("x".into(), VectorType::Integer),
            ("y".into(), VectorType::Boolean),
        ]);
        let b = VectorType::Record(vec![
            ("y".into(), VectorType::Double),
            ("x".into(), VectorType::Double),
        ]);
        assert_eq!(
            unify(&a, &b),
            Some(VectorType::Record(vec![
                ("x".into(), VectorType::Double),
                ("y".into(), VectorType::Double),
            ]))
        );
        let c = VectorType::Record(vec![("x".into(), VectorType::Integer)]);
        assert_eq!(unify(&a, &c), None);
    }

    #[test]
    fn test_common_type_error_names_pair() {
        let chr = Vector::from(vec!["a"]);
        let list = Vector::List(vec![None]);
        let err = common_type(&[&int(&[1]), &chr, &list]).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("..2 <character>"), "{msg}");
        assert!(msg.contains("..3 <list>"), "{msg}");
    }

    #[test]
    fn test_common_type_empty_is_null() {
        assert_eq!(common_type(&[]).unwrap(), VectorType::Null);
    }

    #[test]
    fn test_common_size() {
        assert_eq!(common_size(&[&int(&[1]), &int(&[1, 2, 3])]).unwrap(), 3);
        assert_eq!(common_size(&[&int(&[1]), &int(&[2])]).unwrap(), 1);
        assert_eq!(common_size(&[]).unwrap(), 0);
        assert_eq!(common_size(&[&int(&[]), &int(&[1])]).unwrap(), 0);
    }

    #[test]
    fn test_common_size_mismatch() {
        let err = common_size(&[&int(&[1, 2]), &int(&[1]), &int(&[1, 2, 3])]).unwrap_err();
        match err {
            Error::Recycling {
                x, x_size, y, y_size,
            } => {
                assert_eq!((x.as_str(), x_size), ("..1", 2));
                assert_eq!((y.as_str(), y_size), ("..3", 3));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_cast_double_to_integer_lossless_only() {
        let ok = cast(&Vector::from(vec![1.0, 99.0]), &VectorType::Integer).unwrap();
        assert_eq!(ok, int(&[1, 99]));
        assert!(cast(&Vector::from(vec![1.5]), &VectorType::Integer).is_err());
    }

    #[test]
    fn test_cast_integer_to_double_rejects_inexact() {
        let exact = cast(&int(&[1, 1 << 53, 1 << 60, i64::MIN]), &VectorType::Double).unwrap();
        assert_eq!(exact.to_f64().unwrap()[2], Some(1_152_921_504_606_846_976.0));

        let r = cast(&int(&[(1 << 53) + 1]), &VectorType::Double);
        assert!(matches!(r, Err(Error::IncompatibleType { .. })));
        assert!(cast(&int(&[i64::MAX]), &VectorType::Double).is_err());
    }

    #[test]
    fn test_cast_character_to_factor() {
        let levels = vec!["lo".to_string(), "hi".to_string()];
        let f = cast(&Vector::from(vec!["hi", "lo"]), &VectorType::Factor(levels.clone())).unwrap();
        assert_eq!(
            f,
            Vector::Factor {
                levels: levels.clone(),
                codes: vec![Some(1), Some(0)]
            }
        );
        assert!(cast(&Vector::from(vec!["mid"]), &VectorType::Factor(levels)).is_err());
    }

    #[test]
    fn test_cast_null_to_anything() {
        let v = cast(&Vector::Null(2), &VectorType::Character).unwrap();
        assert_eq!(v, Vector::Character(vec![None, None]));
    }

    #[test]
    fn test_cast_record_reorders_fields() {
        let r = Record::new(vec![("b", int(&[1])), ("a", Vector::from(vec![true]))]).unwrap();
        let to = VectorType::Record(vec![
            ("a".into(), VectorType::Integer),
            ("b".into(), VectorType::Double),
        ]);
        let out = cast(&Vector::Record(r), &to).unwrap();
        assert_eq!(out.vtype(), to);
    }

    #[test]
    fn test_cast_common_recycles() {
        let one = Vector::from(vec![1.0]);
        let two = int(&[2, 3]);
        let args = positional(&[&one, &two]);
        let (t, n, out) = cast_common(&args, None, None).unwrap();
        assert_eq!(t, VectorType::Double);
        assert_eq!(n, 2);
        assert_eq!(out[0], Vector::from(vec![1.0, 1.0]));
        assert_eq!(out[1], Vector::from(vec![2.0, 3.0]));
    }

    #[test]
    fn test_cast_common_explicit_size_conflict() {
        let one = Vector::from(vec![1.0]);
        let two = int(&[1, 2]);
        let args = positional(&[&one, &two]);
        assert!(matches!(
            cast_common(&args, None, Some(1)),
            Err(Error::Recycling { .. })
        ));
    }
}
