//! Typed column vectors.
//!
//! A [`Vector`] is a closed enumeration over the supported element kinds.
//! Elements are stored as `Option<_>`; `None` marks a missing value. Vectors
//! are never mutated once handed out: operations build new vectors, and
//! tables share unchanged columns through [`VectorRef`].

use std::{fmt, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

mod key;

pub use key::{compare_keys, Key};

/// Shared, immutable column storage.
pub type VectorRef = Arc<Vector>;

/// The element type of a [`Vector`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VectorType {
    /// Unspecified type of an all-missing vector; combines with anything.
    Null,
    /// `true`/`false`.
    Boolean,
    /// 64-bit signed integers.
    Integer,
    /// 64-bit floats.
    Double,
    /// UTF-8 strings.
    Character,
    /// Categorical values with an ordered set of levels.
    Factor(Vec<String>),
    /// Each element is itself a vector.
    List,
    /// Named fields of equal length (matrix-like or table-like values).
    Record(Vec<(String, VectorType)>),
}

impl fmt::Display for VectorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Boolean => write!(f, "boolean"),
            Self::Integer => write!(f, "integer"),
            Self::Double => write!(f, "double"),
            Self::Character => write!(f, "character"),
            Self::Factor(levels) => write!(f, "factor<{}>", levels.join(",")),
            Self::List => write!(f, "list"),
            Self::Record(fields) => {
                write!(f, "record{{")?;
                for (i, (name, ty)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{name}: {ty}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

/// Named fields of equal length.
///
/// A record element (a "row") is missing only when every field is missing at
/// that position.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    names: Vec<String>,
    fields: Vec<Vector>,
    len: usize,
}

impl Record {
    /// Creates a record from named fields.
    ///
    /// # Errors
    ///
    /// Returns an error if two fields share a name or the fields differ in
    /// length.
    pub fn new<S: Into<String>>(fields: impl IntoIterator<Item = (S, Vector)>) -> Result<Self> {
        let (names, fields): (Vec<String>, Vec<Vector>) =
            fields.into_iter().map(|(n, v)| (n.into(), v)).unzip();
        let len = fields.first().map_or(0, Vector::len);
        Self::from_parts(names, fields, len)
    }

    /// Creates a record with an explicit length, allowing zero fields.
    ///
    /// # Errors
    ///
    /// Returns an error if two fields share a name or a field's length is not
    /// `len`.
    pub fn from_parts(names: Vec<String>, fields: Vec<Vector>, len: usize) -> Result<Self> {
        if names.len() != fields.len() {
            return Err(Error::invalid_input(format!(
                "{} field names for {} fields",
                names.len(),
                fields.len()
            )));
        }
        for (i, name) in names.iter().enumerate() {
            if names[..i].contains(name) {
                return Err(Error::duplicate_column(name.clone()));
            }
        }
        for (name, field) in names.iter().zip(&fields) {
            if field.len() != len {
                return Err(Error::recycling(names[0].clone(), len, name.clone(), field.len()));
            }
        }
        Ok(Self { names, fields, len })
    }

    /// Creates a matrix-like record of doubles from rows, with fields named
    /// `V1`, `V2`, ...
    ///
    /// # Errors
    ///
    /// Returns an error if the rows are ragged.
    pub fn matrix(rows: &[Vec<Option<f64>>]) -> Result<Self> {
        let ncol = rows.first().map_or(0, Vec::len);
        let mut columns = vec![Vec::with_capacity(rows.len()); ncol];
        for (r, row) in rows.iter().enumerate() {
            if row.len() != ncol {
                return Err(Error::invalid_input(format!(
                    "matrix row {r} has {} values, expected {ncol}",
                    row.len()
                )));
            }
            for (c, value) in row.iter().enumerate() {
                columns[c].push(*value);
            }
        }
        let names = (1..=ncol).map(|c| format!("V{c}")).collect();
        let fields = columns.into_iter().map(Vector::Double).collect();
        Self::from_parts(names, fields, rows.len())
    }

    /// Returns the field names.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Returns the field vectors, aligned with [`Record::names`].
    pub fn fields(&self) -> &[Vector] {
        &self.fields
    }

    /// Returns a field by name.
    pub fn field(&self, name: &str) -> Option<&Vector> {
        let idx = self.names.iter().position(|n| n == name)?;
        self.fields.get(idx)
    }

    /// Returns the number of elements (rows).
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the record has no rows.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns true if every field is missing at row `i`.
    pub fn row_is_missing(&self, i: usize) -> bool {
        self.fields.iter().all(|f| f.is_missing(i))
    }

    pub(crate) fn into_parts(self) -> (Vec<String>, Vec<Vector>, usize) {
        (self.names, self.fields, self.len)
    }
}

/// A typed, immutable column.
#[derive(Debug, Clone, PartialEq)]
pub enum Vector {
    /// An all-missing vector of unspecified type.
    Null(usize),
    /// Boolean values.
    Boolean(Vec<Option<bool>>),
    /// Integer values.
    Integer(Vec<Option<i64>>),
    /// Double values; `NaN` counts as missing.
    Double(Vec<Option<f64>>),
    /// String values.
    Character(Vec<Option<String>>),
    /// Codes into an ordered set of levels.
    Factor {
        /// Level labels, in order.
        levels: Vec<String>,
        /// Zero-based level codes.
        codes: Vec<Option<u32>>,
    },
    /// Nested vectors.
    List(Vec<Option<Vector>>),
    /// Named fields of equal length.
    Record(Record),
}

impl Vector {
    /// Builds a factor from string values; levels are the sorted distinct
    /// non-missing values.
    pub fn factor<S: AsRef<str>>(values: &[Option<S>]) -> Self {
        let mut levels: Vec<String> = values
            .iter()
            .flatten()
            .map(|s| s.as_ref().to_string())
            .collect();
        levels.sort();
        levels.dedup();
        Self::factor_with_levels(values, levels).unwrap_or(Self::Null(values.len()))
    }

    /// Builds a factor with explicit levels.
    ///
    /// # Errors
    ///
    /// Returns an error if a value is not one of the levels.
    pub fn factor_with_levels<S: AsRef<str>>(
        values: &[Option<S>],
        levels: Vec<String>,
    ) -> Result<Self> {
        let codes = values
            .iter()
            .map(|v| match v {
                None => Ok(None),
                Some(s) => levels
                    .iter()
                    .position(|l| l == s.as_ref())
                    .map(|p| Some(p as u32))
                    .ok_or_else(|| {
                        Error::invalid_input(format!("value '{}' is not a factor level", s.as_ref()))
                    }),
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::Factor { levels, codes })
    }

    /// Returns an all-missing vector of the given type and length.
    pub fn missing(vtype: &VectorType, len: usize) -> Self {
        match vtype {
            VectorType::Null => Self::Null(len),
            VectorType::Boolean => Self::Boolean(vec![None; len]),
            VectorType::Integer => Self::Integer(vec![None; len]),
            VectorType::Double => Self::Double(vec![None; len]),
            VectorType::Character => Self::Character(vec![None; len]),
            VectorType::Factor(levels) => Self::Factor {
                levels: levels.clone(),
                codes: vec![None; len],
            },
            VectorType::List => Self::List(vec![None; len]),
            VectorType::Record(fields) => Self::Record(Record {
                names: fields.iter().map(|(n, _)| n.clone()).collect(),
                fields: fields.iter().map(|(_, t)| Self::missing(t, len)).collect(),
                len,
            }),
        }
    }

    /// Returns the number of elements.
    pub fn len(&self) -> usize {
        match self {
            Self::Null(n) => *n,
            Self::Boolean(v) => v.len(),
            Self::Integer(v) => v.len(),
            Self::Double(v) => v.len(),
            Self::Character(v) => v.len(),
            Self::Factor { codes, .. } => codes.len(),
            Self::List(v) => v.len(),
            Self::Record(r) => r.len(),
        }
    }

    /// Returns true if the vector has no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the element type.
    pub fn vtype(&self) -> VectorType {
        match self {
            Self::Null(_) => VectorType::Null,
            Self::Boolean(_) => VectorType::Boolean,
            Self::Integer(_) => VectorType::Integer,
            Self::Double(_) => VectorType::Double,
            Self::Character(_) => VectorType::Character,
            Self::Factor { levels, .. } => VectorType::Factor(levels.clone()),
            Self::List(_) => VectorType::List,
            Self::Record(r) => VectorType::Record(
                r.names
                    .iter()
                    .cloned()
                    .zip(r.fields.iter().map(Self::vtype))
                    .collect(),
            ),
        }
    }

    /// Returns true if element `i` is missing.
    ///
    /// For records this is the whole-row rule: the element is missing only
    /// if every field is missing.
    pub fn is_missing(&self, i: usize) -> bool {
        match self {
            Self::Null(_) => true,
            Self::Boolean(v) => v[i].is_none(),
            Self::Integer(v) => v[i].is_none(),
            Self::Double(v) => v[i].map_or(true, f64::is_nan),
            Self::Character(v) => v[i].is_none(),
            Self::Factor { codes, .. } => codes[i].is_none(),
            Self::List(v) => v[i].is_none(),
            Self::Record(r) => r.row_is_missing(i),
        }
    }

    /// Returns a per-element missingness mask.
    pub fn missing_mask(&self) -> Vec<bool> {
        (0..self.len()).map(|i| self.is_missing(i)).collect()
    }

    /// Gathers elements by index.
    ///
    /// Indices must be in bounds.
    pub fn take(&self, indices: &[usize]) -> Self {
        fn gather<T: Clone>(v: &[T], indices: &[usize]) -> Vec<T> {
            indices.iter().map(|&i| v[i].clone()).collect()
        }
        match self {
            Self::Null(_) => Self::Null(indices.len()),
            Self::Boolean(v) => Self::Boolean(gather(v, indices)),
            Self::Integer(v) => Self::Integer(gather(v, indices)),
            Self::Double(v) => Self::Double(gather(v, indices)),
            Self::Character(v) => Self::Character(gather(v, indices)),
            Self::Factor { levels, codes } => Self::Factor {
                levels: levels.clone(),
                codes: gather(codes, indices),
            },
            Self::List(v) => Self::List(gather(v, indices)),
            Self::Record(r) => Self::Record(Record {
                names: r.names.clone(),
                fields: r.fields.iter().map(|f| f.take(indices)).collect(),
                len: indices.len(),
            }),
        }
    }

    /// Repeats a size-1 vector `n` times; vectors already of size `n` are
    /// returned unchanged.
    pub(crate) fn broadcast(&self, n: usize) -> Self {
        if self.len() == n {
            self.clone()
        } else {
            self.take(&vec![0; n])
        }
    }

    /// Concatenates vectors of the same type.
    ///
    /// Callers cast to a common type first (see [`crate::coerce`]).
    ///
    /// # Errors
    ///
    /// Returns an error if the parts are not all of the same type.
    pub fn concat(parts: &[Self]) -> Result<Self> {
        let Some(first) = parts.first() else {
            return Ok(Self::Null(0));
        };
        let mismatch = |other: &Self| {
            Error::incompatible(
                format!("<{}>", first.vtype()),
                format!("<{}>", other.vtype()),
                "concatenation requires identical types",
            )
        };
        match first {
            Self::Null(_) => {
                let mut n = 0;
                for p in parts {
                    match p {
                        Self::Null(k) => n += k,
                        other => return Err(mismatch(other)),
                    }
                }
                Ok(Self::Null(n))
            }
            Self::Boolean(_) => {
                let mut out = Vec::new();
                for p in parts {
                    match p {
                        Self::Boolean(v) => out.extend_from_slice(v),
                        other => return Err(mismatch(other)),
                    }
                }
                Ok(Self::Boolean(out))
            }
            Self::Integer(_) => {
                let mut out = Vec::new();
                for p in parts {
                    match p {
                        Self::Integer(v) => out.extend_from_slice(v),
                        other => return Err(mismatch(other)),
                    }
                }
                Ok(Self::Integer(out))
            }
            Self::Double(_) => {
                let mut out = Vec::new();
                for p in parts {
                    match p {
                        Self::Double(v) => out.extend_from_slice(v),
                        other => return Err(mismatch(other)),
                    }
                }
                Ok(Self::Double(out))
            }
            Self::Character(_) => {
                let mut out = Vec::new();
                for p in parts {
                    match p {
                        Self::Character(v) => out.extend_from_slice(v),
                        other => return Err(mismatch(other)),
                    }
                }
                Ok(Self::Character(out))
            }
            Self::Factor { levels, .. } => {
                let mut out = Vec::new();
                for p in parts {
                    match p {
                        Self::Factor { levels: l, codes } if l == levels => {
                            out.extend_from_slice(codes);
                        }
                        other => return Err(mismatch(other)),
                    }
                }
                Ok(Self::Factor {
                    levels: levels.clone(),
                    codes: out,
                })
            }
            Self::List(_) => {
                let mut out = Vec::new();
                for p in parts {
                    match p {
                        Self::List(v) => out.extend_from_slice(v),
                        other => return Err(mismatch(other)),
                    }
                }
                Ok(Self::List(out))
            }
            Self::Record(r) => {
                let mut columns: Vec<Vec<Self>> = vec![Vec::with_capacity(parts.len()); r.names.len()];
                let mut len = 0;
                for p in parts {
                    match p {
                        Self::Record(other) if other.names == r.names => {
                            for (col, field) in columns.iter_mut().zip(&other.fields) {
                                col.push(field.clone());
                            }
                            len += other.len;
                        }
                        other => return Err(mismatch(other)),
                    }
                }
                let fields = columns
                    .iter()
                    .map(|c| Self::concat(c))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Self::Record(Record {
                    names: r.names.clone(),
                    fields,
                    len,
                }))
            }
        }
    }

    /// Returns a copy with every element flagged in `mask` set to missing.
    pub(crate) fn mask_missing(&self, mask: &[bool]) -> Self {
        fn blank<T: Clone>(v: &[Option<T>], mask: &[bool]) -> Vec<Option<T>> {
            v.iter()
                .zip(mask)
                .map(|(x, &m)| if m { None } else { x.clone() })
                .collect()
        }
        match self {
            Self::Null(n) => Self::Null(*n),
            Self::Boolean(v) => Self::Boolean(blank(v, mask)),
            Self::Integer(v) => Self::Integer(blank(v, mask)),
            Self::Double(v) => Self::Double(blank(v, mask)),
            Self::Character(v) => Self::Character(blank(v, mask)),
            Self::Factor { levels, codes } => Self::Factor {
                levels: levels.clone(),
                codes: blank(codes, mask),
            },
            Self::List(v) => Self::List(blank(v, mask)),
            Self::Record(r) => Self::Record(Record {
                names: r.names.clone(),
                fields: r.fields.iter().map(|f| f.mask_missing(mask)).collect(),
                len: r.len,
            }),
        }
    }

    /// Returns the boolean values, if this is a boolean vector.
    pub fn as_booleans(&self) -> Option<&[Option<bool>]> {
        match self {
            Self::Boolean(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the record, if this is a record vector.
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Self::Record(r) => Some(r),
            _ => None,
        }
    }

    /// Reads numeric-like values as `f64`, mapping missing and `NaN` to
    /// `None`.
    ///
    /// # Errors
    ///
    /// Returns an error for non-numeric vectors.
    #[allow(clippy::cast_precision_loss)]
    pub fn to_f64(&self) -> Result<Vec<Option<f64>>> {
        match self {
            Self::Null(n) => Ok(vec![None; *n]),
            Self::Boolean(v) => Ok(v.iter().map(|b| b.map(|b| f64::from(u8::from(b)))).collect()),
            Self::Integer(v) => Ok(v.iter().map(|x| x.map(|x| x as f64)).collect()),
            Self::Double(v) => Ok(v.iter().map(|x| x.filter(|x| !x.is_nan())).collect()),
            other => Err(Error::invalid_input(format!(
                "expected a numeric vector, got <{}>",
                other.vtype()
            ))),
        }
    }

    /// Returns the grouping/sorting key of element `i`.
    ///
    /// # Errors
    ///
    /// Returns an error for list and record vectors, which have no ordering.
    pub fn key(&self, i: usize) -> Result<Key> {
        Ok(match self {
            Self::Null(_) => Key::Missing,
            Self::Boolean(v) => v[i].map_or(Key::Missing, Key::Boolean),
            Self::Integer(v) => v[i].map_or(Key::Missing, Key::Integer),
            Self::Double(v) => match v[i] {
                Some(x) if !x.is_nan() => Key::Double(x),
                _ => Key::Missing,
            },
            Self::Character(v) => v[i].clone().map_or(Key::Missing, Key::Character),
            Self::Factor { codes, .. } => codes[i].map_or(Key::Missing, Key::Factor),
            Self::List(_) | Self::Record(_) => {
                return Err(Error::invalid_input(format!(
                    "<{}> values can't be used as grouping or sorting keys",
                    self.vtype()
                )))
            }
        })
    }

    /// Formats element `i` for diagnostics.
    pub(crate) fn describe(&self, i: usize) -> String {
        if self.is_missing(i) {
            return "NA".to_string();
        }
        match self {
            Self::Boolean(v) => v[i].map_or_else(String::new, |b| b.to_string()),
            Self::Integer(v) => v[i].map_or_else(String::new, |x| x.to_string()),
            Self::Double(v) => v[i].map_or_else(String::new, |x| x.to_string()),
            Self::Character(v) => v[i].as_ref().map_or_else(String::new, |s| format!("{s:?}")),
            Self::Factor { levels, codes } => codes[i]
                .and_then(|c| levels.get(c as usize))
                .map_or_else(String::new, |s| format!("{s:?}")),
            Self::List(_) => "<list>".to_string(),
            Self::Record(_) => "<record>".to_string(),
            Self::Null(_) => "NA".to_string(),
        }
    }
}

impl From<Vec<bool>> for Vector {
    fn from(v: Vec<bool>) -> Self {
        Self::Boolean(v.into_iter().map(Some).collect())
    }
}

impl From<Vec<Option<bool>>> for Vector {
    fn from(v: Vec<Option<bool>>) -> Self {
        Self::Boolean(v)
    }
}

impl From<Vec<i64>> for Vector {
    fn from(v: Vec<i64>) -> Self {
        Self::Integer(v.into_iter().map(Some).collect())
    }
}

impl From<Vec<Option<i64>>> for Vector {
    fn from(v: Vec<Option<i64>>) -> Self {
        Self::Integer(v)
    }
}

impl From<Vec<f64>> for Vector {
    fn from(v: Vec<f64>) -> Self {
        Self::Double(v.into_iter().map(Some).collect())
    }
}

impl From<Vec<Option<f64>>> for Vector {
    fn from(v: Vec<Option<f64>>) -> Self {
        Self::Double(v)
    }
}

impl From<Vec<&str>> for Vector {
    fn from(v: Vec<&str>) -> Self {
        Self::Character(v.into_iter().map(|s| Some(s.to_string())).collect())
    }
}

impl From<Vec<Option<&str>>> for Vector {
    fn from(v: Vec<Option<&str>>) -> Self {
        Self::Character(v.into_iter().map(|s| s.map(str::to_string)).collect())
    }
}

impl From<Vec<String>> for Vector {
    fn from(v: Vec<String>) -> Self {
        Self::Character(v.into_iter().map(Some).collect())
    }
}

impl From<Record> for Vector {
    fn from(r: Record) -> Self {
        Self::Record(r)
    }
}
