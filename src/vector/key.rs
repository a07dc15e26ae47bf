//! Orderable, hashable element keys used for grouping and sorting.

use std::{
    cmp::Ordering,
    hash::{Hash, Hasher},
};

/// A single element viewed as a grouping or sorting key.
///
/// Keys of the same column always share a variant (or are missing).
/// [`Ord`] places [`Key::Missing`] after every present value.
#[derive(Debug, Clone)]
pub enum Key {
    /// A missing value.
    Missing,
    /// A boolean value (`false < true`).
    Boolean(bool),
    /// An integer value.
    Integer(i64),
    /// A non-`NaN` double value.
    Double(f64),
    /// A string value, ordered bytewise.
    Character(String),
    /// A factor code, ordered by level position.
    Factor(u32),
}

impl Key {
    fn rank(&self) -> u8 {
        match self {
            Self::Boolean(_) => 0,
            Self::Integer(_) => 1,
            Self::Double(_) => 2,
            Self::Character(_) => 3,
            Self::Factor(_) => 4,
            Self::Missing => 5,
        }
    }
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Key {}

impl PartialOrd for Key {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Key {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Boolean(a), Self::Boolean(b)) => a.cmp(b),
            (Self::Integer(a), Self::Integer(b)) => a.cmp(b),
            // -0.0 and 0.0 compare equal so they land in one group
            (Self::Double(a), Self::Double(b)) => {
                if a == b {
                    Ordering::Equal
                } else {
                    a.total_cmp(b)
                }
            }
            (Self::Character(a), Self::Character(b)) => a.cmp(b),
            (Self::Factor(a), Self::Factor(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl Hash for Key {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            Self::Missing => {}
            Self::Boolean(b) => b.hash(state),
            Self::Integer(i) => i.hash(state),
            Self::Double(d) => {
                let d = if *d == 0.0 { 0.0 } else { *d };
                d.to_bits().hash(state);
            }
            Self::Character(s) => s.hash(state),
            Self::Factor(c) => c.hash(state),
        }
    }
}

/// Compares two keys for a sort in the given direction.
///
/// Missing keys sort last in both directions.
pub fn compare_keys(a: &Key, b: &Key, descending: bool) -> Ordering {
    match (a, b) {
        (Key::Missing, Key::Missing) => Ordering::Equal,
        (Key::Missing, _) => Ordering::Greater,
        (_, Key::Missing) => Ordering::Less,
        _ if descending => b.cmp(a),
        _ => a.cmp(b),
    }
}
