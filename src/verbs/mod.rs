//! Verbs for wrangle.
//!
//! Verbs take a [`Frame`] and produce a new one, leaving the input
//! untouched. They are composable and can be chained together into
//! pipelines.

use std::sync::Arc;

use crate::{error::Result, group::Frame};

mod compute;
mod row_ops;
mod selection;

pub use compute::{Filter, GroupBy, Mutate, Summarise, Transmute, Ungroup};
pub use row_ops::{Arrange, SampleFrac, SampleN, SortOrder};
pub use selection::{Rename, Select};

/// A verb that can be applied to a frame.
///
/// # Thread Safety
///
/// All verbs must be thread-safe (Send + Sync) so pipelines can be shared
/// across threads.
pub trait Verb: Send + Sync {
    /// Applies the verb to a frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the verb cannot be applied to the frame.
    fn apply(&self, frame: Frame) -> Result<Frame>;
}

/// A verb that applies a function to the frame.
///
/// # Example
///
/// ```
/// use wrangle::{Frame, Map, Table, Verb};
///
/// let verb = Map::new(|frame: Frame| Ok(frame.ungroup()));
/// let out = verb.apply(Frame::new(Table::empty(0))).unwrap();
/// assert!(!out.is_grouped());
/// ```
pub struct Map<F>
where
    F: Fn(Frame) -> Result<Frame> + Send + Sync,
{
    func: F,
}

impl<F> Map<F>
where
    F: Fn(Frame) -> Result<Frame> + Send + Sync,
{
    /// Creates a new Map verb with the given function.
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

impl<F> Verb for Map<F>
where
    F: Fn(Frame) -> Result<Frame> + Send + Sync,
{
    fn apply(&self, frame: Frame) -> Result<Frame> {
        (self.func)(frame)
    }
}

/// A chain of verbs applied in sequence.
///
/// The chain stops at the first failing verb; no partial result escapes.
///
/// # Example
///
/// ```
/// use wrangle::{Chain, Expr, GroupBy, Summarise, Table, Vector, Verb};
///
/// let table = Table::new(vec![
///     ("g", Vector::from(vec!["a", "b", "a"])),
///     ("x", Vector::from(vec![1.0, 2.0, 3.0])),
/// ])
/// .unwrap();
/// let chain = Chain::new()
///     .then(GroupBy::new(["g"]))
///     .then(Summarise::new(vec![Expr::n("n")]));
/// let out = chain.apply(table.into()).unwrap();
/// assert_eq!(out.num_rows(), 2);
/// ```
pub struct Chain {
    verbs: Vec<Box<dyn Verb>>,
}

impl Chain {
    /// Creates a new empty chain.
    pub fn new() -> Self {
        Self { verbs: Vec::new() }
    }

    /// Adds a verb to the chain.
    #[must_use]
    pub fn then<V: Verb + 'static>(mut self, verb: V) -> Self {
        self.verbs.push(Box::new(verb));
        self
    }

    /// Returns the number of verbs in the chain.
    pub fn len(&self) -> usize {
        self.verbs.len()
    }

    /// Returns true if the chain has no verbs.
    pub fn is_empty(&self) -> bool {
        self.verbs.is_empty()
    }
}

impl Default for Chain {
    fn default() -> Self {
        Self::new()
    }
}

impl Verb for Chain {
    fn apply(&self, frame: Frame) -> Result<Frame> {
        let mut result = frame;
        for verb in &self.verbs {
            result = verb.apply(result)?;
        }
        Ok(result)
    }
}

impl Verb for Box<dyn Verb> {
    fn apply(&self, frame: Frame) -> Result<Frame> {
        (**self).apply(frame)
    }
}

impl Verb for Arc<dyn Verb> {
    fn apply(&self, frame: Frame) -> Result<Frame> {
        (**self).apply(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::Error,
        eval::Expr,
        select::Selection,
        table::Table,
        vector::Vector,
    };

    fn frame() -> Frame {
        Table::new(vec![
            ("id", Vector::from(vec![1_i64, 2, 3, 4, 5])),
            ("name", Vector::from(vec!["a", "b", "c", "d", "e"])),
            ("value", Vector::from(vec![10_i64, 20, 30, 40, 50])),
        ])
        .ok()
        .unwrap_or_else(|| panic!("Should create table"))
        .into()
    }

    #[test]
    fn test_map_verb() {
        let verb = Map::new(Ok); // identity
        let result = verb
            .apply(frame())
            .ok()
            .unwrap_or_else(|| panic!("Should succeed"));
        assert_eq!(result, frame());
    }

    #[test]
    fn test_chain() {
        let chain = Chain::new()
            .then(Select::new(Selection::names(["id", "value"])))
            .then(Filter::new(vec![Expr::map("big", "value", |v| {
                Ok(Vector::from(
                    v.to_f64()?
                        .iter()
                        .map(|x| x.map(|x| x > 25.0))
                        .collect::<Vec<_>>(),
                ))
            })]));
        assert_eq!(chain.len(), 2);
        let result = chain
            .apply(frame())
            .ok()
            .unwrap_or_else(|| panic!("Should succeed"));
        assert_eq!(result.num_rows(), 3);
        assert_eq!(result.table().names(), &["id", "value"]);
    }

    #[test]
    fn test_chain_stops_at_first_error() {
        let chain = Chain::new()
            .then(Select::new(Selection::names(["nope"])))
            .then(Ungroup);
        assert!(matches!(
            chain.apply(frame()),
            Err(Error::ColumnNotFound { .. })
        ));
    }

    #[test]
    fn test_empty_chain() {
        let chain = Chain::default();
        assert!(chain.is_empty());
        assert_eq!(chain.apply(frame()).ok(), Some(frame()));
    }

    #[test]
    fn test_boxed_and_shared_verbs() {
        let boxed: Box<dyn Verb> = Box::new(GroupBy::new(["name"]));
        let shared: Arc<dyn Verb> = Arc::new(Ungroup);
        let grouped = boxed.apply(frame()).unwrap();
        assert_eq!(grouped.n_groups(), 5);
        assert!(!shared.apply(grouped).unwrap().is_grouped());
    }
}
