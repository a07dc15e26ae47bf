//! Grouping and per-group computation verbs.

use super::Verb;
use crate::{
    error::Result,
    eval::{self, Expr},
    group::Frame,
};

/// A verb that groups a frame by key columns, replacing any grouping.
#[derive(Debug, Clone)]
pub struct GroupBy {
    vars: Vec<String>,
}

impl GroupBy {
    /// Creates a GroupBy verb.
    pub fn new<S: Into<String>>(vars: impl IntoIterator<Item = S>) -> Self {
        Self {
            vars: vars.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns the grouping columns.
    pub fn vars(&self) -> &[String] {
        &self.vars
    }
}

impl Verb for GroupBy {
    fn apply(&self, frame: Frame) -> Result<Frame> {
        frame.group_by(&self.vars)
    }
}

/// A verb that drops the grouping.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ungroup;

impl Verb for Ungroup {
    fn apply(&self, frame: Frame) -> Result<Frame> {
        Ok(frame.ungroup())
    }
}

macro_rules! expr_verb {
    ($(#[$doc:meta])* $name:ident => $func:path) => {
        $(#[$doc])*
        #[derive(Debug, Clone)]
        pub struct $name {
            exprs: Vec<Expr>,
        }

        impl $name {
            #[doc = concat!("Creates a ", stringify!($name), " verb.")]
            pub fn new(exprs: Vec<Expr>) -> Self {
                Self { exprs }
            }

            /// Returns the expressions.
            pub fn exprs(&self) -> &[Expr] {
                &self.exprs
            }
        }

        impl Verb for $name {
            fn apply(&self, frame: Frame) -> Result<Frame> {
                $func(&frame, &self.exprs)
            }
        }
    };
}

expr_verb! {
    /// A verb that adds or replaces columns, one value per row (see
    /// [`eval::mutate`]).
    Mutate => eval::mutate
}

expr_verb! {
    /// A verb that computes new columns and keeps only those and the
    /// grouping columns (see [`eval::transmute`]).
    Transmute => eval::transmute
}

expr_verb! {
    /// A verb that reduces each group to a block of rows (see
    /// [`eval::summarise`]).
    Summarise => eval::summarise
}

expr_verb! {
    /// A verb that keeps rows for which every predicate holds (see
    /// [`eval::filter`]).
    Filter => eval::filter
}
