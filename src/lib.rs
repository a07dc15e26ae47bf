//! wrangle - Grouped Data-Frame Verbs in Pure Rust
//!
//! A small grammar of data manipulation: `select`, `rename`, `mutate`,
//! `transmute`, `summarise`, `filter`, `arrange`, `sample_n`/`sample_frac`
//! and `coalesce`, all aware of an optional grouping structure.
//!
//! # Design Principles
//!
//! 1. **Immutable values** - Verbs return new frames; unchanged columns are
//!    shared, never copied
//! 2. **Closed type lattice** - `null < boolean < integer < double <
//!    character`, plus factors, lists and records
//! 3. **Groups are derived** - The row partition is recomputed whenever rows
//!    or keys change, never patched in place
//! 4. **All or nothing** - A verb either succeeds or returns an [`Error`];
//!    no partial table escapes
//!
//! # Quick Start
//!
//! ```
//! use wrangle::{functions, Expr, Frame, Table, Vector};
//!
//! let table = Table::new(vec![
//!     ("team", Vector::from(vec!["red", "blue", "red"])),
//!     ("score", Vector::from(vec![3.0, 5.0, 4.0])),
//! ])
//! .unwrap();
//!
//! let grouped = Frame::new(table).group_by(&["team"]).unwrap();
//! let totals = wrangle::summarise(&grouped, &[Expr::map("total", "score", functions::sum)]).unwrap();
//!
//! assert_eq!(totals.num_rows(), 2);
//! assert_eq!(*totals.pull("total").unwrap(), Vector::from(vec![5.0, 7.0]));
//! ```

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
// Allow common test patterns
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::cast_lossless,
        clippy::cast_possible_truncation,
        clippy::cast_possible_wrap,
        clippy::cast_precision_loss,
        clippy::redundant_clone,
        clippy::float_cmp,
        clippy::similar_names
    )
)]
// Allow some pedantic lints for cleaner code
#![allow(clippy::doc_markdown)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]
#![allow(clippy::module_name_repetitions)]

pub mod across;
pub mod coalesce;
pub mod coerce;
pub mod error;
pub mod eval;
pub mod functions;
pub mod group;
pub mod interop;
pub mod naming;
pub mod sample;
pub mod select;
pub mod table;
pub mod vector;
pub mod verbs;

// Re-exports for convenience
pub use across::{mutate_across, summarise_across, Across};
pub use coalesce::{coalesce, coalesce_tables, CoalesceOptions};
pub use error::{Error, Result};
pub use eval::{filter, mutate, summarise, transmute, DataMask, Expr};
pub use group::{peel_last, Frame, Groups};
pub use naming::{cross_names, make_unique, VarLabel};
pub use sample::{sample_frac, sample_n, SampleOptions, SampleSize, Weight};
pub use select::{resolve, Selection};
pub use table::Table;
pub use vector::{Key, Record, Vector, VectorRef, VectorType};
pub use verbs::{
    Arrange, Chain, Filter, GroupBy, Map, Mutate, Rename, SampleFrac, SampleN, Select, SortOrder,
    Summarise, Transmute, Ungroup, Verb,
};
