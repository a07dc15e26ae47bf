//! Error types for wrangle.

/// Result type alias for wrangle operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while evaluating verbs.
///
/// Every verb either fully succeeds or returns one of these; no partial
/// table is ever exposed.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Two inputs have no common type.
    #[error("Can't combine {x} and {y}: {reason}")]
    IncompatibleType {
        /// Description of the first offending input (label and type).
        x: String,
        /// Description of the second offending input (label and type).
        y: String,
        /// Why the combination failed.
        reason: String,
    },

    /// Two inputs have sizes that can't be recycled to a common size.
    #[error("Can't recycle {x} (size {x_size}) to match {y} (size {y_size})")]
    Recycling {
        /// Label of the input whose size was fixed first.
        x: String,
        /// Size of `x`.
        x_size: usize,
        /// Label of the input that conflicts with it.
        y: String,
        /// Size of `y`.
        y_size: usize,
    },

    /// A per-group expression produced a result of the wrong size.
    #[error("Column `{expr}` must be size {expected} or 1, not {actual} (in group {group})")]
    EvaluationSize {
        /// Name of the expression.
        expr: String,
        /// Description of the group's key.
        group: String,
        /// Size the result should have had.
        expected: usize,
        /// Size the result actually had.
        actual: usize,
    },

    /// The caller misused an entry point.
    #[error("Usage error: {message}")]
    Usage {
        /// Description of the misuse.
        message: String,
    },

    /// More rows were requested than are available without replacement.
    #[error("Can't sample {requested} rows from {available} available in group {group} without replacement")]
    InsufficientRows {
        /// Description of the group's key.
        group: String,
        /// Number of rows requested.
        requested: usize,
        /// Number of rows available.
        available: usize,
    },

    /// The input has the wrong shape or type.
    #[error("Invalid input: {message}")]
    InvalidInput {
        /// Description of the problem.
        message: String,
    },

    /// An explicit selection named a grouping column.
    #[error("Column `{column}` is a grouping variable and can't be selected or modified here")]
    GroupingConflict {
        /// The grouping column.
        column: String,
    },

    /// Column not found in table.
    #[error("Column '{name}' not found")]
    ColumnNotFound {
        /// The name of the missing column.
        name: String,
    },

    /// Two columns share a name.
    #[error("Column name '{name}' is duplicated")]
    DuplicateColumn {
        /// The duplicated name.
        name: String,
    },

    /// Arrow error during interop.
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),
}

impl Error {
    /// Create an incompatible type error.
    pub fn incompatible(
        x: impl Into<String>,
        y: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::IncompatibleType {
            x: x.into(),
            y: y.into(),
            reason: reason.into(),
        }
    }

    /// Create a recycling error.
    pub fn recycling(x: impl Into<String>, x_size: usize, y: impl Into<String>, y_size: usize) -> Self {
        Self::Recycling {
            x: x.into(),
            x_size,
            y: y.into(),
            y_size,
        }
    }

    /// Create an evaluation size error.
    pub fn evaluation_size(
        expr: impl Into<String>,
        group: impl Into<String>,
        expected: usize,
        actual: usize,
    ) -> Self {
        Self::EvaluationSize {
            expr: expr.into(),
            group: group.into(),
            expected,
            actual,
        }
    }

    /// Create a usage error.
    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage {
            message: message.into(),
        }
    }

    /// Create an insufficient rows error.
    pub fn insufficient_rows(group: impl Into<String>, requested: usize, available: usize) -> Self {
        Self::InsufficientRows {
            group: group.into(),
            requested,
            available,
        }
    }

    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create a grouping conflict error.
    pub fn grouping_conflict(column: impl Into<String>) -> Self {
        Self::GroupingConflict {
            column: column.into(),
        }
    }

    /// Create a column not found error.
    pub fn column_not_found(name: impl Into<String>) -> Self {
        Self::ColumnNotFound { name: name.into() }
    }

    /// Create a duplicate column error.
    pub fn duplicate_column(name: impl Into<String>) -> Self {
        Self::DuplicateColumn { name: name.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incompatible_type() {
        let err = Error::incompatible("..1 <character>", "..2 <list>", "no common type");
        let msg = err.to_string();
        assert!(msg.contains("..1 <character>"));
        assert!(msg.contains("..2 <list>"));
    }

    #[test]
    fn test_recycling() {
        let err = Error::recycling("..1", 2, "..2", 3);
        let msg = err.to_string();
        assert!(msg.contains("size 2"));
        assert!(msg.contains("size 3"));
    }

    #[test]
    fn test_evaluation_size() {
        let err = Error::evaluation_size("y", "g = \"a\"", 4, 2);
        let msg = err.to_string();
        assert!(msg.contains("`y`"));
        assert!(msg.contains("g = \"a\""));
        assert!(msg.contains("size 4"));
    }

    #[test]
    fn test_usage() {
        let err = Error::usage("nothing to coalesce");
        assert!(err.to_string().contains("nothing to coalesce"));
    }

    #[test]
    fn test_insufficient_rows() {
        let err = Error::insufficient_rows("g = 1", 10, 7);
        let msg = err.to_string();
        assert!(msg.contains("10"));
        assert!(msg.contains('7'));
    }

    #[test]
    fn test_invalid_input() {
        let err = Error::invalid_input("expected a record");
        assert!(err.to_string().contains("expected a record"));
    }

    #[test]
    fn test_grouping_conflict() {
        let err = Error::grouping_conflict("g");
        assert!(err.to_string().contains("`g`"));
    }

    #[test]
    fn test_column_not_found() {
        let err = Error::column_not_found("my_column");
        assert!(err.to_string().contains("my_column"));
    }

    #[test]
    fn test_duplicate_column() {
        let err = Error::duplicate_column("x");
        assert!(err.to_string().contains("duplicated"));
    }

    #[test]
    fn test_arrow_error_converts() {
        let err: Error = arrow::error::ArrowError::ComputeError("boom".to_string()).into();
        assert!(err.to_string().contains("boom"));
    }
}
