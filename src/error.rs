//! Error taxonomy for the migration engine.
//!
//! Two tiers: [`GroupError`] covers one colset group and is caught at the
//! per-group savepoint boundary, [`MigrationError`] aborts the whole command.

use thiserror::Error;

/// Failure scoped to a single colset group.
///
/// The migrate command converts these into error notes and continues with
/// the next group; the fix command escalates them to [`MigrationError::Corrupt`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GroupError {
    #[error("group has fewer than 2 elements")]
    TooSmall,

    #[error("no start element found")]
    NoStart,

    #[error("no end element found")]
    NoEnd,

    #[error("multiple start elements")]
    MultipleStart,

    #[error("multiple end elements")]
    MultipleEnd,

    #[error("unknown element type \"{0}\"")]
    UnknownType(String),

    #[error("start element id {id} does not match group parent {parent}")]
    ParentMismatch { id: i64, parent: i64 },

    #[error("no migrated definition found for identifier \"{0}\"")]
    UnresolvedIdentifier(String),
}

/// Fatal, command-level failure.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// Bad or ambiguous run configuration. Raised before any transaction opens.
    #[error("config error: {0}")]
    Config(String),

    /// Corrupt group the fix command cannot repair. Carries the SQL selection
    /// identifying the offending rows for manual inspection.
    #[error("corrupt colset group, inspect manually: {selection}: {source}")]
    Corrupt {
        selection: String,
        source: GroupError,
    },

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("globals config: {0}")]
    Globals(#[from] toml::de::Error),

    #[error("column data: {0}")]
    ColumnData(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, MigrationError>;
