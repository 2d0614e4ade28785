//! Relational storage seam.
//!
//! The engine talks to one trait; [`mysql::MySqlStorage`] implements it over
//! a live connection and [`memory::MemoryStorage`] over snapshot tables for
//! tests and rehearsals. Savepoints are first-class so the migrate command
//! can scope one group's rewrite.

pub mod memory;
pub mod mysql;

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::error::Result;
use crate::extract::DbColsetRow;
use crate::migrate::RewritePlan;
use crate::model::{Breakpoint, ColsetElement, ElementTable};

pub use self::memory::MemoryStorage;
pub use self::mysql::MySqlStorage;

/// Target-schema table holding migrated grid definitions.
pub const GRID_TABLE: &str = "tl_bs_grid";
/// Grid-definition-link column added to both element tables.
pub const GRID_COL: &str = "bs_grid";
/// Grid parent-link column: 0 on a start element, start id on the rest.
pub const GRID_PARENT_COL: &str = "bs_grid_parent";
/// Grid name column, filled from the legacy sub-column name.
pub const GRID_NAME_COL: &str = "bs_grid_name";

/// One row to insert into the target definition table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GridDefinitionRow {
    /// Parent theme id.
    pub theme_id: i64,
    pub tstamp: i64,
    pub title: String,
    /// Carries the recoverable provenance tag.
    pub description: String,
    pub row_class: String,
    /// JSON array of the breakpoint names this definition declares.
    pub sizes: String,
    /// Serialized column arrays keyed by breakpoint.
    pub columnsets: BTreeMap<Breakpoint, String>,
}

/// Everything the migration engine needs from relational storage.
#[async_trait]
pub trait ColsetStorage: Send {
    /// Schema introspection; implementations memoize per table and column.
    async fn column_exists(&mut self, table: &str, column: &str) -> Result<bool>;

    async fn table_exists(&mut self, table: &str) -> Result<bool>;

    /// All legacy colset rows of one element table. No ordering contract;
    /// the engine sorts before grouping.
    async fn fetch_colset_elements(&mut self, table: ElementTable) -> Result<Vec<ColsetElement>>;

    /// All rows of the legacy `tl_columnset` table.
    async fn fetch_db_colsets(&mut self) -> Result<Vec<DbColsetRow>>;

    /// `(id, description)` of every existing target definition row.
    async fn fetch_migrated_definitions(&mut self) -> Result<Vec<(i64, String)>>;

    /// Insert one target definition row, returning its new id.
    async fn insert_grid_definition(&mut self, row: &GridDefinitionRow) -> Result<i64>;

    /// Rewrite one validated group. Exactly two update statements.
    async fn apply_rewrite(&mut self, plan: &RewritePlan) -> Result<()>;

    /// Point the given rows' sub-column parent-link at `parent`.
    async fn reparent_elements(
        &mut self,
        table: ElementTable,
        ids: &[i64],
        parent: i64,
    ) -> Result<u64>;

    async fn delete_elements(&mut self, table: ElementTable, ids: &[i64]) -> Result<u64>;

    /// Reverse the grid type renames on rows whose legacy fields survive.
    async fn revert_types(&mut self, table: ElementTable) -> Result<u64>;

    /// Clear templates staged by this tool, matched by name prefix.
    async fn clear_templates(&mut self, table: ElementTable, prefix: &str) -> Result<u64>;

    /// Delete target definition rows carrying the provenance tag.
    async fn delete_tagged_definitions(&mut self, tag_prefix: &str) -> Result<u64>;

    async fn begin(&mut self) -> Result<()>;
    async fn commit(&mut self) -> Result<()>;
    async fn rollback(&mut self) -> Result<()>;
    async fn savepoint(&mut self, name: &str) -> Result<()>;
    async fn release_savepoint(&mut self, name: &str) -> Result<()>;
    async fn rollback_to_savepoint(&mut self, name: &str) -> Result<()>;
}
