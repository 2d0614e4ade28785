//! In-memory storage backend.
//!
//! Mirrors the MySQL backend's semantics (substring type renames, template
//! backfill before the type changes, the legacy-field guards) so the engine
//! can be exercised and rehearsed without a server. Transactions and
//! savepoints are snapshot stacks.

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;

use crate::error::Result;
use crate::extract::DbColsetRow;
use crate::migrate::{rename_element_type, RewritePlan};
use crate::model::{
    ColsetElement, ElementRow, ElementTable, GRID_TYPE_SEPARATOR, GRID_TYPE_START, GRID_TYPE_STOP,
};

use super::{ColsetStorage, GridDefinitionRow};

/// One element row with both legacy and target columns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemElement {
    pub id: i64,
    pub element_type: String,
    pub pid: i64,
    pub ptable: String,
    pub sorting: i64,
    pub invisible: bool,
    pub sc_parent: i64,
    pub sc_type: String,
    pub sc_name: String,
    pub custom_tpl: String,
    pub grid: i64,
    pub grid_parent: i64,
    pub grid_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Tables {
    content: BTreeMap<i64, MemElement>,
    form_fields: BTreeMap<i64, MemElement>,
    colsets: BTreeMap<i64, DbColsetRow>,
    grid_definitions: BTreeMap<i64, GridDefinitionRow>,
    next_grid_id: i64,
}

#[derive(Debug, Default)]
pub struct MemoryStorage {
    tables: Tables,
    /// Simulated schema gaps for introspection-driven behavior.
    missing_columns: HashSet<(String, String)>,
    missing_tables: HashSet<String>,
    tx: Option<Tables>,
    savepoints: Vec<(String, Tables)>,
    begun: usize,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            tables: Tables {
                next_grid_id: 1,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    pub fn insert_element(&mut self, table: ElementTable, element: MemElement) {
        self.rows_mut(table).insert(element.id, element);
    }

    pub fn insert_colset(&mut self, row: DbColsetRow) {
        self.tables.colsets.insert(row.id, row);
    }

    pub fn element(&self, table: ElementTable, id: i64) -> Option<&MemElement> {
        self.rows(table).get(&id)
    }

    pub fn elements(&self, table: ElementTable) -> Vec<MemElement> {
        self.rows(table).values().cloned().collect()
    }

    pub fn grid_definitions(&self) -> Vec<(i64, GridDefinitionRow)> {
        self.tables
            .grid_definitions
            .iter()
            .map(|(id, row)| (*id, row.clone()))
            .collect()
    }

    pub fn remove_table(&mut self, table: &str) {
        self.missing_tables.insert(table.to_string());
    }

    pub fn remove_column(&mut self, table: &str, column: &str) {
        self.missing_columns
            .insert((table.to_string(), column.to_string()));
    }

    /// Full state dump for before/after comparisons in rehearsal tests.
    pub fn dump(&self) -> String {
        format!("{:?}", self.tables)
    }

    /// How many transactions have been opened on this storage.
    pub fn transactions_begun(&self) -> usize {
        self.begun
    }

    fn rows(&self, table: ElementTable) -> &BTreeMap<i64, MemElement> {
        match table {
            ElementTable::Content => &self.tables.content,
            ElementTable::FormField => &self.tables.form_fields,
        }
    }

    fn rows_mut(&mut self, table: ElementTable) -> &mut BTreeMap<i64, MemElement> {
        match table {
            ElementTable::Content => &mut self.tables.content,
            ElementTable::FormField => &mut self.tables.form_fields,
        }
    }
}

#[async_trait]
impl ColsetStorage for MemoryStorage {
    async fn column_exists(&mut self, table: &str, column: &str) -> Result<bool> {
        Ok(!self
            .missing_columns
            .contains(&(table.to_string(), column.to_string())))
    }

    async fn table_exists(&mut self, table: &str) -> Result<bool> {
        Ok(!self.missing_tables.contains(table))
    }

    async fn fetch_colset_elements(&mut self, table: ElementTable) -> Result<Vec<ColsetElement>> {
        let map = table.map();
        let has_invisible = self.column_exists(map.table, "invisible").await?;

        Ok(self
            .rows(table)
            .values()
            .filter(|el| {
                el.element_type.contains(map.start_type)
                    || el.element_type.contains(map.part_type)
                    || el.element_type.contains(map.end_type)
            })
            .map(|el| {
                ElementRow {
                    id: el.id,
                    element_type: Some(el.element_type.clone()),
                    pid: Some(el.pid),
                    ptable: map.has_ptable.then(|| el.ptable.clone()),
                    sorting: Some(el.sorting),
                    invisible: has_invisible.then_some(el.invisible),
                    sc_parent: Some(el.sc_parent),
                    sc_type: Some(el.sc_type.clone()),
                    sc_name: Some(el.sc_name.clone()),
                    custom_tpl: Some(el.custom_tpl.clone()),
                }
                .into_element(table)
            })
            .collect())
    }

    async fn fetch_db_colsets(&mut self) -> Result<Vec<DbColsetRow>> {
        if !self.table_exists(super::mysql::COLSET_TABLE).await? {
            return Ok(Vec::new());
        }
        Ok(self.tables.colsets.values().cloned().collect())
    }

    async fn fetch_migrated_definitions(&mut self) -> Result<Vec<(i64, String)>> {
        Ok(self
            .tables
            .grid_definitions
            .iter()
            .map(|(id, row)| (*id, row.description.clone()))
            .collect())
    }

    async fn insert_grid_definition(&mut self, row: &GridDefinitionRow) -> Result<i64> {
        let id = self.tables.next_grid_id;
        self.tables.next_grid_id += 1;
        self.tables.grid_definitions.insert(id, row.clone());
        Ok(id)
    }

    async fn apply_rewrite(&mut self, plan: &RewritePlan) -> Result<()> {
        let end_type = plan.table.map().end_type;

        if let Some(el) = self.rows_mut(plan.table).get_mut(&plan.start_id) {
            el.element_type = GRID_TYPE_START.to_string();
            el.grid_parent = 0;
            el.grid_name = plan.grid_name.clone();
            el.grid = plan.grid_id;
            el.custom_tpl = plan.start_template.clone();
        }

        for id in &plan.rest_ids {
            if let Some(el) = self.rows_mut(plan.table).get_mut(id) {
                el.grid_parent = plan.start_id;
                // Backfill runs against the legacy type, before the rename.
                if el.custom_tpl.is_empty() {
                    el.custom_tpl = if el.element_type.contains(end_type) {
                        plan.end_template.clone()
                    } else {
                        plan.part_template.clone()
                    };
                }
                el.element_type = rename_element_type(plan.table, &el.element_type);
            }
        }

        Ok(())
    }

    async fn reparent_elements(
        &mut self,
        table: ElementTable,
        ids: &[i64],
        parent: i64,
    ) -> Result<u64> {
        let mut affected = 0;
        for id in ids {
            if let Some(el) = self.rows_mut(table).get_mut(id) {
                if el.sc_parent != parent {
                    el.sc_parent = parent;
                    affected += 1;
                }
            }
        }
        Ok(affected)
    }

    async fn delete_elements(&mut self, table: ElementTable, ids: &[i64]) -> Result<u64> {
        let rows = self.rows_mut(table);
        let mut affected = 0;
        for id in ids {
            if rows.remove(id).is_some() {
                affected += 1;
            }
        }
        Ok(affected)
    }

    async fn revert_types(&mut self, table: ElementTable) -> Result<u64> {
        let map = table.map();
        let mut affected = 0;
        for el in self.rows_mut(table).values_mut() {
            if !el.element_type.contains("bs_grid") {
                continue;
            }
            // Legacy-field guard: never touch rows this tool did not migrate.
            if el.sc_type.is_empty() && el.sc_parent == 0 {
                continue;
            }
            let reverted = el
                .element_type
                .replace(GRID_TYPE_START, map.start_type)
                .replace(GRID_TYPE_SEPARATOR, map.part_type)
                .replace(GRID_TYPE_STOP, map.end_type);
            if reverted != el.element_type {
                el.element_type = reverted;
                affected += 1;
            }
        }
        Ok(affected)
    }

    async fn clear_templates(&mut self, table: ElementTable, prefix: &str) -> Result<u64> {
        let mut affected = 0;
        for el in self.rows_mut(table).values_mut() {
            if el.custom_tpl.starts_with(prefix) {
                el.custom_tpl.clear();
                affected += 1;
            }
        }
        Ok(affected)
    }

    async fn delete_tagged_definitions(&mut self, tag_prefix: &str) -> Result<u64> {
        let before = self.tables.grid_definitions.len();
        self.tables
            .grid_definitions
            .retain(|_, row| !row.description.contains(tag_prefix));
        Ok((before - self.tables.grid_definitions.len()) as u64)
    }

    async fn begin(&mut self) -> Result<()> {
        self.tx = Some(self.tables.clone());
        self.savepoints.clear();
        self.begun += 1;
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        self.tx = None;
        self.savepoints.clear();
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        if let Some(snapshot) = self.tx.take() {
            self.tables = snapshot;
        }
        self.savepoints.clear();
        Ok(())
    }

    async fn savepoint(&mut self, name: &str) -> Result<()> {
        self.savepoints
            .push((name.to_string(), self.tables.clone()));
        Ok(())
    }

    async fn release_savepoint(&mut self, name: &str) -> Result<()> {
        if let Some(pos) = self.savepoints.iter().rposition(|(n, _)| n == name) {
            self.savepoints.truncate(pos);
        }
        Ok(())
    }

    async fn rollback_to_savepoint(&mut self, name: &str) -> Result<()> {
        if let Some(pos) = self.savepoints.iter().rposition(|(n, _)| n == name) {
            self.tables = self.savepoints[pos].1.clone();
            // The savepoint itself survives a rollback-to.
            self.savepoints.truncate(pos + 1);
        }
        Ok(())
    }
}
