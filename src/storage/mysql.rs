//! MySQL implementation of the storage seam, over a single sqlx connection.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use sqlx::{Connection, MySqlConnection, Row};

use crate::error::Result;
use crate::extract::DbColsetRow;
use crate::migrate::RewritePlan;
use crate::model::{
    ColsetElement, ElementRow, ElementTable, GRID_TYPE_SEPARATOR, GRID_TYPE_START, GRID_TYPE_STOP,
};
use crate::model::Breakpoint;

use super::{ColsetStorage, GridDefinitionRow, GRID_COL, GRID_NAME_COL, GRID_PARENT_COL, GRID_TABLE};

/// Legacy definition table consumed by the database source.
pub const COLSET_TABLE: &str = "tl_columnset";

pub struct MySqlStorage {
    conn: MySqlConnection,
    /// Memoized schema introspection, keyed by (table, column). The schema
    /// does not change mid-run, so entries never invalidate.
    column_cache: HashMap<(String, String), bool>,
    table_cache: HashMap<String, bool>,
}

impl MySqlStorage {
    pub async fn connect(url: &str) -> Result<Self> {
        Ok(Self {
            conn: MySqlConnection::connect(url).await?,
            column_cache: HashMap::new(),
            table_cache: HashMap::new(),
        })
    }

    async fn execute_simple(&mut self, sql: &str) -> Result<()> {
        sqlx::query(sql).execute(&mut self.conn).await?;
        Ok(())
    }

    fn placeholders(count: usize) -> String {
        vec!["?"; count].join(", ")
    }

    /// INSERT statement for one definition row. The grid table prefixes its
    /// row-class column, unlike the legacy `tl_columnset` schema.
    fn grid_definition_insert_sql(row: &GridDefinitionRow) -> String {
        let mut columns = vec![
            "pid".to_string(),
            "tstamp".to_string(),
            "title".to_string(),
            "description".to_string(),
            "gridRowClass".to_string(),
            "sizes".to_string(),
        ];
        for bp in row.columnsets.keys() {
            columns.push(format!("columnset_{bp}"));
        }

        format!(
            "INSERT INTO {GRID_TABLE} ({}) VALUES ({})",
            columns.join(", "),
            Self::placeholders(columns.len())
        )
    }
}

#[async_trait]
impl ColsetStorage for MySqlStorage {
    async fn column_exists(&mut self, table: &str, column: &str) -> Result<bool> {
        let key = (table.to_string(), column.to_string());
        if let Some(hit) = self.column_cache.get(&key) {
            return Ok(*hit);
        }
        let row = sqlx::query(
            "SELECT COUNT(*) AS n FROM information_schema.COLUMNS \
             WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ? AND COLUMN_NAME = ?",
        )
        .bind(table)
        .bind(column)
        .fetch_one(&mut self.conn)
        .await?;
        let exists = row.try_get::<i64, _>("n")? > 0;
        self.column_cache.insert(key, exists);
        Ok(exists)
    }

    async fn table_exists(&mut self, table: &str) -> Result<bool> {
        if let Some(hit) = self.table_cache.get(table) {
            return Ok(*hit);
        }
        let row = sqlx::query(
            "SELECT COUNT(*) AS n FROM information_schema.TABLES \
             WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ?",
        )
        .bind(table)
        .fetch_one(&mut self.conn)
        .await?;
        let exists = row.try_get::<i64, _>("n")? > 0;
        self.table_cache.insert(table.to_string(), exists);
        Ok(exists)
    }

    async fn fetch_colset_elements(&mut self, table: ElementTable) -> Result<Vec<ColsetElement>> {
        let map = table.map();
        // Very old schemas predate the visibility flag; rows then hydrate
        // as visible.
        let has_invisible = self.column_exists(map.table, "invisible").await?;

        let mut select = format!(
            "SELECT id, type, pid, sorting, customTpl, {}, {}, {}",
            map.parent_col, map.type_col, map.name_col
        );
        if has_invisible {
            select.push_str(", invisible");
        }
        if map.has_ptable {
            select.push_str(", ptable");
        }
        select.push_str(&format!(
            " FROM {} WHERE type LIKE '%{}%' OR type LIKE '%{}%' OR type LIKE '%{}%' \
             ORDER BY {}, sorting",
            map.table, map.start_type, map.part_type, map.end_type, map.parent_col
        ));

        let rows = sqlx::query(&select).fetch_all(&mut self.conn).await?;
        let mut hydrated: BTreeMap<i64, ElementRow> = BTreeMap::new();
        for row in rows {
            let partial = ElementRow {
                id: row.try_get::<i64, _>("id")?,
                element_type: Some(row.try_get("type")?),
                pid: Some(row.try_get("pid")?),
                ptable: if map.has_ptable {
                    Some(row.try_get("ptable")?)
                } else {
                    None
                },
                sorting: Some(row.try_get("sorting")?),
                invisible: if has_invisible {
                    Some(row.try_get::<String, _>("invisible")? == "1")
                } else {
                    None
                },
                sc_parent: Some(row.try_get(map.parent_col)?),
                sc_type: Some(row.try_get(map.type_col)?),
                sc_name: Some(row.try_get(map.name_col)?),
                custom_tpl: Some(row.try_get("customTpl")?),
            };
            match hydrated.entry(partial.id) {
                std::collections::btree_map::Entry::Occupied(mut entry) => {
                    entry.get_mut().absorb(partial);
                }
                std::collections::btree_map::Entry::Vacant(entry) => {
                    entry.insert(partial);
                }
            }
        }

        Ok(hydrated
            .into_values()
            .map(|row| row.into_element(table))
            .collect())
    }

    async fn fetch_db_colsets(&mut self) -> Result<Vec<DbColsetRow>> {
        if !self.table_exists(COLSET_TABLE).await? {
            return Ok(Vec::new());
        }

        // Older schema versions miss some breakpoint columns; select only
        // what exists.
        let mut present = Vec::new();
        for bp in Breakpoint::RECOGNIZED {
            if self
                .column_exists(COLSET_TABLE, &format!("columnset_{bp}"))
                .await?
            {
                present.push(bp);
            }
        }

        let mut select = String::from(
            "SELECT id, title, published, rowClass, useOutside, outsideClass, useInside, insideClass",
        );
        for bp in &present {
            select.push_str(&format!(", columnset_{bp}"));
        }
        select.push_str(&format!(" FROM {COLSET_TABLE} ORDER BY id"));

        let rows = sqlx::query(&select).fetch_all(&mut self.conn).await?;
        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let mut columnsets = BTreeMap::new();
            for bp in &present {
                columnsets.insert(*bp, row.try_get(format!("columnset_{bp}").as_str())?);
            }
            out.push(DbColsetRow {
                id: row.try_get("id")?,
                title: row.try_get("title")?,
                published: row.try_get::<String, _>("published")? == "1",
                row_class: row.try_get("rowClass")?,
                use_outside: row.try_get::<String, _>("useOutside")? == "1",
                outside_class: row.try_get("outsideClass")?,
                use_inside: row.try_get::<String, _>("useInside")? == "1",
                inside_class: row.try_get("insideClass")?,
                columnsets,
            });
        }
        Ok(out)
    }

    async fn fetch_migrated_definitions(&mut self) -> Result<Vec<(i64, String)>> {
        let rows = sqlx::query(&format!(
            "SELECT id, description FROM {GRID_TABLE} ORDER BY id"
        ))
        .fetch_all(&mut self.conn)
        .await?;
        rows.into_iter()
            .map(|row| Ok((row.try_get("id")?, row.try_get("description")?)))
            .collect()
    }

    async fn insert_grid_definition(&mut self, row: &GridDefinitionRow) -> Result<i64> {
        let sql = Self::grid_definition_insert_sql(row);
        let mut query = sqlx::query(&sql)
            .bind(row.theme_id)
            .bind(row.tstamp)
            .bind(&row.title)
            .bind(&row.description)
            .bind(&row.row_class)
            .bind(&row.sizes);
        for columns in row.columnsets.values() {
            query = query.bind(columns);
        }

        let result = query.execute(&mut self.conn).await?;
        Ok(result.last_insert_id() as i64)
    }

    async fn apply_rewrite(&mut self, plan: &RewritePlan) -> Result<()> {
        let map = plan.table.map();

        let start_sql = format!(
            "UPDATE {} SET type = ?, {GRID_PARENT_COL} = 0, {GRID_NAME_COL} = ?, \
             {GRID_COL} = ?, customTpl = ? WHERE id = ?",
            map.table
        );
        sqlx::query(&start_sql)
            .bind(GRID_TYPE_START)
            .bind(&plan.grid_name)
            .bind(plan.grid_id)
            .bind(&plan.start_template)
            .bind(plan.start_id)
            .execute(&mut self.conn)
            .await?;

        if plan.rest_ids.is_empty() {
            return Ok(());
        }

        // customTpl must be assigned before type: MySQL evaluates SET
        // left to right and the CASE still needs the legacy type value.
        let rest_sql = format!(
            "UPDATE {} SET {GRID_PARENT_COL} = ?, \
             customTpl = CASE WHEN customTpl <> '' THEN customTpl \
                              WHEN type LIKE '%{}%' THEN ? ELSE ? END, \
             type = REPLACE(REPLACE(type, '{}', '{GRID_TYPE_SEPARATOR}'), '{}', '{GRID_TYPE_STOP}') \
             WHERE id IN ({})",
            map.table,
            map.end_type,
            map.part_type,
            map.end_type,
            Self::placeholders(plan.rest_ids.len())
        );
        let mut query = sqlx::query(&rest_sql)
            .bind(plan.start_id)
            .bind(&plan.end_template)
            .bind(&plan.part_template);
        for id in &plan.rest_ids {
            query = query.bind(*id);
        }
        query.execute(&mut self.conn).await?;

        Ok(())
    }

    async fn reparent_elements(
        &mut self,
        table: ElementTable,
        ids: &[i64],
        parent: i64,
    ) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        let map = table.map();
        let sql = format!(
            "UPDATE {} SET {} = ? WHERE id IN ({})",
            map.table,
            map.parent_col,
            Self::placeholders(ids.len())
        );
        let mut query = sqlx::query(&sql).bind(parent);
        for id in ids {
            query = query.bind(*id);
        }
        Ok(query.execute(&mut self.conn).await?.rows_affected())
    }

    async fn delete_elements(&mut self, table: ElementTable, ids: &[i64]) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        let sql = format!(
            "DELETE FROM {} WHERE id IN ({})",
            table.table_name(),
            Self::placeholders(ids.len())
        );
        let mut query = sqlx::query(&sql);
        for id in ids {
            query = query.bind(*id);
        }
        Ok(query.execute(&mut self.conn).await?.rows_affected())
    }

    async fn revert_types(&mut self, table: ElementTable) -> Result<u64> {
        let map = table.map();
        // Only rows whose legacy sub-column fields survive; anything else
        // was never migrated by this tool.
        let sql = format!(
            "UPDATE {} SET type = REPLACE(REPLACE(REPLACE(type, \
             '{GRID_TYPE_START}', '{}'), '{GRID_TYPE_SEPARATOR}', '{}'), '{GRID_TYPE_STOP}', '{}') \
             WHERE type LIKE '%bs_grid%' AND ({} <> '' OR {} <> 0)",
            map.table, map.start_type, map.part_type, map.end_type, map.type_col, map.parent_col
        );
        Ok(sqlx::query(&sql)
            .execute(&mut self.conn)
            .await?
            .rows_affected())
    }

    async fn clear_templates(&mut self, table: ElementTable, prefix: &str) -> Result<u64> {
        let sql = format!(
            "UPDATE {} SET customTpl = '' WHERE customTpl LIKE ?",
            table.table_name()
        );
        Ok(sqlx::query(&sql)
            .bind(format!("{prefix}%"))
            .execute(&mut self.conn)
            .await?
            .rows_affected())
    }

    async fn delete_tagged_definitions(&mut self, tag_prefix: &str) -> Result<u64> {
        let sql = format!("DELETE FROM {GRID_TABLE} WHERE description LIKE ?");
        Ok(sqlx::query(&sql)
            .bind(format!("%{tag_prefix}%"))
            .execute(&mut self.conn)
            .await?
            .rows_affected())
    }

    async fn begin(&mut self) -> Result<()> {
        self.execute_simple("BEGIN").await
    }

    async fn commit(&mut self) -> Result<()> {
        self.execute_simple("COMMIT").await
    }

    async fn rollback(&mut self) -> Result<()> {
        self.execute_simple("ROLLBACK").await
    }

    async fn savepoint(&mut self, name: &str) -> Result<()> {
        self.execute_simple(&format!("SAVEPOINT {name}")).await
    }

    async fn release_savepoint(&mut self, name: &str) -> Result<()> {
        self.execute_simple(&format!("RELEASE SAVEPOINT {name}")).await
    }

    async fn rollback_to_savepoint(&mut self, name: &str) -> Result<()> {
        self.execute_simple(&format!("ROLLBACK TO SAVEPOINT {name}")).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn definition_insert_targets_the_grid_schema_columns() {
        let mut row = GridDefinitionRow::default();
        row.columnsets.insert(Breakpoint::Md, "[]".into());
        row.columnsets.insert(Breakpoint::Xl, "[]".into());

        assert_eq!(
            MySqlStorage::grid_definition_insert_sql(&row),
            "INSERT INTO tl_bs_grid \
             (pid, tstamp, title, description, gridRowClass, sizes, columnset_md, columnset_xl) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)"
        );
    }
}
