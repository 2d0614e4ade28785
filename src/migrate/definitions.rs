//! Definition migration and the identifier → target-id mapping.

use std::collections::BTreeMap;
use std::collections::HashMap;

use chrono::Utc;

use crate::error::Result;
use crate::model::{ColsetIdentifier, ColumnSetDefinition};
use crate::report::MigrationLog;
use crate::storage::{ColsetStorage, GridDefinitionRow};

/// Opening of the recoverable provenance tag embedded in descriptions.
pub const PROVENANCE_PREFIX: &str = "[sub2col:";

/// Tag a definition's origin so later runs and the rollback engine can
/// recover provenance without a separate mapping table.
pub fn provenance_tag(identifier: &ColsetIdentifier) -> String {
    format!("{PROVENANCE_PREFIX}{identifier}]")
}

/// Recover the identifier from a description carrying the tag.
pub fn parse_provenance(description: &str) -> Option<ColsetIdentifier> {
    let start = description.find(PROVENANCE_PREFIX)?;
    let rest = &description[start + PROVENANCE_PREFIX.len()..];
    let end = rest.find(']')?;
    ColsetIdentifier::parse(&rest[..end])
}

/// Identifier → persisted target-schema row id, for one migration run.
///
/// Database-origin and global-origin identifiers live in independent maps.
#[derive(Debug, Default)]
pub struct IdentifierMap {
    database: HashMap<i64, i64>,
    global: HashMap<(String, String), i64>,
}

impl IdentifierMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, identifier: &ColsetIdentifier, grid_id: i64) {
        match identifier {
            ColsetIdentifier::Database(id) => {
                self.database.insert(*id, grid_id);
            }
            ColsetIdentifier::Global { profile, set } => {
                self.global.insert((profile.clone(), set.clone()), grid_id);
            }
        }
    }

    pub fn lookup(&self, identifier: &ColsetIdentifier) -> Option<i64> {
        match identifier {
            ColsetIdentifier::Database(id) => self.database.get(id).copied(),
            ColsetIdentifier::Global { profile, set } => self
                .global
                .get(&(profile.clone(), set.clone()))
                .copied(),
        }
    }

    pub fn len(&self) -> usize {
        self.database.len() + self.global.len()
    }

    pub fn is_empty(&self) -> bool {
        self.database.is_empty() && self.global.is_empty()
    }
}

/// Persist every not-yet-migrated definition and record its new id.
///
/// Seeds the map from already-present tagged rows first, so a re-run never
/// duplicates definitions.
pub async fn migrate_definitions(
    definitions: &mut [ColumnSetDefinition],
    theme_id: i64,
    storage: &mut dyn ColsetStorage,
    map: &mut IdentifierMap,
    log: &mut MigrationLog,
) -> Result<()> {
    for (id, description) in storage.fetch_migrated_definitions().await? {
        if let Some(identifier) = parse_provenance(&description) {
            map.insert(&identifier, id);
        }
    }

    let tstamp = Utc::now().timestamp();
    for definition in definitions.iter_mut() {
        if let Some(existing) = map.lookup(&definition.identifier) {
            definition.migrated_id = Some(existing);
            continue;
        }

        let row = build_grid_row(definition, theme_id, tstamp)?;
        let grid_id = storage.insert_grid_definition(&row).await?;
        map.insert(&definition.identifier, grid_id);
        definition.migrated_id = Some(grid_id);
        log.definitions_migrated += 1;
    }

    Ok(())
}

/// Serialize one definition into a target-schema row.
///
/// Breakpoints are filtered to the recognized tiers and ordered by rank;
/// every serialized array carries the full column cardinality.
fn build_grid_row(
    definition: &ColumnSetDefinition,
    theme_id: i64,
    tstamp: i64,
) -> Result<GridDefinitionRow> {
    let count = definition.column_count();
    let mut sizes = Vec::new();
    let mut columnsets = BTreeMap::new();
    for (bp, breakpoint) in definition.recognized_breakpoints() {
        sizes.push(bp.as_str());
        columnsets.insert(bp, serde_json::to_string(&breakpoint.as_array(count))?);
    }

    Ok(GridDefinitionRow {
        theme_id,
        tstamp,
        title: definition.title.clone(),
        description: provenance_tag(&definition.identifier),
        row_class: definition.row_classes.clone(),
        sizes: serde_json::to_string(&sizes)?,
        columnsets,
    })
}
