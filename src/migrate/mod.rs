//! The migrate command: definitions pass, then the transactional rewrite of
//! element rows, one savepoint per group.

pub mod definitions;
pub mod grouper;
pub mod rewriter;

use crate::config::{GlobalsConfig, MigrationSource};
use crate::error::{GroupError, MigrationError, Result};
use crate::extract::SourceStrategy;
use crate::model::{ColumnSetDefinition, ElementTable};
use crate::report::MigrationLog;
use crate::storage::{ColsetStorage, GRID_COL, GRID_TABLE};

pub use self::definitions::{
    migrate_definitions, parse_provenance, provenance_tag, IdentifierMap, PROVENANCE_PREFIX,
};
pub use self::grouper::{validate_group, ColsetGroup, ElementGrouper};
pub use self::rewriter::{plan_rewrite, rename_element_type, RewritePlan};

/// Options of one migrate run.
#[derive(Debug, Default)]
pub struct MigrateOptions {
    /// Forced origin; `None` auto-detects and fails when ambiguous.
    pub source: Option<MigrationSource>,
    /// Injected globals profiles, when the operator provides them.
    pub globals: Option<GlobalsConfig>,
    /// Parent theme id recorded on inserted definitions.
    pub theme_id: i64,
    /// Run the full transaction, then unconditionally discard it.
    pub dry_run: bool,
}

/// Run the whole migration inside one outer transaction.
///
/// A corrupt or unresolvable group rolls back to its savepoint and is
/// recorded as an error note; everything else proceeds.
pub async fn run_migration(
    storage: &mut dyn ColsetStorage,
    options: MigrateOptions,
) -> Result<MigrationLog> {
    let mut log = MigrationLog::new();

    preflight(storage).await?;
    let strategy = select_source(storage, &options).await?;

    // Read-only extraction; an empty source is a config fault and must
    // surface before any transaction opens.
    let definitions = strategy.extract(storage, &mut log).await?;
    if definitions.is_empty() {
        return Err(MigrationError::Config(
            "missing required source data: no column-set definitions found".into(),
        ));
    }

    storage.begin().await?;
    match migrate_inner(storage, &strategy, definitions, options.theme_id, &mut log).await {
        Ok(()) => {
            if options.dry_run {
                storage.rollback().await?;
                log.note("dry-run: transaction discarded, no rows were changed");
            } else {
                storage.commit().await?;
            }
            Ok(log)
        }
        Err(err) => {
            let _ = storage.rollback().await;
            Err(err)
        }
    }
}

/// Verify the target schema is installed before any transaction opens.
async fn preflight(storage: &mut dyn ColsetStorage) -> Result<()> {
    if !storage.table_exists(GRID_TABLE).await? {
        return Err(MigrationError::Config(format!(
            "target table {GRID_TABLE} is missing; install the grid extension first"
        )));
    }
    for table in ElementTable::ALL {
        if !storage.column_exists(table.table_name(), GRID_COL).await? {
            return Err(MigrationError::Config(format!(
                "column {GRID_COL} is missing on {table}; install the grid extension first"
            )));
        }
    }
    Ok(())
}

/// Pick the legacy origin, or fail on ambiguity.
async fn select_source(
    storage: &mut dyn ColsetStorage,
    options: &MigrateOptions,
) -> Result<SourceStrategy> {
    let globals = options
        .globals
        .as_ref()
        .filter(|config| !config.is_empty());
    let db_available = storage.table_exists("tl_columnset").await?;

    match options.source {
        Some(MigrationSource::Database) => {
            if !db_available {
                return Err(MigrationError::Config(
                    "database source forced but tl_columnset does not exist".into(),
                ));
            }
            Ok(SourceStrategy::Database)
        }
        Some(MigrationSource::Globals) => match globals {
            Some(config) => Ok(SourceStrategy::Globals {
                config: config.clone(),
            }),
            None => Err(MigrationError::Config(
                "globals source forced but no globals profiles were provided".into(),
            )),
        },
        None => match (db_available, globals) {
            (true, Some(_)) => Err(MigrationError::Config(
                "ambiguous source selection: tl_columnset and globals profiles both exist; \
                 pass an explicit source"
                    .into(),
            )),
            (true, None) => Ok(SourceStrategy::Database),
            (false, Some(config)) => Ok(SourceStrategy::Globals {
                config: config.clone(),
            }),
            (false, None) => Err(MigrationError::Config(
                "missing required source data: neither tl_columnset nor globals profiles exist"
                    .into(),
            )),
        },
    }
}

async fn migrate_inner(
    storage: &mut dyn ColsetStorage,
    strategy: &SourceStrategy,
    mut definitions: Vec<ColumnSetDefinition>,
    theme_id: i64,
    log: &mut MigrationLog,
) -> Result<()> {
    let mut map = IdentifierMap::new();
    migrate_definitions(&mut definitions, theme_id, storage, &mut map, log).await?;
    for definition in &definitions {
        log.required_templates.extend(definition.inside_classes());
    }

    let mut savepoint_seq = 0usize;
    for table in ElementTable::ALL {
        let mut elements = storage.fetch_colset_elements(table).await?;
        elements.sort_by(|a, b| {
            a.ptable
                .cmp(&b.ptable)
                .then(a.sc_parent.cmp(&b.sc_parent))
                .then(a.sorting.cmp(&b.sorting))
        });

        let mut grouper = ElementGrouper::new(table);
        let mut groups = Vec::new();
        for element in elements {
            groups.extend(grouper.feed(strategy.attach_identifier(element)));
        }
        groups.extend(grouper.finish());

        for group in &groups {
            let savepoint = format!("colset_group_{savepoint_seq}");
            savepoint_seq += 1;

            storage.savepoint(&savepoint).await?;
            match rewrite_group(storage, group, &map).await? {
                Ok(()) => {
                    storage.release_savepoint(&savepoint).await?;
                    log.groups_rewritten += 1;
                }
                Err(group_err) => {
                    storage.rollback_to_savepoint(&savepoint).await?;
                    log.groups_skipped += 1;
                    log.error(format!(
                        "{table}: skipped group of parent {}: {group_err}",
                        group.parent_id
                    ));
                }
            }
        }
    }

    Ok(())
}

/// Rewrite one group. The inner result is the skippable per-group outcome;
/// the outer one carries storage failures, which stay fatal.
async fn rewrite_group(
    storage: &mut dyn ColsetStorage,
    group: &ColsetGroup,
    map: &IdentifierMap,
) -> Result<std::result::Result<(), GroupError>> {
    if let Err(err) = validate_group(group) {
        return Ok(Err(err));
    }
    let grid_id = match resolve_group(group, map) {
        Ok(id) => id,
        Err(err) => return Ok(Err(err)),
    };

    let plan = plan_rewrite(group, grid_id);
    storage.apply_rewrite(&plan).await?;
    Ok(Ok(()))
}

/// Resolve which migrated definition a group rewrites into.
pub fn resolve_group(
    group: &ColsetGroup,
    map: &IdentifierMap,
) -> std::result::Result<i64, GroupError> {
    let first = group
        .elements
        .first()
        .expect("flushed groups are never empty");
    let identifier = first
        .identifier
        .as_ref()
        .ok_or_else(|| GroupError::UnresolvedIdentifier(first.sc_type.clone()))?;
    map.lookup(identifier)
        .ok_or_else(|| GroupError::UnresolvedIdentifier(identifier.to_string()))
}
