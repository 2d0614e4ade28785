//! The fix command: repair corrupted legacy parent linkage before migrating.
//!
//! Runs the same grouping state machine as the migration but tolerates
//! malformed trailing groups. Everything happens in one all-or-nothing
//! outer transaction; dry-run discards it at the end.

use crate::error::{GroupError, MigrationError, Result};
use crate::migrate::{validate_group, ElementGrouper};
use crate::model::ElementTable;
use crate::report::MigrationLog;
use crate::storage::ColsetStorage;

/// Options of one fix run.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixOptions {
    /// Run the full transaction, then unconditionally discard it.
    pub dry_run: bool,
    /// Delete corrupt groups whose rows are all invisible.
    pub cleanse: bool,
}

pub async fn run_fix(
    storage: &mut dyn ColsetStorage,
    options: FixOptions,
) -> Result<MigrationLog> {
    let mut log = MigrationLog::new();

    storage.begin().await?;
    match fix_inner(storage, options, &mut log).await {
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

async fn fix_inner(
    storage: &mut dyn ColsetStorage,
    options: FixOptions,
    log: &mut MigrationLog,
) -> Result<()> {
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
            groups.extend(grouper.feed(element));
        }
        groups.extend(grouper.finish());

        for group in &groups {
            match validate_group(group) {
                Ok(()) => {}
                // A well-bracketed set rooted elsewhere: historic corruption
                // where nested sets kept the outer set's parent link.
                Err(GroupError::ParentMismatch { id, parent }) => {
                    let rows = storage.reparent_elements(table, &group.ids(), id).await?;
                    log.groups_repaired += 1;
                    log.note(format!(
                        "{table}: re-parented {rows} rows of set {id} away from parent {parent}"
                    ));
                }
                Err(err) => {
                    if options.cleanse && group.all_invisible() {
                        let ids = group.ids();
                        let rows = storage.delete_elements(table, &ids).await?;
                        log.rows_deleted += rows;
                        log.note(format!(
                            "{table}: deleted invisible corrupt group ({err}); rows {ids:?}; \
                             selection: {}",
                            group.selection_sql()
                        ));
                    } else {
                        return Err(MigrationError::Corrupt {
                            selection: group.selection_sql(),
                            source: err,
                        });
                    }
                }
            }
        }
    }

    Ok(())
}
