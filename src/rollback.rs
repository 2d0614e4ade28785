//! The rollback command: undo a previous migration run.
//!
//! Three independently confirmed steps: revert type renames on rows whose
//! legacy sub-column fields survive, clear templates staged by this tool,
//! delete target definitions carrying the provenance tag.

use crate::error::Result;
use crate::migrate::PROVENANCE_PREFIX;
use crate::model::{ElementTable, TEMPLATE_PREFIX};
use crate::report::MigrationLog;
use crate::storage::ColsetStorage;

/// Interactive confirmation seam. Non-interactive contexts answer "no".
pub trait Confirm {
    fn confirm(&mut self, prompt: &str) -> bool;
}

/// Declines every prompt.
pub struct DenyAll;

impl Confirm for DenyAll {
    fn confirm(&mut self, _prompt: &str) -> bool {
        false
    }
}

/// Accepts every prompt.
pub struct AcceptAll;

impl Confirm for AcceptAll {
    fn confirm(&mut self, _prompt: &str) -> bool {
        true
    }
}

pub async fn run_rollback(
    storage: &mut dyn ColsetStorage,
    confirm: &mut dyn Confirm,
) -> Result<MigrationLog> {
    let mut log = MigrationLog::new();

    storage.begin().await?;
    match rollback_inner(storage, confirm, &mut log).await {
        Ok(()) => {
            storage.commit().await?;
            Ok(log)
        }
        Err(err) => {
            let _ = storage.rollback().await;
            Err(err)
        }
    }
}

async fn rollback_inner(
    storage: &mut dyn ColsetStorage,
    confirm: &mut dyn Confirm,
    log: &mut MigrationLog,
) -> Result<()> {
    if confirm.confirm("Revert grid element types back to their legacy sub-column types?") {
        for table in ElementTable::ALL {
            let rows = storage.revert_types(table).await?;
            log.rows_reverted += rows;
            if rows == 0 {
                log.note(format!("{table}: no grid types to revert"));
            } else {
                log.note(format!("{table}: reverted {rows} rows to legacy types"));
            }
        }
    } else {
        log.note("type revert skipped");
    }

    if confirm.confirm("Clear element templates staged by this tool?") {
        for table in ElementTable::ALL {
            let rows = storage.clear_templates(table, TEMPLATE_PREFIX).await?;
            log.templates_cleared += rows;
            if rows == 0 {
                log.note(format!("{table}: no staged templates to clear"));
            } else {
                log.note(format!("{table}: cleared templates on {rows} rows"));
            }
        }
    } else {
        log.note("template clearing skipped");
    }

    if confirm.confirm("Delete migrated grid definitions?") {
        let rows = storage.delete_tagged_definitions(PROVENANCE_PREFIX).await?;
        log.definitions_deleted = rows;
        if rows == 0 {
            log.note("no migrated grid definitions to delete");
        } else {
            log.note(format!("deleted {rows} migrated grid definitions"));
        }
    } else {
        log.note("definition deletion skipped");
    }

    Ok(())
}
