//! End-to-end command tests over the in-memory backend.
//!
//! These exercise the same engine code paths the MySQL backend drives:
//! grouping, validation, the two-statement rewrite, savepoint scoping and
//! the rollback inverse.

use std::collections::BTreeMap;

use pretty_assertions::assert_eq;

use subcolumns2grid::config::{GlobalsConfig, MigrationSource};
use subcolumns2grid::error::MigrationError;
use subcolumns2grid::fix::{run_fix, FixOptions};
use subcolumns2grid::migrate::{run_migration, MigrateOptions};
use subcolumns2grid::model::{Breakpoint, ElementTable};
use subcolumns2grid::rollback::{run_rollback, AcceptAll, DenyAll};
use subcolumns2grid::storage::memory::{MemElement, MemoryStorage};
use subcolumns2grid::storage::{ColsetStorage, GRID_TABLE};

fn content_element(id: i64, element_type: &str, sc_parent: i64, sorting: i64) -> MemElement {
    MemElement {
        id,
        element_type: element_type.into(),
        pid: 1,
        ptable: "tl_article".into(),
        sorting,
        sc_parent,
        sc_type: "5".into(),
        ..Default::default()
    }
}

/// A database-sourced setup with one well-formed triplet referencing
/// definition 5 of tl_columnset.
fn seeded_storage() -> MemoryStorage {
    let mut storage = MemoryStorage::new();

    let mut columnsets = BTreeMap::new();
    columnsets.insert(
        Breakpoint::Md,
        r#"[{"width":"8"},{"width":"4"}]"#.to_string(),
    );
    storage.insert_colset(subcolumns2grid::extract::DbColsetRow {
        id: 5,
        title: "Two thirds".into(),
        published: true,
        columnsets,
        ..Default::default()
    });

    let mut start = content_element(10, "colsetStart", 10, 100);
    start.sc_name = "Main".into();
    start.custom_tpl = "ce_colsetStart_custom".into();
    storage.insert_element(ElementTable::Content, start);
    storage.insert_element(
        ElementTable::Content,
        content_element(11, "colsetPart", 10, 200),
    );
    storage.insert_element(
        ElementTable::Content,
        content_element(12, "colsetEnd_surround", 10, 300),
    );

    storage
}

#[tokio::test]
async fn migrate_rewrites_a_triplet_into_grid_elements() {
    let mut storage = seeded_storage();

    let log = run_migration(&mut storage, MigrateOptions::default())
        .await
        .unwrap();

    assert_eq!(log.definitions_migrated, 1);
    assert_eq!(log.groups_rewritten, 1);
    assert_eq!(log.groups_skipped, 0);
    assert!(!log.has_errors());

    let definitions = storage.grid_definitions();
    assert_eq!(definitions.len(), 1);
    let (grid_id, row) = &definitions[0];
    assert_eq!(row.title, "Two thirds");
    assert_eq!(row.description, "[sub2col:db.tl_columnset.5]");
    assert_eq!(row.sizes, r#"["md"]"#);

    let start = storage.element(ElementTable::Content, 10).unwrap();
    assert_eq!(start.element_type, "bs_gridStart");
    assert_eq!(start.grid, *grid_id);
    assert_eq!(start.grid_parent, 0);
    assert_eq!(start.grid_name, "Main");
    assert_eq!(start.custom_tpl, "ce_colsetStart_custom");

    let part = storage.element(ElementTable::Content, 11).unwrap();
    assert_eq!(part.element_type, "bs_gridSeparator");
    assert_eq!(part.grid_parent, 10);

    // The suffix variant survives the substring rename.
    let end = storage.element(ElementTable::Content, 12).unwrap();
    assert_eq!(end.element_type, "bs_gridStop_surround");
    assert_eq!(end.grid_parent, 10);
}

#[tokio::test]
async fn migrate_dry_run_leaves_storage_untouched() {
    let mut storage = seeded_storage();
    let before = storage.dump();

    let log = run_migration(
        &mut storage,
        MigrateOptions {
            dry_run: true,
            ..Default::default()
        },
    )
    .await
    .unwrap();

    // The log still reports the full run it rehearsed.
    assert_eq!(log.groups_rewritten, 1);
    assert!(log
        .notes()
        .iter()
        .any(|note| note.contains("dry-run")));
    assert_eq!(storage.dump(), before);
}

#[tokio::test]
async fn migrate_is_idempotent_across_runs() {
    let mut storage = seeded_storage();

    let first = run_migration(&mut storage, MigrateOptions::default())
        .await
        .unwrap();
    assert_eq!(first.definitions_migrated, 1);

    // Rewritten rows no longer match the legacy markers and the tagged
    // definition seeds the identifier map, so nothing happens twice.
    let second = run_migration(&mut storage, MigrateOptions::default())
        .await
        .unwrap();
    assert_eq!(second.definitions_migrated, 0);
    assert_eq!(second.groups_rewritten, 0);
    assert_eq!(storage.grid_definitions().len(), 1);
}

#[tokio::test]
async fn migrate_skips_corrupt_groups_via_savepoints() {
    let mut storage = seeded_storage();

    // Second partition: a start and a part but no end.
    for (id, element_type, sorting) in [(20, "colsetStart", 100), (21, "colsetPart", 200)] {
        let mut element = content_element(id, element_type, 20, sorting);
        element.ptable = "tl_news".into();
        storage.insert_element(ElementTable::Content, element);
    }

    let log = run_migration(&mut storage, MigrateOptions::default())
        .await
        .unwrap();

    assert_eq!(log.groups_rewritten, 1);
    assert_eq!(log.groups_skipped, 1);
    assert!(log.errors()[0].contains("no end element"));

    // The healthy group committed, the corrupt one rolled back untouched.
    assert_eq!(
        storage
            .element(ElementTable::Content, 10)
            .unwrap()
            .element_type,
        "bs_gridStart"
    );
    assert_eq!(
        storage
            .element(ElementTable::Content, 20)
            .unwrap()
            .element_type,
        "colsetStart"
    );
}

#[tokio::test]
async fn migrate_resolves_globals_references() {
    let mut storage = MemoryStorage::new();
    storage.remove_table("tl_columnset");

    let config: GlobalsConfig = toml::from_str(
        r#"
        [profiles.bootstrap]
        use_inside = true
        inside_class = "inner"

        [profiles.bootstrap.sets.half]
        columns = [
            { classes = "col-md-6" },
            { classes = "col-md-6" },
        ]
        "#,
    )
    .unwrap();

    for (id, element_type, sorting) in
        [(30, "formcolstart", 1), (31, "formcolend", 2)]
    {
        storage.insert_element(
            ElementTable::FormField,
            MemElement {
                id,
                element_type: element_type.into(),
                pid: 2,
                sorting,
                sc_parent: 30,
                sc_type: "bootstrap.half".into(),
                ..Default::default()
            },
        );
    }

    let log = run_migration(
        &mut storage,
        MigrateOptions {
            globals: Some(config),
            theme_id: 3,
            ..Default::default()
        },
    )
    .await
    .unwrap();

    assert_eq!(log.definitions_migrated, 1);
    assert_eq!(log.groups_rewritten, 1);
    assert!(log.required_templates.contains("inner"));

    let (_, row) = &storage.grid_definitions()[0];
    assert_eq!(row.theme_id, 3);
    assert_eq!(row.description, "[sub2col:globals.bootstrap.half]");
    assert_eq!(row.title, "bootstrap: half");

    assert_eq!(
        storage
            .element(ElementTable::FormField, 31)
            .unwrap()
            .element_type,
        "bs_gridStop"
    );
}

#[tokio::test]
async fn migrate_fails_without_installed_target_schema() {
    let mut storage = seeded_storage();
    storage.remove_table(GRID_TABLE);

    let err = run_migration(&mut storage, MigrateOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, MigrationError::Config(_)));
}

#[tokio::test]
async fn migrate_with_empty_source_fails_before_any_transaction_opens() {
    let mut storage = MemoryStorage::new();
    // tl_columnset exists but holds no definition rows.
    storage.insert_element(
        ElementTable::Content,
        content_element(10, "colsetStart", 10, 100),
    );

    let err = run_migration(&mut storage, MigrateOptions::default())
        .await
        .unwrap_err();
    match err {
        MigrationError::Config(message) => {
            assert!(message.contains("missing required source data"))
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(storage.transactions_begun(), 0);
}

#[tokio::test]
async fn migrate_rejects_ambiguous_sources() {
    let mut storage = seeded_storage();
    let globals: GlobalsConfig = toml::from_str(
        r#"
        [profiles.p.sets.s]
        columns = [ { classes = "col-6" } ]
        "#,
    )
    .unwrap();

    let err = run_migration(
        &mut storage,
        MigrateOptions {
            globals: Some(globals.clone()),
            ..Default::default()
        },
    )
    .await
    .unwrap_err();
    match err {
        MigrationError::Config(message) => assert!(message.contains("ambiguous")),
        other => panic!("unexpected error: {other}"),
    }

    // Forcing a source resolves the ambiguity.
    let log = run_migration(
        &mut storage,
        MigrateOptions {
            source: Some(MigrationSource::Database),
            globals: Some(globals),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(log.groups_rewritten, 1);
}

#[tokio::test]
async fn rollback_inverts_a_migration() {
    let mut storage = seeded_storage();
    let pristine = storage.dump();

    run_migration(&mut storage, MigrateOptions::default())
        .await
        .unwrap();
    let log = run_rollback(&mut storage, &mut AcceptAll).await.unwrap();

    assert_eq!(log.rows_reverted, 3);
    assert_eq!(log.definitions_deleted, 1);
    assert!(storage.grid_definitions().is_empty());

    for (id, element_type) in [
        (10, "colsetStart"),
        (11, "colsetPart"),
        (12, "colsetEnd_surround"),
    ] {
        assert_eq!(
            storage
                .element(ElementTable::Content, id)
                .unwrap()
                .element_type,
            element_type
        );
    }

    // Grid link columns are the only residue; everything legacy matches.
    assert_ne!(storage.dump(), pristine);
    assert_eq!(
        storage.element(ElementTable::Content, 10).unwrap().sc_type,
        "5"
    );
}

#[tokio::test]
async fn rollback_honors_declined_confirmations() {
    let mut storage = seeded_storage();
    run_migration(&mut storage, MigrateOptions::default())
        .await
        .unwrap();

    let log = run_rollback(&mut storage, &mut DenyAll).await.unwrap();

    assert_eq!(log.rows_reverted, 0);
    assert_eq!(log.definitions_deleted, 0);
    assert_eq!(storage.grid_definitions().len(), 1);
    assert!(log.notes().iter().any(|note| note.contains("skipped")));
}

#[tokio::test]
async fn fix_reparents_nested_sets() {
    let mut storage = MemoryStorage::new();

    // Historic corruption: an inner set kept the outer set's parent link.
    for (id, element_type, sorting) in [
        (10, "colsetStart", 100),
        (11, "colsetStart", 150),
        (14, "colsetPart", 160),
        (13, "colsetEnd", 170),
        (12, "colsetEnd", 300),
    ] {
        storage.insert_element(
            ElementTable::Content,
            content_element(id, element_type, 10, sorting),
        );
    }

    let log = run_fix(&mut storage, FixOptions::default()).await.unwrap();

    assert_eq!(log.groups_repaired, 1);
    for id in [11, 13, 14] {
        assert_eq!(
            storage.element(ElementTable::Content, id).unwrap().sc_parent,
            11
        );
    }
    // The outer set keeps its own linkage.
    for id in [10, 12] {
        assert_eq!(
            storage.element(ElementTable::Content, id).unwrap().sc_parent,
            10
        );
    }
}

#[tokio::test]
async fn fix_cleanses_invisible_corrupt_groups() {
    let mut storage = MemoryStorage::new();
    for (id, element_type, sorting) in [(40, "colsetStart", 1), (41, "colsetPart", 2)] {
        let mut element = content_element(id, element_type, 40, sorting);
        element.invisible = true;
        storage.insert_element(ElementTable::Content, element);
    }

    // Without cleanse the corrupt group is fatal.
    let err = run_fix(&mut storage, FixOptions::default())
        .await
        .unwrap_err();
    match err {
        MigrationError::Corrupt { selection, .. } => {
            assert!(selection.contains("tl_content"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(storage.element(ElementTable::Content, 40).is_some());

    let log = run_fix(
        &mut storage,
        FixOptions {
            cleanse: true,
            ..Default::default()
        },
    )
    .await
    .unwrap();

    assert_eq!(log.rows_deleted, 2);
    assert!(storage.element(ElementTable::Content, 40).is_none());
    assert!(storage.element(ElementTable::Content, 41).is_none());
}

#[tokio::test]
async fn fix_dry_run_reports_without_changing_rows() {
    let mut storage = MemoryStorage::new();
    for (id, element_type, sorting) in [
        (10, "colsetStart", 100),
        (11, "colsetStart", 150),
        (13, "colsetEnd", 170),
        (12, "colsetEnd", 300),
    ] {
        storage.insert_element(
            ElementTable::Content,
            content_element(id, element_type, 10, sorting),
        );
    }
    let before = storage.dump();

    let log = run_fix(
        &mut storage,
        FixOptions {
            dry_run: true,
            ..Default::default()
        },
    )
    .await
    .unwrap();

    assert_eq!(log.groups_repaired, 1);
    assert_eq!(storage.dump(), before);
}

#[tokio::test]
async fn savepoint_rollback_restores_the_scoped_state() {
    let mut storage = MemoryStorage::new();
    storage.insert_element(
        ElementTable::Content,
        content_element(1, "colsetStart", 1, 1),
    );

    storage.begin().await.unwrap();
    storage.savepoint("sp1").await.unwrap();
    storage
        .delete_elements(ElementTable::Content, &[1])
        .await
        .unwrap();
    assert!(storage.element(ElementTable::Content, 1).is_none());

    storage.rollback_to_savepoint("sp1").await.unwrap();
    assert!(storage.element(ElementTable::Content, 1).is_some());

    // The savepoint survives a rollback-to and can be released after.
    storage.release_savepoint("sp1").await.unwrap();
    storage.commit().await.unwrap();
    assert!(storage.element(ElementTable::Content, 1).is_some());
}
