//! Extractor for column-sets defined in the legacy `tl_columnset` table.

use std::collections::BTreeMap;

use crate::error::Result;
use crate::model::{
    truncate_row_classes, Breakpoint, BreakpointDefinition, ColsetIdentifier, ColumnDefinition,
    ColumnSetDefinition,
};
use crate::report::MigrationLog;

/// Raw legacy definition row, per-breakpoint columns still serialized.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DbColsetRow {
    pub id: i64,
    pub title: String,
    pub published: bool,
    pub row_class: String,
    pub use_outside: bool,
    pub outside_class: String,
    pub use_inside: bool,
    pub inside_class: String,
    /// JSON column arrays keyed by breakpoint, as stored.
    pub columnsets: BTreeMap<Breakpoint, String>,
}

/// Normalize one legacy row into a [`ColumnSetDefinition`].
///
/// The stored data is already breakpoint-major, so no class derivation runs;
/// numeric fields are still re-sanitized through the lenient setters.
pub fn normalize_db_colset(
    row: &DbColsetRow,
    log: &mut MigrationLog,
) -> Result<ColumnSetDefinition> {
    let identifier = ColsetIdentifier::Database(row.id);

    let mut breakpoints: BTreeMap<Breakpoint, BreakpointDefinition> = BTreeMap::new();
    for (bp, raw) in &row.columnsets {
        if raw.trim().is_empty() {
            continue;
        }
        let stored: Vec<ColumnDefinition> = serde_json::from_str(raw)?;
        let mut definition = BreakpointDefinition::new();
        for (index, mut column) in stored.into_iter().enumerate() {
            let width = column.width.clone();
            column.set_width(&width);
            let offset = column.offset.clone();
            column.set_offset(&offset);
            let order = column.order.clone();
            column.set_order(&order);
            definition.insert(index, column);
        }
        breakpoints.insert(*bp, definition);
    }

    let target = breakpoints
        .values()
        .map(BreakpointDefinition::span_len)
        .max()
        .unwrap_or(0);
    for definition in breakpoints.values_mut() {
        definition.pad_to(target);
    }

    let (row_classes, dropped) = truncate_row_classes(&row.row_class);
    if dropped.is_some() {
        log.note(format!(
            "row classes of {identifier} truncated from \"{}\" to \"{row_classes}\"",
            row.row_class
        ));
    }

    let title = if row.title.is_empty() {
        format!("Column set {}", row.id)
    } else {
        row.title.clone()
    };

    Ok(ColumnSetDefinition {
        identifier,
        title,
        published: row.published,
        use_outside: row.use_outside,
        outside_class: row.outside_class.clone(),
        use_inside: row.use_inside,
        inside_class: row.inside_class.clone(),
        row_classes,
        breakpoints,
        migrated_id: None,
    })
}
