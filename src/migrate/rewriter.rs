//! Rewrite plan for one validated group.
//!
//! The storage layer executes a plan as exactly two update statements: one
//! for the start element, one for everything else.

use crate::model::{ColsetElement, MarkerKind};

use super::grouper::ColsetGroup;

/// All data needed to rewrite one group's rows in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewritePlan {
    pub table: crate::model::ElementTable,
    /// Id of the start element; becomes the grid parent of the rest.
    pub start_id: i64,
    /// Resolved target definition id.
    pub grid_id: i64,
    /// Grid name, taken from the start element's legacy sub-column name.
    pub grid_name: String,
    /// Template for the start element: its own legacy template or empty.
    pub start_template: String,
    /// Ids of every non-start element of the group.
    pub rest_ids: Vec<i64>,
    /// Backfill template for separator rows whose template is empty.
    pub part_template: String,
    /// Backfill template for the stop row when its template is empty.
    pub end_template: String,
}

/// Build the rewrite plan for a validated group.
///
/// Callers must have run validation: the group is assumed to hold exactly
/// one start and one end.
pub fn plan_rewrite(group: &ColsetGroup, grid_id: i64) -> RewritePlan {
    let start = group.start().expect("validated group has a start");

    let first_part = group
        .elements
        .iter()
        .find(|el| el.marker() == Some(MarkerKind::Part));
    let end = group
        .elements
        .iter()
        .find(|el| el.marker() == Some(MarkerKind::End));

    let rest_ids = group
        .elements
        .iter()
        .filter(|el| el.id != start.id)
        .map(|el| el.id)
        .collect();

    RewritePlan {
        table: group.table,
        start_id: start.id,
        grid_id,
        grid_name: start.sc_name.clone(),
        start_template: start.custom_tpl.clone(),
        rest_ids,
        part_template: first_part.map(|el| el.custom_tpl.clone()).unwrap_or_default(),
        end_template: end.map(|el| el.custom_tpl.clone()).unwrap_or_default(),
    }
}

/// Shared with the in-memory backend so both backends rename identically:
/// part and end types are substring-replaced, never reassigned wholesale,
/// so historic suffix variants survive.
pub fn rename_element_type(table: crate::model::ElementTable, element_type: &str) -> String {
    let map = table.map();
    element_type
        .replace(map.part_type, crate::model::GRID_TYPE_SEPARATOR)
        .replace(map.end_type, crate::model::GRID_TYPE_STOP)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ElementTable;
    use pretty_assertions::assert_eq;

    fn element(id: i64, element_type: &str, tpl: &str) -> ColsetElement {
        ColsetElement {
            id,
            element_type: element_type.into(),
            pid: 1,
            ptable: String::new(),
            sorting: id,
            invisible: false,
            sc_parent: 10,
            sc_type: "3".into(),
            sc_name: "Main columns".into(),
            table: ElementTable::Content,
            custom_tpl: tpl.into(),
            identifier: None,
        }
    }

    #[test]
    fn plan_carries_templates_and_rest_ids() {
        let group = ColsetGroup {
            table: ElementTable::Content,
            ptable: String::new(),
            parent_id: 10,
            elements: vec![
                element(10, "colsetStart", "ce_start_custom"),
                element(11, "colsetPart", "ce_part_custom"),
                element(12, "colsetPart", ""),
                element(13, "colsetEnd", "ce_end_custom"),
            ],
        };

        let plan = plan_rewrite(&group, 42);
        assert_eq!(plan.start_id, 10);
        assert_eq!(plan.grid_id, 42);
        assert_eq!(plan.grid_name, "Main columns");
        assert_eq!(plan.start_template, "ce_start_custom");
        assert_eq!(plan.rest_ids, vec![11, 12, 13]);
        assert_eq!(plan.part_template, "ce_part_custom");
        assert_eq!(plan.end_template, "ce_end_custom");
    }

    #[test]
    fn rename_replaces_substrings_only() {
        assert_eq!(
            rename_element_type(ElementTable::Content, "colsetEnd_custom"),
            "bs_gridStop_custom"
        );
        assert_eq!(rename_element_type(ElementTable::Content, "text"), "text");
    }
}
