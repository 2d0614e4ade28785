//! Legacy element rows and the per-table column-name mapping.
//!
//! The two element tables carry the same semantic fields under different
//! prefixes (`sc_*` on content elements, `fsc_*` on form fields); [`TableMap`]
//! holds the per-table names so every query is built from one code path.

use std::fmt;

use super::colset::ColsetIdentifier;

/// Target type written onto a group's start element.
pub const GRID_TYPE_START: &str = "bs_gridStart";
/// Target type substituted for legacy part elements.
pub const GRID_TYPE_SEPARATOR: &str = "bs_gridSeparator";
/// Target type substituted for legacy end elements.
pub const GRID_TYPE_STOP: &str = "bs_gridStop";

/// Name prefix of templates staged by this tool; rollback clears matches.
pub const TEMPLATE_PREFIX: &str = "ce_bs_grid";

/// The two legacy element-table families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementTable {
    Content,
    FormField,
}

impl ElementTable {
    pub const ALL: [ElementTable; 2] = [ElementTable::Content, ElementTable::FormField];

    pub fn map(self) -> &'static TableMap {
        match self {
            ElementTable::Content => &CONTENT_MAP,
            ElementTable::FormField => &FORM_FIELD_MAP,
        }
    }

    pub fn table_name(self) -> &'static str {
        self.map().table
    }
}

impl fmt::Display for ElementTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_name())
    }
}

/// Per-table names for the shared semantic fields.
pub struct TableMap {
    pub table: &'static str,
    pub start_type: &'static str,
    pub part_type: &'static str,
    pub end_type: &'static str,
    /// Sub-column parent-link column (`sc_parent` / `fsc_parent`).
    pub parent_col: &'static str,
    /// Sub-column set reference column (`sc_type` / `fsc_type`).
    pub type_col: &'static str,
    pub name_col: &'static str,
    pub childs_col: &'static str,
    /// Content elements carry a `ptable` discriminator, form fields do not.
    pub has_ptable: bool,
}

static CONTENT_MAP: TableMap = TableMap {
    table: "tl_content",
    start_type: "colsetStart",
    part_type: "colsetPart",
    end_type: "colsetEnd",
    parent_col: "sc_parent",
    type_col: "sc_type",
    name_col: "sc_name",
    childs_col: "sc_childs",
    has_ptable: true,
};

static FORM_FIELD_MAP: TableMap = TableMap {
    table: "tl_form_field",
    start_type: "formcolstart",
    part_type: "formcolpart",
    end_type: "formcolend",
    parent_col: "fsc_parent",
    type_col: "fsc_type",
    name_col: "fsc_name",
    childs_col: "fsc_childs",
    has_ptable: false,
};

/// Bracket role of one element type within its table family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind {
    Start,
    Part,
    End,
}

impl TableMap {
    /// Classify an element type against this family's three legacy markers.
    ///
    /// Matches by substring so historic suffix variants still classify.
    pub fn classify(&self, element_type: &str) -> Option<MarkerKind> {
        if element_type.contains(self.start_type) {
            Some(MarkerKind::Start)
        } else if element_type.contains(self.part_type) {
            Some(MarkerKind::Part)
        } else if element_type.contains(self.end_type) {
            Some(MarkerKind::End)
        } else {
            None
        }
    }
}

/// Read-only projection of one legacy element row.
///
/// Snapshot per migration pass; the backing row is only ever rewritten via
/// SQL, never through this value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColsetElement {
    pub id: i64,
    pub element_type: String,
    pub pid: i64,
    /// Empty for form fields.
    pub ptable: String,
    pub sorting: i64,
    pub invisible: bool,
    /// Sub-column parent-link; a start element points at itself.
    pub sc_parent: i64,
    /// Sub-column set reference, as stored.
    pub sc_type: String,
    pub sc_name: String,
    pub table: ElementTable,
    pub custom_tpl: String,
    /// Attached by the source strategy that produced the row.
    pub identifier: Option<ColsetIdentifier>,
}

impl ColsetElement {
    pub fn marker(&self) -> Option<MarkerKind> {
        self.table.map().classify(&self.element_type)
    }
}

/// Partial element row used during hydration.
///
/// Rows can reach the engine more than once (optional-column overlays, a
/// start row re-selected as its own parent); [`ElementRow::absorb`] keeps the
/// legacy merge rule: new data only fills previously-unset fields.
#[derive(Debug, Clone, Default)]
pub struct ElementRow {
    pub id: i64,
    pub element_type: Option<String>,
    pub pid: Option<i64>,
    pub ptable: Option<String>,
    pub sorting: Option<i64>,
    pub invisible: Option<bool>,
    pub sc_parent: Option<i64>,
    pub sc_type: Option<String>,
    pub sc_name: Option<String>,
    pub custom_tpl: Option<String>,
}

impl ElementRow {
    /// Fill unset fields from `other`; set fields are never overwritten.
    pub fn absorb(&mut self, other: ElementRow) {
        self.element_type = self.element_type.take().or(other.element_type);
        self.pid = self.pid.or(other.pid);
        self.ptable = self.ptable.take().or(other.ptable);
        self.sorting = self.sorting.or(other.sorting);
        self.invisible = self.invisible.or(other.invisible);
        self.sc_parent = self.sc_parent.or(other.sc_parent);
        self.sc_type = self.sc_type.take().or(other.sc_type);
        self.sc_name = self.sc_name.take().or(other.sc_name);
        self.custom_tpl = self.custom_tpl.take().or(other.custom_tpl);
    }

    /// Finish hydration, defaulting anything still unset.
    pub fn into_element(self, table: ElementTable) -> ColsetElement {
        ColsetElement {
            id: self.id,
            element_type: self.element_type.unwrap_or_default(),
            pid: self.pid.unwrap_or_default(),
            ptable: self.ptable.unwrap_or_default(),
            sorting: self.sorting.unwrap_or_default(),
            invisible: self.invisible.unwrap_or_default(),
            sc_parent: self.sc_parent.unwrap_or_default(),
            sc_type: self.sc_type.unwrap_or_default(),
            sc_name: self.sc_name.unwrap_or_default(),
            table,
            custom_tpl: self.custom_tpl.unwrap_or_default(),
            identifier: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn classify_matches_suffix_variants_by_substring() {
        let map = ElementTable::Content.map();
        assert_eq!(map.classify("colsetStart"), Some(MarkerKind::Start));
        assert_eq!(map.classify("colsetEnd_custom"), Some(MarkerKind::End));
        assert_eq!(map.classify("text"), None);
        // The form family's markers are unknown to the content family.
        assert_eq!(map.classify("formcolstart"), None);
    }

    #[test]
    fn absorb_only_fills_unset_fields() {
        let mut first = ElementRow {
            id: 3,
            element_type: Some("colsetStart".into()),
            sc_parent: Some(3),
            ..Default::default()
        };
        first.absorb(ElementRow {
            id: 3,
            element_type: Some("colsetPart".into()),
            sorting: Some(128),
            ..Default::default()
        });

        assert_eq!(first.element_type.as_deref(), Some("colsetStart"));
        assert_eq!(first.sorting, Some(128));
        assert_eq!(first.sc_parent, Some(3));

        let element = first.into_element(ElementTable::Content);
        assert_eq!(element.marker(), Some(MarkerKind::Start));
        assert_eq!(element.ptable, "");
    }
}
