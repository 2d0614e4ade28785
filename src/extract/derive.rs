//! Breakpoint derivation: rebuild breakpoint-major structure from ordered
//! per-column class strings.
//!
//! Legacy profiles expressed a layout as sibling class strings; the target
//! schema wants one column array per breakpoint. Breakpoint-unspecific
//! classes keep their legacy meaning of "smallest viewport and up".

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use crate::config::SingleColumn;
use crate::model::{Breakpoint, BreakpointDefinition, ColumnDefinition};
use crate::parser::{tokenize_classes, TokenKind};

/// Derive per-breakpoint column definitions from ordered legacy columns.
pub fn derive_breakpoints(
    columns: &[SingleColumn],
) -> BTreeMap<Breakpoint, BreakpointDefinition> {
    // Keyed by Option: None is the placeholder tier for breakpoint-less
    // classes until the final merge.
    let mut derived: BTreeMap<Option<Breakpoint>, BreakpointDefinition> = BTreeMap::new();

    for (index, column) in columns.iter().enumerate() {
        let (tokens, custom) = tokenize_classes(&column.classes);
        let custom = custom.join(" ");

        if tokens.is_empty() {
            // Purely custom column: its classes still belong to a cell, on
            // the placeholder tier, or they would vanish from the layout.
            derived.entry(None).or_default().ensure(index, || ColumnDefinition {
                custom_classes: custom.clone(),
                inside_class: column.inside_class.clone(),
                ..Default::default()
            });
            continue;
        }

        for token in tokens {
            let definition = derived.entry(token.breakpoint).or_default();
            let cell = definition.ensure(index, || ColumnDefinition {
                custom_classes: custom.clone(),
                inside_class: column.inside_class.clone(),
                ..Default::default()
            });
            if let Some(width) = token.width {
                let width = width.to_string();
                match token.kind {
                    TokenKind::Span => cell.set_width(&width),
                    TokenKind::Offset => cell.set_offset(&width),
                    TokenKind::Order => cell.set_order(&width),
                }
            }
        }
    }

    // Responsive grids declare all breakpoints with equal column
    // cardinality, one entry per legacy column.
    for definition in derived.values_mut() {
        definition.pad_to(columns.len());
    }

    resolve_unspecific(&mut derived);

    derived
        .into_iter()
        .filter_map(|(bp, def)| bp.map(|bp| (bp, def)))
        .collect()
}

/// Merge the placeholder tier into the smallest concrete breakpoint.
///
/// Only the smallest tier ever receives this fallback. A specific
/// definition's set fields always win; the placeholder fills gaps.
fn resolve_unspecific(derived: &mut BTreeMap<Option<Breakpoint>, BreakpointDefinition>) {
    let Some(unspecific) = derived.remove(&None) else {
        return;
    };
    let smallest = derived
        .keys()
        .copied()
        .flatten()
        .min()
        .unwrap_or(Breakpoint::SMALLEST);

    match derived.entry(Some(smallest)) {
        Entry::Vacant(slot) => {
            slot.insert(unspecific);
        }
        Entry::Occupied(mut slot) => {
            for (index, fallback) in unspecific.iter() {
                slot.get_mut()
                    .ensure(index, ColumnDefinition::default)
                    .fill_from(fallback);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn column(classes: &str) -> SingleColumn {
        SingleColumn {
            classes: classes.to_string(),
            inside_class: String::new(),
        }
    }

    #[test]
    fn fully_specified_columns_yield_equal_cardinality() {
        let derived = derive_breakpoints(&[
            column("col-xs-12 col-md-6"),
            column("col-xs-12 col-md-6"),
            column("col-xs-12 col-md-12"),
        ]);

        assert_eq!(derived.len(), 2);
        for def in derived.values() {
            assert_eq!(def.count(), 3);
        }
        assert_eq!(derived[&Breakpoint::Md].get(2).unwrap().width, "12");
    }

    #[test]
    fn sparse_breakpoints_are_padded() {
        // Second column only declares md; xs still ends up with two entries.
        let derived = derive_breakpoints(&[column("col-xs-6"), column("col-md-6")]);

        assert_eq!(derived[&Breakpoint::Xs].count(), 2);
        assert_eq!(derived[&Breakpoint::Xs].get(1).unwrap().width, "");
        assert_eq!(derived[&Breakpoint::Md].count(), 2);
    }

    #[test]
    fn unspecific_classes_land_on_the_smallest_tier_when_absent() {
        let derived = derive_breakpoints(&[column("col-6"), column("col-6")]);

        assert_eq!(derived.len(), 1);
        assert_eq!(derived[&Breakpoint::Xs].get(0).unwrap().width, "6");
    }

    #[test]
    fn unspecific_classes_merge_into_the_smallest_tier_present() {
        // md is the smallest concrete tier here, so the fallback targets it.
        let derived = derive_breakpoints(&[column("col-12 col-md-6 offset-2")]);

        assert_eq!(derived.len(), 1);
        let cell = derived[&Breakpoint::Md].get(0).unwrap();
        // Specific width wins over the unspecific one.
        assert_eq!(cell.width, "6");
        // Unspecific offset fills the gap the specific definition left.
        assert_eq!(cell.offset, "2");
    }

    #[test]
    fn token_less_columns_keep_their_classes_and_cardinality() {
        let derived = derive_breakpoints(&[
            column("col-md-6"),
            SingleColumn {
                classes: "fancy-border shadow".into(),
                inside_class: "inner".into(),
            },
        ]);

        assert_eq!(derived.len(), 1);
        assert_eq!(derived[&Breakpoint::Md].count(), 2);
        let cell = derived[&Breakpoint::Md].get(1).unwrap();
        assert_eq!(cell.custom_classes, "fancy-border shadow");
        assert_eq!(cell.inside_class, "inner");
        assert_eq!(cell.width, "");
    }

    #[test]
    fn custom_classes_attach_to_the_enclosing_column() {
        let derived = derive_breakpoints(&[SingleColumn {
            classes: "col-md-6 fancy shadow".into(),
            inside_class: "inner".into(),
        }]);

        let cell = derived[&Breakpoint::Md].get(0).unwrap();
        assert_eq!(cell.custom_classes, "fancy shadow");
        assert_eq!(cell.inside_class, "inner");
    }
}
