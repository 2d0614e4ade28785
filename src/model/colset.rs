//! Column-set definitions and their origin-tagged identifiers.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use super::breakpoint::{Breakpoint, BreakpointDefinition};

/// Hard cap on the row-classes string in the target schema.
pub const ROW_CLASSES_MAX: usize = 64;

/// Stable key naming one reusable column-set profile, tagged by origin.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ColsetIdentifier {
    /// Defined as a row of the legacy `tl_columnset` table.
    Database(i64),
    /// Defined in the legacy global configuration under a profile and set name.
    Global { profile: String, set: String },
}

impl ColsetIdentifier {
    /// Parse the canonical string form back into an identifier.
    ///
    /// Accepts `db.tl_columnset.<id>` and `globals.<profile>.<set>`.
    pub fn parse(raw: &str) -> Option<ColsetIdentifier> {
        if let Some(rest) = raw.strip_prefix("db.tl_columnset.") {
            return rest.parse().ok().map(ColsetIdentifier::Database);
        }
        if let Some(rest) = raw.strip_prefix("globals.") {
            let (profile, set) = rest.split_once('.')?;
            if profile.is_empty() || set.is_empty() {
                return None;
            }
            return Some(ColsetIdentifier::Global {
                profile: profile.to_string(),
                set: set.to_string(),
            });
        }
        None
    }
}

impl fmt::Display for ColsetIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColsetIdentifier::Database(id) => write!(f, "db.tl_columnset.{id}"),
            ColsetIdentifier::Global { profile, set } => write!(f, "globals.{profile}.{set}"),
        }
    }
}

/// One migratable layout profile: per-breakpoint columns plus metadata.
///
/// Created by a source extractor, enriched with `migrated_id` once persisted,
/// untouched afterwards for the rest of the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSetDefinition {
    pub identifier: ColsetIdentifier,
    pub title: String,
    pub published: bool,
    pub use_outside: bool,
    pub outside_class: String,
    pub use_inside: bool,
    pub inside_class: String,
    /// Already truncated to [`ROW_CLASSES_MAX`].
    pub row_classes: String,
    pub breakpoints: BTreeMap<Breakpoint, BreakpointDefinition>,
    pub migrated_id: Option<i64>,
}

impl ColumnSetDefinition {
    /// Max column cardinality across breakpoints.
    pub fn column_count(&self) -> usize {
        self.breakpoints
            .values()
            .map(BreakpointDefinition::span_len)
            .max()
            .unwrap_or(0)
    }

    /// Breakpoints the target schema stores, in ascending rank.
    pub fn recognized_breakpoints(
        &self,
    ) -> impl Iterator<Item = (Breakpoint, &BreakpointDefinition)> {
        self.breakpoints
            .iter()
            .filter(|(bp, _)| bp.is_recognized())
            .map(|(bp, def)| (*bp, def))
    }

    /// Distinct non-empty inside-wrapper class names this definition needs.
    pub fn inside_classes(&self) -> BTreeSet<String> {
        let mut classes = BTreeSet::new();
        if self.use_inside && !self.inside_class.is_empty() {
            classes.insert(self.inside_class.clone());
        }
        for def in self.breakpoints.values() {
            for (_, col) in def.iter() {
                if !col.inside_class.is_empty() {
                    classes.insert(col.inside_class.clone());
                }
            }
        }
        classes
    }
}

/// Cap a row-classes string at [`ROW_CLASSES_MAX`] characters.
///
/// Duplicate tokens are removed first, then trailing tokens are dropped until
/// the whitespace-joined string fits. Returns the kept string and, when the
/// cap forced tokens out, the dropped remainder for an operator note.
pub fn truncate_row_classes(raw: &str) -> (String, Option<String>) {
    let mut seen = BTreeSet::new();
    let mut tokens: Vec<&str> = raw
        .split_whitespace()
        .filter(|t| seen.insert(*t))
        .collect();

    let mut dropped = Vec::new();
    while tokens.join(" ").len() > ROW_CLASSES_MAX {
        match tokens.pop() {
            Some(tail) => dropped.push(tail),
            None => break,
        }
    }
    dropped.reverse();

    let kept = tokens.join(" ");
    if dropped.is_empty() {
        (kept, None)
    } else {
        (kept, Some(dropped.join(" ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn identifier_roundtrip() {
        let db = ColsetIdentifier::Database(17);
        assert_eq!(db.to_string(), "db.tl_columnset.17");
        assert_eq!(ColsetIdentifier::parse("db.tl_columnset.17"), Some(db));

        let global = ColsetIdentifier::Global {
            profile: "bootstrap".into(),
            set: "half-half".into(),
        };
        assert_eq!(global.to_string(), "globals.bootstrap.half-half");
        assert_eq!(
            ColsetIdentifier::parse("globals.bootstrap.half-half"),
            Some(global)
        );

        assert_eq!(ColsetIdentifier::parse("something.else"), None);
        assert_eq!(ColsetIdentifier::parse("db.tl_columnset.nan"), None);
    }

    #[test]
    fn row_classes_within_cap_pass_through() {
        let (kept, dropped) = truncate_row_classes("row no-gutters");
        assert_eq!(kept, "row no-gutters");
        assert_eq!(dropped, None);
    }

    #[test]
    fn row_classes_overflow_drops_trailing_tokens() {
        // Ten 10-char tokens: unique prefix fitting 64 chars is kept,
        // the rest is surfaced for the note.
        let tokens: Vec<String> = (0..10).map(|i| format!("class-{i:04}")).collect();
        let raw = tokens.join(" ");
        assert_eq!(raw.len(), 109);

        let (kept, dropped) = truncate_row_classes(&raw);
        assert!(kept.len() <= ROW_CLASSES_MAX);
        assert_eq!(kept, tokens[..5].join(" "));
        assert_eq!(dropped.as_deref(), Some(tokens[5..].join(" ").as_str()));
    }

    #[test]
    fn row_classes_deduplicates_tokens() {
        let (kept, dropped) = truncate_row_classes("row row wide row");
        assert_eq!(kept, "row wide");
        assert_eq!(dropped, None);
    }
}
