//! Extractor for globals-defined column-set profiles.

use crate::config::GlobalsConfig;
use crate::error::Result;
use crate::model::{truncate_row_classes, ColsetIdentifier, ColumnSetDefinition};
use crate::report::MigrationLog;

use super::derive::derive_breakpoints;

/// Normalize every profile set into a [`ColumnSetDefinition`].
pub fn extract_globals(
    config: &GlobalsConfig,
    log: &mut MigrationLog,
) -> Result<Vec<ColumnSetDefinition>> {
    config.validate()?;

    let mut definitions = Vec::new();
    for (profile_name, profile) in &config.profiles {
        for (set_name, set) in &profile.sets {
            let identifier = ColsetIdentifier::Global {
                profile: profile_name.clone(),
                set: set_name.clone(),
            };

            let (row_classes, dropped) = truncate_row_classes(&profile.row_classes);
            if dropped.is_some() {
                log.note(format!(
                    "row classes of {identifier} truncated from \"{}\" to \"{row_classes}\"",
                    profile.row_classes
                ));
            }

            definitions.push(ColumnSetDefinition {
                title: format!("{profile_name}: {set_name}"),
                identifier,
                published: set.published,
                use_outside: profile.use_outside,
                outside_class: profile.outside_class.clone(),
                use_inside: profile.use_inside,
                inside_class: profile.inside_class.clone(),
                row_classes,
                breakpoints: derive_breakpoints(&set.columns),
                migrated_id: None,
            });
        }
    }
    Ok(definitions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Breakpoint;
    use pretty_assertions::assert_eq;

    #[test]
    fn extracts_every_set_of_every_profile() {
        let config: GlobalsConfig = toml::from_str(
            r#"
            [profiles.bootstrap]
            row_classes = "row"
            use_inside = true
            inside_class = "inside"

            [profiles.bootstrap.sets.half-half]
            columns = [ { classes = "col-md-6" }, { classes = "col-md-6" } ]

            [profiles.bootstrap.sets.thirds]
            published = false
            columns = [
                { classes = "col-md-4" },
                { classes = "col-md-4" },
                { classes = "col-md-4" },
            ]
            "#,
        )
        .unwrap();

        let mut log = MigrationLog::new();
        let defs = extract_globals(&config, &mut log).unwrap();

        assert_eq!(defs.len(), 2);
        let half = defs
            .iter()
            .find(|d| d.title == "bootstrap: half-half")
            .unwrap();
        assert_eq!(
            half.identifier.to_string(),
            "globals.bootstrap.half-half"
        );
        assert!(half.published);
        assert!(half.use_inside);
        assert_eq!(half.breakpoints[&Breakpoint::Md].count(), 2);

        let thirds = defs.iter().find(|d| d.title == "bootstrap: thirds").unwrap();
        assert!(!thirds.published);
        assert_eq!(thirds.column_count(), 3);
    }

    #[test]
    fn truncated_row_classes_note_carries_original_and_kept_values() {
        let original = (0..10)
            .map(|i| format!("rowclass-{i}"))
            .collect::<Vec<_>>()
            .join(" ");
        let config: GlobalsConfig = toml::from_str(&format!(
            r#"
            [profiles.bootstrap]
            row_classes = "{original}"

            [profiles.bootstrap.sets.half]
            columns = [ {{ classes = "col-md-6" }} ]
            "#
        ))
        .unwrap();

        let mut log = MigrationLog::new();
        let defs = extract_globals(&config, &mut log).unwrap();

        assert!(defs[0].row_classes.len() <= crate::model::ROW_CLASSES_MAX);
        assert_eq!(log.notes().len(), 1);
        assert!(log.notes()[0].contains(&original));
        assert!(log.notes()[0].contains(&defs[0].row_classes));
    }
}
