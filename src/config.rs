//! Run configuration: source selection and the injected globals profiles.
//!
//! Legacy global profile definitions are read from an explicit TOML file,
//! never from ambient process state.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::{MigrationError, Result};

/// Which legacy origin a migration run reads definitions from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationSource {
    /// Global configuration profiles (the TOML globals file).
    Globals,
    /// The legacy `tl_columnset` database table.
    Database,
}

impl MigrationSource {
    pub fn as_str(self) -> &'static str {
        match self {
            MigrationSource::Globals => "globals",
            MigrationSource::Database => "database",
        }
    }
}

/// One ordered legacy column: its class string plus inside-wrapper class.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct SingleColumn {
    pub classes: String,
    #[serde(default)]
    pub inside_class: String,
}

/// One named set of a profile.
#[derive(Debug, Clone, Deserialize)]
pub struct SetConfig {
    #[serde(default = "default_true")]
    pub published: bool,
    pub columns: Vec<SingleColumn>,
}

/// One legacy profile: shared row/wrapper options plus its named sets.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ProfileConfig {
    #[serde(default)]
    pub row_classes: String,
    #[serde(default)]
    pub use_inside: bool,
    #[serde(default)]
    pub inside_class: String,
    #[serde(default)]
    pub use_outside: bool,
    #[serde(default)]
    pub outside_class: String,
    #[serde(default)]
    pub sets: BTreeMap<String, SetConfig>,
}

/// The whole globals file: `profile → set → ordered columns`.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct GlobalsConfig {
    /// Profile assumed when an element references a set without one.
    #[serde(default)]
    pub default_profile: Option<String>,
    #[serde(default)]
    pub profiles: BTreeMap<String, ProfileConfig>,
}

fn default_true() -> bool {
    true
}

impl GlobalsConfig {
    pub fn load(path: &Path) -> Result<GlobalsConfig> {
        let raw = std::fs::read_to_string(path)?;
        let config: GlobalsConfig = toml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject profile shapes the migration cannot express.
    pub fn validate(&self) -> Result<()> {
        for (profile, config) in &self.profiles {
            for (set, def) in &config.sets {
                if def.columns.is_empty() {
                    return Err(MigrationError::Config(format!(
                        "unsupported profile format: set \"{profile}.{set}\" has no columns"
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.values().all(|p| p.sets.is_empty())
    }

    /// Explicit default profile, or the sole profile when only one exists.
    pub fn default_profile(&self) -> Option<&str> {
        if let Some(name) = self.default_profile.as_deref() {
            return Some(name);
        }
        if self.profiles.len() == 1 {
            return self.profiles.keys().next().map(String::as_str);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_profile_file() {
        let config: GlobalsConfig = toml::from_str(
            r#"
            default_profile = "bootstrap"

            [profiles.bootstrap]
            row_classes = "row"
            use_inside = true
            inside_class = "inside"

            [profiles.bootstrap.sets.half-half]
            columns = [
                { classes = "col-md-6", inside_class = "left" },
                { classes = "col-md-6" },
            ]
            "#,
        )
        .unwrap();

        config.validate().unwrap();
        assert_eq!(config.default_profile(), Some("bootstrap"));
        let set = &config.profiles["bootstrap"].sets["half-half"];
        assert!(set.published);
        assert_eq!(set.columns[0].inside_class, "left");
    }

    #[test]
    fn empty_set_is_unsupported() {
        let config: GlobalsConfig = toml::from_str(
            r#"
            [profiles.p.sets.broken]
            columns = []
            "#,
        )
        .unwrap();
        assert!(config.validate().is_err());
    }
}
