//! Source extractors: read legacy definitions from one of two origins and
//! normalize them into [`ColumnSetDefinition`]s.
//!
//! The two origins differ only in a handful of capabilities, so they are a
//! single algorithm parameterized by a strategy value rather than a type
//! hierarchy.

pub mod database;
pub mod derive;
pub mod globals;

use crate::config::{GlobalsConfig, MigrationSource};
use crate::error::Result;
use crate::model::{ColsetElement, ColsetIdentifier, ColumnSetDefinition};
use crate::report::MigrationLog;
use crate::storage::ColsetStorage;

pub use self::database::DbColsetRow;
pub use self::derive::derive_breakpoints;

/// Per-origin extraction and identifier-resolution strategy.
#[derive(Debug)]
pub enum SourceStrategy {
    Globals { config: GlobalsConfig },
    Database,
}

impl SourceStrategy {
    pub fn origin(&self) -> MigrationSource {
        match self {
            SourceStrategy::Globals { .. } => MigrationSource::Globals,
            SourceStrategy::Database => MigrationSource::Database,
        }
    }

    /// Read and normalize every legacy definition of this origin.
    pub async fn extract(
        &self,
        storage: &mut dyn ColsetStorage,
        log: &mut MigrationLog,
    ) -> Result<Vec<ColumnSetDefinition>> {
        match self {
            SourceStrategy::Globals { config } => globals::extract_globals(config, log),
            SourceStrategy::Database => {
                let rows = storage.fetch_db_colsets().await?;
                rows.iter()
                    .map(|row| database::normalize_db_colset(row, log))
                    .collect()
            }
        }
    }

    /// Resolve an element's stored set reference into an identifier.
    ///
    /// Database rows store the numeric definition id; globals rows store
    /// `profile.set`, or a bare set name resolved against the default
    /// profile. The canonical string form is accepted from either origin.
    pub fn resolve_identifier(&self, reference: &str) -> Option<ColsetIdentifier> {
        let reference = reference.trim();
        if reference.is_empty() {
            return None;
        }
        if let Some(identifier) = ColsetIdentifier::parse(reference) {
            return Some(identifier);
        }
        match self {
            SourceStrategy::Database => {
                reference.parse().ok().map(ColsetIdentifier::Database)
            }
            SourceStrategy::Globals { config } => {
                if let Some((profile, set)) = reference.split_once('.') {
                    return Some(ColsetIdentifier::Global {
                        profile: profile.to_string(),
                        set: set.to_string(),
                    });
                }
                config.default_profile().map(|profile| ColsetIdentifier::Global {
                    profile: profile.to_string(),
                    set: reference.to_string(),
                })
            }
        }
    }

    /// Attach the resolved identifier to a freshly fetched element row.
    pub fn attach_identifier(&self, mut element: ColsetElement) -> ColsetElement {
        element.identifier = self.resolve_identifier(&element.sc_type);
        element
    }
}
