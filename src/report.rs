//! Structured run output.
//!
//! The engine never prints; it accumulates notes and errors as data and the
//! CLI decides how to render them.

use std::collections::BTreeSet;

/// Notes, per-group errors and counters gathered over one command run.
#[derive(Debug, Default)]
pub struct MigrationLog {
    notes: Vec<String>,
    errors: Vec<String>,
    pub definitions_migrated: usize,
    pub groups_rewritten: usize,
    pub groups_skipped: usize,
    pub groups_repaired: usize,
    pub rows_deleted: u64,
    pub rows_reverted: u64,
    pub templates_cleared: u64,
    pub definitions_deleted: u64,
    /// Distinct inside-wrapper class names needing a staged template.
    pub required_templates: BTreeSet<String>,
}

impl MigrationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a non-fatal observation (e.g. truncated row classes).
    pub fn note(&mut self, message: impl Into<String>) {
        self.notes.push(message.into());
    }

    /// Record a per-group failure that did not abort the run.
    pub fn error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    pub fn notes(&self) -> &[String] {
        &self.notes
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}
