//! Responsive breakpoint tiers and per-breakpoint column definitions.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A named responsive viewport tier, ordered smallest to largest.
///
/// The class grammar additionally admits `xxs`; the target schema only
/// stores the six tiers in [`Breakpoint::RECOGNIZED`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Breakpoint {
    Xxs,
    Xs,
    Sm,
    Md,
    Lg,
    Xl,
    Xxl,
}

impl Breakpoint {
    /// The tiers the target schema stores, by ascending rank.
    pub const RECOGNIZED: [Breakpoint; 6] = [
        Breakpoint::Xs,
        Breakpoint::Sm,
        Breakpoint::Md,
        Breakpoint::Lg,
        Breakpoint::Xl,
        Breakpoint::Xxl,
    ];

    /// Smallest recognized tier; breakpoint-less classes fall back here.
    pub const SMALLEST: Breakpoint = Breakpoint::Xs;

    pub fn as_str(self) -> &'static str {
        match self {
            Breakpoint::Xxs => "xxs",
            Breakpoint::Xs => "xs",
            Breakpoint::Sm => "sm",
            Breakpoint::Md => "md",
            Breakpoint::Lg => "lg",
            Breakpoint::Xl => "xl",
            Breakpoint::Xxl => "xxl",
        }
    }

    /// Case-insensitive lookup of a tier name.
    pub fn parse(name: &str) -> Option<Breakpoint> {
        match name.to_ascii_lowercase().as_str() {
            "xxs" => Some(Breakpoint::Xxs),
            "xs" => Some(Breakpoint::Xs),
            "sm" => Some(Breakpoint::Sm),
            "md" => Some(Breakpoint::Md),
            "lg" => Some(Breakpoint::Lg),
            "xl" => Some(Breakpoint::Xl),
            "xxl" => Some(Breakpoint::Xxl),
            _ => None,
        }
    }

    pub fn is_recognized(self) -> bool {
        Self::RECOGNIZED.contains(&self)
    }
}

impl fmt::Display for Breakpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Vertical alignment of one column within its row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerticalAlign {
    Start,
    Center,
    End,
}

/// Column reset behavior at a breakpoint boundary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reset {
    #[default]
    None,
    All,
    Size,
}

/// One cell in one breakpoint of one column-set.
///
/// `width`, `offset` and `order` are numeric-as-string; setters strip
/// non-digit characters instead of rejecting input, matching the lenient
/// legacy behavior.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    #[serde(default)]
    pub width: String,
    #[serde(default)]
    pub offset: String,
    #[serde(default)]
    pub order: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub align: Option<VerticalAlign>,
    #[serde(default)]
    pub custom_classes: String,
    #[serde(default)]
    pub reset: Reset,
    #[serde(default)]
    pub inside_class: String,
}

fn digits_only(value: &str) -> String {
    value.chars().filter(|c| c.is_ascii_digit()).collect()
}

impl ColumnDefinition {
    pub fn set_width(&mut self, value: &str) {
        self.width = digits_only(value);
    }

    pub fn set_offset(&mut self, value: &str) {
        self.offset = digits_only(value);
    }

    pub fn set_order(&mut self, value: &str) {
        self.order = digits_only(value);
    }

    /// No width, offset or order set.
    pub fn is_empty(&self) -> bool {
        self.width.is_empty() && self.offset.is_empty() && self.order.is_empty()
    }

    /// Fill unset fields from `fallback` without touching set ones.
    ///
    /// Used when breakpoint-unspecific classes merge into the smallest
    /// concrete breakpoint: the specific definition always wins.
    pub fn fill_from(&mut self, fallback: &ColumnDefinition) {
        if self.width.is_empty() {
            self.width = fallback.width.clone();
        }
        if self.offset.is_empty() {
            self.offset = fallback.offset.clone();
        }
        if self.order.is_empty() {
            self.order = fallback.order.clone();
        }
        if self.align.is_none() {
            self.align = fallback.align;
        }
        if self.custom_classes.is_empty() {
            self.custom_classes = fallback.custom_classes.clone();
        }
        if self.inside_class.is_empty() {
            self.inside_class = fallback.inside_class.clone();
        }
    }
}

/// Column definitions of one breakpoint, keyed by column index.
///
/// Indices need not be contiguous; [`BreakpointDefinition::as_array`] fills
/// gaps with empty definitions so the target schema never sees holes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BreakpointDefinition {
    columns: BTreeMap<usize, ColumnDefinition>,
}

impl BreakpointDefinition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of present column entries.
    pub fn count(&self) -> usize {
        self.columns.len()
    }

    pub fn get(&self, index: usize) -> Option<&ColumnDefinition> {
        self.columns.get(&index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut ColumnDefinition> {
        self.columns.get_mut(&index)
    }

    /// Column at `index`, created via `init` on first touch.
    pub fn ensure(
        &mut self,
        index: usize,
        init: impl FnOnce() -> ColumnDefinition,
    ) -> &mut ColumnDefinition {
        self.columns.entry(index).or_insert_with(init)
    }

    pub fn insert(&mut self, index: usize, column: ColumnDefinition) {
        self.columns.insert(index, column);
    }

    /// Highest present index plus one, or zero when empty.
    pub fn span_len(&self) -> usize {
        self.columns.keys().next_back().map_or(0, |i| i + 1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &ColumnDefinition)> {
        self.columns.iter().map(|(i, c)| (*i, c))
    }

    /// Pad to `len` entries, filling missing indices with empty definitions.
    pub fn pad_to(&mut self, len: usize) {
        for index in 0..len {
            self.columns.entry(index).or_default();
        }
    }

    /// Contiguous array of `len` columns, gaps filled with empty definitions.
    pub fn as_array(&self, len: usize) -> Vec<ColumnDefinition> {
        let len = len.max(self.span_len());
        (0..len)
            .map(|i| self.columns.get(&i).cloned().unwrap_or_default())
            .collect()
    }
}
