//! Element grouping: reconstruct colset occurrences from a flat row stream.
//!
//! Start/part/end types act as implicit bracket tokens. The stream must be
//! sorted by parent table, then sub-column parent id, then sort position;
//! a depth index keeps interleaved sets at different nesting depths apart.

use crate::error::GroupError;
use crate::model::{ColsetElement, ElementTable, MarkerKind};

/// One flushed run of element rows belonging to one colset occurrence.
#[derive(Debug, Clone)]
pub struct ColsetGroup {
    pub table: ElementTable,
    /// `ptable` of the partition the group was read from (content only).
    pub ptable: String,
    /// Sub-column parent id shared by the partition.
    pub parent_id: i64,
    pub elements: Vec<ColsetElement>,
}

impl ColsetGroup {
    pub fn start(&self) -> Option<&ColsetElement> {
        self.elements
            .iter()
            .find(|el| el.marker() == Some(MarkerKind::Start))
    }

    pub fn ids(&self) -> Vec<i64> {
        self.elements.iter().map(|el| el.id).collect()
    }

    pub fn all_invisible(&self) -> bool {
        self.elements.iter().all(|el| el.invisible)
    }

    /// SQL selection identifying this group's rows for manual inspection.
    pub fn selection_sql(&self) -> String {
        let map = self.table.map();
        if map.has_ptable {
            format!(
                "SELECT * FROM {} WHERE {} = {} AND ptable = '{}' ORDER BY sorting",
                map.table, map.parent_col, self.parent_id, self.ptable
            )
        } else {
            format!(
                "SELECT * FROM {} WHERE {} = {} ORDER BY sorting",
                map.table, map.parent_col, self.parent_id
            )
        }
    }
}

/// State machine turning the sorted element stream into [`ColsetGroup`]s.
pub struct ElementGrouper {
    table: ElementTable,
    partition: Option<(String, i64)>,
    /// Open sets, innermost last.
    open: Vec<Vec<ColsetElement>>,
    /// Closed sets awaiting the top-level close.
    completed: Vec<Vec<ColsetElement>>,
    /// Nesting depth; -1 while awaiting a start.
    depth: i32,
}

impl ElementGrouper {
    pub fn new(table: ElementTable) -> Self {
        Self {
            table,
            partition: None,
            open: Vec::new(),
            completed: Vec::new(),
            depth: -1,
        }
    }

    /// Consume one element; returns any groups completed by it.
    pub fn feed(&mut self, element: ColsetElement) -> Vec<ColsetGroup> {
        let key = (element.ptable.clone(), element.sc_parent);
        let mut flushed = Vec::new();

        if self.partition.as_ref() != Some(&key) {
            flushed.extend(self.flush());
            self.partition = Some(key);
        }

        match element.marker() {
            Some(MarkerKind::Start) => {
                self.depth += 1;
                self.open.push(vec![element]);
            }
            Some(MarkerKind::End) => {
                self.append(element);
                if let Some(set) = self.open.pop() {
                    self.completed.push(set);
                }
                self.depth -= 1;
                if self.depth < 0 {
                    flushed.extend(self.drain_completed());
                }
            }
            _ => self.append(element),
        }

        flushed
    }

    /// Force-flush whatever is still collecting.
    pub fn finish(&mut self) -> Vec<ColsetGroup> {
        let flushed = self.flush();
        self.partition = None;
        flushed
    }

    fn append(&mut self, element: ColsetElement) {
        if self.open.is_empty() {
            // Row with no start in sight: open an implicit set so the group
            // surfaces and fails validation instead of vanishing.
            self.depth = 0;
            self.open.push(Vec::new());
        }
        self.open
            .last_mut()
            .expect("open set present")
            .push(element);
    }

    fn drain_completed(&mut self) -> Vec<ColsetGroup> {
        self.depth = -1;
        let (ptable, parent_id) = self.partition.clone().unwrap_or_default();
        let table = self.table;
        self.completed
            .drain(..)
            .map(|elements| ColsetGroup {
                table,
                ptable: ptable.clone(),
                parent_id,
                elements,
            })
            .collect()
    }

    fn flush(&mut self) -> Vec<ColsetGroup> {
        let mut out = Vec::new();
        if !self.completed.is_empty() {
            out.extend(self.drain_completed());
        }
        if !self.open.is_empty() {
            // Truncated bracket run: collapse everything still open into one
            // group so validation reports the most specific fault.
            let mut collapsed = Vec::new();
            for set in self.open.drain(..) {
                collapsed.extend(set);
            }
            let (ptable, parent_id) = self.partition.clone().unwrap_or_default();
            out.push(ColsetGroup {
                table: self.table,
                ptable,
                parent_id,
                elements: collapsed,
            });
        }
        self.depth = -1;
        out
    }
}

/// Well-formedness check for one flushed group.
pub fn validate_group(group: &ColsetGroup) -> Result<(), GroupError> {
    if group.elements.len() < 2 {
        return Err(GroupError::TooSmall);
    }

    let map = group.table.map();
    let mut starts = 0usize;
    let mut ends = 0usize;
    for element in &group.elements {
        match map.classify(&element.element_type) {
            Some(MarkerKind::Start) => starts += 1,
            Some(MarkerKind::End) => ends += 1,
            Some(MarkerKind::Part) => {}
            None => return Err(GroupError::UnknownType(element.element_type.clone())),
        }
    }

    if starts == 0 {
        return Err(GroupError::NoStart);
    }
    if starts > 1 {
        return Err(GroupError::MultipleStart);
    }
    if ends == 0 {
        return Err(GroupError::NoEnd);
    }
    if ends > 1 {
        return Err(GroupError::MultipleEnd);
    }

    // The start element is the self-referential root of its group.
    let start = group.start().expect("start counted above");
    if start.id != group.parent_id {
        return Err(GroupError::ParentMismatch {
            id: start.id,
            parent: group.parent_id,
        });
    }

    Ok(())
}
