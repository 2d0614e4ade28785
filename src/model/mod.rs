//! Domain model: breakpoints, column definitions, colset definitions and
//! the legacy element-row projection.

pub mod breakpoint;
pub mod colset;
pub mod element;

pub use self::breakpoint::{Breakpoint, BreakpointDefinition, ColumnDefinition, Reset, VerticalAlign};
pub use self::colset::{truncate_row_classes, ColsetIdentifier, ColumnSetDefinition, ROW_CLASSES_MAX};
pub use self::element::{
    ColsetElement, ElementRow, ElementTable, MarkerKind, TableMap, GRID_TYPE_SEPARATOR,
    GRID_TYPE_START, GRID_TYPE_STOP, TEMPLATE_PREFIX,
};
