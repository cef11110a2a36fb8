// Grid translation from the 12-column spec layout to Metabase's 24-column grid
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::spec::{Component, ComponentPosition, SPEC_COLUMNS, Section};
use crate::error::MappingError;

pub const TARGET_COLUMNS: i64 = 24;
/// Upper bound for `row` and `height`, so every sum stays far from overflow.
pub const MAX_ROWS: i64 = 10_000;
const SCALE: i64 = TARGET_COLUMNS / SPEC_COLUMNS;

pub const UNRECOGNIZED_POSITION: &str =
    "position must be {row, col, width, height} or {order, width[, height]} with integer values";

/// Rectangle in spec (12-column) units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct GridRect {
    pub row: i64,
    pub col: i64,
    pub width: i64,
    pub height: i64,
}

/// Rectangle in Metabase dashcard units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TargetRect {
    pub row: i64,
    pub col: i64,
    pub size_x: i64,
    pub size_y: i64,
}

/// A component with its resolved absolute rectangle.
#[derive(Debug, Clone)]
pub struct PlacedComponent<'a> {
    pub component: &'a Component,
    pub rect: GridRect,
}

impl GridRect {
    pub fn new(row: i64, col: i64, width: i64, height: i64) -> Self {
        Self {
            row,
            col,
            width,
            height,
        }
    }

    /// Section position used when none is declared.
    pub fn full_section() -> Self {
        Self::new(0, 0, SPEC_COLUMNS, 4)
    }

    /// Reason the rectangle does not fit the 12-column grid, if any.
    pub fn bounds_violation(&self) -> Option<String> {
        if self.width <= 0 {
            Some(format!("width must be positive (got {})", self.width))
        } else if self.height <= 0 {
            Some(format!("height must be positive (got {})", self.height))
        } else if self.row < 0 || self.col < 0 {
            Some(format!("row/col must not be negative (got row {}, col {})", self.row, self.col))
        } else if self.col > SPEC_COLUMNS || self.width > SPEC_COLUMNS {
            Some(format!(
                "col ({}) and width ({}) must each be at most {}",
                self.col, self.width, SPEC_COLUMNS
            ))
        } else if self.row > MAX_ROWS || self.height > MAX_ROWS {
            Some(format!(
                "row ({}) and height ({}) must each be at most {}",
                self.row, self.height, MAX_ROWS
            ))
        } else if self.col + self.width > SPEC_COLUMNS {
            Some(format!(
                "col + width = {} exceeds {} columns",
                self.col + self.width,
                SPEC_COLUMNS
            ))
        } else {
            None
        }
    }

    pub fn overlaps(&self, other: &GridRect) -> bool {
        // half-open intervals on both axes
        self.col < other.col.saturating_add(other.width)
            && other.col < self.col.saturating_add(self.width)
            && self.row < other.row.saturating_add(other.height)
            && other.row < self.row.saturating_add(self.height)
    }
}

impl Default for GridRect {
    fn default() -> Self {
        Self::full_section()
    }
}

/// Scale a spec rectangle onto the target grid. Rows and heights share the
/// same unit on both sides and pass through unchanged.
pub fn translate(id: &str, rect: &GridRect) -> Result<TargetRect, MappingError> {
    if let Some(reason) = rect.bounds_violation() {
        return Err(MappingError::new(id, reason));
    }
    Ok(TargetRect {
        row: rect.row,
        col: rect.col * SCALE,
        size_x: rect.width * SCALE,
        size_y: rect.height,
    })
}

/// Resolve every component of a section to an absolute rectangle.
///
/// Auto-flow components are packed left to right in ascending `order`
/// (stable on document order) inside the section's column band, wrapping to
/// a new row band when the current one has too few columns left. A flow
/// item's height is its own `height`, then `config.height`, then the
/// section height. Components without a position fill the section.
/// Results come back in document order.
pub fn layout_section(section: &Section) -> Result<Vec<PlacedComponent<'_>>, MappingError> {
    let origin = section.position;
    let mut rects: Vec<Option<GridRect>> = vec![None; section.components.len()];

    let mut flow: Vec<(usize, i64, i64, Option<i64>)> = Vec::new();
    for (idx, component) in section.components.iter().enumerate() {
        match &component.position {
            Some(ComponentPosition::Absolute(rect)) => rects[idx] = Some(*rect),
            Some(ComponentPosition::Flow(slot)) => {
                flow.push((idx, slot.order, slot.width, slot.height))
            }
            Some(ComponentPosition::Unrecognized(_)) => {
                return Err(MappingError::new(&component.id, UNRECOGNIZED_POSITION));
            }
            None => rects[idx] = Some(origin),
        }
    }
    flow.sort_by_key(|(_, order, _, _)| *order);

    let band_columns = origin.width.max(1);
    let mut cursor = 0;
    let mut band_row = origin.row;
    let mut band_height = 0;

    for (idx, _, width, height) in flow {
        let component = &section.components[idx];
        if width <= 0 || width > SPEC_COLUMNS {
            return Err(MappingError::new(
                &component.id,
                format!("auto-flow width must be between 1 and {} (got {})", SPEC_COLUMNS, width),
            ));
        }
        let height = height
            .or_else(|| component.config.get("height").and_then(Value::as_i64))
            .unwrap_or(origin.height)
            .max(1);

        if cursor > 0 && cursor + width > band_columns {
            band_row = band_row.saturating_add(band_height);
            cursor = 0;
            band_height = 0;
        }

        rects[idx] = Some(GridRect::new(band_row, origin.col.saturating_add(cursor), width, height));
        cursor += width;
        band_height = band_height.max(height);
    }

    Ok(section
        .components
        .iter()
        .zip(rects)
        .filter_map(|(component, rect)| rect.map(|rect| PlacedComponent { component, rect }))
        .collect())
}
