//! Keyboard focus movement over the grid.
//!
//! Rows index the editable line items; column 0 is the price field and
//! columns `1..=P` are the fiscal periods. Movement clamps at the edges and
//! never wraps.

use std::collections::HashMap;

use super::error::GridError;

pub const PRICE_COL: usize = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridCoord {
    pub row: usize,
    pub col: usize,
}

impl GridCoord {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// Map a key name (DOM `KeyboardEvent.key` spelling) to a direction.
    /// Enter moves down; Tab moves right, or left with Shift.
    pub fn from_key(key: &str, shift: bool) -> Option<Self> {
        match key {
            "ArrowUp" => Some(Direction::Up),
            "ArrowDown" | "Enter" => Some(Direction::Down),
            "ArrowLeft" => Some(Direction::Left),
            "ArrowRight" => Some(Direction::Right),
            "Tab" if shift => Some(Direction::Left),
            "Tab" => Some(Direction::Right),
            _ => None,
        }
    }
}

/// Rectangle in content coordinates (before scrolling).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// The scrollable body's current geometry.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ViewportMetrics {
    pub scroll_left: f64,
    pub scroll_top: f64,
    pub width: f64,
    pub height: f64,
    /// Width of the frozen leading column that overlays the body.
    pub sticky_left: f64,
    /// Height of the frozen header row that overlays the body.
    pub sticky_top: f64,
}

/// Scroll position the body should move to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollTarget {
    pub left: f64,
    pub top: f64,
}

/// An input element the navigator can move focus to.
pub trait FocusHandle {
    fn focus(&mut self);
    fn select_all(&mut self);
    fn bounds(&self) -> Rect;
}

#[derive(Debug, Clone, PartialEq)]
pub struct NavigationOutcome {
    pub target: GridCoord,
    /// `None` when the target is already fully visible.
    pub scroll: Option<ScrollTarget>,
}

pub struct CellNavigator<H> {
    rows: usize,
    periods: usize,
    handles: HashMap<GridCoord, H>,
}

impl<H: FocusHandle> CellNavigator<H> {
    pub fn new(rows: usize, periods: usize) -> Self {
        Self {
            rows,
            periods,
            handles: HashMap::new(),
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns including the price column.
    pub fn cols(&self) -> usize {
        self.periods + 1
    }

    /// Register the handle for `coord`, returning any handle it replaces.
    pub fn register(&mut self, coord: GridCoord, handle: H) -> Result<Option<H>, GridError> {
        if coord.row >= self.rows || coord.col > self.periods {
            return Err(GridError::OutOfBounds {
                row: coord.row,
                col: coord.col,
                rows: self.rows,
                cols: self.cols(),
            });
        }
        Ok(self.handles.insert(coord, handle))
    }

    pub fn unregister(&mut self, coord: GridCoord) -> Option<H> {
        self.handles.remove(&coord)
    }

    pub fn handle(&self, coord: GridCoord) -> Option<&H> {
        self.handles.get(&coord)
    }

    /// The coordinate one step from `from`, clamped to the grid bounds.
    pub fn candidate(&self, from: GridCoord, direction: Direction) -> GridCoord {
        let max_row = self.rows.saturating_sub(1);
        let max_col = self.periods;
        let (row, col) = match direction {
            Direction::Up => (from.row.saturating_sub(1), from.col),
            Direction::Down => (from.row.saturating_add(1), from.col),
            Direction::Left => (from.row, from.col.saturating_sub(1)),
            Direction::Right => (from.row, from.col.saturating_add(1)),
        };
        GridCoord::new(row.min(max_row), col.min(max_col))
    }

    /// Move focus one step. Returns `None` (and does nothing) when no
    /// handle is registered at the clamped target.
    pub fn navigate(
        &mut self,
        from: GridCoord,
        direction: Direction,
        viewport: &ViewportMetrics,
    ) -> Option<NavigationOutcome> {
        let target = self.candidate(from, direction);
        self.focus(target, viewport)
    }

    /// Focus the handle at `target`, select its text, and work out the
    /// scroll needed to bring it clear of the frozen column and header.
    pub fn focus(&mut self, target: GridCoord, viewport: &ViewportMetrics) -> Option<NavigationOutcome> {
        let handle = self.handles.get_mut(&target)?;
        handle.focus();
        handle.select_all();
        let scroll = scroll_into_view(handle.bounds(), viewport);
        Some(NavigationOutcome { target, scroll })
    }
}

/// Smallest scroll change that makes `rect` fully visible in the part of the
/// viewport not covered by sticky regions. `None` if no change is needed.
pub fn scroll_into_view(rect: Rect, viewport: &ViewportMetrics) -> Option<ScrollTarget> {
    let left = axis_scroll(
        rect.x,
        rect.width,
        viewport.scroll_left,
        viewport.width,
        viewport.sticky_left,
    );
    let top = axis_scroll(
        rect.y,
        rect.height,
        viewport.scroll_top,
        viewport.height,
        viewport.sticky_top,
    );

    if left == viewport.scroll_left && top == viewport.scroll_top {
        None
    } else {
        Some(ScrollTarget { left, top })
    }
}

fn axis_scroll(start: f64, size: f64, scroll: f64, extent: f64, sticky: f64) -> f64 {
    let visible_start = scroll + sticky;
    let visible_end = scroll + extent;
    if start < visible_start {
        (start - sticky).max(0.0)
    } else if start + size > visible_end {
        // A cell wider than the free area aligns to the sticky edge instead.
        let aligned_end = start + size - extent;
        let aligned_start = (start - sticky).max(0.0);
        aligned_end.min(aligned_start)
    } else {
        scroll
    }
}
