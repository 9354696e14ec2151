//! Seat-map rendering: flat seat list to a row/column grid.
//!
//! Pure presentation logic. Nothing here touches persisted state.

use serde::Serialize;

use crate::seat::{Seat, SeatLayout};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum GridCell<'a> {
    Seat(&'a Seat),
    Aisle,
    Empty,
}

/// Aisle column for a layout `cols` wide. Odd widths of 3 or more have a
/// single aisle in the middle; anything else has none.
pub fn aisle_column(cols: u32) -> Option<usize> {
    if cols >= 3 && cols % 2 == 1 {
        Some(((cols - 1) / 2) as usize)
    } else {
        None
    }
}

/// Number embedded in a seat label ("S12" -> 12, "7" -> 7).
pub fn seat_ordinal(label: &str) -> Option<u32> {
    let digits: String = label.chars().filter(|c| c.is_ascii_digit()).collect();
    digits.parse().ok().filter(|n| *n > 0)
}

/// Grid position of the seat numbered `ordinal` in a layout `cols` wide.
pub fn grid_position(ordinal: u32, cols: u32) -> Option<(usize, usize)> {
    if ordinal == 0 || cols == 0 {
        return None;
    }
    let aisle = aisle_column(cols);
    let seats_per_row = if aisle.is_some() { cols - 1 } else { cols };

    let row = ((ordinal - 1) / seats_per_row) as usize;
    let col_in_row = ((ordinal - 1) % seats_per_row) as usize;
    let col = match aisle {
        Some(a) if col_in_row >= a => col_in_row + 1,
        _ => col_in_row,
    };
    Some((row, col))
}

/// Lay the seats of `layout` out as `rows` x `cols` cells.
///
/// Seats without an ordinal in their label, or whose position falls outside
/// the grid, are left out. When two labels map to the same cell the later
/// seat wins.
pub fn render_grid(layout: &SeatLayout) -> Vec<Vec<GridCell<'_>>> {
    let rows = layout.rows as usize;
    let cols = layout.cols as usize;
    let aisle = aisle_column(layout.cols);

    let mut grid: Vec<Vec<GridCell<'_>>> = (0..rows)
        .map(|_| {
            (0..cols)
                .map(|c| if Some(c) == aisle { GridCell::Aisle } else { GridCell::Empty })
                .collect()
        })
        .collect();

    for seat in &layout.seats {
        let Some((r, c)) = seat_ordinal(&seat.label).and_then(|n| grid_position(n, layout.cols)) else {
            continue;
        };
        if r < rows && c < cols {
            grid[r][c] = GridCell::Seat(seat);
        }
    }

    grid
}
