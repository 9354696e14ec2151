use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::CatalogError;

/// Seat status as seen on the wire.
///
/// `Selected` only exists in client state; it is never persisted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SeatStatus {
    Available,
    Booked,
    Ladies,
    Selected,
}

impl SeatStatus {
    /// Counts toward `seatsAvailable`.
    pub fn is_open(self) -> bool {
        matches!(self, SeatStatus::Available | SeatStatus::Ladies)
    }

    pub fn is_persistable(self) -> bool {
        self != SeatStatus::Selected
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SeatType {
    Seater,
    Sleeper,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Seat {
    pub id: String,
    pub label: String,
    pub status: SeatStatus,
    #[serde(rename = "type")]
    pub seat_type: SeatType,
    #[serde(default)]
    pub is_ladies: bool,
}

impl Seat {
    /// Status a seat returns to when its booking is released.
    pub fn released_status(&self) -> SeatStatus {
        if self.is_ladies {
            SeatStatus::Ladies
        } else {
            SeatStatus::Available
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SeatLayout {
    pub rows: u32,
    pub cols: u32,
    pub seats: Vec<Seat>,
}

impl SeatLayout {
    /// Build a fully open layout of `rows` x `cols`, skipping the aisle
    /// column. Seats are numbered row by row from 1; the first eight seats
    /// of the first two rows are ladies-reserved.
    pub fn generate(rows: u32, cols: u32, seat_type: SeatType) -> Self {
        let aisle = crate::grid::aisle_column(cols);
        let prefix = match seat_type {
            SeatType::Seater => ("A", ""),
            SeatType::Sleeper => ("S", "S"),
        };

        let mut seats = Vec::new();
        let mut seat_num = 1u32;
        for r in 0..rows {
            for c in 0..cols as usize {
                if Some(c) == aisle {
                    continue;
                }
                let is_ladies = r < 2 && seat_num <= 8;
                seats.push(Seat {
                    id: format!("{}{}", prefix.0, seat_num),
                    label: format!("{}{}", prefix.1, seat_num),
                    status: if is_ladies { SeatStatus::Ladies } else { SeatStatus::Available },
                    seat_type,
                    is_ladies,
                });
                seat_num += 1;
            }
        }

        Self { rows, cols, seats }
    }

    pub fn seat(&self, seat_id: &str) -> Option<&Seat> {
        self.seats.iter().find(|s| s.id == seat_id)
    }

    pub fn seat_mut(&mut self, seat_id: &str) -> Option<&mut Seat> {
        self.seats.iter_mut().find(|s| s.id == seat_id)
    }

    pub fn open_count(&self) -> u32 {
        self.seats.iter().filter(|s| s.status.is_open()).count() as u32
    }

    pub fn is_sleeper(&self) -> bool {
        self.seats.iter().any(|s| s.seat_type == SeatType::Sleeper)
    }

    /// Reject layouts that could not have come from the store.
    pub fn validate(&self) -> Result<(), CatalogError> {
        let mut seen = HashSet::new();
        for seat in &self.seats {
            if !seat.status.is_persistable() {
                return Err(CatalogError::TransientSeatStatus(seat.id.clone()));
            }
            if !seen.insert(seat.id.as_str()) {
                return Err(CatalogError::DuplicateSeat(seat.id.clone()));
            }
        }
        Ok(())
    }
}
