//! Capacity models: one exclusive unit, or a pool of interchangeable rooms

use super::{stay::StayRange, unit::RentableUnit};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapacityModel {
    SingleUnit,
    MultiUnit { rooms: u32 },
}

impl CapacityModel {
    pub fn for_unit(unit: &RentableUnit) -> Self {
        Self::from_rooms(unit.capacity_rooms)
    }

    pub fn from_rooms(capacity_rooms: i32) -> Self {
        match capacity_rooms {
            rooms if rooms > 1 => CapacityModel::MultiUnit { rooms: rooms as u32 },
            _ => CapacityModel::SingleUnit,
        }
    }

    pub fn rooms(&self) -> u32 {
        match self {
            CapacityModel::SingleUnit => 1,
            CapacityModel::MultiUnit { rooms } => *rooms,
        }
    }

    /// Rooms already taken over `stay`, given the RESERVED stays on the unit.
    ///
    /// A single unit counts every overlapping stay. A multi-room unit counts
    /// the busiest night, so stays that never share a night share a room.
    pub fn booked(&self, stay: &StayRange, reserved: &[StayRange]) -> u32 {
        match self {
            CapacityModel::SingleUnit => {
                reserved.iter().filter(|other| stay.overlaps(other)).count() as u32
            }
            CapacityModel::MultiUnit { .. } => peak_nightly_occupancy(stay, reserved),
        }
    }

    pub fn has_room(&self, booked: u32) -> bool {
        booked < self.rooms()
    }
}

/// Highest number of `reserved` stays sharing any single night of `stay`
pub fn peak_nightly_occupancy(stay: &StayRange, reserved: &[StayRange]) -> u32 {
    // Sweep line over arrivals (+1) and departures (-1) clipped to the query.
    // Departures sort first on the same day: the leaving guest frees the room.
    let mut events: Vec<(chrono::NaiveDate, i32)> = Vec::with_capacity(reserved.len() * 2);
    for other in reserved.iter().filter(|other| stay.overlaps(other)) {
        events.push((other.start().max(stay.start()), 1));
        events.push((other.end().min(stay.end()), -1));
    }
    events.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));

    let mut current: i32 = 0;
    let mut peak: i32 = 0;
    for (_, delta) in &events {
        current += delta;
        peak = peak.max(current);
    }
    peak as u32
}
