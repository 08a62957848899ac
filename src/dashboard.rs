//! Fleet KPI snapshot
use crate::driver::Driver;
use crate::eligibility::driver_dispatchable;
use crate::trip::{Trip, TripStatus};
use crate::vehicle::{Vehicle, VehicleStatus};
use chrono::NaiveDate;

pub const RECENT_TRIPS: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardStats {
    pub total_vehicles: u64,
    pub active_fleet: u64,
    pub in_shop: u64,
    pub pending_cargo: u64,
    pub active_trips: u64,
    pub total_drivers: u64,
    pub available_drivers: u64,
    pub recent_trips: Vec<Trip>,
}

fn count<T>(items: &[T], pred: impl Fn(&T) -> bool) -> u64 {
    items.iter().filter(|item| pred(item)).count() as u64
}

/// Recent trips list IN_TRANSIT first, then DISPATCHED, then COMPLETED,
/// each group newest first.
pub fn dashboard(
    vehicles: &[Vehicle],
    drivers: &[Driver],
    trips: &[Trip],
    today: NaiveDate,
) -> DashboardStats {
    let mut recent_trips = Vec::with_capacity(RECENT_TRIPS);
    for status in [
        TripStatus::InTransit,
        TripStatus::Dispatched,
        TripStatus::Completed,
    ] {
        let mut group: Vec<&Trip> = trips.iter().filter(|t| t.status == status).collect();
        group.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        recent_trips.extend(group.into_iter().cloned());
    }
    recent_trips.truncate(RECENT_TRIPS);

    DashboardStats {
        total_vehicles: count(vehicles, |v| v.status != VehicleStatus::Retired),
        active_fleet: count(vehicles, |v| v.status == VehicleStatus::OnTrip),
        in_shop: count(vehicles, |v| v.status == VehicleStatus::InShop),
        pending_cargo: count(trips, |t| t.status == TripStatus::Draft),
        active_trips: count(trips, |t| t.status.is_active()),
        total_drivers: drivers.len() as u64,
        available_drivers: count(drivers, |d| driver_dispatchable(d, today)),
        recent_trips,
    }
}
