//! Dispatch eligibility. Pure functions over record snapshots and an explicit `today`.
//!
//! Two date boundaries coexist:
//! - [`driver_dispatchable`] needs the expiry date to be strictly after today, so a
//!   license expiring today can no longer be dispatched.
//! - [`license_expired`] only reports expiry once today is strictly after the expiry
//!   date, so on the expiry day itself the license is not yet "expired".
//!
//! A driver whose license expires today is therefore refused as generically
//! unavailable rather than as expired.
use crate::driver::{Driver, DriverStatus};
use crate::error::Precondition;
use crate::vehicle::{Vehicle, VehicleStatus};
use chrono::NaiveDate;

pub fn vehicle_dispatchable(vehicle: &Vehicle) -> bool {
    vehicle.status == VehicleStatus::Available
}

pub fn driver_dispatchable(driver: &Driver, today: NaiveDate) -> bool {
    driver.status == DriverStatus::OnDuty && driver.license_expiry_date.date() > today
}

pub fn license_expired(driver: &Driver, today: NaiveDate) -> bool {
    today > driver.license_expiry_date.date()
}

/// Why a vehicle cannot be dispatched, or `None` when it can.
pub fn vehicle_refusal(vehicle: &Vehicle) -> Option<Precondition> {
    if vehicle_dispatchable(vehicle) {
        return None;
    }
    Some(Precondition::VehicleUnavailable {
        status: vehicle.status.to_string(),
    })
}

/// Why a driver cannot be dispatched, most specific reason first, or `None` when they can.
pub fn driver_refusal(driver: &Driver, today: NaiveDate) -> Option<Precondition> {
    if driver_dispatchable(driver, today) {
        return None;
    }
    if license_expired(driver, today) {
        return Some(Precondition::DriverLicenseExpired {
            expired_on: driver.license_expiry_date,
        });
    }
    if driver.status == DriverStatus::Suspended {
        return Some(Precondition::DriverSuspended);
    }
    Some(Precondition::DriverUnavailable {
        status: driver.status.to_string(),
    })
}
