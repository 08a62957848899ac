//! Identifier generation and numeric helpers

use crate::error::{FleetError, Result};
use bech32::Bech32m;
use uuid7::uuid7;

pub const VEHICLE_HRP: &str = "vehicle";
pub const DRIVER_HRP: &str = "driver";
pub const TRIP_HRP: &str = "trip";
pub const EXPENSE_HRP: &str = "expense";
pub const FUEL_HRP: &str = "fuel";
pub const MAINTENANCE_HRP: &str = "maint";

// construct a unique, time-ordered id then encode using bech32
pub fn new_uuid_to_bech32(hrp: &str) -> Result<String> {
    let hrp = bech32::Hrp::parse(hrp).map_err(|e| FleetError::Identity(e.to_string()))?;
    bech32::encode::<Bech32m>(hrp, uuid7().as_bytes())
        .map_err(|e| FleetError::Identity(e.to_string()))
}

/// Two decimal places via `f64::round`. Ties go away from zero on the binary value,
/// so an input stored just below a tie (1.005 is 1.00499..) rounds down. Money
/// never goes through here; it uses `Money::round2` on exact decimals.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
