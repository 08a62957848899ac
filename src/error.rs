use crate::types::{Day, Money};
use sled::transaction::TransactionError;
use std::fmt;

pub type Result<T> = std::result::Result<T, FleetError>;

/// The kind of record a lookup failed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Vehicle,
    Driver,
    Trip,
    Expense,
    FuelLog,
    MaintenanceLog,
    MonthlySummary,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Entity::Vehicle => "Vehicle",
            Entity::Driver => "Driver",
            Entity::Trip => "Trip",
            Entity::Expense => "Expense record",
            Entity::FuelLog => "Fuel log",
            Entity::MaintenanceLog => "Maintenance log",
            Entity::MonthlySummary => "Monthly summary",
        };
        f.write_str(name)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum FleetError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: Entity, id: String },
    #[error("{rule}. Current status: {current}, attempted: {attempted}")]
    InvalidState {
        rule: &'static str,
        current: String,
        attempted: String,
    },
    #[error(transparent)]
    Precondition(#[from] Precondition),
    #[error("storage failure: {0}")]
    Storage(#[from] sled::Error),
    #[error("record encoding failure: {0}")]
    Codec(String),
    #[error("identifier generation failure: {0}")]
    Identity(String),
}

impl FleetError {
    pub(crate) fn not_found(entity: Entity, id: &str) -> Self {
        FleetError::NotFound {
            entity,
            id: id.to_string(),
        }
    }
    pub(crate) fn invalid_state(
        rule: &'static str,
        current: impl fmt::Display,
        attempted: impl fmt::Display,
    ) -> Self {
        FleetError::InvalidState {
            rule,
            current: current.to_string(),
            attempted: attempted.to_string(),
        }
    }
}

/// A specific business rule an operation violated.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum Precondition {
    #[error(
        "Cargo weight exceeds vehicle max load capacity. Max capacity: {capacity} kg, Cargo: {cargo} kg"
    )]
    CargoExceedsCapacity { cargo: f64, capacity: f64 },
    #[error("End odometer ({end}) cannot be less than current odometer ({current})")]
    EndOdometerBelowCurrent { end: f64, current: f64 },
    #[error("Vehicle is not available for dispatch (status: {status})")]
    VehicleUnavailable { status: String },
    #[error("Driver's license has expired (expired on {expired_on})")]
    DriverLicenseExpired { expired_on: Day },
    #[error("Driver is currently suspended")]
    DriverSuspended,
    #[error("Driver is not available for dispatch (status: {status})")]
    DriverUnavailable { status: String },
    #[error("License plate already exists: {0}")]
    DuplicateLicensePlate(String),
    #[error("License number already exists: {0}")]
    DuplicateLicenseNumber(String),
    #[error("Cannot {action} a vehicle that is currently on a trip")]
    VehicleOnTrip { action: &'static str },
    #[error("Cannot {action} a driver that is currently on a trip")]
    DriverOnTrip { action: &'static str },
    #[error("Vehicle still has {open} open maintenance log(s)")]
    OpenMaintenance { open: usize },
    #[error(
        "Driver's license has expired. Renew the license expiry date before setting status to ON_DUTY"
    )]
    ExpiredLicenseOnDuty,
    #[error("An expense record already exists for trip #{trip_number}")]
    DuplicateExpense { trip_number: u64 },
    #[error("Invalid {field}: {value}")]
    InvalidQuantity { field: &'static str, value: f64 },
    #[error("Invalid {field}: {value}")]
    InvalidAmount { field: &'static str, value: Money },
    #[error("Invalid period {year}-{month}: month must be between 1 and 12")]
    InvalidPeriod { year: i32, month: u32 },
}

impl From<TransactionError<FleetError>> for FleetError {
    fn from(value: TransactionError<FleetError>) -> Self {
        match value {
            TransactionError::Abort(err) => err,
            TransactionError::Storage(err) => FleetError::Storage(err),
        }
    }
}

impl From<minicbor::encode::Error<std::convert::Infallible>> for FleetError {
    fn from(value: minicbor::encode::Error<std::convert::Infallible>) -> Self {
        FleetError::Codec(value.to_string())
    }
}

impl From<minicbor::decode::Error> for FleetError {
    fn from(value: minicbor::decode::Error) -> Self {
        FleetError::Codec(value.to_string())
    }
}

/// Rejects negative, NaN and infinite physical quantities.
pub(crate) fn ensure_quantity(field: &'static str, value: f64) -> Result<f64> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(Precondition::InvalidQuantity { field, value }.into())
    }
}

pub(crate) fn ensure_amount(field: &'static str, value: Money) -> Result<Money> {
    if value.is_negative() {
        Err(Precondition::InvalidAmount { field, value }.into())
    } else {
        Ok(value)
    }
}
