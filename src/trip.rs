//! Trip records and the lifecycle state machine
//!
//! ```text
//! DRAFT ──dispatch──▶ DISPATCHED ──in transit──▶ IN_TRANSIT
//!   │                    │    └───────complete────────┐ │
//!   │                    │                            ▼ ▼
//!   └──────cancel────────┴──────cancel──────▶ CANCELLED  COMPLETED
//! ```
//!
//! Every transition here is a pure function over snapshots of the trip, its
//! vehicle and its driver. The store applies the resulting records in a single
//! transaction, so either all three change or none do.
use crate::driver::{Driver, DriverStatus};
use crate::eligibility::{driver_refusal, vehicle_refusal};
use crate::error::{FleetError, Precondition, Result, ensure_amount, ensure_quantity};
use crate::types::{Actor, Money, TimeStamp};
use crate::vehicle::{Vehicle, VehicleStatus};
use chrono::NaiveDate;
use std::fmt;

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TripStatus {
    #[n(0)]
    Draft,
    #[n(1)]
    Dispatched,
    #[n(2)]
    InTransit,
    #[n(3)]
    Completed,
    #[n(4)]
    Cancelled,
}

impl TripStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TripStatus::Completed | TripStatus::Cancelled)
    }
    /// The vehicle and driver are held busy in these states.
    pub fn is_active(&self) -> bool {
        matches!(self, TripStatus::Dispatched | TripStatus::InTransit)
    }
}

impl fmt::Display for TripStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TripStatus::Draft => "DRAFT",
            TripStatus::Dispatched => "DISPATCHED",
            TripStatus::InTransit => "IN_TRANSIT",
            TripStatus::Completed => "COMPLETED",
            TripStatus::Cancelled => "CANCELLED",
        })
    }
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq)]
pub struct Trip {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub trip_number: u64,
    #[n(2)]
    pub vehicle_id: String,
    #[n(3)]
    pub driver_id: String,
    #[n(4)]
    pub cargo_weight: f64, // kg
    #[n(5)]
    pub origin: String,
    #[n(6)]
    pub destination: String,
    #[n(7)]
    pub estimated_fuel_cost: Option<Money>,
    #[n(8)]
    pub start_odometer: f64, // vehicle odometer when the trip was drafted
    #[n(9)]
    pub end_odometer: Option<f64>,
    #[n(10)]
    pub actual_distance: Option<f64>,
    #[n(11)]
    pub revenue: Option<Money>,
    #[n(12)]
    pub status: TripStatus,
    #[n(13)]
    pub created_by: Actor,
    #[n(14)]
    pub dispatched_by: Option<Actor>,
    #[n(15)]
    pub dispatched_at: Option<TimeStamp>,
    #[n(16)]
    pub completed_at: Option<TimeStamp>,
    #[n(17)]
    pub cancelled_at: Option<TimeStamp>,
    #[n(18)]
    pub cancellation_reason: Option<String>,
    #[n(19)]
    pub created_at: TimeStamp,
    #[n(20)]
    pub updated_at: TimeStamp,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewTrip {
    pub vehicle_id: String,
    pub driver_id: String,
    pub cargo_weight: f64,
    pub origin: String,
    pub destination: String,
    pub estimated_fuel_cost: Option<Money>,
}

impl NewTrip {
    pub fn new(vehicle_id: &str, driver_id: &str, cargo_weight: f64) -> Self {
        Self {
            vehicle_id: vehicle_id.to_string(),
            driver_id: driver_id.to_string(),
            cargo_weight,
            origin: String::new(),
            destination: String::new(),
            estimated_fuel_cost: None,
        }
    }
    pub fn set_route(mut self, origin: &str, destination: &str) -> Self {
        self.origin = origin.to_string();
        self.destination = destination.to_string();
        self
    }
    pub fn set_estimated_fuel_cost(mut self, cost: Money) -> Self {
        self.estimated_fuel_cost = Some(cost);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompleteTrip {
    pub end_odometer: f64,
    pub revenue: Option<Money>,
}

impl Trip {
    /// Builds a DRAFT trip. Vehicle and driver are checked but not touched.
    pub fn draft(
        id: String,
        trip_number: u64,
        request: NewTrip,
        vehicle: &Vehicle,
        driver: &Driver,
        actor: Actor,
        today: NaiveDate,
        now: TimeStamp,
    ) -> Result<Self> {
        if let Some(refusal) = vehicle_refusal(vehicle) {
            return Err(refusal.into());
        }
        if let Some(refusal) = driver_refusal(driver, today) {
            return Err(refusal.into());
        }
        let cargo_weight = ensure_quantity("cargo weight", request.cargo_weight)?;
        if cargo_weight > vehicle.max_load_capacity {
            return Err(Precondition::CargoExceedsCapacity {
                cargo: cargo_weight,
                capacity: vehicle.max_load_capacity,
            }
            .into());
        }
        let estimated_fuel_cost = request
            .estimated_fuel_cost
            .map(|cost| ensure_amount("estimated fuel cost", cost))
            .transpose()?;

        Ok(Self {
            id,
            trip_number,
            vehicle_id: vehicle.id.clone(),
            driver_id: driver.id.clone(),
            cargo_weight,
            origin: request.origin,
            destination: request.destination,
            estimated_fuel_cost,
            start_odometer: vehicle.odometer,
            end_odometer: None,
            actual_distance: None,
            revenue: None,
            status: TripStatus::Draft,
            created_by: actor,
            dispatched_by: None,
            dispatched_at: None,
            completed_at: None,
            cancelled_at: None,
            cancellation_reason: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// DRAFT → DISPATCHED. Eligibility is re-checked against the snapshots given,
    /// which must be read in the same transaction that stores the result.
    pub fn dispatch(
        &mut self,
        vehicle: &mut Vehicle,
        driver: &mut Driver,
        actor: Actor,
        today: NaiveDate,
        now: TimeStamp,
    ) -> Result<()> {
        if self.status != TripStatus::Draft {
            return Err(FleetError::invalid_state(
                "Only DRAFT trips can be dispatched",
                self.status,
                TripStatus::Dispatched,
            ));
        }
        if let Some(refusal) = vehicle_refusal(vehicle) {
            return Err(refusal.into());
        }
        if let Some(refusal) = driver_refusal(driver, today) {
            return Err(refusal.into());
        }

        vehicle.status = VehicleStatus::OnTrip;
        vehicle.updated_at = now;
        driver.status = DriverStatus::OnTrip;
        driver.total_trips_assigned += 1;
        driver.updated_at = now;

        self.status = TripStatus::Dispatched;
        self.dispatched_at = Some(now);
        self.dispatched_by = Some(actor);
        self.updated_at = now;
        Ok(())
    }

    /// DISPATCHED → IN_TRANSIT. No side effects on vehicle or driver.
    pub fn mark_in_transit(&mut self, now: TimeStamp) -> Result<()> {
        if self.status != TripStatus::Dispatched {
            return Err(FleetError::invalid_state(
                "Only DISPATCHED trips can be marked as in-transit",
                self.status,
                TripStatus::InTransit,
            ));
        }
        self.status = TripStatus::InTransit;
        self.updated_at = now;
        Ok(())
    }

    /// DISPATCHED | IN_TRANSIT → COMPLETED. Releases the vehicle and driver and
    /// advances the vehicle odometer.
    pub fn complete(
        &mut self,
        vehicle: &mut Vehicle,
        driver: &mut Driver,
        request: CompleteTrip,
        now: TimeStamp,
    ) -> Result<()> {
        if !self.status.is_active() {
            return Err(FleetError::invalid_state(
                "Only DISPATCHED or IN_TRANSIT trips can be completed",
                self.status,
                TripStatus::Completed,
            ));
        }
        let end_odometer = ensure_quantity("end odometer", request.end_odometer)?;
        if end_odometer < vehicle.odometer {
            return Err(Precondition::EndOdometerBelowCurrent {
                end: end_odometer,
                current: vehicle.odometer,
            }
            .into());
        }
        let revenue = request
            .revenue
            .map(|revenue| ensure_amount("revenue", revenue))
            .transpose()?;

        self.end_odometer = Some(end_odometer);
        self.actual_distance = Some(end_odometer - self.start_odometer);
        self.revenue = revenue;
        self.status = TripStatus::Completed;
        self.completed_at = Some(now);
        self.updated_at = now;

        vehicle.status = VehicleStatus::Available;
        vehicle.odometer = end_odometer;
        vehicle.updated_at = now;

        driver.status = DriverStatus::OnDuty;
        driver.total_trips_completed += 1;
        driver.recalculate_completion_rate();
        driver.updated_at = now;
        Ok(())
    }

    /// DRAFT | DISPATCHED | IN_TRANSIT → CANCELLED.
    ///
    /// Returns `true` when the trip had left DRAFT, meaning its vehicle and driver
    /// were held and must be handed to [`release`].
    pub fn cancel(&mut self, reason: Option<String>, now: TimeStamp) -> Result<bool> {
        if self.status.is_terminal() {
            return Err(FleetError::invalid_state(
                "Cannot cancel a trip that is already finished",
                self.status,
                TripStatus::Cancelled,
            ));
        }
        let held = self.status.is_active();
        self.status = TripStatus::Cancelled;
        self.cancelled_at = Some(now);
        self.cancellation_reason = reason;
        self.updated_at = now;
        Ok(held)
    }
}

/// Returns a held vehicle and driver to service after a cancellation.
pub fn release(vehicle: &mut Vehicle, driver: &mut Driver, now: TimeStamp) {
    vehicle.status = VehicleStatus::Available;
    vehicle.updated_at = now;
    driver.status = DriverStatus::OnDuty;
    driver.updated_at = now;
}
