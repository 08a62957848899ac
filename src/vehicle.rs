//! Vehicle records and the manual status rules that sit beside the trip and maintenance engines
use crate::error::{FleetError, Precondition, Result, ensure_amount, ensure_quantity};
use crate::types::{Actor, Money, TimeStamp};
use std::fmt;

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VehicleStatus {
    #[n(0)]
    Available,
    #[n(1)]
    OnTrip,
    #[n(2)]
    InShop,
    #[n(3)]
    Retired,
}

impl fmt::Display for VehicleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            VehicleStatus::Available => "AVAILABLE",
            VehicleStatus::OnTrip => "ON_TRIP",
            VehicleStatus::InShop => "IN_SHOP",
            VehicleStatus::Retired => "RETIRED",
        })
    }
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VehicleType {
    #[n(0)]
    Truck,
    #[n(1)]
    Van,
    #[n(2)]
    Bike,
    #[n(3)]
    Mini,
    #[n(4)]
    TrailerTruck,
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq)]
pub struct Vehicle {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub license_plate: String,
    #[n(2)]
    pub name: Option<String>,
    #[n(3)]
    pub model: Option<String>,
    #[n(4)]
    pub vehicle_type: VehicleType,
    #[n(5)]
    pub max_load_capacity: f64, // kg
    #[n(6)]
    pub odometer: f64, // km, never decreases
    #[n(7)]
    pub status: VehicleStatus,
    #[n(8)]
    pub acquisition_cost: Option<Money>,
    #[n(9)]
    pub created_by: Actor,
    #[n(10)]
    pub created_at: TimeStamp,
    #[n(11)]
    pub updated_at: TimeStamp,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewVehicle {
    pub license_plate: String,
    pub name: Option<String>,
    pub model: Option<String>,
    pub vehicle_type: VehicleType,
    pub max_load_capacity: f64,
    pub odometer: Option<f64>,
    pub acquisition_cost: Option<Money>,
}

impl NewVehicle {
    pub fn new(license_plate: &str, vehicle_type: VehicleType, max_load_capacity: f64) -> Self {
        Self {
            license_plate: license_plate.to_string(),
            name: None,
            model: None,
            vehicle_type,
            max_load_capacity,
            odometer: None,
            acquisition_cost: None,
        }
    }
    pub fn set_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }
    pub fn set_model(mut self, model: &str) -> Self {
        self.model = Some(model.to_string());
        self
    }
    pub fn set_odometer(mut self, km: f64) -> Self {
        self.odometer = Some(km);
        self
    }
    pub fn set_acquisition_cost(mut self, cost: Money) -> Self {
        self.acquisition_cost = Some(cost);
        self
    }
}

/// Partial edit; `None` leaves a field untouched. Status, plate and odometer are not editable here.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VehicleUpdate {
    pub name: Option<String>,
    pub model: Option<String>,
    pub vehicle_type: Option<VehicleType>,
    pub max_load_capacity: Option<f64>,
    pub acquisition_cost: Option<Money>,
}

/// Plates are compared upper-cased with surrounding whitespace removed.
pub fn normalise_plate(plate: &str) -> String {
    plate.trim().to_uppercase()
}

impl Vehicle {
    pub fn register(id: String, request: NewVehicle, actor: Actor, now: TimeStamp) -> Result<Self> {
        let max_load_capacity = ensure_quantity("max load capacity", request.max_load_capacity)?;
        let odometer = ensure_quantity("odometer", request.odometer.unwrap_or(0.0))?;
        let acquisition_cost = request
            .acquisition_cost
            .map(|cost| ensure_amount("acquisition cost", cost))
            .transpose()?;

        Ok(Self {
            id,
            license_plate: normalise_plate(&request.license_plate),
            name: request.name,
            model: request.model,
            vehicle_type: request.vehicle_type,
            max_load_capacity,
            odometer,
            status: VehicleStatus::Available,
            acquisition_cost,
            created_by: actor,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn apply_update(&mut self, update: VehicleUpdate, now: TimeStamp) -> Result<()> {
        if let Some(capacity) = update.max_load_capacity {
            self.max_load_capacity = ensure_quantity("max load capacity", capacity)?;
        }
        if let Some(cost) = update.acquisition_cost {
            self.acquisition_cost = Some(ensure_amount("acquisition cost", cost)?);
        }
        if let Some(name) = update.name {
            self.name = Some(name);
        }
        if let Some(model) = update.model {
            self.model = Some(model);
        }
        if let Some(vehicle_type) = update.vehicle_type {
            self.vehicle_type = vehicle_type;
        }
        self.updated_at = now;
        Ok(())
    }

    /// Manual status change. ON_TRIP belongs to the trip engine; RETIRED is final.
    /// `open_maintenance` is the number of unresolved logs for this vehicle.
    pub fn set_status_manually(
        &mut self,
        to: VehicleStatus,
        open_maintenance: usize,
        now: TimeStamp,
    ) -> Result<()> {
        let from = self.status;
        if from == VehicleStatus::Retired {
            return Err(FleetError::invalid_state(
                "Cannot change status of a retired vehicle",
                from,
                to,
            ));
        }
        if from == VehicleStatus::OnTrip || to == VehicleStatus::OnTrip {
            return Err(FleetError::invalid_state(
                "ON_TRIP is only entered and left through the trip lifecycle",
                from,
                to,
            ));
        }
        if to == VehicleStatus::Available && open_maintenance > 0 {
            return Err(Precondition::OpenMaintenance {
                open: open_maintenance,
            }
            .into());
        }
        self.status = to;
        self.updated_at = now;
        Ok(())
    }
}
