//! Refuelling records. Independent of the trip lifecycle.
use crate::error::{Precondition, Result, ensure_amount, ensure_quantity};
use crate::types::{Actor, Money, TimeStamp};

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq)]
pub struct FuelLog {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub vehicle_id: String,
    #[n(2)]
    pub trip_id: Option<String>,
    #[n(3)]
    pub liters: f64,
    #[n(4)]
    pub cost: Money,
    #[n(5)]
    pub odometer_at_fill: Option<f64>,
    #[n(6)]
    pub fill_date: TimeStamp,
    #[n(7)]
    pub recorded_by: Actor,
    #[n(8)]
    pub created_at: TimeStamp,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewFuelLog {
    pub vehicle_id: String,
    pub trip_id: Option<String>,
    pub liters: f64,
    pub cost: Money,
    pub odometer_at_fill: Option<f64>,
    pub fill_date: TimeStamp,
}

impl NewFuelLog {
    pub fn new(vehicle_id: &str, liters: f64, cost: Money, fill_date: TimeStamp) -> Self {
        Self {
            vehicle_id: vehicle_id.to_string(),
            trip_id: None,
            liters,
            cost,
            odometer_at_fill: None,
            fill_date,
        }
    }
    pub fn set_trip(mut self, trip_id: &str) -> Self {
        self.trip_id = Some(trip_id.to_string());
        self
    }
    pub fn set_odometer(mut self, km: f64) -> Self {
        self.odometer_at_fill = Some(km);
        self
    }
}

impl FuelLog {
    pub fn record(id: String, request: NewFuelLog, actor: Actor, now: TimeStamp) -> Result<Self> {
        let liters = ensure_quantity("liters", request.liters)?;
        if liters == 0.0 {
            return Err(Precondition::InvalidQuantity {
                field: "liters",
                value: liters,
            }
            .into());
        }
        let odometer_at_fill = request
            .odometer_at_fill
            .map(|km| ensure_quantity("odometer at fill", km))
            .transpose()?;

        Ok(Self {
            id,
            vehicle_id: request.vehicle_id,
            trip_id: request.trip_id,
            liters,
            cost: ensure_amount("fuel cost", request.cost)?,
            odometer_at_fill,
            fill_date: request.fill_date,
            recorded_by: actor,
            created_at: now,
        })
    }
}
