//! Per-trip expense records
use crate::error::{FleetError, Precondition, Result, ensure_amount, ensure_quantity};
use crate::trip::{Trip, TripStatus};
use crate::types::{Actor, Money, TimeStamp};
use std::fmt;

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExpenseStatus {
    #[n(0)]
    Pending,
    #[n(1)]
    Approved,
    #[n(2)]
    Done,
}

impl fmt::Display for ExpenseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExpenseStatus::Pending => "PENDING",
            ExpenseStatus::Approved => "APPROVED",
            ExpenseStatus::Done => "DONE",
        })
    }
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq)]
pub struct Expense {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub trip_id: String,
    #[n(2)]
    pub trip_number: u64,
    #[n(3)]
    pub vehicle_id: String, // copied from the trip
    #[n(4)]
    pub driver_id: String, // copied from the trip
    #[n(5)]
    pub distance: f64,
    #[n(6)]
    pub fuel_cost: Money,
    #[n(7)]
    pub misc_expense: Money,
    #[n(8)]
    pub total_cost: Money, // fuel_cost + misc_expense, rewritten on every change
    #[n(9)]
    pub status: ExpenseStatus,
    #[n(10)]
    pub created_by: Actor,
    #[n(11)]
    pub created_at: TimeStamp,
    #[n(12)]
    pub updated_at: TimeStamp,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewExpense {
    pub trip_id: String,
    pub distance: Option<f64>,
    pub fuel_cost: Money,
    pub misc_expense: Option<Money>,
}

impl NewExpense {
    pub fn new(trip_id: &str, fuel_cost: Money) -> Self {
        Self {
            trip_id: trip_id.to_string(),
            distance: None,
            fuel_cost,
            misc_expense: None,
        }
    }
    pub fn set_distance(mut self, km: f64) -> Self {
        self.distance = Some(km);
        self
    }
    pub fn set_misc_expense(mut self, amount: Money) -> Self {
        self.misc_expense = Some(amount);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpenseUpdate {
    pub distance: Option<f64>,
    pub fuel_cost: Option<Money>,
    pub misc_expense: Option<Money>,
}

impl Expense {
    /// Records the expense of a COMPLETED trip. Uniqueness per trip is checked by the store.
    pub fn record(
        id: String,
        request: NewExpense,
        trip: &Trip,
        actor: Actor,
        now: TimeStamp,
    ) -> Result<Self> {
        if trip.status != TripStatus::Completed {
            return Err(FleetError::invalid_state(
                "Expenses can only be created for COMPLETED trips",
                trip.status,
                TripStatus::Completed,
            ));
        }
        let distance = match request.distance {
            Some(km) => ensure_quantity("distance", km)?,
            None => trip.actual_distance.unwrap_or(0.0),
        };
        let fuel_cost = ensure_amount("fuel cost", request.fuel_cost)?;
        let misc = request.misc_expense.unwrap_or(Money::ZERO);
        let misc_expense = ensure_amount("misc expense", misc)?;

        Ok(Self {
            id,
            trip_id: trip.id.clone(),
            trip_number: trip.trip_number,
            vehicle_id: trip.vehicle_id.clone(),
            driver_id: trip.driver_id.clone(),
            distance,
            fuel_cost,
            misc_expense,
            total_cost: fuel_cost + misc_expense,
            status: ExpenseStatus::Pending,
            created_by: actor,
            created_at: now,
            updated_at: now,
        })
    }

    fn ensure_editable(&self, attempted: impl fmt::Display) -> Result<()> {
        if self.status == ExpenseStatus::Done {
            return Err(FleetError::invalid_state(
                "Cannot modify an expense that is already marked as DONE",
                self.status,
                attempted,
            ));
        }
        Ok(())
    }

    pub fn apply_update(&mut self, update: ExpenseUpdate, now: TimeStamp) -> Result<()> {
        self.ensure_editable("update")?;
        if let Some(km) = update.distance {
            self.distance = ensure_quantity("distance", km)?;
        }
        if let Some(fuel) = update.fuel_cost {
            self.fuel_cost = ensure_amount("fuel cost", fuel)?;
        }
        if let Some(misc) = update.misc_expense {
            self.misc_expense = ensure_amount("misc expense", misc)?;
        }
        self.recompute_total();
        self.updated_at = now;
        Ok(())
    }

    pub fn set_status(&mut self, to: ExpenseStatus, now: TimeStamp) -> Result<()> {
        self.ensure_editable(to)?;
        self.status = to;
        self.recompute_total();
        self.updated_at = now;
        Ok(())
    }

    pub fn ensure_deletable(&self) -> Result<()> {
        self.ensure_editable("delete")
    }

    pub fn recompute_total(&mut self) {
        self.total_cost = self.fuel_cost + self.misc_expense;
    }
}

// the store refuses a second expense for the same trip with this
pub(crate) fn duplicate(trip: &Trip) -> FleetError {
    Precondition::DuplicateExpense {
        trip_number: trip.trip_number,
    }
    .into()
}
