//! Expenses and fuel logs
use super::FleetService;
use crate::error::{Entity, FleetError, Result};
use crate::expense::{self, Expense, ExpenseStatus, ExpenseUpdate, NewExpense};
use crate::fuel::{FuelLog, NewFuelLog};
use crate::journal::{Event, Witness};
use crate::store::{self, OrAbort, tx_load, tx_put, tx_witness};
use crate::trip::Trip;
use crate::types::Actor;
use crate::utils::{EXPENSE_HRP, FUEL_HRP, new_uuid_to_bech32};
use crate::vehicle::Vehicle;
use sled::Transactional;
use sled::transaction::abort;
use tracing::info;

impl FleetService {
    /// Records the expense of a COMPLETED trip. One per trip.
    pub fn create_expense(&self, request: NewExpense, actor: &Actor) -> Result<Expense> {
        let id = new_uuid_to_bech32(EXPENSE_HRP)?;
        let now = self.now();

        let s = &self.store;
        let expense = (&s.trips, &s.expenses, &s.trip_expenses, &s.journal).transaction(
            |(trips, expenses, trip_expenses, journal)| {
                let trip: Trip = tx_load(trips, Entity::Trip, &request.trip_id)?;
                let (request, recorded_by) = (request.clone(), actor.clone());
                let expense = Expense::record(id.clone(), request, &trip, recorded_by, now)
                    .or_abort()?;
                if trip_expenses.get(trip.id.as_bytes())?.is_some() {
                    return abort(expense::duplicate(&trip));
                }

                trip_expenses.insert(trip.id.as_bytes(), expense.id.as_bytes())?;
                tx_put(expenses, &expense.id, &expense)?;
                let event = Event::ExpenseRecorded {
                    trip_id: trip.id.clone(),
                };
                tx_witness(journal, &Witness::new(&expense.id, actor, now, event))?;
                Ok(expense)
            },
        )?;

        info!(
            expense_id = %expense.id,
            trip_number = expense.trip_number,
            total = %expense.total_cost,
            "expense recorded"
        );
        Ok(expense)
    }

    pub fn update_expense(
        &self,
        expense_id: &str,
        update: ExpenseUpdate,
        actor: &Actor,
    ) -> Result<Expense> {
        let now = self.now();
        let expense = self.store.expenses.transaction(|expenses| {
            let mut expense: Expense = tx_load(expenses, Entity::Expense, expense_id)?;
            expense.apply_update(update.clone(), now).or_abort()?;
            tx_put(expenses, expense_id, &expense)?;
            Ok(expense)
        })?;

        info!(
            expense_id,
            total = %expense.total_cost,
            actor = %actor.id,
            "expense updated"
        );
        Ok(expense)
    }

    pub fn set_expense_status(
        &self,
        expense_id: &str,
        to: ExpenseStatus,
        actor: &Actor,
    ) -> Result<Expense> {
        let now = self.now();

        let s = &self.store;
        let (expense, from) = (&s.expenses, &s.journal).transaction(|(expenses, journal)| {
            let mut expense: Expense = tx_load(expenses, Entity::Expense, expense_id)?;
            let from = expense.status;
            expense.set_status(to, now).or_abort()?;

            tx_put(expenses, expense_id, &expense)?;
            let event = Event::ExpenseStatusChanged { from, to };
            tx_witness(journal, &Witness::new(expense_id, actor, now, event))?;
            Ok((expense, from))
        })?;

        info!(expense_id, %from, %to, "expense status changed");
        Ok(expense)
    }

    pub fn delete_expense(&self, expense_id: &str) -> Result<()> {
        let s = &self.store;
        (&s.expenses, &s.trip_expenses).transaction(|(expenses, trip_expenses)| {
            let expense: Expense = tx_load(expenses, Entity::Expense, expense_id)?;
            expense.ensure_deletable().or_abort()?;
            expenses.remove(expense_id.as_bytes())?;
            trip_expenses.remove(expense.trip_id.as_bytes())?;
            Ok(())
        })?;

        info!(expense_id, "expense deleted");
        Ok(())
    }

    pub fn get_expense(&self, expense_id: &str) -> Result<Expense> {
        store::load(&self.store.expenses, Entity::Expense, expense_id)
    }

    /// Newest first.
    pub fn list_expenses(&self) -> Result<Vec<Expense>> {
        let mut expenses: Vec<Expense> = store::scan(&self.store.expenses)?;
        expenses.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(expenses)
    }

    pub fn expense_by_trip(&self, trip_id: &str) -> Result<Expense> {
        let expense_id = self
            .store
            .trip_expenses
            .get(trip_id.as_bytes())?
            .ok_or_else(|| FleetError::not_found(Entity::Expense, trip_id))?;
        let expense_id = String::from_utf8_lossy(&expense_id);
        self.get_expense(&expense_id)
    }

    pub fn expenses_by_vehicle(&self, vehicle_id: &str) -> Result<Vec<Expense>> {
        self.expenses_where(|e| e.vehicle_id == vehicle_id)
    }

    pub fn expenses_by_driver(&self, driver_id: &str) -> Result<Vec<Expense>> {
        self.expenses_where(|e| e.driver_id == driver_id)
    }

    pub fn expenses_by_status(&self, status: ExpenseStatus) -> Result<Vec<Expense>> {
        self.expenses_where(|e| e.status == status)
    }

    fn expenses_where(&self, keep: impl Fn(&Expense) -> bool) -> Result<Vec<Expense>> {
        let mut expenses = self.list_expenses()?;
        expenses.retain(|e| keep(e));
        Ok(expenses)
    }

    /// Records a refuel. The trip link is optional but must point at a real trip.
    pub fn create_fuel_log(&self, request: NewFuelLog, actor: &Actor) -> Result<FuelLog> {
        let id = new_uuid_to_bech32(FUEL_HRP)?;
        let now = self.now();

        let s = &self.store;
        let log = (&s.vehicles, &s.trips, &s.fuel_logs).transaction(|(vehicles, trips, fuel_logs)| {
            tx_load::<Vehicle>(vehicles, Entity::Vehicle, &request.vehicle_id)?;
            if let Some(trip_id) = &request.trip_id {
                tx_load::<Trip>(trips, Entity::Trip, trip_id)?;
            }
            let log = FuelLog::record(id.clone(), request.clone(), actor.clone(), now).or_abort()?;
            tx_put(fuel_logs, &log.id, &log)?;
            Ok(log)
        })?;

        info!(
            fuel_log_id = %log.id,
            vehicle_id = %log.vehicle_id,
            liters = log.liters,
            cost = %log.cost,
            "fuel logged"
        );
        Ok(log)
    }

    pub fn delete_fuel_log(&self, fuel_log_id: &str) -> Result<()> {
        let removed = self.store.fuel_logs.remove(fuel_log_id.as_bytes())?;
        if removed.is_none() {
            return Err(FleetError::not_found(Entity::FuelLog, fuel_log_id));
        }
        info!(fuel_log_id, "fuel log deleted");
        Ok(())
    }

    pub fn get_fuel_log(&self, fuel_log_id: &str) -> Result<FuelLog> {
        store::load(&self.store.fuel_logs, Entity::FuelLog, fuel_log_id)
    }

    /// Most recent fill first.
    pub fn list_fuel_logs(&self) -> Result<Vec<FuelLog>> {
        let mut logs: Vec<FuelLog> = store::scan(&self.store.fuel_logs)?;
        logs.sort_by(|a, b| b.fill_date.cmp(&a.fill_date));
        Ok(logs)
    }

    pub fn fuel_logs_by_vehicle(&self, vehicle_id: &str) -> Result<Vec<FuelLog>> {
        let mut logs = self.list_fuel_logs()?;
        logs.retain(|log| log.vehicle_id == vehicle_id);
        Ok(logs)
    }

    pub fn fuel_logs_by_trip(&self, trip_id: &str) -> Result<Vec<FuelLog>> {
        let mut logs = self.list_fuel_logs()?;
        logs.retain(|log| log.trip_id.as_deref() == Some(trip_id));
        Ok(logs)
    }
}
