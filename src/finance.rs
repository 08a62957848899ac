//! Financial aggregation over record snapshots.
//!
//! Every function here is pure: the caller reads the records it needs from the
//! store and passes them in, so the results are deterministic for a given snapshot.
//! Monthly fuel cost is bucketed by the expense's creation time while revenue and
//! distance are bucketed by the trip's completion time. The two can disagree for a
//! trip completed at the end of a month whose expense is logged in the next one.
use crate::error::{Precondition, Result};
use crate::expense::Expense;
use crate::fuel::FuelLog;
use crate::maintenance::MaintenanceLog;
use crate::trip::{Trip, TripStatus};
use crate::types::{Money, round_half_up};
use crate::utils::round2;
use crate::vehicle::{Vehicle, VehicleStatus};
use rust_decimal::Decimal;

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq)]
pub struct MonthlyFinancialSummary {
    #[n(0)]
    pub year: i32,
    #[n(1)]
    pub month: u32,
    #[n(2)]
    pub revenue: Money,
    #[n(3)]
    pub fuel_cost: Money,
    #[n(4)]
    pub maintenance_cost: Money,
    #[n(5)]
    pub net_profit: Money, // revenue - fuel_cost - maintenance_cost
    #[n(6)]
    pub total_trips: u32,
    #[n(7)]
    pub total_distance: f64,
    #[n(8)]
    pub total_fuel_liters: f64,
}

impl MonthlyFinancialSummary {
    /// Store key, `YYYY-MM`. Sorts chronologically as bytes.
    pub fn key(year: i32, month: u32) -> String {
        format!("{year:04}-{month:02}")
    }

    pub fn recompute_net_profit(&mut self) {
        self.net_profit = self.revenue - self.fuel_cost - self.maintenance_cost;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VehicleCost {
    pub vehicle_id: String,
    pub license_plate: String,
    pub name: Option<String>,
    pub total_expense_cost: Money,
    pub total_fuel_cost: Money,
    pub total_maintenance_cost: Money,
    pub total_operational_cost: Money,
    pub total_distance: f64,
    pub fuel_efficiency: f64, // km per litre
    pub cost_per_km: Money,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FleetSummary {
    pub total_vehicles: u64, // non-retired
    pub total_fuel_cost: Money,
    pub total_revenue: Money,
    pub total_expenses: Money,
    pub net_profit: Money,
    pub fleet_roi: Decimal, // percent
    pub utilization_rate: f64, // percent
}

pub fn ensure_period(year: i32, month: u32) -> Result<()> {
    if (1..=12).contains(&month) {
        Ok(())
    } else {
        Err(Precondition::InvalidPeriod { year, month }.into())
    }
}

fn completed_in(trip: &Trip, year: i32, month: u32) -> bool {
    trip.status == TripStatus::Completed
        && trip
            .completed_at
            .is_some_and(|completed| completed.in_month(year, month))
}

pub fn monthly_summary(
    year: i32,
    month: u32,
    trips: &[Trip],
    expenses: &[Expense],
    maintenance: &[MaintenanceLog],
    fuel_logs: &[FuelLog],
) -> Result<MonthlyFinancialSummary> {
    ensure_period(year, month)?;

    let completed: Vec<&Trip> = trips
        .iter()
        .filter(|trip| completed_in(trip, year, month))
        .collect();

    let revenue = completed
        .iter()
        .map(|trip| trip.revenue.unwrap_or(Money::ZERO))
        .sum();
    let total_distance = completed
        .iter()
        .map(|trip| trip.actual_distance.unwrap_or(0.0))
        .sum();
    let fuel_cost = expenses
        .iter()
        .filter(|expense| expense.created_at.in_month(year, month))
        .map(|expense| expense.fuel_cost)
        .sum();
    let maintenance_cost = maintenance
        .iter()
        .filter(|log| log.service_date.in_month(year, month))
        .map(|log| log.cost)
        .sum();
    let total_fuel_liters = fuel_logs
        .iter()
        .filter(|log| log.fill_date.in_month(year, month))
        .map(|log| log.liters)
        .sum();

    let mut summary = MonthlyFinancialSummary {
        year,
        month,
        revenue,
        fuel_cost,
        maintenance_cost,
        net_profit: Money::ZERO,
        total_trips: completed.len() as u32,
        total_distance,
        total_fuel_liters,
    };
    summary.recompute_net_profit();
    Ok(summary)
}

/// `amount / divisor` rounded half-up to 2 dp, or zero when the divisor is not positive.
fn per_unit(amount: Money, divisor: f64) -> Money {
    if divisor <= 0.0 {
        return Money::ZERO;
    }
    Decimal::try_from(divisor)
        .ok()
        .and_then(|divisor| amount.amount().checked_div(divisor))
        .map(|ratio| Money::new(round_half_up(ratio, 2)))
        .unwrap_or(Money::ZERO)
}

/// Cost breakdown per non-retired vehicle, in the order the vehicles are given.
pub fn vehicle_costs(
    vehicles: &[Vehicle],
    expenses: &[Expense],
    maintenance: &[MaintenanceLog],
    fuel_logs: &[FuelLog],
) -> Vec<VehicleCost> {
    vehicles
        .iter()
        .filter(|vehicle| vehicle.status != VehicleStatus::Retired)
        .map(|vehicle| {
            let own_expenses = || expenses.iter().filter(|e| e.vehicle_id == vehicle.id);

            let total_expense_cost: Money = own_expenses().map(|e| e.total_cost).sum();
            let total_fuel_cost: Money = own_expenses().map(|e| e.fuel_cost).sum();
            let total_maintenance_cost: Money = maintenance
                .iter()
                .filter(|log| log.vehicle_id == vehicle.id)
                .map(|log| log.cost)
                .sum();
            let total_operational_cost = total_expense_cost + total_maintenance_cost;

            let liters: f64 = fuel_logs
                .iter()
                .filter(|log| log.vehicle_id == vehicle.id)
                .map(|log| log.liters)
                .sum();
            let total_distance = vehicle.odometer;
            let fuel_efficiency = if liters > 0.0 && total_distance > 0.0 {
                round2(total_distance / liters)
            } else {
                0.0
            };

            VehicleCost {
                vehicle_id: vehicle.id.clone(),
                license_plate: vehicle.license_plate.clone(),
                name: vehicle.name.clone(),
                total_expense_cost,
                total_fuel_cost,
                total_maintenance_cost,
                total_operational_cost,
                total_distance,
                fuel_efficiency,
                cost_per_km: per_unit(total_operational_cost, total_distance),
            }
        })
        .collect()
}

/// Highest operational cost first. Ties keep their input order.
pub fn top_costliest(mut costs: Vec<VehicleCost>, limit: usize) -> Vec<VehicleCost> {
    costs.sort_by(|a, b| b.total_operational_cost.cmp(&a.total_operational_cost));
    costs.truncate(limit);
    costs
}

pub fn fleet_summary(vehicles: &[Vehicle], trips: &[Trip], expenses: &[Expense]) -> FleetSummary {
    let total_fuel_cost = expenses.iter().map(|e| e.fuel_cost).sum();
    let total_expenses: Money = expenses.iter().map(|e| e.total_cost).sum();
    let total_revenue: Money = trips
        .iter()
        .filter(|trip| trip.status == TripStatus::Completed)
        .map(|trip| trip.revenue.unwrap_or(Money::ZERO))
        .sum();
    let net_profit = total_revenue - total_expenses;

    let acquisition: Money = vehicles.iter().filter_map(|v| v.acquisition_cost).sum();
    let fleet_roi = if acquisition.amount() > Decimal::ZERO {
        net_profit
            .amount()
            .checked_div(acquisition.amount())
            .map(|ratio| round_half_up(ratio, 4) * Decimal::ONE_HUNDRED)
            .unwrap_or(Decimal::ZERO)
    } else {
        Decimal::ZERO
    };

    let in_service = vehicles
        .iter()
        .filter(|v| v.status != VehicleStatus::Retired)
        .count();
    let on_trip = vehicles
        .iter()
        .filter(|v| v.status == VehicleStatus::OnTrip)
        .count();
    let utilization_rate = if in_service > 0 {
        round2(on_trip as f64 / in_service as f64 * 100.0)
    } else {
        0.0
    };

    FleetSummary {
        total_vehicles: in_service as u64,
        total_fuel_cost,
        total_revenue,
        total_expenses,
        net_profit,
        fleet_roi,
        utilization_rate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expense::ExpenseStatus;
    use crate::maintenance::MaintenanceStatus;
    use crate::types::{Actor, Day, TimeStamp};
    use crate::vehicle::VehicleType;

    fn at(year: i32, month: u32, day: u32) -> TimeStamp {
        TimeStamp::new_with(year, month, day, 12, 0, 0).unwrap()
    }

    fn vehicle(
        id: &str,
        odometer: f64,
        status: VehicleStatus,
        acquisition: Option<i64>,
    ) -> Vehicle {
        Vehicle {
            id: id.into(),
            license_plate: id.to_uppercase(),
            name: None,
            model: None,
            vehicle_type: VehicleType::Truck,
            max_load_capacity: 1000.0,
            odometer,
            status,
            acquisition_cost: acquisition.map(Money::whole),
            created_by: Actor::new("u1", "Admin"),
            created_at: at(2025, 1, 1),
            updated_at: at(2025, 1, 1),
        }
    }

    fn completed_trip(vehicle_id: &str, completed: TimeStamp, distance: f64, revenue: i64) -> Trip {
        Trip {
            id: format!("trip-{vehicle_id}-{}", completed.nanos()),
            trip_number: 1,
            vehicle_id: vehicle_id.into(),
            driver_id: "d1".into(),
            cargo_weight: 10.0,
            origin: "A".into(),
            destination: "B".into(),
            estimated_fuel_cost: None,
            start_odometer: 0.0,
            end_odometer: Some(distance),
            actual_distance: Some(distance),
            revenue: Some(Money::whole(revenue)),
            status: TripStatus::Completed,
            created_by: Actor::new("u1", "Dispatcher"),
            dispatched_by: None,
            dispatched_at: None,
            completed_at: Some(completed),
            cancelled_at: None,
            cancellation_reason: None,
            created_at: completed,
            updated_at: completed,
        }
    }

    fn expense(vehicle_id: &str, created: TimeStamp, fuel: i64, misc: i64) -> Expense {
        Expense {
            id: format!("expense-{vehicle_id}-{}", created.nanos()),
            trip_id: "t".into(),
            trip_number: 1,
            vehicle_id: vehicle_id.into(),
            driver_id: "d1".into(),
            distance: 0.0,
            fuel_cost: Money::whole(fuel),
            misc_expense: Money::whole(misc),
            total_cost: Money::whole(fuel + misc),
            status: ExpenseStatus::Pending,
            created_by: Actor::new("u1", "Analyst"),
            created_at: created,
            updated_at: created,
        }
    }

    fn service(vehicle_id: &str, date: Day, cost: i64) -> MaintenanceLog {
        MaintenanceLog {
            id: format!("maint-{vehicle_id}-{date}"),
            vehicle_id: vehicle_id.into(),
            service_name: "Oil".into(),
            issue_description: None,
            service_date: date,
            cost: Money::whole(cost),
            status: MaintenanceStatus::Resolved,
            created_by: Actor::new("u1", "Mechanic"),
            created_at: at(2025, 1, 1),
            updated_at: at(2025, 1, 1),
        }
    }

    fn refuel(vehicle_id: &str, fill: TimeStamp, liters: f64) -> FuelLog {
        FuelLog {
            id: format!("fuel-{vehicle_id}-{}", fill.nanos()),
            vehicle_id: vehicle_id.into(),
            trip_id: None,
            liters,
            cost: Money::whole(1),
            odometer_at_fill: None,
            fill_date: fill,
            recorded_by: Actor::new("u1", "Driver"),
            created_at: fill,
        }
    }

    #[test]
    fn month_buckets_use_their_own_clocks() {
        let trips = vec![
            completed_trip("v1", at(2025, 6, 30), 250.0, 1000),
            completed_trip("v1", at(2025, 7, 1), 80.0, 400),
        ];
        // expense for the june trip logged in july
        let expenses = vec![expense("v1", at(2025, 7, 2), 120, 30)];
        let maintenance = vec![service("v1", Day::new(2025, 6, 10).unwrap(), 200)];
        let fuel = vec![refuel("v1", at(2025, 6, 5), 40.0)];

        let june = monthly_summary(2025, 6, &trips, &expenses, &maintenance, &fuel).unwrap();
        assert_eq!(june.revenue, Money::whole(1000));
        assert_eq!(june.fuel_cost, Money::ZERO);
        assert_eq!(june.maintenance_cost, Money::whole(200));
        assert_eq!(june.net_profit, Money::whole(800));
        assert_eq!(june.total_trips, 1);
        assert_eq!(june.total_distance, 250.0);
        assert_eq!(june.total_fuel_liters, 40.0);

        let july = monthly_summary(2025, 7, &trips, &expenses, &maintenance, &fuel).unwrap();
        assert_eq!(july.fuel_cost, Money::whole(120));
        assert_eq!(july.net_profit, Money::whole(280));
    }

    #[test]
    fn month_out_of_range_is_refused() {
        assert!(monthly_summary(2025, 13, &[], &[], &[], &[]).is_err());
        assert!(monthly_summary(2025, 0, &[], &[], &[], &[]).is_err());
    }

    #[test]
    fn vehicle_costs_skip_retired_and_round() {
        let vehicles = vec![
            vehicle("v1", 300.0, VehicleStatus::Available, None),
            vehicle("v2", 0.0, VehicleStatus::Available, None),
            vehicle("v3", 900.0, VehicleStatus::Retired, None),
        ];
        let expenses = vec![expense("v1", at(2025, 6, 1), 100, 0)];
        let maintenance = vec![service("v1", Day::new(2025, 6, 1).unwrap(), 0)];
        let fuel = vec![refuel("v1", at(2025, 6, 1), 7.0)];

        let costs = vehicle_costs(&vehicles, &expenses, &maintenance, &fuel);
        assert_eq!(costs.len(), 2);

        let v1 = &costs[0];
        assert_eq!(v1.total_operational_cost, Money::whole(100));
        assert_eq!(v1.total_fuel_cost, Money::whole(100));
        assert_eq!(v1.fuel_efficiency, 42.86);
        // 100 / 300 = 0.3333..
        assert_eq!(v1.cost_per_km, Money::cents(33));

        let v2 = &costs[1];
        assert_eq!(v2.fuel_efficiency, 0.0);
        assert_eq!(v2.cost_per_km, Money::ZERO);
    }

    #[test]
    fn top_costliest_orders_and_truncates() {
        let vehicles = vec![
            vehicle("v1", 10.0, VehicleStatus::Available, None),
            vehicle("v2", 10.0, VehicleStatus::Available, None),
            vehicle("v3", 10.0, VehicleStatus::Available, None),
        ];
        let expenses = vec![
            expense("v1", at(2025, 6, 1), 10, 0),
            expense("v2", at(2025, 6, 1), 30, 0),
            expense("v3", at(2025, 6, 1), 20, 0),
        ];
        let top = top_costliest(vehicle_costs(&vehicles, &expenses, &[], &[]), 2);
        let ids: Vec<&str> = top.iter().map(|c| c.vehicle_id.as_str()).collect();
        assert_eq!(ids, ["v2", "v3"]);
    }

    #[test]
    fn fleet_roi_and_utilization() {
        let vehicles = vec![
            vehicle("v1", 0.0, VehicleStatus::OnTrip, Some(30_000)),
            vehicle("v2", 0.0, VehicleStatus::Available, Some(30_000)),
            vehicle("v3", 0.0, VehicleStatus::InShop, None),
            vehicle("v4", 0.0, VehicleStatus::Retired, Some(10_000)),
        ];
        let trips = vec![completed_trip("v1", at(2025, 6, 1), 10.0, 5_000)];
        let expenses = vec![expense("v1", at(2025, 6, 1), 700, 300)];

        let summary = fleet_summary(&vehicles, &trips, &expenses);
        assert_eq!(summary.total_vehicles, 3);
        assert_eq!(summary.net_profit, Money::whole(4_000));
        // 4000 / 70000 = 0.05714.. -> 0.0571 -> 5.71%
        assert_eq!(summary.fleet_roi, Decimal::new(571, 2));
        assert_eq!(summary.utilization_rate, 33.33);
    }

    #[test]
    fn empty_fleet_reports_zeroes() {
        let summary = fleet_summary(&[], &[], &[]);
        assert_eq!(summary.fleet_roi, Decimal::ZERO);
        assert_eq!(summary.utilization_rate, 0.0);
    }
}
