//! Walks one vehicle and one driver through a full working day and prints the books.
//!
//! Configure with `FLEET_*` variables or a `.env` file; `RUST_LOG` controls verbosity.
use anyhow::Context;
use chrono::{Datelike, Days, Utc};
use fleet_dispatch::FleetService;
use fleet_dispatch::config::FleetConfig;
use fleet_dispatch::driver::NewDriver;
use fleet_dispatch::expense::NewExpense;
use fleet_dispatch::finance::MonthlyFinancialSummary;
use fleet_dispatch::fuel::NewFuelLog;
use fleet_dispatch::maintenance::{MaintenanceStatus, NewMaintenanceLog};
use fleet_dispatch::trip::{CompleteTrip, NewTrip};
use fleet_dispatch::types::{Actor, Day, Money, TimeStamp};
use fleet_dispatch::vehicle::{NewVehicle, VehicleType};
use std::sync::Arc;
use tracing::info;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fleet_dispatch=info,fleet_demo=info".into()),
        )
        .init();

    let config = FleetConfig::from_env()?;
    let db = config
        .open()
        .with_context(|| format!("opening {}", config.db_path.display()))?;
    let service = FleetService::new(Arc::new(db))?;

    let manager = Actor::new("user-1", "Fleet Manager");
    let dispatcher = Actor::new("user-2", "Dispatcher");
    let analyst = Actor::new("user-3", "Financial Analyst");

    let suffix = TimeStamp::new().nanos() % 10_000;
    let vehicle = service.create_vehicle(
        NewVehicle::new(&format!("DEMO-{suffix:04}"), VehicleType::Truck, 1_000.0)
            .set_name("Demo Truck")
            .set_odometer(1_000.0)
            .set_acquisition_cost(Money::whole(40_000)),
        &manager,
    )?;

    let expiry = Utc::now()
        .date_naive()
        .checked_add_days(Days::new(365))
        .context("license expiry out of range")?;
    let driver = service.create_driver(
        NewDriver::new("Demo Driver", &format!("DL-{suffix:04}"), Day::from(expiry)),
        &manager,
    )?;

    let trip = service.create_trip(
        NewTrip::new(&vehicle.id, &driver.id, 800.0)
            .set_route("Depot", "Harbour")
            .set_estimated_fuel_cost(Money::whole(90)),
        &dispatcher,
    )?;
    service.dispatch_trip(&trip.id, &dispatcher)?;
    service.mark_in_transit(&trip.id, &dispatcher)?;
    let trip = service.complete_trip(
        &trip.id,
        CompleteTrip {
            end_odometer: 1_250.0,
            revenue: Some(Money::whole(1_500)),
        },
        &dispatcher,
    )?;
    info!(trip_number = trip.trip_number, distance = ?trip.actual_distance, "delivered");

    service.create_fuel_log(
        NewFuelLog::new(&vehicle.id, 60.0, Money::cents(9_550), TimeStamp::new())
            .set_trip(&trip.id),
        &dispatcher,
    )?;
    service.create_expense(
        NewExpense::new(&trip.id, Money::cents(9_550)).set_misc_expense(Money::whole(20)),
        &analyst,
    )?;

    let today = Utc::now().date_naive();
    let log = service.create_maintenance_log(
        NewMaintenanceLog::new(&vehicle.id, "Tyre rotation", Day::from(today))
            .set_cost(Money::whole(180)),
        &manager,
    )?;
    service.set_maintenance_status(&log.id, MaintenanceStatus::Resolved, &manager)?;

    let summary = service.generate_monthly_summary(today.year(), today.month())?;
    println!(
        "{}: revenue {} fuel {} maintenance {} net {}",
        MonthlyFinancialSummary::key(summary.year, summary.month),
        summary.revenue,
        summary.fuel_cost,
        summary.maintenance_cost,
        summary.net_profit
    );

    for cost in service.top_costliest_vehicles(5)? {
        println!(
            "{:<12} operational {:>10} per km {:>6} km/l {:>6}",
            cost.license_plate, cost.total_operational_cost, cost.cost_per_km, cost.fuel_efficiency
        );
    }

    let fleet = service.fleet_summary()?;
    println!(
        "fleet: {} vehicles, ROI {}%, utilisation {}%",
        fleet.total_vehicles, fleet.fleet_roi, fleet.utilization_rate
    );

    for witness in service.history(&trip.id)? {
        println!(
            "{} {} {:?}",
            witness.recorded_at, witness.actor.name, witness.event
        );
    }

    service.flush()?;
    Ok(())
}
