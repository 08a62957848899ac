use chrono::{TimeZone, Utc};
use fleet_dispatch::FleetService;
use fleet_dispatch::driver::{DriverStatus, NewDriver};
use fleet_dispatch::trip::{CompleteTrip, NewTrip};
use fleet_dispatch::types::{Actor, Day, FixedClock};
use fleet_dispatch::vehicle::{NewVehicle, VehicleStatus, VehicleType};
use sled::open;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::thread;
use tempfile::tempdir;

const WRITERS: usize = 8;
const TRIPS_PER_WRITER: usize = 5;

fn open_service(path: &std::path::Path) -> anyhow::Result<FleetService> {
    let db = open(path)?;
    let clock = FixedClock::new(Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap());
    Ok(FleetService::with_clock(Arc::new(db), Arc::new(clock))?)
}

#[test]
fn concurrent_creates_get_distinct_gapless_numbers() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let service = open_service(&temp_dir.path().join("numbers.db"))?;
    let actor = Actor::new("user-2", "Dispatcher");

    let vehicle = service.create_vehicle(NewVehicle::new("N-1", VehicleType::Van, 500.0), &actor)?;
    let driver = service.create_driver(
        NewDriver::new("Lee", "DL-N1", Day::new(2027, 1, 1).unwrap()),
        &actor,
    )?;

    let numbers = thread::scope(|scope| {
        let handles: Vec<_> = (0..WRITERS)
            .map(|_| {
                scope.spawn(|| {
                    (0..TRIPS_PER_WRITER)
                        .map(|_| {
                            service
                                .create_trip(NewTrip::new(&vehicle.id, &driver.id, 10.0), &actor)
                                .map(|trip| trip.trip_number)
                        })
                        .collect::<Result<Vec<u64>, _>>()
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("writer panicked"))
            .collect::<Result<Vec<Vec<u64>>, _>>()
    })?;

    let numbers: Vec<u64> = numbers.into_iter().flatten().collect();
    let distinct: BTreeSet<u64> = numbers.iter().copied().collect();
    let total = (WRITERS * TRIPS_PER_WRITER) as u64;

    assert_eq!(numbers.len() as u64, total);
    assert_eq!(distinct, (1..=total).collect::<BTreeSet<u64>>());
    assert_eq!(service.trip_by_number(total)?.trip_number, total);
    Ok(())
}

#[test]
fn racing_dispatches_hold_the_vehicle_once() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let service = open_service(&temp_dir.path().join("dispatch_race.db"))?;
    let actor = Actor::new("user-2", "Dispatcher");

    let vehicle =
        service.create_vehicle(NewVehicle::new("R-1", VehicleType::Truck, 1_000.0), &actor)?;
    let mut trips = Vec::with_capacity(WRITERS);
    for n in 0..WRITERS {
        let driver = service.create_driver(
            NewDriver::new("Racer", &format!("DL-R{n}"), Day::new(2027, 1, 1).unwrap()),
            &actor,
        )?;
        trips.push(service.create_trip(NewTrip::new(&vehicle.id, &driver.id, 100.0), &actor)?);
    }

    let dispatched = thread::scope(|scope| {
        let handles: Vec<_> = trips
            .iter()
            .map(|trip| scope.spawn(|| service.dispatch_trip(&trip.id, &actor).is_ok()))
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("dispatcher panicked"))
            .filter(|won| *won)
            .count()
    });

    assert_eq!(dispatched, 1);
    assert_eq!(
        service.get_vehicle(&vehicle.id)?.status,
        VehicleStatus::OnTrip
    );
    assert_eq!(service.drivers_by_status(DriverStatus::OnTrip)?.len(), 1);
    Ok(())
}

#[test]
fn completed_work_survives_reopen() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let path = temp_dir.path().join("reopen.db");
    let actor = Actor::new("user-2", "Dispatcher");

    let trip_id = {
        let service = open_service(&path)?;
        let vehicle = service.create_vehicle(
            NewVehicle::new("P-1", VehicleType::Truck, 1_000.0).set_odometer(10.0),
            &actor,
        )?;
        let driver = service.create_driver(
            NewDriver::new("Kim", "DL-P1", Day::new(2027, 1, 1).unwrap()),
            &actor,
        )?;
        let trip = service.create_trip(NewTrip::new(&vehicle.id, &driver.id, 10.0), &actor)?;
        service.dispatch_trip(&trip.id, &actor)?;
        service.complete_trip(
            &trip.id,
            CompleteTrip {
                end_odometer: 60.0,
                revenue: None,
            },
            &actor,
        )?;
        service.flush()?;
        trip.id
    };

    let service = open_service(&path)?;
    let trip = service.get_trip(&trip_id)?;
    assert_eq!(trip.actual_distance, Some(50.0));
    // the counter carries on from where it stopped
    let vehicle = service.get_vehicle(&trip.vehicle_id)?;
    let next = service.create_trip(NewTrip::new(&vehicle.id, &trip.driver_id, 10.0), &actor)?;
    assert_eq!(next.trip_number, 2);
    Ok(())
}
