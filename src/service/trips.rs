//! Trip lifecycle: create, dispatch, in transit, complete, cancel
use super::FleetService;
use crate::driver::{Driver, DriverStatus};
use crate::error::{Entity, FleetError, Result};
use crate::journal::{Event, Witness};
use crate::store::{self, OrAbort, TxResult, tx_load, tx_next_trip_number, tx_put, tx_witness};
use crate::trip::{CompleteTrip, NewTrip, Trip, TripStatus, release};
use crate::types::{Actor, TimeStamp};
use crate::utils::{TRIP_HRP, new_uuid_to_bech32};
use crate::vehicle::{Vehicle, VehicleStatus};
use sled::Transactional;
use sled::transaction::TransactionalTree;
use tracing::{debug, info};

impl FleetService {
    /// Create a DRAFT trip. The trip number is drawn from the counter in the same
    /// transaction that stores the trip.
    pub fn create_trip(&self, request: NewTrip, actor: &Actor) -> Result<Trip> {
        let id = new_uuid_to_bech32(TRIP_HRP)?;
        let (now, today) = (self.now(), self.today());

        let s = &self.store;
        let trip = (&s.vehicles, &s.drivers, &s.trips, &s.meta, &s.journal).transaction(
            |(vehicles, drivers, trips, meta, journal)| {
                let vehicle: Vehicle = tx_load(vehicles, Entity::Vehicle, &request.vehicle_id)?;
                let driver: Driver = tx_load(drivers, Entity::Driver, &request.driver_id)?;
                let trip_number = tx_next_trip_number(meta)?;

                let trip = Trip::draft(
                    id.clone(),
                    trip_number,
                    request.clone(),
                    &vehicle,
                    &driver,
                    actor.clone(),
                    today,
                    now,
                )
                .or_abort()?;

                tx_put(trips, &trip.id, &trip)?;
                let event = Event::TripCreated {
                    trip_number,
                    vehicle_id: trip.vehicle_id.clone(),
                    driver_id: trip.driver_id.clone(),
                };
                tx_witness(journal, &Witness::new(&trip.id, actor, now, event))?;
                Ok(trip)
            },
        )?;

        info!(
            trip_id = %trip.id,
            trip_number = trip.trip_number,
            vehicle_id = %trip.vehicle_id,
            driver_id = %trip.driver_id,
            cargo = trip.cargo_weight,
            "trip created"
        );
        Ok(trip)
    }

    /// DRAFT → DISPATCHED. Vehicle and driver are re-read and re-checked inside the
    /// transaction, so two drafts can never both claim the same vehicle.
    pub fn dispatch_trip(&self, trip_id: &str, actor: &Actor) -> Result<Trip> {
        let (now, today) = (self.now(), self.today());

        let s = &self.store;
        let trip = (&s.trips, &s.vehicles, &s.drivers, &s.journal).transaction(
            |(trips, vehicles, drivers, journal)| {
                let mut trip: Trip = tx_load(trips, Entity::Trip, trip_id)?;
                let mut vehicle: Vehicle = tx_load(vehicles, Entity::Vehicle, &trip.vehicle_id)?;
                let mut driver: Driver = tx_load(drivers, Entity::Driver, &trip.driver_id)?;
                let from = trip.status;
                let crew_from = (vehicle.status, driver.status);

                trip.dispatch(&mut vehicle, &mut driver, actor.clone(), today, now)
                    .or_abort()?;

                tx_put(trips, trip_id, &trip)?;
                tx_put(vehicles, &vehicle.id, &vehicle)?;
                tx_put(drivers, &driver.id, &driver)?;
                let event = Event::TripStatusChanged {
                    from,
                    to: trip.status,
                };
                tx_witness(journal, &Witness::new(trip_id, actor, now, event))?;
                witness_crew(journal, crew_from, &vehicle, &driver, actor, now)?;
                Ok(trip)
            },
        )?;

        info!(
            trip_id,
            trip_number = trip.trip_number,
            vehicle_id = %trip.vehicle_id,
            driver_id = %trip.driver_id,
            "trip dispatched"
        );
        Ok(trip)
    }

    pub fn mark_in_transit(&self, trip_id: &str, actor: &Actor) -> Result<Trip> {
        let now = self.now();

        let s = &self.store;
        let trip = (&s.trips, &s.journal).transaction(|(trips, journal)| {
            let mut trip: Trip = tx_load(trips, Entity::Trip, trip_id)?;
            let from = trip.status;
            trip.mark_in_transit(now).or_abort()?;

            tx_put(trips, trip_id, &trip)?;
            let event = Event::TripStatusChanged {
                from,
                to: trip.status,
            };
            tx_witness(journal, &Witness::new(trip_id, actor, now, event))?;
            Ok(trip)
        })?;

        info!(trip_id, trip_number = trip.trip_number, "trip in transit");
        Ok(trip)
    }

    /// Completes an active trip: records distance and revenue, advances the
    /// vehicle odometer and returns vehicle and driver to service.
    pub fn complete_trip(
        &self,
        trip_id: &str,
        request: CompleteTrip,
        actor: &Actor,
    ) -> Result<Trip> {
        let now = self.now();

        let s = &self.store;
        let trip = (&s.trips, &s.vehicles, &s.drivers, &s.journal).transaction(
            |(trips, vehicles, drivers, journal)| {
                let mut trip: Trip = tx_load(trips, Entity::Trip, trip_id)?;
                let mut vehicle: Vehicle = tx_load(vehicles, Entity::Vehicle, &trip.vehicle_id)?;
                let mut driver: Driver = tx_load(drivers, Entity::Driver, &trip.driver_id)?;
                let crew_from = (vehicle.status, driver.status);

                trip.complete(&mut vehicle, &mut driver, request.clone(), now)
                    .or_abort()?;

                tx_put(trips, trip_id, &trip)?;
                tx_put(vehicles, &vehicle.id, &vehicle)?;
                tx_put(drivers, &driver.id, &driver)?;
                let event = Event::TripCompleted {
                    end_odometer: trip.end_odometer.unwrap_or(trip.start_odometer),
                    actual_distance: trip.actual_distance.unwrap_or(0.0),
                };
                tx_witness(journal, &Witness::new(trip_id, actor, now, event))?;
                witness_crew(journal, crew_from, &vehicle, &driver, actor, now)?;
                Ok(trip)
            },
        )?;

        info!(
            trip_id,
            trip_number = trip.trip_number,
            distance = trip.actual_distance.unwrap_or(0.0),
            revenue = %trip.revenue.unwrap_or_default(),
            "trip completed"
        );
        Ok(trip)
    }

    /// Cancels a trip that has not finished. A trip that had left DRAFT hands its
    /// vehicle and driver back. Cancelling twice fails and releases nothing.
    pub fn cancel_trip(
        &self,
        trip_id: &str,
        reason: Option<String>,
        actor: &Actor,
    ) -> Result<Trip> {
        let now = self.now();

        let s = &self.store;
        let (trip, released) = (&s.trips, &s.vehicles, &s.drivers, &s.journal).transaction(
            |(trips, vehicles, drivers, journal)| {
                let mut trip: Trip = tx_load(trips, Entity::Trip, trip_id)?;
                let released = trip.cancel(reason.clone(), now).or_abort()?;

                if released {
                    let mut vehicle: Vehicle =
                        tx_load(vehicles, Entity::Vehicle, &trip.vehicle_id)?;
                    let mut driver: Driver = tx_load(drivers, Entity::Driver, &trip.driver_id)?;
                    let crew_from = (vehicle.status, driver.status);
                    release(&mut vehicle, &mut driver, now);
                    tx_put(vehicles, &vehicle.id, &vehicle)?;
                    tx_put(drivers, &driver.id, &driver)?;
                    witness_crew(journal, crew_from, &vehicle, &driver, actor, now)?;
                }

                tx_put(trips, trip_id, &trip)?;
                let event = Event::TripCancelled {
                    reason: trip.cancellation_reason.clone(),
                    released,
                };
                tx_witness(journal, &Witness::new(trip_id, actor, now, event))?;
                Ok((trip, released))
            },
        )?;

        info!(
            trip_id,
            trip_number = trip.trip_number,
            released,
            "trip cancelled"
        );
        Ok(trip)
    }

    pub fn get_trip(&self, trip_id: &str) -> Result<Trip> {
        store::load(&self.store.trips, Entity::Trip, trip_id)
    }

    /// All trips in trip-number order.
    pub fn list_trips(&self) -> Result<Vec<Trip>> {
        let mut trips: Vec<Trip> = store::scan(&self.store.trips)?;
        trips.sort_by_key(|t| t.trip_number);
        debug!(count = trips.len(), "trips loaded");
        Ok(trips)
    }

    pub fn trips_by_status(&self, status: TripStatus) -> Result<Vec<Trip>> {
        self.trips_where(|t| t.status == status)
    }

    pub fn trips_by_vehicle(&self, vehicle_id: &str) -> Result<Vec<Trip>> {
        self.trips_where(|t| t.vehicle_id == vehicle_id)
    }

    pub fn trips_by_driver(&self, driver_id: &str) -> Result<Vec<Trip>> {
        self.trips_where(|t| t.driver_id == driver_id)
    }

    pub fn trip_by_number(&self, trip_number: u64) -> Result<Trip> {
        self.trips_where(|t| t.trip_number == trip_number)?
            .into_iter()
            .next()
            .ok_or_else(|| FleetError::not_found(Entity::Trip, &format!("#{trip_number}")))
    }

    fn trips_where(&self, keep: impl Fn(&Trip) -> bool) -> Result<Vec<Trip>> {
        let mut trips = self.list_trips()?;
        trips.retain(|t| keep(t));
        Ok(trips)
    }
}

/// Journals the vehicle and driver side of a trip transition, for whichever of
/// the two actually changed status.
fn witness_crew(
    journal: &TransactionalTree,
    (vehicle_from, driver_from): (VehicleStatus, DriverStatus),
    vehicle: &Vehicle,
    driver: &Driver,
    actor: &Actor,
    now: TimeStamp,
) -> TxResult<()> {
    if vehicle_from != vehicle.status {
        let event = Event::VehicleStatusChanged {
            from: vehicle_from,
            to: vehicle.status,
        };
        tx_witness(journal, &Witness::new(&vehicle.id, actor, now, event))?;
    }
    if driver_from != driver.status {
        let event = Event::DriverStatusChanged {
            from: driver_from,
            to: driver.status,
        };
        tx_witness(journal, &Witness::new(&driver.id, actor, now, event))?;
    }
    Ok(())
}
