//! Vehicle and driver registries
use super::FleetService;
use crate::driver::{Driver, DriverStatus, DriverUpdate, NewDriver};
use crate::eligibility::driver_dispatchable;
use crate::error::{Entity, FleetError, Precondition, Result};
use crate::journal::{Event, Witness};
use crate::store::{self, OrAbort, tx_load, tx_open_logs, tx_put, tx_witness};
use crate::types::Actor;
use crate::utils::{DRIVER_HRP, VEHICLE_HRP, new_uuid_to_bech32};
use crate::vehicle::{NewVehicle, Vehicle, VehicleStatus, VehicleType, VehicleUpdate};
use chrono::NaiveDate;
use sled::Transactional;
use sled::transaction::abort;
use tracing::info;

impl FleetService {
    /// Register a vehicle. Plates are unique after normalisation.
    pub fn create_vehicle(&self, request: NewVehicle, actor: &Actor) -> Result<Vehicle> {
        let now = self.now();
        let id = new_uuid_to_bech32(VEHICLE_HRP)?;
        let vehicle = Vehicle::register(id, request, actor.clone(), now)?;
        let witness = Witness::new(
            &vehicle.id,
            actor,
            now,
            Event::VehicleRegistered {
                license_plate: vehicle.license_plate.clone(),
            },
        );

        let s = &self.store;
        (&s.vehicles, &s.plates, &s.journal).transaction(|(vehicles, plates, journal)| {
            if plates.get(vehicle.license_plate.as_bytes())?.is_some() {
                let refused = Precondition::DuplicateLicensePlate(vehicle.license_plate.clone());
                return abort(FleetError::from(refused));
            }
            plates.insert(vehicle.license_plate.as_bytes(), vehicle.id.as_bytes())?;
            tx_put(vehicles, &vehicle.id, &vehicle)?;
            tx_witness(journal, &witness)
        })?;

        info!(vehicle_id = %vehicle.id, plate = %vehicle.license_plate, "vehicle registered");
        Ok(vehicle)
    }

    pub fn update_vehicle(
        &self,
        vehicle_id: &str,
        update: VehicleUpdate,
        actor: &Actor,
    ) -> Result<Vehicle> {
        let now = self.now();
        let vehicle = self.store.vehicles.transaction(|vehicles| {
            let mut vehicle: Vehicle = tx_load(vehicles, Entity::Vehicle, vehicle_id)?;
            vehicle.apply_update(update.clone(), now).or_abort()?;
            tx_put(vehicles, vehicle_id, &vehicle)?;
            Ok(vehicle)
        })?;

        info!(vehicle_id, actor = %actor.id, "vehicle updated");
        Ok(vehicle)
    }

    /// Manual status change, e.g. retiring a vehicle or sending it to the shop.
    pub fn set_vehicle_status(
        &self,
        vehicle_id: &str,
        to: VehicleStatus,
        actor: &Actor,
    ) -> Result<Vehicle> {
        let now = self.now();
        let s = &self.store;
        let (vehicle, from) = (&s.vehicles, &s.open_maintenance, &s.journal).transaction(
            |(vehicles, open_maintenance, journal)| {
                let mut vehicle: Vehicle = tx_load(vehicles, Entity::Vehicle, vehicle_id)?;
                let from = vehicle.status;
                let open = tx_open_logs(open_maintenance, vehicle_id)?.len();
                vehicle.set_status_manually(to, open, now).or_abort()?;

                tx_put(vehicles, vehicle_id, &vehicle)?;
                let event = Event::VehicleStatusChanged { from, to };
                tx_witness(journal, &Witness::new(vehicle_id, actor, now, event))?;
                Ok((vehicle, from))
            },
        )?;

        info!(vehicle_id, %from, %to, actor = %actor.id, "vehicle status changed");
        Ok(vehicle)
    }

    pub fn delete_vehicle(&self, vehicle_id: &str) -> Result<()> {
        let s = &self.store;
        (&s.vehicles, &s.plates, &s.open_maintenance).transaction(
            |(vehicles, plates, open_maintenance)| {
                let vehicle: Vehicle = tx_load(vehicles, Entity::Vehicle, vehicle_id)?;
                if vehicle.status == VehicleStatus::OnTrip {
                    let refused = Precondition::VehicleOnTrip { action: "delete" };
                    return abort(FleetError::from(refused));
                }
                vehicles.remove(vehicle_id.as_bytes())?;
                plates.remove(vehicle.license_plate.as_bytes())?;
                open_maintenance.remove(vehicle_id.as_bytes())?;
                Ok(())
            },
        )?;

        info!(vehicle_id, "vehicle deleted");
        Ok(())
    }

    pub fn get_vehicle(&self, vehicle_id: &str) -> Result<Vehicle> {
        store::load(&self.store.vehicles, Entity::Vehicle, vehicle_id)
    }

    /// All vehicles, oldest registration first.
    pub fn list_vehicles(&self) -> Result<Vec<Vehicle>> {
        let mut vehicles: Vec<Vehicle> = store::scan(&self.store.vehicles)?;
        vehicles.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(vehicles)
    }

    pub fn vehicles_by_status(&self, status: VehicleStatus) -> Result<Vec<Vehicle>> {
        self.vehicles_where(|v| v.status == status)
    }

    pub fn vehicles_by_type(&self, vehicle_type: VehicleType) -> Result<Vec<Vehicle>> {
        self.vehicles_where(|v| v.vehicle_type == vehicle_type)
    }

    pub fn available_vehicles(&self) -> Result<Vec<Vehicle>> {
        self.vehicles_by_status(VehicleStatus::Available)
    }

    fn vehicles_where(&self, keep: impl Fn(&Vehicle) -> bool) -> Result<Vec<Vehicle>> {
        let mut vehicles = self.list_vehicles()?;
        vehicles.retain(|v| keep(v));
        Ok(vehicles)
    }

    /// Register a driver, ON_DUTY with a clean safety record.
    pub fn create_driver(&self, request: NewDriver, actor: &Actor) -> Result<Driver> {
        let now = self.now();
        let id = new_uuid_to_bech32(DRIVER_HRP)?;
        let driver = Driver::register(id, request, actor.clone(), now)?;
        let witness = Witness::new(
            &driver.id,
            actor,
            now,
            Event::DriverRegistered {
                license_number: driver.license_number.clone(),
            },
        );

        let s = &self.store;
        (&s.drivers, &s.licenses, &s.journal).transaction(|(drivers, licenses, journal)| {
            if licenses.get(driver.license_number.as_bytes())?.is_some() {
                let refused = Precondition::DuplicateLicenseNumber(driver.license_number.clone());
                return abort(FleetError::from(refused));
            }
            licenses.insert(driver.license_number.as_bytes(), driver.id.as_bytes())?;
            tx_put(drivers, &driver.id, &driver)?;
            tx_witness(journal, &witness)
        })?;

        info!(driver_id = %driver.id, license = %driver.license_number, "driver registered");
        Ok(driver)
    }

    pub fn update_driver(
        &self,
        driver_id: &str,
        update: DriverUpdate,
        actor: &Actor,
    ) -> Result<Driver> {
        let (now, today) = (self.now(), self.today());
        let s = &self.store;
        let (driver, from) = (&s.drivers, &s.journal).transaction(|(drivers, journal)| {
            let mut driver: Driver = tx_load(drivers, Entity::Driver, driver_id)?;
            let from = driver.status;
            driver.apply_update(update.clone(), today, now).or_abort()?;

            tx_put(drivers, driver_id, &driver)?;
            if driver.status != from {
                let event = Event::DriverStatusChanged {
                    from,
                    to: driver.status,
                };
                tx_witness(journal, &Witness::new(driver_id, actor, now, event))?;
            }
            Ok((driver, from))
        })?;

        info!(driver_id, %from, to = %driver.status, actor = %actor.id, "driver updated");
        Ok(driver)
    }

    /// Manual status change by a safety officer (suspend, stand down, return to duty).
    pub fn set_driver_status(
        &self,
        driver_id: &str,
        to: DriverStatus,
        actor: &Actor,
    ) -> Result<Driver> {
        let (now, today) = (self.now(), self.today());
        let s = &self.store;
        let (driver, from) = (&s.drivers, &s.journal).transaction(|(drivers, journal)| {
            let mut driver: Driver = tx_load(drivers, Entity::Driver, driver_id)?;
            let from = driver.status;
            driver.set_status_manually(to, today, now).or_abort()?;

            tx_put(drivers, driver_id, &driver)?;
            let event = Event::DriverStatusChanged { from, to };
            tx_witness(journal, &Witness::new(driver_id, actor, now, event))?;
            Ok((driver, from))
        })?;

        info!(driver_id, %from, %to, actor = %actor.id, "driver status changed");
        Ok(driver)
    }

    /// Files one complaint. Every call counts, there is no deduplication.
    pub fn add_complaint(&self, driver_id: &str, actor: &Actor) -> Result<Driver> {
        let now = self.now();
        let s = &self.store;
        let driver = (&s.drivers, &s.journal).transaction(|(drivers, journal)| {
            let mut driver: Driver = tx_load(drivers, Entity::Driver, driver_id)?;
            driver.add_complaint(now);

            tx_put(drivers, driver_id, &driver)?;
            let event = Event::ComplaintFiled {
                complaints: driver.complaints,
                safety_score: driver.safety_score,
            };
            tx_witness(journal, &Witness::new(driver_id, actor, now, event))?;
            Ok(driver)
        })?;

        info!(
            driver_id,
            complaints = driver.complaints,
            safety_score = driver.safety_score,
            "complaint filed"
        );
        Ok(driver)
    }

    pub fn delete_driver(&self, driver_id: &str) -> Result<()> {
        let s = &self.store;
        (&s.drivers, &s.licenses).transaction(|(drivers, licenses)| {
            let driver: Driver = tx_load(drivers, Entity::Driver, driver_id)?;
            if driver.status == DriverStatus::OnTrip {
                let refused = Precondition::DriverOnTrip { action: "delete" };
                return abort(FleetError::from(refused));
            }
            drivers.remove(driver_id.as_bytes())?;
            licenses.remove(driver.license_number.as_bytes())?;
            Ok(())
        })?;

        info!(driver_id, "driver deleted");
        Ok(())
    }

    pub fn get_driver(&self, driver_id: &str) -> Result<Driver> {
        store::load(&self.store.drivers, Entity::Driver, driver_id)
    }

    pub fn list_drivers(&self) -> Result<Vec<Driver>> {
        let mut drivers: Vec<Driver> = store::scan(&self.store.drivers)?;
        drivers.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(drivers)
    }

    pub fn drivers_by_status(&self, status: DriverStatus) -> Result<Vec<Driver>> {
        self.drivers_where(|d| d.status == status)
    }

    /// Drivers that could be put on a trip on `today`.
    pub fn available_drivers(&self, today: NaiveDate) -> Result<Vec<Driver>> {
        self.drivers_where(|d| driver_dispatchable(d, today))
    }

    /// Safety alert list: license expired on or before `today`, suspended drivers excluded.
    pub fn drivers_with_expired_license(&self, today: NaiveDate) -> Result<Vec<Driver>> {
        self.drivers_where(|d| {
            d.license_expiry_date.date() <= today && d.status != DriverStatus::Suspended
        })
    }

    fn drivers_where(&self, keep: impl Fn(&Driver) -> bool) -> Result<Vec<Driver>> {
        let mut drivers = self.list_drivers()?;
        drivers.retain(|d| keep(d));
        Ok(drivers)
    }
}
