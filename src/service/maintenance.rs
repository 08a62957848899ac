//! Maintenance logs and the IN_SHOP coupling
use super::FleetService;
use crate::error::{Entity, Result};
use crate::journal::{Event, Witness};
use crate::maintenance::{
    MaintenanceLog, MaintenanceStatus, MaintenanceUpdate, NewMaintenanceLog, return_to_service,
};
use crate::store::{
    self, OrAbort, tx_get, tx_load, tx_open_logs, tx_put, tx_set_open_logs, tx_witness,
};
use crate::types::Actor;
use crate::utils::{MAINTENANCE_HRP, new_uuid_to_bech32};
use crate::vehicle::{Vehicle, VehicleStatus};
use sled::Transactional;
use tracing::info;

impl FleetService {
    /// Opens a NEW log and puts the vehicle IN_SHOP.
    pub fn create_maintenance_log(
        &self,
        request: NewMaintenanceLog,
        actor: &Actor,
    ) -> Result<MaintenanceLog> {
        let id = new_uuid_to_bech32(MAINTENANCE_HRP)?;
        let now = self.now();

        let s = &self.store;
        let open_index = &s.open_maintenance;
        let log = (&s.vehicles, &s.maintenance_logs, open_index, &s.journal).transaction(
            |(vehicles, logs, open_maintenance, journal)| {
                let mut vehicle: Vehicle = tx_load(vehicles, Entity::Vehicle, &request.vehicle_id)?;
                let from = vehicle.status;
                let (request, opened_by) = (request.clone(), actor.clone());
                let log = MaintenanceLog::open(id.clone(), request, &mut vehicle, opened_by, now)
                    .or_abort()?;

                let mut open = tx_open_logs(open_maintenance, &vehicle.id)?;
                open.push(log.id.clone());
                tx_set_open_logs(open_maintenance, &vehicle.id, &open)?;
                tx_put(logs, &log.id, &log)?;
                tx_put(vehicles, &vehicle.id, &vehicle)?;

                let opened = Event::MaintenanceOpened {
                    vehicle_id: vehicle.id.clone(),
                };
                tx_witness(journal, &Witness::new(&log.id, actor, now, opened))?;
                if from != vehicle.status {
                    let event = Event::VehicleStatusChanged {
                        from,
                        to: vehicle.status,
                    };
                    tx_witness(journal, &Witness::new(&vehicle.id, actor, now, event))?;
                }
                Ok(log)
            },
        )?;

        info!(
            log_id = %log.id,
            vehicle_id = %log.vehicle_id,
            service = %log.service_name,
            "maintenance opened"
        );
        Ok(log)
    }

    /// Moves a log along. Resolving the last open log of a vehicle in the shop
    /// makes it AVAILABLE again.
    pub fn set_maintenance_status(
        &self,
        log_id: &str,
        to: MaintenanceStatus,
        actor: &Actor,
    ) -> Result<MaintenanceLog> {
        let now = self.now();

        let s = &self.store;
        let open_index = &s.open_maintenance;
        let (log, still_open, returned) = (&s.maintenance_logs, open_index, &s.vehicles, &s.journal)
            .transaction(|(logs, open_maintenance, vehicles, journal)| {
                let mut log: MaintenanceLog = tx_load(logs, Entity::MaintenanceLog, log_id)?;
                let from = log.status;
                log.set_status(to, now).or_abort()?;
                tx_put(logs, log_id, &log)?;
                let event = Event::MaintenanceStatusChanged { from, to };
                tx_witness(journal, &Witness::new(log_id, actor, now, event))?;

                let mut open = tx_open_logs(open_maintenance, &log.vehicle_id)?;
                if to.is_open() {
                    return Ok((log, open.len(), false));
                }
                open.retain(|id| id != log_id);
                tx_set_open_logs(open_maintenance, &log.vehicle_id, &open)?;

                // the vehicle may have been deleted since the log was opened
                let Some(mut vehicle) = tx_get::<Vehicle>(vehicles, &log.vehicle_id)? else {
                    return Ok((log, open.len(), false));
                };
                let returned = return_to_service(&mut vehicle, open.len(), now);
                if returned {
                    tx_put(vehicles, &vehicle.id, &vehicle)?;
                    let event = Event::VehicleStatusChanged {
                        from: VehicleStatus::InShop,
                        to: vehicle.status,
                    };
                    tx_witness(journal, &Witness::new(&vehicle.id, actor, now, event))?;
                }
                Ok((log, open.len(), returned))
            })?;

        info!(
            log_id,
            vehicle_id = %log.vehicle_id,
            status = %log.status,
            still_open,
            vehicle_available = returned,
            "maintenance status changed"
        );
        Ok(log)
    }

    /// Edits the descriptive fields and cost. Status changes go through
    /// [`FleetService::set_maintenance_status`].
    pub fn update_maintenance_log(
        &self,
        log_id: &str,
        update: MaintenanceUpdate,
        actor: &Actor,
    ) -> Result<MaintenanceLog> {
        let now = self.now();
        let log = self.store.maintenance_logs.transaction(|logs| {
            let mut log: MaintenanceLog = tx_load(logs, Entity::MaintenanceLog, log_id)?;
            log.apply_update(update.clone(), now).or_abort()?;
            tx_put(logs, log_id, &log)?;
            Ok(log)
        })?;

        info!(log_id, actor = %actor.id, "maintenance log updated");
        Ok(log)
    }

    /// Removes a log and its entry in the open-log index. The vehicle status is left alone.
    pub fn delete_maintenance_log(&self, log_id: &str) -> Result<()> {
        let s = &self.store;
        (&s.maintenance_logs, &s.open_maintenance).transaction(|(logs, open_maintenance)| {
            let log: MaintenanceLog = tx_load(logs, Entity::MaintenanceLog, log_id)?;
            let mut open = tx_open_logs(open_maintenance, &log.vehicle_id)?;
            open.retain(|id| id != log_id);
            tx_set_open_logs(open_maintenance, &log.vehicle_id, &open)?;
            logs.remove(log_id.as_bytes())?;
            Ok(())
        })?;

        info!(log_id, "maintenance log deleted");
        Ok(())
    }

    pub fn get_maintenance_log(&self, log_id: &str) -> Result<MaintenanceLog> {
        store::load(&self.store.maintenance_logs, Entity::MaintenanceLog, log_id)
    }

    /// Newest service date first.
    pub fn list_maintenance_logs(&self) -> Result<Vec<MaintenanceLog>> {
        let mut logs: Vec<MaintenanceLog> = store::scan(&self.store.maintenance_logs)?;
        logs.sort_by(|a, b| {
            b.service_date
                .cmp(&a.service_date)
                .then(b.created_at.cmp(&a.created_at))
        });
        Ok(logs)
    }

    pub fn maintenance_by_vehicle(&self, vehicle_id: &str) -> Result<Vec<MaintenanceLog>> {
        let mut logs = self.list_maintenance_logs()?;
        logs.retain(|log| log.vehicle_id == vehicle_id);
        Ok(logs)
    }

    pub fn maintenance_by_status(&self, status: MaintenanceStatus) -> Result<Vec<MaintenanceLog>> {
        let mut logs = self.list_maintenance_logs()?;
        logs.retain(|log| log.status == status);
        Ok(logs)
    }

    /// Number of unresolved logs for a vehicle.
    pub fn open_maintenance_count(&self, vehicle_id: &str) -> Result<usize> {
        store::open_log_count(&self.store.open_maintenance, vehicle_id)
    }
}
