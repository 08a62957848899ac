//! Maintenance logs and their coupling to vehicle availability
use crate::error::{FleetError, Precondition, Result, ensure_amount};
use crate::types::{Actor, Day, Money, TimeStamp};
use crate::vehicle::{Vehicle, VehicleStatus};
use std::fmt;

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaintenanceStatus {
    #[n(0)]
    New,
    #[n(1)]
    InProgress,
    #[n(2)]
    Resolved,
}

impl MaintenanceStatus {
    pub fn is_open(&self) -> bool {
        !matches!(self, MaintenanceStatus::Resolved)
    }
}

impl fmt::Display for MaintenanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MaintenanceStatus::New => "NEW",
            MaintenanceStatus::InProgress => "IN_PROGRESS",
            MaintenanceStatus::Resolved => "RESOLVED",
        })
    }
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq)]
pub struct MaintenanceLog {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub vehicle_id: String,
    #[n(2)]
    pub service_name: String,
    #[n(3)]
    pub issue_description: Option<String>,
    #[n(4)]
    pub service_date: Day,
    #[n(5)]
    pub cost: Money,
    #[n(6)]
    pub status: MaintenanceStatus,
    #[n(7)]
    pub created_by: Actor,
    #[n(8)]
    pub created_at: TimeStamp,
    #[n(9)]
    pub updated_at: TimeStamp,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewMaintenanceLog {
    pub vehicle_id: String,
    pub service_name: String,
    pub issue_description: Option<String>,
    pub service_date: Day,
    pub cost: Option<Money>,
}

impl NewMaintenanceLog {
    pub fn new(vehicle_id: &str, service_name: &str, service_date: Day) -> Self {
        Self {
            vehicle_id: vehicle_id.to_string(),
            service_name: service_name.to_string(),
            issue_description: None,
            service_date,
            cost: None,
        }
    }
    pub fn set_issue(mut self, description: &str) -> Self {
        self.issue_description = Some(description.to_string());
        self
    }
    pub fn set_cost(mut self, cost: Money) -> Self {
        self.cost = Some(cost);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MaintenanceUpdate {
    pub service_name: Option<String>,
    pub issue_description: Option<String>,
    pub service_date: Option<Day>,
    pub cost: Option<Money>,
}

impl MaintenanceLog {
    /// Opens a NEW log and sends the vehicle to the shop, even if it is already there.
    pub fn open(
        id: String,
        request: NewMaintenanceLog,
        vehicle: &mut Vehicle,
        actor: Actor,
        now: TimeStamp,
    ) -> Result<Self> {
        match vehicle.status {
            VehicleStatus::OnTrip => {
                return Err(Precondition::VehicleOnTrip {
                    action: "create a maintenance log for",
                }
                .into());
            }
            VehicleStatus::Retired => {
                return Err(FleetError::invalid_state(
                    "Cannot send a retired vehicle to the shop",
                    vehicle.status,
                    VehicleStatus::InShop,
                ));
            }
            VehicleStatus::Available | VehicleStatus::InShop => {}
        }
        let cost = ensure_amount("maintenance cost", request.cost.unwrap_or(Money::ZERO))?;

        vehicle.status = VehicleStatus::InShop;
        vehicle.updated_at = now;

        Ok(Self {
            id,
            vehicle_id: vehicle.id.clone(),
            service_name: request.service_name,
            issue_description: request.issue_description,
            service_date: request.service_date,
            cost,
            status: MaintenanceStatus::New,
            created_by: actor,
            created_at: now,
            updated_at: now,
        })
    }

    /// Moves the log to `to`. RESOLVED is final.
    pub fn set_status(&mut self, to: MaintenanceStatus, now: TimeStamp) -> Result<()> {
        if self.status == MaintenanceStatus::Resolved {
            return Err(FleetError::invalid_state(
                "Cannot change status of a resolved maintenance log",
                self.status,
                to,
            ));
        }
        self.status = to;
        self.updated_at = now;
        Ok(())
    }

    pub fn apply_update(&mut self, update: MaintenanceUpdate, now: TimeStamp) -> Result<()> {
        if let Some(cost) = update.cost {
            self.cost = ensure_amount("maintenance cost", cost)?;
        }
        if let Some(name) = update.service_name {
            self.service_name = name;
        }
        if let Some(description) = update.issue_description {
            self.issue_description = Some(description);
        }
        if let Some(date) = update.service_date {
            self.service_date = date;
        }
        self.updated_at = now;
        Ok(())
    }
}

/// Called once a log has been resolved and removed from the vehicle's open set.
/// The vehicle goes back into service only when nothing else is open.
pub fn return_to_service(vehicle: &mut Vehicle, still_open: usize, now: TimeStamp) -> bool {
    if still_open == 0 && vehicle.status == VehicleStatus::InShop {
        vehicle.status = VehicleStatus::Available;
        vehicle.updated_at = now;
        return true;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vehicle::{NewVehicle, VehicleType};

    fn vehicle() -> Vehicle {
        Vehicle::register(
            "vehicle1m".into(),
            NewVehicle::new("MH-12", VehicleType::Van, 500.0),
            Actor::new("u1", "Fleet Manager"),
            TimeStamp::new(),
        )
        .unwrap()
    }

    fn open(vehicle: &mut Vehicle) -> Result<MaintenanceLog> {
        MaintenanceLog::open(
            "maint1a".into(),
            NewMaintenanceLog::new(&vehicle.id, "Brake pads", Day::new(2025, 6, 3).unwrap())
                .set_cost(Money::whole(120)),
            vehicle,
            Actor::new("u1", "Fleet Manager"),
            TimeStamp::new(),
        )
    }

    #[test]
    fn opening_sends_vehicle_to_shop() {
        let mut vehicle = vehicle();
        let log = open(&mut vehicle).unwrap();
        assert_eq!(log.status, MaintenanceStatus::New);
        assert_eq!(vehicle.status, VehicleStatus::InShop);

        open(&mut vehicle).unwrap();
        assert_eq!(vehicle.status, VehicleStatus::InShop);
    }

    #[test]
    fn vehicle_on_trip_is_refused() {
        let mut vehicle = vehicle();
        vehicle.status = VehicleStatus::OnTrip;
        assert!(matches!(
            open(&mut vehicle),
            Err(FleetError::Precondition(Precondition::VehicleOnTrip { .. }))
        ));
        assert_eq!(vehicle.status, VehicleStatus::OnTrip);
    }

    #[test]
    fn resolved_is_terminal() {
        let mut vehicle = vehicle();
        let mut log = open(&mut vehicle).unwrap();
        log.set_status(MaintenanceStatus::InProgress, TimeStamp::new())
            .unwrap();
        log.set_status(MaintenanceStatus::Resolved, TimeStamp::new())
            .unwrap();

        let err = log
            .set_status(MaintenanceStatus::InProgress, TimeStamp::new())
            .unwrap_err();
        assert!(matches!(err, FleetError::InvalidState { .. }));
    }

    #[test]
    fn vehicle_returns_only_when_nothing_is_open() {
        let mut vehicle = vehicle();
        vehicle.status = VehicleStatus::InShop;

        assert!(!return_to_service(&mut vehicle, 1, TimeStamp::new()));
        assert_eq!(vehicle.status, VehicleStatus::InShop);

        assert!(return_to_service(&mut vehicle, 0, TimeStamp::new()));
        assert_eq!(vehicle.status, VehicleStatus::Available);
    }
}
