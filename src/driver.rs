//! Driver records, safety scoring and completion-rate bookkeeping
use crate::eligibility::license_expired;
use crate::error::{FleetError, Precondition, Result};
use crate::types::{Actor, Day, TimeStamp};
use crate::utils::round2;
use chrono::NaiveDate;
use std::fmt;

pub const STARTING_SAFETY_SCORE: f64 = 100.0;
pub const COMPLAINT_PENALTY: f64 = 5.0;

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriverStatus {
    #[n(0)]
    OnDuty,
    #[n(1)]
    OnTrip,
    #[n(2)]
    OffDuty,
    #[n(3)]
    Suspended,
}

impl fmt::Display for DriverStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DriverStatus::OnDuty => "ON_DUTY",
            DriverStatus::OnTrip => "ON_TRIP",
            DriverStatus::OffDuty => "OFF_DUTY",
            DriverStatus::Suspended => "SUSPENDED",
        })
    }
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq)]
pub struct Driver {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub name: String,
    #[n(2)]
    pub license_number: String,
    #[n(3)]
    pub license_expiry_date: Day,
    #[n(4)]
    pub license_category: Option<String>,
    #[n(5)]
    pub phone: Option<String>,
    #[n(6)]
    pub completion_rate: f64, // percentage, 0-100
    #[n(7)]
    pub safety_score: f64, // percentage, 0-100
    #[n(8)]
    pub complaints: u32,
    #[n(9)]
    pub total_trips_assigned: u32,
    #[n(10)]
    pub total_trips_completed: u32,
    #[n(11)]
    pub status: DriverStatus,
    #[n(12)]
    pub created_by: Actor,
    #[n(13)]
    pub created_at: TimeStamp,
    #[n(14)]
    pub updated_at: TimeStamp,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewDriver {
    pub name: String,
    pub license_number: String,
    pub license_expiry_date: Day,
    pub license_category: Option<String>,
    pub phone: Option<String>,
}

impl NewDriver {
    pub fn new(name: &str, license_number: &str, license_expiry_date: Day) -> Self {
        Self {
            name: name.to_string(),
            license_number: license_number.to_string(),
            license_expiry_date,
            license_category: None,
            phone: None,
        }
    }
    pub fn set_license_category(mut self, category: &str) -> Self {
        self.license_category = Some(category.to_string());
        self
    }
    pub fn set_phone(mut self, phone: &str) -> Self {
        self.phone = Some(phone.to_string());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DriverUpdate {
    pub name: Option<String>,
    pub license_expiry_date: Option<Day>,
    pub license_category: Option<String>,
    pub phone: Option<String>,
    pub status: Option<DriverStatus>,
}

pub fn normalise_license(number: &str) -> String {
    number.trim().to_uppercase()
}

impl Driver {
    pub fn register(id: String, request: NewDriver, actor: Actor, now: TimeStamp) -> Result<Self> {
        Ok(Self {
            id,
            name: request.name,
            license_number: normalise_license(&request.license_number),
            license_expiry_date: request.license_expiry_date,
            license_category: request.license_category,
            phone: request.phone,
            completion_rate: 0.0,
            safety_score: STARTING_SAFETY_SCORE,
            complaints: 0,
            total_trips_assigned: 0,
            total_trips_completed: 0,
            status: DriverStatus::OnDuty,
            created_by: actor,
            created_at: now,
            updated_at: now,
        })
    }

    /// Applies a partial edit. A status change goes through the same rules as
    /// [`Driver::set_status_manually`], checked against the updated expiry date.
    pub fn apply_update(
        &mut self,
        update: DriverUpdate,
        today: NaiveDate,
        now: TimeStamp,
    ) -> Result<()> {
        let mut edited = self.clone();
        if let Some(name) = update.name {
            edited.name = name;
        }
        if let Some(expiry) = update.license_expiry_date {
            edited.license_expiry_date = expiry;
        }
        if let Some(category) = update.license_category {
            edited.license_category = Some(category);
        }
        if let Some(phone) = update.phone {
            edited.phone = Some(phone);
        }
        if let Some(status) = update.status {
            edited.set_status_manually(status, today, now)?;
        }
        edited.updated_at = now;
        *self = edited;
        Ok(())
    }

    /// Manual status change by a safety officer. ON_TRIP is owned by the trip lifecycle.
    pub fn set_status_manually(
        &mut self,
        to: DriverStatus,
        today: NaiveDate,
        now: TimeStamp,
    ) -> Result<()> {
        let from = self.status;
        if from == DriverStatus::OnTrip || to == DriverStatus::OnTrip {
            return Err(FleetError::invalid_state(
                "Driver ON_TRIP status is only changed by trip completion or cancellation",
                from,
                to,
            ));
        }
        if to == DriverStatus::OnDuty && license_expired(self, today) {
            return Err(Precondition::ExpiredLicenseOnDuty.into());
        }
        self.status = to;
        self.updated_at = now;
        Ok(())
    }

    /// One complaint costs five safety points, never below zero.
    pub fn add_complaint(&mut self, now: TimeStamp) {
        self.complaints += 1;
        self.safety_score = (self.safety_score - COMPLAINT_PENALTY).max(0.0);
        self.updated_at = now;
    }

    /// Left untouched while no trip has ever been assigned.
    pub fn recalculate_completion_rate(&mut self) {
        if self.total_trips_assigned > 0 {
            let completed = f64::from(self.total_trips_completed);
            let rate = completed / f64::from(self.total_trips_assigned) * 100.0;
            self.completion_rate = round2(rate);
        }
    }
}
