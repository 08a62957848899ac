//! Append-only audit trail.
//!
//! Every committed transition writes a [`Witness`] in the same transaction as the
//! records it describes. A witness is keyed by `subject/nanos/uuid7/sha256(cbor)`,
//! so a prefix scan over one subject yields its history in time order, the key
//! commits to the witness contents, and two identical witnesses recorded at the
//! same instant still get distinct keys.
use crate::driver::DriverStatus;
use crate::error::Result;
use crate::expense::ExpenseStatus;
use crate::maintenance::MaintenanceStatus;
use crate::trip::TripStatus;
use crate::types::{Actor, TimeStamp};
use crate::vehicle::VehicleStatus;
use uuid7::uuid7;

#[derive(Debug, PartialEq, minicbor::Encode, minicbor::Decode, Clone)]
pub struct Witness {
    #[n(0)]
    pub subject_id: String, // id of the vehicle, driver, trip, log or expense this is about
    #[n(1)]
    pub actor: Actor,
    #[n(2)]
    pub recorded_at: TimeStamp,
    #[n(3)]
    pub event: Event,
}

#[derive(Debug, PartialEq, minicbor::Encode, minicbor::Decode, Clone)]
pub enum Event {
    #[n(0)]
    VehicleRegistered {
        #[n(0)]
        license_plate: String,
    },
    #[n(1)]
    VehicleStatusChanged {
        #[n(0)]
        from: VehicleStatus,
        #[n(1)]
        to: VehicleStatus,
    },
    #[n(2)]
    DriverRegistered {
        #[n(0)]
        license_number: String,
    },
    #[n(3)]
    DriverStatusChanged {
        #[n(0)]
        from: DriverStatus,
        #[n(1)]
        to: DriverStatus,
    },
    #[n(4)]
    ComplaintFiled {
        #[n(0)]
        complaints: u32,
        #[n(1)]
        safety_score: f64,
    },
    #[n(5)]
    TripCreated {
        #[n(0)]
        trip_number: u64,
        #[n(1)]
        vehicle_id: String,
        #[n(2)]
        driver_id: String,
    },
    #[n(6)]
    TripStatusChanged {
        #[n(0)]
        from: TripStatus,
        #[n(1)]
        to: TripStatus,
    },
    #[n(7)]
    TripCompleted {
        #[n(0)]
        end_odometer: f64,
        #[n(1)]
        actual_distance: f64,
    },
    #[n(8)]
    TripCancelled {
        #[n(0)]
        reason: Option<String>,
        #[n(1)]
        released: bool,
    },
    #[n(9)]
    MaintenanceOpened {
        #[n(0)]
        vehicle_id: String,
    },
    #[n(10)]
    MaintenanceStatusChanged {
        #[n(0)]
        from: MaintenanceStatus,
        #[n(1)]
        to: MaintenanceStatus,
    },
    #[n(11)]
    ExpenseRecorded {
        #[n(0)]
        trip_id: String,
    },
    #[n(12)]
    ExpenseStatusChanged {
        #[n(0)]
        from: ExpenseStatus,
        #[n(1)]
        to: ExpenseStatus,
    },
}

impl Witness {
    pub fn new(subject_id: &str, actor: &Actor, recorded_at: TimeStamp, event: Event) -> Self {
        Self {
            subject_id: subject_id.to_string(),
            actor: actor.clone(),
            recorded_at,
            event,
        }
    }

    pub fn build(&self) -> Result<(String, Vec<u8>)> {
        let cbor = minicbor::to_vec(self)?;
        let hash = sha256::digest(&cbor);

        Ok((hash, cbor))
    }

    /// Returns the journal key and the encoded witness. The uuid7 component keeps
    /// repeated witnesses apart and orders those sharing a timestamp by insertion.
    pub fn finalise(&self) -> Result<(String, Vec<u8>)> {
        let (hash, cbor) = self.build()?;
        let key = format!(
            "{}/{:020}/{}/{}",
            self.subject_id,
            self.recorded_at.nanos(),
            uuid7(),
            hash
        );

        Ok((key, cbor))
    }
}

pub fn subject_prefix(subject_id: &str) -> String {
    format!("{subject_id}/")
}
