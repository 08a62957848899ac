//! Fleet dispatch core: vehicles, drivers, trips, maintenance and the money
//! that flows through them, persisted in an embedded sled database.

pub mod config;
pub mod dashboard;
pub mod driver;
pub mod eligibility;
pub mod error;
pub mod expense;
pub mod finance;
pub mod fuel;
pub mod journal;
pub mod maintenance;
pub mod service;
pub mod store;
pub mod trip;
pub mod types;
pub mod utils;
pub mod vehicle;

pub use error::{FleetError, Precondition, Result};
pub use service::FleetService;
