//! Service layer API for fleet operations.
//!
//! [`FleetService`] owns the store and the clock. Every operation that touches
//! more than one record runs as a single sled transaction, so a failed precondition
//! or a crash leaves vehicles, drivers and trips exactly as they were. Logging
//! happens after the commit because sled may re-run a transaction closure.
mod analytics;
mod ledger;
mod maintenance;
mod registry;
mod trips;

use crate::error::Result;
use crate::store::FleetStore;
use crate::types::{Clock, SystemClock, TimeStamp};
use chrono::NaiveDate;
use sled::Db;
use std::sync::Arc;

pub struct FleetService {
    instance: Arc<sled::Db>,
    store: FleetStore,
    clock: Arc<dyn Clock>,
}

impl FleetService {
    pub fn new(instance: Arc<Db>) -> Result<Self> {
        Self::with_clock(instance, Arc::new(SystemClock))
    }

    pub fn with_clock(instance: Arc<Db>, clock: Arc<dyn Clock>) -> Result<Self> {
        let store = FleetStore::open(&instance)?;
        Ok(Self {
            instance,
            store,
            clock,
        })
    }

    fn now(&self) -> TimeStamp {
        TimeStamp::from(self.clock.now())
    }

    fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Blocks until every committed write is on disk.
    pub fn flush(&self) -> Result<usize> {
        Ok(self.instance.flush()?)
    }
}
