//! Financial reports, dashboard and audit history
use super::FleetService;
use crate::dashboard::{self, DashboardStats};
use crate::error::{Entity, Result};
use crate::expense::Expense;
use crate::finance::{self, FleetSummary, MonthlyFinancialSummary, VehicleCost};
use crate::fuel::FuelLog;
use crate::journal::Witness;
use crate::maintenance::MaintenanceLog;
use crate::store::{self, encode};
use crate::trip::Trip;
use chrono::Datelike;
use tracing::info;

impl FleetService {
    /// Recomputes the summary for one month from the underlying records and
    /// stores it, replacing any earlier one. Repeating the call on unchanged
    /// data gives the same result.
    pub fn generate_monthly_summary(
        &self,
        year: i32,
        month: u32,
    ) -> Result<MonthlyFinancialSummary> {
        finance::ensure_period(year, month)?;

        let trips: Vec<Trip> = store::scan(&self.store.trips)?;
        let expenses: Vec<Expense> = store::scan(&self.store.expenses)?;
        let maintenance: Vec<MaintenanceLog> = store::scan(&self.store.maintenance_logs)?;
        let fuel_logs: Vec<FuelLog> = store::scan(&self.store.fuel_logs)?;

        let summary =
            finance::monthly_summary(year, month, &trips, &expenses, &maintenance, &fuel_logs)?;
        let key = MonthlyFinancialSummary::key(year, month);
        let value = encode(&summary)?;
        self.store.monthly_summaries.insert(key.as_bytes(), value)?;

        info!(
            year,
            month,
            revenue = %summary.revenue,
            net_profit = %summary.net_profit,
            trips = summary.total_trips,
            "monthly summary generated"
        );
        Ok(summary)
    }

    pub fn generate_current_month_summary(&self) -> Result<MonthlyFinancialSummary> {
        let today = self.today();
        self.generate_monthly_summary(today.year(), today.month())
    }

    pub fn monthly_summary(&self, year: i32, month: u32) -> Result<MonthlyFinancialSummary> {
        let key = MonthlyFinancialSummary::key(year, month);
        store::load(&self.store.monthly_summaries, Entity::MonthlySummary, &key)
    }

    /// Stored summaries: one year in month order, or every year newest first.
    pub fn financial_summaries(&self, year: Option<i32>) -> Result<Vec<MonthlyFinancialSummary>> {
        let mut summaries: Vec<MonthlyFinancialSummary> =
            store::scan(&self.store.monthly_summaries)?;
        match year {
            Some(year) => {
                summaries.retain(|s| s.year == year);
                summaries.sort_by_key(|s| s.month);
            }
            None => summaries.sort_by(|a, b| (b.year, b.month).cmp(&(a.year, a.month))),
        }
        Ok(summaries)
    }

    pub fn vehicle_costs(&self) -> Result<Vec<VehicleCost>> {
        let vehicles = self.list_vehicles()?;
        let expenses: Vec<Expense> = store::scan(&self.store.expenses)?;
        let maintenance: Vec<MaintenanceLog> = store::scan(&self.store.maintenance_logs)?;
        let fuel_logs: Vec<FuelLog> = store::scan(&self.store.fuel_logs)?;

        Ok(finance::vehicle_costs(&vehicles, &expenses, &maintenance, &fuel_logs))
    }

    pub fn top_costliest_vehicles(&self, limit: usize) -> Result<Vec<VehicleCost>> {
        Ok(finance::top_costliest(self.vehicle_costs()?, limit))
    }

    pub fn fleet_summary(&self) -> Result<FleetSummary> {
        let vehicles = self.list_vehicles()?;
        let trips: Vec<Trip> = store::scan(&self.store.trips)?;
        let expenses: Vec<Expense> = store::scan(&self.store.expenses)?;

        Ok(finance::fleet_summary(&vehicles, &trips, &expenses))
    }

    pub fn dashboard(&self) -> Result<DashboardStats> {
        let vehicles = self.list_vehicles()?;
        let drivers = self.list_drivers()?;
        let trips = self.list_trips()?;

        Ok(dashboard::dashboard(&vehicles, &drivers, &trips, self.today()))
    }

    /// Every witness recorded for one vehicle, driver, trip, log or expense, oldest first.
    pub fn history(&self, subject_id: &str) -> Result<Vec<Witness>> {
        store::history(&self.store.journal, subject_id)
    }
}
