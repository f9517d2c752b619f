//! Month-to-date manufacturing KPIs from four factory extracts.
//!
//! Raw tables go through [`schema`] into typed records, [`reports`] turns them
//! into per-SKU production and sales aggregates, and [`kpi`] adds the
//! prorated cost objective. [`loader`], [`cache`] and [`output`] sit around
//! that pipeline and never feed back into it.
pub mod cache;
pub mod calendar;
pub mod config;
pub mod error;
pub mod kpi;
pub mod loader;
pub mod logging;
pub mod output;
pub mod reports;
pub mod schema;
pub mod types;
pub mod util;

pub use error::{KpiError, KpiResult};
pub use types::KpiSummary;

use chrono::NaiveDate;
use schema::RawTables;
use types::Dataset;

/// Run the whole engine on one snapshot: unit cost, month-to-date aggregate, objective.
pub fn compute_kpis(data: &Dataset, today: NaiveDate, monthly_budget: f64) -> KpiSummary {
    let unit_cost = reports::compute_unit_labor_cost(&data.operations, &data.bom);
    let monthly = reports::aggregate_current_month(&data.movements, &data.sales, &unit_cost, today);
    kpi::compose(monthly, monthly_budget, today)
}

/// Same as [`compute_kpis`], memoizing the aggregate on the raw table content.
pub fn compute_kpis_cached(
    memo: &mut cache::AggregateCache,
    raw: &RawTables,
    data: &Dataset,
    today: NaiveDate,
    monthly_budget: f64,
) -> KpiSummary {
    let key = cache::content_key(raw, today);
    let monthly = memo.get_or_compute(key, || {
        let unit_cost = reports::compute_unit_labor_cost(&data.operations, &data.bom);
        reports::aggregate_current_month(&data.movements, &data.sales, &unit_cost, today)
    });
    kpi::compose(monthly, monthly_budget, today)
}
