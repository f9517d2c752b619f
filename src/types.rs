use chrono::NaiveDate;
use serde::Serialize;
use tabled::Tabled;

/// One row of the material/operation master: what a single unit of an
/// operation costs.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationCost {
    pub operation: String,
    pub cost: Option<f64>,
}

/// One bill-of-materials line: `quantity` units of `operation` per unit of `sku`.
#[derive(Debug, Clone, PartialEq)]
pub struct BomLine {
    pub sku: Option<String>,
    pub operation: Option<String>,
    pub quantity: Option<f64>,
}

/// A stock movement, read as a production event.
#[derive(Debug, Clone, PartialEq)]
pub struct MovementRecord {
    pub date: Option<NaiveDate>,
    pub sku: Option<String>,
    pub quantity: Option<f64>,
}

/// A line of the order report, read as a sales event.
#[derive(Debug, Clone, PartialEq)]
pub struct SalesRecord {
    pub date: Option<NaiveDate>,
    pub sku: Option<String>,
    pub quantity: Option<f64>,
    pub margin: Option<f64>,
    /// Secondary grouping key; `None` when the report carries no such column.
    pub group: Option<String>,
}

/// The four typed tables a computation run works from.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub movements: Vec<MovementRecord>,
    pub operations: Vec<OperationCost>,
    pub sales: Vec<SalesRecord>,
    pub bom: Vec<BomLine>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnitLaborCost {
    pub sku: String,
    pub unit_cost: f64,
}

/// Inclusive month-to-date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MonthWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl MonthWindow {
    pub fn contains(&self, date: Option<NaiveDate>) -> bool {
        matches!(date, Some(d) if d >= self.start && d <= self.end)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductionAggregate {
    pub sku: String,
    pub quantity: f64,
    pub unit_cost: f64,
    pub total_cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalesAggregate {
    pub sku: String,
    pub group: Option<String>,
    pub quantity: f64,
    pub unit_cost: f64,
    pub recovered_cost: f64,
    pub margin: f64,
}

/// Month-to-date per-SKU tables plus their scalar totals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyAggregate {
    pub window: MonthWindow,
    pub production: Vec<ProductionAggregate>,
    pub sales: Vec<SalesAggregate>,
    pub total_produced: f64,
    pub total_labor_cost_fabricated: f64,
    pub total_sold: f64,
    pub total_labor_cost_recovered: f64,
    pub total_margin: f64,
}

/// The engine's handoff to any presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiSummary {
    #[serde(flatten)]
    pub monthly: MonthlyAggregate,
    pub monthly_budget: f64,
    pub business_days_month: i64,
    pub business_days_elapsed: i64,
    pub objective_to_date: f64,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct ProductionRow {
    #[serde(rename = "SKU")]
    #[tabled(rename = "SKU")]
    pub sku: String,
    #[serde(rename = "Cantidad")]
    #[tabled(rename = "Cantidad")]
    pub quantity: String,
    #[serde(rename = "Costo MO unit.")]
    #[tabled(rename = "Costo MO unit.")]
    pub unit_cost: String,
    #[serde(rename = "Costo MO total")]
    #[tabled(rename = "Costo MO total")]
    pub total_cost: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct SalesRow {
    #[serde(rename = "SKU")]
    #[tabled(rename = "SKU")]
    pub sku: String,
    #[serde(rename = "CRM")]
    #[tabled(rename = "CRM")]
    pub group: String,
    #[serde(rename = "Cantidad")]
    #[tabled(rename = "Cantidad")]
    pub quantity: String,
    #[serde(rename = "Costo MO unit.")]
    #[tabled(rename = "Costo MO unit.")]
    pub unit_cost: String,
    #[serde(rename = "Costo MO recuperado")]
    #[tabled(rename = "Costo MO recuperado")]
    pub recovered_cost: String,
    #[serde(rename = "Margen")]
    #[tabled(rename = "Margen")]
    pub margin: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct KpiCardRow {
    #[tabled(rename = "Indicador")]
    pub label: String,
    #[tabled(rename = "Valor")]
    pub value: String,
    #[tabled(rename = "vs esperado")]
    pub delta: String,
}
