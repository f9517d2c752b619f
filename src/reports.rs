// The KPI aggregation engine: unit labor cost allocation and the
// month-to-date production/sales aggregation.
//
// Everything here is a pure function of its inputs. Grouping uses `BTreeMap`
// so rows come out ordered by key and float sums run in a fixed order.
use crate::calendar::month_bounds;
use crate::types::{
    BomLine, MonthWindow, MonthlyAggregate, MovementRecord, OperationCost, ProductionAggregate,
    SalesAggregate, SalesRecord, UnitLaborCost,
};
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Left-join lookup with zero fill.
///
/// Every join in the engine goes through this: a key absent on the right
/// side, or present with no value, yields 0 instead of dropping the row.
pub struct ZeroFillIndex<'a> {
    values: HashMap<&'a str, Option<f64>>,
}

impl<'a> ZeroFillIndex<'a> {
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, Option<f64>)>,
    {
        let mut values: HashMap<&'a str, Option<f64>> = HashMap::new();
        for (key, value) in pairs {
            match values.get(key) {
                Some(Some(_)) => debug!(key, "duplicate join key ignored"),
                _ => {
                    values.insert(key, value);
                }
            }
        }
        Self { values }
    }

    pub fn get(&self, key: &str) -> f64 {
        self.values.get(key).copied().flatten().unwrap_or(0.0)
    }
}

/// Labor cost per unit of each SKU in the bill of materials.
pub fn compute_unit_labor_cost(
    operations: &[OperationCost],
    bom: &[BomLine],
) -> Vec<UnitLaborCost> {
    let costs = ZeroFillIndex::from_pairs(
        operations.iter().map(|op| (op.operation.as_str(), op.cost)),
    );

    let mut per_sku: BTreeMap<&str, f64> = BTreeMap::new();
    for line in bom {
        let Some(sku) = line.sku.as_deref() else {
            continue;
        };
        let cost = line.operation.as_deref().map_or(0.0, |op| costs.get(op));
        let partial = line.quantity.unwrap_or(0.0) * cost;
        *per_sku.entry(sku).or_insert(0.0) += partial;
    }

    debug!(skus = per_sku.len(), bom_lines = bom.len(), "unit labor cost computed");
    per_sku
        .into_iter()
        .map(|(sku, unit_cost)| UnitLaborCost { sku: sku.to_string(), unit_cost })
        .collect()
}

/// First day of `today`'s month through `today`, inclusive.
pub fn month_to_date(today: NaiveDate) -> MonthWindow {
    let (start, _) = month_bounds(today);
    MonthWindow { start, end: today }
}

fn unit_cost_index(unit_cost: &[UnitLaborCost]) -> ZeroFillIndex<'_> {
    ZeroFillIndex::from_pairs(unit_cost.iter().map(|u| (u.sku.as_str(), Some(u.unit_cost))))
}

pub fn aggregate_production(
    movements: &[MovementRecord],
    unit_cost: &[UnitLaborCost],
    window: MonthWindow,
) -> Vec<ProductionAggregate> {
    let mut qty: BTreeMap<&str, f64> = BTreeMap::new();
    for m in movements.iter().filter(|m| window.contains(m.date)) {
        if let Some(sku) = m.sku.as_deref() {
            *qty.entry(sku).or_insert(0.0) += m.quantity.unwrap_or(0.0);
        }
    }

    let costs = unit_cost_index(unit_cost);
    qty.into_iter()
        .map(|(sku, quantity)| {
            let unit_cost = costs.get(sku);
            ProductionAggregate {
                sku: sku.to_string(),
                quantity,
                unit_cost,
                total_cost: quantity * unit_cost,
            }
        })
        .collect()
}

pub fn aggregate_sales(
    sales: &[SalesRecord],
    unit_cost: &[UnitLaborCost],
    window: MonthWindow,
) -> Vec<SalesAggregate> {
    #[derive(Default)]
    struct Acc {
        quantity: f64,
        margin: f64,
    }

    let mut map: BTreeMap<(&str, Option<&str>), Acc> = BTreeMap::new();
    for s in sales.iter().filter(|s| window.contains(s.date)) {
        let Some(sku) = s.sku.as_deref() else {
            continue;
        };
        let e = map.entry((sku, s.group.as_deref())).or_default();
        e.quantity += s.quantity.unwrap_or(0.0);
        e.margin += s.margin.unwrap_or(0.0);
    }

    let costs = unit_cost_index(unit_cost);
    map.into_iter()
        .map(|((sku, group), acc)| {
            let unit_cost = costs.get(sku);
            SalesAggregate {
                sku: sku.to_string(),
                group: group.map(str::to_string),
                quantity: acc.quantity,
                unit_cost,
                recovered_cost: acc.quantity * unit_cost,
                margin: acc.margin,
            }
        })
        .collect()
}

/// Month-to-date production and sales for the month containing `today`.
pub fn aggregate_current_month(
    movements: &[MovementRecord],
    sales: &[SalesRecord],
    unit_cost: &[UnitLaborCost],
    today: NaiveDate,
) -> MonthlyAggregate {
    let window = month_to_date(today);
    let production = aggregate_production(movements, unit_cost, window);
    let sales_agg = aggregate_sales(sales, unit_cost, window);

    // Margin comes straight from the filtered source rows, not the grouped table.
    let total_margin: f64 = sales
        .iter()
        .filter(|s| window.contains(s.date))
        .map(|s| s.margin.unwrap_or(0.0))
        .sum();

    let aggregate = MonthlyAggregate {
        window,
        total_produced: production.iter().map(|p| p.quantity).sum(),
        total_labor_cost_fabricated: production.iter().map(|p| p.total_cost).sum(),
        total_sold: sales_agg.iter().map(|s| s.quantity).sum(),
        total_labor_cost_recovered: sales_agg.iter().map(|s| s.recovered_cost).sum(),
        total_margin,
        production,
        sales: sales_agg,
    };
    debug!(
        start = %window.start,
        end = %window.end,
        production_skus = aggregate.production.len(),
        sales_rows = aggregate.sales.len(),
        "month-to-date aggregate computed"
    );
    aggregate
}
