use crate::error::KpiResult;
use crate::kpi::Variance;
use crate::types::{KpiCardRow, KpiSummary, ProductionAggregate, ProductionRow, SalesAggregate, SalesRow};
use crate::util::{format_currency, format_number};
use serde::Serialize;
use std::cmp::Ordering;
use std::path::Path;
use tabled::{settings::Style, Table, Tabled};

pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> KpiResult<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> KpiResult<()> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    Ok(())
}

fn format_delta(v: Variance) -> String {
    match v.delta_pct() {
        Some(pct) => format!("{:+.1}% vs esperado", pct),
        None => "sin objetivo".to_string(),
    }
}

/// The KPI cards: produced, fabricated cost, sold, recovered cost, margin.
pub fn kpi_cards(summary: &KpiSummary) -> Vec<KpiCardRow> {
    let m = &summary.monthly;
    vec![
        KpiCardRow {
            label: "Muebles fabricados".to_string(),
            value: format_number(m.total_produced, 0),
            delta: String::new(),
        },
        KpiCardRow {
            label: "Costo MO fabricado".to_string(),
            value: format_currency(m.total_labor_cost_fabricated),
            delta: format_delta(summary.fabricated_variance()),
        },
        KpiCardRow {
            label: "Muebles vendidos".to_string(),
            value: format_number(m.total_sold, 0),
            delta: String::new(),
        },
        KpiCardRow {
            label: "Costo MO recuperado".to_string(),
            value: format_currency(m.total_labor_cost_recovered),
            delta: format_delta(summary.recovered_variance()),
        },
        KpiCardRow {
            label: "Margen bruto actual".to_string(),
            value: format_currency(m.total_margin),
            delta: String::new(),
        },
    ]
}

// Detail tables show magnitudes only; returns and credit notes come through negative.
pub fn production_rows(production: &[ProductionAggregate]) -> Vec<ProductionRow> {
    production
        .iter()
        .map(|p| ProductionRow {
            sku: p.sku.clone(),
            quantity: format_number(p.quantity.abs(), 0),
            unit_cost: format_currency(p.unit_cost.abs()),
            total_cost: format_currency(p.total_cost.abs()),
        })
        .collect()
}

/// Sales detail, largest margin first.
pub fn sales_rows(sales: &[SalesAggregate]) -> Vec<SalesRow> {
    let mut sorted: Vec<&SalesAggregate> = sales.iter().collect();
    sorted.sort_by(|a, b| {
        b.margin
            .abs()
            .partial_cmp(&a.margin.abs())
            .unwrap_or(Ordering::Equal)
    });
    sorted
        .into_iter()
        .map(|s| SalesRow {
            sku: s.sku.clone(),
            group: s.group.clone().unwrap_or_default(),
            quantity: format_number(s.quantity.abs(), 0),
            unit_cost: format_currency(s.unit_cost.abs()),
            recovered_cost: format_currency(s.recovered_cost.abs()),
            margin: format_currency(s.margin.abs()),
        })
        .collect()
}

pub fn render_table<T>(rows: &[T], max_rows: usize) -> String
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().take(max_rows).cloned().collect();
    if slice.is_empty() {
        return "(no rows)".to_string();
    }
    Table::new(slice).with(Style::markdown()).to_string()
}

pub fn preview_table_rows<T>(rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    println!("{}\n", render_table(rows, max_rows));
}

/// Write the detail tables and the full summary next to each other in `dir`.
pub fn export_all(dir: &Path, summary: &KpiSummary) -> KpiResult<()> {
    std::fs::create_dir_all(dir)?;
    write_csv(&dir.join("kpi_production.csv"), &summary.monthly.production)?;
    write_csv(&dir.join("kpi_sales.csv"), &summary.monthly.sales)?;
    write_json(&dir.join("kpi_summary.json"), summary)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kpi::compose;
    use crate::reports::aggregate_current_month;
    use crate::types::{SalesRecord, UnitLaborCost};
    use chrono::NaiveDate;
    use tempfile::tempdir;

    fn sale(sku: &str, qty: f64, margin: f64) -> SalesAggregate {
        SalesAggregate {
            sku: sku.to_string(),
            group: None,
            quantity: qty,
            unit_cost: 2.0,
            recovered_cost: qty * 2.0,
            margin,
        }
    }

    #[test]
    fn sales_rows_sorted_by_margin_and_shown_absolute() {
        let rows = sales_rows(&[sale("A", 1.0, 10.0), sale("B", -3.0, -500.0), sale("C", 2.0, 90.0)]);
        let skus: Vec<&str> = rows.iter().map(|r| r.sku.as_str()).collect();
        assert_eq!(skus, vec!["B", "C", "A"]);
        assert_eq!(rows[0].quantity, "3");
        assert_eq!(rows[0].recovered_cost, "$ 6");
        assert_eq!(rows[0].margin, "$ 500");
    }

    #[test]
    fn cards_show_no_target_when_objective_is_zero() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 14).unwrap();
        let summary = compose(aggregate_current_month(&[], &[], &[], today), 0.0, today);
        let cards = kpi_cards(&summary);
        assert_eq!(cards.len(), 5);
        assert_eq!(cards[1].delta, "sin objetivo");
        assert_eq!(cards[4].value, "$ 0");
    }

    #[test]
    fn empty_table_renders_placeholder() {
        let rows: Vec<ProductionRow> = Vec::new();
        assert_eq!(render_table(&rows, 5), "(no rows)");
    }

    #[test]
    fn export_writes_three_files() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 14).unwrap();
        let sales = vec![SalesRecord {
            date: Some(today),
            sku: Some("A".to_string()),
            quantity: Some(2.0),
            margin: Some(40.0),
            group: Some("45".to_string()),
        }];
        let costs = vec![UnitLaborCost { sku: "A".to_string(), unit_cost: 5.0 }];
        let summary = compose(aggregate_current_month(&[], &sales, &costs, today), 1000.0, today);

        let dir = tempdir().unwrap();
        export_all(dir.path(), &summary).unwrap();
        let json = std::fs::read_to_string(dir.path().join("kpi_summary.json")).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["total_labor_cost_recovered"], 10.0);
        assert_eq!(parsed["total_margin"], 40.0);
        let sales_csv = std::fs::read_to_string(dir.path().join("kpi_sales.csv")).unwrap();
        assert!(sales_csv.starts_with("sku,group,quantity,unit_cost,recovered_cost,margin"));
        assert!(dir.path().join("kpi_production.csv").exists());
    }
}
