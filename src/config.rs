// Command-line and environment configuration.
use crate::error::{KpiError, KpiResult};
use crate::loader::Source;
use chrono::NaiveDate;
use clap::Parser;
use std::path::PathBuf;

pub const DEFAULT_MONTHLY_BUDGET: f64 = 50_000_000.0;

#[derive(Parser, Debug, Clone)]
#[command(name = "factory_kpi")]
#[command(version, about = "Month-to-date labor cost and margin KPIs per SKU")]
pub struct Cli {
    /// Workbook with the MOVIMIENTO_STOCK, MATERIAL, REPORTE_DE_PEDIDOS and DETALLE_BOM sheets
    #[arg(long, env = "KPI_WORKBOOK", conflicts_with = "csv_dir")]
    pub workbook: Option<PathBuf>,

    /// Directory with movimiento_stock.csv, material.csv, reporte_de_pedidos.csv and detalle_bom.csv
    #[arg(long, env = "KPI_CSV_DIR")]
    pub csv_dir: Option<PathBuf>,

    /// Total labor cost budget for the month
    #[arg(long, env = "KPI_MONTHLY_BUDGET", default_value_t = DEFAULT_MONTHLY_BUDGET)]
    pub budget: f64,

    /// Reference date (YYYY-MM-DD); defaults to today at the plant
    #[arg(long)]
    pub date: Option<NaiveDate>,

    /// Where the CSV/JSON exports are written
    #[arg(long, env = "KPI_OUT_DIR", default_value = ".")]
    pub out_dir: PathBuf,

    /// Load, report and export once, without the menu
    #[arg(long)]
    pub batch: bool,
}

impl Cli {
    pub fn source(&self) -> KpiResult<Source> {
        match (&self.workbook, &self.csv_dir) {
            (Some(path), _) => Ok(Source::Workbook(path.clone())),
            (None, Some(dir)) => Ok(Source::CsvDir(dir.clone())),
            (None, None) => Err(KpiError::InvalidConfig(
                "no input given: pass --workbook or --csv-dir".to_string(),
            )),
        }
    }

    pub fn validate(&self) -> KpiResult<()> {
        if !self.budget.is_finite() || self.budget < 0.0 {
            return Err(KpiError::InvalidConfig(format!(
                "monthly budget must be a non-negative number, got {}",
                self.budget
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workbook_source_and_defaults() {
        let cli = Cli::try_parse_from(["factory_kpi", "--workbook", "dx.xlsx"]).unwrap();
        assert_eq!(cli.source().unwrap(), Source::Workbook(PathBuf::from("dx.xlsx")));
        assert_eq!(cli.budget, DEFAULT_MONTHLY_BUDGET);
        assert!(!cli.batch);
        assert!(cli.validate().is_ok());
    }

    #[test]
    fn reference_date_and_budget_parse() {
        let cli = Cli::try_parse_from([
            "factory_kpi",
            "--csv-dir",
            "extracts",
            "--date",
            "2024-06-14",
            "--budget",
            "1200000",
            "--batch",
        ])
        .unwrap();
        assert_eq!(cli.source().unwrap(), Source::CsvDir(PathBuf::from("extracts")));
        assert_eq!(cli.date, NaiveDate::from_ymd_opt(2024, 6, 14));
        assert_eq!(cli.budget, 1_200_000.0);
        assert!(cli.batch);
    }

    #[test]
    fn missing_source_and_negative_budget_are_config_errors() {
        let cli = Cli::try_parse_from(["factory_kpi", "--budget=-5"]).unwrap();
        assert!(matches!(cli.source(), Err(KpiError::InvalidConfig(_))));
        assert!(matches!(cli.validate(), Err(KpiError::InvalidConfig(_))));
    }
}
