use crate::error::{KpiError, KpiResult};
use crate::schema::{map_dataset, RawTable, RawTables, TableKind};
use crate::types::Dataset;
use calamine::{open_workbook_auto, Data, DataType, Range, Reader};
use csv::ReaderBuilder;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Where the four extracts come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// One `.xlsx`/`.xls` workbook holding the four sheets.
    Workbook(PathBuf),
    /// A directory holding one CSV per table.
    CsvDir(PathBuf),
}

#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub movement_rows: usize,
    pub operation_rows: usize,
    pub sales_rows: usize,
    pub bom_rows: usize,
    pub undated_movements: usize,
    pub undated_sales: usize,
}

impl LoadReport {
    fn from_dataset(data: &Dataset) -> Self {
        Self {
            movement_rows: data.movements.len(),
            operation_rows: data.operations.len(),
            sales_rows: data.sales.len(),
            bom_rows: data.bom.len(),
            undated_movements: data.movements.iter().filter(|m| m.date.is_none()).count(),
            undated_sales: data.sales.iter().filter(|s| s.date.is_none()).count(),
        }
    }
}

/// Read the raw tables, map them through the schema and report what was found.
pub fn load(source: &Source) -> KpiResult<(RawTables, Dataset, LoadReport)> {
    let raw = match source {
        Source::Workbook(path) => read_workbook(path)?,
        Source::CsvDir(dir) => read_csv_dir(dir)?,
    };
    let data = map_dataset(&raw)?;
    let report = LoadReport::from_dataset(&data);
    if report.undated_movements + report.undated_sales > 0 {
        warn!(
            movements = report.undated_movements,
            sales = report.undated_sales,
            "rows with unreadable dates will be left out of the month window"
        );
    }
    info!(
        movements = report.movement_rows,
        operations = report.operation_rows,
        sales = report.sales_rows,
        bom = report.bom_rows,
        "tables loaded"
    );
    Ok((raw, data, report))
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::DateTime(_) | Data::DateTimeIso(_) => cell
            .as_datetime()
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default(),
        other => other.to_string().trim().to_string(),
    }
}

fn range_to_table(name: &str, range: &Range<Data>) -> RawTable {
    let mut rows = range.rows();
    let headers: Vec<String> = rows
        .next()
        .map(|header| header.iter().map(cell_to_string).collect())
        .unwrap_or_default();
    let rows = rows
        .map(|row| row.iter().map(cell_to_string).collect::<Vec<_>>())
        .filter(|row| row.iter().any(|c| !c.is_empty()))
        .collect();
    RawTable::new(name, headers, rows)
}

/// Exact sheet name first, then the first sheet starting with the prefix.
fn resolve_sheet(sheet_names: &[String], prefix: &str) -> Option<String> {
    sheet_names
        .iter()
        .find(|s| s.as_str() == prefix)
        .or_else(|| {
            sheet_names
                .iter()
                .find(|s| s.starts_with(&format!("{}-", prefix)))
        })
        .or_else(|| sheet_names.iter().find(|s| s.starts_with(prefix)))
        .cloned()
}

pub fn read_workbook(path: &Path) -> KpiResult<RawTables> {
    if !path.exists() {
        return Err(KpiError::FileNotFound(path.display().to_string()));
    }
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();
    if !matches!(ext.as_str(), "xlsx" | "xlsm" | "xls") {
        return Err(KpiError::UnsupportedFormat(ext));
    }

    let mut workbook = open_workbook_auto(path)?;
    let sheet_names = workbook.sheet_names();
    let mut read = |kind: TableKind| -> KpiResult<RawTable> {
        let prefix = kind.sheet_prefix();
        let name = resolve_sheet(&sheet_names, prefix)
            .ok_or_else(|| KpiError::SheetNotFound(prefix.to_string()))?;
        let range = workbook.worksheet_range(&name)?;
        Ok(range_to_table(prefix, &range))
    };
    Ok(RawTables {
        movements: read(TableKind::Movements)?,
        operations: read(TableKind::Operations)?,
        sales: read(TableKind::Sales)?,
        bom: read(TableKind::Bom)?,
    })
}

fn read_csv_table(dir: &Path, kind: TableKind) -> KpiResult<RawTable> {
    let path = dir.join(kind.csv_file_name());
    if !path.exists() {
        return Err(KpiError::FileNotFound(path.display().to_string()));
    }
    let mut rdr = ReaderBuilder::new().flexible(true).from_path(&path)?;
    let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.trim().to_string()).collect();
    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result?;
        let row: Vec<String> = record.iter().map(|c| c.trim().to_string()).collect();
        if row.iter().all(|c| c.is_empty()) {
            continue;
        }
        rows.push(row);
    }
    Ok(RawTable::new(kind.sheet_prefix(), headers, rows))
}

pub fn read_csv_dir(dir: &Path) -> KpiResult<RawTables> {
    if !dir.is_dir() {
        return Err(KpiError::FileNotFound(dir.display().to_string()));
    }
    Ok(RawTables {
        movements: read_csv_table(dir, TableKind::Movements)?,
        operations: read_csv_table(dir, TableKind::Operations)?,
        sales: read_csv_table(dir, TableKind::Sales)?,
        bom: read_csv_table(dir, TableKind::Bom)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn sheet_lookup_prefers_exact_then_suffixed() {
        let sheets = names(&["MATERIAL_EXTRA", "MATERIAL-4199-1426", "DETALLE_BOM"]);
        assert_eq!(resolve_sheet(&sheets, "MATERIAL").as_deref(), Some("MATERIAL-4199-1426"));
        assert_eq!(resolve_sheet(&sheets, "DETALLE_BOM").as_deref(), Some("DETALLE_BOM"));
        assert_eq!(resolve_sheet(&sheets, "REPORTE_DE_PEDIDOS"), None);
    }

    #[test]
    fn excel_cells_render_as_plain_strings() {
        assert_eq!(cell_to_string(&Data::Empty), "");
        assert_eq!(cell_to_string(&Data::Float(10.0)), "10");
        assert_eq!(cell_to_string(&Data::String(" A1 ".to_string())), "A1");
    }

    #[test]
    fn excel_date_cells_read_as_calendar_dates() {
        use crate::util::parse_date_safe;
        use calamine::{ExcelDateTime, ExcelDateTimeType};
        use chrono::NaiveDate;

        let june_3 = NaiveDate::from_ymd_opt(2024, 6, 3);

        let serial = Data::DateTime(ExcelDateTime::new(45446.75, ExcelDateTimeType::DateTime, false));
        let text = cell_to_string(&serial);
        assert_eq!(text, "2024-06-03 18:00:00");
        assert_eq!(parse_date_safe(Some(text.as_str())), june_3);

        let iso = Data::DateTimeIso("2024-06-03T10:00:00".to_string());
        let text = cell_to_string(&iso);
        assert_eq!(text, "2024-06-03 10:00:00");
        assert_eq!(parse_date_safe(Some(text.as_str())), june_3);
    }

    #[test]
    fn csv_dir_reports_missing_file() {
        let dir = tempdir().unwrap();
        match read_csv_dir(dir.path()) {
            Err(KpiError::FileNotFound(p)) => assert!(p.ends_with("movimiento_stock.csv")),
            other => panic!("expected FileNotFound, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn csv_tables_skip_blank_rows() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("material.csv"),
            "MATE_CODIGO,MATE_CRM\nOP1, 12\n,\nOP2,3\n",
        )
        .unwrap();
        let t = read_csv_table(dir.path(), TableKind::Operations).unwrap();
        assert_eq!(t.headers, names(&["MATE_CODIGO", "MATE_CRM"]));
        assert_eq!(t.rows, vec![names(&["OP1", "12"]), names(&["OP2", "3"])]);
    }

    #[test]
    fn unsupported_workbook_extension_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.ods");
        fs::write(&path, b"").unwrap();
        assert!(matches!(read_workbook(&path), Err(KpiError::UnsupportedFormat(_))));
    }
}
