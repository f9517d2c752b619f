// Schema mapping at the ingestion boundary.
//
// Each input table has a fixed list of (source column -> canonical field)
// bindings. Binding validates the header row once and fails with a named
// `MissingColumn` error; after that, cells are read leniently and anything
// unreadable becomes `None`.
use crate::error::{KpiError, KpiResult};
use crate::types::{BomLine, Dataset, MovementRecord, OperationCost, SalesRecord};
use crate::util::{parse_date_safe, parse_f64_safe, parse_key};
use std::collections::HashMap;
use tracing::debug;

/// A parsed but untyped table: a header row and string cells.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct RawTable {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(name: impl Into<String>, headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { name: name.into(), headers, rows }
    }
}

/// The four raw extracts, as handed over by the loader.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTables {
    pub movements: RawTable,
    pub operations: RawTable,
    pub sales: RawTable,
    pub bom: RawTable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableKind {
    Movements,
    Operations,
    Sales,
    Bom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Date,
    Sku,
    Quantity,
    Operation,
    OperationCost,
    Margin,
    Group,
}

pub struct ColumnSpec {
    pub source: &'static str,
    pub field: Field,
    pub required: bool,
}

const fn required(source: &'static str, field: Field) -> ColumnSpec {
    ColumnSpec { source, field, required: true }
}

const MOVEMENT_COLUMNS: &[ColumnSpec] = &[
    required("AUDI_FECHA_ALTA", Field::Date),
    required("MATE_CODIGO", Field::Sku),
    required("MOST_CANTIDAD", Field::Quantity),
];

const OPERATION_COLUMNS: &[ColumnSpec] = &[
    required("MATE_CODIGO", Field::Operation),
    required("MATE_CRM", Field::OperationCost),
];

const SALES_COLUMNS: &[ColumnSpec] = &[
    required("AUDI_FECHA_ALTA", Field::Date),
    required("SKU", Field::Sku),
    required("CANTIDAD", Field::Quantity),
    required("MARGEN_3", Field::Margin),
    ColumnSpec { source: "MATE_CRM", field: Field::Group, required: false },
];

const BOM_COLUMNS: &[ColumnSpec] = &[
    required("MBOM_CODIGO", Field::Sku),
    required("MATE_CODIGO", Field::Operation),
    required("DEBO_CANTIDAD", Field::Quantity),
];

impl TableKind {
    pub fn columns(self) -> &'static [ColumnSpec] {
        match self {
            TableKind::Movements => MOVEMENT_COLUMNS,
            TableKind::Operations => OPERATION_COLUMNS,
            TableKind::Sales => SALES_COLUMNS,
            TableKind::Bom => BOM_COLUMNS,
        }
    }

    /// Workbook sheet name prefix; exports append numeric suffixes.
    pub fn sheet_prefix(self) -> &'static str {
        match self {
            TableKind::Movements => "MOVIMIENTO_STOCK",
            TableKind::Operations => "MATERIAL",
            TableKind::Sales => "REPORTE_DE_PEDIDOS",
            TableKind::Bom => "DETALLE_BOM",
        }
    }

    pub fn csv_file_name(self) -> &'static str {
        match self {
            TableKind::Movements => "movimiento_stock.csv",
            TableKind::Operations => "material.csv",
            TableKind::Sales => "reporte_de_pedidos.csv",
            TableKind::Bom => "detalle_bom.csv",
        }
    }
}

/// Column positions of a validated table.
#[derive(Debug)]
pub struct BoundTable<'a> {
    table: &'a RawTable,
    index: HashMap<Field, usize>,
}

impl<'a> BoundTable<'a> {
    pub fn has(&self, field: Field) -> bool {
        self.index.contains_key(&field)
    }

    fn cell(&self, row: &'a [String], field: Field) -> Option<&'a str> {
        let idx = *self.index.get(&field)?;
        row.get(idx).map(String::as_str)
    }

    pub fn rows(&self) -> impl Iterator<Item = &'a Vec<String>> {
        self.table.rows.iter()
    }
}

/// Validate `table` against the bindings for `kind`.
pub fn bind(table: &RawTable, kind: TableKind) -> KpiResult<BoundTable<'_>> {
    let mut index = HashMap::new();
    for spec in kind.columns() {
        match table.headers.iter().position(|h| h.trim() == spec.source) {
            Some(pos) => {
                index.insert(spec.field, pos);
            }
            None if spec.required => {
                return Err(KpiError::MissingColumn {
                    table: table.name.clone(),
                    column: spec.source.to_string(),
                });
            }
            None => debug!(table = %table.name, column = spec.source, "optional column absent"),
        }
    }
    Ok(BoundTable { table, index })
}

pub fn movements(table: &RawTable) -> KpiResult<Vec<MovementRecord>> {
    let bound = bind(table, TableKind::Movements)?;
    Ok(bound
        .rows()
        .map(|row| MovementRecord {
            date: parse_date_safe(bound.cell(row, Field::Date)),
            sku: parse_key(bound.cell(row, Field::Sku)),
            quantity: parse_f64_safe(bound.cell(row, Field::Quantity)),
        })
        .collect())
}

pub fn operations(table: &RawTable) -> KpiResult<Vec<OperationCost>> {
    let bound = bind(table, TableKind::Operations)?;
    Ok(bound
        .rows()
        .filter_map(|row| {
            Some(OperationCost {
                operation: parse_key(bound.cell(row, Field::Operation))?,
                cost: parse_f64_safe(bound.cell(row, Field::OperationCost)),
            })
        })
        .collect())
}

pub fn sales(table: &RawTable) -> KpiResult<Vec<SalesRecord>> {
    let bound = bind(table, TableKind::Sales)?;
    let grouped = bound.has(Field::Group);
    Ok(bound
        .rows()
        .map(|row| SalesRecord {
            date: parse_date_safe(bound.cell(row, Field::Date)),
            sku: parse_key(bound.cell(row, Field::Sku)),
            quantity: parse_f64_safe(bound.cell(row, Field::Quantity)),
            margin: parse_f64_safe(bound.cell(row, Field::Margin)),
            group: grouped.then(|| {
                bound
                    .cell(row, Field::Group)
                    .map(|s| s.trim().to_string())
                    .unwrap_or_default()
            }),
        })
        .collect())
}

pub fn bom(table: &RawTable) -> KpiResult<Vec<BomLine>> {
    let bound = bind(table, TableKind::Bom)?;
    Ok(bound
        .rows()
        .map(|row| BomLine {
            sku: parse_key(bound.cell(row, Field::Sku)),
            operation: parse_key(bound.cell(row, Field::Operation)),
            quantity: parse_f64_safe(bound.cell(row, Field::Quantity)),
        })
        .collect())
}

/// Map all four raw tables to typed records, failing on the first schema mismatch.
pub fn map_dataset(raw: &RawTables) -> KpiResult<Dataset> {
    Ok(Dataset {
        movements: movements(&raw.movements)?,
        operations: operations(&raw.operations)?,
        sales: sales(&raw.sales)?,
        bom: bom(&raw.bom)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn table(name: &str, headers: &[&str], rows: &[&[&str]]) -> RawTable {
        RawTable::new(
            name,
            headers.iter().map(|h| h.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
    }

    #[test]
    fn missing_required_column_is_named() {
        let t = table("DETALLE_BOM", &["MBOM_CODIGO", "MATE_CODIGO"], &[]);
        match bom(&t) {
            Err(KpiError::MissingColumn { table, column }) => {
                assert_eq!(table, "DETALLE_BOM");
                assert_eq!(column, "DEBO_CANTIDAD");
            }
            other => panic!("expected MissingColumn, got {:?}", other),
        }
    }

    #[test]
    fn columns_are_found_by_name_not_position() {
        let t = table(
            "MOVIMIENTO_STOCK",
            &["MOST_CANTIDAD", "EXTRA", " MATE_CODIGO ", "AUDI_FECHA_ALTA"],
            &[&["10", "x", "A", "2024-06-01 08:00:00"]],
        );
        let recs = movements(&t).unwrap();
        assert_eq!(
            recs,
            vec![MovementRecord {
                date: NaiveDate::from_ymd_opt(2024, 6, 1),
                sku: Some("A".to_string()),
                quantity: Some(10.0),
            }]
        );
    }

    #[test]
    fn bad_cells_become_absent_not_errors() {
        let t = table(
            "MOVIMIENTO_STOCK",
            &["AUDI_FECHA_ALTA", "MATE_CODIGO", "MOST_CANTIDAD"],
            &[&["yesterday", "", "lots"], &["2024-06-02"]],
        );
        let recs = movements(&t).unwrap();
        assert_eq!(recs.len(), 2);
        assert!(recs.iter().all(|r| r.sku.is_none() && r.quantity.is_none()));
        assert_eq!(recs[0].date, None);
        assert_eq!(recs[1].date, NaiveDate::from_ymd_opt(2024, 6, 2));
    }

    #[test]
    fn sales_group_column_is_optional() {
        let without = table(
            "REPORTE_DE_PEDIDOS",
            &["AUDI_FECHA_ALTA", "SKU", "CANTIDAD", "MARGEN_3"],
            &[&["2024-06-03", "B", "2", "100"]],
        );
        assert_eq!(sales(&without).unwrap()[0].group, None);

        let with = table(
            "REPORTE_DE_PEDIDOS",
            &["AUDI_FECHA_ALTA", "SKU", "CANTIDAD", "MARGEN_3", "MATE_CRM"],
            &[&["2024-06-03", "B", "2", "100", " 45 "], &["2024-06-03", "B", "1", "5", ""]],
        );
        let recs = sales(&with).unwrap();
        assert_eq!(recs[0].group.as_deref(), Some("45"));
        assert_eq!(recs[1].group.as_deref(), Some(""));
    }

    #[test]
    fn operations_without_code_are_skipped() {
        let t = table(
            "MATERIAL",
            &["MATE_CODIGO", "MATE_CRM"],
            &[&["OP1", "12.5"], &["", "3"], &["OP2", ""]],
        );
        let ops = operations(&t).unwrap();
        assert_eq!(
            ops,
            vec![
                OperationCost { operation: "OP1".to_string(), cost: Some(12.5) },
                OperationCost { operation: "OP2".to_string(), cost: None },
            ]
        );
    }
}
