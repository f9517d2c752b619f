// Error types for ingestion, caching and export.
//
// The engine itself never fails: per-row problems (bad dates, missing numbers,
// unmatched join keys) are absorbed as exclusions or zeros. Everything that
// can go wrong before the engine runs, or after it, lands here.
use thiserror::Error;

#[derive(Error, Debug)]
pub enum KpiError {
    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("unsupported input format: {0} (expected .xlsx, .xls or a CSV directory)")]
    UnsupportedFormat(String),

    #[error("sheet not found in workbook: {0}")]
    SheetNotFound(String),

    #[error("table {table} is missing required column {column}")]
    MissingColumn { table: String, column: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Excel error: {0}")]
    Excel(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<calamine::Error> for KpiError {
    fn from(err: calamine::Error) -> Self {
        KpiError::Excel(err.to_string())
    }
}

pub type KpiResult<T> = Result<T, KpiError>;
