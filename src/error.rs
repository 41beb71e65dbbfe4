use thiserror::Error;

#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("Failed to load tabular data: {0}")]
    LoadError(String),

    #[error("Unparseable Date value '{value}' in data row {row}")]
    DateParseError { row: usize, value: String },

    #[error("Required column '{0}' is missing or not numeric")]
    MissingColumn(String),

    #[error("Invalid analysis configuration: {0}")]
    InvalidConfig(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, DashboardError>;
