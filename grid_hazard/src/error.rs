//! Error type shared by every stage of the hazard-cost pipeline

use nested_mc::NestedError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GridHazardError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A distribution or model parameter outside its valid range
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// A required row or column is absent from an input table
    #[error("missing input: {0}")]
    MissingInput(String),

    /// An outer iteration of the Monte Carlo loop failed
    #[error(transparent)]
    Simulation(Box<NestedError<GridHazardError>>),
}

pub type Result<T> = std::result::Result<T, GridHazardError>;

impl From<NestedError<GridHazardError>> for GridHazardError {
    fn from(error: NestedError<GridHazardError>) -> Self {
        GridHazardError::Simulation(Box::new(error))
    }
}

impl GridHazardError {
    pub fn invalid(what: impl std::fmt::Display) -> Self {
        GridHazardError::InvalidParameter(what.to_string())
    }
}
