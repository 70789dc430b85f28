use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Plot error: {0}")]
    Plot(String),

    #[error("{dataset}: missing column '{column}'")]
    MissingColumn { dataset: String, column: String },

    #[error("no boundary found for country '{0}'")]
    CountryNotFound(String),

    #[error("no ISO 3166-1 code for country '{0}'")]
    UnknownCountryCode(String),

    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("invalid source location: {0}")]
    InvalidLocation(String),
}

pub type Result<T> = std::result::Result<T, Error>;
