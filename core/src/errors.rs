use thiserror::Error;

/// Errors raised at the external boundaries (Gemini, Overpass, config files)
#[derive(Error, Debug)]
pub enum DoctorError {
    #[error("Please enter your Gemini API Key")]
    MissingApiKey,

    #[error("Configuration Error: {0}")]
    ConfigError(String),

    #[error("Request Error: {0}")]
    RequestError(String),

    #[error("Response Error: {0}")]
    ResponseError(String),

    #[error("Parsing Error: {0}")]
    ParsingError(String),

    #[error("HTTP Error: {status_code} - {message}")]
    HttpError { status_code: u16, message: String },
}

/// Result type for doctor-core operations
pub type DoctorResult<T> = Result<T, DoctorError>;
