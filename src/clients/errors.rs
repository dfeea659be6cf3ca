use thiserror::Error;

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while talking to Yandex Music or preparing a response
#[derive(Error, Debug)]
pub enum Error {
    #[error("Yandex Music request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Yandex Music deserialization error: {0}")]
    Deserialization(#[from] serde_json::Error),

    #[error("Failed to parse download info: {0}")]
    Xml(#[from] quick_xml::de::DeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Yandex Music rejected the token: {0}")]
    Unauthorized(String),

    #[error("Track is not available for download: {0}")]
    NotAvailable(String),

    #[error("Yandex Music API error (code {code}, {name}): {message}")]
    Api {
        code: u16,
        name: String,
        message: String,
    },

    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

impl Error {
    /// Builds an error from a vendor HTTP status and the error name/message it returned
    pub fn from_status_code(
        code: u16,
        name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        let name = name.into();
        let message = message.into();
        match code {
            401 | 403 => Error::Unauthorized(message),
            404 => Error::NotFound(message),
            _ => Error::Api {
                code,
                name,
                message,
            },
        }
    }
}
