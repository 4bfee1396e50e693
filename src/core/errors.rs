use thiserror::Error;

#[derive(Error, Debug)]
pub enum FlashdeckError {
    #[error("I/O error: {0}")]
    Io(Box<std::io::Error>),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Reqwest error: {0}")]
    Reqwest(Box<reqwest::Error>),

    /// Non-2xx response. `message` is the backend's own failure text when it sent one.
    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("Invalid base URL: {0}")]
    InvalidUrl(String),

    #[error("FlashdeckError: {0}")]
    Custom(String),
}

impl From<std::io::Error> for FlashdeckError {
    fn from(error: std::io::Error) -> Self {
        FlashdeckError::Io(Box::new(error))
    }
}

impl From<reqwest::Error> for FlashdeckError {
    fn from(error: reqwest::Error) -> Self {
        FlashdeckError::Reqwest(Box::new(error))
    }
}

impl From<reqwest::header::InvalidHeaderValue> for FlashdeckError {
    fn from(error: reqwest::header::InvalidHeaderValue) -> Self {
        FlashdeckError::Custom(format!("Invalid header value: {error}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_displays_backend_message_verbatim() {
        let err = FlashdeckError::Api {
            status: 400,
            message: "AI couldn't understand your request.".to_string(),
        };
        assert_eq!(err.to_string(), "AI couldn't understand your request.");
    }

    #[test]
    fn io_errors_are_boxed() {
        let err: FlashdeckError =
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing").into();
        assert!(matches!(err, FlashdeckError::Io(_)));
    }
}
