use crate::types::ErrorResponse;

/// Client-specific result type
pub type Result<T> = std::result::Result<T, NeuronError>;

/// Status code reported for arguments rejected before any request is sent
pub const INVALID_ARGUMENT_STATUS: u16 = 400;

/// Errors from the neuron client
#[derive(Debug, thiserror::Error)]
pub enum NeuronError {
    /// A required argument was missing or malformed; no request was sent
    #[error("{message}")]
    InvalidArgument {
        /// Human-readable reason
        message: String,
    },

    /// The platform answered with a non-success status
    #[error("{} {}", .0.status_code, .0.error)]
    Remote(ErrorResponse),

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A success body could not be decoded
    #[error("failed to parse response: {0}")]
    Parse(String),

    /// Invalid client configuration
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl NeuronError {
    pub(crate) fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Status code carried by the error, if it has one
    ///
    /// Transport, parse and configuration failures never reached a status
    pub const fn status_code(&self) -> Option<u16> {
        match self {
            Self::InvalidArgument { .. } => Some(INVALID_ARGUMENT_STATUS),
            Self::Remote(response) => Some(response.status_code),
            Self::Http(_) | Self::Parse(_) | Self::Config(_) => None,
        }
    }

    /// The `{ error, statusCode }` view of a validation or remote failure
    pub fn to_error_response(&self) -> Option<ErrorResponse> {
        match self {
            Self::InvalidArgument { message } => Some(ErrorResponse::new(message.clone(), INVALID_ARGUMENT_STATUS)),
            Self::Remote(response) => Some(response.clone()),
            Self::Http(_) | Self::Parse(_) | Self::Config(_) => None,
        }
    }
}
