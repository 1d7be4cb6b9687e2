//! Error types for CivicLens

/// Result type alias using CivicLens's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for CivicLens operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Predictor load or inference errors
    #[error("classifier error: {0}")]
    Classifier(String),

    /// Image could not be decoded or does not match a predictor's input contract
    #[error("invalid image: {0}")]
    InvalidImage(String),

    /// Coordinates that are not a valid latitude/longitude pair
    #[error("invalid coordinates: {0}")]
    InvalidCoordinates(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Unknown registry slot
    #[error("unknown classifier slot: {0}")]
    UnknownSlot(String),

    /// Filesystem errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Timeout errors
    #[error("operation timed out")]
    Timeout,

    /// Generic internal errors
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new classifier error
    pub fn classifier(msg: impl Into<String>) -> Self {
        Self::Classifier(msg.into())
    }

    /// Create a new invalid image error
    pub fn image(msg: impl Into<String>) -> Self {
        Self::InvalidImage(msg.into())
    }

    /// Create a new invalid coordinates error
    pub fn coordinates(msg: impl Into<String>) -> Self {
        Self::InvalidCoordinates(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Short machine-readable kind, used as a metrics label
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Classifier(_) => "classifier",
            Self::InvalidImage(_) => "invalid_image",
            Self::InvalidCoordinates(_) => "invalid_coordinates",
            Self::Config(_) => "config",
            Self::UnknownSlot(_) => "unknown_slot",
            Self::Io(_) => "io",
            Self::Serialization(_) => "serialization",
            Self::Timeout => "timeout",
            Self::Internal(_) => "internal",
        }
    }
}
