use std::error::Error;
use std::fmt;
use std::sync::PoisonError;

#[derive(Debug)]
pub enum RustyRelayError {
    // Session errors
    SessionLock(String),
    SessionNotFound(String),

    // Connection errors
    ConnectionError(String),
    ConnectionClosed,

    // Storage errors
    StorageError(String),
    Duplicate,

    // Protocol errors
    MessageParseError(String),
    ValidationError(String),

    // Auth errors
    InvalidCredentials,

    // Configuration errors
    ConfigError(String),
}

impl fmt::Display for RustyRelayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SessionLock(msg) => write!(f, "Session lock error: {}", msg),
            Self::SessionNotFound(user) => write!(f, "Session not found: {}", user),
            Self::ConnectionError(msg) => write!(f, "Connection error: {}", msg),
            Self::ConnectionClosed => write!(f, "Connection closed unexpectedly"),
            Self::StorageError(msg) => write!(f, "Storage error: {}", msg),
            Self::Duplicate => write!(f, "Username or phone already exists"),
            Self::MessageParseError(msg) => write!(f, "Message parse error: {}", msg),
            Self::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            Self::InvalidCredentials => write!(f, "Invalid credentials"),
            Self::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl Error for RustyRelayError {}

// Converting from PoisonError to facilitate poisoned mutex handling
impl<T> From<PoisonError<T>> for RustyRelayError {
    fn from(err: PoisonError<T>) -> Self {
        RustyRelayError::SessionLock(format!("Mutex poisoned: {}", err))
    }
}

// Generic result type for RustyRelay
pub type Result<T> = std::result::Result<T, RustyRelayError>;
