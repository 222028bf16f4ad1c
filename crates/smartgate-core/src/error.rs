use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // Protocol errors
    #[error("Invalid message format: {0}")]
    InvalidMessageFormat(String),

    #[error("Unknown request code: {0}")]
    UnknownRequestCode(String),

    #[error("Frame too large: {size} bytes (max {max_size})")]
    FrameTooLarge { size: usize, max_size: usize },

    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    // Device errors
    #[error("Device unavailable")]
    DeviceUnavailable,

    #[error("Device discovery found {found} candidates, expected exactly one")]
    DiscoveryAmbiguous { found: usize },

    #[error("Device connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Module {module} attach failed: {reason}")]
    ModuleAttach { module: String, reason: String },

    #[error("Hardware operation failed: {0}")]
    Hardware(String),

    #[error("Invalid tag UID: {0}")]
    InvalidTagUid(String),

    // Serial bridge errors
    #[error("Serial bridge already active")]
    BridgeAlreadyActive,

    #[error("Serial bridge not active")]
    BridgeNotActive,

    #[error("Serial bridge process failed: {0}")]
    BridgeProcess(String),

    // Store errors
    #[error("Store error: {0}")]
    Store(String),

    #[error("Record not found: {0}")]
    RecordNotFound(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
