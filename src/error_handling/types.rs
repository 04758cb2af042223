use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug)]
pub enum ConfigError {
    IoError(std::io::Error),
    TomlError(String),
    EmptyIdentityPool,
    BadIPFormatting(String),
    BadInterface(String),
    BadPortsRange(String),
    DecoysEmpty,
    MissingScript(String),
    NotInRange(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {}", e),
            ConfigError::TomlError(e) => write!(f, "TOML parsing error: {}", e),
            ConfigError::EmptyIdentityPool => write!(f, "Identity pool is empty"),
            ConfigError::BadIPFormatting(e) => write!(f, "IP formatting error: {}", e),
            ConfigError::BadInterface(e) => write!(f, "Interface error: {}", e),
            ConfigError::BadPortsRange(e) => write!(f, "Port range error: {}", e),
            ConfigError::DecoysEmpty => write!(f, "No decoy service configured"),
            ConfigError::MissingScript(e) => write!(f, "Executor script error: {}", e),
            ConfigError::NotInRange(e) => write!(f, "Value out of range: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::IoError(err)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::TomlError(err.to_string())
    }
}

#[derive(Debug)]
pub enum ExecutorError {
    ScriptNotFound(PathBuf),
    SpawnFailed(std::io::Error),
    TimedOut(Duration),
}

impl fmt::Display for ExecutorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutorError::ScriptNotFound(p) => write!(f, "Script not found: {}", p.display()),
            ExecutorError::SpawnFailed(e) => write!(f, "Failed to run executor: {}", e),
            ExecutorError::TimedOut(d) => {
                write!(f, "Executor timed out after {:.1}s", d.as_secs_f64())
            }
        }
    }
}

impl std::error::Error for ExecutorError {}

#[derive(Debug)]
pub enum DecoyError {
    BindError(u16, std::io::Error),
    NoPortAvailable { start: u16, end: u16 },
    AddressError(std::io::Error),
}

impl fmt::Display for DecoyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecoyError::BindError(port, e) => write!(f, "Bind error on port {}: {}", port, e),
            DecoyError::NoPortAvailable { start, end } => {
                write!(f, "No available port in range [{}-{}]", start, end)
            }
            DecoyError::AddressError(e) => write!(f, "Unable to read local address: {}", e),
        }
    }
}

impl std::error::Error for DecoyError {}

#[derive(Debug)]
pub enum StorageError {
    ReadFailed(std::io::Error),
    WriteFailed(std::io::Error),
    SerializeFailed(String),
    LockPoisoned,
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::ReadFailed(e) => write!(f, "Storage read failed: {}", e),
            StorageError::WriteFailed(e) => write!(f, "Storage write failed: {}", e),
            StorageError::SerializeFailed(e) => write!(f, "Storage serialization failed: {}", e),
            StorageError::LockPoisoned => write!(f, "Storage lock poisoned"),
        }
    }
}

impl std::error::Error for StorageError {}

#[derive(Debug)]
pub enum CollaboratorError {
    MissingSetting(String),
    Http(String),
    Api(String),
    Process(String),
    TimedOut(Duration),
    IoError(std::io::Error),
}

impl fmt::Display for CollaboratorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollaboratorError::MissingSetting(e) => write!(f, "Missing setting: {}", e),
            CollaboratorError::Http(e) => write!(f, "HTTP error: {}", e),
            CollaboratorError::Api(e) => write!(f, "API error: {}", e),
            CollaboratorError::Process(e) => write!(f, "Process error: {}", e),
            CollaboratorError::TimedOut(d) => {
                write!(f, "Timed out after {:.1}s", d.as_secs_f64())
            }
            CollaboratorError::IoError(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for CollaboratorError {}

impl From<std::io::Error> for CollaboratorError {
    fn from(err: std::io::Error) -> Self {
        CollaboratorError::IoError(err)
    }
}

impl From<reqwest::Error> for CollaboratorError {
    fn from(err: reqwest::Error) -> Self {
        CollaboratorError::Http(err.to_string())
    }
}

#[derive(Debug)]
pub enum ControllerError {
    StorageError(StorageError),
    NoListenerBound,
    InitializationFailed(String),
}

impl fmt::Display for ControllerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerError::StorageError(e) => write!(f, "Storage error: {}", e),
            ControllerError::NoListenerBound => write!(f, "No decoy listener could be bound"),
            ControllerError::InitializationFailed(e) => write!(f, "Initialization failed: {}", e),
        }
    }
}

impl std::error::Error for ControllerError {}

impl From<StorageError> for ControllerError {
    fn from(err: StorageError) -> Self {
        ControllerError::StorageError(err)
    }
}
