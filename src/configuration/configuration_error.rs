use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

/// Fatal start-up error raised while loading key material.
#[derive(Debug)]
pub enum ConfigurationError {
    Io { path: PathBuf, source: std::io::Error },
    Settings(String),
    SymmetricKeyLength(usize),
    PrivateKey(String),
    Certificate(String),
    RootCertificate(String),
    AlreadyInitialized,
}

impl Display for ConfigurationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigurationError::Io { path, source } => write!(f, "Cannot read {:?}: {}", path, source),
            ConfigurationError::Settings(cause) => write!(f, "Invalid key material settings: {}", cause),
            ConfigurationError::SymmetricKeyLength(length) => write!(
                f,
                "Symmetric key must be 16, 24 or 32 bytes long, got {} bytes",
                length
            ),
            ConfigurationError::PrivateKey(cause) => write!(f, "Invalid private key: {}", cause),
            ConfigurationError::Certificate(cause) => write!(f, "Invalid certificate: {}", cause),
            ConfigurationError::RootCertificate(cause) => write!(f, "Invalid root certificate: {}", cause),
            ConfigurationError::AlreadyInitialized => write!(f, "Key material is already initialized"),
        }
    }
}

impl Error for ConfigurationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ConfigurationError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}
