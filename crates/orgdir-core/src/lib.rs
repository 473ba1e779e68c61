//! Orgdir Core Library
//!
//! Domain models, error types, configuration and the two ciphers shared by
//! the data-access and API crates.

pub mod config;
pub mod encryption;
pub mod error;
pub mod field_cipher;
pub mod models;

pub use config::{Config, LogFormat};
pub use encryption::TransportCipher;
pub use error::{AppError, ErrorCode, ErrorEnvelope, ErrorMetadata, LogLevel};
pub use field_cipher::FieldCipher;
