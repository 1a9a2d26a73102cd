//! Custom error types for the parameter transfer client.
//!
//! This module defines `ParamError`, the single error type returned by every
//! fallible operation in the crate. Using the `thiserror` crate, it keeps the
//! failure taxonomy of the protocol in one place so callers can decide how
//! to recover.
//!
//! ## Error Hierarchy
//!
//! - **`Resolution`** / **`Connection`**: Transport-level failures while
//!   establishing the TCP session. Nothing is retained from the attempt.
//! - **`ProtocolVersionMismatch`**: The device speaks a different protocol
//!   version. Raised once during the handshake; no request is sent afterwards.
//! - **`Transfer`**: A send or receive failed, was short, or the peer closed
//!   the connection. A read timeout also ends up here. The connection should
//!   be treated as unusable.
//! - **`ParameterWriteRejected`**: The device refused a write (out of range,
//!   read-only, busy). The connection is still fine.
//! - **`UnknownParameterName`** / **`ParameterNotSupported`**: Caller error or
//!   firmware skew. The connection is still fine.
//! - **`InvalidValue`**: A reply arrived intact but holds a value outside
//!   the parameter's domain, such as an unknown mode. The connection is
//!   still fine.
//! - **`EnumerationTooLarge`**: The device announced more enumeration data
//!   than the receive buffer can hold.
//! - **`Config`** / **`Configuration`**: Loading or validating settings.

use thiserror::Error;

/// Convenience alias for results using the crate error type.
pub type ParamResult<T> = std::result::Result<T, ParamError>;

/// Every failure the client can report.
#[derive(Error, Debug)]
pub enum ParamError {
    /// The address or service could not be turned into an IPv4 endpoint.
    #[error("Failed to resolve '{address}:{service}': {reason}")]
    Resolution {
        /// Host name or address as given.
        address: String,
        /// Service (port) as given.
        service: String,
        /// Why resolution failed.
        reason: String,
    },

    /// The TCP connection could not be established.
    #[error("Failed to connect to {endpoint}: {source}")]
    Connection {
        /// Endpoint the connect was attempted against.
        endpoint: String,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// The device announced an incompatible protocol version.
    #[error("Protocol version mismatch: expected {expected}, device reported {received}")]
    ProtocolVersionMismatch {
        /// Version this client speaks.
        expected: u32,
        /// Version the device sent.
        received: u32,
    },

    /// A send or receive failed, was short, or timed out.
    #[error("Transfer error: {0}")]
    Transfer(String),

    /// The device answered a write with an all-zero status.
    #[error("Device rejected write to parameter {id}")]
    ParameterWriteRejected {
        /// Raw protocol id of the parameter.
        id: u32,
    },

    /// The name is not in the static parameter table.
    #[error("Unknown parameter name: {0}")]
    UnknownParameterName(String),

    /// The name is known but the device did not report it.
    #[error("Parameter '{0}' is not supported by the connected device")]
    ParameterNotSupported(String),

    /// A well-formed reply carried a value outside the parameter's domain.
    #[error("Device reported invalid value {value} for '{parameter}'")]
    InvalidValue {
        /// Parameter name.
        parameter: &'static str,
        /// Value as received.
        value: i32,
    },

    /// The announced enumeration payload exceeds the receive buffer.
    #[error("Enumeration of {declared} bytes exceeds receive buffer capacity of {capacity} bytes")]
    EnumerationTooLarge {
        /// Bytes the device announced.
        declared: usize,
        /// Bytes the client is willing to receive.
        capacity: usize,
    },

    /// Settings could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    /// Settings were loaded but are not valid.
    #[error("Configuration validation error: {0}")]
    Configuration(String),
}

impl ParamError {
    /// Build a `Transfer` error from an I/O failure with some context.
    pub(crate) fn transfer(context: &str, err: std::io::Error) -> Self {
        ParamError::Transfer(format!("{context}: {err}"))
    }

    /// Whether the error leaves the connection unusable.
    ///
    /// Connection-fatal errors require constructing a new client (new TCP
    /// session plus handshake). The others are reported by the device or
    /// caused by the caller and leave the session intact. An oversized
    /// enumeration counts as fatal because its payload is left unread.
    pub fn is_connection_fatal(&self) -> bool {
        match self {
            ParamError::Resolution { .. }
            | ParamError::Connection { .. }
            | ParamError::ProtocolVersionMismatch { .. }
            | ParamError::EnumerationTooLarge { .. }
            | ParamError::Transfer(_) => true,
            ParamError::ParameterWriteRejected { .. }
            | ParamError::UnknownParameterName(_)
            | ParamError::ParameterNotSupported(_)
            | ParamError::InvalidValue { .. }
            | ParamError::Config(_)
            | ParamError::Configuration(_) => false,
        }
    }
}

impl From<figment::Error> for ParamError {
    fn from(value: figment::Error) -> Self {
        ParamError::Config(Box::new(value))
    }
}
