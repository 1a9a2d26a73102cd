//! # Device Parameter Transfer
//!
//! Client for the binary parameter protocol spoken by networked stereo
//! cameras: a small request/reply protocol over a persistent TCP session,
//! used to read and write device settings and to enumerate the settings a
//! device supports.
//!
//! ## Crate Structure
//!
//! - **`transport`**: IPv4 resolution, blocking connect with timeout, and a
//!   graceful close for the owned socket. No protocol knowledge.
//! - **`wire`**: Byte layouts: 13-byte request frames, 8-byte replies and
//!   enumeration records.
//! - **`parameter`**: Identifiers, types, tagged values with coercion,
//!   descriptors and the catalog.
//! - **`client`**: `ParameterTransfer`, the protocol state machine: version
//!   handshake, typed reads and writes, enumeration and name-based access.
//! - **`device`**: `DeviceParameters`, named accessors such as
//!   `manual_exposure_time()`.
//! - **`shared`**: Async, serialised handle for multi-task callers.
//! - **`config`** / **`logging`** / **`validation`**: Settings loading,
//!   tracing setup and their validators.
//! - **`error`**: The `ParamError` taxonomy.

pub mod client;
pub mod config;
pub mod device;
pub mod error;
pub mod logging;
pub mod parameter;
pub mod shared;
pub mod transport;
pub mod validation;
pub mod wire;

pub use client::{ClientOptions, ParameterTransfer};
pub use device::{AutoExposureMode, DeviceParameters, ExposureRoi, OperationMode};
pub use error::{ParamError, ParamResult};
pub use parameter::{
    ParameterCatalog, ParameterDescriptor, ParameterId, ParameterScalar, ParameterType,
    ParameterValue,
};
pub use shared::SharedDeviceParameters;
