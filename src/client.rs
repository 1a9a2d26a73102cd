//! Parameter protocol client.
//!
//! [`ParameterTransfer`] owns one TCP session to a device's parameter
//! service. Connecting performs the version handshake; afterwards the client
//! issues strictly alternating request/reply exchanges:
//!
//! - typed reads and writes addressed by [`ParameterId`],
//! - bulk enumeration, which replaces the cached [`ParameterCatalog`],
//! - name-based typed access layered on the catalog.
//!
//! No retries or reconnects happen here. After a connection-fatal error (see
//! [`ParamError::is_connection_fatal`]) build a new client.
//!
//! # Example
//!
//! ```rust,ignore
//! use param_transfer::ParameterTransfer;
//!
//! let mut client = ParameterTransfer::connect("192.168.10.10", "7683")?;
//! let gain: f64 = client.read_named("manual_gain")?;
//! client.write_named("manual_gain", gain + 1.0)?;
//! ```

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::{ParamError, ParamResult};
use crate::parameter::{
    ParameterCatalog, ParameterDescriptor, ParameterId, ParameterScalar, ParameterType,
    ParameterValue,
};
use crate::transport::{self, Endpoint, TcpConnection};
use crate::wire::{self, RequestFrame};

/// Default I/O timeout for every exchange after connecting.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(500);

/// Default timeout for establishing the TCP connection.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Connection options for [`ParameterTransfer`].
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Send/receive timeout applied right after connecting.
    pub timeout: Duration,
    /// Timeout for the TCP connect itself.
    pub connect_timeout: Duration,
    /// Largest enumeration payload the client will accept.
    pub receive_buffer_capacity: usize,
    /// Protocol version the device must announce.
    pub expected_version: u32,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            receive_buffer_capacity: wire::DEFAULT_RECEIVE_BUFFER_CAPACITY,
            expected_version: wire::PROTOCOL_VERSION,
        }
    }
}

/// A connected parameter protocol session.
///
/// Not safe for concurrent use; every method takes `&mut self`. Wrap it in a
/// mutex (see [`crate::shared::SharedDeviceParameters`]) or use one client
/// per thread.
#[derive(Debug)]
pub struct ParameterTransfer {
    conn: TcpConnection,
    options: ClientOptions,
    device_version: u32,
    catalog: Option<ParameterCatalog>,
    receive_buffer: Vec<u8>,
}

impl ParameterTransfer {
    /// Connect with default options.
    pub fn connect(address: &str, service: &str) -> ParamResult<Self> {
        Self::connect_with(address, service, ClientOptions::default())
    }

    /// Connect with explicit options.
    ///
    /// Resolves the address, opens the socket, applies the I/O timeout and
    /// runs the version handshake. On any failure the socket is released
    /// before returning.
    pub fn connect_with(address: &str, service: &str, options: ClientOptions) -> ParamResult<Self> {
        let endpoint = transport::resolve(address, service)?;
        Self::connect_endpoint(endpoint, options)
    }

    /// Connect to an already resolved endpoint.
    pub fn connect_endpoint(endpoint: Endpoint, options: ClientOptions) -> ParamResult<Self> {
        let mut conn = TcpConnection::connect(endpoint, options.connect_timeout)?;
        conn.set_timeout(options.timeout)?;

        let device_version = Self::handshake(&mut conn, options.expected_version)?;
        info!(%endpoint, version = device_version, "Connected to parameter service");

        let receive_buffer = vec![0u8; options.receive_buffer_capacity];
        Ok(Self {
            conn,
            options,
            device_version,
            catalog: None,
            receive_buffer,
        })
    }

    fn handshake(conn: &mut TcpConnection, expected: u32) -> ParamResult<u32> {
        let mut word = [0u8; wire::HANDSHAKE_LEN];
        conn.receive_exact(&mut word)?;
        let received = wire::decode_u32(&word);
        if received != expected {
            warn!(expected, received, "Protocol version mismatch");
            return Err(ParamError::ProtocolVersionMismatch { expected, received });
        }
        Ok(received)
    }

    /// Protocol version announced by the device.
    pub fn device_version(&self) -> u32 {
        self.device_version
    }

    /// Remote endpoint of the session.
    pub fn endpoint(&self) -> Endpoint {
        self.conn.endpoint()
    }

    /// Options the session was opened with.
    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Whether the underlying socket is still open.
    pub fn is_connected(&self) -> bool {
        self.conn.is_connected()
    }

    /// Close the session now instead of on drop.
    pub fn close(mut self) {
        self.conn.close();
    }

    fn exchange(&mut self, frame: RequestFrame) -> ParamResult<[u8; wire::REPLY_LEN]> {
        debug!(
            message_type = ?frame.message_type,
            parameter_id = frame.parameter_id,
            "Sending request"
        );
        self.conn.send(&frame.encode())?;
        let mut reply = [0u8; wire::REPLY_LEN];
        self.conn.receive_exact(&mut reply)?;
        Ok(reply)
    }

    // =========================================================================
    // Id-level access
    // =========================================================================

    /// Read parameter `id` using the wire type `ty`.
    pub fn read_parameter(
        &mut self,
        id: ParameterId,
        ty: ParameterType,
    ) -> ParamResult<ParameterValue> {
        let reply = self.exchange(RequestFrame::read(id, ty))?;
        let value = wire::decode_read_reply(&reply, ty);
        debug!(parameter = %id, %value, "Read parameter");
        Ok(value)
    }

    /// Write `value` to parameter `id` using the value's own wire type.
    ///
    /// An all-zero status from the device is reported as
    /// [`ParamError::ParameterWriteRejected`]; any other status is success.
    pub fn write_parameter(&mut self, id: ParameterId, value: ParameterValue) -> ParamResult<()> {
        let reply = self.exchange(RequestFrame::write(id, value))?;
        if !wire::write_succeeded(&reply) {
            warn!(parameter = %id, %value, "Device rejected parameter write");
            return Err(ParamError::ParameterWriteRejected { id: id.raw() });
        }
        debug!(parameter = %id, %value, "Wrote parameter");
        Ok(())
    }

    // =========================================================================
    // Enumeration
    // =========================================================================

    /// Fetch the full parameter list and replace the cached catalog.
    pub fn refresh_catalog(&mut self) -> ParamResult<&ParameterCatalog> {
        self.conn.send(&RequestFrame::enumerate().encode())?;

        let mut count_word = [0u8; wire::ENTRY_COUNT_LEN];
        self.conn.receive_exact(&mut count_word)?;
        let count = wire::decode_u32(&count_word) as usize;

        let capacity = self.receive_buffer.len();
        let declared = count
            .checked_mul(wire::ENTRY_RECORD_LEN)
            .filter(|&len| len <= capacity)
            .ok_or(ParamError::EnumerationTooLarge {
                declared: count.saturating_mul(wire::ENTRY_RECORD_LEN),
                capacity,
            })?;

        let payload = &mut self.receive_buffer[..declared];
        self.conn.receive_exact(payload)?;

        let descriptors = wire::decode_entries(payload, count).map_err(ParamError::Transfer)?;
        let skipped = count - descriptors.len();
        let catalog = ParameterCatalog::from_descriptors(descriptors);
        info!(
            reported = count,
            decoded = catalog.len(),
            skipped,
            "Enumerated device parameters"
        );

        Ok(&*self.catalog.insert(catalog))
    }

    /// The cached catalog, enumerating first if none has been fetched yet.
    pub fn catalog(&mut self) -> ParamResult<&ParameterCatalog> {
        if self.catalog.is_none() {
            return self.refresh_catalog();
        }
        self.catalog
            .as_ref()
            .ok_or_else(|| ParamError::Transfer("parameter catalog unavailable".to_string()))
    }

    /// Descriptor for `name`.
    ///
    /// Enumerates first if needed. Fails with
    /// [`ParamError::UnknownParameterName`] if the name is not a known
    /// parameter at all, and with [`ParamError::ParameterNotSupported`] if the
    /// device did not report it.
    pub fn descriptor(&mut self, name: &str) -> ParamResult<ParameterDescriptor> {
        let catalog = self.catalog()?;
        let id = ParameterId::from_name(name)
            .ok_or_else(|| ParamError::UnknownParameterName(name.to_string()))?;
        catalog
            .get(id.name())
            .cloned()
            .ok_or_else(|| ParamError::ParameterNotSupported(name.to_string()))
    }

    /// Whether the device reports `name` as writable.
    pub fn is_writable(&mut self, name: &str) -> ParamResult<bool> {
        Ok(self.descriptor(name)?.is_writable())
    }

    // =========================================================================
    // Name-based access
    // =========================================================================

    /// Read `name` in its declared wire type.
    pub fn read_value(&mut self, name: &str) -> ParamResult<ParameterValue> {
        let descriptor = self.descriptor(name)?;
        self.read_parameter(descriptor.id(), descriptor.ty())
    }

    /// Read `name` and convert it to `T`.
    pub fn read_named<T: ParameterScalar>(&mut self, name: &str) -> ParamResult<T> {
        self.read_value(name).map(T::from_value)
    }

    /// Write `value` to `name`, converting it to the declared wire type.
    pub fn write_value(&mut self, name: &str, value: ParameterValue) -> ParamResult<()> {
        let descriptor = self.descriptor(name)?;
        self.write_parameter(descriptor.id(), value.coerce(descriptor.ty()))
    }

    /// Write a scalar to `name`, converting it to the declared wire type.
    pub fn write_named<T: ParameterScalar>(&mut self, name: &str, value: T) -> ParamResult<()> {
        self.write_value(name, value.into_value())
    }
}
