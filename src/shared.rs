//! Async access to a parameter session from multiple tasks.
//!
//! The protocol has no request identifiers, so a session must never carry
//! two exchanges at once. [`SharedDeviceParameters`] serialises callers
//! behind a mutex and runs the blocking socket I/O on the blocking thread
//! pool.

use std::sync::{Arc, Mutex};

use crate::device::DeviceParameters;
use crate::error::{ParamError, ParamResult};
use crate::parameter::{ParameterCatalog, ParameterScalar, ParameterValue};

/// Cloneable, async handle to one device session.
#[derive(Debug, Clone)]
pub struct SharedDeviceParameters {
    inner: Arc<Mutex<DeviceParameters>>,
}

impl SharedDeviceParameters {
    /// Take ownership of a connected session.
    pub fn new(device: DeviceParameters) -> Self {
        Self {
            inner: Arc::new(Mutex::new(device)),
        }
    }

    /// Run `f` with exclusive access to the session on the blocking pool.
    pub async fn with<F, R>(&self, f: F) -> ParamResult<R>
    where
        F: FnOnce(&mut DeviceParameters) -> ParamResult<R> + Send + 'static,
        R: Send + 'static,
    {
        let inner = self.inner.clone();
        tokio::task::spawn_blocking(move || {
            let mut guard = inner
                .lock()
                .map_err(|_| ParamError::Transfer("device session mutex poisoned".to_string()))?;
            f(&mut *guard)
        })
        .await
        .map_err(|e| ParamError::Transfer(format!("device session task failed: {e}")))?
    }

    /// Snapshot of the catalog, enumerating on first use.
    pub async fn parameters(&self) -> ParamResult<ParameterCatalog> {
        self.with(|device| device.parameters().cloned()).await
    }

    /// Read `name` in its declared type.
    pub async fn value(&self, name: &str) -> ParamResult<ParameterValue> {
        let name = name.to_string();
        self.with(move |device| device.value(&name)).await
    }

    /// Write `value` to `name`.
    pub async fn set_value(&self, name: &str, value: ParameterValue) -> ParamResult<()> {
        let name = name.to_string();
        self.with(move |device| device.set_value(&name, value)).await
    }

    /// Read `name` as `T`.
    pub async fn read<T>(&self, name: &str) -> ParamResult<T>
    where
        T: ParameterScalar + Send + 'static,
    {
        let name = name.to_string();
        self.with(move |device| device.transfer().read_named::<T>(&name))
            .await
    }

    /// Write a scalar to `name`.
    pub async fn write<T>(&self, name: &str, value: T) -> ParamResult<()>
    where
        T: ParameterScalar + Send + 'static,
    {
        let name = name.to_string();
        self.with(move |device| device.transfer().write_named(&name, value))
            .await
    }
}
