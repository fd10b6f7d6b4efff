//! Blocking WebProxy HTTP client implementation
//!
//! Same operations and outcomes as [`crate::AsyncKaraboProxy`]; each call
//! blocks the calling thread until the response arrives. Must not be used
//! from within an async runtime.

use std::collections::HashMap;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use crate::classify;
use crate::client::{DEFAULT_CONNECT_TIMEOUT, DEFAULT_TIMEOUT};
use crate::config::ProxyConfig;
use crate::error::Result;
use crate::request::{ProxyBase, ProxyRequest};
use crate::types::*;

/// Blocking Karabo WebProxy client
#[derive(Debug)]
pub struct SyncKaraboProxy {
    client: Client,
    base: ProxyBase,
}

impl SyncKaraboProxy {
    /// Create a new client
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_config(base_url, DEFAULT_TIMEOUT, DEFAULT_CONNECT_TIMEOUT)
    }

    /// Create a new client with custom timeouts
    pub fn with_config(base_url: &str, timeout: Duration, connect_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .build()?;

        Ok(Self {
            client,
            base: ProxyBase::new(base_url)?,
        })
    }

    /// Create a client from a loaded configuration, applying its access token
    pub fn from_config(config: &ProxyConfig) -> Result<Self> {
        let proxy = Self::with_config(&config.base_url, config.timeout, config.connect_timeout)?;
        if let Some(token) = &config.access_token {
            proxy.set_access_token(token)?;
        }
        Ok(proxy)
    }

    /// Get the base URL (always terminated by `/`)
    pub fn base_url(&self) -> &Url {
        self.base.base_url()
    }

    /// Send `Authorization: Bearer <token>` with every subsequent request
    pub fn set_access_token(&self, token: &str) -> Result<()> {
        self.base.set_access_token(token)
    }

    // =========================================================================
    // Topology
    // =========================================================================

    /// Retrieve the topology of the topic the WebProxy is connected to
    #[instrument(skip(self))]
    pub fn get_topology(&self) -> Result<TopologyInfo> {
        self.read(&ProxyRequest::topology())
    }

    /// Retrieve the devices of the topic the WebProxy is connected to
    #[instrument(skip(self))]
    pub fn get_devices(&self) -> Result<DevicesInfo> {
        self.read(&ProxyRequest::devices())
    }

    // =========================================================================
    // Device Configuration
    // =========================================================================

    /// Retrieve the full configuration of a device
    #[instrument(skip(self))]
    pub fn get_device_configuration(&self, device_id: &str) -> Result<DeviceConfigInfo> {
        self.read(&ProxyRequest::device_configuration(device_id))
    }

    /// Set a group of properties of a (reconfigurable) device
    #[instrument(skip(self, properties))]
    pub fn set_device_configuration(
        &self,
        device_id: &str,
        properties: &HashMap<String, PropertyValue>,
    ) -> Result<WriteResponse> {
        self.write(&ProxyRequest::set_device_configuration(device_id, properties)?)
    }

    /// Retrieve a single property of a device
    #[instrument(skip(self))]
    pub fn get_device_config_path(&self, device_id: &str, property: &str) -> Result<PropertyInfo> {
        self.read(&ProxyRequest::device_config_path(device_id, property))
    }

    /// Set a single property of a (reconfigurable) device
    #[instrument(skip(self, value))]
    pub fn set_device_config_path(
        &self,
        device_id: &str,
        property: &str,
        value: impl Into<PropertyValue>,
    ) -> Result<WriteResponse> {
        self.write(&ProxyRequest::set_device_config_path(
            device_id,
            property,
            &value.into(),
        )?)
    }

    /// Retrieve the schema of a device
    #[instrument(skip(self))]
    pub fn get_device_schema(&self, device_id: &str) -> Result<DeviceSchema> {
        self.read(&ProxyRequest::device_schema(device_id))
    }

    // =========================================================================
    // Slots
    // =========================================================================

    /// Execute a device slot; return values land in [`WriteResponse::reply`]
    #[instrument(skip(self, params))]
    pub fn execute_slot(
        &self,
        device_id: &str,
        slot: &str,
        params: Option<&HashMap<String, PropertyValue>>,
    ) -> Result<WriteResponse> {
        self.write(&ProxyRequest::execute_slot(device_id, slot, params)?)
    }

    // =========================================================================
    // Injected Properties
    // =========================================================================

    /// Add a property of the given Karabo value type to the WebProxy
    #[instrument(skip(self))]
    pub fn add_injected_property(&self, name: &str, value_type: &str) -> Result<WriteResponse> {
        self.write(&ProxyRequest::add_injected_property(name, value_type)?)
    }

    /// Retrieve an injected property
    #[instrument(skip(self))]
    pub fn get_injected_property(&self, name: &str) -> Result<PropertyInfo> {
        self.read(&ProxyRequest::injected_property(name)?)
    }

    /// Set value, timestamp and train id of an injected property
    #[instrument(skip(self))]
    pub fn set_injected_property(&self, name: &str, info: &PropertyInfo) -> Result<WriteResponse> {
        self.write(&ProxyRequest::set_injected_property(name, info)?)
    }

    /// Remove an injected property
    #[instrument(skip(self))]
    pub fn delete_injected_property(&self, name: &str) -> Result<WriteResponse> {
        self.write(&ProxyRequest::delete_injected_property(name)?)
    }

    // =========================================================================
    // Helper Methods
    // =========================================================================

    fn read<T: DeserializeOwned>(&self, request: &ProxyRequest) -> Result<T> {
        let (status, body) = self.send(request)?;
        classify::read_outcome(request, status, &body)
    }

    fn write(&self, request: &ProxyRequest) -> Result<WriteResponse> {
        let (status, body) = self.send(request)?;
        Ok(classify::write_outcome(request, status, &body))
    }

    fn send(&self, request: &ProxyRequest) -> Result<(StatusCode, String)> {
        let url = self.base.url_for(request)?;
        debug!("{} {}", request.method, url);

        let mut builder = self
            .client
            .request(request.method.clone(), url)
            .headers(self.base.headers());
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send()?;
        let status = response.status();
        let body = response.text()?;
        debug!(status = status.as_u16(), "{} response", request.operation);
        Ok((status, body))
    }
}
