//! Async WebProxy HTTP client implementation

use std::collections::HashMap;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use crate::classify;
use crate::config::ProxyConfig;
use crate::error::Result;
use crate::request::{ProxyBase, ProxyRequest};
use crate::types::*;

/// Default request timeout
pub(crate) const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Default connection timeout
pub(crate) const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Async Karabo WebProxy client
///
/// Every call sends exactly one request and awaits its response. The client
/// can be shared between tasks (e.g. behind an `Arc`); each request takes a
/// snapshot of the headers when it is built, so a concurrent
/// [`set_access_token`](Self::set_access_token) only affects later calls.
#[derive(Debug)]
pub struct AsyncKaraboProxy {
    client: Client,
    base: ProxyBase,
}

impl AsyncKaraboProxy {
    /// Create a new client
    ///
    /// # Arguments
    /// * `base_url` - Base URL of the WebProxy (e.g., "http://localhost:8282")
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
    pub async fn get_topology(&self) -> Result<TopologyInfo> {
        self.read(&ProxyRequest::topology()).await
    }

    /// Retrieve the devices of the topic the WebProxy is connected to
    #[instrument(skip(self))]
    pub async fn get_devices(&self) -> Result<DevicesInfo> {
        self.read(&ProxyRequest::devices()).await
    }

    // =========================================================================
    // Device Configuration
    // =========================================================================

    /// Retrieve the full configuration of a device
    #[instrument(skip(self))]
    pub async fn get_device_configuration(&self, device_id: &str) -> Result<DeviceConfigInfo> {
        self.read(&ProxyRequest::device_configuration(device_id))
            .await
    }

    /// Set a group of properties of a (reconfigurable) device
    #[instrument(skip(self, properties))]
    pub async fn set_device_configuration(
        &self,
        device_id: &str,
        properties: &HashMap<String, PropertyValue>,
    ) -> Result<WriteResponse> {
        self.write(&ProxyRequest::set_device_configuration(device_id, properties)?)
            .await
    }

    /// Retrieve a single property of a device
    #[instrument(skip(self))]
    pub async fn get_device_config_path(
        &self,
        device_id: &str,
        property: &str,
    ) -> Result<PropertyInfo> {
        self.read(&ProxyRequest::device_config_path(device_id, property))
            .await
    }

    /// Set a single property of a (reconfigurable) device
    #[instrument(skip(self, value))]
    pub async fn set_device_config_path(
        &self,
        device_id: &str,
        property: &str,
        value: impl Into<PropertyValue>,
    ) -> Result<WriteResponse> {
        let request = ProxyRequest::set_device_config_path(device_id, property, &value.into())?;
        self.write(&request).await
    }

    /// Retrieve the schema of a device
    #[instrument(skip(self))]
    pub async fn get_device_schema(&self, device_id: &str) -> Result<DeviceSchema> {
        self.read(&ProxyRequest::device_schema(device_id)).await
    }

    // =========================================================================
    // Slots
    // =========================================================================

    /// Execute a device slot
    ///
    /// Supports both parameterless slots (commands) and slots with
    /// parameters. Return values of the slot, if any, are available in
    /// [`WriteResponse::reply`].
    #[instrument(skip(self, params))]
    pub async fn execute_slot(
        &self,
        device_id: &str,
        slot: &str,
        params: Option<&HashMap<String, PropertyValue>>,
    ) -> Result<WriteResponse> {
        self.write(&ProxyRequest::execute_slot(device_id, slot, params)?)
            .await
    }

    // =========================================================================
    // Injected Properties
    // =========================================================================

    /// Add a property of the given Karabo value type (e.g. "INT64") to the
    /// WebProxy's own property set
    #[instrument(skip(self))]
    pub async fn add_injected_property(&self, name: &str, value_type: &str) -> Result<WriteResponse> {
        self.write(&ProxyRequest::add_injected_property(name, value_type)?)
            .await
    }

    /// Retrieve an injected property
    #[instrument(skip(self))]
    pub async fn get_injected_property(&self, name: &str) -> Result<PropertyInfo> {
        self.read(&ProxyRequest::injected_property(name)?).await
    }

    /// Set value, timestamp and train id of an injected property
    #[instrument(skip(self))]
    pub async fn set_injected_property(
        &self,
        name: &str,
        info: &PropertyInfo,
    ) -> Result<WriteResponse> {
        self.write(&ProxyRequest::set_injected_property(name, info)?)
            .await
    }

    /// Remove an injected property
    #[instrument(skip(self))]
    pub async fn delete_injected_property(&self, name: &str) -> Result<WriteResponse> {
        self.write(&ProxyRequest::delete_injected_property(name)?)
            .await
    }

    // =========================================================================
    // Helper Methods
    // =========================================================================

    async fn read<T: DeserializeOwned>(&self, request: &ProxyRequest) -> Result<T> {
        let (status, body) = self.send(request).await?;
        classify::read_outcome(request, status, &body)
    }

    async fn write(&self, request: &ProxyRequest) -> Result<WriteResponse> {
        let (status, body) = self.send(request).await?;
        Ok(classify::write_outcome(request, status, &body))
    }

    /// Send the request and collect status and body text
    async fn send(&self, request: &ProxyRequest) -> Result<(StatusCode, String)> {
        let url = self.base.url_for(request)?;
        debug!("{} {}", request.method, url);

        let mut builder = self
            .client
            .request(request.method.clone(), url)
            .headers(self.base.headers());
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;
        debug!(status = status.as_u16(), "{} response", request.operation);
        Ok((status, body))
    }
}
