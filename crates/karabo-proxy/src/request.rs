//! Mapping of logical WebProxy operations onto HTTP requests
//!
//! Each operation is described once as a [`ProxyRequest`]; the async and
//! blocking clients only differ in how they send it.

use std::collections::HashMap;

use parking_lot::RwLock;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Method;
use serde_json::{json, Value};
use url::Url;

use crate::error::{ProxyError, Result};
use crate::types::{PropertyInfo, PropertyValue};

/// A fully described WebProxy call, relative to the client's base URL
#[derive(Debug, Clone, PartialEq)]
pub struct ProxyRequest {
    pub method: Method,
    /// Path relative to the base URL, e.g. `devices/DEV_1/config.json`
    pub path: String,
    /// JSON body, if the call carries one
    pub body: Option<Value>,
    /// Operation name used in failure messages, e.g. `set configuration`
    pub operation: String,
    /// Identifier the operation acts on, used in failure messages
    pub operand: String,
}

impl ProxyRequest {
    fn new(
        method: Method,
        path: String,
        operation: impl Into<String>,
        operand: impl Into<String>,
    ) -> Self {
        Self {
            method,
            path,
            body: None,
            operation: operation.into(),
            operand: operand.into(),
        }
    }

    fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// `GET topology.json`
    pub fn topology() -> Self {
        Self::new(
            Method::GET,
            "topology.json".into(),
            "getting topology",
            "topology",
        )
    }

    /// `GET devices.json`
    pub fn devices() -> Self {
        Self::new(Method::GET, "devices.json".into(), "getting devices", "devices")
    }

    /// `GET devices/{device_id}/config.json`
    pub fn device_configuration(device_id: &str) -> Self {
        Self::new(
            Method::GET,
            format!("devices/{device_id}/config.json"),
            "getting device configuration",
            device_id,
        )
    }

    /// `PUT devices/{device_id}/config.json` with the property map as body
    pub fn set_device_configuration(
        device_id: &str,
        properties: &HashMap<String, PropertyValue>,
    ) -> Result<Self> {
        Ok(Self::new(
            Method::PUT,
            format!("devices/{device_id}/config.json"),
            "set configuration",
            device_id,
        )
        .with_body(serde_json::to_value(properties)?))
    }

    /// `GET devices/{device_id}.{property}/config.json`
    pub fn device_config_path(device_id: &str, property: &str) -> Self {
        Self::new(
            Method::GET,
            format!("devices/{device_id}.{property}/config.json"),
            "getting property configuration",
            format!("{device_id}.{property}"),
        )
    }

    /// `PUT devices/{device_id}.{property}/config.json` with the raw value as body
    pub fn set_device_config_path(
        device_id: &str,
        property: &str,
        value: &PropertyValue,
    ) -> Result<Self> {
        Ok(Self::new(
            Method::PUT,
            format!("devices/{device_id}.{property}/config.json"),
            "set property",
            format!("{device_id}.{property}"),
        )
        .with_body(serde_json::to_value(value)?))
    }

    /// `GET devices/{device_id}/schema.json`
    pub fn device_schema(device_id: &str) -> Self {
        Self::new(
            Method::GET,
            format!("devices/{device_id}/schema.json"),
            "getting device schema",
            device_id,
        )
    }

    /// `PUT devices/{device_id}/slot/{slot}.json` with the slot parameters as body
    ///
    /// Parameterless slots send an empty object.
    pub fn execute_slot(
        device_id: &str,
        slot: &str,
        params: Option<&HashMap<String, PropertyValue>>,
    ) -> Result<Self> {
        let body = match params {
            Some(params) => serde_json::to_value(params)?,
            None => json!({}),
        };
        Ok(Self::new(
            Method::PUT,
            format!("devices/{device_id}/slot/{slot}.json"),
            format!("execute slot {slot}"),
            device_id,
        )
        .with_body(body))
    }

    /// `POST property/{name}/config.json` declaring the value type
    pub fn add_injected_property(name: &str, value_type: &str) -> Result<Self> {
        check_injected_name(name)?;
        Ok(Self::new(
            Method::POST,
            format!("property/{name}/config.json"),
            "add injected property",
            name,
        )
        .with_body(json!({ "valueType": value_type })))
    }

    /// `GET property/{name}/config.json`
    pub fn injected_property(name: &str) -> Result<Self> {
        check_injected_name(name)?;
        Ok(Self::new(
            Method::GET,
            format!("property/{name}/config.json"),
            "getting injected property",
            name,
        ))
    }

    /// `PUT property/{name}/config.json` with the serialized sample as body
    pub fn set_injected_property(name: &str, info: &PropertyInfo) -> Result<Self> {
        check_injected_name(name)?;
        Ok(Self::new(
            Method::PUT,
            format!("property/{name}/config.json"),
            "set injected property",
            name,
        )
        .with_body(serde_json::to_value(info)?))
    }

    /// `DELETE property/{name}/config.json`
    pub fn delete_injected_property(name: &str) -> Result<Self> {
        check_injected_name(name)?;
        Ok(Self::new(
            Method::DELETE,
            format!("property/{name}/config.json"),
            "delete injected property",
            name,
        ))
    }
}

fn check_injected_name(name: &str) -> Result<()> {
    if name.contains('.') {
        return Err(ProxyError::InvalidPropertyName(name.to_string()));
    }
    Ok(())
}

/// State shared by both clients: the base URL and the outgoing headers
#[derive(Debug)]
pub(crate) struct ProxyBase {
    base_url: Url,
    headers: RwLock<HeaderMap>,
}

impl ProxyBase {
    pub(crate) fn new(base_url: &str) -> Result<Self> {
        // Paths are joined relative to the base, so it must end with '/'
        let base_url = if base_url.ends_with('/') {
            Url::parse(base_url)?
        } else {
            Url::parse(&format!("{base_url}/"))?
        };

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        Ok(Self {
            base_url,
            headers: RwLock::new(headers),
        })
    }

    pub(crate) fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub(crate) fn url_for(&self, request: &ProxyRequest) -> Result<Url> {
        Ok(self.base_url.join(&request.path)?)
    }

    /// Snapshot of the headers for a request about to be sent
    pub(crate) fn headers(&self) -> HeaderMap {
        self.headers.read().clone()
    }

    pub(crate) fn set_access_token(&self, token: &str) -> Result<()> {
        let mut value = HeaderValue::from_str(&format!("Bearer {token}"))?;
        value.set_sensitive(true);
        self.headers.write().insert(AUTHORIZATION, value);
        Ok(())
    }
}
