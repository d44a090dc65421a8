//! Inbound request descriptor.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// What the distributor knows about a request.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LoadRequest {
    /// Origin address, used by `ip_hash`.
    #[serde(default)]
    pub client_ip: Option<String>,
    /// Request identity (path, tenant, session, ...), used by
    /// `consistent_hash`.
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl LoadRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client_ip(mut self, ip: impl Into<String>) -> Self {
        self.client_ip = Some(ip.into());
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Client IP, or `"unknown"` when the request carries none.
    pub fn client_ip_or_unknown(&self) -> &str {
        self.client_ip.as_deref().unwrap_or("unknown")
    }

    /// Sorted `key=value` pairs joined with `&`, including the client IP.
    ///
    /// Two requests with the same fields produce the same key regardless
    /// of insertion order.
    pub fn canonical_key(&self) -> String {
        let mut pairs: BTreeMap<&str, &str> = self
            .attributes
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        if let Some(ip) = &self.client_ip {
            pairs.insert("client_ip", ip);
        }
        pairs
            .into_iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_key_is_order_independent() {
        let a = LoadRequest::new()
            .with_attribute("tenant", "acme")
            .with_attribute("path", "/orders");
        let b = LoadRequest::new()
            .with_attribute("path", "/orders")
            .with_attribute("tenant", "acme");
        assert_eq!(a.canonical_key(), b.canonical_key());
        assert_eq!(a.canonical_key(), "path=/orders&tenant=acme");
    }

    #[test]
    fn canonical_key_includes_client_ip() {
        let request = LoadRequest::new()
            .with_client_ip("10.0.0.7")
            .with_attribute("path", "/");
        assert_eq!(request.canonical_key(), "client_ip=10.0.0.7&path=/");
    }

    #[test]
    fn missing_ip_is_unknown() {
        assert_eq!(LoadRequest::new().client_ip_or_unknown(), "unknown");
    }

    #[test]
    fn deserializes_partial_json() {
        let request: LoadRequest = serde_json::from_str(r#"{"client_ip":"1.2.3.4"}"#).unwrap();
        assert_eq!(request.client_ip.as_deref(), Some("1.2.3.4"));
        assert!(request.attributes.is_empty());
    }
}
