//! Host model
//!
//! A [`Host`] is one reachable node of the store: an address plus its
//! protocol backends. Hosts are built once from configuration and stay
//! immutable for the owning client's lifetime. All three construction paths
//! (bare address string, partial record, ready-made value) funnel through
//! [`Host::new`], so the client's host list is always homogeneous.

use crate::backend::{Backend, HttpBackend, PbBackend};
use crate::config::{Config, HostRecord, Protocol, DEFAULT_ADDRESS};
use crate::Result;

#[derive(Debug)]
pub struct Host {
    address: String,
    http_port: u16,
    pb_port: u16,
    protocol: Protocol,
    http: HttpBackend,
    pb: PbBackend,
}

impl Host {
    pub fn new(address: impl Into<String>, http_port: u16, pb_port: u16, protocol: Protocol) -> Self {
        let address = address.into();
        let http = HttpBackend::new(&address, http_port);
        let pb = PbBackend::new(&address, pb_port);
        Self {
            address,
            http_port,
            pb_port,
            protocol,
            http,
            pb,
        }
    }

    /// Build a host from a bare `address` or `address:port` string, taking
    /// unset settings from the shared config. An explicit port overrides the
    /// port of the preferred protocol.
    pub fn from_address(addr: &str, shared: &Config) -> Result<Self> {
        let addr = addr.trim();
        if addr.is_empty() {
            return Err(crate::Error::InvalidConfig("empty host address".into()));
        }

        let (address, port) = match addr.rsplit_once(':') {
            Some((host, port)) => {
                let port: u16 = port.parse().map_err(|_| {
                    crate::Error::InvalidConfig(format!("invalid port in host entry: {}", addr))
                })?;
                (host.to_string(), Some(port))
            }
            None => (addr.to_string(), None),
        };

        let (http_port, pb_port) = match (shared.protocol, port) {
            (Protocol::Http, Some(p)) => (p, shared.pb_port),
            (Protocol::Pbc, Some(p)) => (shared.http_port, p),
            (_, None) => (shared.http_port, shared.pb_port),
        };

        Ok(Self::new(address, http_port, pb_port, shared.protocol))
    }

    /// Build a host from a partial record; per-host settings override the
    /// shared ones.
    pub fn from_record(record: &HostRecord, shared: &Config) -> Self {
        Self::new(
            record.address.clone(),
            record.http_port.unwrap_or(shared.http_port),
            record.pb_port.unwrap_or(shared.pb_port),
            record.protocol.unwrap_or(shared.protocol),
        )
    }

    /// The fallback host used when nothing is configured.
    pub fn default_local(shared: &Config) -> Self {
        Self::new(
            DEFAULT_ADDRESS,
            shared.http_port,
            shared.pb_port,
            shared.protocol,
        )
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn http_port(&self) -> u16 {
        self.http_port
    }

    pub fn pb_port(&self) -> u16 {
        self.pb_port
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// Protocol-independent backend handle, dispatching on the preferred
    /// protocol.
    pub fn backend(&self) -> Backend<'_> {
        match self.protocol {
            Protocol::Http => Backend::Http(&self.http),
            Protocol::Pbc => Backend::Pb(&self.pb),
        }
    }

    /// The HTTP backend, regardless of the preferred protocol.
    pub fn http(&self) -> &HttpBackend {
        &self.http
    }

    /// The binary-protocol backend, regardless of the preferred protocol.
    pub fn protobuffs(&self) -> &PbBackend {
        &self.pb
    }

    /// Bucket names known to this node.
    pub async fn buckets(&self) -> Result<Vec<String>> {
        self.backend().list_buckets().await
    }

    // === Blob store passthrough (HTTP surface) ===

    pub async fn store_file(&self, key: &str, data: &[u8]) -> Result<()> {
        self.http.store_file(key, data).await
    }

    pub async fn get_file(&self, key: &str) -> Result<Vec<u8>> {
        self.http.get_file(key).await
    }

    pub async fn delete_file(&self, key: &str) -> Result<()> {
        self.http.delete_file(key).await
    }

    pub async fn file_exists(&self, key: &str) -> Result<bool> {
        self.http.file_exists(key).await
    }
}

impl std::fmt::Display for Host {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}/{} ({})",
            self.address, self.http_port, self.pb_port, self.protocol
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_address_bare() {
        let shared = Config::default();
        let host = Host::from_address("10.0.0.1", &shared).unwrap();
        assert_eq!(host.address(), "10.0.0.1");
        assert_eq!(host.http_port(), shared.http_port);
        assert_eq!(host.pb_port(), shared.pb_port);
    }

    #[test]
    fn test_from_address_with_port() {
        let shared = Config::default();
        let host = Host::from_address("10.0.0.1:9000", &shared).unwrap();
        assert_eq!(host.address(), "10.0.0.1");
        // Default protocol is HTTP, so the explicit port is the HTTP port
        assert_eq!(host.http_port(), 9000);
        assert_eq!(host.pb_port(), shared.pb_port);

        let shared = Config {
            protocol: Protocol::Pbc,
            ..Config::default()
        };
        let host = Host::from_address("10.0.0.1:9000", &shared).unwrap();
        assert_eq!(host.pb_port(), 9000);
        assert_eq!(host.http_port(), shared.http_port);
    }

    #[test]
    fn test_from_address_invalid() {
        let shared = Config::default();
        assert!(Host::from_address("", &shared).is_err());
        assert!(Host::from_address("10.0.0.1:notaport", &shared).is_err());
        assert!(Host::from_address("10.0.0.1:70000", &shared).is_err());
    }

    #[test]
    fn test_from_record_overrides_shared() {
        let shared = Config::default();
        let record = HostRecord {
            address: "node-2".to_string(),
            http_port: Some(8888),
            pb_port: None,
            protocol: Some(Protocol::Pbc),
        };
        let host = Host::from_record(&record, &shared);
        assert_eq!(host.address(), "node-2");
        assert_eq!(host.http_port(), 8888);
        assert_eq!(host.pb_port(), shared.pb_port);
        assert_eq!(host.protocol(), Protocol::Pbc);
    }

    #[test]
    fn test_backend_follows_protocol() {
        let host = Host::new("a", 8098, 8087, Protocol::Http);
        assert!(matches!(host.backend(), Backend::Http(_)));

        let host = Host::new("a", 8098, 8087, Protocol::Pbc);
        assert!(matches!(host.backend(), Backend::Pb(_)));
    }
}
