//! Client configuration
//!
//! A [`ClientConfig`] describes which nodes the client may talk to, which
//! protocol to prefer, and which balancing strategy picks the node for each
//! operation. Hosts can be given as bare address strings, as partial records
//! merged with the shared settings, or as ready-made [`Host`] values.

use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;

use crate::host::Host;

/// Default HTTP API port of a store node
pub const DEFAULT_HTTP_PORT: u16 = 8098;

/// Default binary-protocol port of a store node
pub const DEFAULT_PB_PORT: u16 = 8087;

/// Address used when no host is configured at all
pub const DEFAULT_ADDRESS: &str = "127.0.0.1";

fn default_balancer() -> String {
    "round_robin".to_string()
}
fn default_http_port() -> u16 {
    DEFAULT_HTTP_PORT
}
fn default_pb_port() -> u16 {
    DEFAULT_PB_PORT
}

/// Wire protocol a host should be driven through by default
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Http,
    Pbc,
}

impl Default for Protocol {
    fn default() -> Self {
        Protocol::Http
    }
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Protocol::Http => write!(f, "http"),
            Protocol::Pbc => write!(f, "pbc"),
        }
    }
}

/// Client configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Single host address, merged in front of `hosts`
    #[serde(default)]
    pub host: Option<String>,

    /// Host list (addresses or partial records)
    #[serde(default)]
    pub hosts: Vec<HostEntry>,

    /// Balancer strategy name
    #[serde(default = "default_balancer")]
    pub balancer: String,

    /// Optional client identity (integer or string)
    #[serde(default)]
    pub client_id: Option<crate::client::ClientId>,

    /// Shared HTTP port, used by hosts that don't override it
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// Shared binary-protocol port
    #[serde(default = "default_pb_port")]
    pub pb_port: u16,

    /// Shared preferred protocol
    #[serde(default)]
    pub protocol: Protocol,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: None,
            hosts: Vec::new(),
            balancer: default_balancer(),
            client_id: None,
            http_port: DEFAULT_HTTP_PORT,
            pb_port: DEFAULT_PB_PORT,
            protocol: Protocol::default(),
        }
    }
}

impl Config {
    /// Load a configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> crate::Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .build()
            .map_err(|e| crate::Error::InvalidConfig(e.to_string()))?;

        settings
            .try_deserialize()
            .map_err(|e| crate::Error::InvalidConfig(e.to_string()))
    }
}

/// One entry of the configured host list.
///
/// Bare strings and partial records are normalized into full [`Host`]s at
/// client construction, merged with the shared `Config` settings. Anything
/// else in a serialized config fails deserialization.
#[derive(Debug, Clone)]
pub enum HostEntry {
    /// A fully built host, used as-is
    Ready(Arc<Host>),
    /// A bare `address` or `address:port` string
    Address(String),
    /// A partial record; unset fields fall back to the shared settings
    Record(HostRecord),
}

impl<'de> Deserialize<'de> for HostEntry {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Address(String),
            Record(HostRecord),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Address(a) => HostEntry::Address(a),
            Raw::Record(r) => HostEntry::Record(r),
        })
    }
}

impl From<&str> for HostEntry {
    fn from(s: &str) -> Self {
        HostEntry::Address(s.to_string())
    }
}

impl From<String> for HostEntry {
    fn from(s: String) -> Self {
        HostEntry::Address(s)
    }
}

impl From<HostRecord> for HostEntry {
    fn from(r: HostRecord) -> Self {
        HostEntry::Record(r)
    }
}

impl From<Arc<Host>> for HostEntry {
    fn from(h: Arc<Host>) -> Self {
        HostEntry::Ready(h)
    }
}

/// Partial per-host settings
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HostRecord {
    pub address: String,

    #[serde(default)]
    pub http_port: Option<u16>,

    #[serde(default)]
    pub pb_port: Option<u16>,

    #[serde(default)]
    pub protocol: Option<Protocol>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert!(cfg.host.is_none());
        assert!(cfg.hosts.is_empty());
        assert_eq!(cfg.balancer, "round_robin");
        assert_eq!(cfg.http_port, DEFAULT_HTTP_PORT);
        assert_eq!(cfg.pb_port, DEFAULT_PB_PORT);
        assert_eq!(cfg.protocol, Protocol::Http);
    }

    #[test]
    fn test_deserialize_host_entries() {
        let cfg: Config = serde_json::from_str(
            r#"{
                "hosts": ["10.0.0.1", {"address": "10.0.0.2", "pb_port": 9001}],
                "balancer": "round_robin"
            }"#,
        )
        .unwrap();

        assert_eq!(cfg.hosts.len(), 2);
        match &cfg.hosts[0] {
            HostEntry::Address(a) => assert_eq!(a, "10.0.0.1"),
            other => panic!("expected address entry, got {:?}", other),
        }
        match &cfg.hosts[1] {
            HostEntry::Record(r) => {
                assert_eq!(r.address, "10.0.0.2");
                assert_eq!(r.pb_port, Some(9001));
                assert!(r.http_port.is_none());
            }
            other => panic!("expected record entry, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_host_entry_rejected() {
        // Neither a string nor a host record
        let res: std::result::Result<Config, _> =
            serde_json::from_str(r#"{"hosts": [42]}"#);
        assert!(res.is_err());

        // Unknown key inside a record
        let res: std::result::Result<Config, _> =
            serde_json::from_str(r#"{"hosts": [{"address": "a", "portt": 1}]}"#);
        assert!(res.is_err());
    }

    #[test]
    fn test_client_id_types() {
        let cfg: Config = serde_json::from_str(r#"{"client_id": 42}"#).unwrap();
        assert_eq!(cfg.client_id, Some(crate::client::ClientId::Num(42)));

        let cfg: Config = serde_json::from_str(r#"{"client_id": "abc"}"#).unwrap();
        assert_eq!(
            cfg.client_id,
            Some(crate::client::ClientId::Str("abc".to_string()))
        );

        // A negative number is neither a valid integer id nor a string
        let res: std::result::Result<Config, _> = serde_json::from_str(r#"{"client_id": -1}"#);
        assert!(res.is_err());

        let res: std::result::Result<Config, _> = serde_json::from_str(r#"{"client_id": true}"#);
        assert!(res.is_err());
    }

    #[test]
    fn test_from_file() {
        use std::io::Write;

        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("client.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "host = \"node-1\"").unwrap();
        writeln!(f, "pb_port = 9087").unwrap();
        writeln!(f, "protocol = \"pbc\"").unwrap();

        let cfg = Config::from_file(&path).unwrap();
        assert_eq!(cfg.host.as_deref(), Some("node-1"));
        assert_eq!(cfg.pb_port, 9087);
        assert_eq!(cfg.protocol, Protocol::Pbc);
    }
}
