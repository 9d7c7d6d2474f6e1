//! Protocol backends
//!
//! A [`Host`](crate::host::Host) can be driven over HTTP or over the store's
//! length-prefixed binary protocol. [`Backend`] is the protocol-independent
//! view: it dispatches each operation to whichever concrete backend the host
//! prefers, so the client core stays free of protocol knowledge.

pub mod http;
pub mod pb;

pub use http::HttpBackend;
pub use pb::PbBackend;

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde::{Deserialize, Serialize};

use crate::client::ClientId;
use crate::Result;

/// Percent-encoding set for path components (includes /, %, and control chars)
const COMPONENT_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b'/')
    .add(b'%')
    .add(b' ')
    .add(b'?')
    .add(b'#')
    .add(b'&');

/// Encode a bucket name or key for URL usage
pub(crate) fn encode_component(s: &str) -> String {
    utf8_percent_encode(s, COMPONENT_ENCODE_SET).to_string()
}

/// Replicated-bucket properties as the store reports them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketProps {
    /// Number of replicas per key
    #[serde(default = "default_n_val")]
    pub n_val: u32,

    /// Whether sibling values are kept on concurrent writes
    #[serde(default)]
    pub allow_mult: bool,

    /// Whether the newest write unconditionally wins
    #[serde(default)]
    pub last_write_wins: bool,
}

fn default_n_val() -> u32 {
    3
}

impl Default for BucketProps {
    fn default() -> Self {
        Self {
            n_val: default_n_val(),
            allow_mult: false,
            last_write_wins: false,
        }
    }
}

/// Protocol-independent backend handle, borrowed from a host.
///
/// Operations suspend inside the underlying transport; the dispatch itself
/// has no state.
#[derive(Debug, Clone, Copy)]
pub enum Backend<'a> {
    Http(&'a HttpBackend),
    Pb(&'a PbBackend),
}

impl Backend<'_> {
    /// Liveness check against the node.
    pub async fn ping(&self) -> Result<()> {
        match self {
            Backend::Http(b) => b.ping().await,
            Backend::Pb(b) => b.ping().await,
        }
    }

    /// Fetch the value stored under `bucket`/`key`, `None` if absent.
    pub async fn get(&self, bucket: &str, key: &str) -> Result<Option<Vec<u8>>> {
        match self {
            Backend::Http(b) => b.get(bucket, key).await,
            Backend::Pb(b) => b.get(bucket, key).await,
        }
    }

    /// Store `value` under `bucket`/`key`.
    pub async fn put(&self, bucket: &str, key: &str, value: &[u8]) -> Result<()> {
        match self {
            Backend::Http(b) => b.put(bucket, key, value).await,
            Backend::Pb(b) => b.put(bucket, key, value).await,
        }
    }

    /// Delete `bucket`/`key`. Deleting an absent key is not an error.
    pub async fn delete(&self, bucket: &str, key: &str) -> Result<()> {
        match self {
            Backend::Http(b) => b.delete(bucket, key).await,
            Backend::Pb(b) => b.delete(bucket, key).await,
        }
    }

    /// List the bucket names known to the node.
    pub async fn list_buckets(&self) -> Result<Vec<String>> {
        match self {
            Backend::Http(b) => b.list_buckets().await,
            Backend::Pb(b) => b.list_buckets().await,
        }
    }

    /// List the keys of one bucket.
    pub async fn list_keys(&self, bucket: &str) -> Result<Vec<String>> {
        match self {
            Backend::Http(b) => b.list_keys(bucket).await,
            Backend::Pb(b) => b.list_keys(bucket).await,
        }
    }

    /// Fetch the properties of one bucket.
    pub async fn get_bucket_props(&self, bucket: &str) -> Result<BucketProps> {
        match self {
            Backend::Http(b) => b.get_bucket_props(bucket).await,
            Backend::Pb(b) => b.get_bucket_props(bucket).await,
        }
    }

    /// Update the properties of one bucket.
    pub async fn set_bucket_props(&self, bucket: &str, props: &BucketProps) -> Result<()> {
        match self {
            Backend::Http(b) => b.set_bucket_props(bucket, props).await,
            Backend::Pb(b) => b.set_bucket_props(bucket, props).await,
        }
    }

    /// Whether this backend can fetch/push a client identity on the node.
    ///
    /// Only the binary protocol carries the identity; the HTTP surface has no
    /// equivalent endpoint.
    pub fn supports_client_id(&self) -> bool {
        matches!(self, Backend::Pb(_))
    }

    /// Retrieve the client identity the node has assigned to this connection.
    pub async fn fetch_client_id(&self) -> Result<ClientId> {
        match self {
            Backend::Http(_) => Err(crate::Error::Unsupported("http")),
            Backend::Pb(b) => b.fetch_client_id().await,
        }
    }

    /// Push a locally chosen client identity to the node.
    pub async fn push_client_id(&self, id: &ClientId) -> Result<()> {
        match self {
            Backend::Http(_) => Err(crate::Error::Unsupported("http")),
            Backend::Pb(b) => b.push_client_id(id).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_component() {
        assert_eq!(encode_component("plain"), "plain");
        assert!(encode_component("a/b").contains("%2F"));
        assert!(encode_component("a b").contains("%20"));
    }

    #[test]
    fn test_bucket_props_defaults() {
        let props: BucketProps = serde_json::from_str("{}").unwrap();
        assert_eq!(props.n_val, 3);
        assert!(!props.allow_mult);
        assert!(!props.last_write_wins);
    }
}
