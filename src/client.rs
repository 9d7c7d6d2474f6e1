//! Client coordinator
//!
//! A [`Client`] is the single logical handle over a set of equivalent store
//! nodes. It owns the host list, one balancer instance resolved by name at
//! construction, the client identity, and a cache of bucket handles. Every
//! protocol-independent operation asks the balancer for a host immediately
//! before delegating, so two consecutive calls may land on different nodes.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use rand::Rng;
use serde::Deserialize;

use crate::backend::{Backend, BucketProps, HttpBackend, PbBackend};
use crate::balancer::{self, Balancer};
use crate::bucket::{Bucket, BucketOptions};
use crate::config::{Config, HostEntry};
use crate::host::Host;
use crate::{Error, Result};

/// Exclusive upper bound for integer client identities
pub const MAX_CLIENT_ID: u64 = 1 << 32;

/// Identity token distinguishing this client's writes to the store.
///
/// Either an integer in `[0, MAX_CLIENT_ID)` or an opaque string; nothing
/// else deserializes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientId {
    Num(u64),
    Str(String),
}

impl ClientId {
    fn validate(&self) -> Result<()> {
        match self {
            ClientId::Num(n) if *n >= MAX_CLIENT_ID => Err(Error::InvalidClientId(format!(
                "{} is outside [0, {})",
                n, MAX_CLIENT_ID
            ))),
            _ => Ok(()),
        }
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientId::Num(n) => write!(f, "{}", n),
            ClientId::Str(s) => write!(f, "{}", s),
        }
    }
}

impl From<u64> for ClientId {
    fn from(n: u64) -> Self {
        ClientId::Num(n)
    }
}

impl From<u32> for ClientId {
    fn from(n: u32) -> Self {
        ClientId::Num(n as u64)
    }
}

impl From<&str> for ClientId {
    fn from(s: &str) -> Self {
        ClientId::Str(s.to_string())
    }
}

impl From<String> for ClientId {
    fn from(s: String) -> Self {
        ClientId::Str(s)
    }
}

impl<'de> Deserialize<'de> for ClientId {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Num(u64),
            Str(String),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Num(n) => ClientId::Num(n),
            Raw::Str(s) => ClientId::Str(s),
        })
    }
}

/// Identity lifecycle: unresolved until the first getter or setter call,
/// then pinned to a remote-fetched or locally chosen value.
#[derive(Debug, Clone)]
enum IdState {
    Unresolved,
    Remote(ClientId),
    Local(ClientId),
}

pub struct Client {
    hosts: Vec<Arc<Host>>,
    balancer: Box<dyn Balancer>,
    id: Mutex<IdState>,
    buckets: Mutex<HashMap<String, Arc<Bucket>>>,
}

impl Client {
    /// Build a client from a configuration bag.
    ///
    /// Fails fast on an unregistered balancer name, a malformed host entry,
    /// or an out-of-range client identity; with no host options at all the
    /// client gets one host at the default local address.
    pub fn new(config: Config) -> Result<Self> {
        let ctor = balancer::lookup(&config.balancer)
            .ok_or_else(|| Error::UnknownBalancer(config.balancer.clone()))?;

        let id = match &config.client_id {
            Some(id) => {
                id.validate()?;
                IdState::Local(id.clone())
            }
            None => IdState::Unresolved,
        };

        let mut hosts: Vec<Arc<Host>> = Vec::new();
        if let Some(addr) = &config.host {
            hosts.push(Arc::new(Host::from_address(addr, &config)?));
        }
        for entry in &config.hosts {
            hosts.push(match entry {
                HostEntry::Ready(h) => Arc::clone(h),
                HostEntry::Address(a) => Arc::new(Host::from_address(a, &config)?),
                HostEntry::Record(r) => Arc::new(Host::from_record(r, &config)),
            });
        }
        // Dedup by identity, not by value: the same ready-made host listed
        // twice collapses, equal-but-distinct entries do not.
        let mut seen: Vec<*const Host> = Vec::with_capacity(hosts.len());
        hosts.retain(|h| {
            let ptr = Arc::as_ptr(h);
            if seen.contains(&ptr) {
                false
            } else {
                seen.push(ptr);
                true
            }
        });
        if hosts.is_empty() {
            hosts.push(Arc::new(Host::default_local(&config)));
        }

        tracing::debug!(
            "client configured: {} host(s), balancer {}",
            hosts.len(),
            config.balancer
        );

        Ok(Self {
            hosts,
            balancer: ctor(),
            id: Mutex::new(id),
            buckets: Mutex::new(HashMap::new()),
        })
    }

    /// The configured hosts, in configuration order.
    pub fn hosts(&self) -> &[Arc<Host>] {
        &self.hosts
    }

    /// Fresh balancer selection; called once per delegated operation.
    fn next_host(&self) -> &Arc<Host> {
        let host = self.balancer.host(&self.hosts);
        tracing::debug!("selected host {}", host);
        host
    }

    // === Backend access ===

    /// Protocol-independent backend of a freshly selected host.
    pub fn backend(&self) -> Backend<'_> {
        self.next_host().backend()
    }

    /// HTTP backend of a freshly selected host.
    pub fn http(&self) -> &HttpBackend {
        self.next_host().http()
    }

    /// Binary-protocol backend of a freshly selected host.
    pub fn protobuffs(&self) -> &PbBackend {
        self.next_host().protobuffs()
    }

    // === Client identity ===

    fn cached_client_id(&self) -> Option<ClientId> {
        match &*self.id.lock().expect("client id poisoned") {
            IdState::Unresolved => None,
            IdState::Remote(id) | IdState::Local(id) => Some(id.clone()),
        }
    }

    /// The client identity, resolving it on first use.
    ///
    /// If the active backend can report a remote-assigned identity it is
    /// fetched and cached; otherwise a random integer identity is drawn
    /// locally. Either way the value is stable afterwards.
    pub async fn client_id(&self) -> Result<ClientId> {
        if let Some(id) = self.cached_client_id() {
            return Ok(id);
        }

        let backend = self.next_host().backend();
        let (id, remote) = if backend.supports_client_id() {
            (backend.fetch_client_id().await?, true)
        } else {
            let n = rand::thread_rng().gen_range(0..MAX_CLIENT_ID);
            (ClientId::Num(n), false)
        };

        let mut state = self.id.lock().expect("client id poisoned");
        if let IdState::Remote(existing) | IdState::Local(existing) = &*state {
            // Raced with another resolver; the first one wins
            return Ok(existing.clone());
        }
        *state = if remote {
            IdState::Remote(id.clone())
        } else {
            IdState::Local(id.clone())
        };
        Ok(id)
    }

    /// Assign the client identity.
    ///
    /// The value is validated first; if the active backend supports pushing
    /// an identity to the node, the push happens before the local value is
    /// stored.
    pub async fn set_client_id(&self, id: impl Into<ClientId>) -> Result<ClientId> {
        let id = id.into();
        id.validate()?;

        let backend = self.next_host().backend();
        if backend.supports_client_id() {
            backend.push_client_id(&id).await?;
        }

        *self.id.lock().expect("client id poisoned") = IdState::Local(id.clone());
        Ok(id)
    }

    // === Buckets ===

    /// The bucket handle for `name`, created and cached on first access.
    ///
    /// Repeated lookups of the same name return the same handle for the
    /// client's lifetime.
    pub fn bucket(&self, name: &str) -> Arc<Bucket> {
        let mut cache = self.buckets.lock().expect("bucket cache poisoned");
        Arc::clone(
            cache
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(Bucket::new(name))),
        )
    }

    /// Like [`bucket`](Self::bucket), but with options. When `fetch_props`
    /// is set, a properties fetch runs on every call, cached handle or not;
    /// the handle identity is unaffected.
    pub async fn bucket_with(&self, name: &str, options: BucketOptions) -> Result<Arc<Bucket>> {
        let bucket = self.bucket(name);
        if options.fetch_props {
            self.fetch_bucket_props(&bucket).await?;
        }
        Ok(bucket)
    }

    /// Fetch and cache the properties of a bucket handle.
    pub async fn fetch_bucket_props(&self, bucket: &Bucket) -> Result<BucketProps> {
        let props = self
            .next_host()
            .backend()
            .get_bucket_props(bucket.name())
            .await?;
        bucket.set_props(props.clone());
        Ok(props)
    }

    /// Bucket names known to a freshly selected host.
    pub async fn buckets(&self) -> Result<Vec<String>> {
        self.next_host().buckets().await
    }

    // === Blob store ===

    pub async fn store_file(&self, key: &str, data: &[u8]) -> Result<()> {
        self.next_host().store_file(key, data).await
    }

    pub async fn get_file(&self, key: &str) -> Result<Vec<u8>> {
        self.next_host().get_file(key).await
    }

    pub async fn delete_file(&self, key: &str) -> Result<()> {
        self.next_host().delete_file(key).await
    }

    pub async fn file_exists(&self, key: &str) -> Result<bool> {
        self.next_host().file_exists(key).await
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("hosts", &self.hosts)
            .field("id", &*self.id.lock().expect("client id poisoned"))
            .finish_non_exhaustive()
    }
}
