//! # kvclient
//!
//! A load-balancing client for a distributed key-value store:
//! - One logical handle over several equivalent nodes
//! - Pluggable host selection, round-robin built in, strategies by name
//! - HTTP and length-prefixed binary-protocol backends per host
//! - Stable client identity, locally drawn or remote-assigned
//! - Cached bucket handles and blob-store passthrough
//!
//! ## Architecture
//!
//! ```text
//! caller ──▶ Client op ──▶ Balancer.host() ──▶ selected Host
//!                              │                    │
//!                     reads Client.hosts     HTTP / binary backend
//! ```
//!
//! Every protocol-independent operation picks a host right before
//! delegating; selection is per call, never cached per session.
//!
//! ## Usage
//!
//! ```no_run
//! use kvclient::{Client, Config, HostEntry};
//!
//! # async fn run() -> kvclient::Result<()> {
//! let config = Config {
//!     hosts: vec![
//!         HostEntry::from("node-1"),
//!         HostEntry::from("node-2"),
//!         HostEntry::from("node-3"),
//!     ],
//!     ..Config::default()
//! };
//! let client = Client::new(config)?;
//!
//! client.store_file("logo.png", b"\x89PNG...").await?;
//! let names = client.buckets().await?;
//! println!("buckets: {:?}", names);
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod balancer;
pub mod bucket;
pub mod client;
pub mod config;
pub mod error;
pub mod host;

// Re-export commonly used types
pub use backend::{Backend, BucketProps, HttpBackend, PbBackend};
pub use balancer::{Balancer, BalancerCtor, RoundRobin};
pub use bucket::{Bucket, BucketOptions};
pub use client::{Client, ClientId, MAX_CLIENT_ID};
pub use config::{Config, HostEntry, HostRecord, Protocol};
pub use error::{Error, Result};
pub use host::Host;

/// Current version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
