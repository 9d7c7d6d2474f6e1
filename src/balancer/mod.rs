//! Host selection strategies
//!
//! A [`Balancer`] picks one host out of the owning client's host list for
//! every operation. Strategies are looked up by name through a process-wide
//! registry so configuration can select them; built-ins are registered on
//! first access, and [`register`] is open to extensions. Registering a name
//! twice replaces the earlier constructor (last registration wins); clients
//! built before a re-registration keep the instance they already have.

pub mod round_robin;

pub use round_robin::RoundRobin;

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use once_cell::sync::Lazy;

use crate::host::Host;

/// Selection strategy over a client's host list.
///
/// `hosts` is never empty; implementations may keep private cursor state but
/// must not have other side effects.
pub trait Balancer: Send + Sync {
    /// Select the host the next operation should use.
    fn host<'a>(&self, hosts: &'a [Arc<Host>]) -> &'a Arc<Host>;
}

/// Constructor stored in the registry; each client gets its own instance.
pub type BalancerCtor = Arc<dyn Fn() -> Box<dyn Balancer> + Send + Sync>;

static REGISTRY: Lazy<RwLock<HashMap<String, BalancerCtor>>> = Lazy::new(|| {
    let mut table: HashMap<String, BalancerCtor> = HashMap::new();
    table.insert(
        "round_robin".to_string(),
        Arc::new(|| Box::new(RoundRobin::new()) as Box<dyn Balancer>),
    );
    RwLock::new(table)
});

/// Register a strategy under `name`, replacing any previous registration.
pub fn register(name: impl Into<String>, ctor: BalancerCtor) {
    REGISTRY
        .write()
        .expect("balancer registry poisoned")
        .insert(name.into(), ctor);
}

/// Look up the constructor registered under `name`.
pub fn lookup(name: &str) -> Option<BalancerCtor> {
    REGISTRY
        .read()
        .expect("balancer registry poisoned")
        .get(name)
        .cloned()
}

/// Names currently registered, for diagnostics.
pub fn strategies() -> Vec<String> {
    let mut names: Vec<String> = REGISTRY
        .read()
        .expect("balancer registry poisoned")
        .keys()
        .cloned()
        .collect();
    names.sort();
    names
}
