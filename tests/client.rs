//! Integration tests for the client coordinator

use std::sync::{Arc, Mutex};

use kvclient::balancer::{self, Balancer};
use kvclient::{Client, Config, Host, HostEntry, HostRecord, RoundRobin};

/// Balancer that rotates like the built-in but records every selection.
struct Recording {
    inner: RoundRobin,
    log: Arc<Mutex<Vec<String>>>,
}

impl Balancer for Recording {
    fn host<'a>(&self, hosts: &'a [Arc<Host>]) -> &'a Arc<Host> {
        let host = self.inner.host(hosts);
        self.log
            .lock()
            .unwrap()
            .push(format!("{}:{}", host.address(), host.http_port()));
        host
    }
}

fn register_recording(name: &'static str) -> Arc<Mutex<Vec<String>>> {
    let log: Arc<Mutex<Vec<String>>> = Arc::default();
    let captured = Arc::clone(&log);
    balancer::register(
        name,
        Arc::new(move || {
            Box::new(Recording {
                inner: RoundRobin::new(),
                log: Arc::clone(&captured),
            }) as Box<dyn Balancer>
        }),
    );
    log
}

fn record_entry(port: u16) -> HostEntry {
    HostEntry::from(HostRecord {
        address: "127.0.0.1".to_string(),
        // Nothing listens on this port, so delegated calls fail fast;
        // selection happens before the connect and is what we assert on.
        http_port: Some(port),
        ..HostRecord::default()
    })
}

#[test]
fn test_default_balancer_rotates_over_client_hosts() {
    let config = Config {
        hosts: vec![
            HostEntry::from("a"),
            HostEntry::from("b"),
            HostEntry::from("c"),
        ],
        ..Config::default()
    };
    let client = Client::new(config).unwrap();

    let balancer = balancer::lookup("round_robin").unwrap()();
    let picked: Vec<&str> = (0..7)
        .map(|_| balancer.host(client.hosts()).address())
        .collect();
    assert_eq!(picked, ["a", "b", "c", "a", "b", "c", "a"]);
}

#[test]
fn test_unregistered_strategy_fails_before_any_host() {
    let config = Config {
        balancer: "does_not_exist".to_string(),
        hosts: vec![HostEntry::from("a")],
        ..Config::default()
    };
    assert!(matches!(
        Client::new(config),
        Err(kvclient::Error::UnknownBalancer(_))
    ));
}

#[tokio::test]
async fn test_blob_ops_rotate_by_call_count() {
    let log = register_recording("recording_blob");

    let config = Config {
        hosts: vec![record_entry(1), record_entry(2)],
        balancer: "recording_blob".to_string(),
        ..Config::default()
    };
    let client = Client::new(config).unwrap();

    // All four operations fail (nothing is listening); only the selection
    // order matters, and it must depend on call count, not operation type.
    let _ = client.store_file("k", b"v").await;
    let _ = client.get_file("k").await;
    let _ = client.delete_file("k").await;
    let _ = client.file_exists("k").await;

    let selected = log.lock().unwrap().clone();
    assert_eq!(
        selected,
        [
            "127.0.0.1:1",
            "127.0.0.1:2",
            "127.0.0.1:1",
            "127.0.0.1:2"
        ]
    );
}

#[tokio::test]
async fn test_selection_is_per_call_across_mixed_operations() {
    let log = register_recording("recording_mixed");

    let config = Config {
        hosts: vec![record_entry(1), record_entry(2), record_entry(3)],
        balancer: "recording_mixed".to_string(),
        ..Config::default()
    };
    let client = Client::new(config).unwrap();

    let _ = client.buckets().await;
    let _ = client.file_exists("k").await;
    let _ = client.get_file("k").await;
    let _ = client.buckets().await;
    let _ = client.store_file("k", b"v").await;

    let selected = log.lock().unwrap().clone();
    assert_eq!(
        selected,
        [
            "127.0.0.1:1",
            "127.0.0.1:2",
            "127.0.0.1:3",
            "127.0.0.1:1",
            "127.0.0.1:2"
        ]
    );
}

#[tokio::test]
async fn test_bucket_with_props_flag_keeps_handle_identity() {
    let client = Client::new(Config {
        hosts: vec![record_entry(1)],
        ..Config::default()
    })
    .unwrap();

    let plain = client.bucket("widgets");

    // The fetch fails (no server), but the cached handle is the same one
    let res = client
        .bucket_with("widgets", kvclient::BucketOptions { fetch_props: true })
        .await;
    assert!(res.is_err());

    let again = client.bucket("widgets");
    assert!(Arc::ptr_eq(&plain, &again));
    assert!(plain.props().is_none());
}
