//! Bucket handles
//!
//! A [`Bucket`] is a named handle grouping keys in the store. The client
//! creates one handle per distinct name and caches it for its lifetime;
//! properties are filled in when a fetch is triggered through the client.

use std::sync::Mutex;

use serde::Deserialize;

use crate::backend::BucketProps;

#[derive(Debug)]
pub struct Bucket {
    name: String,
    props: Mutex<Option<BucketProps>>,
}

impl Bucket {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            props: Mutex::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Properties of the bucket, if a fetch has happened.
    pub fn props(&self) -> Option<BucketProps> {
        self.props.lock().expect("bucket props poisoned").clone()
    }

    pub(crate) fn set_props(&self, props: BucketProps) {
        *self.props.lock().expect("bucket props poisoned") = Some(props);
    }
}

/// Options accepted by [`Client::bucket_with`](crate::Client::bucket_with).
///
/// The one recognized flag; unknown keys in serialized form are rejected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct BucketOptions {
    /// Fetch the bucket's properties on every access, cached handle or not
    pub fetch_props: bool,
}
