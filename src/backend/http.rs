//! HTTP backend
//!
//! Drives a node through its HTTP API: key/value access under
//! `/buckets/{bucket}/keys/{key}`, bucket listing and properties as JSON, and
//! the blob store under `/files/{key}`.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use super::{encode_component, BucketProps};
use crate::Result;

#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base: String,
}

#[derive(Deserialize)]
struct BucketList {
    buckets: Vec<String>,
}

#[derive(Deserialize)]
struct KeyList {
    keys: Vec<String>,
}

#[derive(Serialize, Deserialize)]
struct PropsBody {
    props: BucketProps,
}

impl HttpBackend {
    pub fn new(address: &str, port: u16) -> Self {
        Self {
            client: reqwest::Client::new(),
            base: format!("http://{}:{}", address, port),
        }
    }

    /// Base URL of the node, without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base
    }

    fn object_url(&self, bucket: &str, key: &str) -> String {
        format!(
            "{}/buckets/{}/keys/{}",
            self.base,
            encode_component(bucket),
            encode_component(key)
        )
    }

    fn file_url(&self, key: &str) -> String {
        format!("{}/files/{}", self.base, encode_component(key))
    }

    pub async fn ping(&self) -> Result<()> {
        self.client
            .get(format!("{}/ping", self.base))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    pub async fn get(&self, bucket: &str, key: &str) -> Result<Option<Vec<u8>>> {
        let resp = self.client.get(self.object_url(bucket, key)).send().await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body = resp.error_for_status()?.bytes().await?;
        Ok(Some(body.to_vec()))
    }

    pub async fn put(&self, bucket: &str, key: &str, value: &[u8]) -> Result<()> {
        self.client
            .put(self.object_url(bucket, key))
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(value.to_vec())
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    pub async fn delete(&self, bucket: &str, key: &str) -> Result<()> {
        let resp = self
            .client
            .delete(self.object_url(bucket, key))
            .send()
            .await?;
        // Deleting an absent key is a no-op
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        resp.error_for_status()?;
        Ok(())
    }

    pub async fn list_buckets(&self) -> Result<Vec<String>> {
        let list: BucketList = self
            .client
            .get(format!("{}/buckets?buckets=true", self.base))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(list.buckets)
    }

    pub async fn list_keys(&self, bucket: &str) -> Result<Vec<String>> {
        let list: KeyList = self
            .client
            .get(format!(
                "{}/buckets/{}/keys?keys=true",
                self.base,
                encode_component(bucket)
            ))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(list.keys)
    }

    pub async fn get_bucket_props(&self, bucket: &str) -> Result<BucketProps> {
        let body: PropsBody = self
            .client
            .get(format!(
                "{}/buckets/{}/props",
                self.base,
                encode_component(bucket)
            ))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(body.props)
    }

    pub async fn set_bucket_props(&self, bucket: &str, props: &BucketProps) -> Result<()> {
        self.client
            .put(format!(
                "{}/buckets/{}/props",
                self.base,
                encode_component(bucket)
            ))
            .json(&PropsBody {
                props: props.clone(),
            })
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    // === Blob store ===

    pub async fn store_file(&self, key: &str, data: &[u8]) -> Result<()> {
        self.client
            .put(self.file_url(key))
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(data.to_vec())
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    pub async fn get_file(&self, key: &str) -> Result<Vec<u8>> {
        let resp = self.client.get(self.file_url(key)).send().await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Err(crate::Error::NotFound(key.to_string()));
        }
        let body = resp.error_for_status()?.bytes().await?;
        Ok(body.to_vec())
    }

    pub async fn delete_file(&self, key: &str) -> Result<()> {
        let resp = self.client.delete(self.file_url(key)).send().await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        resp.error_for_status()?;
        Ok(())
    }

    pub async fn file_exists(&self, key: &str) -> Result<bool> {
        let resp = self.client.head(self.file_url(key)).send().await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        resp.error_for_status()?;
        Ok(true)
    }
}
