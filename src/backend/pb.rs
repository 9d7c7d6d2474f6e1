//! Binary protocol backend
//!
//! The store's binary protocol is a length-prefixed framing over TCP:
//!
//! ```text
//! +----------------+--------+------------------------+
//! | length (u32 BE)| code   | protobuf-encoded body  |
//! +----------------+--------+------------------------+
//! ```
//!
//! `length` counts the code byte plus the body. Message bodies are encoded
//! with prost; the structs below are written by hand, there is no codegen.
//! The connection is opened lazily on the first call and dropped on any
//! transport error, so the next call starts from a fresh connect.

use bytes::{BufMut, BytesMut};
use prost::Message;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;

use super::BucketProps;
use crate::client::{ClientId, MAX_CLIENT_ID};
use crate::{Error, Result};

// === Message codes ===
pub const MSG_ERROR_RESP: u8 = 0;
pub const MSG_PING_REQ: u8 = 1;
pub const MSG_PING_RESP: u8 = 2;
pub const MSG_GET_CLIENT_ID_REQ: u8 = 3;
pub const MSG_GET_CLIENT_ID_RESP: u8 = 4;
pub const MSG_SET_CLIENT_ID_REQ: u8 = 5;
pub const MSG_SET_CLIENT_ID_RESP: u8 = 6;
pub const MSG_GET_REQ: u8 = 9;
pub const MSG_GET_RESP: u8 = 10;
pub const MSG_PUT_REQ: u8 = 11;
pub const MSG_PUT_RESP: u8 = 12;
pub const MSG_DEL_REQ: u8 = 13;
pub const MSG_DEL_RESP: u8 = 14;
pub const MSG_LIST_BUCKETS_REQ: u8 = 15;
pub const MSG_LIST_BUCKETS_RESP: u8 = 16;
pub const MSG_LIST_KEYS_REQ: u8 = 17;
pub const MSG_LIST_KEYS_RESP: u8 = 18;
pub const MSG_GET_BUCKET_REQ: u8 = 19;
pub const MSG_GET_BUCKET_RESP: u8 = 20;
pub const MSG_SET_BUCKET_REQ: u8 = 21;
pub const MSG_SET_BUCKET_RESP: u8 = 22;

// === Wire messages ===

#[derive(Clone, PartialEq, Message)]
pub struct PbErrorResp {
    #[prost(bytes = "vec", tag = "1")]
    pub errmsg: Vec<u8>,
    #[prost(uint32, tag = "2")]
    pub errcode: u32,
}

#[derive(Clone, PartialEq, Message)]
pub struct PbEmpty {}

#[derive(Clone, PartialEq, Message)]
pub struct PbClientId {
    #[prost(bytes = "vec", tag = "1")]
    pub client_id: Vec<u8>,
}

#[derive(Clone, PartialEq, Message)]
pub struct PbGetReq {
    #[prost(bytes = "vec", tag = "1")]
    pub bucket: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub key: Vec<u8>,
}

#[derive(Clone, PartialEq, Message)]
pub struct PbGetResp {
    #[prost(bytes = "vec", optional, tag = "1")]
    pub value: Option<Vec<u8>>,
}

#[derive(Clone, PartialEq, Message)]
pub struct PbPutReq {
    #[prost(bytes = "vec", tag = "1")]
    pub bucket: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub key: Vec<u8>,
    #[prost(bytes = "vec", tag = "3")]
    pub value: Vec<u8>,
}

#[derive(Clone, PartialEq, Message)]
pub struct PbDelReq {
    #[prost(bytes = "vec", tag = "1")]
    pub bucket: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub key: Vec<u8>,
}

#[derive(Clone, PartialEq, Message)]
pub struct PbListBucketsResp {
    #[prost(bytes = "vec", repeated, tag = "1")]
    pub buckets: Vec<Vec<u8>>,
}

#[derive(Clone, PartialEq, Message)]
pub struct PbListKeysReq {
    #[prost(bytes = "vec", tag = "1")]
    pub bucket: Vec<u8>,
}

#[derive(Clone, PartialEq, Message)]
pub struct PbListKeysResp {
    #[prost(bytes = "vec", repeated, tag = "1")]
    pub keys: Vec<Vec<u8>>,
}

#[derive(Clone, PartialEq, Message)]
pub struct PbBucketProps {
    #[prost(uint32, tag = "1")]
    pub n_val: u32,
    #[prost(bool, tag = "2")]
    pub allow_mult: bool,
    #[prost(bool, tag = "3")]
    pub last_write_wins: bool,
}

#[derive(Clone, PartialEq, Message)]
pub struct PbGetBucketReq {
    #[prost(bytes = "vec", tag = "1")]
    pub bucket: Vec<u8>,
}

#[derive(Clone, PartialEq, Message)]
pub struct PbGetBucketResp {
    #[prost(message, optional, tag = "1")]
    pub props: Option<PbBucketProps>,
}

#[derive(Clone, PartialEq, Message)]
pub struct PbSetBucketReq {
    #[prost(bytes = "vec", tag = "1")]
    pub bucket: Vec<u8>,
    #[prost(message, optional, tag = "2")]
    pub props: Option<PbBucketProps>,
}

impl From<&BucketProps> for PbBucketProps {
    fn from(p: &BucketProps) -> Self {
        Self {
            n_val: p.n_val,
            allow_mult: p.allow_mult,
            last_write_wins: p.last_write_wins,
        }
    }
}

impl From<PbBucketProps> for BucketProps {
    fn from(p: PbBucketProps) -> Self {
        Self {
            n_val: p.n_val,
            allow_mult: p.allow_mult,
            last_write_wins: p.last_write_wins,
        }
    }
}

/// Binary-protocol backend for one host.
#[derive(Debug)]
pub struct PbBackend {
    address: String,
    port: u16,
    conn: Mutex<Option<TcpStream>>,
}

impl PbBackend {
    pub fn new(address: &str, port: u16) -> Self {
        Self {
            address: address.to_string(),
            port,
            conn: Mutex::new(None),
        }
    }

    pub fn address(&self) -> (&str, u16) {
        (&self.address, self.port)
    }

    /// One request/response exchange on an established stream.
    async fn roundtrip<S>(stream: &mut S, code: u8, body: &[u8]) -> Result<(u8, Vec<u8>)>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let mut frame = BytesMut::with_capacity(body.len() + 5);
        frame.put_u32(body.len() as u32 + 1);
        frame.put_u8(code);
        frame.put_slice(body);
        stream.write_all(&frame).await?;

        let mut len_buf = [0u8; 4];
        stream.read_exact(&mut len_buf).await?;
        let len = u32::from_be_bytes(len_buf) as usize;
        if len == 0 {
            return Err(Error::Protocol("zero-length frame".into()));
        }

        let mut code_buf = [0u8; 1];
        stream.read_exact(&mut code_buf).await?;
        let mut payload = vec![0u8; len - 1];
        stream.read_exact(&mut payload).await?;
        Ok((code_buf[0], payload))
    }

    async fn call<Resp: Message + Default>(
        &self,
        code: u8,
        body: Vec<u8>,
        expect: u8,
    ) -> Result<Resp> {
        let mut guard = self.conn.lock().await;
        let mut stream = match guard.take() {
            Some(s) => s,
            None => TcpStream::connect((self.address.as_str(), self.port))
                .await
                .map_err(|e| {
                    Error::ConnectionFailed(format!("{}:{}: {}", self.address, self.port, e))
                })?,
        };

        // Put the stream back only on a clean exchange; a transport error
        // leaves the connection in an unknown framing state.
        let (resp_code, payload) = Self::roundtrip(&mut stream, code, &body).await?;
        *guard = Some(stream);
        drop(guard);

        if resp_code == MSG_ERROR_RESP {
            let err = PbErrorResp::decode(payload.as_slice())?;
            return Err(Error::Remote {
                code: err.errcode,
                message: String::from_utf8_lossy(&err.errmsg).into_owned(),
            });
        }
        if resp_code != expect {
            return Err(Error::Protocol(format!(
                "unexpected message code {} (expected {})",
                resp_code, expect
            )));
        }
        Ok(Resp::decode(payload.as_slice())?)
    }

    pub async fn ping(&self) -> Result<()> {
        let _: PbEmpty = self
            .call(MSG_PING_REQ, PbEmpty {}.encode_to_vec(), MSG_PING_RESP)
            .await?;
        Ok(())
    }

    pub async fn get(&self, bucket: &str, key: &str) -> Result<Option<Vec<u8>>> {
        let req = PbGetReq {
            bucket: bucket.as_bytes().to_vec(),
            key: key.as_bytes().to_vec(),
        };
        let resp: PbGetResp = self
            .call(MSG_GET_REQ, req.encode_to_vec(), MSG_GET_RESP)
            .await?;
        Ok(resp.value)
    }

    pub async fn put(&self, bucket: &str, key: &str, value: &[u8]) -> Result<()> {
        let req = PbPutReq {
            bucket: bucket.as_bytes().to_vec(),
            key: key.as_bytes().to_vec(),
            value: value.to_vec(),
        };
        let _: PbEmpty = self
            .call(MSG_PUT_REQ, req.encode_to_vec(), MSG_PUT_RESP)
            .await?;
        Ok(())
    }

    pub async fn delete(&self, bucket: &str, key: &str) -> Result<()> {
        let req = PbDelReq {
            bucket: bucket.as_bytes().to_vec(),
            key: key.as_bytes().to_vec(),
        };
        let _: PbEmpty = self
            .call(MSG_DEL_REQ, req.encode_to_vec(), MSG_DEL_RESP)
            .await?;
        Ok(())
    }

    pub async fn list_buckets(&self) -> Result<Vec<String>> {
        let resp: PbListBucketsResp = self
            .call(
                MSG_LIST_BUCKETS_REQ,
                PbEmpty {}.encode_to_vec(),
                MSG_LIST_BUCKETS_RESP,
            )
            .await?;
        Ok(resp
            .buckets
            .into_iter()
            .map(|b| String::from_utf8_lossy(&b).into_owned())
            .collect())
    }

    pub async fn list_keys(&self, bucket: &str) -> Result<Vec<String>> {
        let req = PbListKeysReq {
            bucket: bucket.as_bytes().to_vec(),
        };
        let resp: PbListKeysResp = self
            .call(MSG_LIST_KEYS_REQ, req.encode_to_vec(), MSG_LIST_KEYS_RESP)
            .await?;
        Ok(resp
            .keys
            .into_iter()
            .map(|k| String::from_utf8_lossy(&k).into_owned())
            .collect())
    }

    pub async fn get_bucket_props(&self, bucket: &str) -> Result<BucketProps> {
        let req = PbGetBucketReq {
            bucket: bucket.as_bytes().to_vec(),
        };
        let resp: PbGetBucketResp = self
            .call(MSG_GET_BUCKET_REQ, req.encode_to_vec(), MSG_GET_BUCKET_RESP)
            .await?;
        Ok(resp.props.map(BucketProps::from).unwrap_or_default())
    }

    pub async fn set_bucket_props(&self, bucket: &str, props: &BucketProps) -> Result<()> {
        let req = PbSetBucketReq {
            bucket: bucket.as_bytes().to_vec(),
            props: Some(props.into()),
        };
        let _: PbEmpty = self
            .call(MSG_SET_BUCKET_REQ, req.encode_to_vec(), MSG_SET_BUCKET_RESP)
            .await?;
        Ok(())
    }

    /// Fetch the client identity the node assigned to this connection.
    ///
    /// Identities travel as UTF-8 bytes; a decimal payload that fits the
    /// integer range comes back as an integer id, anything else as a string.
    pub async fn fetch_client_id(&self) -> Result<ClientId> {
        let resp: PbClientId = self
            .call(
                MSG_GET_CLIENT_ID_REQ,
                PbEmpty {}.encode_to_vec(),
                MSG_GET_CLIENT_ID_RESP,
            )
            .await?;
        let s = String::from_utf8_lossy(&resp.client_id).into_owned();
        Ok(match s.parse::<u64>() {
            Ok(n) if n < MAX_CLIENT_ID => ClientId::Num(n),
            _ => ClientId::Str(s),
        })
    }

    pub async fn push_client_id(&self, id: &ClientId) -> Result<()> {
        let req = PbClientId {
            client_id: id.to_string().into_bytes(),
        };
        let _: PbEmpty = self
            .call(
                MSG_SET_CLIENT_ID_REQ,
                req.encode_to_vec(),
                MSG_SET_CLIENT_ID_RESP,
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Read one frame from the server side of a duplex pipe.
    async fn read_frame<S: AsyncRead + Unpin>(stream: &mut S) -> (u8, Vec<u8>) {
        let mut len_buf = [0u8; 4];
        stream.read_exact(&mut len_buf).await.unwrap();
        let len = u32::from_be_bytes(len_buf) as usize;
        let mut code = [0u8; 1];
        stream.read_exact(&mut code).await.unwrap();
        let mut body = vec![0u8; len - 1];
        stream.read_exact(&mut body).await.unwrap();
        (code[0], body)
    }

    async fn write_frame<S: AsyncWrite + Unpin>(stream: &mut S, code: u8, body: &[u8]) {
        let mut frame = BytesMut::with_capacity(body.len() + 5);
        frame.put_u32(body.len() as u32 + 1);
        frame.put_u8(code);
        frame.put_slice(body);
        stream.write_all(&frame).await.unwrap();
    }

    #[tokio::test]
    async fn test_roundtrip_ping() {
        let (mut client, mut server) = tokio::io::duplex(1024);

        let server_task = tokio::spawn(async move {
            let (code, _body) = read_frame(&mut server).await;
            assert_eq!(code, MSG_PING_REQ);
            write_frame(&mut server, MSG_PING_RESP, &PbEmpty {}.encode_to_vec()).await;
        });

        let (code, payload) =
            PbBackend::roundtrip(&mut client, MSG_PING_REQ, &PbEmpty {}.encode_to_vec())
                .await
                .unwrap();
        assert_eq!(code, MSG_PING_RESP);
        PbEmpty::decode(payload.as_slice()).unwrap();

        server_task.await.unwrap();
    }

    #[tokio::test]
    async fn test_roundtrip_get() {
        let (mut client, mut server) = tokio::io::duplex(1024);

        let server_task = tokio::spawn(async move {
            let (code, body) = read_frame(&mut server).await;
            assert_eq!(code, MSG_GET_REQ);
            let req = PbGetReq::decode(body.as_slice()).unwrap();
            assert_eq!(req.bucket, b"widgets");
            assert_eq!(req.key, b"w1");
            let resp = PbGetResp {
                value: Some(b"payload".to_vec()),
            };
            write_frame(&mut server, MSG_GET_RESP, &resp.encode_to_vec()).await;
        });

        let req = PbGetReq {
            bucket: b"widgets".to_vec(),
            key: b"w1".to_vec(),
        };
        let (code, payload) = PbBackend::roundtrip(&mut client, MSG_GET_REQ, &req.encode_to_vec())
            .await
            .unwrap();
        assert_eq!(code, MSG_GET_RESP);
        let resp = PbGetResp::decode(payload.as_slice()).unwrap();
        assert_eq!(resp.value.as_deref(), Some(&b"payload"[..]));

        server_task.await.unwrap();
    }

    #[test]
    fn test_bucket_props_conversion() {
        let props = BucketProps {
            n_val: 5,
            allow_mult: true,
            last_write_wins: false,
        };
        let wire: PbBucketProps = (&props).into();
        let back: BucketProps = wire.into();
        assert_eq!(back, props);
    }
}
