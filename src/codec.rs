//! Conversions between user keys/values and the bytes sent to the server.

use bytes::Bytes;

use crate::error::Error;

/// Encodes keys and values into bytes and decodes them back from replies
pub trait Codec: Send + Sync {
    /// The key type
    type Key: Send + Sync;
    /// The value type
    type Value: Send + Sync;

    /// Encode a key
    fn encode_key(&self, key: &Self::Key) -> Bytes;

    /// Decode a key received in a reply
    fn decode_key(&self, bytes: Bytes) -> Result<Self::Key, Error>;

    /// Encode a value
    fn encode_value(&self, value: &Self::Value) -> Bytes;

    /// Decode a value received in a reply
    fn decode_value(&self, bytes: Bytes) -> Result<Self::Value, Error>;
}

/// Passes raw bytes through unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct BytesCodec;

impl Codec for BytesCodec {
    type Key = Bytes;
    type Value = Bytes;

    fn encode_key(&self, key: &Bytes) -> Bytes {
        key.clone()
    }

    fn decode_key(&self, bytes: Bytes) -> Result<Bytes, Error> {
        Ok(bytes)
    }

    fn encode_value(&self, value: &Bytes) -> Bytes {
        value.clone()
    }

    fn decode_value(&self, bytes: Bytes) -> Result<Bytes, Error> {
        Ok(bytes)
    }
}

/// Keys and values are UTF-8 strings
#[derive(Debug, Clone, Copy, Default)]
pub struct Utf8Codec;

impl Codec for Utf8Codec {
    type Key = String;
    type Value = String;

    fn encode_key(&self, key: &String) -> Bytes {
        Bytes::copy_from_slice(key.as_bytes())
    }

    fn decode_key(&self, bytes: Bytes) -> Result<String, Error> {
        Ok(String::from_utf8(bytes.to_vec())?)
    }

    fn encode_value(&self, value: &String) -> Bytes {
        Bytes::copy_from_slice(value.as_bytes())
    }

    fn decode_value(&self, bytes: Bytes) -> Result<String, Error> {
        Ok(String::from_utf8(bytes.to_vec())?)
    }
}
