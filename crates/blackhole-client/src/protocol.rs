//! JSON bodies exchanged with the block store.
//!
//! `POST {base_url}/check?type=<CHANNEL>` with [`CheckRequest`] answers [`CheckResponse`].
//! `POST {base_url}/upload?type=<CHANNEL>` with [`UploadRequest`] answers an empty body.

use blackhole_reduce::{Channel, ContentIdentity};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Existence check for a list of hex identities
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckRequest {
    pub hashes: Vec<String>,
    #[serde(rename = "type")]
    pub block_type: Channel,
}

impl CheckRequest {
    pub fn new(identities: &[ContentIdentity], channel: Channel) -> Self {
        Self {
            hashes: identities.iter().map(ContentIdentity::to_hex).collect(),
            block_type: channel,
        }
    }
}

/// Subset of the requested identities the store does not hold
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResponse {
    #[serde(default)]
    pub missing: Vec<String>,
}

/// One block to upload. `data` travels as standard base64.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockDto {
    pub hash: String,
    #[serde(with = "base64_bytes")]
    pub data: Bytes,
    #[serde(rename = "type")]
    pub block_type: Channel,
}

impl BlockDto {
    pub fn new(identity: &ContentIdentity, data: Bytes, channel: Channel) -> Self {
        Self {
            hash: identity.to_hex(),
            data,
            block_type: channel,
        }
    }
}

/// One upload batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadRequest {
    pub blocks: Vec<BlockDto>,
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use bytes::Bytes;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(data: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(data))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Bytes, D::Error> {
        let s = String::deserialize(deserializer)?;
        STANDARD
            .decode(s.as_bytes())
            .map(Bytes::from)
            .map_err(serde::de::Error::custom)
    }
}
