//! BLHO v2 container: the persisted, deduplicated form of one image.
//!
//! Layout (big-endian throughout):
//! - magic `"BLHO"` (4 bytes)
//! - version (1 byte, currently 2)
//! - metadata length (i32) followed by that many bytes of UTF-8 JSON
//! - three hash lists, Y then U then V: count (i32) + count x 32-byte SHA-256
//! - three position maps, Y then U then V: count (i32) + count x i32 index

use bytes::BufMut;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::channel::{Channel, PerChannel};
use crate::dedupe::{Deduplicated, PositionMap};
use crate::error::{FormatError, ReduceError, Result};
use crate::fingerprint::{ContentIdentity, IdentityScheme, DIGEST_LEN};

/// Container magic
pub const MAGIC: [u8; 4] = *b"BLHO";
/// Current layout version
pub const FORMAT_VERSION: u8 = 2;
/// `format` value in the metadata JSON
pub const FORMAT_NAME: &str = "BLHO";
/// `version` value in the metadata JSON
pub const METADATA_VERSION: &str = "2.0";
/// File extension appended to the source image path
pub const CONTAINER_EXTENSION: &str = "blho";

/// JSON metadata stored after the header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerMetadata {
    /// Always "BLHO"
    pub format: String,
    /// Always "2.0"
    pub version: String,
    /// Name of the source image file
    pub file: String,
    /// Original width in pixels (before padding)
    pub width: u32,
    /// Original height in pixels (before padding)
    pub height: u32,
    /// Number of block positions
    pub total_blocks: u32,
    /// Distinct Y payloads
    pub unique_y_blocks: u32,
    /// Distinct U payloads
    pub unique_u_blocks: u32,
    /// Distinct V payloads
    pub unique_v_blocks: u32,
}

impl ContainerMetadata {
    fn unique_blocks(&self, channel: Channel) -> u32 {
        match channel {
            Channel::Luma => self.unique_y_blocks,
            Channel::ChromaCb => self.unique_u_blocks,
            Channel::ChromaCr => self.unique_v_blocks,
        }
    }
}

/// Everything a BLHO file holds: metadata, per-channel raw-digest hash lists and position maps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlhoContainer {
    /// JSON metadata
    pub metadata: ContainerMetadata,
    /// Unique block identities per channel, in index order
    pub hashes: PerChannel<Vec<ContentIdentity>>,
    /// Per-position indices into `hashes`
    pub positions: PerChannel<PositionMap>,
}

impl BlhoContainer {
    /// Build a container from a raw-digest deduplication of an image.
    pub fn from_dedup(file: &str, width: u32, height: u32, dedup: &Deduplicated) -> Result<Self> {
        if dedup.scheme != IdentityScheme::RawDigest {
            return Err(ReduceError::Validation(format!(
                "container hashes must use raw digests, got {:?}",
                dedup.scheme
            )));
        }
        let hashes = dedup.channels.as_ref().map(|_, c| c.unique.identities());
        let positions = dedup.channels.as_ref().map(|_, c| c.positions.clone());
        let container = Self {
            metadata: ContainerMetadata {
                format: FORMAT_NAME.to_string(),
                version: METADATA_VERSION.to_string(),
                file: file.to_string(),
                width,
                height,
                total_blocks: count_u32("position map", dedup.total_blocks())?,
                unique_y_blocks: count_u32("Y hash list", hashes.luma.len())?,
                unique_u_blocks: count_u32("U hash list", hashes.chroma_cb.len())?,
                unique_v_blocks: count_u32("V hash list", hashes.chroma_cr.len())?,
            },
            hashes,
            positions,
        };
        container.validate()?;
        Ok(container)
    }

    /// Number of block positions
    pub fn total_blocks(&self) -> usize {
        self.positions.luma.len()
    }

    /// Identity referenced by `channel` at block `position`
    pub fn identity_at(&self, channel: Channel, position: usize) -> std::result::Result<&ContentIdentity, FormatError> {
        let hashes = self.hashes.get(channel);
        let positions = self.positions.get(channel);
        let index = positions.get(position).ok_or(FormatError::CountMismatch {
            section: "position map",
            expected: position + 1,
            actual: positions.len(),
        })?;
        hashes.get(index as usize).ok_or(FormatError::IndexOutOfRange {
            channel,
            position,
            index,
            unique: hashes.len(),
        })
    }

    /// Check metadata counts against the lists and every index against its hash list.
    pub fn validate(&self) -> std::result::Result<(), FormatError> {
        if self.metadata.format != FORMAT_NAME {
            return Err(FormatError::InvalidMetadata(format!(
                "format must be {:?}, got {:?}",
                FORMAT_NAME, self.metadata.format
            )));
        }
        let total = self.metadata.total_blocks as usize;
        for (channel, hashes) in self.hashes.iter() {
            let declared = self.metadata.unique_blocks(channel) as usize;
            if hashes.len() != declared {
                return Err(FormatError::CountMismatch {
                    section: "hash list",
                    expected: declared,
                    actual: hashes.len(),
                });
            }
            if let Some(bad) = hashes.iter().find(|h| h.scheme() != IdentityScheme::RawDigest) {
                return Err(FormatError::InvalidMetadata(format!(
                    "{} hash {} is not a raw digest",
                    channel, bad
                )));
            }
            let positions = self.positions.get(channel);
            if positions.len() != total {
                return Err(FormatError::CountMismatch {
                    section: "position map",
                    expected: total,
                    actual: positions.len(),
                });
            }
            if let Some((position, index)) = positions.first_out_of_range(hashes.len()) {
                return Err(FormatError::IndexOutOfRange {
                    channel,
                    position,
                    index,
                    unique: hashes.len(),
                });
            }
        }
        Ok(())
    }
}

fn count_u32(section: &'static str, n: usize) -> std::result::Result<u32, FormatError> {
    i32::try_from(n)
        .map(|v| v as u32)
        .map_err(|_| FormatError::CountMismatch {
            section,
            expected: i32::MAX as usize,
            actual: n,
        })
}

/// Serialize a container. Validates first so no inconsistent file is ever written.
pub fn encode(container: &BlhoContainer) -> Result<Vec<u8>> {
    container.validate()?;
    let json = serde_json::to_vec(&container.metadata)
        .map_err(|e| FormatError::InvalidMetadata(e.to_string()))?;

    let hash_bytes: usize = container.hashes.iter().map(|(_, h)| 4 + h.len() * DIGEST_LEN).sum();
    let map_bytes: usize = container.positions.iter().map(|(_, p)| 4 + p.len() * 4).sum();
    let mut buf = Vec::with_capacity(MAGIC.len() + 1 + 4 + json.len() + hash_bytes + map_bytes);

    buf.put_slice(&MAGIC);
    buf.put_u8(FORMAT_VERSION);
    buf.put_i32(count_u32("metadata", json.len())? as i32);
    buf.put_slice(&json);

    for (_, hashes) in container.hashes.iter() {
        buf.put_i32(hashes.len() as i32);
        for hash in hashes {
            buf.put_slice(hash.as_bytes());
        }
    }
    for (_, positions) in container.positions.iter() {
        buf.put_i32(positions.len() as i32);
        for &index in positions.as_slice() {
            buf.put_i32(index as i32);
        }
    }
    Ok(buf)
}

/// Bounds-checked big-endian reader over the container bytes.
struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, n: usize, section: &'static str) -> std::result::Result<&'a [u8], FormatError> {
        if self.remaining() < n {
            return Err(FormatError::Truncated {
                section,
                needed: n,
                available: self.remaining(),
            });
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    fn read_u8(&mut self, section: &'static str) -> std::result::Result<u8, FormatError> {
        Ok(self.take(1, section)?[0])
    }

    fn read_i32(&mut self, section: &'static str) -> std::result::Result<i32, FormatError> {
        let b = self.take(4, section)?;
        Ok(i32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn read_len(&mut self, section: &'static str) -> std::result::Result<usize, FormatError> {
        let length = self.read_i32(section)?;
        usize::try_from(length).map_err(|_| FormatError::NegativeLength { section, length })
    }

    fn read_hashes(&mut self, section: &'static str) -> std::result::Result<Vec<ContentIdentity>, FormatError> {
        let count = self.read_len(section)?;
        let mut hashes = Vec::with_capacity(count.min(self.remaining() / DIGEST_LEN));
        for _ in 0..count {
            let available = self.remaining().min(DIGEST_LEN);
            if available < DIGEST_LEN {
                return Err(FormatError::InvalidHashLength {
                    expected: DIGEST_LEN,
                    actual: available,
                });
            }
            let bytes = self.take(DIGEST_LEN, section)?;
            hashes.push(ContentIdentity::from_slice(IdentityScheme::RawDigest, bytes)?);
        }
        Ok(hashes)
    }

    fn read_positions(&mut self, section: &'static str) -> std::result::Result<PositionMap, FormatError> {
        let count = self.read_len(section)?;
        let mut indices = Vec::with_capacity(count.min(self.remaining() / 4));
        for _ in 0..count {
            let index = self.read_i32(section)?;
            let index = u32::try_from(index)
                .map_err(|_| FormatError::NegativeLength { section, length: index })?;
            indices.push(index);
        }
        Ok(PositionMap::new(indices))
    }
}

/// Parse a container. Nothing is returned unless the whole input is valid.
pub fn decode(bytes: &[u8]) -> Result<BlhoContainer> {
    let mut r = Reader::new(bytes);

    let magic = r.take(MAGIC.len(), "magic")?;
    if magic != MAGIC {
        return Err(FormatError::BadMagic {
            found: String::from_utf8_lossy(magic).into_owned(),
        }
        .into());
    }
    let version = r.read_u8("version")?;
    if version != FORMAT_VERSION {
        return Err(FormatError::UnsupportedVersion {
            expected: FORMAT_VERSION,
            found: version,
        }
        .into());
    }

    let meta_len = r.read_len("metadata length")?;
    let meta_bytes = r.take(meta_len, "metadata")?;
    let metadata: ContainerMetadata = serde_json::from_slice(meta_bytes)
        .map_err(|e| FormatError::InvalidMetadata(e.to_string()))?;

    let hashes = PerChannel::new(
        r.read_hashes("Y hash list")?,
        r.read_hashes("U hash list")?,
        r.read_hashes("V hash list")?,
    );
    let positions = PerChannel::new(
        r.read_positions("Y position map")?,
        r.read_positions("U position map")?,
        r.read_positions("V position map")?,
    );
    if r.remaining() > 0 {
        return Err(FormatError::TrailingBytes(r.remaining()).into());
    }

    let container = BlhoContainer {
        metadata,
        hashes,
        positions,
    };
    container.validate()?;
    debug!(
        file = %container.metadata.file,
        total_blocks = container.total_blocks(),
        "container decoded"
    );
    Ok(container)
}

/// `<image path>.blho`
pub fn container_path(image_path: &Path) -> PathBuf {
    let mut name = image_path.as_os_str().to_owned();
    name.push(".");
    name.push(CONTAINER_EXTENSION);
    PathBuf::from(name)
}

/// Encode and write `container` to `path`. Returns the number of bytes written.
pub fn write_container_file(path: &Path, container: &BlhoContainer) -> Result<u64> {
    let bytes = encode(container)?;
    std::fs::write(path, &bytes)?;
    info!(
        path = %path.display(),
        total_blocks = container.total_blocks(),
        unique_y = container.hashes.luma.len(),
        unique_u = container.hashes.chroma_cb.len(),
        unique_v = container.hashes.chroma_cr.len(),
        size_kb = bytes.len() / 1024,
        "BLHO v2 written"
    );
    Ok(bytes.len() as u64)
}

/// Read and decode the container at `path`.
pub fn read_container_file(path: &Path) -> Result<BlhoContainer> {
    let bytes = std::fs::read(path)?;
    decode(&bytes)
}
