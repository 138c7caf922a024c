//! Rebuild the original raster from a container and a source of block payloads.

use bytes::Bytes;
use image::RgbImage;
use std::collections::HashMap;
use tracing::debug;

use crate::block::{Block, BlockGrid, BLOCK_DIM};
use crate::channel::{Channel, PerChannel};
use crate::container::BlhoContainer;
use crate::dedupe::Deduplicated;
use crate::error::{ReduceError, Result};
use crate::fingerprint::ContentIdentity;
use crate::rct;

/// Lookup of block payloads by channel and identity.
pub trait BlockSource {
    /// Payload stored for `identity` in `channel`, if present
    fn payload(&self, channel: Channel, identity: &ContentIdentity) -> Option<&[u8]>;
}

/// In-memory payload store.
#[derive(Debug, Clone, Default)]
pub struct MemoryBlockSource {
    blocks: PerChannel<HashMap<ContentIdentity, Bytes>>,
}

impl MemoryBlockSource {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a payload
    pub fn insert(&mut self, channel: Channel, identity: ContentIdentity, payload: Bytes) {
        self.blocks.get_mut(channel).insert(identity, payload);
    }

    /// Store holding every unique payload of a deduplicated image
    pub fn from_dedup(dedup: &Deduplicated) -> Self {
        let mut source = Self::new();
        for (channel, c) in dedup.channels.iter() {
            for entry in c.unique.iter() {
                source.insert(channel, entry.identity, entry.payload.clone());
            }
        }
        source
    }

    /// Number of payloads held for `channel`
    pub fn len(&self, channel: Channel) -> usize {
        self.blocks.get(channel).len()
    }

    /// True if no channel holds any payload
    pub fn is_empty(&self) -> bool {
        self.blocks.iter().all(|(_, m)| m.is_empty())
    }
}

impl BlockSource for MemoryBlockSource {
    fn payload(&self, channel: Channel, identity: &ContentIdentity) -> Option<&[u8]> {
        self.blocks.get(channel).get(identity).map(|b| b.as_ref())
    }
}

fn fetch<'a, S: BlockSource>(
    container: &BlhoContainer,
    source: &'a S,
    channel: Channel,
    index: usize,
) -> Result<&'a [u8]> {
    let identity = container.identity_at(channel, index)?;
    source
        .payload(channel, identity)
        .ok_or(ReduceError::MissingBlock {
            channel,
            identity: *identity,
        })
}

/// Reassemble the image described by `container`, cropped to its original size.
pub fn reconstruct<S: BlockSource>(container: &BlhoContainer, source: &S) -> Result<RgbImage> {
    container.validate()?;
    let meta = &container.metadata;
    let grid = BlockGrid::new(meta.width, meta.height)?;
    if grid.total_blocks() != container.total_blocks() {
        return Err(ReduceError::Validation(format!(
            "{}x{} image has {} blocks, container lists {}",
            meta.width,
            meta.height,
            grid.total_blocks(),
            container.total_blocks()
        )));
    }

    let mut image = RgbImage::new(meta.width, meta.height);
    for index in 0..grid.total_blocks() {
        let block = Block::from_payloads(
            fetch(container, source, Channel::Luma, index)?,
            fetch(container, source, Channel::ChromaCb, index)?,
            fetch(container, source, Channel::ChromaCr, index)?,
        )?;

        let (bx, by) = grid.block_origin(index);
        for yoff in 0..BLOCK_DIM {
            for xoff in 0..BLOCK_DIM {
                let (x, y) = (bx + xoff, by + yoff);
                if x >= meta.width || y >= meta.height {
                    continue;
                }
                let px = rct::inverse(block.get((yoff * BLOCK_DIM + xoff) as usize));
                image.put_pixel(x, y, px.into());
            }
        }
    }

    debug!(
        file = %meta.file,
        width = meta.width,
        height = meta.height,
        blocks = grid.total_blocks(),
        "image reconstructed"
    );
    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{BlockDecomposer, PaddingPolicy};
    use crate::dedupe::deduplicate;
    use crate::fingerprint::IdentityScheme;

    fn noisy(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            let v = x.wrapping_mul(2654435761).wrapping_add(y.wrapping_mul(40503));
            image::Rgb([v as u8, (v >> 8) as u8, (v >> 16) as u8])
        })
    }

    fn pack(image: &RgbImage, padding: PaddingPolicy) -> (BlhoContainer, MemoryBlockSource) {
        let d = BlockDecomposer::new(padding).decompose(image).unwrap();
        let dedup = deduplicate(&d.blocks, IdentityScheme::RawDigest);
        let container = BlhoContainer::from_dedup("t.png", image.width(), image.height(), &dedup).unwrap();
        (container, MemoryBlockSource::from_dedup(&dedup))
    }

    #[test]
    fn reconstruct_is_lossless_for_odd_sizes() {
        for (w, h) in [(1, 1), (7, 9), (13, 17), (16, 16), (33, 5)] {
            for padding in [PaddingPolicy::Edge, PaddingPolicy::Black] {
                let image = noisy(w, h);
                let (container, source) = pack(&image, padding);
                let rebuilt = reconstruct(&container, &source).unwrap();
                assert_eq!(rebuilt.dimensions(), (w, h));
                assert_eq!(rebuilt, image, "{}x{} with {} padding", w, h, padding);
            }
        }
    }

    #[test]
    fn missing_payload_is_reported() {
        let image = noisy(16, 8);
        let (container, _) = pack(&image, PaddingPolicy::Edge);
        let err = reconstruct(&container, &MemoryBlockSource::new()).unwrap_err();
        assert!(matches!(
            err,
            ReduceError::MissingBlock {
                channel: Channel::Luma,
                ..
            }
        ));
    }

    #[test]
    fn mismatched_grid_is_rejected() {
        let image = noisy(16, 8);
        let (mut container, source) = pack(&image, PaddingPolicy::Edge);
        container.metadata.width = 8;
        assert!(matches!(
            reconstruct(&container, &source),
            Err(ReduceError::Validation(_))
        ));
    }

    #[test]
    fn memory_source_counts() {
        let image = RgbImage::new(16, 16);
        let (_, source) = pack(&image, PaddingPolicy::Edge);
        assert!(!source.is_empty());
        for channel in Channel::ALL {
            assert_eq!(source.len(channel), 1);
        }
    }
}
