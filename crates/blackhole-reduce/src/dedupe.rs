//! Per-image content-addressable deduplication of block payloads
//!
//! Each channel gets its own index. Indices are assigned in first-seen order and
//! never renumbered, so identical input always yields identical output.

use bytes::Bytes;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use tracing::debug;

use crate::block::Block;
use crate::channel::{Channel, PerChannel};
use crate::fingerprint::{ContentIdentity, IdentityScheme};

/// A distinct payload and its identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniqueBlock {
    /// Identity of `payload` under the index's scheme
    pub identity: ContentIdentity,
    /// Channel payload bytes
    pub payload: Bytes,
}

/// Insertion-ordered set of distinct payloads; an entry's index is its position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UniqueBlockSet {
    entries: Vec<UniqueBlock>,
}

impl UniqueBlockSet {
    /// Number of distinct payloads
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no payload was recorded
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry assigned to `index`
    pub fn get(&self, index: u32) -> Option<&UniqueBlock> {
        self.entries.get(index as usize)
    }

    /// Entries in index order
    pub fn iter(&self) -> impl Iterator<Item = &UniqueBlock> {
        self.entries.iter()
    }

    /// Identities in index order
    pub fn identities(&self) -> Vec<ContentIdentity> {
        self.entries.iter().map(|e| e.identity).collect()
    }

    /// The same payloads keyed under another scheme, preserving index order.
    /// Used to hand container-deduplicated payloads to the block store protocol.
    pub fn rekeyed(&self, scheme: IdentityScheme) -> Vec<(ContentIdentity, Bytes)> {
        self.entries
            .iter()
            .map(|e| (ContentIdentity::compute(scheme, &e.payload), e.payload.clone()))
            .collect()
    }
}

/// Per-position indices into a channel's [`UniqueBlockSet`], row-major block order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PositionMap(Vec<u32>);

impl PositionMap {
    /// Wrap raw indices
    pub fn new(indices: Vec<u32>) -> Self {
        Self(indices)
    }

    /// Number of block positions
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if no positions are recorded
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Indices in position order
    pub fn as_slice(&self) -> &[u32] {
        &self.0
    }

    /// Index stored at `position`
    pub fn get(&self, position: usize) -> Option<u32> {
        self.0.get(position).copied()
    }

    /// Position of the first index that is `>= unique`, if any
    pub fn first_out_of_range(&self, unique: usize) -> Option<(usize, u32)> {
        self.0
            .iter()
            .enumerate()
            .find(|(_, idx)| **idx as usize >= unique)
            .map(|(pos, idx)| (pos, *idx))
    }
}

/// Content identity → first-seen index, for one channel of one image.
#[derive(Debug)]
pub struct DedupIndex {
    scheme: IdentityScheme,
    lookup: HashMap<ContentIdentity, u32>,
    unique: UniqueBlockSet,
    positions: Vec<u32>,
}

impl DedupIndex {
    /// Create an empty index hashing under `scheme`
    pub fn new(scheme: IdentityScheme) -> Self {
        Self {
            scheme,
            lookup: HashMap::new(),
            unique: UniqueBlockSet::default(),
            positions: Vec::new(),
        }
    }

    /// Create an empty index sized for `blocks` positions
    pub fn with_capacity(scheme: IdentityScheme, blocks: usize) -> Self {
        Self {
            scheme,
            lookup: HashMap::with_capacity(blocks),
            unique: UniqueBlockSet::default(),
            positions: Vec::with_capacity(blocks),
        }
    }

    /// Record the payload at the next block position and return its index.
    /// Unseen payloads are appended and get the next dense index.
    pub fn insert(&mut self, payload: &[u8]) -> u32 {
        let identity = ContentIdentity::compute(self.scheme, payload);
        let index = match self.lookup.entry(identity) {
            Entry::Occupied(e) => *e.get(),
            Entry::Vacant(e) => {
                let next = self.unique.entries.len() as u32;
                self.unique.entries.push(UniqueBlock {
                    identity,
                    payload: Bytes::copy_from_slice(payload),
                });
                *e.insert(next)
            }
        };
        self.positions.push(index);
        index
    }

    /// Consume the index, keeping the unique set and position map
    pub fn finish(self) -> ChannelDedup {
        ChannelDedup {
            unique: self.unique,
            positions: PositionMap(self.positions),
        }
    }
}

/// Deduplicated view of one channel
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelDedup {
    /// Distinct payloads in first-seen order
    pub unique: UniqueBlockSet,
    /// One index per block position
    pub positions: PositionMap,
}

/// Block counts before and after deduplication
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DedupStats {
    /// Block positions in the image
    pub total_blocks: usize,
    /// Distinct payloads per channel
    pub unique: PerChannel<usize>,
}

impl DedupStats {
    /// Blocks eliminated in `channel`
    pub fn deduplicated(&self, channel: Channel) -> usize {
        self.total_blocks.saturating_sub(*self.unique.get(channel))
    }

    /// `total_blocks / unique` over all three channels
    pub fn dedup_ratio(&self) -> f64 {
        let unique: usize = self.unique.iter().map(|(_, n)| *n).sum();
        if unique > 0 {
            (self.total_blocks * 3) as f64 / unique as f64
        } else {
            1.0
        }
    }
}

/// All three channels of one image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deduplicated {
    /// Per-channel unique sets and position maps
    pub channels: PerChannel<ChannelDedup>,
    /// Scheme used for the identities
    pub scheme: IdentityScheme,
}

impl Deduplicated {
    /// Number of block positions (same for every channel)
    pub fn total_blocks(&self) -> usize {
        self.channels.luma.positions.len()
    }

    /// Dedup view of `channel`
    pub fn channel(&self, channel: Channel) -> &ChannelDedup {
        self.channels.get(channel)
    }

    /// Counts before and after deduplication
    pub fn stats(&self) -> DedupStats {
        DedupStats {
            total_blocks: self.total_blocks(),
            unique: self.channels.as_ref().map(|_, c| c.unique.len()),
        }
    }
}

/// Deduplicate every channel of `blocks` with a fresh index per channel.
pub fn deduplicate(blocks: &[Block], scheme: IdentityScheme) -> Deduplicated {
    let channels = PerChannel::from_fn(|channel| {
        let mut index = DedupIndex::with_capacity(scheme, blocks.len());
        for block in blocks {
            index.insert(block.payload(channel));
        }
        let result = index.finish();
        debug!(
            channel = %channel,
            total = result.positions.len(),
            unique = result.unique.len(),
            "channel deduplicated"
        );
        result
    });
    Deduplicated { channels, scheme }
}
