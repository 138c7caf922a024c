#![warn(missing_docs)]

//! Blackhole reduction subsystem: reversible color transform, 8x8 block dedupe (SHA-256), BLHO container
//!
//! Write path: Image → Pad → 8x8 Blocks (RCT) → Dedupe per channel → BLHO container
//! Read path:  BLHO container → Position maps → Block payloads → Inverse RCT → Image

pub mod block;
pub mod channel;
pub mod container;
pub mod dedupe;
pub mod error;
pub mod fingerprint;
pub mod pipeline;
pub mod rct;
pub mod reconstruct;

pub use block::{Block, BlockDecomposer, BlockGrid, Decomposition, PaddingPolicy, BLOCK_DIM};
pub use channel::{Channel, PerChannel};
pub use container::{
    container_path, decode, encode, read_container_file, write_container_file, BlhoContainer,
    ContainerMetadata, FORMAT_VERSION, MAGIC,
};
pub use dedupe::{deduplicate, ChannelDedup, DedupIndex, DedupStats, Deduplicated, PositionMap, UniqueBlock, UniqueBlockSet};
pub use error::{FormatError, ReduceError, Result};
pub use fingerprint::{ContentIdentity, IdentityScheme, DIGEST_LEN};
pub use pipeline::{ImagePipeline, PipelineConfig, ProcessedImage};
pub use rct::{Rgb, Yuv};
pub use reconstruct::{reconstruct, BlockSource, MemoryBlockSource};
