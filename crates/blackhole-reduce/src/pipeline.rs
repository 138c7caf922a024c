//! Per-image reduction pipeline: decode → pad → 8x8 RCT blocks → dedupe → BLHO container

use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, instrument};

use crate::block::{BlockDecomposer, PaddingPolicy};
use crate::container::BlhoContainer;
use crate::dedupe::{deduplicate, DedupStats, Deduplicated};
use crate::error::{ReduceError, Result};
use crate::fingerprint::IdentityScheme;

/// Configuration for the reduction pipeline
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// How partial border blocks are filled
    pub padding: PaddingPolicy,
}

/// Everything produced for one image
#[derive(Debug, Clone)]
pub struct ProcessedImage {
    /// Source file name as recorded in the container metadata
    pub file_name: String,
    /// Original width
    pub width: u32,
    /// Original height
    pub height: u32,
    /// Raw-digest deduplication, one index per channel
    pub dedup: Deduplicated,
    /// Container ready to encode
    pub container: BlhoContainer,
    /// Block counts before and after deduplication
    pub stats: DedupStats,
}

/// Stateless driver for a single image. Each call builds fresh dedup indices,
/// so one pipeline can be shared across threads.
#[derive(Debug, Clone, Default)]
pub struct ImagePipeline {
    decomposer: BlockDecomposer,
}

impl ImagePipeline {
    /// Create with config
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            decomposer: BlockDecomposer::new(config.padding),
        }
    }

    /// Padding policy in use
    pub fn padding(&self) -> PaddingPolicy {
        self.decomposer.padding()
    }

    /// Decompose and deduplicate an already decoded raster.
    #[instrument(skip(self, image), fields(width = image.width(), height = image.height()))]
    pub fn process(&self, file_name: &str, image: &RgbImage) -> Result<ProcessedImage> {
        let decomposition = self.decomposer.decompose(image)?;
        let dedup = deduplicate(&decomposition.blocks, IdentityScheme::RawDigest);
        let container = BlhoContainer::from_dedup(file_name, image.width(), image.height(), &dedup)?;
        let stats = dedup.stats();

        debug!(
            total_blocks = stats.total_blocks,
            unique_y = stats.unique.luma,
            unique_u = stats.unique.chroma_cb,
            unique_v = stats.unique.chroma_cr,
            dedup_ratio = stats.dedup_ratio(),
            "image reduced"
        );
        Ok(ProcessedImage {
            file_name: file_name.to_string(),
            width: image.width(),
            height: image.height(),
            dedup,
            container,
            stats,
        })
    }

    /// Decode the image at `path` (alpha dropped) and process it.
    #[instrument(skip(self, path), fields(path = %path.display()))]
    pub fn process_path(&self, path: &Path) -> Result<ProcessedImage> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| ReduceError::Validation(format!("{} has no file name", path.display())))?;
        let image = image::open(path)?.to_rgb8();
        self.process(&file_name, &image)
    }
}
