//! Fixed 8x8 block decomposition of a padded RGB raster.

use core::fmt;
use image::RgbImage;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::channel::Channel;
use crate::error::{ReduceError, Result};
use crate::rct::{self, Rgb, Yuv};

/// Block edge length in pixels.
pub const BLOCK_DIM: u32 = 8;
/// Pixels per block.
pub const PIXELS_PER_BLOCK: usize = (BLOCK_DIM * BLOCK_DIM) as usize;
/// Y payload: one byte per pixel.
pub const LUMA_PAYLOAD_LEN: usize = PIXELS_PER_BLOCK;
/// U/V payload: one big-endian i16 per pixel.
pub const CHROMA_PAYLOAD_LEN: usize = PIXELS_PER_BLOCK * 2;
/// Position maps and hash lists use signed 32-bit counts on disk.
pub const MAX_TOTAL_BLOCKS: u64 = i32::MAX as u64;

/// How pixels beyond the original bounds are filled before tiling.
/// Padding is cropped away on reconstruction; the policy only affects
/// the identity of border blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaddingPolicy {
    /// Replicate the nearest edge pixel
    #[default]
    Edge,
    /// Fill with (0, 0, 0)
    Black,
}

impl fmt::Display for PaddingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaddingPolicy::Edge => write!(f, "edge"),
            PaddingPolicy::Black => write!(f, "black"),
        }
    }
}

/// Block layout of an image: original size and padded tile counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockGrid {
    /// Original width in pixels
    pub width: u32,
    /// Original height in pixels
    pub height: u32,
    /// Blocks per row
    pub blocks_wide: u32,
    /// Block rows
    pub blocks_high: u32,
}

impl BlockGrid {
    /// Compute the grid for a `width` x `height` image.
    /// Rejects empty images and grids whose block count does not fit the container.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(ReduceError::Validation(format!(
                "image dimensions must be non-zero: {}x{}",
                width, height
            )));
        }
        let grid = Self {
            width,
            height,
            blocks_wide: width.div_ceil(BLOCK_DIM),
            blocks_high: height.div_ceil(BLOCK_DIM),
        };
        let total = u64::from(grid.blocks_wide) * u64::from(grid.blocks_high);
        if total > MAX_TOTAL_BLOCKS {
            return Err(ReduceError::Validation(format!(
                "{}x{} image needs {} blocks, limit is {}",
                width, height, total, MAX_TOTAL_BLOCKS
            )));
        }
        Ok(grid)
    }

    /// Width rounded up to a multiple of 8
    pub fn padded_width(&self) -> u32 {
        self.blocks_wide * BLOCK_DIM
    }

    /// Height rounded up to a multiple of 8
    pub fn padded_height(&self) -> u32 {
        self.blocks_high * BLOCK_DIM
    }

    /// `(paddedWidth / 8) * (paddedHeight / 8)`
    pub fn total_blocks(&self) -> usize {
        self.blocks_wide as usize * self.blocks_high as usize
    }

    /// Top-left pixel of block `index` (row-major block order)
    pub fn block_origin(&self, index: usize) -> (u32, u32) {
        let bw = self.blocks_wide as usize;
        let bx = (index % bw) as u32 * BLOCK_DIM;
        let by = (index / bw) as u32 * BLOCK_DIM;
        (bx, by)
    }
}

/// One 8x8 tile after the forward transform.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Block {
    y: [u8; LUMA_PAYLOAD_LEN],
    u_packed: [u8; CHROMA_PAYLOAD_LEN],
    v_packed: [u8; CHROMA_PAYLOAD_LEN],
}

impl Default for Block {
    fn default() -> Self {
        Self {
            y: [0; LUMA_PAYLOAD_LEN],
            u_packed: [0; CHROMA_PAYLOAD_LEN],
            v_packed: [0; CHROMA_PAYLOAD_LEN],
        }
    }
}

impl Block {
    /// Rebuild a block from stored channel payloads, checking their lengths.
    pub fn from_payloads(y: &[u8], u_packed: &[u8], v_packed: &[u8]) -> Result<Self> {
        let mut block = Block::default();
        for (channel, src) in [
            (Channel::Luma, y),
            (Channel::ChromaCb, u_packed),
            (Channel::ChromaCr, v_packed),
        ] {
            if src.len() != channel.payload_len() {
                return Err(ReduceError::Validation(format!(
                    "{} payload must be {} bytes, got {}",
                    channel,
                    channel.payload_len(),
                    src.len()
                )));
            }
        }
        block.y.copy_from_slice(y);
        block.u_packed.copy_from_slice(u_packed);
        block.v_packed.copy_from_slice(v_packed);
        Ok(block)
    }

    /// Y bytes, row-major
    pub fn y(&self) -> &[u8] {
        &self.y
    }

    /// U as 64 big-endian i16, row-major
    pub fn u_packed(&self) -> &[u8] {
        &self.u_packed
    }

    /// V as 64 big-endian i16, row-major
    pub fn v_packed(&self) -> &[u8] {
        &self.v_packed
    }

    /// Payload for `channel`
    pub fn payload(&self, channel: Channel) -> &[u8] {
        match channel {
            Channel::Luma => &self.y,
            Channel::ChromaCb => &self.u_packed,
            Channel::ChromaCr => &self.v_packed,
        }
    }

    /// Store a transformed pixel at `idx` (0..64, row-major)
    pub fn set(&mut self, idx: usize, px: Yuv) {
        self.y[idx] = px.y;
        self.u_packed[idx * 2..idx * 2 + 2].copy_from_slice(&px.u.to_be_bytes());
        self.v_packed[idx * 2..idx * 2 + 2].copy_from_slice(&px.v.to_be_bytes());
    }

    /// Read the transformed pixel at `idx` (0..64, row-major)
    pub fn get(&self, idx: usize) -> Yuv {
        Yuv {
            y: self.y[idx],
            u: i16::from_be_bytes([self.u_packed[idx * 2], self.u_packed[idx * 2 + 1]]),
            v: i16::from_be_bytes([self.v_packed[idx * 2], self.v_packed[idx * 2 + 1]]),
        }
    }
}

/// Output of [`BlockDecomposer::decompose`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decomposition {
    /// Grid the blocks were cut from
    pub grid: BlockGrid,
    /// Blocks in row-major block order
    pub blocks: Vec<Block>,
}

/// Tiles an image into 8x8 RCT blocks. Holds no state between calls.
#[derive(Debug, Clone, Default)]
pub struct BlockDecomposer {
    padding: PaddingPolicy,
}

impl BlockDecomposer {
    /// Create a decomposer with the given padding policy
    pub fn new(padding: PaddingPolicy) -> Self {
        Self { padding }
    }

    /// Padding policy in use
    pub fn padding(&self) -> PaddingPolicy {
        self.padding
    }

    /// Split `image` into blocks, row-major by block then by pixel.
    pub fn decompose(&self, image: &RgbImage) -> Result<Decomposition> {
        let grid = BlockGrid::new(image.width(), image.height())?;
        let mut blocks = Vec::with_capacity(grid.total_blocks());

        for index in 0..grid.total_blocks() {
            let (bx, by) = grid.block_origin(index);
            let mut block = Block::default();
            for yoff in 0..BLOCK_DIM {
                for xoff in 0..BLOCK_DIM {
                    let px = self.block_pixel(image, &grid, bx, by, xoff, yoff)?;
                    let idx = (yoff * BLOCK_DIM + xoff) as usize;
                    block.set(idx, rct::forward(px)?);
                }
            }
            blocks.push(block);
        }

        debug!(
            width = grid.width,
            height = grid.height,
            padded_width = grid.padded_width(),
            padded_height = grid.padded_height(),
            blocks = blocks.len(),
            padding = %self.padding,
            "image decomposed"
        );
        Ok(Decomposition { grid, blocks })
    }

    /// Pixel at offset (`xoff`, `yoff`) of the block whose origin is (`bx`, `by`),
    /// sampled from the padded grid.
    pub fn block_pixel(
        &self,
        image: &RgbImage,
        grid: &BlockGrid,
        bx: u32,
        by: u32,
        xoff: u32,
        yoff: u32,
    ) -> Result<Rgb> {
        if bx % BLOCK_DIM != 0 || by % BLOCK_DIM != 0 {
            return Err(ReduceError::Validation(format!(
                "block coordinates must be multiples of 8: bx={}, by={}",
                bx, by
            )));
        }
        if xoff >= BLOCK_DIM || yoff >= BLOCK_DIM {
            return Err(ReduceError::Validation(format!(
                "offsets must be in range 0-7: xoff={}, yoff={}",
                xoff, yoff
            )));
        }
        let (x, y) = (bx + xoff, by + yoff);
        if x >= grid.padded_width() || y >= grid.padded_height() {
            return Err(ReduceError::Validation(format!(
                "coordinates ({}, {}) exceed padded grid {}x{}",
                x,
                y,
                grid.padded_width(),
                grid.padded_height()
            )));
        }

        if x < image.width() && y < image.height() {
            return Ok(Rgb::from(*image.get_pixel(x, y)));
        }
        match self.padding {
            PaddingPolicy::Black => Ok(Rgb::BLACK),
            PaddingPolicy::Edge => {
                let cx = x.min(image.width() - 1);
                let cy = y.min(image.height() - 1);
                Ok(Rgb::from(*image.get_pixel(cx, cy)))
            }
        }
    }
}
