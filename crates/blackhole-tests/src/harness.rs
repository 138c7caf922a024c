//! Test Harness - temp directories, image fixtures and an in-memory block store

use async_trait::async_trait;
use blackhole_client::{BlockTransport, CheckRequest, CheckResponse, ClientError, UploadRequest};
use blackhole_reduce::{Channel, ContentIdentity, MemoryBlockSource, PerChannel};
use bytes::Bytes;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tempfile::TempDir;
use tracing::debug;

#[derive(Debug)]
pub struct TestEnv {
    temp_dir: TempDir,
}

impl TestEnv {
    pub fn new(prefix: &str) -> Self {
        let temp_dir = tempfile::Builder::new()
            .prefix(prefix)
            .tempdir()
            .expect("failed to create temp dir");
        Self { temp_dir }
    }

    pub fn tempdir(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Save `image` as PNG under the temp dir and return its path
    pub fn write_png(&self, name: &str, image: &image::RgbImage) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        image.save(&path).expect("failed to write fixture image");
        path
    }
}

pub mod fixtures {
    use image::{Rgb, RgbImage};

    pub fn solid(width: u32, height: u32, rgb: [u8; 3]) -> RgbImage {
        RgbImage::from_pixel(width, height, Rgb(rgb))
    }

    /// Every pixel different; defeats block dedup
    pub fn noise(width: u32, height: u32, seed: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            let v = x
                .wrapping_mul(2654435761)
                .wrapping_add(y.wrapping_mul(40503))
                .wrapping_add(seed.wrapping_mul(97));
            Rgb([v as u8, (v >> 8) as u8, (v >> 16) as u8])
        })
    }

    /// Vertical stripes one block wide cycling through `period` colors
    pub fn stripes(width: u32, height: u32, period: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, _| {
            let band = (x / 8) % period.max(1);
            Rgb([(band * 40) as u8, (band * 90 + 30) as u8, 128])
        })
    }
}

/// One request seen by [`InMemoryStore`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    Check { channel: Channel, hashes: usize },
    Upload { channel: Channel, blocks: usize },
}

/// Block store held in memory: per channel, hex hash → payload.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    blocks: Mutex<PerChannel<HashMap<String, Bytes>>>,
    calls: Mutex<Vec<StoreCall>>,
    failing_checks: HashSet<Channel>,
    failing_uploads: HashSet<usize>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks on `channel` fail with HTTP 500
    pub fn fail_checks_on(mut self, channel: Channel) -> Self {
        self.failing_checks.insert(channel);
        self
    }

    /// The `n`th upload request (0-based, all channels) fails with HTTP 503
    pub fn fail_upload_call(mut self, n: usize) -> Self {
        self.failing_uploads.insert(n);
        self
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        lock(&self.calls).clone()
    }

    pub fn upload_sizes(&self, channel: Channel) -> Vec<usize> {
        lock(&self.calls)
            .iter()
            .filter_map(|c| match c {
                StoreCall::Upload { channel: ch, blocks } if *ch == channel => Some(*blocks),
                _ => None,
            })
            .collect()
    }

    pub fn len(&self, channel: Channel) -> usize {
        lock(&self.blocks).get(channel).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.blocks).iter().all(|(_, m)| m.is_empty())
    }

    pub fn contains(&self, channel: Channel, identity: &ContentIdentity) -> bool {
        lock(&self.blocks).get(channel).contains_key(&identity.to_hex())
    }

    /// Everything stored, re-keyed by raw digest so a container can be rebuilt from it
    pub fn block_source(&self) -> MemoryBlockSource {
        let blocks = lock(&self.blocks);
        let mut source = MemoryBlockSource::new();
        for (channel, map) in blocks.iter() {
            for payload in map.values() {
                source.insert(channel, ContentIdentity::raw(payload), payload.clone());
            }
        }
        source
    }
}

#[async_trait]
impl BlockTransport for InMemoryStore {
    async fn check(&self, channel: Channel, request: &CheckRequest) -> blackhole_client::Result<CheckResponse> {
        lock(&self.calls).push(StoreCall::Check {
            channel,
            hashes: request.hashes.len(),
        });
        if self.failing_checks.contains(&channel) {
            return Err(ClientError::Status {
                url: "memory://check".into(),
                status: 500,
            });
        }
        let blocks = lock(&self.blocks);
        let held = blocks.get(channel);
        let missing = request
            .hashes
            .iter()
            .filter(|h| !held.contains_key(h.as_str()))
            .cloned()
            .collect();
        Ok(CheckResponse { missing })
    }

    async fn upload(&self, channel: Channel, request: &UploadRequest) -> blackhole_client::Result<()> {
        let call = {
            let mut calls = lock(&self.calls);
            let n = calls
                .iter()
                .filter(|c| matches!(c, StoreCall::Upload { .. }))
                .count();
            calls.push(StoreCall::Upload {
                channel,
                blocks: request.blocks.len(),
            });
            n
        };
        if self.failing_uploads.contains(&call) {
            return Err(ClientError::Status {
                url: "memory://upload".into(),
                status: 503,
            });
        }
        let mut blocks = lock(&self.blocks);
        let held = blocks.get_mut(channel);
        for block in &request.blocks {
            held.insert(block.hash.clone(), block.data.clone());
        }
        debug!(channel = %channel, blocks = request.blocks.len(), "stored batch");
        Ok(())
    }
}
