//! Check-then-upload protocol against the block store.

use blackhole_reduce::{Channel, ContentIdentity};
use bytes::Bytes;
use std::collections::HashSet;
use tracing::{error, info, warn};

use crate::batch::{batch_count, partition, BatchOutcome, BatchStatus, UploadReport};
use crate::error::Result;
use crate::protocol::{BlockDto, CheckRequest, UploadRequest};
use crate::transport::BlockTransport;
use crate::validate::validate_block;

/// Client for one block store. Holds no per-image state.
pub struct BlockStoreClient<T> {
    transport: T,
    batch_size: usize,
}

impl<T: BlockTransport> BlockStoreClient<T> {
    /// `batch_size` is clamped to at least 1.
    pub fn new(transport: T, batch_size: usize) -> Self {
        Self {
            transport,
            batch_size: batch_size.max(1),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Return the subset of `identities` the store does not hold, in input order.
    /// An empty input returns immediately without a request. Transport failures
    /// are returned to the caller, never mapped to "nothing missing" here.
    pub async fn check_missing(
        &self,
        identities: &[ContentIdentity],
        channel: Channel,
    ) -> Result<Vec<ContentIdentity>> {
        if identities.is_empty() {
            return Ok(Vec::new());
        }

        let request = CheckRequest::new(identities, channel);
        let response = self.transport.check(channel, &request).await?;
        let reported: HashSet<String> = response
            .missing
            .iter()
            .map(|h| h.to_ascii_lowercase())
            .collect();
        let missing: Vec<ContentIdentity> = identities
            .iter()
            .filter(|id| reported.contains(&id.to_hex()))
            .copied()
            .collect();

        info!(
            channel = %channel,
            checked = identities.len(),
            existing = identities.len() - missing.len(),
            missing = missing.len(),
            "Checked {} blocks → {} exist, {} missing",
            identities.len(),
            identities.len() - missing.len(),
            missing.len()
        );
        Ok(missing)
    }

    /// Upload `blocks` in order, one request per batch. A failed batch is
    /// recorded and the remaining batches are still attempted. Blocks that fail
    /// validation are dropped from their batch.
    pub async fn upload_batches(&self, blocks: &[(ContentIdentity, Bytes)], channel: Channel) -> UploadReport {
        let mut report = UploadReport::default();
        if blocks.is_empty() {
            info!(channel = %channel, "No blocks to upload");
            return report;
        }

        let total = batch_count(blocks.len(), self.batch_size);
        for (index, batch) in partition(blocks, self.batch_size).enumerate() {
            let mut dtos = Vec::with_capacity(batch.len());
            let mut invalid = 0;
            for (identity, data) in batch {
                let dto = BlockDto::new(identity, data.clone(), channel);
                match validate_block(&dto) {
                    Ok(()) => dtos.push(dto),
                    Err(e) => {
                        invalid += 1;
                        warn!(channel = %channel, hash = %dto.hash, error = %e, "skipping invalid block");
                    }
                }
            }

            let sent = dtos.len();
            let status = if dtos.is_empty() {
                BatchStatus::Skipped
            } else {
                let request = UploadRequest { blocks: dtos };
                match self.transport.upload(channel, &request).await {
                    Ok(()) => {
                        info!(channel = %channel, "Uploaded batch {}/{} ({} blocks)", index + 1, total, sent);
                        BatchStatus::Uploaded
                    }
                    Err(e) => {
                        error!(channel = %channel, "Upload failed for batch {}/{}: {}", index + 1, total, e);
                        BatchStatus::Failed(e.to_string())
                    }
                }
            };
            report.batches.push(BatchOutcome {
                index,
                size: batch.len(),
                sent,
                invalid,
                status,
            });
        }
        report
    }
}
