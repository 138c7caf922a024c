//! Per-channel synchronization of an image's unique blocks with the store.

use blackhole_reduce::{Channel, ContentIdentity, Deduplicated, IdentityScheme, PerChannel, UniqueBlockSet};
use bytes::Bytes;
use std::collections::HashMap;
use tracing::{error, info};

use crate::batch::UploadReport;
use crate::client::BlockStoreClient;
use crate::transport::BlockTransport;

/// Result of the existence check for one channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    /// The store answered
    Checked {
        /// Identities asked about
        checked: usize,
        /// Identities the store lacked
        missing: usize,
    },
    /// The check failed; nothing was uploaded for this channel
    Failed(String),
}

/// Check and upload results for one channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSyncReport {
    pub channel: Channel,
    pub check: CheckOutcome,
    pub upload: UploadReport,
}

impl ChannelSyncReport {
    /// True if the check succeeded and every upload batch was accepted
    pub fn is_complete(&self) -> bool {
        matches!(self.check, CheckOutcome::Checked { .. }) && self.upload.all_succeeded()
    }
}

/// Check which of `unique` the store lacks, then upload only those.
///
/// Identities are recomputed with [`IdentityScheme::LengthPrefixedDigest`], the
/// scheme the store keys blocks by. A failed check uploads nothing.
pub async fn sync_channel<T: BlockTransport>(
    client: &BlockStoreClient<T>,
    unique: &UniqueBlockSet,
    channel: Channel,
) -> ChannelSyncReport {
    let keyed = unique.rekeyed(IdentityScheme::LengthPrefixedDigest);
    let identities: Vec<ContentIdentity> = keyed.iter().map(|(id, _)| *id).collect();

    let missing = match client.check_missing(&identities, channel).await {
        Ok(missing) => missing,
        Err(e) => {
            error!(channel = %channel, "Error checking missing blocks: {}", e);
            return ChannelSyncReport {
                channel,
                check: CheckOutcome::Failed(e.to_string()),
                upload: UploadReport::default(),
            };
        }
    };
    let check = CheckOutcome::Checked {
        checked: identities.len(),
        missing: missing.len(),
    };

    if missing.is_empty() {
        info!(channel = %channel, "All {} blocks already exist, no upload needed", channel);
        return ChannelSyncReport {
            channel,
            check,
            upload: UploadReport::default(),
        };
    }

    info!(channel = %channel, "Uploading {} missing {} blocks", missing.len(), channel);
    let payloads: HashMap<ContentIdentity, Bytes> = keyed.into_iter().collect();
    let to_upload: Vec<(ContentIdentity, Bytes)> = missing
        .into_iter()
        .filter_map(|id| payloads.get(&id).map(|data| (id, data.clone())))
        .collect();
    let upload = client.upload_batches(&to_upload, channel).await;

    ChannelSyncReport { channel, check, upload }
}

/// Synchronize all three channels of one image concurrently.
pub async fn sync_image<T: BlockTransport>(
    client: &BlockStoreClient<T>,
    dedup: &Deduplicated,
) -> PerChannel<ChannelSyncReport> {
    let (luma, chroma_cb, chroma_cr) = tokio::join!(
        sync_channel(client, &dedup.channels.luma.unique, Channel::Luma),
        sync_channel(client, &dedup.channels.chroma_cb.unique, Channel::ChromaCb),
        sync_channel(client, &dedup.channels.chroma_cr.unique, Channel::ChromaCr),
    );
    PerChannel::new(luma, chroma_cb, chroma_cr)
}
