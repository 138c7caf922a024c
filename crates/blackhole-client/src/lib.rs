//! Blackhole block store client: check-then-upload sync of deduplicated image blocks
//!
//! Directory → Images (parallel, bounded) → Reduce + BLHO container → per channel: Check → Upload batches

pub mod batch;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod processor;
pub mod protocol;
pub mod sync;
pub mod transport;
pub mod validate;

pub use batch::{partition, BatchOutcome, BatchStatus, UploadReport};
pub use client::BlockStoreClient;
pub use config::ClientConfig;
pub use error::{ClientError, Result};
pub use processor::{DirectoryReport, FileOutcome, FileProcessor, ImageReport};
pub use protocol::{BlockDto, CheckRequest, CheckResponse, UploadRequest};
pub use sync::{sync_channel, sync_image, ChannelSyncReport, CheckOutcome};
pub use transport::{BlockTransport, HttpTransport};
pub use validate::validate_block;
