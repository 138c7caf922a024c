//! Directory scan and per-file processing.
//!
//! Each image is decoded, reduced and written on the blocking pool, then its
//! three channels are synchronized with the store. A failure is confined to
//! its own file.

use blackhole_reduce::{container_path, write_container_file, ImagePipeline, PerChannel, ProcessedImage};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task;
use tracing::{error, info, instrument, warn};

use crate::client::BlockStoreClient;
use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::sync::{sync_image, ChannelSyncReport};
use crate::transport::{BlockTransport, HttpTransport};

/// Everything learned about one successfully processed image.
#[derive(Debug, Clone)]
pub struct ImageReport {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub total_blocks: usize,
    /// Distinct payloads per channel
    pub unique: PerChannel<usize>,
    /// Where the container was written and its size in bytes
    pub container: Option<(PathBuf, u64)>,
    /// Present when uploading is enabled
    pub sync: Option<PerChannel<ChannelSyncReport>>,
}

impl ImageReport {
    /// True if every channel was checked and every batch uploaded (or uploading is off)
    pub fn fully_synced(&self) -> bool {
        self.sync
            .as_ref()
            .map(|s| s.iter().all(|(_, r)| r.is_complete()))
            .unwrap_or(true)
    }
}

#[derive(Debug)]
pub enum FileOutcome {
    Processed(ImageReport),
    Failed { path: PathBuf, error: String },
}

impl FileOutcome {
    pub fn path(&self) -> &Path {
        match self {
            FileOutcome::Processed(r) => &r.path,
            FileOutcome::Failed { path, .. } => path,
        }
    }
}

/// Per-file outcomes of one directory run, in file name order.
#[derive(Debug)]
pub struct DirectoryReport {
    pub directory: PathBuf,
    pub files: Vec<FileOutcome>,
}

impl DirectoryReport {
    pub fn processed(&self) -> usize {
        self.files
            .iter()
            .filter(|f| matches!(f, FileOutcome::Processed(_)))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.files.len() - self.processed()
    }
}

/// Drives the pipeline and the block store over files and directories.
pub struct FileProcessor<T> {
    config: ClientConfig,
    pipeline: ImagePipeline,
    client: BlockStoreClient<T>,
    workers: Arc<Semaphore>,
}

impl FileProcessor<HttpTransport> {
    /// Processor talking HTTP to `config.base_url`
    pub fn from_config(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let transport = HttpTransport::new(&config.base_url, config.timeout())?;
        let client = BlockStoreClient::new(transport, config.batch_size);
        Ok(Self::new(config, client))
    }
}

impl<T: BlockTransport> FileProcessor<T> {
    pub fn new(config: ClientConfig, client: BlockStoreClient<T>) -> Self {
        let pipeline = ImagePipeline::new(config.pipeline());
        let workers = Arc::new(Semaphore::new(config.workers.max(1)));
        Self {
            config,
            pipeline,
            client,
            workers,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn client(&self) -> &BlockStoreClient<T> {
        &self.client
    }

    /// Image files in `dir` matching the configured extensions, sorted by name.
    pub fn list_images(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let unreadable = |source| ClientError::DirectoryUnreadable {
            path: dir.to_path_buf(),
            source,
        };
        let mut files = Vec::new();
        for entry in std::fs::read_dir(dir).map_err(unreadable)? {
            let path = entry.map_err(unreadable)?.path();
            if path.is_file() && self.config.accepts(&path) {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    /// Process every matching image in `dir`, at most `workers` at a time.
    /// Only an unreadable directory is an error; per-file failures are reported.
    #[instrument(skip(self, dir), fields(dir = %dir.display()))]
    pub async fn process_directory(&self, dir: &Path) -> Result<DirectoryReport> {
        let files = self.list_images(dir)?;
        if files.is_empty() {
            warn!("No image files found in {}", dir.display());
        } else {
            info!("Found {} image files in {}", files.len(), dir.display());
        }

        let tasks = files.into_iter().map(|path| async move {
            let _permit = self.workers.acquire().await;
            match self.process_file(&path).await {
                Ok(report) => FileOutcome::Processed(report),
                Err(e) => {
                    error!("Error processing file {}: {}", path.display(), e);
                    FileOutcome::Failed {
                        path,
                        error: e.to_string(),
                    }
                }
            }
        });
        let outcomes = futures::future::join_all(tasks).await;

        Ok(DirectoryReport {
            directory: dir.to_path_buf(),
            files: outcomes,
        })
    }

    /// Reduce one image, write its container and synchronize its blocks.
    pub async fn process_file(&self, path: &Path) -> Result<ImageReport> {
        info!("Processing file: {}", path.display());

        let pipeline = self.pipeline.clone();
        let write_container = self.config.write_container;
        let owned = path.to_path_buf();
        let (processed, container) = task::spawn_blocking(move || reduce_file(&pipeline, &owned, write_container))
            .await
            .map_err(|e| ClientError::Io(std::io::Error::other(e)))??;

        let sync = if self.config.upload {
            Some(sync_image(&self.client, &processed.dedup).await)
        } else {
            None
        };

        let stats = &processed.stats;
        info!(
            "File '{}' processed: {} Y blocks, {} U blocks, {} V blocks (unique)",
            processed.file_name, stats.unique.luma, stats.unique.chroma_cb, stats.unique.chroma_cr
        );
        Ok(ImageReport {
            path: path.to_path_buf(),
            width: processed.width,
            height: processed.height,
            total_blocks: stats.total_blocks,
            unique: stats.unique.clone(),
            container,
            sync,
        })
    }
}

fn reduce_file(
    pipeline: &ImagePipeline,
    path: &Path,
    write_container: bool,
) -> Result<(ProcessedImage, Option<(PathBuf, u64)>)> {
    let processed = pipeline.process_path(path)?;
    let container = if write_container {
        let out = container_path(path);
        let written = write_container_file(&out, &processed.container)?;
        Some((out, written))
    } else {
        None
    };
    Ok((processed, container))
}
