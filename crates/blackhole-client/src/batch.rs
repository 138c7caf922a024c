//! Upload batching and per-batch outcomes.

/// Split `items` into consecutive slices of at most `size` elements, in order.
/// A `size` of zero is treated as one.
pub fn partition<T>(items: &[T], size: usize) -> impl Iterator<Item = &[T]> {
    items.chunks(size.max(1))
}

/// Number of batches [`partition`] yields
pub fn batch_count(len: usize, size: usize) -> usize {
    len.div_ceil(size.max(1))
}

/// What happened to one upload batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchStatus {
    /// The store accepted the request
    Uploaded,
    /// The request failed; later batches were still attempted
    Failed(String),
    /// Every block in the batch failed validation, nothing was sent
    Skipped,
}

/// Result of one upload batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOutcome {
    /// 0-based batch number
    pub index: usize,
    /// Blocks in the batch before validation
    pub size: usize,
    /// Blocks actually sent
    pub sent: usize,
    /// Blocks dropped by validation
    pub invalid: usize,
    pub status: BatchStatus,
}

impl BatchOutcome {
    pub fn succeeded(&self) -> bool {
        self.status == BatchStatus::Uploaded
    }
}

/// Summary of an upload across all batches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadReport {
    /// Outcomes in batch order
    pub batches: Vec<BatchOutcome>,
}

impl UploadReport {
    /// Returns true if every batch was uploaded.
    pub fn all_succeeded(&self) -> bool {
        self.batches.iter().all(BatchOutcome::succeeded)
    }

    /// Returns true if any batch failed.
    pub fn any_failed(&self) -> bool {
        self.batches
            .iter()
            .any(|b| matches!(b.status, BatchStatus::Failed(_)))
    }

    /// Blocks in batches the store accepted
    pub fn uploaded_blocks(&self) -> usize {
        self.batches.iter().filter(|b| b.succeeded()).map(|b| b.sent).sum()
    }

    /// Blocks in batches whose request failed
    pub fn failed_blocks(&self) -> usize {
        self.batches
            .iter()
            .filter(|b| matches!(b.status, BatchStatus::Failed(_)))
            .map(|b| b.sent)
            .sum()
    }

    /// Blocks dropped by validation
    pub fn invalid_blocks(&self) -> usize {
        self.batches.iter().map(|b| b.invalid).sum()
    }

    /// Indices of failed batches
    pub fn failed_batches(&self) -> Vec<usize> {
        self.batches
            .iter()
            .filter(|b| matches!(b.status, BatchStatus::Failed(_)))
            .map(|b| b.index)
            .collect()
    }
}
