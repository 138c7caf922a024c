//! Block store client integration tests against the in-memory store

use crate::harness::{fixtures, InMemoryStore, StoreCall, TestEnv};
use blackhole_client::{
    sync_image, BatchStatus, BlockStoreClient, CheckOutcome, ClientConfig, ClientError, FileOutcome, FileProcessor,
};
use blackhole_reduce::{
    read_container_file, reconstruct, Channel, ContentIdentity, ImagePipeline, PaddingPolicy, PipelineConfig,
};
use bytes::Bytes;

fn png_config(batch_size: usize) -> ClientConfig {
    ClientConfig {
        extensions: vec!["png".into()],
        batch_size,
        workers: 2,
        ..Default::default()
    }
}

fn payloads(n: usize) -> Vec<(ContentIdentity, Bytes)> {
    (0..n)
        .map(|i| {
            let data = Bytes::from(format!("block-{:05}", i).into_bytes());
            (ContentIdentity::length_prefixed(&data), data)
        })
        .collect()
}

#[tokio::test]
async fn test_empty_check_makes_no_call() {
    let client = BlockStoreClient::new(InMemoryStore::new(), 1000);
    let missing = client.check_missing(&[], Channel::Luma).await.unwrap();
    assert!(missing.is_empty());
    assert!(client.transport().calls().is_empty());
}

#[tokio::test]
async fn test_2500_blocks_upload_in_1000_1000_500() {
    let client = BlockStoreClient::new(InMemoryStore::new(), 1000);
    let blocks = payloads(2500);
    let report = client.upload_batches(&blocks, Channel::ChromaCr).await;

    assert_eq!(client.transport().upload_sizes(Channel::ChromaCr), vec![1000, 1000, 500]);
    assert!(report.all_succeeded());
    assert_eq!(client.transport().len(Channel::ChromaCr), 2500);
    assert!(blocks
        .iter()
        .all(|(id, _)| client.transport().contains(Channel::ChromaCr, id)));
}

#[tokio::test]
async fn test_partial_upload_failure_is_observable() {
    let store = InMemoryStore::new().fail_upload_call(1);
    let client = BlockStoreClient::new(store, 1000);
    let report = client.upload_batches(&payloads(2500), Channel::Luma).await;

    let statuses: Vec<_> = report.batches.iter().map(|b| b.status.clone()).collect();
    assert_eq!(statuses[0], BatchStatus::Uploaded);
    assert!(matches!(statuses[1], BatchStatus::Failed(_)));
    assert_eq!(statuses[2], BatchStatus::Uploaded);
    assert_eq!(report.uploaded_blocks(), 1500);
    assert_eq!(report.failed_blocks(), 1000);
    assert_eq!(client.transport().len(Channel::Luma), 1500);
}

#[tokio::test]
async fn test_check_failure_is_distinct_from_nothing_missing() {
    let client = BlockStoreClient::new(InMemoryStore::new().fail_checks_on(Channel::Luma), 1000);
    let ids = vec![ContentIdentity::length_prefixed(b"a")];
    let err = client.check_missing(&ids, Channel::Luma).await.unwrap_err();
    assert!(matches!(err, ClientError::Status { status: 500, .. }));

    let ok = client.check_missing(&ids, Channel::ChromaCb).await.unwrap();
    assert_eq!(ok, ids);
}

#[tokio::test]
async fn test_sync_then_rebuild_from_store() {
    let image = fixtures::stripes(40, 24, 3);
    let out = ImagePipeline::new(PipelineConfig {
        padding: PaddingPolicy::Edge,
    })
    .process("stripes.png", &image)
    .unwrap();

    let client = BlockStoreClient::new(InMemoryStore::new(), 2);
    let reports = sync_image(&client, &out.dedup).await;
    for (channel, report) in reports.iter() {
        let unique = *out.stats.unique.get(channel);
        assert_eq!(report.check, CheckOutcome::Checked { checked: unique, missing: unique });
        assert!(report.is_complete());
        assert_eq!(client.transport().len(channel), unique);
    }

    let rebuilt = reconstruct(&out.container, &client.transport().block_source()).unwrap();
    assert_eq!(rebuilt, image);
}

#[tokio::test]
async fn test_shared_blocks_across_images_upload_once() {
    let pipeline = ImagePipeline::default();
    let first = pipeline.process("a.png", &fixtures::stripes(32, 8, 4)).unwrap();
    let second = pipeline.process("b.png", &fixtures::stripes(64, 8, 4)).unwrap();
    let client = BlockStoreClient::new(InMemoryStore::new(), 1000);

    sync_image(&client, &first.dedup).await;
    let uploads_before = client.transport().upload_sizes(Channel::Luma).len();
    let reports = sync_image(&client, &second.dedup).await;

    assert!(matches!(reports.luma.check, CheckOutcome::Checked { missing: 0, .. }));
    assert_eq!(client.transport().upload_sizes(Channel::Luma).len(), uploads_before);
}

#[tokio::test]
async fn test_directory_run_end_to_end() {
    let env = TestEnv::new("directory_run");
    let a = fixtures::noise(17, 9, 1);
    let b = fixtures::solid(16, 16, [200, 10, 10]);
    env.write_png("a.png", &a);
    env.write_png("b.png", &b);
    std::fs::write(env.tempdir().join("c.png"), b"\x89PNG truncated").unwrap();

    let processor = FileProcessor::new(png_config(4), BlockStoreClient::new(InMemoryStore::new(), 4));
    let report = processor.process_directory(env.tempdir()).await.unwrap();

    assert_eq!(report.files.len(), 3);
    assert_eq!(report.processed(), 2);
    assert_eq!(report.failed(), 1);
    assert!(matches!(&report.files[2], FileOutcome::Failed { path, .. } if path.ends_with("c.png")));

    for (outcome, original) in report.files.iter().zip([&a, &b]) {
        let FileOutcome::Processed(img) = outcome else {
            panic!("{} failed", outcome.path().display());
        };
        assert!(img.fully_synced());
        let (blho, _) = img.container.as_ref().unwrap();
        let container = read_container_file(blho).unwrap();
        let source = processor.client().transport().block_source();
        assert_eq!(&reconstruct(&container, &source).unwrap(), original);
    }

    let checks = processor
        .client()
        .transport()
        .calls()
        .iter()
        .filter(|c| matches!(c, StoreCall::Check { .. }))
        .count();
    assert_eq!(checks, 6);
}

#[tokio::test]
async fn test_unreadable_directory_fails_the_run() {
    let processor = FileProcessor::new(png_config(10), BlockStoreClient::new(InMemoryStore::new(), 10));
    let err = processor
        .process_directory(std::path::Path::new("/nonexistent/blackhole"))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::DirectoryUnreadable { .. }));
}
