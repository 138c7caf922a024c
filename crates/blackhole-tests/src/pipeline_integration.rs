//! Cross-crate pipeline integration tests
//!
//! Decode → reduce → BLHO file → decode → reconstruct, with no block store involved.

use crate::harness::{fixtures, TestEnv};
use blackhole_reduce::{
    container_path, decode, encode, read_container_file, reconstruct, write_container_file, Channel,
    ImagePipeline, MemoryBlockSource, PaddingPolicy, PipelineConfig, ReduceError, FORMAT_VERSION, MAGIC,
};

fn pipeline(padding: PaddingPolicy) -> ImagePipeline {
    ImagePipeline::new(PipelineConfig { padding })
}

#[test]
fn test_black_16x16_reduces_to_one_block_per_channel() {
    let out = pipeline(PaddingPolicy::Edge)
        .process("black.jpg", &fixtures::solid(16, 16, [0, 0, 0]))
        .unwrap();
    assert_eq!(out.stats.total_blocks, 4);
    for channel in Channel::ALL {
        let c = out.dedup.channel(channel);
        assert_eq!(c.unique.len(), 1);
        assert_eq!(c.positions.as_slice(), &[0, 0, 0, 0]);
        assert!(c.unique.get(0).unwrap().payload.iter().all(|&b| b == 0));
    }
}

#[test]
fn test_file_round_trip_is_lossless() {
    let env = TestEnv::new("file_round_trip");
    for (w, h, padding) in [
        (1, 1, PaddingPolicy::Edge),
        (23, 9, PaddingPolicy::Edge),
        (23, 9, PaddingPolicy::Black),
        (64, 40, PaddingPolicy::Edge),
    ] {
        let original = fixtures::noise(w, h, w * h);
        let path = env.write_png(&format!("noise_{}x{}_{}.png", w, h, padding), &original);
        let out = pipeline(padding).process_path(&path).unwrap();

        let blho = container_path(&path);
        write_container_file(&blho, &out.container).unwrap();
        let container = read_container_file(&blho).unwrap();
        assert_eq!(container, out.container);

        let rebuilt = reconstruct(&container, &MemoryBlockSource::from_dedup(&out.dedup)).unwrap();
        assert_eq!(rebuilt, original, "{}x{} {}", w, h, padding);
    }
}

#[test]
fn test_repeated_content_is_deduplicated() {
    let image = fixtures::stripes(64, 64, 2);
    let out = pipeline(PaddingPolicy::Edge).process("stripes.png", &image).unwrap();
    assert_eq!(out.stats.total_blocks, 64);
    assert_eq!(out.stats.unique.luma, 2);
    assert!(out.stats.dedup_ratio() > 10.0);
    let positions = out.container.positions.luma.as_slice();
    assert_eq!(&positions[..4], &[0, 1, 0, 1]);
}

#[test]
fn test_padding_policy_changes_border_identities_only() {
    let image = fixtures::noise(12, 8, 3);
    let edge = pipeline(PaddingPolicy::Edge).process("x.png", &image).unwrap();
    let black = pipeline(PaddingPolicy::Black).process("x.png", &image).unwrap();
    assert_eq!(edge.container.hashes.luma.len(), 2);
    assert_eq!(edge.container.hashes.luma[0], black.container.hashes.luma[0]);
    assert_ne!(edge.container.hashes.luma[1], black.container.hashes.luma[1]);
}

#[test]
fn test_container_header_and_metadata() {
    let out = pipeline(PaddingPolicy::Edge)
        .process("meta.jpg", &fixtures::stripes(20, 10, 3))
        .unwrap();
    let bytes = encode(&out.container).unwrap();
    assert_eq!(&bytes[..4], &MAGIC);
    assert_eq!(bytes[4], FORMAT_VERSION);

    let len = i32::from_be_bytes([bytes[5], bytes[6], bytes[7], bytes[8]]) as usize;
    let meta: serde_json::Value = serde_json::from_slice(&bytes[9..9 + len]).unwrap();
    assert_eq!(meta["format"], "BLHO");
    assert_eq!(meta["version"], "2.0");
    assert_eq!(meta["file"], "meta.jpg");
    assert_eq!(meta["total_blocks"], 6);
    assert_eq!(meta["unique_y_blocks"], out.stats.unique.luma);
    assert_eq!(meta["unique_u_blocks"], out.stats.unique.chroma_cb);
    assert_eq!(meta["unique_v_blocks"], out.stats.unique.chroma_cr);
}

#[test]
fn test_corrupted_container_never_yields_partial_result() {
    let out = pipeline(PaddingPolicy::Edge)
        .process("c.png", &fixtures::noise(16, 16, 1))
        .unwrap();
    let bytes = encode(&out.container).unwrap();
    for cut in [0, 3, 5, 9, bytes.len() / 2, bytes.len() - 1] {
        assert!(
            matches!(decode(&bytes[..cut]), Err(ReduceError::Format(_))),
            "cut at {}",
            cut
        );
    }
}
