//! Property-Based Tests for block reduction

use blackhole_client::partition;
use blackhole_reduce::{
    decode, deduplicate, encode, reconstruct, rct, BlockDecomposer, Channel, IdentityScheme, ImagePipeline,
    MemoryBlockSource, PaddingPolicy, PipelineConfig, Rgb,
};
use image::RgbImage;
use proptest::prelude::*;

/// Small images with arbitrary pixels
pub fn arb_image(max_dim: u32) -> impl Strategy<Value = RgbImage> {
    (1..=max_dim, 1..=max_dim).prop_flat_map(|(w, h)| {
        prop::collection::vec(any::<[u8; 3]>(), (w * h) as usize).prop_map(move |pixels| {
            RgbImage::from_fn(w, h, |x, y| image::Rgb(pixels[(y * w + x) as usize]))
        })
    })
}

/// Images built from a few colors so blocks repeat
pub fn arb_blocky_image() -> impl Strategy<Value = RgbImage> {
    (1u32..6, 1u32..6, prop::collection::vec(any::<[u8; 3]>(), 1..4), any::<u64>()).prop_map(
        |(bw, bh, palette, seed)| {
            RgbImage::from_fn(bw * 8, bh * 8, |x, y| {
                let block = u64::from((y / 8) * bw + x / 8);
                let pick = (seed.rotate_left(block as u32 % 64) as usize) % palette.len();
                image::Rgb(palette[pick])
            })
        },
    )
}

fn arb_padding() -> impl Strategy<Value = PaddingPolicy> {
    prop_oneof![Just(PaddingPolicy::Edge), Just(PaddingPolicy::Black)]
}

proptest! {
    #[test]
    fn prop_transform_round_trip(r in any::<u8>(), g in any::<u8>(), b in any::<u8>()) {
        let px = Rgb::new(r, g, b);
        let yuv = rct::forward(px).unwrap();
        prop_assert_eq!(rct::inverse(yuv), px);
    }

    #[test]
    fn prop_reduce_reconstruct_is_lossless(image in arb_image(24), padding in arb_padding()) {
        let out = ImagePipeline::new(PipelineConfig { padding }).process("p.png", &image).unwrap();
        let container = decode(&encode(&out.container).unwrap()).unwrap();
        let rebuilt = reconstruct(&container, &MemoryBlockSource::from_dedup(&out.dedup)).unwrap();
        prop_assert_eq!(rebuilt, image);
    }

    #[test]
    fn prop_container_round_trip(image in arb_blocky_image()) {
        let out = ImagePipeline::default().process("c.png", &image).unwrap();
        let bytes = encode(&out.container).unwrap();
        prop_assert_eq!(decode(&bytes).unwrap(), out.container);
    }

    #[test]
    fn prop_dedup_is_deterministic_and_in_range(image in arb_blocky_image()) {
        let blocks = BlockDecomposer::default().decompose(&image).unwrap().blocks;
        let first = deduplicate(&blocks, IdentityScheme::RawDigest);
        let second = deduplicate(&blocks, IdentityScheme::RawDigest);
        prop_assert_eq!(&first, &second);

        for channel in Channel::ALL {
            let c = first.channel(channel);
            prop_assert_eq!(c.positions.len(), blocks.len());
            prop_assert!(c.positions.first_out_of_range(c.unique.len()).is_none());
            prop_assert!(c.unique.len() <= 3);
            for (pos, block) in blocks.iter().enumerate() {
                let index = c.positions.get(pos).unwrap();
                prop_assert_eq!(c.unique.get(index).unwrap().payload.as_ref(), block.payload(channel));
            }
        }
    }

    #[test]
    fn prop_partition_keeps_order(len in 0usize..3000, size in 1usize..1200) {
        let items: Vec<usize> = (0..len).collect();
        let batches: Vec<&[usize]> = partition(&items, size).collect();
        prop_assert_eq!(batches.len(), len.div_ceil(size));
        for (i, batch) in batches.iter().enumerate() {
            let expected = if i + 1 < batches.len() { size } else { len - size * i };
            prop_assert_eq!(batch.len(), expected);
        }
        prop_assert_eq!(batches.concat(), items);
    }
}
