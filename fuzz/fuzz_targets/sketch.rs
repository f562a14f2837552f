#![no_main]

use cardinality_trials::{SketchConfig, StreamSketch, Variant};
use libfuzzer_sys::fuzz_target;
use wyhash::wyhash;

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }

    let seed = wyhash(data, 0);
    let precision = 4 + (seed % 15) as u8;
    let width = 4 + ((seed >> 8) % 3) as u8;
    let config = SketchConfig::new(precision, width, &Variant::ALL).unwrap();

    let split_index = seed as usize % data.len();
    let (first_half, second_half) = data.split_at(split_index);

    let mut sketch1 = StreamSketch::<&[u8]>::new(&config, seed);
    for chunk in first_half.chunks(4) {
        sketch1.ingest(chunk);
        for (_, estimate) in sketch1.checkpoint().estimates {
            assert!(estimate.is_finite() && estimate > 0.0);
        }
    }

    let mut sketch2 = StreamSketch::<&[u8]>::new(&config, seed);
    for chunk in second_half.chunks(4) {
        sketch2.ingest(chunk);
    }

    let mut merged = sketch2.clone();
    merged.merge(&sketch1).unwrap();
    sketch1.merge(&sketch2).unwrap();
    for variant in Variant::ALL {
        assert_eq!(sketch1.bank(variant), merged.bank(variant));
        assert!(sketch1.estimate(variant).unwrap() >= 0.0);
    }
    assert_eq!(sketch1.true_count(), merged.true_count());
});
