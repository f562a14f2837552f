use cardinality_trials::{SketchConfig, StreamSketch, Variant};

fn main() -> cardinality_trials::Result<()> {
    let config = SketchConfig::new(10, 5, &Variant::ALL)?;

    let mut sketch1 = StreamSketch::new(&config, 0);
    for i in 0..10_000usize {
        sketch1.ingest(i);
    }
    println!("sketch1 = {:?}", sketch1.checkpoint());

    let mut sketch2 = StreamSketch::new(&config, 0);
    for i in 5_000..15_000usize {
        sketch2.ingest(i);
    }
    println!("sketch2 = {:?}", sketch2.checkpoint());

    sketch1.merge(&sketch2)?;
    println!("merged = {:?}", sketch1.checkpoint());
    Ok(())
}
