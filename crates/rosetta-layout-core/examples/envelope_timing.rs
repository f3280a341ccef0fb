use rand::{Rng, SeedableRng};
use rosetta_layout_core::binpack::{PackOptions, pack_bins_with};
use rosetta_layout_core::{BinSpec, Envelope, NoopObserver};
use std::time::Instant;

fn run(n: usize, envelope: Envelope, gap_px: u32, seed: u64) {
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    let bin = BinSpec::new(rng.gen_range(40..=240), rng.gen_range(40..=240));
    let opts = PackOptions {
        gap_px,
        ..PackOptions::default()
    };

    let start = Instant::now();
    let res = pack_bins_with(bin, envelope, n, &opts, &mut NoopObserver);
    let elapsed = start.elapsed();
    match res {
        Ok(r) => println!(
            "{:?} bin={}x{} placed={} util={:.2}% canvas={}x{} time={}ms",
            envelope.shape,
            bin.width_px,
            bin.height_px,
            r.placed,
            r.utilization * 100.0,
            r.canvas_width_px,
            r.canvas_height_px,
            elapsed.as_millis()
        ),
        Err(e) => println!("{:?} failed: {e}", envelope.shape),
    }
}

fn main() {
    for (n, seed) in [(1000, 1337), (5000, 4242)] {
        println!("N={n}");
        run(n, Envelope::rectangle(1.29), 0, seed);
        run(n, Envelope::circle(), 0, seed);
        run(n, Envelope::circle(), 4, seed);
        run(n, Envelope::ellipse(1.8), 0, seed);
        println!();
    }
}
