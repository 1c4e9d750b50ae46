//! Filter a noisy flow estimate of a synthetic moving square.
//!
//! Usage: `cargo run -p permea-filter --example synthetic_sequence [params.json]`

use permea_filter::{geometry::MOVEMENT_UNKNOWN, sequence::SequenceFilter, FilterParams};
use permea_image::{Image, ImageSize};
use rand::Rng;

const NUM_FRAMES: usize = 8;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let params = match std::env::args().nth(1) {
        Some(path) => FilterParams::from_json_file(path)?,
        None => FilterParams::reference_flow(),
    };
    log::info!("filter parameters:\n{}", params.to_json_string()?);

    let size = ImageSize {
        width: 96,
        height: 64,
    };
    let motion = [2.0f32, 1.0];
    let mut rng = rand::rng();
    let mut filter = SequenceFilter::<1, 2>::new(params)?;

    for t in 0..NUM_FRAMES {
        let (x0, y0) = (16.0 + motion[0] * t as f32, 12.0 + motion[1] * t as f32);
        let inside = |x: usize, y: usize| {
            let (x, y) = (x as f32, y as f32);
            x >= x0 && x < x0 + 24.0 && y >= y0 && y < y0 + 24.0
        };

        // 8-bit frames as a decoder would deliver them
        let frame = Image::<u8, 1>::from_fn(size, |x, y| [if inside(x, y) { 204 } else { 51 }]);
        let image = frame.cast_and_scale::<f32>(1.0 / 255.0)?;
        let flow = Image::<f32, 2>::from_fn(size, |x, y| if inside(x, y) { motion } else { [0.0, 0.0] });

        // noisy estimate with a few holes
        let mut estimate = flow.clone();
        for px in estimate.as_slice_mut().chunks_exact_mut(2) {
            if rng.random_bool(0.02) {
                px.copy_from_slice(&[MOVEMENT_UNKNOWN, MOVEMENT_UNKNOWN]);
            } else {
                px[0] += rng.random_range(-0.5..0.5);
                px[1] += rng.random_range(-0.5..0.5);
            }
        }

        let filtered = filter.process(&image, &estimate, &flow)?;

        let epe = |field: &Image<f32, 2>| {
            let (sum, count) = field
                .as_slice()
                .chunks_exact(2)
                .zip(flow.as_slice().chunks_exact(2))
                .filter(|(px, _)| px[0] != MOVEMENT_UNKNOWN)
                .fold((0.0, 0usize), |(sum, count), (px, gt)| {
                    (sum + ((px[0] - gt[0]).powi(2) + (px[1] - gt[1]).powi(2)).sqrt(), count + 1)
                });
            sum / count.max(1) as f32
        };

        println!(
            "frame {}: endpoint error {:.4} -> {:.4}",
            t,
            epe(&estimate),
            epe(&filtered)
        );
    }

    Ok(())
}
