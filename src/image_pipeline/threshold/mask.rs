use tracing::debug;

use crate::image_pipeline::stack::{ImageStack, Sample};
use crate::image_pipeline::threshold::range::ThresholdRange;

/// Invalidates every sample outside `range`, then despeckles each plane.
///
/// The input is left untouched; the result is a new float stack.
pub fn apply_threshold(image: &ImageStack, range: ThresholdRange) -> ImageStack {
    let masked = image.map(|v| range.contains(v).then_some(v));
    debug!(
        min = range.min(),
        max = range.max(),
        kept = masked.valid_count(),
        total = masked.samples().len(),
        "Threshold applied"
    );
    despeckle(&masked)
}

/// 3x3 median filter over valid samples.
///
/// A valid pixel takes the median of the valid samples around it. An invalid
/// pixel is filled only when every in-bounds neighbour is valid; any larger
/// masked area stays masked.
pub fn despeckle(image: &ImageStack) -> ImageStack {
    let (width, height, planes) = image.dims();
    let mut out = Vec::with_capacity(image.samples().len());
    let mut window: Vec<f32> = Vec::with_capacity(9);

    for p in 0..planes {
        let plane = image.plane(p);
        for y in 0..height {
            for x in 0..width {
                window.clear();
                let mut neighbours = 0usize;
                let mut valid_neighbours = 0usize;
                for ny in y.saturating_sub(1)..=(y + 1).min(height - 1) {
                    for nx in x.saturating_sub(1)..=(x + 1).min(width - 1) {
                        let sample = plane[ny * width + nx];
                        let is_centre = nx == x && ny == y;
                        if !is_centre {
                            neighbours += 1;
                            valid_neighbours += sample.is_some() as usize;
                        }
                        if let Some(v) = sample {
                            window.push(v);
                        }
                    }
                }

                let centre = plane[y * width + x];
                let filled = match centre {
                    Some(_) => median(&mut window),
                    None if neighbours > 0 && valid_neighbours == neighbours => median(&mut window),
                    None => None,
                };
                out.push(filled);
            }
        }
    }

    image.derive(out)
}

/// Upper median, matching a rank filter on an odd-sized kernel.
fn median(values: &mut [f32]) -> Sample {
    if values.is_empty() {
        return None;
    }
    let mid = values.len() / 2;
    let (_, m, _) = values.select_nth_unstable_by(mid, |a, b| a.total_cmp(b));
    Some(*m)
}
