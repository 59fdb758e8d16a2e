//! Least-squares fit of `y = a·exp(-b·t) + c` with `b >= 0`.
//!
//! For a fixed `b` the model is linear in `a` and `c`, so the search runs over
//! `b` alone: a log-spaced scan followed by golden-section refinement.

const SCAN_POINTS: usize = 200;
const REFINE_ITERATIONS: usize = 100;
const GOLDEN: f64 = 0.618_033_988_749_895;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExponentialDecay {
    pub a: f64,
    pub b: f64,
    pub c: f64,
}

impl ExponentialDecay {
    pub fn eval(&self, t: f64) -> f64 {
        self.a * (-self.b * t).exp() + self.c
    }

    /// Needs at least three points.
    pub fn fit(points: &[(f64, f64)]) -> Option<Self> {
        if points.len() < 3 {
            return None;
        }
        let span = points
            .iter()
            .map(|(t, _)| *t)
            .fold(0.0f64, f64::max)
            .max(1.0);

        // b from ~0 up to a decay of e^-50 over the sampled span
        let b_max = 50.0 / span;
        let b_min = 1e-6 / span;
        let ratio = (b_max / b_min).powf(1.0 / (SCAN_POINTS - 1) as f64);

        let mut best = Self::solve_linear(points, 0.0);
        let mut best_index = None;
        let mut b = b_min;
        for i in 0..SCAN_POINTS {
            let candidate = Self::solve_linear(points, b);
            if candidate.1 < best.1 {
                best = candidate;
                best_index = Some(i);
            }
            b *= ratio;
        }

        if let Some(i) = best_index {
            let mut lo = b_min * ratio.powi(i as i32 - 1).max(0.0);
            let mut hi = b_min * ratio.powi(i as i32 + 1);
            if i == 0 {
                lo = 0.0;
            }
            for _ in 0..REFINE_ITERATIONS {
                let m1 = hi - GOLDEN * (hi - lo);
                let m2 = lo + GOLDEN * (hi - lo);
                if Self::solve_linear(points, m1).1 < Self::solve_linear(points, m2).1 {
                    hi = m2;
                } else {
                    lo = m1;
                }
            }
            let refined = Self::solve_linear(points, (lo + hi) / 2.0);
            if refined.1 < best.1 {
                best = refined;
            }
        }

        Some(best.0).filter(|m| m.a.is_finite() && m.c.is_finite())
    }

    /// Best `(a, c)` for a fixed `b`, with its residual sum of squares.
    fn solve_linear(points: &[(f64, f64)], b: f64) -> (Self, f64) {
        let n = points.len() as f64;
        let (mut su, mut suu, mut sy, mut suy) = (0.0, 0.0, 0.0, 0.0);
        for &(t, y) in points {
            let u = (-b * t).exp();
            su += u;
            suu += u * u;
            sy += y;
            suy += u * y;
        }
        let det = suu * n - su * su;
        let model = if det.abs() < 1e-12 * (suu * n).max(1.0) {
            Self {
                a: 0.0,
                b,
                c: sy / n,
            }
        } else {
            Self {
                a: (suy * n - su * sy) / det,
                b,
                c: (suu * sy - su * suy) / det,
            }
        };
        let sse = points
            .iter()
            .map(|&(t, y)| (model.eval(t) - y).powi(2))
            .sum();
        (model, sse)
    }
}
