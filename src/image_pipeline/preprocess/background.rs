//! Background subtraction: fixed-ROI mean or rolling ball.

use tracing::{debug, instrument};

use crate::image_pipeline::common::error::{FretError, Result};
use crate::image_pipeline::stack::{ImageStack, Rect, Sample};

/// Default rolling-ball radius, in pixels.
pub const DEFAULT_ROLLING_BALL_RADIUS: u32 = 50;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BackgroundMode {
    /// Subtract the mean of the operator's background ROI, per plane.
    Manual,
    /// Subtract a rolling-ball background estimate.
    RollingBall { radius: u32 },
}

impl Default for BackgroundMode {
    fn default() -> Self {
        BackgroundMode::RollingBall {
            radius: DEFAULT_ROLLING_BALL_RADIUS,
        }
    }
}

pub trait BackgroundSubtractor {
    fn subtract(&self, image: &ImageStack) -> Result<ImageStack>;
}

pub struct RoiMeanSubtractor {
    roi: Rect,
}

impl RoiMeanSubtractor {
    pub fn new(roi: Rect) -> Self {
        Self { roi }
    }
}

impl BackgroundSubtractor for RoiMeanSubtractor {
    #[instrument(skip_all, fields(roi = %self.roi))]
    fn subtract(&self, image: &ImageStack) -> Result<ImageStack> {
        self.roi.validate_for(image)?;
        let mut out = Vec::with_capacity(image.samples().len());
        for p in 0..image.planes() {
            let mean = self.roi.plane_mean(image, p).ok_or_else(|| {
                FretError::DegenerateStatistics(format!("background ROI on plane {}", p + 1))
            })? as f32;
            debug!(plane = p, mean, "Background mean");
            out.extend(image.plane(p).iter().map(|s| s.map(|v| v - mean)));
        }
        Ok(image.derive(out))
    }
}

/// Grey-scale opening with a ball-shaped structuring element.
///
/// Large balls are rolled on a block-minimum shrunk copy and the background is
/// enlarged back with bilinear interpolation.
pub struct RollingBall {
    radius: f64,
}

impl RollingBall {
    pub fn new(radius: u32) -> Result<Self> {
        if radius == 0 {
            return Err(FretError::InvalidConfig(
                "rolling ball radius must be positive".to_string(),
            ));
        }
        Ok(Self {
            radius: radius as f64,
        })
    }

    fn shrink_factor(&self) -> usize {
        match self.radius {
            r if r <= 10.0 => 1,
            r if r <= 30.0 => 2,
            r if r <= 100.0 => 4,
            _ => 8,
        }
    }

    /// Background surface of one plane.
    pub fn background(&self, plane: &[Sample], width: usize, height: usize) -> Vec<Sample> {
        let factor = self.shrink_factor();
        let (small, sw, sh) = shrink(plane, width, height, factor);
        let ball = Ball::new(self.radius / factor as f64);
        let eroded = ball.erode(&small, sw, sh);
        let opened = ball.dilate(&eroded, sw, sh);
        if factor == 1 {
            opened
        } else {
            enlarge(&opened, sw, sh, width, height, factor)
        }
    }
}

impl BackgroundSubtractor for RollingBall {
    #[instrument(skip_all, fields(radius = self.radius))]
    fn subtract(&self, image: &ImageStack) -> Result<ImageStack> {
        let (width, height, planes) = image.dims();
        let mut out = Vec::with_capacity(image.samples().len());
        for p in 0..planes {
            let plane = image.plane(p);
            let background = self.background(plane, width, height);
            out.extend(plane.iter().zip(&background).map(|(v, b)| match (v, b) {
                (Some(v), Some(b)) => Some(v - b),
                _ => None,
            }));
        }
        debug!(planes, shrink = self.shrink_factor(), "Rolling-ball background removed");
        Ok(image.derive(out))
    }
}

struct Ball {
    /// `(dx, dy, height)` for every offset inside the ball's footprint.
    offsets: Vec<(isize, isize, f32)>,
}

impl Ball {
    fn new(radius: f64) -> Self {
        let radius = radius.max(1.0);
        let reach = radius.floor() as isize;
        let r2 = radius * radius;
        let mut offsets = Vec::new();
        for dy in -reach..=reach {
            for dx in -reach..=reach {
                let d2 = (dx * dx + dy * dy) as f64;
                if d2 <= r2 {
                    offsets.push((dx, dy, (r2 - d2).sqrt() as f32));
                }
            }
        }
        Self { offsets }
    }

    fn erode(&self, data: &[Sample], width: usize, height: usize) -> Vec<Sample> {
        self.sweep(data, width, height, |acc: Option<f32>, v, h| {
            let candidate = v - h;
            Some(acc.map_or(candidate, |a| a.min(candidate)))
        })
    }

    fn dilate(&self, data: &[Sample], width: usize, height: usize) -> Vec<Sample> {
        self.sweep(data, width, height, |acc: Option<f32>, v, h| {
            let candidate = v + h;
            Some(acc.map_or(candidate, |a| a.max(candidate)))
        })
    }

    fn sweep(
        &self,
        data: &[Sample],
        width: usize,
        height: usize,
        fold: impl Fn(Option<f32>, f32, f32) -> Option<f32>,
    ) -> Vec<Sample> {
        let mut out = Vec::with_capacity(data.len());
        for y in 0..height as isize {
            for x in 0..width as isize {
                let mut acc = None;
                for &(dx, dy, h) in &self.offsets {
                    let (nx, ny) = (x + dx, y + dy);
                    if nx < 0 || ny < 0 || nx >= width as isize || ny >= height as isize {
                        continue;
                    }
                    if let Some(v) = data[ny as usize * width + nx as usize] {
                        acc = fold(acc, v, h);
                    }
                }
                out.push(acc);
            }
        }
        out
    }
}

/// Block minimum over `factor × factor` tiles.
fn shrink(data: &[Sample], width: usize, height: usize, factor: usize) -> (Vec<Sample>, usize, usize) {
    if factor == 1 {
        return (data.to_vec(), width, height);
    }
    let sw = width.div_ceil(factor);
    let sh = height.div_ceil(factor);
    let mut out = vec![None; sw * sh];
    for y in 0..height {
        for x in 0..width {
            if let Some(v) = data[y * width + x] {
                let cell = &mut out[(y / factor) * sw + x / factor];
                *cell = Some(cell.map_or(v, |c: f32| c.min(v)));
            }
        }
    }
    (out, sw, sh)
}

/// Bilinear enlargement of a shrunk surface. Tile centres sit at
/// `i * factor + (factor - 1) / 2` in full-size coordinates.
fn enlarge(
    small: &[Sample],
    sw: usize,
    sh: usize,
    width: usize,
    height: usize,
    factor: usize,
) -> Vec<Sample> {
    let offset = (factor as f64 - 1.0) / 2.0;
    let coord = |p: usize, n: usize| -> (usize, usize, f32) {
        let f = ((p as f64 - offset) / factor as f64).clamp(0.0, (n - 1) as f64);
        let i0 = f.floor() as usize;
        let i1 = (i0 + 1).min(n - 1);
        (i0, i1, (f - i0 as f64) as f32)
    };

    let mut out = Vec::with_capacity(width * height);
    for y in 0..height {
        let (y0, y1, ty) = coord(y, sh);
        for x in 0..width {
            let (x0, x1, tx) = coord(x, sw);
            let corners = [
                (small[y0 * sw + x0], (1.0 - tx) * (1.0 - ty)),
                (small[y0 * sw + x1], tx * (1.0 - ty)),
                (small[y1 * sw + x0], (1.0 - tx) * ty),
                (small[y1 * sw + x1], tx * ty),
            ];
            let (sum, weight) = corners
                .iter()
                .filter_map(|(v, w)| v.map(|v| (v * w, *w)))
                .fold((0.0f32, 0.0f32), |(s, ws), (v, w)| (s + v, ws + w));
            let value = if weight > 0.0 {
                Some(sum / weight)
            } else {
                corners.iter().find_map(|(v, _)| *v)
            };
            out.push(value);
        }
    }
    out
}
