//! Heuristic background removal.
//!
//! Pixels are grouped into quantized color clusters, the cluster that is both
//! common and hugs the image border is taken as background, and a Sobel edge
//! map keeps the subject's outline from being cut away. Background pixels far
//! from any edge become fully transparent; those close to an edge are only
//! softened.

use image::RgbaImage;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::domains::tools::ToolError;

pub const DEFAULT_BUCKET_SIZE: u8 = 30;
pub const DEFAULT_COMMON_SHARE: f64 = 0.05;
pub const DEFAULT_BORDER_SHARE: f64 = 0.10;
pub const DEFAULT_EDGE_THRESHOLD: f32 = 50.0;
pub const DEFAULT_COLOR_TOLERANCE: f32 = 50.0;
pub const DEFAULT_EDGE_RADIUS: u32 = 3;

/// Alpha range for background pixels that sit next to an edge.
pub const MAX_SOFT_ALPHA: u8 = 128;
const MIN_SOFT_ALPHA: u8 = 64;

/// Quantized RGB bucket index.
pub type BucketKey = (u8, u8, u8);

/// Tunables for [`remove_background`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackgroundOptions {
    /// Width of each color bucket per channel.
    pub bucket_size: u8,
    /// Minimum share of all pixels a cluster needs to count as common.
    pub common_share: f64,
    /// Minimum share of a cluster's own pixels that must lie on the border.
    pub border_share: f64,
    /// Sobel magnitude above which a pixel is an edge.
    pub edge_threshold: f32,
    /// RGB distance below which a pixel matches the background color.
    pub color_tolerance: f32,
    /// Radius (px) around edges where background is softened, not cleared.
    pub edge_radius: u32,
}

impl Default for BackgroundOptions {
    fn default() -> Self {
        Self {
            bucket_size: DEFAULT_BUCKET_SIZE,
            common_share: DEFAULT_COMMON_SHARE,
            border_share: DEFAULT_BORDER_SHARE,
            edge_threshold: DEFAULT_EDGE_THRESHOLD,
            color_tolerance: DEFAULT_COLOR_TOLERANCE,
            edge_radius: DEFAULT_EDGE_RADIUS,
        }
    }
}

impl BackgroundOptions {
    pub fn validate(&self) -> Result<(), ToolError> {
        if self.bucket_size == 0 {
            return Err(ToolError::invalid_arguments("bucket_size must be at least 1"));
        }
        for (name, share) in [
            ("common_share", self.common_share),
            ("border_share", self.border_share),
        ] {
            if !(0.0..=1.0).contains(&share) {
                return Err(ToolError::invalid_arguments(format!(
                    "{} must be between 0 and 1",
                    name
                )));
            }
        }
        if !(self.color_tolerance > 0.0 && self.color_tolerance.is_finite()) {
            return Err(ToolError::invalid_arguments("color_tolerance must be positive"));
        }
        if !(self.edge_threshold >= 0.0 && self.edge_threshold.is_finite()) {
            return Err(ToolError::invalid_arguments("edge_threshold must be non-negative"));
        }
        if self.edge_radius > 64 {
            return Err(ToolError::invalid_arguments("edge_radius must be at most 64"));
        }
        Ok(())
    }
}

/// Pixels sharing one quantized color bucket.
#[derive(Debug, Clone)]
pub struct ColorCluster {
    pub key: BucketKey,
    pub count: usize,
    pub pixels: Vec<(u32, u32)>,
}

impl ColorCluster {
    /// Center color of the bucket.
    pub fn representative(&self, bucket_size: u8) -> [u8; 3] {
        let center = |k: u8| -> u8 {
            let value = u16::from(k) * u16::from(bucket_size) + u16::from(bucket_size / 2);
            value.min(255) as u8
        };
        [center(self.key.0), center(self.key.1), center(self.key.2)]
    }

    /// Number of the cluster's pixels on the outermost ring of the image.
    pub fn border_count(&self, width: u32, height: u32) -> usize {
        self.pixels
            .iter()
            .filter(|&&(x, y)| x == 0 || y == 0 || x + 1 == width || y + 1 == height)
            .count()
    }
}

pub fn quantize(rgb: [u8; 3], bucket_size: u8) -> BucketKey {
    (rgb[0] / bucket_size, rgb[1] / bucket_size, rgb[2] / bucket_size)
}

/// Group all pixels into color clusters, ordered by bucket key.
pub fn color_clusters(image: &RgbaImage, bucket_size: u8) -> Vec<ColorCluster> {
    let mut buckets: BTreeMap<BucketKey, Vec<(u32, u32)>> = BTreeMap::new();
    for (x, y, px) in image.enumerate_pixels() {
        let key = quantize([px[0], px[1], px[2]], bucket_size);
        buckets.entry(key).or_default().push((x, y));
    }

    buckets
        .into_iter()
        .map(|(key, pixels)| ColorCluster {
            key,
            count: pixels.len(),
            pixels,
        })
        .collect()
}

/// Pick the background cluster.
///
/// Common clusters that occupy a large share of the border win, highest
/// border count first; otherwise the most populous cluster is used.
pub fn select_background<'a>(
    clusters: &'a [ColorCluster],
    width: u32,
    height: u32,
    options: &BackgroundOptions,
) -> Option<&'a ColorCluster> {
    let total = f64::from(width) * f64::from(height);

    clusters
        .iter()
        .map(|c| (c, c.border_count(width, height)))
        .filter(|&(c, border)| {
            c.count as f64 > total * options.common_share
                && border as f64 > c.count as f64 * options.border_share
        })
        .max_by_key(|&(c, border)| (border, c.count))
        .map(|(c, _)| c)
        .or_else(|| clusters.iter().max_by_key(|c| c.count))
}

/// Per-pixel Sobel edge flags.
#[derive(Debug, Clone)]
pub struct EdgeMap {
    width: u32,
    height: u32,
    edges: Vec<bool>,
}

impl EdgeMap {
    /// Mark pixels whose luminance gradient magnitude exceeds `threshold`.
    ///
    /// The outermost ring lacks a full 3x3 neighbourhood and is never marked.
    pub fn detect(image: &RgbaImage, threshold: f32) -> Self {
        let (width, height) = image.dimensions();
        let w = width as usize;
        let h = height as usize;
        let mut edges = vec![false; w * h];

        if w >= 3 && h >= 3 {
            let gray: Vec<f32> = image
                .pixels()
                .map(|p| 0.299 * f32::from(p[0]) + 0.587 * f32::from(p[1]) + 0.114 * f32::from(p[2]))
                .collect();
            let g = |x: usize, y: usize| gray[y * w + x];

            for y in 1..h - 1 {
                for x in 1..w - 1 {
                    let gx = -g(x - 1, y - 1) - 2.0 * g(x - 1, y) - g(x - 1, y + 1)
                        + g(x + 1, y - 1)
                        + 2.0 * g(x + 1, y)
                        + g(x + 1, y + 1);
                    let gy = -g(x - 1, y - 1) - 2.0 * g(x, y - 1) - g(x + 1, y - 1)
                        + g(x - 1, y + 1)
                        + 2.0 * g(x, y + 1)
                        + g(x + 1, y + 1);
                    edges[y * w + x] = (gx * gx + gy * gy).sqrt() > threshold;
                }
            }
        }

        Self {
            width,
            height,
            edges,
        }
    }

    pub fn is_edge(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height && self.edges[(y * self.width + x) as usize]
    }

    pub fn count(&self) -> usize {
        self.edges.iter().filter(|&&e| e).count()
    }

    /// Flags every pixel within `radius` (Euclidean) of a marked edge.
    pub fn proximity(&self, radius: u32) -> Vec<bool> {
        let w = self.width as i64;
        let h = self.height as i64;
        let r = radius as i64;
        let mut near = vec![false; self.edges.len()];

        for (idx, _) in self.edges.iter().enumerate().filter(|(_, e)| **e) {
            let ex = idx as i64 % w;
            let ey = idx as i64 / w;
            for dy in -r..=r {
                for dx in -r..=r {
                    if dx * dx + dy * dy > r * r {
                        continue;
                    }
                    let (x, y) = (ex + dx, ey + dy);
                    if x >= 0 && y >= 0 && x < w && y < h {
                        near[(y * w + x) as usize] = true;
                    }
                }
            }
        }

        near
    }
}

/// Summary of one background-removal pass.
#[derive(Debug, Clone, Serialize, schemars::JsonSchema)]
pub struct RemovalStats {
    pub width: u32,
    pub height: u32,
    pub clusters: usize,
    pub background_color: String,
    pub background_share: f64,
    pub edge_pixels: usize,
    pub transparent_pixels: usize,
    pub softened_pixels: usize,
}

fn color_distance(a: [u8; 3], b: [u8; 3]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| {
            let d = f32::from(x) - f32::from(y);
            d * d
        })
        .sum::<f32>()
        .sqrt()
}

/// Make the detected background of `image` transparent in place.
pub fn remove_background(
    image: &mut RgbaImage,
    options: &BackgroundOptions,
) -> Result<RemovalStats, ToolError> {
    options.validate()?;

    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(ToolError::invalid_arguments("image has no pixels"));
    }

    let clusters = color_clusters(image, options.bucket_size);
    let background = select_background(&clusters, width, height, options)
        .ok_or_else(|| ToolError::execution_failed("no color clusters found"))?;
    let bg_key = background.key;
    let bg_color = background.representative(options.bucket_size);
    let bg_share = background.count as f64 / (f64::from(width) * f64::from(height));

    let edges = EdgeMap::detect(image, options.edge_threshold);
    let near_edge = edges.proximity(options.edge_radius);

    let mut transparent = 0;
    let mut softened = 0;
    let span = f32::from(MAX_SOFT_ALPHA - MIN_SOFT_ALPHA);

    for (x, y, px) in image.enumerate_pixels_mut() {
        let rgb = [px[0], px[1], px[2]];
        let distance = color_distance(rgb, bg_color);
        let is_background =
            quantize(rgb, options.bucket_size) == bg_key || distance < options.color_tolerance;
        if !is_background {
            continue;
        }

        if near_edge[(y * width + x) as usize] {
            let ratio = (distance / options.color_tolerance).min(1.0);
            let soft = MIN_SOFT_ALPHA + (span * ratio).round() as u8;
            px[3] = px[3].min(soft);
            softened += 1;
        } else {
            px[3] = 0;
            transparent += 1;
        }
    }

    Ok(RemovalStats {
        width,
        height,
        clusters: clusters.len(),
        background_color: format!("#{:02x}{:02x}{:02x}", bg_color[0], bg_color[1], bg_color[2]),
        background_share: bg_share,
        edge_pixels: edges.count(),
        transparent_pixels: transparent,
        softened_pixels: softened,
    })
}
