//! Mask building: split a background-removed buffer into per-object
//! binary masks.
//!
//! Pixels with alpha at or above [`FOREGROUND_ALPHA`](crate::buffer::FOREGROUND_ALPHA)
//! are foreground. Each 4-connected foreground region becomes one
//! [`ObjectMask`]; regions smaller than the minimum area are noise and
//! are discarded.
//!
//! This is the first stage of the pipeline.

use image::Luma;

use crate::buffer::PixelBuffer;
use crate::types::{GrayImage, PixelBox};

/// Value written for mask pixels. Everything else is 0.
pub const MASK_ON: Luma<u8> = Luma([255]);

/// Binary bitmap marking the pixels of one physical object.
///
/// The bitmap always spans the full source grid so that every stage
/// works in the same coordinate frame.
#[derive(Debug, Clone)]
pub struct ObjectMask {
    /// Full-frame bitmap, 255 inside the object and 0 elsewhere.
    pub bitmap: GrayImage,
    /// Tight bounds of the set pixels.
    pub bounds: PixelBox,
    /// Number of set pixels.
    pub area: u32,
    /// Position of this object in segmentation order.
    pub index: usize,
}

impl ObjectMask {
    /// Build a mask from a bitmap, measuring its bounds and area.
    ///
    /// Returns `None` when the bitmap has no set pixels.
    #[must_use]
    pub fn from_bitmap(bitmap: GrayImage, index: usize) -> Option<Self> {
        let bounds = PixelBox::of_foreground(&bitmap)?;
        let area = u32::try_from(bitmap.pixels().filter(|p| p.0[0] > 0).count()).ok()?;
        Some(Self {
            bitmap,
            bounds,
            area,
            index,
        })
    }

    /// Whether `(x, y)` is inside the mask. Out-of-range reads as outside.
    #[must_use]
    pub fn contains(&self, x: u32, y: u32) -> bool {
        x < self.bitmap.width() && y < self.bitmap.height() && self.bitmap.get_pixel(x, y).0[0] > 0
    }
}

/// Split `buffer` into one mask per 4-connected foreground region.
///
/// Regions are discovered in row-major scan order. Regions with fewer
/// than `min_area` pixels are dropped. An image with no qualifying
/// regions yields an empty list.
#[must_use = "returns the object masks"]
pub fn build_masks(buffer: &PixelBuffer, min_area: u32) -> Vec<ObjectMask> {
    build_masks_in(buffer, min_area, None)
}

/// Like [`build_masks`], but only scans inside `hint`.
///
/// Used when an external recognizer supplies a bounding box for the
/// object of interest. Regions are clipped to the hint.
#[must_use = "returns the object masks"]
pub fn build_masks_in(buffer: &PixelBuffer, min_area: u32, hint: Option<PixelBox>) -> Vec<ObjectMask> {
    let (width, height) = (buffer.width(), buffer.height());
    let region = match hint {
        Some(h) => h.clamped(width, height),
        None => PixelBox::full(width, height),
    };
    let Some(region) = region else {
        return Vec::new();
    };

    let mut visited = vec![false; width as usize * height as usize];
    let mut pixels = Vec::new();
    let mut masks = Vec::new();
    let mut discarded = 0_usize;

    for y in region.min_y..=region.max_y {
        for x in region.min_x..=region.max_x {
            let i = index(width, x, y);
            if visited[i] || !buffer.is_foreground(x, y) {
                continue;
            }
            let bounds = flood_fill(buffer, region, (x, y), &mut visited, &mut pixels);
            let area = u32::try_from(pixels.len()).unwrap_or(u32::MAX);
            if area < min_area {
                discarded += 1;
                continue;
            }
            let mut bitmap = GrayImage::new(width, height);
            for &(px, py) in &pixels {
                bitmap.put_pixel(px, py, MASK_ON);
            }
            masks.push(ObjectMask {
                bitmap,
                bounds,
                area,
                index: masks.len(),
            });
        }
    }

    tracing::debug!(
        kept = masks.len(),
        discarded,
        min_area,
        "segmented foreground regions"
    );
    masks
}

/// 4-connected flood fill from `start`, marking `visited` as it goes.
///
/// Replaces the contents of `pixels` with the region's pixels and
/// returns its bounds. No full-frame bitmap is allocated here.
fn flood_fill(
    buffer: &PixelBuffer,
    region: PixelBox,
    start: (u32, u32),
    visited: &mut [bool],
    pixels: &mut Vec<(u32, u32)>,
) -> PixelBox {
    let width = buffer.width();
    let mut bounds = PixelBox::at(start.0, start.1);
    pixels.clear();

    let mut stack = vec![start];
    visited[index(width, start.0, start.1)] = true;

    while let Some((x, y)) = stack.pop() {
        pixels.push((x, y));
        bounds.include(x, y);

        for (nx, ny) in neighbors4(x, y, region) {
            let i = index(width, nx, ny);
            if !visited[i] && buffer.is_foreground(nx, ny) {
                visited[i] = true;
                stack.push((nx, ny));
            }
        }
    }

    bounds
}

/// The up-to-four orthogonal neighbors of `(x, y)` that lie inside `region`.
pub(crate) fn neighbors4(x: u32, y: u32, region: PixelBox) -> impl Iterator<Item = (u32, u32)> {
    let left = (x > region.min_x).then_some((x.wrapping_sub(1), y));
    let right = (x < region.max_x).then_some((x + 1, y));
    let up = (y > region.min_y).then_some((x, y.wrapping_sub(1)));
    let down = (y < region.max_y).then_some((x, y + 1));
    [left, right, up, down].into_iter().flatten()
}

/// Row-major index into a `width`-wide grid.
pub(crate) const fn index(width: u32, x: u32, y: u32) -> usize {
    y as usize * width as usize + x as usize
}
