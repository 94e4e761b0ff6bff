//! Mask refinement: hole filling, gap bridging, and fit margin.
//!
//! Three transforms run in order over the full source grid:
//!
//! 1. [`fill_holes`] makes the silhouette solid (trigger guards, key
//!    rings, and the like should not leave islands of foam).
//! 2. [`close`] bridges narrow gaps and shallow concavities with a
//!    dilate-then-erode of radius `gap_fill`.
//! 3. [`dilate`] grows the result by `margin` so the cutout is slightly
//!    larger than the object.
//!
//! Dilation and erosion use a Euclidean disk via `imageproc`'s L2
//! distance transform. Each transform returns a new bitmap; the input is
//! never modified.

use imageproc::distance_transform::Norm;

use crate::mask::{MASK_ON, ObjectMask, index, neighbors4};
use crate::types::{GrayImage, PixelBox};

/// Fill every background pixel that cannot be reached from the image
/// border without crossing the mask.
///
/// The background is flooded (4-connected) from every border pixel that
/// is not part of the mask; whatever the flood never reaches is interior
/// and becomes foreground.
#[must_use = "returns the filled bitmap"]
pub fn fill_holes(bitmap: &GrayImage) -> GrayImage {
    let (width, height) = bitmap.dimensions();
    let Some(full) = PixelBox::full(width, height) else {
        return bitmap.clone();
    };
    let is_set = |x: u32, y: u32| bitmap.get_pixel(x, y).0[0] > 0;

    let mut outside = vec![false; width as usize * height as usize];
    let mut stack = Vec::new();

    let border = (0..width)
        .flat_map(|x| [(x, 0), (x, height - 1)])
        .chain((0..height).flat_map(|y| [(0, y), (width - 1, y)]));
    for (x, y) in border {
        let i = index(width, x, y);
        if !outside[i] && !is_set(x, y) {
            outside[i] = true;
            stack.push((x, y));
        }
    }

    while let Some((x, y)) = stack.pop() {
        for (nx, ny) in neighbors4(x, y, full) {
            let i = index(width, nx, ny);
            if !outside[i] && !is_set(nx, ny) {
                outside[i] = true;
                stack.push((nx, ny));
            }
        }
    }

    let mut filled = bitmap.clone();
    for (x, y, pixel) in filled.enumerate_pixels_mut() {
        if !outside[index(width, x, y)] {
            *pixel = MASK_ON;
        }
    }
    filled
}

/// Set every pixel within Euclidean distance `radius` of the mask.
#[must_use = "returns the dilated bitmap"]
pub fn dilate(bitmap: &GrayImage, radius: u8) -> GrayImage {
    if radius == 0 {
        return bitmap.clone();
    }
    imageproc::morphology::dilate(bitmap, Norm::L2, radius)
}

/// Keep only pixels whose whole radius-`radius` disk is foreground.
#[must_use = "returns the eroded bitmap"]
pub fn erode(bitmap: &GrayImage, radius: u8) -> GrayImage {
    if radius == 0 {
        return bitmap.clone();
    }
    imageproc::morphology::erode(bitmap, Norm::L2, radius)
}

/// Morphological closing: [`dilate`] then [`erode`] by the same radius.
#[must_use = "returns the closed bitmap"]
pub fn close(bitmap: &GrayImage, radius: u8) -> GrayImage {
    erode(&dilate(bitmap, radius), radius)
}

/// Run all three refinement transforms on one mask.
///
/// Returns a fresh mask with recomputed bounds and area, or `None` if
/// nothing survives (only possible for degenerate inputs).
#[must_use = "returns the refined mask"]
pub fn refine(mask: &ObjectMask, gap_fill: u8, margin: u8) -> Option<ObjectMask> {
    let solid = fill_holes(&mask.bitmap);
    let bridged = close(&solid, gap_fill);
    let grown = dilate(&bridged, margin);
    ObjectMask::from_bitmap(grown, mask.index)
}
