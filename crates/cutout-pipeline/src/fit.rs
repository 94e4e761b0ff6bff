//! Safe-zone fit check.
//!
//! An item fits when its bounding box lies entirely inside the case's
//! safe zone (the footprint shrunk by the border margin on every side).
//! The check is bounding-box based, so it can flag a concave item whose
//! actual outline would clear the margin. It never passes an item that
//! overflows.

use crate::layout::{CaseFootprint, LayoutItem};
use crate::types::Rect;

/// Whether `bounds` (case-local inches) lies inside the safe zone.
///
/// Edges are inclusive: an item touching the margin line fits.
#[must_use]
pub fn bounds_fit(bounds: &Rect, case: &CaseFootprint) -> bool {
    let m = case.border_margin;
    bounds.x >= m
        && bounds.y >= m
        && bounds.x + bounds.width <= case.width - m
        && bounds.y + bounds.height <= case.height - m
}

/// Whether a placed item fits its case.
#[must_use]
pub fn is_fit(item: &LayoutItem, case: &CaseFootprint) -> bool {
    bounds_fit(&item.bounds(), case)
}

/// Share of items that fit, as a rounded whole percentage.
///
/// Zero when there are no items.
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn fit_percentage(items: &[LayoutItem], case: &CaseFootprint) -> u8 {
    if items.is_empty() {
        return 0;
    }
    let inside = items.iter().filter(|item| is_fit(item, case)).count();
    (100.0 * inside as f64 / items.len() as f64).round() as u8
}

/// Whether every item fits. An empty layout trivially does.
#[must_use]
pub fn all_fit(items: &[LayoutItem], case: &CaseFootprint) -> bool {
    items.iter().all(|item| is_fit(item, case))
}
