//! Fit report for order submission.
//!
//! Two questions are answered separately:
//!
//! - Could each item fit the case at all? Its unplaced bounding box,
//!   grown by the tolerance on every side, is compared against the safe
//!   zone. An item that fails here can never be placed, whatever the
//!   user does.
//! - Is the current placement valid? This is the safe-zone fit check
//!   over placed items, summarized as a percentage.
//!
//! Neither is an error during editing. [`FitReport::require_manufacturable`]
//! turns them into one at the point of final submission.

use serde::{Deserialize, Serialize};

use cutout_pipeline::fit::is_fit;
use cutout_pipeline::Layout;

use crate::ExportError;

/// How far an item's box exceeds the safe zone on each axis, in inches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Overflow {
    /// Excess width.
    pub x: f64,
    /// Excess height.
    pub y: f64,
}

/// Per-item result of the unplaced bounds check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemFit {
    /// Layout item id.
    pub id: String,
    /// Whether the item could fit the case.
    pub fits: bool,
    /// Excess on each axis; zero when it fits.
    pub overflow: Overflow,
}

/// Width and height in inches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    /// Horizontal extent.
    pub width: f64,
    /// Vertical extent.
    pub height: f64,
}

/// Summary of whether a layout can be manufactured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FitReport {
    /// Every item could fit the case.
    pub fits: bool,
    /// Unplaced bounds check for each item.
    pub per_item: Vec<ItemFit>,
    /// Extent of all placed items at tolerance.
    pub total_bounds: Size,
    /// Share of placed items inside the safe zone.
    pub fit_percentage: u8,
    /// Ids of placed items outside the safe zone.
    pub outside_safe_zone: Vec<String>,
}

impl FitReport {
    /// Check every item in `layout` with `tolerance` inches of clearance.
    #[must_use]
    pub fn new(layout: &Layout, tolerance: f64) -> Self {
        let case = layout.case();
        let safe = case.safe_zone();

        let per_item: Vec<ItemFit> = layout
            .items()
            .iter()
            .map(|item| {
                let overflow = Overflow {
                    x: (tolerance.mul_add(2.0, item.width) - safe.width).max(0.0),
                    y: (tolerance.mul_add(2.0, item.height) - safe.height).max(0.0),
                };
                ItemFit {
                    id: item.id.clone(),
                    fits: overflow.x <= 0.0 && overflow.y <= 0.0,
                    overflow,
                }
            })
            .collect();

        let total_bounds = layout
            .items()
            .iter()
            .map(|item| item.bounds().padded(tolerance))
            .reduce(|acc, b| acc.union(&b))
            .map_or_else(Size::default, |b| Size {
                width: b.width,
                height: b.height,
            });

        let outside_safe_zone: Vec<String> = layout
            .items()
            .iter()
            .filter(|item| !is_fit(item, case))
            .map(|item| item.id.clone())
            .collect();

        let report = Self {
            fits: per_item.iter().all(|item| item.fits),
            per_item,
            total_bounds,
            fit_percentage: layout.fit_percentage(),
            outside_safe_zone,
        };

        for item in report.per_item.iter().filter(|item| !item.fits) {
            tracing::warn!(
                id = %item.id,
                overflow_x = item.overflow.x,
                overflow_y = item.overflow.y,
                "item cannot fit the case"
            );
        }

        report
    }

    /// Gate for final submission.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::BoundsExceeded`] listing every item that
    /// cannot fit the case, or [`ExportError::PlacementOverflow`] if all
    /// items could fit but some are placed outside the safe zone.
    pub fn require_manufacturable(&self) -> Result<(), ExportError> {
        let exceeded: Vec<ItemFit> = self
            .per_item
            .iter()
            .filter(|item| !item.fits)
            .cloned()
            .collect();
        if !exceeded.is_empty() {
            return Err(ExportError::BoundsExceeded(exceeded));
        }
        if !self.outside_safe_zone.is_empty() {
            return Err(ExportError::PlacementOverflow(
                self.outside_safe_zone.clone(),
            ));
        }
        Ok(())
    }
}
