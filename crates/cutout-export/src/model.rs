//! Composed export geometry.
//!
//! An [`ExportModel`] gathers the case outline and every placed pocket
//! outline into one coordinate frame, in inches with y pointing down as
//! in the layout. Each pocket is offset by the manufacturing tolerance,
//! lightly simplified, and the whole model is then centered on the
//! origin so serializers can work from its bounds alone.

use serde::{Deserialize, Serialize};

use cutout_pipeline::simplify::simplify;
use cutout_pipeline::{Layout, Point, Polygon, Rect};

use crate::ExportError;
use crate::offset::{OffsetKind, Offsetter};

/// Parameters for composing an export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExportConfig {
    /// Clearance added around every pocket, in inches.
    ///
    /// Negative values shrink the pocket.
    pub tolerance: f64,
    /// Simplification tolerance applied after offsetting, in inches.
    pub simplify_threshold: f64,
    /// How the tolerance is applied.
    pub offset: OffsetKind,
}

impl ExportConfig {
    /// Default for [`tolerance`](Self::tolerance).
    pub const DEFAULT_TOLERANCE: f64 = 0.0625;
    /// Default for [`simplify_threshold`](Self::simplify_threshold).
    pub const DEFAULT_SIMPLIFY_THRESHOLD: f64 = 0.01;

    /// Check parameter ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::InvalidConfig`] for a non-finite tolerance
    /// or a negative or non-finite simplify threshold.
    pub fn validate(&self) -> Result<(), ExportError> {
        if !self.tolerance.is_finite() {
            return Err(ExportError::InvalidConfig(format!(
                "tolerance must be finite, got {}",
                self.tolerance
            )));
        }
        if !self.simplify_threshold.is_finite() || self.simplify_threshold < 0.0 {
            return Err(ExportError::InvalidConfig(format!(
                "simplify_threshold must be finite and non-negative, got {}",
                self.simplify_threshold
            )));
        }
        Ok(())
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            tolerance: Self::DEFAULT_TOLERANCE,
            simplify_threshold: Self::DEFAULT_SIMPLIFY_THRESHOLD,
            offset: OffsetKind::default(),
        }
    }
}

/// One pocket outline in the composed model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportPath {
    /// Layout item id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Pocket depth in inches.
    pub depth: f64,
    /// Offset outline in model coordinates.
    pub outline: Polygon,
}

/// Case frame plus pocket outlines, centered on the origin.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportModel {
    case: Polygon,
    paths: Vec<ExportPath>,
    bounds: Rect,
}

impl ExportModel {
    /// Compose the model for `layout`.
    ///
    /// Pockets are offset at their placed position, simplified, and the
    /// result is translated so the bounds are centered on `(0, 0)`.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::InvalidConfig`] if `config` fails
    /// validation.
    pub fn compose(layout: &Layout, config: &ExportConfig) -> Result<Self, ExportError> {
        config.validate()?;

        let outline = layout.case().outline();
        let case = rect_polygon(&outline);

        let paths: Vec<ExportPath> = layout
            .items()
            .iter()
            .map(|item| {
                let offset = config
                    .offset
                    .offset(&item.placed_polygon(), config.tolerance);
                ExportPath {
                    id: item.id.clone(),
                    name: item.name.clone(),
                    depth: item.depth,
                    outline: simplify(&offset, config.simplify_threshold),
                }
            })
            .collect();

        let bounds = paths
            .iter()
            .filter_map(|path| path.outline.bounds())
            .fold(outline, |acc, b| acc.union(&b));
        let center = bounds.center();

        tracing::debug!(
            pockets = paths.len(),
            width = bounds.width,
            height = bounds.height,
            "composed export model"
        );

        Ok(Self {
            case: case.translated(-center.x, -center.y),
            paths: paths
                .into_iter()
                .map(|path| ExportPath {
                    outline: path.outline.translated(-center.x, -center.y),
                    ..path
                })
                .collect(),
            bounds: Rect::new(
                bounds.x - center.x,
                bounds.y - center.y,
                bounds.width,
                bounds.height,
            ),
        })
    }

    /// Case frame outline.
    #[must_use]
    pub const fn case(&self) -> &Polygon {
        &self.case
    }

    /// Pocket outlines in layout order.
    #[must_use]
    pub fn paths(&self) -> &[ExportPath] {
        &self.paths
    }

    /// Bounds of everything in the model.
    #[must_use]
    pub const fn bounds(&self) -> Rect {
        self.bounds
    }
}

fn rect_polygon(rect: &Rect) -> Polygon {
    Polygon::inches(vec![
        Point::new(rect.x, rect.y),
        Point::new(rect.right(), rect.y),
        Point::new(rect.right(), rect.bottom()),
        Point::new(rect.x, rect.bottom()),
    ])
}

#[cfg(test)]
mod tests {
    use cutout_pipeline::CaseFootprint;

    use super::*;

    fn square(size: f64) -> Polygon {
        Polygon::inches(vec![
            Point::new(0.0, 0.0),
            Point::new(size, 0.0),
            Point::new(size, size),
            Point::new(0.0, size),
        ])
    }

    fn assert_near(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{a} != {b}");
    }

    #[test]
    fn empty_layout_is_just_the_case() {
        let layout = Layout::new(CaseFootprint::new(24.0, 18.0));
        let model = ExportModel::compose(&layout, &ExportConfig::default()).unwrap();
        assert!(model.paths().is_empty());
        let b = model.bounds();
        assert_near(b.x, -12.0);
        assert_near(b.y, -9.0);
        assert_near(b.width, 24.0);
        assert_near(b.height, 18.0);
    }

    #[test]
    fn pockets_are_offset_and_centered() {
        let mut layout = Layout::new(CaseFootprint::new(24.0, 18.0));
        let id = layout.add("Block", &square(4.0), 1.5).unwrap();
        layout.move_to(&id, 10.0, 7.0).unwrap();

        let config = ExportConfig {
            tolerance: 0.25,
            offset: OffsetKind::EdgeNormal,
            ..ExportConfig::default()
        };
        let model = ExportModel::compose(&layout, &config).unwrap();
        let pocket = &model.paths()[0];
        assert_eq!(pocket.id, id);
        assert_near(pocket.depth, 1.5);

        // Square spans 10..14 x 7..11, grown to 9.75..14.25, then the
        // case center (12, 9) moves to the origin.
        let b = pocket.outline.bounds().unwrap();
        assert_near(b.x, -2.25);
        assert_near(b.y, -2.25);
        assert_near(b.width, 4.5);
    }

    #[test]
    fn overhanging_pocket_widens_bounds() {
        let mut layout = Layout::new(CaseFootprint::new(10.0, 10.0));
        let id = layout.add("Long", &square(4.0), 1.0).unwrap();
        layout.move_to(&id, 8.0, 3.0).unwrap();
        let config = ExportConfig {
            tolerance: 0.0,
            ..ExportConfig::default()
        };
        let model = ExportModel::compose(&layout, &config).unwrap();
        assert_near(model.bounds().width, 12.0);
        assert_near(model.bounds().center().x, 0.0);
    }

    #[test]
    fn rejects_non_finite_tolerance() {
        let layout = Layout::new(CaseFootprint::new(10.0, 10.0));
        let config = ExportConfig {
            tolerance: f64::NAN,
            ..ExportConfig::default()
        };
        assert!(matches!(
            ExportModel::compose(&layout, &config),
            Err(ExportError::InvalidConfig(_))
        ));
    }

    #[test]
    fn config_defaults_fill_missing_fields() {
        let config: ExportConfig = serde_json::from_str(r#"{"tolerance": 0.1}"#).unwrap();
        assert_near(config.tolerance, 0.1);
        assert_near(config.simplify_threshold, ExportConfig::DEFAULT_SIMPLIFY_THRESHOLD);
        assert_eq!(config.offset, OffsetKind::CentroidScale);
    }
}
