//! SVG export serializer.
//!
//! Converts an [`ExportModel`] into an SVG preview string using the
//! [`svg`] crate for document construction, XML escaping, and path data
//! formatting. Document units are inches: `width`/`height` carry an `in`
//! suffix and the `viewBox` is the model bounds.
//!
//! The case frame is a thin dark stroke. Pockets use the fixed orange
//! convention ([`POCKET_COLOR`] stroke with a translucent fill) and carry
//! their layout id so a viewer can map clicks back to items.
//!
//! This is a pure function with no I/O -- it returns a `String`.

use svg::Document;
use svg::node::element::path::Data;
use svg::node::element::{Description, Group, Path, Title};
use svg::node::{Text, Value};

use cutout_pipeline::Polygon;

use crate::model::ExportModel;

/// Stroke and fill color for pockets.
pub const POCKET_COLOR: &str = "#f97316";

/// Opacity of the pocket fill.
const POCKET_FILL_OPACITY: f64 = 0.25;

/// Stroke color for the case frame.
const CASE_COLOR: &str = "#1f2937";

/// Stroke width in inches.
const STROKE_WIDTH: f64 = 0.03;

/// Metadata to embed in the SVG document.
///
/// Both fields are optional. When present, a `<title>` and/or `<desc>`
/// element is emitted immediately after the opening `<svg>` tag.
#[derive(Debug, Clone, Default)]
pub struct SvgMetadata<'a> {
    /// Document title, emitted as `<title>`.
    pub title: Option<&'a str>,
    /// Document description, emitted as `<desc>`.
    pub description: Option<&'a str>,
}

/// Build an SVG path `d` attribute string for a closed polygon.
///
/// Uses `M` for the first point, `L` for the rest, and closes the ring.
/// Returns an empty string for polygons with fewer than 2 points.
///
/// # Examples
///
/// ```
/// use cutout_pipeline::{Point, Polygon};
/// use cutout_export::svg::build_path_data;
///
/// let polygon = Polygon::inches(vec![
///     Point::new(0.0, 0.0),
///     Point::new(2.0, 0.0),
///     Point::new(2.0, 1.5),
/// ]);
/// let d = build_path_data(&polygon);
/// assert!(d.starts_with("M0,0 L2,0 L2,1.5"));
/// ```
#[must_use]
pub fn build_path_data(polygon: &Polygon) -> String {
    let points = polygon.points();
    if points.len() < 2 {
        return String::new();
    }

    let first = &points[0];
    let mut data = Data::new().move_to((first.x, first.y));
    for p in &points[1..] {
        data = data.line_to((p.x, p.y));
    }
    String::from(Value::from(data.close()))
}

/// Serialize `model` into an SVG document string.
#[must_use]
pub fn to_svg(model: &ExportModel, metadata: &SvgMetadata<'_>) -> String {
    let b = model.bounds();
    let mut doc = Document::new()
        .set("width", format!("{}in", b.width))
        .set("height", format!("{}in", b.height))
        .set("viewBox", (b.x, b.y, b.width, b.height));

    if let Some(title) = metadata.title {
        doc = doc.add(Title::new(title));
    }
    if let Some(description) = metadata.description {
        doc = doc.add(Description::new().add(Text::new(description)));
    }

    doc = doc.add(
        Path::new()
            .set("id", "case")
            .set("d", build_path_data(model.case()))
            .set("fill", "none")
            .set("stroke", CASE_COLOR)
            .set("stroke-width", STROKE_WIDTH),
    );

    let mut pockets = Group::new()
        .set("id", "pockets")
        .set("fill", POCKET_COLOR)
        .set("fill-opacity", POCKET_FILL_OPACITY)
        .set("stroke", POCKET_COLOR)
        .set("stroke-width", STROKE_WIDTH);
    for path in model.paths() {
        let d = build_path_data(&path.outline);
        if d.is_empty() {
            continue;
        }
        pockets = pockets.add(
            Path::new()
                .set("id", path.id.as_str())
                .set("d", d)
                .add(Title::new(path.name.as_str())),
        );
    }
    doc = doc.add(pockets);

    // The svg crate omits the XML declaration, so we prepend it.
    format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{doc}\n")
}
