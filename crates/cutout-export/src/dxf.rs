//! DXF export serializer.
//!
//! Writes an [`ExportModel`] as closed `LWPOLYLINE` entities for CNC
//! ingestion using the [`dxf`] crate. Units are inches and the y axis is
//! flipped so the drawing reads the same way up as the layout.
//!
//! The case frame goes on the [`CASE_LAYER`] layer. Pockets are grouped
//! onto one layer per depth (see [`pocket_layer`]) so the CAM operator
//! can assign a cut depth per layer.
//!
//! This is a pure function with no I/O -- it returns a `String`.

use std::collections::BTreeSet;

use dxf::entities::{Entity, EntityType, LwPolyline};
use dxf::enums::{AcadVersion, DrawingUnits, Units};
use dxf::tables::Layer;
use dxf::{Drawing, LwPolylineVertex};

use cutout_pipeline::Polygon;

use crate::ExportError;
use crate::model::ExportModel;

/// Layer holding the case outline.
pub const CASE_LAYER: &str = "CASE";

/// Layer name for pockets cut to `depth` inches.
#[must_use]
pub fn pocket_layer(depth: f64) -> String {
    format!("POCKET-{depth:.3}")
}

/// Serialize `model` to DXF text.
///
/// # Errors
///
/// Returns [`ExportError::Dxf`] if the drawing cannot be written and
/// [`ExportError::Utf8`] if the writer emits invalid UTF-8.
pub fn to_dxf(model: &ExportModel) -> Result<String, ExportError> {
    let mut drawing = Drawing::new();
    drawing.header.version = AcadVersion::R2010;
    drawing.header.default_drawing_units = Units::Inches;
    drawing.header.drawing_units = DrawingUnits::English;

    let layers: BTreeSet<String> = std::iter::once(CASE_LAYER.to_owned())
        .chain(model.paths().iter().map(|p| pocket_layer(p.depth)))
        .collect();
    for name in layers {
        drawing.add_layer(Layer {
            name,
            ..Default::default()
        });
    }

    drawing.add_entity(polyline_entity(model.case(), CASE_LAYER.to_owned()));
    for path in model.paths() {
        if path.outline.len() < 3 {
            tracing::warn!(id = %path.id, "skipping degenerate pocket outline");
            continue;
        }
        drawing.add_entity(polyline_entity(&path.outline, pocket_layer(path.depth)));
    }

    let mut buf = Vec::new();
    drawing.save(&mut buf)?;
    Ok(String::from_utf8(buf)?)
}

fn polyline_entity(polygon: &Polygon, layer: String) -> Entity {
    let mut polyline = LwPolyline::default();
    polyline.vertices = polygon
        .points()
        .iter()
        .map(|p| LwPolylineVertex {
            x: p.x,
            y: -p.y,
            ..Default::default()
        })
        .collect();
    polyline.set_is_closed(true);

    let mut entity = Entity::new(EntityType::LwPolyline(polyline));
    entity.common.layer = layer;
    entity
}

#[cfg(test)]
mod tests {
    use cutout_pipeline::{CaseFootprint, Layout, Point};

    use super::*;
    use crate::model::ExportConfig;

    fn square(size: f64) -> Polygon {
        Polygon::inches(vec![
            Point::new(0.0, 0.0),
            Point::new(size, 0.0),
            Point::new(size, size),
            Point::new(0.0, size),
        ])
    }

    fn model() -> ExportModel {
        let mut layout = Layout::new(CaseFootprint::new(24.0, 18.0));
        layout.add("Shallow", &square(3.0), 1.0).unwrap();
        layout.add("Deep", &square(2.0), 2.0).unwrap();
        layout.pack();
        ExportModel::compose(&layout, &ExportConfig::default()).unwrap()
    }

    fn polylines(drawing: &Drawing) -> Vec<&LwPolyline> {
        drawing
            .entities()
            .filter_map(|e| match &e.specific {
                EntityType::LwPolyline(p) => Some(p),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn writes_one_polyline_per_path_plus_case() {
        let text = to_dxf(&model()).unwrap();
        let drawing = Drawing::load(&mut text.as_bytes()).unwrap();
        let lines = polylines(&drawing);
        assert_eq!(lines.len(), 3);
        assert!(lines.iter().all(|p| p.is_closed()));
    }

    #[test]
    fn layers_follow_depth() {
        let text = to_dxf(&model()).unwrap();
        let drawing = Drawing::load(&mut text.as_bytes()).unwrap();
        let layers: Vec<&str> = drawing
            .entities()
            .map(|e| e.common.layer.as_str())
            .collect();
        assert_eq!(layers, ["CASE", "POCKET-1.000", "POCKET-2.000"]);
    }

    #[test]
    fn case_is_flipped_and_centered() {
        let text = to_dxf(&model()).unwrap();
        let drawing = Drawing::load(&mut text.as_bytes()).unwrap();
        let case = polylines(&drawing)[0];
        let first = &case.vertices[0];
        // Model corner (-12, -9) lands at (-12, 9) with y up.
        assert!((first.x + 12.0).abs() < 1e-9);
        assert!((first.y - 9.0).abs() < 1e-9);
    }

    #[test]
    fn header_declares_inches() {
        let text = to_dxf(&model()).unwrap();
        let drawing = Drawing::load(&mut text.as_bytes()).unwrap();
        assert_eq!(drawing.header.default_drawing_units, Units::Inches);
    }

    #[test]
    fn pocket_layer_names_are_stable() {
        assert_eq!(pocket_layer(0.5), "POCKET-0.500");
        assert_eq!(pocket_layer(1.25), "POCKET-1.250");
    }
}
