//! Layout item JSON for order submission.
//!
//! Each item is written as
//! `{id, name, points: [[x, y], ...], x, y, rotation, width, height, depth}`
//! with points in origin-relative inches and rotation in degrees.
//! [`parse_items`] reads the same shape back.

use serde::{Deserialize, Serialize};

use cutout_pipeline::{LayoutItem, Point, Polygon, Rotation};

use crate::ExportError;

/// Wire form of one [`LayoutItem`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ItemRecord {
    id: String,
    name: String,
    points: Vec<[f64; 2]>,
    x: f64,
    y: f64,
    rotation: Rotation,
    width: f64,
    height: f64,
    depth: f64,
}

impl From<&LayoutItem> for ItemRecord {
    fn from(item: &LayoutItem) -> Self {
        Self {
            id: item.id.clone(),
            name: item.name.clone(),
            points: item.polygon.points().iter().map(|p| [p.x, p.y]).collect(),
            x: item.x,
            y: item.y,
            rotation: item.rotation,
            width: item.width,
            height: item.height,
            depth: item.depth,
        }
    }
}

impl From<ItemRecord> for LayoutItem {
    fn from(record: ItemRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            polygon: Polygon::inches(
                record
                    .points
                    .into_iter()
                    .map(|[x, y]| Point::new(x, y))
                    .collect(),
            ),
            x: record.x,
            y: record.y,
            rotation: record.rotation,
            width: record.width,
            height: record.height,
            depth: record.depth,
            color: None,
        }
    }
}

/// Serialize `items` as a pretty-printed JSON array.
///
/// # Errors
///
/// Returns [`ExportError::Json`] if serialization fails.
pub fn items_to_json(items: &[LayoutItem]) -> Result<String, ExportError> {
    let records: Vec<ItemRecord> = items.iter().map(ItemRecord::from).collect();
    Ok(serde_json::to_string_pretty(&records)?)
}

/// Parse a JSON array written by [`items_to_json`].
///
/// # Errors
///
/// Returns [`ExportError::Json`] for malformed input or a rotation that
/// is not a multiple of 90 degrees, and [`ExportError::InvalidItem`] for
/// an item with fewer than three points or a non-positive size.
pub fn parse_items(json: &str) -> Result<Vec<LayoutItem>, ExportError> {
    let records: Vec<ItemRecord> = serde_json::from_str(json)?;
    records
        .into_iter()
        .map(|record| {
            if record.points.len() < 3 {
                return Err(ExportError::InvalidItem {
                    id: record.id,
                    reason: format!("{} points, need at least 3", record.points.len()),
                });
            }
            if !(record.width > 0.0 && record.height > 0.0) {
                return Err(ExportError::InvalidItem {
                    id: record.id,
                    reason: format!("size {}x{} is not positive", record.width, record.height),
                });
            }
            Ok(LayoutItem::from(record))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use cutout_pipeline::{CaseFootprint, Layout, LayoutConfig};

    use super::*;

    fn triangle() -> Polygon {
        Polygon::inches(vec![
            Point::new(0.0, 0.0),
            Point::new(3.0, 0.0),
            Point::new(0.0, 2.0),
        ])
    }

    #[test]
    fn writes_expected_keys() {
        let mut layout = Layout::new(CaseFootprint::new(24.0, 18.0));
        let id = layout.add("Wedge", &triangle(), 1.5).unwrap();
        layout.rotate_clockwise(&id).unwrap();

        let json = items_to_json(layout.items()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let item = &value[0];
        assert_eq!(item["id"], "item-1");
        assert_eq!(item["name"], "Wedge");
        assert_eq!(item["rotation"], 90);
        assert_eq!(item["width"], 2.0);
        assert_eq!(item["height"], 3.0);
        assert_eq!(item["depth"], 1.5);
        assert_eq!(item["points"].as_array().unwrap().len(), 3);
        assert!(item.get("color").is_none());
    }

    #[test]
    fn parses_what_it_writes() {
        let mut layout = Layout::new(CaseFootprint::new(24.0, 18.0));
        layout.add("Wedge", &triangle(), 1.0).unwrap();
        let json = items_to_json(layout.items()).unwrap();
        let items = parse_items(&json).unwrap();
        assert_eq!(items.as_slice(), layout.items());
    }

    #[test]
    fn computed_coordinates_survive_exactly() {
        // Thirds, sevenths and trig values have no short decimal form.
        let outline = Polygon::inches(
            (0..24)
                .map(|i| {
                    let t = f64::from(i) * std::f64::consts::TAU / 24.0;
                    Point::new(3.0 + t.cos() / 3.0, 2.0 + t.sin() / 7.0)
                })
                .collect(),
        );
        let mut layout = Layout::new(CaseFootprint::new(24.0, 18.0));
        let id = layout.add("Ring", &outline, 1.0 / 3.0).unwrap();
        layout.move_to(&id, 0.1 + 0.2, 1.0 / 0.65).unwrap();

        let json = items_to_json(layout.items()).unwrap();
        let items = parse_items(&json).unwrap();
        assert_eq!(items.as_slice(), layout.items());
    }

    #[test]
    fn saved_layout_reloads_for_editing() {
        let mut layout = Layout::new(CaseFootprint::new(24.0, 18.0));
        layout.add("Wedge", &triangle(), 1.0).unwrap();
        layout.add("Wedge", &triangle(), 1.0).unwrap();
        let json = items_to_json(layout.items()).unwrap();

        let mut reloaded = Layout::from_items(
            *layout.case(),
            LayoutConfig::default(),
            parse_items(&json).unwrap(),
        )
        .unwrap();
        assert_eq!(reloaded.fit_percentage(), layout.fit_percentage());
        assert!(reloaded.pack().is_empty());
        assert_eq!(reloaded.fit_percentage(), 100);
        assert_eq!(
            reloaded.add("Wedge", &triangle(), 1.0).unwrap(),
            "item-3"
        );
    }

    #[test]
    fn rejects_odd_rotation() {
        let json = r#"[{"id":"a","name":"A","points":[[0,0],[1,0],[0,1]],
            "x":1,"y":1,"rotation":45,"width":1,"height":1,"depth":1}]"#;
        assert!(matches!(parse_items(json), Err(ExportError::Json(_))));
    }

    #[test]
    fn rejects_short_outline() {
        let json = r#"[{"id":"a","name":"A","points":[[0,0],[1,0]],
            "x":1,"y":1,"rotation":0,"width":1,"height":1,"depth":1}]"#;
        assert!(matches!(
            parse_items(json),
            Err(ExportError::InvalidItem { id, .. }) if id == "a"
        ));
    }

    #[test]
    fn empty_array_is_empty_list() {
        assert!(parse_items("[]").unwrap().is_empty());
    }
}
