//! Case layout: placing calibrated outlines inside a case footprint.
//!
//! Items live in case-local inches with the origin at the footprint's
//! top-left corner. Each item's outline is stored origin-relative (its
//! bounding box starts at `(0, 0)`) and placed by its `x`/`y` offset.
//!
//! [`pack`] gives a deterministic automatic placement. After that, the
//! [`Layout`] session applies manual edits (drag, rotate, duplicate,
//! delete) to individual items without re-running the packer.

use serde::{Deserialize, Serialize};

use crate::fit;
use crate::hit_test::point_in_polygon;
use crate::types::{Point, Polygon, Rect, Unit};

/// Clearance between the case wall and any item, in inches.
pub const BORDER_MARGIN: f64 = 1.0;

/// Minimum clearance between two packed items, in inches.
pub const SPACING: f64 = 0.5;

/// Grid resolution of the packer's position search, in inches.
pub const STEP: f64 = 0.25;

/// Packer parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayoutConfig {
    /// Clearance between neighboring items.
    pub spacing: f64,
    /// Candidate position step.
    pub step: f64,
}

impl LayoutConfig {
    /// Default for [`spacing`](Self::spacing).
    pub const DEFAULT_SPACING: f64 = SPACING;
    /// Default for [`step`](Self::step).
    pub const DEFAULT_STEP: f64 = STEP;
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            spacing: Self::DEFAULT_SPACING,
            step: Self::DEFAULT_STEP,
        }
    }
}

/// Interior dimensions of a case, in inches.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseFootprint {
    /// Interior width.
    pub width: f64,
    /// Interior height.
    pub height: f64,
    /// Mandatory clearance from every wall.
    pub border_margin: f64,
}

impl CaseFootprint {
    /// A footprint with the standard [`BORDER_MARGIN`].
    #[must_use]
    pub const fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            border_margin: BORDER_MARGIN,
        }
    }

    /// The full footprint rectangle.
    #[must_use]
    pub const fn outline(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width, self.height)
    }

    /// The interior left after the border margin. May have negative
    /// extent for a case smaller than twice the margin.
    #[must_use]
    pub fn safe_zone(&self) -> Rect {
        let m = self.border_margin;
        Rect::new(m, m, m.mul_add(-2.0, self.width), m.mul_add(-2.0, self.height))
    }
}

/// A stock case model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CasePreset {
    /// Stable identifier.
    pub id: &'static str,
    /// Manufacturer.
    pub brand: &'static str,
    /// Model name.
    pub name: &'static str,
    /// Interior width in inches.
    pub inner_width: f64,
    /// Interior height in inches.
    pub inner_height: f64,
}

/// Built-in case presets.
pub const CASE_PRESETS: &[CasePreset] = &[
    CasePreset {
        id: "pelican-1450",
        brand: "Pelican",
        name: "1450",
        inner_width: 14.62,
        inner_height: 10.18,
    },
    CasePreset {
        id: "pelican-1510",
        brand: "Pelican",
        name: "1510",
        inner_width: 19.75,
        inner_height: 11.0,
    },
    CasePreset {
        id: "pelican-1600",
        brand: "Pelican",
        name: "1600",
        inner_width: 21.43,
        inner_height: 16.5,
    },
    CasePreset {
        id: "generic-24x18",
        brand: "Generic",
        name: "24 x 18 tool case",
        inner_width: 24.0,
        inner_height: 18.0,
    },
];

impl CasePreset {
    /// Look up a preset by id.
    #[must_use]
    pub fn find(id: &str) -> Option<&'static Self> {
        CASE_PRESETS.iter().find(|p| p.id == id)
    }

    /// The preset's footprint.
    #[must_use]
    pub const fn footprint(&self) -> CaseFootprint {
        CaseFootprint::new(self.inner_width, self.inner_height)
    }
}

/// Quarter-turn orientation. Serialized as degrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub enum Rotation {
    /// Upright.
    #[default]
    R0,
    /// 90 degrees clockwise.
    R90,
    /// Upside down.
    R180,
    /// 270 degrees clockwise.
    R270,
}

impl Rotation {
    /// The orientation one quarter turn further clockwise.
    #[must_use]
    pub const fn clockwise(self) -> Self {
        match self {
            Self::R0 => Self::R90,
            Self::R90 => Self::R180,
            Self::R180 => Self::R270,
            Self::R270 => Self::R0,
        }
    }

    /// Angle in degrees.
    #[must_use]
    pub const fn degrees(self) -> u16 {
        match self {
            Self::R0 => 0,
            Self::R90 => 90,
            Self::R180 => 180,
            Self::R270 => 270,
        }
    }
}

impl From<Rotation> for u16 {
    fn from(r: Rotation) -> Self {
        r.degrees()
    }
}

/// A rotation angle that is not a multiple of 90 below 360.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("rotation must be 0, 90, 180, or 270 degrees, got {0}")]
pub struct InvalidRotation(pub u16);

impl TryFrom<u16> for Rotation {
    type Error = InvalidRotation;

    fn try_from(degrees: u16) -> Result<Self, Self::Error> {
        match degrees {
            0 => Ok(Self::R0),
            90 => Ok(Self::R90),
            180 => Ok(Self::R180),
            270 => Ok(Self::R270),
            other => Err(InvalidRotation(other)),
        }
    }
}

/// One placed cutout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutItem {
    /// Unique within a layout.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Outline in inches, bounding box starting at the origin.
    pub polygon: Polygon,
    /// Left edge in case-local inches.
    pub x: f64,
    /// Top edge in case-local inches.
    pub y: f64,
    /// Orientation relative to the traced outline.
    pub rotation: Rotation,
    /// Bounding-box width.
    pub width: f64,
    /// Bounding-box height.
    pub height: f64,
    /// Pocket depth.
    pub depth: f64,
    /// Optional display color or tag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl LayoutItem {
    /// Pocket depth used when none is given.
    pub const DEFAULT_DEPTH: f64 = 1.0;

    /// Create an item at the case origin from an inch outline.
    ///
    /// The outline is shifted so its bounding box starts at `(0, 0)`.
    /// Returns `None` for an empty outline.
    #[must_use]
    pub fn from_polygon(
        id: impl Into<String>,
        name: impl Into<String>,
        outline: &Polygon,
        depth: f64,
    ) -> Option<Self> {
        let polygon = outline.to_origin();
        let bounds = polygon.bounds()?;
        Some(Self {
            id: id.into(),
            name: name.into(),
            polygon,
            x: 0.0,
            y: 0.0,
            rotation: Rotation::R0,
            width: bounds.width,
            height: bounds.height,
            depth,
            color: None,
        })
    }

    /// Bounding box in case-local inches.
    #[must_use]
    pub const fn bounds(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }

    /// Center of the bounding box in case-local inches.
    #[must_use]
    pub fn center(&self) -> Point {
        self.bounds().center()
    }

    /// Outline translated to its placed position.
    #[must_use]
    pub fn placed_polygon(&self) -> Polygon {
        self.polygon.translated(self.x, self.y)
    }

    /// Place the top-left corner at `(x, y)`.
    pub const fn move_to(&mut self, x: f64, y: f64) {
        self.x = x;
        self.y = y;
    }

    /// Shift by `(dx, dy)`.
    pub fn nudge(&mut self, dx: f64, dy: f64) {
        self.x += dx;
        self.y += dy;
    }

    /// Rotate a quarter turn clockwise about the bounding-box center.
    ///
    /// Each outline point `(x, y)` in the `W` x `H` box maps to
    /// `(y, W - x)` in the resulting `H` x `W` box (clockwise with y
    /// pointing up, as the cutter sees it).
    pub fn rotate_clockwise(&mut self) {
        let center = self.center();
        let w = self.width;
        let points = self
            .polygon
            .points()
            .iter()
            .map(|p| Point::new(p.y, w - p.x))
            .collect();
        self.polygon = Polygon::new(points, Unit::Inch);
        std::mem::swap(&mut self.width, &mut self.height);
        self.x = self.width.mul_add(-0.5, center.x);
        self.y = self.height.mul_add(-0.5, center.y);
        self.rotation = self.rotation.clockwise();
    }

    /// Whether the case-local `point` falls inside the outline.
    #[must_use]
    pub fn contains(&self, point: Point) -> bool {
        let local = Point::new(point.x - self.x, point.y - self.y);
        local.x >= 0.0
            && local.y >= 0.0
            && local.x <= self.width
            && local.y <= self.height
            && point_in_polygon(local, self.polygon.points())
    }
}

/// Place every item inside `case`, largest bounding box first.
///
/// Candidate top-left corners are scanned row by row across the safe
/// zone at `config.step` resolution. The first position whose box keeps
/// at least `config.spacing` clearance from every item already placed
/// wins. An item with no valid position goes to the safe-zone origin and
/// its id is returned as overflowed. Items of equal area keep their
/// input order.
#[allow(clippy::cast_precision_loss)]
pub fn pack(items: &mut [LayoutItem], case: &CaseFootprint, config: &LayoutConfig) -> Vec<String> {
    let mut order: Vec<usize> = (0..items.len()).collect();
    order.sort_by(|&a, &b| items[b].bounds().area().total_cmp(&items[a].bounds().area()));

    let safe = case.safe_zone();
    let half = config.spacing / 2.0;
    let mut placed: Vec<Rect> = Vec::with_capacity(items.len());
    let mut overflowed = Vec::new();

    for i in order {
        let item = &mut items[i];
        let cols = candidate_count(safe.width - item.width, config.step);
        let rows = candidate_count(safe.height - item.height, config.step);

        let position = (0..rows)
            .flat_map(|row| (0..cols).map(move |col| (col, row)))
            .map(|(col, row)| {
                (
                    (col as f64).mul_add(config.step, safe.x),
                    (row as f64).mul_add(config.step, safe.y),
                )
            })
            .find(|&(x, y)| {
                let candidate = Rect::new(x, y, item.width, item.height).padded(half);
                placed.iter().all(|other| !candidate.intersects(other))
            });

        match position {
            Some((x, y)) => item.move_to(x, y),
            None => {
                tracing::warn!(id = %item.id, "no free position, placing at safe-zone origin");
                item.move_to(safe.x, safe.y);
                overflowed.push(item.id.clone());
            }
        }
        placed.push(item.bounds().padded(half));
    }

    tracing::debug!(
        items = items.len(),
        overflowed = overflowed.len(),
        "packed layout"
    );
    overflowed
}

/// Number of grid positions in `0..=slack` at `step` spacing; zero when
/// the item is larger than the space.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn candidate_count(slack: f64, step: f64) -> usize {
    if slack < 0.0 || step <= 0.0 || !slack.is_finite() {
        return 0;
    }
    // Tolerate round-off so an exact fit still yields its last position.
    (slack / step + 1e-9).floor() as usize + 1
}

/// Errors from editing a [`Layout`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LayoutError {
    /// No item has this id.
    #[error("no layout item with id {0:?}")]
    UnknownItem(String),

    /// The outline has no points.
    #[error("outline is empty")]
    EmptyOutline,

    /// The outline is still in pixels and must be calibrated first.
    #[error("outline is in pixels; calibrate before adding it to a layout")]
    Uncalibrated,

    /// Two items share an id.
    #[error("layout item id {0:?} appears more than once")]
    DuplicateId(String),
}

/// One interactive layout session: a case and the items in it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Layout {
    case: CaseFootprint,
    config: LayoutConfig,
    items: Vec<LayoutItem>,
    next_id: u64,
}

impl Layout {
    /// An empty layout for `case` with default packer settings.
    #[must_use]
    pub fn new(case: CaseFootprint) -> Self {
        Self::with_config(case, LayoutConfig::default())
    }

    /// An empty layout with explicit packer settings.
    #[must_use]
    pub const fn with_config(case: CaseFootprint, config: LayoutConfig) -> Self {
        Self {
            case,
            config,
            items: Vec::new(),
            next_id: 1,
        }
    }

    /// Rebuild a layout from saved items, keeping their ids and placements.
    ///
    /// Ids minted afterwards continue past the highest `item-N` already
    /// present, so a reloaded layout never reissues a saved id.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::DuplicateId`] if two items share an id,
    /// [`LayoutError::EmptyOutline`] for an item without points, and
    /// [`LayoutError::Uncalibrated`] for an item outline in pixels.
    pub fn from_items(
        case: CaseFootprint,
        config: LayoutConfig,
        items: Vec<LayoutItem>,
    ) -> Result<Self, LayoutError> {
        let mut next_id = 1;
        for (i, item) in items.iter().enumerate() {
            if item.polygon.is_empty() {
                return Err(LayoutError::EmptyOutline);
            }
            if item.polygon.unit() != Unit::Inch {
                return Err(LayoutError::Uncalibrated);
            }
            if items[..i].iter().any(|other| other.id == item.id) {
                return Err(LayoutError::DuplicateId(item.id.clone()));
            }
            if let Some(n) = item
                .id
                .strip_prefix("item-")
                .and_then(|n| n.parse::<u64>().ok())
            {
                next_id = next_id.max(n.saturating_add(1));
            }
        }
        Ok(Self {
            case,
            config,
            items,
            next_id,
        })
    }

    /// The case footprint.
    #[must_use]
    pub const fn case(&self) -> &CaseFootprint {
        &self.case
    }

    /// Packer settings.
    #[must_use]
    pub const fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Items in insertion order; later items draw on top.
    #[must_use]
    pub fn items(&self) -> &[LayoutItem] {
        &self.items
    }

    /// Look up an item.
    #[must_use]
    pub fn item(&self, id: &str) -> Option<&LayoutItem> {
        self.items.iter().find(|item| item.id == id)
    }

    fn item_mut(&mut self, id: &str) -> Result<&mut LayoutItem, LayoutError> {
        self.items
            .iter_mut()
            .find(|item| item.id == id)
            .ok_or_else(|| LayoutError::UnknownItem(id.to_owned()))
    }

    fn fresh_id(&mut self) -> String {
        let id = format!("item-{}", self.next_id);
        self.next_id += 1;
        id
    }

    /// Add a calibrated outline at the safe-zone origin and return its id.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::Uncalibrated`] for a pixel outline and
    /// [`LayoutError::EmptyOutline`] for an empty one.
    pub fn add(
        &mut self,
        name: impl Into<String>,
        outline: &Polygon,
        depth: f64,
    ) -> Result<String, LayoutError> {
        if outline.unit() != Unit::Inch {
            return Err(LayoutError::Uncalibrated);
        }
        let id = self.fresh_id();
        let mut item = LayoutItem::from_polygon(id.clone(), name, outline, depth)
            .ok_or(LayoutError::EmptyOutline)?;
        let safe = self.case.safe_zone();
        item.move_to(safe.x, safe.y);
        self.items.push(item);
        Ok(id)
    }

    /// Run the automatic packer over every item. Returns overflowed ids.
    pub fn pack(&mut self) -> Vec<String> {
        pack(&mut self.items, &self.case, &self.config)
    }

    /// Drag an item so its top-left corner sits at `(x, y)`.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::UnknownItem`] if `id` is not in the layout.
    pub fn move_to(&mut self, id: &str, x: f64, y: f64) -> Result<(), LayoutError> {
        self.item_mut(id)?.move_to(x, y);
        Ok(())
    }

    /// Shift an item by `(dx, dy)`.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::UnknownItem`] if `id` is not in the layout.
    pub fn nudge(&mut self, id: &str, dx: f64, dy: f64) -> Result<(), LayoutError> {
        self.item_mut(id)?.nudge(dx, dy);
        Ok(())
    }

    /// Rotate an item a quarter turn clockwise about its center.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::UnknownItem`] if `id` is not in the layout.
    pub fn rotate_clockwise(&mut self, id: &str) -> Result<(), LayoutError> {
        self.item_mut(id)?.rotate_clockwise();
        Ok(())
    }

    /// Copy an item, offset by the spacing, and return the copy's id.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::UnknownItem`] if `id` is not in the layout.
    pub fn duplicate(&mut self, id: &str) -> Result<String, LayoutError> {
        let offset = self.config.spacing;
        let mut copy = self.item_mut(id)?.clone();
        copy.id = self.fresh_id();
        copy.nudge(offset, offset);
        let new_id = copy.id.clone();
        self.items.push(copy);
        Ok(new_id)
    }

    /// Delete an item and return it.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::UnknownItem`] if `id` is not in the layout.
    pub fn remove(&mut self, id: &str) -> Result<LayoutItem, LayoutError> {
        let index = self
            .items
            .iter()
            .position(|item| item.id == id)
            .ok_or_else(|| LayoutError::UnknownItem(id.to_owned()))?;
        Ok(self.items.remove(index))
    }

    /// The topmost item whose outline contains the case-local `point`.
    #[must_use]
    pub fn item_at(&self, point: Point) -> Option<&LayoutItem> {
        self.items.iter().rev().find(|item| item.contains(point))
    }

    /// Share of items inside the safe zone, as a whole percentage.
    #[must_use]
    pub fn fit_percentage(&self) -> u8 {
        fit::fit_percentage(&self.items, &self.case)
    }

    /// Whether every item is inside the safe zone.
    #[must_use]
    pub fn all_fit(&self) -> bool {
        fit::all_fit(&self.items, &self.case)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect_outline(w: f64, h: f64) -> Polygon {
        Polygon::inches(vec![
            Point::new(0.0, 0.0),
            Point::new(w, 0.0),
            Point::new(w, h),
            Point::new(0.0, h),
        ])
    }

    fn rect_item(id: &str, w: f64, h: f64) -> LayoutItem {
        LayoutItem::from_polygon(id, id, &rect_outline(w, h), LayoutItem::DEFAULT_DEPTH).unwrap()
    }

    fn assert_no_overlap(items: &[LayoutItem], spacing: f64) {
        for (i, a) in items.iter().enumerate() {
            for b in &items[i + 1..] {
                let pa = a.bounds().padded(spacing / 2.0);
                let pb = b.bounds().padded(spacing / 2.0);
                assert!(!pa.intersects(&pb), "{} overlaps {}", a.id, b.id);
            }
        }
    }

    #[test]
    fn safe_zone_of_24_by_18() {
        let case = CaseFootprint::new(24.0, 18.0);
        assert_eq!(case.safe_zone(), Rect::new(1.0, 1.0, 22.0, 16.0));
    }

    #[test]
    fn from_polygon_normalizes_to_origin() {
        let outline = rect_outline(3.0, 2.0).translated(5.0, 7.0);
        let item = LayoutItem::from_polygon("a", "A", &outline, 1.5).unwrap();
        assert_eq!(item.polygon.bounds(), Some(Rect::new(0.0, 0.0, 3.0, 2.0)));
        assert_eq!((item.width, item.height), (3.0, 2.0));
        assert_eq!(item.rotation, Rotation::R0);
    }

    #[test]
    fn empty_outline_makes_no_item() {
        assert!(LayoutItem::from_polygon("a", "A", &Polygon::inches(vec![]), 1.0).is_none());
    }

    #[test]
    fn pack_places_largest_first_at_safe_origin() {
        let case = CaseFootprint::new(24.0, 18.0);
        let mut items = vec![rect_item("small", 2.0, 2.0), rect_item("big", 8.0, 4.0)];
        let overflowed = pack(&mut items, &case, &LayoutConfig::default());
        assert!(overflowed.is_empty());
        assert_eq!((items[1].x, items[1].y), (1.0, 1.0));
        // Small item lands right of big one with 0.5 clearance.
        assert_eq!((items[0].x, items[0].y), (9.5, 1.0));
        assert_no_overlap(&items, SPACING);
    }

    #[test]
    fn pack_two_five_inch_squares_keeps_spacing() {
        let case = CaseFootprint::new(24.0, 18.0);
        let mut items = vec![rect_item("a", 5.0, 5.0), rect_item("b", 5.0, 5.0)];
        pack(&mut items, &case, &LayoutConfig::default());
        let (ca, cb) = (items[0].center(), items[1].center());
        assert!((ca.x - cb.x).abs() >= 5.5 || (ca.y - cb.y).abs() >= 5.5);
        assert_eq!(items[0].x, 1.0, "equal areas keep input order");
    }

    #[test]
    fn pack_many_items_never_overlaps() {
        let case = CaseFootprint::new(24.0, 18.0);
        let mut items: Vec<LayoutItem> = (0..12)
            .map(|i| {
                let w = 1.0 + f64::from(i % 4) * 1.5;
                let h = 1.0 + f64::from(i % 3);
                rect_item(&format!("i{i}"), w, h)
            })
            .collect();
        let overflowed = pack(&mut items, &case, &LayoutConfig::default());
        assert!(overflowed.is_empty());
        assert_no_overlap(&items, SPACING);
        assert!(items.iter().all(|it| fit::is_fit(it, &case)));
    }

    #[test]
    fn pack_is_deterministic() {
        let case = CaseFootprint::new(20.0, 12.0);
        let make = || {
            vec![
                rect_item("a", 4.0, 3.0),
                rect_item("b", 2.5, 6.0),
                rect_item("c", 3.0, 3.0),
            ]
        };
        let mut first = make();
        let mut second = make();
        pack(&mut first, &case, &LayoutConfig::default());
        pack(&mut second, &case, &LayoutConfig::default());
        assert_eq!(first, second);
    }

    #[test]
    fn oversized_item_falls_back_and_is_reported() {
        let case = CaseFootprint::new(10.0, 10.0);
        let mut items = vec![rect_item("huge", 12.0, 3.0)];
        let overflowed = pack(&mut items, &case, &LayoutConfig::default());
        assert_eq!(overflowed, vec!["huge".to_owned()]);
        assert_eq!((items[0].x, items[0].y), (1.0, 1.0));
        assert!(!fit::is_fit(&items[0], &case));
    }

    #[test]
    fn exact_fit_uses_last_position() {
        let case = CaseFootprint::new(10.0, 10.0);
        let mut items = vec![rect_item("full", 8.0, 8.0)];
        assert!(pack(&mut items, &case, &LayoutConfig::default()).is_empty());
    }

    #[test]
    fn rotation_maps_points_and_keeps_center() {
        let outline = Polygon::inches(vec![
            Point::new(0.0, 0.0),
            Point::new(4.0, 0.0),
            Point::new(4.0, 2.0),
            Point::new(1.0, 2.0),
        ]);
        let mut item = LayoutItem::from_polygon("a", "A", &outline, 1.0).unwrap();
        item.move_to(3.0, 5.0);
        let before = item.center();
        item.rotate_clockwise();

        assert_eq!((item.width, item.height), (2.0, 4.0));
        assert_eq!(item.center(), before);
        assert_eq!(item.rotation, Rotation::R90);
        // (x, y) -> (y, W - x) with W = 4.
        assert_eq!(item.polygon.points()[0], Point::new(0.0, 4.0));
        assert_eq!(item.polygon.points()[2], Point::new(2.0, 0.0));
        assert_eq!(item.polygon.points()[3], Point::new(2.0, 3.0));
        assert_eq!(item.polygon.bounds(), Some(Rect::new(0.0, 0.0, 2.0, 4.0)));
    }

    #[test]
    fn four_rotations_restore_the_item() {
        let mut item = rect_item("a", 3.0, 1.0);
        item.polygon = Polygon::inches(vec![
            Point::new(0.0, 0.0),
            Point::new(3.0, 0.0),
            Point::new(3.0, 1.0),
            Point::new(0.5, 1.0),
        ]);
        item.move_to(2.0, 2.0);
        let original = item.clone();
        for _ in 0..4 {
            item.rotate_clockwise();
        }
        assert_eq!(item, original);
    }

    #[test]
    fn rotation_serializes_as_degrees() {
        assert_eq!(serde_json::to_string(&Rotation::R270).unwrap(), "270");
        let r: Rotation = serde_json::from_str("90").unwrap();
        assert_eq!(r, Rotation::R90);
        assert!(serde_json::from_str::<Rotation>("45").is_err());
    }

    #[test]
    fn layout_edits_by_id() {
        let mut layout = Layout::new(CaseFootprint::new(24.0, 18.0));
        let a = layout.add("Drill", &rect_outline(6.0, 3.0), 2.0).unwrap();
        let b = layout.add("Bit", &rect_outline(1.0, 1.0), 0.5).unwrap();
        assert_ne!(a, b);
        assert_eq!(layout.item(&a).unwrap().x, 1.0);

        layout.move_to(&a, 4.0, 4.0).unwrap();
        layout.nudge(&a, 0.25, -0.5).unwrap();
        let item = layout.item(&a).unwrap();
        assert_eq!((item.x, item.y), (4.25, 3.5));

        let copy = layout.duplicate(&b).unwrap();
        let copied = layout.item(&copy).unwrap();
        assert_eq!((copied.x, copied.y), (1.5, 1.5));
        assert_eq!(copied.name, "Bit");
        assert_eq!(layout.items().len(), 3);

        let removed = layout.remove(&b).unwrap();
        assert_eq!(removed.id, b);
        assert_eq!(
            layout.remove(&b),
            Err(LayoutError::UnknownItem(b.clone()))
        );
        assert!(layout.rotate_clockwise("nope").is_err());
    }

    #[test]
    fn duplicate_ids_are_never_reused() {
        let mut layout = Layout::new(CaseFootprint::new(24.0, 18.0));
        let a = layout.add("A", &rect_outline(1.0, 1.0), 1.0).unwrap();
        layout.remove(&a).unwrap();
        let b = layout.add("B", &rect_outline(1.0, 1.0), 1.0).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn from_items_keeps_placements_and_continues_ids() {
        let mut saved = Layout::new(CaseFootprint::new(24.0, 18.0));
        let a = saved.add("A", &rect_outline(4.0, 2.0), 1.0).unwrap();
        saved.add("B", &rect_outline(2.0, 2.0), 1.0).unwrap();
        saved.move_to(&a, 6.0, 5.0).unwrap();

        let mut layout = Layout::from_items(
            *saved.case(),
            *saved.config(),
            saved.items().to_vec(),
        )
        .unwrap();
        assert_eq!(layout.items(), saved.items());
        assert_eq!(layout.item(&a).unwrap().x, 6.0);

        let c = layout.add("C", &rect_outline(1.0, 1.0), 1.0).unwrap();
        assert_eq!(c, "item-3");
        assert!(layout.pack().is_empty());
        assert_eq!(layout.fit_percentage(), 100);
    }

    #[test]
    fn from_items_rejects_bad_input() {
        let case = CaseFootprint::new(24.0, 18.0);
        let config = LayoutConfig::default();
        let twice = vec![rect_item("x", 1.0, 1.0), rect_item("x", 2.0, 2.0)];
        assert_eq!(
            Layout::from_items(case, config, twice),
            Err(LayoutError::DuplicateId("x".into()))
        );

        let mut px = rect_item("p", 1.0, 1.0);
        px.polygon = Polygon::pixels(px.polygon.points().to_vec());
        assert_eq!(
            Layout::from_items(case, config, vec![px]),
            Err(LayoutError::Uncalibrated)
        );
    }

    #[test]
    fn pixel_outline_is_rejected() {
        let mut layout = Layout::new(CaseFootprint::new(24.0, 18.0));
        let px = Polygon::pixels(vec![Point::new(0.0, 0.0), Point::new(1.0, 1.0)]);
        assert_eq!(layout.add("A", &px, 1.0), Err(LayoutError::Uncalibrated));
    }

    #[test]
    fn item_at_prefers_topmost_and_respects_concavity() {
        let mut layout = Layout::new(CaseFootprint::new(24.0, 18.0));
        let ell = Polygon::inches(vec![
            Point::new(0.0, 0.0),
            Point::new(2.0, 0.0),
            Point::new(2.0, 2.0),
            Point::new(4.0, 2.0),
            Point::new(4.0, 4.0),
            Point::new(0.0, 4.0),
        ]);
        let a = layout.add("L", &ell, 1.0).unwrap();
        // L occupies (1..5, 1..5) minus the top-right quadrant.
        assert_eq!(layout.item_at(Point::new(2.0, 2.0)).unwrap().id, a);
        assert!(layout.item_at(Point::new(4.0, 2.0)).is_none());

        let b = layout.add("Square", &rect_outline(4.0, 4.0), 1.0).unwrap();
        assert_eq!(layout.item_at(Point::new(2.0, 2.0)).unwrap().id, b);
        assert!(layout.item_at(Point::new(20.0, 15.0)).is_none());
    }

    #[test]
    fn layout_fit_percentage_tracks_edits() {
        let mut layout = Layout::new(CaseFootprint::new(24.0, 18.0));
        let a = layout.add("A", &rect_outline(8.0, 4.0), 1.0).unwrap();
        assert_eq!(layout.fit_percentage(), 100);
        layout.move_to(&a, 0.0, 0.0).unwrap();
        assert_eq!(layout.fit_percentage(), 0);
        assert!(!layout.all_fit());
    }

    #[test]
    fn case_preset_lookup() {
        let preset = CasePreset::find("pelican-1510").unwrap();
        let case = preset.footprint();
        assert_eq!(case.width, 19.75);
        assert_eq!(case.border_margin, BORDER_MARGIN);
        assert!(CasePreset::find("none").is_none());
    }
}
