//! cutout-export: Pure format serializers (sans-IO)
//!
//! Turns a finished [`Layout`](cutout_pipeline::Layout) into the
//! artifacts an order needs: a composed [`ExportModel`] with tolerance
//! offsets applied, DXF for the cutter, SVG for preview, layout item
//! JSON, and a [`FitReport`] that gates submission.

pub mod dxf;
pub mod json;
pub mod model;
pub mod offset;
pub mod report;
pub mod svg;

pub use self::dxf::to_dxf;
pub use self::json::{items_to_json, parse_items};
pub use self::model::{ExportConfig, ExportModel, ExportPath};
pub use self::offset::{OffsetKind, Offsetter};
pub use self::report::{FitReport, ItemFit, Overflow};
pub use self::svg::{SvgMetadata, to_svg};

/// Errors that can occur while exporting.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// The DXF writer failed.
    #[error("failed to write DXF: {0}")]
    Dxf(#[from] ::dxf::DxfError),

    /// The DXF writer produced bytes that are not UTF-8.
    #[error("DXF output is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// Layout JSON could not be read or written.
    #[error("layout JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A parsed layout item is unusable.
    #[error("layout item {id:?} is invalid: {reason}")]
    InvalidItem {
        /// Item id from the input.
        id: String,
        /// What is wrong with it.
        reason: String,
    },

    /// Export configuration is invalid.
    #[error("invalid export configuration: {0}")]
    InvalidConfig(String),

    /// Some items cannot fit the case in any placement.
    #[error("{} item(s) exceed the case bounds", .0.len())]
    BoundsExceeded(Vec<ItemFit>),

    /// Some items are placed outside the safe zone.
    #[error("{} item(s) are outside the safe zone: {}", .0.len(), .0.join(", "))]
    PlacementOverflow(Vec<String>),
}
