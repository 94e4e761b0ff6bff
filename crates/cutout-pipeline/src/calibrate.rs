//! Pixel to inch calibration.
//!
//! A photo has no inherent scale. The user (or an object recognizer)
//! points at something of known size in the frame, and the ratio of its
//! measured pixel span to its real span gives pixels per inch. A manual
//! PPI bypasses measurement entirely. With neither, [`DEFAULT_PPI`] is
//! used and the result carries a [`CalibrationWarning`].

use serde::{Deserialize, Serialize};

use crate::pipeline::StagedResult;
use crate::types::{PixelBox, Polygon, Unit};

/// Scale assumed when nothing better is known.
pub const DEFAULT_PPI: f64 = 72.0;

/// Aspect ratios closer than this are treated as agreeing.
pub const ASPECT_TOLERANCE: f64 = 0.5;

/// A catalog entry for an everyday object of standard size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceObject {
    /// Stable identifier.
    pub id: &'static str,
    /// Display name.
    pub name: &'static str,
    /// Real width in inches.
    pub width_inches: f64,
    /// Real height in inches.
    pub height_inches: f64,
}

/// Built-in reference objects.
pub const REFERENCE_OBJECTS: &[ReferenceObject] = &[
    ReferenceObject {
        id: "credit-card",
        name: "Credit card",
        width_inches: 3.375,
        height_inches: 2.125,
    },
    ReferenceObject {
        id: "us-quarter",
        name: "US quarter",
        width_inches: 0.955,
        height_inches: 0.955,
    },
    ReferenceObject {
        id: "ruler-6in",
        name: "6 inch ruler segment",
        width_inches: 6.0,
        height_inches: 1.0,
    },
    ReferenceObject {
        id: "dollar-bill",
        name: "US dollar bill",
        width_inches: 6.14,
        height_inches: 2.61,
    },
];

impl ReferenceObject {
    /// Look up a built-in reference by id.
    #[must_use]
    pub fn find(id: &str) -> Option<&'static Self> {
        REFERENCE_OBJECTS.iter().find(|r| r.id == id)
    }

    /// Pair this object with its measured pixel box.
    #[must_use]
    pub fn measured(&self, measured: PixelSize) -> CalibrationReference {
        CalibrationReference {
            name: self.name.to_owned(),
            known: RealSize {
                width: self.width_inches,
                height: self.height_inches,
            },
            measured,
        }
    }
}

/// Width and height of a pixel bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelSize {
    /// Horizontal span in pixels.
    pub width: f64,
    /// Vertical span in pixels.
    pub height: f64,
}

impl From<PixelBox> for PixelSize {
    fn from(b: PixelBox) -> Self {
        Self {
            width: f64::from(b.max_x - b.min_x + 1),
            height: f64::from(b.max_y - b.min_y + 1),
        }
    }
}

/// Pixel size of a traced object as segmented, before refinement.
///
/// Refinement dilates every mask by the configured margin and smoothing
/// moves the outline, so a reference measured from its final polygon
/// reads large. `index` is the object's segmentation index
/// ([`ObjectPolygon::index`](crate::types::ObjectPolygon::index)).
#[must_use]
pub fn measure_segmented(staged: &StagedResult, index: usize) -> Option<PixelSize> {
    staged
        .masks
        .iter()
        .find(|mask| mask.index == index)
        .map(|mask| PixelSize::from(mask.bounds))
}

/// Width and height in inches.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RealSize {
    /// Horizontal span in inches.
    pub width: f64,
    /// Vertical span in inches.
    pub height: f64,
}

/// Which side of the reference the scale was measured along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    /// Horizontal span.
    Width,
    /// Vertical span.
    Height,
}

/// A reference object as seen in one photo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalibrationReference {
    /// What the reference is.
    pub name: String,
    /// Its real dimensions.
    pub known: RealSize,
    /// Its pixel bounding box in the photo.
    pub measured: PixelSize,
}

impl CalibrationReference {
    /// Pick the axis least distorted by segmentation.
    ///
    /// When the measured and real aspect ratios agree within
    /// [`ASPECT_TOLERANCE`], width is used. Otherwise the axis that
    /// measures relatively long is assumed inflated (shadow or a merged
    /// neighbor) and the other one is used.
    #[must_use]
    pub fn axis(&self) -> Axis {
        let measured_aspect = self.measured.width / self.measured.height;
        let known_aspect = self.known.width / self.known.height;
        if measured_aspect > known_aspect + ASPECT_TOLERANCE {
            Axis::Height
        } else {
            Axis::Width
        }
    }

    /// Pixels per inch along [`axis`](Self::axis).
    ///
    /// # Errors
    ///
    /// Returns [`CalibrationError::DegenerateReference`] if any span is
    /// zero, negative, or not finite.
    pub fn pixels_per_inch(&self) -> Result<(Axis, f64), CalibrationError> {
        let spans = [
            self.measured.width,
            self.measured.height,
            self.known.width,
            self.known.height,
        ];
        if spans.iter().any(|s| !s.is_finite() || *s <= 0.0) {
            return Err(CalibrationError::DegenerateReference {
                name: self.name.clone(),
            });
        }
        let axis = self.axis();
        let ppi = match axis {
            Axis::Width => self.measured.width / self.known.width,
            Axis::Height => self.measured.height / self.known.height,
        };
        Ok((axis, ppi))
    }
}

/// What to calibrate from.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", rename_all_fields = "camelCase", tag = "mode")]
pub enum CalibrationInput {
    /// Measure a reference object in the photo.
    Reference(CalibrationReference),
    /// Use a user-entered PPI directly.
    Manual {
        /// Pixels per inch.
        pixels_per_inch: f64,
    },
    /// Nothing available; fall back to [`DEFAULT_PPI`].
    #[default]
    None,
}

/// How the final scale was obtained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum CalibrationSource {
    /// Measured from a reference object.
    Reference {
        /// Reference name.
        name: String,
        /// Axis measured.
        axis: Axis,
    },
    /// Entered by the user.
    Manual,
    /// Fallback constant.
    Default,
}

/// Non-fatal calibration conditions the user should see.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CalibrationWarning {
    /// No reference and no manual value; [`DEFAULT_PPI`] was assumed.
    DefaultScale,
}

impl std::fmt::Display for CalibrationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DefaultScale => write!(
                f,
                "no calibration reference given; assuming {DEFAULT_PPI} pixels per inch, measurements may be inaccurate"
            ),
        }
    }
}

/// A resolved pixel to inch scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Calibration {
    /// Pixels per inch, always finite and positive.
    pub pixels_per_inch: f64,
    /// Where the scale came from.
    pub source: CalibrationSource,
    /// Set when the scale is a guess.
    pub warning: Option<CalibrationWarning>,
}

/// Errors from resolving a calibration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CalibrationError {
    /// A manual PPI was zero, negative, or not finite.
    #[error("pixels per inch must be positive, got {0}")]
    NonPositivePpi(f64),

    /// The reference had a zero or invalid dimension.
    #[error("reference {name:?} has a zero or invalid dimension")]
    DegenerateReference {
        /// Reference name.
        name: String,
    },
}

/// Resolve `input` into a [`Calibration`].
///
/// # Errors
///
/// Returns [`CalibrationError`] for an invalid manual value or a
/// degenerate reference. Missing input is not an error.
pub fn calibrate(input: &CalibrationInput) -> Result<Calibration, CalibrationError> {
    let calibration = match input {
        CalibrationInput::Reference(reference) => {
            let (axis, ppi) = reference.pixels_per_inch()?;
            tracing::debug!(name = %reference.name, ?axis, ppi, "calibrated from reference");
            Calibration {
                pixels_per_inch: ppi,
                source: CalibrationSource::Reference {
                    name: reference.name.clone(),
                    axis,
                },
                warning: None,
            }
        }
        CalibrationInput::Manual { pixels_per_inch } => {
            let ppi = *pixels_per_inch;
            if !ppi.is_finite() || ppi <= 0.0 {
                return Err(CalibrationError::NonPositivePpi(ppi));
            }
            Calibration {
                pixels_per_inch: ppi,
                source: CalibrationSource::Manual,
                warning: None,
            }
        }
        CalibrationInput::None => {
            tracing::warn!(ppi = DEFAULT_PPI, "no calibration reference, using default scale");
            Calibration {
                pixels_per_inch: DEFAULT_PPI,
                source: CalibrationSource::Default,
                warning: Some(CalibrationWarning::DefaultScale),
            }
        }
    };
    Ok(calibration)
}

impl Calibration {
    /// Convert a pixel length to inches.
    #[must_use]
    pub fn inches(&self, pixels: f64) -> f64 {
        pixels / self.pixels_per_inch
    }

    /// Convert a pixel polygon to inches. Inch polygons pass through.
    #[must_use]
    pub fn to_inches(&self, polygon: &Polygon) -> Polygon {
        match polygon.unit() {
            Unit::Inch => polygon.clone(),
            Unit::Pixel => polygon.scaled(self.pixels_per_inch.recip(), Unit::Inch),
        }
    }
}
