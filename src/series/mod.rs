//! Chart series of the lens scores
//!
//! A [`Series`] is either the scores measured for a lens or the derived
//! decay curve extending it up to the longest focal length of the selection.

use crate::lens::LensId;
use std::fmt;

mod export;
#[cfg(feature = "plot")]
mod plot;
mod synthesis;
#[cfg(feature = "plot")]
pub use plot::PlotError;
pub(crate) use synthesis::fetch_all;
pub use synthesis::{
    build_series, extrapolate, synthesize, FetchFailure, Synthesis, MAX_EXTRAPOLATION_STEPS,
};

/// Opacity of the extrapolated series
pub const EXTRAPOLATION_ALPHA: f64 = 0.5;

/// Series color token
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub alpha: f64,
}
impl Color {
    pub fn with_alpha(self, alpha: f64) -> Self {
        Self { alpha, ..self }
    }
}
impl From<colorous::Color> for Color {
    fn from(color: colorous::Color) -> Self {
        Self {
            r: color.r,
            g: color.g,
            b: color.b,
            alpha: 1.,
        }
    }
}
impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgba({},{},{},{})", self.r, self.g, self.b, self.alpha)
    }
}

/// Qualitative color scheme, colors are assigned by selection position
#[derive(Debug, Clone, Copy)]
pub struct Palette(&'static [colorous::Color]);
impl Default for Palette {
    fn default() -> Self {
        Self(&colorous::TABLEAU10)
    }
}
impl Palette {
    /// Palette from a `colorous` categorical scheme name
    pub fn from_name(name: &str) -> Option<Self> {
        let colors: &'static [colorous::Color] = match name.to_lowercase().as_str() {
            "tableau10" => &colorous::TABLEAU10,
            "category10" => &colorous::CATEGORY10,
            "set1" => &colorous::SET1,
            "set2" => &colorous::SET2,
            "dark2" => &colorous::DARK2,
            "paired" => &colorous::PAIRED,
            _ => return None,
        };
        Some(Self(colors))
    }
    pub fn len(&self) -> usize {
        self.0.len()
    }
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
    /// Color of the k-th selected lens
    pub fn color(&self, k: usize) -> Color {
        self.0[k % self.0.len()].into()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesKind {
    Measured,
    Extrapolated,
}
impl fmt::Display for SeriesKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeriesKind::Measured => write!(f, "measured"),
            SeriesKind::Extrapolated => write!(f, "extrapolated"),
        }
    }
}

/// A chart series
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub lens_id: LensId,
    pub kind: SeriesKind,
    /// legend entry, empty for extrapolated series
    pub label: String,
    pub color: Color,
    /// (focal length, score) points in drawing order
    pub points: Vec<(f64, f64)>,
}
impl Series {
    pub fn is_measured(&self) -> bool {
        self.kind == SeriesKind::Measured
    }
}

/// Focal length range a lens must fit in to be displayed
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct DisplayWindow {
    pub focal_min: Option<f64>,
    pub focal_max: Option<f64>,
}
impl DisplayWindow {
    /// Window from raw bounds, -1 (or any negative value) leaves the bound open
    pub fn new(focal_min: f64, focal_max: f64) -> Self {
        let bound = |value: f64| (value.is_finite() && value >= 0.).then_some(value);
        Self {
            focal_min: bound(focal_min),
            focal_max: bound(focal_max),
        }
    }
    /// True if the whole `[min, max]` focal range lies inside the window
    pub fn admits(&self, min: f64, max: f64) -> bool {
        self.focal_min.map_or(true, |lower| min >= lower)
            && self.focal_max.map_or(true, |upper| max <= upper)
    }
}
