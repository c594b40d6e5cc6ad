use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::{fmt, str::FromStr};
use strum_macros::{Display, EnumIter, EnumString};

/// Lens identifier as listed by the catalog
pub type LensId = i64;

#[derive(Debug, thiserror::Error)]
pub enum SelectorError {
    #[error("unknown region {0:?}, expected `center` or `edge`")]
    Region(String),
    #[error("invalid aperture {0:?}, expected -1, 0 or a F-number")]
    Aperture(String),
}

/// A lens of the catalog
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Lens {
    #[serde(deserialize_with = "lenient_id")]
    pub id: LensId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub device: String,
}

/// Sharpness score measured at a given focal length
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// focal length [mm]
    #[serde(default = "not_a_number", deserialize_with = "lenient_f64")]
    pub focal: f64,
    #[serde(default = "not_a_number", deserialize_with = "lenient_f64")]
    pub score: f64,
}
impl Sample {
    pub fn new(focal: f64, score: f64) -> Self {
        Self { focal, score }
    }
    /// Finite, strictly positive focal length and finite, non-negative score
    pub fn is_valid(&self) -> bool {
        self.focal.is_finite() && self.focal > 0. && self.score.is_finite() && self.score >= 0.
    }
}
impl From<(f64, f64)> for Sample {
    fn from((focal, score): (f64, f64)) -> Self {
        Self { focal, score }
    }
}

/// Measurement location on the image frame
#[derive(
    EnumIter, EnumString, Display, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default,
)]
#[strum(serialize_all = "lowercase")]
pub enum Region {
    #[default]
    Center,
    Edge,
}
impl Region {
    /// Parses a region, reporting the offending input on failure
    pub fn parse(value: &str) -> Result<Self, SelectorError> {
        Region::from_str(value.trim()).map_err(|_| SelectorError::Region(value.to_string()))
    }
}

/// `-1`, `0`, `2.8` or `F/2.8` notations
static APERTURE_RE: Lazy<Result<Regex, regex::Error>> =
    Lazy::new(|| Regex::new(r"^\s*(?:[Ff]\s*/?\s*)?(-?\d+(?:\.\d*)?)\s*$"));

/// Aperture selector
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Aperture {
    /// best score over all the F-numbers
    #[default]
    Best,
    /// smallest F-number available
    WideOpen,
    FNumber(f64),
}
impl FromStr for Aperture {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let re = APERTURE_RE
            .as_ref()
            .map_err(|_| SelectorError::Aperture(s.to_string()))?;
        let value = re
            .captures(s)
            .and_then(|capts| capts.get(1))
            .and_then(|m| m.as_str().parse::<f64>().ok())
            .ok_or_else(|| SelectorError::Aperture(s.to_string()))?;
        Ok(if value < 0. {
            Aperture::Best
        } else if value == 0. {
            Aperture::WideOpen
        } else {
            Aperture::FNumber(value)
        })
    }
}
impl fmt::Display for Aperture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Aperture::Best => write!(f, "-1"),
            Aperture::WideOpen => write!(f, "0"),
            Aperture::FNumber(value) => write!(f, "{}", value),
        }
    }
}

/// Coerces a lens id typed by a user, anything that is not an integer becomes 0
pub fn parse_lens_id(input: &str) -> LensId {
    input.trim().parse().unwrap_or(0)
}

fn not_a_number() -> f64 {
    f64::NAN
}
/// Numbers or numeric strings, anything else maps to NaN
pub(crate) fn number_from_value(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) => s.trim().parse().unwrap_or(f64::NAN),
        _ => f64::NAN,
    }
}
pub(crate) fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(number_from_value(&value))
}
fn lenient_id<'de, D>(deserializer: D) -> Result<LensId, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(n) => n.as_i64().unwrap_or(0),
        Value::String(s) => parse_lens_id(&s),
        _ => 0,
    })
}
