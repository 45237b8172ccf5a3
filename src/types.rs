use chrono::NaiveDate;
use geo::MultiPolygon;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Calendar date of a Sentinel-1 repeat pass (UTC)
pub type AcquisitionDate = NaiveDate;

/// (reference date, secondary date) with reference later than secondary
pub type DatePair = (AcquisitionDate, AcquisitionDate);

/// Polarization modes for Sentinel-1 SLC products
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Polarization {
    VV,
    VH,
    HV,
    HH,
    #[serde(rename = "VV+VH")]
    VvVh,
    #[serde(rename = "HH+HV")]
    HhHv,
}

impl std::fmt::Display for Polarization {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Polarization::VV => write!(f, "VV"),
            Polarization::VH => write!(f, "VH"),
            Polarization::HV => write!(f, "HV"),
            Polarization::HH => write!(f, "HH"),
            Polarization::VvVh => write!(f, "VV+VH"),
            Polarization::HhHv => write!(f, "HH+HV"),
        }
    }
}

impl FromStr for Polarization {
    type Err = EnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "VV" => Ok(Polarization::VV),
            "VH" => Ok(Polarization::VH),
            "HV" => Ok(Polarization::HV),
            "HH" => Ok(Polarization::HH),
            "VV+VH" => Ok(Polarization::VvVh),
            "HH+HV" => Ok(Polarization::HhHv),
            _ => Err(EnumError::InvalidInput(format!(
                "Invalid polarization: {}",
                s
            ))),
        }
    }
}

/// One interferogram to be formed: the scenes on each date contributing to a frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IfgDescriptor {
    /// Scene IDs acquired on the reference (later) date
    pub reference: Vec<String>,
    /// Scene IDs acquired on the secondary (earlier) date
    pub secondary: Vec<String>,
    pub reference_date: AcquisitionDate,
    pub secondary_date: AcquisitionDate,
    /// Frame the scenes were selected for (None for a frame-less pass)
    pub frame_id: Option<i64>,
    /// Coverage geometry of the frame
    #[serde(serialize_with = "crate::geometry::serialize_opt_multipolygon")]
    pub geometry: Option<MultiPolygon<f64>>,
}

impl IfgDescriptor {
    pub fn date_pair(&self) -> DatePair {
        (self.reference_date, self.secondary_date)
    }
}

/// Error types for interferogram enumeration
#[derive(Debug, thiserror::Error)]
pub enum EnumError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid stack: {0}")]
    InvalidStack(String),

    #[error("Frame {0} is not in the frame registry")]
    UnknownFrame(i64),

    #[error("Geometry constraint violated: {0}")]
    GeometryConstraint(String),

    #[error("No data: {0}")]
    NoData(String),

    #[error("Stack formation error: {0}")]
    StackFormation(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for enumeration operations
pub type EnumResult<T> = Result<T, EnumError>;
