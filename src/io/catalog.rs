use crate::io::frames::Frame;
use crate::types::{AcquisitionDate, EnumError, EnumResult, Polarization};
use chrono::{DateTime, Utc};
use geo::{Intersects, Polygon};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Columns every scene table must carry, no more and no fewer
pub const S1_COLUMNS: [&str; 6] = [
    "slc_id",
    "geometry",
    "repeat_pass_date",
    "start_time",
    "track_number",
    "polarization",
];

/// One Sentinel-1 SLC scene as returned by the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneRecord {
    pub slc_id: String,
    /// Scene footprint in longitude/latitude
    #[serde(rename = "geometry", with = "crate::geometry::polygon_coords")]
    pub footprint: Polygon<f64>,
    pub repeat_pass_date: AcquisitionDate,
    pub start_time: DateTime<Utc>,
    pub track_number: u32,
    pub polarization: Polarization,
}

/// Ordered table of scenes (a "stack") together with the columns it was read with
#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    columns: Vec<String>,
    scenes: Vec<SceneRecord>,
}

impl Catalog {
    /// Create a catalog with the canonical scene columns
    pub fn new(scenes: Vec<SceneRecord>) -> Self {
        Self {
            columns: S1_COLUMNS.iter().map(|c| c.to_string()).collect(),
            scenes,
        }
    }

    /// Create a catalog from a tabular source that reports its own column set
    ///
    /// The columns are checked by the time-series enumeration, not here.
    pub fn from_columns(columns: Vec<String>, scenes: Vec<SceneRecord>) -> Self {
        Self { columns, scenes }
    }

    /// Parse a JSON array of scene rows
    pub fn from_json(json: &str) -> EnumResult<Self> {
        let rows: Vec<serde_json::Map<String, serde_json::Value>> = serde_json::from_str(json)?;

        let Some(first) = rows.first() else {
            log::warn!("Catalog JSON contains no scene rows");
            return Ok(Self::new(Vec::new()));
        };

        let columns: BTreeSet<&str> = first.keys().map(String::as_str).collect();
        if let Some((i, _)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.keys().map(String::as_str).collect::<BTreeSet<_>>() != columns)
        {
            return Err(EnumError::InvalidStack(format!(
                "Row {} has a different column set than the first row",
                i
            )));
        }
        if columns != S1_COLUMNS.iter().copied().collect::<BTreeSet<_>>() {
            return Err(EnumError::InvalidStack(format!(
                "Catalog columns {:?} do not match the expected columns {:?}",
                columns, S1_COLUMNS
            )));
        }

        let scenes = rows
            .into_iter()
            .map(|row| serde_json::from_value::<SceneRecord>(serde_json::Value::Object(row)))
            .collect::<Result<Vec<_>, _>>()?;

        log::debug!("Parsed {} scenes from catalog JSON", scenes.len());
        Ok(Self::new(scenes))
    }

    pub fn to_json(&self) -> EnumResult<String> {
        Ok(serde_json::to_string(&self.scenes)?)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn scenes(&self) -> &[SceneRecord] {
        &self.scenes
    }

    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }

    /// `true` when the column set is exactly `S1_COLUMNS`
    pub fn has_expected_columns(&self) -> bool {
        let columns: BTreeSet<&str> = self.columns.iter().map(String::as_str).collect();
        self.columns.len() == S1_COLUMNS.len()
            && columns == S1_COLUMNS.iter().copied().collect::<BTreeSet<_>>()
    }

    /// Distinct repeat-pass dates in ascending order
    pub fn dates(&self) -> Vec<AcquisitionDate> {
        self.scenes
            .iter()
            .map(|scene| scene.repeat_pass_date)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Scenes acquired on `date`, in catalog order
    pub fn scenes_on(&self, date: AcquisitionDate) -> impl Iterator<Item = &SceneRecord> {
        self.scenes
            .iter()
            .filter(move |scene| scene.repeat_pass_date == date)
    }
}

/// Search parameters handed to a catalog provider for one frame
#[derive(Debug, Clone, PartialEq)]
pub struct StackQuery {
    pub allowable_polarizations: Vec<Polarization>,
    pub max_results: usize,
    pub start_time: Option<DateTime<Utc>>,
    pub stop_time: Option<DateTime<Utc>>,
}

/// Source of Sentinel-1 scene metadata (e.g. a remote search API)
pub trait CatalogProvider {
    /// Scenes whose footprint intersects the frame polygon on the frame's tracks
    fn query_over_frame(&self, frame: &Frame, query: &StackQuery) -> EnumResult<Vec<SceneRecord>>;
}

/// Provider answering queries from scenes already held in memory
#[derive(Debug, Clone, Default)]
pub struct StaticCatalogProvider {
    scenes: Vec<SceneRecord>,
}

impl StaticCatalogProvider {
    pub fn new(scenes: Vec<SceneRecord>) -> Self {
        Self { scenes }
    }
}

impl CatalogProvider for StaticCatalogProvider {
    fn query_over_frame(&self, frame: &Frame, query: &StackQuery) -> EnumResult<Vec<SceneRecord>> {
        let results: Vec<SceneRecord> = self
            .scenes
            .iter()
            .filter(|scene| frame.track_numbers().contains(&scene.track_number))
            .filter(|scene| query.allowable_polarizations.contains(&scene.polarization))
            .filter(|scene| query.start_time.map_or(true, |start| scene.start_time >= start))
            .filter(|scene| query.stop_time.map_or(true, |stop| scene.start_time <= stop))
            .filter(|scene| scene.footprint.intersects(frame.frame_geometry()))
            .take(query.max_results)
            .cloned()
            .collect();

        log::debug!("Frame {}: {} scenes matched query", frame.frame_id(), results.len());
        Ok(results)
    }
}
