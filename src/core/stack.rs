use crate::geometry;
use crate::io::catalog::{Catalog, CatalogProvider, SceneRecord, StackQuery};
use crate::io::frames::Frame;
use crate::types::{AcquisitionDate, EnumError, EnumResult, Polarization};
use chrono::{DateTime, Datelike, Utc};
use geo::{Area, Polygon};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Parameters for building a scene stack over a set of frames
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackParams {
    /// Calendar months (1-12) to keep; all months when unset
    pub allowable_months: Option<Vec<u32>>,
    pub allowable_polarizations: Vec<Polarization>,
    /// Drop repeat passes covering no more than this fraction of the frames; no filter when unset
    pub minimum_coverage_ratio_per_pass: Option<f64>,
    pub max_results_per_frame: usize,
    pub start_time: Option<DateTime<Utc>>,
    pub stop_time: Option<DateTime<Utc>>,
}

impl Default for StackParams {
    fn default() -> Self {
        Self {
            allowable_months: None,
            allowable_polarizations: vec![Polarization::VV, Polarization::VvVh],
            minimum_coverage_ratio_per_pass: Some(0.80),
            max_results_per_frame: 100_000,
            start_time: None,
            stop_time: None,
        }
    }
}

impl StackParams {
    fn query(&self) -> StackQuery {
        StackQuery {
            allowable_polarizations: self.allowable_polarizations.clone(),
            max_results: self.max_results_per_frame,
            start_time: self.start_time,
            stop_time: self.stop_time,
        }
    }
}

/// Check that frames can form a single stack
///
/// Frames may span at most two track numbers, and two only if they are
/// sequential. The union of the frame polygons must be one polygon.
pub fn validate_stack_frames(frames: &[Frame]) -> EnumResult<()> {
    if frames.is_empty() {
        return Err(EnumError::InvalidInput(
            "At least one frame is required to form a stack".to_string(),
        ));
    }

    let tracks: BTreeSet<u32> = frames
        .iter()
        .flat_map(|frame| frame.track_numbers().iter().copied())
        .collect();
    let tracks: Vec<u32> = tracks.into_iter().collect();
    if tracks.len() > 2 {
        return Err(EnumError::StackFormation(
            "There are more than 2 track numbers specified".to_string(),
        ));
    }
    if let [first, second] = tracks.as_slice() {
        if second - first > 1 {
            return Err(EnumError::StackFormation(
                "There is more than 1 track number specified and these are not sequential".to_string(),
            ));
        }
    }

    let total_geometry = stack_geometry(frames);
    if total_geometry.0.len() != 1 {
        return Err(EnumError::StackFormation(format!(
            "Frames must be contiguous; their union has {} parts",
            total_geometry.0.len()
        )));
    }

    Ok(())
}

/// Keep scenes from repeat passes that jointly cover enough of the frames
///
/// Footprints are dissolved per repeat-pass date, and a date survives when its
/// dissolved footprint covers strictly more than `minimum_coverage_ratio` of the
/// union of the frame coverage geometries.
pub fn filter_stack_by_coverage_per_pass(
    catalog: &Catalog,
    frames: &[Frame],
    minimum_coverage_ratio: f64,
) -> Catalog {
    let total_coverage = frames.iter().fold(geo::MultiPolygon::new(Vec::new()), |acc, frame| {
        geometry::union(&acc, frame.coverage_geometry())
    });
    let total_area = total_coverage.unsigned_area();

    let mut passes: BTreeMap<AcquisitionDate, Vec<&Polygon<f64>>> = BTreeMap::new();
    for scene in catalog.scenes() {
        passes
            .entry(scene.repeat_pass_date)
            .or_default()
            .push(&scene.footprint);
    }

    let kept_dates: HashSet<AcquisitionDate> = passes
        .into_iter()
        .filter(|(date, footprints)| {
            let pass = geometry::union_all(footprints.iter().copied());
            let ratio = if total_area > 0.0 {
                geometry::intersection_area(&pass, &total_coverage) / total_area
            } else {
                0.0
            };
            log::debug!("Pass {}: {:.1}% frame coverage", date, ratio * 100.0);
            ratio > minimum_coverage_ratio
        })
        .map(|(date, _)| date)
        .collect();

    let scenes: Vec<SceneRecord> = catalog
        .scenes()
        .iter()
        .filter(|scene| kept_dates.contains(&scene.repeat_pass_date))
        .cloned()
        .collect();

    log::info!(
        "Coverage per pass filter kept {} of {} scenes",
        scenes.len(),
        catalog.len()
    );
    Catalog::from_columns(catalog.columns().to_vec(), scenes)
}

/// Query a provider for every scene over `frames` and assemble the stack
///
/// Frames are validated before any query is made. Each frame is queried on its
/// own so that large areas are not truncated by the provider.
pub fn get_s1_stack<P: CatalogProvider + ?Sized>(
    frames: &[Frame],
    provider: &P,
    params: &StackParams,
) -> EnumResult<Catalog> {
    validate_stack_frames(frames)?;

    let query = params.query();
    log::info!("Querying stack from {} frame geometries", frames.len());

    let mut seen = HashSet::new();
    let mut scenes = Vec::new();
    for (i, frame) in frames.iter().enumerate() {
        let results = provider.query_over_frame(frame, &query)?;
        log::debug!(
            "Frame {} ({}/{}): {} results",
            frame.frame_id(),
            i + 1,
            frames.len(),
            results.len()
        );
        scenes.extend(results.into_iter().filter(|scene| seen.insert(scene.slc_id.clone())));
    }

    if let Some(months) = &params.allowable_months {
        scenes.retain(|scene| months.contains(&scene.repeat_pass_date.month()));
    }
    scenes.sort_by(|a, b| {
        (a.repeat_pass_date, &a.slc_id).cmp(&(b.repeat_pass_date, &b.slc_id))
    });

    let catalog = Catalog::new(scenes);
    if catalog.is_empty() {
        log::warn!("There were no results returned");
        return Ok(catalog);
    }

    let Some(min_ratio) = params.minimum_coverage_ratio_per_pass else {
        return Ok(catalog);
    };
    let filtered = filter_stack_by_coverage_per_pass(&catalog, frames, min_ratio);
    if filtered.is_empty() {
        log::warn!("The geometric coverage using the frames coverage geometry filtered out remaining results");
    }
    Ok(filtered)
}

/// Union of the frame polygons of a stack
pub fn stack_geometry(frames: &[Frame]) -> geo::MultiPolygon<f64> {
    geometry::union_all(frames.iter().map(Frame::frame_geometry))
}
