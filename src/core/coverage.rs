use crate::core::min_cover::{minimal_cover, ScoredScene};
use crate::geometry::{self, to_multi};
use crate::io::catalog::{Catalog, SceneRecord};
use crate::io::frames::Frame;
use crate::types::{AcquisitionDate, EnumError, EnumResult, IfgDescriptor};
use geo::Area;
use rstar::primitives::{GeomWithData, Rectangle};
use rstar::RTree;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Scene selection parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionParams {
    /// Scenes covering less than this fraction of the frame coverage area are dropped
    pub minimum_coverage_ratio: f64,
    /// Reduce each date to a minimal covering subset of scenes
    pub minimal_cover: bool,
}

impl Default for SelectionParams {
    fn default() -> Self {
        Self {
            minimum_coverage_ratio: 0.01, // 1% of the frame
            minimal_cover: false,
        }
    }
}

type SceneEnvelope = GeomWithData<Rectangle<[f64; 2]>, usize>;

/// Bounding-box R-tree over the scene footprints of a catalog
pub struct SceneIndex<'a> {
    catalog: &'a Catalog,
    tree: RTree<SceneEnvelope>,
}

impl<'a> SceneIndex<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        let envelopes: Vec<SceneEnvelope> = catalog
            .scenes()
            .iter()
            .enumerate()
            .filter_map(|(i, scene)| {
                geometry::envelope(&scene.footprint).map(|envelope| {
                    GeomWithData::new(Rectangle::from_corners(envelope.lower(), envelope.upper()), i)
                })
            })
            .collect();

        Self {
            catalog,
            tree: RTree::bulk_load(envelopes),
        }
    }

    pub fn catalog(&self) -> &'a Catalog {
        self.catalog
    }

    /// Catalog positions of scenes whose bounding box meets that of `frame`'s coverage, ascending
    pub fn candidates(&self, frame: &Frame) -> Vec<usize> {
        let Some(envelope) = geometry::envelope(frame.coverage_geometry()) else {
            return Vec::new();
        };
        let mut positions: Vec<usize> = self
            .tree
            .locate_in_envelope_intersecting(&envelope)
            .map(|entry| entry.data)
            .collect();
        positions.sort_unstable();
        positions
    }
}

/// A scene retained for a frame together with its coverage ratio
#[derive(Debug, Clone)]
pub struct CoveringScene<'a> {
    pub scene: &'a SceneRecord,
    pub coverage_ratio: f64,
}

/// Scenes covering at least `minimum_coverage_ratio` of the frame coverage, in catalog order
pub fn scenes_covering_frame<'a>(
    index: &SceneIndex<'a>,
    frame: &Frame,
    minimum_coverage_ratio: f64,
) -> Vec<CoveringScene<'a>> {
    let coverage = frame.coverage_geometry();
    let coverage_area = coverage.unsigned_area();
    if coverage_area == 0.0 {
        log::debug!("Frame {} has an empty coverage geometry", frame.frame_id());
        return Vec::new();
    }

    let scenes = index.catalog().scenes();
    index
        .candidates(frame)
        .into_iter()
        .filter_map(|i| {
            let scene = &scenes[i];
            let coverage_ratio =
                geometry::intersection_area(&to_multi(&scene.footprint), coverage) / coverage_area;
            (coverage_ratio >= minimum_coverage_ratio).then_some(CoveringScene {
                scene,
                coverage_ratio,
            })
        })
        .collect()
}

/// Scenes covering one frame, grouped by repeat-pass date
///
/// Coverage ratios do not depend on the date pair, so a time series computes
/// this once per frame and reuses it for every pair.
#[derive(Debug, Clone)]
pub struct FrameCoverage<'a> {
    frame: &'a Frame,
    by_date: BTreeMap<AcquisitionDate, Vec<CoveringScene<'a>>>,
}

impl<'a> FrameCoverage<'a> {
    pub fn new(index: &SceneIndex<'a>, frame: &'a Frame, minimum_coverage_ratio: f64) -> Self {
        let mut by_date: BTreeMap<AcquisitionDate, Vec<CoveringScene<'a>>> = BTreeMap::new();
        for covering in scenes_covering_frame(index, frame, minimum_coverage_ratio) {
            by_date
                .entry(covering.scene.repeat_pass_date)
                .or_default()
                .push(covering);
        }
        log::debug!(
            "Frame {}: covering scenes on {} dates",
            frame.frame_id(),
            by_date.len()
        );
        Self { frame, by_date }
    }

    pub fn frame(&self) -> &'a Frame {
        self.frame
    }

    /// Covering scenes acquired on `date`, in catalog order
    pub fn scenes_on(&self, date: AcquisitionDate) -> &[CoveringScene<'a>] {
        self.by_date.get(&date).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Select the scenes forming one interferogram, building a one-off spatial index
pub fn select_ifg_pair(
    reference_date: AcquisitionDate,
    secondary_date: AcquisitionDate,
    catalog: &Catalog,
    frame: Option<&Frame>,
    params: &SelectionParams,
) -> EnumResult<IfgDescriptor> {
    let index = SceneIndex::new(catalog);
    select_ifg_pair_indexed(reference_date, secondary_date, &index, frame, params)
}

/// [`select_ifg_pair`] over an existing spatial index
pub fn select_ifg_pair_indexed(
    reference_date: AcquisitionDate,
    secondary_date: AcquisitionDate,
    index: &SceneIndex<'_>,
    frame: Option<&Frame>,
    params: &SelectionParams,
) -> EnumResult<IfgDescriptor> {
    let coverage = frame.map(|frame| FrameCoverage::new(index, frame, params.minimum_coverage_ratio));
    select_ifg_pair_covering(reference_date, secondary_date, index.catalog(), coverage.as_ref(), params)
}

/// Select the scenes on each date of a pair that contribute to a frame
///
/// Without a frame every scene of both dates is returned in catalog order.
/// With a frame, the scenes of `coverage` on each date are used, optionally
/// reduced to a minimal cover per date, and sorted by ID. Fails with `NoData`
/// when either date ends up with no scene.
pub fn select_ifg_pair_covering(
    reference_date: AcquisitionDate,
    secondary_date: AcquisitionDate,
    catalog: &Catalog,
    coverage: Option<&FrameCoverage<'_>>,
    params: &SelectionParams,
) -> EnumResult<IfgDescriptor> {
    let frame = coverage.map(FrameCoverage::frame);
    let (reference, secondary) = match coverage {
        None => {
            let ids_on = |date: AcquisitionDate| -> Vec<String> {
                catalog.scenes_on(date).map(|scene| scene.slc_id.clone()).collect()
            };
            (ids_on(reference_date), ids_on(secondary_date))
        }
        Some(coverage) => {
            let side = |date: AcquisitionDate| {
                scene_ids_for_date(coverage.scenes_on(date), coverage.frame(), params.minimal_cover)
            };
            (side(reference_date), side(secondary_date))
        }
    };

    let frame_label = frame.map_or_else(|| "no frame".to_string(), |f| format!("frame {}", f.frame_id()));
    if reference.is_empty() || secondary.is_empty() {
        return Err(EnumError::NoData(format!(
            "Pair {} / {} has {} reference and {} secondary scenes for {}",
            reference_date,
            secondary_date,
            reference.len(),
            secondary.len(),
            frame_label
        )));
    }

    log::debug!(
        "Pair {} / {} ({}): {} reference, {} secondary scenes",
        reference_date,
        secondary_date,
        frame_label,
        reference.len(),
        secondary.len()
    );

    Ok(IfgDescriptor {
        reference,
        secondary,
        reference_date,
        secondary_date,
        frame_id: frame.map(Frame::frame_id),
        geometry: frame.map(|f| f.coverage_geometry().clone()),
    })
}

fn scene_ids_for_date(scenes: &[CoveringScene<'_>], frame: &Frame, reduce: bool) -> Vec<String> {
    let kept: Vec<&CoveringScene<'_>> = if reduce {
        let scored: Vec<ScoredScene<'_>> = scenes
            .iter()
            .map(|c| ScoredScene {
                footprint: &c.scene.footprint,
                coverage_ratio: c.coverage_ratio,
            })
            .collect();
        minimal_cover(&scored, frame.coverage_geometry())
            .into_iter()
            .map(|i| &scenes[i])
            .collect()
    } else {
        scenes.iter().collect()
    };

    let mut ids: Vec<String> = kept.iter().map(|c| c.scene.slc_id.clone()).collect();
    ids.sort();
    ids
}
