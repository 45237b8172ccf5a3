use crate::geometry::{self, to_multi};
use crate::types::{EnumError, EnumResult};
use geo::{Intersects, MultiPolygon, Polygon};
use rstar::primitives::{GeomWithData, Rectangle};
use rstar::RTree;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::OnceLock;

/// Environment variable pointing at a frame table JSON file
pub const FRAME_TABLE_ENV: &str = "IFG_ENUM_FRAME_TABLE";
/// Environment variable pointing at a land mask JSON file
pub const LAND_MASK_ENV: &str = "IFG_ENUM_LAND_MASK";
/// Environment variable pointing at a GUNW footprint JSON file
pub const GUNW_FOOTPRINTS_ENV: &str = "IFG_ENUM_GUNW_FOOTPRINTS";

const BUNDLED_FRAMES: &str = include_str!("../../data/sample_frames.json");
const BUNDLED_LAND_MASK: &str = include_str!("../../data/land_mask.json");
const BUNDLED_GUNW_FOOTPRINTS: &str = include_str!("../../data/sample_gunw_footprints.json");

static GLOBAL_REGISTRY: OnceLock<FrameRegistry> = OnceLock::new();

/// One row of a frame table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameRecord {
    pub frame_id: i64,
    pub track_number_min: u32,
    pub track_number_max: u32,
    #[serde(with = "crate::geometry::multipolygon_coords")]
    pub geometry: MultiPolygon<f64>,
}

impl FrameRecord {
    /// Frame polygon; frame tables hold exactly one polygon per frame
    pub fn polygon(&self) -> EnumResult<Polygon<f64>> {
        match self.geometry.0.as_slice() {
            [polygon] => Ok(polygon.clone()),
            polygons => Err(EnumError::InvalidInput(format!(
                "Frame {} geometry must be a single polygon, found {}",
                self.frame_id,
                polygons.len()
            ))),
        }
    }

    pub fn track_numbers(&self) -> Vec<u32> {
        let mut tracks = vec![self.track_number_min, self.track_number_max];
        tracks.sort_unstable();
        tracks.dedup();
        tracks
    }
}

/// Flat tabular form of a list of frames
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrameTable {
    pub records: Vec<FrameRecord>,
}

impl FrameTable {
    pub fn from_json(json: &str) -> EnumResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> EnumResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Extent of the GUNW products (standardized interferograms) formed over a frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GunwFootprint {
    pub frame_id: i64,
    #[serde(with = "crate::geometry::multipolygon_coords")]
    pub geometry: MultiPolygon<f64>,
}

impl GunwFootprint {
    /// Parse a JSON array of footprint rows
    pub fn list_from_json(json: &str) -> EnumResult<Vec<Self>> {
        Ok(serde_json::from_str(json)?)
    }
}

type FrameEnvelope = GeomWithData<Rectangle<[f64; 2]>, i64>;

/// Global frame geometries and land mask, read-only once built
pub struct FrameRegistry {
    records: BTreeMap<i64, FrameRecord>,
    index: RTree<FrameEnvelope>,
    land_mask: MultiPolygon<f64>,
    gunw_footprints: BTreeMap<i64, MultiPolygon<f64>>,
}

impl std::fmt::Debug for FrameRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameRegistry")
            .field("frames", &self.records.len())
            .field("land_mask_polygons", &self.land_mask.0.len())
            .field("gunw_footprints", &self.gunw_footprints.len())
            .finish()
    }
}

impl FrameRegistry {
    /// Build a registry from a frame table and a land mask
    ///
    /// The land mask polygons are dissolved so overlapping inputs form a valid
    /// multipolygon.
    pub fn new(table: FrameTable, land_mask: MultiPolygon<f64>) -> EnumResult<Self> {
        let mut records = BTreeMap::new();
        let mut envelopes = Vec::with_capacity(table.records.len());

        for record in table.records {
            let polygon = record.polygon()?;
            let envelope = geometry::envelope(&polygon).ok_or_else(|| {
                EnumError::InvalidInput(format!("Frame {} has an empty geometry", record.frame_id))
            })?;
            envelopes.push(GeomWithData::new(
                Rectangle::from_corners(envelope.lower(), envelope.upper()),
                record.frame_id,
            ));
            if records.insert(record.frame_id, record).is_some() {
                return Err(EnumError::InvalidInput(
                    "Frame table contains duplicate frame ids".to_string(),
                ));
            }
        }

        let land_mask = geometry::union_all(land_mask.0.iter());
        log::info!(
            "Frame registry: {} frames, land mask with {} polygons",
            records.len(),
            land_mask.0.len()
        );

        Ok(Self {
            records,
            index: RTree::bulk_load(envelopes),
            land_mask,
            gunw_footprints: BTreeMap::new(),
        })
    }

    /// Attach the GUNW footprint table; every footprint must belong to a registered frame
    pub fn with_gunw_footprints(mut self, footprints: Vec<GunwFootprint>) -> EnumResult<Self> {
        let mut table = BTreeMap::new();
        for footprint in footprints {
            self.lookup(footprint.frame_id)?;
            if table.insert(footprint.frame_id, footprint.geometry).is_some() {
                return Err(EnumError::InvalidInput(format!(
                    "GUNW footprint table lists frame {} more than once",
                    footprint.frame_id
                )));
            }
        }
        log::info!("Frame registry: {} GUNW footprints", table.len());
        self.gunw_footprints = table;
        Ok(self)
    }

    pub fn from_json(frames_json: &str, land_mask_json: &str) -> EnumResult<Self> {
        let table = FrameTable::from_json(frames_json)?;
        let land_mask: Vec<geometry::PolygonCoords> = serde_json::from_str(land_mask_json)?;
        Self::new(table, geometry::multipolygon_from_coords(&land_mask)?)
    }

    pub fn from_files<P: AsRef<Path>, Q: AsRef<Path>>(frames_path: P, land_mask_path: Q) -> EnumResult<Self> {
        log::info!("Reading frame table: {}", frames_path.as_ref().display());
        let frames_json = std::fs::read_to_string(frames_path)?;
        let land_mask_json = std::fs::read_to_string(land_mask_path)?;
        Self::from_json(&frames_json, &land_mask_json)
    }

    /// Sample frame table and coarse land mask shipped with the crate
    pub fn bundled() -> EnumResult<Self> {
        Self::from_json(BUNDLED_FRAMES, BUNDLED_LAND_MASK)?
            .with_gunw_footprints(GunwFootprint::list_from_json(BUNDLED_GUNW_FOOTPRINTS)?)
    }

    /// Registry from the files named by `IFG_ENUM_FRAME_TABLE`, `IFG_ENUM_LAND_MASK`
    /// and `IFG_ENUM_GUNW_FOOTPRINTS`
    ///
    /// Unset variables fall back to the bundled data, except that a custom frame
    /// table without a footprint file gets no footprints.
    pub fn from_env() -> EnumResult<Self> {
        let frames_json = match std::env::var_os(FRAME_TABLE_ENV) {
            Some(path) => {
                log::info!("Reading frame table from {}", Path::new(&path).display());
                std::fs::read_to_string(path)?
            }
            None => BUNDLED_FRAMES.to_string(),
        };
        let land_mask_json = match std::env::var_os(LAND_MASK_ENV) {
            Some(path) => std::fs::read_to_string(path)?,
            None => BUNDLED_LAND_MASK.to_string(),
        };
        let gunw_json = match std::env::var_os(GUNW_FOOTPRINTS_ENV) {
            Some(path) => Some(std::fs::read_to_string(path)?),
            None if std::env::var_os(FRAME_TABLE_ENV).is_none() => Some(BUNDLED_GUNW_FOOTPRINTS.to_string()),
            None => None,
        };

        let registry = Self::from_json(&frames_json, &land_mask_json)?;
        match gunw_json {
            Some(json) => registry.with_gunw_footprints(GunwFootprint::list_from_json(&json)?),
            None => Ok(registry),
        }
    }

    /// Process-wide registry, loaded on first use and shared afterwards
    pub fn global() -> EnumResult<&'static FrameRegistry> {
        if let Some(registry) = GLOBAL_REGISTRY.get() {
            return Ok(registry);
        }
        let registry = Self::from_env()?;
        Ok(GLOBAL_REGISTRY.get_or_init(|| registry))
    }

    pub fn lookup(&self, frame_id: i64) -> EnumResult<&FrameRecord> {
        self.records
            .get(&frame_id)
            .ok_or(EnumError::UnknownFrame(frame_id))
    }

    pub fn land_mask(&self) -> &MultiPolygon<f64> {
        &self.land_mask
    }

    /// GUNW footprint of a registered frame
    pub fn gunw_footprint(&self, frame_id: i64) -> EnumResult<&MultiPolygon<f64>> {
        self.lookup(frame_id)?;
        self.gunw_footprints.get(&frame_id).ok_or_else(|| {
            EnumError::NoData(format!("Frame {} has no GUNW footprint", frame_id))
        })
    }

    pub fn gunw_footprints(&self) -> impl Iterator<Item = (i64, &MultiPolygon<f64>)> + '_ {
        self.gunw_footprints.iter().map(|(&frame_id, geometry)| (frame_id, geometry))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn frame_ids(&self) -> impl Iterator<Item = i64> + '_ {
        self.records.keys().copied()
    }

    /// Frames whose polygon intersects `aoi`, optionally restricted to tracks
    ///
    /// A frame matches the track filter when either its minimum or maximum track
    /// number is listed. Frames come back ordered by frame id.
    pub fn overlapping_frames(&self, aoi: &Polygon<f64>, track_numbers: Option<&[u32]>) -> EnumResult<Vec<Frame>> {
        let mut frame_ids: Vec<i64> = match geometry::envelope(aoi) {
            Some(envelope) => self
                .index
                .locate_in_envelope_intersecting(&envelope)
                .map(|entry| entry.data)
                .collect(),
            None => Vec::new(),
        };
        frame_ids.sort_unstable();

        let mut frames = Vec::new();
        for frame_id in frame_ids {
            let record = &self.records[&frame_id];
            let polygon = record.polygon()?;
            if !polygon.intersects(aoi) {
                continue;
            }
            if let Some(tracks) = track_numbers.filter(|tracks| !tracks.is_empty()) {
                if !tracks.contains(&record.track_number_min) && !tracks.contains(&record.track_number_max) {
                    continue;
                }
            }
            let options = FrameOptions {
                track_numbers: Some(record.track_numbers()),
                frame_geometry: Some(polygon),
                ..FrameOptions::default()
            };
            frames.push(Frame::with_options(frame_id, options, self)?);
        }

        if frames.is_empty() {
            let mut msg = "There are no overlapping frames with the AOI".to_string();
            if let Some(tracks) = track_numbers.filter(|tracks| !tracks.is_empty()) {
                let tracks: Vec<String> = tracks.iter().map(u32::to_string).collect();
                msg.push_str(&format!(" and track number(s) {}", tracks.join(", ")));
            }
            msg.push('.');
            return Err(EnumError::InvalidInput(msg));
        }

        log::info!("Found {} frames overlapping the AOI", frames.len());
        Ok(frames)
    }
}

/// Optional inputs to frame construction; anything left unset comes from the registry
#[derive(Debug, Clone)]
pub struct FrameOptions {
    pub track_numbers: Option<Vec<u32>>,
    pub frame_geometry: Option<Polygon<f64>>,
    /// User coverage geometry; must lie inside the frame polygon
    pub coverage_geometry: Option<MultiPolygon<f64>>,
    /// Intersect the frame with the land mask when no coverage geometry is given
    pub use_land_mask: bool,
}

impl Default for FrameOptions {
    fn default() -> Self {
        Self {
            track_numbers: None,
            frame_geometry: None,
            coverage_geometry: None,
            use_land_mask: true,
        }
    }
}

/// A fixed geographic tile with its tracks and the area interferograms must cover
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    frame_id: i64,
    track_numbers: Vec<u32>,
    frame_geometry: Polygon<f64>,
    coverage_geometry: MultiPolygon<f64>,
}

impl Frame {
    /// Frame looked up in the global registry, with land-masked coverage
    pub fn new(frame_id: i64) -> EnumResult<Self> {
        Self::from_registry(frame_id, FrameRegistry::global()?)
    }

    pub fn from_registry(frame_id: i64, registry: &FrameRegistry) -> EnumResult<Self> {
        Self::with_options(frame_id, FrameOptions::default(), registry)
    }

    /// Build a frame, filling unset fields from `registry`
    ///
    /// Fails with `GeometryConstraint` if a supplied coverage geometry is not
    /// contained in the frame polygon.
    pub fn with_options(frame_id: i64, options: FrameOptions, registry: &FrameRegistry) -> EnumResult<Self> {
        let frame_geometry = match options.frame_geometry {
            Some(geometry) => geometry,
            None => registry.lookup(frame_id)?.polygon()?,
        };

        let mut track_numbers = match options.track_numbers {
            Some(tracks) => tracks,
            None => registry.lookup(frame_id)?.track_numbers(),
        };
        track_numbers.sort_unstable();
        track_numbers.dedup();

        let frame_multi = to_multi(&frame_geometry);
        let coverage_geometry = match options.coverage_geometry {
            Some(coverage) => {
                if !geometry::covers(&frame_multi, &coverage) {
                    return Err(EnumError::GeometryConstraint(format!(
                        "Coverage geometry of frame {} must be contained in the frame geometry",
                        frame_id
                    )));
                }
                if options.use_land_mask {
                    log::warn!(
                        "Frame {}: a land mask was requested for the coverage geometry; using the user geometry supplied",
                        frame_id
                    );
                }
                coverage
            }
            None if options.use_land_mask => geometry::intersection(&frame_multi, registry.land_mask()),
            None => frame_multi,
        };

        Ok(Self {
            frame_id,
            track_numbers,
            frame_geometry,
            coverage_geometry,
        })
    }

    /// Copy of this frame whose coverage is the frame polygon intersected with `land`
    pub fn with_custom_land_mask(&self, land: &MultiPolygon<f64>) -> Self {
        Self {
            coverage_geometry: geometry::intersection(&to_multi(&self.frame_geometry), land),
            ..self.clone()
        }
    }

    pub fn frame_id(&self) -> i64 {
        self.frame_id
    }

    pub fn track_numbers(&self) -> &[u32] {
        &self.track_numbers
    }

    pub fn frame_geometry(&self) -> &Polygon<f64> {
        &self.frame_geometry
    }

    pub fn coverage_geometry(&self) -> &MultiPolygon<f64> {
        &self.coverage_geometry
    }
}

/// Convert frames to their tabular form
///
/// With `use_coverage_geometry` the table carries coverage geometries instead of
/// frame polygons; such a table is for export only and is not accepted back by
/// [`table_to_frames`] when a coverage geometry has several parts.
pub fn frames_to_table(frames: &[Frame], use_coverage_geometry: bool) -> EnumResult<FrameTable> {
    let records = frames
        .iter()
        .map(|frame| {
            let (min, max) = match (frame.track_numbers.first(), frame.track_numbers.last()) {
                (Some(&min), Some(&max)) => (min, max),
                _ => {
                    return Err(EnumError::InvalidInput(format!(
                        "Frame {} has no track numbers",
                        frame.frame_id
                    )))
                }
            };
            let geometry = if use_coverage_geometry {
                frame.coverage_geometry.clone()
            } else {
                to_multi(&frame.frame_geometry)
            };
            Ok(FrameRecord {
                frame_id: frame.frame_id,
                track_number_min: min,
                track_number_max: max,
                geometry,
            })
        })
        .collect::<EnumResult<Vec<_>>>()?;

    Ok(FrameTable { records })
}

/// Rebuild frames from a table, recomputing coverage with the registry land mask
pub fn table_to_frames(table: &FrameTable, registry: &FrameRegistry) -> EnumResult<Vec<Frame>> {
    table
        .records
        .iter()
        .map(|record| {
            let options = FrameOptions {
                track_numbers: Some(record.track_numbers()),
                frame_geometry: Some(record.polygon()?),
                ..FrameOptions::default()
            };
            Frame::with_options(record.frame_id, options, registry)
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::geometry::tests::rect;
    use approx::assert_relative_eq;
    use geo::Area;

    /// Two frames on track 64 side by side, one straddling tracks 86/87, land on x < 1
    pub(crate) fn test_registry() -> FrameRegistry {
        let table = FrameTable {
            records: vec![
                FrameRecord {
                    frame_id: 1,
                    track_number_min: 64,
                    track_number_max: 64,
                    geometry: to_multi(&rect(0.0, 0.0, 2.0, 1.0)),
                },
                FrameRecord {
                    frame_id: 2,
                    track_number_min: 64,
                    track_number_max: 64,
                    geometry: to_multi(&rect(0.0, 1.0, 2.0, 2.0)),
                },
                FrameRecord {
                    frame_id: 3,
                    track_number_min: 86,
                    track_number_max: 87,
                    geometry: to_multi(&rect(10.0, 10.0, 12.0, 11.0)),
                },
            ],
        };
        let land = MultiPolygon::new(vec![rect(-5.0, -5.0, 1.0, 15.0), rect(9.0, 9.0, 13.0, 12.0)]);
        FrameRegistry::new(table, land).unwrap()
    }

    #[test]
    fn test_frame_from_registry_uses_land_mask() {
        let registry = test_registry();
        let frame = Frame::from_registry(1, &registry).unwrap();
        assert_eq!(frame.track_numbers(), &[64]);
        assert_relative_eq!(frame.frame_geometry().unsigned_area(), 2.0, epsilon = 1e-9);
        assert_relative_eq!(frame.coverage_geometry().unsigned_area(), 1.0, epsilon = 1e-9);

        let frame = Frame::from_registry(3, &registry).unwrap();
        assert_eq!(frame.track_numbers(), &[86, 87]);
    }

    #[test]
    fn test_frame_without_land_mask() {
        let registry = test_registry();
        let options = FrameOptions {
            use_land_mask: false,
            ..FrameOptions::default()
        };
        let frame = Frame::with_options(1, options, &registry).unwrap();
        assert_relative_eq!(frame.coverage_geometry().unsigned_area(), 2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_unknown_frame() {
        let registry = test_registry();
        assert!(matches!(
            Frame::from_registry(404, &registry),
            Err(EnumError::UnknownFrame(404))
        ));
    }

    #[test]
    fn test_custom_coverage_geometry() {
        let registry = test_registry();
        let good = to_multi(&rect(0.5, 0.25, 1.5, 0.75));
        let options = FrameOptions {
            coverage_geometry: Some(good.clone()),
            use_land_mask: false,
            ..FrameOptions::default()
        };
        let frame = Frame::with_options(1, options, &registry).unwrap();
        assert_eq!(frame.coverage_geometry(), &good);

        let bad = to_multi(&rect(-0.5, -0.5, 2.5, 1.5));
        let options = FrameOptions {
            coverage_geometry: Some(bad),
            ..FrameOptions::default()
        };
        assert!(matches!(
            Frame::with_options(1, options, &registry),
            Err(EnumError::GeometryConstraint(_))
        ));
    }

    #[test]
    fn test_custom_land_mask_returns_new_frame() {
        let registry = test_registry();
        let frame = Frame::from_registry(1, &registry).unwrap();
        let land = MultiPolygon::new(vec![rect(1.5, -1.0, 3.0, 3.0)]);
        let masked = frame.with_custom_land_mask(&land);
        assert_relative_eq!(masked.coverage_geometry().unsigned_area(), 0.5, epsilon = 1e-9);
        assert_relative_eq!(frame.coverage_geometry().unsigned_area(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_overlapping_frames_with_tracks() {
        let registry = test_registry();
        let aoi = rect(10.5, 10.2, 11.0, 10.8);
        let frames = registry.overlapping_frames(&aoi, None).unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].frame_id(), 3);

        let frames = registry.overlapping_frames(&aoi, Some(&[87])).unwrap();
        assert_eq!(frames[0].track_numbers(), &[86, 87]);

        let err = registry.overlapping_frames(&aoi, Some(&[64, 65])).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid input: There are no overlapping frames with the AOI and track number(s) 64, 65."
        );
    }

    #[test]
    fn test_duplicate_frame_ids_rejected() {
        let record = FrameRecord {
            frame_id: 7,
            track_number_min: 1,
            track_number_max: 1,
            geometry: to_multi(&rect(0.0, 0.0, 1.0, 1.0)),
        };
        let table = FrameTable {
            records: vec![record.clone(), record],
        };
        assert!(FrameRegistry::new(table, MultiPolygon::new(Vec::new())).is_err());
    }

    #[test]
    fn test_gunw_footprints() {
        let footprint = |frame_id| GunwFootprint {
            frame_id,
            geometry: to_multi(&rect(0.1, 0.1, 1.9, 0.9)),
        };
        let registry = test_registry().with_gunw_footprints(vec![footprint(1)]).unwrap();

        assert_relative_eq!(registry.gunw_footprint(1).unwrap().unsigned_area(), 1.44, epsilon = 1e-9);
        assert!(matches!(registry.gunw_footprint(2), Err(EnumError::NoData(_))));
        assert!(matches!(registry.gunw_footprint(404), Err(EnumError::UnknownFrame(404))));
        assert_eq!(registry.gunw_footprints().count(), 1);

        assert!(matches!(
            test_registry().with_gunw_footprints(vec![footprint(404)]),
            Err(EnumError::UnknownFrame(404))
        ));
        assert!(matches!(
            test_registry().with_gunw_footprints(vec![footprint(1), footprint(1)]),
            Err(EnumError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_bundled_registry_loads() {
        let registry = FrameRegistry::bundled().unwrap();
        assert!(!registry.is_empty());
        assert!(!registry.land_mask().0.is_empty());
        for frame_id in registry.frame_ids() {
            assert!(Frame::from_registry(frame_id, &registry).is_ok());
        }
        assert!(registry.gunw_footprints().count() > 0);
        for (frame_id, footprint) in registry.gunw_footprints() {
            let frame = Frame::from_registry(frame_id, &registry).unwrap();
            assert!(geometry::covers(&to_multi(frame.frame_geometry()), footprint));
        }
    }
}
