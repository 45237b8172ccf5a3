use crate::core::coverage::{select_ifg_pair_covering, FrameCoverage, SceneIndex, SelectionParams};
use crate::core::pairs::enumerate_dates;
use crate::io::catalog::{Catalog, S1_COLUMNS};
use crate::io::frames::Frame;
use crate::types::{DatePair, EnumError, EnumResult, IfgDescriptor};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Time-series enumeration parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeSeriesParams {
    /// Minimum days between reference and secondary acquisitions
    pub min_temporal_baseline_days: i64,
    /// Maximum number of secondary dates paired with each reference date
    pub n_secondary_scenes_per_ref: usize,
    /// Scene selection per (date pair, frame)
    pub selection: SelectionParams,
}

impl Default for TimeSeriesParams {
    fn default() -> Self {
        Self {
            min_temporal_baseline_days: 0,
            n_secondary_scenes_per_ref: 3,
            selection: SelectionParams::default(),
        }
    }
}

/// Check that a catalog can be enumerated: expected columns and at least one scene
pub fn validate_stack(catalog: &Catalog) -> EnumResult<()> {
    if !catalog.has_expected_columns() {
        return Err(EnumError::InvalidStack(format!(
            "Stack columns {:?} do not match the expected columns {:?}",
            catalog.columns(),
            S1_COLUMNS
        )));
    }
    if catalog.is_empty() {
        return Err(EnumError::InvalidStack("Stack contains no scenes".to_string()));
    }
    Ok(())
}

/// Enumerate every interferogram of a time series
///
/// Output is grouped by date pair: all frames of the most recent pair come
/// first, then all frames of the next pair, and so on. Without frames each date
/// pair yields one descriptor holding every scene of both dates.
pub fn enumerate_time_series(
    catalog: &Catalog,
    frames: Option<&[Frame]>,
    params: &TimeSeriesParams,
) -> EnumResult<Vec<IfgDescriptor>> {
    enumerate_time_series_with_progress(catalog, frames, params, |_, _| {})
}

/// [`enumerate_time_series`] reporting `(processed, total)` combinations as they complete
///
/// With the `parallel` feature the callback is invoked from worker threads and
/// completions arrive out of order; the returned list is still date-pair-major.
pub fn enumerate_time_series_with_progress<F>(
    catalog: &Catalog,
    frames: Option<&[Frame]>,
    params: &TimeSeriesParams,
    on_progress: F,
) -> EnumResult<Vec<IfgDescriptor>>
where
    F: Fn(usize, usize) + Sync,
{
    validate_stack(catalog)?;

    let dates = catalog.dates();
    let ifg_dates = enumerate_dates(
        &dates,
        params.min_temporal_baseline_days,
        params.n_secondary_scenes_per_ref,
    )?;

    let index = SceneIndex::new(catalog);
    let min_ratio = params.selection.minimum_coverage_ratio;

    #[cfg(feature = "parallel")]
    let coverages: Vec<FrameCoverage<'_>> = {
        use rayon::prelude::*;
        frames
            .unwrap_or_default()
            .par_iter()
            .map(|frame| FrameCoverage::new(&index, frame, min_ratio))
            .collect()
    };
    #[cfg(not(feature = "parallel"))]
    let coverages: Vec<FrameCoverage<'_>> = frames
        .unwrap_or_default()
        .iter()
        .map(|frame| FrameCoverage::new(&index, frame, min_ratio))
        .collect();

    let slots: Vec<Option<&FrameCoverage<'_>>> = match frames {
        Some(_) => coverages.iter().map(Some).collect(),
        None => vec![None],
    };

    let combinations: Vec<(DatePair, Option<&FrameCoverage<'_>>)> = ifg_dates
        .iter()
        .flat_map(|&pair| slots.iter().map(move |&slot| (pair, slot)))
        .collect();
    let total = combinations.len();

    log::info!(
        "Enumerating {} interferograms: {} date pairs x {} frames from {} scenes",
        total,
        ifg_dates.len(),
        slots.len(),
        catalog.len()
    );

    let processed = AtomicUsize::new(0);
    let select = |&((reference_date, secondary_date), coverage): &(DatePair, Option<&FrameCoverage<'_>>)| {
        let result = select_ifg_pair_covering(reference_date, secondary_date, catalog, coverage, &params.selection);
        let done = processed.fetch_add(1, Ordering::Relaxed) + 1;
        log::debug!("Processed {}/{} combinations", done, total);
        on_progress(done, total);
        result
    };

    #[cfg(feature = "parallel")]
    let ifgs = {
        use rayon::prelude::*;
        combinations.par_iter().map(select).collect::<EnumResult<Vec<_>>>()?
    };
    #[cfg(not(feature = "parallel"))]
    let ifgs = combinations.iter().map(select).collect::<EnumResult<Vec<_>>>()?;

    log::info!("Enumerated {} interferograms", ifgs.len());
    Ok(ifgs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::tests::rect;
    use crate::io::catalog::SceneRecord;
    use crate::io::frames::tests::test_registry;
    use crate::io::frames::FrameOptions;
    use crate::types::Polarization;
    use chrono::{Duration, NaiveDate, TimeZone, Utc};
    use std::sync::Mutex;

    fn frame(frame_id: i64) -> Frame {
        let options = FrameOptions {
            use_land_mask: false,
            ..FrameOptions::default()
        };
        Frame::with_options(frame_id, options, &test_registry()).unwrap()
    }

    /// Four dates 12 days apart, one scene per date over frames 1 and 2
    fn catalog() -> Catalog {
        let first = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        let scenes = (0..4)
            .map(|k| {
                let date = first + Duration::days(12 * k);
                SceneRecord {
                    slc_id: format!("S1A_{}", date.format("%Y%m%d")),
                    footprint: rect(-0.2, -0.2, 2.2, 2.2),
                    repeat_pass_date: date,
                    start_time: Utc.from_utc_datetime(&date.and_hms_opt(1, 2, 3).unwrap()),
                    track_number: 64,
                    polarization: Polarization::VV,
                }
            })
            .collect();
        Catalog::new(scenes)
    }

    #[test]
    fn test_pairs_outer_frames_inner() {
        let frames = vec![frame(1), frame(2)];
        let params = TimeSeriesParams {
            n_secondary_scenes_per_ref: 1,
            ..TimeSeriesParams::default()
        };
        let ifgs = enumerate_time_series(&catalog(), Some(&frames), &params).unwrap();

        assert_eq!(ifgs.len(), 6);
        let frame_ids: Vec<_> = ifgs.iter().map(|ifg| ifg.frame_id.unwrap()).collect();
        assert_eq!(frame_ids, vec![1, 2, 1, 2, 1, 2]);
        for chunk in ifgs.chunks(2) {
            assert_eq!(chunk[0].date_pair(), chunk[1].date_pair());
        }
        assert!(ifgs[0].reference_date > ifgs[2].reference_date);
    }

    #[test]
    fn test_without_frames() {
        let ifgs = enumerate_time_series(&catalog(), None, &TimeSeriesParams::default()).unwrap();
        // 4 dates, fan-out 3, baseline 0 → 3 + 2 + 1
        assert_eq!(ifgs.len(), 6);
        assert!(ifgs.iter().all(|ifg| ifg.frame_id.is_none() && ifg.reference.len() == 1));
    }

    #[test]
    fn test_invalid_stacks() {
        let empty = Catalog::new(Vec::new());
        assert!(matches!(
            enumerate_time_series(&empty, None, &TimeSeriesParams::default()),
            Err(EnumError::InvalidStack(_))
        ));

        let projected = Catalog::from_columns(vec!["dummy".to_string()], catalog().scenes().to_vec());
        assert!(matches!(
            enumerate_time_series(&projected, None, &TimeSeriesParams::default()),
            Err(EnumError::InvalidStack(_))
        ));
    }

    #[test]
    fn test_missing_coverage_propagates() {
        let frames = vec![frame(1), frame(3)];
        let result = enumerate_time_series(&catalog(), Some(&frames), &TimeSeriesParams::default());
        assert!(matches!(result, Err(EnumError::NoData(_))));
    }

    #[test]
    fn test_matches_per_pair_selection() {
        let mut scenes = catalog().scenes().to_vec();
        for (k, date) in catalog().dates().into_iter().enumerate() {
            let mut strip = scenes[0].clone();
            strip.slc_id = format!("S1B_{}", date.format("%Y%m%d"));
            strip.repeat_pass_date = date;
            strip.footprint = rect(-0.1, 0.2 * k as f64, 2.1, 0.2 * k as f64 + 0.9);
            scenes.push(strip);
        }
        let catalog = Catalog::new(scenes);
        let frames = vec![frame(1), frame(2)];

        for minimal_cover in [false, true] {
            let params = TimeSeriesParams {
                n_secondary_scenes_per_ref: 2,
                selection: SelectionParams {
                    minimal_cover,
                    ..SelectionParams::default()
                },
                ..TimeSeriesParams::default()
            };
            let ifgs = enumerate_time_series(&catalog, Some(&frames), &params).unwrap();
            for ifg in &ifgs {
                let frame = frames.iter().find(|f| Some(f.frame_id()) == ifg.frame_id);
                let expected = crate::core::coverage::select_ifg_pair(
                    ifg.reference_date,
                    ifg.secondary_date,
                    &catalog,
                    frame,
                    &params.selection,
                )
                .unwrap();
                assert_eq!(ifg, &expected);
            }
        }
    }

    #[test]
    fn test_empty_frame_list_yields_nothing() {
        let ifgs = enumerate_time_series(&catalog(), Some(&[]), &TimeSeriesParams::default()).unwrap();
        assert!(ifgs.is_empty());
    }

    #[test]
    fn test_progress_reaches_total() {
        let frames = vec![frame(1), frame(2)];
        let seen = Mutex::new(Vec::new());
        let ifgs = enumerate_time_series_with_progress(
            &catalog(),
            Some(&frames),
            &TimeSeriesParams::default(),
            |done, total| seen.lock().unwrap().push((done, total)),
        )
        .unwrap();

        let mut seen = seen.into_inner().unwrap();
        seen.sort_unstable();
        let expected: Vec<_> = (1..=ifgs.len()).map(|done| (done, ifgs.len())).collect();
        assert_eq!(seen, expected);
    }
}
