use crate::types::{AcquisitionDate, DatePair, EnumError, EnumResult};
use chrono::TimeDelta;
use std::collections::{BTreeSet, HashSet, VecDeque};

/// A secondary date must precede the reference by at least the minimum baseline
///
/// A baseline reaching past the representable date range admits no secondary.
pub fn viable_secondary_date(
    secondary_date: AcquisitionDate,
    reference_date: AcquisitionDate,
    min_temporal_baseline_days: i64,
) -> bool {
    let latest = TimeDelta::try_days(min_temporal_baseline_days)
        .and_then(|baseline| reference_date.checked_sub_signed(baseline));
    match latest {
        Some(latest) => secondary_date <= latest && secondary_date != reference_date,
        None => false,
    }
}

/// Enumerate (reference, secondary) date pairs for an interferogram time series
///
/// Dates are visited breadth-first starting from the most recent one. Each
/// reference date is paired with its `n_secondary_scenes_per_ref` closest
/// viable earlier dates, and each of those secondaries is later used as a
/// reference date itself. Every date is visited at most once.
///
/// Pairs are returned sorted descending by reference date, then secondary date.
pub fn enumerate_dates(
    dates: &[AcquisitionDate],
    min_temporal_baseline_days: i64,
    n_secondary_scenes_per_ref: usize,
) -> EnumResult<Vec<DatePair>> {
    if dates.is_empty() {
        return Err(EnumError::InvalidInput(
            "At least one acquisition date is required".to_string(),
        ));
    }
    if min_temporal_baseline_days < 0 {
        return Err(EnumError::InvalidInput(format!(
            "Minimum temporal baseline must be non-negative, got {} days",
            min_temporal_baseline_days
        )));
    }

    let sorted_dates: Vec<AcquisitionDate> = dates
        .iter()
        .copied()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .rev()
        .collect();

    log::debug!(
        "Enumerating pairs over {} dates (baseline >= {} days, {} secondaries per reference)",
        sorted_dates.len(),
        min_temporal_baseline_days,
        n_secondary_scenes_per_ref
    );

    let seed = sorted_dates[0];
    let mut queue = VecDeque::from([seed]);
    let mut visited = HashSet::from([seed]);
    let mut pairs = BTreeSet::new();

    while let Some(ref_date) = queue.pop_front() {
        let secondary_dates = sorted_dates
            .iter()
            .copied()
            .filter(|&date| viable_secondary_date(date, ref_date, min_temporal_baseline_days))
            .take(n_secondary_scenes_per_ref);

        for sec_date in secondary_dates {
            pairs.insert((ref_date, sec_date));
            if visited.insert(sec_date) {
                queue.push_back(sec_date);
            }
        }
    }

    log::info!("Enumerated {} date pairs from {} dates", pairs.len(), sorted_dates.len());
    Ok(pairs.into_iter().rev().collect())
}
