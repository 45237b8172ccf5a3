use crate::core::{enumerate_dates, enumerate_time_series, SelectionParams, TimeSeriesParams};
use crate::io::{Catalog, Frame};
use crate::types::{AcquisitionDate, EnumError};
use pyo3::prelude::*;

fn to_py_err(e: EnumError) -> PyErr {
    match e {
        EnumError::Io(_) | EnumError::Json(_) => {
            PyErr::new::<pyo3::exceptions::PyRuntimeError, _>(format!("{}", e))
        }
        _ => PyErr::new::<pyo3::exceptions::PyValueError, _>(format!("{}", e)),
    }
}

fn parse_date(date: &str) -> PyResult<AcquisitionDate> {
    AcquisitionDate::parse_from_str(date, "%Y-%m-%d").map_err(|e| {
        PyErr::new::<pyo3::exceptions::PyValueError, _>(format!("Invalid date '{}': {}", date, e))
    })
}

/// Python module definition
#[pymodule]
fn _core(_py: Python, m: &PyModule) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(py_enumerate_dates, m)?)?;
    m.add_function(wrap_pyfunction!(py_enumerate_time_series, m)?)?;
    Ok(())
}

/// Date pairs as ISO date strings, most recent first
#[pyfunction]
#[pyo3(name = "enumerate_dates", signature = (dates, min_temporal_baseline_days, n_secondary_scenes_per_ref = 3))]
fn py_enumerate_dates(
    dates: Vec<String>,
    min_temporal_baseline_days: i64,
    n_secondary_scenes_per_ref: usize,
) -> PyResult<Vec<(String, String)>> {
    let dates = dates
        .iter()
        .map(|d| parse_date(d))
        .collect::<PyResult<Vec<_>>>()?;

    let pairs = enumerate_dates(&dates, min_temporal_baseline_days, n_secondary_scenes_per_ref)
        .map_err(to_py_err)?;

    Ok(pairs
        .into_iter()
        .map(|(reference, secondary)| (reference.to_string(), secondary.to_string()))
        .collect())
}

/// Interferogram descriptors as JSON for a JSON scene catalog
#[pyfunction]
#[pyo3(
    name = "enumerate_time_series",
    signature = (catalog_json, min_temporal_baseline_days = 0, n_secondary_scenes_per_ref = 3, frame_ids = None, minimal_cover = false)
)]
fn py_enumerate_time_series(
    catalog_json: &str,
    min_temporal_baseline_days: i64,
    n_secondary_scenes_per_ref: usize,
    frame_ids: Option<Vec<i64>>,
    minimal_cover: bool,
) -> PyResult<String> {
    let catalog = Catalog::from_json(catalog_json).map_err(to_py_err)?;

    let frames = frame_ids
        .map(|ids| ids.into_iter().map(Frame::new).collect::<Result<Vec<_>, _>>())
        .transpose()
        .map_err(to_py_err)?;

    let params = TimeSeriesParams {
        min_temporal_baseline_days,
        n_secondary_scenes_per_ref,
        selection: SelectionParams {
            minimal_cover,
            ..SelectionParams::default()
        },
    };

    let ifgs = enumerate_time_series(&catalog, frames.as_deref(), &params).map_err(to_py_err)?;
    serde_json::to_string(&ifgs).map_err(|e| to_py_err(e.into()))
}
