#![allow(dead_code)]

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use sardine_ifg::geometry::{polygon_from_coords, to_multi};
use sardine_ifg::io::FrameRecord;
use sardine_ifg::{FrameRegistry, FrameTable, Polarization, SceneRecord};
use geo::{MultiPolygon, Polygon};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Polygon<f64> {
    polygon_from_coords(&[vec![[x0, y0], [x1, y0], [x1, y1], [x0, y1], [x0, y0]]]).unwrap()
}

pub fn record(frame_id: i64, tracks: (u32, u32), polygon: Polygon<f64>) -> FrameRecord {
    FrameRecord {
        frame_id,
        track_number_min: tracks.0,
        track_number_max: tracks.1,
        geometry: to_multi(&polygon),
    }
}

/// Frames 21248/21249 stacked along track 64, 22439 on track 66 next to them,
/// and 9846/9848 on track 42 far apart. Land covers x < 1.5.
pub fn frame_table() -> FrameTable {
    FrameTable {
        records: vec![
            record(21248, (64, 64), rect(0.0, 0.0, 2.0, 1.0)),
            record(21249, (64, 64), rect(0.0, 0.95, 2.0, 2.0)),
            record(22439, (66, 66), rect(1.9, 0.0, 4.0, 1.0)),
            record(9846, (42, 42), rect(20.0, 20.0, 22.0, 21.0)),
            record(9848, (42, 42), rect(20.0, 23.0, 22.0, 24.0)),
            record(9849, (64, 65), rect(-10.0, -10.0, -8.0, -9.0)),
        ],
    }
}

pub fn land_mask() -> MultiPolygon<f64> {
    MultiPolygon::new(vec![rect(-50.0, -50.0, 1.5, 50.0), rect(19.0, 19.0, 23.0, 25.0)])
}

pub fn registry() -> FrameRegistry {
    FrameRegistry::new(frame_table(), land_mask()).unwrap()
}

pub fn scene(id: &str, date: NaiveDate, footprint: Polygon<f64>) -> SceneRecord {
    SceneRecord {
        slc_id: id.to_string(),
        footprint,
        repeat_pass_date: date,
        start_time: Utc.from_utc_datetime(&date.and_hms_opt(13, 55, 23).unwrap()),
        track_number: 64,
        polarization: Polarization::VvVh,
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Three scenes per date: one over each of 21248 and 21249 plus one straddling both
pub fn sample_stack_scenes(dates: &[NaiveDate]) -> Vec<SceneRecord> {
    dates
        .iter()
        .flat_map(|&d| {
            let tag = d.format("%Y%m%d");
            vec![
                scene(&format!("S1A_{}_south", tag), d, rect(-0.1, -0.1, 2.1, 0.8)),
                scene(&format!("S1A_{}_middle", tag), d, rect(-0.1, 0.6, 2.1, 1.4)),
                scene(&format!("S1A_{}_north", tag), d, rect(-0.1, 1.2, 2.1, 2.1)),
            ]
        })
        .collect()
}

pub fn every_12_days(first: NaiveDate, n: i64) -> Vec<NaiveDate> {
    (0..n).map(|k| first + Duration::days(12 * k)).collect()
}
