//! Runs in its own test binary since it mutates the process environment

mod common;

use common::*;
use sardine_ifg::geometry::to_multi;
use sardine_ifg::io::frames::{FRAME_TABLE_ENV, GUNW_FOOTPRINTS_ENV, LAND_MASK_ENV};
use sardine_ifg::io::GunwFootprint;
use sardine_ifg::FrameRegistry;
use std::io::Write;

#[test]
fn test_registry_from_env() -> anyhow::Result<()> {
    init_logging();

    // nothing set: bundled sample data
    std::env::remove_var(FRAME_TABLE_ENV);
    std::env::remove_var(LAND_MASK_ENV);
    std::env::remove_var(GUNW_FOOTPRINTS_ENV);
    let bundled = FrameRegistry::from_env()?;
    assert_eq!(bundled.len(), FrameRegistry::bundled()?.len());
    assert_eq!(
        bundled.gunw_footprints().count(),
        FrameRegistry::bundled()?.gunw_footprints().count()
    );

    // frame table overridden, land mask still bundled
    let mut frames_file = tempfile::NamedTempFile::new()?;
    frames_file.write_all(frame_table().to_json()?.as_bytes())?;
    std::env::set_var(FRAME_TABLE_ENV, frames_file.path());

    let registry = FrameRegistry::from_env()?;
    assert_eq!(registry.len(), frame_table().records.len());
    assert!(registry.lookup(21248).is_ok());
    assert!(registry.lookup(100).is_err());
    assert_eq!(registry.gunw_footprints().count(), 0);

    // footprints for the custom table
    let footprints = vec![GunwFootprint {
        frame_id: 21248,
        geometry: to_multi(&rect(0.1, 0.1, 1.9, 0.9)),
    }];
    let mut gunw_file = tempfile::NamedTempFile::new()?;
    gunw_file.write_all(serde_json::to_string(&footprints)?.as_bytes())?;
    std::env::set_var(GUNW_FOOTPRINTS_ENV, gunw_file.path());

    let registry = FrameRegistry::from_env()?;
    assert_eq!(registry.gunw_footprint(21248)?, &footprints[0].geometry);
    assert!(registry.gunw_footprint(21249).is_err());

    std::env::set_var(LAND_MASK_ENV, "/nonexistent/land_mask.json");
    assert!(FrameRegistry::from_env().is_err());

    std::env::remove_var(FRAME_TABLE_ENV);
    std::env::remove_var(LAND_MASK_ENV);
    std::env::remove_var(GUNW_FOOTPRINTS_ENV);
    Ok(())
}
