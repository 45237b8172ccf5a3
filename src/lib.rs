//! sardine-ifg: Frame-based Sentinel-1 interferogram enumeration
//!
//! Chooses which acquisition dates of a Sentinel-1 stack to pair into
//! interferograms and which SLC scenes on each date contribute to a frame,
//! optionally reduced to a minimal covering set.

pub mod types;
pub mod geometry;
pub mod io;
pub mod core;

#[cfg(feature = "python")]
mod python;

// Re-export main types and functions for easier access
pub use crate::types::{
    AcquisitionDate, DatePair, EnumError, EnumResult, IfgDescriptor, Polarization
};

pub use crate::io::{
    frames_to_table, table_to_frames, Catalog, CatalogProvider, Frame, FrameOptions,
    FrameRegistry, FrameTable, GunwFootprint, SceneRecord, StaticCatalogProvider
};

pub use crate::core::{
    enumerate_dates, enumerate_time_series, get_s1_stack, minimal_cover, select_ifg_pair,
    SelectionParams, StackParams, TimeSeriesParams
};
