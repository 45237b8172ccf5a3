//! Core interferogram enumeration modules

pub mod pairs;
pub mod coverage;
pub mod min_cover;
pub mod time_series;
pub mod stack;

// Re-export main types
pub use pairs::{enumerate_dates, viable_secondary_date};
pub use coverage::{
    scenes_covering_frame, select_ifg_pair, select_ifg_pair_covering, select_ifg_pair_indexed, CoveringScene,
    FrameCoverage, SceneIndex, SelectionParams,
};
pub use min_cover::{minimal_cover, ScoredScene};
pub use time_series::{enumerate_time_series, enumerate_time_series_with_progress, validate_stack, TimeSeriesParams};
pub use stack::{filter_stack_by_coverage_per_pass, get_s1_stack, stack_geometry, validate_stack_frames, StackParams};
