//! Frame registry and scene catalog I/O

pub mod catalog;
pub mod frames;

pub use catalog::{Catalog, CatalogProvider, SceneRecord, StackQuery, StaticCatalogProvider, S1_COLUMNS};
pub use frames::{
    frames_to_table, table_to_frames, Frame, FrameOptions, FrameRecord, FrameRegistry, FrameTable, GunwFootprint,
};
