//! Value types exchanged with the hub.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Entity`] | Entity state snapshot |
//! | [`Target`] | Entity/device/area/floor/label selector |
//! | [`ServiceCall`] | `(domain, service)` invocation |
//! | [`EntityEntry`], [`DeviceEntry`], [`AreaEntry`], [`FloorEntry`], [`LabelEntry`] | Registry entries |
//! | [`BrowseMedia`] | Media browse tree node |
//! | [`StatisticsQuery`], [`StatisticValue`] | Long-term statistics |
//! | [`HelperKind`] | Helper platforms |

// ============================================================================
// Submodules
// ============================================================================

/// Entity state, service calls and core config.
pub mod entity;

/// Helper platforms.
pub mod helper;

/// Media browsing.
pub mod media;

/// Registry entries.
pub mod registry;

/// Long-term statistics.
pub mod statistics;

/// Target selector.
pub mod target;

// ============================================================================
// Re-exports
// ============================================================================

pub use entity::{Context, Entity, HassConfig, ServiceCall, StateUpdate};
pub use helper::HelperKind;
pub use media::BrowseMedia;
pub use registry::{AreaEntry, DeviceEntry, EntityEntry, FloorEntry, LabelEntry};
pub use statistics::{StatisticMetadata, StatisticValue, StatisticsPeriod, StatisticsQuery};
pub use target::{Target, TargetExtraction};
