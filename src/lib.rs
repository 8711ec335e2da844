//! Interactive grid placement for dashboard widgets.
//!
//! The crate keeps a single persisted list of placed items and resolves one
//! placement request at a time against it: occupancy queries answer where
//! things are, the engine validates and commits add/move/resize/delete
//! operations, and the runtime turns terminal events into those operations.
//! Rendering stays with the embedding application.

pub mod confirm;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod item;
pub mod logging;
pub mod metrics;
pub mod occupancy;
pub mod registry;
pub mod runtime;
pub mod store;
pub mod viewport;

pub use confirm::{AutoConfirm, ConfirmPrompt, TerminalConfirm};
pub use engine::{GridEngine, Mode, RejectReason};
pub use error::{GridError, Result};
pub use geometry::{Rect, Size};
pub use item::{Item, ItemId, WidgetKind};
pub use logging::{
    FileSink, LogEvent, LogFields, LogLevel, LogSink, Logger, LoggingError, LoggingResult,
};
pub use metrics::{EngineMetrics, MetricSnapshot};
pub use occupancy::{point_occupied, region_clear};
pub use registry::{WidgetRegistry, WidgetSpec};
pub use runtime::{GridEvent, GridRuntime, PreviewState, RuntimeConfig};
pub use store::{
    ITEMS_KEY, JsonFileStore, MemoryStore, SettingsStore, load_items, save_items,
};
pub use viewport::{CELL_COLS, CELL_ROWS, Viewport, cell_under, grid_extent};
