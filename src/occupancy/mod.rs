//! Occupancy module orchestrator; the queries live in the private `core`.

mod core;

pub use core::{point_occupied, region_clear};
