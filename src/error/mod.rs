//! Error module orchestrator; the enum itself lives in `types`.

mod types;

pub use types::{GridError, Result};
