use std::collections::HashMap;

use crate::error::{GridError, Result};
use crate::geometry::Size;
use crate::item::WidgetKind;

/// Static description of a widget kind: the ordered list of sizes instances
/// of it may occupy. The first entry is the size used on creation.
#[derive(Debug, Clone)]
pub struct WidgetSpec {
    sizes: Vec<Size>,
}

impl WidgetSpec {
    fn new(sizes: Vec<Size>) -> Self {
        Self { sizes }
    }

    pub fn sizes(&self) -> &[Size] {
        &self.sizes
    }

    pub fn default_size(&self) -> Size {
        self.sizes[0]
    }
}

/// Registry mapping widget kinds to their size allowlists. Always an
/// explicitly injected value; unknown kinds answer as absent, never as an
/// error.
#[derive(Debug, Default)]
pub struct WidgetRegistry {
    specs: HashMap<WidgetKind, WidgetSpec>,
}

impl WidgetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a kind with its ordered size allowlist. An empty list is a
    /// configuration error; a repeated kind replaces the earlier entry.
    pub fn register(&mut self, kind: impl Into<WidgetKind>, sizes: Vec<Size>) -> Result<()> {
        let kind = kind.into();
        if sizes.is_empty() {
            return Err(GridError::EmptyAllowlist(kind));
        }
        self.specs.insert(kind, WidgetSpec::new(sizes));
        Ok(())
    }

    pub fn exists(&self, kind: &str) -> bool {
        self.specs.contains_key(kind)
    }

    pub fn size_allowlist(&self, kind: &str) -> Option<&[Size]> {
        self.specs.get(kind).map(WidgetSpec::sizes)
    }

    pub fn default_size(&self, kind: &str) -> Option<Size> {
        self.specs.get(kind).map(WidgetSpec::default_size)
    }

    /// Whether `span` appears in the kind's allowlist. Unknown kinds allow
    /// nothing.
    pub fn allows(&self, kind: &str, span: Size) -> bool {
        self.size_allowlist(kind)
            .map(|sizes| sizes.contains(&span))
            .unwrap_or(false)
    }

    /// Registered kinds in sorted order, so positional selection (e.g. a
    /// numbered picker) is stable.
    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.specs.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }
}
