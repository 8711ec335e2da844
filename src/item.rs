use serde::{Deserialize, Serialize};

use crate::geometry::{Rect, Size};

/// Identifier selecting which widget allowlist and content a placed item uses.
pub type WidgetKind = String;

/// Unique, immutable token identifying one placed instance across moves and
/// resizes. Monotonic within a session; recovered from the stored list on
/// engine construction.
pub type ItemId = u64;

/// One placed widget instance on the grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub kind: WidgetKind,
    pub id: ItemId,
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
}

impl Item {
    pub fn new(kind: impl Into<WidgetKind>, id: ItemId, x: u16, y: u16, size: Size) -> Self {
        Self {
            kind: kind.into(),
            id,
            x,
            y,
            width: size.width,
            height: size.height,
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }

    pub fn span(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Copy of this item re-anchored at `(x, y)`. Used to build placement
    /// candidates without touching the stored entry.
    pub fn at(&self, x: u16, y: u16) -> Self {
        Self {
            x,
            y,
            ..self.clone()
        }
    }
}
