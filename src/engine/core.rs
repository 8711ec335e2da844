use crate::confirm::ConfirmPrompt;
use crate::error::Result;
use crate::item::{Item, ItemId, WidgetKind};
use crate::occupancy;
use crate::registry::WidgetRegistry;
use crate::store::{self, SettingsStore};

/// Interaction mode of the engine. Adding and editing are mutually
/// exclusive by construction; the placement grid is visible in every mode
/// except `Idle`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Idle,
    Adding(WidgetKind),
    Editing,
}

impl Mode {
    pub fn grid_visible(&self) -> bool {
        !matches!(self, Self::Idle)
    }

    pub fn pending_kind(&self) -> Option<&str> {
        match self {
            Self::Adding(kind) => Some(kind),
            _ => None,
        }
    }
}

/// Why a placement was turned down. Classification for logs and callers
/// that want detail; rejections stay silent and never surface as errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    UnknownKind,
    SizeNotAllowed,
    Collision,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnknownKind => "unknown_kind",
            Self::SizeNotAllowed => "size_not_allowed",
            Self::Collision => "collision",
        }
    }
}

/// Validates and commits placement operations against the stored item list.
///
/// The settings store is the single source of truth: every operation reads
/// the live list and successful mutations rewrite it whole, so no divergent
/// copy ever exists. Illegal operations are silent no-ops; `Err` only
/// carries store write failures.
pub struct GridEngine<S> {
    registry: WidgetRegistry,
    store: S,
    confirm: Box<dyn ConfirmPrompt>,
    mode: Mode,
    next_id: ItemId,
}

impl<S: SettingsStore> GridEngine<S> {
    pub fn new(registry: WidgetRegistry, store: S, confirm: Box<dyn ConfirmPrompt>) -> Self {
        let next_id = store::load_items(&store)
            .iter()
            .map(|item| item.id)
            .max()
            .map_or(1, |id| id.saturating_add(1));
        Self {
            registry,
            store,
            confirm,
            mode: Mode::Idle,
            next_id,
        }
    }

    pub fn registry(&self) -> &WidgetRegistry {
        &self.registry
    }

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    pub fn grid_visible(&self) -> bool {
        self.mode.grid_visible()
    }

    pub fn pending_kind(&self) -> Option<&str> {
        self.mode.pending_kind()
    }

    /// Live item list, read from the store on every call.
    pub fn items(&self) -> Vec<Item> {
        store::load_items(&self.store)
    }

    pub fn item(&self, id: ItemId) -> Option<Item> {
        self.items().into_iter().find(|item| item.id == id)
    }

    /// Items whose kind the registry knows. Unknown kinds are skipped at
    /// render time but stay in the list and keep occupying their cells.
    pub fn renderable_items(&self) -> Vec<Item> {
        self.items()
            .into_iter()
            .filter(|item| self.registry.exists(&item.kind))
            .collect()
    }

    /// Queue `kind` for placement. Shows the grid and leaves edit mode; no
    /// validation happens until a cell is picked.
    pub fn begin_add(&mut self, kind: impl Into<WidgetKind>) {
        self.mode = Mode::Adding(kind.into());
    }

    /// Flip edit mode. Entering discards any pending add; leaving hides the
    /// grid. Both follow from the mode machine rather than separate flags.
    pub fn toggle_edit(&mut self) {
        self.mode = match self.mode {
            Mode::Editing => Mode::Idle,
            _ => Mode::Editing,
        };
    }

    /// Classify the claim of `item` re-anchored at `(col, row)` without
    /// touching anything. `None` means the claim would commit.
    pub fn validate_claim(&self, item: &Item, col: u16, row: u16) -> Option<RejectReason> {
        let candidate = item.at(col, row);
        let others: Vec<Item> = self
            .items()
            .into_iter()
            .filter(|stored| stored.id != candidate.id)
            .collect();
        self.validate(&candidate, &others)
    }

    fn validate(&self, candidate: &Item, others: &[Item]) -> Option<RejectReason> {
        if !self.registry.exists(&candidate.kind) {
            return Some(RejectReason::UnknownKind);
        }
        if !self.registry.allows(&candidate.kind, candidate.span()) {
            return Some(RejectReason::SizeNotAllowed);
        }
        if !occupancy::region_clear(
            candidate.x,
            candidate.y,
            candidate.width,
            candidate.height,
            others,
        ) {
            return Some(RejectReason::Collision);
        }
        None
    }

    /// Validate and, unless `dry_run`, commit moving `item` to
    /// `(col, row)`. A dry run is strictly read-only and reports the same
    /// verdict the wet run would. A committed claim rewrites only the
    /// matched entry's position; order, span and kind stay untouched.
    pub fn try_claim(&mut self, item: &Item, col: u16, row: u16, dry_run: bool) -> Result<bool> {
        let valid = self.validate_claim(item, col, row).is_none();
        if dry_run || !valid {
            return Ok(valid);
        }
        let next: Vec<Item> = self
            .items()
            .into_iter()
            .map(|mut stored| {
                if stored.id == item.id {
                    stored.x = col;
                    stored.y = row;
                }
                stored
            })
            .collect();
        store::save_items(&mut self.store, &next)?;
        Ok(true)
    }

    /// Replace a stored item wholesale after validating it at its own
    /// position; this is the resize path. Span changes are checked against
    /// the allowlist exactly like a move.
    pub fn update_item(&mut self, new_item: &Item) -> Result<bool> {
        if self
            .validate_claim(new_item, new_item.x, new_item.y)
            .is_some()
        {
            return Ok(false);
        }
        let next: Vec<Item> = self
            .items()
            .into_iter()
            .map(|stored| {
                if stored.id == new_item.id {
                    new_item.clone()
                } else {
                    stored
                }
            })
            .collect();
        store::save_items(&mut self.store, &next)?;
        Ok(true)
    }

    /// Create an item of the pending kind at `(col, row)` using its default
    /// size and a fresh id. Self-validating: the same size and collision
    /// checks as `try_claim` run against the full list, so a caller that
    /// skipped `cell_blocked_for_pending` cannot create an overlap. Success
    /// appends and leaves add mode; rejection keeps the pending kind so
    /// another cell can be picked.
    pub fn add_at(&mut self, col: u16, row: u16) -> Result<bool> {
        let Mode::Adding(kind) = &self.mode else {
            return Ok(false);
        };
        let Some(size) = self.registry.default_size(kind) else {
            return Ok(false);
        };
        let candidate = Item::new(kind.clone(), self.next_id, col, row, size);
        let mut items = self.items();
        if self.validate(&candidate, &items).is_some() {
            return Ok(false);
        }
        items.push(candidate);
        store::save_items(&mut self.store, &items)?;
        self.next_id = self.next_id.saturating_add(1);
        self.mode = Mode::Idle;
        Ok(true)
    }

    /// Whether `(col, row)` should be withheld as an add target: no pending
    /// kind, an unknown pending kind, or the default-size block colliding
    /// with any stored item. No exclusion applies, since there is no self yet.
    pub fn cell_blocked_for_pending(&self, col: u16, row: u16) -> bool {
        let Some(kind) = self.mode.pending_kind() else {
            return true;
        };
        let Some(size) = self.registry.default_size(kind) else {
            return true;
        };
        !occupancy::region_clear(col, row, size.width, size.height, &self.items())
    }

    /// Remove the item after the injected prompt affirms. Refusal and
    /// unknown ids are no-ops.
    pub fn delete(&mut self, id: ItemId) -> Result<bool> {
        let items = self.items();
        if !items.iter().any(|item| item.id == id) {
            return Ok(false);
        }
        if !self
            .confirm
            .confirm("Are you sure you want to delete this widget?")
        {
            return Ok(false);
        }
        let next: Vec<Item> = items.into_iter().filter(|item| item.id != id).collect();
        store::save_items(&mut self.store, &next)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::confirm::AutoConfirm;
    use crate::geometry::Size;
    use crate::store::MemoryStore;

    fn registry() -> WidgetRegistry {
        let mut registry = WidgetRegistry::new();
        registry
            .register("clock", vec![Size::new(2, 1), Size::new(2, 2)])
            .unwrap();
        registry.register("notes", vec![Size::new(1, 1)]).unwrap();
        registry
    }

    fn engine() -> GridEngine<MemoryStore> {
        GridEngine::new(registry(), MemoryStore::new(), Box::new(AutoConfirm(true)))
    }

    fn engine_with(items: &[Item], confirm: AutoConfirm) -> GridEngine<MemoryStore> {
        let mut store = MemoryStore::new();
        store::save_items(&mut store, items).unwrap();
        GridEngine::new(registry(), store, Box::new(confirm))
    }

    fn assert_no_overlap(items: &[Item]) {
        for (i, a) in items.iter().enumerate() {
            for b in &items[i + 1..] {
                assert!(
                    !a.rect().intersects(&b.rect()),
                    "items {} and {} overlap",
                    a.id,
                    b.id
                );
            }
        }
    }

    #[test]
    fn add_places_default_size_at_cell() {
        // Scenario A: empty grid, clock defaults to 2x1.
        let mut engine = engine();
        engine.begin_add("clock");
        assert!(engine.add_at(0, 0).unwrap());

        let items = engine.items();
        assert_eq!(items.len(), 1);
        assert_eq!((items[0].x, items[0].y), (0, 0));
        assert_eq!(items[0].span(), Size::new(2, 1));
        assert_eq!(engine.mode(), &Mode::Idle);
        assert!(!engine.grid_visible());
    }

    #[test]
    fn claim_excludes_self_from_collision() {
        // Scenario B: a width-2 item shifting one column over its own cells.
        let a = Item::new("clock", 1, 0, 0, Size::new(2, 1));
        let mut engine = engine_with(std::slice::from_ref(&a), AutoConfirm(true));

        assert!(engine.try_claim(&a, 1, 0, false).unwrap());
        let items = engine.items();
        assert_eq!((items[0].x, items[0].y), (1, 0));
    }

    #[test]
    fn claim_into_neighbor_is_rejected_whole() {
        // Scenario C: the shift now lands on item B at (2, 0).
        let a = Item::new("clock", 1, 0, 0, Size::new(2, 1));
        let b = Item::new("notes", 2, 2, 0, Size::new(1, 1));
        let mut engine = engine_with(&[a.clone(), b], AutoConfirm(true));
        let before = engine.items();

        assert!(!engine.try_claim(&a, 1, 0, false).unwrap());
        assert_eq!(engine.items(), before);
    }

    #[test]
    fn cell_blocked_without_pending_kind() {
        // Scenario D: nothing queued means every cell is withheld.
        let engine = engine();
        assert!(engine.cell_blocked_for_pending(0, 0));
    }

    #[test]
    fn delete_respects_the_prompt() {
        // Scenario E: refusal keeps the list, affirmation removes one item.
        let a = Item::new("clock", 1, 0, 0, Size::new(2, 1));
        let b = Item::new("notes", 2, 2, 0, Size::new(1, 1));

        let mut refused = engine_with(&[a.clone(), b.clone()], AutoConfirm(false));
        assert!(!refused.delete(1).unwrap());
        assert_eq!(refused.items().len(), 2);

        let mut affirmed = engine_with(&[a, b], AutoConfirm(true));
        assert!(affirmed.delete(1).unwrap());
        let ids: Vec<_> = affirmed.items().iter().map(|item| item.id).collect();
        assert_eq!(ids, vec![2]);
    }

    #[test]
    fn dry_run_is_pure_and_predicts_the_commit() {
        let a = Item::new("clock", 1, 0, 0, Size::new(2, 1));
        let mut engine = engine_with(std::slice::from_ref(&a), AutoConfirm(true));
        let before = engine.items();

        let verdict = engine.try_claim(&a, 3, 2, true).unwrap();
        assert!(engine.try_claim(&a, 3, 2, true).unwrap());
        assert_eq!(engine.items(), before);

        assert_eq!(engine.try_claim(&a, 3, 2, false).unwrap(), verdict);
        assert_eq!((engine.items()[0].x, engine.items()[0].y), (3, 2));
    }

    #[test]
    fn size_gate_holds_even_on_empty_space() {
        let a = Item::new("clock", 1, 0, 0, Size::new(3, 1));
        let mut engine = engine_with(std::slice::from_ref(&a), AutoConfirm(true));

        assert!(!engine.try_claim(&a, 5, 5, false).unwrap());
        assert_eq!(
            engine.validate_claim(&a, 5, 5),
            Some(RejectReason::SizeNotAllowed)
        );
    }

    #[test]
    fn rejected_claim_leaves_list_identical() {
        let a = Item::new("clock", 1, 0, 0, Size::new(2, 1));
        let b = Item::new("notes", 2, 2, 0, Size::new(1, 1));
        let mut engine = engine_with(&[a.clone(), b], AutoConfirm(true));
        let before = engine.items();

        assert!(!engine.try_claim(&a, 1, 0, false).unwrap());
        assert!(!engine.try_claim(&a, 2, 0, false).unwrap());
        assert_eq!(engine.items(), before);
    }

    #[test]
    fn commit_moves_only_the_target_position() {
        let a = Item::new("clock", 1, 0, 0, Size::new(2, 1));
        let b = Item::new("notes", 2, 4, 4, Size::new(1, 1));
        let mut engine = engine_with(&[a.clone(), b.clone()], AutoConfirm(true));

        assert!(engine.try_claim(&a, 0, 2, false).unwrap());
        let items = engine.items();
        assert_eq!(items[0].id, 1);
        assert_eq!((items[0].x, items[0].y), (0, 2));
        assert_eq!(items[0].span(), a.span());
        assert_eq!(items[0].kind, a.kind);
        assert_eq!(items[1], b);
        assert_no_overlap(&items);
    }

    #[test]
    fn add_on_blocked_cell_stays_in_add_mode() {
        let a = Item::new("notes", 1, 1, 0, Size::new(1, 1));
        let mut engine = engine_with(std::slice::from_ref(&a), AutoConfirm(true));
        engine.begin_add("clock");

        // Default 2x1 anchored at (0, 0) would cover the occupied (1, 0).
        assert!(engine.cell_blocked_for_pending(0, 0));
        assert!(!engine.add_at(0, 0).unwrap());
        assert_eq!(engine.items().len(), 1);
        assert_eq!(engine.pending_kind(), Some("clock"));

        assert!(!engine.cell_blocked_for_pending(0, 1));
        assert!(engine.add_at(0, 1).unwrap());
        assert_no_overlap(&engine.items());
    }

    #[test]
    fn add_with_unknown_pending_kind_is_a_noop() {
        let mut engine = engine();
        engine.begin_add("weather");
        assert!(engine.cell_blocked_for_pending(0, 0));
        assert!(!engine.add_at(0, 0).unwrap());
        assert!(engine.items().is_empty());
    }

    #[test]
    fn ids_are_fresh_and_monotonic() {
        let a = Item::new("clock", 5, 0, 0, Size::new(2, 1));
        let b = Item::new("notes", 9, 0, 2, Size::new(1, 1));
        let mut engine = engine_with(&[a, b], AutoConfirm(true));

        engine.begin_add("notes");
        assert!(engine.add_at(4, 4).unwrap());
        engine.begin_add("notes");
        assert!(engine.add_at(6, 6).unwrap());

        let ids: Vec<_> = engine.items().iter().map(|item| item.id).collect();
        assert_eq!(ids, vec![5, 9, 10, 11]);
    }

    #[test]
    fn resize_goes_through_the_same_gate() {
        let a = Item::new("clock", 1, 0, 0, Size::new(2, 1));
        let mut engine = engine_with(std::slice::from_ref(&a), AutoConfirm(true));

        let grown = Item::new("clock", 1, 0, 0, Size::new(2, 2));
        assert!(engine.update_item(&grown).unwrap());
        assert_eq!(engine.items()[0].span(), Size::new(2, 2));

        let illegal = Item::new("clock", 1, 0, 0, Size::new(3, 3));
        assert!(!engine.update_item(&illegal).unwrap());
        assert_eq!(engine.items()[0].span(), Size::new(2, 2));
    }

    #[test]
    fn resize_into_neighbor_is_rejected() {
        let a = Item::new("clock", 1, 0, 0, Size::new(2, 1));
        let b = Item::new("notes", 2, 0, 1, Size::new(1, 1));
        let mut engine = engine_with(&[a, b], AutoConfirm(true));

        let grown = Item::new("clock", 1, 0, 0, Size::new(2, 2));
        assert!(!engine.update_item(&grown).unwrap());
        assert_eq!(engine.items()[0].span(), Size::new(2, 1));
        assert_no_overlap(&engine.items());
    }

    #[test]
    fn unknown_kinds_occupy_but_do_not_render() {
        let ghost = Item::new("weather", 1, 0, 0, Size::new(2, 2));
        let mut engine = engine_with(std::slice::from_ref(&ghost), AutoConfirm(true));

        assert!(engine.renderable_items().is_empty());
        assert_eq!(engine.items().len(), 1);

        // The ghost still blocks placement.
        engine.begin_add("notes");
        assert!(engine.cell_blocked_for_pending(1, 1));
        assert!(!engine.add_at(1, 1).unwrap());
    }

    #[test]
    fn mode_machine_transitions() {
        let mut engine = engine();
        assert_eq!(engine.mode(), &Mode::Idle);
        assert!(!engine.grid_visible());

        engine.toggle_edit();
        assert_eq!(engine.mode(), &Mode::Editing);
        assert!(engine.grid_visible());
        assert!(engine.pending_kind().is_none());

        engine.begin_add("clock");
        assert_eq!(engine.pending_kind(), Some("clock"));
        assert!(engine.grid_visible());

        // Toggling from add mode lands in editing, never both.
        engine.toggle_edit();
        assert_eq!(engine.mode(), &Mode::Editing);
        engine.toggle_edit();
        assert_eq!(engine.mode(), &Mode::Idle);
        assert!(!engine.grid_visible());
    }

    #[test]
    fn delete_of_unknown_id_is_a_noop() {
        let a = Item::new("clock", 1, 0, 0, Size::new(2, 1));
        let mut engine = engine_with(std::slice::from_ref(&a), AutoConfirm(true));
        assert!(!engine.delete(99).unwrap());
        assert_eq!(engine.items().len(), 1);
    }

    #[test]
    fn invariant_holds_across_an_interaction_burst() {
        let mut engine = engine();
        for row in 0..4 {
            engine.begin_add("clock");
            engine.add_at(0, row).unwrap();
        }
        let items = engine.items();
        assert_eq!(items.len(), 4);
        assert_no_overlap(&items);

        // Shuffle a few moves, legal or not, and re-check.
        for item in engine.items() {
            engine.try_claim(&item, item.x + 1, item.y, false).unwrap();
            engine.try_claim(&item, 0, 0, false).unwrap();
        }
        assert_no_overlap(&engine.items());
    }
}
