//! Event-driven host for the placement engine. One event is delivered at a
//! time, so the single-writer discipline over the stored item list holds by
//! construction; there is no background work and nothing to cancel beyond
//! discarding mode state.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crossterm::event::{
    self, Event as CrosstermEvent, KeyCode, KeyEventKind, MouseButton, MouseEventKind,
};
use serde_json::json;

use crate::engine::GridEngine;
use crate::error::Result;
use crate::geometry::Size;
use crate::item::{ItemId, WidgetKind};
use crate::logging::{LogLevel, Logger, event_with_fields, json_kv};
use crate::metrics::EngineMetrics;
use crate::store::SettingsStore;
use crate::viewport::{Viewport, cell_under, grid_extent};

/// Configuration knobs for the host loop.
#[derive(Clone)]
pub struct RuntimeConfig {
    /// Interval between synthetic tick events.
    pub tick_interval: Duration,
    /// Optional structured logger used by the host.
    pub logger: Option<Logger>,
    /// Metrics accumulator used for periodic snapshots.
    pub metrics: Option<Arc<Mutex<EngineMetrics>>>,
    /// Interval between metrics snapshot emissions. Zero disables snapshots.
    pub metrics_interval: Duration,
    /// Target field used when emitting metrics snapshots.
    pub metrics_target: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(200),
            logger: None,
            metrics: None,
            metrics_interval: Duration::from_secs(5),
            metrics_target: "dashgrid::runtime.metrics".to_string(),
        }
    }
}

impl RuntimeConfig {
    /// Enable metrics collection if it has not already been configured.
    pub fn enable_metrics(&mut self) {
        if self.metrics.is_none() {
            self.metrics = Some(Arc::new(Mutex::new(EngineMetrics::new())));
        }
    }

    /// Access the shared metrics handle if metrics are enabled.
    pub fn metrics_handle(&self) -> Option<Arc<Mutex<EngineMetrics>>> {
        self.metrics.as_ref().map(Arc::clone)
    }
}

/// High-level interaction events delivered to the engine.
#[derive(Debug, Clone)]
pub enum GridEvent {
    /// Click on the grid surface; commits an add while a kind is pending.
    Pointer { col: u16, row: u16 },
    /// Speculative move of an item during a drag; dry-run only.
    DragPreview { id: ItemId, col: u16, row: u16 },
    /// Drop of a dragged item; the wet claim.
    Drop { id: ItemId, col: u16, row: u16 },
    BeginAdd(WidgetKind),
    ToggleEdit,
    Delete(ItemId),
    Resize(Viewport),
    Tick { elapsed: Duration },
}

/// Last dry-run verdict, retained for the presentation layer to poll while
/// a drag is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreviewState {
    pub id: ItemId,
    pub col: u16,
    pub row: u16,
    pub valid: bool,
}

/// Owns the engine and the viewport, translating native terminal events
/// into grid operations and recording every dispatch.
pub struct GridRuntime<S> {
    engine: GridEngine<S>,
    viewport: Viewport,
    preview: Option<PreviewState>,
    config: RuntimeConfig,
    should_exit: bool,
    start_instant: Option<Instant>,
    last_metrics_emit: Option<Instant>,
}

impl<S: SettingsStore> GridRuntime<S> {
    pub fn new(engine: GridEngine<S>, viewport: Viewport) -> Self {
        Self {
            engine,
            viewport,
            preview: None,
            config: RuntimeConfig::default(),
            should_exit: false,
            start_instant: None,
            last_metrics_emit: None,
        }
    }

    pub fn config_mut(&mut self) -> &mut RuntimeConfig {
        &mut self.config
    }

    pub fn engine(&self) -> &GridEngine<S> {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut GridEngine<S> {
        &mut self.engine
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn preview(&self) -> Option<PreviewState> {
        self.preview
    }

    /// How much grid surface the presentation layer should offer right now.
    pub fn extent(&self) -> Size {
        grid_extent(
            &self.engine.items(),
            self.viewport,
            self.engine.grid_visible(),
        )
    }

    /// Signal the loop to stop at the end of the current frame.
    pub fn request_exit(&mut self) {
        self.should_exit = true;
    }

    /// Apply one interaction event. Every dispatch is logged and counted.
    pub fn dispatch(&mut self, event: GridEvent) -> Result<()> {
        self.record_event_metric();
        match event {
            GridEvent::Pointer { col, row } => self.handle_pointer(col, row)?,
            GridEvent::DragPreview { id, col, row } => self.handle_preview(id, col, row)?,
            GridEvent::Drop { id, col, row } => self.handle_drop(id, col, row)?,
            GridEvent::BeginAdd(kind) => {
                self.engine.begin_add(kind.clone());
                self.log_runtime_event(
                    LogLevel::Debug,
                    "add_mode_entered",
                    [json_kv("kind", json!(kind))],
                );
            }
            GridEvent::ToggleEdit => {
                self.engine.toggle_edit();
                self.log_runtime_event(
                    LogLevel::Debug,
                    "edit_toggled",
                    [
                        json_kv(
                            "editing",
                            json!(matches!(self.engine.mode(), crate::engine::Mode::Editing)),
                        ),
                        json_kv("grid_visible", json!(self.engine.grid_visible())),
                    ],
                );
            }
            GridEvent::Delete(id) => {
                let removed = self.engine.delete(id)?;
                if removed {
                    self.record_delete_metric();
                }
                self.log_runtime_event(
                    LogLevel::Info,
                    "delete_requested",
                    [json_kv("id", json!(id)), json_kv("removed", json!(removed))],
                );
            }
            GridEvent::Resize(viewport) => self.handle_resize(viewport),
            GridEvent::Tick { .. } => {}
        }
        self.maybe_emit_metrics();
        Ok(())
    }

    fn handle_pointer(&mut self, col: u16, row: u16) -> Result<()> {
        if self.engine.pending_kind().is_none() {
            return Ok(());
        }
        let added = self.engine.add_at(col, row)?;
        if added {
            self.record_add_metric();
            self.preview = None;
        }
        self.log_runtime_event(
            LogLevel::Debug,
            "add_attempted",
            [
                json_kv("col", json!(col)),
                json_kv("row", json!(row)),
                json_kv("added", json!(added)),
            ],
        );
        Ok(())
    }

    fn handle_preview(&mut self, id: ItemId, col: u16, row: u16) -> Result<()> {
        let valid = match self.engine.item(id) {
            Some(item) => self.engine.try_claim(&item, col, row, true)?,
            None => false,
        };
        self.preview = Some(PreviewState {
            id,
            col,
            row,
            valid,
        });
        self.record_dry_run_metric();
        self.log_runtime_event(
            LogLevel::Debug,
            "claim_previewed",
            [
                json_kv("id", json!(id)),
                json_kv("col", json!(col)),
                json_kv("row", json!(row)),
                json_kv("valid", json!(valid)),
            ],
        );
        Ok(())
    }

    fn handle_drop(&mut self, id: ItemId, col: u16, row: u16) -> Result<()> {
        self.preview = None;
        let Some(item) = self.engine.item(id) else {
            self.log_runtime_event(
                LogLevel::Debug,
                "claim_ignored",
                [json_kv("id", json!(id))],
            );
            return Ok(());
        };
        let committed = self.engine.try_claim(&item, col, row, false)?;
        let reason = if committed {
            None
        } else {
            self.engine.validate_claim(&item, col, row)
        };
        self.record_claim_metric(committed);
        self.log_runtime_event(
            LogLevel::Info,
            "claim_dropped",
            [
                json_kv("id", json!(id)),
                json_kv("col", json!(col)),
                json_kv("row", json!(row)),
                json_kv("committed", json!(committed)),
                json_kv(
                    "reason",
                    json!(reason.map(|reason| reason.as_str())),
                ),
            ],
        );
        Ok(())
    }

    fn handle_resize(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        let extent = self.extent();
        self.log_runtime_event(
            LogLevel::Info,
            "resized",
            [
                json_kv("cols", json!(viewport.cols)),
                json_kv("rows", json!(viewport.rows)),
                json_kv("extent_cols", json!(extent.width)),
                json_kv("extent_rows", json!(extent.height)),
            ],
        );
    }

    /// Poll the terminal backend until exit, translating native events.
    pub fn run(&mut self) -> Result<()> {
        self.bootstrap();
        let mut last_tick = Instant::now();

        while !self.should_exit {
            let timeout = self
                .config
                .tick_interval
                .checked_sub(last_tick.elapsed())
                .unwrap_or_else(|| Duration::from_millis(0));

            if event::poll(timeout)? {
                let native = event::read()?;
                if let Some(mapped) = self.map_event(native) {
                    self.dispatch(mapped)?;
                }
                if self.should_exit {
                    break;
                }
            }

            if last_tick.elapsed() >= self.config.tick_interval {
                let now = Instant::now();
                let elapsed = now.duration_since(last_tick);
                last_tick = now;
                self.dispatch(GridEvent::Tick { elapsed })?;
            }

            self.maybe_emit_metrics();
        }

        self.finalize();
        Ok(())
    }

    /// Drive the same dispatch path from a prepared script. Tests and
    /// benches use this instead of a live terminal.
    pub fn run_scripted<I>(&mut self, events: I) -> Result<()>
    where
        I: IntoIterator<Item = GridEvent>,
    {
        self.bootstrap();
        for event in events {
            self.dispatch(event)?;
            if self.should_exit {
                break;
            }
        }
        self.finalize();
        Ok(())
    }

    fn map_event(&mut self, event: CrosstermEvent) -> Option<GridEvent> {
        match event {
            CrosstermEvent::Key(key) if key.kind == KeyEventKind::Press => match key.code {
                KeyCode::Esc => {
                    self.should_exit = true;
                    None
                }
                KeyCode::Char('e') => Some(GridEvent::ToggleEdit),
                KeyCode::Char(ch) if ch.is_ascii_digit() => {
                    self.kind_for_digit(ch).map(GridEvent::BeginAdd)
                }
                _ => None,
            },
            CrosstermEvent::Mouse(mouse) => match mouse.kind {
                MouseEventKind::Down(MouseButton::Left) => {
                    let (col, row) = cell_under(mouse.column, mouse.row);
                    Some(GridEvent::Pointer { col, row })
                }
                _ => None,
            },
            CrosstermEvent::Resize(width, height) => Some(GridEvent::Resize(
                Viewport::from_terminal(Size::new(width, height)),
            )),
            _ => None,
        }
    }

    /// Number keys pick a kind by its position in the sorted registry.
    fn kind_for_digit(&self, ch: char) -> Option<WidgetKind> {
        let index = ch.to_digit(10)? as usize;
        let kinds = self.engine.registry().kinds();
        if index == 0 || index > kinds.len() {
            return None;
        }
        Some(kinds[index - 1].to_string())
    }

    fn bootstrap(&mut self) {
        self.should_exit = false;
        self.ensure_metrics_initialized();
        let now = Instant::now();
        self.start_instant = Some(now);
        self.last_metrics_emit = Some(now);
        self.log_runtime_event(
            LogLevel::Info,
            "runtime_started",
            [
                json_kv("items", json!(self.engine.items().len())),
                json_kv("viewport_cols", json!(self.viewport.cols)),
                json_kv("viewport_rows", json!(self.viewport.rows)),
            ],
        );
    }

    fn finalize(&mut self) {
        let uptime_ms = self
            .start_instant
            .map(|start| start.elapsed().as_millis())
            .unwrap_or(0);
        self.log_runtime_event(
            LogLevel::Info,
            "runtime_stopped",
            [json_kv("uptime_ms", json!(uptime_ms as u64))],
        );
    }

    fn ensure_metrics_initialized(&mut self) {
        if self.config.metrics.is_none() && self.config.metrics_interval > Duration::from_millis(0)
        {
            self.config.metrics = Some(Arc::new(Mutex::new(EngineMetrics::new())));
        }
    }

    fn log_runtime_event<I>(&self, level: LogLevel, message: &str, fields: I)
    where
        I: IntoIterator<Item = (String, serde_json::Value)>,
    {
        if let Some(logger) = self.config.logger.as_ref() {
            let event = event_with_fields(level, "dashgrid::runtime", message, fields);
            let _ = logger.log_event(event);
        }
    }

    fn record_event_metric(&mut self) {
        if let Some(metrics) = self.config.metrics.as_ref() {
            if let Ok(mut guard) = metrics.lock() {
                guard.record_event();
            }
        }
    }

    fn record_dry_run_metric(&mut self) {
        if let Some(metrics) = self.config.metrics.as_ref() {
            if let Ok(mut guard) = metrics.lock() {
                guard.record_dry_run();
            }
        }
    }

    fn record_claim_metric(&mut self, committed: bool) {
        if let Some(metrics) = self.config.metrics.as_ref() {
            if let Ok(mut guard) = metrics.lock() {
                guard.record_claim(committed);
            }
        }
    }

    fn record_add_metric(&mut self) {
        if let Some(metrics) = self.config.metrics.as_ref() {
            if let Ok(mut guard) = metrics.lock() {
                guard.record_add();
            }
        }
    }

    fn record_delete_metric(&mut self) {
        if let Some(metrics) = self.config.metrics.as_ref() {
            if let Ok(mut guard) = metrics.lock() {
                guard.record_delete();
            }
        }
    }

    fn maybe_emit_metrics(&mut self) {
        if self.config.metrics.is_none() {
            return;
        }

        if self.config.metrics_interval == Duration::from_millis(0) {
            return;
        }

        let now = Instant::now();
        match self.last_metrics_emit {
            Some(last) if now.duration_since(last) < self.config.metrics_interval => {
                return;
            }
            _ => {
                self.last_metrics_emit = Some(now);
            }
        }

        let uptime = self
            .start_instant
            .map(|start| now.duration_since(start))
            .unwrap_or_default();

        if let (Some(logger), Some(metrics)) =
            (self.config.logger.as_ref(), self.config.metrics.as_ref())
        {
            if let Ok(guard) = metrics.lock() {
                let target = self.config.metrics_target.as_str();
                let event = guard.snapshot(uptime).to_log_event(target);
                let _ = logger.log_event(event);
            }
        }
    }
}
