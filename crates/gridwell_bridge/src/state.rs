//! Host state
//!
//! Everything a plugin call can touch, owned in one place and passed by
//! `&mut` into dispatch. Nothing in the bridge is global.

use std::time::Instant;

use gridwell_core::{Coercion, Rect, Size};
use gridwell_layout::{DivId, FrameInput, InputEvent, LayoutMemory, LevelStack};
use gridwell_paint::{MonospaceMetrics, PaintBackend, TextMetrics};

use crate::assets::AssetDir;
use crate::log::{LogLevel, PluginLog};
use crate::pending::PendingStack;
use crate::storage::{Storage, StorageEngine};
use crate::translate::Translations;

/// Name of the base level.
pub const BASE_LEVEL: &str = "main";

/// Payload picked up by a drag source.
#[derive(Clone, Debug, PartialEq)]
pub struct DragPayload {
    /// Plugin that started the drag.
    pub plugin: String,
    pub bytes: Vec<u8>,
}

/// Crop set by `PaintCrop`, valid while the same div stays current.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct CropOverride {
    pub level: usize,
    pub div: DivId,
    pub rect: Rect,
}

pub struct HostState {
    pub levels: LevelStack,
    pub memory: LayoutMemory,
    pub input: FrameInput,
    pub window: Size,
    pub cell_px: f32,
    pub coercion: Coercion,
    pub storage: Storage,
    pub metrics: Box<dyn TextMetrics>,
    pub translations: Translations,
    pub log: PluginLog,
    pub assets: AssetDir,
    pub drag: Option<DragPayload>,
    pub pending: PendingStack,
    pub(crate) crop: Option<CropOverride>,
    started: Instant,
}

impl Default for HostState {
    fn default() -> Self {
        Self::new(Size::new(800.0, 600.0), 20.0)
    }
}

impl HostState {
    pub fn new(window: Size, cell_px: f32) -> Self {
        Self {
            levels: LevelStack::new(BASE_LEVEL),
            memory: LayoutMemory::new(),
            input: FrameInput::new(),
            window,
            cell_px,
            coercion: Coercion::default(),
            storage: Storage::default(),
            metrics: Box::new(MonospaceMetrics::default()),
            translations: Translations::default(),
            log: PluginLog::default(),
            assets: AssetDir::none(),
            drag: None,
            pending: PendingStack::new(),
            crop: None,
            started: Instant::now(),
        }
    }

    pub fn with_coercion(mut self, coercion: Coercion) -> Self {
        self.coercion = coercion;
        self
    }

    pub fn with_storage(mut self, engine: Box<dyn StorageEngine>) -> Self {
        self.storage = Storage::new(engine);
        self
    }

    pub fn with_metrics(mut self, metrics: Box<dyn TextMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_translations(mut self, translations: Translations) -> Self {
        self.translations = translations;
        self
    }

    pub fn with_assets(mut self, assets: AssetDir) -> Self {
        self.assets = assets;
        self
    }

    pub fn with_memory(mut self, memory: LayoutMemory) -> Self {
        self.memory = memory;
        self
    }

    pub fn with_log_capacity(mut self, capacity: usize) -> Self {
        self.log = PluginLog::new(capacity);
        self
    }

    /// Seconds since the host started.
    pub fn elapsed(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }

    pub fn push_input(&mut self, event: InputEvent) {
        self.input.apply(event);
    }

    pub fn resize(&mut self, window: Size) {
        self.window = window;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Tick
    // ─────────────────────────────────────────────────────────────────────────

    pub fn begin_tick(&mut self) {
        self.crop = None;
        self.levels
            .begin_tick(self.window, self.cell_px, &mut self.input, &mut self.memory);
    }

    /// Close the frame: report layout misuse against `owner`, sweep, and
    /// commit the tick's storage transaction.
    pub fn end_tick(&mut self, owner: &str) {
        for e in self.levels.end_tick(&mut self.memory) {
            self.log.push(owner, LogLevel::Warn, e.to_string());
        }
        if let Err(e) = self.storage.commit_tick() {
            self.log.push(owner, LogLevel::Error, format!("commit failed: {e}"));
        }
        if !self.input.down {
            self.drag = None;
        }
        self.crop = None;
        self.input.end_tick();
    }

    pub fn flush(&mut self, backend: &mut dyn PaintBackend) {
        self.levels.flush(backend);
    }

    /// Write every live node's scroll and resize state into memory.
    pub fn flush_memory(&mut self) {
        self.levels.flush_memory(&mut self.memory);
    }

    pub(crate) fn current_level_index(&self) -> usize {
        let current = &self.levels.current().name;
        self.levels
            .levels()
            .iter()
            .position(|l| &l.name == current)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridwell_core::{GridRect, Point};
    use gridwell_paint::RecordingBackend;

    #[test]
    fn test_tick_reports_usage_errors_to_log() {
        let mut state = HostState::default();
        state.begin_tick();
        let memory = &state.memory;
        state
            .levels
            .current_mut()
            .div_start("open", GridRect::new(0, 0, 1, 1), memory);
        state.end_tick("demo");

        let entry = state.log.last().unwrap();
        assert_eq!(entry.plugin, "demo");
        assert_eq!(entry.level, LogLevel::Warn);
    }

    #[test]
    fn test_drag_cleared_when_released() {
        let mut state = HostState::default();
        state.push_input(InputEvent::PointerMove(Point::new(5.0, 5.0)));
        state.push_input(InputEvent::PointerDown);
        state.begin_tick();
        state.drag = Some(DragPayload {
            plugin: "a".into(),
            bytes: vec![1],
        });
        state.end_tick("a");
        assert!(state.drag.is_some());

        state.push_input(InputEvent::PointerUp);
        state.begin_tick();
        state.end_tick("a");
        assert!(state.drag.is_none());
    }

    #[test]
    fn test_flush_reaches_backend() {
        let mut state = HostState::new(Size::new(100.0, 50.0), 10.0);
        let mut backend = RecordingBackend::default();
        state.begin_tick();
        state.end_tick("a");
        state.flush(&mut backend);
        let frame = backend.last_frame().unwrap();
        assert_eq!(frame.window, Size::new(100.0, 50.0));
        assert_eq!(frame.layers.len(), 1);
    }
}
