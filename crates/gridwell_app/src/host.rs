//! Host tick loop
//!
//! One [`Host`] owns the shared [`HostState`], every configured plugin and
//! the remote listener. Each tick:
//!
//! 1. begins the frame and lets every plugin pick up a waiting remote
//!    connection,
//! 2. renders the base plugin, which reaches the others by sub-rendering,
//! 3. ends the frame (usage errors, storage commit) and flushes paint to the
//!    backend.

use std::net::SocketAddr;

use gridwell_bridge::{
    AssetDir, CallError, CallResult, HostContext, HostState, LogLevel, SubRender, Translations,
};
use gridwell_core::Size;
use gridwell_layout::{InputEvent, LayoutMemory};
use gridwell_paint::PaintBackend;
use gridwell_plugin::{
    ConnectionRegistry, Listener, ListenerConfig, ListenerHandle, ModuleRegistry, PluginInstance,
};
use indexmap::IndexMap;

use crate::error::{HostError, Result};
use crate::persist::DataDir;
use crate::settings::{Settings, STATUS_PLUGIN};
use crate::status::StatusModule;

// ============================================================================
// Plugin set
// ============================================================================

/// Every plugin instance, by name.
///
/// An instance is taken out of its slot while one of its exports runs. A
/// plugin asking to sub-render something that is already running (itself or
/// an ancestor) finds the slot empty and is refused.
#[derive(Debug, Default)]
pub struct PluginSet {
    slots: IndexMap<String, Option<PluginInstance>>,
}

impl PluginSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, instance: PluginInstance) {
        self.slots.insert(instance.name().to_owned(), Some(instance));
    }

    pub fn names(&self) -> Vec<String> {
        self.slots.keys().cloned().collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.slots.contains_key(name)
    }

    /// `None` while the plugin is running.
    pub fn get(&self, name: &str) -> Option<&PluginInstance> {
        self.slots.get(name).and_then(Option::as_ref)
    }

    /// Run `f` against `name` with a context that can sub-render the rest
    /// of the set.
    pub fn with_instance<R, F>(&mut self, state: &mut HostState, name: &str, f: F) -> CallResult<R>
    where
        F: FnOnce(&mut PluginInstance, &mut HostContext<'_>) -> CallResult<R>,
    {
        let mut instance = match self.slots.get_mut(name) {
            Some(slot) => slot
                .take()
                .ok_or_else(|| CallError::Reentrant(name.to_owned()))?,
            None => return Err(CallError::NoModule),
        };
        let result = {
            let mut ctx = HostContext::new(state, name, &mut *self);
            f(&mut instance, &mut ctx)
        };
        if let Some(slot) = self.slots.get_mut(name) {
            *slot = Some(instance);
        }
        result
    }

    /// True when any instance fell back from a lost remote since last asked.
    pub fn take_fell_back(&mut self) -> bool {
        self.slots
            .values_mut()
            .flatten()
            .fold(false, |any, p| p.take_fell_back() || any)
    }
}

impl SubRender for PluginSet {
    fn sub_render(&mut self, state: &mut HostState, caller: &str, plugin: &str) -> bool {
        match self.with_instance(state, plugin, |p, ctx| p.render(ctx)) {
            Ok(_) => true,
            // Remote-only plugin with nothing attached yet
            Err(CallError::NoModule) => false,
            Err(e) => {
                state.log.push(
                    caller,
                    LogLevel::Warn,
                    format!("sub-render of '{plugin}' failed: {e}"),
                );
                false
            }
        }
    }
}

// ============================================================================
// Host
// ============================================================================

/// Module registry with the built-in plugins for `settings`.
pub fn builtin_modules(settings: &Settings) -> ModuleRegistry {
    let mut modules = ModuleRegistry::new();
    let plugins: Vec<String> = settings
        .plugin_names()
        .into_iter()
        .filter(|name| name != STATUS_PLUGIN)
        .collect();
    let theme = settings.theme.clone();
    modules.register(STATUS_PLUGIN, move || {
        Box::new(StatusModule::new(plugins.clone(), &theme))
    });
    modules
}

pub struct Host {
    settings: Settings,
    data: DataDir,
    state: HostState,
    plugins: PluginSet,
    connections: ConnectionRegistry,
    listener: Option<ListenerHandle>,
    ticks: u64,
}

impl Host {
    /// Load persisted state, instantiate every configured plugin and open it.
    ///
    /// Fails when the base plugin has no registered module, since nothing
    /// could be displayed.
    pub fn new(settings: Settings, data: DataDir, modules: &ModuleRegistry) -> Result<Self> {
        if !modules.contains(&settings.base_plugin) {
            return Err(HostError::MissingBasePlugin(settings.base_plugin.clone()));
        }

        let mut state = HostState::new(settings.window_size(), settings.cell_px)
            .with_coercion(settings.coercion)
            .with_log_capacity(settings.log_capacity)
            .with_translations(or_default(
                data.load_translations(&settings.locale),
                "translations",
                || Translations::new(&settings.locale),
            ))
            .with_assets(AssetDir::new(data.assets_dir()))
            .with_memory(or_default(data.load_layout(), "layout", LayoutMemory::new));

        let mut plugins = PluginSet::new();
        for name in settings.plugin_names() {
            let local = modules.load(&name);
            if local.is_none() {
                tracing::info!(plugin = %name, "No module registered, waiting for a remote");
            }
            plugins.insert(PluginInstance::new(&name, local));
        }

        for name in plugins.names() {
            let saved = or_default(data.load_plugin_state(&name), "plugin state", Vec::new);
            match plugins.with_instance(&mut state, &name, |p, ctx| p.open(ctx, saved)) {
                Ok(_) | Err(CallError::NoModule) => {}
                Err(e) => state
                    .log
                    .push(&name, LogLevel::Warn, format!("open failed: {e}")),
            }
        }

        let connections = ConnectionRegistry::new();
        let listener = match &settings.listen {
            Some(addr) => Some(
                Listener::new(ListenerConfig::new(addr.clone()))
                    .with_registry(connections.clone())
                    .start()
                    .map_err(|source| HostError::Listen {
                        addr: addr.clone(),
                        source,
                    })?,
            ),
            None => None,
        };

        tracing::info!(
            base = %settings.base_plugin,
            plugins = plugins.names().len(),
            "Host ready"
        );

        Ok(Self {
            settings,
            data,
            state,
            plugins,
            connections,
            listener,
            ticks: 0,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn data(&self) -> &DataDir {
        &self.data
    }

    pub fn state(&self) -> &HostState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut HostState {
        &mut self.state
    }

    pub fn plugins(&self) -> &PluginSet {
        &self.plugins
    }

    /// Where pending remote connections are parked.
    pub fn connections(&self) -> &ConnectionRegistry {
        &self.connections
    }

    pub fn listener_addr(&self) -> Option<SocketAddr> {
        self.listener.as_ref().map(ListenerHandle::local_addr)
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn push_input(&mut self, event: InputEvent) {
        self.state.push_input(event);
    }

    pub fn resize(&mut self, window: Size) {
        self.state.resize(window);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Tick
    // ─────────────────────────────────────────────────────────────────────────

    pub fn tick(&mut self, backend: &mut dyn PaintBackend) {
        self.state.begin_tick();

        let connections = &self.connections;
        for name in self.plugins.names() {
            let _ = self
                .plugins
                .with_instance(&mut self.state, &name, |p, ctx| Ok(p.poll(connections, ctx)));
        }

        let base = self.settings.base_plugin.clone();
        if let Err(e) = self
            .plugins
            .with_instance(&mut self.state, &base, |p, ctx| p.render(ctx))
        {
            self.state
                .log
                .push(&base, LogLevel::Error, format!("render failed: {e}"));
        }

        self.state.end_tick(&base);

        if self.plugins.take_fell_back() {
            self.reload_translations();
        }

        self.state.flush(backend);
        self.ticks += 1;
    }

    fn reload_translations(&mut self) {
        match self.data.load_translations(&self.settings.locale) {
            Ok(table) => {
                tracing::debug!(locale = table.locale(), entries = table.len(), "Translations reloaded");
                self.state.translations = table;
            }
            Err(e) => tracing::warn!("Failed to reload translations: {}", e),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Persistence
    // ─────────────────────────────────────────────────────────────────────────

    /// Ask every plugin for its state and write it, along with layout memory.
    pub fn save(&mut self) -> Result<()> {
        let mut first_error = None;
        let mut note = |result: Result<()>| {
            if let Err(e) = result {
                tracing::warn!("Failed to save: {}", e);
                first_error.get_or_insert(e);
            }
        };

        for name in self.plugins.names() {
            match self
                .plugins
                .with_instance(&mut self.state, &name, |p, ctx| p.save(ctx))
            {
                Ok(Some(bytes)) => note(self.data.save_plugin_state(&name, &bytes)),
                Ok(None) => tracing::debug!(plugin = %name, "Plugin did not save"),
                Err(CallError::NoModule) => {}
                Err(e) => self
                    .state
                    .log
                    .push(&name, LogLevel::Warn, format!("save failed: {e}")),
            }
        }
        self.state.flush_memory();
        note(self.data.save_layout(&self.state.memory));

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Save everything and stop the listener.
    pub fn shutdown(mut self) -> Result<()> {
        let result = self.save();
        if let Some(listener) = self.listener.take() {
            listener.join();
        }
        tracing::info!(ticks = self.ticks, "Host stopped");
        result
    }
}

/// Persisted data that cannot be read is logged and started fresh.
fn or_default<T>(result: Result<T>, what: &str, fallback: impl FnOnce() -> T) -> T {
    result.unwrap_or_else(|e| {
        tracing::warn!("Starting with empty {}: {}", what, e);
        fallback()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridwell_bridge::exports;
    use gridwell_bridge::{ExportSignature, HostCalls, HostCallsExt, PluginModule};
    use gridwell_core::{Rect, TypedArg};
    use gridwell_paint::{PaintCommand, RecordingBackend};

    /// Paints its name; optionally tries to sub-render another plugin.
    struct Label {
        name: &'static str,
        nested: Option<&'static str>,
    }

    impl PluginModule for Label {
        fn identity(&self) -> &str {
            self.name
        }

        fn exports(&self) -> Vec<ExportSignature> {
            exports::standard()
        }

        fn call(
            &mut self,
            host: &mut dyn HostCalls,
            function: &str,
            _args: Vec<TypedArg>,
        ) -> CallResult<Option<TypedArg>> {
            if function != exports::RENDER {
                return Ok(None);
            }
            host.paint_text(Rect::new(0.0, 0.0, 5.0, 1.0), self.name, 0xffffffff, 12.0, 0)?;
            if let Some(other) = self.nested {
                let ok = host.sub_render(other)?;
                host.log(1, &format!("nested {other}: {ok}"))?;
            }
            Ok(Some(TypedArg::Int64(0)))
        }
    }

    fn settings(plugins: &[&str]) -> Settings {
        Settings {
            plugins: plugins.iter().map(|s| s.to_string()).collect(),
            ..Settings::default()
        }
    }

    fn texts(backend: &RecordingBackend) -> Vec<String> {
        backend
            .last_frame()
            .map(|f| {
                f.layers
                    .iter()
                    .flat_map(|l| l.commands.iter())
                    .filter_map(|c| match c {
                        PaintCommand::Text { text, .. } => Some(text.clone()),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    #[test]
    fn test_missing_base_plugin_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let s = Settings {
            base_plugin: "shell".into(),
            ..Settings::default()
        };
        let err = Host::new(s, DataDir::new(dir.path()), &ModuleRegistry::new());
        assert!(matches!(err, Err(HostError::MissingBasePlugin(name)) if name == "shell"));
    }

    #[test]
    fn test_tick_renders_base_and_children() {
        let dir = tempfile::tempdir().unwrap();
        let s = settings(&["clock", "remote_only"]);
        let mut modules = builtin_modules(&s);
        modules.register("clock", || {
            Box::new(Label {
                name: "clock",
                nested: None,
            })
        });

        let mut host = Host::new(s, DataDir::new(dir.path()), &modules).unwrap();
        let mut backend = RecordingBackend::new(4);
        host.tick(&mut backend);

        assert_eq!(host.ticks(), 1);
        assert_eq!(
            texts(&backend),
            vec!["status.title", "clock", "remote_only: status.offline"]
        );
        assert!(host.state().log.is_empty(), "{:?}", host.state().log.last());
        assert!(host.listener_addr().is_none());
    }

    #[test]
    fn test_sub_render_refuses_recursion() {
        let dir = tempfile::tempdir().unwrap();
        let s = settings(&["echo"]);
        let mut modules = builtin_modules(&s);
        modules.register("echo", || {
            Box::new(Label {
                name: "echo",
                nested: Some("echo"),
            })
        });

        let mut host = Host::new(s, DataDir::new(dir.path()), &modules).unwrap();
        host.tick(&mut RecordingBackend::new(1));

        let entries: Vec<_> = host.state().log.entries().collect();
        assert!(entries
            .iter()
            .any(|e| e.level == LogLevel::Warn && e.message.contains("already rendering")));
        assert!(entries.iter().any(|e| e.message == "nested echo: false"));
        // The plugin itself is back in its slot.
        assert!(host.plugins().get("echo").is_some());
    }

    #[test]
    fn test_state_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let data = DataDir::new(dir.path());
        let s = settings(&[]);
        let modules = builtin_modules(&s);

        let mut host = Host::new(s.clone(), data.clone(), &modules).unwrap();
        let mut backend = RecordingBackend::new(1);
        host.tick(&mut backend);
        host.tick(&mut backend);
        host.shutdown().unwrap();

        assert!(data.layout_path().exists());
        assert_eq!(data.load_plugin_state(STATUS_PLUGIN).unwrap(), br#"{"renders":2}"#);

        let mut host = Host::new(s, data.clone(), &modules).unwrap();
        host.tick(&mut backend);
        host.shutdown().unwrap();
        assert_eq!(data.load_plugin_state(STATUS_PLUGIN).unwrap(), br#"{"renders":3}"#);
    }

    #[test]
    fn test_damaged_files_do_not_stop_startup() {
        let dir = tempfile::tempdir().unwrap();
        let data = DataDir::new(dir.path());
        std::fs::write(data.layout_path(), "{").unwrap();
        let state_path = data.plugin_state_path(STATUS_PLUGIN);
        std::fs::create_dir_all(state_path.parent().unwrap()).unwrap();
        std::fs::write(&state_path, "not json").unwrap();
        let i18n = data.translations_path("en");
        std::fs::create_dir_all(i18n.parent().unwrap()).unwrap();
        std::fs::write(&i18n, "[1, 2").unwrap();

        let s = settings(&[]);
        let mut host = Host::new(s.clone(), data.clone(), &builtin_modules(&s)).unwrap();
        let mut backend = RecordingBackend::new(1);
        host.tick(&mut backend);
        assert_eq!(texts(&backend), vec!["status.title"]);
        host.shutdown().unwrap();

        assert!(data.load_layout().is_ok());
        assert_eq!(data.load_plugin_state(STATUS_PLUGIN).unwrap(), br#"{"renders":1}"#);
    }

    #[test]
    fn test_save_failure_still_writes_the_rest() {
        let dir = tempfile::tempdir().unwrap();
        let data = DataDir::new(dir.path());
        // A plain file where the plugin state directory belongs.
        std::fs::write(dir.path().join("plugins"), "").unwrap();

        let s = settings(&[]);
        let mut host = Host::new(s.clone(), data.clone(), &builtin_modules(&s)).unwrap();
        host.tick(&mut RecordingBackend::new(1));
        assert!(matches!(host.save(), Err(HostError::Io { .. })));
        assert!(data.layout_path().exists());
        host.shutdown().unwrap_err();
    }

    #[test]
    fn test_listener_binds_when_configured() {
        let dir = tempfile::tempdir().unwrap();
        let s = Settings {
            listen: Some("127.0.0.1:0".into()),
            ..Settings::default()
        };
        let host = Host::new(s.clone(), DataDir::new(dir.path()), &builtin_modules(&s)).unwrap();
        let addr = host.listener_addr().unwrap();
        assert_ne!(addr.port(), 0);
        assert!(host.connections().is_empty());
        host.shutdown().unwrap();
    }
}
