//! gridwell host
//!
//! Ties the bridge and plugin backends into a running host: reads the
//! settings document and persisted state from a data directory, owns every
//! plugin instance, and drives the per-tick frame.
//!
//! ```no_run
//! use gridwell_app::{builtin_modules, DataDir, Host, Settings};
//! use gridwell_paint::RecordingBackend;
//!
//! let data = DataDir::new("./data");
//! let settings = Settings::load(&data.settings_path())?;
//! let modules = builtin_modules(&settings);
//! let mut host = Host::new(settings, data, &modules)?;
//!
//! let mut backend = RecordingBackend::new(1);
//! host.tick(&mut backend);
//! host.shutdown()?;
//! # Ok::<(), gridwell_app::HostError>(())
//! ```

pub mod error;
pub mod host;
pub mod logging;
pub mod persist;
pub mod settings;
pub mod status;

pub use error::{HostError, Result};
pub use host::{builtin_modules, Host, PluginSet};
pub use logging::init_logging;
pub use persist::{DataDir, StoredState, STATE_VERSION};
pub use settings::{Settings, WindowSettings, STATUS_PLUGIN};
pub use status::StatusModule;
