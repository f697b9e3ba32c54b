//! Files under the data directory
//!
//! ```text
//! <data>/
//!   settings.json
//!   layout.json            scroll offsets and resize overrides
//!   plugins/<name>.json    one saved state per plugin
//!   i18n/<locale>.json     flat key -> text table
//!   assets/                read by plugins through ReadAsset
//! ```

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use gridwell_bridge::Translations;
use gridwell_layout::LayoutMemory;
use serde::{Deserialize, Serialize};

use crate::error::{HostError, Result};

/// Current `plugins/<name>.json` layout version.
pub const STATE_VERSION: u32 = 1;

/// A plugin's saved state as stored on disk.
///
/// States that parse as JSON are kept as JSON so the file stays readable.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum StoredState {
    Json(serde_json::Value),
    Bytes(Vec<u8>),
}

impl StoredState {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        if bytes.is_empty() {
            return StoredState::Bytes(Vec::new());
        }
        match serde_json::from_slice(bytes) {
            Ok(value) => StoredState::Json(value),
            Err(_) => StoredState::Bytes(bytes.to_vec()),
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            StoredState::Json(value) => value.to_string().into_bytes(),
            StoredState::Bytes(bytes) => bytes,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct StateFile {
    version: u32,
    state: StoredState,
}

#[derive(Clone, Debug)]
pub struct DataDir {
    root: PathBuf,
}

impl DataDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn settings_path(&self) -> PathBuf {
        self.root.join("settings.json")
    }

    pub fn layout_path(&self) -> PathBuf {
        self.root.join("layout.json")
    }

    pub fn assets_dir(&self) -> PathBuf {
        self.root.join("assets")
    }

    pub fn translations_path(&self, locale: &str) -> PathBuf {
        self.root.join("i18n").join(format!("{}.json", file_stem(locale)))
    }

    pub fn plugin_state_path(&self, plugin: &str) -> PathBuf {
        self.root.join("plugins").join(format!("{}.json", file_stem(plugin)))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Plugin state
    // ─────────────────────────────────────────────────────────────────────────

    /// Saved state for `plugin`; empty when nothing usable is stored.
    ///
    /// A file that does not parse is logged and treated as empty. Only read
    /// failures are errors.
    pub fn load_plugin_state(&self, plugin: &str) -> Result<Vec<u8>> {
        let path = self.plugin_state_path(plugin);
        let Some(content) = read_optional(&path)? else {
            return Ok(Vec::new());
        };
        let file: StateFile = match serde_json::from_str(&content) {
            Ok(file) => file,
            Err(e) => {
                tracing::warn!(plugin, "Ignoring unreadable saved state in {}: {}", path.display(), e);
                return Ok(Vec::new());
            }
        };
        if file.version != STATE_VERSION {
            tracing::warn!(
                plugin,
                version = file.version,
                "Ignoring saved state with unknown version"
            );
            return Ok(Vec::new());
        }
        Ok(file.state.into_bytes())
    }

    pub fn save_plugin_state(&self, plugin: &str, state: &[u8]) -> Result<()> {
        let file = StateFile {
            version: STATE_VERSION,
            state: StoredState::from_bytes(state),
        };
        write_json(&self.plugin_state_path(plugin), &file)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Layout memory and translations
    // ─────────────────────────────────────────────────────────────────────────

    /// Saved scroll offsets and resize overrides. A file that does not parse
    /// is logged and replaced by an empty memory.
    pub fn load_layout(&self) -> Result<LayoutMemory> {
        let path = self.layout_path();
        let Some(content) = read_optional(&path)? else {
            return Ok(LayoutMemory::new());
        };
        match serde_json::from_str(&content) {
            Ok(memory) => Ok(memory),
            Err(e) => {
                tracing::warn!("Ignoring unreadable layout in {}: {}", path.display(), e);
                Ok(LayoutMemory::new())
            }
        }
    }

    pub fn save_layout(&self, memory: &LayoutMemory) -> Result<()> {
        write_json(&self.layout_path(), memory)
    }

    /// Table for `locale`. A missing file gives an empty table, so every
    /// key translates to itself.
    pub fn load_translations(&self, locale: &str) -> Result<Translations> {
        let path = self.translations_path(locale);
        match read_optional(&path)? {
            Some(content) => {
                Translations::from_json_str(locale, &content).map_err(|e| HostError::json(&path, e))
            }
            None => Ok(Translations::new(locale)),
        }
    }
}

/// Keep names usable as a single file name.
fn file_stem(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect::<String>()
        .trim_start_matches('.')
        .to_string()
}

fn read_optional(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(HostError::io(path, e)),
    }
}

/// Write `value` to a temporary file next to `path`, then rename it over
/// `path`. A crash mid-write leaves the previous file in place.
pub(crate) fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir).map_err(|e| HostError::io(dir, e))?;
    let content = serde_json::to_string_pretty(value).map_err(|e| HostError::json(path, e))?;

    let mut file = tempfile::NamedTempFile::new_in(dir).map_err(|e| HostError::io(dir, e))?;
    file.write_all(content.as_bytes())
        .and_then(|()| file.as_file().sync_all())
        .map_err(|e| HostError::io(file.path(), e))?;
    file.persist(path).map_err(|e| HostError::io(path, e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_kinds() {
        assert_eq!(
            StoredState::from_bytes(br#"{"ticks":3}"#),
            StoredState::Json(serde_json::json!({"ticks": 3}))
        );
        assert_eq!(
            StoredState::from_bytes(&[0xff, 0x00]),
            StoredState::Bytes(vec![0xff, 0x00])
        );
    }

    #[test]
    fn test_plugin_state_file_format() {
        let dir = tempfile::tempdir().unwrap();
        let data = DataDir::new(dir.path());
        assert!(data.load_plugin_state("notes").unwrap().is_empty());

        data.save_plugin_state("notes", br#"{"n":1}"#).unwrap();
        let raw = fs::read_to_string(data.plugin_state_path("notes")).unwrap();
        let doc: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(doc["version"], 1);
        assert_eq!(doc["state"]["kind"], "json");
        assert_eq!(doc["state"]["data"]["n"], 1);
        assert_eq!(data.load_plugin_state("notes").unwrap(), br#"{"n":1}"#);

        data.save_plugin_state("blob", &[1, 2, 3]).unwrap();
        assert_eq!(data.load_plugin_state("blob").unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_unknown_version_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let data = DataDir::new(dir.path());
        let path = data.plugin_state_path("old");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, r#"{"version":9,"state":{"kind":"bytes","data":[1]}}"#).unwrap();
        assert!(data.load_plugin_state("old").unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_files_load_empty() {
        let dir = tempfile::tempdir().unwrap();
        let data = DataDir::new(dir.path());
        fs::write(data.layout_path(), "{").unwrap();
        assert!(data.load_layout().unwrap().is_empty());

        let path = data.plugin_state_path("notes");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, r#"{"version":1,"sta"#).unwrap();
        assert!(data.load_plugin_state("notes").unwrap().is_empty());

        // The next save replaces the damaged file.
        data.save_plugin_state("notes", b"ok").unwrap();
        assert_eq!(data.load_plugin_state("notes").unwrap(), b"ok");
    }

    #[test]
    fn test_write_replaces_whole_file() {
        let dir = tempfile::tempdir().unwrap();
        let data = DataDir::new(dir.path());
        let mut memory = LayoutMemory::new();
        for hash in 0..32 {
            memory.store_scroll(hash, [0.0, hash as f32]);
        }
        data.save_layout(&memory).unwrap();
        data.save_layout(&LayoutMemory::new()).unwrap();

        assert!(data.load_layout().unwrap().is_empty());
        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(leftovers, vec![std::ffi::OsString::from("layout.json")]);
    }

    #[test]
    fn test_file_names_stay_inside_the_data_dir() {
        let data = DataDir::new("/data");
        assert_eq!(
            data.plugin_state_path("../etc/passwd"),
            PathBuf::from("/data/plugins/_etc_passwd.json")
        );
        assert_eq!(
            data.translations_path("pt-BR"),
            PathBuf::from("/data/i18n/pt-BR.json")
        );
    }

    #[test]
    fn test_layout_and_translations() {
        let dir = tempfile::tempdir().unwrap();
        let data = DataDir::new(dir.path());
        assert!(data.load_layout().unwrap().is_empty());

        let mut memory = LayoutMemory::new();
        memory.store_scroll(0xabc, [0.0, 40.0]);
        memory.store_resize(7, 3.5);
        data.save_layout(&memory).unwrap();
        assert_eq!(data.load_layout().unwrap(), memory);

        assert_eq!(data.load_translations("de").unwrap().get("hello"), "hello");
        let path = data.translations_path("de");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, r#"{"hello": "Hallo"}"#).unwrap();
        let table = data.load_translations("de").unwrap();
        assert_eq!(table.locale(), "de");
        assert_eq!(table.get("hello"), "Hallo");
    }
}
