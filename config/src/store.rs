//! Observable configuration stores.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use scribe_types::{Settings, ShortcutDefinition, TriggerDefinition};
use thiserror::Error;
use tokio::sync::watch;
use toml_edit::value;

use crate::persist::{edit_document, table_mut};
use crate::raw::{RawConfig, Resolved};
use crate::{ConfigError, config_path};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to write config at {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Source of configuration snapshots.
///
/// Readers subscribe once and read `borrow().clone()` per operation, so one
/// event always works against one whole snapshot.
pub trait ConfigStore: Send + Sync {
    fn settings(&self) -> watch::Receiver<Arc<Settings>>;
    fn triggers(&self) -> watch::Receiver<Arc<Vec<TriggerDefinition>>>;
    fn shortcuts(&self) -> watch::Receiver<Arc<Vec<ShortcutDefinition>>>;

    /// Persist the global on/off state driven by in-text commands.
    fn set_app_active(&self, active: bool) -> Result<(), StoreError>;

    /// Persist where the undo control was dropped.
    fn save_undo_position(&self, x: i32, y: i32) -> Result<(), StoreError>;

    /// Re-read the backing source and publish fresh snapshots.
    fn reload(&self) -> Result<(), StoreError>;
}

/// The three `watch` channels every store publishes on.
#[derive(Debug)]
struct Channels {
    settings: watch::Sender<Arc<Settings>>,
    triggers: watch::Sender<Arc<Vec<TriggerDefinition>>>,
    shortcuts: watch::Sender<Arc<Vec<ShortcutDefinition>>>,
}

impl Channels {
    fn new(resolved: Resolved) -> Self {
        Self {
            settings: watch::Sender::new(Arc::new(resolved.settings)),
            triggers: watch::Sender::new(Arc::new(resolved.triggers)),
            shortcuts: watch::Sender::new(Arc::new(resolved.shortcuts)),
        }
    }

    fn publish(&self, resolved: Resolved) {
        self.settings.send_replace(Arc::new(resolved.settings));
        self.triggers.send_replace(Arc::new(resolved.triggers));
        self.shortcuts.send_replace(Arc::new(resolved.shortcuts));
    }

    /// Publish a modified copy of the current settings.
    fn update_settings(&self, apply: impl FnOnce(&mut Settings)) {
        self.settings.send_modify(|current| apply(Arc::make_mut(current)));
    }
}

/// In-memory store. Nothing is persisted; used by tests and embedders.
#[derive(Debug)]
pub struct MemoryStore {
    channels: Channels,
}

impl MemoryStore {
    #[must_use]
    pub fn new(
        settings: Settings,
        triggers: Vec<TriggerDefinition>,
        shortcuts: Vec<ShortcutDefinition>,
    ) -> Self {
        Self {
            channels: Channels::new(Resolved {
                settings,
                triggers,
                shortcuts,
            }),
        }
    }

    /// Replace everything, as an external settings editor would.
    pub fn replace(&self, resolved: Resolved) {
        self.channels.publish(resolved);
    }

    pub fn update_settings(&self, apply: impl FnOnce(&mut Settings)) {
        self.channels.update_settings(apply);
    }

    pub fn set_triggers(&self, triggers: Vec<TriggerDefinition>) {
        self.channels.triggers.send_replace(Arc::new(triggers));
    }

    pub fn set_shortcuts(&self, shortcuts: Vec<ShortcutDefinition>) {
        self.channels.shortcuts.send_replace(Arc::new(shortcuts));
    }

    #[must_use]
    pub fn current(&self) -> Arc<Settings> {
        Arc::clone(&self.channels.settings.borrow())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self {
            channels: Channels::new(Resolved::default()),
        }
    }
}

impl ConfigStore for MemoryStore {
    fn settings(&self) -> watch::Receiver<Arc<Settings>> {
        self.channels.settings.subscribe()
    }

    fn triggers(&self) -> watch::Receiver<Arc<Vec<TriggerDefinition>>> {
        self.channels.triggers.subscribe()
    }

    fn shortcuts(&self) -> watch::Receiver<Arc<Vec<ShortcutDefinition>>> {
        self.channels.shortcuts.subscribe()
    }

    fn set_app_active(&self, active: bool) -> Result<(), StoreError> {
        self.channels
            .update_settings(|s| s.service.app_active = active);
        Ok(())
    }

    fn save_undo_position(&self, x: i32, y: i32) -> Result<(), StoreError> {
        self.channels.update_settings(|s| {
            s.undo_redo.x = x;
            s.undo_redo.y = y;
        });
        Ok(())
    }

    fn reload(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Store backed by a TOML file.
///
/// A missing file is not an error: defaults are published and the file is
/// created on the first persisted change.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    channels: Channels,
    write_lock: Mutex<()>,
}

impl FileStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let resolved = load_file(&path)?;
        tracing::info!(path = %path.display(), "Loaded configuration");
        Ok(Self {
            path,
            channels: Channels::new(resolved),
            write_lock: Mutex::new(()),
        })
    }

    /// Open `~/.scribe/config.toml`, or `./.scribe/config.toml` without a home dir.
    pub fn open_default() -> Result<Self, ConfigError> {
        let path = config_path().unwrap_or_else(|| PathBuf::from(".scribe").join("config.toml"));
        Self::open(path)
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, edit: impl FnOnce(&mut toml_edit::DocumentMut)) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        edit_document(&self.path, edit).map_err(|source| {
            tracing::warn!(path = %self.path.display(), "Failed to persist config: {source}");
            StoreError::Write {
                path: self.path.clone(),
                source,
            }
        })
    }
}

fn load_file(path: &Path) -> Result<Resolved, ConfigError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Resolved::default()),
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    let raw: RawConfig = toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(raw.resolve())
}

impl ConfigStore for FileStore {
    fn settings(&self) -> watch::Receiver<Arc<Settings>> {
        self.channels.settings.subscribe()
    }

    fn triggers(&self) -> watch::Receiver<Arc<Vec<TriggerDefinition>>> {
        self.channels.triggers.subscribe()
    }

    fn shortcuts(&self) -> watch::Receiver<Arc<Vec<ShortcutDefinition>>> {
        self.channels.shortcuts.subscribe()
    }

    fn set_app_active(&self, active: bool) -> Result<(), StoreError> {
        // Publish first: the in-memory state is authoritative even if the disk write fails.
        self.channels
            .update_settings(|s| s.service.app_active = active);
        self.persist(|doc| {
            table_mut(doc, "service")["app_active"] = value(active);
        })
    }

    fn save_undo_position(&self, x: i32, y: i32) -> Result<(), StoreError> {
        self.channels.update_settings(|s| {
            s.undo_redo.x = x;
            s.undo_redo.y = y;
        });
        self.persist(|doc| {
            let table = table_mut(doc, "undo_redo");
            table["x"] = value(i64::from(x));
            table["y"] = value(i64::from(y));
        })
    }

    fn reload(&self) -> Result<(), StoreError> {
        let resolved = load_file(&self.path)?;
        self.channels.publish(resolved);
        tracing::info!(path = %self.path.display(), "Reloaded configuration");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use scribe_types::Settings;

    use super::{ConfigStore, FileStore, MemoryStore};

    #[test]
    fn missing_file_publishes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path().join("config.toml")).unwrap();
        assert!(store.settings().borrow().service.app_active);
        assert_eq!(store.triggers().borrow().len(), 13);
    }

    #[test]
    fn set_app_active_persists_and_publishes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "# keep me\n[service]\napp_toggle_enabled = true\n").unwrap();
        let store = FileStore::open(&path).unwrap();
        let mut rx = store.settings();
        rx.mark_unchanged();

        store.set_app_active(false).unwrap();

        assert!(rx.has_changed().unwrap());
        assert!(!rx.borrow_and_update().service.app_active);
        let written = fs::read_to_string(&path).unwrap();
        assert!(written.contains("# keep me"));
        assert!(written.contains("app_active = false"));

        let reopened = FileStore::open(&path).unwrap();
        assert!(!reopened.settings().borrow().service.app_active);
        assert!(reopened.settings().borrow().service.app_toggle_enabled);
    }

    #[test]
    fn undo_position_round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let store = FileStore::open(&path).unwrap();

        store.save_undo_position(64, 512).unwrap();

        let reopened = FileStore::open(&path).unwrap();
        let settings = reopened.settings().borrow().clone();
        assert_eq!(settings.undo_redo.display_position(), (64, 512));
    }

    #[test]
    fn reload_picks_up_external_edits() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let store = FileStore::open(&path).unwrap();
        let triggers = store.triggers();

        fs::write(
            &path,
            "[[triggers]]\ntrigger = \"@pirate\"\ninstruction = \"Talk like a pirate.\"\n",
        )
        .unwrap();
        store.reload().unwrap();

        let current = triggers.borrow().clone();
        assert_eq!(current.len(), 1);
        assert_eq!(current[0].trigger(), "@pirate");
    }

    #[test]
    fn reload_keeps_last_good_snapshot_on_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[streaming]\nenabled = true\n").unwrap();
        let store = FileStore::open(&path).unwrap();

        fs::write(&path, "[streaming\n").unwrap();
        assert!(store.reload().is_err());
        assert!(store.settings().borrow().streaming.enabled);
    }

    #[test]
    fn memory_store_updates_snapshots() {
        let store = MemoryStore::new(Settings::default(), Vec::new(), Vec::new());
        store.set_app_active(false).unwrap();
        store.save_undo_position(3, 4).unwrap();
        let current = store.current();
        assert!(!current.service.app_active);
        assert_eq!((current.undo_redo.x, current.undo_redo.y), (3, 4));
    }
}
