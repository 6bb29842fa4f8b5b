use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::error::PushError;

/// Key/value preferences grouped by namespace, like the platform's shared
/// preferences. Hosts can bridge the native store through this trait.
pub trait Preferences: Send + Sync + 'static {
    fn get_string(&self, namespace: &str, key: &str) -> Option<String>;
    fn put_string(&self, namespace: &str, key: &str, value: &str) -> Result<(), PushError>;
    fn remove(&self, namespace: &str, key: &str) -> Result<(), PushError>;
}

/// One JSON object per namespace under `<data_dir>/prefs/`.
pub struct FilePreferences {
    dir: PathBuf,
    // Serializes read-modify-write of a namespace file.
    lock: Mutex<()>,
}

impl FilePreferences {
    pub fn open(data_dir: &str) -> Result<Self, PushError> {
        let dir = std::path::Path::new(data_dir).join("prefs");
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            lock: Mutex::new(()),
        })
    }

    fn namespace_path(&self, namespace: &str) -> PathBuf {
        self.dir.join(format!("{namespace}.json"))
    }

    fn read_namespace(&self, namespace: &str) -> BTreeMap<String, String> {
        let path = self.namespace_path(namespace);
        let Ok(bytes) = std::fs::read(&path) else {
            return BTreeMap::new();
        };
        match serde_json::from_slice(&bytes) {
            Ok(map) => map,
            Err(e) => {
                tracing::warn!(%e, namespace, "unreadable preferences file, starting empty");
                BTreeMap::new()
            }
        }
    }

    fn write_namespace(
        &self,
        namespace: &str,
        map: &BTreeMap<String, String>,
    ) -> Result<(), PushError> {
        let dest = self.namespace_path(namespace);
        let tmp = dest.with_extension("tmp");
        std::fs::write(&tmp, serde_json::to_vec(map)?)?;
        std::fs::rename(&tmp, &dest)?;
        Ok(())
    }

    fn update(
        &self,
        namespace: &str,
        f: impl FnOnce(&mut BTreeMap<String, String>),
    ) -> Result<(), PushError> {
        let _guard = self.lock.lock().unwrap_or_else(|poison| poison.into_inner());
        let mut map = self.read_namespace(namespace);
        f(&mut map);
        self.write_namespace(namespace, &map)
    }
}

impl Preferences for FilePreferences {
    fn get_string(&self, namespace: &str, key: &str) -> Option<String> {
        let _guard = self.lock.lock().unwrap_or_else(|poison| poison.into_inner());
        self.read_namespace(namespace).remove(key)
    }

    fn put_string(&self, namespace: &str, key: &str, value: &str) -> Result<(), PushError> {
        self.update(namespace, |map| {
            map.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, namespace: &str, key: &str) -> Result<(), PushError> {
        self.update(namespace, |map| {
            map.remove(key);
        })
    }
}
