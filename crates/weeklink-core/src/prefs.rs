use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

pub const CALENDAR_URL_KEY: &str = "googleCalendarUrl";
pub const TIMEZONE_KEY: &str = "selectedTimezone";
pub const RECENT_TIMEZONES_KEY: &str = "recentTimezones";
pub const INSTALL_DISMISSED_KEY: &str = "pwaInstallDismissed";

pub const MAX_RECENT_TIMEZONES: usize = 4;

const PREFS_FILE: &str = "prefs.json";

/// Flat string-to-string persistence.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()>;
    fn remove(&mut self, key: &str) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    map: BTreeMap<String, String>,
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.map.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        self.map.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> anyhow::Result<()> {
        self.map.remove(key);
        Ok(())
    }
}

/// A JSON object of strings kept in `prefs.json` under the data directory.
/// Every write replaces the file atomically.
#[derive(Debug)]
pub struct FileStore {
    pub path: PathBuf,
    map: BTreeMap<String, String>,
}

impl FileStore {
    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        fs::create_dir_all(data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;

        let path = data_dir.join(PREFS_FILE);
        if !path.exists() {
            fs::write(&path, "{}")
                .with_context(|| format!("failed to create {}", path.display()))?;
        }

        let map = load_map(&path).with_context(|| format!("failed to load {PREFS_FILE}"))?;
        info!(
            path = %path.display(),
            keys = map.len(),
            "opened preference store"
        );

        Ok(Self { path, map })
    }

    #[tracing::instrument(skip(self))]
    fn flush(&self) -> anyhow::Result<()> {
        save_map_atomic(&self.path, &self.map)
            .with_context(|| format!("failed to save {PREFS_FILE}"))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.map.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        debug!(key, "storing preference");
        self.map.insert(key.to_string(), value.to_string());
        self.flush()
    }

    fn remove(&mut self, key: &str) -> anyhow::Result<()> {
        if self.map.remove(key).is_some() {
            debug!(key, "removed preference");
            self.flush()?;
        }
        Ok(())
    }
}

#[tracing::instrument(skip(path))]
fn load_map(path: &Path) -> anyhow::Result<BTreeMap<String, String>> {
    let raw =
        fs::read_to_string(path).with_context(|| format!("failed reading {}", path.display()))?;
    if raw.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    serde_json::from_str(&raw).with_context(|| format!("failed parsing {}", path.display()))
}

#[tracing::instrument(skip(path, map))]
fn save_map_atomic(path: &Path, map: &BTreeMap<String, String>) -> anyhow::Result<()> {
    debug!(file = %path.display(), count = map.len(), "saving preferences atomically");

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut temp = NamedTempFile::new_in(dir)?;
    serde_json::to_writer_pretty(&mut temp, map)?;
    writeln!(temp)?;
    temp.flush()?;

    temp.persist(path)
        .map_err(|err| anyhow!("failed to persist {}: {}", path.display(), err))?;

    Ok(())
}

/// Everything remembered between sessions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Preferences {
    pub calendar_url: Option<String>,
    pub timezone: Option<String>,
    pub recent_timezones: Vec<String>,
    pub install_dismissed_at: Option<i64>,
}

impl Preferences {
    #[tracing::instrument(skip(store))]
    pub fn load<S: KeyValueStore + ?Sized>(store: &S) -> anyhow::Result<Self> {
        let calendar_url = store.get(CALENDAR_URL_KEY)?.filter(|url| !url.is_empty());
        let timezone = store.get(TIMEZONE_KEY)?.filter(|tz| !tz.is_empty());

        let recent_timezones = match store.get(RECENT_TIMEZONES_KEY)? {
            Some(raw) => match serde_json::from_str::<Vec<String>>(&raw) {
                Ok(list) => list,
                Err(err) => {
                    warn!(error = %err, "ignoring unreadable recent timezone list");
                    Vec::new()
                }
            },
            None => Vec::new(),
        };

        let install_dismissed_at = store
            .get(INSTALL_DISMISSED_KEY)?
            .and_then(|raw| raw.trim().parse::<i64>().ok());

        debug!(
            has_url = calendar_url.is_some(),
            timezone = ?timezone,
            recent = recent_timezones.len(),
            "loaded preferences"
        );

        Ok(Self {
            calendar_url,
            timezone,
            recent_timezones,
            install_dismissed_at,
        })
    }
}

pub fn save_calendar_url<S: KeyValueStore + ?Sized>(
    store: &mut S,
    url: &str,
) -> anyhow::Result<()> {
    store.set(CALENDAR_URL_KEY, url)
}

pub fn save_timezone<S: KeyValueStore + ?Sized>(
    store: &mut S,
    identifier: &str,
) -> anyhow::Result<()> {
    store.set(TIMEZONE_KEY, identifier)
}

pub fn save_recent_timezones<S: KeyValueStore + ?Sized>(
    store: &mut S,
    recent: &[String],
) -> anyhow::Result<()> {
    let json = serde_json::to_string(recent).context("failed encoding recent timezones")?;
    store.set(RECENT_TIMEZONES_KEY, &json)
}

pub fn save_install_dismissed<S: KeyValueStore + ?Sized>(
    store: &mut S,
    epoch_millis: i64,
) -> anyhow::Result<()> {
    store.set(INSTALL_DISMISSED_KEY, &epoch_millis.to_string())
}

#[tracing::instrument(skip(store))]
pub fn clear<S: KeyValueStore + ?Sized>(store: &mut S) -> anyhow::Result<()> {
    for key in [
        CALENDAR_URL_KEY,
        TIMEZONE_KEY,
        RECENT_TIMEZONES_KEY,
        INSTALL_DISMISSED_KEY,
    ] {
        store.remove(key)?;
    }
    info!("cleared preferences");
    Ok(())
}

/// Moves `identifier` to the front of the recency list, keeping at most
/// [`MAX_RECENT_TIMEZONES`] distinct entries.
#[must_use]
pub fn push_recent(recent: &[String], identifier: &str) -> Vec<String> {
    std::iter::once(identifier.to_string())
        .chain(recent.iter().filter(|id| id.as_str() != identifier).cloned())
        .take(MAX_RECENT_TIMEZONES)
        .collect()
}
