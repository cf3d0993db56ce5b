use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::{self, Read, Seek, Write};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};
use fd_lock::RwLock;
use serde::{Deserialize, Serialize};

use crate::config::io::project_dirs;
use crate::device::types::DeviceSnapshot;
use crate::error::HistoryError;

/// Previously chosen value keys, most preferred first.
pub trait History: Send + Sync {
    fn load(&self, namespace: &str) -> Result<Vec<String>, HistoryError>;

    fn save(&self, namespace: &str, value: &str) -> Result<(), HistoryError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HistoryEntry {
    value: String,
    count: u64,
    last_used: u64,
}

// most chosen first, then most recently chosen
fn sort_entries(entries: &mut [HistoryEntry]) {
    entries.sort_by(|a, b| {
        b.count.cmp(&a.count).then(b.last_used.cmp(&a.last_used))
    });
}

fn parse_entries(content: &str) -> Result<Vec<HistoryEntry>, HistoryError> {
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }

    Ok(serde_json::from_str(content)?)
}

/// One JSON file per namespace in the cache directory.
pub struct FileHistory {
    dir: PathBuf,
}

impl FileHistory {
    pub fn new(dir: PathBuf) -> Self {
        FileHistory { dir }
    }

    pub fn in_cache_dir() -> Result<Self, HistoryError> {
        match project_dirs() {
            Some(dirs) => Ok(FileHistory::new(dirs.cache_dir().to_path_buf())),
            None => Err(HistoryError::NoHistoryPath),
        }
    }

    fn path(&self, namespace: &str) -> PathBuf {
        self.dir.join(format!("{}.json", namespace))
    }
}

impl History for FileHistory {
    fn load(&self, namespace: &str) -> Result<Vec<String>, HistoryError> {
        let content = match std::fs::read_to_string(self.path(namespace)) {
            Ok(content) => content,
            // nothing chosen yet
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut entries = parse_entries(&content)?;
        sort_entries(&mut entries);
        Ok(entries.into_iter().map(|entry| entry.value).collect())
    }

    fn save(&self, namespace: &str, value: &str) -> Result<(), HistoryError> {
        std::fs::create_dir_all(&self.dir)?;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .truncate(false)
            .create(true)
            .open(self.path(namespace))?;

        let mut lock = RwLock::new(file);
        let mut file = lock.write()?;

        let mut content = String::new();
        file.read_to_string(&mut content)?;
        let mut entries = parse_entries(&content)?;

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        let mut entry = match entries.iter().position(|entry| entry.value == value) {
            Some(index) => entries.remove(index),
            None => HistoryEntry { value: value.to_string(), count: 0, last_used: now },
        };
        entry.count += 1;
        entry.last_used = now;
        // ties on the timestamp resolve to the most recent save
        entries.insert(0, entry);
        sort_entries(&mut entries);

        let content = serde_json::to_string_pretty(&entries)?;
        file.rewind()?;
        file.set_len(0)?;
        file.write_all(content.as_bytes())?;
        file.flush()?;
        Ok(())
    }
}

/// Orders devices by their rank in `history`; devices never chosen keep their
/// enumeration order after the ranked ones.
pub fn rank_by_history(devices: Vec<DeviceSnapshot>, history: &[String]) -> Vec<DeviceSnapshot> {
    let ranks: HashMap<&str, usize> = history
        .iter()
        .enumerate()
        .rev()
        .map(|(rank, value)| (value.as_str(), rank))
        .collect();

    let mut devices = devices;
    devices.sort_by_key(|device| {
        ranks
            .get(device.identity.value_key().as_str())
            .copied()
            .unwrap_or(usize::MAX)
    });
    devices
}
