//! Bookmark store
//!
//! Bookmarks associate a color tag with a member identity inside one file.
//! The store is shared between outline runs and the background purge, so
//! every implementation guards its map with a mutex.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Bookmark store errors
#[derive(Error, Debug)]
pub enum BookmarkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Member id to color tag, for one file
pub type FileBookmarks = BTreeMap<String, String>;

/// File key to the bookmarks of that file
pub type BookmarkMap = BTreeMap<String, FileBookmarks>;

/// Storage for per-member color tags
pub trait BookmarkStore: Send + Sync {
    /// Color tag of a member, if bookmarked
    fn read(&self, file: &str, id: &str) -> Option<String>;

    /// Set the color tag of a member
    fn store(&self, file: &str, id: &str, color: &str) -> Result<(), BookmarkError>;

    /// Drop every bookmark of `file` whose id is not in `valid_ids`
    ///
    /// Returns the number of removed bookmarks.
    fn purge(&self, file: &str, valid_ids: &[String]) -> Result<usize, BookmarkError>;

    /// Drop every bookmark of `file`
    fn clear(&self, file: &str) -> Result<(), BookmarkError>;

    /// All bookmarks of `file`, ordered by id
    fn entries(&self, file: &str) -> FileBookmarks;
}

fn purge_map(map: &mut BookmarkMap, file: &str, valid_ids: &[String]) -> usize {
    let Some(bookmarks) = map.get_mut(file) else {
        return 0;
    };
    let valid: HashSet<&str> = valid_ids.iter().map(String::as_str).collect();
    let before = bookmarks.len();
    bookmarks.retain(|id, _| valid.contains(id.as_str()));
    let removed = before - bookmarks.len();
    if bookmarks.is_empty() {
        map.remove(file);
    }
    removed
}

/// In-memory store, lost when the process exits
#[derive(Debug, Default)]
pub struct MemoryBookmarkStore {
    map: Mutex<BookmarkMap>,
}

impl MemoryBookmarkStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BookmarkStore for MemoryBookmarkStore {
    fn read(&self, file: &str, id: &str) -> Option<String> {
        self.map.lock().get(file).and_then(|b| b.get(id)).cloned()
    }

    fn store(&self, file: &str, id: &str, color: &str) -> Result<(), BookmarkError> {
        self.map
            .lock()
            .entry(file.to_string())
            .or_default()
            .insert(id.to_string(), color.to_string());
        Ok(())
    }

    fn purge(&self, file: &str, valid_ids: &[String]) -> Result<usize, BookmarkError> {
        Ok(purge_map(&mut self.map.lock(), file, valid_ids))
    }

    fn clear(&self, file: &str) -> Result<(), BookmarkError> {
        self.map.lock().remove(file);
        Ok(())
    }

    fn entries(&self, file: &str) -> FileBookmarks {
        self.map.lock().get(file).cloned().unwrap_or_default()
    }
}

/// On-disk layout of the JSON store
#[derive(Debug, Default, Serialize, Deserialize)]
struct BookmarkFile {
    #[serde(default)]
    files: BookmarkMap,
}

/// Store persisted as pretty-printed JSON
#[derive(Debug)]
pub struct JsonBookmarkStore {
    path: PathBuf,
    map: Mutex<BookmarkMap>,
}

impl JsonBookmarkStore {
    /// Open the store at `path`, loading it when the file exists
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, BookmarkError> {
        let path = path.into();
        let map = if path.exists() {
            let text = fs::read_to_string(&path)?;
            if text.trim().is_empty() {
                BookmarkMap::new()
            } else {
                serde_json::from_str::<BookmarkFile>(&text)?.files
            }
        } else {
            BookmarkMap::new()
        };
        Ok(Self {
            path,
            map: Mutex::new(map),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self, map: &BookmarkMap) -> Result<(), BookmarkError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = BookmarkFile { files: map.clone() };
        fs::write(&self.path, serde_json::to_string_pretty(&file)?)?;
        Ok(())
    }
}

impl BookmarkStore for JsonBookmarkStore {
    fn read(&self, file: &str, id: &str) -> Option<String> {
        self.map.lock().get(file).and_then(|b| b.get(id)).cloned()
    }

    fn store(&self, file: &str, id: &str, color: &str) -> Result<(), BookmarkError> {
        let mut map = self.map.lock();
        let previous = map
            .entry(file.to_string())
            .or_default()
            .insert(id.to_string(), color.to_string());
        if previous.as_deref() == Some(color) {
            return Ok(());
        }
        self.save(&map)
    }

    fn purge(&self, file: &str, valid_ids: &[String]) -> Result<usize, BookmarkError> {
        let mut map = self.map.lock();
        let removed = purge_map(&mut map, file, valid_ids);
        if removed > 0 {
            self.save(&map)?;
        }
        Ok(removed)
    }

    fn clear(&self, file: &str) -> Result<(), BookmarkError> {
        let mut map = self.map.lock();
        if map.remove(file).is_some() {
            self.save(&map)?;
        }
        Ok(())
    }

    fn entries(&self, file: &str) -> FileBookmarks {
        self.map.lock().get(file).cloned().unwrap_or_default()
    }
}
