use std::io::ErrorKind;
use std::path::PathBuf;

use rand::seq::IndexedRandom;
use thiserror::Error;
use tokio::fs;
use tracing::{info, warn};

const ENTRY_EXT: &str = ".md";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid entry title: {0:?}")]
    InvalidTitle(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Markdown entries kept as flat files.
///
/// Each entry is stored at `{dir}/{title}.md`. Titles are case-sensitive and
/// may not contain path separators.
pub struct EntryStore {
    dir: PathBuf,
}

impl EntryStore {
    pub async fn new(dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&dir).await?;
        info!("Entry directory: {}", dir.display());
        Ok(Self { dir })
    }

    fn entry_path(&self, title: &str) -> Result<PathBuf> {
        if !is_valid_title(title) {
            return Err(StoreError::InvalidTitle(title.to_string()));
        }
        Ok(self.dir.join(format!("{}{}", title, ENTRY_EXT)))
    }

    /// All entry titles, sorted, without duplicates.
    pub async fn list_entries(&self) -> Result<Vec<String>> {
        let mut dir = fs::read_dir(&self.dir).await?;
        let mut titles = Vec::new();
        while let Some(entry) = dir.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            if let Some(title) = entry
                .file_name()
                .to_str()
                .and_then(|name| name.strip_suffix(ENTRY_EXT))
                .filter(|title| !title.is_empty())
            {
                titles.push(title.to_string());
            }
        }
        titles.sort();
        titles.dedup();
        Ok(titles)
    }

    /// Saves an entry, replacing any existing one with the same title. The
    /// old file is deleted first, then the new content written.
    pub async fn save_entry(&self, title: &str, content: &str) -> Result<()> {
        let path = self.entry_path(title)?;
        match fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        fs::write(&path, content).await?;
        info!("Saved entry '{}' ({} bytes)", title, content.len());
        Ok(())
    }

    /// Entry content, or `None` when no such entry exists.
    pub async fn get_entry(&self, title: &str) -> Result<Option<String>> {
        let path = match self.entry_path(title) {
            Ok(path) => path,
            Err(_) => return Ok(None),
        };
        match fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Rewrites an entry without its blank lines (lines that are only a line
    /// terminator). The result goes to a temporary file that then replaces the
    /// entry.
    pub async fn remove_newline(&self, title: &str) -> Result<()> {
        let path = self.entry_path(title)?;
        let content = fs::read_to_string(&path).await?;
        let stripped = strip_blank_lines(&content);

        let temp = self.dir.join(format!("{}{}.tmp", title, ENTRY_EXT));
        fs::write(&temp, &stripped).await?;
        if let Err(e) = fs::rename(&temp, &path).await {
            warn!("Failed to replace entry '{}': {}", title, e);
            fs::remove_file(&temp).await.ok();
            return Err(e.into());
        }
        Ok(())
    }

    /// A uniformly chosen entry title, `None` when the store is empty.
    pub async fn random_entry(&self) -> Result<Option<String>> {
        let titles = self.list_entries().await?;
        Ok(titles.choose(&mut rand::rng()).cloned())
    }
}

/// Titles become file names, so anything that could leave the directory is
/// refused.
pub fn is_valid_title(title: &str) -> bool {
    !title.trim().is_empty()
        && !title.starts_with('.')
        && !title.contains(['/', '\\', '\0'])
        && !title.contains("..")
}

fn strip_blank_lines(content: &str) -> String {
    content
        .split_inclusive('\n')
        .filter(|line| *line != "\n" && *line != "\r\n")
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> (tempfile::TempDir, EntryStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = EntryStore::new(dir.path().join("entries")).await.unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn save_then_get_round_trips() {
        let (_dir, store) = store().await;
        store.save_entry("Rust", "# Rust\n\nA language.\n").await.unwrap();
        assert_eq!(
            store.get_entry("Rust").await.unwrap().as_deref(),
            Some("# Rust\n\nA language.\n")
        );
    }

    #[tokio::test]
    async fn save_replaces_instead_of_appending() {
        let (_dir, store) = store().await;
        store.save_entry("Git", "a much longer first version").await.unwrap();
        store.save_entry("Git", "short").await.unwrap();
        assert_eq!(store.get_entry("Git").await.unwrap().as_deref(), Some("short"));
    }

    #[tokio::test]
    async fn missing_entry_is_none() {
        let (_dir, store) = store().await;
        assert_eq!(store.get_entry("Nope").await.unwrap(), None);
        assert_eq!(store.get_entry("../etc/passwd").await.unwrap(), None);
    }

    #[tokio::test]
    async fn list_is_sorted_and_ignores_other_files() {
        let (_dir, store) = store().await;
        for title in ["Python", "CSS", "Django", "HTML"] {
            store.save_entry(title, "x").await.unwrap();
        }
        fs::write(store.dir.join("notes.txt"), "ignored").await.unwrap();
        fs::create_dir(store.dir.join("sub.md")).await.unwrap();

        assert_eq!(store.list_entries().await.unwrap(), ["CSS", "Django", "HTML", "Python"]);
    }

    #[tokio::test]
    async fn remove_newline_strips_only_blank_lines() {
        let (_dir, store) = store().await;
        store.save_entry("Page", "# Title\r\n\r\nBody\n\n\n  \nend").await.unwrap();
        store.remove_newline("Page").await.unwrap();
        assert_eq!(store.get_entry("Page").await.unwrap().as_deref(), Some("# Title\r\nBody\n  \nend"));
        assert_eq!(store.list_entries().await.unwrap(), ["Page"]);
    }

    #[tokio::test]
    async fn rejects_path_like_titles() {
        let (_dir, store) = store().await;
        for title in ["", "a/b", "..", ".hidden", "x\\y"] {
            assert!(matches!(store.save_entry(title, "x").await, Err(StoreError::InvalidTitle(_))));
        }
    }

    #[tokio::test]
    async fn random_entry_picks_existing_title() {
        let (_dir, store) = store().await;
        assert_eq!(store.random_entry().await.unwrap(), None);
        store.save_entry("Only", "x").await.unwrap();
        assert_eq!(store.random_entry().await.unwrap().as_deref(), Some("Only"));
    }
}
