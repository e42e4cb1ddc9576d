//! Per-file cache entries (hash, content, modification time) keyed by
//! (project, path). This is what the full scan diffs disk state against.

use redis::AsyncCommands;
use serde::{Deserialize, Serialize};

use crate::client::{CacheResult, RedisPool};

/// Cached state of one tracked file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileCacheEntry {
    pub content: String,
    pub hash: String,
    pub last_modified: String,
}

impl FileCacheEntry {
    /// Build an entry from file content, hashing and stamping it now.
    pub fn from_content(content: String, hash: String) -> Self {
        Self {
            content,
            hash,
            last_modified: chrono::Utc::now().to_rfc3339(),
        }
    }
}

fn file_key(project: &str, path: &str) -> String {
    format!("atlas:{}:file:{}", project, path)
}

fn file_key_pattern(project: &str) -> String {
    format!("atlas:{}:file:*", project)
}

/// Store an entry for a file.
pub async fn set_entry(
    pool: &RedisPool,
    project: &str,
    path: &str,
    entry: &FileCacheEntry,
) -> CacheResult<()> {
    let mut conn = pool.clone();
    let json = serde_json::to_string(entry)?;
    conn.hset::<_, _, _, ()>(file_key(project, path), "data", &json)
        .await?;
    Ok(())
}

/// Fetch the entry for a file, if one is recorded.
pub async fn get_entry(
    pool: &RedisPool,
    project: &str,
    path: &str,
) -> CacheResult<Option<FileCacheEntry>> {
    let mut conn = pool.clone();
    let json: Option<String> = conn.hget(file_key(project, path), "data").await?;
    match json {
        Some(j) => Ok(Some(serde_json::from_str(&j)?)),
        None => Ok(None),
    }
}

/// Drop the entry for a file (on unlink or soft-delete).
pub async fn delete_entry(pool: &RedisPool, project: &str, path: &str) -> CacheResult<()> {
    let mut conn = pool.clone();
    conn.del::<_, ()>(file_key(project, path)).await?;
    Ok(())
}

/// All recorded (path, entry) pairs for a project. The full scan uses this
/// to find files that are cached but gone from disk.
pub async fn scan_project_files(
    pool: &RedisPool,
    project: &str,
) -> CacheResult<Vec<(String, FileCacheEntry)>> {
    let mut conn = pool.clone();
    let mut scan: redis::AsyncIter<String> = conn.scan_match(file_key_pattern(project)).await?;
    let mut keys = Vec::new();
    while let Some(key) = scan.next_item().await {
        keys.push(key);
    }
    drop(scan);

    let prefix = format!("atlas:{}:file:", project);
    let mut entries = Vec::new();
    for key in keys {
        let mut c = pool.clone();
        let json: Option<String> = c.hget(&key, "data").await?;
        if let Some(j) = json {
            if let Ok(entry) = serde_json::from_str::<FileCacheEntry>(&j) {
                let path = key.trim_start_matches(&prefix).to_string();
                entries.push((path, entry));
            }
        }
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_layout() {
        assert_eq!(file_key("demo", "src/a.ts"), "atlas:demo:file:src/a.ts");
        assert_eq!(file_key_pattern("demo"), "atlas:demo:file:*");
    }

    #[test]
    fn test_entry_round_trips_through_json() {
        let entry = FileCacheEntry {
            content: "export const x = 1;".to_string(),
            hash: "abc123".to_string(),
            last_modified: "2026-08-31T00:00:00Z".to_string(),
        };
        let json = serde_json::to_string(&entry).unwrap();
        let back: FileCacheEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back.hash, entry.hash);
        assert_eq!(back.content, entry.content);
    }
}
