//! Whole-file JSON document helpers shared by every store.
//!
//! Each store is a single JSON document loaded fully, mutated in memory,
//! and rewritten atomically (temp file + rename within the same directory).
//! Corrupted or missing documents degrade to their default value with a
//! warning; one bad side-file must never take the pipeline down.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use tracing::warn;

use crate::domain::errors::DomainResult;

/// Load a JSON document, treating a missing or malformed file as default.
pub async fn load_or_default<T>(path: &Path) -> T
where
    T: DeserializeOwned + Default,
{
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return T::default(),
        Err(err) => {
            warn!(path = %path.display(), %err, "failed to read store, treating as empty");
            return T::default();
        }
    };
    match serde_json::from_slice(&bytes) {
        Ok(value) => value,
        Err(err) => {
            warn!(path = %path.display(), %err, "malformed store, treating as empty");
            T::default()
        }
    }
}

/// Serialize a document and replace the file atomically.
pub async fn write_atomic<T>(path: &Path, value: &T) -> DomainResult<()>
where
    T: Serialize,
{
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let tmp = path.with_extension("json.tmp");
    let bytes = serde_json::to_vec_pretty(value)?;
    tokio::fs::write(&tmp, &bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

/// Read a JSONL file, skipping blank and malformed lines with a warning.
pub async fn read_jsonl<T>(path: &Path) -> Vec<T>
where
    T: DeserializeOwned,
{
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
        Err(err) => {
            warn!(path = %path.display(), %err, "failed to read log, treating as empty");
            return Vec::new();
        }
    };
    let mut records = Vec::new();
    for (line_no, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str(line) {
            Ok(record) => records.push(record),
            Err(err) => {
                warn!(path = %path.display(), line = line_no + 1, %err, "skipping malformed log line");
            }
        }
    }
    records
}

/// Append one record to a JSONL ledger.
pub async fn append_jsonl<T>(path: &Path, value: &T) -> DomainResult<()>
where
    T: Serialize,
{
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let mut line = serde_json::to_string(value)?;
    line.push('\n');
    let mut options = tokio::fs::OpenOptions::new();
    options.create(true).append(true);
    use tokio::io::AsyncWriteExt;
    let mut file = options.open(path).await?;
    file.write_all(line.as_bytes()).await?;
    file.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::collections::BTreeMap;

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Doc {
        entries: BTreeMap<String, u32>,
    }

    #[tokio::test]
    async fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let doc: Doc = load_or_default(&dir.path().join("absent.json")).await;
        assert!(doc.entries.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        tokio::fs::write(&path, b"{not json").await.unwrap();
        let doc: Doc = load_or_default(&path).await;
        assert!(doc.entries.is_empty());
    }

    #[tokio::test]
    async fn test_write_then_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/doc.json");
        let mut doc = Doc::default();
        doc.entries.insert("a".into(), 1);
        write_atomic(&path, &doc).await.unwrap();
        let back: Doc = load_or_default(&path).await;
        assert_eq!(back, doc);
    }

    #[tokio::test]
    async fn test_jsonl_skips_malformed_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.jsonl");
        tokio::fs::write(&path, "{\"entries\":{}}\nnot json\n{\"entries\":{\"b\":2}}\n")
            .await
            .unwrap();
        let records: Vec<Doc> = read_jsonl(&path).await;
        assert_eq!(records.len(), 2);
    }

    #[tokio::test]
    async fn test_append_jsonl() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.jsonl");
        append_jsonl(&path, &Doc::default()).await.unwrap();
        append_jsonl(&path, &Doc::default()).await.unwrap();
        let records: Vec<Doc> = read_jsonl(&path).await;
        assert_eq!(records.len(), 2);
    }
}
