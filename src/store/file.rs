// src/store/file.rs
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use super::{within_window, Store};
use crate::error::StoreError;
use crate::model::{Entity, Record, RecordKind};

/// Local state directory:
///   `<root>/entities.toml`        `[[entities]]` tables (or `entities.json`, an array)
///   `<root>/records/<id>.jsonl`   one JSON record per line, append-only; `<id>` percent-encoded
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

#[derive(Deserialize)]
struct EntitiesToml {
    #[serde(default)]
    entities: Vec<Entity>,
}

impl FileStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn records_path(&self, entity_id: &str) -> PathBuf {
        self.root
            .join("records")
            .join(format!("{}.jsonl", file_stem(entity_id)))
    }
}

/// Percent-encode everything except lowercase ascii, digits and `-`.
/// Injective, and stays injective on case-insensitive filesystems.
fn file_stem(entity_id: &str) -> String {
    let mut out = String::with_capacity(entity_id.len());
    for b in entity_id.bytes() {
        if b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-' {
            out.push(char::from(b));
        } else {
            out.push_str(&format!("%{b:02X}"));
        }
    }
    out
}

async fn read_optional(path: &Path) -> Result<Option<String>, StoreError> {
    match fs::read_to_string(path).await {
        Ok(s) => Ok(Some(s)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

#[async_trait]
impl Store for FileStore {
    async fn list_entities(&self) -> Result<Vec<Entity>, StoreError> {
        if let Some(s) = read_optional(&self.root.join("entities.toml")).await? {
            let parsed: EntitiesToml = toml::from_str(&s)
                .map_err(|e| StoreError::Backend(format!("entities.toml: {e}")))?;
            return Ok(parsed.entities);
        }
        if let Some(s) = read_optional(&self.root.join("entities.json")).await? {
            return Ok(serde_json::from_str(&s)?);
        }
        Ok(Vec::new())
    }

    async fn recent_records(
        &self,
        entity_id: &str,
        kind: RecordKind,
        window_days: u32,
    ) -> Result<Vec<Record>, StoreError> {
        let Some(body) = read_optional(&self.records_path(entity_id)).await? else {
            return Ok(Vec::new());
        };

        let mut all = Vec::new();
        for (n, line) in body.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<Record>(line) {
                Ok(r) => all.push(r),
                Err(e) => {
                    tracing::warn!(entity = entity_id, line = n + 1, error = %e, "skipping corrupt record line");
                }
            }
        }
        Ok(within_window(all, kind, window_days, Utc::now()))
    }

    async fn append_record(&self, entity_id: &str, record: &Record) -> Result<(), StoreError> {
        let path = self.records_path(entity_id);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).await?;
        }
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        let mut f = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        f.write_all(&line).await?;
        f.flush().await?;
        Ok(())
    }
}
