use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Local;
use serde_json::{json, Value};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::SinkResult;
use crate::Sink;

/// Appends one JSON object per line to `file_path`, and diverts anything
/// shaped like a Mercury decode failure to a sibling `*_errors.jsonl`
/// file instead of dropping it.
///
/// Each call opens the target file in append mode and writes a single
/// line, the same as the reference `JsonFileStorage`; a process-wide
/// mutex serializes the open-write-close sequence so two sessions
/// flushing large records at once can't interleave partial lines — the
/// reference implementation relies on the OS's append semantics alone,
/// which is good enough for small lines but not guaranteed for large
/// ones.
pub struct JsonlSink {
    path: PathBuf,
    error_path: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl JsonlSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let error_path = derive_error_path(&path);
        Self { path, error_path, write_lock: Arc::new(Mutex::new(())) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn error_path(&self) -> &Path {
        &self.error_path
    }

    async fn append_line(&self, path: &Path, line: String) -> SinkResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut file = OpenOptions::new().create(true).append(true).open(path).await?;
        file.write_all(line.as_bytes()).await?;
        file.write_all(b"\n").await?;
        file.flush().await?;
        Ok(())
    }
}

/// `parsed_data.jsonl` -> `parsed_data_errors.jsonl`; a path with no
/// `.jsonl` extension gets `_errors` appended before any extension it
/// does have, matching the original's naive `str.replace`.
fn derive_error_path(path: &Path) -> PathBuf {
    let as_str = path.to_string_lossy();
    if let Some(stripped) = as_str.strip_suffix(".jsonl") {
        PathBuf::from(format!("{stripped}_errors.jsonl"))
    } else {
        PathBuf::from(format!("{as_str}_errors"))
    }
}

#[async_trait::async_trait]
impl Sink for JsonlSink {
    async fn save(&self, record: Value) -> SinkResult<()> {
        let line = serde_json::to_string(&record)?;
        self.append_line(&self.path, line).await?;
        debug!(path = %self.path.display(), "appended sink record");
        Ok(())
    }
}

impl JsonlSink {
    /// Records a Mercury formatting failure to the error sidecar file,
    /// shaped `{ _received_at, error, raw_data }` per the sink's
    /// external schema. Never called for ordinary non-Mercury tags —
    /// only when a `0xEA` tag was present but its blob didn't satisfy
    /// the Mercury 230 decoder's precondition.
    pub async fn save_error(&self, raw_data: &str, error: &str) -> SinkResult<()> {
        let entry = json!({
            "_received_at": Local::now().to_rfc3339(),
            "error": error,
            "raw_data": raw_data,
        });
        let line = serde_json::to_string(&entry)?;
        self.append_line(&self.error_path, line).await?;
        warn!(error, "mercury formatting failed, diverted to error sink");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn error_path_swaps_jsonl_suffix() {
        assert_eq!(
            derive_error_path(Path::new("parsed_data.jsonl")),
            PathBuf::from("parsed_data_errors.jsonl")
        );
        assert_eq!(
            derive_error_path(Path::new("/var/log/out")),
            PathBuf::from("/var/log/out_errors")
        );
    }

    #[tokio::test]
    async fn save_appends_one_json_line_per_call() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.jsonl");
        let sink = JsonlSink::new(&path);

        sink.save(json!({"a": 1})).await.unwrap();
        sink.save(json!({"a": 2})).await.unwrap();

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(serde_json::from_str::<Value>(lines[0]).unwrap(), json!({"a": 1}));
    }

    #[tokio::test]
    async fn save_error_writes_to_sibling_errors_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.jsonl");
        let sink = JsonlSink::new(&path);

        sink.save_error("0201020304", "mercury blob has wrong length").await.unwrap();

        let contents = tokio::fs::read_to_string(sink.error_path()).await.unwrap();
        let value: Value = serde_json::from_str(contents.lines().next().unwrap()).unwrap();
        assert_eq!(value["raw_data"], json!("0201020304"));
        assert_eq!(value["error"], json!("mercury blob has wrong length"));
        assert!(value["_received_at"].is_string());
    }

    #[tokio::test]
    async fn concurrent_saves_do_not_interleave_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.jsonl");
        let sink = Arc::new(JsonlSink::new(&path));

        let mut handles = Vec::new();
        for i in 0..20 {
            let sink = Arc::clone(&sink);
            handles.push(tokio::spawn(async move {
                sink.save(json!({"i": i})).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(contents.lines().count(), 20);
        for line in contents.lines() {
            assert!(serde_json::from_str::<Value>(line).is_ok());
        }
    }
}
