// Per-Iteration JSONL History Recorder
// Outputs one JSON line per mean-field iteration for independent analysis

use fines_engine::IterationRecord;
use std::io::Write;

/// Accumulates iteration records and writes them as JSONL.
pub struct HistoryRecorder {
    records: Vec<IterationRecord>,
}

impl HistoryRecorder {
    pub fn from_history(history: &[IterationRecord]) -> Self {
        Self {
            records: history.to_vec(),
        }
    }

    /// Write all records to a JSONL file, creating parent directories.
    pub fn write_jsonl(&self, path: &std::path::Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = std::fs::File::create(path)?;
        for record in &self.records {
            let line = serde_json::to_string(record)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
            writeln!(file, "{}", line)?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }
}
