//! Observation stream for step outputs

use netdrill_core::OutputRecord;
use parking_lot::Mutex;
use std::io::Write;

/// Receives every non-sensitive output as it is written
pub trait OutputSink: Send + Sync {
    fn record(&self, record: &OutputRecord) -> std::io::Result<()>;
}

/// Writes one JSON record per line to stdout
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSink;

impl OutputSink for StdoutSink {
    fn record(&self, record: &OutputRecord) -> std::io::Result<()> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(&line)?;
        stdout.flush()
    }
}

/// Keeps records in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<OutputRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<OutputRecord> {
        self.records.lock().clone()
    }
}

impl OutputSink for MemorySink {
    fn record(&self, record: &OutputRecord) -> std::io::Result<()> {
        self.records.lock().push(record.clone());
        Ok(())
    }
}

/// Drops every record
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl OutputSink for NullSink {
    fn record(&self, _record: &OutputRecord) -> std::io::Result<()> {
        Ok(())
    }
}
