//! Record output
//!
//! The harness only needs an append-only destination for captured records;
//! persistence formats live behind the [`RecordSink`] seam.

use std::fs::File;
use std::io::BufWriter;

use anyhow::{Context, Result};
use tracing::info;

use nicbench_shared::types::record::CapturedRecord;

/// Append-only destination for captured records.
pub trait RecordSink {
    fn record(&mut self, rec: &CapturedRecord) -> Result<()>;
}

/// Sink that keeps records in memory, for scenarios and tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Vec<CapturedRecord>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[CapturedRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<CapturedRecord> {
        self.records
    }
}

impl RecordSink for MemorySink {
    fn record(&mut self, rec: &CapturedRecord) -> Result<()> {
        self.records.push(rec.clone());
        Ok(())
    }
}

/// Export captured records as pretty-printed JSON.
pub fn generate_json(records: &[CapturedRecord], output_path: &str) -> Result<()> {
    info!("Writing {} record(s) to {}", records.len(), output_path);

    let file = File::create(output_path)
        .with_context(|| format!("Failed to create output file: {}", output_path))?;

    let writer = BufWriter::new(file);

    serde_json::to_writer_pretty(writer, records)
        .context("Failed to serialize records to JSON")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_records() -> Vec<CapturedRecord> {
        vec![
            CapturedRecord {
                context: 0,
                timestamp: 100,
                latency_cycles: 1234,
            },
            CapturedRecord {
                context: 1,
                timestamp: 200,
                latency_cycles: 5678,
            },
        ]
    }

    #[test]
    fn test_memory_sink_appends() {
        let mut sink = MemorySink::new();
        for rec in sample_records() {
            sink.record(&rec).unwrap();
        }
        assert_eq!(sink.records().len(), 2);
        assert_eq!(sink.records()[1].latency_cycles, 5678);
    }

    #[test]
    fn test_generate_json() {
        let temp_dir = tempfile::tempdir().unwrap();
        let output_path = temp_dir.path().join("records.json");

        generate_json(&sample_records(), output_path.to_str().unwrap()).unwrap();

        assert!(output_path.exists());
        let contents = std::fs::read_to_string(output_path).unwrap();
        let parsed: Vec<CapturedRecord> = serde_json::from_str(&contents).unwrap();
        assert_eq!(parsed, sample_records());
    }
}
