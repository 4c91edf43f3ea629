use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::gate::{GateError, MarkerRecord, Sink, StateRecord};

pub const CSV_HEADER: &str = "t,unix_ms,type,trial,condition,seg,poor_signal,theta,masked,marker,note";

/// Session CSV sink: one `STATE` row per sample, one `MARKER` row per marker.
pub struct CsvRecorder<W: Write> {
    writer: BufWriter<W>,
    failed: bool,
}

impl CsvRecorder<File> {
    pub fn create(path: &Path) -> Result<Self, GateError> {
        let file = File::create(path)?;
        log::info!("💾 Recording session to {}", path.display());
        Self::new(file)
    }
}

impl<W: Write> CsvRecorder<W> {
    pub fn new(inner: W) -> Result<Self, GateError> {
        let mut writer = BufWriter::new(inner);
        writeln!(writer, "{CSV_HEADER}")?;
        Ok(Self {
            writer,
            failed: false,
        })
    }

    /// Flushes and hands back the underlying writer.
    pub fn finish(self) -> Result<W, GateError> {
        self.writer
            .into_inner()
            .map_err(|e| GateError::Io(e.into_error()))
    }

    fn write_row(&mut self, row: std::fmt::Arguments<'_>) {
        let result = self
            .writer
            .write_fmt(row)
            .and_then(|_| self.writer.write_all(b"\n"));
        if let Err(e) = result {
            // Warn once; keep accepting records so the run never stops on disk trouble.
            if !self.failed {
                log::warn!("session CSV write failed: {e}");
                self.failed = true;
            }
        }
    }
}

fn opt_id(id: Option<u64>) -> String {
    id.map(|v| v.to_string()).unwrap_or_default()
}

impl<W: Write> Sink for CsvRecorder<W> {
    fn marker(&mut self, record: MarkerRecord) {
        let note = record.note().replace('"', "\"\"");
        self.write_row(format_args!(
            "{:.4},{},MARKER,{},{},{},,,,{},\"{}\"",
            record.t,
            record.unix_ms,
            record.trial,
            record.condition_label(),
            opt_id(record.segment_id),
            record.marker_type(),
            note
        ));
    }

    fn state(&mut self, record: &StateRecord) {
        self.write_row(format_args!(
            "{:.4},{},STATE,,,{},{},{:.4},{},,",
            record.timestamp,
            record.unix_ms,
            opt_id(record.segment_id),
            record.signal_quality,
            record.theta,
            u8::from(record.masked)
        ));
    }
}
