use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};

use gazelog_common::{GazeLogError, Record};
use tracing::{debug, info, warn};

use crate::naming::LogNaming;

/// One start/stop recording cycle: an in-memory record buffer plus the
/// session's target file under the rotation/overwrite policy.
///
/// The active file name is chosen once when the session begins; every flush
/// appends to that same file, which is what keeps timestamps monotone
/// within one log file.
pub struct RecordingSession {
    naming: LogNaming,
    buffer: Vec<Record>,
    file_index: u32,
    overwrite: bool,
    /// The base file is deleted at most once per session.
    overwritten: bool,
    /// Set when the rotation probe ran past `max_file_count`.
    exhausted: bool,
    max_file_count: u32,
    flush_threshold: usize,
    flush_count: u32,
    records_written: u64,
}

impl RecordingSession {
    /// Start a session: create the data directory and resolve the active
    /// file name. With overwrite off and the base file present, the first
    /// unused `(<i>)` suffix becomes this session's file. A probe past
    /// `max_file_count` leaves the session refusing flushes.
    pub fn begin(
        naming: LogNaming,
        overwrite: bool,
        max_file_count: u32,
        flush_threshold: usize,
    ) -> Result<Self, GazeLogError> {
        fs::create_dir_all(naming.directory())?;

        let mut file_index = 0;
        let mut exhausted = false;
        if !overwrite && naming.exists(0) {
            file_index = 1;
            while naming.exists(file_index) {
                file_index += 1;
                if file_index > max_file_count {
                    exhausted = true;
                    warn!(
                        max = max_file_count,
                        dir = %naming.directory().display(),
                        "data file limit reached; this session will not write"
                    );
                    break;
                }
            }
        }

        if !exhausted {
            info!(file = %naming.file_name(file_index), "recording session started");
        }

        Ok(Self {
            naming,
            buffer: Vec::new(),
            file_index,
            overwrite,
            overwritten: false,
            exhausted,
            max_file_count,
            flush_threshold,
            flush_count: 0,
            records_written: 0,
        })
    }

    /// Queue a record for the next flush; `None` is a no-op. Once the buffer
    /// has reached the flush threshold, pending lines are written out before
    /// the new record is accepted, bounding memory use.
    ///
    /// The record is buffered even when that opportunistic flush fails, so
    /// nothing is dropped; the error is returned for reporting.
    pub fn enqueue(&mut self, record: Option<Record>) -> Result<(), GazeLogError> {
        let Some(record) = record else {
            return Ok(());
        };

        let flushed = if self.buffer.len() >= self.flush_threshold {
            self.flush().map(|_| ())
        } else {
            Ok(())
        };
        self.buffer.push(record);
        flushed
    }

    /// Append every buffered record to the session file as one JSON line
    /// each. The buffer is cleared only after all lines are written, so a
    /// failed flush is retried in full next time. Returns the number of
    /// lines written.
    pub fn flush(&mut self) -> Result<usize, GazeLogError> {
        if self.buffer.is_empty() {
            return Ok(0);
        }
        if self.exhausted {
            return Err(GazeLogError::RotationExhausted {
                max: self.max_file_count,
            });
        }

        if self.overwrite && !self.overwritten {
            self.overwritten = true;
            let base = self.naming.path(0);
            if base.exists() {
                fs::remove_file(&base)?;
            }
        }

        let path = self.naming.path(self.file_index);
        // File handle closes on every exit path, including write errors.
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let mut writer = BufWriter::new(file);
        for record in &self.buffer {
            let line = serde_json::to_string(record)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
            writer.write_all(line.as_bytes())?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;

        let written = self.buffer.len();
        self.buffer.clear();
        self.flush_count += 1;
        self.records_written += written as u64;
        debug!(lines = written, file = %path.display(), "flushed record buffer");
        Ok(written)
    }

    /// End the session with a final flush so no buffered records are lost.
    pub fn finish(mut self) -> Result<usize, GazeLogError> {
        let written = self.flush()?;
        info!(
            file = %self.naming.file_name(self.file_index),
            records = self.records_written,
            flushes = self.flush_count,
            "recording session closed"
        );
        Ok(written)
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Rotation index of this session's active file.
    pub fn file_index(&self) -> u32 {
        self.file_index
    }

    pub fn file_name(&self) -> String {
        self.naming.file_name(self.file_index)
    }

    pub fn flush_count(&self) -> u32 {
        self.flush_count
    }

    pub fn records_written(&self) -> u64 {
        self.records_written
    }

    pub fn exhausted(&self) -> bool {
        self.exhausted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gazelog_common::GazeTarget;
    use tempfile::TempDir;

    fn naming(dir: &TempDir) -> LogNaming {
        LogNaming::new(dir.path(), "gaze_recording", "txt")
    }

    fn record(timestamp: f64) -> Record {
        Record {
            valid: true,
            timestamp,
            viewport_point: Default::default(),
            origin: Default::default(),
            direction: Default::default(),
            distance: 1.0,
            object_name: GazeTarget::None,
            pupils_valid: true,
            pupil_size: 3.5,
        }
    }

    #[test]
    fn flush_writes_one_line_per_record() {
        let dir = TempDir::new().unwrap();
        let mut session = RecordingSession::begin(naming(&dir), false, 100, 500).unwrap();

        session.enqueue(Some(record(0.0))).unwrap();
        session.enqueue(Some(record(0.1))).unwrap();
        session.enqueue(None).unwrap();
        assert_eq!(session.buffered(), 2);

        let written = session.flush().unwrap();
        assert_eq!(written, 2);
        assert_eq!(session.buffered(), 0);
        assert_eq!(session.flush_count(), 1);

        let content = fs::read_to_string(naming(&dir).path(0)).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert!(content.ends_with('\n'));
    }

    #[test]
    fn threshold_flushes_before_accepting_more() {
        let dir = TempDir::new().unwrap();
        let mut session = RecordingSession::begin(naming(&dir), false, 100, 2).unwrap();

        session.enqueue(Some(record(0.0))).unwrap();
        session.enqueue(Some(record(0.1))).unwrap();
        assert_eq!(session.flush_count(), 0);

        // Third record trips the threshold: two lines written, one buffered.
        session.enqueue(Some(record(0.2))).unwrap();
        assert_eq!(session.flush_count(), 1);
        assert_eq!(session.buffered(), 1);

        let content = fs::read_to_string(naming(&dir).path(0)).unwrap();
        assert_eq!(content.lines().count(), 2);
    }

    #[test]
    fn rotation_probe_picks_first_unused_suffix() {
        let dir = TempDir::new().unwrap();
        let naming = naming(&dir);
        fs::write(naming.path(0), "x\n").unwrap();
        fs::write(naming.path(1), "x\n").unwrap();

        let session = RecordingSession::begin(naming.clone(), false, 100, 500).unwrap();
        assert_eq!(session.file_index(), 2);
        assert_eq!(session.file_name(), "gaze_recording(2).txt");
    }

    #[test]
    fn overwrite_deletes_base_once() {
        let dir = TempDir::new().unwrap();
        let naming = naming(&dir);
        fs::write(naming.path(0), "stale\n").unwrap();

        let mut session = RecordingSession::begin(naming.clone(), true, 100, 500).unwrap();
        assert_eq!(session.file_index(), 0);

        session.enqueue(Some(record(0.0))).unwrap();
        session.flush().unwrap();
        let after_first = fs::read_to_string(naming.path(0)).unwrap();
        assert_eq!(after_first.lines().count(), 1);
        assert!(!after_first.contains("stale"));

        // A second flush must append, not re-delete.
        session.enqueue(Some(record(0.1))).unwrap();
        session.flush().unwrap();
        let after_second = fs::read_to_string(naming.path(0)).unwrap();
        assert_eq!(after_second.lines().count(), 2);
    }

    #[test]
    fn exhausted_probe_refuses_flushes() {
        let dir = TempDir::new().unwrap();
        let naming = naming(&dir);
        fs::write(naming.path(0), "x\n").unwrap();
        fs::write(naming.path(1), "x\n").unwrap();
        fs::write(naming.path(2), "x\n").unwrap();

        let mut session = RecordingSession::begin(naming, false, 2, 500).unwrap();
        assert!(session.exhausted());

        session.enqueue(Some(record(0.0))).unwrap();
        match session.flush() {
            Err(GazeLogError::RotationExhausted { max }) => assert_eq!(max, 2),
            other => panic!("expected RotationExhausted, got {:?}", other.map(|_| ())),
        }
        // The record stays buffered for the caller to inspect.
        assert_eq!(session.buffered(), 1);
    }

    #[test]
    fn finish_flushes_remaining_records() {
        let dir = TempDir::new().unwrap();
        let naming = naming(&dir);

        let mut session = RecordingSession::begin(naming.clone(), false, 100, 500).unwrap();
        session.enqueue(Some(record(0.0))).unwrap();
        let written = session.finish().unwrap();
        assert_eq!(written, 1);

        let content = fs::read_to_string(naming.path(0)).unwrap();
        assert_eq!(content.lines().count(), 1);
    }
}
