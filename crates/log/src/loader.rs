use std::fs;

use gazelog_common::{GazeLogError, Record};
use tracing::{info, warn};

use crate::naming::LogNaming;

/// What the loader keeps when a record fails the validity filter.
#[derive(Clone, Copy, Debug)]
pub struct LoadOptions {
    /// Keep records that are neither gaze-valid nor pupil-valid, exposing
    /// blink and tracking-loss gaps in the timeline.
    pub load_invalid: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self { load_invalid: true }
    }
}

/// Accounting for one load call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Records appended to the sequence.
    pub loaded: usize,
    /// Records dropped by the validity filter.
    pub discarded: usize,
    /// Lines that failed to parse and were skipped.
    pub parse_errors: usize,
}

impl LoadReport {
    fn absorb(&mut self, other: LoadReport) {
        self.loaded += other.loaded;
        self.discarded += other.discarded;
        self.parse_errors += other.parse_errors;
    }
}

/// Reads rotated record log files back into one ordered in-memory sequence.
///
/// Read problems are reported and leave the sequence unchanged; a single
/// malformed line never rejects the rest of its file.
pub struct LogLoader {
    naming: LogNaming,
    options: LoadOptions,
    records: Vec<Record>,
    invalid_count: usize,
}

impl LogLoader {
    pub fn new(naming: LogNaming, options: LoadOptions) -> Self {
        Self {
            naming,
            options,
            records: Vec::new(),
            invalid_count: 0,
        }
    }

    /// Whether the rotation-suffixed file at `index` exists.
    pub fn file_exists(&self, index: u32) -> bool {
        self.naming.exists(index)
    }

    /// Load the file at `index`. With `append` false the in-memory sequence
    /// is replaced; with `append` true new records extend it, which is how
    /// rotated files concatenate into one timeline.
    pub fn load(&mut self, index: u32, append: bool) -> LoadReport {
        let path = self.naming.path(index);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                warn!(file = %path.display(), error = %e, "could not read record log");
                return LoadReport::default();
            }
        };
        if content.is_empty() {
            warn!(file = %path.display(), "record log is empty");
            return LoadReport::default();
        }

        if !append {
            self.records.clear();
            self.invalid_count = 0;
        }

        let mut report = LoadReport::default();
        for (line_no, line) in content.lines().enumerate() {
            match serde_json::from_str::<Record>(line) {
                Ok(record) => {
                    if record.valid || record.pupils_valid || self.options.load_invalid {
                        self.records.push(record);
                        report.loaded += 1;
                    } else {
                        self.invalid_count += 1;
                        report.discarded += 1;
                    }
                }
                Err(e) => {
                    report.parse_errors += 1;
                    let err = GazeLogError::Parse {
                        line: line_no + 1,
                        source: e,
                    };
                    warn!(file = %path.display(), error = %err, "skipping line");
                }
            }
        }

        info!(
            file = %path.display(),
            loaded = report.loaded,
            discarded = report.discarded,
            parse_errors = report.parse_errors,
            total = self.records.len(),
            "record log loaded"
        );
        report
    }

    /// Load index 0, 1, 2, … with append until an index is missing,
    /// producing one concatenated timeline across all rotated files.
    pub fn load_all(&mut self) -> LoadReport {
        self.records.clear();
        self.invalid_count = 0;

        let mut total = LoadReport::default();
        let mut index = 0;
        while self.file_exists(index) {
            total.absorb(self.load(index, true));
            index += 1;
        }
        total
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn get(&self, index: usize) -> Option<&Record> {
        self.records.get(index)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Invalid records discarded since the sequence was last replaced.
    pub fn invalid_count(&self) -> usize {
        self.invalid_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gazelog_common::GazeTarget;
    use std::io::Write;
    use tempfile::TempDir;

    fn naming(dir: &TempDir) -> LogNaming {
        LogNaming::new(dir.path(), "gaze_recording", "txt")
    }

    fn record(timestamp: f64, valid: bool, pupils_valid: bool) -> Record {
        Record {
            valid,
            timestamp,
            viewport_point: Default::default(),
            origin: Default::default(),
            direction: Default::default(),
            distance: 1.0,
            object_name: GazeTarget::None,
            pupils_valid,
            pupil_size: 3.0,
        }
    }

    fn write_lines(naming: &LogNaming, index: u32, records: &[Record]) {
        let mut file = fs::File::create(naming.path(index)).unwrap();
        for r in records {
            writeln!(file, "{}", serde_json::to_string(r).unwrap()).unwrap();
        }
    }

    #[test]
    fn load_replaces_then_appends() {
        let dir = TempDir::new().unwrap();
        let naming = naming(&dir);
        write_lines(&naming, 0, &[record(0.0, true, true)]);
        write_lines(&naming, 1, &[record(1.0, true, true), record(1.1, true, true)]);

        let mut loader = LogLoader::new(naming, LoadOptions::default());
        let report = loader.load(0, false);
        assert_eq!(report.loaded, 1);
        assert_eq!(loader.len(), 1);

        let report = loader.load(1, true);
        assert_eq!(report.loaded, 2);
        assert_eq!(loader.len(), 3);

        // Replacing again drops the appended records.
        loader.load(0, false);
        assert_eq!(loader.len(), 1);
    }

    #[test]
    fn malformed_lines_are_skipped_and_counted() {
        let dir = TempDir::new().unwrap();
        let naming = naming(&dir);
        let good = serde_json::to_string(&record(0.0, true, true)).unwrap();
        fs::write(
            naming.path(0),
            format!("{good}\nnot json at all\n{good}\n"),
        )
        .unwrap();

        let mut loader = LogLoader::new(naming, LoadOptions::default());
        let report = loader.load(0, false);
        assert_eq!(report.loaded, 2);
        assert_eq!(report.parse_errors, 1);
        assert_eq!(loader.len(), 2);
    }

    #[test]
    fn filter_discards_fully_invalid_records() {
        let dir = TempDir::new().unwrap();
        let naming = naming(&dir);
        write_lines(
            &naming,
            0,
            &[
                record(0.0, true, false),
                record(0.1, false, true),
                record(0.2, false, false),
            ],
        );

        let mut loader = LogLoader::new(
            naming,
            LoadOptions {
                load_invalid: false,
            },
        );
        let report = loader.load(0, false);
        assert_eq!(report.loaded, 2);
        assert_eq!(report.discarded, 1);
        assert_eq!(loader.invalid_count(), 1);
        assert!(loader.records().iter().all(|r| r.valid || r.pupils_valid));
    }

    #[test]
    fn missing_file_leaves_sequence_unchanged() {
        let dir = TempDir::new().unwrap();
        let naming = naming(&dir);
        write_lines(&naming, 0, &[record(0.0, true, true)]);

        let mut loader = LogLoader::new(naming, LoadOptions::default());
        loader.load(0, false);
        assert_eq!(loader.len(), 1);

        let report = loader.load(7, true);
        assert_eq!(report, LoadReport::default());
        assert_eq!(loader.len(), 1);
    }

    #[test]
    fn load_all_concatenates_until_gap() {
        let dir = TempDir::new().unwrap();
        let naming = naming(&dir);
        write_lines(&naming, 0, &[record(0.0, true, true)]);
        write_lines(&naming, 1, &[record(1.0, true, true)]);
        // Index 2 missing; index 3 must not be reached.
        write_lines(&naming, 3, &[record(3.0, true, true)]);

        let mut loader = LogLoader::new(naming, LoadOptions::default());
        let report = loader.load_all();
        assert_eq!(report.loaded, 2);
        assert_eq!(loader.len(), 2);
        assert_eq!(loader.get(1).unwrap().timestamp, 1.0);
    }
}
