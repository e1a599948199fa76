use gazelog_common::{GazeLogError, Record};
use gazelog_log::loader::LogLoader;
use tracing::{debug, info, warn};

/// How the cursor advances through the loaded sequence.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReplayMode {
    /// One record per tick.
    #[default]
    Step,
    /// Catch the current record's timestamp up to elapsed playback time.
    TimeSync,
}

#[derive(Clone, Copy, Debug)]
pub struct ReplayConfig {
    pub mode: ReplayMode,
    /// Rotation index of the file to load first.
    pub file_index: u32,
    /// Upper bound on catch-up iterations in one tick.
    pub catch_up_cap: u32,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            mode: ReplayMode::Step,
            file_index: 0,
            catch_up_cap: 10_000,
        }
    }
}

/// Timing telemetry for the host, sampled once per tick.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ReplayTelemetry {
    pub index: usize,
    pub count: usize,
    /// Accumulated playback time in seconds.
    pub elapsed: f64,
    /// Elapsed time minus the current record's session-relative timestamp;
    /// positive means playback is running ahead of the data.
    pub drift: f64,
    pub playing: bool,
    pub rewinding: bool,
}

/// Drives a "current record" through a loaded sequence, either by discrete
/// steps or by matching record timestamps against wall-clock elapsed time,
/// with pause and rewind.
///
/// All time parameters are the host's monotonic clock in seconds; the
/// cursor never reads a clock itself.
pub struct ReplayCursor {
    loader: LogLoader,
    config: ReplayConfig,
    file_index: u32,
    index: usize,
    /// Timestamp of the first record, subtracted from every comparison.
    start_time: f64,
    /// Host time at which playback last resumed or changed direction.
    resume_time: f64,
    /// Play time accumulated across pauses and direction changes.
    total_time: f64,
    playing: bool,
    rewinding: bool,
    initialized: bool,
}

impl ReplayCursor {
    pub fn new(loader: LogLoader, config: ReplayConfig) -> Self {
        Self {
            loader,
            file_index: config.file_index,
            config,
            index: 0,
            start_time: 0.0,
            resume_time: 0.0,
            total_time: 0.0,
            playing: false,
            rewinding: false,
            initialized: false,
        }
    }

    /// Load the configured file and point the cursor at its first record.
    /// Returns false when nothing usable was loaded, a recoverable state;
    /// callers simply retry on a later tick.
    pub fn initialize(&mut self) -> bool {
        if self.initialized {
            return true;
        }
        self.playing = false;

        self.loader.load(self.file_index, false);
        let Some(first) = self.loader.get(0) else {
            debug!(file = self.file_index, "no records to replay");
            return false;
        };

        self.index = 0;
        self.start_time = first.timestamp;
        self.resume_time = first.timestamp;
        self.total_time = 0.0;
        self.initialized = true;
        info!(
            file = self.file_index,
            records = self.loader.len(),
            "replay initialized"
        );
        true
    }

    /// One cooperative tick at host time `now`. Retries initialization if
    /// needed, advances while playing, and returns the current record.
    pub fn tick(&mut self, now: f64) -> Option<&Record> {
        if !self.initialized && !self.initialize() {
            return None;
        }
        if self.playing {
            match self.config.mode {
                ReplayMode::Step => self.step(),
                ReplayMode::TimeSync => {
                    if let Err(e) = self.sync_to_time(now) {
                        warn!(error = %e, "catch-up aborted for this tick");
                    }
                }
            }
        }
        self.loader.get(self.index)
    }

    /// Move one record in the rewind-aware direction, clamped to bounds.
    pub fn step(&mut self) {
        if self.rewinding {
            self.index = self.index.saturating_sub(1);
        } else if self.index + 1 < self.loader.len() {
            self.index += 1;
        }
    }

    /// Advance until the current record's session-relative timestamp has
    /// caught up with elapsed playback time, stopping at the sequence bound
    /// in the direction of travel. The loop is capped; an overrun aborts
    /// this tick's catch-up (playback itself continues next tick).
    pub fn sync_to_time(&mut self, now: f64) -> Result<(), GazeLogError> {
        let count = self.loader.len();
        if count == 0 {
            return Ok(());
        }

        let mut iterations: u32 = 0;
        while self.needs_sync(now) && self.in_bounds(count) {
            if iterations >= self.config.catch_up_cap {
                return Err(GazeLogError::CatchUpAborted {
                    cap: self.config.catch_up_cap,
                    index: self.index,
                });
            }
            iterations += 1;
            self.step();
        }
        Ok(())
    }

    fn in_bounds(&self, count: usize) -> bool {
        if self.rewinding {
            self.index > 0
        } else {
            self.index + 1 < count
        }
    }

    fn needs_sync(&self, now: f64) -> bool {
        let Some(record) = self.loader.get(self.index) else {
            return false;
        };
        let timestamp = record.timestamp - self.start_time;
        if self.rewinding {
            timestamp > self.elapsed(now)
        } else {
            timestamp < self.elapsed(now)
        }
    }

    /// Pause or resume playback. Pausing folds the open span into the
    /// accumulated total (negated while rewinding); resuming records the
    /// resume timestamp. Resuming an uninitialized cursor attempts
    /// initialization and stays paused on failure.
    pub fn toggle_replay(&mut self, now: f64) {
        self.playing = !self.playing;

        if self.playing {
            self.resume_time = now;
            if !self.initialized {
                self.playing = self.initialize();
            }
        } else {
            let span = now - self.resume_time;
            self.total_time += if self.rewinding { -span } else { span };
        }
    }

    /// Flip playback direction. The open span is folded into the total
    /// exactly as pausing would and the resume timestamp resets, so no
    /// elapsed time is lost or double-counted across the change.
    pub fn toggle_rewind(&mut self, now: f64) {
        if self.playing {
            let span = now - self.resume_time;
            self.total_time += if self.rewinding { -span } else { span };
        }
        self.rewinding = !self.rewinding;
        self.resume_time = now;
    }

    /// Total elapsed playback time as of `now`. While paused this is just
    /// the accumulated total.
    pub fn elapsed(&self, now: f64) -> f64 {
        if !self.playing {
            return self.total_time;
        }
        let span = now - self.resume_time;
        self.total_time + if self.rewinding { -span } else { span }
    }

    /// Switch to another rotated file; the target must exist. With `reload`
    /// the cursor re-initializes immediately. Returns whether the switch
    /// happened.
    pub fn set_file_index(&mut self, index: u32, reload: bool) -> bool {
        if !self.loader.file_exists(index) {
            warn!(index, "no data file at that index");
            return false;
        }
        self.file_index = index;
        if reload {
            self.initialized = false;
            return self.initialize();
        }
        true
    }

    /// Move to the next rotated file, if present.
    pub fn next_file(&mut self) -> bool {
        self.set_file_index(self.file_index + 1, true)
    }

    /// Move to the previous rotated file, if present.
    pub fn prev_file(&mut self) -> bool {
        if self.file_index == 0 {
            return false;
        }
        self.set_file_index(self.file_index - 1, true)
    }

    pub fn telemetry(&self, now: f64) -> ReplayTelemetry {
        let elapsed = self.elapsed(now);
        let drift = self
            .loader
            .get(self.index)
            .map(|r| elapsed - (r.timestamp - self.start_time))
            .unwrap_or(0.0);
        ReplayTelemetry {
            index: self.index,
            count: self.loader.len(),
            elapsed,
            drift,
            playing: self.playing,
            rewinding: self.rewinding,
        }
    }

    pub fn current(&self) -> Option<&Record> {
        self.loader.get(self.index)
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn file_index(&self) -> u32 {
        self.file_index
    }

    pub fn playing(&self) -> bool {
        self.playing
    }

    pub fn rewinding(&self) -> bool {
        self.rewinding
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn loader(&self) -> &LogLoader {
        &self.loader
    }
}
