use std::path::PathBuf;

use gazelog_common::{GazeLogError, SampleSource, SceneQuery, ViewportProjector};
use tracing::{debug, info, warn};

use crate::encoder::SampleEncoder;
use crate::naming::LogNaming;
use crate::writer::RecordingSession;

/// Recorder configuration. Rotation and overwrite are evaluated once per
/// session, at start.
#[derive(Clone, Debug)]
pub struct RecorderConfig {
    pub directory: PathBuf,
    pub base_name: String,
    pub extension: String,
    /// Delete the base file at session start instead of rotating.
    pub overwrite: bool,
    /// Collect object name and distance by casting into the scene.
    pub raycast: bool,
    /// Highest rotation suffix the probe may assign.
    pub max_file_count: u32,
    /// Buffer length at which a flush happens before further enqueues.
    pub flush_threshold: usize,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("gaze-data"),
            base_name: "gaze_recording".to_string(),
            extension: "txt".to_string(),
            overwrite: false,
            raycast: true,
            max_file_count: 100,
            flush_threshold: 500,
        }
    }
}

/// Drives the capture side of the pipeline. Each tick drains every pending
/// sample from the source (recording or not, so the tracker queue never
/// backs up) and, while a session is open, encodes and buffers them.
pub struct Recorder {
    config: RecorderConfig,
    encoder: SampleEncoder,
    session: Option<RecordingSession>,
    /// Caller-supplied base name override, kept for subsequent sessions.
    session_name: Option<String>,
}

impl Recorder {
    pub fn new(config: RecorderConfig) -> Self {
        let encoder = SampleEncoder::new(config.raycast);
        Self {
            config,
            encoder,
            session: None,
            session_name: None,
        }
    }

    pub fn recording(&self) -> bool {
        self.session.is_some()
    }

    /// Open a recording session under the configured base name.
    /// Already recording is a no-op.
    pub fn start_recording(&mut self) -> Result<(), GazeLogError> {
        if self.session.is_some() {
            return Ok(());
        }

        let base_name = self
            .session_name
            .as_deref()
            .unwrap_or(&self.config.base_name);
        let naming = LogNaming::new(self.config.directory.clone(), base_name, &self.config.extension);
        let session = RecordingSession::begin(
            naming,
            self.config.overwrite,
            self.config.max_file_count,
            self.config.flush_threshold,
        )?;
        self.session = Some(session);
        info!("recording started");
        Ok(())
    }

    /// Open a recording session under a caller-supplied base name. The name
    /// is trimmed; an empty name falls back to the configured default. The
    /// override sticks for later sessions until replaced.
    pub fn start_recording_as(&mut self, name: &str) -> Result<(), GazeLogError> {
        let name = name.trim();
        if !name.is_empty() {
            self.session_name = Some(name.to_string());
        }
        self.start_recording()
    }

    /// Close the session with a final flush. Returns the records written by
    /// that flush; not recording is a no-op.
    pub fn stop_recording(&mut self) -> Result<usize, GazeLogError> {
        match self.session.take() {
            Some(session) => {
                let written = session.finish()?;
                info!("recording stopped");
                Ok(written)
            }
            None => Ok(0),
        }
    }

    pub fn toggle_recording(&mut self) -> Result<(), GazeLogError> {
        if self.recording() {
            self.stop_recording()?;
        } else {
            self.start_recording()?;
        }
        info!(recording = self.recording(), "recording toggled");
        Ok(())
    }

    /// One cooperative tick at session-relative time `now`. Returns the
    /// number of samples drained. Flush failures are reported and leave the
    /// records buffered for the next attempt; they never end the session.
    pub fn tick(
        &mut self,
        now: f64,
        source: &mut dyn SampleSource,
        scene: Option<&dyn SceneQuery>,
        projector: &dyn ViewportProjector,
    ) -> usize {
        if !source.connected() {
            return 0;
        }

        let mut drained = 0;
        while source.pending() > 0 {
            let raw = source.next_sample();
            drained += 1;

            if let Some(session) = self.session.as_mut() {
                let record = self.encoder.encode(raw, now, scene, projector);
                if let Err(e) = session.enqueue(record) {
                    match e {
                        GazeLogError::RotationExhausted { .. } => {
                            // Already reported once at session start.
                            debug!("flush refused: {e}");
                        }
                        _ => warn!(error = %e, "flush failed; records stay buffered"),
                    }
                }
            }
        }
        drained
    }

    /// Records currently buffered in the open session.
    pub fn buffered(&self) -> usize {
        self.session.as_ref().map_or(0, RecordingSession::buffered)
    }

    pub fn session(&self) -> Option<&RecordingSession> {
        self.session.as_ref()
    }

    pub fn encoder(&self) -> &SampleEncoder {
        &self.encoder
    }
}
