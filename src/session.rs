use std::path::PathBuf;

use serde::Deserialize;

use gazelog_log::loader::LoadOptions;
use gazelog_log::naming::LogNaming;
use gazelog_log::recorder::RecorderConfig;
use gazelog_replay::cursor::{ReplayConfig, ReplayMode};
use gazelog_replay::smoother::SmootherConfig;

/// Session configuration file, TOML. Every section and key is optional and
/// falls back to the recorder/replayer defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub data: DataSection,
    pub recorder: RecorderSection,
    pub loader: LoaderSection,
    pub replay: ReplaySection,
    pub smoothing: SmoothingSection,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DataSection {
    pub directory: PathBuf,
    pub base_name: String,
    pub extension: String,
    pub overwrite: bool,
    pub max_file_count: u32,
    pub flush_threshold: usize,
}

impl Default for DataSection {
    fn default() -> Self {
        let defaults = RecorderConfig::default();
        Self {
            directory: defaults.directory,
            base_name: defaults.base_name,
            extension: defaults.extension,
            overwrite: defaults.overwrite,
            max_file_count: defaults.max_file_count,
            flush_threshold: defaults.flush_threshold,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RecorderSection {
    pub raycast: bool,
}

impl Default for RecorderSection {
    fn default() -> Self {
        Self { raycast: true }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoaderSection {
    pub load_invalid: bool,
}

impl Default for LoaderSection {
    fn default() -> Self {
        Self { load_invalid: true }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ReplaySection {
    /// Sync playback to wall-clock elapsed time instead of stepping one
    /// record per tick.
    pub sync_time: bool,
    pub file_index: u32,
    pub catch_up_cap: u32,
}

impl Default for ReplaySection {
    fn default() -> Self {
        let defaults = ReplayConfig::default();
        Self {
            sync_time: false,
            file_index: defaults.file_index,
            catch_up_cap: defaults.catch_up_cap,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SmoothingSection {
    pub snap_floor: f32,
    pub snap_ceiling: f32,
    pub speed: f32,
    pub pupil_scale: f32,
}

impl Default for SmoothingSection {
    fn default() -> Self {
        let defaults = SmootherConfig::default();
        Self {
            snap_floor: defaults.snap_floor,
            snap_ceiling: defaults.snap_ceiling,
            speed: defaults.speed,
            pupil_scale: defaults.pupil_scale,
        }
    }
}

impl SessionConfig {
    pub fn recorder_config(&self) -> RecorderConfig {
        RecorderConfig {
            directory: self.data.directory.clone(),
            base_name: self.data.base_name.clone(),
            extension: self.data.extension.clone(),
            overwrite: self.data.overwrite,
            raycast: self.recorder.raycast,
            max_file_count: self.data.max_file_count,
            flush_threshold: self.data.flush_threshold,
        }
    }

    pub fn naming(&self) -> LogNaming {
        LogNaming::new(
            self.data.directory.clone(),
            &self.data.base_name,
            &self.data.extension,
        )
    }

    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            load_invalid: self.loader.load_invalid,
        }
    }

    pub fn replay_config(&self) -> ReplayConfig {
        ReplayConfig {
            mode: if self.replay.sync_time {
                ReplayMode::TimeSync
            } else {
                ReplayMode::Step
            },
            file_index: self.replay.file_index,
            catch_up_cap: self.replay.catch_up_cap,
        }
    }

    pub fn smoother_config(&self) -> SmootherConfig {
        SmootherConfig {
            snap_floor: self.smoothing.snap_floor,
            snap_ceiling: self.smoothing.snap_ceiling,
            speed: self.smoothing.speed,
            pupil_scale: self.smoothing.pupil_scale,
        }
    }
}

/// Read a session config from a TOML file.
pub fn load_session_config(path: &str) -> anyhow::Result<SessionConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: SessionConfig = toml::from_str(&content)?;
    Ok(config)
}
