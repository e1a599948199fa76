use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Vector types
// ---------------------------------------------------------------------------

/// Normalized viewport coordinates (0..1 on each axis when on screen).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// World-space position or direction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 { x: 0.0, y: 0.0, z: 0.0 };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Euclidean distance to another point.
    pub fn distance(self, other: Vec3) -> f32 {
        (other - self).length()
    }

    /// Linear interpolation towards `target` by fraction `t`.
    pub fn lerp(self, target: Vec3, t: f32) -> Vec3 {
        self + (target - self) * t
    }

    pub fn normalized(self) -> Vec3 {
        let len = self.length();
        if len > 0.0 {
            self * (1.0 / len)
        } else {
            Vec3::ZERO
        }
    }
}

impl std::ops::Add for Vec3 {
    type Output = Vec3;
    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl std::ops::Sub for Vec3 {
    type Output = Vec3;
    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl std::ops::Mul<f32> for Vec3 {
    type Output = Vec3;
    fn mul(self, rhs: f32) -> Vec3 {
        Vec3::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

// ---------------------------------------------------------------------------
// Gaze target: what the gaze ray intersected, if anything
// ---------------------------------------------------------------------------

/// Outcome of scene intersection for one sample.
///
/// Serialized as a plain string (`"None"`, `"Not Tracked"`, or the object
/// name) so the log format stays one flat JSON object per line.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum GazeTarget {
    /// Raycasting ran but nothing was hit.
    #[default]
    None,
    /// Raycasting was disabled by configuration.
    NotTracked,
    /// The named scene object was hit.
    Object(String),
}

impl From<GazeTarget> for String {
    fn from(target: GazeTarget) -> String {
        match target {
            GazeTarget::None => "None".to_string(),
            GazeTarget::NotTracked => "Not Tracked".to_string(),
            GazeTarget::Object(name) => name,
        }
    }
}

impl From<String> for GazeTarget {
    fn from(s: String) -> GazeTarget {
        match s.as_str() {
            "None" => GazeTarget::None,
            "Not Tracked" => GazeTarget::NotTracked,
            _ => GazeTarget::Object(s),
        }
    }
}

impl std::fmt::Display for GazeTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GazeTarget::None => write!(f, "None"),
            GazeTarget::NotTracked => write!(f, "Not Tracked"),
            GazeTarget::Object(name) => write!(f, "{}", name),
        }
    }
}

// ---------------------------------------------------------------------------
// Record: the unit of the gaze log
// ---------------------------------------------------------------------------

/// One encoded gaze sample. Immutable once built; appended to the log in
/// capture order, so timestamps are non-decreasing within one file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Whether `origin` and `direction` are meaningful.
    pub valid: bool,
    /// Session-relative capture time in seconds.
    pub timestamp: f64,
    /// Normalized screen-space projection of the gaze direction.
    /// Left at zero when `valid` is false; gate on the flag, not the value.
    pub viewport_point: Vec2,
    /// Eye/ray origin in world space.
    pub origin: Vec3,
    /// Normalized gaze direction.
    pub direction: Vec3,
    /// Distance to the intersected surface, or the last known value when
    /// nothing was hit. Always defined.
    pub distance: f32,
    /// What the gaze ray intersected.
    pub object_name: GazeTarget,
    /// Whether the pupil diameters were usable this sample.
    pub pupils_valid: bool,
    /// Mean of left/right pupil diameter in millimeters. Computed even when
    /// `pupils_valid` is false; gate on the flag, not the value.
    pub pupil_size: f32,
}

// ---------------------------------------------------------------------------
// Raw tracker sample: the input side of the pipeline
// ---------------------------------------------------------------------------

/// Per-eye measurement as reported by the tracker.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct EyeSample {
    pub pupil_valid: bool,
    /// Pupil diameter in meters.
    pub pupil_diameter: f32,
}

/// One raw sample from the tracker, before encoding.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RawSample {
    /// Whether the combined gaze ray is valid.
    pub gaze_valid: bool,
    /// Combined gaze ray origin in world space.
    pub origin: Vec3,
    /// Combined gaze ray direction in world space.
    pub direction: Vec3,
    pub left: EyeSample,
    pub right: EyeSample,
}

// ---------------------------------------------------------------------------
// Collaborator contracts: the core owns neither end of the pipeline
// ---------------------------------------------------------------------------

/// A tracker-side queue of raw samples. Every pending sample must be drained
/// each tick, even when discarded, so the queue never grows without bound.
pub trait SampleSource {
    fn connected(&self) -> bool;
    fn pending(&self) -> usize;
    /// Consume and return the next pending sample, if any.
    fn next_sample(&mut self) -> Option<RawSample>;
}

/// Result of casting a gaze ray into the scene.
#[derive(Clone, Debug, PartialEq)]
pub struct SceneHit {
    pub name: String,
    pub distance: f32,
}

/// Scene intersection service. The core never raycasts itself.
pub trait SceneQuery {
    fn cast(&self, origin: Vec3, direction: Vec3) -> Option<SceneHit>;
}

/// Maps a world-space gaze direction to a normalized viewport point.
/// Engine-specific camera transforms live behind this seam.
pub trait ViewportProjector {
    fn project(&self, direction: Vec3) -> Vec2;
}

/// Smoothed playback state handed to the render sink each tick.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SmoothedView {
    /// Smoothed world-space gaze point.
    pub position: Vec3,
    /// Pupil-derived scale; zero during a blink or tracking loss.
    pub scale: f32,
    /// True when pupil data was invalid or non-finite this record.
    pub blink: bool,
}

/// Visualization sink. Fire-and-forget; never fails.
pub trait RenderSink {
    fn present(&mut self, record: Option<&Record>, view: &SmoothedView);
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum GazeLogError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed record on line {line}: {source}")]
    Parse {
        line: usize,
        source: serde_json::Error,
    },

    #[error("data file limit reached ({max} rotated files); remove old recordings")]
    RotationExhausted { max: u32 },

    #[error("not ready: {0}")]
    NotReady(String),

    #[error("time-sync catch-up exceeded {cap} iterations at record {index}")]
    CatchUpAborted { cap: u32, index: usize },
}
