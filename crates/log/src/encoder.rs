use gazelog_common::{GazeTarget, RawSample, Record, SceneQuery, Vec2, ViewportProjector};

/// Turns raw tracker samples into fixed-shape records.
///
/// Carries the last tracked surface distance so every record has a defined
/// distance, even when the ray misses or raycasting is switched off.
pub struct SampleEncoder {
    raycast: bool,
    last_distance: f32,
}

impl SampleEncoder {
    pub fn new(raycast: bool) -> Self {
        Self {
            raycast,
            last_distance: 0.0,
        }
    }

    /// Encode one raw sample captured at session-relative `timestamp`.
    /// An absent sample yields no record, never a zero-filled one.
    pub fn encode(
        &mut self,
        raw: Option<RawSample>,
        timestamp: f64,
        scene: Option<&dyn SceneQuery>,
        projector: &dyn ViewportProjector,
    ) -> Option<Record> {
        let raw = raw?;

        let valid = raw.gaze_valid;
        // The viewport point is only meaningful on valid samples; invalid
        // ones keep the zero default and consumers gate on `valid`.
        let viewport_point = if valid {
            projector.project(raw.direction)
        } else {
            Vec2::ZERO
        };

        let mut object_name = GazeTarget::None;
        let mut distance = self.last_distance;
        if self.raycast {
            if let Some(hit) = scene.and_then(|s| s.cast(raw.origin, raw.direction)) {
                distance = hit.distance;
                self.last_distance = distance;
                object_name = GazeTarget::Object(hit.name);
            }
        } else {
            object_name = GazeTarget::NotTracked;
        }

        Some(Record {
            valid,
            timestamp,
            viewport_point,
            origin: raw.origin,
            direction: raw.direction,
            distance,
            object_name,
            pupils_valid: raw.left.pupil_valid && raw.right.pupil_valid,
            // Mean diameter in millimeters, computed regardless of validity.
            pupil_size: (raw.left.pupil_diameter + raw.right.pupil_diameter) / 2.0 * 1000.0,
        })
    }

    pub fn set_raycast(&mut self, enabled: bool) {
        self.raycast = enabled;
    }

    pub fn raycast(&self) -> bool {
        self.raycast
    }

    /// The distance that will be carried into the next record when nothing
    /// is hit.
    pub fn last_distance(&self) -> f32 {
        self.last_distance
    }
}
