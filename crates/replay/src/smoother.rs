use gazelog_common::{Record, SmoothedView, Vec3};

/// Thresholds and speed for gaze point smoothing.
#[derive(Clone, Copy, Debug)]
pub struct SmootherConfig {
    /// Distances above this snap instead of easing.
    pub snap_floor: f32,
    /// Distances above this always snap, regardless of the floor.
    pub snap_ceiling: f32,
    /// Fraction of the remaining distance covered per tick when easing.
    pub speed: f32,
    /// Multiplier from pupil millimeters to render scale.
    pub pupil_scale: f32,
}

impl Default for SmootherConfig {
    fn default() -> Self {
        Self {
            snap_floor: 0.05,
            snap_ceiling: 1.0,
            speed: 0.5,
            pupil_scale: 0.1,
        }
    }
}

/// Exponential-approach-with-snap filter over the replayed gaze point.
///
/// The target point only moves on valid records, so during a tracking gap
/// the displayed point eases toward (or holds) the last good position.
pub struct PositionSmoother {
    config: SmootherConfig,
    position: Vec3,
    target: Vec3,
}

impl PositionSmoother {
    pub fn new(config: SmootherConfig) -> Self {
        Self {
            config,
            position: Vec3::ZERO,
            target: Vec3::ZERO,
        }
    }

    /// Fold one replayed record into the smoothed view.
    pub fn update(&mut self, record: &Record) -> SmoothedView {
        if record.valid {
            self.target = record.origin + record.direction * record.distance;
        }

        let delta = self.position.distance(self.target);
        if delta > self.config.snap_floor || delta > self.config.snap_ceiling {
            self.position = self.target;
        } else {
            self.position = self.position.lerp(self.target, self.config.speed);
        }

        // A blink must zero the scale rather than freeze a stale value.
        let blink = !record.pupils_valid || !record.pupil_size.is_finite();
        let scale = if blink {
            0.0
        } else {
            record.pupil_size * self.config.pupil_scale
        };

        SmoothedView {
            position: self.position,
            scale,
            blink,
        }
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gazelog_common::GazeTarget;

    fn record_at(target: Vec3, valid: bool) -> Record {
        // Unit direction along x so origin + direction * distance == target.
        Record {
            valid,
            timestamp: 0.0,
            viewport_point: Default::default(),
            origin: Vec3::new(target.x - 1.0, target.y, target.z),
            direction: Vec3::new(1.0, 0.0, 0.0),
            distance: 1.0,
            object_name: GazeTarget::None,
            pupils_valid: true,
            pupil_size: 4.0,
        }
    }

    #[test]
    fn large_jump_snaps_to_target() {
        let mut smoother = PositionSmoother::new(SmootherConfig::default());
        let target = Vec3::new(3.0, 0.0, 0.0);
        let view = smoother.update(&record_at(target, true));
        assert_eq!(view.position, target);
    }

    #[test]
    fn small_delta_eases_toward_target() {
        let config = SmootherConfig {
            snap_floor: 0.1,
            snap_ceiling: 2.0,
            speed: 0.5,
            pupil_scale: 0.1,
        };
        let mut smoother = PositionSmoother::new(config);

        // Settle on a starting point first.
        smoother.update(&record_at(Vec3::new(1.0, 0.0, 0.0), true));
        assert_eq!(smoother.position(), Vec3::new(1.0, 0.0, 0.0));

        // A 0.08 move is under the floor: ease half-way, not snap.
        let view = smoother.update(&record_at(Vec3::new(1.08, 0.0, 0.0), true));
        assert!((view.position.x - 1.04).abs() < 1e-5);
    }

    #[test]
    fn invalid_record_keeps_previous_target() {
        let mut smoother = PositionSmoother::new(SmootherConfig::default());
        let target = Vec3::new(2.0, 0.0, 0.0);
        smoother.update(&record_at(target, true));

        let view = smoother.update(&record_at(Vec3::new(9.0, 9.0, 9.0), false));
        assert_eq!(view.position, target);
    }

    #[test]
    fn blink_zeroes_scale() {
        let mut smoother = PositionSmoother::new(SmootherConfig::default());

        let mut record = record_at(Vec3::new(1.0, 0.0, 0.0), true);
        let view = smoother.update(&record);
        assert!(!view.blink);
        assert!((view.scale - 0.4).abs() < 1e-5);

        record.pupils_valid = false;
        let view = smoother.update(&record);
        assert!(view.blink);
        assert_eq!(view.scale, 0.0);

        record.pupils_valid = true;
        record.pupil_size = f32::NAN;
        let view = smoother.update(&record);
        assert!(view.blink);
        assert_eq!(view.scale, 0.0);
    }
}
