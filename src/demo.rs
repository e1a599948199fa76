//! Stand-ins for the external collaborators: a scripted sample source, a
//! panel-field scene query, a fixed-forward projector, and a console sink.

use std::collections::VecDeque;

use gazelog_common::{
    EyeSample, RawSample, Record, RenderSink, SampleSource, SceneHit, SceneQuery, SmoothedView,
    Vec2, Vec3, ViewportProjector,
};

/// Deterministic gaze sweep standing in for live tracker hardware.
///
/// The gaze pans left to right across the panel field, blinks around 40%
/// of the way through, and loses tracking entirely around 70%.
pub struct ScriptedSource {
    queue: VecDeque<RawSample>,
    duration: f64,
}

impl ScriptedSource {
    pub fn new(duration: f64) -> Self {
        Self {
            queue: VecDeque::new(),
            duration,
        }
    }

    /// Queue `count` samples for the tick at time `now`.
    pub fn emit(&mut self, now: f64, count: usize) {
        let phase = (now / self.duration).clamp(0.0, 1.0);
        let blink = (0.40..0.45).contains(&phase);
        let lost = (0.70..0.78).contains(&phase);

        for _ in 0..count {
            // Pan one radian end to end, centered on straight ahead.
            let angle = phase as f32 - 0.5;
            let direction = Vec3::new(angle.sin(), 0.0, angle.cos()).normalized();
            let eye = EyeSample {
                pupil_valid: !blink && !lost,
                pupil_diameter: 0.0035,
            };
            self.queue.push_back(RawSample {
                gaze_valid: !lost,
                origin: Vec3::new(0.0, 1.6, 0.0),
                direction,
                left: eye,
                right: eye,
            });
        }
    }
}

impl SampleSource for ScriptedSource {
    fn connected(&self) -> bool {
        true
    }

    fn pending(&self) -> usize {
        self.queue.len()
    }

    fn next_sample(&mut self) -> Option<RawSample> {
        self.queue.pop_front()
    }
}

/// A named axis-aligned square panel facing the origin down +z.
struct Panel {
    name: &'static str,
    center: Vec3,
    half_extent: f32,
}

/// Scene query over a handful of panels at different depths. The nearest
/// panel pierced by the ray wins.
pub struct PanelField {
    panels: Vec<Panel>,
}

impl PanelField {
    pub fn demo_room() -> Self {
        Self {
            panels: vec![
                Panel {
                    name: "left_poster",
                    center: Vec3::new(-1.2, 1.6, 2.5),
                    half_extent: 0.6,
                },
                Panel {
                    name: "screen",
                    center: Vec3::new(0.0, 1.6, 3.0),
                    half_extent: 0.8,
                },
                Panel {
                    name: "right_poster",
                    center: Vec3::new(1.2, 1.6, 2.5),
                    half_extent: 0.6,
                },
            ],
        }
    }
}

impl SceneQuery for PanelField {
    fn cast(&self, origin: Vec3, direction: Vec3) -> Option<SceneHit> {
        let mut best: Option<SceneHit> = None;
        for panel in &self.panels {
            if direction.z <= 0.0 {
                continue;
            }
            let t = (panel.center.z - origin.z) / direction.z;
            if t <= 0.0 {
                continue;
            }
            let point = origin + direction * t;
            if (point.x - panel.center.x).abs() <= panel.half_extent
                && (point.y - panel.center.y).abs() <= panel.half_extent
            {
                let distance = t * direction.length();
                if best.as_ref().map_or(true, |b| distance < b.distance) {
                    best = Some(SceneHit {
                        name: panel.name.to_string(),
                        distance,
                    });
                }
            }
        }
        best
    }
}

/// Projects gaze directions onto a z-forward virtual screen one unit out.
pub struct ForwardProjector;

impl ViewportProjector for ForwardProjector {
    fn project(&self, direction: Vec3) -> Vec2 {
        if direction.z <= 0.0 {
            return Vec2::ZERO;
        }
        // Perspective divide, then shift from [-0.5, 0.5] to [0, 1].
        Vec2::new(direction.x / direction.z + 0.5, direction.y / direction.z + 0.5)
    }
}

/// Prints replay progress, one line per target change plus blink edges.
pub struct ConsoleSink {
    last_target: Option<String>,
    last_blink: bool,
    pub presented: usize,
}

impl ConsoleSink {
    pub fn new() -> Self {
        Self {
            last_target: None,
            last_blink: false,
            presented: 0,
        }
    }
}

impl RenderSink for ConsoleSink {
    fn present(&mut self, record: Option<&Record>, view: &SmoothedView) {
        self.presented += 1;
        let Some(record) = record else {
            return;
        };

        if view.blink != self.last_blink {
            self.last_blink = view.blink;
            if view.blink {
                println!("  [{:8.3}s] blink", record.timestamp);
            }
        }

        let target = record.object_name.to_string();
        if self.last_target.as_deref() != Some(&target) {
            self.last_target = Some(target.clone());
            println!(
                "  [{:8.3}s] looking at {:<14} pos=({:.2}, {:.2}, {:.2}) dist={:.2}",
                record.timestamp,
                target,
                view.position.x,
                view.position.y,
                view.position.z,
                record.distance,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panel_field_hits_center_screen() {
        let field = PanelField::demo_room();
        let hit = field
            .cast(Vec3::new(0.0, 1.6, 0.0), Vec3::new(0.0, 0.0, 1.0))
            .unwrap();
        assert_eq!(hit.name, "screen");
        assert!((hit.distance - 3.0).abs() < 1e-5);
    }

    #[test]
    fn panel_field_misses_off_axis_rays() {
        let field = PanelField::demo_room();
        assert!(field
            .cast(Vec3::new(0.0, 1.6, 0.0), Vec3::new(0.0, 1.0, 0.0))
            .is_none());
    }

    #[test]
    fn scripted_source_drains_in_order() {
        let mut source = ScriptedSource::new(1.0);
        source.emit(0.0, 3);
        assert_eq!(source.pending(), 3);
        assert!(source.next_sample().is_some());
        assert_eq!(source.pending(), 2);
    }
}
