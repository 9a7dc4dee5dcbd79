//! Sources of the single target point a controller chases each frame.

use linkage_solver::geometry::Point2d;

/// Emits one 2D target per frame. `update_target` advances whatever
/// internal motion the provider has; `button_clicked` lets interactive
/// front ends reseed it.
pub trait TargetProvider {
    fn target(&self) -> Point2d;

    fn update_target(&mut self, sim_time: f64, delta_time: f64);

    fn button_clicked(&mut self, _x: f64, _y: f64) {}
}

/// Traverses a piecewise-linear path at constant speed, one full loop per
/// unit of simulation time.
#[derive(Debug, Clone)]
pub struct PathTargetProvider {
    points: Vec<Point2d>,
    segment_lengths: Vec<f64>,
    total_length: f64,
    current: Point2d,
}

impl PathTargetProvider {
    /// `loop_path` appends the first point so the path closes on itself.
    pub fn new(mut points: Vec<Point2d>, loop_path: bool) -> Self {
        assert!(
            points.len() >= 2,
            "a path needs at least two points to interpolate"
        );
        if loop_path {
            points.push(points[0]);
        }
        let segment_lengths: Vec<f64> = points
            .windows(2)
            .map(|pair| pair[0].distance_to(&pair[1]))
            .collect();
        let total_length = segment_lengths.iter().sum();
        let current = points[0];
        Self {
            points,
            segment_lengths,
            total_length,
            current,
        }
    }

    /// The point a fraction `t` of the way around the path, by arc length.
    pub fn point_at(&self, t: f64) -> Point2d {
        if self.total_length <= 0.0 {
            return self.points[0];
        }
        let distance = t.rem_euclid(1.0) * self.total_length;
        let mut travelled = 0.0;
        for (i, &segment_length) in self.segment_lengths.iter().enumerate() {
            if distance <= travelled + segment_length {
                let along = if segment_length > 0.0 {
                    (distance - travelled) / segment_length
                } else {
                    0.0
                };
                return self.points[i].lerp(&self.points[i + 1], along);
            }
            travelled += segment_length;
        }
        *self.points.last().unwrap_or(&self.points[0])
    }
}

impl TargetProvider for PathTargetProvider {
    fn target(&self) -> Point2d {
        self.current
    }

    fn update_target(&mut self, sim_time: f64, _delta_time: f64) {
        self.current = self.point_at(sim_time);
    }
}

/// Fraction of the remaining gap the click target closes per frame.
const CLICK_EASING: f64 = 0.1;

/// Eases the emitted target toward wherever the user last clicked.
#[derive(Debug, Clone)]
pub struct ClickTargetProvider {
    current: Point2d,
    clicked: Point2d,
}

impl ClickTargetProvider {
    pub fn new(initial: Point2d) -> Self {
        Self {
            current: initial,
            clicked: initial,
        }
    }
}

impl TargetProvider for ClickTargetProvider {
    fn target(&self) -> Point2d {
        self.current
    }

    fn update_target(&mut self, _sim_time: f64, _delta_time: f64) {
        self.current = self.current.lerp(&self.clicked, CLICK_EASING);
    }

    fn button_clicked(&mut self, x: f64, y: f64) {
        self.clicked = Point2d::new(x, y);
    }
}
