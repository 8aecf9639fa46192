//! Joint angles and width ratios from image-plane landmark positions.

/// Rays shorter than this are treated as coincident points.
const MIN_RAY: f32 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// One unit straight down the image from this point.
    pub fn below(self) -> Point {
        Point::new(self.x, self.y + 1.0)
    }
}

/// Angle at `vertex` between the rays to `a` and `c`, in degrees [0, 180].
///
/// Difference of the two ray headings, folded over 180. NaN inputs give NaN.
pub fn angle(a: Point, vertex: Point, c: Point) -> f32 {
    let heading_c = (c.y - vertex.y).atan2(c.x - vertex.x);
    let heading_a = (a.y - vertex.y).atan2(a.x - vertex.x);
    let deg = (heading_c - heading_a).to_degrees().abs();
    if deg > 180.0 { 360.0 - deg } else { deg }
}

/// `angle` that rejects NaN coordinates and zero-length rays.
pub fn joint_angle(a: Point, vertex: Point, c: Point) -> Option<f32> {
    if vertex.distance(a) < MIN_RAY || vertex.distance(c) < MIN_RAY {
        return None;
    }
    let deg = angle(a, vertex, c);
    deg.is_finite().then_some(deg)
}

/// Angle between `vertex -> end` and the downward vertical through `vertex`.
pub fn plumb_angle(end: Point, vertex: Point) -> Option<f32> {
    joint_angle(end, vertex, vertex.below())
}

/// Length of segment `num` over length of segment `den`.
pub fn width_ratio(num: (Point, Point), den: (Point, Point)) -> Option<f32> {
    let d = den.0.distance(den.1);
    if !d.is_finite() || d < MIN_RAY {
        return None;
    }
    let r = num.0.distance(num.1) / d;
    r.is_finite().then_some(r)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: f32, y: f32) -> Point {
        Point::new(x, y)
    }

    #[test]
    fn straight_and_right_angles() {
        assert!((angle(p(0.0, 0.0), p(0.5, 0.0), p(1.0, 0.0)) - 180.0).abs() < 1e-3);
        assert!((angle(p(0.0, 0.0), p(0.5, 0.0), p(0.5, 0.5)) - 90.0).abs() < 1e-3);
    }

    #[test]
    fn symmetric_and_bounded() {
        let samples = [
            (p(0.1, 0.9), p(0.4, 0.4), p(0.9, 0.2)),
            (p(-3.0, 2.0), p(0.0, 0.0), p(-2.5, -1.0)),
            (p(0.7, 0.1), p(0.2, 0.3), p(0.6, 0.15)),
            (p(1.0, 0.0), p(0.0, 0.0), p(-1.0, -0.001)),
        ];
        for (a, b, c) in samples {
            let fwd = angle(a, b, c);
            let rev = angle(c, b, a);
            assert!((fwd - rev).abs() < 1e-3, "{fwd} vs {rev}");
            assert!((0.0..=180.0).contains(&fwd), "{fwd}");
        }
    }

    #[test]
    fn reflex_angles_fold() {
        // Headings 170 and -170 degrees apart by 340 raw, 20 folded.
        let a = p(-1.0, 0.176);
        let c = p(-1.0, -0.176);
        let deg = angle(a, p(0.0, 0.0), c);
        assert!((deg - 20.0).abs() < 0.1, "{deg}");
    }

    #[test]
    fn degenerate_inputs_are_undetermined() {
        assert!(angle(p(f32::NAN, 0.0), p(0.0, 0.0), p(1.0, 1.0)).is_nan());
        assert_eq!(joint_angle(p(f32::NAN, 0.0), p(0.0, 0.0), p(1.0, 1.0)), None);
        assert_eq!(joint_angle(p(0.2, 0.2), p(0.2, 0.2), p(1.0, 1.0)), None);
        assert_eq!(width_ratio((p(0.0, 0.0), p(1.0, 0.0)), (p(0.3, 0.3), p(0.3, 0.3))), None);
    }

    #[test]
    fn plumb_measures_from_vertical() {
        let shoulder = p(0.5, 0.3);
        assert!(plumb_angle(p(0.5, 0.6), shoulder).unwrap() < 1e-3);
        let sideways = plumb_angle(p(0.8, 0.3), shoulder).unwrap();
        assert!((sideways - 90.0).abs() < 1e-3);
    }

    #[test]
    fn ratio_of_widths() {
        let r = width_ratio((p(0.0, 0.0), p(0.6, 0.0)), (p(0.0, 0.0), p(0.3, 0.0))).unwrap();
        assert!((r - 2.0).abs() < 1e-5);
    }
}
