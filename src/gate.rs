use crate::landmark::{Joint, LandmarkFrame};

/// Passes a frame only when every required joint is confidently visible.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibilityGate {
    threshold: f32,
}

impl VisibilityGate {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    /// Strictly above the threshold; a missing joint fails the gate.
    pub fn passes(&self, frame: &LandmarkFrame, required: &[Joint]) -> bool {
        required.iter().all(|j| {
            frame
                .get(*j)
                .is_some_and(|lm| lm.visibility > self.threshold)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmark::Landmark;

    fn frame(vis: &[(Joint, f32)]) -> LandmarkFrame {
        vis.iter()
            .map(|(j, v)| (*j, Landmark::new(0.5, 0.5, *v)))
            .collect()
    }

    #[test]
    fn requires_strictly_greater() {
        let gate = VisibilityGate::new(0.65);
        let req = [Joint::RightShoulder, Joint::RightElbow];
        assert!(gate.passes(&frame(&[(Joint::RightShoulder, 0.9), (Joint::RightElbow, 0.66)]), &req));
        assert!(!gate.passes(&frame(&[(Joint::RightShoulder, 0.9), (Joint::RightElbow, 0.65)]), &req));
    }

    #[test]
    fn missing_joint_fails() {
        let gate = VisibilityGate::new(0.1);
        let f = frame(&[(Joint::LeftKnee, 1.0)]);
        assert!(!gate.passes(&f, &[Joint::LeftKnee, Joint::LeftAnkle]));
        assert!(gate.passes(&f, &[]));
    }

    #[test]
    fn unreported_visibility_fails() {
        let lm: Landmark = serde_json::from_str(r#"{"x": 0.5, "y": 0.5}"#).unwrap();
        let f: LandmarkFrame = [(Joint::LeftKnee, lm)].into_iter().collect();
        assert!(!VisibilityGate::new(0.0).passes(&f, &[Joint::LeftKnee]));
    }
}
