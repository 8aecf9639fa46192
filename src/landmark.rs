//! Pose landmarks as delivered by the external pose estimator.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::geometry::Point;

/// Number of landmarks in a raw pose-model output.
pub const POSE_LANDMARK_COUNT: usize = 33;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Joint {
    Nose,
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
    LeftHeel,
    RightHeel,
    LeftFootIndex,
    RightFootIndex,
}

impl Joint {
    pub const ALL: [Joint; 17] = [
        Joint::Nose,
        Joint::LeftShoulder,
        Joint::RightShoulder,
        Joint::LeftElbow,
        Joint::RightElbow,
        Joint::LeftWrist,
        Joint::RightWrist,
        Joint::LeftHip,
        Joint::RightHip,
        Joint::LeftKnee,
        Joint::RightKnee,
        Joint::LeftAnkle,
        Joint::RightAnkle,
        Joint::LeftHeel,
        Joint::RightHeel,
        Joint::LeftFootIndex,
        Joint::RightFootIndex,
    ];

    /// Parses a landmark name such as `LEFT_ELBOW`.
    pub fn from_name(name: &str) -> Option<Joint> {
        use serde::de::{IntoDeserializer, value::Error, value::StrDeserializer};
        let de: StrDeserializer<'_, Error> = name.into_deserializer();
        Joint::deserialize(de).ok()
    }

    /// Position in the 33-entry pose model output.
    pub fn model_index(self) -> usize {
        match self {
            Joint::Nose => 0,
            Joint::LeftShoulder => 11,
            Joint::RightShoulder => 12,
            Joint::LeftElbow => 13,
            Joint::RightElbow => 14,
            Joint::LeftWrist => 15,
            Joint::RightWrist => 16,
            Joint::LeftHip => 23,
            Joint::RightHip => 24,
            Joint::LeftKnee => 25,
            Joint::RightKnee => 26,
            Joint::LeftAnkle => 27,
            Joint::RightAnkle => 28,
            Joint::LeftHeel => 29,
            Joint::RightHeel => 30,
            Joint::LeftFootIndex => 31,
            Joint::RightFootIndex => 32,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyPart {
    Shoulder,
    Elbow,
    Wrist,
    Hip,
    Knee,
    Ankle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Left,
    Right,
    /// Single tracker for symmetric exercises.
    Both,
}

impl Side {
    /// Joint on this side. `Both` resolves to the left joint; symmetric
    /// metrics name their joints explicitly instead.
    pub fn joint(self, part: BodyPart) -> Joint {
        let left = !matches!(self, Side::Right);
        match (part, left) {
            (BodyPart::Shoulder, true) => Joint::LeftShoulder,
            (BodyPart::Shoulder, false) => Joint::RightShoulder,
            (BodyPart::Elbow, true) => Joint::LeftElbow,
            (BodyPart::Elbow, false) => Joint::RightElbow,
            (BodyPart::Wrist, true) => Joint::LeftWrist,
            (BodyPart::Wrist, false) => Joint::RightWrist,
            (BodyPart::Hip, true) => Joint::LeftHip,
            (BodyPart::Hip, false) => Joint::RightHip,
            (BodyPart::Knee, true) => Joint::LeftKnee,
            (BodyPart::Knee, false) => Joint::RightKnee,
            (BodyPart::Ankle, true) => Joint::LeftAnkle,
            (BodyPart::Ankle, false) => Joint::RightAnkle,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub z: f32,
    /// A landmark sent without visibility never passes the gate.
    #[serde(default)]
    pub visibility: f32,
}

impl Landmark {
    #[cfg(test)]
    pub fn new(x: f32, y: f32, visibility: f32) -> Self {
        Self {
            x,
            y,
            z: 0.0,
            visibility,
        }
    }

    /// Image-plane position; depth is not used for joint angles.
    pub fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// Landmarks detected in one frame. Lives for one analysis call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LandmarkFrame {
    landmarks: HashMap<Joint, Landmark>,
}

impl LandmarkFrame {
    pub fn new() -> Self {
        Self::default()
    }

    /// Picks the known joints out of a raw pose-model output.
    pub fn from_model_output(raw: &[Landmark]) -> Option<Self> {
        if raw.len() != POSE_LANDMARK_COUNT {
            return None;
        }
        let landmarks = Joint::ALL
            .iter()
            .map(|j| (*j, raw[j.model_index()]))
            .collect();
        Some(Self { landmarks })
    }

    pub fn insert(&mut self, joint: Joint, landmark: Landmark) {
        self.landmarks.insert(joint, landmark);
    }

    pub fn get(&self, joint: Joint) -> Option<&Landmark> {
        self.landmarks.get(&joint)
    }

    pub fn point(&self, joint: Joint) -> Option<Point> {
        self.get(joint).map(Landmark::point)
    }

    pub fn is_empty(&self) -> bool {
        self.landmarks.is_empty()
    }
}

impl FromIterator<(Joint, Landmark)> for LandmarkFrame {
    fn from_iter<I: IntoIterator<Item = (Joint, Landmark)>>(iter: I) -> Self {
        Self {
            landmarks: iter.into_iter().collect(),
        }
    }
}
