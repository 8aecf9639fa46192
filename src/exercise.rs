//! Per-exercise tables: which joints are tracked, which measurements drive
//! the counter and form checks, and the thresholds from the profile.

use serde::Serialize;
use std::str::FromStr;

use crate::config::Profile;
use crate::counter::{CounterConfig, Phase, Stage};
use crate::error::ConfigError;
use crate::form::{Band, Bands, DeviationRule, ErrorKind, PeakRule};
use crate::geometry::{joint_angle, plumb_angle, width_ratio};
use crate::landmark::{BodyPart, Joint, LandmarkFrame, Side};
use crate::posture::Verdict;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseKind {
    BicepCurl,
    Lunge,
    Squat,
    Plank,
}

impl ExerciseKind {
    pub const ALL: [ExerciseKind; 4] = [
        ExerciseKind::BicepCurl,
        ExerciseKind::Lunge,
        ExerciseKind::Squat,
        ExerciseKind::Plank,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ExerciseKind::BicepCurl => "bicep_curl",
            ExerciseKind::Lunge => "lunge",
            ExerciseKind::Squat => "squat",
            ExerciseKind::Plank => "plank",
        }
    }

    /// Posture classes in the classifier's output order.
    pub fn verdicts(self) -> &'static [Verdict] {
        match self {
            ExerciseKind::Plank => &[Verdict::Correct, Verdict::HighBack, Verdict::LowBack],
            _ => &[Verdict::Correct, Verdict::Leaning],
        }
    }
}

impl FromStr for ExerciseKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "bicep_curl" | "bicep" | "curl" => Ok(ExerciseKind::BicepCurl),
            "lunge" | "lunges" => Ok(ExerciseKind::Lunge),
            "squat" | "squats" => Ok(ExerciseKind::Squat),
            "plank" => Ok(ExerciseKind::Plank),
            _ => Err(ConfigError::UnknownExercise(s.to_string())),
        }
    }
}

/// Three joints with the angle measured at `vertex`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triple {
    pub a: Joint,
    pub vertex: Joint,
    pub c: Joint,
}

impl Triple {
    fn on(side: Side, a: BodyPart, vertex: BodyPart, c: BodyPart) -> Self {
        Self {
            a: side.joint(a),
            vertex: side.joint(vertex),
            c: side.joint(c),
        }
    }

    fn measure(&self, frame: &LandmarkFrame) -> Option<f32> {
        joint_angle(
            frame.point(self.a)?,
            frame.point(self.vertex)?,
            frame.point(self.c)?,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Metric {
    Angle(Triple),
    /// Mean of the same angle on both sides.
    MeanAngle(Triple, Triple),
    /// Segment `vertex -> end` against the vertical.
    Plumb { end: Joint, vertex: Joint },
    WidthRatio {
        num: (Joint, Joint),
        den: (Joint, Joint),
    },
}

impl Metric {
    pub fn joints(&self) -> Vec<Joint> {
        match *self {
            Metric::Angle(t) => vec![t.a, t.vertex, t.c],
            Metric::MeanAngle(l, r) => vec![l.a, l.vertex, l.c, r.a, r.vertex, r.c],
            Metric::Plumb { end, vertex } => vec![end, vertex],
            Metric::WidthRatio { num, den } => vec![num.0, num.1, den.0, den.1],
        }
    }

    pub fn is_ratio(&self) -> bool {
        matches!(self, Metric::WidthRatio { .. })
    }

    /// `None` when a joint is missing or the geometry is degenerate.
    pub fn measure(&self, frame: &LandmarkFrame) -> Option<f32> {
        match self {
            Metric::Angle(t) => t.measure(frame),
            Metric::MeanAngle(l, r) => Some((l.measure(frame)? + r.measure(frame)?) / 2.0),
            Metric::Plumb { end, vertex } => plumb_angle(frame.point(*end)?, frame.point(*vertex)?),
            Metric::WidthRatio { num, den } => width_ratio(
                (frame.point(num.0)?, frame.point(num.1)?),
                (frame.point(den.0)?, frame.point(den.1)?),
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NamedMetric {
    pub name: &'static str,
    pub metric: Metric,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeviationCheck {
    pub measure: NamedMetric,
    pub rule: DeviationRule,
}

/// One independently counted limb, or the whole body for symmetric exercises.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackerPlan {
    pub side: Side,
    pub required: Vec<Joint>,
    pub primary: NamedMetric,
    pub counter: CounterConfig,
    pub deviations: Vec<DeviationCheck>,
    pub peak: Option<PeakRule>,
}

impl TrackerPlan {
    fn new(
        side: Side,
        primary: NamedMetric,
        counter: CounterConfig,
        deviations: Vec<DeviationCheck>,
        peak: Option<PeakRule>,
    ) -> Result<Self, ConfigError> {
        counter.validate()?;
        let mut required = primary.metric.joints();
        for d in &deviations {
            required.extend(d.measure.metric.joints());
        }
        required.sort();
        required.dedup();
        Ok(Self {
            side,
            required,
            primary,
            counter,
            deviations,
            peak,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExercisePlan {
    pub kind: ExerciseKind,
    pub visibility: f32,
    pub posture_confidence: f32,
    pub trackers: Vec<TrackerPlan>,
}

fn unit(exercise: &'static str, field: &'static str, value: f32) -> Result<f32, ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(ConfigError::OutOfRange {
            exercise,
            field,
            value,
            range: "[0, 1]",
        })
    }
}

fn degrees(exercise: &'static str, field: &'static str, value: f32) -> Result<f32, ConfigError> {
    if value > 0.0 && value <= 180.0 {
        Ok(value)
    } else {
        Err(ConfigError::OutOfRange {
            exercise,
            field,
            value,
            range: "(0, 180]",
        })
    }
}

fn band(exercise: &'static str, field: &'static str, [min, max]: [f32; 2]) -> Result<Band, ConfigError> {
    if min.is_finite() && max.is_finite() && min >= 0.0 && min < max {
        Ok(Band::between(min, max))
    } else {
        Err(ConfigError::EmptyBand {
            exercise,
            field,
            min,
            max,
        })
    }
}

/// Each listed limb gets its own tracker, so a limb may appear once.
fn sides(exercise: &'static str, sides: &[Side]) -> Result<Vec<Side>, ConfigError> {
    let mut out = Vec::with_capacity(sides.len());
    for &side in sides {
        if side == Side::Both {
            return Err(ConfigError::SymmetricSide { exercise });
        }
        if out.contains(&side) {
            return Err(ConfigError::DuplicateSide { exercise, side });
        }
        out.push(side);
    }
    if out.is_empty() {
        return Err(ConfigError::NoSides { exercise });
    }
    Ok(out)
}

impl ExercisePlan {
    /// Builds and validates the tables for `kind` from `profile`.
    pub fn build(kind: ExerciseKind, profile: &Profile) -> Result<Self, ConfigError> {
        let ex = kind.name();
        match kind {
            ExerciseKind::BicepCurl => {
                let t = &profile.bicep_curl;
                let peak_at = degrees(ex, "peak_contraction", t.peak_contraction)?;
                let loose_at = degrees(ex, "loose_upper_arm", t.loose_upper_arm)?;
                let trackers = sides(ex, &t.sides)?
                    .into_iter()
                    .map(|side| {
                        TrackerPlan::new(
                            side,
                            NamedMetric {
                                name: "elbow",
                                metric: Metric::Angle(Triple::on(
                                    side,
                                    BodyPart::Shoulder,
                                    BodyPart::Elbow,
                                    BodyPart::Wrist,
                                )),
                            },
                            CounterConfig {
                                exercise: ex,
                                flexed_below: t.flexed_below,
                                extended_above: t.extended_above,
                                flexed_stage: Stage::Up,
                                count_on: Phase::Flexed,
                            },
                            vec![DeviationCheck {
                                measure: NamedMetric {
                                    name: "upper_arm",
                                    metric: Metric::Plumb {
                                        end: side.joint(BodyPart::Elbow),
                                        vertex: side.joint(BodyPart::Shoulder),
                                    },
                                },
                                rule: DeviationRule {
                                    kind: ErrorKind::LooseUpperArm,
                                    bands: Bands::Always(Band::at_most(loose_at)),
                                },
                            }],
                            Some(PeakRule {
                                kind: ErrorKind::PeakContraction,
                                threshold: peak_at,
                            }),
                        )
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Self {
                    kind,
                    visibility: unit(ex, "visibility", t.visibility)?,
                    posture_confidence: unit(ex, "posture_confidence", t.posture_confidence)?,
                    trackers,
                })
            }
            ExerciseKind::Lunge => {
                let t = &profile.lunge;
                let trackers = sides(ex, &t.sides)?
                    .into_iter()
                    .map(|side| {
                        TrackerPlan::new(
                            side,
                            NamedMetric {
                                name: "knee",
                                metric: Metric::Angle(Triple::on(
                                    side,
                                    BodyPart::Hip,
                                    BodyPart::Knee,
                                    BodyPart::Ankle,
                                )),
                            },
                            CounterConfig {
                                exercise: ex,
                                flexed_below: t.flexed_below,
                                extended_above: t.extended_above,
                                flexed_stage: Stage::Down,
                                count_on: Phase::Extended,
                            },
                            Vec::new(),
                            None,
                        )
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Self {
                    kind,
                    visibility: unit(ex, "visibility", t.visibility)?,
                    posture_confidence: unit(ex, "posture_confidence", t.posture_confidence)?,
                    trackers,
                })
            }
            ExerciseKind::Squat => {
                let t = &profile.squat;
                let feet = (Joint::LeftFootIndex, Joint::RightFootIndex);
                let deviations = vec![
                    DeviationCheck {
                        measure: NamedMetric {
                            name: "foot_shoulder_ratio",
                            metric: Metric::WidthRatio {
                                num: feet,
                                den: (Joint::LeftShoulder, Joint::RightShoulder),
                            },
                        },
                        rule: DeviationRule {
                            kind: ErrorKind::FootPlacement,
                            bands: Bands::Always(band(ex, "foot_shoulder_ratio", t.foot_shoulder_ratio)?),
                        },
                    },
                    DeviationCheck {
                        measure: NamedMetric {
                            name: "knee_foot_ratio",
                            metric: Metric::WidthRatio {
                                num: (Joint::LeftKnee, Joint::RightKnee),
                                den: feet,
                            },
                        },
                        rule: DeviationRule {
                            kind: ErrorKind::KneePlacement,
                            bands: Bands::ByStage {
                                up: band(ex, "knee_foot_ratio_up", t.knee_foot_ratio_up)?,
                                down: band(ex, "knee_foot_ratio_down", t.knee_foot_ratio_down)?,
                            },
                        },
                    },
                ];
                let knees = Metric::MeanAngle(
                    Triple::on(Side::Left, BodyPart::Hip, BodyPart::Knee, BodyPart::Ankle),
                    Triple::on(Side::Right, BodyPart::Hip, BodyPart::Knee, BodyPart::Ankle),
                );
                let tracker = TrackerPlan::new(
                    Side::Both,
                    NamedMetric {
                        name: "knee",
                        metric: knees,
                    },
                    CounterConfig {
                        exercise: ex,
                        flexed_below: t.flexed_below,
                        extended_above: t.extended_above,
                        flexed_stage: Stage::Down,
                        count_on: Phase::Extended,
                    },
                    deviations,
                    None,
                )?;
                Ok(Self {
                    kind,
                    visibility: unit(ex, "visibility", t.visibility)?,
                    posture_confidence: unit(ex, "posture_confidence", t.posture_confidence)?,
                    trackers: vec![tracker],
                })
            }
            ExerciseKind::Plank => {
                let t = &profile.plank;
                Ok(Self {
                    kind,
                    // no trackers to gate
                    visibility: 0.0,
                    posture_confidence: unit(ex, "posture_confidence", t.posture_confidence)?,
                    trackers: Vec::new(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmark::Landmark;

    #[test]
    fn parses_exercise_names() {
        assert_eq!("bicep-curl".parse::<ExerciseKind>().unwrap(), ExerciseKind::BicepCurl);
        assert_eq!("Lunges".parse::<ExerciseKind>().unwrap(), ExerciseKind::Lunge);
        assert!(matches!(
            "deadlift".parse::<ExerciseKind>(),
            Err(ConfigError::UnknownExercise(_))
        ));
    }

    #[test]
    fn curl_requires_arm_joints_per_side() {
        let plan = ExercisePlan::build(ExerciseKind::BicepCurl, &Profile::default()).unwrap();
        assert_eq!(plan.trackers.len(), 2);
        let right = plan.trackers.iter().find(|t| t.side == Side::Right).unwrap();
        assert_eq!(
            right.required,
            vec![Joint::RightShoulder, Joint::RightElbow, Joint::RightWrist]
        );
    }

    #[test]
    fn squat_is_one_symmetric_tracker() {
        let plan = ExercisePlan::build(ExerciseKind::Squat, &Profile::default()).unwrap();
        assert_eq!(plan.trackers.len(), 1);
        let t = &plan.trackers[0];
        assert_eq!(t.side, Side::Both);
        for j in [Joint::LeftShoulder, Joint::RightKnee, Joint::LeftFootIndex, Joint::RightHip] {
            assert!(t.required.contains(&j), "{j:?}");
        }
        assert_eq!(t.deviations.len(), 2);
    }

    #[test]
    fn sides_must_be_distinct_limbs() {
        let mut p = Profile::default();
        p.bicep_curl.sides = vec![Side::Left, Side::Right, Side::Left];
        assert_eq!(
            ExercisePlan::build(ExerciseKind::BicepCurl, &p).unwrap_err(),
            ConfigError::DuplicateSide {
                exercise: "bicep_curl",
                side: Side::Left
            }
        );
        p.lunge.sides = vec![Side::Right, Side::Both];
        assert_eq!(
            ExercisePlan::build(ExerciseKind::Lunge, &p).unwrap_err(),
            ConfigError::SymmetricSide { exercise: "lunge" }
        );
    }

    #[test]
    fn plank_only_classifies() {
        let plan = ExercisePlan::build(ExerciseKind::Plank, &Profile::default()).unwrap();
        assert!(plan.trackers.is_empty());
        assert_eq!(ExerciseKind::Plank.verdicts().len(), 3);
    }

    #[test]
    fn mean_knee_angle() {
        let frame: LandmarkFrame = [
            (Joint::LeftHip, Landmark::new(0.4, 0.4, 1.0)),
            (Joint::LeftKnee, Landmark::new(0.4, 0.6, 1.0)),
            (Joint::LeftAnkle, Landmark::new(0.4, 0.8, 1.0)),
            (Joint::RightHip, Landmark::new(0.6, 0.4, 1.0)),
            (Joint::RightKnee, Landmark::new(0.6, 0.6, 1.0)),
            (Joint::RightAnkle, Landmark::new(0.8, 0.6, 1.0)),
        ]
        .into_iter()
        .collect();
        let m = Metric::MeanAngle(
            Triple::on(Side::Left, BodyPart::Hip, BodyPart::Knee, BodyPart::Ankle),
            Triple::on(Side::Right, BodyPart::Hip, BodyPart::Knee, BodyPart::Ankle),
        );
        assert!((m.measure(&frame).unwrap() - 135.0).abs() < 1e-3);
    }
}
