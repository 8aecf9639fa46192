//! JSON-lines frame input and event output.

use anyhow::Result;
use log::{info, warn};
use serde::Deserialize;
use std::{
    collections::HashMap,
    io::{self, BufRead, Write},
    sync::atomic::{AtomicBool, Ordering},
};

use crate::error::InputError;
use crate::landmark::{Joint, Landmark, LandmarkFrame};
use crate::posture::Classification;
use crate::session::Session;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawLandmarks {
    /// Raw pose-model output, indexed by model landmark number.
    Model(Vec<Landmark>),
    Named(HashMap<String, Landmark>),
}

#[derive(Debug, Deserialize)]
struct RawLine {
    #[serde(default)]
    landmarks: Option<RawLandmarks>,
    #[serde(default)]
    classification: Option<Classification>,
    #[serde(default)]
    reset: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StreamItem {
    Frame {
        /// `None` when the pose source found no subject.
        landmarks: Option<LandmarkFrame>,
        classification: Option<Classification>,
    },
    Reset,
}

/// Parses one input line; blank lines yield `None`.
pub fn parse_line(line_no: usize, line: &str) -> Result<Option<StreamItem>, InputError> {
    if line.trim().is_empty() {
        return Ok(None);
    }
    let raw: RawLine = serde_json::from_str(line).map_err(|source| InputError::Malformed {
        line: line_no,
        source,
    })?;
    if raw.reset {
        return Ok(Some(StreamItem::Reset));
    }

    let landmarks = match raw.landmarks {
        None => None,
        Some(RawLandmarks::Model(v)) if v.is_empty() => None,
        Some(RawLandmarks::Model(v)) => Some(LandmarkFrame::from_model_output(&v).ok_or(
            InputError::LandmarkCount {
                line: line_no,
                len: v.len(),
            },
        )?),
        // names outside the tracked set (ears, eyes, ...) are dropped
        Some(RawLandmarks::Named(m)) => {
            let mut frame = LandmarkFrame::new();
            for (name, lm) in m {
                if let Some(j) = Joint::from_name(&name) {
                    frame.insert(j, lm);
                }
            }
            Some(frame)
        }
    };

    Ok(Some(StreamItem::Frame {
        landmarks,
        classification: raw.classification,
    }))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamStats {
    pub frames: u64,
    pub skipped: u64,
    pub resets: u64,
}

/// Feeds every frame of `input` through `session`, writing one event per
/// line to `out`. Stops early once `stop` is raised.
pub fn run<R: BufRead, W: Write>(
    session: &mut Session,
    input: R,
    mut out: W,
    strict: bool,
    stop: &AtomicBool,
) -> Result<StreamStats> {
    let mut stats = StreamStats::default();

    for (idx, line) in input.lines().enumerate() {
        if stop.load(Ordering::Relaxed) {
            info!("stream: stop requested");
            break;
        }
        let parsed = match line {
            Ok(line) => parse_line(idx + 1, &line),
            Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                Err(InputError::Encoding { line: idx + 1 })
            }
            Err(e) => return Err(e.into()),
        };
        let item = match parsed {
            Ok(Some(item)) => item,
            Ok(None) => continue,
            Err(e) if strict => return Err(e.into()),
            Err(e) => {
                warn!("skipping frame: {e}");
                stats.skipped += 1;
                continue;
            }
        };

        match item {
            StreamItem::Reset => {
                session.reset();
                stats.resets += 1;
            }
            StreamItem::Frame {
                landmarks,
                classification,
            } => {
                let event = session.analyze(landmarks.as_ref(), classification.as_ref());
                serde_json::to_writer(&mut out, &event)?;
                out.write_all(b"\n")?;
                out.flush()?;
                stats.frames += 1;
            }
        }
    }
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Profile;
    use crate::exercise::{ExerciseKind, ExercisePlan};
    use crate::posture::ClassLabel;
    use serde_json::{Value, json};

    fn curl_session() -> Session {
        let mut p = Profile::default();
        p.bicep_curl.sides = vec![crate::landmark::Side::Right];
        Session::new(ExercisePlan::build(ExerciseKind::BicepCurl, &p).unwrap()).unwrap()
    }

    fn curl_line(wrist: (f32, f32), cls: Value) -> String {
        json!({
            "landmarks": {
                "RIGHT_SHOULDER": {"x": 0.5, "y": 0.3, "visibility": 0.9},
                "RIGHT_ELBOW": {"x": 0.5, "y": 0.5, "visibility": 0.9},
                "RIGHT_WRIST": {"x": wrist.0, "y": wrist.1, "visibility": 0.9},
                "LEFT_EAR": {"x": 0.4, "y": 0.1, "visibility": 0.9}
            },
            "classification": cls
        })
        .to_string()
    }

    #[test]
    fn named_and_model_landmarks() {
        let item = parse_line(1, &curl_line((0.5, 0.7), Value::Null)).unwrap().unwrap();
        let StreamItem::Frame { landmarks, classification } = item else {
            panic!("expected frame");
        };
        let lm = landmarks.unwrap();
        assert_eq!(lm.get(Joint::RightElbow).unwrap().y, 0.5);
        assert!(classification.is_none());

        let raw: Vec<Value> = (0..33)
            .map(|i| json!({"x": i as f32 / 100.0, "y": 0.5, "z": 0.0, "visibility": 0.9}))
            .collect();
        let line = json!({"landmarks": raw, "classification": {"label": 0, "probability": 0.99}});
        let Some(StreamItem::Frame { landmarks, classification }) =
            parse_line(2, &line.to_string()).unwrap()
        else {
            panic!("expected frame");
        };
        assert_eq!(landmarks.unwrap().get(Joint::LeftHip).unwrap().x, 0.23);
        assert_eq!(classification.unwrap().label, ClassLabel::Index(0));
    }

    #[test]
    fn no_subject_and_controls() {
        assert_eq!(
            parse_line(1, r#"{"landmarks": null}"#).unwrap(),
            Some(StreamItem::Frame { landmarks: None, classification: None })
        );
        assert_eq!(
            parse_line(1, r#"{"landmarks": []}"#).unwrap(),
            Some(StreamItem::Frame { landmarks: None, classification: None })
        );
        assert_eq!(parse_line(1, r#"{"reset": true}"#).unwrap(), Some(StreamItem::Reset));
        assert_eq!(parse_line(1, "   ").unwrap(), None);
    }

    #[test]
    fn malformed_lines_report_position() {
        let err = parse_line(7, "{not json").unwrap_err();
        assert!(matches!(err, InputError::Malformed { line: 7, .. }));
        let err = parse_line(3, r#"{"landmarks": [{"x": 0.1, "y": 0.2}]}"#).unwrap_err();
        assert!(matches!(err, InputError::LandmarkCount { line: 3, len: 1 }));
    }

    #[test]
    fn run_emits_one_event_per_frame() {
        let input = [
            curl_line((0.5, 0.7), Value::Null),
            "garbage".to_string(),
            curl_line((0.7, 0.5), json!({"label": "leaning", "probability": 0.99})),
            curl_line((0.6, 0.35), Value::Null),
            r#"{"reset": true}"#.to_string(),
            r#"{"landmarks": null}"#.to_string(),
        ]
        .join("\n");
        let mut s = curl_session();
        let mut out = Vec::new();
        let stop = AtomicBool::new(false);
        let stats = run(&mut s, input.as_bytes(), &mut out, false, &stop).unwrap();
        assert_eq!(stats, StreamStats { frames: 4, skipped: 1, resets: 1 });

        let events: Vec<Value> = String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(events.len(), 4);
        assert_eq!(events[0]["sides"][0]["stage"], "down");
        assert_eq!(events[1]["posture"]["verdict"], "leaning");
        assert_eq!(events[2]["sides"][0]["stage"], "up");
        assert_eq!(events[2]["sides"][0]["reps"], 1);
        assert_eq!(events[2]["sides"][0]["errors"]["LOOSE_UPPER_ARM"], 0);
        assert_eq!(events[3]["detected"], false);
        assert_eq!(events[3]["sides"][0]["status"], "untracked");
        assert_eq!(events[3]["sides"][0]["reps"], 0);
        assert_eq!(events[3]["posture"]["verdict"], "correct");
    }

    #[test]
    fn invalid_utf8_line_is_skipped() {
        let mut input = curl_line((0.5, 0.7), Value::Null).into_bytes();
        input.extend([b'\n', 0xff, 0xfe, b'\n']);
        input.extend(curl_line((0.6, 0.35), Value::Null).into_bytes());

        let mut s = curl_session();
        let mut out = Vec::new();
        let stop = AtomicBool::new(false);
        let stats = run(&mut s, input.as_slice(), &mut out, false, &stop).unwrap();
        assert_eq!(stats, StreamStats { frames: 2, skipped: 1, resets: 0 });
        assert_eq!(String::from_utf8(out).unwrap().lines().count(), 2);

        let mut s = curl_session();
        let err = run(&mut s, input.as_slice(), Vec::new(), true, &stop).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<InputError>(),
            Some(InputError::Encoding { line: 2 })
        ));
    }

    #[test]
    fn strict_mode_fails_on_bad_line() {
        let mut s = curl_session();
        let stop = AtomicBool::new(false);
        let res = run(&mut s, "oops\n".as_bytes(), Vec::new(), true, &stop);
        assert!(res.is_err());
    }

    #[test]
    fn stop_flag_halts_before_next_frame() {
        let mut s = curl_session();
        let stop = AtomicBool::new(true);
        let line = curl_line((0.5, 0.7), Value::Null);
        let stats = run(&mut s, line.as_bytes(), Vec::new(), false, &stop).unwrap();
        assert_eq!(stats.frames, 0);
    }
}
