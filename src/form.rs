//! Form-error detection layered on the repetition counter.

use log::debug;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::counter::{Phase, Stage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    LooseUpperArm,
    PeakContraction,
    FootPlacement,
    KneePlacement,
}

/// Inclusive acceptable range; an open end is unbounded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Band {
    pub min: Option<f32>,
    pub max: Option<f32>,
}

impl Band {
    pub fn at_most(max: f32) -> Self {
        Self {
            min: None,
            max: Some(max),
        }
    }

    pub fn between(min: f32, max: f32) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
        }
    }

    pub fn contains(&self, v: f32) -> bool {
        self.min.is_none_or(|m| v >= m) && self.max.is_none_or(|m| v <= m)
    }
}

/// Acceptable band for a measurement, fixed or picked by the counter's stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bands {
    Always(Band),
    ByStage { up: Band, down: Band },
}

impl Bands {
    fn for_stage(&self, stage: Stage) -> Band {
        match (*self, stage) {
            (Bands::Always(b), _) => b,
            (Bands::ByStage { up, .. }, Stage::Up) => up,
            (Bands::ByStage { down, .. }, Stage::Down) => down,
        }
    }
}

/// Sustained deviation of a secondary measurement outside its band. One
/// latch per rule, so an excursion spanning a stage change counts once.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviationRule {
    pub kind: ErrorKind,
    pub bands: Bands,
}

#[derive(Debug, Clone, PartialEq)]
struct DeviationState {
    rule: DeviationRule,
    violating: bool,
}

/// Flags repetitions whose deepest flexion stayed above `threshold`.
#[derive(Debug, Clone, PartialEq)]
pub struct PeakRule {
    pub kind: ErrorKind,
    pub threshold: f32,
}

#[derive(Debug, Clone, PartialEq)]
struct PeakState {
    rule: PeakRule,
    deepest: Option<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FormErrorDetector {
    deviations: Vec<DeviationState>,
    peak: Option<PeakState>,
    counts: BTreeMap<ErrorKind, u32>,
}

impl FormErrorDetector {
    pub fn new(deviations: Vec<DeviationRule>, peak: Option<PeakRule>) -> Self {
        let mut counts = BTreeMap::new();
        for r in &deviations {
            counts.insert(r.kind, 0);
        }
        if let Some(p) = &peak {
            counts.insert(p.kind, 0);
        }
        Self {
            deviations: deviations
                .into_iter()
                .map(|rule| DeviationState {
                    rule,
                    violating: false,
                })
                .collect(),
            peak: peak.map(|rule| PeakState {
                rule,
                deepest: None,
            }),
            counts,
        }
    }

    pub fn counts(&self) -> &BTreeMap<ErrorKind, u32> {
        &self.counts
    }

    pub fn deepest(&self) -> Option<f32> {
        self.peak.as_ref().and_then(|p| p.deepest)
    }

    pub fn reset(&mut self) {
        for d in &mut self.deviations {
            d.violating = false;
        }
        if let Some(p) = &mut self.peak {
            p.deepest = None;
        }
        for c in self.counts.values_mut() {
            *c = 0;
        }
    }

    /// One frame after the counter has updated. `measurements` lines up with
    /// the deviation rules; `None` leaves that rule untouched. An undetermined
    /// `primary` leaves the peak tracker untouched.
    pub fn update(
        &mut self,
        phase: Phase,
        stage: Stage,
        primary: Option<f32>,
        measurements: &[Option<f32>],
    ) {
        for (state, value) in self.deviations.iter_mut().zip(measurements) {
            let Some(v) = *value else { continue };
            let violating = !state.rule.bands.for_stage(stage).contains(v);
            if violating && !state.violating {
                *self.counts.entry(state.rule.kind).or_default() += 1;
                debug!("form error {:?} at {v:.2}", state.rule.kind);
            }
            state.violating = violating;
        }

        if let (Some(peak), Some(primary)) = (&mut self.peak, primary) {
            match phase {
                Phase::Flexed => {
                    if peak.deepest.is_none_or(|d| primary < d) {
                        peak.deepest = Some(primary);
                    }
                }
                Phase::Extended => {
                    if let Some(d) = peak.deepest.take() {
                        if d >= peak.rule.threshold {
                            *self.counts.entry(peak.rule.kind).or_default() += 1;
                            debug!("form error {:?}: deepest {d:.1}", peak.rule.kind);
                        }
                    }
                }
            }
        }
    }
}
