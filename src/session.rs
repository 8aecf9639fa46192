//! Frame-at-a-time analysis driver for one exercise session.

use log::{debug, info};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::counter::{RepCounter, Stage, Transition};
use crate::error::ConfigError;
use crate::exercise::{ExerciseKind, ExercisePlan, TrackerPlan};
use crate::form::{ErrorKind, FormErrorDetector};
use crate::gate::VisibilityGate;
use crate::landmark::{LandmarkFrame, Side};
use crate::posture::{Classification, PostureClassifierAdapter, PostureReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SideStatus {
    Tracked,
    /// Required joints missing or below the visibility threshold.
    Untracked,
    /// Joints visible but the geometry was degenerate.
    Undetermined,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SideReport {
    pub side: Side,
    pub status: SideStatus,
    pub angles: BTreeMap<&'static str, f32>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub ratios: BTreeMap<&'static str, f32>,
    pub stage: Stage,
    /// Stage change fired by this frame.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transition: Option<Transition>,
    pub reps: u32,
    /// Deepest primary angle of the repetition in progress.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deepest: Option<f32>,
    pub errors: BTreeMap<ErrorKind, u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisEvent {
    pub frame: u64,
    pub exercise: ExerciseKind,
    pub detected: bool,
    pub sides: Vec<SideReport>,
    pub posture: PostureReport,
}

/// Counter and form state for one tracked side.
#[derive(Debug, Clone, PartialEq)]
struct AnalyzerState {
    plan: TrackerPlan,
    counter: RepCounter,
    form: FormErrorDetector,
}

impl AnalyzerState {
    fn new(plan: TrackerPlan) -> Result<Self, ConfigError> {
        let counter = RepCounter::new(plan.counter)?;
        let form = FormErrorDetector::new(
            plan.deviations.iter().map(|d| d.rule.clone()).collect(),
            plan.peak.clone(),
        );
        Ok(Self {
            plan,
            counter,
            form,
        })
    }

    fn report(&self, status: SideStatus) -> SideReport {
        SideReport {
            side: self.plan.side,
            status,
            angles: BTreeMap::new(),
            ratios: BTreeMap::new(),
            stage: self.counter.stage(),
            transition: None,
            reps: self.counter.reps(),
            deepest: self.form.deepest(),
            errors: self.form.counts().clone(),
        }
    }

    fn analyze(&mut self, frame: Option<&LandmarkFrame>, gate: &VisibilityGate) -> SideReport {
        let Some(frame) = frame.filter(|f| gate.passes(f, &self.plan.required)) else {
            return self.report(SideStatus::Untracked);
        };
        let measurements: Vec<Option<f32>> = self
            .plan
            .deviations
            .iter()
            .map(|d| d.measure.metric.measure(frame))
            .collect();

        // Degenerate primary geometry holds the counter and peak tracker;
        // deviation checks with a usable measurement still run.
        let primary = self.plan.primary.metric.measure(frame);
        let transition = primary.and_then(|a| self.counter.update(a));
        self.form.update(
            self.counter.phase(),
            self.counter.stage(),
            primary,
            &measurements,
        );

        let mut report = match primary {
            Some(angle) => {
                let mut r = self.report(SideStatus::Tracked);
                r.angles.insert(self.plan.primary.name, angle);
                r
            }
            None => {
                debug!("{:?}: undetermined {}", self.plan.side, self.plan.primary.name);
                self.report(SideStatus::Undetermined)
            }
        };
        report.transition = transition;
        for (d, value) in self.plan.deviations.iter().zip(&measurements) {
            if let Some(v) = *value {
                let target = if d.measure.metric.is_ratio() {
                    &mut report.ratios
                } else {
                    &mut report.angles
                };
                target.insert(d.measure.name, v);
            }
        }
        report
    }

    fn reset(&mut self) {
        self.counter.reset();
        self.form.reset();
    }
}

/// Owns every side's state for one exercise. Each call to `analyze`
/// consumes one frame and returns its event.
#[derive(Debug, Clone)]
pub struct Session {
    kind: ExerciseKind,
    gate: VisibilityGate,
    analyzers: Vec<AnalyzerState>,
    posture: PostureClassifierAdapter,
    frames: u64,
}

impl Session {
    pub fn new(plan: ExercisePlan) -> Result<Self, ConfigError> {
        let analyzers = plan
            .trackers
            .into_iter()
            .map(AnalyzerState::new)
            .collect::<Result<Vec<_>, _>>()?;
        info!(
            "session: {} with {} tracker(s), visibility > {}, posture p >= {}",
            plan.kind.name(),
            analyzers.len(),
            plan.visibility,
            plan.posture_confidence
        );
        Ok(Self {
            kind: plan.kind,
            gate: VisibilityGate::new(plan.visibility),
            analyzers,
            posture: PostureClassifierAdapter::new(plan.kind.verdicts(), plan.posture_confidence),
            frames: 0,
        })
    }

    /// `frame` is `None` (or empty) when no subject was detected; the
    /// classification is then ignored as well.
    pub fn analyze(
        &mut self,
        frame: Option<&LandmarkFrame>,
        classification: Option<&Classification>,
    ) -> AnalysisEvent {
        let frame = frame.filter(|f| !f.is_empty());
        let detected = frame.is_some();

        let sides = self
            .analyzers
            .iter_mut()
            .map(|a| a.analyze(frame, &self.gate))
            .collect();
        let posture = self.posture.update(classification.filter(|_| detected));

        let event = AnalysisEvent {
            frame: self.frames,
            exercise: self.kind,
            detected,
            sides,
            posture,
        };
        self.frames += 1;
        event
    }

    /// Current totals without consuming a frame.
    pub fn summary(&self) -> Vec<SideReport> {
        self.analyzers
            .iter()
            .map(|a| a.report(SideStatus::Untracked))
            .collect()
    }

    pub fn reset(&mut self) {
        for a in &mut self.analyzers {
            a.reset();
        }
        self.posture.reset();
        info!("session: {} reset after {} frame(s)", self.kind.name(), self.frames);
    }
}
