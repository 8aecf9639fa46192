//! Confidence-gated posture verdicts from an external classifier.

use log::{info, warn};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Correct,
    Leaning,
    HighBack,
    LowBack,
}

impl Verdict {
    fn from_name(name: &str) -> Option<Verdict> {
        match name.trim().to_ascii_lowercase().replace([' ', '-'], "_").as_str() {
            "correct" | "c" => Some(Verdict::Correct),
            "leaning" | "lean" => Some(Verdict::Leaning),
            "high_back" | "h" => Some(Verdict::HighBack),
            "low_back" | "l" => Some(Verdict::LowBack),
            _ => None,
        }
    }
}

/// Classifier output label: a verdict name or code, or the argmax class index.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ClassLabel {
    Index(usize),
    Name(String),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Classification {
    pub label: ClassLabel,
    pub probability: f32,
}

#[cfg(test)]
impl Classification {
    pub fn new(label: ClassLabel, probability: f32) -> Self {
        Self { label, probability }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PostureReport {
    pub verdict: Verdict,
    /// Probability of this frame's sample, if one arrived.
    pub confidence: Option<f32>,
    pub accepted: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PostureClassifierAdapter {
    /// Class-index order of the classifier's outputs.
    labels: &'static [Verdict],
    min_confidence: f32,
    verdict: Verdict,
}

impl PostureClassifierAdapter {
    pub fn new(labels: &'static [Verdict], min_confidence: f32) -> Self {
        Self {
            labels,
            min_confidence,
            verdict: Verdict::Correct,
        }
    }

    pub fn reset(&mut self) {
        self.verdict = Verdict::Correct;
    }

    fn resolve(&self, label: &ClassLabel) -> Option<Verdict> {
        match label {
            ClassLabel::Index(i) => self.labels.get(*i).copied(),
            ClassLabel::Name(n) => Verdict::from_name(n).filter(|v| self.labels.contains(v)),
        }
    }

    /// Applies one frame's classification. Samples below the confidence
    /// threshold, unknown labels, and missing samples keep the last verdict.
    pub fn update(&mut self, sample: Option<&Classification>) -> PostureReport {
        let Some(c) = sample else {
            return PostureReport {
                verdict: self.verdict,
                confidence: None,
                accepted: false,
            };
        };

        let accepted = match self.resolve(&c.label) {
            None => {
                warn!("ignoring classifier label {:?}", c.label);
                false
            }
            Some(v) if c.probability >= self.min_confidence => {
                if v != self.verdict {
                    info!("posture {:?} -> {:?} (p={:.2})", self.verdict, v, c.probability);
                }
                self.verdict = v;
                true
            }
            Some(_) => false,
        };

        PostureReport {
            verdict: self.verdict,
            confidence: Some(c.probability),
            accepted,
        }
    }
}
