//! Hysteresis repetition counter over a primary joint angle.

use log::debug;
use serde::Serialize;

use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Up,
    Down,
}

impl Stage {
    pub fn opposite(self) -> Stage {
        match self {
            Stage::Up => Stage::Down,
            Stage::Down => Stage::Up,
        }
    }
}

/// Which side of the dead zone the limb is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Extended,
    Flexed,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CounterConfig {
    pub exercise: &'static str,
    /// Entering the flexed phase requires the angle below this.
    pub flexed_below: f32,
    /// Returning to the extended phase requires the angle above this.
    pub extended_above: f32,
    /// Stage label shown while flexed; extended shows the opposite.
    pub flexed_stage: Stage,
    /// Phase whose entry counts a repetition.
    pub count_on: Phase,
}

impl CounterConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("flexed_below", self.flexed_below),
            ("extended_above", self.extended_above),
        ] {
            if !(value > 0.0 && value <= 180.0) {
                return Err(ConfigError::OutOfRange {
                    exercise: self.exercise,
                    field,
                    value,
                    range: "(0, 180]",
                });
            }
        }
        if self.extended_above <= self.flexed_below {
            return Err(ConfigError::InvertedThresholds {
                exercise: self.exercise,
                flexed_below: self.flexed_below,
                extended_above: self.extended_above,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Transition {
    pub to: Stage,
    pub counted: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RepCounter {
    cfg: CounterConfig,
    phase: Phase,
    reps: u32,
}

impl RepCounter {
    pub fn new(cfg: CounterConfig) -> Result<Self, ConfigError> {
        cfg.validate()?;
        Ok(Self {
            cfg,
            phase: Phase::Extended,
            reps: 0,
        })
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn stage(&self) -> Stage {
        match self.phase {
            Phase::Flexed => self.cfg.flexed_stage,
            Phase::Extended => self.cfg.flexed_stage.opposite(),
        }
    }

    pub fn reps(&self) -> u32 {
        self.reps
    }

    pub fn reset(&mut self) {
        self.phase = Phase::Extended;
        self.reps = 0;
    }

    /// Feeds one frame's angle. At most one transition fires; the
    /// extension check is evaluated first.
    pub fn update(&mut self, angle: f32) -> Option<Transition> {
        let next = if angle > self.cfg.extended_above {
            Phase::Extended
        } else if angle < self.cfg.flexed_below {
            Phase::Flexed
        } else {
            return None;
        };
        if next == self.phase {
            return None;
        }

        self.phase = next;
        let counted = next == self.cfg.count_on;
        if counted {
            self.reps += 1;
        }
        let to = self.stage();
        debug!(
            "{}: stage -> {:?} at {angle:.1} deg (reps={})",
            self.cfg.exercise, to, self.reps
        );
        Some(Transition { to, counted })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn curl() -> RepCounter {
        RepCounter::new(CounterConfig {
            exercise: "bicep_curl",
            flexed_below: 90.0,
            extended_above: 120.0,
            flexed_stage: Stage::Up,
            count_on: Phase::Flexed,
        })
        .unwrap()
    }

    #[test]
    fn curl_scenario_stages_and_count() {
        let mut c = curl();
        let stages: Vec<Stage> = [150.0, 140.0, 95.0, 80.0, 85.0, 125.0, 130.0]
            .into_iter()
            .map(|a| {
                c.update(a);
                c.stage()
            })
            .collect();
        use Stage::*;
        assert_eq!(stages, vec![Down, Down, Down, Up, Up, Down, Down]);
        assert_eq!(c.reps(), 1);
    }

    #[test]
    fn full_cycles_count_once_each() {
        let mut c = curl();
        for a in [130.0, 85.0, 125.0, 80.0] {
            c.update(a);
        }
        assert_eq!(c.reps(), 2);
    }

    #[test]
    fn jitter_in_dead_zone_counts_once() {
        let mut c = curl();
        for i in 0..50 {
            c.update(if i % 2 == 0 { 91.0 } else { 89.0 });
        }
        assert_eq!(c.reps(), 1);
        assert_eq!(c.stage(), Stage::Up);
    }

    #[test]
    fn counting_on_extension() {
        let mut lunge = RepCounter::new(CounterConfig {
            exercise: "lunge",
            flexed_below: 90.0,
            extended_above: 150.0,
            flexed_stage: Stage::Down,
            count_on: Phase::Extended,
        })
        .unwrap();
        assert_eq!(lunge.stage(), Stage::Up);
        assert_eq!(lunge.update(160.0), None);
        let down = lunge.update(80.0).unwrap();
        assert_eq!(down, Transition { to: Stage::Down, counted: false });
        assert_eq!(lunge.reps(), 0);
        let up = lunge.update(155.0).unwrap();
        assert!(up.counted);
        assert_eq!(lunge.reps(), 1);
    }

    #[test]
    fn inverted_thresholds_rejected() {
        let err = RepCounter::new(CounterConfig {
            exercise: "bicep_curl",
            flexed_below: 120.0,
            extended_above: 120.0,
            flexed_stage: Stage::Up,
            count_on: Phase::Flexed,
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvertedThresholds { .. }));
    }

    #[test]
    fn nan_angle_never_transitions() {
        let mut c = curl();
        c.update(80.0);
        assert_eq!(c.update(f32::NAN), None);
        assert_eq!(c.stage(), Stage::Up);
    }

    #[test]
    fn reset_restores_start() {
        let mut c = curl();
        c.update(80.0);
        c.reset();
        assert_eq!(c.reps(), 0);
        assert_eq!(c.stage(), Stage::Down);
    }
}
