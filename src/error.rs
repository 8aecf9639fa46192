use thiserror::Error;

use crate::landmark::Side;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error(
        "{exercise}: extended_above ({extended_above}) must be greater than flexed_below ({flexed_below})"
    )]
    InvertedThresholds {
        exercise: &'static str,
        flexed_below: f32,
        extended_above: f32,
    },
    #[error("{exercise}.{field} = {value} is outside {range}")]
    OutOfRange {
        exercise: &'static str,
        field: &'static str,
        value: f32,
        range: &'static str,
    },
    #[error("{exercise}.{field}: band min ({min}) must be below max ({max})")]
    EmptyBand {
        exercise: &'static str,
        field: &'static str,
        min: f32,
        max: f32,
    },
    #[error("{exercise}: at least one side must be tracked")]
    NoSides { exercise: &'static str },
    #[error("{exercise}: side {side:?} is listed more than once")]
    DuplicateSide { exercise: &'static str, side: Side },
    #[error("{exercise}: sides must be left and/or right, not both")]
    SymmetricSide { exercise: &'static str },
    #[error("unknown exercise '{0}' (expected bicep_curl, lunge, squat or plank)")]
    UnknownExercise(String),
}

#[derive(Debug, Error)]
pub enum InputError {
    #[error("line {line}: {source}")]
    Malformed {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("line {line}: landmark array has {len} entries, expected 33")]
    LandmarkCount { line: usize, len: usize },
    #[error("line {line}: not valid UTF-8")]
    Encoding { line: usize },
}
