// src/models/process_step.rs

use std::{fmt, str::FromStr, sync::LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::{config::MAX_PROCESS_STEPS, error::AppError};

static STEP_TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{2,}):([0-5]\d):([0-5]\d)$").expect("valid step time regex"));

pub const DEFAULT_STEP_TIME: &str = "00:00:00";

/// Kind of stage in a charge/discharge test flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepType {
    /// Constant current, then constant voltage charge.
    #[serde(rename = "CC-CV")]
    CcCv,
    /// Constant current charge.
    #[serde(rename = "CC")]
    Cc,
    /// Discharge.
    #[serde(rename = "DC")]
    Dc,
    #[serde(rename = "Rest")]
    Rest,
    /// End of flow.
    #[serde(rename = "END")]
    End,
}

impl StepType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepType::CcCv => "CC-CV",
            StepType::Cc => "CC",
            StepType::Dc => "DC",
            StepType::Rest => "Rest",
            StepType::End => "END",
        }
    }
}

impl fmt::Display for StepType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StepType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CC-CV" => Ok(StepType::CcCv),
            "CC" => Ok(StepType::Cc),
            "DC" => Ok(StepType::Dc),
            "Rest" => Ok(StepType::Rest),
            "END" => Ok(StepType::End),
            other => Err(format!("unknown step type '{}'", other)),
        }
    }
}

/// Represents the 'process_steps' table in the database.
#[derive(Debug, Clone, FromRow)]
pub struct ProcessStepRow {
    pub id: i64,
    pub step_index: i32,
    pub step_type: String,
    pub current: Option<f64>,
    pub voltage: Option<f64>,
    pub end_current: Option<f64>,
    pub step_time: String,
    pub capacity_check: bool,
    pub temp_compensation: bool,
}

/// A saved step, as returned by the API.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ProcessStep {
    pub id: i64,
    pub step_index: i32,
    pub step_type: StepType,
    pub current: Option<f64>,
    pub voltage: Option<f64>,
    pub end_current: Option<f64>,
    pub step_time: String,
    pub duration_secs: Option<u64>,
    pub capacity_check: bool,
    pub temp_compensation: bool,
}

impl TryFrom<ProcessStepRow> for ProcessStep {
    type Error = AppError;

    fn try_from(row: ProcessStepRow) -> Result<Self, Self::Error> {
        let step_type = row
            .step_type
            .parse::<StepType>()
            .map_err(|e: String| AppError::InternalServerError(format!("step {}: {}", row.id, e)))?;

        Ok(Self {
            id: row.id,
            step_index: row.step_index,
            step_type,
            current: row.current,
            voltage: row.voltage,
            end_current: row.end_current,
            duration_secs: parse_step_time(&row.step_time),
            step_time: row.step_time,
            capacity_check: row.capacity_check,
            temp_compensation: row.temp_compensation,
        })
    }
}

/// One step as submitted by the client; the index comes from its position.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProcessStepInput {
    pub step_type: StepType,
    #[serde(default)]
    pub current: Option<f64>,
    #[serde(default)]
    pub voltage: Option<f64>,
    #[serde(default)]
    pub end_current: Option<f64>,
    #[serde(default)]
    pub step_time: Option<String>,
    #[serde(default)]
    pub capacity_check: bool,
    #[serde(default)]
    pub temp_compensation: bool,
}

impl Default for ProcessStepInput {
    /// Template for a newly added step.
    fn default() -> Self {
        Self {
            step_type: StepType::CcCv,
            current: Some(2.0),
            voltage: Some(3.65),
            end_current: Some(0.005),
            step_time: Some(DEFAULT_STEP_TIME.to_string()),
            capacity_check: false,
            temp_compensation: false,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SaveProcessRequest {
    pub steps: Vec<ProcessStepInput>,
}

/// A validated step ready to be inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProcessStep {
    pub step_index: i32,
    pub step_type: StepType,
    pub current: Option<f64>,
    pub voltage: Option<f64>,
    pub end_current: Option<f64>,
    pub step_time: String,
    pub capacity_check: bool,
    pub temp_compensation: bool,
}

/// Parses `HH:MM:SS` into seconds. Hours may exceed two digits; a total
/// that does not fit in `u64` is rejected.
pub fn parse_step_time(raw: &str) -> Option<u64> {
    let caps = STEP_TIME_RE.captures(raw)?;
    let hours: u64 = caps[1].parse().ok()?;
    let minutes: u64 = caps[2].parse().ok()?;
    let seconds: u64 = caps[3].parse().ok()?;
    hours
        .checked_mul(3600)?
        .checked_add(minutes * 60 + seconds)
}

fn check_value(step: usize, name: &str, value: Option<f64>) -> Result<Option<f64>, AppError> {
    match value {
        Some(v) if !v.is_finite() || v < 0.0 => Err(AppError::BadRequest(format!(
            "Step {}: {} must be a non-negative number",
            step, name
        ))),
        other => Ok(other),
    }
}

/// Validates a submitted flow and numbers the steps 1..=n in order.
pub fn normalize_steps(steps: Vec<ProcessStepInput>) -> Result<Vec<NewProcessStep>, AppError> {
    if steps.len() > MAX_PROCESS_STEPS {
        return Err(AppError::BadRequest(format!(
            "A flow may contain at most {} steps",
            MAX_PROCESS_STEPS
        )));
    }

    steps
        .into_iter()
        .enumerate()
        .map(|(i, step)| {
            let n = i + 1;

            let step_time = match step.step_time.as_deref().map(str::trim) {
                None | Some("") => DEFAULT_STEP_TIME.to_string(),
                Some(t) if parse_step_time(t).is_some() => t.to_string(),
                Some(t) => {
                    return Err(AppError::BadRequest(format!(
                        "Step {}: time '{}' is not in HH:MM:SS format",
                        n, t
                    )));
                }
            };

            Ok(NewProcessStep {
                step_index: n as i32,
                step_type: step.step_type,
                current: check_value(n, "current", step.current)?,
                voltage: check_value(n, "voltage", step.voltage)?,
                end_current: check_value(n, "end_current", step.end_current)?,
                step_time,
                capacity_check: step.capacity_check,
                temp_compensation: step.temp_compensation,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_time_parsing() {
        assert_eq!(parse_step_time("00:00:00"), Some(0));
        assert_eq!(parse_step_time("01:30:15"), Some(5415));
        assert_eq!(parse_step_time("120:00:00"), Some(432_000));
        assert_eq!(parse_step_time("00:60:00"), None);
        assert_eq!(parse_step_time("1:00:00"), None);
        assert_eq!(parse_step_time("00:00"), None);
    }

    #[test]
    fn huge_hour_counts_do_not_overflow() {
        assert_eq!(parse_step_time("9999999999999999:00:00"), None);
        assert_eq!(parse_step_time("99999999999999999999999:00:00"), None);
        assert_eq!(parse_step_time("5124095576030431:00:15"), Some(u64::MAX));

        let steps = vec![ProcessStepInput {
            step_time: Some("9999999999999999:00:00".to_string()),
            ..ProcessStepInput::default()
        }];
        assert!(matches!(normalize_steps(steps), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn steps_are_renumbered_in_order() {
        let steps = vec![
            ProcessStepInput::default(),
            ProcessStepInput {
                step_type: StepType::Rest,
                current: None,
                voltage: None,
                end_current: None,
                step_time: Some("00:10:00".to_string()),
                ..ProcessStepInput::default()
            },
            ProcessStepInput {
                step_type: StepType::End,
                step_time: None,
                ..ProcessStepInput::default()
            },
        ];

        let saved = normalize_steps(steps).unwrap();

        assert_eq!(
            saved.iter().map(|s| s.step_index).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert_eq!(saved[1].step_type, StepType::Rest);
        assert_eq!(saved[1].current, None);
        assert_eq!(saved[2].step_time, DEFAULT_STEP_TIME);
    }

    #[test]
    fn invalid_time_is_rejected() {
        let steps = vec![ProcessStepInput {
            step_time: Some("10 min".to_string()),
            ..ProcessStepInput::default()
        }];
        assert!(matches!(normalize_steps(steps), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn negative_or_nan_values_are_rejected() {
        let negative = vec![ProcessStepInput {
            current: Some(-1.0),
            ..ProcessStepInput::default()
        }];
        let nan = vec![ProcessStepInput {
            voltage: Some(f64::NAN),
            ..ProcessStepInput::default()
        }];
        assert!(normalize_steps(negative).is_err());
        assert!(normalize_steps(nan).is_err());
    }

    #[test]
    fn empty_flow_is_allowed_but_capped() {
        assert!(normalize_steps(Vec::new()).unwrap().is_empty());
        let too_many = vec![ProcessStepInput::default(); MAX_PROCESS_STEPS + 1];
        assert!(normalize_steps(too_many).is_err());
    }

    #[test]
    fn step_type_wire_names() {
        let step: ProcessStepInput =
            serde_json::from_value(serde_json::json!({ "step_type": "CC-CV" })).unwrap();
        assert_eq!(step.step_type, StepType::CcCv);
        assert_eq!("END".parse::<StepType>().unwrap(), StepType::End);
        assert!("XX".parse::<StepType>().is_err());
        assert!(
            serde_json::from_value::<ProcessStepInput>(serde_json::json!({ "step_type": "cc" }))
                .is_err()
        );
    }

    #[test]
    fn row_conversion_derives_duration() {
        let row = ProcessStepRow {
            id: 4,
            step_index: 1,
            step_type: "DC".to_string(),
            current: Some(1.0),
            voltage: Some(2.5),
            end_current: None,
            step_time: "00:02:00".to_string(),
            capacity_check: true,
            temp_compensation: false,
        };
        let step = ProcessStep::try_from(row).unwrap();
        assert_eq!(step.step_type, StepType::Dc);
        assert_eq!(step.duration_secs, Some(120));
    }
}
