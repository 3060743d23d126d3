//! Scenario results.
//!
//! A [`ScenarioReport`] collects one [`StepRecord`] per step as the scenario runs,
//! plus whatever teardown produced. The CLI renders it as text or JSON.

use std::collections::BTreeMap;
use std::future::Future;
use std::time::Instant;

use serde::Serialize;
use tracing::{error, info};

use crate::error::ScenarioError;
use crate::names::ScenarioNames;

/// How a step ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepOutcome {
    Passed,
    Failed { reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct StepRecord {
    pub name: String,
    pub duration_ms: u64,
    pub outcome: StepOutcome,
}

/// Full result of one scenario run.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub scenario: String,
    pub passed: bool,
    pub names: ScenarioNames,
    pub steps: Vec<StepRecord>,
    /// Error that ended the scenario, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub teardown_errors: Vec<String>,
    /// `cf app` / `cf logs` output per app, collected on failure
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub app_reports: BTreeMap<String, String>,
}

impl ScenarioReport {
    pub fn new(scenario: impl Into<String>, names: ScenarioNames) -> Self {
        Self {
            scenario: scenario.into(),
            passed: false,
            names,
            steps: Vec::new(),
            error: None,
            teardown_errors: Vec::new(),
            app_reports: BTreeMap::new(),
        }
    }

    /// Runs one step, recording its duration and outcome.
    pub async fn step<T, F>(&mut self, name: &str, fut: F) -> Result<T, ScenarioError>
    where
        F: Future<Output = Result<T, ScenarioError>>,
    {
        info!(step = name, "step started");
        let started = Instant::now();
        let result = fut.await;
        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        let outcome = match &result {
            Ok(_) => {
                info!(step = name, duration_ms, "step passed");
                StepOutcome::Passed
            }
            Err(e) => {
                error!(step = name, duration_ms, error = %e, "step failed");
                StepOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        };
        self.steps.push(StepRecord {
            name: name.to_owned(),
            duration_ms,
            outcome,
        });
        result
    }

    /// First failed step, if any.
    pub fn failed_step(&self) -> Option<&StepRecord> {
        self.steps
            .iter()
            .find(|s| matches!(s.outcome, StepOutcome::Failed { .. }))
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> ScenarioReport {
        ScenarioReport::new("service discovery", ScenarioNames::generate("cats"))
    }

    #[tokio::test]
    async fn records_passed_and_failed_steps() {
        let mut report = report();
        let value = report.step("first", async { Ok(7) }).await.unwrap();
        assert_eq!(value, 7);

        let err = report
            .step::<(), _>("second", async {
                Err(ScenarioError::Unmet {
                    step: "second".to_owned(),
                    detail: "listing contained backend".to_owned(),
                })
            })
            .await
            .unwrap_err();
        assert_eq!(err.step(), "second");

        assert_eq!(report.step_names(), vec!["first", "second"]);
        assert_eq!(report.steps[0].outcome, StepOutcome::Passed);
        let failed = report.failed_step().unwrap();
        assert_eq!(failed.name, "second");
        assert!(matches!(&failed.outcome, StepOutcome::Failed { reason } if reason.contains("listing")));
    }

    #[test]
    fn serializes_outcome_with_status_tag() {
        let mut report = report();
        report.steps.push(StepRecord {
            name: "push backend".to_owned(),
            duration_ms: 12,
            outcome: StepOutcome::Failed {
                reason: "boom".to_owned(),
            },
        });
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["steps"][0]["outcome"]["status"], "failed");
        assert_eq!(json["steps"][0]["outcome"]["reason"], "boom");
        assert_eq!(json["passed"], false);
        assert!(json.get("app_reports").is_none());
        assert!(json.get("error").is_none());
        assert!(json["names"]["backend"].as_str().unwrap().starts_with("cats-app-back-"));
    }
}
