//! Repair orchestration
//!
//! One entry point ties the schema workflow together: probe the tables,
//! apply pending migrations when anything is unhealthy, backfill missing
//! profiles, then seed demo data where the gates allow. Each step is
//! reported individually so a partially failed run still tells the operator
//! exactly what happened.

use log::{error, info};
use serde::Serialize;
use serde_json::{json, Value};

use crate::backfill::ProfileBackfiller;
use crate::error::Error;
use crate::schema::{SchemaProber, SchemaRepairer};
use crate::seed::DemoSeeder;
use crate::Backend;

/// Overall verdict for an orchestrated run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunVerdict {
    /// Every step succeeded.
    Success,
    /// Some steps succeeded, at least one failed.
    Partial,
    /// No step succeeded.
    Failed,
}

/// Progress of a run through its steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunState {
    Fresh,
    Advancing { succeeded: bool, failed: bool },
}

impl RunState {
    fn record(self, success: bool) -> Self {
        let (succeeded, failed) = match self {
            RunState::Fresh => (success, !success),
            RunState::Advancing { succeeded, failed } => {
                (succeeded || success, failed || !success)
            }
        };
        RunState::Advancing { succeeded, failed }
    }

    fn verdict(self) -> RunVerdict {
        match self {
            RunState::Fresh => RunVerdict::Success,
            RunState::Advancing {
                succeeded: true,
                failed: false,
            } => RunVerdict::Success,
            RunState::Advancing {
                succeeded: true,
                failed: true,
            } => RunVerdict::Partial,
            RunState::Advancing { .. } => RunVerdict::Failed,
        }
    }
}

/// One orchestrated step and what it produced.
#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub name: &'static str,
    pub success: bool,
    pub detail: Value,
}

/// Full report for one orchestrated repair run.
#[derive(Debug, Clone, Serialize)]
pub struct RepairReport {
    pub success: bool,
    pub outcome: RunVerdict,
    pub steps: Vec<StepReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Runs the probe / repair / backfill / seed pipeline.
pub struct RepairOrchestrator<'a> {
    backend: &'a Backend,
}

impl<'a> RepairOrchestrator<'a> {
    pub fn new(backend: &'a Backend) -> Self {
        Self { backend }
    }

    /// Probe every known table without changing anything. Transport errors
    /// surface as `Err`; schema problems are part of the report.
    pub async fn probe(&self) -> Result<RepairReport, Error> {
        let report = SchemaProber::new(self.backend).probe_all().await?;

        let tables: Vec<Value> = report
            .tables
            .iter()
            .map(|(name, status)| json!({ "table": name, "status": format!("{:?}", status) }))
            .collect();

        let healthy = report.all_healthy();
        Ok(RepairReport {
            success: true,
            outcome: RunVerdict::Success,
            steps: vec![StepReport {
                name: "probe",
                success: healthy,
                detail: json!({ "all_healthy": healthy, "tables": tables }),
            }],
            error: None,
        })
    }

    /// Run the full pipeline. Individual step failures are recorded and the
    /// run continues; only the probe step aborts on transport failure, since
    /// nothing sensible can follow it.
    pub async fn repair(&self) -> Result<RepairReport, Error> {
        let mut steps = Vec::new();
        let mut state = RunState::Fresh;

        let probe = SchemaProber::new(self.backend).probe_all().await?;
        let all_healthy = probe.all_healthy();
        steps.push(StepReport {
            name: "probe",
            success: true,
            detail: json!({ "all_healthy": all_healthy }),
        });
        state = state.record(true);

        if !all_healthy {
            let step = match SchemaRepairer::new(self.backend).run().await {
                Ok(outcome) => {
                    info!(
                        "schema repair applied {} migrations, skipped {}",
                        outcome.applied.len(),
                        outcome.skipped.len()
                    );
                    StepReport {
                        name: "migrate",
                        success: true,
                        detail: json!({
                            "applied": outcome.applied,
                            "skipped": outcome.skipped,
                        }),
                    }
                }
                Err(err) => {
                    error!("schema repair failed: {}", err);
                    StepReport {
                        name: "migrate",
                        success: false,
                        detail: json!({ "error": err.to_string() }),
                    }
                }
            };
            state = state.record(step.success);
            steps.push(step);
        }

        let step = match ProfileBackfiller::new(self.backend).run().await {
            Ok(summary) => StepReport {
                name: "backfill",
                success: summary.is_complete(),
                detail: serde_json::to_value(&summary)?,
            },
            Err(err) => {
                error!("profile backfill failed: {}", err);
                StepReport {
                    name: "backfill",
                    success: false,
                    detail: json!({ "error": err.to_string() }),
                }
            }
        };
        state = state.record(step.success);
        steps.push(step);

        let step = match DemoSeeder::new(self.backend).run().await {
            Ok(report) => StepReport {
                name: "seed",
                success: true,
                detail: serde_json::to_value(&report)?,
            },
            Err(err) => {
                error!("demo seed failed: {}", err);
                StepReport {
                    name: "seed",
                    success: false,
                    detail: json!({ "error": err.to_string() }),
                }
            }
        };
        state = state.record(step.success);
        steps.push(step);

        let outcome = state.verdict();
        let error = (outcome == RunVerdict::Failed)
            .then(|| "every repair step failed".to_string());

        Ok(RepairReport {
            success: outcome == RunVerdict::Success,
            outcome,
            steps,
            error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_successes_verdict_success() {
        let state = RunState::Fresh.record(true).record(true).record(true);
        assert_eq!(state.verdict(), RunVerdict::Success);
    }

    #[test]
    fn mixed_results_verdict_partial() {
        let state = RunState::Fresh.record(true).record(false);
        assert_eq!(state.verdict(), RunVerdict::Partial);
    }

    #[test]
    fn all_failures_verdict_failed() {
        let state = RunState::Fresh.record(false).record(false);
        assert_eq!(state.verdict(), RunVerdict::Failed);
    }

    #[test]
    fn empty_run_counts_as_success() {
        assert_eq!(RunState::Fresh.verdict(), RunVerdict::Success);
    }
}
