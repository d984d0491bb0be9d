//! Scenario replay
//!
//! A scenario is a TOML file listing funded accounts and a sequence of calls,
//! each marked as expected to succeed or fail. The runner replays the calls on
//! a fresh runtime and reports, step by step, whether reality matched.
//!
//! ```toml
//! name = "sellout"
//!
//! [accounts]
//! alice = 5_000_000
//!
//! [[steps]]
//! sender = "alice"
//! amount = 1_000_000
//! call = { entry_point = "buy_ticket", num_tickets = 1 }
//! ```

use crate::common::types::{Amount, Identity, Timestamp};
use crate::config::DeploymentConfig;
use crate::errors::ScenarioError;
use crate::lottery::{Call, LotteryEvent, Transfer};
use crate::runtime::{LotteryRuntime, RuntimeSnapshot};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

fn default_valid() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    pub name: String,
    /// Replaces the configured deployment when present
    #[serde(default)]
    pub deployment: Option<DeploymentConfig>,
    /// Starting wallet balance per account label
    #[serde(default)]
    pub accounts: BTreeMap<String, Amount>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Step {
    #[serde(default)]
    pub section: Option<String>,
    pub sender: String,
    #[serde(default)]
    pub amount: Amount,
    /// Defaults to the time of the previous call
    #[serde(default)]
    pub now: Option<Timestamp>,
    #[serde(default = "default_valid")]
    pub valid: bool,
    pub call: Call,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum StepOutcome {
    Accepted {
        event: LotteryEvent,
        transfers: Vec<Transfer>,
    },
    Rejected {
        code: String,
        message: String,
    },
}

impl StepOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, StepOutcome::Accepted { .. })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub index: usize,
    pub section: Option<String>,
    pub sender: String,
    pub call: Call,
    pub amount: Amount,
    pub now: Timestamp,
    pub expected_valid: bool,
    pub outcome: StepOutcome,
    /// Outcome matched `expected_valid`
    pub passed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub name: String,
    pub steps: Vec<StepReport>,
    pub passed: usize,
    pub failed: usize,
    /// Final wallet balance per account label
    pub balances: BTreeMap<String, Amount>,
    pub final_state: RuntimeSnapshot,
}

impl ScenarioReport {
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

impl Scenario {
    pub fn from_toml_str(content: &str) -> Result<Self, ScenarioError> {
        Ok(toml::from_str(content)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ScenarioError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }
}

fn resolve(label: &str) -> Result<Identity, ScenarioError> {
    label
        .parse()
        .map_err(|e| ScenarioError::Setup(format!("account '{}': {}", label, e)))
}

/// Replay `scenario` on a fresh runtime built from its own deployment or `base`
pub fn run_scenario(scenario: &Scenario, base: &DeploymentConfig) -> Result<ScenarioReport, ScenarioError> {
    let deployment = scenario.deployment.as_ref().unwrap_or(base);
    let mut runtime =
        LotteryRuntime::from_deployment(deployment).map_err(|e| ScenarioError::Setup(e.to_string()))?;

    let mut labels: BTreeMap<String, Identity> = BTreeMap::new();
    for (label, amount) in &scenario.accounts {
        let identity = resolve(label)?;
        runtime
            .fund(identity, *amount)
            .map_err(|e| ScenarioError::Setup(e.to_string()))?;
        labels.insert(label.clone(), identity);
    }

    tracing::info!(
        scenario = %scenario.name,
        accounts = labels.len(),
        steps = scenario.steps.len(),
        "replaying scenario"
    );

    let mut reports = Vec::with_capacity(scenario.steps.len());
    for (index, step) in scenario.steps.iter().enumerate() {
        let sender = resolve(&step.sender)?;
        labels.entry(step.sender.clone()).or_insert(sender);

        let now = step
            .now
            .or(runtime.last_seen())
            .unwrap_or(deployment.epoch_zero);

        let outcome = match runtime.submit(sender, step.call, step.amount, now) {
            Ok(receipt) => StepOutcome::Accepted {
                event: receipt.event,
                transfers: receipt.transfers,
            },
            Err(e) => StepOutcome::Rejected {
                code: e.code().to_string(),
                message: e.to_string(),
            },
        };

        let passed = outcome.is_accepted() == step.valid;
        if !passed {
            tracing::warn!(step = index, call = %step.call, "step did not match expectation");
        }

        reports.push(StepReport {
            index,
            section: step.section.clone(),
            sender: step.sender.clone(),
            call: step.call,
            amount: step.amount,
            now,
            expected_valid: step.valid,
            outcome,
            passed,
        });
    }

    let passed = reports.iter().filter(|r| r.passed).count();
    let balances = labels
        .iter()
        .map(|(label, identity)| (label.clone(), runtime.wallet(identity)))
        .collect();

    Ok(ScenarioReport {
        name: scenario.name.clone(),
        failed: reports.len() - passed,
        passed,
        steps: reports,
        balances,
        final_state: runtime.snapshot(),
    })
}
