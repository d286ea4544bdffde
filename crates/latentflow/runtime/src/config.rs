//! Runtime configuration

use std::path::{Path, PathBuf};
use std::sync::Arc;

use latentflow_audit::{AuditSink, JsonlAuditSink};
use latentflow_guard::{GuardRule, StateGuard};
use latentflow_planner::{ConstrainedPlanner, CostModel, TemplateActionSpace};
use latentflow_state::{StateConfig, StateStore};
use latentflow_verify::{ConstraintsVerifier, Policy};
use serde::{Deserialize, Serialize};

use crate::engine::Engine;
use crate::error::ConfigError;

/// Main runtime configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Session state sizing
    #[serde(default)]
    pub state: StateConfig,

    /// Guard rules, evaluated in order
    #[serde(default)]
    pub guard: GuardConfig,

    /// Engineering invariants
    #[serde(default)]
    pub invariants: InvariantsConfig,

    /// Business policy
    #[serde(default)]
    pub policy: Policy,

    /// Plan templates and ranking
    #[serde(default)]
    pub planner: PlannerConfig,

    /// Audit trail
    #[serde(default)]
    pub audit: AuditConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Guard configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GuardConfig {
    #[serde(default)]
    pub rules: Vec<GuardRule>,
}

/// Invariant configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvariantsConfig {
    /// Check conservation and dedup bounds after every update
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for InvariantsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Planner configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannerConfig {
    /// Currency assumed when a frame names none
    #[serde(default = "default_currency")]
    pub default_currency: String,

    /// Use the `create_order -> submit_order` template
    #[serde(default)]
    pub submit_orders: bool,

    /// Plan cost model
    #[serde(default)]
    pub cost: CostModel,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            default_currency: default_currency(),
            submit_orders: false,
            cost: CostModel::default(),
        }
    }
}

/// Audit configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditConfig {
    /// JSONL log path; no sink when absent
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Echo every record to stdout
    #[serde(default)]
    pub also_stdout: bool,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_currency() -> String {
    "CNY".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl RuntimeConfig {
    /// Load and validate configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: RuntimeConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.state.max_history == 0 {
            return Err(ConfigError::Invalid("state.max_history must be at least 1".into()));
        }
        if self.state.dedup_capacity == 0 {
            return Err(ConfigError::Invalid("state.dedup_capacity must be at least 1".into()));
        }
        let amounts = [
            ("policy.max_transfer_amount", self.policy.max_transfer_amount),
            ("policy.max_withdraw_amount", self.policy.max_withdraw_amount),
            ("policy.require_approval_over", self.policy.require_approval_over),
        ];
        for (name, value) in amounts {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Invalid(format!("{name} must be a non-negative number, got {value}")));
            }
        }
        Ok(())
    }

    /// Open the configured audit sink, if any.
    pub fn open_audit_sink(&self) -> Result<Option<Arc<dyn AuditSink>>, latentflow_audit::AuditError> {
        match &self.audit.path {
            Some(path) => {
                let sink = JsonlAuditSink::open(path, self.audit.also_stdout)?;
                Ok(Some(Arc::new(sink)))
            }
            None => Ok(None),
        }
    }

    pub fn build_engine(&self, audit: Option<Arc<dyn AuditSink>>) -> Engine {
        let mut engine = Engine::new().with_invariants(self.invariants.enabled);
        if !self.guard.rules.is_empty() {
            engine = engine.with_guard(StateGuard::new(self.guard.rules.clone()));
        }
        if let Some(audit) = audit {
            engine = engine.with_audit(audit);
        }
        engine
    }

    pub fn state_store(&self) -> StateStore {
        StateStore::new(self.state.clone())
    }

    pub fn build_planner(&self) -> ConstrainedPlanner {
        let action_space = TemplateActionSpace::new(&self.planner.default_currency, self.planner.submit_orders);
        ConstrainedPlanner::new(ConstraintsVerifier::new(self.policy.clone()))
            .with_action_space(Arc::new(action_space))
            .with_cost_model(self.planner.cost.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use latentflow_types::{action_names, IntentFrame};

    #[test]
    fn empty_file_gives_defaults() {
        let config = RuntimeConfig::from_toml_str("").unwrap();
        assert_eq!(config, RuntimeConfig::default());
        assert_eq!(config.state.max_history, 3);
        assert!(config.invariants.enabled);
        assert_eq!(config.planner.default_currency, "CNY");
        assert!(config.audit.path.is_none());
    }

    #[test]
    fn full_file_parses() {
        let config = RuntimeConfig::from_toml_str(
            r#"
            [state]
            max_history = 5
            dedup_capacity = 64

            [guard]
            rules = [
                { kind = "max_steps", limit = 2000 },
                { kind = "deny_block_types", types = ["secret"] },
                { kind = "max_event_count", limit = 10 },
            ]

            [invariants]
            enabled = false

            [policy]
            max_transfer_amount = 200.0
            blocked_targets = ["Mallory"]

            [planner]
            default_currency = "USD"
            submit_orders = true

            [audit]
            path = "logs/audit.jsonl"

            [logging]
            level = "debug"
            json = true
            "#,
        )
        .unwrap();

        assert_eq!(config.state.max_history, 5);
        assert_eq!(config.guard.rules.len(), 3);
        assert_eq!(config.guard.rules[2], GuardRule::max_event_count(10, "event"));
        assert!(!config.invariants.enabled);
        assert!(config.policy.blocked_targets.contains("Mallory"));
        assert_eq!(config.policy.max_withdraw_amount, 1000.0);
        assert!(config.logging.json);
    }

    #[test]
    fn invalid_values_are_rejected() {
        for text in [
            "[state]\nmax_history = 0",
            "[state]\ndedup_capacity = 0",
            "[policy]\nmax_transfer_amount = -1.0",
        ] {
            assert!(
                matches!(RuntimeConfig::from_toml_str(text), Err(ConfigError::Invalid(_))),
                "{text}"
            );
        }
        assert!(matches!(
            RuntimeConfig::from_toml_str("[guard]\nrules = [{ kind = \"nope\" }]"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = RuntimeConfig::load("/nonexistent/latentflow.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("latentflow.toml");
        std::fs::write(&path, "[planner]\nsubmit_orders = true\n").unwrap();
        let config = RuntimeConfig::load(&path).unwrap();

        let (plan, _) = config
            .build_planner()
            .plan(&IntentFrame::new("create_order").with_slot("item", "x"), None);
        assert_eq!(action_names(&plan.unwrap()), vec!["create_order", "submit_order"]);
    }

    #[test]
    fn audit_sink_opens_when_configured() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = RuntimeConfig::default();
        assert!(config.open_audit_sink().unwrap().is_none());

        config.audit.path = Some(dir.path().join("audit.jsonl"));
        let sink = config.open_audit_sink().unwrap().unwrap();
        let engine = config.build_engine(Some(sink));
        assert!(engine.audit().is_some());
    }
}
