use std::collections::VecDeque;

use latentflow_types::IntentFrame;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::reflection::FailureKind;

const DEFAULT_MAX_RECORDS: usize = 2000;
const SCORE_WINDOW: usize = 500;

/// One `(context, plan) -> outcome` observation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CausalRecord {
    pub key: String,
    pub intent: String,
    pub plan: Vec<String>,
    pub ok: bool,
    pub failure: Option<FailureKind>,
}

/// Bounded memory of how plans fared in similar contexts.
///
/// Contexts are keyed by intent plus the `to`, `amount` and `order_id`
/// slots. Oldest records are dropped first.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CausalMemory {
    records: VecDeque<CausalRecord>,
    max_records: usize,
}

impl Default for CausalMemory {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RECORDS)
    }
}

impl CausalMemory {
    pub fn new(max_records: usize) -> Self {
        Self {
            records: VecDeque::new(),
            max_records,
        }
    }

    pub fn context_key(frame: &IntentFrame) -> String {
        let slot = |k: &str| frame.slot(k).cloned().unwrap_or(Value::Null);
        json!({
            "intent": frame.intent,
            "to": slot("to"),
            "amount": slot("amount"),
            "order_id": slot("order_id"),
        })
        .to_string()
    }

    pub fn add(&mut self, frame: &IntentFrame, plan: &[String], ok: bool, failure: Option<FailureKind>) {
        self.records.push_back(CausalRecord {
            key: Self::context_key(frame),
            intent: frame.intent.clone(),
            plan: plan.to_vec(),
            ok,
            failure,
        });
        while self.records.len() > self.max_records {
            self.records.pop_front();
        }
    }

    /// Success ratio of `plan` in this context over recent records; 0.5
    /// when there is no evidence.
    pub fn plan_score(&self, frame: &IntentFrame, plan: &[String]) -> f64 {
        let key = Self::context_key(frame);
        let skip = self.records.len().saturating_sub(SCORE_WINDOW);
        let (ok, bad) = self
            .records
            .iter()
            .skip(skip)
            .filter(|r| r.key == key && r.plan == plan)
            .fold((0u32, 0u32), |(ok, bad), r| if r.ok { (ok + 1, bad) } else { (ok, bad + 1) });

        match ok + bad {
            0 => 0.5,
            total => f64::from(ok) / f64::from(total),
        }
    }

    pub fn records(&self) -> impl Iterator<Item = &CausalRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
