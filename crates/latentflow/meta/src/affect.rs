use serde::{Deserialize, Serialize};

/// Conservatism at or above which a missing plan asks for clarification.
pub const CLARIFY_THRESHOLD: f64 = 0.4;

/// Smoothed mood of a session, updated after every decision.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AffectState {
    /// Smoothed recent success estimate
    pub confidence: f64,
    /// 0..1, lower is more conservative
    pub risk_tolerance: f64,
    pub urgency: f64,
    /// 0..1, rises with consecutive failures
    pub fatigue: f64,
}

impl Default for AffectState {
    fn default() -> Self {
        Self {
            confidence: 0.7,
            risk_tolerance: 0.5,
            urgency: 0.3,
            fatigue: 0.0,
        }
    }
}

/// Derived modulation parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AffectKnobs {
    pub confidence: f64,
    pub risk_tolerance: f64,
    pub urgency: f64,
    pub fatigue: f64,
    pub conservatism: f64,
}

impl AffectKnobs {
    pub fn prefers_clarification(&self) -> bool {
        self.conservatism >= CLARIFY_THRESHOLD
    }
}

impl AffectState {
    pub fn update_on_success(&mut self) {
        self.confidence = (self.confidence * 0.95 + 0.05).min(0.99);
        self.fatigue = (self.fatigue * 0.7).max(0.0);
        self.risk_tolerance = (self.risk_tolerance * 0.97 + 0.03 * 0.8).min(1.0);
    }

    pub fn update_on_failure(&mut self) {
        self.confidence = (self.confidence * 0.95).max(0.01);
        self.fatigue = (self.fatigue * 0.8 + 0.2).min(1.0);
        self.risk_tolerance = (self.risk_tolerance * 0.95 - 0.05 * 0.2).max(0.0);
    }

    pub fn conservatism(&self) -> f64 {
        ((1.0 - self.confidence) * 0.6 + self.fatigue * 0.4).min(1.0)
    }

    pub fn knobs(&self) -> AffectKnobs {
        AffectKnobs {
            confidence: self.confidence,
            risk_tolerance: self.risk_tolerance,
            urgency: self.urgency,
            fatigue: self.fatigue,
            conservatism: self.conservatism(),
        }
    }
}
