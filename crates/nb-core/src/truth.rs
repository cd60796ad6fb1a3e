//! Probabilistic truth values and the revision algebra that combines them.
//!
//! A `TruthValue` is an immutable `(strength, confidence, count)` triple.
//! Revision never mutates its inputs; it produces a new value whose
//! confidence is the probabilistic union `c1 + c2 - c1·c2` and whose
//! count tallies the evidence of both sides.

use serde::{Deserialize, Serialize};

use crate::constants::{EPSILON, NEUTRAL_COHERENCE};
use crate::error::{NanoBrainError, Result};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TruthValue {
    strength: f64,
    confidence: f64,
    count: f64,
}

impl TruthValue {
    /// Validated constructor. Count starts at one observation.
    pub fn new(strength: f64, confidence: f64) -> Result<Self> {
        Self::with_count(strength, confidence, 1.0)
    }

    pub fn with_count(strength: f64, confidence: f64, count: f64) -> Result<Self> {
        let unit = 0.0..=1.0;
        if !unit.contains(&strength) || !unit.contains(&confidence) {
            return Err(NanoBrainError::InvalidTruthValue {
                strength,
                confidence,
            });
        }
        if !(count >= 0.0 && count.is_finite()) {
            return Err(NanoBrainError::InvalidTruthValue {
                strength,
                confidence,
            });
        }
        Ok(Self {
            strength,
            confidence,
            count,
        })
    }

    pub fn strength(&self) -> f64 {
        self.strength
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn count(&self) -> f64 {
        self.count
    }

    /// Strength pulled toward 0.5 as confidence drops.
    pub fn expectation(&self) -> f64 {
        self.confidence * (self.strength - 0.5) + 0.5
    }

    /// Utility used by wage distribution: belief that is both strong and confident.
    pub fn utility(&self) -> f64 {
        self.strength * self.confidence
    }

    /// Symmetric revision with another value.
    pub fn revise(&self, other: &TruthValue) -> TruthValue {
        TruthValueEngine::default().merge(self, other)
    }
}

impl Default for TruthValue {
    fn default() -> Self {
        Self {
            strength: 1.0,
            confidence: 0.0,
            count: 0.0,
        }
    }
}

/// How the strength of two revised values is blended.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevisionRule {
    /// `(s1·c1 + s2·c2) / (c1 + c2)`
    #[default]
    Symmetric,
    /// Legacy `(s1·c1 + s2·c2 - s1·c1·c2·s2) / c`, clamped into [0, 1].
    CrossTerm,
}

/// Revision algebra over truth values.
#[derive(Clone, Copy, Debug, Default)]
pub struct TruthValueEngine {
    pub rule: RevisionRule,
}

impl TruthValueEngine {
    pub fn new(rule: RevisionRule) -> Self {
        Self { rule }
    }

    pub fn merge(&self, a: &TruthValue, b: &TruthValue) -> TruthValue {
        let (s1, c1) = (a.strength, a.confidence);
        let (s2, c2) = (b.strength, b.confidence);
        let confidence = (c1 + c2 - c1 * c2).clamp(0.0, 1.0);

        let strength = if confidence <= EPSILON {
            NEUTRAL_COHERENCE
        } else {
            match self.rule {
                RevisionRule::Symmetric => (s1 * c1 + s2 * c2) / (c1 + c2),
                RevisionRule::CrossTerm => {
                    (s1 * c1 + s2 * c2 - s1 * c1 * c2 * s2) / confidence
                }
            }
            .clamp(0.0, 1.0)
        };

        TruthValue {
            strength,
            confidence,
            count: a.count + b.count,
        }
    }
}
