//! Engine configuration. Every struct deserializes with defaults for
//! missing fields and is checked with `validate()` before use.

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_DIMENSIONS, FUNDAMENTAL_PRIMES};
use crate::error::{NanoBrainError, Result};
use crate::truth::RevisionRule;

fn invalid(msg: impl Into<String>) -> NanoBrainError {
    NanoBrainError::InvalidConfig(msg.into())
}

fn check_unit(name: &str, value: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(invalid(format!("{name} must be in [0, 1], got {value}")));
    }
    Ok(())
}

/// Attention economy rates.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttentionConfig {
    pub sti_decay: f64,
    pub lti_decay: f64,
    pub vlti_decay: f64,
    pub diffusion_rate: f64,
    pub lti_accrual: f64,
    pub vlti_accrual: f64,
    pub enable_ecan: bool,
    pub rent_rate: f64,
    pub wage_rate: f64,
}

impl Default for AttentionConfig {
    fn default() -> Self {
        Self {
            sti_decay: 0.98,
            lti_decay: 0.998,
            vlti_decay: 0.9998,
            diffusion_rate: 0.1,
            lti_accrual: 0.1,
            vlti_accrual: 0.01,
            enable_ecan: false,
            rent_rate: 0.01,
            wage_rate: 0.8,
        }
    }
}

impl AttentionConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, decay) in [
            ("sti_decay", self.sti_decay),
            ("lti_decay", self.lti_decay),
            ("vlti_decay", self.vlti_decay),
        ] {
            if !(decay > 0.0 && decay <= 1.0) {
                return Err(invalid(format!("{name} must be in (0, 1], got {decay}")));
            }
        }
        if self.sti_decay > self.lti_decay || self.lti_decay > self.vlti_decay {
            return Err(invalid("short-term importance must decay fastest"));
        }
        check_unit("diffusion_rate", self.diffusion_rate)?;
        check_unit("lti_accrual", self.lti_accrual)?;
        check_unit("vlti_accrual", self.vlti_accrual)?;
        check_unit("rent_rate", self.rent_rate)?;
        check_unit("wage_rate", self.wage_rate)?;
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeCrystalConfig {
    /// Minimum quantum coherence for a kernel to report itself coherent.
    pub quantum_coherence_threshold: f64,
}

impl Default for TimeCrystalConfig {
    fn default() -> Self {
        Self {
            quantum_coherence_threshold: 0.5,
        }
    }
}

impl TimeCrystalConfig {
    pub fn validate(&self) -> Result<()> {
        let t = self.quantum_coherence_threshold;
        if !(t > 0.0 && t <= 1.0) {
            return Err(invalid(format!(
                "quantum_coherence_threshold must be in (0, 1], got {t}"
            )));
        }
        Ok(())
    }
}

/// Kernel configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnifiedConfig {
    /// Size of the attentional focus that feeds the coherence metrics.
    pub time_crystal_dimensions: usize,
    /// Keep a bounded history of per-cycle metrics.
    pub enable_meta_cognition: bool,
    pub debug_output: bool,
    pub resource_budget: f64,
    /// Sti granted to every atom the kernel creates.
    pub creation_stimulus: f64,
    pub history_len: usize,
    pub revision_rule: RevisionRule,
    pub attention: AttentionConfig,
    pub time_crystal: TimeCrystalConfig,
}

impl Default for UnifiedConfig {
    fn default() -> Self {
        Self {
            time_crystal_dimensions: DEFAULT_DIMENSIONS,
            enable_meta_cognition: true,
            debug_output: false,
            resource_budget: 1000.0,
            creation_stimulus: 100.0,
            history_len: 64,
            revision_rule: RevisionRule::default(),
            attention: AttentionConfig::default(),
            time_crystal: TimeCrystalConfig::default(),
        }
    }
}

impl UnifiedConfig {
    pub fn validate(&self) -> Result<()> {
        if self.time_crystal_dimensions == 0 {
            return Err(invalid("time_crystal_dimensions must be > 0"));
        }
        if !(self.resource_budget > 0.0 && self.resource_budget.is_finite()) {
            return Err(invalid(format!(
                "resource_budget must be positive, got {}",
                self.resource_budget
            )));
        }
        if !self.creation_stimulus.is_finite() {
            return Err(invalid("creation_stimulus must be finite"));
        }
        self.attention.validate()?;
        self.time_crystal.validate()
    }
}

/// Time crystal transform settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TCTransformConfig {
    pub num_prime_components: usize,
    /// Scale spectrum activations so the strongest prime is 1.0.
    pub normalize_output: bool,
    /// Default output length of `inverse_transform`.
    pub signal_resolution: usize,
}

impl Default for TCTransformConfig {
    fn default() -> Self {
        Self {
            num_prime_components: 10,
            normalize_output: true,
            signal_resolution: 256,
        }
    }
}

impl TCTransformConfig {
    pub fn validate(&self) -> Result<()> {
        let n = self.num_prime_components;
        if n == 0 || n > FUNDAMENTAL_PRIMES.len() {
            return Err(invalid(format!(
                "num_prime_components must be in 1..={}, got {n}",
                FUNDAMENTAL_PRIMES.len()
            )));
        }
        if self.signal_resolution == 0 {
            return Err(invalid("signal_resolution must be > 0"));
        }
        Ok(())
    }
}

/// Garden of gardens settings. `kernel` configures every garden kernel.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GOGConfig {
    pub max_depth: usize,
    /// Minimum prime-signature overlap for two petals to count as resonant.
    pub resonance_threshold: f64,
    pub kernel: UnifiedConfig,
    pub transform: TCTransformConfig,
}

impl Default for GOGConfig {
    fn default() -> Self {
        Self {
            max_depth: 3,
            resonance_threshold: 0.8,
            kernel: UnifiedConfig::default(),
            transform: TCTransformConfig::default(),
        }
    }
}

impl GOGConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_depth == 0 {
            return Err(invalid("max_depth must be > 0"));
        }
        check_unit("resonance_threshold", self.resonance_threshold)?;
        self.kernel.validate()?;
        self.transform.validate()
    }
}
