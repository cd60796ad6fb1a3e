//! Attention economy over an `AtomSpace`.
//!
//! Short-term importance (sti) is the currency that decays each cycle and
//! spreads along links. Long-term and very-long-term importance accrue from
//! stimulation and decay more slowly.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::atomspace::{AtomSpace, Handle};
use crate::config::AttentionConfig;
use crate::constants::EPSILON;
use crate::error::{NanoBrainError, Result};

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AttentionValue {
    pub sti: f64,
    pub lti: f64,
    pub vlti: f64,
}

impl AttentionValue {
    pub fn new(sti: f64, lti: f64, vlti: f64) -> Self {
        Self { sti, lti, vlti }
    }
}

/// Aggregate view of the attention distribution.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AttentionStats {
    pub total_attention: f64,
    pub average_attention: f64,
    /// Shannon entropy of the positive sti distribution, normalized to [0, 1].
    pub attention_entropy: f64,
    pub resource_utilization: f64,
}

/// Stateless processor applying the economy rules to a store.
#[derive(Clone, Debug, Default)]
pub struct AttentionEconomy {
    config: AttentionConfig,
}

impl AttentionEconomy {
    pub fn new(config: AttentionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AttentionConfig {
        &self.config
    }

    /// Add `amount` to an atom's sti, accruing a share into lti and vlti.
    pub fn stimulate(&self, space: &mut AtomSpace, id: Handle, amount: f64) -> Result<AttentionValue> {
        if !amount.is_finite() {
            return Err(NanoBrainError::InvalidSignal(format!(
                "stimulus must be finite, got {amount}"
            )));
        }
        let atom = space.atom_mut(id)?;
        atom.attention.sti += amount;
        atom.attention.lti += amount * self.config.lti_accrual;
        atom.attention.vlti += amount * self.config.vlti_accrual;
        Ok(atom.attention)
    }

    pub fn snapshot(&self, space: &AtomSpace, id: Handle) -> Result<AttentionValue> {
        space.get_atom(id).map(|a| a.attention)
    }

    pub fn decay_all(&self, space: &mut AtomSpace) {
        for atom in space.atoms_mut() {
            atom.attention.sti *= self.config.sti_decay;
            atom.attention.lti *= self.config.lti_decay;
            atom.attention.vlti *= self.config.vlti_decay;
        }
    }

    /// Spread `diffusion_rate` of each positive sti to the atoms it shares a
    /// link with, weighted by link strength. Total sti is conserved.
    pub fn diffuse_all(&self, space: &mut AtomSpace) {
        let rate = self.config.diffusion_rate;
        if rate <= 0.0 {
            return;
        }

        let mut neighbors: BTreeMap<Handle, Vec<(Handle, f64)>> = BTreeMap::new();
        for link in space.links() {
            let weight = link.truth.strength();
            if weight <= 0.0 {
                continue;
            }
            let mut members: Vec<Handle> = link
                .outgoing
                .iter()
                .copied()
                .filter(|h| space.get_atom(*h).is_ok())
                .collect();
            members.sort();
            members.dedup();
            for &a in &members {
                let entry = neighbors.entry(a).or_default();
                entry.extend(members.iter().filter(|&&b| b != a).map(|&b| (b, weight)));
            }
        }

        // Compute every transfer from the pre-diffusion snapshot, then apply.
        let mut deltas: BTreeMap<Handle, f64> = BTreeMap::new();
        for (source, targets) in &neighbors {
            let sti = match space.get_atom(*source) {
                Ok(atom) if atom.attention.sti > 0.0 => atom.attention.sti,
                _ => continue,
            };
            let total_weight: f64 = targets.iter().map(|(_, w)| w).sum();
            if total_weight <= EPSILON {
                continue;
            }
            let outflow = sti * rate;
            *deltas.entry(*source).or_default() -= outflow;
            for (target, weight) in targets {
                *deltas.entry(*target).or_default() += outflow * weight / total_weight;
            }
        }

        for (id, delta) in deltas {
            if let Ok(atom) = space.atom_mut(id) {
                atom.attention.sti += delta;
            }
        }
    }

    /// ECAN step: tax every positive sti into a pool, then pay `wage_rate` of
    /// the pool back out in proportion to truth utility. Returns the wages paid.
    pub fn collect_rent_and_pay_wages(&self, space: &mut AtomSpace) -> f64 {
        let mut pool = 0.0;
        for atom in space.atoms_mut() {
            if atom.attention.sti > 0.0 {
                let rent = atom.attention.sti * self.config.rent_rate;
                atom.attention.sti -= rent;
                pool += rent;
            }
        }

        let total_utility: f64 = space.atoms().map(|a| a.truth.utility()).sum();
        if pool <= 0.0 || total_utility <= EPSILON {
            return 0.0;
        }
        let distributable = pool * self.config.wage_rate;
        for atom in space.atoms_mut() {
            atom.attention.sti += distributable * atom.truth.utility() / total_utility;
        }
        distributable
    }

    /// One atomic economy step: decay, diffusion, then ECAN when enabled.
    pub fn step(&self, space: &mut AtomSpace) {
        self.decay_all(space);
        self.diffuse_all(space);
        if self.config.enable_ecan {
            self.collect_rent_and_pay_wages(space);
        }
    }

    pub fn stats(&self, space: &AtomSpace, resource_budget: f64) -> AttentionStats {
        let n = space.atom_count();
        if n == 0 {
            return AttentionStats::default();
        }
        let total: f64 = space.atoms().map(|a| a.attention.sti.max(0.0)).sum();
        let utilization = if resource_budget > 0.0 {
            (total / resource_budget).min(1.0)
        } else {
            0.0
        };
        AttentionStats {
            total_attention: total,
            average_attention: total / n as f64,
            attention_entropy: normalized_entropy(space),
            resource_utilization: utilization,
        }
    }

    /// The `k` atoms with the highest sti, ties broken by lower id.
    pub fn top_attention(&self, space: &AtomSpace, k: usize) -> Vec<(Handle, f64)> {
        top_attention(space, k)
    }
}

pub(crate) fn top_attention(space: &AtomSpace, k: usize) -> Vec<(Handle, f64)> {
    let mut ranked: Vec<(Handle, f64)> = space.atoms().map(|a| (a.id, a.attention.sti)).collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    ranked.truncate(k);
    ranked
}

/// Entropy of the positive sti shares, divided by ln(atom count).
pub(crate) fn normalized_entropy(space: &AtomSpace) -> f64 {
    let n = space.atom_count();
    if n <= 1 {
        return 0.0;
    }
    let total: f64 = space.atoms().map(|a| a.attention.sti.max(0.0)).sum();
    if total <= EPSILON {
        return 0.0;
    }
    let h: f64 = space
        .atoms()
        .map(|a| a.attention.sti.max(0.0) / total)
        .filter(|p| *p > 0.0)
        .map(|p| -p * p.ln())
        .sum();
    (h / (n as f64).ln()).clamp(0.0, 1.0)
}
