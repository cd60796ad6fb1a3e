//! Phase Prime Metric: coherence scalars over small prime sets and the
//! golden-ratio encoder that maps real values onto the prime table.

use crate::constants::{BASE_FREQUENCY, FUNDAMENTAL_PRIMES, NEUTRAL_COHERENCE, PHI, PI};
use crate::error::{NanoBrainError, Result};

/// `0.5 + 0.5·sin(√∏p · π / Σp)`, or 0.5 for an empty set. Always in [0, 1].
pub fn compute_ppm_coherence(primes: &[u32]) -> f64 {
    if primes.is_empty() {
        return NEUTRAL_COHERENCE;
    }
    let total: f64 = primes.iter().map(|&p| p as f64).sum();
    if total == 0.0 {
        return NEUTRAL_COHERENCE;
    }
    let product: f64 = primes.iter().map(|&p| p as f64).product();
    let root = if product.is_finite() {
        product.sqrt()
    } else {
        // ∏p overflowed; take the root in log space.
        (0.5 * primes.iter().map(|&p| (p as f64).ln()).sum::<f64>()).exp()
    };
    let phase = root * PI / total;
    if !phase.is_finite() {
        return NEUTRAL_COHERENCE;
    }
    (0.5 + 0.5 * phase.sin()).clamp(0.0, 1.0)
}

/// Encode a real value as an ascending, duplicate-free set of at most
/// `num_primes` table primes.
pub fn prime_encode(value: f64, num_primes: usize) -> Result<Vec<u32>> {
    if !value.is_finite() {
        return Err(NanoBrainError::InvalidSignal(format!(
            "cannot prime-encode non-finite value {value}"
        )));
    }
    let table = FUNDAMENTAL_PRIMES.len();
    let mut v = value.abs();
    let mut primes = Vec::with_capacity(num_primes.min(table));
    for _ in 0..num_primes.min(table) {
        let index = ((v * table as f64).floor() as usize) % table;
        primes.push(FUNDAMENTAL_PRIMES[index]);
        v = (v * PHI) % 1.0;
    }
    primes.sort_unstable();
    primes.dedup();
    Ok(primes)
}

/// Primes earlier in the table weigh more: `0.5 + 0.5·mean((15 - idx) / 15)`.
/// Primes outside the table contribute nothing.
pub fn prime_importance(primes: &[u32]) -> f64 {
    if primes.is_empty() {
        return NEUTRAL_COHERENCE;
    }
    let table = FUNDAMENTAL_PRIMES.len() as f64;
    let sum: f64 = primes
        .iter()
        .filter_map(|p| FUNDAMENTAL_PRIMES.iter().position(|q| q == p))
        .map(|idx| (table - idx as f64) / table)
        .sum();
    0.5 + 0.5 * sum / primes.len() as f64
}

/// Pitch associated with a prime set, anchored at 440 Hz.
pub fn resonance_frequency(primes: &[u32]) -> f64 {
    if primes.is_empty() {
        return BASE_FREQUENCY;
    }
    let sum: u64 = primes.iter().map(|&p| p as u64).sum();
    let product = primes
        .iter()
        .fold(1u64, |acc, &p| acc.wrapping_mul(p as u64) % 100);
    let semitones = (sum % 12) as f64;
    BASE_FREQUENCY * 2f64.powf(semitones / 12.0) * (1.0 + product as f64 / 1000.0)
}

/// Jaccard similarity of two prime sets. Two empty sets are identical.
pub fn prime_consistency(a: &[u32], b: &[u32]) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let intersection = a.iter().filter(|p| b.contains(p)).count();
    let union = a.len() + b.iter().filter(|p| !a.contains(p)).count();
    intersection as f64 / union as f64
}
