use serde::{Deserialize, Serialize};

use crate::attention::{normalized_entropy, top_attention};
use crate::atomspace::AtomSpace;
use crate::ppm::{compute_ppm_coherence, prime_encode};

/// Primes drawn per focus atom when encoding its attention share.
pub const FOCUS_ENCODING_PRIMES: usize = 3;

/// Everything a scorer may look at, captured from one consistent state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActivitySnapshot {
    pub total_atoms: usize,
    pub total_links: usize,
    /// Normalized entropy of the sti distribution, in [0, 1].
    pub attention_entropy: f64,
    /// Union of the prime encodings of each focus atom's attention share.
    pub focus_primes: Vec<u32>,
    pub ppm_coherence: f64,
    /// Sti-weighted mean truth confidence across the focus.
    pub focus_confidence: f64,
}

impl ActivitySnapshot {
    /// Capture the `focus_size` highest-sti atoms with positive sti.
    pub fn capture(space: &AtomSpace, focus_size: usize) -> Self {
        let focus: Vec<_> = top_attention(space, focus_size)
            .into_iter()
            .filter(|(_, sti)| *sti > 0.0)
            .collect();
        let focus_total: f64 = focus.iter().map(|(_, sti)| sti).sum();

        let mut focus_primes = Vec::new();
        let mut weighted_confidence = 0.0;
        for (id, sti) in &focus {
            let share = sti / focus_total;
            if let Ok(primes) = prime_encode(share, FOCUS_ENCODING_PRIMES) {
                focus_primes.extend(primes);
            }
            if let Ok(atom) = space.get_atom(*id) {
                weighted_confidence += share * atom.truth.confidence();
            }
        }
        focus_primes.sort_unstable();
        focus_primes.dedup();

        let focus_confidence = if focus.is_empty() {
            let n = space.atom_count();
            if n == 0 {
                0.0
            } else {
                space.atoms().map(|a| a.truth.confidence()).sum::<f64>() / n as f64
            }
        } else {
            weighted_confidence
        };

        Self {
            total_atoms: space.atom_count(),
            total_links: space.link_count(),
            attention_entropy: normalized_entropy(space),
            ppm_coherence: compute_ppm_coherence(&focus_primes),
            focus_primes,
            focus_confidence: focus_confidence.clamp(0.0, 1.0),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CoherenceScores {
    pub quantum_coherence: f64,
    pub consciousness_emergence: f64,
}

/// Maps an activity snapshot to the two terminal kernel metrics. Must be a
/// pure function of the snapshot and return values in [0, 1].
pub trait CoherenceScorer: Send + Sync {
    fn score(&self, snapshot: &ActivitySnapshot) -> CoherenceScores;
}

/// Default scorer.
///
/// `quantum_coherence = (ppm + (1 - entropy)) / 2`: focused attention over a
/// prime-coherent focus scores high.
///
/// `consciousness_emergence = ∛(quantum_coherence · focus_confidence · connectivity)`
/// where `connectivity = min(1, links / atoms)`.
///
/// An empty store scores zero on both.
#[derive(Clone, Copy, Debug, Default)]
pub struct EntropyPrimeScorer;

impl CoherenceScorer for EntropyPrimeScorer {
    fn score(&self, s: &ActivitySnapshot) -> CoherenceScores {
        if s.total_atoms == 0 {
            return CoherenceScores {
                quantum_coherence: 0.0,
                consciousness_emergence: 0.0,
            };
        }
        let quantum = (0.5 * s.ppm_coherence + 0.5 * (1.0 - s.attention_entropy)).clamp(0.0, 1.0);
        let connectivity = (s.total_links as f64 / s.total_atoms as f64).min(1.0);
        let emergence = (quantum * s.focus_confidence * connectivity)
            .cbrt()
            .clamp(0.0, 1.0);
        CoherenceScores {
            quantum_coherence: quantum,
            consciousness_emergence: emergence,
        }
    }
}
