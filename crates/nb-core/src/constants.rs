use std::sync::LazyLock;

/// The fixed prime table shared by the encoder, the transform and the kernel.
pub const FUNDAMENTAL_PRIMES: [u32; 15] = [2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47];

/// Golden ratio: (1 + √5) / 2
pub const PHI: f64 = 1.618_033_988_749_895;

/// π, re-exported so callers see one constant block.
pub const PI: f64 = std::f64::consts::PI;

/// Default time crystal dimensionality
pub const DEFAULT_DIMENSIONS: usize = 11;

/// Coherence reported when there is nothing to measure (maximum uncertainty)
pub const NEUTRAL_COHERENCE: f64 = 0.5;

/// Numerical epsilon for near-zero comparisons
pub const EPSILON: f64 = 1e-10;

/// Reference pitch for prime resonance frequencies (Hz)
pub const BASE_FREQUENCY: f64 = 440.0;

/// Library version string exposed to hosts.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Read-only view over the process-wide constants.
#[derive(Debug)]
pub struct RuntimeConstants {
    pub primes: &'static [u32],
    pub phi: f64,
    pub pi: f64,
    pub default_dimensions: usize,
}

impl RuntimeConstants {
    /// Position of `prime` in the fundamental table.
    pub fn prime_index(&self, prime: u32) -> Option<usize> {
        self.primes.iter().position(|&p| p == prime)
    }

    pub fn is_fundamental(&self, prime: u32) -> bool {
        self.prime_index(prime).is_some()
    }
}

static CONSTANTS: LazyLock<RuntimeConstants> = LazyLock::new(|| RuntimeConstants {
    primes: &FUNDAMENTAL_PRIMES,
    phi: PHI,
    pi: PI,
    default_dimensions: DEFAULT_DIMENSIONS,
});

/// Process-wide constants, initialized once on first access and never mutated.
pub fn constants() -> &'static RuntimeConstants {
    &CONSTANTS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prime_table_is_ascending_primes() {
        assert_eq!(FUNDAMENTAL_PRIMES.len(), 15);
        for w in FUNDAMENTAL_PRIMES.windows(2) {
            assert!(w[0] < w[1]);
        }
        for &p in &FUNDAMENTAL_PRIMES {
            assert!((2..p).all(|d| p % d != 0), "{p} is not prime");
        }
    }

    #[test]
    fn test_constants_block() {
        let c = constants();
        assert_eq!(c.primes, &FUNDAMENTAL_PRIMES);
        assert_eq!(c.default_dimensions, 11);
        assert!((c.phi * c.phi - c.phi - 1.0).abs() < EPSILON);
        assert_eq!(c.prime_index(2), Some(0));
        assert_eq!(c.prime_index(47), Some(14));
        assert!(!c.is_fundamental(53));
    }
}
